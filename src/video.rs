// src/video.rs - Camera capture
use crate::error::CameraError;
use image::{imageops, RgbImage};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
};
use nokhwa::Camera;
use tracing::{debug, info, warn};

/// One captured 3-channel frame.
pub type Frame = RgbImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSettings {
    pub index: u32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

/// Something that can open a camera stream.
pub trait CameraDevice {
    type Stream: FrameSource;

    fn open(&mut self, settings: &CaptureSettings) -> Result<Self::Stream, CameraError>;
}

/// An open camera stream. Dropping it releases the device.
pub trait FrameSource {
    fn read_frame(&mut self) -> Result<Frame, CameraError>;
}

/// Native camera access through nokhwa.
#[derive(Debug, Default)]
pub struct NokhwaDevice;

impl CameraDevice for NokhwaDevice {
    type Stream = NokhwaStream;

    fn open(&mut self, settings: &CaptureSettings) -> Result<NokhwaStream, CameraError> {
        let open_error = |reason: String| CameraError::Open {
            index: settings.index,
            reason,
        };

        let format = CameraFormat::new(
            Resolution::new(settings.width, settings.height),
            FrameFormat::MJPEG,
            settings.fps,
        );
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(format));

        debug!(index = settings.index, "Creating camera object...");
        let mut camera = Camera::new(CameraIndex::Index(settings.index), requested)
            .map_err(|e| open_error(e.to_string()))?;
        camera
            .open_stream()
            .map_err(|e| open_error(format!("failed to open stream: {}", e)))?;

        let resolution = camera.resolution();
        info!(
            index = settings.index,
            name = %camera.info().human_name(),
            width = resolution.width(),
            height = resolution.height(),
            fps = camera.frame_rate(),
            "Camera opened"
        );

        Ok(NokhwaStream {
            camera,
            width: settings.width,
            height: settings.height,
        })
    }
}

pub struct NokhwaStream {
    camera: Camera,
    width: u32,
    height: u32,
}

impl FrameSource for NokhwaStream {
    fn read_frame(&mut self) -> Result<Frame, CameraError> {
        let buffer = self
            .camera
            .frame()
            .map_err(|e| CameraError::Read(format!("failed to capture frame: {}", e)))?;

        let decoded = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| CameraError::Read(format!("failed to decode frame: {}", e)))?;

        Ok(fit_to(decoded, self.width, self.height))
    }
}

impl Drop for NokhwaStream {
    fn drop(&mut self) {
        if let Err(e) = self.camera.stop_stream() {
            warn!("Failed to stop camera stream: {}", e);
        } else {
            debug!("Camera stream stopped");
        }
    }
}

/// Resize to the configured frame size when the device picked another one.
pub fn fit_to(frame: RgbImage, width: u32, height: u32) -> Frame {
    if frame.dimensions() == (width, height) {
        frame
    } else {
        imageops::resize(&frame, width, height, imageops::FilterType::Triangle)
    }
}
