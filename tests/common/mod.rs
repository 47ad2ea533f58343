#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use hand_gesture::classifier::SoftmaxModelFile;
use hand_gesture::error::CameraError;
use hand_gesture::{
    CameraDevice, CaptureSettings, DetectedHand, DisplaySink, Frame, FrameSource,
    GestureClassifier, LandmarkExtractor, PoseEstimator, PoseOptions, Settings, SoftmaxModel,
    StatusLevel,
};
use image::{DynamicImage, RgbImage};
use nalgebra::Vector3;

pub fn test_settings() -> Settings {
    Settings {
        target_fps: 1000,
        ..Settings::default()
    }
}

pub fn blank_frame(settings: &Settings) -> RgbImage {
    RgbImage::new(settings.frame_width, settings.frame_height)
}

pub fn hand_at(x: f32, y: f32, z: f32) -> DetectedHand {
    DetectedHand {
        landmarks: vec![Vector3::new(x, y, z); 21],
        score: 0.95,
        handedness: Some("Right".to_string()),
    }
}

/// Replays scripted estimator results; repeats the last one when exhausted.
pub struct FakeEstimator {
    script: VecDeque<Result<Vec<DetectedHand>, String>>,
    last: Result<Vec<DetectedHand>, String>,
    pub calls: Arc<AtomicUsize>,
}

impl FakeEstimator {
    pub fn always(result: Result<Vec<DetectedHand>, String>) -> Self {
        Self {
            script: VecDeque::new(),
            last: result,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn scripted(steps: Vec<Result<Vec<DetectedHand>, String>>) -> Self {
        Self {
            script: steps.into(),
            last: Ok(vec![]),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn no_hands() -> Self {
        Self::always(Ok(vec![]))
    }

    pub fn one_hand() -> Self {
        Self::always(Ok(vec![hand_at(0.5, 0.5, 0.0)]))
    }
}

impl PoseEstimator for FakeEstimator {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn estimate(&mut self, _image: &RgbImage) -> Result<Vec<DetectedHand>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(next) = self.script.pop_front() {
            self.last = next;
        }
        match &self.last {
            Ok(hands) => Ok(hands.clone()),
            Err(e) => bail!("{}", e),
        }
    }
}

pub fn extractor(estimator: FakeEstimator) -> LandmarkExtractor {
    LandmarkExtractor::new(Box::new(estimator), PoseOptions::default())
}

/// Two-class model over 63 features: "open_palm" when x-coordinates dominate,
/// "fist" otherwise.
pub fn hand_model() -> SoftmaxModel {
    let mut open = vec![0.0; 63];
    let mut fist = vec![0.0; 63];
    for i in 0..21 {
        open[i * 3] = 1.0;
        fist[i * 3 + 1] = 1.0;
    }
    SoftmaxModel::from_file(SoftmaxModelFile {
        classes: vec!["fist".to_string(), "open_palm".to_string()],
        weights: vec![fist, open],
        bias: vec![0.0, 0.5],
    })
    .expect("valid model")
}

pub fn classifier() -> GestureClassifier {
    GestureClassifier::new(Box::new(hand_model()))
}

#[derive(Debug, Default)]
pub struct CameraStats {
    pub opens: AtomicUsize,
    pub live: AtomicUsize,
    pub reads: AtomicUsize,
}

/// Camera whose streams fail after `fail_after` reads (never when `None`).
pub struct FakeCamera {
    pub stats: Arc<CameraStats>,
    fail_open: bool,
    fail_after: Option<usize>,
}

impl FakeCamera {
    pub fn healthy() -> Self {
        Self {
            stats: Arc::new(CameraStats::default()),
            fail_open: false,
            fail_after: None,
        }
    }

    pub fn failing_after(reads: usize) -> Self {
        Self {
            fail_after: Some(reads),
            ..Self::healthy()
        }
    }

    pub fn unplugged() -> Self {
        Self {
            fail_open: true,
            ..Self::healthy()
        }
    }
}

impl CameraDevice for FakeCamera {
    type Stream = FakeStream;

    fn open(&mut self, settings: &CaptureSettings) -> Result<FakeStream, CameraError> {
        if self.fail_open {
            return Err(CameraError::Open {
                index: settings.index,
                reason: "no such device".to_string(),
            });
        }
        self.stats.opens.fetch_add(1, Ordering::SeqCst);
        self.stats.live.fetch_add(1, Ordering::SeqCst);
        Ok(FakeStream {
            stats: Arc::clone(&self.stats),
            width: settings.width,
            height: settings.height,
            remaining: self.fail_after,
        })
    }
}

pub struct FakeStream {
    stats: Arc<CameraStats>,
    width: u32,
    height: u32,
    remaining: Option<usize>,
}

impl FrameSource for FakeStream {
    fn read_frame(&mut self) -> Result<Frame, CameraError> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return Err(CameraError::Read("device disconnected".to_string()));
            }
            *remaining -= 1;
        }
        self.stats.reads.fetch_add(1, Ordering::SeqCst);
        Ok(RgbImage::new(self.width, self.height))
    }
}

impl Drop for FakeStream {
    fn drop(&mut self) {
        self.stats.live.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shown {
    Frame(u32, u32),
    Text(String),
    Status(StatusLevel, String),
    Clear,
}

/// Records everything pushed to the display; clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub log: Arc<Mutex<Vec<Shown>>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<Shown> {
        self.log.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Shown::Text(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn statuses(&self) -> Vec<(StatusLevel, String)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Shown::Status(level, message) => Some((level, message)),
                _ => None,
            })
            .collect()
    }

    fn push(&self, shown: Shown) {
        self.log.lock().unwrap().push(shown);
    }
}

impl DisplaySink for RecordingSink {
    fn show_frame(&mut self, frame: &DynamicImage) {
        self.push(Shown::Frame(frame.width(), frame.height()));
    }

    fn show_text(&mut self, text: &str) {
        self.push(Shown::Text(text.to_string()));
    }

    fn show_status(&mut self, level: StatusLevel, message: &str) {
        self.push(Shown::Status(level, message.to_string()));
    }

    fn clear(&mut self) {
        self.push(Shown::Clear);
    }
}
