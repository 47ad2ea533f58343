// src/session.rs - Camera session state machine and per-frame pipeline
use crate::classifier::{GestureClassifier, NoGesture, Prediction};
use crate::config::Settings;
use crate::features::vectorize;
use crate::tracking::LandmarkExtractor;
use crate::ui::{DisplaySink, StatusLevel};
use crate::video::{CameraDevice, CaptureSettings, FrameSource};
use image::DynamicImage;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

pub const STATUS_STARTED: &str = "Camera started. Showing live predictions.";
pub const STATUS_READ_FAILED: &str = "Failed to read from camera.";
pub const STATUS_OFF: &str = "Camera is off. Click \"Start Camera\" to begin.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    Start,
    Stop,
    /// Release the camera and leave the loop.
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Requested,
    CameraFailure,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    NotRunning,
    Processed(Prediction),
    CameraFailed,
}

/// Sleeps away whatever is left of the frame interval.
#[derive(Debug, Clone, Copy)]
pub struct FramePacer {
    interval: Duration,
}

impl FramePacer {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn remaining(&self, elapsed: Duration) -> Duration {
        self.interval.saturating_sub(elapsed)
    }

    pub fn pace(&self, tick_started: Instant) {
        let wait = self.remaining(tick_started.elapsed());
        if !wait.is_zero() {
            std::thread::sleep(wait);
        }
    }
}

/// Owns the camera and drives capture → landmarks → features → gesture → display.
pub struct Session<C: CameraDevice, S: DisplaySink> {
    capture: CaptureSettings,
    camera: C,
    stream: Option<C::Stream>,
    extractor: LandmarkExtractor,
    classifier: GestureClassifier,
    sink: S,
    pacer: FramePacer,
    state: SessionState,
    last_stop: Option<StopReason>,
    frames: u64,
}

impl<C: CameraDevice, S: DisplaySink> Session<C, S> {
    pub fn new(
        settings: &Settings,
        camera: C,
        extractor: LandmarkExtractor,
        classifier: GestureClassifier,
        sink: S,
    ) -> Self {
        if !classifier.is_available() {
            warn!("Gesture model unavailable; every frame will report no gesture");
        }

        Self {
            capture: settings.capture(),
            camera,
            stream: None,
            extractor,
            classifier,
            sink,
            pacer: FramePacer::new(settings.frame_interval()),
            state: SessionState::Idle,
            last_stop: None,
            frames: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    pub fn camera_held(&self) -> bool {
        self.stream.is_some()
    }

    /// Why the last run ended, if one has.
    pub fn last_stop(&self) -> Option<StopReason> {
        self.last_stop
    }

    pub fn last_prediction(&self) -> &Prediction {
        self.classifier.last_prediction()
    }

    /// Idle → Running. A start while running is ignored. Returns whether the
    /// session is running afterwards.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            debug!("Start ignored: camera already running");
            return true;
        }

        match self.camera.open(&self.capture) {
            Ok(stream) => {
                self.stream = Some(stream);
                self.state = SessionState::Running;
                self.last_stop = None;
                self.frames = 0;
                info!(index = self.capture.index, "Camera started");
                self.sink.show_status(StatusLevel::Info, STATUS_STARTED);
                true
            }
            Err(e) => {
                error!("{}", e);
                self.sink.clear();
                self.sink.show_status(StatusLevel::Error, &e.to_string());
                false
            }
        }
    }

    /// Running → Idle on request. Stopping an idle session does nothing.
    pub fn stop(&mut self) {
        if !self.is_running() {
            return;
        }
        self.release(StopReason::Requested);
        self.show_idle();
    }

    pub fn handle(&mut self, signal: ControlSignal) {
        match signal {
            ControlSignal::Start => {
                self.start();
            }
            ControlSignal::Stop | ControlSignal::Shutdown => self.stop(),
        }
    }

    /// One pass of the pipeline. Does not pace.
    pub fn tick(&mut self) -> TickOutcome {
        let Some(stream) = self.stream.as_mut() else {
            return TickOutcome::NotRunning;
        };

        let frame = match stream.read_frame() {
            Ok(frame) => frame,
            Err(e) => {
                error!(frames = self.frames, "{}", e);
                self.release(StopReason::CameraFailure);
                self.sink.clear();
                self.sink.show_status(StatusLevel::Error, STATUS_READ_FAILED);
                return TickOutcome::CameraFailed;
            }
        };
        self.frames += 1;

        let frame = DynamicImage::ImageRgb8(frame);
        let (keypoints, annotated) = self.extractor.extract(&frame);

        let prediction = match keypoints {
            Some(keypoints) => {
                let features = vectorize(&keypoints);
                self.classifier.classify(&features)
            }
            None => Prediction::Absent(NoGesture::NoHand),
        };

        self.sink.show_frame(&annotated);
        self.sink.show_text(&prediction.to_string());

        TickOutcome::Processed(prediction)
    }

    /// Serve control signals until `Shutdown` arrives or the channel closes.
    ///
    /// While idle this blocks on the channel; while running, pending signals
    /// are drained once per tick before the next frame is read.
    pub fn run(&mut self, control: Receiver<ControlSignal>) {
        info!("Session loop started");
        self.show_idle();

        'session: loop {
            if !self.is_running() {
                match control.recv() {
                    Ok(ControlSignal::Shutdown) | Err(_) => break 'session,
                    Ok(signal) => self.handle(signal),
                }
                continue;
            }

            loop {
                match control.try_recv() {
                    Ok(ControlSignal::Shutdown) | Err(TryRecvError::Disconnected) => {
                        break 'session
                    }
                    Ok(signal) => self.handle(signal),
                    Err(TryRecvError::Empty) => break,
                }
            }
            if !self.is_running() {
                continue;
            }

            let started = Instant::now();
            self.tick();
            if self.is_running() {
                self.pacer.pace(started);
            }
        }

        self.stop();
        info!("Session loop finished");
    }

    fn release(&mut self, reason: StopReason) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            info!(?reason, frames = self.frames, "Camera released");
        }
        self.state = SessionState::Idle;
        self.last_stop = Some(reason);
    }

    fn show_idle(&mut self) {
        self.sink.clear();
        self.sink.show_status(StatusLevel::Warning, STATUS_OFF);
    }
}

/// A session running on its own thread.
///
/// The session is built on that thread, so camera and estimator handles never
/// cross threads. `shutdown` returns only after the session has been dropped.
pub struct SessionHandle {
    control: Sender<ControlSignal>,
    thread: JoinHandle<()>,
}

impl SessionHandle {
    pub fn spawn<F, C, S>(build: F) -> std::io::Result<Self>
    where
        F: FnOnce() -> Session<C, S> + Send + 'static,
        C: CameraDevice,
        S: DisplaySink,
    {
        let (control, signals) = mpsc::channel();
        let thread = thread::Builder::new()
            .name("gesture-session".to_string())
            .spawn(move || {
                let mut session = build();
                session.run(signals);
            })?;

        Ok(Self { control, thread })
    }

    pub fn sender(&self) -> Sender<ControlSignal> {
        self.control.clone()
    }

    /// Ask the loop to finish and wait until the camera is released.
    pub fn shutdown(self) -> thread::Result<()> {
        // Fails only if the loop already exited.
        let _ = self.control.send(ControlSignal::Shutdown);
        self.thread.join()
    }
}
