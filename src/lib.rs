//! Real-time hand gesture recognition: camera frames in, hand landmarks and
//! gesture predictions out.

pub mod app;
pub mod classifier;
pub mod config;
pub mod error;
pub mod features;
pub mod mediapipe_bridge;
pub mod session;
pub mod tracking;
pub mod ui;
pub mod video;

pub use classifier::{GestureClassifier, GestureModel, NoGesture, Prediction, SoftmaxModel};
pub use config::Settings;
pub use features::{vectorize, FeatureVector};
pub use mediapipe_bridge::{DetectedHand, PoseEstimator, PoseOptions};
pub use session::{ControlSignal, Session, SessionHandle, SessionState, StopReason, TickOutcome};
pub use tracking::{KeypointSet, LandmarkExtractor};
pub use ui::{DisplaySink, StatusLevel};
pub use video::{CameraDevice, CaptureSettings, Frame, FrameSource};
