// src/config.rs
use crate::error::ConfigError;
use crate::mediapipe_bridge::PoseOptions;
use crate::video::CaptureSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_MODEL_FILE: &str = "hand_gesture_classifier.json";

/// Static application settings, read once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub app_name: String,

    // Capture
    pub camera_index: u32,
    pub frame_width: u32,
    pub frame_height: u32,
    pub target_fps: u32,

    // Hand landmarker
    pub max_num_hands: u32,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
    pub pose_python: PathBuf,
    pub pose_script: PathBuf,

    pub model_path: PathBuf,
    pub debug: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "Hand Gesture Recognition".to_string(),
            camera_index: 0,
            frame_width: 440,
            frame_height: 340,
            target_fps: 20,
            max_num_hands: 2,
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
            pose_python: PathBuf::from("python3"),
            pose_script: PathBuf::from("scripts/hand_landmarker.py"),
            model_path: default_model_path(),
            debug: false,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup, falling back to defaults
    /// for missing keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let settings = Self {
            app_name: lookup("APP_NAME").unwrap_or(defaults.app_name),
            camera_index: parse_or(&lookup, "CAMERA_INDEX", defaults.camera_index)?,
            frame_width: parse_or(&lookup, "FRAME_WIDTH", defaults.frame_width)?,
            frame_height: parse_or(&lookup, "FRAME_HEIGHT", defaults.frame_height)?,
            target_fps: parse_or(&lookup, "TARGET_FPS", defaults.target_fps)?,
            max_num_hands: parse_or(&lookup, "MAX_NUM_HANDS", defaults.max_num_hands)?,
            min_detection_confidence: parse_or(
                &lookup,
                "MIN_DETECTION_CONFIDENCE",
                defaults.min_detection_confidence,
            )?,
            min_tracking_confidence: parse_or(
                &lookup,
                "MIN_TRACKING_CONFIDENCE",
                defaults.min_tracking_confidence,
            )?,
            pose_python: lookup("POSE_PYTHON").map(PathBuf::from).unwrap_or(defaults.pose_python),
            pose_script: lookup("POSE_SCRIPT").map(PathBuf::from).unwrap_or(defaults.pose_script),
            model_path: lookup("MODEL_PATH").map(PathBuf::from).unwrap_or(defaults.model_path),
            debug: lookup("DEBUG")
                .map(|v| v.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.debug),
        };

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_nonzero("FRAME_WIDTH", self.frame_width)?;
        ensure_nonzero("FRAME_HEIGHT", self.frame_height)?;
        ensure_nonzero("TARGET_FPS", self.target_fps)?;
        ensure_nonzero("MAX_NUM_HANDS", self.max_num_hands)?;
        ensure_unit("MIN_DETECTION_CONFIDENCE", self.min_detection_confidence)?;
        ensure_unit("MIN_TRACKING_CONFIDENCE", self.min_tracking_confidence)?;
        Ok(())
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / u64::from(self.target_fps.max(1)))
    }

    pub fn capture(&self) -> CaptureSettings {
        CaptureSettings {
            index: self.camera_index,
            width: self.frame_width,
            height: self.frame_height,
            fps: self.target_fps,
        }
    }

    pub fn pose_options(&self) -> PoseOptions {
        PoseOptions {
            max_num_hands: self.max_num_hands,
            min_detection_confidence: self.min_detection_confidence,
            min_tracking_confidence: self.min_tracking_confidence,
            ..PoseOptions::default()
        }
    }
}

/// `artifacts/` next to the working directory first, then the per-user data dir.
fn default_model_path() -> PathBuf {
    let local = Path::new("artifacts").join(DEFAULT_MODEL_FILE);
    if local.exists() {
        return local;
    }

    directories::ProjectDirs::from("com", "handgesture", "HandGesture")
        .map(|dirs| dirs.data_dir().join(DEFAULT_MODEL_FILE))
        .filter(|p| p.exists())
        .unwrap_or(local)
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

fn ensure_nonzero(key: &'static str, value: u32) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}

fn ensure_unit(key: &'static str, value: f32) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: "must be within [0, 1]".to_string(),
        });
    }
    Ok(())
}
