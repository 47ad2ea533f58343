// src/mediapipe_bridge.rs - MediaPipe hand landmarker running in a helper process
use anyhow::{bail, Context, Result};
use image::RgbImage;
use nalgebra::Vector3;
use serde::Deserialize;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use tracing::{debug, info, warn};

/// Landmarks per hand reported by the MediaPipe hand model.
pub const HAND_LANDMARK_COUNT: usize = 21;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseOptions {
    pub max_num_hands: u32,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
    pub landmark_count: usize,
}

impl Default for PoseOptions {
    fn default() -> Self {
        Self {
            max_num_hands: 2,
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
            landmark_count: HAND_LANDMARK_COUNT,
        }
    }
}

/// One hand as reported by an estimator, in detection order.
#[derive(Debug, Clone)]
pub struct DetectedHand {
    pub landmarks: Vec<Vector3<f32>>,
    pub score: f32,
    pub handedness: Option<String>,
}

/// Hand-pose estimation capability.
///
/// Implementations receive an RGB frame and report every hand they found,
/// first detection first. An empty vector means no hand.
pub trait PoseEstimator: Send {
    fn name(&self) -> &'static str;

    fn estimate(&mut self, image: &RgbImage) -> Result<Vec<DetectedHand>>;
}

/// Estimator that never reports a hand. Used when the landmarker is not installed.
#[derive(Debug, Default)]
pub struct NullEstimator;

impl PoseEstimator for NullEstimator {
    fn name(&self) -> &'static str {
        "none"
    }

    fn estimate(&mut self, _image: &RgbImage) -> Result<Vec<DetectedHand>> {
        Ok(Vec::new())
    }
}

#[derive(Deserialize, Debug)]
struct LandmarkJson {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Deserialize, Debug)]
struct HandJson {
    #[serde(default)]
    handedness: Option<String>,
    #[serde(default)]
    score: f32,
    landmarks: Vec<LandmarkJson>,
}

#[derive(Deserialize, Debug)]
struct BridgeResponse {
    #[serde(default)]
    hands: Vec<HandJson>,
    #[serde(default)]
    error: Option<String>,
}

impl From<HandJson> for DetectedHand {
    fn from(hand: HandJson) -> Self {
        Self {
            landmarks: hand
                .landmarks
                .into_iter()
                .map(|lm| Vector3::new(lm.x, lm.y, lm.z))
                .collect(),
            score: hand.score,
            handedness: hand.handedness,
        }
    }
}

/// Talks to `scripts/hand_landmarker.py` over stdin/stdout.
///
/// Each request is a little-endian `width, height, channels` header followed by
/// raw RGB bytes; each reply is one JSON line.
pub struct MediaPipeBridge {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl MediaPipeBridge {
    pub fn spawn(python: &Path, script: &Path, options: &PoseOptions) -> Result<Self> {
        if !script.exists() {
            bail!("hand landmarker script not found at {}", script.display());
        }

        info!(script = %script.display(), "Starting MediaPipe hand landmarker...");

        let mut process = Command::new(python)
            .arg(script)
            .arg("--max-hands")
            .arg(options.max_num_hands.to_string())
            .arg("--min-detection-confidence")
            .arg(options.min_detection_confidence.to_string())
            .arg("--min-tracking-confidence")
            .arg(options.min_tracking_confidence.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("failed to start {}", python.display()))?;

        let stdin = process.stdin.take().context("landmarker stdin unavailable")?;
        let stdout = process.stdout.take().context("landmarker stdout unavailable")?;
        let mut stdout = BufReader::new(stdout);

        let mut ready = String::new();
        stdout
            .read_line(&mut ready)
            .context("landmarker exited before signalling ready")?;
        if ready.trim() != "READY" {
            let _ = process.kill();
            bail!("landmarker did not signal ready, got {:?}", ready.trim());
        }

        info!("MediaPipe hand landmarker ready");
        Ok(Self {
            process,
            stdin,
            stdout,
        })
    }

    fn send_frame(&mut self, image: &RgbImage) -> Result<()> {
        let (width, height) = image.dimensions();
        self.stdin.write_all(&width.to_le_bytes())?;
        self.stdin.write_all(&height.to_le_bytes())?;
        self.stdin.write_all(&3u32.to_le_bytes())?;
        self.stdin.write_all(image.as_raw())?;
        self.stdin.flush()?;
        Ok(())
    }
}

impl PoseEstimator for MediaPipeBridge {
    fn name(&self) -> &'static str {
        "mediapipe"
    }

    fn estimate(&mut self, image: &RgbImage) -> Result<Vec<DetectedHand>> {
        self.send_frame(image).context("failed to send frame to landmarker")?;

        let mut line = String::new();
        let read = self
            .stdout
            .read_line(&mut line)
            .context("failed to read landmarker response")?;
        if read == 0 {
            bail!("landmarker process closed its output");
        }

        let response = parse_response(&line)?;
        debug!(hands = response.len(), "landmarker response");
        Ok(response)
    }
}

impl Drop for MediaPipeBridge {
    fn drop(&mut self) {
        if let Err(e) = self.process.kill() {
            warn!("Failed to stop hand landmarker: {}", e);
        }
        let _ = self.process.wait();
    }
}

fn parse_response(line: &str) -> Result<Vec<DetectedHand>> {
    let response: BridgeResponse = serde_json::from_str(line.trim())
        .with_context(|| format!("malformed landmarker response: {}", line.trim()))?;

    if let Some(error) = response.error {
        bail!("landmarker error: {}", error);
    }

    Ok(response.hands.into_iter().map(DetectedHand::from).collect())
}
