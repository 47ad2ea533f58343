// src/tracking.rs - Hand landmark extraction and skeleton overlay
use crate::error::ExtractionError;
use crate::mediapipe_bridge::{PoseEstimator, PoseOptions};
use image::{DynamicImage, Rgb, RgbImage};
use nalgebra::Vector3;
use tracing::{debug, warn};

/// MediaPipe hand landmark indices.
pub mod landmarks {
    pub const WRIST: usize = 0;
    pub const THUMB_CMC: usize = 1;
    pub const THUMB_MCP: usize = 2;
    pub const THUMB_IP: usize = 3;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_MCP: usize = 5;
    pub const INDEX_PIP: usize = 6;
    pub const INDEX_DIP: usize = 7;
    pub const INDEX_TIP: usize = 8;
    pub const MIDDLE_MCP: usize = 9;
    pub const MIDDLE_PIP: usize = 10;
    pub const MIDDLE_DIP: usize = 11;
    pub const MIDDLE_TIP: usize = 12;
    pub const RING_MCP: usize = 13;
    pub const RING_PIP: usize = 14;
    pub const RING_DIP: usize = 15;
    pub const RING_TIP: usize = 16;
    pub const PINKY_MCP: usize = 17;
    pub const PINKY_PIP: usize = 18;
    pub const PINKY_DIP: usize = 19;
    pub const PINKY_TIP: usize = 20;
}

use landmarks::*;

/// Bones of the hand skeleton, as pairs of landmark indices.
pub const HAND_CONNECTIONS: [(usize, usize); 21] = [
    // Palm
    (WRIST, THUMB_CMC),
    (WRIST, INDEX_MCP),
    (INDEX_MCP, MIDDLE_MCP),
    (MIDDLE_MCP, RING_MCP),
    (RING_MCP, PINKY_MCP),
    (WRIST, PINKY_MCP),
    // Thumb
    (THUMB_CMC, THUMB_MCP),
    (THUMB_MCP, THUMB_IP),
    (THUMB_IP, THUMB_TIP),
    // Index
    (INDEX_MCP, INDEX_PIP),
    (INDEX_PIP, INDEX_DIP),
    (INDEX_DIP, INDEX_TIP),
    // Middle
    (MIDDLE_MCP, MIDDLE_PIP),
    (MIDDLE_PIP, MIDDLE_DIP),
    (MIDDLE_DIP, MIDDLE_TIP),
    // Ring
    (RING_MCP, RING_PIP),
    (RING_PIP, RING_DIP),
    (RING_DIP, RING_TIP),
    // Pinky
    (PINKY_MCP, PINKY_PIP),
    (PINKY_PIP, PINKY_DIP),
    (PINKY_DIP, PINKY_TIP),
];

const CONNECTION_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const LANDMARK_COLOR: Rgb<u8> = Rgb([244, 67, 54]);
const LANDMARK_RADIUS: i32 = 3;

/// Exactly N normalized landmarks of one hand.
#[derive(Debug, Clone, PartialEq)]
pub struct KeypointSet {
    points: Vec<Vector3<f32>>,
}

impl KeypointSet {
    pub fn new(points: Vec<Vector3<f32>>, expected: usize) -> Result<Self, ExtractionError> {
        if points.len() != expected {
            return Err(ExtractionError::LandmarkCount {
                expected,
                got: points.len(),
            });
        }
        Ok(Self { points })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Vector3<f32>] {
        &self.points
    }

    /// Landmarks mapped to pixel coordinates of a `width`×`height` image.
    pub fn pixel_positions(&self, width: u32, height: u32) -> Vec<(i32, i32)> {
        self.points
            .iter()
            .map(|p| {
                (
                    (p.x * width as f32).round() as i32,
                    (p.y * height as f32).round() as i32,
                )
            })
            .collect()
    }
}

/// Turns frames into the first detected hand's keypoints plus an annotated copy.
pub struct LandmarkExtractor {
    estimator: Box<dyn PoseEstimator>,
    options: PoseOptions,
}

impl LandmarkExtractor {
    pub fn new(estimator: Box<dyn PoseEstimator>, options: PoseOptions) -> Self {
        debug!(
            estimator = estimator.name(),
            max_hands = options.max_num_hands,
            min_detection = options.min_detection_confidence,
            min_tracking = options.min_tracking_confidence,
            "Hand landmark extractor configured"
        );
        Self { estimator, options }
    }

    pub fn options(&self) -> &PoseOptions {
        &self.options
    }

    /// Never fails: any problem yields `(None, input.clone())`.
    pub fn extract(&mut self, input: &DynamicImage) -> (Option<KeypointSet>, DynamicImage) {
        match self.try_extract(input) {
            Ok(result) => result,
            Err(e) => {
                warn!("Error processing frame: {}", e);
                (None, input.clone())
            }
        }
    }

    fn try_extract(
        &mut self,
        input: &DynamicImage,
    ) -> Result<(Option<KeypointSet>, DynamicImage), ExtractionError> {
        let rgb = match input {
            DynamicImage::ImageRgb8(rgb) => rgb,
            other => {
                return Err(ExtractionError::InvalidInput(format!(
                    "expected 8-bit RGB, got {:?}",
                    other.color()
                )))
            }
        };
        if rgb.width() == 0 || rgb.height() == 0 {
            return Err(ExtractionError::InvalidInput("empty image".to_string()));
        }

        let hands = self
            .estimator
            .estimate(rgb)
            .map_err(|e| ExtractionError::Estimator(format!("{:#}", e)))?;

        let mut annotated = rgb.clone();
        let Some(first) = hands.into_iter().next() else {
            return Ok((None, DynamicImage::ImageRgb8(annotated)));
        };

        let keypoints = KeypointSet::new(first.landmarks, self.options.landmark_count)?;
        debug!(
            landmarks = keypoints.len(),
            score = first.score,
            handedness = first.handedness.as_deref().unwrap_or("unknown"),
            "Hand detected"
        );

        draw_skeleton(&mut annotated, &keypoints);
        Ok((Some(keypoints), DynamicImage::ImageRgb8(annotated)))
    }
}

/// Overlay connections and landmark dots; out-of-frame parts are clipped.
pub fn draw_skeleton(image: &mut RgbImage, keypoints: &KeypointSet) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    // Keep wild coordinates from turning into very long lines.
    let pixels: Vec<(i32, i32)> = keypoints
        .pixel_positions(image.width(), image.height())
        .into_iter()
        .map(|(x, y)| (x.clamp(-w, 2 * w), y.clamp(-h, 2 * h)))
        .collect();

    for &(a, b) in HAND_CONNECTIONS.iter() {
        if let (Some(&start), Some(&end)) = (pixels.get(a), pixels.get(b)) {
            draw_line(image, start, end, CONNECTION_COLOR);
        }
    }

    for &center in &pixels {
        draw_dot(image, center, LANDMARK_RADIUS, LANDMARK_COLOR);
    }
}

fn put_pixel_clipped(image: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < image.width() && (y as u32) < image.height() {
        image.put_pixel(x as u32, y as u32, color);
    }
}

// Bresenham
fn draw_line(image: &mut RgbImage, (x0, y0): (i32, i32), (x1, y1): (i32, i32), color: Rgb<u8>) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = (x0, y0);

    loop {
        put_pixel_clipped(image, x, y, color);
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

fn draw_dot(image: &mut RgbImage, (cx, cy): (i32, i32), radius: i32, color: Rgb<u8>) {
    for y in -radius..=radius {
        for x in -radius..=radius {
            if x * x + y * y <= radius * radius {
                put_pixel_clipped(image, cx + x, cy + y, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mediapipe_bridge::{DetectedHand, HAND_LANDMARK_COUNT};
    use anyhow::{anyhow, Result};

    struct Scripted(Result<Vec<DetectedHand>, String>);

    impl PoseEstimator for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn estimate(&mut self, _image: &RgbImage) -> Result<Vec<DetectedHand>> {
            self.0.clone().map_err(|e| anyhow!(e))
        }
    }

    fn hand(count: usize, x: f32) -> DetectedHand {
        DetectedHand {
            landmarks: vec![Vector3::new(x, 0.5, 0.0); count],
            score: 0.9,
            handedness: Some("Right".to_string()),
        }
    }

    fn extractor(result: Result<Vec<DetectedHand>, String>) -> LandmarkExtractor {
        LandmarkExtractor::new(Box::new(Scripted(result)), PoseOptions::default())
    }

    fn blank_frame() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::new(440, 340))
    }

    #[test]
    fn keypoint_set_rejects_partial_hands() {
        let err = KeypointSet::new(vec![Vector3::zeros(); 20], HAND_LANDMARK_COUNT).unwrap_err();
        assert!(matches!(err, ExtractionError::LandmarkCount { expected: 21, got: 20 }));
    }

    #[test]
    fn configured_landmark_count_is_enforced() {
        let options = PoseOptions {
            max_num_hands: 1,
            landmark_count: 5,
            ..PoseOptions::default()
        };
        let mut extractor =
            LandmarkExtractor::new(Box::new(Scripted(Ok(vec![hand(5, 0.5)]))), options);
        assert_eq!(extractor.options(), &options);

        let (keypoints, _) = extractor.extract(&blank_frame());
        assert_eq!(keypoints.unwrap().len(), 5);
    }

    #[test]
    fn no_hands_returns_unmodified_copy() {
        let frame = blank_frame();
        let (keypoints, annotated) = extractor(Ok(vec![])).extract(&frame);
        assert!(keypoints.is_none());
        assert_eq!(annotated, frame);
    }

    #[test]
    fn detected_hand_is_drawn_on_a_copy() {
        let frame = blank_frame();
        let (keypoints, annotated) = extractor(Ok(vec![hand(21, 0.5)])).extract(&frame);

        assert_eq!(keypoints.unwrap().len(), 21);
        assert_eq!(annotated.width(), 440);
        assert_eq!(annotated.height(), 340);
        assert_ne!(annotated, frame);
        assert_eq!(frame, blank_frame());
    }

    #[test]
    fn only_the_first_hand_is_used() {
        let frame = blank_frame();
        let (keypoints, _) =
            extractor(Ok(vec![hand(21, 0.25), hand(21, 0.75)])).extract(&frame);
        assert!(keypoints.unwrap().points().iter().all(|p| p.x == 0.25));
    }

    #[test]
    fn estimator_failure_returns_input() {
        let frame = blank_frame();
        let (keypoints, annotated) = extractor(Err("boom".to_string())).extract(&frame);
        assert!(keypoints.is_none());
        assert_eq!(annotated, frame);
    }

    #[test]
    fn partial_hand_returns_input() {
        let frame = blank_frame();
        let (keypoints, annotated) = extractor(Ok(vec![hand(5, 0.5)])).extract(&frame);
        assert!(keypoints.is_none());
        assert_eq!(annotated, frame);
    }

    #[test]
    fn non_rgb_input_is_returned_unchanged() {
        let gray = DynamicImage::ImageLuma8(image::GrayImage::new(8, 8));
        let (keypoints, returned) = extractor(Ok(vec![hand(21, 0.5)])).extract(&gray);
        assert!(keypoints.is_none());
        assert_eq!(returned, gray);
        assert!(matches!(returned, DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn skeleton_drawing_clips_out_of_frame_points() {
        let mut image = RgbImage::new(10, 10);
        let keypoints =
            KeypointSet::new(vec![Vector3::new(2.0, -1.0, 0.0); 21], HAND_LANDMARK_COUNT).unwrap();
        draw_skeleton(&mut image, &keypoints);
        assert!(image.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }
}
