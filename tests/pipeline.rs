mod common;

use common::*;
use hand_gesture::{vectorize, GestureClassifier, NoGesture, Prediction, Settings};
use image::{DynamicImage, GrayImage};

#[test]
fn frame_with_a_hand_flows_through_to_a_prediction() {
    let settings = Settings::default();
    let frame = DynamicImage::ImageRgb8(blank_frame(&settings));
    let mut extractor = extractor(FakeEstimator::one_hand());

    let (keypoints, annotated) = extractor.extract(&frame);
    let keypoints = keypoints.expect("hand should be detected");
    assert_eq!(keypoints.len(), 21);
    assert_eq!((annotated.width(), annotated.height()), (440, 340));

    let features = vectorize(&keypoints);
    assert_eq!(features.len(), 63);
    assert!(features
        .as_slice()
        .chunks(3)
        .all(|xyz| xyz == [0.5, 0.5, 0.0]));

    let prediction = classifier().classify(&features);
    assert_eq!(prediction.label(), Some("open_palm"));
    assert!(prediction.confidence() > 0.5 && prediction.confidence() <= 1.0);
    assert!(prediction.to_string().starts_with("Prediction: open_palm ("));
}

#[test]
fn frame_without_a_hand_yields_no_keypoints() {
    let settings = Settings::default();
    let frame = DynamicImage::ImageRgb8(blank_frame(&settings));

    let (keypoints, annotated) = extractor(FakeEstimator::no_hands()).extract(&frame);

    assert!(keypoints.is_none());
    assert_eq!(annotated, frame);
}

#[test]
fn invalid_input_comes_back_untouched() {
    let frame = DynamicImage::ImageLuma8(GrayImage::new(0, 0));
    let estimator = FakeEstimator::one_hand();
    let calls = estimator.calls.clone();

    let (keypoints, returned) = extractor(estimator).extract(&frame);

    assert!(keypoints.is_none());
    assert_eq!(returned, frame);
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[test]
fn estimator_errors_are_swallowed() {
    let frame = DynamicImage::ImageRgb8(blank_frame(&Settings::default()));
    let (keypoints, returned) =
        extractor(FakeEstimator::always(Err("helper crashed".to_string()))).extract(&frame);

    assert!(keypoints.is_none());
    assert_eq!(returned, frame);
}

#[test]
fn missing_model_reports_no_gesture() {
    let frame = DynamicImage::ImageRgb8(blank_frame(&Settings::default()));
    let (keypoints, _) = extractor(FakeEstimator::one_hand()).extract(&frame);
    let features = vectorize(&keypoints.unwrap());

    let mut classifier = GestureClassifier::from_path("does/not/exist.json");
    let prediction = classifier.classify(&features);

    assert_eq!(prediction, Prediction::Absent(NoGesture::ModelUnavailable));
    assert_eq!(prediction.to_string(), "No Gesture Detected");
}

#[test]
fn model_loaded_from_disk_classifies_hand_features() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hand_gesture_classifier.json");
    let mut weights = vec![vec![0.0f32; 63]; 2];
    for i in 0..21 {
        weights[0][i * 3 + 1] = 2.0;
        weights[1][i * 3 + 2] = 2.0;
    }
    let model = serde_json::json!({
        "classes": ["point", "wave"],
        "weights": weights,
        "bias": [0.0, 0.0],
    });
    std::fs::write(&path, model.to_string()).unwrap();

    let mut classifier = GestureClassifier::from_path(&path);
    assert!(classifier.is_available());

    let frame = DynamicImage::ImageRgb8(blank_frame(&Settings::default()));
    let (keypoints, _) = extractor(FakeEstimator::one_hand()).extract(&frame);
    let prediction = classifier.classify(&vectorize(&keypoints.unwrap()));

    assert_eq!(prediction.label(), Some("point"));
    assert_eq!(classifier.last_prediction(), &prediction);
}
