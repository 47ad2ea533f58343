// src/classifier.rs - Gesture classification from hand feature vectors
use crate::error::ModelError;
use crate::features::FeatureVector;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, error, info};

/// Why a tick produced no gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoGesture {
    NoHand,
    ModelUnavailable,
    ClassificationFailed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Prediction {
    Gesture { label: String, confidence: f32 },
    Absent(NoGesture),
}

impl Prediction {
    pub fn label(&self) -> Option<&str> {
        match self {
            Prediction::Gesture { label, .. } => Some(label),
            Prediction::Absent(_) => None,
        }
    }

    pub fn confidence(&self) -> f32 {
        match self {
            Prediction::Gesture { confidence, .. } => *confidence,
            Prediction::Absent(_) => 0.0,
        }
    }

    pub fn is_gesture(&self) -> bool {
        matches!(self, Prediction::Gesture { .. })
    }
}

/// Text shown in the prediction panel.
impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prediction::Gesture { label, confidence } => {
                write!(f, "Prediction: {} ({:.2})", label, confidence)
            }
            Prediction::Absent(_) => write!(f, "No Gesture Detected"),
        }
    }
}

/// A trained gesture model.
///
/// Both methods take a batch with one feature vector per row.
pub trait GestureModel: Send {
    fn input_width(&self) -> usize;

    fn predict(&self, batch: &DMatrix<f32>) -> Result<Vec<String>, ModelError>;

    /// Per-class probabilities, one row per sample.
    fn predict_proba(&self, batch: &DMatrix<f32>) -> Result<DMatrix<f32>, ModelError>;
}

/// Serialized form of a multinomial logistic-regression model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftmaxModelFile {
    pub classes: Vec<String>,
    pub weights: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
}

/// Linear softmax classifier: `softmax(x · Wᵀ + b)`.
#[derive(Debug, Clone)]
pub struct SoftmaxModel {
    classes: Vec<String>,
    // classes × input_width
    weights: DMatrix<f32>,
    bias: DVector<f32>,
}

impl SoftmaxModel {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ModelError::NotFound(path.to_path_buf()));
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: SoftmaxModelFile = serde_json::from_str(&contents)?;
        Self::from_file(file)
    }

    pub fn from_file(file: SoftmaxModelFile) -> Result<Self, ModelError> {
        let n_classes = file.classes.len();
        if n_classes == 0 {
            return Err(ModelError::Malformed("model has no classes".to_string()));
        }
        if file.weights.len() != n_classes || file.bias.len() != n_classes {
            return Err(ModelError::Malformed(format!(
                "{} classes but {} weight rows and {} biases",
                n_classes,
                file.weights.len(),
                file.bias.len()
            )));
        }

        let width = file.weights[0].len();
        if width == 0 || file.weights.iter().any(|row| row.len() != width) {
            return Err(ModelError::Malformed(
                "weight rows must be non-empty and of equal length".to_string(),
            ));
        }

        let flat: Vec<f32> = file.weights.iter().flatten().copied().collect();
        Ok(Self {
            classes: file.classes,
            weights: DMatrix::from_row_slice(n_classes, width, &flat),
            bias: DVector::from_vec(file.bias),
        })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    fn check_width(&self, batch: &DMatrix<f32>) -> Result<(), ModelError> {
        if batch.ncols() != self.input_width() {
            return Err(ModelError::ShapeMismatch {
                expected: self.input_width(),
                got: batch.ncols(),
            });
        }
        Ok(())
    }
}

impl GestureModel for SoftmaxModel {
    fn input_width(&self) -> usize {
        self.weights.ncols()
    }

    fn predict(&self, batch: &DMatrix<f32>) -> Result<Vec<String>, ModelError> {
        let proba = self.predict_proba(batch)?;
        Ok(proba
            .row_iter()
            .map(|row| self.classes[argmax(row.iter().copied())].clone())
            .collect())
    }

    fn predict_proba(&self, batch: &DMatrix<f32>) -> Result<DMatrix<f32>, ModelError> {
        self.check_width(batch)?;

        let mut scores = batch * self.weights.transpose();
        for mut row in scores.row_iter_mut() {
            for (value, b) in row.iter_mut().zip(self.bias.iter()) {
                *value += b;
            }
            // Shift by the max for numerical stability.
            let max = row.max();
            row.apply(|v| *v = (*v - max).exp());
            let sum = row.sum();
            row /= sum;
        }
        Ok(scores)
    }
}

/// First index of the maximum, like numpy's argmax.
fn argmax(values: impl Iterator<Item = f32>) -> usize {
    let mut best = (0, f32::NEG_INFINITY);
    for (i, v) in values.enumerate() {
        if v > best.1 {
            best = (i, v);
        }
    }
    best.0
}

pub struct GestureClassifier {
    model: Option<Box<dyn GestureModel>>,
    last: Prediction,
}

impl GestureClassifier {
    pub fn new(model: Box<dyn GestureModel>) -> Self {
        info!(input_width = model.input_width(), "GestureClassifier initialized successfully");
        Self {
            model: Some(model),
            last: Prediction::Absent(NoGesture::NoHand),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            model: None,
            last: Prediction::Absent(NoGesture::NoHand),
        }
    }

    /// Loads the model file, falling back to the unavailable state on any error.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match SoftmaxModel::load(path) {
            Ok(model) => {
                info!(
                    path = %path.display(),
                    classes = model.classes().len(),
                    "Model loaded successfully"
                );
                Self::new(Box::new(model))
            }
            Err(e) => {
                error!("Model not loaded in GestureClassifier: {}", e);
                Self::unavailable()
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.model.is_some()
    }

    pub fn classify(&mut self, features: &FeatureVector) -> Prediction {
        let Some(model) = self.model.as_ref() else {
            debug!("Model not loaded, cannot make predictions");
            return Prediction::Absent(NoGesture::ModelUnavailable);
        };

        match Self::run(&**model, features) {
            Ok(prediction) => {
                debug!("{}", prediction);
                self.last = prediction.clone();
                prediction
            }
            Err(e) => {
                error!(features = features.len(), "Error in prediction: {}", e);
                Prediction::Absent(NoGesture::ClassificationFailed)
            }
        }
    }

    fn run(model: &dyn GestureModel, features: &FeatureVector) -> Result<Prediction, ModelError> {
        if features.len() != model.input_width() {
            return Err(ModelError::ShapeMismatch {
                expected: model.input_width(),
                got: features.len(),
            });
        }

        let batch = features.to_row();
        let label = model
            .predict(&batch)?
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::Malformed("model returned no label".to_string()))?;
        let proba = model.predict_proba(&batch)?;
        if proba.nrows() == 0 || proba.ncols() == 0 {
            return Err(ModelError::Malformed("model returned no probabilities".to_string()));
        }
        let confidence = proba.row(0).max();

        Ok(Prediction::Gesture { label, confidence })
    }

    /// Most recent successful prediction.
    pub fn last_prediction(&self) -> &Prediction {
        &self.last
    }
}
