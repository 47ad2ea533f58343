// src/features.rs
use crate::tracking::KeypointSet;
use nalgebra::DMatrix;

/// Flat `[x0, y0, z0, x1, y1, z1, ...]` layout consumed by the classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f32>);

impl FeatureVector {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Single-row batch, `1 × len`.
    pub fn to_row(&self) -> DMatrix<f32> {
        DMatrix::from_row_slice(1, self.0.len(), &self.0)
    }
}

impl From<Vec<f32>> for FeatureVector {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

pub fn vectorize(keypoints: &KeypointSet) -> FeatureVector {
    FeatureVector(
        keypoints
            .points()
            .iter()
            .flat_map(|p| [p.x, p.y, p.z])
            .collect(),
    )
}
