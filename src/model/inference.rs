//! Classifier abstraction and the ONNX-backed implementation.

use crate::error::PredictionError;
use crate::types::record::FeatureMatrix;
use ort::memory::Allocator;
use ort::session::Session;
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType};
use tracing::debug;

/// The capability pair the pipeline requires of a loaded classifier:
/// binary labels and positive-class (churn) probabilities, one per input row.
pub trait ChurnModel {
    fn predict(&mut self, features: &FeatureMatrix) -> Result<Vec<i64>, PredictionError>;
    fn predict_proba(&mut self, features: &FeatureMatrix) -> Result<Vec<f64>, PredictionError>;
}

/// Churn classifier backed by an ONNX Runtime session.
#[derive(Debug)]
pub struct OnnxChurnModel {
    session: Session,
    input_name: String,
    label_output: String,
    prob_output: String,
}

impl OnnxChurnModel {
    pub fn new(
        session: Session,
        input_name: String,
        label_output: String,
        prob_output: String,
    ) -> Self {
        Self {
            session,
            input_name,
            label_output,
            prob_output,
        }
    }

    fn input_tensor(features: &FeatureMatrix) -> Result<ort::value::Tensor<f32>, PredictionError> {
        use ort::value::Tensor;

        let shape = vec![features.len() as i64, FeatureMatrix::width() as i64];
        let tensor = Tensor::from_array((shape, features.to_f32_buffer()))?;
        Ok(tensor)
    }
}

impl ChurnModel for OnnxChurnModel {
    fn predict(&mut self, features: &FeatureMatrix) -> Result<Vec<i64>, PredictionError> {
        let n = features.len();
        let input_tensor = Self::input_tensor(features)?;
        let outputs = self
            .session
            .run(ort::inputs![&self.input_name => input_tensor])?;

        let output = outputs
            .get(&self.label_output)
            .ok_or_else(|| PredictionError::OutputFormat {
                output: self.label_output.clone(),
            })?;

        if let Ok((shape, data)) = output.try_extract_tensor::<i64>() {
            let dims: Vec<i64> = shape.iter().copied().collect();
            if let Some(labels) = labels_from_tensor(&dims, data, n) {
                debug!(rows = n, "extracted labels from i64 tensor");
                return Ok(labels);
            }
        }

        // Some exporters emit labels as floats.
        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            let dims: Vec<i64> = shape.iter().copied().collect();
            let as_i64: Vec<i64> = data.iter().map(|&v| v.round() as i64).collect();
            if let Some(labels) = labels_from_tensor(&dims, &as_i64, n) {
                debug!(rows = n, "extracted labels from f32 tensor");
                return Ok(labels);
            }
        }

        Err(PredictionError::OutputFormat {
            output: self.label_output.clone(),
        })
    }

    fn predict_proba(&mut self, features: &FeatureMatrix) -> Result<Vec<f64>, PredictionError> {
        let n = features.len();
        let input_tensor = Self::input_tensor(features)?;
        let outputs = self
            .session
            .run(ort::inputs![&self.input_name => input_tensor])?;

        let output = outputs
            .get(&self.prob_output)
            .ok_or_else(|| PredictionError::OutputFormat {
                output: self.prob_output.clone(),
            })?;

        // Tensor format (XGBoost, RandomForest exports): [n, 2] or [n, 1].
        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            let dims: Vec<i64> = shape.iter().copied().collect();
            if let Some(probs) = positive_class_probs(&dims, data, n) {
                debug!(rows = n, "extracted probabilities from tensor");
                return Ok(probs);
            }
        }

        // seq(map(int64, float32)) format (CatBoost, LightGBM exports).
        let dtype = output.dtype();
        if DynSequenceValueType::can_downcast(&dtype) {
            let allocator = Allocator::default();
            let sequence = output
                .downcast_ref::<DynSequenceValueType>()
                .map_err(|_| PredictionError::OutputFormat {
                    output: self.prob_output.clone(),
                })?;
            let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;

            if maps.len() == n {
                let mut probs = Vec::with_capacity(n);
                for map_value in &maps {
                    let kv_pairs = map_value.try_extract_key_values::<i64, f32>()?;
                    let churn_prob = kv_pairs
                        .iter()
                        .find(|(class_id, _)| *class_id == 1)
                        .map(|(_, prob)| *prob as f64)
                        .or_else(|| {
                            kv_pairs
                                .iter()
                                .find(|(class_id, _)| *class_id == 0)
                                .map(|(_, prob)| 1.0 - *prob as f64)
                        })
                        .ok_or_else(|| PredictionError::OutputFormat {
                            output: self.prob_output.clone(),
                        })?;
                    probs.push(churn_prob);
                }
                debug!(rows = n, "extracted probabilities from seq(map)");
                return Ok(probs);
            }
        }

        Err(PredictionError::OutputFormat {
            output: self.prob_output.clone(),
        })
    }
}

/// Read per-row labels from a `[n]` or `[n, 1]` tensor.
fn labels_from_tensor(dims: &[i64], data: &[i64], n: usize) -> Option<Vec<i64>> {
    match dims {
        [rows] if *rows as usize == n => Some(data.to_vec()),
        [rows, 1] if *rows as usize == n => Some(data.to_vec()),
        _ => None,
    }
}

/// Read per-row positive-class probabilities from a `[n, classes]` or `[n]`
/// tensor.
fn positive_class_probs(dims: &[i64], data: &[f32], n: usize) -> Option<Vec<f64>> {
    match dims {
        [rows, classes] if *rows as usize == n && *classes >= 2 => {
            let c = *classes as usize;
            Some((0..n).map(|i| data[i * c + 1] as f64).collect())
        }
        [rows, 1] if *rows as usize == n => {
            Some(data.iter().take(n).map(|&v| v as f64).collect())
        }
        [rows] if *rows as usize == n => Some(data.iter().map(|&v| v as f64).collect()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_class_from_two_class_tensor() {
        let data = [0.9_f32, 0.1, 0.25, 0.75];
        let probs = positive_class_probs(&[2, 2], &data, 2).unwrap();
        assert!((probs[0] - 0.1).abs() < 1e-6);
        assert!((probs[1] - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_single_column_tensor() {
        let data = [0.5_f32, 0.25];
        let probs = positive_class_probs(&[2, 1], &data, 2).unwrap();
        assert_eq!(probs, vec![0.5, 0.25]);
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let data = [0.5_f32, 0.25];
        assert!(positive_class_probs(&[3, 2], &data, 2).is_none());
    }

    #[test]
    fn test_labels_from_flat_and_column_tensors() {
        assert_eq!(labels_from_tensor(&[3], &[1, 0, 1], 3), Some(vec![1, 0, 1]));
        assert_eq!(labels_from_tensor(&[2, 1], &[0, 1], 2), Some(vec![0, 1]));
        assert_eq!(labels_from_tensor(&[2, 2], &[0, 1, 1, 0], 2), None);
    }
}
