//! ONNX classifier artifact loading.

use crate::error::PredictionError;
use crate::model::inference::OnnxChurnModel;
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::Path;
use tracing::info;

/// Loader for the serialized churn classifier.
pub struct ModelLoader {
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a loader with default settings (1 inference thread).
    pub fn new() -> Result<Self, PredictionError> {
        Self::with_threads(1)
    }

    /// Create a loader with a specific ONNX thread count.
    pub fn with_threads(onnx_threads: usize) -> Result<Self, PredictionError> {
        ort::init().commit().map_err(PredictionError::RuntimeInit)?;
        Ok(Self { onnx_threads })
    }

    /// Load the classifier artifact from a file.
    ///
    /// Fails if the path does not exist, the artifact does not deserialize,
    /// or the session is missing either the label or the probability output.
    /// Load failure is fatal to the predictor being constructed.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<OnnxChurnModel, PredictionError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(PredictionError::ModelNotFound {
                path: path.to_path_buf(),
            });
        }

        info!(path = %path.display(), threads = self.onnx_threads, "loading churn model");

        // Builder errors belong to the load phase, not inference.
        let session = Session::builder()
            .and_then(|builder| builder.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|builder| builder.with_intra_threads(self.onnx_threads))
            .and_then(|builder| builder.commit_from_file(path))
            .map_err(|source| PredictionError::ModelLoad {
                path: path.to_path_buf(),
                source,
            })?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        // The predict / predict-probability capability pair maps to a label
        // output and a probabilities output on the exported classifier.
        let label_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("label"))
            .map(|o| o.name.clone())
            .ok_or(PredictionError::MissingCapability {
                capability: "predict (label)",
            })?;

        let prob_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .map(|o| o.name.clone())
            .ok_or(PredictionError::MissingCapability {
                capability: "predict-probability",
            })?;

        info!(
            input = %input_name,
            label_output = %label_output,
            prob_output = %prob_output,
            "churn model loaded"
        );

        Ok(OnnxChurnModel::new(
            session,
            input_name,
            label_output,
            prob_output,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no_such_model.onnx");

        let loader = ModelLoader::new().unwrap();
        let err = loader.load(&path).unwrap_err();
        assert!(matches!(err, PredictionError::ModelNotFound { .. }));
    }

    #[test]
    fn test_garbage_artifact_fails_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.onnx");
        std::fs::write(&path, b"not an onnx model").unwrap();

        let loader = ModelLoader::new().unwrap();
        let err = loader.load(&path).unwrap_err();
        assert!(matches!(err, PredictionError::ModelLoad { .. }));
        // Message names the load phase, not inference.
        assert!(err.to_string().starts_with("failed to load model from"));
    }
}
