//! Error types for the churn prediction pipeline.
//!
//! Two kinds, never conflated: [`PreprocessingError`] is a client-input fault
//! (bad upload, schema drift, unseen categories) and should be reported as a
//! rejected request; [`PredictionError`] is a server/operational fault
//! (artifact load failure, classifier output inconsistency).

use std::path::PathBuf;
use thiserror::Error;

/// Failures while validating and transforming a raw batch into features.
#[derive(Debug, Error)]
pub enum PreprocessingError {
    /// Input was not a sequence of column-named rows.
    #[error("input must be a tabular batch of rows")]
    NotTabular,

    /// One or more required columns are absent from the batch.
    #[error("missing required columns: {}", columns.join(", "))]
    MissingColumns { columns: Vec<String> },

    /// The batch contains zero rows.
    #[error("input batch contains no rows")]
    EmptyBatch,

    /// A required column is null in every row.
    #[error("column {column} is null in every row")]
    AllNullColumn { column: String },

    /// A numeric column contains a value that cannot be read as a number.
    #[error("column {column} contains non-numeric values")]
    NonNumeric { column: String },

    /// A previously fitted encoder saw categories outside its known set.
    #[error("new categories found in column {column}: {}", unseen.join(", "))]
    NewCategories { column: String, unseen: Vec<String> },

    /// A numeric column contains an infinite value.
    #[error("column {column} contains infinite values")]
    InfiniteValues { column: String },
}

/// Failures while loading the classifier artifact or running inference.
#[derive(Debug, Error)]
pub enum PredictionError {
    /// No file at the configured model path.
    #[error("model file not found at {}", path.display())]
    ModelNotFound { path: PathBuf },

    /// The ONNX runtime itself failed to initialize.
    #[error("failed to initialize model runtime: {0}")]
    RuntimeInit(ort::Error),

    /// The artifact could not be deserialized into a session.
    #[error("failed to load model from {}: {source}", path.display())]
    ModelLoad {
        path: PathBuf,
        source: ort::Error,
    },

    /// The loaded model does not expose a required output.
    #[error("model does not expose a {capability} output")]
    MissingCapability { capability: &'static str },

    /// Input preprocessing failed; kept as a distinct variant so callers
    /// can tell client-input faults from model faults.
    #[error(transparent)]
    Preprocessing(#[from] PreprocessingError),

    /// Classifier inference itself failed.
    #[error("classifier inference failed: {0}")]
    Inference(#[from] ort::Error),

    /// A model output had a shape the pipeline cannot interpret.
    #[error("unsupported format for model output {output}")]
    OutputFormat { output: String },

    /// Prediction or probability count does not match the input row count.
    #[error("count mismatch: model returned {actual} {what} for {expected} rows")]
    CountMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
}
