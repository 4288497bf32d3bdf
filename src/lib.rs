//! Churn Prediction Pipeline Library
//!
//! Scores customer batches for churn risk: validates and preprocesses raw
//! tabular records into the fixed feature schema a trained classifier
//! expects, runs ONNX inference, and shapes the output into a risk-labeled
//! report.

pub mod config;
pub mod error;
pub mod model;
pub mod predictor;
pub mod preprocessor;
pub mod types;

pub use config::AppConfig;
pub use error::{PredictionError, PreprocessingError};
pub use model::{ChurnModel, OnnxChurnModel};
pub use predictor::{ChurnPredictor, PredictionOutcome};
pub use preprocessor::DataPreprocessor;
pub use types::{FeatureMatrix, PredictionReport, RawRecordBatch, RiskLevel};
