//! Type definitions for the churn prediction pipeline

pub mod prediction;
pub mod record;

pub use prediction::{
    BatchSummary, CustomerPrediction, PredictionReport, RiskLevel, RiskLevelThresholds,
};
pub use record::{FeatureMatrix, RawRecord, RawRecordBatch, RawValue, REQUIRED_COLUMNS};
