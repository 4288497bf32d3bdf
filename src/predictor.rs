//! The churn predictor: owns the loaded classifier and its preprocessor,
//! scores raw batches, and shapes raw predictions into the risk report.

use crate::config::AppConfig;
use crate::error::PredictionError;
use crate::model::{ChurnModel, ModelLoader};
use crate::preprocessor::DataPreprocessor;
use crate::types::prediction::{CustomerPrediction, PredictionReport, RiskLevelThresholds};
use crate::types::record::{FeatureMatrix, RawRecordBatch};
use std::path::Path;
use tracing::info;

/// Raw per-batch output of the classifier, row order matching input order.
#[derive(Debug)]
pub struct PredictionOutcome {
    /// Binary churn labels (0/1).
    pub predictions: Vec<i64>,
    /// Positive-class (churn) probabilities, each in [0, 1].
    pub probabilities: Vec<f64>,
    /// The feature rows actually fed to the classifier, kept for audit.
    pub features: FeatureMatrix,
    /// Pass-through `customerID` values, positionally aligned, if the
    /// column was present in the input.
    pub customer_ids: Option<Vec<Option<String>>>,
}

/// Scores customer batches against a loaded churn classifier.
///
/// The classifier artifact is loaded eagerly at construction and one
/// preprocessor is created for the predictor's lifetime, so label-encoder
/// fit state persists across batches sent to the same instance.
pub struct ChurnPredictor {
    model: Box<dyn ChurnModel>,
    preprocessor: DataPreprocessor,
}

impl ChurnPredictor {
    /// Load the classifier from `path` and build a predictor around it.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, PredictionError> {
        let model = ModelLoader::new()?.load(path)?;
        Ok(Self::with_model(Box::new(model)))
    }

    /// Build a predictor from application configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, PredictionError> {
        let model = ModelLoader::with_threads(config.model.onnx_threads)?.load(&config.model.path)?;
        Ok(Self::with_model(Box::new(model)))
    }

    /// Build a predictor around an already-loaded classifier.
    pub fn with_model(model: Box<dyn ChurnModel>) -> Self {
        Self {
            model,
            preprocessor: DataPreprocessor::new(),
        }
    }

    /// Preprocessor state, for inspection.
    pub fn preprocessor(&self) -> &DataPreprocessor {
        &self.preprocessor
    }

    /// Preprocess and score one batch.
    ///
    /// Preprocessing failures propagate as
    /// [`PredictionError::Preprocessing`] so callers can report them as
    /// rejected input rather than a model fault. Either the whole batch
    /// scores or an error comes back with zero rows.
    pub fn predict(
        &mut self,
        batch: &RawRecordBatch,
    ) -> Result<PredictionOutcome, PredictionError> {
        let customer_ids = batch.customer_ids();
        let features = self.preprocessor.preprocess(batch)?;

        let predictions = self.model.predict(&features)?;
        let probabilities = self.model.predict_proba(&features)?;

        if predictions.len() != batch.len() {
            return Err(PredictionError::CountMismatch {
                what: "predictions",
                expected: batch.len(),
                actual: predictions.len(),
            });
        }
        if probabilities.len() != batch.len() {
            return Err(PredictionError::CountMismatch {
                what: "probabilities",
                expected: batch.len(),
                actual: probabilities.len(),
            });
        }

        info!(rows = batch.len(), "batch scored");

        Ok(PredictionOutcome {
            predictions,
            probabilities,
            features,
            customer_ids,
        })
    }

    /// Score a batch and shape the outcome into the caller-facing report.
    pub fn score(
        &mut self,
        batch: &RawRecordBatch,
        thresholds: &RiskLevelThresholds,
    ) -> Result<PredictionReport, PredictionError> {
        let outcome = self.predict(batch)?;

        let predictions: Vec<CustomerPrediction> = (0..outcome.predictions.len())
            .map(|i| {
                let customer_id = outcome
                    .customer_ids
                    .as_ref()
                    .and_then(|ids| ids[i].clone());
                CustomerPrediction::from_raw(
                    customer_id,
                    outcome.predictions[i],
                    outcome.probabilities[i],
                    thresholds,
                )
            })
            .collect();

        Ok(PredictionReport::new(predictions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PreprocessingError;
    use crate::types::prediction::RiskLevel;
    use crate::types::record::{RawRecord, RawValue};

    /// Fixed-output classifier standing in for a loaded artifact.
    struct StubModel {
        labels: Vec<i64>,
        probabilities: Vec<f64>,
    }

    impl ChurnModel for StubModel {
        fn predict(&mut self, _features: &FeatureMatrix) -> Result<Vec<i64>, PredictionError> {
            Ok(self.labels.clone())
        }

        fn predict_proba(
            &mut self,
            _features: &FeatureMatrix,
        ) -> Result<Vec<f64>, PredictionError> {
            Ok(self.probabilities.clone())
        }
    }

    fn text(s: &str) -> RawValue {
        RawValue::Text(s.to_string())
    }

    fn customer_row(id: Option<&str>, tenure: f64) -> RawRecord {
        let mut row = RawRecord::new();
        if let Some(id) = id {
            row.insert("customerID".into(), text(id));
        }
        row.insert("SeniorCitizen".into(), text("No"));
        row.insert("Partner".into(), text("Yes"));
        row.insert("Dependents".into(), text("No"));
        row.insert("tenure".into(), RawValue::Number(tenure));
        row.insert("OnlineSecurity".into(), text("No"));
        row.insert("OnlineBackup".into(), text("No"));
        row.insert("DeviceProtection".into(), text("No"));
        row.insert("TechSupport".into(), text("No"));
        row.insert("Contract".into(), text("No"));
        row.insert("PaperlessBilling".into(), text("Yes"));
        row.insert("PaymentMethod".into(), text("Electronic check"));
        row.insert("MonthlyCharges".into(), RawValue::Number(70.0));
        row.insert("TotalCharges".into(), RawValue::Number(70.0 * tenure));
        row
    }

    fn predictor_with(labels: Vec<i64>, probabilities: Vec<f64>) -> ChurnPredictor {
        ChurnPredictor::with_model(Box::new(StubModel {
            labels,
            probabilities,
        }))
    }

    #[test]
    fn test_n_rows_in_n_rows_out() {
        let mut predictor = predictor_with(vec![1, 0, 1], vec![0.9, 0.2, 0.8]);
        let batch = RawRecordBatch::new(vec![
            customer_row(None, 1.0),
            customer_row(None, 12.0),
            customer_row(None, 40.0),
        ]);

        let outcome = predictor.predict(&batch).unwrap();
        assert_eq!(outcome.predictions.len(), 3);
        assert_eq!(outcome.probabilities.len(), 3);
        assert_eq!(outcome.features.len(), 3);
    }

    #[test]
    fn test_count_mismatch() {
        let mut predictor = predictor_with(vec![1], vec![0.9, 0.2]);
        let batch = RawRecordBatch::new(vec![
            customer_row(None, 1.0),
            customer_row(None, 12.0),
        ]);

        let err = predictor.predict(&batch).unwrap_err();
        assert!(matches!(
            err,
            PredictionError::CountMismatch {
                what: "predictions",
                expected: 2,
                actual: 1,
            }
        ));
    }

    #[test]
    fn test_preprocessing_error_propagates_distinguishably() {
        let mut predictor = predictor_with(vec![], vec![]);
        let err = predictor.predict(&RawRecordBatch::new(vec![])).unwrap_err();

        assert!(matches!(
            err,
            PredictionError::Preprocessing(PreprocessingError::EmptyBatch)
        ));
    }

    #[test]
    fn test_customer_ids_reattached_positionally() {
        let mut predictor = predictor_with(vec![1, 0], vec![0.8, 0.3]);
        let batch = RawRecordBatch::new(vec![
            customer_row(Some("7590-VHVEG"), 1.0),
            customer_row(Some("5575-GNVDE"), 34.0),
        ]);

        let report = predictor
            .score(&batch, &RiskLevelThresholds::default())
            .unwrap();
        assert_eq!(
            report.predictions[0].customer_id.as_deref(),
            Some("7590-VHVEG")
        );
        assert_eq!(
            report.predictions[1].customer_id.as_deref(),
            Some("5575-GNVDE")
        );
    }

    #[test]
    fn test_report_shaping() {
        // probability 0.80 + label 1 -> High Risk, immediate action;
        // probability 0.60 + label 0 -> Medium Risk, regular monitoring.
        let mut predictor = predictor_with(vec![1, 0], vec![0.80, 0.60]);
        let batch = RawRecordBatch::new(vec![
            customer_row(None, 1.0),
            customer_row(None, 24.0),
        ]);

        let report = predictor
            .score(&batch, &RiskLevelThresholds::default())
            .unwrap();

        let first = &report.predictions[0];
        assert_eq!(first.predicted_class, "Churn Risk");
        assert_eq!(first.risk_level, RiskLevel::High);
        assert_eq!(first.recommendation, "Immediate action required");
        assert_eq!(first.churn_probability, "80.00%");

        let second = &report.predictions[1];
        assert_eq!(second.predicted_class, "Not Churning");
        assert_eq!(second.risk_level, RiskLevel::Medium);
        assert_eq!(second.recommendation, "Regular monitoring");

        let summary = &report.summary;
        assert_eq!(summary.total_customers, 2);
        assert_eq!(
            summary.high_risk_count + summary.medium_risk_count + summary.low_risk_count,
            2
        );
    }

    #[test]
    fn test_encoder_state_persists_across_batches() {
        let mut predictor = predictor_with(vec![1], vec![0.9]);

        predictor
            .predict(&RawRecordBatch::new(vec![customer_row(None, 1.0)]))
            .unwrap();
        assert!(predictor
            .preprocessor()
            .encoder_classes("PaymentMethod")
            .is_some());

        // A later batch with a category outside the fitted set is rejected.
        let mut row = customer_row(None, 2.0);
        row.insert("PaymentMethod".into(), text("Mailed check"));
        let err = predictor
            .predict(&RawRecordBatch::new(vec![row]))
            .unwrap_err();
        assert!(matches!(
            err,
            PredictionError::Preprocessing(PreprocessingError::NewCategories { .. })
        ));
    }
}
