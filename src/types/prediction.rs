//! Prediction results, risk classification, and the batch report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Risk tier derived from churn probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    #[serde(rename = "High Risk")]
    High,
    #[serde(rename = "Medium Risk")]
    Medium,
    #[serde(rename = "Low Risk")]
    Low,
}

impl RiskLevel {
    /// Classify a churn probability against the configured thresholds.
    ///
    /// Independent of the predicted label: the classifier's decision boundary
    /// need not sit at 0.5, so tier and label can disagree.
    pub fn from_probability(probability: f64, thresholds: &RiskLevelThresholds) -> Self {
        if probability >= thresholds.high {
            RiskLevel::High
        } else if probability >= thresholds.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::High => "High Risk",
            RiskLevel::Medium => "Medium Risk",
            RiskLevel::Low => "Low Risk",
        }
    }

    /// Recommendation text; action items are gated on the predicted label
    /// actually being churn.
    pub fn recommendation(&self, predicted_churn: bool) -> &'static str {
        match (self, predicted_churn) {
            (RiskLevel::High, true) => "Immediate action required",
            (RiskLevel::Medium, true) => "Monitor closely",
            _ => "Regular monitoring",
        }
    }
}

/// Configurable risk tier thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskLevelThresholds {
    pub high: f64,
    pub medium: f64,
}

impl Default for RiskLevelThresholds {
    fn default() -> Self {
        Self {
            high: 0.75,
            medium: 0.50,
        }
    }
}

/// Per-customer scored result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerPrediction {
    #[serde(rename = "customerID", skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    pub predicted_class: String,
    /// Rendered as a percentage string, e.g. "80.00%".
    pub churn_probability: String,
    pub risk_level: RiskLevel,
    pub recommendation: String,
}

impl CustomerPrediction {
    /// Build one result row from the classifier's raw label and probability.
    pub fn from_raw(
        customer_id: Option<String>,
        label: i64,
        probability: f64,
        thresholds: &RiskLevelThresholds,
    ) -> Self {
        let churn = label == 1;
        let risk_level = RiskLevel::from_probability(probability, thresholds);
        Self {
            customer_id,
            predicted_class: if churn { "Churn Risk" } else { "Not Churning" }.to_string(),
            churn_probability: format!("{:.2}%", probability * 100.0),
            risk_level,
            recommendation: risk_level.recommendation(churn).to_string(),
        }
    }
}

/// Counts over one scored batch; tier counts always sum to `total_customers`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_customers: usize,
    pub high_risk_count: usize,
    pub medium_risk_count: usize,
    pub low_risk_count: usize,
}

impl BatchSummary {
    pub fn from_predictions(predictions: &[CustomerPrediction]) -> Self {
        let mut summary = Self {
            total_customers: predictions.len(),
            ..Self::default()
        };
        for prediction in predictions {
            match prediction.risk_level {
                RiskLevel::High => summary.high_risk_count += 1,
                RiskLevel::Medium => summary.medium_risk_count += 1,
                RiskLevel::Low => summary.low_risk_count += 1,
            }
        }
        summary
    }
}

/// Full result set for one scored batch, row order matching input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionReport {
    pub report_id: String,
    pub generated_at: DateTime<Utc>,
    pub predictions: Vec<CustomerPrediction>,
    pub summary: BatchSummary,
}

impl PredictionReport {
    pub fn new(predictions: Vec<CustomerPrediction>) -> Self {
        let summary = BatchSummary::from_predictions(&predictions);
        Self {
            report_id: uuid::Uuid::new_v4().to_string(),
            generated_at: Utc::now(),
            predictions,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_boundaries() {
        let thresholds = RiskLevelThresholds::default();

        assert_eq!(
            RiskLevel::from_probability(0.75, &thresholds),
            RiskLevel::High
        );
        assert_eq!(
            RiskLevel::from_probability(0.74, &thresholds),
            RiskLevel::Medium
        );
        assert_eq!(
            RiskLevel::from_probability(0.50, &thresholds),
            RiskLevel::Medium
        );
        assert_eq!(
            RiskLevel::from_probability(0.49, &thresholds),
            RiskLevel::Low
        );
    }

    #[test]
    fn test_recommendation_gated_on_label() {
        // High probability but model said "no churn": tier stays High,
        // recommendation falls back to regular monitoring.
        assert_eq!(
            RiskLevel::High.recommendation(true),
            "Immediate action required"
        );
        assert_eq!(RiskLevel::High.recommendation(false), "Regular monitoring");
        assert_eq!(RiskLevel::Medium.recommendation(true), "Monitor closely");
        assert_eq!(
            RiskLevel::Medium.recommendation(false),
            "Regular monitoring"
        );
        assert_eq!(RiskLevel::Low.recommendation(true), "Regular monitoring");
    }

    #[test]
    fn test_prediction_formatting() {
        let thresholds = RiskLevelThresholds::default();
        let prediction =
            CustomerPrediction::from_raw(Some("0001-TEST".to_string()), 1, 0.8, &thresholds);

        assert_eq!(prediction.predicted_class, "Churn Risk");
        assert_eq!(prediction.churn_probability, "80.00%");
        assert_eq!(prediction.risk_level, RiskLevel::High);
        assert_eq!(prediction.recommendation, "Immediate action required");
    }

    #[test]
    fn test_label_and_tier_can_disagree() {
        let thresholds = RiskLevelThresholds::default();
        let prediction = CustomerPrediction::from_raw(None, 0, 0.60, &thresholds);

        assert_eq!(prediction.predicted_class, "Not Churning");
        assert_eq!(prediction.risk_level, RiskLevel::Medium);
        assert_eq!(prediction.recommendation, "Regular monitoring");
    }

    #[test]
    fn test_summary_counts_sum_to_total() {
        let thresholds = RiskLevelThresholds::default();
        let predictions = vec![
            CustomerPrediction::from_raw(None, 1, 0.9, &thresholds),
            CustomerPrediction::from_raw(None, 1, 0.6, &thresholds),
            CustomerPrediction::from_raw(None, 0, 0.2, &thresholds),
            CustomerPrediction::from_raw(None, 0, 0.1, &thresholds),
        ];

        let summary = BatchSummary::from_predictions(&predictions);
        assert_eq!(summary.total_customers, 4);
        assert_eq!(summary.high_risk_count, 1);
        assert_eq!(summary.medium_risk_count, 1);
        assert_eq!(summary.low_risk_count, 2);
        assert_eq!(
            summary.high_risk_count + summary.medium_risk_count + summary.low_risk_count,
            summary.total_customers
        );
    }

    #[test]
    fn test_report_serialization() {
        let thresholds = RiskLevelThresholds::default();
        let report = PredictionReport::new(vec![CustomerPrediction::from_raw(
            Some("7590-VHVEG".to_string()),
            1,
            0.8123,
            &thresholds,
        )]);

        let json = serde_json::to_string(&report).unwrap();
        let deserialized: PredictionReport = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.predictions.len(), 1);
        assert_eq!(deserialized.predictions[0].churn_probability, "81.23%");
        assert!(json.contains("\"High Risk\""));
    }
}
