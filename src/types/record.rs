//! Raw customer records and the fixed feature schema.

use crate::error::PreprocessingError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Optional pass-through identifier column; never part of the feature schema.
pub const CUSTOMER_ID_COLUMN: &str = "customerID";

/// Required input columns, in the exact order the classifier expects.
pub const REQUIRED_COLUMNS: [&str; 13] = [
    "SeniorCitizen",
    "Partner",
    "Dependents",
    "tenure",
    "OnlineSecurity",
    "OnlineBackup",
    "DeviceProtection",
    "TechSupport",
    "Contract",
    "PaperlessBilling",
    "PaymentMethod",
    "MonthlyCharges",
    "TotalCharges",
];

/// Columns mapped as "Yes" -> 1, anything else -> 0.
///
/// Any non-"Yes" value collapses to 0, including multi-valued categories like
/// "No internet service". The trained model expects exactly this encoding.
pub const BINARY_YES_NO_COLUMNS: [&str; 9] = [
    "SeniorCitizen",
    "Partner",
    "Dependents",
    "OnlineSecurity",
    "OnlineBackup",
    "DeviceProtection",
    "TechSupport",
    "Contract",
    "PaperlessBilling",
];

/// Multi-category columns encoded via a fitted label encoder.
pub const MULTI_CATEGORY_COLUMNS: [&str; 1] = ["PaymentMethod"];

/// Numeric columns standardized per batch.
pub const NUMERIC_COLUMNS: [&str; 3] = ["tenure", "MonthlyCharges", "TotalCharges"];

/// A raw scalar cell as it arrives from an upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Text(String),
    Number(f64),
    Null,
}

impl RawValue {
    /// Interpret the value as a number, parsing text if necessary.
    ///
    /// NaN (literal or parsed from text) reads as missing, the way
    /// dataframe coercion treats it; infinities pass through so the
    /// infinite-value guard can reject them by name.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawValue::Number(n) => (!n.is_nan()).then_some(*n),
            RawValue::Text(s) => s.trim().parse::<f64>().ok().filter(|v| !v.is_nan()),
            RawValue::Null => None,
        }
    }

    /// Category string for label encoding and mode imputation.
    pub fn as_category(&self) -> Option<String> {
        match self {
            RawValue::Text(s) => Some(s.clone()),
            RawValue::Number(n) => Some(n.to_string()),
            RawValue::Null => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }

    /// Parse a delimited-file field: empty -> null, numeric text -> number.
    pub fn from_csv_field(field: &str) -> Self {
        let trimmed = field.trim();
        if trimmed.is_empty() {
            return RawValue::Null;
        }
        match trimmed.parse::<f64>() {
            Ok(n) => RawValue::Number(n),
            Err(_) => RawValue::Text(trimmed.to_string()),
        }
    }
}

/// One uploaded row: column name -> raw scalar.
pub type RawRecord = HashMap<String, RawValue>;

/// An ordered batch of raw rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRecordBatch {
    rows: Vec<RawRecord>,
}

impl RawRecordBatch {
    pub fn new(rows: Vec<RawRecord>) -> Self {
        Self { rows }
    }

    /// Build a batch from a parsed JSON value.
    ///
    /// Anything other than an array of objects fails structural validation.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, PreprocessingError> {
        let array = value.as_array().ok_or(PreprocessingError::NotTabular)?;
        let mut rows = Vec::with_capacity(array.len());
        for item in array {
            let object = item.as_object().ok_or(PreprocessingError::NotTabular)?;
            let mut row = RawRecord::with_capacity(object.len());
            for (key, cell) in object {
                let value = match cell {
                    serde_json::Value::Null => RawValue::Null,
                    serde_json::Value::Number(n) => {
                        RawValue::Number(n.as_f64().ok_or(PreprocessingError::NotTabular)?)
                    }
                    serde_json::Value::String(s) => RawValue::Text(s.clone()),
                    serde_json::Value::Bool(b) => RawValue::Text(b.to_string()),
                    _ => return Err(PreprocessingError::NotTabular),
                };
                row.insert(key.clone(), value);
            }
            rows.push(row);
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[RawRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Columns observed anywhere in the batch.
    pub fn present_columns(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for row in &self.rows {
            for key in row.keys() {
                if !seen.contains(&key.as_str()) {
                    seen.push(key.as_str());
                }
            }
        }
        seen
    }

    /// Per-row `customerID` values, if the column is present at all.
    pub fn customer_ids(&self) -> Option<Vec<Option<String>>> {
        let present = self
            .rows
            .iter()
            .any(|row| row.contains_key(CUSTOMER_ID_COLUMN));
        if !present {
            return None;
        }
        Some(
            self.rows
                .iter()
                .map(|row| row.get(CUSTOMER_ID_COLUMN).and_then(RawValue::as_category))
                .collect(),
        )
    }
}

/// Fully numeric output of preprocessing: one row per input row, columns in
/// [`REQUIRED_COLUMNS`] order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureMatrix {
    rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    pub fn new(rows: Vec<Vec<f64>>) -> Self {
        Self { rows }
    }

    pub fn columns() -> &'static [&'static str] {
        &REQUIRED_COLUMNS
    }

    pub fn width() -> usize {
        REQUIRED_COLUMNS.len()
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row-major f32 buffer for the ONNX input tensor.
    pub fn to_f32_buffer(&self) -> Vec<f32> {
        self.rows
            .iter()
            .flat_map(|row| row.iter().map(|&v| v as f32))
            .collect()
    }
}
