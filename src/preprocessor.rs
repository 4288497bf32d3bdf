//! Batch preprocessing: validation, cleaning, encoding, and scaling of raw
//! customer records into the feature matrix the classifier expects.
//!
//! Imputation and standardization statistics are computed fresh on every
//! batch, matching the training-side preprocessing. Label-encoder state is the
//! one thing that persists: the first batch a [`DataPreprocessor`] sees fits
//! the encoder for each multi-category column, and every later batch on the
//! same instance must stay inside the fitted category set.

use crate::error::PreprocessingError;
use crate::types::record::{
    FeatureMatrix, RawRecordBatch, RawValue, BINARY_YES_NO_COLUMNS, MULTI_CATEGORY_COLUMNS,
    NUMERIC_COLUMNS, REQUIRED_COLUMNS,
};
use std::collections::HashMap;
use tracing::{debug, info};

/// A fitted category -> integer mapping for one categorical column.
///
/// Classes are the sorted distinct values seen at fit time; a value encodes to
/// its index in that sorted list.
#[derive(Debug, Clone)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Fit over the distinct values of one batch.
    pub fn fit(values: &[String]) -> Self {
        let mut classes: Vec<String> = values.to_vec();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    /// Encode a value, or `None` if it was not seen at fit time.
    pub fn transform(&self, value: &str) -> Option<usize> {
        self.classes.binary_search_by(|c| c.as_str().cmp(value)).ok()
    }

    /// The fitted category set, sorted.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}

/// Transforms raw uploaded batches into the fixed numeric feature schema.
///
/// Holds mutable encoder state across calls; share one instance between
/// threads only behind external synchronization, or give each request its own.
#[derive(Debug, Default)]
pub struct DataPreprocessor {
    label_encoders: HashMap<String, LabelEncoder>,
}

impl DataPreprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fitted classes for a multi-category column, if that column has been
    /// seen on this instance.
    pub fn encoder_classes(&self, column: &str) -> Option<&[String]> {
        self.label_encoders.get(column).map(LabelEncoder::classes)
    }

    /// Drop all fitted encoder state; the next batch fits from scratch.
    pub fn reset_encoders(&mut self) {
        self.label_encoders.clear();
    }

    /// Validate, clean, encode, and scale a batch.
    ///
    /// Never drops rows; output row order matches input order and output
    /// columns are exactly `REQUIRED_COLUMNS` in order.
    pub fn preprocess(
        &mut self,
        batch: &RawRecordBatch,
    ) -> Result<FeatureMatrix, PreprocessingError> {
        info!(rows = batch.len(), "starting preprocessing");

        if batch.is_empty() {
            return Err(PreprocessingError::EmptyBatch);
        }
        self.validate_schema(batch)?;

        // Restrict to the required columns, column-major.
        let mut columns: Vec<Vec<RawValue>> = REQUIRED_COLUMNS
            .iter()
            .map(|&name| {
                batch
                    .rows()
                    .iter()
                    .map(|row| row.get(name).cloned().unwrap_or(RawValue::Null))
                    .collect()
            })
            .collect();

        for (index, name) in REQUIRED_COLUMNS.iter().enumerate() {
            if columns[index].iter().all(RawValue::is_null) {
                return Err(PreprocessingError::AllNullColumn {
                    column: name.to_string(),
                });
            }
        }

        // TotalCharges arrives as text in Telco exports; unparseable values
        // become missing and are picked up by imputation below.
        let total_charges = column_index("TotalCharges");
        for value in &mut columns[total_charges] {
            if !value.is_null() {
                *value = match value.as_f64() {
                    Some(n) => RawValue::Number(n),
                    None => RawValue::Null,
                };
            }
        }

        let mut encoded: HashMap<&'static str, Vec<f64>> = HashMap::new();

        for &name in BINARY_YES_NO_COLUMNS
            .iter()
            .chain(MULTI_CATEGORY_COLUMNS.iter())
        {
            impute_categorical(&mut columns[column_index(name)], name);
        }

        for &name in NUMERIC_COLUMNS.iter() {
            let values = numeric_column(&columns[column_index(name)], name)?;
            encoded.insert(name, impute_numeric(values, name)?);
        }

        for &name in BINARY_YES_NO_COLUMNS.iter() {
            let values = columns[column_index(name)]
                .iter()
                .map(|v| match v {
                    RawValue::Text(s) if s == "Yes" => 1.0,
                    _ => 0.0,
                })
                .collect();
            encoded.insert(name, values);
        }

        for &name in MULTI_CATEGORY_COLUMNS.iter() {
            let values = self.encode_multi_category(&columns[column_index(name)], name)?;
            encoded.insert(name, values);
        }

        for &name in NUMERIC_COLUMNS.iter() {
            let values = encoded.remove(name).unwrap_or_default();
            encoded.insert(name, standardize(values, name)?);
        }

        let rows: Vec<Vec<f64>> = (0..batch.len())
            .map(|row| {
                REQUIRED_COLUMNS
                    .iter()
                    .map(|&name| encoded[name][row])
                    .collect()
            })
            .collect();

        info!(rows = rows.len(), "preprocessing completed");
        Ok(FeatureMatrix::new(rows))
    }

    fn validate_schema(&self, batch: &RawRecordBatch) -> Result<(), PreprocessingError> {
        let present = batch.present_columns();
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|&&name| !present.contains(&name))
            .map(|&name| name.to_string())
            .collect();

        if !missing.is_empty() {
            return Err(PreprocessingError::MissingColumns { columns: missing });
        }
        Ok(())
    }

    /// Fit-once, validate-after label encoding.
    ///
    /// The batch is never partially transformed: unseen categories fail before
    /// any value is encoded, and a failed call leaves fitted state untouched.
    fn encode_multi_category(
        &mut self,
        column: &[RawValue],
        name: &str,
    ) -> Result<Vec<f64>, PreprocessingError> {
        let values: Vec<String> = column
            .iter()
            .map(|v| v.as_category().unwrap_or_default())
            .collect();

        if let Some(encoder) = self.label_encoders.get(name) {
            let mut unseen: Vec<String> = values
                .iter()
                .filter(|v| encoder.transform(v).is_none())
                .cloned()
                .collect();
            unseen.sort();
            unseen.dedup();
            if !unseen.is_empty() {
                return Err(PreprocessingError::NewCategories {
                    column: name.to_string(),
                    unseen,
                });
            }
        } else {
            let encoder = LabelEncoder::fit(&values);
            debug!(column = name, classes = ?encoder.classes(), "fitted label encoder");
            self.label_encoders.insert(name.to_string(), encoder);
        }

        let encoder = &self.label_encoders[name];
        Ok(values
            .iter()
            .map(|v| encoder.transform(v).unwrap_or_default() as f64)
            .collect())
    }
}

/// Position of a column in the output schema; callers only pass names from
/// the `REQUIRED_COLUMNS` taxonomy.
fn column_index(name: &str) -> usize {
    REQUIRED_COLUMNS
        .iter()
        .position(|&c| c == name)
        .expect("name is a required column")
}

/// Fill missing categorical values with the batch mode, ties broken by the
/// lexicographically smallest value.
fn impute_categorical(column: &mut [RawValue], name: &str) {
    if !column.iter().any(RawValue::is_null) {
        return;
    }

    let mut counts: HashMap<String, usize> = HashMap::new();
    for value in column.iter() {
        if let Some(category) = value.as_category() {
            *counts.entry(category).or_insert(0) += 1;
        }
    }

    let mode = counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
        .map(|(value, _)| value)
        .unwrap_or_default();

    debug!(column = name, mode = %mode, "filling missing categorical values");
    for value in column.iter_mut() {
        if value.is_null() {
            *value = RawValue::Text(mode.clone());
        }
    }
}

/// Read a numeric column; non-numeric text anywhere but the coerced
/// `TotalCharges` column is a hard failure, not a silent null.
fn numeric_column(
    column: &[RawValue],
    name: &str,
) -> Result<Vec<Option<f64>>, PreprocessingError> {
    column
        .iter()
        .map(|value| match value {
            RawValue::Null => Ok(None),
            RawValue::Number(n) if n.is_nan() => Ok(None),
            other => other
                .as_f64()
                .map(Some)
                .ok_or_else(|| PreprocessingError::NonNumeric {
                    column: name.to_string(),
                }),
        })
        .collect()
}

/// Fill missing numeric values with the batch median.
fn impute_numeric(
    values: Vec<Option<f64>>,
    name: &str,
) -> Result<Vec<f64>, PreprocessingError> {
    let mut known: Vec<f64> = values.iter().filter_map(|v| *v).collect();
    if known.is_empty() {
        // Possible when coercion turned every TotalCharges value into null.
        return Err(PreprocessingError::AllNullColumn {
            column: name.to_string(),
        });
    }

    if known.len() < values.len() {
        known.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let mid = known.len() / 2;
        let median = if known.len() % 2 == 0 {
            (known[mid - 1] + known[mid]) / 2.0
        } else {
            known[mid]
        };
        debug!(column = name, median, "filling missing numeric values");
        return Ok(values.into_iter().map(|v| v.unwrap_or(median)).collect());
    }

    Ok(values.into_iter().flatten().collect())
}

/// Standardize a column to zero mean and unit variance over the batch.
///
/// A constant column (zero variance, e.g. a single-row batch) standardizes to
/// all zeros rather than dividing by zero.
fn standardize(values: Vec<f64>, name: &str) -> Result<Vec<f64>, PreprocessingError> {
    if values.iter().any(|v| v.is_infinite()) {
        return Err(PreprocessingError::InfiniteValues {
            column: name.to_string(),
        });
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    if std_dev == 0.0 {
        return Ok(vec![0.0; values.len()]);
    }
    Ok(values.into_iter().map(|v| (v - mean) / std_dev).collect())
}
