//! Churn Prediction Pipeline - Main Entry Point
//!
//! Scores an uploaded customer CSV against the configured ONNX classifier
//! and prints the risk report as JSON.

use anyhow::{bail, Context, Result};
use churn_prediction_pipeline::{
    config::AppConfig,
    predictor::ChurnPredictor,
    types::record::{RawRecord, RawRecordBatch, RawValue},
};
use std::path::PathBuf;
use tracing::info;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("churn_prediction_pipeline=info".parse()?),
        )
        .init();

    info!("Starting Churn Prediction Pipeline");

    let config = AppConfig::load()?;
    info!(
        model_path = %config.model.path,
        high = config.detection.risk_levels.high,
        medium = config.detection.risk_levels.medium,
        "Configuration loaded"
    );

    let input_path = match std::env::args().nth(1) {
        Some(path) => PathBuf::from(path),
        None => bail!("usage: churn-prediction-pipeline <customers.csv>"),
    };

    let batch = read_csv_batch(&input_path)
        .with_context(|| format!("failed to read {}", input_path.display()))?;
    info!(rows = batch.len(), path = %input_path.display(), "Input batch loaded");

    let mut predictor = ChurnPredictor::from_config(&config)?;
    let report = predictor.score(&batch, &config.detection.risk_levels)?;

    info!(
        total = report.summary.total_customers,
        high_risk = report.summary.high_risk_count,
        medium_risk = report.summary.medium_risk_count,
        low_risk = report.summary.low_risk_count,
        "Batch scored"
    );

    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

/// Parse an uploaded delimited file into a raw record batch.
fn read_csv_batch(path: &PathBuf) -> Result<RawRecordBatch> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut row = RawRecord::with_capacity(headers.len());
        for (header, field) in headers.iter().zip(record.iter()) {
            row.insert(header.to_string(), RawValue::from_csv_field(field));
        }
        rows.push(row);
    }

    Ok(RawRecordBatch::new(rows))
}
