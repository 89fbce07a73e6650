use std::path::PathBuf;

use tabula_core::{Float, Result, TabulaError};
use tabula_models::{Coefficients, FitSummary, Regressor, RegularizedLogisticRegressor};
use tracing::info;

use crate::config::TrainConfig;
use crate::io::{CsvOptions, read_csv, save_coefficients};
use crate::metrics::accuracy;
use crate::preprocessors::PolynomialFeatures;

/// What a training run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub summary: FitSummary,
    pub accuracy: Float,
    pub coefficients: Coefficients,
    /// Where the coefficients were written, if an output path was given.
    pub saved_to: Option<PathBuf>,
}

/// Loads the data, optionally expands features, trains, scores and saves.
///
/// # Errors
///
/// [`TabulaError::Config`] if the data path or label is missing, plus any
/// error from loading, training or saving.
pub fn run(config: &TrainConfig) -> Result<RunReport> {
    let data = config
        .data
        .as_ref()
        .ok_or_else(|| TabulaError::Config("no data file given".into()))?;
    let label = config
        .label
        .as_deref()
        .ok_or_else(|| TabulaError::Config("no label column given".into()))?;

    let options = CsvOptions {
        has_header: config.has_header,
        ..CsvOptions::default()
    };
    let mut matrix = read_csv(data, &options)?;
    matrix.set_label_column(label)?;

    if let Some(degree) = config.degree.filter(|&d| d >= 2) {
        matrix.extend_with_degrees(degree, &PolynomialFeatures)?;
        info!(degree, features = matrix.feature_columns().len(), "expanded features");
    }

    let mut model =
        RegularizedLogisticRegressor::new().with_hyperparameters(config.hyperparameters);
    model.fit(matrix)?;

    let summary = model.summary()?;
    let coefficients = model
        .coefficients()
        .cloned()
        .ok_or(TabulaError::NotFitted)?;
    let table = model.matrix().ok_or(TabulaError::NotFitted)?;
    let accuracy = accuracy(&model, table)?;

    let saved_to = match &config.output {
        Some(path) => Some(save_coefficients(&coefficients, path)?),
        None => None,
    };

    Ok(RunReport {
        summary,
        accuracy,
        coefficients,
        saved_to,
    })
}
