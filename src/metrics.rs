use tabula_core::{Float, Matrix, Result, TabulaError};
use tabula_models::Regressor;

/// Probability at or above which a prediction counts as the positive class.
pub const DECISION_THRESHOLD: Float = 0.5;

pub fn predicted_class(probability: Float) -> Float {
    if probability >= DECISION_THRESHOLD { 1.0 } else { 0.0 }
}

/// Fraction of rows whose thresholded prediction equals the label.
///
/// # Errors
///
/// - [`TabulaError::EmptyTrainingData`] if `matrix` has no rows.
/// - [`TabulaError::LabelNotSet`] / [`TabulaError::NotNumeric`] if the label
///   cannot be read as numbers.
/// - Any error from [`Regressor::predict`].
pub fn accuracy(model: &dyn Regressor, matrix: &Matrix) -> Result<Float> {
    let rows = matrix.row_count();
    if rows == 0 {
        return Err(TabulaError::EmptyTrainingData);
    }
    let labels = matrix.numeric_column(matrix.label_column()?)?;

    let mut correct = 0usize;
    for (row, &actual) in labels.iter().enumerate() {
        let p = model.predict(&matrix.row(row)?)?;
        if predicted_class(p) == actual {
            correct += 1;
        }
    }
    Ok(correct as Float / rows as Float)
}
