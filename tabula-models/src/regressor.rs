#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tabula_core::{
    BIAS_COLUMN, Conversion, FeatureSource, Float, Matrix, Result, TabulaError, Vector,
};

use crate::coefficients::Coefficients;
use crate::hyperparameters::Hyperparameters;

/// Lifecycle of a regressor.
///
/// ```text
/// Untrained ─fit─▶ Training ─┬─▶ Converged
///                            └─▶ MaxIterationsReached
/// ```
///
/// Both terminal states expose the same read operations; the distinction only
/// records why the descent loop stopped.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Status {
    #[default]
    Untrained,
    Training,
    Converged,
    MaxIterationsReached,
}

impl Status {
    pub fn is_trained(&self) -> bool {
        matches!(self, Status::Converged | Status::MaxIterationsReached)
    }
}

/// A numeric table handed over to a regressor, with its label resolved.
#[derive(Debug, Clone)]
pub struct TrainingSet {
    matrix: Matrix,
    label: String,
    row_count: usize,
}

impl TrainingSet {
    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    pub fn into_matrix(self) -> Matrix {
        self.matrix
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Label values, one per row.
    pub fn labels(&self) -> Result<&[Float]> {
        self.matrix.numeric_column(&self.label)
    }

    /// Column slices aligned with `coefficients`; `None` marks the bias slot.
    pub fn design_columns(&self, coefficients: &Coefficients) -> Result<Vec<Option<&[Float]>>> {
        coefficients
            .names()
            .iter()
            .map(|name| {
                if name == BIAS_COLUMN {
                    Ok(None)
                } else {
                    self.matrix.numeric_column(name).map(Some)
                }
            })
            .collect()
    }
}

/// Shared setup run at the start of every `fit`.
///
/// Resolves the label, converts the table to numbers, captures the row count
/// and lays out zero coefficients: bias at position `0`, then each feature
/// column in order. The label never receives a slot, even if it still appears
/// among the feature columns.
///
/// # Errors
///
/// - [`TabulaError::LabelNotSet`] if the table has no label column.
/// - [`TabulaError::Conversion`] if the table cannot be made numeric.
/// - [`TabulaError::EmptyTrainingData`] if the table has no rows.
pub fn initialize(mut matrix: Matrix) -> Result<(TrainingSet, Coefficients)> {
    let label = matrix.label_column()?.to_owned();

    if let Conversion::Failed(failure) = matrix.convert_to_numeric() {
        return Err(failure.into());
    }

    let row_count = matrix.row_count();
    if row_count == 0 {
        return Err(TabulaError::EmptyTrainingData);
    }

    let coefficients = Coefficients::zeros(matrix.feature_columns(), &label);
    let set = TrainingSet {
        matrix,
        label,
        row_count,
    };
    Ok((set, coefficients))
}

/// `Σ coefficients[i] * x[name_i]`, reading `1.0` for the bias slot.
///
/// # Errors
///
/// Whatever `features` reports for a missing or non-numeric feature.
pub fn linear_combination(coefficients: &Coefficients, features: &dyn FeatureSource) -> Result<Float> {
    let x = coefficients
        .names()
        .iter()
        .map(|name| {
            if name == BIAS_COLUMN {
                Ok(1.0)
            } else {
                features.feature(name)
            }
        })
        .collect::<Result<Vec<Float>>>()?;
    Ok(coefficients.values().dot(&Vector::from_vec(x)))
}

/// Capabilities shared by every regression variant.
///
/// Implementors provide the loss, the training loop and the prediction
/// function; hyperparameter handling and row prediction come for free.
/// Implementations run [`initialize`] at the start of `fit` so the
/// coefficient layout is the same for every variant.
pub trait Regressor {
    fn hyperparameters(&self) -> &Hyperparameters;

    fn hyperparameters_mut(&mut self) -> &mut Hyperparameters;

    /// The table the model was fitted on, `None` before `fit`.
    fn training_set(&self) -> Option<&TrainingSet>;

    /// Fitted coefficients, `None` before `fit`.
    fn coefficients(&self) -> Option<&Coefficients>;

    fn status(&self) -> Status;

    /// Training loss over the full training set at the current coefficients.
    fn cost_function(&self) -> Result<Float>;

    /// Trains on `matrix`, replacing any previous fit.
    fn fit(&mut self, matrix: Matrix) -> Result<()>;

    fn predict(&self, features: &dyn FeatureSource) -> Result<Float>;

    /// Prediction for one row of the training table.
    fn predict_row(&self, row: usize) -> Result<Float> {
        let set = self.training_set().ok_or(TabulaError::NotFitted)?;
        let row = set.matrix().row(row)?;
        self.predict(&row)
    }

    fn set_alpha(&mut self, alpha: Float) -> Result<()> {
        self.hyperparameters_mut().set_alpha(alpha)
    }

    fn set_max_iterations(&mut self, max_iterations: usize) -> Result<()> {
        self.hyperparameters_mut().set_max_iterations(max_iterations)
    }

    fn set_epsilon(&mut self, epsilon: Float) -> Result<()> {
        self.hyperparameters_mut().set_epsilon(epsilon)
    }

    fn set_lambda(&mut self, lambda: Float) -> Result<()> {
        self.hyperparameters_mut().set_lambda(lambda)
    }
}
