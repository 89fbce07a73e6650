use std::fmt;

use tabula_core::functions::{clamp_probability, log_sigmoid};
use tabula_core::{BIAS_COLUMN, FeatureSource, Float, Matrix, Result, TabulaError, Vector, sigmoid};
use tracing::trace;

use crate::coefficients::Coefficients;
use crate::hyperparameters::Hyperparameters;
use crate::regressor::{Regressor, Status, TrainingSet, initialize, linear_combination};
use crate::report::{FitSummary, InitialParams, Reporter, TracingReporter};

/// The descent loop stops once one step improves the cost by this much or less.
pub const MIN_IMPROVEMENT: Float = 1e-8;

/// Binary **logistic regression** with L2 regularization, trained by batch
/// gradient descent.
///
/// # Model
///
/// ```text
/// p(x) = σ(Σ_j c_j x_j),   σ(z) = 1 / (1 + e^{-z}),   x_bias = 1
/// ```
///
/// # Training objective
///
/// Over `n` rows with labels `y_i ∈ {0, 1}`:
///
/// ```text
/// J(c) = -(1/n) Σ_i [ y_i = 1 ? ln p(x_i) : ln(1 - p(x_i)) ]
///        + (λ / 2n) Σ_{j ≠ bias} c_j²
/// ```
///
/// The bias coefficient is never regularized. Labels other than `0` and `1`
/// are a caller error; any value other than exactly `1.0` is treated as `0`.
///
/// # Gradient descent
///
/// Each step evaluates the gradient of every coefficient against the same
/// snapshot, writes the updated vector into a scratch buffer, and only then
/// swaps it in:
///
/// ```text
/// ∂J/∂c_j = (1/n) Σ_i (p(x_i) - y_i) x_ij  +  (λ/n) c_j   (j ≠ bias)
/// c'_j    = c_j - α ∂J/∂c_j
/// ```
///
/// The loop runs while the cost is at least `epsilon`, fewer than
/// `max_iterations` steps have been taken, and the previous step improved the
/// cost by more than [`MIN_IMPROVEMENT`]. A learning rate that overshoots
/// stops the loop after one step; that is not an error.
///
/// # Errors
///
/// - [`TabulaError::LabelNotSet`], [`TabulaError::Conversion`] or
///   [`TabulaError::EmptyTrainingData`] from [`fit`](Regressor::fit).
/// - [`TabulaError::NotFitted`] from read operations before `fit`.
pub struct RegularizedLogisticRegressor {
    hyperparameters: Hyperparameters,
    reporter: Box<dyn Reporter>,
    training_set: Option<TrainingSet>,
    coefficients: Option<Coefficients>,
    status: Status,
    iterations_run: usize,
}

impl Default for RegularizedLogisticRegressor {
    fn default() -> Self {
        Self {
            hyperparameters: Hyperparameters::default(),
            reporter: Box::new(TracingReporter),
            training_set: None,
            coefficients: None,
            status: Status::Untrained,
            iterations_run: 0,
        }
    }
}

impl fmt::Debug for RegularizedLogisticRegressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegularizedLogisticRegressor")
            .field("hyperparameters", &self.hyperparameters)
            .field("coefficients", &self.coefficients)
            .field("status", &self.status)
            .field("iterations_run", &self.iterations_run)
            .finish_non_exhaustive()
    }
}

impl RegularizedLogisticRegressor {
    /// Creates an untrained model with default hyperparameters.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hyperparameters(mut self, hyperparameters: Hyperparameters) -> Self {
        self.hyperparameters = hyperparameters;
        self
    }

    /// Replaces the diagnostics sink (a [`TracingReporter`] by default).
    pub fn with_reporter(mut self, reporter: impl Reporter + 'static) -> Self {
        self.reporter = Box::new(reporter);
        self
    }

    /// Descent steps completed by the last `fit`.
    pub fn iterations_run(&self) -> usize {
        self.iterations_run
    }

    pub fn matrix(&self) -> Option<&Matrix> {
        self.training_set.as_ref().map(TrainingSet::matrix)
    }

    /// Hands the training table back, leaving the model untrained.
    pub fn into_matrix(self) -> Option<Matrix> {
        self.training_set.map(TrainingSet::into_matrix)
    }

    /// Iteration count, final cost and terminal status of the last `fit`.
    pub fn summary(&self) -> Result<FitSummary> {
        if !self.status.is_trained() {
            return Err(TabulaError::NotFitted);
        }
        Ok(FitSummary {
            iterations: self.iterations_run,
            final_cost: self.cost_function()?,
            status: self.status,
        })
    }

    /// Partial derivative of the cost with respect to `column`'s coefficient,
    /// at the current coefficients.
    ///
    /// # Errors
    ///
    /// - [`TabulaError::NotFitted`] before `fit`.
    /// - [`TabulaError::ColumnNotFound`] if `column` has no coefficient.
    pub fn gradient(&self, column: &str) -> Result<Float> {
        let (set, coefficients) = self.fitted()?;
        let index = coefficients
            .index_of(column)
            .ok_or_else(|| TabulaError::ColumnNotFound(column.to_owned()))?;

        let columns = set.design_columns(coefficients)?;
        let residuals = residuals(&columns, set.labels()?, coefficients.values());
        Ok(gradient_at(
            &columns,
            &residuals,
            coefficients.values(),
            index,
            self.hyperparameters.lambda,
        ))
    }

    fn fitted(&self) -> Result<(&TrainingSet, &Coefficients)> {
        match (&self.training_set, &self.coefficients) {
            (Some(set), Some(coefficients)) => Ok((set, coefficients)),
            _ => Err(TabulaError::NotFitted),
        }
    }

    fn reset(&mut self) {
        self.training_set = None;
        self.coefficients = None;
        self.iterations_run = 0;
        self.status = Status::Untrained;
    }

    fn train(&mut self, matrix: Matrix) -> Result<()> {
        let (set, coefficients) = initialize(matrix)?;
        self.training_set = Some(set);
        self.coefficients = Some(coefficients);
        self.status = Status::Training;

        let initial_cost = self.cost_function()?;
        if let Some(set) = &self.training_set {
            self.reporter.initialized(&InitialParams {
                alpha: self.hyperparameters.alpha,
                lambda: self.hyperparameters.lambda,
                label: set.label(),
                coefficient_count: self.coefficients.as_ref().map_or(0, Coefficients::len),
                initial_cost,
            });
        }

        self.gradient_descent()?;
        self.reporter.finished(&self.summary()?);
        Ok(())
    }

    fn gradient_descent(&mut self) -> Result<()> {
        let Hyperparameters {
            alpha,
            max_iterations,
            epsilon,
            lambda,
        } = self.hyperparameters;

        let mut iteration = 0;
        let mut previous_cost = Float::MAX;
        let mut scratch = Vector::zeros(self.fitted()?.1.len());

        loop {
            let current_cost = self.cost_function()?;
            if !(current_cost >= epsilon
                && iteration < max_iterations
                && previous_cost - current_cost > MIN_IMPROVEMENT)
            {
                break;
            }
            previous_cost = current_cost;

            let (Some(set), Some(coefficients)) = (&self.training_set, &mut self.coefficients) else {
                return Err(TabulaError::NotFitted);
            };
            descend(set, coefficients, &mut scratch, alpha, lambda)?;

            iteration += 1;
            trace!(iteration, cost = current_cost, "descent step");
        }

        self.iterations_run = iteration;
        self.status = if iteration >= max_iterations {
            Status::MaxIterationsReached
        } else {
            Status::Converged
        };
        Ok(())
    }
}

/// One simultaneous update: every gradient reads the current coefficients,
/// the results land in `scratch`, then `scratch` and the live values swap.
fn descend(
    set: &TrainingSet,
    coefficients: &mut Coefficients,
    scratch: &mut Vector,
    alpha: Float,
    lambda: Float,
) -> Result<()> {
    let columns = set.design_columns(coefficients)?;
    let current = coefficients.values();
    let residuals = residuals(&columns, set.labels()?, current);

    for (index, slot) in scratch.iter_mut().enumerate() {
        *slot = current[index] - alpha * gradient_at(&columns, &residuals, current, index, lambda);
    }

    coefficients.swap_values(scratch);
    Ok(())
}

/// `z_i = Σ_j c_j x_ij` for row `row`.
fn linear_term(columns: &[Option<&[Float]>], coefficients: &Vector, row: usize) -> Float {
    columns
        .iter()
        .zip(coefficients.iter())
        .map(|(column, &c)| match column {
            Some(values) => c * values[row],
            None => c,
        })
        .sum()
}

/// `p(x_i) - y_i` for every row.
fn residuals(columns: &[Option<&[Float]>], labels: &[Float], coefficients: &Vector) -> Vec<Float> {
    labels
        .iter()
        .enumerate()
        .map(|(row, &actual)| sigmoid(linear_term(columns, coefficients, row)) - actual)
        .collect()
}

fn gradient_at(
    columns: &[Option<&[Float]>],
    residuals: &[Float],
    coefficients: &Vector,
    index: usize,
    lambda: Float,
) -> Float {
    let n = residuals.len() as Float;
    match columns[index] {
        // bias: unregularized
        None => residuals.iter().sum::<Float>() / n,
        Some(values) => {
            let sum: Float = residuals.iter().zip(values).map(|(r, x)| r * x).sum();
            sum / n + (lambda / n) * coefficients[index]
        }
    }
}

impl Regressor for RegularizedLogisticRegressor {
    fn hyperparameters(&self) -> &Hyperparameters {
        &self.hyperparameters
    }

    fn hyperparameters_mut(&mut self) -> &mut Hyperparameters {
        &mut self.hyperparameters
    }

    fn training_set(&self) -> Option<&TrainingSet> {
        self.training_set.as_ref()
    }

    fn coefficients(&self) -> Option<&Coefficients> {
        self.coefficients.as_ref()
    }

    fn status(&self) -> Status {
        self.status
    }

    /// Regularized average negative log-likelihood.
    ///
    /// `ln p` and `ln(1 - p)` are evaluated as `ln σ(z)` and `ln σ(-z)`, which
    /// stay finite when `p` rounds to `0` or `1`.
    fn cost_function(&self) -> Result<Float> {
        let (set, coefficients) = self.fitted()?;
        let columns = set.design_columns(coefficients)?;
        let values = coefficients.values();

        let log_likelihood: Float = set
            .labels()?
            .iter()
            .enumerate()
            .map(|(row, &actual)| {
                let z = linear_term(&columns, values, row);
                if actual == 1.0 { log_sigmoid(z) } else { log_sigmoid(-z) }
            })
            .sum();

        let penalty: Float = coefficients
            .iter()
            .filter(|(name, _)| *name != BIAS_COLUMN)
            .map(|(_, c)| c * c)
            .sum();

        let n = set.row_count() as Float;
        Ok(-log_likelihood / n + (self.hyperparameters.lambda / (2.0 * n)) * penalty)
    }

    /// Trains from scratch on `matrix`.
    ///
    /// Any previous fit is discarded first. On error the model is left
    /// untrained and the table is dropped.
    fn fit(&mut self, matrix: Matrix) -> Result<()> {
        self.reset();
        let result = self.train(matrix);
        if result.is_err() {
            self.reset();
        }
        result
    }

    /// `σ(Σ c_j x_j)`, kept strictly inside `(0, 1)`.
    fn predict(&self, features: &dyn FeatureSource) -> Result<Float> {
        let coefficients = self.coefficients.as_ref().ok_or(TabulaError::NotFitted)?;
        let z = linear_combination(coefficients, features)?;
        Ok(clamp_probability(sigmoid(z)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    use crate::report::SilentReporter;

    fn and_table() -> Matrix {
        let mut m = Matrix::from_columns([
            ("x1", vec![0.0, 0.0, 1.0, 1.0]),
            ("x2", vec![0.0, 1.0, 0.0, 1.0]),
            ("y", vec![0.0, 0.0, 0.0, 1.0]),
        ])
        .unwrap();
        m.set_label_column("y").unwrap();
        m
    }

    fn model(alpha: Float, lambda: Float, max_iterations: usize, epsilon: Float) -> RegularizedLogisticRegressor {
        let mut model = RegularizedLogisticRegressor::new().with_reporter(SilentReporter);
        model.set_alpha(alpha).unwrap();
        model.set_lambda(lambda).unwrap();
        model.set_max_iterations(max_iterations).unwrap();
        model.set_epsilon(epsilon).unwrap();
        model
    }

    fn point(x1: Float, x2: Float) -> HashMap<String, Float> {
        HashMap::from([("x1".to_string(), x1), ("x2".to_string(), x2)])
    }

    /// Coefficients set by hand, bypassing descent.
    fn with_coefficients(values: &[Float], lambda: Float) -> RegularizedLogisticRegressor {
        let mut model = model(0.1, lambda, 1, 0.0);
        let (set, mut coefficients) = initialize(and_table()).unwrap();
        coefficients.swap_values(&mut Vector::from_row_slice(values));
        model.training_set = Some(set);
        model.coefficients = Some(coefficients);
        model
    }

    #[test]
    fn test_new_is_untrained() {
        let model = RegularizedLogisticRegressor::new();
        assert_eq!(model.status(), Status::Untrained);
        assert_eq!(model.iterations_run(), 0);
        assert!(model.coefficients().is_none());
        assert_eq!(model.hyperparameters(), &Hyperparameters::default());
    }

    #[test]
    fn test_read_operations_before_fit() {
        let model = RegularizedLogisticRegressor::new();
        assert!(matches!(model.cost_function(), Err(TabulaError::NotFitted)));
        assert!(matches!(model.predict(&point(0.0, 0.0)), Err(TabulaError::NotFitted)));
        assert!(matches!(model.gradient("bias"), Err(TabulaError::NotFitted)));
        assert!(matches!(model.predict_row(0), Err(TabulaError::NotFitted)));
        assert!(matches!(model.summary(), Err(TabulaError::NotFitted)));
    }

    #[test]
    fn test_cost_at_zero_is_ln_two() {
        let model = with_coefficients(&[0.0, 0.0, 0.0], 0.1);
        assert_abs_diff_eq!(model.cost_function().unwrap(), (2.0 as Float).ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_cost_penalty_skips_bias() {
        let plain = with_coefficients(&[3.0, 0.5, -0.5], 0.0).cost_function().unwrap();
        let regularized = with_coefficients(&[3.0, 0.5, -0.5], 2.0).cost_function().unwrap();
        // (λ / 2n) * (0.5² + 0.5²) with λ = 2, n = 4
        assert_abs_diff_eq!(regularized - plain, 0.125, epsilon = 1e-12);
    }

    #[test]
    fn test_cost_matches_naive_log_likelihood() {
        let model = with_coefficients(&[-1.0, 0.7, 0.4], 0.0);
        let z = [-1.0, -0.6, -0.3, 0.1];
        let y = [0.0, 0.0, 0.0, 1.0];
        let expected: Float = -z
            .iter()
            .zip(y)
            .map(|(&z, y)| {
                let p = 1.0 / (1.0 + (-z as Float).exp());
                if y == 1.0 { p.ln() } else { (1.0 - p).ln() }
            })
            .sum::<Float>()
            / 4.0;
        assert_abs_diff_eq!(model.cost_function().unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_gradient_at_zero() {
        let model = with_coefficients(&[0.0, 0.0, 0.0], 0.5);
        // residuals are 0.5, 0.5, 0.5, -0.5
        assert_abs_diff_eq!(model.gradient("bias").unwrap(), 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(model.gradient("x1").unwrap(), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(model.gradient("x2").unwrap(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_gradient_regularization_term() {
        let values = [0.8, -1.2, 2.0];
        let plain = with_coefficients(&values, 0.0);
        let regularized = with_coefficients(&values, 0.4);

        let bias_delta = regularized.gradient("bias").unwrap() - plain.gradient("bias").unwrap();
        assert_abs_diff_eq!(bias_delta, 0.0, epsilon = 1e-15);

        for (name, c) in [("x1", -1.2), ("x2", 2.0)] {
            let delta = regularized.gradient(name).unwrap() - plain.gradient(name).unwrap();
            assert_abs_diff_eq!(delta, (0.4 / 4.0) * c, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_gradient_unknown_column() {
        let model = with_coefficients(&[0.0, 0.0, 0.0], 0.0);
        assert!(matches!(model.gradient("y"), Err(TabulaError::ColumnNotFound(_))));
    }

    #[test]
    fn test_descend_uses_one_snapshot() {
        let (set, mut coefficients) = initialize(and_table()).unwrap();
        coefficients.swap_values(&mut Vector::from_vec(vec![0.3, -0.2, 0.9]));
        let reference = with_coefficients(&[0.3, -0.2, 0.9], 0.1);
        let expected: Vec<Float> = ["bias", "x1", "x2"]
            .iter()
            .map(|name| {
                let c = reference.coefficients().unwrap().get(name).unwrap();
                c - 0.5 * reference.gradient(name).unwrap()
            })
            .collect();

        let mut scratch = Vector::zeros(3);
        descend(&set, &mut coefficients, &mut scratch, 0.5, 0.1).unwrap();

        for (actual, expected) in coefficients.values().iter().zip(expected) {
            assert_abs_diff_eq!(*actual, expected, epsilon = 1e-12);
        }
        assert_eq!(scratch, Vector::from_vec(vec![0.3, -0.2, 0.9]));
    }

    #[test]
    fn test_fit_and_scenario() {
        let mut model = model(0.3, 0.0, 5000, 1e-4);
        model.fit(and_table()).unwrap();

        // Separable data without regularization keeps improving by more than
        // MIN_IMPROVEMENT per step, so the loop runs to the limit.
        assert_eq!(model.iterations_run(), 5000);
        assert_eq!(model.status(), Status::MaxIterationsReached);
        assert!(model.predict(&point(1.0, 1.0)).unwrap() > 0.5);
        assert!(model.predict(&point(0.0, 0.0)).unwrap() < 0.5);
    }

    #[test]
    fn test_fit_converges_with_regularization() {
        let mut model = model(0.3, 0.1, 5000, 1e-4);
        model.fit(and_table()).unwrap();

        assert_eq!(model.status(), Status::Converged);
        assert!(model.iterations_run() < 5000);
        assert!(model.predict(&point(1.0, 1.0)).unwrap() > 0.5);
        assert!(model.predict(&point(0.0, 0.0)).unwrap() < 0.5);
        assert!(model.predict_row(3).unwrap() > 0.5);
    }

    #[test]
    fn test_fit_hits_iteration_limit() {
        let mut model = model(0.1, 0.1, 10, 1e-5);
        model.fit(and_table()).unwrap();
        assert_eq!(model.iterations_run(), 10);
        assert_eq!(model.status(), Status::MaxIterationsReached);
    }

    #[test]
    fn test_fit_stops_when_cost_below_epsilon() {
        let mut model = model(0.1, 0.0, 100, 10.0);
        model.fit(and_table()).unwrap();
        assert_eq!(model.iterations_run(), 0);
        assert_eq!(model.status(), Status::Converged);
    }

    #[test]
    fn test_fit_overshooting_alpha_stops_after_one_step() {
        let mut model = model(1000.0, 0.1, 5000, 1e-5);
        model.fit(and_table()).unwrap();

        // the first step raises the cost, so the next check ends the loop
        assert_eq!(model.iterations_run(), 1);
        assert_eq!(model.status(), Status::Converged);
        assert!(model.cost_function().unwrap() > (2.0 as Float).ln());
    }

    #[test]
    fn test_cost_decreases_during_fit() {
        let mut short = model(0.1, 0.1, 5, 1e-5);
        short.fit(and_table()).unwrap();
        let mut long = model(0.1, 0.1, 50, 1e-5);
        long.fit(and_table()).unwrap();

        let start = (2.0 as Float).ln();
        let after_short = short.cost_function().unwrap();
        let after_long = long.cost_function().unwrap();
        assert!(after_short < start);
        assert!(after_long < after_short);
    }

    #[test]
    fn test_refit_starts_fresh() {
        let mut model = model(0.3, 0.1, 5000, 1e-4);
        model.fit(and_table()).unwrap();
        let first = model.coefficients().unwrap().clone();
        let iterations = model.iterations_run();

        model.fit(and_table()).unwrap();
        assert_eq!(model.coefficients().unwrap(), &first);
        assert_eq!(model.iterations_run(), iterations);
    }

    #[test]
    fn test_fit_excludes_label_from_index() {
        let mut model = model(0.1, 0.1, 5, 1e-5);
        model.fit(and_table()).unwrap();
        let coefficients = model.coefficients().unwrap();
        assert_eq!(coefficients.names(), ["bias", "x1", "x2"]);
        assert_eq!(coefficients.index_of("y"), None);
    }

    #[test]
    fn test_fit_failure_leaves_model_untrained() {
        let mut model = model(0.1, 0.1, 5, 1e-5);
        model.fit(and_table()).unwrap();

        let unlabeled = Matrix::from_columns([("x", vec![1.0])]).unwrap();
        assert!(matches!(model.fit(unlabeled), Err(TabulaError::LabelNotSet)));
        assert_eq!(model.status(), Status::Untrained);
        assert!(model.coefficients().is_none());
    }

    #[test]
    fn test_into_matrix_returns_table() {
        let mut model = model(0.1, 0.1, 5, 1e-5);
        model.fit(and_table()).unwrap();
        let matrix = model.into_matrix().unwrap();
        assert_eq!(matrix.row_count(), 4);
        assert_eq!(matrix.label_column().unwrap(), "y");
    }

    #[derive(Clone, Default)]
    struct Recorder {
        events: Rc<RefCell<Vec<String>>>,
    }

    impl Reporter for Recorder {
        fn initialized(&self, params: &InitialParams<'_>) {
            self.events
                .borrow_mut()
                .push(format!("init {} {} {}", params.label, params.coefficient_count, params.initial_cost));
        }

        fn finished(&self, summary: &FitSummary) {
            self.events
                .borrow_mut()
                .push(format!("done {} {:?}", summary.iterations, summary.status));
        }
    }

    #[test]
    fn test_reporter_hooks() {
        let recorder = Recorder::default();
        let mut model = model(0.1, 0.1, 3, 1e-5).with_reporter(recorder.clone());
        model.fit(and_table()).unwrap();

        let events = recorder.events.borrow();
        assert_eq!(events.len(), 2);
        assert!(events[0].starts_with("init y 3 0.69"));
        assert_eq!(events[1], "done 3 MaxIterationsReached");
    }

    #[test]
    fn test_summary_after_fit() {
        let mut model = model(0.1, 0.1, 3, 1e-5);
        model.fit(and_table()).unwrap();
        let summary = model.summary().unwrap();
        assert_eq!(summary.iterations, 3);
        assert_eq!(summary.status, Status::MaxIterationsReached);
        assert_abs_diff_eq!(summary.final_cost, model.cost_function().unwrap(), epsilon = 0.0);
    }

    #[test]
    fn test_predict_saturated_stays_open_interval() {
        let model = with_coefficients(&[0.0, 500.0, 500.0], 0.0);
        let high = model.predict(&point(1.0, 1.0)).unwrap();
        let low = model.predict(&point(-1.0, -1.0)).unwrap();
        assert!(high < 1.0 && high > 0.5);
        assert!(low > 0.0 && low < 0.5);
    }
}
