#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tabula_core::{Float, Result, TabulaError};

/// Settings shared by every gradient-descent regressor.
///
/// | field            | default | valid range        |
/// |------------------|---------|--------------------|
/// | `alpha`          | `0.1`   | finite, `> 0`      |
/// | `max_iterations` | `2000`  | `> 0`              |
/// | `epsilon`        | `1e-5`  | finite, `>= 0`     |
/// | `lambda`         | `0.1`   | finite, `>= 0`     |
///
/// The setters reject out-of-range values with
/// [`TabulaError::InvalidHyperparameter`] and leave the old value in place.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hyperparameters {
    /// Learning rate of each descent step.
    pub(crate) alpha: Float,
    /// Upper bound on descent steps.
    pub(crate) max_iterations: usize,
    /// Training stops once the cost falls below this value.
    pub(crate) epsilon: Float,
    /// L2 regularization strength.
    pub(crate) lambda: Float,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            max_iterations: 2000,
            epsilon: 1e-5,
            lambda: 0.1,
        }
    }
}

fn invalid(name: &str, value: impl ToString) -> TabulaError {
    TabulaError::InvalidHyperparameter {
        name: name.to_owned(),
        value: value.to_string(),
    }
}

fn check_alpha(alpha: Float) -> Result<()> {
    if alpha.is_finite() && alpha > 0.0 {
        Ok(())
    } else {
        Err(invalid("alpha", alpha))
    }
}

fn check_max_iterations(max_iterations: usize) -> Result<()> {
    if max_iterations > 0 {
        Ok(())
    } else {
        Err(invalid("max_iterations", max_iterations))
    }
}

fn check_non_negative(name: &str, value: Float) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(name, value))
    }
}

impl Hyperparameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alpha(&self) -> Float {
        self.alpha
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn epsilon(&self) -> Float {
        self.epsilon
    }

    pub fn lambda(&self) -> Float {
        self.lambda
    }

    pub fn set_alpha(&mut self, alpha: Float) -> Result<()> {
        check_alpha(alpha)?;
        self.alpha = alpha;
        Ok(())
    }

    pub fn set_max_iterations(&mut self, max_iterations: usize) -> Result<()> {
        check_max_iterations(max_iterations)?;
        self.max_iterations = max_iterations;
        Ok(())
    }

    pub fn set_epsilon(&mut self, epsilon: Float) -> Result<()> {
        check_non_negative("epsilon", epsilon)?;
        self.epsilon = epsilon;
        Ok(())
    }

    pub fn set_lambda(&mut self, lambda: Float) -> Result<()> {
        check_non_negative("lambda", lambda)?;
        self.lambda = lambda;
        Ok(())
    }

    /// Checks every field, e.g. after deserializing from a config file.
    pub fn validate(&self) -> Result<()> {
        check_alpha(self.alpha)?;
        check_max_iterations(self.max_iterations)?;
        check_non_negative("epsilon", self.epsilon)?;
        check_non_negative("lambda", self.lambda)
    }
}
