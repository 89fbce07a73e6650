pub mod coefficients;
pub mod hyperparameters;
pub mod logistic_regression;
pub mod regressor;
pub mod report;

pub use coefficients::Coefficients;
pub use hyperparameters::Hyperparameters;
pub use logistic_regression::{MIN_IMPROVEMENT, RegularizedLogisticRegressor};
pub use regressor::{Regressor, Status, TrainingSet, initialize, linear_combination};
pub use report::{FitSummary, InitialParams, Reporter, SilentReporter, TracingReporter};
