use thiserror::Error;

/// A value that could not be parsed while converting a column to numbers.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("cannot parse {value:?} in column {column:?} at row {row} as a number")]
pub struct ConversionFailure {
    pub column: String,
    pub row: usize,
    pub value: String,
}

#[derive(Debug, Error)]
pub enum TabulaError {
    /// The label column was read before `set_label_column` was called.
    #[error("label column not set")]
    LabelNotSet,

    /// `set_label_column` named a column the table does not hold.
    #[error("unknown label column: {0}")]
    UnknownLabel(String),

    /// Invalid hyperparameter value
    #[error("invalid hyperparameter {name}: {value}")]
    InvalidHyperparameter { name: String, value: String },

    #[error("column not found: {0}")]
    ColumnNotFound(String),

    #[error("row {row} out of range for column {column:?} ({rows} rows)")]
    RowOutOfRange {
        column: String,
        row: usize,
        rows: usize,
    },

    /// A numeric read hit a column that is still text.
    #[error("column {column:?} has not been converted to numbers")]
    NotNumeric { column: String },

    /// A prediction input does not provide a value for a fitted feature.
    #[error("missing value for feature {0:?}")]
    MissingFeature(String),

    #[error(transparent)]
    Conversion(#[from] ConversionFailure),

    /// A column with this name already exists (or the name is reserved).
    #[error("column already present: {0}")]
    DuplicateColumn(String),

    /// Shape or dimensionality mismatch
    #[error("shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: String, got: String },

    /// The training dataset contains zero samples.
    #[error("training data contains no rows")]
    EmptyTrainingData,

    /// Model used before calling `fit`
    #[error("model is not fitted")]
    NotFitted,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// CSV parsing / formatting issues
    #[error("csv: {0}")]
    Csv(String),

    #[error("config: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, TabulaError>;
