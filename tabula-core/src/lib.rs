pub mod error;
pub mod functions;
pub mod matrix;
pub mod row;
pub mod types;

pub use types::{BIAS_COLUMN, Float, Vector};

pub use error::{ConversionFailure, Result, TabulaError};

pub use matrix::{Column, Conversion, FeatureExpander, Matrix, Representation, Value};
pub use row::{FeatureSource, Row};

pub use functions::{log_sigmoid, sigmoid};
