pub type Float = f64;
pub type Vector = nalgebra::DVector<Float>;

/// Name of the synthetic constant column. It is never stored in a table and
/// always reads as `1.0`.
pub const BIAS_COLUMN: &str = "bias";
