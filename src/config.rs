use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tabula_core::{Result, TabulaError};
use tabula_models::Hyperparameters;

/// Everything a training run needs, loadable from JSON.
///
/// ```json
/// {
///   "data": "data/and.csv",
///   "has_header": true,
///   "label": "y",
///   "degree": 2,
///   "output": "weights.csv",
///   "hyperparameters": { "alpha": 0.3, "lambda": 0.0 }
/// }
/// ```
///
/// Missing fields take their defaults, including individual hyperparameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainConfig {
    pub data: Option<PathBuf>,
    pub has_header: bool,
    pub label: Option<String>,
    /// Polynomial degree for feature expansion; `None` or `< 2` disables it.
    pub degree: Option<usize>,
    pub output: Option<PathBuf>,
    pub hyperparameters: Hyperparameters,
}

impl TrainConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| TabulaError::Config(e.to_string()))?;
        config.hyperparameters.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| TabulaError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }
}
