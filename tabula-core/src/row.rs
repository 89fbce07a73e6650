use std::collections::{BTreeMap, HashMap};

use crate::matrix::{Matrix, Value};
use crate::{Float, Result, TabulaError};

/// Anything that can supply a numeric value per feature name.
///
/// Prediction reads its inputs through this trait so that a row of a
/// [`Matrix`] and a free-standing name→value map are interchangeable.
pub trait FeatureSource {
    fn feature(&self, name: &str) -> Result<Float>;
}

/// A borrowed view of one row of a [`Matrix`].
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    matrix: &'a Matrix,
    index: usize,
}

impl<'a> Row<'a> {
    pub(crate) fn new(matrix: &'a Matrix, index: usize) -> Self {
        Self { matrix, index }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Every stored cell of the row, in column order.
    pub fn values(&self) -> impl Iterator<Item = (&'a str, Value<'a>)> + '_ {
        let matrix = self.matrix;
        let index = self.index;
        matrix.column_names().iter().filter_map(move |name| {
            matrix
                .cell(name, index)
                .ok()
                .map(|value| (name.as_str(), value))
        })
    }
}

impl FeatureSource for Row<'_> {
    fn feature(&self, name: &str) -> Result<Float> {
        self.matrix.get(name, self.index)
    }
}

impl FeatureSource for HashMap<String, Float> {
    fn feature(&self, name: &str) -> Result<Float> {
        self.get(name)
            .copied()
            .ok_or_else(|| TabulaError::MissingFeature(name.to_owned()))
    }
}

impl FeatureSource for BTreeMap<String, Float> {
    fn feature(&self, name: &str) -> Result<Float> {
        self.get(name)
            .copied()
            .ok_or_else(|| TabulaError::MissingFeature(name.to_owned()))
    }
}
