use std::cell::OnceCell;
use std::collections::{HashMap, HashSet};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::row::Row;
use crate::{BIAS_COLUMN, ConversionFailure, Float, Result, TabulaError};

/// Values of a single named column.
///
/// Data loaders produce [`Column::Text`]; [`Matrix::convert_to_numeric`]
/// replaces feature and label columns with [`Column::Numeric`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Text(Vec<String>),
    Numeric(Vec<Float>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Text(v) => v.len(),
            Column::Numeric(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Column::Numeric(_))
    }

    pub fn value(&self, row: usize) -> Option<Value<'_>> {
        match self {
            Column::Text(v) => v.get(row).map(|s| Value::Text(s.as_str())),
            Column::Numeric(v) => v.get(row).map(|&x| Value::Number(x)),
        }
    }
}

impl From<Vec<Float>> for Column {
    fn from(values: Vec<Float>) -> Self {
        Column::Numeric(values)
    }
}

impl From<Vec<String>> for Column {
    fn from(values: Vec<String>) -> Self {
        Column::Text(values)
    }
}

impl From<Vec<&str>> for Column {
    fn from(values: Vec<&str>) -> Self {
        Column::Text(values.into_iter().map(str::to_owned).collect())
    }
}

/// A single cell, borrowed from its column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    Text(&'a str),
    Number(Float),
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Number(x) => write!(f, "{}", x),
        }
    }
}

/// Whether the feature (and label) columns hold parsed numbers.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Representation {
    #[default]
    Raw,
    Numeric,
}

/// Outcome of [`Matrix::convert_to_numeric`].
///
/// A failed conversion is not an error: the table stays [`Representation::Raw`]
/// with its columns untouched, and callers are expected to check
/// [`Matrix::is_numeric`] before training.
#[must_use]
#[derive(Debug, Clone, PartialEq)]
pub enum Conversion {
    AlreadyNumeric,
    Converted,
    Failed(ConversionFailure),
}

impl Conversion {
    pub fn is_numeric(&self) -> bool {
        !matches!(self, Conversion::Failed(_))
    }
}

/// Adds derived feature columns to a numeric table.
///
/// Implemented outside the core (see the polynomial preprocessor in the
/// `tabula` crate); [`Matrix::extend_with_degrees`] only guarantees the table
/// is numeric before delegating.
pub trait FeatureExpander {
    fn expand(&self, matrix: &mut Matrix, degree: usize) -> Result<()>;
}

/// A **column-oriented table** of named columns with one designated label.
///
/// Columns are kept in insertion order. Every column holds exactly
/// [`row_count`](Matrix::row_count) values.
///
/// # Feature columns
///
/// The feature list is every column except the label and those added with
/// `include_as_feature = false`. It is computed on first use and cached;
/// changing the label or adding a column empties the cache (the stale state),
/// and the next read rebuilds it.
///
/// # Bias column
///
/// The name [`BIAS_COLUMN`] is reserved. It is never stored, and
/// [`get`](Matrix::get) returns `1.0` for it at every row.
#[derive(Debug, Clone, Default)]
pub struct Matrix {
    names: Vec<String>,
    columns: HashMap<String, Column>,
    excluded: HashSet<String>,
    label: Option<String>,
    features: OnceCell<Vec<String>>,
    representation: Representation,
    row_count: usize,
}

impl Matrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from `(name, values)` pairs, all registered as features.
    ///
    /// # Errors
    ///
    /// - [`TabulaError::DuplicateColumn`] if a name repeats or is `"bias"`.
    /// - [`TabulaError::ShapeMismatch`] if the columns differ in length.
    pub fn from_columns<I, S, C>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, C)>,
        S: Into<String>,
        C: Into<Column>,
    {
        let mut matrix = Self::new();
        for (name, values) in columns {
            matrix.add_column(name, values, true)?;
        }
        Ok(matrix)
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.names.len()
    }

    /// Column names in insertion order.
    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .get(name)
            .ok_or_else(|| TabulaError::ColumnNotFound(name.to_owned()))
    }

    pub fn numeric_column(&self, name: &str) -> Result<&[Float]> {
        match self.column(name)? {
            Column::Numeric(values) => Ok(values),
            Column::Text(_) => Err(TabulaError::NotNumeric {
                column: name.to_owned(),
            }),
        }
    }

    /// Reads one cell. The bias column yields `Number(1.0)` for any row.
    ///
    /// # Errors
    ///
    /// - [`TabulaError::ColumnNotFound`] for an unknown column.
    /// - [`TabulaError::RowOutOfRange`] if `row >= row_count`.
    pub fn cell(&self, column: &str, row: usize) -> Result<Value<'_>> {
        if column == BIAS_COLUMN {
            return Ok(Value::Number(1.0));
        }
        self.column(column)?
            .value(row)
            .ok_or_else(|| TabulaError::RowOutOfRange {
                column: column.to_owned(),
                row,
                rows: self.row_count,
            })
    }

    /// Reads one cell as a number.
    ///
    /// Same lookup rules as [`cell`](Matrix::cell), plus
    /// [`TabulaError::NotNumeric`] if the column has not been converted.
    pub fn get(&self, column: &str, row: usize) -> Result<Float> {
        match self.cell(column, row)? {
            Value::Number(x) => Ok(x),
            Value::Text(_) => Err(TabulaError::NotNumeric {
                column: column.to_owned(),
            }),
        }
    }

    /// A view of one row, usable wherever a [`FeatureSource`](crate::FeatureSource)
    /// is expected.
    pub fn row(&self, index: usize) -> Result<Row<'_>> {
        if index >= self.row_count {
            return Err(TabulaError::RowOutOfRange {
                column: "*".to_owned(),
                row: index,
                rows: self.row_count,
            });
        }
        Ok(Row::new(self, index))
    }

    /// Appends a column.
    ///
    /// The first column fixes the row count; every later column must match it.
    /// With `include_as_feature = false` the column is stored but left out of
    /// [`feature_columns`](Matrix::feature_columns).
    ///
    /// # Errors
    ///
    /// - [`TabulaError::DuplicateColumn`] if `name` exists or is `"bias"`.
    /// - [`TabulaError::ShapeMismatch`] on a length mismatch.
    pub fn add_column(
        &mut self,
        name: impl Into<String>,
        values: impl Into<Column>,
        include_as_feature: bool,
    ) -> Result<()> {
        let name = name.into();
        let values = values.into();

        if name == BIAS_COLUMN || self.columns.contains_key(&name) {
            return Err(TabulaError::DuplicateColumn(name));
        }
        if self.names.is_empty() {
            self.row_count = values.len();
        } else if values.len() != self.row_count {
            return Err(TabulaError::ShapeMismatch {
                expected: format!("{} rows", self.row_count),
                got: format!("{} rows in column {:?}", values.len(), name),
            });
        }

        if !include_as_feature {
            self.excluded.insert(name.clone());
        } else if !values.is_numeric() {
            self.representation = Representation::Raw;
        }
        self.names.push(name.clone());
        self.columns.insert(name, values);
        self.features.take();
        Ok(())
    }

    /// Name of the label column.
    ///
    /// # Errors
    ///
    /// [`TabulaError::LabelNotSet`] before [`set_label_column`](Matrix::set_label_column).
    pub fn label_column(&self) -> Result<&str> {
        self.label.as_deref().ok_or(TabulaError::LabelNotSet)
    }

    /// Designates the label column and invalidates the cached feature list.
    ///
    /// # Errors
    ///
    /// [`TabulaError::UnknownLabel`] if no column has this name.
    pub fn set_label_column(&mut self, name: &str) -> Result<()> {
        let column = self
            .columns
            .get(name)
            .ok_or_else(|| TabulaError::UnknownLabel(name.to_owned()))?;
        if !column.is_numeric() {
            self.representation = Representation::Raw;
        }
        self.label = Some(name.to_owned());
        self.features.take();
        Ok(())
    }

    /// Feature column names, in insertion order, without the label.
    pub fn feature_columns(&self) -> &[String] {
        self.features.get_or_init(|| {
            self.names
                .iter()
                .filter(|name| Some(name.as_str()) != self.label.as_deref())
                .filter(|name| !self.excluded.contains(name.as_str()))
                .cloned()
                .collect()
        })
    }

    pub fn representation(&self) -> Representation {
        self.representation
    }

    pub fn is_numeric(&self) -> bool {
        self.representation == Representation::Numeric
    }

    /// Parses every feature column, and the label column if one is set, to
    /// numbers.
    ///
    /// All columns are parsed before any is replaced, so a failure leaves the
    /// table exactly as it was. Calling this on a numeric table is a no-op.
    pub fn convert_to_numeric(&mut self) -> Conversion {
        if self.is_numeric() {
            return Conversion::AlreadyNumeric;
        }
        debug!("attempting to convert data to numerical");

        let mut targets = self.feature_columns().to_vec();
        if let Some(label) = &self.label {
            targets.push(label.clone());
        }

        let mut parsed = Vec::with_capacity(targets.len());
        for name in targets {
            let Some(Column::Text(values)) = self.columns.get(&name) else {
                continue;
            };
            match parse_column(&name, values) {
                Ok(numbers) => parsed.push((name, numbers)),
                Err(failure) => {
                    warn!(%failure, "numerical conversion failed, some operations cannot be permitted");
                    return Conversion::Failed(failure);
                }
            }
        }

        let converted = parsed.len();
        for (name, numbers) in parsed {
            self.columns.insert(name, Column::Numeric(numbers));
        }
        self.representation = Representation::Numeric;
        info!(columns = converted, "numerical conversion successful");
        Conversion::Converted
    }

    /// Converts to numbers if needed, then lets `expander` add columns
    /// derived from the features up to `degree`.
    ///
    /// # Errors
    ///
    /// [`TabulaError::Conversion`] if the table cannot be made numeric, or
    /// whatever the expander reports.
    pub fn extend_with_degrees(
        &mut self,
        degree: usize,
        expander: &dyn FeatureExpander,
    ) -> Result<()> {
        if let Conversion::Failed(failure) = self.convert_to_numeric() {
            return Err(failure.into());
        }
        expander.expand(self, degree)
    }
}

fn parse_column(name: &str, values: &[String]) -> std::result::Result<Vec<Float>, ConversionFailure> {
    values
        .iter()
        .enumerate()
        .map(|(row, raw)| {
            raw.trim().parse::<Float>().map_err(|_| ConversionFailure {
                column: name.to_owned(),
                row,
                value: raw.clone(),
            })
        })
        .collect()
}

const CELL_WIDTH: usize = 13;

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Row size : {}", self.row_count)?;
        for row in 0..self.row_count {
            for name in &self.names {
                let rendered = self.columns[name]
                    .value(row)
                    .map(|v| v.to_string())
                    .unwrap_or_default();
                let cell: String = rendered.chars().take(CELL_WIDTH).collect();
                write!(f, "{}\t", cell)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
