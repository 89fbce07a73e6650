use std::collections::HashMap;
use std::io::{BufRead, Write};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tabula_core::{BIAS_COLUMN, Float, Result, TabulaError, Vector};

/// Fitted coefficients keyed by column name.
///
/// Two aligned structures: an ordered name→position mapping and a contiguous
/// [`Vector`] of values. Position `0` is always [`BIAS_COLUMN`]; the others
/// follow in the order the names were first inserted. The layout is fixed at
/// construction; only the values change during training.
///
/// With the `serde` feature the value is stored as parallel `names` and
/// `values` lists. Deserializing runs the same layout checks as
/// [`read_from`](Coefficients::read_from).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(try_from = "CoefficientTable", into = "CoefficientTable")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct Coefficients {
    names: Vec<String>,
    positions: HashMap<String, usize>,
    values: Vector,
}

/// Serialized form of [`Coefficients`].
#[cfg(feature = "serde")]
#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct CoefficientTable {
    names: Vec<String>,
    values: Vec<Float>,
}

#[cfg(feature = "serde")]
impl From<Coefficients> for CoefficientTable {
    fn from(coefficients: Coefficients) -> Self {
        Self {
            names: coefficients.names,
            values: coefficients.values.iter().copied().collect(),
        }
    }
}

#[cfg(feature = "serde")]
impl TryFrom<CoefficientTable> for Coefficients {
    type Error = String;

    fn try_from(table: CoefficientTable) -> std::result::Result<Self, Self::Error> {
        Coefficients::from_parts(table.names, table.values)
    }
}

impl Coefficients {
    /// Zero coefficients for `bias` followed by `features`.
    ///
    /// Repeated names, a feature literally named `"bias"`, and `exclude` (the
    /// label column) are skipped, so every name owns exactly one slot.
    pub fn zeros<'a, I>(features: I, exclude: &str) -> Self
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut names = vec![BIAS_COLUMN.to_owned()];
        let mut positions = HashMap::from([(BIAS_COLUMN.to_owned(), 0)]);

        for name in features {
            if name == exclude || positions.contains_key(name) {
                continue;
            }
            positions.insert(name.clone(), names.len());
            names.push(name.clone());
        }

        let values = Vector::zeros(names.len());
        Self {
            names,
            positions,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false: every constructor, deserialization included, requires the bias slot.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names in position order, bias first.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<Float> {
        self.index_of(name).map(|i| self.values[i])
    }

    pub fn values(&self) -> &Vector {
        &self.values
    }

    /// `(name, value)` pairs in position order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Float)> + '_ {
        self.names
            .iter()
            .zip(self.values.iter())
            .map(|(name, &value)| (name.as_str(), value))
    }

    /// Swaps the live values with a fully computed buffer of the same length.
    ///
    /// After the call `next` holds the previous values and may be reused as
    /// scratch space for the following step.
    pub(crate) fn swap_values(&mut self, next: &mut Vector) {
        debug_assert_eq!(next.len(), self.values.len());
        std::mem::swap(&mut self.values, next);
    }

    /// Writes one `name,value` line per coefficient, bias first.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        for (name, value) in self.iter() {
            writeln!(writer, "{},{}", name, value)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Parses lines written by [`write_to`](Coefficients::write_to).
    ///
    /// Blank lines are ignored. The first line must be the bias coefficient.
    ///
    /// # Errors
    ///
    /// [`TabulaError::Csv`] for a line without a comma, an unparsable value,
    /// a repeated name, or a missing leading bias line.
    pub fn read_from<R: BufRead>(reader: R) -> Result<Self> {
        let mut names = Vec::new();
        let mut values = Vec::new();

        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (name, raw) = line.rsplit_once(',').ok_or_else(|| {
                TabulaError::Csv(format!("line {}: expected `name,value`", number + 1))
            })?;
            let value: Float = raw.trim().parse().map_err(|_| {
                TabulaError::Csv(format!("line {}: invalid coefficient {:?}", number + 1, raw))
            })?;
            names.push(name.to_owned());
            values.push(value);
        }

        Self::from_parts(names, values).map_err(TabulaError::Csv)
    }

    /// Builds a layout from parallel name and value lists.
    ///
    /// The lists must have the same length, start with [`BIAS_COLUMN`] and
    /// hold no repeated name.
    fn from_parts(names: Vec<String>, values: Vec<Float>) -> std::result::Result<Self, String> {
        if names.len() != values.len() {
            return Err(format!(
                "{} coefficient names but {} values",
                names.len(),
                values.len()
            ));
        }
        if names.first().map(String::as_str) != Some(BIAS_COLUMN) {
            return Err(format!("first coefficient must be {:?}", BIAS_COLUMN));
        }

        let mut positions = HashMap::with_capacity(names.len());
        for (index, name) in names.iter().enumerate() {
            if positions.insert(name.clone(), index).is_some() {
                return Err(format!("duplicate coefficient {:?}", name));
            }
        }

        Ok(Self {
            names,
            positions,
            values: Vector::from_vec(values),
        })
    }
}
