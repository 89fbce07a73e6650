use tabula_core::{FeatureExpander, Float, Matrix, Result};
use tracing::debug;

/// Adds **polynomial feature columns** built from the existing features.
///
/// For every degree `d` in `2..=degree` and every multiset of `d` feature
/// columns (taken in feature order), the element-wise product is added as a
/// new feature:
///
/// ```text
/// features [x1, x2], degree 3
///   d = 2:  x1^2, x1*x2, x2^2
///   d = 3:  x1^3, x1^2*x2, x1*x2^2, x2^3
/// ```
///
/// Only the columns that were features before the call are combined; the new
/// columns never feed into higher degrees of the same call. A name that
/// already exists is left alone, so repeating the expansion is harmless.
/// Degrees `0` and `1` add nothing.
///
/// Use it through [`Matrix::extend_with_degrees`], which converts the table
/// to numbers first.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolynomialFeatures;

impl FeatureExpander for PolynomialFeatures {
    fn expand(&self, matrix: &mut Matrix, degree: usize) -> Result<()> {
        let base = matrix.feature_columns().to_vec();
        let columns = base
            .iter()
            .map(|name| matrix.numeric_column(name).map(<[Float]>::to_vec))
            .collect::<Result<Vec<_>>>()?;
        let rows = matrix.row_count();

        let mut added = 0;
        for d in 2..=degree {
            for factors in multisets(base.len(), d) {
                let name = monomial_name(&base, &factors);
                if matrix.contains(&name) {
                    continue;
                }
                let values: Vec<Float> = (0..rows)
                    .map(|row| factors.iter().map(|&j| columns[j][row]).product())
                    .collect();
                matrix.add_column(name, values, true)?;
                added += 1;
            }
        }

        debug!(degree, added, "polynomial features added");
        Ok(())
    }
}

/// Non-decreasing index sequences of length `len` over `0..n`.
fn multisets(n: usize, len: usize) -> Vec<Vec<usize>> {
    if n == 0 || len == 0 {
        return Vec::new();
    }

    let mut out = Vec::new();
    let mut current = vec![0; len];
    loop {
        out.push(current.clone());

        let Some(pos) = current.iter().rposition(|&i| i + 1 < n) else {
            return out;
        };
        let next = current[pos] + 1;
        for slot in &mut current[pos..] {
            *slot = next;
        }
    }
}

/// `x1^2*x2` style name for a sorted list of factor indices.
fn monomial_name(names: &[String], factors: &[usize]) -> String {
    let mut parts = Vec::new();
    let mut i = 0;
    while i < factors.len() {
        let j = factors[i];
        let power = factors[i..].iter().take_while(|&&k| k == j).count();
        if power == 1 {
            parts.push(names[j].clone());
        } else {
            parts.push(format!("{}^{}", names[j], power));
        }
        i += power;
    }
    parts.join("*")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_core::TabulaError;

    fn table() -> Matrix {
        let mut m = Matrix::from_columns([
            ("x1", vec!["1", "2", "3"]),
            ("x2", vec!["2", "0", "-1"]),
            ("y", vec!["0", "1", "1"]),
        ])
        .unwrap();
        m.set_label_column("y").unwrap();
        m
    }

    #[test]
    fn test_multisets_counts() {
        assert_eq!(multisets(2, 2), vec![vec![0, 0], vec![0, 1], vec![1, 1]]);
        assert_eq!(multisets(3, 3).len(), 10);
        assert!(multisets(0, 2).is_empty());
    }

    #[test]
    fn test_monomial_names() {
        let names = vec!["a".to_string(), "b".to_string()];
        assert_eq!(monomial_name(&names, &[0, 0, 1]), "a^2*b");
        assert_eq!(monomial_name(&names, &[1]), "b");
        assert_eq!(monomial_name(&names, &[0, 1, 1, 1]), "a*b^3");
    }

    #[test]
    fn test_degree_two_expansion() {
        let mut m = table();
        m.extend_with_degrees(2, &PolynomialFeatures).unwrap();

        assert_eq!(m.feature_columns(), ["x1", "x2", "x1^2", "x1*x2", "x2^2"]);
        assert_eq!(m.numeric_column("x1^2").unwrap(), &[1.0, 4.0, 9.0]);
        assert_eq!(m.numeric_column("x1*x2").unwrap(), &[2.0, 0.0, -3.0]);
        assert_eq!(m.numeric_column("x2^2").unwrap(), &[4.0, 0.0, 1.0]);
    }

    #[test]
    fn test_degree_three_adds_cubic_terms() {
        let mut m = table();
        m.extend_with_degrees(3, &PolynomialFeatures).unwrap();
        assert_eq!(m.feature_columns().len(), 2 + 3 + 4);
        assert_eq!(m.numeric_column("x1^2*x2").unwrap(), &[2.0, 0.0, -9.0]);
    }

    #[test]
    fn test_low_degree_is_noop() {
        let mut m = table();
        m.extend_with_degrees(1, &PolynomialFeatures).unwrap();
        assert_eq!(m.feature_columns(), ["x1", "x2"]);
        assert!(m.is_numeric());
    }

    #[test]
    fn test_repeat_expansion_skips_existing() {
        let mut m = table();
        m.extend_with_degrees(2, &PolynomialFeatures).unwrap();
        let count = m.column_count();
        // second pass combines the five current features; existing names stay
        m.extend_with_degrees(2, &PolynomialFeatures).unwrap();
        assert!(m.column_count() > count);
        assert_eq!(m.numeric_column("x1^2").unwrap(), &[1.0, 4.0, 9.0]);
    }

    #[test]
    fn test_expansion_requires_numeric_data() {
        let mut m = Matrix::from_columns([("x", vec!["a", "b"])]).unwrap();
        let result = m.extend_with_degrees(2, &PolynomialFeatures);
        assert!(matches!(result, Err(TabulaError::Conversion(_))));
    }
}
