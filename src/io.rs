use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tabula_core::{Matrix, Result, TabulaError};
use tabula_models::Coefficients;
use tracing::debug;

/// How [`read_csv`] splits and names columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvOptions {
    /// Take column names from the first line. Without a header columns are
    /// named by position: `"0"`, `"1"`, ...
    pub has_header: bool,
    pub delimiter: char,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            has_header: false,
            delimiter: ',',
        }
    }
}

pub fn read_csv(path: impl AsRef<Path>, options: &CsvOptions) -> Result<Matrix> {
    let path = path.as_ref();
    let matrix = read_csv_from(BufReader::new(File::open(path)?), options)?;
    debug!(
        path = %path.display(),
        rows = matrix.row_count(),
        columns = matrix.column_count(),
        "loaded csv"
    );
    Ok(matrix)
}

/// Reads delimited text into a table of [`Column::Text`](tabula_core::Column::Text)
/// columns. Blank lines are skipped.
///
/// # Errors
///
/// - [`TabulaError::Csv`] if the input has no lines or a row has the wrong
///   number of fields.
/// - [`TabulaError::DuplicateColumn`] for repeated header names.
pub fn read_csv_from<R: BufRead>(reader: R, options: &CsvOptions) -> Result<Matrix> {
    let mut names: Option<Vec<String>> = None;
    let mut columns: Vec<Vec<String>> = Vec::new();

    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(options.delimiter).collect();

        let Some(expected) = names.as_ref().map(Vec::len) else {
            if options.has_header {
                names = Some(fields.iter().map(|f| f.trim().to_owned()).collect());
                columns = vec![Vec::new(); fields.len()];
                continue;
            }
            names = Some((0..fields.len()).map(|i| i.to_string()).collect());
            columns = fields.iter().map(|f| vec![(*f).to_owned()]).collect();
            continue;
        };

        if fields.len() != expected {
            return Err(TabulaError::Csv(format!(
                "line {}: expected {} fields, found {}",
                number + 1,
                expected,
                fields.len()
            )));
        }
        for (column, field) in columns.iter_mut().zip(fields) {
            column.push(field.to_owned());
        }
    }

    let names = names.ok_or_else(|| TabulaError::Csv("no data".into()))?;
    Matrix::from_columns(names.into_iter().zip(columns))
}

pub fn write_csv(matrix: &Matrix, path: impl AsRef<Path>) -> Result<()> {
    write_csv_to(matrix, BufWriter::new(File::create(path)?))
}

/// Writes a header of column names followed by one line per row.
pub fn write_csv_to<W: Write>(matrix: &Matrix, mut writer: W) -> Result<()> {
    writeln!(writer, "{}", matrix.column_names().join(","))?;
    for row in 0..matrix.row_count() {
        let cells = matrix
            .column_names()
            .iter()
            .map(|name| matrix.cell(name, row).map(|v| v.to_string()))
            .collect::<Result<Vec<_>>>()?;
        writeln!(writer, "{}", cells.join(","))?;
    }
    writer.flush()?;
    Ok(())
}

/// `path` with a `.csv` extension appended unless it already has one.
pub fn with_csv_extension(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if is_csv {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_owned();
        name.push(".csv");
        PathBuf::from(name)
    }
}

/// Writes `name,value` lines and returns the path actually written.
pub fn save_coefficients(coefficients: &Coefficients, path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = with_csv_extension(path);
    coefficients.write_to(BufWriter::new(File::create(&path)?))?;
    debug!(path = %path.display(), count = coefficients.len(), "saved coefficients");
    Ok(path)
}

pub fn load_coefficients(path: impl AsRef<Path>) -> Result<Coefficients> {
    Coefficients::read_from(BufReader::new(File::open(path)?))
}
