//! Keyword/table container used for dust and filter files.
//!
//! A [`TableSet`] holds header keywords plus a list of named [`Table`]s, each
//! made of equal-length columns. Columns are either scalar (one value per
//! row) or fixed-width vectors (one row of an `Array2` per row), which is how
//! per-frequency scattering matrices are stored.
//!
//! On disk a table set is JSON, optionally gzip-compressed. Readers detect
//! compression from the gzip magic bytes, so callers never need to know how a
//! file was written.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Errors that can occur while building, writing or reading a table set
#[derive(Error, Debug)]
pub enum TableSetError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode table set: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Missing keyword '{0}'")]
    MissingKeyword(String),

    #[error("Keyword '{name}' should be {expected}, found {found}")]
    KeywordType {
        name: String,
        expected: &'static str,
        found: String,
    },

    #[error("Keyword '{0}' is not finite")]
    NonFiniteKeyword(String),

    #[error("Missing table '{0}'")]
    MissingTable(String),

    #[error("Table '{table}' has no column '{column}'")]
    MissingColumn { table: String, column: String },

    #[error("Column '{column}' of table '{table}' has width {width}, expected {expected}")]
    ColumnWidth {
        table: String,
        column: String,
        width: usize,
        expected: usize,
    },

    #[error("Column '{column}' of table '{table}' has {found} rows, expected {expected}")]
    RowMismatch {
        table: String,
        column: String,
        found: usize,
        expected: usize,
    },

    #[error("Column '{column}' of table '{table}' holds {len} values, not a multiple of width {width}")]
    RaggedColumn {
        table: String,
        column: String,
        len: usize,
        width: usize,
    },

    #[error("Column '{column}' of table '{table}' contains non-finite values")]
    NonFinite { table: String, column: String },
}

/// A header keyword value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Keyword {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Keyword {
    fn kind(&self) -> &'static str {
        match self {
            Keyword::Int(_) => "an integer",
            Keyword::Float(_) => "a float",
            Keyword::Text(_) => "a string",
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Keyword::Int(v) => write!(f, "{v}"),
            Keyword::Float(v) => write!(f, "{v}"),
            Keyword::Text(v) => write!(f, "'{v}'"),
        }
    }
}

impl From<i64> for Keyword {
    fn from(value: i64) -> Self {
        Keyword::Int(value)
    }
}

impl From<i32> for Keyword {
    fn from(value: i32) -> Self {
        Keyword::Int(value as i64)
    }
}

impl From<f64> for Keyword {
    fn from(value: f64) -> Self {
        Keyword::Float(value)
    }
}

impl From<&str> for Keyword {
    fn from(value: &str) -> Self {
        Keyword::Text(value.to_string())
    }
}

impl From<String> for Keyword {
    fn from(value: String) -> Self {
        Keyword::Text(value)
    }
}

/// Named header keywords with typed accessors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Keywords(BTreeMap<String, Keyword>);

impl Keywords {
    /// Set a keyword, replacing any previous value
    pub fn insert(&mut self, name: &str, value: impl Into<Keyword>) {
        self.0.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Keyword> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    fn require(&self, name: &str) -> Result<&Keyword, TableSetError> {
        self.0
            .get(name)
            .ok_or_else(|| TableSetError::MissingKeyword(name.to_string()))
    }

    /// Integer keyword
    pub fn int(&self, name: &str) -> Result<i64, TableSetError> {
        match self.require(name)? {
            Keyword::Int(v) => Ok(*v),
            other => Err(TableSetError::KeywordType {
                name: name.to_string(),
                expected: "an integer",
                found: format!("{} {}", other.kind(), other),
            }),
        }
    }

    /// Float keyword; integer values are widened
    pub fn float(&self, name: &str) -> Result<f64, TableSetError> {
        match self.require(name)? {
            Keyword::Float(v) => Ok(*v),
            Keyword::Int(v) => Ok(*v as f64),
            other => Err(TableSetError::KeywordType {
                name: name.to_string(),
                expected: "a float",
                found: format!("{} {}", other.kind(), other),
            }),
        }
    }

    /// String keyword
    pub fn text(&self, name: &str) -> Result<&str, TableSetError> {
        match self.require(name)? {
            Keyword::Text(v) => Ok(v),
            other => Err(TableSetError::KeywordType {
                name: name.to_string(),
                expected: "a string",
                found: format!("{} {}", other.kind(), other),
            }),
        }
    }

    fn check_finite(&self) -> Result<(), TableSetError> {
        for (name, value) in &self.0 {
            if let Keyword::Float(v) = value {
                if !v.is_finite() {
                    return Err(TableSetError::NonFiniteKeyword(name.clone()));
                }
            }
        }
        Ok(())
    }
}

/// A column: `width` values per row, stored row-major
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    width: usize,
    data: Vec<f64>,
}

impl Column {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn rows(&self) -> usize {
        if self.width == 0 {
            0
        } else {
            self.data.len() / self.width
        }
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }
}

/// A named table of equal-length columns with its own keywords
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    name: String,
    #[serde(default)]
    pub keywords: Keywords,
    columns: BTreeMap<String, Column>,
}

impl Table {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            keywords: Keywords::default(),
            columns: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a scalar column (one value per row)
    pub fn add_column(&mut self, name: &str, values: impl Into<Vec<f64>>) {
        self.columns.insert(
            name.to_string(),
            Column {
                width: 1,
                data: values.into(),
            },
        );
    }

    /// Add a vector column; each row of `values` becomes one table row
    pub fn add_vector_column(&mut self, name: &str, values: &Array2<f64>) {
        let (_, width) = values.dim();
        self.columns.insert(
            name.to_string(),
            Column {
                width,
                data: values.iter().copied().collect(),
            },
        );
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    fn require(&self, name: &str) -> Result<&Column, TableSetError> {
        self.columns
            .get(name)
            .ok_or_else(|| TableSetError::MissingColumn {
                table: self.name.clone(),
                column: name.to_string(),
            })
    }

    /// Values of a scalar column
    pub fn column(&self, name: &str) -> Result<&[f64], TableSetError> {
        let column = self.require(name)?;
        if column.width != 1 {
            return Err(TableSetError::ColumnWidth {
                table: self.name.clone(),
                column: name.to_string(),
                width: column.width,
                expected: 1,
            });
        }
        Ok(&column.data)
    }

    /// A vector column as a `(rows, width)` array
    pub fn vector_column(&self, name: &str) -> Result<Array2<f64>, TableSetError> {
        let column = self.require(name)?;
        Array2::from_shape_vec((column.rows(), column.width), column.data.clone()).map_err(|_| {
            TableSetError::RaggedColumn {
                table: self.name.clone(),
                column: name.to_string(),
                len: column.data.len(),
                width: column.width,
            }
        })
    }

    /// Number of rows, taken from any column
    pub fn n_rows(&self) -> usize {
        self.columns.values().next().map_or(0, Column::rows)
    }

    /// Check structural consistency of every column.
    ///
    /// With `require_finite`, NaN and infinities are rejected as well.
    pub fn validate(&self, require_finite: bool) -> Result<(), TableSetError> {
        let expected_rows = self.n_rows();

        for (name, column) in &self.columns {
            if column.width == 0 || column.data.len() % column.width != 0 {
                return Err(TableSetError::RaggedColumn {
                    table: self.name.clone(),
                    column: name.clone(),
                    len: column.data.len(),
                    width: column.width,
                });
            }

            if column.rows() != expected_rows {
                return Err(TableSetError::RowMismatch {
                    table: self.name.clone(),
                    column: name.clone(),
                    found: column.rows(),
                    expected: expected_rows,
                });
            }

            if require_finite && column.data.iter().any(|v| !v.is_finite()) {
                return Err(TableSetError::NonFinite {
                    table: self.name.clone(),
                    column: name.clone(),
                });
            }
        }

        if require_finite {
            self.keywords.check_finite()?;
        }

        Ok(())
    }
}

/// Header keywords plus an ordered list of named tables
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableSet {
    #[serde(default)]
    pub keywords: Keywords,
    tables: Vec<Table>,
}

impl TableSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a header keyword
    pub fn add_keyword(&mut self, name: &str, value: impl Into<Keyword>) {
        self.keywords.insert(name, value);
    }

    /// Add a table, replacing any existing table of the same name
    pub fn add_table(&mut self, table: Table) {
        match self.tables.iter_mut().find(|t| t.name == table.name) {
            Some(existing) => *existing = table,
            None => self.tables.push(table),
        }
    }

    pub fn contains_table(&self, name: &str) -> bool {
        self.tables.iter().any(|t| t.name == name)
    }

    /// Look up a table by name
    pub fn table(&self, name: &str) -> Result<&Table, TableSetError> {
        self.tables
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| TableSetError::MissingTable(name.to_string()))
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Write the table set to `path`, gzip-compressed if `compress` is set.
    ///
    /// The set is validated first; non-finite values cannot be represented
    /// in the output and are rejected.
    pub fn write<P: AsRef<Path>>(&self, path: P, compress: bool) -> Result<(), TableSetError> {
        let path = path.as_ref();

        self.keywords.check_finite()?;
        for table in &self.tables {
            table.validate(true)?;
        }

        let io_err = |source| TableSetError::Io {
            path: path.to_path_buf(),
            source,
        };

        let file = File::create(path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);

        if compress {
            let mut encoder = GzEncoder::new(&mut writer, Compression::default());
            serde_json::to_writer(&mut encoder, self).map_err(TableSetError::Encode)?;
            encoder.finish().map_err(io_err)?;
        } else {
            serde_json::to_writer(&mut writer, self).map_err(TableSetError::Encode)?;
        }

        writer.flush().map_err(io_err)?;
        log::debug!(
            "Wrote {} tables to {} (compressed: {})",
            self.tables.len(),
            path.display(),
            compress
        );
        Ok(())
    }

    /// Read a table set written by [`TableSet::write`]
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, TableSetError> {
        let path = path.as_ref();
        let io_err = |source| TableSetError::Io {
            path: path.to_path_buf(),
            source,
        };

        let raw = std::fs::read(path).map_err(io_err)?;

        let bytes = if raw.starts_with(&GZIP_MAGIC) {
            let mut decoded = Vec::new();
            GzDecoder::new(raw.as_slice())
                .read_to_end(&mut decoded)
                .map_err(io_err)?;
            decoded
        } else {
            raw
        };

        let table_set: TableSet =
            serde_json::from_slice(&bytes).map_err(|source| TableSetError::Decode {
                path: path.to_path_buf(),
                source,
            })?;

        for table in &table_set.tables {
            table.validate(false)?;
        }

        Ok(table_set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;
    use tempfile::NamedTempFile;

    fn sample_set() -> TableSet {
        let mut ts = TableSet::new();
        ts.add_keyword("version", 1);
        ts.add_keyword("energy", 1.5e10);
        ts.add_keyword("mode", "fast");

        let mut table = Table::new("optical_properties");
        table.add_column("nu", vec![1e14, 2e14]);
        table.add_vector_column("P1", &array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        table.keywords.insert("kind", "test");
        ts.add_table(table);
        ts
    }

    #[test]
    fn test_roundtrip_uncompressed() {
        let file = NamedTempFile::new().unwrap();
        let ts = sample_set();

        ts.write(file.path(), false).unwrap();
        let read = TableSet::read(file.path()).unwrap();

        assert_eq!(read, ts);
    }

    #[test]
    fn test_roundtrip_compressed() {
        let file = NamedTempFile::new().unwrap();
        let ts = sample_set();

        ts.write(file.path(), true).unwrap();
        let raw = std::fs::read(file.path()).unwrap();
        assert!(raw.starts_with(&GZIP_MAGIC));

        let read = TableSet::read(file.path()).unwrap();
        assert_eq!(read.keywords.int("version").unwrap(), 1);
        assert_relative_eq!(read.keywords.float("energy").unwrap(), 1.5e10);
        assert_eq!(read.keywords.text("mode").unwrap(), "fast");

        let table = read.table("optical_properties").unwrap();
        assert_eq!(table.keywords.text("kind").unwrap(), "test");
        let p1 = table.vector_column("P1").unwrap();
        assert_eq!(p1.dim(), (2, 3));
        assert_eq!(p1[[1, 2]], 6.0);
    }

    #[test]
    fn test_integral_float_keyword_stays_float() {
        let file = NamedTempFile::new().unwrap();
        let mut ts = TableSet::new();
        ts.add_keyword("threshold", 1500.0);
        ts.write(file.path(), false).unwrap();

        let read = TableSet::read(file.path()).unwrap();
        assert_eq!(read.keywords.get("threshold"), Some(&Keyword::Float(1500.0)));
    }

    #[test]
    fn test_keyword_type_errors() {
        let ts = sample_set();
        assert!(matches!(
            ts.keywords.int("mode"),
            Err(TableSetError::KeywordType { .. })
        ));
        assert!(matches!(
            ts.keywords.text("version"),
            Err(TableSetError::KeywordType { .. })
        ));
        assert!(matches!(
            ts.keywords.int("missing"),
            Err(TableSetError::MissingKeyword(_))
        ));
        // Integers widen to floats
        assert_eq!(ts.keywords.float("version").unwrap(), 1.0);
    }

    #[test]
    fn test_scalar_access_to_vector_column_fails() {
        let ts = sample_set();
        let table = ts.table("optical_properties").unwrap();
        assert!(matches!(
            table.column("P1"),
            Err(TableSetError::ColumnWidth { width: 3, .. })
        ));
        assert!(matches!(
            table.column("chi"),
            Err(TableSetError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_write_rejects_nan() {
        let file = NamedTempFile::new().unwrap();
        let mut ts = TableSet::new();
        let mut table = Table::new("t");
        table.add_column("x", vec![1.0, f64::NAN]);
        ts.add_table(table);

        assert!(matches!(
            ts.write(file.path(), false),
            Err(TableSetError::NonFinite { .. })
        ));
    }

    #[test]
    fn test_write_rejects_row_mismatch() {
        let file = NamedTempFile::new().unwrap();
        let mut ts = TableSet::new();
        let mut table = Table::new("t");
        table.add_column("a", vec![1.0, 2.0]);
        table.add_column("b", vec![1.0, 2.0, 3.0]);
        ts.add_table(table);

        assert!(matches!(
            ts.write(file.path(), false),
            Err(TableSetError::RowMismatch { .. })
        ));
    }

    #[test]
    fn test_add_table_replaces_same_name() {
        let mut ts = TableSet::new();
        let mut first = Table::new("t");
        first.add_column("a", vec![1.0]);
        ts.add_table(first);

        let mut second = Table::new("t");
        second.add_column("a", vec![2.0]);
        ts.add_table(second);

        assert_eq!(ts.tables().len(), 1);
        assert_eq!(ts.table("t").unwrap().column("a").unwrap(), &[2.0]);
    }

    #[test]
    fn test_read_garbage_fails() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "not json").unwrap();
        assert!(matches!(
            TableSet::read(file.path()),
            Err(TableSetError::Decode { .. })
        ));
    }
}
