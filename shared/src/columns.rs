//! Reader for whitespace-delimited numeric text tables.
//!
//! Third-party dust codes write plain-text tables with fixed-size headers,
//! so everything here is addressed by raw line index: a `skip` count always
//! refers to physical lines in the file, comment and blank lines included.
//! After the skipped header, blank lines and lines starting with `#` are
//! ignored.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur while reading a text table
#[derive(Error, Debug)]
pub enum ColumnsError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("{}: expected at least {needed} lines, found {found}", path.display())]
    Truncated {
        path: PathBuf,
        needed: usize,
        found: usize,
    },

    #[error("{}: no data rows after skipping {skip} lines", path.display())]
    Empty { path: PathBuf, skip: usize },
}

/// Parse a single numeric token, accepting Fortran `D` exponents and NaN.
fn parse_token(token: &str) -> Option<f64> {
    token.parse::<f64>().ok().or_else(|| {
        if token.contains(['D', 'd']) {
            token.replace(['D', 'd'], "E").parse::<f64>().ok()
        } else {
            None
        }
    })
}

/// Lines of a text table held in memory
#[derive(Debug, Clone)]
pub struct TextTable {
    path: PathBuf,
    lines: Vec<String>,
}

impl TextTable {
    /// Read a whole file into memory.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ColumnsError> {
        let path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&path).map_err(|source| ColumnsError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(Self::from_str_with_path(&content, path))
    }

    /// Build a table from in-memory text; `path` is only used in error messages.
    pub fn from_str_with_path(content: &str, path: PathBuf) -> Self {
        Self {
            path,
            lines: content.lines().map(str::to_string).collect(),
        }
    }

    /// Source path of the table
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of physical lines
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Number of physical lines up to the last one that is not blank
    pub fn trimmed_len(&self) -> usize {
        self.lines
            .iter()
            .rposition(|line| !line.trim().is_empty())
            .map_or(0, |last| last + 1)
    }

    /// True if the file has no lines at all
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Raw line at a 0-based index
    pub fn line(&self, index: usize) -> Result<&str, ColumnsError> {
        self.lines
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| ColumnsError::Truncated {
                path: self.path.clone(),
                needed: index + 1,
                found: self.lines.len(),
            })
    }

    /// Whitespace-separated token `token` of line `index` (both 0-based)
    pub fn token(&self, index: usize, token: usize) -> Result<&str, ColumnsError> {
        let line = self.line(index)?;
        line.split_whitespace()
            .nth(token)
            .ok_or_else(|| ColumnsError::Parse {
                path: self.path.clone(),
                line: index + 1,
                message: format!("missing field {}", token + 1),
            })
    }

    /// Numeric value of token `token` on line `index` (both 0-based)
    pub fn value(&self, index: usize, token: usize) -> Result<f64, ColumnsError> {
        let raw = self.token(index, token)?;
        parse_token(raw).ok_or_else(|| ColumnsError::Parse {
            path: self.path.clone(),
            line: index + 1,
            message: format!("cannot parse '{raw}' as a number"),
        })
    }

    /// All numeric rows after `skip` physical lines.
    ///
    /// Every data row must have the same number of fields.
    pub fn rows(&self, skip: usize) -> Result<Vec<Vec<f64>>, ColumnsError> {
        let mut rows: Vec<Vec<f64>> = Vec::new();

        for (index, line) in self.lines.iter().enumerate().skip(skip) {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let row = trimmed
                .split_whitespace()
                .map(|raw| {
                    parse_token(raw).ok_or_else(|| ColumnsError::Parse {
                        path: self.path.clone(),
                        line: index + 1,
                        message: format!("cannot parse '{raw}' as a number"),
                    })
                })
                .collect::<Result<Vec<f64>, _>>()?;

            if let Some(first) = rows.first() {
                if first.len() != row.len() {
                    return Err(ColumnsError::Parse {
                        path: self.path.clone(),
                        line: index + 1,
                        message: format!("expected {} fields, found {}", first.len(), row.len()),
                    });
                }
            }

            rows.push(row);
        }

        if rows.is_empty() {
            return Err(ColumnsError::Empty {
                path: self.path.clone(),
                skip,
            });
        }

        Ok(rows)
    }

    /// Selected columns of the numeric rows after `skip` physical lines.
    ///
    /// Returns one vector per entry of `usecols`, in that order. Rows may
    /// carry extra trailing fields; they are ignored.
    pub fn columns(&self, skip: usize, usecols: &[usize]) -> Result<Vec<Vec<f64>>, ColumnsError> {
        let mut columns: Vec<Vec<f64>> = vec![Vec::new(); usecols.len()];

        for (index, line) in self.lines.iter().enumerate().skip(skip) {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = trimmed.split_whitespace().collect();
            for (column, &col) in columns.iter_mut().zip(usecols) {
                let raw = fields.get(col).ok_or_else(|| ColumnsError::Parse {
                    path: self.path.clone(),
                    line: index + 1,
                    message: format!("missing field {} (row has {})", col + 1, fields.len()),
                })?;
                let value = parse_token(raw).ok_or_else(|| ColumnsError::Parse {
                    path: self.path.clone(),
                    line: index + 1,
                    message: format!("cannot parse '{raw}' as a number"),
                })?;
                column.push(value);
            }
        }

        if columns.first().map_or(true, |c| c.is_empty()) {
            return Err(ColumnsError::Empty {
                path: self.path.clone(),
                skip,
            });
        }

        Ok(columns)
    }

    /// A single-column or single-row file flattened into one vector
    pub fn values(&self, skip: usize) -> Result<Vec<f64>, ColumnsError> {
        Ok(self.rows(skip)?.into_iter().flatten().collect())
    }
}
