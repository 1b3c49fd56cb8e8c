//! Log-log interpolation and NaN repair for tabulated optical data.
//!
//! Measured and Mie-computed dust tables span many decades in both wavelength
//! and value, so gaps are filled by interpolating linearly in `(ln x, ln y)`.
//! A value that cannot be recovered this way (outside the valid range, or a
//! non-positive neighbour) stays NaN and is reported as an error rather than
//! being silently passed on.

use ndarray::ArrayViewMut1;
use thiserror::Error;

/// Errors that can occur during interpolation operations.
#[derive(Error, Debug)]
pub enum InterpError {
    #[error("Value {0} is out of bounds for interpolation range [{1}, {2}]")]
    OutOfBounds(f64, f64, f64),
    #[error("Input vectors must have at least 2 points")]
    InsufficientData,
    #[error("Input vectors must have the same length")]
    MismatchedLengths,
    #[error("X values must be sorted in ascending order")]
    UnsortedData,
    #[error("Cannot interpolate at non-finite value {0}")]
    NonFinite(f64),
}

/// Errors raised while repairing NaN entries in a tabulated quantity.
#[derive(Error, Debug)]
pub enum RepairError {
    #[error("{label}: abscissa has {xs} points but {values} values were given")]
    MismatchedLengths {
        label: String,
        xs: usize,
        values: usize,
    },
    #[error("Did not manage to fix NaN values in {label} ({remaining} remaining)")]
    Unrepaired { label: String, remaining: usize },
}

/// Interpolate in log-log space without validation.
///
/// `xs` must be ascending and finite. Returns NaN when `x` is not finite or
/// lies outside `[xs[0], xs[n-1]]`.
fn loglog_at(x: f64, xs: &[f64], ys: &[f64]) -> f64 {
    if !x.is_finite() || xs.len() < 2 || x < xs[0] || x > xs[xs.len() - 1] {
        return f64::NAN;
    }

    let idx = match xs.binary_search_by(|node| node.total_cmp(&x)) {
        Ok(exact_idx) => return ys[exact_idx],
        Err(insert_idx) => insert_idx,
    };

    let (x1, x2) = (xs[idx - 1], xs[idx]);
    let (y1, y2) = (ys[idx - 1], ys[idx]);

    let t = (x.ln() - x1.ln()) / (x2.ln() - x1.ln());
    (y1.ln() + t * (y2.ln() - y1.ln())).exp()
}

/// Performs linear interpolation of `ln y` against `ln x`.
///
/// # Arguments
///
/// * `x` - The x-coordinate at which to interpolate (must be positive)
/// * `xs` - Strictly ascending, positive x-coordinates
/// * `ys` - Positive y-values matching `xs`
///
/// # Errors
///
/// * `InterpError::NonFinite` - x is NaN or infinite
/// * `InterpError::OutOfBounds` - x is outside the range \\[xs\\[0\\], xs\\[n-1\\]\\]
/// * `InterpError::InsufficientData` - Less than 2 data points provided
/// * `InterpError::MismatchedLengths` - xs and ys have different lengths
/// * `InterpError::UnsortedData` - xs array is not strictly ascending
pub fn interp_loglog(x: f64, xs: &[f64], ys: &[f64]) -> Result<f64, InterpError> {
    if !x.is_finite() {
        return Err(InterpError::NonFinite(x));
    }

    if xs.len() != ys.len() {
        return Err(InterpError::MismatchedLengths);
    }

    if xs.len() < 2 {
        return Err(InterpError::InsufficientData);
    }

    for i in 1..xs.len() {
        if xs[i] <= xs[i - 1] {
            return Err(InterpError::UnsortedData);
        }
    }

    let min_x = xs[0];
    let max_x = xs[xs.len() - 1];

    if x < min_x || x > max_x {
        return Err(InterpError::OutOfBounds(x, min_x, max_x));
    }

    Ok(loglog_at(x, xs, ys))
}

/// Replace NaN entries of `values` by log-log interpolation over the valid ones.
///
/// `xs` is the shared abscissa (typically wavelength) and need not be sorted.
/// Entries whose abscissa is not finite are never used as interpolation nodes,
/// and a NaN value at such an entry counts as unrepaired. Returns the number of entries that were repaired. Finding NaN values is an
/// advisory condition and is logged as a warning; failing to repair every one
/// of them is an error.
pub fn repair_nan_loglog(
    xs: &[f64],
    mut values: ArrayViewMut1<'_, f64>,
    label: &str,
) -> Result<usize, RepairError> {
    if xs.len() != values.len() {
        return Err(RepairError::MismatchedLengths {
            label: label.to_string(),
            xs: xs.len(),
            values: values.len(),
        });
    }

    let invalid: Vec<usize> = values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_nan())
        .map(|(i, _)| i)
        .collect();

    if invalid.is_empty() {
        return Ok(0);
    }

    log::warn!(
        "NaN values found inside {} ({} of {}) - interpolating",
        label,
        invalid.len(),
        values.len()
    );

    let mut valid: Vec<(f64, f64)> = xs
        .iter()
        .zip(values.iter())
        .filter(|(x, v)| x.is_finite() && !v.is_nan())
        .map(|(&x, &v)| (x, v))
        .collect();
    valid.sort_by(|a, b| a.0.total_cmp(&b.0));

    let (valid_x, valid_y): (Vec<f64>, Vec<f64>) = valid.into_iter().unzip();

    for &i in &invalid {
        values[i] = loglog_at(xs[i], &valid_x, &valid_y);
    }

    let remaining = invalid.iter().filter(|&&i| values[i].is_nan()).count();
    if remaining > 0 {
        return Err(RepairError::Unrepaired {
            label: label.to_string(),
            remaining,
        });
    }

    Ok(invalid.len())
}
