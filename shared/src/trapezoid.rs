//! Trapezoidal integration over tabulated samples

use thiserror::Error;

/// Errors that can occur during trapezoidal integration
#[derive(Debug, Error)]
pub enum TrapezoidError {
    #[error("Insufficient points for integration, need at least 2 points")]
    InsufficientPoints,

    #[error("Abscissa and ordinate must have the same length ({0} vs {1})")]
    LengthMismatch(usize, usize),

    #[error("Points must be strictly monotonic")]
    NotMonotonic,
}

/// Performs trapezoidal integration of sampled values.
///
/// The abscissa may be ascending or descending (frequency grids derived from
/// ascending wavelengths run backwards); a descending grid yields the
/// negated integral, so ratios of integrals over the same grid are unaffected.
///
/// # Arguments
///
/// * `xs` - Strictly monotonic x coordinates
/// * `ys` - Sample values at each x
pub fn trap_integrate_samples(xs: &[f64], ys: &[f64]) -> Result<f64, TrapezoidError> {
    if xs.len() != ys.len() {
        return Err(TrapezoidError::LengthMismatch(xs.len(), ys.len()));
    }

    if xs.len() < 2 {
        return Err(TrapezoidError::InsufficientPoints);
    }

    let ascending = xs[1] > xs[0];
    for i in 1..xs.len() {
        let step_ok = if ascending {
            xs[i] > xs[i - 1]
        } else {
            xs[i] < xs[i - 1]
        };
        if !step_ok {
            return Err(TrapezoidError::NotMonotonic);
        }
    }

    // ∫[x₁,x₂] f(x)dx ≈ (x₂-x₁) × (f(x₁)+f(x₂))/2
    let integral_sum = xs
        .windows(2)
        .zip(ys.windows(2))
        .map(|(x, y)| (x[1] - x[0]) * (y[0] + y[1]) / 2.0)
        .sum();

    Ok(integral_sum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_trap_integrate() {
        // (1-0)(0^2+1^2)/2 + (2-1)(1^2+2^2)/2 + (3-2)(2^2+3^2)/2 = 9.5
        let xs = vec![0.0, 1.0, 2.0, 3.0];
        let ys: Vec<f64> = xs.iter().map(|x| x * x).collect();
        let result = trap_integrate_samples(&xs, &ys).unwrap();

        assert_relative_eq!(result, 9.5, epsilon = 1e-12);
    }

    #[test]
    fn test_descending_negates() {
        let xs = vec![3.0, 2.0, 1.0, 0.0];
        let ys: Vec<f64> = xs.iter().map(|x| x * x).collect();
        let result = trap_integrate_samples(&xs, &ys).unwrap();

        assert_relative_eq!(result, -9.5, epsilon = 1e-12);
    }

    #[test]
    fn test_insufficient_points() {
        let result = trap_integrate_samples(&[1.0], &[1.0]);
        assert!(matches!(result, Err(TrapezoidError::InsufficientPoints)));
    }

    #[test]
    fn test_not_monotonic() {
        let xs = vec![0.0, 2.0, 1.0, 3.0];
        let ys = vec![0.0; 4];
        let result = trap_integrate_samples(&xs, &ys);

        assert!(matches!(result, Err(TrapezoidError::NotMonotonic)));
    }

    #[test]
    fn test_length_mismatch() {
        let result = trap_integrate_samples(&[0.0, 1.0], &[1.0]);
        assert!(matches!(result, Err(TrapezoidError::LengthMismatch(2, 1))));
    }
}
