//! Henyey-Greenstein scattering phase function
//!
//! Used when a dust description only provides bulk scattering parameters (the
//! asymmetry parameter `g` and the maximum linear polarization) rather than a
//! tabulated scattering matrix.

use ndarray::{Array1, ArrayView1};

use crate::optical_properties::OpticalPropertiesError;

/// The four independent elements of the scattering matrix at one angle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatteringCoefficients {
    pub p1: f64,
    pub p2: f64,
    pub p3: f64,
    pub p4: f64,
}

/// Evaluate the Henyey-Greenstein model at one scattering-angle cosine.
///
/// `g` is expected in the open interval (-1, 1); at `g = 0` the intensity
/// term `p1` is exactly 1 for every `mu`.
///
/// # Arguments
///
/// * `mu` - Cosine of the scattering angle
/// * `g` - Asymmetry parameter
/// * `p_lin_max` - Maximum linear polarization
pub fn henyey_greenstein(mu: f64, g: f64, p_lin_max: f64) -> ScatteringCoefficients {
    let p1 = (1.0 - g * g) / (1.0 + g * g - 2.0 * g * mu).powf(1.5);
    let p2 = -p_lin_max * p1 * (1.0 - mu * mu) / (1.0 + mu * mu);
    let p3 = p1 * 2.0 * mu / (1.0 + mu * mu);

    ScatteringCoefficients {
        p1,
        p2,
        p3,
        p4: 0.0,
    }
}

/// One scattering-matrix column: the four elements for every frequency at a
/// single `mu`
#[derive(Debug, Clone, PartialEq)]
pub struct ScatteringColumn {
    pub p1: Array1<f64>,
    pub p2: Array1<f64>,
    pub p3: Array1<f64>,
    pub p4: Array1<f64>,
}

/// Apply [`henyey_greenstein`] at a single `mu` over per-frequency `g` and
/// `p_lin_max` arrays, which must have equal length.
pub fn henyey_greenstein_column(
    mu: f64,
    g: ArrayView1<'_, f64>,
    p_lin_max: ArrayView1<'_, f64>,
) -> Result<ScatteringColumn, OpticalPropertiesError> {
    if p_lin_max.len() != g.len() {
        return Err(OpticalPropertiesError::LengthMismatch {
            name: "p_lin_max",
            expected: g.len(),
            found: p_lin_max.len(),
        });
    }

    let n = g.len();
    let mut column = ScatteringColumn {
        p1: Array1::zeros(n),
        p2: Array1::zeros(n),
        p3: Array1::zeros(n),
        p4: Array1::zeros(n),
    };

    for (i, (&g_i, &p_i)) in g.iter().zip(p_lin_max.iter()).enumerate() {
        let c = henyey_greenstein(mu, g_i, p_i);
        column.p1[i] = c.p1;
        column.p2[i] = c.p2;
        column.p3[i] = c.p3;
        column.p4[i] = c.p4;
    }

    Ok(column)
}
