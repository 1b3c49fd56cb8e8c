//! Isotropic scattering from bulk opacity and albedo

use std::path::Path;

use ndarray::array;
use shared::columns::TextTable;

use super::{check_length, LoaderError};
use crate::optical_properties::OpticalProperties;
use crate::phase_function::ScatteringCoefficients;

/// Scattering matrix of an isotropic scatterer
const ISOTROPIC: ScatteringCoefficients = ScatteringCoefficients {
    p1: 1.0,
    p2: 0.0,
    p3: 1.0,
    p4: 0.0,
};

/// Isotropic dust from wavelengths (microns), opacities (cm^2/g) and albedos.
///
/// Two scattering angles (`mu = -1, 1`) are enough to describe a constant
/// phase function.
pub fn isotropic(wav: &[f64], chi: &[f64], albedo: &[f64]) -> Result<OpticalProperties, LoaderError> {
    check_length("chi", chi, wav.len())?;
    check_length("albedo", albedo, wav.len())?;

    let mut op = OpticalProperties::new();
    op.set_mu(array![-1.0, 1.0]);
    op.set_wavelengths(wav);
    op.set_albedo(albedo.to_vec());
    op.set_chi(chi.to_vec());

    op.initialize_scattering_matrix()?;
    op.fill(ISOTROPIC)?;

    op.validate()?;
    Ok(op)
}

/// Isotropic dust from a whitespace-separated `wav chi albedo` table
pub fn isotropic_from_file<P: AsRef<Path>>(path: P) -> Result<OpticalProperties, LoaderError> {
    let table = TextTable::open(path)?;
    let columns = table.columns(0, &[0, 1, 2])?;
    isotropic(&columns[0], &columns[1], &columns[2])
}
