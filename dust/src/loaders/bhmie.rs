//! Pre-tabulated arrays, as written by BHMIE-style Mie codes.
//!
//! A model `m` provides `m.wav`, `m.mu`, `m.alb` and `m.chi` as plain lists of
//! numbers and the scattering matrix as four `n_wav x n_mu` tables `m.f11`,
//! `m.f12`, `m.f33`, `m.f34`. Values are taken verbatim.

use std::path::Path;

use ndarray::Array2;
use shared::columns::TextTable;

use super::{check_length, with_extension, LoaderError};
use crate::optical_properties::OpticalProperties;

fn read_values(model: &Path, extension: &str) -> Result<Vec<f64>, LoaderError> {
    Ok(TextTable::open(with_extension(model, extension))?.values(0)?)
}

fn read_matrix(model: &Path, extension: &str, shape: (usize, usize)) -> Result<Array2<f64>, LoaderError> {
    let table = TextTable::open(with_extension(model, extension))?;
    let rows = table.rows(0)?;
    let found = (rows.len(), rows.first().map_or(0, Vec::len));

    if found != shape {
        return Err(LoaderError::ShapeMismatch {
            path: table.path().to_path_buf(),
            expected: shape,
            found,
        });
    }

    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec(shape, flat).map_err(|_| LoaderError::ShapeMismatch {
        path: table.path().to_path_buf(),
        expected: shape,
        found,
    })
}

/// Load the arrays sharing the `model` prefix
pub fn bhmie<P: AsRef<Path>>(model: P) -> Result<OpticalProperties, LoaderError> {
    let model = model.as_ref();

    let wav = read_values(model, "wav")?;
    let mu = read_values(model, "mu")?;
    let albedo = read_values(model, "alb")?;
    let chi = read_values(model, "chi")?;
    check_length("albedo", &albedo, wav.len())?;
    check_length("chi", &chi, wav.len())?;

    let shape = (wav.len(), mu.len());

    let mut op = OpticalProperties::new();
    op.set_wavelengths(&wav);
    op.set_mu(mu);
    op.set_albedo(albedo);
    op.set_chi(chi);
    op.initialize_scattering_matrix()?;

    op.set_matrices(
        read_matrix(model, "f11", shape)?,
        read_matrix(model, "f12", shape)?,
        read_matrix(model, "f33", shape)?,
        read_matrix(model, "f34", shape)?,
    )?;

    op.validate()?;
    Ok(op)
}
