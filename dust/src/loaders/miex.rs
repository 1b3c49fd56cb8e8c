//! MieX output files.
//!
//! A model `m` consists of `m.alb` (wavelength, albedo), `m.k_abs` (absorption
//! opacity in column 1) and the four scattering-matrix files
//! `m.f11`, `m.f12`, `m.f33`, `m.f34`. Each matrix file has one header line,
//! then for every wavelength a line holding just that wavelength followed by
//! `n_mu` lines of `theta value`.
//!
//! MieX tables occasionally contain NaN entries; these are repaired by log-log
//! interpolation over wavelength.

use std::path::Path;

use ndarray::{Array1, Array2};
use shared::columns::TextTable;
use shared::interpolate::repair_nan_loglog;

use super::{check_length, close, with_extension, LoaderError};
use crate::optical_properties::{OpticalProperties, ScatteringElement};

/// Wavelength records in the matrix files must match `.alb` to this relative
/// tolerance
const WAVELENGTH_TOLERANCE: f64 = 1e-6;

/// Angles of every block in every matrix file must match the first block of
/// `.f11` to this relative tolerance
const ANGLE_TOLERANCE: f64 = 1e-9;

const MATRIX_EXTENSIONS: [&str; 4] = ["f11", "f12", "f33", "f34"];

/// Number of angles per wavelength block, from the line count without
/// trailing blank lines
fn angles_per_block(table: &TextTable, n_wav: usize) -> Result<usize, LoaderError> {
    let lines = table.trimmed_len();
    let invalid = || LoaderError::InvalidLayout {
        path: table.path().to_path_buf(),
        lines,
        n_wav,
    };

    if lines == 0 || n_wav == 0 || (lines - 1) % n_wav != 0 {
        return Err(invalid());
    }
    // Each block is one wavelength line plus n_mu angle lines
    let block = (lines - 1) / n_wav;
    if block < 2 {
        return Err(invalid());
    }
    Ok(block - 1)
}

/// Read one matrix file into an `(n_wav, n_mu)` array, checking every
/// wavelength record against `wav` and every angle against `theta` (degrees),
/// which was read from `reference`
fn read_matrix(
    table: &TextTable,
    wav: &[f64],
    theta: &[f64],
    reference: &Path,
) -> Result<Array2<f64>, LoaderError> {
    let n_mu = theta.len();
    let mut values = Array2::zeros((wav.len(), n_mu));

    for (j, &expected) in wav.iter().enumerate() {
        let record = 1 + j * (n_mu + 1);
        let found = table.value(record, 0)?;
        if !close(found, expected, WAVELENGTH_TOLERANCE) {
            return Err(LoaderError::WavelengthMismatch {
                path: table.path().to_path_buf(),
                index: j,
                expected,
                found,
            });
        }

        for (i, &angle) in theta.iter().enumerate() {
            if !close(table.value(record + 1 + i, 0)?, angle, ANGLE_TOLERANCE) {
                return Err(LoaderError::AngleGridMismatch {
                    path: table.path().to_path_buf(),
                    reference: reference.to_path_buf(),
                    index: i,
                });
            }
            values[[j, i]] = table.value(record + 1 + i, 1)?;
        }
    }

    Ok(values)
}

/// Load a MieX model from the files sharing the `model` prefix
pub fn miex<P: AsRef<Path>>(model: P) -> Result<OpticalProperties, LoaderError> {
    let model = model.as_ref();

    let alb = TextTable::open(with_extension(model, "alb"))?.columns(0, &[0, 1])?;
    let (wav, albedo) = (&alb[0], &alb[1]);
    let k_abs = TextTable::open(with_extension(model, "k_abs"))?.columns(0, &[1])?;
    let kappa = &k_abs[0];
    check_length("MieX kappa", kappa, wav.len())?;

    let mut albedo = Array1::from(albedo.clone());
    let mut chi: Array1<f64> = kappa
        .iter()
        .zip(albedo.iter())
        .map(|(k, a)| k / (1.0 - a))
        .collect();

    repair_nan_loglog(wav, chi.view_mut(), "MieX chi")?;
    repair_nan_loglog(wav, albedo.view_mut(), "MieX albedo")?;

    let [f11, f12, f33, f34] =
        MATRIX_EXTENSIONS.map(|ext| TextTable::open(with_extension(model, ext)));
    let tables = [f11?, f12?, f33?, f34?];

    let n_wav = wav.len();
    let n_mu = angles_per_block(&tables[0], n_wav)?;

    // Angles come from the block following the first wavelength record
    let theta = (0..n_mu)
        .map(|i| tables[0].value(2 + i, 0))
        .collect::<Result<Vec<f64>, _>>()?;
    let mu: Vec<f64> = theta.iter().map(|t| t.to_radians().cos()).collect();

    let reference = tables[0].path();
    let mut matrices = [
        read_matrix(&tables[0], wav, &theta, reference)?,
        read_matrix(&tables[1], wav, &theta, reference)?,
        read_matrix(&tables[2], wav, &theta, reference)?,
        read_matrix(&tables[3], wav, &theta, reference)?,
    ];

    for i in 0..n_mu {
        for (element, matrix) in ScatteringElement::ALL.iter().zip(matrices.iter_mut()) {
            let label = format!("MieX {}", element.name());
            repair_nan_loglog(wav, matrix.column_mut(i), &label)?;
        }
    }

    let mut op = OpticalProperties::new();
    op.set_wavelengths(wav);
    op.set_albedo(albedo);
    op.set_chi(chi);
    op.set_mu(mu);
    op.initialize_scattering_matrix()?;

    let [p1, p2, p3, p4] = matrices;
    op.set_matrices(p1, p2, p3, p4)?;

    op.validate()?;
    Ok(op)
}
