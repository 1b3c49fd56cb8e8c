//! Bulk dust properties with a Henyey-Greenstein phase function

use std::path::Path;

use ndarray::{Array1, ArrayView1};
use shared::columns::TextTable;

use super::{LoadedDust, LoaderError};
use crate::optical_properties::OpticalProperties;
use crate::phase_function::henyey_greenstein_column;

/// Number of scattering angles sampled from the phase function
pub const SIMPLE_N_MU: usize = 100;

/// Read a six-column `wav c_ext c_sca chi g p_lin_max` table.
///
/// The albedo is `c_sca / c_ext` and the scattering matrix is sampled from
/// the Henyey-Greenstein model on [`SIMPLE_N_MU`] evenly spaced `mu` values.
/// The MD5 of the file is returned alongside the optical properties.
pub fn simple<P: AsRef<Path>>(path: P) -> Result<LoadedDust, LoaderError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| LoaderError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let md5 = format!("{:x}", md5::compute(&bytes));

    let table = TextTable::from_str_with_path(&String::from_utf8_lossy(&bytes), path.to_path_buf());
    let columns = table.columns(0, &[0, 1, 2, 3, 4, 5])?;
    let (wav, c_ext, c_sca, chi, g, p_lin_max) = (
        &columns[0],
        &columns[1],
        &columns[2],
        &columns[3],
        &columns[4],
        &columns[5],
    );

    // linspace may overshoot the end points by an ulp
    let mu = Array1::linspace(-1.0, 1.0, SIMPLE_N_MU).mapv(|m: f64| m.clamp(-1.0, 1.0));

    let mut op = OpticalProperties::new();
    op.set_mu(mu.clone());
    op.set_wavelengths(wav);
    op.set_albedo(
        c_sca
            .iter()
            .zip(c_ext)
            .map(|(s, e)| s / e)
            .collect::<Vec<f64>>(),
    );
    op.set_chi(chi.clone());

    op.initialize_scattering_matrix()?;
    for (j, &m) in mu.iter().enumerate() {
        let column = henyey_greenstein_column(m, ArrayView1::from(g), ArrayView1::from(p_lin_max))?;
        op.set_column(j, &column)?;
    }

    op.validate()?;
    log::debug!("Read {} wavelengths from {} (md5 {})", op.n_wav(), path.display(), md5);

    Ok(LoadedDust {
        optical_properties: op,
        md5: Some(md5),
    })
}
