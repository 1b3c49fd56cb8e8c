//! Output directories of the coatsph coated-sphere Mie code.
//!
//! Both variants share `coatsph_forw.dat`, whose first line is a version
//! string and whose second line carries the number of components as its
//! sixth token. The scattering matrix comes from one phase file per
//! wavelength.

use std::path::{Path, PathBuf};

use shared::columns::TextTable;

use super::{close, LoaderError};
use crate::optical_properties::{OpticalProperties, ScatteringElement};

const FORWARD_FILE: &str = "coatsph_forw.dat";

/// Lines before the data rows of `coatsph_forw.dat`, preamble included
const SINGLE_FORWARD_SKIP: usize = 2 + 3;
const MULTIPLE_FORWARD_SKIP: usize = 2 + 7;

const SINGLE_PHASE_SKIP: usize = 9;
const MULTIPLE_PHASE_SKIP: usize = 7;

/// Scattering angles of consecutive phase files must agree to this
/// relative tolerance
const ANGLE_TOLERANCE: f64 = 1e-9;

/// Phase file columns: theta [deg], s11, polarization, s12, s33, s34
const PHASE_COLUMNS: [usize; 5] = [0, 1, 3, 4, 5];

fn single_phase_file(directory: &Path, index: usize) -> PathBuf {
    directory.join(format!("coatsph_scat_{:04}_0001.dat", index + 1))
}

fn multiple_phase_file(directory: &Path, index: usize) -> PathBuf {
    directory.join(format!("coatsph_scat.{:04}.dat", index + 1))
}

/// Open `coatsph_forw.dat` and read the component count from its preamble
fn open_forward_file(directory: &Path) -> Result<TextTable, LoaderError> {
    let table = TextTable::open(directory.join(FORWARD_FILE))?;

    let version = table.line(0)?.trim().to_string();
    let token = table.token(1, 5)?;
    let n_components: usize = token.parse().map_err(|_| LoaderError::InvalidHeader {
        path: table.path().to_path_buf(),
        message: format!("cannot parse component count '{token}'"),
    })?;

    log::debug!(
        "{}: version '{}', {} component(s)",
        table.path().display(),
        version,
        n_components
    );
    Ok(table)
}

/// Fill the scattering matrix from one phase file per wavelength.
///
/// The angle grid is taken from the first file; every later file must sample
/// the same angles.
fn read_phase_files(
    op: &mut OpticalProperties,
    paths: impl IntoIterator<Item = PathBuf>,
    skip: usize,
) -> Result<(), LoaderError> {
    let mut reference_path = PathBuf::new();
    let mut reference_theta: Vec<f64> = Vec::new();

    for (i, path) in paths.into_iter().enumerate() {
        let table = TextTable::open(&path)?;
        let columns = table.columns(skip, &PHASE_COLUMNS)?;
        let theta = &columns[0];

        if i == 0 {
            op.set_mu(theta.iter().map(|t| t.to_radians().cos()).collect::<Vec<f64>>());
            op.initialize_scattering_matrix()?;
            reference_path = path.clone();
            reference_theta = theta.clone();
        } else {
            let mismatch = (0..reference_theta.len().max(theta.len())).find(|&k| {
                match (reference_theta.get(k), theta.get(k)) {
                    (Some(&a), Some(&b)) => !close(a, b, ANGLE_TOLERANCE),
                    _ => true,
                }
            });
            if let Some(index) = mismatch {
                return Err(LoaderError::AngleGridMismatch {
                    path,
                    reference: reference_path,
                    index,
                });
            }
        }

        for (element, values) in ScatteringElement::ALL.iter().zip(&columns[1..]) {
            op.set_row(*element, i, values)?;
        }
    }

    Ok(())
}

/// Single-component coatsph dust.
///
/// `size` is the grain size in cm and `density` the grain density in g/cm^3;
/// together they convert extinction efficiencies into opacities.
pub fn coatsph_single<P: AsRef<Path>>(
    directory: P,
    size: f64,
    density: f64,
) -> Result<OpticalProperties, LoaderError> {
    let directory = directory.as_ref();
    let forward = open_forward_file(directory)?;

    // x, radius, wav, q_ext, q_sca, q_back, g
    let columns = forward.columns(SINGLE_FORWARD_SKIP, &[2, 3, 4])?;
    let (wav, q_ext, q_sca) = (&columns[0], &columns[1], &columns[2]);

    let mut op = OpticalProperties::new();
    op.set_wavelengths(wav);
    op.set_albedo(q_sca.iter().zip(q_ext).map(|(s, e)| s / e).collect::<Vec<f64>>());
    op.set_chi(
        q_ext
            .iter()
            .map(|q| 0.75 * q / size / density)
            .collect::<Vec<f64>>(),
    );

    let n_wav = wav.len();
    read_phase_files(
        &mut op,
        (0..n_wav).map(|i| single_phase_file(directory, i)),
        SINGLE_PHASE_SKIP,
    )?;

    op.validate()?;
    Ok(op)
}

/// Multi-component coatsph dust
pub fn coatsph_multiple<P: AsRef<Path>>(directory: P) -> Result<OpticalProperties, LoaderError> {
    let directory = directory.as_ref();
    let forward = open_forward_file(directory)?;

    // wav, c_ext, c_sca, chi, g, pmax, thetmax
    let columns = forward.columns(MULTIPLE_FORWARD_SKIP, &[0, 1, 2, 3])?;
    let (wav, c_ext, c_sca, chi) = (&columns[0], &columns[1], &columns[2], &columns[3]);

    let mut op = OpticalProperties::new();
    op.set_wavelengths(wav);
    op.set_albedo(c_sca.iter().zip(c_ext).map(|(s, e)| s / e).collect::<Vec<f64>>());
    op.set_chi(chi.clone());

    let n_wav = wav.len();
    read_phase_files(
        &mut op,
        (0..n_wav).map(|i| multiple_phase_file(directory, i)),
        MULTIPLE_PHASE_SKIP,
    )?;

    op.validate()?;
    Ok(op)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use shared::columns::ColumnsError;
    use tempfile::tempdir;
    use test_helpers::fixtures::{
        write_coatsph_multiple, write_coatsph_phase_file, write_coatsph_single, SyntheticDust,
    };

    #[test]
    fn test_phase_file_names() {
        let dir = Path::new("d");
        assert_eq!(
            single_phase_file(dir, 0),
            PathBuf::from("d/coatsph_scat_0001_0001.dat")
        );
        assert_eq!(
            multiple_phase_file(dir, 11),
            PathBuf::from("d/coatsph_scat.0012.dat")
        );
    }

    #[test]
    fn test_single_component() {
        let dir = tempdir().unwrap();
        let dust = SyntheticDust::new(4, 7);
        write_coatsph_single(dir.path(), &dust, 1e-5, 3.0).unwrap();

        let op = coatsph_single(dir.path(), 1e-5, 3.0).unwrap();

        assert_eq!(op.p1().unwrap().dim(), (4, 7));
        for j in 0..4 {
            assert_relative_eq!(op.albedo()[j], dust.albedo[j], max_relative = 1e-12);
            assert_relative_eq!(op.chi()[j], dust.chi[j], max_relative = 1e-9);
        }
        for (i, theta) in dust.theta.iter().enumerate() {
            assert_relative_eq!(op.mu()[i], theta.to_radians().cos(), epsilon = 1e-15);
        }
        assert_eq!(op.p3().unwrap()[[2, 5]], dust.phase[2][2][5]);
        assert_eq!(op.p4().unwrap()[[3, 6]], dust.phase[3][3][6]);
    }

    #[test]
    fn test_multiple_component() {
        let dir = tempdir().unwrap();
        let dust = SyntheticDust::new(5, 4);
        write_coatsph_multiple(dir.path(), &dust).unwrap();

        let op = coatsph_multiple(dir.path()).unwrap();

        assert_eq!(op.n_wav(), 5);
        assert_eq!(op.n_mu(), 4);
        assert_eq!(op.chi().to_vec(), dust.chi);
        assert_eq!(op.p2().unwrap()[[4, 1]], dust.phase[1][4][1]);
    }

    #[test]
    fn test_angle_grid_mismatch() {
        let dir = tempdir().unwrap();
        let dust = SyntheticDust::new(3, 4);
        write_coatsph_multiple(dir.path(), &dust).unwrap();

        // Rewrite the second phase file on a shifted grid
        let mut shifted = dust.clone();
        shifted.theta[2] += 1.0;
        write_coatsph_phase_file(
            &multiple_phase_file(dir.path(), 1),
            &shifted,
            1,
            MULTIPLE_PHASE_SKIP,
        )
        .unwrap();

        assert!(matches!(
            coatsph_multiple(dir.path()),
            Err(LoaderError::AngleGridMismatch { index: 2, .. })
        ));
    }

    #[test]
    fn test_single_angle_grid_mismatch() {
        let dir = tempdir().unwrap();
        let dust = SyntheticDust::new(3, 4);
        write_coatsph_single(dir.path(), &dust, 1e-5, 3.0).unwrap();

        // Last phase file stops one angle short
        let mut truncated = dust.clone();
        truncated.theta.pop();
        let path = single_phase_file(dir.path(), 2);
        write_coatsph_phase_file(&path, &truncated, 2, SINGLE_PHASE_SKIP).unwrap();

        match coatsph_single(dir.path(), 1e-5, 3.0) {
            Err(LoaderError::AngleGridMismatch {
                path: found,
                reference,
                index,
            }) => {
                assert_eq!(found, path);
                assert_eq!(reference, single_phase_file(dir.path(), 0));
                assert_eq!(index, 3);
            }
            other => panic!("expected an angle grid mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_phase_file() {
        let dir = tempdir().unwrap();
        let dust = SyntheticDust::new(3, 4);
        write_coatsph_single(dir.path(), &dust, 1e-5, 3.0).unwrap();
        std::fs::remove_file(single_phase_file(dir.path(), 2)).unwrap();

        assert!(matches!(
            coatsph_single(dir.path(), 1e-5, 3.0),
            Err(LoaderError::Parse(ColumnsError::Io { .. }))
        ));
    }

    #[test]
    fn test_bad_component_count() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(FORWARD_FILE),
            "version 1\na b c d e many\n",
        )
        .unwrap();

        assert!(matches!(
            coatsph_multiple(dir.path()),
            Err(LoaderError::InvalidHeader { .. })
        ));
    }
}
