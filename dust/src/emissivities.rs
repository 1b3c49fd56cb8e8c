//! Thermal emissivities of a dust type.
//!
//! Emissivities are tabulated against an independent variable, here always
//! the specific energy absorbed by the dust. The LTE approximation assumes the
//! grains emit as `kappa_nu B_nu(T)` at the temperature whose equilibrium
//! specific energy matches.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use shared::constants::planck_nu;
use shared::table_set::{Table, TableSet, TableSetError};
use thiserror::Error;

use crate::optical_properties::{log_space, OpticalProperties, OpticalPropertiesError};

pub const EMISSIVITIES_TABLE: &str = "emissivities";
pub const EMISSIVITY_VARIABLE_TABLE: &str = "emissivity_variable";

/// Keyword value identifying specific energy as the emissivity variable
const SPECIFIC_ENERGY_VAR: &str = "E";

pub const LTE_N_TEMP: usize = 1200;
pub const LTE_TEMP_MIN: f64 = 0.1;
pub const LTE_TEMP_MAX: f64 = 1e5;

#[derive(Error, Debug)]
pub enum EmissivitiesError {
    #[error("Emissivity grid has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Unsupported emissivity variable '{0}'")]
    UnsupportedVariable(String),

    #[error("Emissivity table needs at least one frequency and one variable value")]
    Empty,

    #[error(transparent)]
    OpticalProperties(#[from] OpticalPropertiesError),

    #[error(transparent)]
    TableSet(#[from] TableSetError),
}

/// Emissivities `jnu` tabulated on `(specific_energy, nu)`
#[derive(Debug, Clone, PartialEq)]
pub struct Emissivities {
    nu: Array1<f64>,
    specific_energy: Array1<f64>,
    jnu: Array2<f64>,
}

impl Emissivities {
    /// Build emissivities from explicit arrays.
    ///
    /// `jnu` has one row per specific energy and one column per frequency.
    pub fn new(
        nu: Array1<f64>,
        specific_energy: Array1<f64>,
        jnu: Array2<f64>,
    ) -> Result<Self, EmissivitiesError> {
        if nu.is_empty() || specific_energy.is_empty() {
            return Err(EmissivitiesError::Empty);
        }
        let expected = (specific_energy.len(), nu.len());
        if jnu.dim() != expected {
            return Err(EmissivitiesError::ShapeMismatch {
                expected,
                found: jnu.dim(),
            });
        }
        Ok(Self {
            nu,
            specific_energy,
            jnu,
        })
    }

    /// LTE emissivities on `n_temp` log-spaced temperatures between
    /// `temp_min` and `temp_max` (K)
    pub fn lte(
        optical_properties: &OpticalProperties,
        n_temp: usize,
        temp_min: f64,
        temp_max: f64,
    ) -> Result<Self, EmissivitiesError> {
        let nu = optical_properties.nu().to_owned();
        let kappa = optical_properties.kappa();
        let temperatures = log_space(temp_min, temp_max, n_temp);

        let mut jnu = Array2::zeros((n_temp, nu.len()));
        let mut specific_energy = Array1::zeros(n_temp);

        for (i, &t) in temperatures.iter().enumerate() {
            for (j, (&n, &k)) in nu.iter().zip(kappa.iter()).enumerate() {
                jnu[[i, j]] = k * planck_nu(n, t);
            }
            specific_energy[i] = optical_properties.temperature_to_specific_energy(t)?;
        }

        log::debug!(
            "Computed LTE emissivities for {} temperatures between {} K and {} K",
            n_temp,
            temp_min,
            temp_max
        );

        Self::new(nu, specific_energy, jnu)
    }

    /// LTE emissivities with the default temperature grid
    pub fn lte_default(optical_properties: &OpticalProperties) -> Result<Self, EmissivitiesError> {
        Self::lte(optical_properties, LTE_N_TEMP, LTE_TEMP_MIN, LTE_TEMP_MAX)
    }

    pub fn nu(&self) -> ArrayView1<'_, f64> {
        self.nu.view()
    }

    /// Independent variable values (erg/s/g)
    pub fn specific_energy(&self) -> ArrayView1<'_, f64> {
        self.specific_energy.view()
    }

    /// `(n_var, n_wav)` emissivities
    pub fn jnu(&self) -> ArrayView2<'_, f64> {
        self.jnu.view()
    }

    pub fn to_table_set(&self, table_set: &mut TableSet) {
        let mut table = Table::new(EMISSIVITIES_TABLE);
        table.keywords.insert("emissvar", SPECIFIC_ENERGY_VAR);
        table.add_column("nu", self.nu.to_vec());
        // Stored one row per frequency
        table.add_vector_column("jnu", &self.jnu.t().to_owned());
        table_set.add_table(table);

        let mut variable = Table::new(EMISSIVITY_VARIABLE_TABLE);
        variable.add_column("specific_energy", self.specific_energy.to_vec());
        table_set.add_table(variable);
    }

    pub fn from_table_set(table_set: &TableSet) -> Result<Self, EmissivitiesError> {
        let table = table_set.table(EMISSIVITIES_TABLE)?;
        let var = table.keywords.text("emissvar")?;
        if var != SPECIFIC_ENERGY_VAR {
            return Err(EmissivitiesError::UnsupportedVariable(var.to_string()));
        }

        let variable = table_set.table(EMISSIVITY_VARIABLE_TABLE)?;
        let nu = Array1::from(table.column("nu")?.to_vec());
        let specific_energy = Array1::from(variable.column("specific_energy")?.to_vec());
        let jnu = table.vector_column("jnu")?.reversed_axes();

        Self::new(nu, specific_energy, jnu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase_function::ScatteringCoefficients;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn properties() -> OpticalProperties {
        let mut op = OpticalProperties::new();
        op.set_mu(array![-1.0, 1.0]);
        op.set_wavelengths(&[0.1, 1.0, 10.0, 100.0, 1000.0]);
        op.set_albedo(array![0.5, 0.4, 0.3, 0.2, 0.1]);
        op.set_chi(array![100.0, 50.0, 10.0, 1.0, 0.1]);
        op.initialize_scattering_matrix().unwrap();
        op.fill(ScatteringCoefficients {
            p1: 1.0,
            p2: 0.0,
            p3: 1.0,
            p4: 0.0,
        })
        .unwrap();
        op
    }

    #[test]
    fn test_lte_shape_and_values() {
        let op = properties();
        let em = Emissivities::lte(&op, 20, 1.0, 1000.0).unwrap();

        assert_eq!(em.jnu().dim(), (20, 5));
        assert_eq!(em.specific_energy().len(), 20);

        let kappa = op.kappa();
        let t_last = 1000.0;
        assert_relative_eq!(
            em.jnu()[[19, 2]],
            kappa[2] * planck_nu(op.nu()[2], t_last),
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_lte_specific_energy_increases() {
        let em = Emissivities::lte(&properties(), 50, 1.0, 3000.0).unwrap();
        let e = em.specific_energy();
        assert!(e.windows(2).into_iter().all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_new_checks_shape() {
        let result = Emissivities::new(array![1.0, 2.0], array![1.0], Array2::zeros((2, 2)));
        assert!(matches!(
            result,
            Err(EmissivitiesError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_table_set_roundtrip() {
        let em = Emissivities::lte(&properties(), 10, 10.0, 100.0).unwrap();
        let mut ts = TableSet::new();
        em.to_table_set(&mut ts);

        assert_eq!(
            ts.table(EMISSIVITIES_TABLE)
                .unwrap()
                .keywords
                .text("emissvar")
                .unwrap(),
            "E"
        );
        assert_eq!(Emissivities::from_table_set(&ts).unwrap(), em);
    }

    #[test]
    fn test_unsupported_variable() {
        let em = Emissivities::lte(&properties(), 4, 10.0, 100.0).unwrap();
        let mut ts = TableSet::new();
        em.to_table_set(&mut ts);

        let mut table = ts.table(EMISSIVITIES_TABLE).unwrap().clone();
        table.keywords.insert("emissvar", "T");
        ts.add_table(table);

        assert!(matches!(
            Emissivities::from_table_set(&ts),
            Err(EmissivitiesError::UnsupportedVariable(v)) if v == "T"
        ));
    }
}
