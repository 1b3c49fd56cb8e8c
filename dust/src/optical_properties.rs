//! Frequency- and angle-dependent optical properties of a dust grain.
//!
//! The table holds the scattering-angle grid `mu` (columns), the frequency
//! grid `nu` (rows), per-frequency albedo and total opacity `chi`, and the
//! four independent scattering-matrix elements P1..P4 as `(n_wav, n_mu)`
//! arrays.
//!
//! Construction follows a fixed order: set `mu`, set `nu` (with albedo and
//! chi), call [`OpticalProperties::initialize_scattering_matrix`] to allocate
//! the matrices, then fill them. [`OpticalProperties::validate`] checks the
//! result before it is persisted.

use ndarray::{Array1, Array2, ArrayView1, ArrayViewMut1, ArrayViewMut2};
use shared::constants::{microns_to_frequency, planck_nu, CGS};
use shared::interpolate::{interp_loglog, InterpError};
use shared::table_set::{Table, TableSet, TableSetError};
use shared::trapezoid::{trap_integrate_samples, TrapezoidError};
use thiserror::Error;

use crate::phase_function::{ScatteringCoefficients, ScatteringColumn};

/// Table holding frequency-dependent properties and scattering matrices
pub const OPTICAL_PROPERTIES_TABLE: &str = "optical_properties";

/// Table holding the scattering-angle grid
pub const SCATTERING_ANGLES_TABLE: &str = "scattering_angles";

/// Temperature range used when inverting specific energy to temperature (K)
const INVERSION_TEMP_MIN: f64 = 0.1;
const INVERSION_TEMP_MAX: f64 = 1e5;
const INVERSION_TEMP_POINTS: usize = 1000;

/// Wien displacement for B_nu: h nu_peak / k T
const WIEN_X_PEAK: f64 = 2.821439372122079;

/// Errors that can occur while building or using an optical property table
#[derive(Error, Debug)]
pub enum OpticalPropertiesError {
    #[error("Cannot initialize scattering matrix before {0} is set")]
    ConstructionOrder(&'static str),

    #[error("Scattering matrix has not been initialized")]
    MatrixNotInitialized,

    #[error("{name} has length {found}, expected {expected}")]
    LengthMismatch {
        name: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{name} has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        name: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("{name}[{index}] = {value} is outside the allowed range {allowed}")]
    InvalidValue {
        name: &'static str,
        index: usize,
        value: f64,
        allowed: &'static str,
    },

    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("Integration failed: {0}")]
    Integration(#[from] TrapezoidError),

    #[error("Specific energy {0} cannot be converted to a temperature: {1}")]
    Inversion(f64, InterpError),

    #[error(transparent)]
    TableSet(#[from] TableSetError),
}

/// One of the four independent scattering-matrix elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScatteringElement {
    P1,
    P2,
    P3,
    P4,
}

impl ScatteringElement {
    pub const ALL: [ScatteringElement; 4] = [
        ScatteringElement::P1,
        ScatteringElement::P2,
        ScatteringElement::P3,
        ScatteringElement::P4,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ScatteringElement::P1 => "P1",
            ScatteringElement::P2 => "P2",
            ScatteringElement::P3 => "P3",
            ScatteringElement::P4 => "P4",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ScatteringMatrix {
    p1: Array2<f64>,
    p2: Array2<f64>,
    p3: Array2<f64>,
    p4: Array2<f64>,
}

impl ScatteringMatrix {
    fn zeros(shape: (usize, usize)) -> Self {
        Self {
            p1: Array2::zeros(shape),
            p2: Array2::zeros(shape),
            p3: Array2::zeros(shape),
            p4: Array2::zeros(shape),
        }
    }

    fn get(&self, element: ScatteringElement) -> &Array2<f64> {
        match element {
            ScatteringElement::P1 => &self.p1,
            ScatteringElement::P2 => &self.p2,
            ScatteringElement::P3 => &self.p3,
            ScatteringElement::P4 => &self.p4,
        }
    }

    fn get_mut(&mut self, element: ScatteringElement) -> &mut Array2<f64> {
        match element {
            ScatteringElement::P1 => &mut self.p1,
            ScatteringElement::P2 => &mut self.p2,
            ScatteringElement::P3 => &mut self.p3,
            ScatteringElement::P4 => &mut self.p4,
        }
    }
}

/// Logarithmically spaced samples between `min` and `max` inclusive.
///
/// The end points are exact, so grids of different lengths over the same
/// range share their first and last samples.
pub(crate) fn log_space(min: f64, max: f64, n: usize) -> Array1<f64> {
    let mut samples = Array1::logspace(10.0, min.log10(), max.log10(), n);
    if n >= 2 {
        samples[0] = min;
        samples[n - 1] = max;
    }
    samples
}

/// Tabulated optical properties of a dust type
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpticalProperties {
    mu: Array1<f64>,
    nu: Array1<f64>,
    albedo: Array1<f64>,
    chi: Array1<f64>,
    matrix: Option<ScatteringMatrix>,
}

impl OpticalProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scattering-angle cosines
    pub fn mu(&self) -> ArrayView1<'_, f64> {
        self.mu.view()
    }

    /// Frequencies in Hz
    pub fn nu(&self) -> ArrayView1<'_, f64> {
        self.nu.view()
    }

    pub fn albedo(&self) -> ArrayView1<'_, f64> {
        self.albedo.view()
    }

    /// Total opacity in cm^2/g
    pub fn chi(&self) -> ArrayView1<'_, f64> {
        self.chi.view()
    }

    pub fn n_mu(&self) -> usize {
        self.mu.len()
    }

    pub fn n_wav(&self) -> usize {
        self.nu.len()
    }

    pub fn set_mu(&mut self, mu: impl Into<Array1<f64>>) {
        self.mu = mu.into();
    }

    pub fn set_nu(&mut self, nu: impl Into<Array1<f64>>) {
        self.nu = nu.into();
    }

    /// Set the frequency grid from wavelengths in microns
    pub fn set_wavelengths(&mut self, wav_um: &[f64]) {
        self.nu = wav_um.iter().map(|&w| microns_to_frequency(w)).collect();
    }

    pub fn set_albedo(&mut self, albedo: impl Into<Array1<f64>>) {
        self.albedo = albedo.into();
    }

    pub fn set_chi(&mut self, chi: impl Into<Array1<f64>>) {
        self.chi = chi.into();
    }

    pub fn albedo_mut(&mut self) -> ArrayViewMut1<'_, f64> {
        self.albedo.view_mut()
    }

    pub fn chi_mut(&mut self) -> ArrayViewMut1<'_, f64> {
        self.chi.view_mut()
    }

    /// Allocate zero-filled `(n_wav, n_mu)` scattering matrices.
    ///
    /// Both `mu` and `nu` must already be set. Calling this again discards
    /// any previous matrix contents.
    pub fn initialize_scattering_matrix(&mut self) -> Result<(), OpticalPropertiesError> {
        if self.mu.is_empty() {
            return Err(OpticalPropertiesError::ConstructionOrder("mu"));
        }
        if self.nu.is_empty() {
            return Err(OpticalPropertiesError::ConstructionOrder("nu"));
        }

        self.matrix = Some(ScatteringMatrix::zeros((self.n_wav(), self.n_mu())));
        Ok(())
    }

    pub fn has_scattering_matrix(&self) -> bool {
        self.matrix.is_some()
    }

    /// One scattering-matrix element as an `(n_wav, n_mu)` array
    pub fn matrix(&self, element: ScatteringElement) -> Result<&Array2<f64>, OpticalPropertiesError> {
        self.matrix
            .as_ref()
            .map(|m| m.get(element))
            .ok_or(OpticalPropertiesError::MatrixNotInitialized)
    }

    pub fn matrix_mut(
        &mut self,
        element: ScatteringElement,
    ) -> Result<ArrayViewMut2<'_, f64>, OpticalPropertiesError> {
        self.matrix
            .as_mut()
            .map(|m| m.get_mut(element).view_mut())
            .ok_or(OpticalPropertiesError::MatrixNotInitialized)
    }

    pub fn p1(&self) -> Result<&Array2<f64>, OpticalPropertiesError> {
        self.matrix(ScatteringElement::P1)
    }

    pub fn p2(&self) -> Result<&Array2<f64>, OpticalPropertiesError> {
        self.matrix(ScatteringElement::P2)
    }

    pub fn p3(&self) -> Result<&Array2<f64>, OpticalPropertiesError> {
        self.matrix(ScatteringElement::P3)
    }

    pub fn p4(&self) -> Result<&Array2<f64>, OpticalPropertiesError> {
        self.matrix(ScatteringElement::P4)
    }

    /// Set every matrix entry to the given coefficients
    pub fn fill(&mut self, value: ScatteringCoefficients) -> Result<(), OpticalPropertiesError> {
        let matrix = self
            .matrix
            .as_mut()
            .ok_or(OpticalPropertiesError::MatrixNotInitialized)?;
        matrix.p1.fill(value.p1);
        matrix.p2.fill(value.p2);
        matrix.p3.fill(value.p3);
        matrix.p4.fill(value.p4);
        Ok(())
    }

    /// Set row `i` (one frequency) of a single element
    pub fn set_row(
        &mut self,
        element: ScatteringElement,
        i: usize,
        values: &[f64],
    ) -> Result<(), OpticalPropertiesError> {
        let n_mu = self.n_mu();
        if values.len() != n_mu {
            return Err(OpticalPropertiesError::LengthMismatch {
                name: element.name(),
                expected: n_mu,
                found: values.len(),
            });
        }
        let n_wav = self.n_wav();
        if i >= n_wav {
            return Err(OpticalPropertiesError::LengthMismatch {
                name: "nu",
                expected: i + 1,
                found: n_wav,
            });
        }

        let mut matrix = self.matrix_mut(element)?;
        matrix
            .row_mut(i)
            .assign(&ArrayView1::from(values));
        Ok(())
    }

    /// Set column `j` (one angle) of all four elements
    pub fn set_column(
        &mut self,
        j: usize,
        column: &ScatteringColumn,
    ) -> Result<(), OpticalPropertiesError> {
        let n_wav = self.n_wav();
        if j >= self.n_mu() {
            return Err(OpticalPropertiesError::LengthMismatch {
                name: "mu",
                expected: j + 1,
                found: self.n_mu(),
            });
        }

        let matrix = self
            .matrix
            .as_mut()
            .ok_or(OpticalPropertiesError::MatrixNotInitialized)?;

        for (element, values) in [
            (ScatteringElement::P1, &column.p1),
            (ScatteringElement::P2, &column.p2),
            (ScatteringElement::P3, &column.p3),
            (ScatteringElement::P4, &column.p4),
        ] {
            if values.len() != n_wav {
                return Err(OpticalPropertiesError::LengthMismatch {
                    name: element.name(),
                    expected: n_wav,
                    found: values.len(),
                });
            }
            matrix.get_mut(element).column_mut(j).assign(values);
        }
        Ok(())
    }

    /// Replace all four matrices at once; each must be `(n_wav, n_mu)`
    pub fn set_matrices(
        &mut self,
        p1: Array2<f64>,
        p2: Array2<f64>,
        p3: Array2<f64>,
        p4: Array2<f64>,
    ) -> Result<(), OpticalPropertiesError> {
        let expected = (self.n_wav(), self.n_mu());
        for (element, m) in ScatteringElement::ALL.iter().zip([&p1, &p2, &p3, &p4]) {
            if m.dim() != expected {
                return Err(OpticalPropertiesError::ShapeMismatch {
                    name: element.name(),
                    expected,
                    found: m.dim(),
                });
            }
        }

        self.matrix = Some(ScatteringMatrix { p1, p2, p3, p4 });
        Ok(())
    }

    /// Check lengths, shapes and value domains of the whole table
    pub fn validate(&self) -> Result<(), OpticalPropertiesError> {
        if self.mu.is_empty() {
            return Err(OpticalPropertiesError::Missing("mu"));
        }
        if self.nu.is_empty() {
            return Err(OpticalPropertiesError::Missing("nu"));
        }

        let n_wav = self.n_wav();
        for (name, values) in [("albedo", &self.albedo), ("chi", &self.chi)] {
            if values.len() != n_wav {
                return Err(OpticalPropertiesError::LengthMismatch {
                    name,
                    expected: n_wav,
                    found: values.len(),
                });
            }
        }

        check_range("mu", &self.mu, "[-1, 1]", |v| (-1.0..=1.0).contains(&v))?;
        check_range("nu", &self.nu, "(0, inf)", |v| v.is_finite() && v > 0.0)?;
        check_range("albedo", &self.albedo, "[0, 1]", |v| (0.0..=1.0).contains(&v))?;
        check_range("chi", &self.chi, "[0, inf)", |v| v.is_finite() && v >= 0.0)?;

        let matrix = self
            .matrix
            .as_ref()
            .ok_or(OpticalPropertiesError::MatrixNotInitialized)?;
        let expected = (n_wav, self.n_mu());
        for element in ScatteringElement::ALL {
            let m = matrix.get(element);
            if m.dim() != expected {
                return Err(OpticalPropertiesError::ShapeMismatch {
                    name: element.name(),
                    expected,
                    found: m.dim(),
                });
            }
            if let Some((index, &value)) = m.iter().enumerate().find(|(_, v)| !v.is_finite()) {
                return Err(OpticalPropertiesError::InvalidValue {
                    name: element.name(),
                    index,
                    value,
                    allowed: "finite",
                });
            }
        }

        Ok(())
    }

    /// Absorption opacity, `chi * (1 - albedo)`
    pub fn kappa(&self) -> Array1<f64> {
        &self.chi * &self.albedo.mapv(|a| 1.0 - a)
    }

    /// Planck-mean absorption opacity at `temperature`.
    ///
    /// If the Planck function underflows over the whole frequency grid, the
    /// opacity at the grid end closest to the Planck peak is returned.
    pub fn planck_mean_kappa(&self, temperature: f64) -> Result<f64, OpticalPropertiesError> {
        let kappa = self.kappa();
        let nu = self.nu.as_slice().ok_or(OpticalPropertiesError::Missing("nu"))?;
        let weights: Vec<f64> = nu.iter().map(|&n| planck_nu(n, temperature)).collect();
        let weighted: Vec<f64> = weights.iter().zip(kappa.iter()).map(|(w, k)| w * k).collect();

        let norm = trap_integrate_samples(nu, &weights)?;
        if norm == 0.0 {
            return Ok(self.edge_value(&kappa, temperature));
        }
        Ok(trap_integrate_samples(nu, &weighted)? / norm)
    }

    /// Value of `values` at whichever end of the frequency grid lies closest
    /// (in log frequency) to the Planck peak at `temperature`
    pub(crate) fn edge_value(&self, values: &Array1<f64>, temperature: f64) -> f64 {
        let n = self.nu.len();
        if n == 0 {
            return 0.0;
        }

        let nu_peak = WIEN_X_PEAK * CGS::BOLTZMANN_CONSTANT * temperature.max(f64::MIN_POSITIVE)
            / CGS::PLANCK_CONSTANT;
        let (first, last) = (self.nu[0], self.nu[n - 1]);
        let distance = |nu: f64| (nu.ln() - nu_peak.ln()).abs();

        if distance(first) <= distance(last) {
            values[0]
        } else {
            values[n - 1]
        }
    }

    /// Specific energy absorbed/emitted in equilibrium at `temperature`,
    /// `4 sigma T^4 kappa_P(T)`, in erg/s/g
    pub fn temperature_to_specific_energy(
        &self,
        temperature: f64,
    ) -> Result<f64, OpticalPropertiesError> {
        if temperature <= 0.0 {
            return Ok(0.0);
        }
        let kappa_p = self.planck_mean_kappa(temperature)?;
        Ok(4.0 * CGS::STEFAN_BOLTZMANN * temperature.powi(4) * kappa_p)
    }

    /// Inverse of [`OpticalProperties::temperature_to_specific_energy`],
    /// interpolated in log-log space over a fixed temperature grid.
    pub fn specific_energy_to_temperature(
        &self,
        specific_energy: f64,
    ) -> Result<f64, OpticalPropertiesError> {
        self.temperature_inversion()?.temperature(specific_energy)
    }

    /// Tabulate specific energy against temperature once, for repeated
    /// conversions from specific energy to temperature
    pub fn temperature_inversion(&self) -> Result<TemperatureInversion, OpticalPropertiesError> {
        let temperatures = log_space(INVERSION_TEMP_MIN, INVERSION_TEMP_MAX, INVERSION_TEMP_POINTS);
        let mut specific_energy = Vec::with_capacity(temperatures.len());
        let mut temperature = Vec::with_capacity(temperatures.len());

        // Keep a strictly increasing, positive energy grid
        for &t in temperatures.iter() {
            let e = self.temperature_to_specific_energy(t)?;
            if e > 0.0 && specific_energy.last().map_or(true, |&last| e > last) {
                specific_energy.push(e);
                temperature.push(t);
            }
        }

        Ok(TemperatureInversion {
            specific_energy,
            temperature,
        })
    }

    /// Add the `optical_properties` and `scattering_angles` tables
    pub fn to_table_set(&self, table_set: &mut TableSet) -> Result<(), OpticalPropertiesError> {
        self.validate()?;

        let mut table = Table::new(OPTICAL_PROPERTIES_TABLE);
        table.add_column("nu", self.nu.to_vec());
        table.add_column("albedo", self.albedo.to_vec());
        table.add_column("chi", self.chi.to_vec());
        for element in ScatteringElement::ALL {
            table.add_vector_column(element.name(), self.matrix(element)?);
        }
        table_set.add_table(table);

        let mut angles = Table::new(SCATTERING_ANGLES_TABLE);
        angles.add_column("mu", self.mu.to_vec());
        table_set.add_table(angles);

        Ok(())
    }

    /// Rebuild optical properties from tables written by
    /// [`OpticalProperties::to_table_set`]
    pub fn from_table_set(table_set: &TableSet) -> Result<Self, OpticalPropertiesError> {
        let table = table_set.table(OPTICAL_PROPERTIES_TABLE)?;
        let angles = table_set.table(SCATTERING_ANGLES_TABLE)?;

        let mut op = OpticalProperties::new();
        op.set_mu(angles.column("mu")?.to_vec());
        op.set_nu(table.column("nu")?.to_vec());
        op.set_albedo(table.column("albedo")?.to_vec());
        op.set_chi(table.column("chi")?.to_vec());

        op.initialize_scattering_matrix()?;
        op.set_matrices(
            table.vector_column("P1")?,
            table.vector_column("P2")?,
            table.vector_column("P3")?,
            table.vector_column("P4")?,
        )?;

        op.validate()?;
        Ok(op)
    }
}

/// Specific energy tabulated against temperature for one optical property
/// table
#[derive(Debug, Clone)]
pub struct TemperatureInversion {
    specific_energy: Vec<f64>,
    temperature: Vec<f64>,
}

impl TemperatureInversion {
    /// Temperature in K at which the dust emits `specific_energy` in
    /// equilibrium. Non-positive energies map to 0 K; NaN and infinite
    /// energies are an error.
    pub fn temperature(&self, specific_energy: f64) -> Result<f64, OpticalPropertiesError> {
        if !specific_energy.is_finite() {
            return Err(OpticalPropertiesError::Inversion(
                specific_energy,
                InterpError::NonFinite(specific_energy),
            ));
        }
        if specific_energy <= 0.0 {
            return Ok(0.0);
        }
        interp_loglog(specific_energy, &self.specific_energy, &self.temperature)
            .map_err(|e| OpticalPropertiesError::Inversion(specific_energy, e))
    }
}

fn check_range(
    name: &'static str,
    values: &Array1<f64>,
    allowed: &'static str,
    ok: impl Fn(f64) -> bool,
) -> Result<(), OpticalPropertiesError> {
    match values.iter().enumerate().find(|&(_, &v)| !ok(v)) {
        Some((index, &value)) => Err(OpticalPropertiesError::InvalidValue {
            name,
            index,
            value,
            allowed,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase_function::henyey_greenstein_column;
    use approx::assert_relative_eq;
    use ndarray::array;

    /// Grey dust: constant opacity and albedo over a wide wavelength range
    fn grey(kappa: f64, albedo: f64) -> OpticalProperties {
        let wav = log_space(0.01, 5000.0, 400);
        let mut op = OpticalProperties::new();
        op.set_mu(array![-1.0, 0.0, 1.0]);
        op.set_wavelengths(wav.as_slice().unwrap());
        op.set_albedo(Array1::from_elem(400, albedo));
        op.set_chi(Array1::from_elem(400, kappa / (1.0 - albedo)));
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
    fn test_initialize_requires_mu() {
        let mut op = OpticalProperties::new();
        op.set_nu(array![1e14, 2e14]);
        assert!(matches!(
            op.initialize_scattering_matrix(),
            Err(OpticalPropertiesError::ConstructionOrder("mu"))
        ));
    }

    #[test]
    fn test_initialize_requires_nu() {
        let mut op = OpticalProperties::new();
        op.set_mu(array![-1.0, 1.0]);
        assert!(matches!(
            op.initialize_scattering_matrix(),
            Err(OpticalPropertiesError::ConstructionOrder("nu"))
        ));
    }

    #[test]
    fn test_initialize_allocates_shape() {
        let mut op = OpticalProperties::new();
        op.set_mu(array![-1.0, 0.0, 1.0]);
        op.set_nu(array![1e14, 2e14, 3e14, 4e14, 5e14]);
        op.initialize_scattering_matrix().unwrap();

        for element in ScatteringElement::ALL {
            let m = op.matrix(element).unwrap();
            assert_eq!(m.dim(), (5, 3));
            assert!(m.iter().all(|&v| v == 0.0));
        }
    }

    #[test]
    fn test_set_row_and_column() {
        let mut op = OpticalProperties::new();
        op.set_mu(array![-1.0, 1.0]);
        op.set_nu(array![1e14, 2e14, 3e14]);
        op.initialize_scattering_matrix().unwrap();

        op.set_row(ScatteringElement::P2, 1, &[0.5, 0.25]).unwrap();
        assert_eq!(op.p2().unwrap()[[1, 1]], 0.25);

        let g = array![0.0, 0.0, 0.0];
        let p = array![0.0, 0.0, 0.0];
        let column = henyey_greenstein_column(1.0, g.view(), p.view()).unwrap();
        op.set_column(1, &column).unwrap();
        assert_eq!(op.p1().unwrap()[[2, 1]], 1.0);

        assert!(matches!(
            op.set_row(ScatteringElement::P1, 0, &[1.0]),
            Err(OpticalPropertiesError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_set_matrices_checks_shape() {
        let mut op = OpticalProperties::new();
        op.set_mu(array![-1.0, 1.0]);
        op.set_nu(array![1e14, 2e14]);
        let bad = Array2::zeros((3, 2));
        let good = Array2::zeros((2, 2));
        assert!(matches!(
            op.set_matrices(good.clone(), bad, good.clone(), good),
            Err(OpticalPropertiesError::ShapeMismatch { name: "P2", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_albedo() {
        let mut op = grey(1.0, 0.5);
        op.albedo_mut()[3] = 1.5;
        assert!(matches!(
            op.validate(),
            Err(OpticalPropertiesError::InvalidValue { name: "albedo", index: 3, .. })
        ));
    }

    #[test]
    fn test_validate_rejects_nan_chi() {
        let mut op = grey(1.0, 0.5);
        op.chi_mut()[0] = f64::NAN;
        assert!(matches!(
            op.validate(),
            Err(OpticalPropertiesError::InvalidValue { name: "chi", .. })
        ));
    }

    #[test]
    fn test_kappa() {
        let op = grey(2.0, 0.25);
        assert!(op.kappa().iter().all(|&k| (k - 2.0).abs() < 1e-12));
    }

    #[test]
    fn test_grey_specific_energy() {
        // A grey absorber has kappa_P = kappa for any temperature
        let op = grey(3.0, 0.4);
        let t = 100.0;
        let e = op.temperature_to_specific_energy(t).unwrap();
        assert_relative_eq!(
            e,
            4.0 * CGS::STEFAN_BOLTZMANN * t.powi(4) * 3.0,
            max_relative = 1e-3
        );
    }

    #[test]
    fn test_specific_energy_zero_temperature() {
        let op = grey(1.0, 0.5);
        assert_eq!(op.temperature_to_specific_energy(0.0).unwrap(), 0.0);
        assert_eq!(op.specific_energy_to_temperature(0.0).unwrap(), 0.0);
    }

    #[test]
    fn test_specific_energy_monotonic_and_invertible() {
        let op = grey(1.0, 0.5);
        let mut previous = 0.0;
        for t in [1.0, 10.0, 50.0, 300.0, 1500.0] {
            let e = op.temperature_to_specific_energy(t).unwrap();
            assert!(e > previous);
            previous = e;

            let back = op.specific_energy_to_temperature(e).unwrap();
            assert_relative_eq!(back, t, max_relative = 1e-3);
        }
    }

    #[test]
    fn test_non_finite_specific_energy_is_an_error() {
        let op = grey(1.0, 0.0);
        for energy in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                op.specific_energy_to_temperature(energy),
                Err(OpticalPropertiesError::Inversion(_, InterpError::NonFinite(_)))
            ));
        }
    }

    #[test]
    fn test_underflow_uses_edge_value() {
        // Grid far in the Wien tail of a 1 K blackbody
        let mut op = OpticalProperties::new();
        op.set_mu(array![-1.0, 1.0]);
        op.set_wavelengths(&[0.01, 0.02]);
        op.set_albedo(array![0.0, 0.0]);
        op.set_chi(array![5.0, 7.0]);

        // nu[1] (longer wavelength) is closer to a 1 K peak
        assert_eq!(op.planck_mean_kappa(1.0).unwrap(), 7.0);
    }

    #[test]
    fn test_table_set_roundtrip() {
        let op = grey(1.0, 0.5);
        let mut ts = TableSet::new();
        op.to_table_set(&mut ts).unwrap();

        let restored = OpticalProperties::from_table_set(&ts).unwrap();
        assert_eq!(restored, op);
    }

    #[test]
    fn test_to_table_set_validates() {
        let mut op = OpticalProperties::new();
        op.set_mu(array![-1.0, 1.0]);
        op.set_nu(array![1e14]);
        let mut ts = TableSet::new();
        assert!(op.to_table_set(&mut ts).is_err());
    }
}
