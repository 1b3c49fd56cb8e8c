//! Planck and Rosseland mean opacities.
//!
//! Means are tabulated on the emissivity variable grid: each specific energy
//! is converted to the equilibrium temperature, and the opacities are
//! averaged over frequency with Planck weights `B_nu(T)` (Planck means) or as
//! harmonic means with weights `dB_nu/dT` (Rosseland means).

use ndarray::{Array1, ArrayView1};
use shared::constants::{planck_nu, planck_nu_dt};
use shared::table_set::{Table, TableSet, TableSetError};
use shared::trapezoid::{trap_integrate_samples, TrapezoidError};
use thiserror::Error;

use crate::emissivities::Emissivities;
use crate::optical_properties::{OpticalProperties, OpticalPropertiesError};

pub const MEAN_OPACITIES_TABLE: &str = "mean_opacities";

const COLUMNS: [&str; 5] = [
    "specific_energy",
    "chi_planck",
    "kappa_planck",
    "chi_rosseland",
    "kappa_rosseland",
];

#[derive(Error, Debug)]
pub enum MeanOpacitiesError {
    #[error("Mean opacity columns have inconsistent lengths")]
    LengthMismatch,

    #[error(transparent)]
    OpticalProperties(#[from] OpticalPropertiesError),

    #[error(transparent)]
    Integration(#[from] TrapezoidError),

    #[error(transparent)]
    TableSet(#[from] TableSetError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeanOpacities {
    specific_energy: Array1<f64>,
    chi_planck: Array1<f64>,
    kappa_planck: Array1<f64>,
    chi_rosseland: Array1<f64>,
    kappa_rosseland: Array1<f64>,
}

/// `∫ w v dnu / ∫ w dnu`
fn planck_weighted(nu: &[f64], values: &[f64], weights: &[f64]) -> Result<Option<f64>, TrapezoidError> {
    let norm = trap_integrate_samples(nu, weights)?;
    if norm == 0.0 {
        return Ok(None);
    }
    let weighted: Vec<f64> = weights.iter().zip(values).map(|(w, v)| w * v).collect();
    Ok(Some(trap_integrate_samples(nu, &weighted)? / norm))
}

/// `∫ w dnu / ∫ (w / v) dnu`
fn harmonic_weighted(nu: &[f64], values: &[f64], weights: &[f64]) -> Result<Option<f64>, TrapezoidError> {
    let norm = trap_integrate_samples(nu, weights)?;
    if norm == 0.0 {
        return Ok(None);
    }
    // Zero weight contributes nothing, even where the opacity vanishes
    let inverse: Vec<f64> = weights
        .iter()
        .zip(values)
        .map(|(&w, &v)| if w == 0.0 { 0.0 } else { w / v })
        .collect();
    let denominator = trap_integrate_samples(nu, &inverse)?;
    if denominator.is_infinite() {
        return Ok(Some(0.0));
    }
    Ok(Some(norm / denominator))
}

impl MeanOpacities {
    /// Compute mean opacities on the specific-energy grid of `emissivities`
    pub fn compute(
        emissivities: &Emissivities,
        optical_properties: &OpticalProperties,
    ) -> Result<Self, MeanOpacitiesError> {
        let nu = optical_properties.nu().to_vec();
        let chi = optical_properties.chi().to_owned();
        let kappa = optical_properties.kappa();
        let (chi_s, kappa_s) = (chi.to_vec(), kappa.to_vec());

        let inversion = optical_properties.temperature_inversion()?;
        let specific_energy = emissivities.specific_energy().to_owned();
        let n = specific_energy.len();

        let mut result = Self {
            specific_energy: specific_energy.clone(),
            chi_planck: Array1::zeros(n),
            kappa_planck: Array1::zeros(n),
            chi_rosseland: Array1::zeros(n),
            kappa_rosseland: Array1::zeros(n),
        };

        for (i, &e) in specific_energy.iter().enumerate() {
            let t = inversion.temperature(e)?;
            let b: Vec<f64> = nu.iter().map(|&n| planck_nu(n, t)).collect();
            let db: Vec<f64> = nu.iter().map(|&n| planck_nu_dt(n, t)).collect();

            result.chi_planck[i] = planck_weighted(&nu, &chi_s, &b)?
                .unwrap_or_else(|| optical_properties.edge_value(&chi, t));
            result.kappa_planck[i] = planck_weighted(&nu, &kappa_s, &b)?
                .unwrap_or_else(|| optical_properties.edge_value(&kappa, t));
            result.chi_rosseland[i] = harmonic_weighted(&nu, &chi_s, &db)?
                .unwrap_or_else(|| optical_properties.edge_value(&chi, t));
            result.kappa_rosseland[i] = harmonic_weighted(&nu, &kappa_s, &db)?
                .unwrap_or_else(|| optical_properties.edge_value(&kappa, t));
        }

        Ok(result)
    }

    pub fn specific_energy(&self) -> ArrayView1<'_, f64> {
        self.specific_energy.view()
    }

    pub fn chi_planck(&self) -> ArrayView1<'_, f64> {
        self.chi_planck.view()
    }

    pub fn kappa_planck(&self) -> ArrayView1<'_, f64> {
        self.kappa_planck.view()
    }

    pub fn chi_rosseland(&self) -> ArrayView1<'_, f64> {
        self.chi_rosseland.view()
    }

    pub fn kappa_rosseland(&self) -> ArrayView1<'_, f64> {
        self.kappa_rosseland.view()
    }

    fn columns(&self) -> [&Array1<f64>; 5] {
        [
            &self.specific_energy,
            &self.chi_planck,
            &self.kappa_planck,
            &self.chi_rosseland,
            &self.kappa_rosseland,
        ]
    }

    pub fn to_table_set(&self, table_set: &mut TableSet) {
        let mut table = Table::new(MEAN_OPACITIES_TABLE);
        for (name, values) in COLUMNS.iter().zip(self.columns()) {
            table.add_column(name, values.to_vec());
        }
        table_set.add_table(table);
    }

    pub fn from_table_set(table_set: &TableSet) -> Result<Self, MeanOpacitiesError> {
        let table = table_set.table(MEAN_OPACITIES_TABLE)?;
        let column = |name: &str| -> Result<Array1<f64>, TableSetError> {
            Ok(Array1::from(table.column(name)?.to_vec()))
        };

        let result = Self {
            specific_energy: column("specific_energy")?,
            chi_planck: column("chi_planck")?,
            kappa_planck: column("kappa_planck")?,
            chi_rosseland: column("chi_rosseland")?,
            kappa_rosseland: column("kappa_rosseland")?,
        };

        let n = result.specific_energy.len();
        if result.columns().iter().any(|c| c.len() != n) {
            return Err(MeanOpacitiesError::LengthMismatch);
        }
        Ok(result)
    }
}
