//! Dust model: optical properties plus everything the radiative-transfer
//! solver needs from a dust file.
//!
//! A [`DustModel`] owns one [`OpticalProperties`] table, lazily derived
//! emissivities and mean opacities, and the sublimation policy. It writes all
//! of these to a single versioned table-set file and reads them back.

use std::path::{Path, PathBuf};

use shared::table_set::{TableSet, TableSetError};
use thiserror::Error;

use crate::derived::Derived;
use crate::emissivities::{Emissivities, EmissivitiesError};
use crate::loaders::{DustSource, LoaderError};
use crate::mean_opacities::{MeanOpacities, MeanOpacitiesError};
use crate::optical_properties::{OpticalProperties, OpticalPropertiesError};
use crate::sublimation::{SublimationMode, SublimationPolicy};

/// On-disk format version written and accepted by this crate
pub const FORMAT_VERSION: i64 = 1;

/// Type tag of spherical dust files
pub const DUST_TYPE: i64 = 1;

fn lte_emissivities(
    optical_properties: &OpticalProperties,
) -> Result<Emissivities, EmissivitiesError> {
    log::warn!("Computing emissivities assuming LTE");
    Emissivities::lte_default(optical_properties)
}

/// Errors that can occur while configuring, writing or reading a dust model
#[derive(Error, Debug)]
pub enum DustError {
    #[error("Sublimation mode should be one of no/fast/slow/cap, got '{0}'")]
    InvalidSublimationMode(String),

    #[error("Sublimation mode '{0}' requires a threshold")]
    MissingSublimationThreshold(SublimationMode),

    #[error("Sublimation threshold must be finite and non-negative, got {0}")]
    InvalidSublimationThreshold(f64),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Version should be 1, found {0}")]
    VersionMismatch(i64),

    #[error("Type should be 1, found {0}")]
    TypeMismatch(i64),

    #[error(transparent)]
    Loader(#[from] LoaderError),

    #[error(transparent)]
    OpticalProperties(#[from] OpticalPropertiesError),

    #[error(transparent)]
    Emissivities(#[from] EmissivitiesError),

    #[error(transparent)]
    MeanOpacities(#[from] MeanOpacitiesError),

    #[error(transparent)]
    TableSet(#[from] TableSetError),
}

/// A spherical dust type
#[derive(Debug, Clone, Default)]
pub struct DustModel {
    filename: Option<PathBuf>,
    md5: Option<String>,
    optical_properties: OpticalProperties,
    emissivities: Derived<Emissivities>,
    mean_opacities: Derived<MeanOpacities>,
    sublimation: SublimationPolicy,
}

impl DustModel {
    /// An empty model with no sublimation
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_optical_properties(optical_properties: OpticalProperties) -> Self {
        Self {
            optical_properties,
            ..Self::default()
        }
    }

    /// Load a dataset in one of the supported third-party formats
    pub fn from_source(source: &DustSource) -> Result<Self, DustError> {
        let loaded = source.load()?;
        Ok(Self {
            md5: loaded.md5,
            ..Self::from_optical_properties(loaded.optical_properties)
        })
    }

    /// Path this model was last written to or read from
    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    /// Hex MD5 of the source table, if it came from a single text file
    pub fn md5(&self) -> Option<&str> {
        self.md5.as_deref()
    }

    pub fn optical_properties(&self) -> &OpticalProperties {
        &self.optical_properties
    }

    /// Mutable access to the optical properties.
    ///
    /// Emissivities and mean opacities are derived from the optical
    /// properties, so both are reset and recomputed on next use.
    pub fn optical_properties_mut(&mut self) -> &mut OpticalProperties {
        self.emissivities.reset();
        self.mean_opacities.reset();
        &mut self.optical_properties
    }

    pub fn sublimation(&self) -> SublimationPolicy {
        self.sublimation
    }

    /// Set the sublimation mode with a threshold specific energy (erg/s/g)
    pub fn set_sublimation_specific_energy(
        &mut self,
        mode: SublimationMode,
        specific_energy: Option<f64>,
    ) -> Result<(), DustError> {
        self.sublimation = SublimationPolicy::new(mode, specific_energy)?;
        Ok(())
    }

    /// Set the sublimation mode with a threshold temperature (K).
    ///
    /// The temperature is converted to the equilibrium specific energy of
    /// this dust before it is stored.
    pub fn set_sublimation_temperature(
        &mut self,
        mode: SublimationMode,
        temperature: Option<f64>,
    ) -> Result<(), DustError> {
        if mode == SublimationMode::No {
            self.sublimation = SublimationPolicy::None;
            return Ok(());
        }

        let temperature = temperature.ok_or(DustError::MissingSublimationThreshold(mode))?;
        let specific_energy = self
            .optical_properties
            .temperature_to_specific_energy(temperature)?;
        self.set_sublimation_specific_energy(mode, Some(specific_energy))
    }

    pub fn emissivities(&self) -> Option<&Emissivities> {
        self.emissivities.get()
    }

    pub fn mean_opacities(&self) -> Option<&MeanOpacities> {
        self.mean_opacities.get()
    }

    /// Install explicit emissivities; mean opacities are recomputed from them
    pub fn set_emissivities(&mut self, emissivities: Emissivities) {
        self.emissivities.set(emissivities);
        self.mean_opacities.reset();
    }

    /// Emissivities, computed in the LTE approximation if none are set
    pub fn ensure_emissivities(&mut self) -> Result<&Emissivities, DustError> {
        let optical_properties = &self.optical_properties;
        Ok(self
            .emissivities
            .ensure_computed(|| lte_emissivities(optical_properties))?)
    }

    /// Mean opacities, computed from the emissivities if none are set
    pub fn ensure_mean_opacities(&mut self) -> Result<&MeanOpacities, DustError> {
        let optical_properties = &self.optical_properties;
        let emissivities = self
            .emissivities
            .ensure_computed(|| lte_emissivities(optical_properties))?;
        Ok(self
            .mean_opacities
            .ensure_computed(|| MeanOpacities::compute(emissivities, optical_properties))?)
    }

    /// Assemble the versioned table set, computing derived quantities first
    pub fn to_table_set(&mut self) -> Result<TableSet, DustError> {
        self.optical_properties.validate()?;
        self.ensure_mean_opacities()?;

        let mut ts = TableSet::new();
        ts.add_keyword("version", FORMAT_VERSION);
        ts.add_keyword("type", DUST_TYPE);
        ts.add_keyword("software_version", env!("CARGO_PKG_VERSION"));
        if let Some(md5) = &self.md5 {
            ts.add_keyword("asciimd5", md5.as_str());
        }

        self.optical_properties.to_table_set(&mut ts)?;
        if let Some(mean_opacities) = self.mean_opacities.get() {
            mean_opacities.to_table_set(&mut ts);
        }
        if let Some(emissivities) = self.emissivities.get() {
            emissivities.to_table_set(&mut ts);
        }

        ts.add_keyword("sublimation_mode", self.sublimation.mode().as_str());
        if let Some(specific_energy) = self.sublimation.specific_energy() {
            ts.add_keyword("sublimation_specific_energy", specific_energy);
        }

        Ok(ts)
    }

    /// Write the dust file and record `path` as this model's file
    pub fn write<P: AsRef<Path>>(&mut self, path: P, compress: bool) -> Result<(), DustError> {
        let path = path.as_ref();
        let ts = self.to_table_set()?;
        ts.write(path, compress)?;

        log::info!("Wrote dust file {}", path.display());
        self.filename = Some(path.to_path_buf());
        Ok(())
    }

    /// Rebuild a model from a table set, checking version and type first
    pub fn from_table_set(ts: &TableSet) -> Result<Self, DustError> {
        let version = ts.keywords.int("version")?;
        if version != FORMAT_VERSION {
            return Err(DustError::VersionMismatch(version));
        }
        let dust_type = ts.keywords.int("type")?;
        if dust_type != DUST_TYPE {
            return Err(DustError::TypeMismatch(dust_type));
        }

        let md5 = if ts.keywords.contains("asciimd5") {
            Some(ts.keywords.text("asciimd5")?.to_string())
        } else {
            None
        };

        let optical_properties = OpticalProperties::from_table_set(ts)?;
        let mean_opacities = MeanOpacities::from_table_set(ts)?;
        let emissivities = Emissivities::from_table_set(ts)?;

        let sublimation = if ts.keywords.contains("sublimation_mode") {
            let mode: SublimationMode = ts.keywords.text("sublimation_mode")?.parse()?;
            let specific_energy = match mode {
                SublimationMode::No => None,
                _ => Some(ts.keywords.float("sublimation_specific_energy")?),
            };
            SublimationPolicy::new(mode, specific_energy)?
        } else {
            SublimationPolicy::None
        };

        Ok(Self {
            filename: None,
            md5,
            optical_properties,
            emissivities: Derived::computed(emissivities),
            mean_opacities: Derived::computed(mean_opacities),
            sublimation,
        })
    }

    /// Read a dust file written by [`DustModel::write`]
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, DustError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DustError::FileNotFound(path.to_path_buf()));
        }

        let ts = TableSet::read(path)?;
        let mut model = Self::from_table_set(&ts)?;
        model.filename = Some(path.to_path_buf());

        log::info!("Read dust file {}", path.display());
        Ok(model)
    }

    /// Replace this model with the contents of a dust file.
    ///
    /// On error the model is left unchanged.
    pub fn reload<P: AsRef<Path>>(&mut self, path: P) -> Result<(), DustError> {
        *self = Self::read(path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loaders::isotropic;
    use approx::assert_relative_eq;
    use shared::interpolate::InterpError;
    use tempfile::tempdir;

    fn isotropic_model() -> DustModel {
        let wav: Vec<f64> = (0..60).map(|i| 0.05 * 1.2_f64.powi(i)).collect();
        let chi: Vec<f64> = wav.iter().map(|w| 100.0 / w).collect();
        let albedo = vec![0.5; 60];
        DustModel::from_optical_properties(isotropic(&wav, &chi, &albedo).unwrap())
    }

    #[test]
    fn test_new_model_has_no_sublimation() {
        let model = DustModel::new();
        assert_eq!(model.sublimation(), SublimationPolicy::None);
        assert!(model.filename().is_none());
        assert!(model.md5().is_none());
    }

    #[test]
    fn test_sublimation_temperature_matches_specific_energy() {
        let mut by_temperature = isotropic_model();
        by_temperature
            .set_sublimation_temperature(SublimationMode::Fast, Some(1500.0))
            .unwrap();

        let energy = by_temperature
            .optical_properties()
            .temperature_to_specific_energy(1500.0)
            .unwrap();
        let mut by_energy = isotropic_model();
        by_energy
            .set_sublimation_specific_energy(SublimationMode::Fast, Some(energy))
            .unwrap();

        assert_eq!(by_temperature.sublimation().mode(), SublimationMode::Fast);
        assert_relative_eq!(
            by_temperature.sublimation().specific_energy().unwrap(),
            by_energy.sublimation().specific_energy().unwrap(),
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_sublimation_requires_threshold() {
        let mut model = isotropic_model();
        assert!(matches!(
            model.set_sublimation_temperature(SublimationMode::Slow, None),
            Err(DustError::MissingSublimationThreshold(SublimationMode::Slow))
        ));
        assert!(matches!(
            model.set_sublimation_specific_energy(SublimationMode::Cap, None),
            Err(DustError::MissingSublimationThreshold(SublimationMode::Cap))
        ));
        assert_eq!(model.sublimation(), SublimationPolicy::None);
    }

    #[test]
    fn test_mutation_resets_derived_state() {
        let mut model = isotropic_model();
        model.ensure_mean_opacities().unwrap();
        assert!(model.emissivities().is_some());
        assert!(model.mean_opacities().is_some());

        model.optical_properties_mut().chi_mut()[0] *= 2.0;

        assert!(model.emissivities().is_none());
        assert!(model.mean_opacities().is_none());
    }

    #[test]
    fn test_set_emissivities_resets_mean_opacities() {
        let mut model = isotropic_model();
        model.ensure_mean_opacities().unwrap();

        let lte = Emissivities::lte(model.optical_properties(), 10, 10.0, 1000.0).unwrap();
        model.set_emissivities(lte.clone());

        assert_eq!(model.emissivities(), Some(&lte));
        assert!(model.mean_opacities().is_none());
        assert_eq!(
            model.ensure_mean_opacities().unwrap().specific_energy().len(),
            10
        );
    }

    #[test]
    fn test_nan_emissivity_energy_is_an_error() {
        let mut model = isotropic_model();
        let nu = model.optical_properties().nu().to_owned();
        let n_nu = nu.len();
        let emissivities = Emissivities::new(
            nu,
            ndarray::array![f64::NAN],
            ndarray::Array2::zeros((1, n_nu)),
        )
        .unwrap();
        model.set_emissivities(emissivities);

        assert!(matches!(
            model.ensure_mean_opacities(),
            Err(DustError::MeanOpacities(MeanOpacitiesError::OpticalProperties(
                OpticalPropertiesError::Inversion(_, InterpError::NonFinite(_))
            )))
        ));
        assert!(model.mean_opacities().is_none());
    }

    #[test]
    fn test_table_set_keywords() {
        let mut model = isotropic_model();
        model
            .set_sublimation_specific_energy(SublimationMode::Cap, Some(1e10))
            .unwrap();
        let ts = model.to_table_set().unwrap();

        assert_eq!(ts.keywords.int("version").unwrap(), 1);
        assert_eq!(ts.keywords.int("type").unwrap(), 1);
        assert_eq!(
            ts.keywords.text("software_version").unwrap(),
            env!("CARGO_PKG_VERSION")
        );
        assert!(!ts.keywords.contains("asciimd5"));
        assert_eq!(ts.keywords.text("sublimation_mode").unwrap(), "cap");
        assert_eq!(
            ts.keywords.float("sublimation_specific_energy").unwrap(),
            1e10
        );
    }

    #[test]
    fn test_no_sublimation_omits_threshold() {
        let mut model = isotropic_model();
        let ts = model.to_table_set().unwrap();
        assert_eq!(ts.keywords.text("sublimation_mode").unwrap(), "no");
        assert!(!ts.keywords.contains("sublimation_specific_energy"));
    }

    #[test]
    fn test_type_mismatch() {
        let mut model = isotropic_model();
        let mut ts = model.to_table_set().unwrap();
        ts.add_keyword("type", 2);
        assert!(matches!(
            DustModel::from_table_set(&ts),
            Err(DustError::TypeMismatch(2))
        ));
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.dust");
        assert!(matches!(
            DustModel::read(&path),
            Err(DustError::FileNotFound(p)) if p == path
        ));
    }
}
