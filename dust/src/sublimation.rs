//! Dust sublimation settings
//!
//! The radiative-transfer solver treats cells whose specific energy exceeds a
//! threshold according to a sublimation mode. Thresholds are always stored as
//! specific energies (erg/s/g).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::dust_model::DustError;

/// How the solver handles dust above the sublimation threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SublimationMode {
    /// No sublimation
    No,
    /// Remove all dust in cells above the threshold
    Fast,
    /// Reduce the dust in cells above the threshold
    Slow,
    /// Cap the specific energy at the threshold
    Cap,
}

impl SublimationMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SublimationMode::No => "no",
            SublimationMode::Fast => "fast",
            SublimationMode::Slow => "slow",
            SublimationMode::Cap => "cap",
        }
    }
}

impl fmt::Display for SublimationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SublimationMode {
    type Err = DustError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no" => Ok(SublimationMode::No),
            "fast" => Ok(SublimationMode::Fast),
            "slow" => Ok(SublimationMode::Slow),
            "cap" => Ok(SublimationMode::Cap),
            other => Err(DustError::InvalidSublimationMode(other.to_string())),
        }
    }
}

/// Sublimation mode together with its specific-energy threshold
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SublimationPolicy {
    #[default]
    None,
    Fast { specific_energy: f64 },
    Slow { specific_energy: f64 },
    Cap { specific_energy: f64 },
}

impl SublimationPolicy {
    /// Build a policy, requiring a threshold for every mode except `no`.
    ///
    /// A threshold passed with mode `no` is ignored.
    pub fn new(mode: SublimationMode, specific_energy: Option<f64>) -> Result<Self, DustError> {
        if mode == SublimationMode::No {
            return Ok(SublimationPolicy::None);
        }

        let specific_energy =
            specific_energy.ok_or(DustError::MissingSublimationThreshold(mode))?;
        if !specific_energy.is_finite() || specific_energy < 0.0 {
            return Err(DustError::InvalidSublimationThreshold(specific_energy));
        }

        Ok(match mode {
            SublimationMode::Fast => SublimationPolicy::Fast { specific_energy },
            SublimationMode::Slow => SublimationPolicy::Slow { specific_energy },
            SublimationMode::Cap => SublimationPolicy::Cap { specific_energy },
            SublimationMode::No => SublimationPolicy::None,
        })
    }

    pub fn mode(&self) -> SublimationMode {
        match self {
            SublimationPolicy::None => SublimationMode::No,
            SublimationPolicy::Fast { .. } => SublimationMode::Fast,
            SublimationPolicy::Slow { .. } => SublimationMode::Slow,
            SublimationPolicy::Cap { .. } => SublimationMode::Cap,
        }
    }

    /// Threshold specific energy, present iff the mode is not `no`
    pub fn specific_energy(&self) -> Option<f64> {
        match *self {
            SublimationPolicy::None => None,
            SublimationPolicy::Fast { specific_energy }
            | SublimationPolicy::Slow { specific_energy }
            | SublimationPolicy::Cap { specific_energy } => Some(specific_energy),
        }
    }
}
