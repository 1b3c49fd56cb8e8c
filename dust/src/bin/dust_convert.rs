//! Convert third-party dust descriptions into versioned dust files.
//!
//! Subcommands:
//! - `isotropic`: three-column `wav chi albedo` table, isotropic scattering
//! - `simple`: bulk properties with a Henyey-Greenstein phase function
//! - `coatsph-single` / `coatsph-multiple`: coatsph output directories
//! - `miex`: MieX output files
//! - `bhmie`: pre-tabulated arrays
//! - `config`: run a JSON conversion description

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dust::{ConversionConfig, DustModel, DustSource, SublimationConfig, SublimationMode};
use log::info;

/// Dust file converter
#[derive(Parser, Debug)]
#[command(name = "dust_convert")]
#[command(about = "Convert dust optical properties into a versioned dust file")]
#[command(version)]
struct Args {
    /// Output dust file
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Write the dust file uncompressed
    #[arg(long, global = true)]
    no_compress: bool,

    /// Sublimation mode
    #[arg(long, global = true, value_enum)]
    sublimation_mode: Option<SublimationMode>,

    /// Sublimation temperature in K
    #[arg(
        long,
        global = true,
        conflicts_with = "sublimation_energy",
        requires = "sublimation_mode"
    )]
    sublimation_temperature: Option<f64>,

    /// Sublimation specific energy in erg/s/g
    #[arg(long, global = true, requires = "sublimation_mode")]
    sublimation_energy: Option<f64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Isotropic scattering from a `wav chi albedo` table
    Isotropic { path: PathBuf },

    /// `wav c_ext c_sca chi g p_lin_max` table with Henyey-Greenstein scattering
    Simple { path: PathBuf },

    /// Single-component coatsph output directory
    CoatsphSingle {
        directory: PathBuf,

        /// Grain size in cm
        #[arg(long)]
        size: f64,

        /// Grain density in g/cm^3
        #[arg(long)]
        density: f64,
    },

    /// Multi-component coatsph output directory
    CoatsphMultiple { directory: PathBuf },

    /// MieX output files sharing a model prefix
    Miex { model: PathBuf },

    /// Pre-tabulated arrays sharing a model prefix
    Bhmie { model: PathBuf },

    /// Run a JSON conversion description; output, compression and
    /// sublimation flags override the file
    Config { path: PathBuf },
}

impl Args {
    fn sublimation(&self) -> Option<SublimationConfig> {
        self.sublimation_mode.map(|mode| SublimationConfig {
            mode,
            temperature: self.sublimation_temperature,
            specific_energy: self.sublimation_energy,
        })
    }

    /// The conversion described by the command line
    fn into_conversion(self) -> Result<ConversionConfig> {
        let sublimation = self.sublimation();

        let source = match self.command {
            Command::Config { path } => {
                let mut config = ConversionConfig::load_from_file(&path)
                    .with_context(|| format!("loading {}", path.display()))?;
                if let Some(output) = self.output {
                    config.output = output;
                }
                if self.no_compress {
                    config.compress = false;
                }
                if sublimation.is_some() {
                    config.sublimation = sublimation;
                }
                return Ok(config);
            }
            Command::Isotropic { path } => DustSource::IsotropicFile { path },
            Command::Simple { path } => DustSource::Simple { path },
            Command::CoatsphSingle {
                directory,
                size,
                density,
            } => DustSource::CoatsphSingle {
                directory,
                size,
                density,
            },
            Command::CoatsphMultiple { directory } => DustSource::CoatsphMultiple { directory },
            Command::Miex { model } => DustSource::Miex { model },
            Command::Bhmie { model } => DustSource::Bhmie { model },
        };

        let Some(output) = self.output else {
            bail!("--output is required");
        };
        Ok(ConversionConfig {
            source,
            output,
            compress: !self.no_compress,
            sublimation: sublimation.filter(|s| s.mode != SublimationMode::No),
        })
    }
}

fn summarize(model: &DustModel) {
    let op = model.optical_properties();
    info!(
        "{} wavelengths, {} scattering angles, sublimation {}",
        op.n_wav(),
        op.n_mu(),
        model.sublimation().mode()
    );
    if let Some(md5) = model.md5() {
        info!("Source md5 {}", md5);
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let config = Args::parse().into_conversion()?;

    let model = config.run()?;
    summarize(&model);
    info!("Wrote {}", config.output.display());

    Ok(())
}
