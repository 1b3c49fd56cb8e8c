//! Synthetic dust datasets written in third-party file layouts.
//!
//! [`SyntheticDust`] holds a small, smooth, physically plausible dust model.
//! The `write_*` functions lay it out on disk exactly the way the
//! corresponding external code would, so loader tests can compare what they
//! read back against the known source values. Fields are public so tests can
//! inject defects (NaN entries, shifted grids) before writing.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Element names of the scattering-matrix files, in P1..P4 order
const MATRIX_EXTENSIONS: [&str; 4] = ["f11", "f12", "f33", "f34"];

/// A synthetic dust model on `n_wav` wavelengths and `n_angle` angles
#[derive(Debug, Clone)]
pub struct SyntheticDust {
    /// Wavelengths in microns, ascending
    pub wav: Vec<f64>,
    pub albedo: Vec<f64>,
    /// Total opacity in cm^2/g
    pub chi: Vec<f64>,
    /// Henyey-Greenstein asymmetry parameter
    pub g: Vec<f64>,
    pub p_lin_max: Vec<f64>,
    /// Scattering angles in degrees, ascending from 0 to 180
    pub theta: Vec<f64>,
    /// Scattering matrix as `phase[element][wavelength][angle]`, with
    /// elements ordered s11, s12, s33, s34
    pub phase: [Vec<Vec<f64>>; 4],
}

fn fraction(i: usize, n: usize) -> f64 {
    if n > 1 {
        i as f64 / (n - 1) as f64
    } else {
        0.0
    }
}

impl SyntheticDust {
    /// Wavelengths span 0.1 to 1000 microns; angles span 0 to 180 degrees.
    pub fn new(n_wav: usize, n_angle: usize) -> Self {
        let wav: Vec<f64> = (0..n_wav)
            .map(|j| 0.1 * 10f64.powf(4.0 * fraction(j, n_wav)))
            .collect();
        let albedo = (0..n_wav).map(|j| 0.6 - 0.5 * fraction(j, n_wav)).collect();
        let chi = wav.iter().map(|w| 200.0 * w.powf(-0.8)).collect();
        let g = (0..n_wav).map(|j| 0.5 - 0.4 * fraction(j, n_wav)).collect();
        let p_lin_max = (0..n_wav).map(|j| 0.3 + 0.2 * fraction(j, n_wav)).collect();
        let theta: Vec<f64> = (0..n_angle).map(|i| 180.0 * fraction(i, n_angle)).collect();

        let element = |f: &dyn Fn(f64, f64) -> f64| -> Vec<Vec<f64>> {
            (0..n_wav)
                .map(|j| {
                    let scale = 1.0 + j as f64;
                    theta.iter().map(|t| f(scale, t.to_radians())).collect()
                })
                .collect()
        };

        let s11 = |scale: f64, t: f64| 1.0 + 0.5 * scale * (1.0 + t.cos());
        let phase = [
            element(&s11),
            element(&|scale, t| -0.2 * s11(scale, t) * t.sin().powi(2)),
            element(&|scale, t| s11(scale, t) * t.cos()),
            element(&|scale, t| 0.05 * scale * t.sin()),
        ];

        Self {
            wav,
            albedo,
            chi,
            g,
            p_lin_max,
            theta,
            phase,
        }
    }

    pub fn n_wav(&self) -> usize {
        self.wav.len()
    }

    pub fn n_angle(&self) -> usize {
        self.theta.len()
    }
}

fn write_lines(path: &Path, content: &str) -> io::Result<()> {
    fs::write(path, content)
}

/// `wav c_ext c_sca chi g p_lin_max` table; returns the file path
pub fn write_simple(dir: &Path, dust: &SyntheticDust) -> io::Result<PathBuf> {
    let path = dir.join("simple_dust.txt");
    let mut out = String::from("# wav c_ext c_sca chi g p_lin_max\n");
    for j in 0..dust.n_wav() {
        let c_ext = 2.0;
        let c_sca = 2.0 * dust.albedo[j];
        writeln!(
            out,
            "{:e} {:e} {:e} {:e} {:e} {:e}",
            dust.wav[j], c_ext, c_sca, dust.chi[j], dust.g[j], dust.p_lin_max[j]
        )
        .unwrap();
    }
    write_lines(&path, &out)?;
    Ok(path)
}

/// One coatsph phase file for wavelength index `j`, with `skip` header lines
pub fn write_coatsph_phase_file(
    path: &Path,
    dust: &SyntheticDust,
    j: usize,
    skip: usize,
) -> io::Result<()> {
    let mut out = String::new();
    for k in 0..skip {
        writeln!(out, "coatsph scattering matrix header line {}", k + 1).unwrap();
    }
    for (i, theta) in dust.theta.iter().enumerate() {
        let s11 = dust.phase[0][j][i];
        let s12 = dust.phase[1][j][i];
        let polarization = -s12 / s11;
        writeln!(
            out,
            "{:e} {:e} {:e} {:e} {:e} {:e}",
            theta, s11, polarization, s12, dust.phase[2][j][i], dust.phase[3][j][i]
        )
        .unwrap();
    }
    write_lines(path, &out)
}

fn forward_preamble(n_components: usize, header_lines: usize) -> String {
    let mut out = String::from("coatsph version 1.0 (synthetic)\n");
    writeln!(out, "coated sphere with ncomp = {} components", n_components).unwrap();
    for k in 0..header_lines {
        writeln!(out, "# column header {}", k + 1).unwrap();
    }
    out
}

/// Single-component coatsph directory for grains of `size` cm and `density`
/// g/cm^3
pub fn write_coatsph_single(
    dir: &Path,
    dust: &SyntheticDust,
    size: f64,
    density: f64,
) -> io::Result<()> {
    let mut out = forward_preamble(1, 3);
    for j in 0..dust.n_wav() {
        let q_ext = dust.chi[j] * size * density / 0.75;
        let q_sca = dust.albedo[j] * q_ext;
        let radius = size;
        let x = 2.0 * std::f64::consts::PI * radius * 1e4 / dust.wav[j];
        writeln!(
            out,
            "{:e} {:e} {:e} {:e} {:e} {:e} {:e}",
            x,
            radius,
            dust.wav[j],
            q_ext,
            q_sca,
            0.1 * q_sca,
            dust.g[j]
        )
        .unwrap();
    }
    write_lines(&dir.join("coatsph_forw.dat"), &out)?;

    for j in 0..dust.n_wav() {
        let path = dir.join(format!("coatsph_scat_{:04}_0001.dat", j + 1));
        write_coatsph_phase_file(&path, dust, j, 9)?;
    }
    Ok(())
}

/// Multi-component coatsph directory
pub fn write_coatsph_multiple(dir: &Path, dust: &SyntheticDust) -> io::Result<()> {
    let mut out = forward_preamble(2, 7);
    for j in 0..dust.n_wav() {
        let c_ext = 2.0;
        let c_sca = 2.0 * dust.albedo[j];
        writeln!(
            out,
            "{:e} {:e} {:e} {:e} {:e} {:e} {:e}",
            dust.wav[j],
            c_ext,
            c_sca,
            dust.chi[j],
            dust.g[j],
            dust.p_lin_max[j],
            90.0
        )
        .unwrap();
    }
    write_lines(&dir.join("coatsph_forw.dat"), &out)?;

    for j in 0..dust.n_wav() {
        let path = dir.join(format!("coatsph_scat.{:04}.dat", j + 1));
        write_coatsph_phase_file(&path, dust, j, 7)?;
    }
    Ok(())
}

fn model_file(model: &Path, extension: &str) -> PathBuf {
    let mut name = model.as_os_str().to_owned();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

/// MieX output files for model `name`; returns the model prefix
pub fn write_miex(dir: &Path, name: &str, dust: &SyntheticDust) -> io::Result<PathBuf> {
    let model = dir.join(name);

    let mut alb = String::new();
    let mut k_abs = String::new();
    for j in 0..dust.n_wav() {
        let kappa = dust.chi[j] * (1.0 - dust.albedo[j]);
        writeln!(alb, "{:e} {:e}", dust.wav[j], dust.albedo[j]).unwrap();
        writeln!(k_abs, "{:e} {:e}", dust.wav[j], kappa).unwrap();
    }
    write_lines(&model_file(&model, "alb"), &alb)?;
    write_lines(&model_file(&model, "k_abs"), &k_abs)?;

    for (element, extension) in MATRIX_EXTENSIONS.iter().enumerate() {
        let mut out = format!("MieX synthetic {}\n", extension);
        for j in 0..dust.n_wav() {
            writeln!(out, "{:e}", dust.wav[j]).unwrap();
            for (i, theta) in dust.theta.iter().enumerate() {
                writeln!(out, "{:e} {:e}", theta, dust.phase[element][j][i]).unwrap();
            }
        }
        write_lines(&model_file(&model, extension), &out)?;
    }

    Ok(model)
}

/// Raw arrays for model `name`; returns the model prefix
pub fn write_bhmie(dir: &Path, name: &str, dust: &SyntheticDust) -> io::Result<PathBuf> {
    let model = dir.join(name);

    let column = |values: &[f64]| -> String {
        values.iter().map(|v| format!("{:e}\n", v)).collect()
    };
    let mu: Vec<f64> = dust.theta.iter().map(|t| t.to_radians().cos()).collect();

    write_lines(&model_file(&model, "wav"), &column(&dust.wav))?;
    write_lines(&model_file(&model, "mu"), &column(&mu))?;
    write_lines(&model_file(&model, "alb"), &column(&dust.albedo))?;
    write_lines(&model_file(&model, "chi"), &column(&dust.chi))?;

    for (element, extension) in MATRIX_EXTENSIONS.iter().enumerate() {
        let out: String = dust.phase[element]
            .iter()
            .map(|row| {
                let fields: Vec<String> = row.iter().map(|v| format!("{:e}", v)).collect();
                fields.join(" ") + "\n"
            })
            .collect();
        write_lines(&model_file(&model, extension), &out)?;
    }

    Ok(model)
}
