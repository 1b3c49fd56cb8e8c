//! Physical constants in CGS units and spectral conversions

/// Constants in CGS units
pub struct CGS {}

impl CGS {
    /// Speed of light in vacuum
    /// Units: 2.99792458e10 cm/s (centimeters per second in CGS)
    pub const SPEED_OF_LIGHT: f64 = 2.99792458e10;

    /// Planck's constant
    /// Units: 6.62607015e-27 erg⋅s (erg-seconds in CGS)
    pub const PLANCK_CONSTANT: f64 = 6.62607015e-27;

    /// Boltzmann constant
    /// Units: 1.380649e-16 erg/K
    pub const BOLTZMANN_CONSTANT: f64 = 1.380649e-16;

    /// Stefan-Boltzmann constant
    /// Units: 5.670374419e-5 erg s⁻¹ cm⁻² K⁻⁴
    pub const STEFAN_BOLTZMANN: f64 = 5.670374419e-5;

    /// Microns per centimeter
    pub const MICRONS_PER_CM: f64 = 1e4;
}

/// Convert a wavelength in microns to a frequency in Hz
pub fn microns_to_frequency(wavelength_um: f64) -> f64 {
    CGS::SPEED_OF_LIGHT / wavelength_um * CGS::MICRONS_PER_CM
}

/// Planck function B_ν(T) in erg s⁻¹ cm⁻² Hz⁻¹ sr⁻¹
///
/// Returns 0.0 for non-positive temperatures and where the Wien tail
/// underflows.
pub fn planck_nu(nu: f64, temperature: f64) -> f64 {
    if temperature <= 0.0 {
        return 0.0;
    }
    let x = CGS::PLANCK_CONSTANT * nu / (CGS::BOLTZMANN_CONSTANT * temperature);
    let prefactor = 2.0 * CGS::PLANCK_CONSTANT * nu.powi(3) / CGS::SPEED_OF_LIGHT.powi(2);
    if x > 700.0 {
        return 0.0;
    }
    prefactor / x.exp_m1()
}

/// Temperature derivative of the Planck function, dB_ν/dT
pub fn planck_nu_dt(nu: f64, temperature: f64) -> f64 {
    if temperature <= 0.0 {
        return 0.0;
    }
    let x = CGS::PLANCK_CONSTANT * nu / (CGS::BOLTZMANN_CONSTANT * temperature);
    if x > 350.0 {
        return 0.0;
    }
    let b = planck_nu(nu, temperature);
    let ex = x.exp();
    b * x * ex / (ex - 1.0) / temperature
}
