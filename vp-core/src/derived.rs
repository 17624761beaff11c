/// Constants derived once per run from the resolved `VpConfig` and the
/// volume's own wavelength attribute (spec.md §3 "Derived constants").
use crate::config::VpConfig;

#[derive(Debug, Clone, Copy)]
pub struct DerivedConstants {
    /// The resolved wavelength (volume attribute overrides config).
    pub wavelength_cm: f64,
    /// Z -> eta conversion factor: `refracIndex^2 * 1000 * pi^5 /
    /// wavelength^4`.
    pub dbz_factor: f64,
    /// Per-gate bird dbz ceiling derived from `etaMax`.
    pub dbz_max: f64,
    /// Per-cell mean dbz floor derived from `cellEtaMin`.
    pub cell_dbz_min: f64,
    /// Minimum VVP residual for a layer to be considered bird-bearing.
    pub std_dev_min_bird: f64,
}

impl DerivedConstants {
    pub fn resolve(config: &VpConfig, volume_wavelength_cm: Option<f64>) -> Self {
        let wavelength_cm = volume_wavelength_cm.unwrap_or(config.physics.radar_wavelength_cm);
        let dbz_factor = dbz_factor(config.constants.refrac_index, wavelength_cm);
        let dbz_max = 10.0 * (config.physics.eta_max / dbz_factor).log10();
        let cell_dbz_min = 10.0 * (config.physics.cell_eta_min / dbz_factor).log10();
        let std_dev_min_bird = config.std_dev_min_bird(wavelength_cm);
        Self {
            wavelength_cm,
            dbz_factor,
            dbz_max,
            cell_dbz_min,
            std_dev_min_bird,
        }
    }
}

/// `refracIndex^2 * 1000 * pi^5 / wavelength_cm^4`.
pub fn dbz_factor(refrac_index: f64, wavelength_cm: f64) -> f64 {
    refrac_index.powi(2) * 1000.0 * std::f64::consts::PI.powi(5) / wavelength_cm.powi(4)
}
