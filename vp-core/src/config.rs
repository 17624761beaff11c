/// Run configuration: the external-interface surface of spec.md §6, merged
/// into one `VpConfig` value. vp-core never reads a config file itself —
/// the caller constructs this value directly or deserializes it with serde
/// from whatever format its CLI wrapper prefers.
use serde::{Deserialize, Serialize};

use crate::error::{Result, VpError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    pub n_layers: usize,
    pub layer_thickness_m: f64,
    pub range_min_m: f64,
    pub range_max_m: f64,
    pub azim_min_deg: f64,
    pub azim_max_deg: f64,
    pub elev_min_deg: f64,
    pub elev_max_deg: f64,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            n_layers: 30,
            layer_thickness_m: 200.0,
            range_min_m: 5000.0,
            range_max_m: 25000.0,
            azim_min_deg: 0.0,
            azim_max_deg: 360.0,
            elev_min_deg: 0.0,
            elev_max_deg: 90.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentConfig {
    /// Preferred reflectivity quantity name, tried before DBZH/DBZV.
    pub dbz_type: String,
    /// Require a valid radial-velocity measurement for a gate to
    /// contribute to the reflectivity pass as well as the velocity pass.
    pub require_vrad: bool,
    pub rhohv_thres_min: f64,
    pub dbz_thres_min: f64,
    /// Whether dual-polarization cell refinement (RHOHV-based) was
    /// requested. Falls back to single-pol silently if no scan carries
    /// RHOHV (spec.md §4.2).
    pub use_dual_pol: bool,
}

impl Default for MomentConfig {
    fn default() -> Self {
        Self {
            dbz_type: "DBZH".to_string(),
            require_vrad: false,
            rhohv_thres_min: 0.95,
            dbz_thres_min: 0.0,
            use_dual_pol: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Radar wavelength, centimeters; overridden by the volume's own
    /// attribute when present.
    pub radar_wavelength_cm: f64,
    pub bird_radar_cross_section_cm2: f64,
    /// `stdDevMinBird`, m/s. `None` selects the band default (2.0 m/s for
    /// C-band, wavelength < 7.5 cm; 1.0 m/s for S-band).
    pub std_dev_min_bird_mps: Option<f64>,
    /// Minimum cell-average eta (cm^2/km^3) for a precipitation cell.
    pub cell_eta_min: f64,
    /// Maximum per-gate eta (cm^2/km^3) attributable to birds.
    pub eta_max: f64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            radar_wavelength_cm: 5.3,
            bird_radar_cross_section_cm2: 11.0,
            std_dev_min_bird_mps: None,
            cell_eta_min: 11_400.0,
            eta_max: 36_000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DealiasConfig {
    pub dealias_vrad: bool,
    /// Reuse pass-0 de-aliased velocities in later passes instead of
    /// recomputing (spec.md §4.9: "runs only on pass 0").
    pub dealias_recycle: bool,
    pub min_nyquist: f64,
    pub max_nyquist_dealias: f64,
}

impl Default for DealiasConfig {
    fn default() -> Self {
        Self {
            dealias_vrad: true,
            dealias_recycle: true,
            min_nyquist: 20.0,
            max_nyquist_dealias: 25.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClutterConfig {
    pub use_clutter_map: bool,
    pub clutter_value_min: f64,
    pub clutter_map_path: Option<String>,
}

impl Default for ClutterConfig {
    fn default() -> Self {
        Self {
            use_clutter_map: false,
            clutter_value_min: -10.0,
            clutter_map_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    pub use_mistnet: bool,
    pub mistnet_elevs: Vec<f64>,
    pub mistnet_elevs_only: bool,
    pub mistnet_path: Option<String>,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            use_mistnet: false,
            mistnet_elevs: vec![0.5, 1.5, 2.5, 3.5, 4.5],
            mistnet_elevs_only: false,
            mistnet_path: None,
        }
    }
}

/// Numerical thresholds tuned for the detection and fitting stages,
/// surfaced here as configurable but rarely-changed values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Constants {
    pub area_cell_min_km2: f64,
    pub chisq_min: f64,
    pub cell_clutter_fraction_max: f64,
    pub fringe_dist_m: f64,
    pub n_bins_gap: usize,
    pub n_obs_gap_min: usize,
    pub n_neighbors_min: usize,
    pub n_count_min: usize,
    pub vrad_min: f64,
    pub abs_v_dif_max: f64,
    pub refrac_index: f64,
    pub n_azim_neighborhood: usize,
    pub n_rang_neighborhood: usize,
    pub n_points_included_min: usize,
    pub cell_std_dev_max: f64,
    /// Added to `geometry.range_max_m` to get `rCellMax`, the range beyond
    /// which CellFinder no longer considers a gate a cell candidate
    /// (spec.md §4.3). Cell detection is allowed a little past the
    /// profiling range so cells that straddle `range_max_m` are still
    /// found whole.
    pub rcellmax_offset_m: f64,
}

impl Default for Constants {
    fn default() -> Self {
        Self {
            area_cell_min_km2: 4.0,
            chisq_min: 1e-5,
            cell_clutter_fraction_max: 0.5,
            fringe_dist_m: 5000.0,
            n_bins_gap: 8,
            n_obs_gap_min: 5,
            n_neighbors_min: 5,
            n_count_min: 4,
            vrad_min: 1.0,
            abs_v_dif_max: 10.0,
            refrac_index: 0.964,
            n_azim_neighborhood: 3,
            n_rang_neighborhood: 3,
            n_points_included_min: 25,
            cell_std_dev_max: 5.0,
            rcellmax_offset_m: 5000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct VpConfig {
    pub geometry: GeometryConfig,
    pub moments: MomentConfig,
    pub physics: PhysicsConfig,
    pub dealias: DealiasConfig,
    pub clutter: ClutterConfig,
    pub segmentation: SegmentationConfig,
    pub constants: Constants,
}

impl VpConfig {
    /// Validate the configuration before any allocation happens. Mirrors
    /// the "configuration invalid" error kind of spec.md §7: thresholds out
    /// of range fail initialization with a single diagnostic.
    pub fn validate(&self) -> Result<()> {
        let g = &self.geometry;
        if g.n_layers == 0 {
            return Err(VpError::Config("n_layers must be > 0".into()));
        }
        if g.layer_thickness_m <= 0.0 {
            return Err(VpError::Config("layer_thickness_m must be > 0".into()));
        }
        if g.range_min_m < 0.0 || g.range_max_m <= g.range_min_m {
            return Err(VpError::Config("range_min_m/range_max_m out of order".into()));
        }
        if g.elev_min_deg > g.elev_max_deg {
            return Err(VpError::Config("elev_min_deg must be <= elev_max_deg".into()));
        }
        if self.physics.radar_wavelength_cm <= 0.0 {
            return Err(VpError::Config("radar_wavelength_cm must be > 0".into()));
        }
        if self.physics.bird_radar_cross_section_cm2 <= 0.0 {
            return Err(VpError::Config("bird_radar_cross_section_cm2 must be > 0".into()));
        }
        if self.dealias.min_nyquist < 0.0 {
            return Err(VpError::Config("min_nyquist must be >= 0".into()));
        }
        if self.constants.n_azim_neighborhood == 0 || self.constants.n_rang_neighborhood == 0 {
            return Err(VpError::Config("texture neighborhood dimensions must be > 0".into()));
        }
        Ok(())
    }

    /// Resolve `stdDevMinBird` to its configured or band-default value for
    /// a given wavelength.
    pub fn std_dev_min_bird(&self, wavelength_cm: f64) -> f64 {
        self.physics
            .std_dev_min_bird_mps
            .unwrap_or_else(|| vp_types::default_std_dev_min_bird(wavelength_cm))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(VpConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_layers_is_rejected() {
        let mut cfg = VpConfig::default();
        cfg.geometry.n_layers = 0;
        assert!(matches!(cfg.validate(), Err(VpError::Config(_))));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let mut cfg = VpConfig::default();
        cfg.geometry.range_min_m = 30_000.0;
        cfg.geometry.range_max_m = 5_000.0;
        assert!(cfg.validate().is_err());
    }
}
