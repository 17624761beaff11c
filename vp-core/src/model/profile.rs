/// The profile output: one row per altitude layer, one table per profile
/// type (spec.md §3).
use serde::{Deserialize, Serialize};

use vp_types::ProfileType;

use crate::config::VpConfig;
use crate::derived::DerivedConstants;

/// Sentinel distinguishing "this layer lies outside the sampled volume"
/// (`NODATA`) from "the layer was sampled but the fit failed"
/// (`UNDETECT`). Both render as `NaN` in the f64 fields; the distinction is
/// only meaningful to a human/diagnostic reading `ProfileRow::state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayerState {
    /// The layer was sampled and a value was computed.
    Data,
    /// The layer lies outside the sampled volume entirely.
    NoData,
    /// The layer was sampled but a value could not be computed (fit
    /// rejected, azimuth gap, insufficient points).
    Undetect,
}

/// One row of a vertical profile: the computed quantities for a single
/// altitude layer under a single profile type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProfileRow {
    pub alt_min_m: f64,
    pub alt_max_m: f64,
    pub u_mps: f64,
    pub v_mps: f64,
    pub w_mps: f64,
    pub h_speed_mps: f64,
    pub h_dir_deg: f64,
    /// VVP fit residual, chi = sqrt(chisq).
    pub residual: f64,
    pub has_gap: bool,
    pub dbz_avg: f64,
    pub n_points: u32,
    pub eta: f64,
    pub density: f64,
    pub n_points_z: u32,
    pub wind_state: LayerState,
    pub reflectivity_state: LayerState,
}

impl ProfileRow {
    pub fn empty(alt_min_m: f64, alt_max_m: f64) -> Self {
        Self {
            alt_min_m,
            alt_max_m,
            u_mps: f64::NAN,
            v_mps: f64::NAN,
            w_mps: f64::NAN,
            h_speed_mps: f64::NAN,
            h_dir_deg: f64::NAN,
            residual: f64::NAN,
            has_gap: false,
            dbz_avg: f64::NAN,
            n_points: 0,
            eta: f64::NAN,
            density: f64::NAN,
            n_points_z: 0,
            wind_state: LayerState::NoData,
            reflectivity_state: LayerState::NoData,
        }
    }
}

/// A full set of profile tables, one per computed profile type, plus the
/// per-layer `scatterersAreNotBirds` flag computed during the "all"
/// profile pass and consumed during the "birds" pass.
///
/// `config`/`derived` carry the resolved run provenance (spec.md §4.1-4.12
/// supplement): the original stores this as a free-text `task_args` string
/// for the ODIM `how:task_args` attribute, so a caller can round-trip "what
/// configuration produced this profile" without vp-core rendering any
/// particular text format itself.
#[derive(Debug, Clone)]
pub struct ProfileSet {
    pub layer_thickness_m: f64,
    pub rows: std::collections::HashMap<i32, Vec<ProfileRow>>,
    pub scatterers_are_not_birds: Vec<bool>,
    pub config: VpConfig,
    pub derived: Option<DerivedConstants>,
}

impl ProfileSet {
    pub fn empty(n_layers: usize, layer_thickness_m: f64) -> Self {
        Self::empty_with_config(n_layers, layer_thickness_m, VpConfig::default())
    }

    pub fn empty_with_config(n_layers: usize, layer_thickness_m: f64, config: VpConfig) -> Self {
        let mut rows = std::collections::HashMap::new();
        for pt in [ProfileType::All, ProfileType::Birds] {
            let table = (0..n_layers)
                .map(|i| ProfileRow::empty(i as f64 * layer_thickness_m, (i + 1) as f64 * layer_thickness_m))
                .collect();
            rows.insert(pt.code(), table);
        }
        Self {
            layer_thickness_m,
            rows,
            scatterers_are_not_birds: vec![false; n_layers],
            config,
            derived: None,
        }
    }

    pub fn table(&self, pt: ProfileType) -> &[ProfileRow] {
        &self.rows[&pt.code()]
    }

    pub fn table_mut(&mut self, pt: ProfileType) -> &mut Vec<ProfileRow> {
        self.rows.get_mut(&pt.code()).unwrap()
    }
}
