/// Scan qualification and moment-name resolution (spec.md §4.2).
use log::warn;

use vp_types::{DBZ_ALIASES, RHOHV, VRAD_ALIASES};

use crate::config::VpConfig;
use crate::model::PolarVolume;

/// Why a scan was rejected by [`ScanSelector::select`].
#[derive(Debug, Clone, PartialEq)]
pub enum DropReason {
    MissingReflectivity,
    MissingVelocity,
    ElevationOutOfRange { elev_deg: f64 },
    RangeBinTooCoarse { bin_size_m: f64 },
    NyquistTooLow { nyquist: f64 },
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DropReason::MissingReflectivity => write!(f, "no usable reflectivity moment"),
            DropReason::MissingVelocity => write!(f, "no usable radial velocity moment"),
            DropReason::ElevationOutOfRange { elev_deg } => write!(f, "elevation {elev_deg:.2} deg out of range"),
            DropReason::RangeBinTooCoarse { bin_size_m } => write!(f, "range bin size {bin_size_m:.1} m below 1 m"),
            DropReason::NyquistTooLow { nyquist } => write!(f, "nyquist {nyquist:.2} m/s below minimum"),
        }
    }
}

/// The decision and resolved moment names for one scan.
#[derive(Debug, Clone)]
pub struct ScanDecision {
    pub use_scan: bool,
    pub drop_reason: Option<DropReason>,
    pub dbz_name: Option<String>,
    pub vrad_name: Option<String>,
    pub has_rhohv: bool,
    pub nyquist: Option<f64>,
    /// Whether this scan's Nyquist was inferred (from the vrad offset)
    /// rather than read from an attribute.
    pub nyquist_inferred: bool,
}

impl ScanDecision {
    fn rejected(reason: DropReason) -> Self {
        Self {
            use_scan: false,
            drop_reason: Some(reason),
            dbz_name: None,
            vrad_name: None,
            has_rhohv: false,
            nyquist: None,
            nyquist_inferred: false,
        }
    }
}

/// The full selection result for a volume.
#[derive(Debug, Clone)]
pub struct ScanSelection {
    pub decisions: Vec<ScanDecision>,
    pub n_scans_used: usize,
    pub nyquist_min: f64,
    pub nyquist_min_used: f64,
    pub nyquist_max: f64,
    pub dual_pol: bool,
}

impl ScanSelection {
    pub fn used_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.decisions
            .iter()
            .enumerate()
            .filter(|(_, d)| d.use_scan)
            .map(|(i, _)| i)
    }
}

/// Resolve the first alias present on `scan` from a priority list. The
/// first element of `DBZ_ALIASES` is a placeholder for the configured
/// preference and is substituted by the caller.
fn resolve_alias(scan: &crate::model::PolarScan, aliases: &[String]) -> Option<String> {
    aliases.iter().find(|name| scan.has_moment(name)).cloned()
}

pub struct ScanSelector;

impl ScanSelector {
    /// Select scans and resolve per-scan moment names. Returns
    /// `Ok(selection)` with `n_scans_used == 0` captured in the selection
    /// when nothing qualifies: the caller (`ProfileEngine`) is responsible
    /// for turning that into `VpError::NoUsableScans`.
    pub fn select(volume: &PolarVolume, config: &VpConfig) -> ScanSelection {
        let dbz_aliases: Vec<String> = std::iter::once(config.moments.dbz_type.clone())
            .chain(DBZ_ALIASES[1..].iter().map(|s| s.to_string()))
            .collect();
        let vrad_aliases: Vec<String> = VRAD_ALIASES.iter().map(|s| s.to_string()).collect();

        let mut decisions = Vec::with_capacity(volume.scans.len());
        let mut nyquist_min = f64::INFINITY;
        let mut nyquist_max = f64::NEG_INFINITY;
        let mut nyquist_min_used = f64::INFINITY;
        let mut any_rhohv = false;

        for scan in volume.scans.iter() {
            let elev_deg = scan.elevation_deg();
            if elev_deg < config.geometry.elev_min_deg || elev_deg > config.geometry.elev_max_deg {
                decisions.push(ScanDecision::rejected(DropReason::ElevationOutOfRange { elev_deg }));
                continue;
            }
            if scan.range_bin_size_m < 1.0 {
                decisions.push(ScanDecision::rejected(DropReason::RangeBinTooCoarse {
                    bin_size_m: scan.range_bin_size_m,
                }));
                continue;
            }

            let dbz_name = resolve_alias(scan, &dbz_aliases);
            if dbz_name.is_none() {
                decisions.push(ScanDecision::rejected(DropReason::MissingReflectivity));
                continue;
            }
            let vrad_name = resolve_alias(scan, &vrad_aliases);
            if vrad_name.is_none() {
                decisions.push(ScanDecision::rejected(DropReason::MissingVelocity));
                continue;
            }
            let vrad_name = vrad_name.unwrap();
            let has_rhohv = scan.has_moment(RHOHV);
            any_rhohv |= has_rhohv;

            let (nyquist, inferred) = resolve_nyquist(scan, volume, &vrad_name);
            let Some(nyquist) = nyquist else {
                decisions.push(ScanDecision::rejected(DropReason::NyquistTooLow { nyquist: 0.0 }));
                continue;
            };
            if nyquist.is_finite() {
                nyquist_min = nyquist_min.min(nyquist);
                nyquist_max = nyquist_max.max(nyquist);
            }
            if nyquist < config.dealias.min_nyquist {
                decisions.push(ScanDecision::rejected(DropReason::NyquistTooLow { nyquist }));
                continue;
            }

            nyquist_min_used = nyquist_min_used.min(nyquist);
            decisions.push(ScanDecision {
                use_scan: true,
                drop_reason: None,
                dbz_name,
                vrad_name: Some(vrad_name),
                has_rhohv,
                nyquist: Some(nyquist),
                nyquist_inferred: inferred,
            });
        }

        for (i, d) in decisions.iter().enumerate() {
            if !d.use_scan {
                if let Some(reason) = &d.drop_reason {
                    warn!("scan {i} dropped: {reason}");
                }
            }
        }

        let n_scans_used = decisions.iter().filter(|d| d.use_scan).count();
        let dual_pol = config.moments.use_dual_pol && any_rhohv;
        if config.moments.use_dual_pol && !any_rhohv {
            warn!("dual-pol requested but no scan carries RHOHV; falling back to single-pol");
        }

        ScanSelection {
            decisions,
            n_scans_used,
            nyquist_min: if nyquist_min.is_finite() { nyquist_min } else { f64::NAN },
            nyquist_min_used: if nyquist_min_used.is_finite() { nyquist_min_used } else { f64::NAN },
            nyquist_max: if nyquist_max.is_finite() { nyquist_max } else { f64::NAN },
            dual_pol,
        }
    }
}

/// Resolve a scan's Nyquist interval: scan attribute, then volume
/// attribute, then the absolute value of the radial-velocity offset (only
/// when the velocity has not already been dealiased upstream).
fn resolve_nyquist(scan: &crate::model::PolarScan, volume: &PolarVolume, vrad_name: &str) -> (Option<f64>, bool) {
    if let Some(n) = scan.nyquist {
        return (Some(n), false);
    }
    if let Some(n) = volume.nyquist {
        return (Some(n), false);
    }
    if scan.vrad_is_dealiased {
        return (None, false);
    }
    scan.get_moment(vrad_name).map(|m| (Some(m.offset.abs()), true)).unwrap_or((None, false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Moment, PolarScan};
    use ndarray::Array2;

    fn scan_with(elev_deg: f64, bin_size_m: f64, nyquist: Option<f64>) -> PolarScan {
        let mut scan = PolarScan::new(elev_deg.to_radians(), 0.01, 0.0, bin_size_m, 0.0, 4, 4);
        scan.nyquist = nyquist;
        let raster = Array2::from_elem((4, 4), 10.0f32);
        scan.insert_moment(Moment::new("DBZH", 0.5, -20.0, raster.clone()));
        scan.insert_moment(Moment::new("VRAD", 0.5, -32.0, raster));
        scan
    }

    #[test]
    fn drops_scan_with_elevation_out_of_range() {
        let mut volume = PolarVolume::new(0.0, 0.0, 0.0);
        volume.push_scan(scan_with(95.0, 250.0, Some(25.0)));
        let config = VpConfig::default();
        let sel = ScanSelector::select(&volume, &config);
        assert_eq!(sel.n_scans_used, 0);
        assert!(matches!(
            sel.decisions[0].drop_reason,
            Some(DropReason::ElevationOutOfRange { .. })
        ));
    }

    #[test]
    fn keeps_scan_meeting_all_criteria() {
        let mut volume = PolarVolume::new(0.0, 0.0, 0.0);
        volume.push_scan(scan_with(0.5, 250.0, Some(25.0)));
        let config = VpConfig::default();
        let sel = ScanSelector::select(&volume, &config);
        assert_eq!(sel.n_scans_used, 1);
        assert!(sel.decisions[0].use_scan);
        assert_eq!(sel.decisions[0].dbz_name.as_deref(), Some("DBZH"));
    }

    #[test]
    fn infers_nyquist_from_vrad_offset_when_absent() {
        let mut volume = PolarVolume::new(0.0, 0.0, 0.0);
        volume.push_scan(scan_with(0.5, 250.0, None));
        let mut config = VpConfig::default();
        config.dealias.min_nyquist = 10.0;
        let sel = ScanSelector::select(&volume, &config);
        assert_eq!(sel.n_scans_used, 1);
        assert_eq!(sel.decisions[0].nyquist, Some(32.0));
        assert!(sel.decisions[0].nyquist_inferred);
    }

    #[test]
    fn dual_pol_falls_back_without_any_rhohv() {
        let mut volume = PolarVolume::new(0.0, 0.0, 0.0);
        volume.push_scan(scan_with(0.5, 250.0, Some(25.0)));
        let mut config = VpConfig::default();
        config.moments.use_dual_pol = true;
        let sel = ScanSelector::select(&volume, &config);
        assert!(!sel.dual_pol);
    }
}
