/// Sets the independent yes/no bits of each point's [`GateCode`] from its
/// raw field values (spec.md §4.8). Bit 6 (`VDifMax`) is left untouched
/// here; it is set later by the VVP outlier-rejection pass once a wind fit
/// exists to compare against.
use vp_types::GateFlag;

use crate::config::VpConfig;
use crate::model::Point;

/// Classify every point's gate code in place.
///
/// `dbz_max` is the per-gate bird-plausibility ceiling from
/// [`crate::DerivedConstants`]; `vrad_min` and the azimuth bounds come from
/// the run configuration.
pub fn classify_points(points: &mut [Point], config: &VpConfig, dbz_max: f64) {
    let vrad_min = config.constants.vrad_min;
    let azim_min = config.geometry.azim_min_deg;
    let azim_max = config.geometry.azim_max_deg;
    let use_clutter_map = config.clutter.use_clutter_map;
    let clutter_value_min = config.clutter.clutter_value_min;

    for point in points.iter_mut() {
        let mut code = point.gate_code;

        if use_clutter_map && point.clutter_value > clutter_value_min {
            code.set(GateFlag::StaticClutter);
        }
        if point.cell > 1 {
            code.set(GateFlag::DynamicClutter);
        }
        if point.cell == 1 {
            code.set(GateFlag::DynamicClutterFringe);
        }
        if point.vrad.is_nan() || point.dbz.is_nan() {
            code.set(GateFlag::VradMissing);
        }
        if point.dbz > dbz_max {
            code.set(GateFlag::DbzTooHighForBirds);
        }
        if point.vrad.abs() < vrad_min {
            code.set(GateFlag::VradTooLow);
        }

        // Mirrors the source's azimuth-range predicate verbatim: the
        // non-wrapping branch excludes gates outside [min,max], but the
        // "wrapping" branch requires the azimuth to be simultaneously below
        // min AND above max, which no value can satisfy. That branch is
        // therefore always a no-op; preserved rather than "fixed".
        if azim_min < azim_max {
            if point.azim_deg < azim_min || point.azim_deg > azim_max {
                code.set(GateFlag::AzimOutOfRange);
            }
        } else if point.azim_deg < azim_min && point.azim_deg > azim_max {
            code.set(GateFlag::AzimOutOfRange);
        }

        point.gate_code = code;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GateCode;

    fn point(dbz: f64, vrad: f64, cell: i32, azim_deg: f64) -> Point {
        Point::new(1000.0, azim_deg, 1.0, dbz, vrad, cell, 25.0)
    }

    #[test]
    fn static_clutter_bit_follows_clutter_map_threshold() {
        let mut config = VpConfig::default();
        config.clutter.use_clutter_map = true;
        config.clutter.clutter_value_min = -10.0;
        let mut p = point(10.0, 5.0, -1, 180.0);
        p.clutter_value = -5.0;
        let mut points = [p];
        classify_points(&mut points, &config, 50.0);
        assert!(points[0].gate_code.is_set(vp_types::GateFlag::StaticClutter));
    }

    #[test]
    fn cell_value_maps_to_dynamic_clutter_or_fringe() {
        let config = VpConfig::default();
        let mut points = [point(10.0, 5.0, 3, 180.0), point(10.0, 5.0, 1, 180.0), point(10.0, 5.0, -1, 180.0)];
        classify_points(&mut points, &config, 50.0);
        assert!(points[0].gate_code.is_set(vp_types::GateFlag::DynamicClutter));
        assert!(points[1].gate_code.is_set(vp_types::GateFlag::DynamicClutterFringe));
        assert_eq!(points[2].gate_code, GateCode::new());
    }

    #[test]
    fn missing_vrad_or_dbz_sets_vrad_missing() {
        let config = VpConfig::default();
        let mut points = [point(f64::NAN, 5.0, -1, 180.0), point(10.0, f64::NAN, -1, 180.0)];
        classify_points(&mut points, &config, 50.0);
        assert!(points[0].gate_code.is_set(vp_types::GateFlag::VradMissing));
        assert!(points[1].gate_code.is_set(vp_types::GateFlag::VradMissing));
    }

    #[test]
    fn dbz_ceiling_and_vrad_floor_are_independent_bits() {
        let mut config = VpConfig::default();
        config.constants.vrad_min = 2.0;
        let mut points = [point(60.0, 0.5, -1, 180.0)];
        classify_points(&mut points, &config, 50.0);
        assert!(points[0].gate_code.is_set(vp_types::GateFlag::DbzTooHighForBirds));
        assert!(points[0].gate_code.is_set(vp_types::GateFlag::VradTooLow));
    }

    #[test]
    fn azimuth_range_excludes_outside_the_normal_window() {
        let mut config = VpConfig::default();
        config.geometry.azim_min_deg = 90.0;
        config.geometry.azim_max_deg = 270.0;
        let mut points = [point(10.0, 5.0, -1, 10.0), point(10.0, 5.0, -1, 180.0)];
        classify_points(&mut points, &config, 50.0);
        assert!(points[0].gate_code.is_set(vp_types::GateFlag::AzimOutOfRange));
        assert!(!points[1].gate_code.is_set(vp_types::GateFlag::AzimOutOfRange));
    }

    #[test]
    fn default_full_circle_never_excludes_on_azimuth() {
        let config = VpConfig::default();
        let mut points = [point(10.0, 5.0, -1, 0.0), point(10.0, 5.0, -1, 359.9)];
        classify_points(&mut points, &config, 50.0);
        assert!(!points[0].gate_code.is_set(vp_types::GateFlag::AzimOutOfRange));
        assert!(!points[1].gate_code.is_set(vp_types::GateFlag::AzimOutOfRange));
    }
}
