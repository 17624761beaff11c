/// End-to-end pipeline tests: a small synthetic two-scan volume run all the
/// way through `ProfileEngine::run`, exercising scan selection, cell
/// detection, point collection, de-aliasing and the VVP fit together
/// rather than any one stage in isolation.
use ndarray::Array2;

use vp_core::model::{LayerState, Moment, PolarScan, PolarVolume};
use vp_core::{ProfileEngine, VpConfig};
use vp_types::ProfileType;

fn uniform_wind_scan(elev_deg: f64, u: f64, v: f64, nyquist: f64, n_azim: usize, n_rang: usize) -> PolarScan {
    let mut scan = PolarScan::new(elev_deg.to_radians(), 0.01, 0.0, 500.0, 0.0, n_azim, n_rang);
    scan.nyquist = Some(nyquist);

    let dbz_raster = Array2::from_elem((n_azim, n_rang), 0.0f32);
    scan.insert_moment(Moment::new("DBZH", 0.5, -20.0, dbz_raster).with_nodata(255.0).with_undetect(0.0));

    let elev_rad = elev_deg.to_radians();
    let vrad_raster = Array2::from_shape_fn((n_azim, n_rang), |(a, _)| {
        let az = (a as f64 + 0.5) * std::f64::consts::TAU / n_azim as f64;
        let true_v = (u * az.sin() + v * az.cos()) * elev_rad.cos();
        true_v as f32
    });
    scan.insert_moment(Moment::new("VRAD", 1.0, 0.0, vrad_raster));
    scan
}

fn two_scan_volume(u: f64, v: f64, nyquist: f64) -> PolarVolume {
    let mut volume = PolarVolume::new(0.0, 0.0, 0.0);
    volume.push_scan(uniform_wind_scan(0.5, u, v, nyquist, 36, 40));
    volume.push_scan(uniform_wind_scan(1.5, u, v, nyquist, 36, 40));
    volume
}

/// Same as `two_scan_volume`, but VRAD is blanked out (nodata) over the
/// first quarter of the azimuth circle on every scan, so the velocity pass
/// sees two adjacent sparse sectors while the reflectivity pass (which
/// doesn't require vrad) still sees every gate.
fn two_scan_volume_with_velocity_gap(u: f64, v: f64, nyquist: f64) -> PolarVolume {
    let n_azim = 36;
    let n_rang = 40;
    let mut volume = PolarVolume::new(0.0, 0.0, 0.0);
    for elev_deg in [0.5, 1.5] {
        let mut scan = uniform_wind_scan(elev_deg, u, v, nyquist, n_azim, n_rang);
        {
            let vrad = scan.get_moment_mut("VRAD").unwrap();
            vrad.nodata = 9999.0;
            for a in 0..(n_azim / 4) {
                for r in 0..n_rang {
                    vrad.raster[[a, r]] = 9999.0;
                }
            }
        }
        volume.push_scan(scan);
    }
    volume
}

fn base_config() -> VpConfig {
    let mut config = VpConfig::default();
    config.geometry.n_layers = 5;
    config.geometry.layer_thickness_m = 500.0;
    config.geometry.range_min_m = 0.0;
    config.geometry.range_max_m = 50_000.0;
    config.constants.n_points_included_min = 5;
    config.constants.n_neighbors_min = 0;
    config
}

#[test]
fn whole_pipeline_recovers_uniform_wind() {
    let config = base_config();
    let volume = two_scan_volume(5.0, 0.0, 25.0);

    let profiles = ProfileEngine::run(&volume, &config).expect("pipeline should run");
    let table = profiles.table(ProfileType::All);

    let row = table
        .iter()
        .find(|row| row.wind_state == LayerState::Data)
        .expect("at least one layer should have a valid wind fit");
    assert!((row.u_mps - 5.0).abs() < 1.0, "expected u close to 5.0, got {}", row.u_mps);
    assert!((row.v_mps - 0.0).abs() < 1.0, "expected v close to 0.0, got {}", row.v_mps);
    assert!(row.h_speed_mps.is_finite());
    assert!((0.0..360.0).contains(&row.h_dir_deg));
    assert!(!row.has_gap);
}

#[test]
fn reflectivity_is_populated_independently_of_an_azimuth_gap() {
    // A layer can fail the velocity pass's azimuth-gap check while still
    // having plenty of gates for the reflectivity pass: dbz/eta/density
    // must come out populated (LayerState::Data) even though the wind
    // fields for that same layer end up UNDETECT.
    let config = base_config();
    let volume = two_scan_volume_with_velocity_gap(5.0, 0.0, 25.0);

    let profiles = ProfileEngine::run(&volume, &config).expect("pipeline should run");
    let table = profiles.table(ProfileType::All);

    let gapped = table
        .iter()
        .find(|row| row.has_gap)
        .expect("the blanked-out quarter of the circle should produce an azimuth gap");
    assert_eq!(gapped.wind_state, LayerState::Undetect);
    assert_eq!(gapped.reflectivity_state, LayerState::Data);
    assert!(gapped.dbz_avg.is_finite());
    assert!(gapped.eta.is_finite());
    assert!(gapped.n_points_z > 0);
}

#[test]
fn no_usable_scans_reports_an_error() {
    let volume = PolarVolume::new(0.0, 0.0, 0.0);
    let config = VpConfig::default();
    assert!(ProfileEngine::run(&volume, &config).is_err());
}
