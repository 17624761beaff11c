/// Builds the flat point store from selected scans: per-layer capacity
/// sizing followed by a single fill pass over each scan's gates (spec.md
/// §4.7).
use ndarray::Array2;

use crate::config::VpConfig;
use crate::error::Result;
use crate::geometry::Geometry;
use crate::model::{CellMap, Moment, Point, PointStore, PolarScan};

/// Number of range gates (times `n_azim`) of `scan` that fall within layer
/// `i_layer`'s altitude band, for every layer. Mirrors sizing the point
/// store before any data is written, so a single allocation can hold every
/// scan's contribution without reallocating mid-fill.
pub fn layer_capacities(scan: &PolarScan, geometry: &Geometry, config: &VpConfig) -> Vec<usize> {
    let n_layers = config.geometry.n_layers;
    let thickness = config.geometry.layer_thickness_m;
    let mut capacities = vec![0usize; n_layers];

    for i_rang in 0..scan.n_rang {
        let range_m = scan.range_for_bin(i_rang);
        if range_m < config.geometry.range_min_m || range_m > config.geometry.range_max_m {
            continue;
        }
        let beam_height_m = geometry.height_from_range(range_m, scan.elevation_rad) + scan.antenna_height_m;
        if beam_height_m < 0.0 {
            continue;
        }
        let i_layer = (beam_height_m / thickness).floor() as i64;
        if i_layer < 0 || i_layer as usize >= n_layers {
            continue;
        }
        capacities[i_layer as usize] += scan.n_azim;
    }
    capacities
}

/// Fill `store` with every gate of `scan` whose range and beam height
/// qualify, appending into the layer segment its height belongs to.
/// Missing reflectivity is stored as `NaN` (undetects are treated as the
/// absence of scatterers); missing velocity is stored as `NaN` too, since
/// different scans can use different `nodata`/`undetect` encodings.
pub fn collect_scan(
    scan: &PolarScan,
    dbz: &Moment,
    vrad: &Moment,
    cell_map: &CellMap,
    clutter: Option<&Array2<f32>>,
    nyquist: f64,
    geometry: &Geometry,
    config: &VpConfig,
    store: &mut PointStore,
) -> Result<()> {
    let thickness = config.geometry.layer_thickness_m;
    let elev_deg = scan.elevation_deg();

    for i_rang in 0..scan.n_rang {
        let range_m = scan.range_for_bin(i_rang);
        if range_m < config.geometry.range_min_m || range_m > config.geometry.range_max_m {
            continue;
        }
        let beam_height_m = geometry.height_from_range(range_m, scan.elevation_rad) + scan.antenna_height_m;
        if beam_height_m < 0.0 {
            continue;
        }
        let i_layer = (beam_height_m / thickness).floor() as i64;
        if i_layer < 0 || i_layer as usize >= config.geometry.n_layers {
            continue;
        }
        let i_layer = i_layer as usize;

        for i_azim in 0..scan.n_azim {
            let azim_deg = scan.azim_for_ray(i_azim);

            let dbz_value = match dbz.get(i_azim, i_rang).value() {
                Some(v) => v,
                None => f64::NAN,
            };
            let vrad_value = match vrad.get(i_azim, i_rang).value() {
                Some(v) => v,
                None => f64::NAN,
            };
            let cell_value = cell_map[[i_azim, i_rang]];

            let mut point = Point::new(range_m, azim_deg, elev_deg, dbz_value, vrad_value, cell_value, nyquist);
            if let Some(clut) = clutter {
                point.clutter_value = clut[[i_azim, i_rang]] as f64;
            }
            store.push(i_layer, point)?;
        }
    }
    Ok(())
}
