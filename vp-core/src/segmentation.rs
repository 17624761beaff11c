/// External segmentation adapter contract (spec.md §4.12).
///
/// The source system offloads cell/weather classification to a neural
/// network (MistNet) trained outside this crate. This module is the I/O
/// contract around that boundary, not the network itself: it selects the
/// fixed set of scans the classifier was trained on, rasterizes their
/// moments onto a shared Cartesian grid, flattens that grid to the tensor
/// layout the classifier expects, and back-projects its per-pixel class
/// probabilities onto each scan's polar gates. Callers supply the
/// classifier itself through [`SegmentationClassifier`].
use ndarray::{s, Array2, Array3, Array4};

use crate::config::VpConfig;
use crate::error::{Result, VpError};
use crate::geometry::Geometry;
use crate::model::{CellMap, PolarVolume, CELL_ID_START, CELL_NONE};

/// Side length, in pixels, of the square Cartesian grid each selected scan
/// is rendered onto.
pub const MISTNET_DIMENSION: usize = 400;
/// Pixel size of that grid, meters.
pub const MISTNET_RESOLUTION: f64 = 500.0;
/// Number of elevations the classifier was trained on; `mistnet_elevs`
/// must supply exactly this many target elevations.
pub const MISTNET_N_ELEV: usize = 5;
/// Sentinel written into a pixel no gate rasterizes onto, and into the
/// velocity/spectrum-width channels wherever the co-located reflectivity
/// pixel is itself this sentinel.
pub const MISTNET_INIT: f32 = -999.0;
/// Pixels within this many cells of the grid border are excluded from
/// back-projection: a range ring crossing the grid edge mixes in whatever
/// lies just outside it, so gates landing there are left unclassified.
pub const MISTNET_BLEED: usize = 10;
/// Per-pixel "weather" class probability above which a back-projected gate
/// is labeled a cell.
pub const MISTNET_WEATHER_THRESHOLD: f32 = 0.45;
/// Scan-average "weather" class probability above which every gate of a
/// scan is labeled a cell regardless of its own per-pixel probability.
pub const MISTNET_SCAN_AVERAGE_WEATHER_THRESHOLD: f32 = 0.45;

/// Reflectivity, radial velocity, and spectrum width, in that order, are
/// the three Cartesian channels rendered per elevation.
const N_CARTESIAN_MOMENTS: usize = 3;
/// Number of classes the classifier distinguishes: background, weather,
/// biology (spec.md §4.12). Coincidentally also 3, but distinct from
/// [`N_CARTESIAN_MOMENTS`] and kept as its own named constant so the two
/// "3"s in the tensor shapes below don't read as the same quantity.
const N_CLASSES: usize = 3;
/// Index into the classifier's class output carrying the "weather"
/// (non-biological scatterer) probability.
const CLASS_WEATHER: usize = 1;

/// A trained classifier that turns a rasterized, flattened moment tensor
/// into per-class probabilities. `input` has shape `(3 * n_elev,
/// MISTNET_DIMENSION, MISTNET_DIMENSION)`: for each selected elevation, in
/// selection order, a reflectivity channel, a radial-velocity channel, and
/// a spectrum-width channel. The returned tensor has shape `(3, n_elev,
/// MISTNET_DIMENSION, MISTNET_DIMENSION)`: one probability map per class
/// (background, weather, biology) per elevation.
pub trait SegmentationClassifier {
    fn classify(&self, input: &Array3<f32>) -> Result<Array4<f32>>;
}

/// Per-elevation moment names resolved for the classifier's input scans,
/// since reflectivity/velocity/spectrum-width can be stored under
/// different aliases per scan.
#[derive(Debug, Clone)]
pub struct SegmentationMoments {
    pub dbz_name: String,
    pub vrad_name: String,
    pub wrad_name: Option<String>,
}

fn pixel_center_m(index: usize, dim: usize, resolution: f64) -> f64 {
    (index as f64 - dim as f64 / 2.0 + 0.5) * resolution
}

fn ground_to_pixel(coord_m: f64, dim: usize, resolution: f64) -> f64 {
    coord_m / resolution + dim as f64 / 2.0 - 0.5
}

/// Select, for each target elevation, the scan whose elevation angle is
/// closest to it. Mirrors selecting a fixed-size subvolume by elevation
/// before handing it to the classifier.
pub fn select_scans(volume: &PolarVolume, target_elevs_deg: &[f64]) -> Result<Vec<usize>> {
    if target_elevs_deg.len() != MISTNET_N_ELEV {
        return Err(VpError::SegmentationElevationMismatch { expected: MISTNET_N_ELEV, got: target_elevs_deg.len() });
    }
    let mut indices = Vec::with_capacity(target_elevs_deg.len());
    for &target in target_elevs_deg {
        let idx = volume
            .scans
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                (a.elevation_deg() - target)
                    .abs()
                    .partial_cmp(&(b.elevation_deg() - target).abs())
                    .unwrap()
            })
            .map(|(i, _)| i)
            .ok_or(VpError::NoUsableScans)?;
        indices.push(idx);
    }
    Ok(indices)
}

/// Render one moment of one scan onto a `dim x dim` Cartesian grid
/// centered on the radar, in meters of `resolution` per pixel. Pixels with
/// no corresponding data, or that fall outside the scan's range coverage,
/// are left at [`MISTNET_INIT`].
fn rasterize_moment(scan: &crate::model::PolarScan, moment_name: &str, geometry: &Geometry, dim: usize, resolution: f64) -> Array2<f32> {
    let mut grid = Array2::from_elem((dim, dim), MISTNET_INIT);
    let moment = match scan.get_moment(moment_name) {
        Some(m) => m,
        None => return grid,
    };

    for py in 0..dim {
        let y_m = -pixel_center_m(py, dim, resolution);
        for px in 0..dim {
            let x_m = pixel_center_m(px, dim, resolution);
            let d = (x_m * x_m + y_m * y_m).sqrt();
            let azim_deg = (x_m.atan2(y_m).to_degrees() + 360.0) % 360.0;
            let range_m = geometry.range(d, scan.elevation_rad);
            if !range_m.is_finite() {
                continue;
            }
            let i_rang = ((range_m - scan.range_start_m) / scan.range_bin_size_m).round();
            if i_rang < 0.0 || i_rang as usize >= scan.n_rang {
                continue;
            }
            let i_azim = ((azim_deg / 360.0 * scan.n_azim as f64).floor() as i64).rem_euclid(scan.n_azim as i64) as usize;
            if let Some(v) = moment.get(i_azim, i_rang as usize).value() {
                grid[[py, px]] = v as f32;
            }
        }
    }
    grid
}

/// Build the classifier's input tensor from the selected scans: rasterize
/// reflectivity, velocity, and spectrum width for each, then mask velocity
/// and spectrum width to [`MISTNET_INIT`] wherever the co-located
/// reflectivity pixel has no data (the classifier was trained expecting
/// that masking).
pub fn build_tensor(
    volume: &PolarVolume,
    selected: &[usize],
    moments: &[SegmentationMoments],
    geometry: &Geometry,
    dim: usize,
    resolution: f64,
) -> Array3<f32> {
    let mut tensor = Array3::from_elem((N_CARTESIAN_MOMENTS * selected.len(), dim, dim), MISTNET_INIT);
    for (k, (&scan_idx, m)) in selected.iter().zip(moments.iter()).enumerate() {
        let scan = &volume.scans[scan_idx];
        let dbz = rasterize_moment(scan, &m.dbz_name, geometry, dim, resolution);
        let mut vrad = rasterize_moment(scan, &m.vrad_name, geometry, dim, resolution);
        let mut wrad = match &m.wrad_name {
            Some(name) => rasterize_moment(scan, name, geometry, dim, resolution),
            None => Array2::from_elem((dim, dim), MISTNET_INIT),
        };
        for py in 0..dim {
            for px in 0..dim {
                if dbz[[py, px]] == MISTNET_INIT {
                    vrad[[py, px]] = MISTNET_INIT;
                    wrad[[py, px]] = MISTNET_INIT;
                }
            }
        }
        tensor.slice_mut(s![k * N_CARTESIAN_MOMENTS, .., ..]).assign(&dbz);
        tensor.slice_mut(s![k * N_CARTESIAN_MOMENTS + 1, .., ..]).assign(&vrad);
        tensor.slice_mut(s![k * N_CARTESIAN_MOMENTS + 2, .., ..]).assign(&wrad);
    }
    tensor
}

/// Back-project the classifier's per-elevation "weather" probability map
/// onto each selected scan's polar gates, producing one weather cell map
/// per scan. A gate is labeled a cell (`CELL_ID_START`) when either its
/// own back-projected pixel exceeds [`MISTNET_WEATHER_THRESHOLD`], or the
/// scan's average over non-bleed pixels exceeds
/// [`MISTNET_SCAN_AVERAGE_WEATHER_THRESHOLD`]. Gates whose Cartesian
/// projection falls in the excluded border, or off the grid entirely, are
/// left at [`CELL_NONE`].
pub fn back_project(volume: &PolarVolume, selected: &[usize], output: &Array4<f32>, geometry: &Geometry, dim: usize, resolution: f64) -> Vec<CellMap> {
    let mut maps = Vec::with_capacity(selected.len());
    for (k, &scan_idx) in selected.iter().enumerate() {
        let scan = &volume.scans[scan_idx];
        let mut cell_map: CellMap = Array2::from_elem((scan.n_azim, scan.n_rang), CELL_NONE);

        let mut sum = 0.0f64;
        let mut count = 0usize;
        for py in MISTNET_BLEED..dim - MISTNET_BLEED {
            for px in MISTNET_BLEED..dim - MISTNET_BLEED {
                sum += output[[CLASS_WEATHER, k, py, px]] as f64;
                count += 1;
            }
        }
        let scan_flagged = count > 0 && (sum / count as f64) as f32 > MISTNET_SCAN_AVERAGE_WEATHER_THRESHOLD;

        for i_azim in 0..scan.n_azim {
            let azim_rad = scan.azim_for_ray(i_azim).to_radians();
            for i_rang in 0..scan.n_rang {
                let range_m = scan.range_for_bin(i_rang);
                let d = geometry.distance_from_range(range_m, scan.elevation_rad);
                if !d.is_finite() {
                    continue;
                }
                let x_m = d * azim_rad.sin();
                let y_m = d * azim_rad.cos();
                let px = ground_to_pixel(x_m, dim, resolution).round();
                let py = ground_to_pixel(-y_m, dim, resolution).round();
                if px < MISTNET_BLEED as f64 || py < MISTNET_BLEED as f64 || px >= (dim - MISTNET_BLEED) as f64 || py >= (dim - MISTNET_BLEED) as f64 {
                    continue;
                }
                let weather_p = output[[CLASS_WEATHER, k, py as usize, px as usize]];
                if scan_flagged || weather_p > MISTNET_WEATHER_THRESHOLD {
                    cell_map[[i_azim, i_rang]] = CELL_ID_START;
                }
            }
        }
        maps.push(cell_map);
    }
    maps
}

/// Run the full adapter: select scans, rasterize, classify, back-project.
pub fn apply(volume: &PolarVolume, config: &VpConfig, moments: &[SegmentationMoments], classifier: &dyn SegmentationClassifier) -> Result<Vec<CellMap>> {
    let geometry = Geometry::standard();
    let selected = select_scans(volume, &config.segmentation.mistnet_elevs)?;
    let tensor = build_tensor(volume, &selected, moments, &geometry, MISTNET_DIMENSION, MISTNET_RESOLUTION);
    let output = classifier.classify(&tensor)?;

    let expected = (N_CLASSES, selected.len(), MISTNET_DIMENSION, MISTNET_DIMENSION);
    let got = output.dim();
    if got != expected {
        return Err(VpError::SegmentationOutputShapeMismatch { expected, got });
    }

    Ok(back_project(volume, &selected, &output, &geometry, MISTNET_DIMENSION, MISTNET_RESOLUTION))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Moment, PolarScan};
    use ndarray::Array2 as Raster;

    fn uniform_scan(elevation_deg: f64, dbz_value: f32) -> PolarScan {
        let n_azim = 360;
        let n_rang = 600;
        let mut scan = PolarScan::new(elevation_deg.to_radians(), 1.0f64.to_radians(), 0.0, 500.0, 0.0, n_azim, n_rang);
        let dbz_raster = Raster::from_elem((n_azim, n_rang), dbz_value);
        let vrad_raster = Raster::from_elem((n_azim, n_rang), 2.0f32);
        scan.insert_moment(Moment::new("DBZH", 1.0, 0.0, dbz_raster));
        scan.insert_moment(Moment::new("VRADH", 1.0, 0.0, vrad_raster));
        scan
    }

    fn volume_with_elevations(elevs_deg: &[f64]) -> PolarVolume {
        let mut volume = PolarVolume::new(5.0, 52.0, 50.0);
        for &e in elevs_deg {
            volume.push_scan(uniform_scan(e, 20.0));
        }
        volume
    }

    #[test]
    fn select_scans_picks_the_nearest_elevation() {
        let volume = volume_with_elevations(&[0.5, 1.5, 2.5, 4.5, 8.0]);
        let targets = [0.6, 1.4, 2.6, 4.4, 8.1];
        let selected = select_scans(&volume, &targets).unwrap();
        assert_eq!(selected, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn select_scans_rejects_wrong_elevation_count() {
        let volume = volume_with_elevations(&[0.5, 1.5, 2.5, 4.5, 8.0]);
        let err = select_scans(&volume, &[0.5, 1.5]).unwrap_err();
        assert!(matches!(err, VpError::SegmentationElevationMismatch { expected: 5, got: 2 }));
    }

    #[test]
    fn nodata_reflectivity_masks_velocity_and_spectrum_width() {
        let n_azim = 360;
        let n_rang = 600;
        let mut scan = PolarScan::new(0.5f64.to_radians(), 1.0f64.to_radians(), 0.0, 500.0, 0.0, n_azim, n_rang);
        let dbz_raw = Raster::from_elem((n_azim, n_rang), 250.0f32);
        let dbz = Moment::new("DBZH", 0.5, -20.0, dbz_raw).with_nodata(250.0);
        let vrad = Moment::new("VRADH", 0.5, 0.0, Raster::from_elem((n_azim, n_rang), 4.0f32));
        scan.insert_moment(dbz);
        scan.insert_moment(vrad);

        let mut volume = PolarVolume::new(5.0, 52.0, 50.0);
        volume.push_scan(scan);

        let geometry = Geometry::standard();
        let moments = vec![SegmentationMoments { dbz_name: "DBZH".into(), vrad_name: "VRADH".into(), wrad_name: None }];
        let tensor = build_tensor(&volume, &[0], &moments, &geometry, 64, 2000.0);

        assert!(tensor.slice(s![0, .., ..]).iter().all(|&v| v == MISTNET_INIT));
        assert!(tensor.slice(s![1, .., ..]).iter().all(|&v| v == MISTNET_INIT));
    }

    struct ConstantClassifier {
        weather_probability: f32,
    }

    impl SegmentationClassifier for ConstantClassifier {
        fn classify(&self, input: &Array3<f32>) -> Result<Array4<f32>> {
            let n_elev = input.shape()[0] / N_CARTESIAN_MOMENTS;
            let dim = input.shape()[1];
            let mut out = Array4::from_elem((3, n_elev, dim, dim), 0.0f32);
            out.slice_mut(s![CLASS_WEATHER, .., .., ..]).fill(self.weather_probability);
            Ok(out)
        }
    }

    #[test]
    fn high_scan_average_labels_every_non_bleed_gate_as_a_cell() {
        let volume = volume_with_elevations(&[0.5, 1.5, 2.5, 4.5, 8.0]);
        let moments: Vec<SegmentationMoments> = (0..5)
            .map(|_| SegmentationMoments { dbz_name: "DBZH".into(), vrad_name: "VRADH".into(), wrad_name: None })
            .collect();
        let classifier = ConstantClassifier { weather_probability: 0.9 };
        let mut config = VpConfig::default();
        config.segmentation.mistnet_elevs = vec![0.5, 1.5, 2.5, 4.5, 8.0];

        let maps = apply(&volume, &config, &moments, &classifier).unwrap();
        assert_eq!(maps.len(), 5);
        let labeled: usize = maps[0].iter().filter(|&&v| v == CELL_ID_START).count();
        assert!(labeled > 0, "at least some in-range gates should be labeled weather cells");
    }

    #[test]
    fn low_probability_leaves_gates_unlabeled() {
        let volume = volume_with_elevations(&[0.5, 1.5, 2.5, 4.5, 8.0]);
        let moments: Vec<SegmentationMoments> = (0..5)
            .map(|_| SegmentationMoments { dbz_name: "DBZH".into(), vrad_name: "VRADH".into(), wrad_name: None })
            .collect();
        let classifier = ConstantClassifier { weather_probability: 0.05 };
        let mut config = VpConfig::default();
        config.segmentation.mistnet_elevs = vec![0.5, 1.5, 2.5, 4.5, 8.0];

        let maps = apply(&volume, &config, &moments, &classifier).unwrap();
        assert!(maps[0].iter().all(|&v| v == CELL_NONE));
    }
}
