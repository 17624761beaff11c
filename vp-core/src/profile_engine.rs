/// Orchestrates the whole pipeline from a selected, classified volume to a
/// finished [`ProfileSet`] (spec.md §4.11): per-layer reflectivity and
/// velocity passes, dealiasing, the VVP fit, and the bird/all-scatterer
/// density coupling between profile types.
use ndarray::Array2;
use rayon::prelude::*;
use vp_types::{GateFlag, ProfileType, QuantityType, CLUT_PARAM, RHOHV};

use crate::cell::{CellAnalyzer, CellFinder, FringeGrower};
use crate::classify::classify_points;
use crate::config::VpConfig;
use crate::dealias::{DealiasInput, Dealiaser};
use crate::derived::DerivedConstants;
use crate::error::{Result, VpError};
use crate::geometry::Geometry;
use crate::model::{CellMap, LayerState, Moment, PointStore, PolarScan, PolarVolume, ProfileSet, CELL_ID_START, CELL_NONE};
use crate::points::{collect_scan, layer_capacities};
use crate::scan_select::{ScanSelection, ScanSelector};
use crate::texture::compute_texture;
use crate::vvpfit::VvpFit;

/// Partition `[0, 360)` into `n_bins` equal bins and return true when any
/// two cyclically-adjacent bins both have fewer than `n_obs_min`
/// observations. A sparsely-sampled direction makes the VVP fit unreliable.
fn has_azimuth_gap(azim_deg: &[f64], n_bins: usize, n_obs_min: usize) -> bool {
    if n_bins == 0 {
        return false;
    }
    let mut counts = vec![0usize; n_bins];
    for &az in azim_deg {
        let bin = ((az / 360.0 * n_bins as f64).floor() as i64).rem_euclid(n_bins as i64) as usize;
        counts[bin] += 1;
    }
    (0..n_bins).any(|i| {
        let next = (i + 1) % n_bins;
        counts[i] < n_obs_min && counts[next] < n_obs_min
    })
}

/// Candidate mask for `CellFinder`: `moment > threshold`, with gates beyond
/// `r_cell_max_m` excluded outright (spec.md §4.3's `range > rCellMax` skip).
fn weather_mask(scan: &PolarScan, moment: &Moment, threshold: f64, r_cell_max_m: f64) -> Array2<bool> {
    let (n_azim, n_rang) = moment.shape();
    Array2::from_shape_fn((n_azim, n_rang), |(i, j)| {
        scan.range_for_bin(j) <= r_cell_max_m && matches!(moment.get(i, j).value(), Some(v) if v > threshold)
    })
}

/// Per-scan cell detection, texture, fringe growing and capacity sizing,
/// done once before any points are written (spec.md §4.2-§4.7 data flow).
struct PreparedScan {
    scan_index: usize,
    cell_map: CellMap,
    nyquist: f64,
}

pub struct ProfileEngine;

impl ProfileEngine {
    /// Run the full pipeline over `volume` and return the finished profile
    /// tables for every active profile type.
    pub fn run(volume: &PolarVolume, config: &VpConfig) -> Result<ProfileSet> {
        config.validate()?;
        let geometry = Geometry::standard();
        let selection = ScanSelector::select(volume, config);
        if selection.n_scans_used == 0 {
            return Err(VpError::NoUsableScans);
        }
        let derived = DerivedConstants::resolve(config, volume.wavelength_cm);

        // Per-scan cell detection, texture and fringe growing are
        // independent across scans (spec.md §5: leaves may parallelize as
        // long as the profile output stays deterministic), so they run
        // concurrently; only the capacity summation below is sequential.
        let used_indices: Vec<usize> = selection.used_indices().collect();
        let prepared: Vec<PreparedScan> = used_indices
            .par_iter()
            .map(|&idx| -> Result<PreparedScan> {
                let scan = &volume.scans[idx];
                let decision = &selection.decisions[idx];
                let dbz = scan
                    .get_moment(decision.dbz_name.as_deref().unwrap())
                    .ok_or_else(|| VpError::MissingRequiredMoment(decision.dbz_name.clone().unwrap_or_default()))?;
                let vrad = scan
                    .get_moment(decision.vrad_name.as_deref().unwrap())
                    .ok_or_else(|| VpError::MissingRequiredMoment(decision.vrad_name.clone().unwrap_or_default()))?;

                let mut cell_map: CellMap = Array2::from_elem((scan.n_azim, scan.n_rang), CELL_NONE);
                let r_cell_max_m = config.geometry.range_max_m + config.constants.rcellmax_offset_m;

                if selection.dual_pol && decision.has_rhohv {
                    let dbz_mask = weather_mask(scan, dbz, config.moments.dbz_thres_min, r_cell_max_m);
                    let next_id = CellFinder::find(&dbz_mask, &mut cell_map, CELL_ID_START, config.constants.n_neighbors_min);
                    let rhohv = scan.get_moment(RHOHV).ok_or_else(|| VpError::MissingRequiredMoment(RHOHV.to_string()))?;
                    let rhohv_mask = weather_mask(scan, rhohv, config.moments.rhohv_thres_min, r_cell_max_m);
                    CellFinder::find(&rhohv_mask, &mut cell_map, next_id, config.constants.n_neighbors_min);
                } else {
                    let dbz_mask = weather_mask(scan, dbz, config.moments.dbz_thres_min, r_cell_max_m);
                    CellFinder::find(&dbz_mask, &mut cell_map, CELL_ID_START, config.constants.n_neighbors_min);
                }

                let tex = if !selection.dual_pol {
                    compute_texture(vrad, config.constants.n_azim_neighborhood, config.constants.n_rang_neighborhood, config.constants.n_count_min)
                } else {
                    Array2::from_elem((scan.n_azim, scan.n_rang), f32::NAN)
                };

                let is_clutter = match scan.get_moment(CLUT_PARAM) {
                    Some(clut) if config.clutter.use_clutter_map => {
                        Array2::from_shape_fn((scan.n_azim, scan.n_rang), |(i, j)| {
                            matches!(clut.get(i, j).value(), Some(v) if v > config.clutter.clutter_value_min)
                        })
                    }
                    _ => Array2::from_elem((scan.n_azim, scan.n_rang), false),
                };

                CellAnalyzer::analyze(
                    &mut cell_map,
                    dbz,
                    &tex,
                    &is_clutter,
                    scan.range_bin_size_m,
                    config.constants.area_cell_min_km2,
                    config.constants.cell_clutter_fraction_max,
                    derived.cell_dbz_min,
                    config.constants.cell_std_dev_max,
                    selection.dual_pol,
                );

                FringeGrower::grow(&mut cell_map, scan.range_bin_size_m, config.constants.fringe_dist_m);

                Ok(PreparedScan {
                    scan_index: idx,
                    cell_map,
                    nyquist: decision.nyquist.unwrap(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut capacities = vec![0usize; config.geometry.n_layers];
        for &idx in &used_indices {
            let scan = &volume.scans[idx];
            let caps = layer_capacities(scan, &geometry, config);
            for (total, cap) in capacities.iter_mut().zip(caps.iter()) {
                *total += cap;
            }
        }

        let mut store = PointStore::with_capacities(&capacities);
        for p in &prepared {
            let scan = &volume.scans[p.scan_index];
            let decision = &selection.decisions[p.scan_index];
            let dbz = scan.get_moment(decision.dbz_name.as_deref().unwrap()).unwrap();
            let vrad = scan.get_moment(decision.vrad_name.as_deref().unwrap()).unwrap();
            let clutter = if config.clutter.use_clutter_map {
                scan.get_moment(CLUT_PARAM).map(|m| &m.raster)
            } else {
                None
            };
            collect_scan(scan, dbz, vrad, &p.cell_map, clutter, p.nyquist, &geometry, config, &mut store)?;
        }

        classify_points(&mut store.rows, config, derived.dbz_max);

        let mut profiles =
            ProfileSet::empty_with_config(config.geometry.n_layers, config.geometry.layer_thickness_m, config.clone());
        profiles.derived = Some(derived.clone());
        const N_PASSES: usize = 2;

        for pt in ProfileType::ACTIVE {
            let recycle = pt != ProfileType::All && config.dealias.dealias_recycle;

            for p in store.rows.iter_mut() {
                p.gate_code.clear(GateFlag::VDifMax);
                if !recycle {
                    p.vrad_dealiased = p.vrad;
                }
            }

            for layer in 0..config.geometry.n_layers {
                let layer_points = store.layer_mut(layer);

                let mut undbz_sum = 0.0f64;
                let mut n_z = 0u32;
                for point in layer_points.iter() {
                    if point.gate_code.include(pt, QuantityType::Reflectivity, config.moments.require_vrad) {
                        let undbz = if point.dbz.is_nan() { 0.0 } else { 10f64.powf(point.dbz / 10.0) };
                        undbz_sum += undbz;
                        n_z += 1;
                    }
                }
                let (dbz_avg, eta, density) = if n_z as usize > config.constants.n_points_included_min {
                    let undbz_avg = undbz_sum / n_z as f64;
                    let dbz_avg = 10.0 * undbz_avg.log10();
                    let eta = derived.dbz_factor * undbz_avg;
                    let density = if pt == ProfileType::Birds { eta / config.physics.bird_radar_cross_section_cm2 } else { f64::NAN };
                    (dbz_avg, eta, density)
                } else {
                    (f64::NAN, f64::NAN, f64::NAN)
                };

                let mut has_gap = true;
                let mut chi = f64::NAN;
                let mut params = [f64::NAN; 3];
                let mut h_speed = f64::NAN;
                let mut h_dir = f64::NAN;
                let mut n_included = 0u32;

                for pass in 0..N_PASSES {
                    let mut azim = Vec::new();
                    let mut elev = Vec::new();
                    let mut vrad_obs = Vec::new();
                    let mut nyquist = Vec::new();
                    let mut indices = Vec::new();
                    for (li, point) in layer_points.iter().enumerate() {
                        if point.gate_code.include(pt, QuantityType::Velocity, config.moments.require_vrad) {
                            azim.push(point.azim_deg);
                            elev.push(point.elev_deg);
                            vrad_obs.push(point.vrad);
                            nyquist.push(point.nyquist);
                            indices.push(li);
                        }
                    }
                    n_included = azim.len() as u32;
                    has_gap = has_azimuth_gap(&azim, config.constants.n_bins_gap, config.constants.n_obs_gap_min);
                    if has_gap {
                        continue;
                    }

                    if pass == 0 && config.dealias.dealias_vrad && !recycle {
                        let inputs: Vec<DealiasInput> = indices
                            .iter()
                            .map(|&li| DealiasInput {
                                azim_deg: layer_points[li].azim_deg,
                                elev_deg: layer_points[li].elev_deg,
                                vrad: layer_points[li].vrad,
                                nyquist: layer_points[li].nyquist,
                            })
                            .collect();
                        if let Some(dealiased) = Dealiaser::dealias(&inputs, selection.nyquist_min_used) {
                            for (k, &li) in indices.iter().enumerate() {
                                layer_points[li].vrad_dealiased = dealiased[k];
                            }
                        }
                    }

                    let y_dealias: Vec<f64> = indices.iter().map(|&li| layer_points[li].vrad_dealiased).collect();
                    let fit = VvpFit::fit(&azim, &elev, &y_dealias);

                    if fit.chisq < config.constants.chisq_min {
                        // The fit's standard deviation is too low to trust
                        // (as with overfitting); reject it for this pass.
                        params = [f64::NAN; 3];
                        chi = f64::NAN;
                    } else {
                        params = fit.params;
                        chi = fit.chisq.sqrt();
                        h_speed = (params[0].powi(2) + params[1].powi(2)).sqrt();
                        h_dir = params[0].atan2(params[1]).to_degrees();
                        if h_dir < 0.0 {
                            h_dir += 360.0;
                        }

                        for (k, &li) in indices.iter().enumerate() {
                            if (y_dealias[k] - fit.fitted[k]).abs() > config.constants.abs_v_dif_max {
                                layer_points[li].gate_code.set(GateFlag::VDifMax);
                            }
                        }
                    }
                }

                let row = &mut profiles.table_mut(pt)[layer];
                row.has_gap = has_gap;
                row.n_points = n_included;
                row.n_points_z = n_z;

                // The reflectivity pass is independent of the azimuth-gap
                // check on the velocity pass: a layer can have too few
                // velocity observations yet still have a usable dbz/eta
                // average, so these fields are always written.
                row.dbz_avg = dbz_avg;
                row.eta = eta;
                row.density = density;
                row.reflectivity_state = if dbz_avg.is_nan() { LayerState::Undetect } else { LayerState::Data };

                if has_gap {
                    row.wind_state = LayerState::Undetect;
                } else {
                    row.u_mps = params[0];
                    row.v_mps = params[1];
                    row.w_mps = params[2];
                    row.h_speed_mps = h_speed;
                    row.h_dir_deg = h_dir;
                    row.residual = chi;
                    row.wind_state = if params[0].is_nan() { LayerState::Undetect } else { LayerState::Data };
                }
            }

            if pt == ProfileType::All {
                for layer in 0..config.geometry.n_layers {
                    let chi = profiles.table(ProfileType::All)[layer].residual;
                    profiles.scatterers_are_not_birds[layer] = chi < derived.std_dev_min_bird;
                }
            }
            if pt == ProfileType::Birds {
                for layer in 0..config.geometry.n_layers {
                    if profiles.scatterers_are_not_birds[layer] {
                        profiles.table_mut(ProfileType::Birds)[layer].density = 0.0;
                    }
                }
            }
        }

        Ok(profiles)
    }
}
