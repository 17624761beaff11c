/// Fringe dilation: grows surviving cells by a fixed ground distance so that
/// points just outside a precipitation cell are still treated as
/// contaminated (spec.md §4.5).
use ndarray::Array2;

use crate::model::{cyclic, CellMap, CELL_FRINGE, CELL_FRINGE_RESERVED, CELL_NONE};

/// Law-of-cosines distance (meters) between two gates given as (range,
/// azimuth-ray) pairs sharing a common range-bin size and azimuth-bin width.
fn gate_distance_m(i_rang_1: i64, i_azim_1_rad: f64, i_rang_2: i64, i_azim_2_rad: f64, range_bin_size_m: f64) -> f64 {
    let r1 = i_rang_1 as f64 * range_bin_size_m;
    let r2 = i_rang_2 as f64 * range_bin_size_m;
    (r1 * r1 + r2 * r2 - 2.0 * r1 * r2 * (i_azim_1_rad - i_azim_2_rad).cos()).sqrt()
}

pub struct FringeGrower;

impl FringeGrower {
    /// Dilate every gate labeled `>=2` in `cell_map` by `fringe_dist_m`,
    /// marking newly-covered `CELL_NONE` gates as `CELL_FRINGE`. Only gates
    /// on a cell's edge (at least one 3x3 neighbor not part of any cell)
    /// seed the dilation, matching the source's edge-only optimization.
    pub fn grow(cell_map: &mut CellMap, range_bin_size_m: f64, fringe_dist_m: f64) {
        let shape = cell_map.shape();
        let (n_azim, n_rang) = (shape[0], shape[1]);
        if n_azim == 0 || n_rang == 0 {
            return;
        }
        let azim_width_rad = std::f64::consts::TAU / n_azim as f64;

        let mut new_fringe: Vec<(usize, usize)> = Vec::new();

        for i_azim in 0..n_azim {
            for i_rang in 0..n_rang {
                if cell_map[[i_azim, i_rang]] <= CELL_FRINGE {
                    continue;
                }

                let mut is_edge = false;
                'edge: for di in [-1i64, 0, 1] {
                    for dj in [-1i64, 0, 1] {
                        if di == 0 && dj == 0 {
                            continue;
                        }
                        let jj = i_rang as i64 + dj;
                        if jj < 0 || jj as usize >= n_rang {
                            continue;
                        }
                        let ii = cyclic(i_azim as i64 + di, n_azim);
                        if cell_map[[ii, jj as usize]] < CELL_FRINGE {
                            is_edge = true;
                            break 'edge;
                        }
                    }
                }
                if !is_edge {
                    continue;
                }

                let actual_range_m = (i_rang as f64 + 0.5) * range_bin_size_m;
                let circumference_m = std::f64::consts::TAU * actual_range_m;
                let a_block = ((fringe_dist_m / circumference_m) * n_azim as f64).round() as i64;
                let r_block = (fringe_dist_m / range_bin_size_m).round() as i64;

                for di in -a_block..=a_block {
                    let ii = cyclic(i_azim as i64 + di, n_azim);
                    for dj in -r_block..=r_block {
                        let jj = i_rang as i64 + dj;
                        if jj < 0 || jj as usize >= n_rang {
                            continue;
                        }
                        let jj = jj as usize;
                        if cell_map[[ii, jj]] >= CELL_FRINGE {
                            continue;
                        }
                        let dist = gate_distance_m(
                            i_rang as i64,
                            i_azim as f64 * azim_width_rad,
                            jj as i64,
                            ii as f64 * azim_width_rad,
                            range_bin_size_m,
                        );
                        if dist <= fringe_dist_m {
                            new_fringe.push((ii, jj));
                        }
                    }
                }
            }
        }

        for (i, j) in new_fringe {
            if cell_map[[i, j]] == CELL_NONE || cell_map[[i, j]] == CELL_FRINGE_RESERVED {
                cell_map[[i, j]] = CELL_FRINGE;
            }
        }
    }
}
