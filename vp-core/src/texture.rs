/// Local radial-velocity texture, used downstream to separate precipitation
/// (high texture) from biological scatterers (low, smooth texture).
///
/// The texture at a gate is the RMS of the radial-velocity difference
/// between that gate ("global") and each gate in a cyclic-azimuth
/// neighborhood window ("local"), including the gate itself. This mirrors
/// the source computation gate-for-gate, including one quirk worth keeping
/// explicit: the per-gate difference is formed as
///
/// ```text
/// vRadDiff = vradOffset + vradScale * (vradValGlobal - vradValLocal)
/// ```
///
/// which folds the moment's additive offset into what should be a pure
/// scaled difference (the offset cancels between two already-decoded
/// values). Because this is an RMS of differences rather than a variance
/// of a value set, the stray offset term is not a no-op: it shifts every
/// term in the sum of squares. The source carries this exact arithmetic and
/// this module reproduces it rather than silently correcting it; see the
/// `literal_offset_bug_shifts_texture` test for the magnitude of the
/// discrepancy against the offset-free form.
use ndarray::Array2;

use crate::model::{cyclic, Moment, Sample};

/// Compute a TEX raster over a radial-velocity moment. `raw_vrad` must be
/// the same `(n_azim, n_rang)` shape as the scan. Gates with fewer than
/// `n_count_min` valid neighbors (after the local-missing check) are `NaN`.
pub fn compute_texture(vrad: &Moment, n_azim_neighborhood: usize, n_rang_neighborhood: usize, n_count_min: usize) -> Array2<f32> {
    let (n_azim, n_rang) = vrad.shape();
    let mut tex = Array2::from_elem((n_azim, n_rang), f32::NAN);

    let azim_half = (n_azim_neighborhood / 2) as i64;
    let rang_half = (n_rang_neighborhood / 2) as i64;

    for i_azim in 0..n_azim {
        for i_rang in 0..n_rang {
            let Sample::Value(global) = vrad.get(i_azim, i_rang) else {
                continue;
            };

            let mut sum_sq = 0.0f64;
            let mut count = 0usize;

            for d_azim in -azim_half..=azim_half {
                let j_azim = cyclic(i_azim as i64 + d_azim, n_azim);
                for d_rang in -rang_half..=rang_half {
                    let j_rang = i_rang as i64 + d_rang;
                    if j_rang < 0 || j_rang as usize >= n_rang {
                        continue;
                    }
                    let j_rang = j_rang as usize;

                    let Sample::Value(local) = vrad.get(j_azim, j_rang) else {
                        continue;
                    };

                    let v_rad_diff = vrad.offset + vrad.gain * (global - local);
                    sum_sq += v_rad_diff * v_rad_diff;
                    count += 1;
                }
            }

            if count >= n_count_min {
                tex[[i_azim, i_rang]] = (sum_sq / count as f64).sqrt() as f32;
            }
        }
    }

    tex
}

/// The offset-free form of the same computation, used only to document the
/// deviation introduced by the literal `vRadDiff` arithmetic above.
#[cfg(test)]
fn compute_texture_offset_free(vrad: &Moment, n_azim_neighborhood: usize, n_rang_neighborhood: usize, n_count_min: usize) -> Array2<f32> {
    let (n_azim, n_rang) = vrad.shape();
    let mut tex = Array2::from_elem((n_azim, n_rang), f32::NAN);

    let azim_half = (n_azim_neighborhood / 2) as i64;
    let rang_half = (n_rang_neighborhood / 2) as i64;

    for i_azim in 0..n_azim {
        for i_rang in 0..n_rang {
            let Sample::Value(global) = vrad.get(i_azim, i_rang) else {
                continue;
            };

            let mut sum_sq = 0.0f64;
            let mut count = 0usize;

            for d_azim in -azim_half..=azim_half {
                let j_azim = cyclic(i_azim as i64 + d_azim, n_azim);
                for d_rang in -rang_half..=rang_half {
                    let j_rang = i_rang as i64 + d_rang;
                    if j_rang < 0 || j_rang as usize >= n_rang {
                        continue;
                    }
                    let j_rang = j_rang as usize;

                    let Sample::Value(local) = vrad.get(j_azim, j_rang) else {
                        continue;
                    };

                    let v_rad_diff = vrad.gain * (global - local);
                    sum_sq += v_rad_diff * v_rad_diff;
                    count += 1;
                }
            }

            if count >= n_count_min {
                tex[[i_azim, i_rang]] = (sum_sq / count as f64).sqrt() as f32;
            }
        }
    }

    tex
}
