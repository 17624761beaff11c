/// Linear VVP (Velocity-Volume Processing) wind fit, solved by SVD
/// least squares (spec.md §4.10).
///
/// The model is the standard 3-parameter VVP radial-velocity field
/// `vr = u*sin(az)*cos(el) + v*cos(az)*cos(el) + w*sin(el)`, fit once per
/// layer per pass over whichever points the gate-code selects.
use nalgebra::{DMatrix, DVector};

/// Singular values smaller than `SVDTOL * max(singular values)` are treated
/// as zero in the pseudo-inverse, guarding against a rank-deficient design
/// matrix (e.g. too narrow an elevation spread).
pub const SVDTOL: f64 = 1e-5;

#[derive(Debug, Clone)]
pub struct VvpFit {
    /// `[u, v, w]`, all `NaN` when the fit was rejected (chisq below
    /// `chisq_min`, or too few points to build a full-rank design matrix).
    pub params: [f64; 3],
    /// Mean squared residual over the fitted points (spec.md §4.10): the
    /// sum of squared residuals divided by the point count, unweighted
    /// (mirrors the source's svdfit with sigma implicitly 1.0).
    pub chisq: f64,
    /// Fitted radial velocity at every input point, same order as `y_obs`.
    pub fitted: Vec<f64>,
}

impl VvpFit {
    /// Fit `y_obs` (one dealiased radial velocity per point) against the
    /// azimuth/elevation geometry of each point. Returns `params = [NAN;
    /// 3]` and an all-NaN `fitted` when there are fewer points than
    /// parameters.
    pub fn fit(azim_deg: &[f64], elev_deg: &[f64], y_obs: &[f64]) -> VvpFit {
        let n = y_obs.len();
        if n < 3 {
            return VvpFit { params: [f64::NAN; 3], chisq: f64::NAN, fitted: vec![f64::NAN; n] };
        }

        let mut design = DMatrix::<f64>::zeros(n, 3);
        for i in 0..n {
            let az = azim_deg[i].to_radians();
            let el = elev_deg[i].to_radians();
            design[(i, 0)] = az.sin() * el.cos();
            design[(i, 1)] = az.cos() * el.cos();
            design[(i, 2)] = el.sin();
        }
        let y = DVector::from_row_slice(y_obs);

        let svd = design.clone().svd(true, true);
        let max_sv = svd.singular_values.max();
        if max_sv <= 0.0 {
            return VvpFit { params: [f64::NAN; 3], chisq: f64::NAN, fitted: vec![f64::NAN; n] };
        }
        let tol = SVDTOL * max_sv;

        match svd.solve(&y, tol) {
            Ok(solved) => {
                let params = [solved[0], solved[1], solved[2]];
                let fitted_vec = &design * &solved;
                let fitted: Vec<f64> = fitted_vec.iter().copied().collect();
                let sum_sq: f64 = fitted.iter().zip(y_obs.iter()).map(|(f, o)| (o - f).powi(2)).sum();
                let chisq = sum_sq / n as f64;
                VvpFit { params, chisq, fitted }
            }
            Err(_) => VvpFit { params: [f64::NAN; 3], chisq: f64::NAN, fitted: vec![f64::NAN; n] },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_exact_uniform_wind() {
        let (u, v, w) = (5.0, 3.0, 0.1);
        let n = 72;
        let mut azim = Vec::with_capacity(n);
        let mut elev = Vec::with_capacity(n);
        let mut y = Vec::with_capacity(n);
        for i in 0..n {
            let az_deg = i as f64 * 360.0 / n as f64;
            let el_deg = 2.0 + (i % 3) as f64;
            let az = az_deg.to_radians();
            let el = el_deg.to_radians();
            azim.push(az_deg);
            elev.push(el_deg);
            y.push(u * az.sin() * el.cos() + v * az.cos() * el.cos() + w * el.sin());
        }
        let fit = VvpFit::fit(&azim, &elev, &y);
        assert!((fit.params[0] - u).abs() < 1e-6);
        assert!((fit.params[1] - v).abs() < 1e-6);
        assert!((fit.params[2] - w).abs() < 1e-6);
        assert!(fit.chisq < 1e-6);
    }

    #[test]
    fn too_few_points_yields_nan_params() {
        let fit = VvpFit::fit(&[0.0, 90.0], &[1.0, 1.0], &[1.0, 2.0]);
        assert!(fit.params.iter().all(|p| p.is_nan()));
    }
}
