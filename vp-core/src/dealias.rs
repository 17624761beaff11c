/// Torus-mapped radial-velocity dealiasing (spec.md §4.9), after Haase et
/// al. 2004 JAOT. Observed velocities are mapped onto a torus via their
/// Nyquist interval; a two-component wind field is fit against that torus
/// by grid search followed by Nelder-Mead refinement, and each point is
/// then independently assigned the Nyquist-interval fold that best matches
/// the fitted field.
use argmin::core::{CostFunction, Error as ArgminError, Executor};
use argmin::solver::neldermead::NelderMead;

/// Maximum radial velocity (m/s) the test-field grid searches over.
const DEALIAS_VMAX: f64 = 48.0;
/// Number of speed steps in the test-field grid.
const DEALIAS_VAF: usize = 4;
/// Number of azimuthal directions in the test-field grid.
const DEALIAS_NF: usize = 40;

/// One point to dealias: azimuth/elevation locate it on the torus, `vrad`
/// is its observed radial velocity, `nyquist` its Nyquist interval.
#[derive(Debug, Clone, Copy)]
pub struct DealiasInput {
    pub azim_deg: f64,
    pub elev_deg: f64,
    pub vrad: f64,
    pub nyquist: f64,
}

struct TorusField {
    sin_azim: Vec<f64>,
    cos_azim: Vec<f64>,
    cos_elev: Vec<f64>,
    x: Vec<f64>,
    y: Vec<f64>,
    nyquist: Vec<f64>,
}

impl TorusField {
    fn build(points: &[DealiasInput]) -> Self {
        let mut sin_azim = Vec::with_capacity(points.len());
        let mut cos_azim = Vec::with_capacity(points.len());
        let mut cos_elev = Vec::with_capacity(points.len());
        let mut x = Vec::with_capacity(points.len());
        let mut y = Vec::with_capacity(points.len());
        let mut nyquist = Vec::with_capacity(points.len());
        for p in points {
            let azim_rad = p.azim_deg.to_radians();
            let elev_rad = p.elev_deg.to_radians();
            sin_azim.push(azim_rad.sin());
            cos_azim.push(azim_rad.cos());
            cos_elev.push(elev_rad.cos());
            x.push(p.nyquist / std::f64::consts::PI * (p.vrad * std::f64::consts::PI / p.nyquist).cos());
            y.push(p.nyquist / std::f64::consts::PI * (p.vrad * std::f64::consts::PI / p.nyquist).sin());
            nyquist.push(p.nyquist);
        }
        Self { sin_azim, cos_azim, cos_elev, x, y, nyquist }
    }

    /// Summed absolute torus distance between the test field `(u, v)` and
    /// the observed field, eq. 4/6/7 in Haase et al. 2004.
    fn test_field(&self, u: f64, v: f64) -> f64 {
        let mut esum = 0.0;
        for i in 0..self.x.len() {
            let vm = (u * self.sin_azim[i] + v * self.cos_azim[i]) * self.cos_elev[i];
            let ny = self.nyquist[i];
            let xt = ny / std::f64::consts::PI * (vm * std::f64::consts::PI / ny).cos();
            let yt = ny / std::f64::consts::PI * (vm * std::f64::consts::PI / ny).sin();
            let e = (xt - self.x[i]).abs() + (yt - self.y[i]).abs();
            if e.is_finite() {
                esum += e;
            }
        }
        esum
    }
}

impl CostFunction for TorusField {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, p: &Self::Param) -> Result<Self::Output, ArgminError> {
        Ok(self.test_field(p[0], p[1]))
    }
}

pub struct Dealiaser;

impl Dealiaser {
    /// Dealias every point in `points` against a single shared wind field.
    /// `ni_min` is the minimum Nyquist interval among the points being
    /// dealiased together and bounds how many folds are searched per point.
    /// Returns `None` when the Nelder-Mead refinement fails to produce a
    /// finite cost (the source's `fitOk == 0` path); the caller should then
    /// leave the affected points at their observed (aliased) velocity.
    pub fn dealias(points: &[DealiasInput], ni_min: f64) -> Option<Vec<f64>> {
        if points.is_empty() {
            return Some(Vec::new());
        }
        let field = TorusField::build(points);

        let mut best_u = 0.0;
        let mut best_v = 0.0;
        let mut best_cost = f64::INFINITY;
        for i in 0..DEALIAS_NF {
            let azim = 2.0 * std::f64::consts::PI / DEALIAS_NF as f64 * i as f64;
            for j in 0..DEALIAS_VAF {
                let speed = DEALIAS_VMAX / DEALIAS_VAF as f64 * (j as f64 + 1.0);
                let u = speed * azim.sin();
                let v = speed * azim.cos();
                let cost = field.test_field(u, v);
                if cost < best_cost {
                    best_cost = cost;
                    best_u = u;
                    best_v = v;
                }
            }
        }

        let simplex = vec![
            vec![best_u, best_v],
            vec![best_u + 1.0, best_v],
            vec![best_u, best_v + 1.0],
        ];
        let solver = NelderMead::new(simplex).with_sd_tolerance(1e-2).ok()?;
        let res = Executor::new(field, solver)
            .configure(|state| state.max_iters(100))
            .run()
            .ok()?;
        let fitted = res.state().best_param.clone()?;
        let (u1, v1) = (fitted[0], fitted[1]);

        let mva = (2.0 * (DEALIAS_VMAX / (2.0 * ni_min)).ceil()) as i64;

        let mut out = Vec::with_capacity(points.len());
        for p in points {
            let azim_rad = p.azim_deg.to_radians();
            let elev_rad = p.elev_deg.to_radians();
            let vt1 = (u1 * azim_rad.sin() + v1 * azim_rad.cos()) * elev_rad.cos();
            let diff_v_test = vt1 - p.vrad;

            let mut best_dv = 0.0;
            let mut best_dmy = f64::INFINITY;
            for i in 0..=mva {
                let dv = p.nyquist * (2.0 * i as f64 - mva as f64);
                let dmy = (dv - diff_v_test).abs();
                if dmy < best_dmy && !dmy.is_nan() {
                    best_dmy = dmy;
                    best_dv = dv;
                }
            }
            out.push(p.vrad + best_dv);
        }
        Some(out)
    }
}
