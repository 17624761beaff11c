/// Slant-range / ground-distance / height conversions under an
/// effective-earth-radius spherical propagation model (spec.md §4.1).
///
/// All inputs and outputs are meters/radians. There are no error paths:
/// inputs outside the physical domain simply produce `NaN`, matching the
/// source's treatment.

/// Mean Earth radius, meters (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Default 4/3-earth refraction coefficient.
pub const DEFAULT_REFRACTION_COEFFICIENT: f64 = 4.0 / 3.0;

#[derive(Debug, Clone, Copy)]
pub struct Geometry {
    /// Effective Earth radius, `R_earth * refractionCoefficient`.
    pub r_eff: f64,
}

impl Geometry {
    pub fn new(refraction_coefficient: f64) -> Self {
        Self {
            r_eff: EARTH_RADIUS_M * refraction_coefficient,
        }
    }

    pub fn standard() -> Self {
        Self::new(DEFAULT_REFRACTION_COEFFICIENT)
    }

    /// Slant range for a ground distance `d` at elevation `elev_rad`.
    pub fn range(&self, d: f64, elev_rad: f64) -> f64 {
        let re = self.r_eff;
        re * (d / re).sin() / (std::f64::consts::PI - std::f64::consts::FRAC_PI_2 - elev_rad - d / re).sin()
    }

    /// Height above the radar for a ground distance `d` at elevation
    /// `elev_rad`.
    pub fn height_from_distance(&self, d: f64, elev_rad: f64) -> f64 {
        let re = self.r_eff;
        re * (std::f64::consts::FRAC_PI_2 + elev_rad).sin()
            / (std::f64::consts::PI - std::f64::consts::FRAC_PI_2 - elev_rad - d / re).sin()
            - re
    }

    /// Height above the radar for a slant range `r` at elevation
    /// `elev_rad`.
    pub fn height_from_range(&self, r: f64, elev_rad: f64) -> f64 {
        let re = self.r_eff;
        (r * r + re * re + 2.0 * re * r * elev_rad.sin()).sqrt() - re
    }

    /// Ground distance for a slant range `r` at elevation `elev_rad`.
    pub fn distance_from_range(&self, r: f64, elev_rad: f64) -> f64 {
        let re = self.r_eff;
        let height = self.height_from_range(r, elev_rad);
        re * (r * elev_rad.cos() / (re + height)).asin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_range_round_trip() {
        let geom = Geometry::standard();
        for &d_km in &[0.0, 10.0, 50.0, 100.0, 150.0, 200.0, 250.0] {
            for &elev_deg in &[0.0, 0.5, 1.0, 5.0, 15.0, 30.0] {
                let d = d_km * 1000.0;
                let elev = elev_deg.to_radians();
                let r = geom.range(d, elev);
                let back = geom.distance_from_range(r, elev);
                assert!(
                    (back - d).abs() < 1.0,
                    "round trip failed at d={d_km}km elev={elev_deg}deg: {back} != {d}"
                );
            }
        }
    }

    #[test]
    fn height_from_range_matches_height_from_distance() {
        let geom = Geometry::standard();
        let d = 100_000.0;
        let elev = 2.0f64.to_radians();
        let r = geom.range(d, elev);
        let h1 = geom.height_from_distance(d, elev);
        let h2 = geom.height_from_range(r, elev);
        assert!((h1 - h2).abs() < 1e-3);
    }

    #[test]
    fn zero_elevation_zero_distance_is_zero_height() {
        let geom = Geometry::standard();
        assert!((geom.height_from_distance(0.0, 0.0)).abs() < 1e-9);
    }
}
