/// The point store: a flat array of gate observations, partitioned into
/// contiguous per-layer segments (spec.md §3, §4.7).
use crate::error::{Result, VpError};
use crate::model::gatecode::GateCode;

/// One row in the point store: a single (range, azimuth) gate carried
/// forward from a scan into the layer it geometrically belongs to.
#[derive(Debug, Clone, Copy)]
pub struct Point {
    pub range_m: f64,
    pub azim_deg: f64,
    pub elev_deg: f64,
    /// `NAN` encodes missing reflectivity.
    pub dbz: f64,
    /// `NAN` encodes missing radial velocity.
    pub vrad: f64,
    /// Cell identifier from the scan's CellMap (-1, 0, 1, or >=2).
    pub cell: i32,
    pub gate_code: GateCode,
    pub nyquist: f64,
    /// De-aliased radial velocity; initialized to `vrad` and overwritten by
    /// the Dealiaser.
    pub vrad_dealiased: f64,
    /// Static/dynamic clutter map value at this gate, when available.
    pub clutter_value: f64,
}

impl Point {
    pub fn new(range_m: f64, azim_deg: f64, elev_deg: f64, dbz: f64, vrad: f64, cell: i32, nyquist: f64) -> Self {
        Self {
            range_m,
            azim_deg,
            elev_deg,
            dbz,
            vrad,
            cell,
            gate_code: GateCode::new(),
            nyquist,
            vrad_dealiased: vrad,
            clutter_value: f64::NAN,
        }
    }
}

/// A flat array of [`Point`]s partitioned into `n_layers` contiguous
/// segments. Invariant: `index_from[i] + n_points_written[i] <= index_to[i]`
/// for every layer `i`, always.
#[derive(Debug, Clone)]
pub struct PointStore {
    pub rows: Vec<Point>,
    pub index_from: Vec<usize>,
    pub index_to: Vec<usize>,
    pub n_points_written: Vec<usize>,
}

impl PointStore {
    /// Allocate a point store whose layer `i` reserves
    /// `[offset, offset + capacity[i])`, contiguous and in layer order.
    pub fn with_capacities(capacities: &[usize]) -> Self {
        let n_layers = capacities.len();
        let mut index_from = Vec::with_capacity(n_layers);
        let mut index_to = Vec::with_capacity(n_layers);
        let mut offset = 0usize;
        for &cap in capacities {
            index_from.push(offset);
            offset += cap;
            index_to.push(offset);
        }
        Self {
            rows: vec![
                Point::new(f64::NAN, f64::NAN, f64::NAN, f64::NAN, f64::NAN, -1, f64::NAN);
                offset
            ],
            index_from,
            index_to,
            n_points_written: vec![0; n_layers],
        }
    }

    pub fn n_layers(&self) -> usize {
        self.index_from.len()
    }

    /// Append a point to layer `i`'s segment.
    pub fn push(&mut self, layer: usize, point: Point) -> Result<()> {
        let write_at = self.index_from[layer] + self.n_points_written[layer];
        if write_at >= self.index_to[layer] {
            return Err(VpError::PointStoreOverrun {
                layer,
                index_to: self.index_to[layer],
            });
        }
        self.rows[write_at] = point;
        self.n_points_written[layer] += 1;
        Ok(())
    }

    /// The written (not merely reserved) rows for layer `i`.
    pub fn layer(&self, layer: usize) -> &[Point] {
        let from = self.index_from[layer];
        &self.rows[from..from + self.n_points_written[layer]]
    }

    pub fn layer_mut(&mut self, layer: usize) -> &mut [Point] {
        let from = self.index_from[layer];
        let n = self.n_points_written[layer];
        &mut self.rows[from..from + n]
    }

    /// Check the invariant `index_from[i] + n_points_written[i] <=
    /// index_to[i]` for every layer; used by tests and as a cheap
    /// post-fill assertion.
    pub fn check_invariant(&self) -> bool {
        (0..self.n_layers()).all(|i| self.index_from[i] + self.n_points_written[i] <= self.index_to[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invariant_holds_after_fill_within_capacity() {
        let mut store = PointStore::with_capacities(&[2, 3]);
        store.push(0, Point::new(1.0, 2.0, 3.0, 4.0, 5.0, -1, 1.0)).unwrap();
        store.push(1, Point::new(1.0, 2.0, 3.0, 4.0, 5.0, -1, 1.0)).unwrap();
        assert!(store.check_invariant());
        assert_eq!(store.layer(0).len(), 1);
        assert_eq!(store.layer(1).len(), 1);
    }

    #[test]
    fn overrun_is_rejected() {
        let mut store = PointStore::with_capacities(&[1]);
        store.push(0, Point::new(0.0, 0.0, 0.0, 0.0, 0.0, -1, 1.0)).unwrap();
        let err = store.push(0, Point::new(0.0, 0.0, 0.0, 0.0, 0.0, -1, 1.0));
        assert!(matches!(err, Err(VpError::PointStoreOverrun { layer: 0, .. })));
    }
}
