/// Scan-level data structures: the polar raster view the rest of the
/// pipeline reads from.
use std::collections::HashMap;

use ndarray::Array2;

/// A moment sample at the read boundary, before collapsing to a plain `f32`
/// with `NAN` as the sentinel for the hot loops (see module docs on why both
/// representations coexist).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    Value(f64),
    Undetect,
    NoData,
}

impl Sample {
    /// Collapse to `Option<f64>`, folding `Undetect` and `NoData` to `None`.
    pub fn value(self) -> Option<f64> {
        match self {
            Sample::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_data(self) -> bool {
        matches!(self, Sample::Value(_))
    }
}

/// A single named moment raster (e.g. "DBZH", "VRADH"), holding raw encoded
/// samples plus the gain/offset/nodata/undetect needed to decode them.
#[derive(Debug, Clone)]
pub struct Moment {
    pub name: String,
    pub gain: f64,
    pub offset: f64,
    pub nodata: f64,
    pub undetect: f64,
    /// Raw encoded samples, shape `(n_azim, n_rang)`.
    pub raster: Array2<f32>,
}

impl Moment {
    pub fn new(name: impl Into<String>, gain: f64, offset: f64, raster: Array2<f32>) -> Self {
        Self {
            name: name.into(),
            gain,
            offset,
            nodata: f64::NAN,
            undetect: f64::NAN,
            raster,
        }
    }

    pub fn with_nodata(mut self, nodata: f64) -> Self {
        self.nodata = nodata;
        self
    }

    pub fn with_undetect(mut self, undetect: f64) -> Self {
        self.undetect = undetect;
        self
    }

    /// Decode a raw encoded value into a tri-state sample.
    pub fn decode(&self, raw: f32) -> Sample {
        let raw = raw as f64;
        if self.nodata.is_finite() && raw == self.nodata {
            Sample::NoData
        } else if self.undetect.is_finite() && raw == self.undetect {
            Sample::Undetect
        } else {
            Sample::Value(self.gain * raw + self.offset)
        }
    }

    /// Decode the sample at a given (azim, rang) index.
    pub fn get(&self, i_azim: usize, i_rang: usize) -> Sample {
        self.decode(self.raster[[i_azim, i_rang]])
    }

    /// Raw encoded value at a given index, before gain/offset decoding.
    pub fn raw(&self, i_azim: usize, i_rang: usize) -> f32 {
        self.raster[[i_azim, i_rang]]
    }

    pub fn shape(&self) -> (usize, usize) {
        let s = self.raster.shape();
        (s[0], s[1])
    }
}

/// One elevation sweep of a polar volume: a raster of range x azimuth gates
/// carrying zero or more named moments.
#[derive(Debug, Clone)]
pub struct PolarScan {
    /// Elevation angle, radians.
    pub elevation_rad: f64,
    /// Beam width, radians.
    pub beam_width_rad: f64,
    /// Antenna height above the radar site reference, meters.
    pub antenna_height_m: f64,
    /// Range-bin size, meters.
    pub range_bin_size_m: f64,
    /// Range of the first bin's center, meters.
    pub range_start_m: f64,
    pub n_azim: usize,
    pub n_rang: usize,
    /// Nyquist interval, if known at scan scope.
    pub nyquist: Option<f64>,
    /// Whether the radial-velocity moment on this scan has already been
    /// dealiased upstream (affects Nyquist inference in `ScanSelector`).
    pub vrad_is_dealiased: bool,
    pub moments: HashMap<String, Moment>,
}

impl PolarScan {
    pub fn new(
        elevation_rad: f64,
        beam_width_rad: f64,
        antenna_height_m: f64,
        range_bin_size_m: f64,
        range_start_m: f64,
        n_azim: usize,
        n_rang: usize,
    ) -> Self {
        Self {
            elevation_rad,
            beam_width_rad,
            antenna_height_m,
            range_bin_size_m,
            range_start_m,
            n_azim,
            n_rang,
            nyquist: None,
            vrad_is_dealiased: false,
            moments: HashMap::new(),
        }
    }

    pub fn insert_moment(&mut self, moment: Moment) {
        self.moments.insert(moment.name.clone(), moment);
    }

    pub fn get_moment(&self, name: &str) -> Option<&Moment> {
        self.moments.get(name)
    }

    pub fn get_moment_mut(&mut self, name: &str) -> Option<&mut Moment> {
        self.moments.get_mut(name)
    }

    pub fn has_moment(&self, name: &str) -> bool {
        self.moments.contains_key(name)
    }

    /// Range (meters) to the center of range bin `i_rang`.
    pub fn range_for_bin(&self, i_rang: usize) -> f64 {
        self.range_start_m + (i_rang as f64 + 0.5) * self.range_bin_size_m
    }

    /// Azimuth (degrees, [0,360)) at the center of ray `i_azim`.
    pub fn azim_for_ray(&self, i_azim: usize) -> f64 {
        (i_azim as f64 + 0.5) * 360.0 / self.n_azim as f64
    }

    /// Elevation in degrees, for convenience at the data-model boundary.
    pub fn elevation_deg(&self) -> f64 {
        self.elevation_rad.to_degrees()
    }
}

/// Cyclic index wrap for the azimuth dimension: ray 0 is adjacent to ray
/// `n-1`.
pub fn cyclic(i: i64, n: usize) -> usize {
    let n = n as i64;
    (((i % n) + n) % n) as usize
}
