/// Volume-level data structures.
use super::scan::PolarScan;

/// A complete polar volume: an ordered sequence of scans by ascending
/// elevation, plus site metadata.
#[derive(Debug, Clone)]
pub struct PolarVolume {
    pub longitude_deg: f64,
    pub latitude_deg: f64,
    pub height_m: f64,
    /// Radar wavelength, centimeters. Overrides the configured default when
    /// present.
    pub wavelength_cm: Option<f64>,
    pub frequency_hz: Option<f64>,
    /// Volume Coverage Pattern (NEXRAD), if applicable.
    pub vcp: Option<i32>,
    /// Volume-scope Nyquist interval, used when a scan doesn't carry its own.
    pub nyquist: Option<f64>,
    /// Scans in ascending elevation order.
    pub scans: Vec<PolarScan>,
}

impl PolarVolume {
    pub fn new(longitude_deg: f64, latitude_deg: f64, height_m: f64) -> Self {
        Self {
            longitude_deg,
            latitude_deg,
            height_m,
            wavelength_cm: None,
            frequency_hz: None,
            vcp: None,
            nyquist: None,
            scans: Vec::new(),
        }
    }

    pub fn num_scans(&self) -> usize {
        self.scans.len()
    }

    pub fn push_scan(&mut self, scan: PolarScan) {
        self.scans.push(scan);
    }
}
