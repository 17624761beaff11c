/// Shared vocabulary for the vertical-profile pipeline: moment name aliases,
/// profile types, and the gate-code bit-flag taxonomy.
use serde::{Deserialize, Serialize};

/// The three profile types the engine can compute. `NonBirds` is reserved by
/// the source format and always skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileType {
    /// Biological scatterers only.
    Birds = 1,
    /// Reserved, never computed.
    NonBirds = 2,
    /// All scatterers, including weather.
    All = 3,
}

impl ProfileType {
    /// Profile types computed by the engine, in required iteration order.
    pub const ACTIVE: [ProfileType; 2] = [ProfileType::All, ProfileType::Birds];

    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Which quantity a gate-inclusion decision is being made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityType {
    /// Reflectivity (dbz).
    Reflectivity = 0,
    /// Radial velocity (vrad).
    Velocity = 1,
}

/// Bit positions within a [`GateCode`](crate::GateFlag)-classified gate.
///
/// Kept as plain bit positions (not a `bitflags!` struct) because the source
/// taxonomy is exactly 8 independent yes/no predicates evaluated in a fixed
/// order; a plain `u8` with named shift constants mirrors that directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GateFlag {
    /// Bit 0: static clutter map.
    StaticClutter = 0,
    /// Bit 1: dynamic cluttermap, no fringe.
    DynamicClutter = 1,
    /// Bit 2: cluttermap fringe.
    DynamicClutterFringe = 2,
    /// Bit 3: vrad missing.
    VradMissing = 3,
    /// Bit 4: dbz too high to be birds.
    DbzTooHighForBirds = 4,
    /// Bit 5: |vrad| below vradMin.
    VradTooLow = 5,
    /// Bit 6: vrad deviates from fit beyond absVDifMax.
    VDifMax = 6,
    /// Bit 7: azimuth outside [azimMin, azimMax].
    AzimOutOfRange = 7,
}

impl GateFlag {
    pub const fn mask(self) -> u8 {
        1u8 << (self as u8)
    }
}

/// Preferred reflectivity moment-name aliases, in priority order.
pub const DBZ_ALIASES: [&str; 3] = ["__CONFIGURED__", "DBZH", "DBZV"];

/// Preferred radial-velocity moment-name aliases, in priority order.
pub const VRAD_ALIASES: [&str; 3] = ["VRAD", "VRADH", "VRADV"];

/// Correlation-coefficient moment name, required in dual-pol mode.
pub const RHOHV: &str = "RHOHV";

/// Synthesized per-scan parameter names the pipeline attaches to scans.
pub const CELL_PARAM: &str = "CELL";
pub const TEX_PARAM: &str = "TEX";
pub const CLUT_PARAM: &str = "CLUT";

/// Wavelength (cm) below which a radar is considered C-band for the purpose
/// of `stdDevMinBird` band defaults.
pub const C_BAND_MAX_WAVELENGTH_CM: f64 = 7.5;

/// Default `stdDevMinBird` for C-band radars (m/s).
pub const STD_DEV_MIN_BIRD_C_BAND: f64 = 2.0;

/// Default `stdDevMinBird` for S-band radars (m/s).
pub const STD_DEV_MIN_BIRD_S_BAND: f64 = 1.0;

/// Resolve the band-default `stdDevMinBird` for a radar wavelength.
pub fn default_std_dev_min_bird(wavelength_cm: f64) -> f64 {
    if wavelength_cm < C_BAND_MAX_WAVELENGTH_CM {
        STD_DEV_MIN_BIRD_C_BAND
    } else {
        STD_DEV_MIN_BIRD_S_BAND
    }
}
