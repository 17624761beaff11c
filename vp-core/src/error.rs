/// Error types for the vertical-profile pipeline.
use thiserror::Error;

/// Result type alias for vp-core operations.
pub type Result<T> = std::result::Result<T, VpError>;

/// Main error type for vp-core operations.
///
/// Only structural failures are represented here. Per-scan moment gaps and
/// per-layer numerical failures (VVP chisq below threshold, simplex
/// non-convergence, azimuth gaps) are *not* errors: they localize to the
/// affected scan or layer and surface as `NODATA`/`UNDETECT` fields and a
/// `log::warn!` record instead of a `Result::Err`.
#[derive(Error, Debug)]
pub enum VpError {
    /// Configuration value failed validation before any allocation happened.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// No scan in the volume survived `ScanSelector`; the run returns an
    /// all-`NODATA` profile set alongside this error.
    #[error("no scans in the volume qualify for processing")]
    NoUsableScans,

    /// A volume-wide required moment (reflectivity or radial velocity) is
    /// absent from every scan.
    #[error("required moment '{0}' is not present on any scan in the volume")]
    MissingRequiredMoment(String),

    /// `PointStore` would have written past a layer's reserved index range.
    #[error("point store overrun at layer {layer}: wrote past index {index_to}")]
    PointStoreOverrun { layer: usize, index_to: usize },

    /// More candidate cells were produced than the cell map's identifier
    /// space can represent.
    #[error("cell count exceeds capacity: {0} candidate cells")]
    CellCountOverflow(usize),

    /// A scan or volume index was out of range.
    #[error("invalid scan index: {0}")]
    InvalidScanIndex(usize),

    /// `segmentation.mistnet_elevs` does not have as many entries as the
    /// configured classifier expects.
    #[error("segmentation classifier expects {expected} elevations, but {got} are configured")]
    SegmentationElevationMismatch { expected: usize, got: usize },

    /// The classifier returned a tensor of the wrong shape to back-project.
    #[error("segmentation classifier output shape {got:?} does not match the expected {expected:?}")]
    SegmentationOutputShapeMismatch { expected: (usize, usize, usize, usize), got: (usize, usize, usize, usize) },
}

impl From<String> for VpError {
    fn from(s: String) -> Self {
        VpError::Config(s)
    }
}

impl From<&str> for VpError {
    fn from(s: &str) -> Self {
        VpError::Config(s.to_string())
    }
}
