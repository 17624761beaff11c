/// Extracts a vertical profile of biological scatterers (birds, insects) from
/// a polar radar volume, following the same per-scan segmentation, per-layer
/// VVP wind fit, and bird/weather separation approach as the vol2bird
/// algorithm.
pub mod cell;
pub mod classify;
pub mod config;
pub mod dealias;
pub mod derived;
pub mod error;
pub mod geometry;
pub mod model;
pub mod points;
pub mod profile_engine;
pub mod scan_select;
pub mod segmentation;
pub mod texture;
pub mod vvpfit;

pub use cell::{CellAnalyzer, CellFinder, FringeGrower};
pub use classify::classify_points;
pub use config::VpConfig;
pub use dealias::{DealiasInput, Dealiaser};
pub use derived::DerivedConstants;
pub use error::{Result, VpError};
pub use geometry::Geometry;
pub use points::{collect_scan, layer_capacities};
pub use profile_engine::ProfileEngine;
pub use scan_select::{DropReason, ScanDecision, ScanSelection, ScanSelector};
pub use segmentation::{SegmentationClassifier, SegmentationMoments};
pub use texture::compute_texture;
pub use vvpfit::VvpFit;
