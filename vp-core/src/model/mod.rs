/// Data model for polar volumes, scans, cells, points, and profiles.
///
/// Follows the source specification's structures closely: this module
/// defines the shapes, the subsystems in `crate::{geometry, cell, texture,
/// pointstore, dealias, vvpfit, profile_engine}` define the behavior over
/// them.
mod cell;
mod gatecode;
mod point;
mod profile;
mod scan;
mod volume;

pub use cell::{CellMap, CellProperty, CELL_FRINGE, CELL_FRINGE_RESERVED, CELL_ID_START, CELL_NONE};
pub use gatecode::GateCode;
pub use point::{Point, PointStore};
pub use profile::{LayerState, ProfileRow, ProfileSet};
pub use scan::{cyclic, Moment, PolarScan, Sample};
pub use volume::PolarVolume;
