/// Weather-cell detection, per-cell statistics, and fringe dilation
/// (spec.md §4.3-§4.5).
mod analyzer;
mod finder;
mod fringe;

pub use analyzer::CellAnalyzer;
pub use finder::CellFinder;
pub use fringe::FringeGrower;
