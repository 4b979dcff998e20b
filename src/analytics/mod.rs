// Pure projections over a filtered view: summary statistics and incident windows.
// Both are recomputed from scratch whenever the view or threshold changes.

pub mod incidents;
pub mod stats;

pub use incidents::detect_incidents;
pub use stats::compute_stats;
