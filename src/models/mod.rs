// Domain models: samples, derived views, analysis reports

mod analysis;
mod sample;
mod view;

pub use analysis::{AnalysisResult, Severity};
pub use sample::{Sample, TimeRange, format_timestamp, parse_timestamp, round1, round2};
pub use view::{Incident, SeriesStats, SessionEvent, View};
