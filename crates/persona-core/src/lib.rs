//! persona-core: Behavioural scoring over facial action-unit tables.
//!
//! Consumes the per-frame measurement table written by an external
//! FeatureExtraction run (action-unit intensities, gaze, head pose,
//! landmarks) and derives four sections of normalized scores, each with
//! a representative frame index.

pub mod analyzer;
pub mod section;
pub mod sections;
pub mod smoothing;
pub mod table;
pub mod types;

pub use analyzer::{AnalysisReport, Analyzer, ScoringConfig};
pub use section::{ScoreSummary, SectionResult, SectionScorer};
pub use smoothing::Smoother;
pub use table::{ColumnIndex, MeasurementTable, TableError};
pub use types::{ActionUnit, Gaze, MeasurementRow, RowError};
