//! The four report sections.
//!
//! Each scorer derives one or two intermediate metrics per row, combines
//! them with fixed linear weights, and hands the per-row values to
//! [`run_section`](crate::section::run_section) for aggregation.

pub mod creativity;
pub mod relationship;
pub mod stress;
pub mod work_dna;

pub use creativity::CreativityScorer;
pub use relationship::RelationshipScorer;
pub use stress::StressScorer;
pub use work_dna::WorkDnaScorer;

use crate::types::{ActionUnit, MeasurementRow, RowError};

/// Raw intensities of whichever of `aus` the row carries, in `aus` order.
pub(crate) fn present_intensities(
    row: &MeasurementRow,
    aus: &[ActionUnit],
) -> Result<Vec<f64>, RowError> {
    aus.iter()
        .filter_map(|&au| row.action_unit(au).transpose())
        .collect()
}

pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
