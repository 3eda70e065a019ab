//! Relationship / empathy section.
//!
//! Gaze centering and an iris-openness proxy combined with smile (AU12),
//! cheek raise (AU06) and inner-brow raise (AU01).

use super::{mean, present_intensities};
use crate::section::SectionScorer;
use crate::smoothing::Smoother;
use crate::types::{normalize_intensity, ActionUnit, MeasurementRow, RowError};
use rand::RngCore;

/// Averaged gaze within this distance of zero on both axes counts as centered.
pub const GAZE_CENTER_TOLERANCE: f64 = 0.2;

const IRIS_SCALE: f64 = 0.5;
const LID_UNITS: [ActionUnit; 3] = [ActionUnit::AU01, ActionUnit::AU02, ActionUnit::AU05];
const SCORE_NAMES: &[&str] = &["trust", "openness", "Empathy", "ConflictAvoid"];

/// 1.0 when gaze is centered or unknown, 0.0 when averted.
pub fn gaze_indicator(row: &MeasurementRow) -> Result<f64, RowError> {
    Ok(match row.gaze()? {
        Some(g) if !g.is_centered(GAZE_CENTER_TOLERANCE) => 0.0,
        _ => 1.0,
    })
}

/// Iris-openness proxy in [0, 0.5].
///
/// Prefers the blink unit (AU45, inverted); otherwise the mean of the
/// brow/lid raisers that are present; otherwise 0.
pub fn iris_ratio(row: &MeasurementRow) -> Result<f64, RowError> {
    if let Some(blink) = row.normalized(ActionUnit::AU45)? {
        return Ok((1.0 - blink) * IRIS_SCALE);
    }
    let lids = present_intensities(row, &LID_UNITS)?;
    Ok(mean(&lids).map_or(0.0, |m| normalize_intensity(m) * IRIS_SCALE))
}

/// Unsmoothed `[trust, openness, empathy, conflict_avoidance]` for one row.
pub fn raw_scores(row: &MeasurementRow) -> Result<[f64; 4], RowError> {
    let gaze = gaze_indicator(row)?;
    let iris_score = ((iris_ratio(row)? + 1.0) / 2.0).clamp(0.0, 1.0);

    let au01 = row.normalized_or_zero(ActionUnit::AU01)?;
    let au06 = row.normalized_or_zero(ActionUnit::AU06)?;
    let au12 = row.normalized_or_zero(ActionUnit::AU12)?;

    let trust = 0.2 * (au06 + au12) + 0.4 * gaze + 0.2 * iris_score;
    let openness = 0.5 * au12 + 0.3 * au06 + 0.2 * gaze;
    let empathy = 0.5 * au01 + 0.3 * au06 + 0.2 * gaze;
    let conflict_avoidance = 0.5 * (1.0 - au12) + 0.3 * (1.0 - au06) + 0.2 * gaze;

    Ok([trust, openness, empathy, conflict_avoidance])
}

pub struct RelationshipScorer {
    pub smoother: Smoother,
}

impl Default for RelationshipScorer {
    fn default() -> Self {
        Self {
            smoother: Smoother::new(0.07, 0.03),
        }
    }
}

impl SectionScorer for RelationshipScorer {
    fn name(&self) -> &'static str {
        "relationship"
    }

    fn score_names(&self) -> &'static [&'static str] {
        SCORE_NAMES
    }

    fn score_row(
        &self,
        row: &MeasurementRow,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<f64>, RowError> {
        Ok(raw_scores(row)?
            .iter()
            .map(|&raw| self.smoother.apply(raw, rng))
            .collect())
    }
}
