//! Creativity / pulse section.
//!
//! Eye openness, landmark symmetry and a micro-expression flag. Scores in
//! this section are reported unsmoothed.

use super::{mean, present_intensities};
use crate::section::SectionScorer;
use crate::types::{normalize_intensity, ActionUnit, MeasurementRow, RowError};
use rand::RngCore;

/// Fallback for eye openness and symmetry when their inputs are unusable.
pub const NEUTRAL_METRIC: f64 = 0.5;

/// A normalized intensity above this on any expressive unit flags a
/// micro-expression.
pub const MICRO_EXPRESSION_THRESHOLD: f64 = 0.9;

const ASYMMETRY_SCALE: f64 = 10.0;
const LID_UNITS: [ActionUnit; 3] = [ActionUnit::AU01, ActionUnit::AU02, ActionUnit::AU05];
const EXPRESSIVE_UNITS: [ActionUnit; 4] = [
    ActionUnit::AU01,
    ActionUnit::AU02,
    ActionUnit::AU04,
    ActionUnit::AU12,
];
// "originalty" is the published key; clients depend on the spelling.
const SCORE_NAMES: &[&str] = &["ideation", "openness", "originalty", "attention"];

/// Eye openness in [0, 1].
///
/// Prefers the blink unit (AU45, inverted); otherwise the mean of AU01,
/// AU02 and AU05, which must all be present.
pub fn eye_openness(row: &MeasurementRow) -> f64 {
    let openness = || -> Result<f64, RowError> {
        if let Some(blink) = row.normalized(ActionUnit::AU45)? {
            return Ok(1.0 - blink);
        }
        let lids = present_intensities(row, &LID_UNITS)?;
        if lids.len() < LID_UNITS.len() {
            return Ok(NEUTRAL_METRIC);
        }
        Ok(mean(&lids).map_or(NEUTRAL_METRIC, normalize_intensity))
    };
    openness().unwrap_or_else(|e| {
        tracing::debug!(error = %e, "eye openness unavailable; using neutral value");
        NEUTRAL_METRIC
    })
}

/// Left/right landmark symmetry in [0, 1].
///
/// The midline is the mean x coordinate. Landmarks are paired from both
/// ends of the ordered list inwards; each pair contributes the difference
/// of its distances to the midline plus half its vertical offset.
pub fn facial_symmetry(landmarks: &[(f64, f64)]) -> f64 {
    if landmarks.is_empty() {
        return NEUTRAL_METRIC;
    }
    let midline = landmarks.iter().map(|&(x, _)| x).sum::<f64>() / landmarks.len() as f64;

    let asymmetries: Vec<f64> = landmarks
        .iter()
        .zip(landmarks.iter().rev())
        .take(landmarks.len() / 2)
        .map(|(&(lx, ly), &(rx, ry))| {
            ((lx - midline).abs() - (rx - midline).abs()).abs() + 0.5 * (ly - ry).abs()
        })
        .collect();

    match mean(&asymmetries) {
        Some(avg) => (1.0 - avg * ASYMMETRY_SCALE).max(0.0),
        None => NEUTRAL_METRIC,
    }
}

fn row_symmetry(row: &MeasurementRow) -> f64 {
    match row.landmarks() {
        Ok(Some(points)) => facial_symmetry(points),
        Ok(None) => NEUTRAL_METRIC,
        Err(e) => {
            tracing::debug!(error = %e, "landmarks unavailable; using neutral symmetry");
            NEUTRAL_METRIC
        }
    }
}

/// `[ideation, openness, originality, attention]` for one row.
pub fn raw_scores(row: &MeasurementRow) -> Result<[f64; 4], RowError> {
    let eyes = eye_openness(row);
    let symmetry = row_symmetry(row);

    let au01 = row.normalized_or_zero(ActionUnit::AU01)?;
    let au02 = row.normalized_or_zero(ActionUnit::AU02)?;
    let au04 = row.normalized_or_zero(ActionUnit::AU04)?;
    let au05 = row.normalized_or_zero(ActionUnit::AU05)?;
    let au06 = row.normalized_or_zero(ActionUnit::AU06)?;
    let au12 = row.normalized_or_zero(ActionUnit::AU12)?;

    let mut micro = 0.0;
    for au in EXPRESSIVE_UNITS {
        if row.normalized_or_zero(au)? > MICRO_EXPRESSION_THRESHOLD {
            micro = 1.0;
        }
    }

    let ideation = 0.2 * (au12 + au06) + 0.3 * eyes + 0.3 * micro;
    let openness = 0.3 * (au02 + au05) + 0.4 * symmetry;
    let originality = 0.4 * (1.0 - symmetry) + 0.3 * au12 + 0.3 * au01;
    let attention = 0.3 * eyes + 0.3 * (1.0 - symmetry) + 0.4 * au04;

    Ok([ideation, openness, originality, attention])
}

#[derive(Default)]
pub struct CreativityScorer;

impl SectionScorer for CreativityScorer {
    fn name(&self) -> &'static str {
        "creativity"
    }

    fn score_names(&self) -> &'static [&'static str] {
        SCORE_NAMES
    }

    fn score_row(
        &self,
        row: &MeasurementRow,
        _rng: &mut dyn RngCore,
    ) -> Result<Vec<f64>, RowError> {
        Ok(raw_scores(row)?.to_vec())
    }
}
