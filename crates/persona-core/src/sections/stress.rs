//! Stress / resilience section.

use super::{mean, present_intensities};
use crate::section::SectionScorer;
use crate::types::{normalize_intensity, ActionUnit, MeasurementRow, RowError};
use rand::RngCore;

/// Fallback for furrow and lip metrics when no usable unit is present.
pub const NEUTRAL_METRIC: f64 = 0.5;

/// Brow units in weighting order: inner raise, outer raise, lowerer.
const FOREHEAD_UNITS: [ActionUnit; 3] = [ActionUnit::AU01, ActionUnit::AU02, ActionUnit::AU04];
const LIP_UNITS: [ActionUnit; 3] = [ActionUnit::AU23, ActionUnit::AU24, ActionUnit::AU28];
const MOUTH_FALLBACK_UNITS: [ActionUnit; 4] = [
    ActionUnit::AU14,
    ActionUnit::AU15,
    ActionUnit::AU17,
    ActionUnit::AU20,
];
const SCORE_NAMES: &[&str] = &["emotional_regulation", "resilience_score"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StressMetrics {
    pub forehead_furrows: f64,
    pub lip_compression: f64,
}

/// Forehead furrow presence in [0, 1]. The brow lowerer dominates when
/// all three brow units are available.
pub fn forehead_furrows(row: &MeasurementRow) -> Result<f64, RowError> {
    let brows: Vec<f64> = present_intensities(row, &FOREHEAD_UNITS)?
        .into_iter()
        .map(normalize_intensity)
        .collect();
    Ok(match brows.as_slice() {
        [inner, outer, lowerer] => 0.6 * lowerer + 0.2 * inner + 0.2 * outer,
        other => mean(other).unwrap_or(NEUTRAL_METRIC),
    })
}

/// Lip compression in [0, 1], from the lip tighteners/pressors or, when
/// none are present, the wider mouth units.
pub fn lip_compression(row: &MeasurementRow) -> Result<f64, RowError> {
    let mut lips = present_intensities(row, &LIP_UNITS)?;
    if lips.is_empty() {
        lips = present_intensities(row, &MOUTH_FALLBACK_UNITS)?;
    }
    let normalized: Vec<f64> = lips.into_iter().map(normalize_intensity).collect();
    Ok(mean(&normalized).unwrap_or(NEUTRAL_METRIC))
}

pub fn stress_metrics(row: &MeasurementRow) -> StressMetrics {
    let or_neutral = |metric: &str, value: Result<f64, RowError>| {
        value.unwrap_or_else(|e| {
            tracing::debug!(metric, error = %e, "using neutral value");
            NEUTRAL_METRIC
        })
    };
    StressMetrics {
        forehead_furrows: or_neutral("forehead_furrows", forehead_furrows(row)),
        lip_compression: or_neutral("lip_compression", lip_compression(row)),
    }
}

/// Brow-lowerer dominated tension estimate in [0, 1].
pub fn stress_indicator(row: &MeasurementRow) -> Result<f64, RowError> {
    let au04 = row.normalized_or_zero(ActionUnit::AU04)?;
    let au24 = row.normalized_or_zero(ActionUnit::AU24)?;
    Ok(0.4 * au04 + 0.3 * au24 + 0.3 * au04)
}

/// `[emotional_regulation, resilience]` for one row.
pub fn raw_scores(row: &MeasurementRow) -> Result<[f64; 2], RowError> {
    let metrics = stress_metrics(row);
    let stress = stress_indicator(row)?;
    let au04 = row.normalized_or_zero(ActionUnit::AU04)?;
    let au12 = row.normalized_or_zero(ActionUnit::AU12)?;
    let au15 = row.normalized_or_zero(ActionUnit::AU15)?;

    let regulation =
        0.5 * (1.0 - metrics.forehead_furrows) + 0.3 * (1.0 - au04) + 0.2 * (1.0 - au15);
    let resilience = 0.4 * (1.0 - stress) + 0.4 * regulation + 0.2 * au12;

    Ok([regulation, resilience])
}

#[derive(Default)]
pub struct StressScorer;

impl SectionScorer for StressScorer {
    fn name(&self) -> &'static str {
        "stress"
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::run_section;
    use crate::table::MeasurementTable;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_furrows_weighted_with_all_brows() {
        let row = MeasurementRow::default()
            .with_action_unit(ActionUnit::AU01, 5.0)
            .with_action_unit(ActionUnit::AU02, 0.0)
            .with_action_unit(ActionUnit::AU04, 2.5);
        assert!(approx(forehead_furrows(&row).unwrap(), 0.5));
    }

    #[test]
    fn test_furrows_average_partial() {
        let row = MeasurementRow::default()
            .with_action_unit(ActionUnit::AU01, 5.0)
            .with_action_unit(ActionUnit::AU04, 2.5);
        assert!(approx(forehead_furrows(&row).unwrap(), 0.75));
        assert_eq!(forehead_furrows(&MeasurementRow::default()), Ok(NEUTRAL_METRIC));
    }

    #[test]
    fn test_lip_compression_fallback() {
        let primary = MeasurementRow::default()
            .with_action_unit(ActionUnit::AU23, 5.0)
            .with_action_unit(ActionUnit::AU14, 0.0);
        assert!(approx(lip_compression(&primary).unwrap(), 1.0));

        let fallback = MeasurementRow::default()
            .with_action_unit(ActionUnit::AU14, 1.0)
            .with_action_unit(ActionUnit::AU20, 2.0);
        assert!(approx(lip_compression(&fallback).unwrap(), 0.3));

        assert_eq!(lip_compression(&MeasurementRow::default()), Ok(NEUTRAL_METRIC));
    }

    #[test]
    fn test_stress_indicator_weights() {
        let row = MeasurementRow::default()
            .with_action_unit(ActionUnit::AU04, 5.0)
            .with_action_unit(ActionUnit::AU24, 0.0);
        assert!(approx(stress_indicator(&row).unwrap(), 0.7));
    }

    #[test]
    fn test_neutral_row_scores() {
        // furrows neutral 0.5, no stress
        let [regulation, resilience] = raw_scores(&MeasurementRow::default()).unwrap();
        assert!(approx(regulation, 0.75));
        assert!(approx(resilience, 0.4 + 0.4 * 0.75));
    }

    #[test]
    fn test_broken_furrow_input_uses_neutral_but_fails_row() {
        let row = MeasurementRow::default().with_action_unit(ActionUnit::AU02, f64::NAN);
        assert_eq!(stress_metrics(&row).forehead_furrows, NEUTRAL_METRIC);

        let bad_au04 = MeasurementRow::default().with_action_unit(ActionUnit::AU04, f64::NAN);
        assert!(raw_scores(&bad_au04).is_err());
    }

    #[test]
    fn test_section_keys() {
        let table = MeasurementTable::from_rows(vec![MeasurementRow::default()]);
        let mut rng = StdRng::seed_from_u64(0);
        let result = run_section(&StressScorer, &table, &mut rng);
        assert_eq!(result.get("emotional_regulation").unwrap().balance, "75.0%");
        assert_eq!(result.get("resilience_score").unwrap().top_image, 0);
    }
}
