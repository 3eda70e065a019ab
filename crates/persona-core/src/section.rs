//! Section scorer seam and the shared aggregation step.

use crate::table::MeasurementTable;
use crate::types::{MeasurementRow, RowError};
use rand::RngCore;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;

/// One block of the report: a fixed set of named scores derived per row.
pub trait SectionScorer {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Output keys, in report order.
    fn score_names(&self) -> &'static [&'static str];

    /// Score a single row. Returns one value per entry of
    /// [`score_names`](Self::score_names), in the same order.
    fn score_row(&self, row: &MeasurementRow, rng: &mut dyn RngCore)
        -> Result<Vec<f64>, RowError>;
}

/// Per-row values of a single named score, tagged with the table row each
/// value came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreSeries {
    pub name: &'static str,
    rows: Vec<usize>,
    values: Vec<f64>,
}

impl ScoreSeries {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            rows: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn push(&mut self, row: usize, value: f64) {
        self.rows.push(row);
        self.values.push(value);
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Unweighted mean of the series.
    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
    }

    /// Table row holding the maximal value; ties go to the earliest row.
    pub fn top_row(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (&row, &value) in self.rows.iter().zip(&self.values) {
            match best {
                Some((_, b)) if value <= b => {}
                _ => best = Some((row, value)),
            }
        }
        best.map(|(row, _)| row)
    }

    pub fn summarize(&self) -> Option<ScoreSummary> {
        let mean = self.mean().filter(|m| m.is_finite())?;
        Some(ScoreSummary {
            balance: format_balance(mean),
            top_image: self.top_row()?,
        })
    }
}

/// `0.7` → `"70.0%"`.
pub fn format_balance(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, Deserialize)]
pub struct ScoreSummary {
    pub balance: String,
    pub top_image: usize,
}

/// Outcome of one section. A failed section never affects its siblings.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionResult {
    Scores(Vec<(String, ScoreSummary)>),
    Error(String),
}

impl SectionResult {
    pub fn get(&self, name: &str) -> Option<&ScoreSummary> {
        match self {
            Self::Scores(scores) => scores.iter().find(|(n, _)| n == name).map(|(_, s)| s),
            Self::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Scores(_) => None,
            Self::Error(msg) => Some(msg),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl Serialize for SectionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Scores(scores) => {
                let mut map = serializer.serialize_map(Some(scores.len()))?;
                for (name, summary) in scores {
                    map.serialize_entry(name, summary)?;
                }
                map.end()
            }
            Self::Error(msg) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("error", msg)?;
                map.end()
            }
        }
    }
}

/// Score every row of `table`, skipping rows that fail, then aggregate.
pub fn run_section(
    scorer: &dyn SectionScorer,
    table: &MeasurementTable,
    rng: &mut dyn RngCore,
) -> SectionResult {
    let mut series: Vec<ScoreSeries> = scorer
        .score_names()
        .iter()
        .copied()
        .map(ScoreSeries::new)
        .collect();
    let mut skipped = 0usize;

    for (i, row) in table.rows().iter().enumerate() {
        match scorer.score_row(row, rng) {
            Ok(values) => {
                for (s, v) in series.iter_mut().zip(values) {
                    s.push(i, v);
                }
            }
            Err(e) => {
                skipped += 1;
                tracing::warn!(section = scorer.name(), row = i, error = %e, "row skipped");
            }
        }
    }

    tracing::debug!(
        section = scorer.name(),
        scored = table.len() - skipped,
        skipped,
        "section scored"
    );

    if series.iter().all(ScoreSeries::is_empty) {
        return SectionResult::Error(format!(
            "{} section: no valid rows could be scored",
            scorer.name()
        ));
    }
    aggregate(&series)
}

/// Reduce each series to its mean and top row.
pub fn aggregate(series: &[ScoreSeries]) -> SectionResult {
    let mut scores = Vec::with_capacity(series.len());
    for s in series {
        let Some(summary) = s.summarize() else {
            return SectionResult::Error(format!("failed to aggregate {}", s.name));
        };
        scores.push((s.name.to_string(), summary));
    }
    SectionResult::Scores(scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ActionUnit;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Emits AU12 normalized; fails rows where AU12 is missing.
    struct Au12Scorer;

    impl SectionScorer for Au12Scorer {
        fn name(&self) -> &'static str {
            "au12"
        }

        fn score_names(&self) -> &'static [&'static str] {
            &["smile", "inverse"]
        }

        fn score_row(
            &self,
            row: &MeasurementRow,
            _rng: &mut dyn RngCore,
        ) -> Result<Vec<f64>, RowError> {
            let v = row
                .normalized(ActionUnit::AU12)?
                .ok_or_else(|| RowError::NonFinite { column: "missing".into() })?;
            Ok(vec![v, 1.0 - v])
        }
    }

    fn series(values: &[f64]) -> ScoreSeries {
        let mut s = ScoreSeries::new("x");
        for (i, &v) in values.iter().enumerate() {
            s.push(i, v);
        }
        s
    }

    #[test]
    fn test_top_row_first_max_wins() {
        assert_eq!(series(&[0.2, 0.8, 0.8, 0.1]).top_row(), Some(1));
        assert_eq!(series(&[0.5]).top_row(), Some(0));
        assert_eq!(series(&[]).top_row(), None);
    }

    #[test]
    fn test_balance_format() {
        assert_eq!(format_balance(0.7), "70.0%");
        assert_eq!(format_balance(0.1234), "12.3%");
        assert_eq!(series(&[0.5, 0.6]).summarize().unwrap().balance, "55.0%");
    }

    #[test]
    fn test_skipped_rows_keep_table_index() {
        let table = MeasurementTable::from_rows(vec![
            MeasurementRow::default(),
            MeasurementRow::default().with_action_unit(ActionUnit::AU12, 1.0),
            MeasurementRow::default().with_action_unit(ActionUnit::AU12, 4.0),
        ]);
        let mut rng = StdRng::seed_from_u64(0);
        let result = run_section(&Au12Scorer, &table, &mut rng);
        assert_eq!(result.get("smile").unwrap().top_image, 2);
        assert_eq!(result.get("inverse").unwrap().top_image, 1);
        assert_eq!(result.get("smile").unwrap().balance, "50.0%");
    }

    #[test]
    fn test_no_valid_rows_is_section_error() {
        let table = MeasurementTable::from_rows(vec![MeasurementRow::default()]);
        let mut rng = StdRng::seed_from_u64(0);
        let result = run_section(&Au12Scorer, &table, &mut rng);
        assert_eq!(result.error(), Some("au12 section: no valid rows could be scored"));

        let empty = MeasurementTable::default();
        assert!(run_section(&Au12Scorer, &empty, &mut rng).is_error());
    }

    #[test]
    fn test_serialize_preserves_order() {
        let result = SectionResult::Scores(vec![
            ("zeta".into(), ScoreSummary { balance: "1.0%".into(), top_image: 0 }),
            ("alpha".into(), ScoreSummary { balance: "2.0%".into(), top_image: 3 }),
        ]);
        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(
            json,
            r#"{"zeta":{"balance":"1.0%","top_image":0},"alpha":{"balance":"2.0%","top_image":3}}"#
        );
    }

    #[test]
    fn test_serialize_error() {
        let json = serde_json::to_value(SectionResult::Error("boom".into())).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "boom" }));
    }
}
