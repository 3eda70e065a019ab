//! Full-report entry point.

use crate::section::{run_section, SectionResult};
use crate::sections::{CreativityScorer, RelationshipScorer, StressScorer, WorkDnaScorer};
use crate::smoothing::Smoother;
use crate::table::MeasurementTable;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

/// Scoring parameters. Deserializable so it can be loaded from a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Pin the smoothing draws. `None` seeds each report from entropy.
    pub seed: Option<u64>,
    pub relationship_smoothing: Smoother,
    pub work_dna_smoothing: Smoother,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            seed: None,
            relationship_smoothing: Smoother::new(0.07, 0.03),
            work_dna_smoothing: Smoother::new(0.07, 0.05),
        }
    }
}

/// The four sections of one analysis, keyed as the response expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub section1: SectionResult,
    pub section2: SectionResult,
    pub section3: SectionResult,
    pub section4: SectionResult,
}

impl AnalysisReport {
    pub fn sections(&self) -> [&SectionResult; 4] {
        [&self.section1, &self.section2, &self.section3, &self.section4]
    }
}

/// Runs all four section scorers over a table. Holds no per-request state
/// and can be shared between concurrent requests.
pub struct Analyzer {
    config: ScoringConfig,
    relationship: RelationshipScorer,
    work_dna: WorkDnaScorer,
    creativity: CreativityScorer,
    stress: StressScorer,
}

impl Analyzer {
    pub fn new(config: ScoringConfig) -> Self {
        Self {
            relationship: RelationshipScorer {
                smoother: config.relationship_smoothing,
            },
            work_dna: WorkDnaScorer {
                smoother: config.work_dna_smoothing,
            },
            creativity: CreativityScorer,
            stress: StressScorer,
            config,
        }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score a table with a fresh random source for this call.
    pub fn analyze(&self, table: &MeasurementTable) -> AnalysisReport {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.analyze_with_rng(table, &mut rng)
    }

    /// Score a table drawing smoothing jitter from `rng`.
    pub fn analyze_with_rng(
        &self,
        table: &MeasurementTable,
        rng: &mut dyn RngCore,
    ) -> AnalysisReport {
        let report = AnalysisReport {
            section1: run_section(&self.relationship, table, rng),
            section2: run_section(&self.work_dna, table, rng),
            section3: run_section(&self.creativity, table, rng),
            section4: run_section(&self.stress, table, rng),
        };

        let failed = report.sections().iter().filter(|s| s.is_error()).count();
        tracing::info!(rows = table.len(), failed_sections = failed, "analysis complete");
        report
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
frame, gaze_0_x, gaze_0_y, gaze_1_x, gaze_1_y, pose_Rx, pose_Ry, x_0, x_1, x_2, y_0, y_1, y_2, AU01_r, AU02_r, AU04_r, AU06_r, AU12_r, AU15_r, AU24_r, AU25_r, AU26_r, AU45_r
1, 0.05, 0.10, 0.02, 0.08, 0.05, 0.10, 10.0, 20.0, 30.0, 40.0, 45.0, 40.0, 0.5, 0.2, 0.0, 2.5, 3.0, 0.1, 0.0, 0.4, 0.2, 0.3
2, 0.40, 0.30, 0.35, 0.25, -0.20, 0.40, 11.0, 20.0, 31.0, 41.0, 46.0, 40.0, 2.0, 1.8, 3.5, 0.2, 0.1, 1.2, 2.2, 1.5, 2.0, 1.0
3, 0.01, 0.00, 0.00, 0.01, 0.00, 0.00, 10.0, 20.0, 30.0, 40.0, 45.0, 40.0, 4.8, 4.9, 0.3, 4.0, 4.7, 0.0, 0.0, 0.0, 0.0, 0.0
";

    fn sample() -> MeasurementTable {
        MeasurementTable::from_reader(SAMPLE.as_bytes()).unwrap()
    }

    #[test]
    fn test_report_has_four_scored_sections() {
        let report = Analyzer::default().analyze(&sample());
        for section in report.sections() {
            assert!(!section.is_error(), "{section:?}");
        }
        let json = serde_json::to_value(&report).unwrap();
        assert!(json["section1"]["trust"]["balance"].as_str().unwrap().ends_with('%'));
        assert!(json["section2"]["Persistant"]["top_image"].as_u64().unwrap() < 3);
        assert!(json["section3"]["originalty"].is_object());
        assert!(json["section4"]["resilience_score"].is_object());
    }

    #[test]
    fn test_seeded_reports_are_reproducible() {
        let config = ScoringConfig {
            seed: Some(42),
            ..ScoringConfig::default()
        };
        let analyzer = Analyzer::new(config);
        let table = sample();
        assert_eq!(analyzer.analyze(&table), analyzer.analyze(&table));
    }

    #[test]
    fn test_zero_jitter_is_deterministic_without_seed() {
        let config = ScoringConfig {
            seed: None,
            relationship_smoothing: Smoother::deterministic(),
            work_dna_smoothing: Smoother::deterministic(),
        };
        let analyzer = Analyzer::new(config);
        let table = sample();
        assert_eq!(analyzer.analyze(&table), analyzer.analyze(&table));
    }

    #[test]
    fn test_empty_table_errors_every_section() {
        let report = Analyzer::default().analyze(&MeasurementTable::default());
        let sections = report.sections();
        let errors: Vec<&str> = sections.iter().filter_map(|s| s.error()).collect();
        assert_eq!(errors.len(), 4);
        assert!(errors[0].starts_with("relationship section"));
        assert!(errors[3].starts_with("stress section"));
        let distinct: std::collections::HashSet<&str> = errors.iter().copied().collect();
        assert_eq!(distinct.len(), 4);
    }

    #[test]
    fn test_section_failure_is_isolated() {
        // A broken pose cell fails section 2 rows only; section 3 treats
        // the frame normally.
        let csv = "pose_Rx, AU12_r\nnan?, 2.0\n";
        let table = MeasurementTable::from_reader(csv.as_bytes()).unwrap();
        let report = Analyzer::default().analyze(&table);
        assert!(report.section2.is_error());
        assert!(!report.section1.is_error());
        assert!(!report.section3.is_error());
        assert!(!report.section4.is_error());
    }

    #[test]
    fn test_top_image_of_smile_heavy_frame() {
        let report = Analyzer::default().analyze(&sample());
        // frame 3 has the strongest AU06/AU12 and centered gaze
        assert_eq!(report.section1.get("openness").unwrap().top_image, 2);
        // frame 2 carries the brow lowerer
        assert_eq!(report.section3.get("attention").unwrap().top_image, 1);
    }

    #[test]
    fn test_config_from_toml() {
        let config: ScoringConfig = toml::from_str(
            "seed = 7\n[work_dna_smoothing]\nhigh_jitter = 0.0\n",
        )
        .unwrap();
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.work_dna_smoothing.high_jitter, 0.0);
        assert_eq!(config.work_dna_smoothing.low_jitter, 0.07);
        assert_eq!(config.relationship_smoothing, Smoother::new(0.07, 0.03));
    }
}
