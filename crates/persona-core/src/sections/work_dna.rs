//! Work-DNA / focus section.
//!
//! Head pitch and an approximate jaw angle (yaw plus jaw-drop units)
//! combined with brow and cheek action units.

use crate::section::SectionScorer;
use crate::smoothing::Smoother;
use crate::types::{ActionUnit, MeasurementRow, RowError};
use rand::RngCore;

/// Jaw angle, in degrees, of a neutral frontal face.
pub const NEUTRAL_JAW_ANGLE: f64 = 100.0;

const YAW_WEIGHT: f64 = 0.5;
const JAW_DROP_SCALE: f64 = 10.0;
const JAW_TOLERANCE: f64 = 40.0;
const JAW_RANGE: f64 = 140.0;
const PITCH_TOLERANCE: f64 = 30.0;
const RISK_PITCH_DEG: f64 = 5.0;
const RISK_JAW_DEG: f64 = 120.0;
const SCORE_NAMES: &[&str] = &["Persistant", "Focus", "Structure", "Risk"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadPose {
    pub pitch_deg: f64,
    pub jaw_angle: f64,
}

/// Pitch in degrees (0 without `pose_Rx`) and the jaw-angle estimate.
pub fn head_pose(row: &MeasurementRow) -> Result<HeadPose, RowError> {
    let pitch_deg = row.pitch_radians()?.map_or(0.0, f64::to_degrees);

    let mut jaw_angle = match row.yaw_radians()? {
        Some(yaw) => NEUTRAL_JAW_ANGLE + yaw.abs().to_degrees() * YAW_WEIGHT,
        None => NEUTRAL_JAW_ANGLE,
    };
    if let (Some(lips_part), Some(jaw_drop)) = (
        row.normalized(ActionUnit::AU25)?,
        row.normalized(ActionUnit::AU26)?,
    ) {
        jaw_angle += (lips_part + 2.0 * jaw_drop) * JAW_DROP_SCALE;
    }

    Ok(HeadPose {
        pitch_deg,
        jaw_angle,
    })
}

/// Unsmoothed `[persistence, focus, structure, risk]` for one row.
pub fn raw_scores(row: &MeasurementRow) -> Result<[f64; 4], RowError> {
    let pose = head_pose(row)?;
    let au01 = row.normalized_or_zero(ActionUnit::AU01)?;
    let au02 = row.normalized_or_zero(ActionUnit::AU02)?;
    let au04 = row.normalized_or_zero(ActionUnit::AU04)?;
    let au06 = row.normalized_or_zero(ActionUnit::AU06)?;

    let level_head = 1.0 - pose.pitch_deg.abs() / PITCH_TOLERANCE;
    let neutral_jaw = 1.0 - (pose.jaw_angle - NEUTRAL_JAW_ANGLE).abs() / JAW_TOLERANCE;
    let flag = |hit: bool| if hit { 1.0 } else { 0.0 };

    let persistence = 0.3 * neutral_jaw + 0.4 * level_head + 0.3 * ((au01 + au06) / 2.0);
    let focus = 0.4 * level_head + 0.2 * (au01 + au02 + au06);
    let structure = 0.6 * (pose.jaw_angle / JAW_RANGE) + 0.4 * level_head;
    let risk = 0.4 * flag(pose.pitch_deg > RISK_PITCH_DEG)
        + 0.3 * flag(pose.jaw_angle > RISK_JAW_DEG)
        + 0.3 * au04;

    Ok([persistence, focus, structure, risk])
}

pub struct WorkDnaScorer {
    pub smoother: Smoother,
}

impl Default for WorkDnaScorer {
    fn default() -> Self {
        Self {
            smoother: Smoother::new(0.07, 0.05),
        }
    }
}

impl SectionScorer for WorkDnaScorer {
    fn name(&self) -> &'static str {
        "work_dna"
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
