use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Upper end of the extractor's action-unit intensity scale.
pub const AU_INTENSITY_MAX: f64 = 5.0;

/// Map a raw intensity in [0, 5] onto [0, 1], capping out-of-range readings.
pub fn normalize_intensity(value: f64) -> f64 {
    (value / AU_INTENSITY_MAX).clamp(0.0, 1.0)
}

/// Facial Action Coding System unit number (e.g. 12 = lip corner puller).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActionUnit(pub u8);

impl ActionUnit {
    pub const AU01: Self = Self(1);
    pub const AU02: Self = Self(2);
    pub const AU04: Self = Self(4);
    pub const AU05: Self = Self(5);
    pub const AU06: Self = Self(6);
    pub const AU12: Self = Self(12);
    pub const AU14: Self = Self(14);
    pub const AU15: Self = Self(15);
    pub const AU17: Self = Self(17);
    pub const AU20: Self = Self(20);
    pub const AU23: Self = Self(23);
    pub const AU24: Self = Self(24);
    pub const AU25: Self = Self(25);
    pub const AU26: Self = Self(26);
    pub const AU28: Self = Self(28);
    pub const AU45: Self = Self(45);

    /// Intensity column header as written by the extractor, leading space included.
    pub fn column(&self) -> String {
        format!(" AU{:02}_r", self.0)
    }

    /// Parse an intensity header (`AUnn_r`, surrounding whitespace ignored).
    ///
    /// Presence columns (`AUnn_c`) and anything else return `None`.
    pub fn from_column(header: &str) -> Option<Self> {
        let digits = header.trim().strip_prefix("AU")?.strip_suffix("_r")?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().map(Self)
    }
}

impl fmt::Display for ActionUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AU{:02}", self.0)
    }
}

/// Per-eye gaze direction vectors (x, y components).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gaze {
    pub left: (f64, f64),
    pub right: (f64, f64),
}

impl Gaze {
    /// Mean of the two eye vectors.
    pub fn average(&self) -> (f64, f64) {
        (
            (self.left.0 + self.right.0) / 2.0,
            (self.left.1 + self.right.1) / 2.0,
        )
    }

    /// True when both averaged components lie within `tolerance` of zero.
    pub fn is_centered(&self, tolerance: f64) -> bool {
        let (x, y) = self.average();
        x.abs() <= tolerance && y.abs() <= tolerance
    }
}

/// A single row could not be turned into metrics.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowError {
    #[error("non-finite value in column {column:?}")]
    NonFinite { column: String },
}

fn finite(value: f64, column: impl FnOnce() -> String) -> Result<f64, RowError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(RowError::NonFinite { column: column() })
    }
}

/// One analyzed frame.
///
/// Every measurement is optional: a column missing from the table leaves
/// the field `None` for all rows. A column that exists but holds an
/// unreadable cell is stored as NaN and reported as [`RowError`] by the
/// accessors, so the failure is scoped to this row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementRow {
    action_units: BTreeMap<ActionUnit, f64>,
    gaze: Option<Gaze>,
    pose_rx: Option<f64>,
    pose_ry: Option<f64>,
    landmarks: Option<Vec<(f64, f64)>>,
}

impl MeasurementRow {
    pub fn with_action_unit(mut self, au: ActionUnit, intensity: f64) -> Self {
        self.action_units.insert(au, intensity);
        self
    }

    pub fn with_gaze(mut self, gaze: Gaze) -> Self {
        self.gaze = Some(gaze);
        self
    }

    /// Head pitch (`pose_Rx`) in radians.
    pub fn with_pitch(mut self, radians: f64) -> Self {
        self.pose_rx = Some(radians);
        self
    }

    /// Head yaw (`pose_Ry`) in radians.
    pub fn with_yaw(mut self, radians: f64) -> Self {
        self.pose_ry = Some(radians);
        self
    }

    pub fn with_landmarks(mut self, landmarks: Vec<(f64, f64)>) -> Self {
        self.landmarks = Some(landmarks);
        self
    }

    pub fn has_action_unit(&self, au: ActionUnit) -> bool {
        self.action_units.contains_key(&au)
    }

    /// Raw intensity on the extractor's [0, 5] scale.
    pub fn action_unit(&self, au: ActionUnit) -> Result<Option<f64>, RowError> {
        self.action_units
            .get(&au)
            .map(|&v| finite(v, || au.column()))
            .transpose()
    }

    /// Intensity mapped onto [0, 1].
    pub fn normalized(&self, au: ActionUnit) -> Result<Option<f64>, RowError> {
        Ok(self.action_unit(au)?.map(normalize_intensity))
    }

    /// Normalized intensity, 0.0 when the column is absent.
    pub fn normalized_or_zero(&self, au: ActionUnit) -> Result<f64, RowError> {
        Ok(self.normalized(au)?.unwrap_or(0.0))
    }

    pub fn gaze(&self) -> Result<Option<Gaze>, RowError> {
        let Some(g) = self.gaze else {
            return Ok(None);
        };
        for v in [g.left.0, g.left.1, g.right.0, g.right.1] {
            finite(v, || "gaze".to_string())?;
        }
        Ok(Some(g))
    }

    pub fn pitch_radians(&self) -> Result<Option<f64>, RowError> {
        self.pose_rx
            .map(|v| finite(v, || " pose_Rx".to_string()))
            .transpose()
    }

    pub fn yaw_radians(&self) -> Result<Option<f64>, RowError> {
        self.pose_ry
            .map(|v| finite(v, || " pose_Ry".to_string()))
            .transpose()
    }

    /// Landmark (x, y) pairs ordered by landmark index.
    pub fn landmarks(&self) -> Result<Option<&[(f64, f64)]>, RowError> {
        let Some(points) = self.landmarks.as_deref() else {
            return Ok(None);
        };
        for (i, &(x, y)) in points.iter().enumerate() {
            finite(x, || format!(" x_{i}"))?;
            finite(y, || format!(" y_{i}"))?;
        }
        Ok(Some(points))
    }
}
