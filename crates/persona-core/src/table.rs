//! Measurement table loader.
//!
//! Reads the per-frame CSV written by the extractor. Column headers are
//! resolved once into a [`ColumnIndex`]; each record is then mapped onto a
//! [`MeasurementRow`] with explicit optional fields.

use crate::types::{ActionUnit, Gaze, MeasurementRow};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// Gaze headers in slot order: left x, left y, right x, right y.
const GAZE_COLUMNS: [&str; 4] = ["gaze_0_x", "gaze_0_y", "gaze_1_x", "gaze_1_y"];
const PITCH_COLUMN: &str = "pose_Rx";
const YAW_COLUMN: &str = "pose_Ry";

#[derive(Error, Debug)]
pub enum TableError {
    #[error("cannot open measurement table {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed measurement table: {0}")]
    Csv(#[from] csv::Error),
}

/// Header positions for every measurement the scorers understand.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnIndex {
    pub action_units: Vec<(ActionUnit, usize)>,
    /// Present only when all four gaze components are.
    pub gaze: Option<[usize; 4]>,
    pub pose_rx: Option<usize>,
    pub pose_ry: Option<usize>,
    /// `(x_i, y_i)` column positions ordered by landmark index `i`.
    pub landmarks: Vec<(usize, usize)>,
}

impl ColumnIndex {
    /// Resolve column positions from a header row.
    ///
    /// Names are compared after trimming, so both `" AU01_r"` and `"AU01_r"`
    /// resolve to the same column.
    pub fn resolve<'a>(headers: impl IntoIterator<Item = &'a str>) -> Self {
        let mut index = Self::default();
        let mut gaze = [None; 4];
        let mut xs = BTreeMap::new();
        let mut ys = BTreeMap::new();

        for (col, header) in headers.into_iter().enumerate() {
            let name = header.trim();
            if let Some(au) = ActionUnit::from_column(name) {
                index.action_units.push((au, col));
            } else if let Some(slot) = GAZE_COLUMNS.iter().position(|g| *g == name) {
                gaze[slot] = Some(col);
            } else if name == PITCH_COLUMN {
                index.pose_rx = Some(col);
            } else if name == YAW_COLUMN {
                index.pose_ry = Some(col);
            } else if let Some(i) = landmark_number(name, "x_") {
                xs.insert(i, col);
            } else if let Some(i) = landmark_number(name, "y_") {
                ys.insert(i, col);
            }
        }

        if let [Some(lx), Some(ly), Some(rx), Some(ry)] = gaze {
            index.gaze = Some([lx, ly, rx, ry]);
        }
        index.landmarks = xs
            .into_iter()
            .filter_map(|(i, x)| ys.get(&i).map(|&y| (x, y)))
            .collect();
        index
    }

    /// Map one CSV record onto a row. Unreadable cells become NaN.
    pub fn parse_record(&self, record: &csv::StringRecord) -> MeasurementRow {
        let cell = |col: usize| {
            record
                .get(col)
                .and_then(|s| s.trim().parse::<f64>().ok())
                .unwrap_or(f64::NAN)
        };

        let mut row = MeasurementRow::default();
        for &(au, col) in &self.action_units {
            row = row.with_action_unit(au, cell(col));
        }
        if let Some([lx, ly, rx, ry]) = self.gaze {
            row = row.with_gaze(Gaze {
                left: (cell(lx), cell(ly)),
                right: (cell(rx), cell(ry)),
            });
        }
        if let Some(col) = self.pose_rx {
            row = row.with_pitch(cell(col));
        }
        if let Some(col) = self.pose_ry {
            row = row.with_yaw(cell(col));
        }
        if !self.landmarks.is_empty() {
            row = row.with_landmarks(
                self.landmarks
                    .iter()
                    .map(|&(x, y)| (cell(x), cell(y)))
                    .collect(),
            );
        }
        row
    }
}

fn landmark_number(name: &str, prefix: &str) -> Option<usize> {
    let digits = name.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Ordered rows, one per analyzed frame. Row position is the frame index
/// reported as `top_image`.
#[derive(Debug, Clone, Default)]
pub struct MeasurementTable {
    columns: ColumnIndex,
    rows: Vec<MeasurementRow>,
}

impl MeasurementTable {
    /// Load a table from a CSV file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TableError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| TableError::Open {
            path: path.display().to_string(),
            source,
        })?;
        let table = Self::from_reader(file)?;
        tracing::debug!(
            path = %path.display(),
            rows = table.len(),
            action_units = table.columns.action_units.len(),
            landmarks = table.columns.landmarks.len(),
            "measurement table loaded"
        );
        Ok(table)
    }

    /// Parse a table from any CSV byte stream.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, TableError> {
        let mut csv = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let columns = ColumnIndex::resolve(csv.headers()?.iter());
        let mut rows = Vec::new();
        for record in csv.records() {
            rows.push(columns.parse_record(&record?));
        }

        Ok(Self { columns, rows })
    }

    /// Build a table directly from rows (no header information).
    pub fn from_rows(rows: Vec<MeasurementRow>) -> Self {
        Self {
            columns: ColumnIndex::default(),
            rows,
        }
    }

    pub fn columns(&self) -> &ColumnIndex {
        &self.columns
    }

    pub fn rows(&self) -> &[MeasurementRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RowError;

    const OPENFACE_HEADER: &str = "frame, face_id, timestamp, confidence, success, \
        gaze_0_x, gaze_0_y, gaze_0_z, gaze_1_x, gaze_1_y, gaze_1_z, \
        pose_Tx, pose_Rx, pose_Ry, pose_Rz, \
        x_0, x_1, x_2, y_0, y_1, y_2, eye_lmk_x_0, X_0, \
        AU01_r, AU06_r, AU12_r, AU45_r, AU06_c";

    #[test]
    fn test_resolve_openface_header() {
        let cols = ColumnIndex::resolve(OPENFACE_HEADER.split(','));
        assert_eq!(
            cols.action_units.iter().map(|(au, _)| *au).collect::<Vec<_>>(),
            vec![ActionUnit::AU01, ActionUnit::AU06, ActionUnit::AU12, ActionUnit::AU45]
        );
        assert_eq!(cols.gaze, Some([5, 6, 8, 9]));
        assert_eq!(cols.pose_rx, Some(12));
        assert_eq!(cols.pose_ry, Some(13));
        assert_eq!(cols.landmarks, vec![(15, 18), (16, 19), (17, 20)]);
    }

    #[test]
    fn test_partial_gaze_is_absent() {
        let cols = ColumnIndex::resolve([" gaze_0_x", " gaze_0_y", " gaze_1_x"]);
        assert_eq!(cols.gaze, None);
    }

    #[test]
    fn test_unpaired_landmarks_are_dropped() {
        let cols = ColumnIndex::resolve([" x_0", " x_1", " y_1", " y_5"]);
        assert_eq!(cols.landmarks, vec![(1, 2)]);
    }

    #[test]
    fn test_landmarks_ordered_by_number_not_position() {
        let cols = ColumnIndex::resolve([" x_10", " x_2", " y_2", " y_10"]);
        assert_eq!(cols.landmarks, vec![(1, 2), (0, 3)]);
    }

    #[test]
    fn test_from_reader_parses_rows() {
        let csv = "frame, AU06_r, AU12_r, pose_Rx\n1, 2.5, 2.5, 0.1\n2, 0.0, 5.0, -0.2\n";
        let table = MeasurementTable::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        let row = &table.rows()[0];
        assert_eq!(row.normalized(ActionUnit::AU06), Ok(Some(0.5)));
        assert_eq!(row.pitch_radians(), Ok(Some(0.1)));
        assert_eq!(row.yaw_radians(), Ok(None));
        assert_eq!(row.gaze(), Ok(None));
    }

    #[test]
    fn test_bad_cell_is_scoped_to_row() {
        let csv = " AU04_r\n1.0\nbogus\n";
        let table = MeasurementTable::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.rows()[0].action_unit(ActionUnit::AU04).is_ok());
        assert!(matches!(
            table.rows()[1].action_unit(ActionUnit::AU04),
            Err(RowError::NonFinite { .. })
        ));
    }

    #[test]
    fn test_short_record_tolerated() {
        let csv = " AU01_r, AU12_r\n1.0\n";
        let table = MeasurementTable::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.rows()[0].action_unit(ActionUnit::AU12).is_err());
    }

    #[test]
    fn test_header_only_table_is_empty() {
        let table = MeasurementTable::from_reader(" AU01_r\n".as_bytes()).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_missing_file_is_open_error() {
        let err = MeasurementTable::from_path("/nonexistent/persona/table.csv").unwrap_err();
        assert!(matches!(err, TableError::Open { .. }));
    }
}
