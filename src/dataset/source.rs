use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Row};
use tracing::{debug, info};

use super::types::{CaseDescriptor, TrainingRow};
use crate::error::{Result, WeldError};

/// Anything that can hand the trainer a flat table of historical welds.
pub trait TrainingSource {
    fn training_rows(&self) -> Result<Vec<TrainingRow>>;
}

impl TrainingSource for Vec<TrainingRow> {
    fn training_rows(&self) -> Result<Vec<TrainingRow>> {
        Ok(self.clone())
    }
}

impl TrainingSource for [TrainingRow] {
    fn training_rows(&self) -> Result<Vec<TrainingRow>> {
        Ok(self.to_vec())
    }
}

/// Flat training table over the weld-parameter database.
/// Only rated welds are used for training.
const TRAINING_QUERY: &str = "
    SELECT wp.thickness,
           bm.carbon_content AS base_carbon,
           bm.thermal_conductivity AS base_thermal,
           bm.melting_point AS base_melting_point,
           bm.density AS base_density,
           fm.carbon_content AS filler_carbon,
           fm.thermal_conductivity AS filler_thermal,
           proc.code AS process,
           pos.code AS position,
           jt.name AS joint_type,
           wp.voltage,
           wp.amperage,
           wp.wire_feed_speed,
           wp.travel_speed
    FROM weld_parameters wp
    LEFT JOIN materials bm ON wp.base_material_id = bm.id
    LEFT JOIN materials fm ON wp.filler_material_id = fm.id
    LEFT JOIN joint_types jt ON wp.joint_type_id = jt.id
    LEFT JOIN welding_positions pos ON wp.position_id = pos.id
    LEFT JOIN welding_processes proc ON wp.process_id = proc.id
    WHERE wp.quality_rating IS NOT NULL";

/// Read-only view of the SQLite weld-parameter database.
/// All operations are synchronous (rusqlite is blocking).
pub struct SqliteTrainingSource {
    conn: Connection,
}

impl SqliteTrainingSource {
    /// Open an existing database read-only.
    ///
    /// A missing file is an error: the engine never creates the store.
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| {
                WeldError::DataSource(format!(
                    "Failed to open weld database at {:?}: {}",
                    db_path, e
                ))
            })?;
        info!("Opened weld database at {:?}", db_path);
        Ok(Self { conn })
    }

    /// Wrap an already-open connection (used by callers that own the store).
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }
}

impl TrainingSource for SqliteTrainingSource {
    fn training_rows(&self) -> Result<Vec<TrainingRow>> {
        let mut stmt = self
            .conn
            .prepare(TRAINING_QUERY)
            .map_err(|e| WeldError::DataSource(format!("Failed to prepare training query: {}", e)))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(TrainingRow {
                    case: CaseDescriptor {
                        thickness: real(row, 0)?,
                        base_carbon: real(row, 1)?,
                        base_thermal: real(row, 2)?,
                        base_melting_point: real(row, 3)?,
                        base_density: real(row, 4)?,
                        filler_carbon: real(row, 5)?,
                        filler_thermal: real(row, 6)?,
                        process: text(row, 7)?,
                        position: text(row, 8)?,
                        joint_type: text(row, 9)?,
                    },
                    voltage: real(row, 10)?,
                    amperage: real(row, 11)?,
                    wire_feed_speed: real(row, 12)?,
                    travel_speed: real(row, 13)?,
                })
            })
            .map_err(|e| WeldError::DataSource(format!("Failed to query training rows: {}", e)))?;

        let rows = rows
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| WeldError::DataSource(format!("Failed to collect training rows: {}", e)))?;

        info!("Loaded {} training rows from weld database", rows.len());
        Ok(rows)
    }
}

// SQLite columns are dynamically typed. A cell of the wrong type reads as
// NULL so the row is dropped downstream instead of failing the whole query.

fn real(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<f64>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Real(v) => Some(v),
        ValueRef::Integer(v) => Some(v as f64),
        ValueRef::Null => None,
        other => {
            debug!("Column {} holds {:?}, reading as NULL", idx, other.data_type());
            None
        }
    })
}

fn text(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<String>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Text(bytes) => std::str::from_utf8(bytes).ok().map(str::to_string),
        ValueRef::Integer(v) => Some(v.to_string()),
        ValueRef::Null => None,
        other => {
            debug!("Column {} holds {:?}, reading as NULL", idx, other.data_type());
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;
    use tempfile::TempDir;

    fn create_test_db(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("weld_parameters.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE materials (
                id INTEGER PRIMARY KEY, name TEXT NOT NULL, type TEXT NOT NULL,
                carbon_content REAL, thermal_conductivity REAL, melting_point REAL, density REAL
            );
            CREATE TABLE joint_types (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
            CREATE TABLE welding_positions (id INTEGER PRIMARY KEY, code TEXT NOT NULL, name TEXT NOT NULL);
            CREATE TABLE welding_processes (id INTEGER PRIMARY KEY, code TEXT NOT NULL, name TEXT NOT NULL);
            CREATE TABLE weld_parameters (
                id INTEGER PRIMARY KEY,
                base_material_id INTEGER, filler_material_id INTEGER, thickness REAL,
                joint_type_id INTEGER, position_id INTEGER, process_id INTEGER,
                voltage REAL, amperage REAL, wire_feed_speed REAL, travel_speed REAL,
                quality_rating INTEGER
            );
            INSERT INTO materials VALUES (1, 'Mild Steel', 'base', 0.25, 50, 1538, 7.85);
            INSERT INTO materials VALUES (2, 'ER70S-6', 'filler', 0.07, 50, 1520, 7.85);
            INSERT INTO joint_types VALUES (1, 'Butt Joint');
            INSERT INTO welding_positions VALUES (1, '1G', 'Flat Position');
            INSERT INTO welding_processes VALUES (1, 'GMAW', 'Gas Metal Arc Welding (MIG)');",
        )
        .unwrap();

        let insert = "INSERT INTO weld_parameters
            (base_material_id, filler_material_id, thickness, joint_type_id, position_id,
             process_id, voltage, amperage, wire_feed_speed, travel_speed, quality_rating)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)";
        conn.execute(insert, params![1, 2, 6.0, 1, 1, 1, 30.0, 280.0, 500.0, 7.0, 8])
            .unwrap();
        // Missing amperage: still a valid row for the other targets
        conn.execute(
            insert,
            params![1, 2, 3.0, 1, 1, 1, 24.0, Option::<f64>::None, 350.0, 8.5, 7],
        )
        .unwrap();
        // Unrated: excluded by the training query
        conn.execute(
            insert,
            params![1, 2, 10.0, 1, 1, 1, 38.0, 400.0, 700.0, 5.0, Option::<i64>::None],
        )
        .unwrap();
        // Unknown foreign keys: features come back NULL
        conn.execute(insert, params![9, 9, 4.0, 9, 9, 9, 22.0, 200.0, 400.0, 8.0, 6])
            .unwrap();
        path
    }

    #[test]
    fn test_reads_only_rated_rows() {
        let dir = TempDir::new().unwrap();
        let path = create_test_db(&dir);
        let source = SqliteTrainingSource::open(&path).unwrap();

        let rows = source.training_rows().unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.case.thickness != Some(10.0)));
    }

    #[test]
    fn test_joined_columns_populated() {
        let dir = TempDir::new().unwrap();
        let path = create_test_db(&dir);
        let source = SqliteTrainingSource::open(&path).unwrap();

        let rows = source.training_rows().unwrap();
        let first = rows.iter().find(|r| r.case.thickness == Some(6.0)).unwrap();
        assert_eq!(first.case.base_carbon, Some(0.25));
        assert_eq!(first.case.base_melting_point, Some(1538.0));
        assert_eq!(first.case.filler_carbon, Some(0.07));
        assert_eq!(first.case.process.as_deref(), Some("GMAW"));
        assert_eq!(first.case.position.as_deref(), Some("1G"));
        assert_eq!(first.case.joint_type.as_deref(), Some("Butt Joint"));
        assert_eq!(first.amperage, Some(280.0));
    }

    #[test]
    fn test_nullable_targets_and_features() {
        let dir = TempDir::new().unwrap();
        let path = create_test_db(&dir);
        let source = SqliteTrainingSource::open(&path).unwrap();

        let rows = source.training_rows().unwrap();
        let thin = rows.iter().find(|r| r.case.thickness == Some(3.0)).unwrap();
        assert_eq!(thin.amperage, None);
        assert_eq!(thin.voltage, Some(24.0));

        let orphan = rows.iter().find(|r| r.case.thickness == Some(4.0)).unwrap();
        assert_eq!(orphan.case.base_carbon, None);
        assert_eq!(orphan.case.process, None);
    }

    #[test]
    fn test_mistyped_cell_reads_as_null() {
        let dir = TempDir::new().unwrap();
        let path = create_test_db(&dir);
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute(
                "INSERT INTO weld_parameters
                    (base_material_id, filler_material_id, thickness, joint_type_id, position_id,
                     process_id, voltage, amperage, wire_feed_speed, travel_speed, quality_rating)
                 VALUES (1, 2, '', 1, 1, 1, 26.0, 'n/a', 420.0, 7.5, 5)",
                [],
            )
            .unwrap();
        }

        let source = SqliteTrainingSource::open(&path).unwrap();
        let rows = source.training_rows().unwrap();
        assert_eq!(rows.len(), 4);

        let blank = rows.iter().find(|r| r.voltage == Some(26.0)).unwrap();
        assert_eq!(blank.case.thickness, None);
        assert_eq!(blank.amperage, None);
        assert_eq!(blank.wire_feed_speed, Some(420.0));
        assert_eq!(blank.case.process.as_deref(), Some("GMAW"));
    }

    #[test]
    fn test_missing_database_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = SqliteTrainingSource::open(&dir.path().join("absent.db"));
        assert!(matches!(result, Err(WeldError::DataSource(_))));
    }

    #[test]
    fn test_in_memory_source() {
        let rows = vec![TrainingRow::default(), TrainingRow::default()];
        assert_eq!(rows.training_rows().unwrap().len(), 2);
    }
}
