use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use crate::customization::CustomizationRecord;
use crate::models::{
    Measurement, MeasurementType, NewMeasurement, NewMeasurementType, validate_measurement_type,
};
use crate::store::RecordStore;

const MEASUREMENT_COLUMNS: &str = "m.id, m.uuid, m.value, m.timestamp, m.notes,
     t.id, t.uuid, t.name, t.unit, t.color_hex, t.emoji, t.is_system_type, t.created_at";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS measurement_types (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL UNIQUE,
                    name TEXT NOT NULL,
                    unit TEXT NOT NULL,
                    color_hex TEXT NOT NULL,
                    emoji TEXT,
                    is_system_type INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS measurements (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL UNIQUE,
                    type_id INTEGER NOT NULL REFERENCES measurement_types(id) ON DELETE CASCADE,
                    value REAL NOT NULL,
                    timestamp TEXT NOT NULL,
                    notes TEXT
                );

                CREATE TABLE IF NOT EXISTS chart_customizations (
                    type_id INTEGER PRIMARY KEY REFERENCES measurement_types(id) ON DELETE CASCADE,
                    point_size REAL NOT NULL,
                    point_color_hex TEXT NOT NULL,
                    show_points INTEGER NOT NULL,
                    show_line INTEGER NOT NULL,
                    line_color_hex TEXT NOT NULL,
                    line_width REAL NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_measurements_type ON measurements(type_id);
                CREATE INDEX IF NOT EXISTS idx_measurements_timestamp ON measurements(timestamp);
                CREATE INDEX IF NOT EXISTS idx_measurement_types_name ON measurement_types(name);

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    // --- Row mapping helpers ---

    // Expects the type columns starting at `base`:
    // id, uuid, name, unit, color_hex, emoji, is_system_type, created_at
    fn measurement_type_at(row: &rusqlite::Row, base: usize) -> rusqlite::Result<MeasurementType> {
        Ok(MeasurementType {
            id: row.get(base)?,
            uuid: row.get(base + 1)?,
            name: row.get(base + 2)?,
            unit: row.get(base + 3)?,
            color_hex: row.get(base + 4)?,
            emoji: row.get(base + 5)?,
            is_system_type: row.get(base + 6)?,
            created_at: timestamp_from_sql(row, base + 7)?,
        })
    }

    fn measurement_type_from_row(row: &rusqlite::Row) -> rusqlite::Result<MeasurementType> {
        Self::measurement_type_at(row, 0)
    }

    // Expects MEASUREMENT_COLUMNS. The joined type is absent when the
    // LEFT JOIN found nothing.
    fn measurement_from_row(row: &rusqlite::Row) -> rusqlite::Result<Measurement> {
        let type_id: Option<i64> = row.get(5)?;
        let measurement_type = match type_id {
            Some(_) => Some(Self::measurement_type_at(row, 5)?),
            None => None,
        };
        Ok(Measurement {
            id: row.get(0)?,
            uuid: row.get(1)?,
            value: row.get(2)?,
            timestamp: timestamp_from_sql(row, 3)?,
            notes: row.get(4)?,
            measurement_type,
        })
    }

    fn customization_from_row(row: &rusqlite::Row) -> rusqlite::Result<CustomizationRecord> {
        Ok(CustomizationRecord {
            type_id: row.get(0)?,
            point_size: row.get(1)?,
            point_color_hex: row.get(2)?,
            show_points: row.get(3)?,
            show_line: row.get(4)?,
            line_color_hex: row.get(5)?,
            line_width: row.get(6)?,
        })
    }

    // --- Measurement types ---

    pub fn get_measurement_type(&self, id: i64) -> Result<MeasurementType> {
        self.conn
            .query_row(
                "SELECT id, uuid, name, unit, color_hex, emoji, is_system_type, created_at
                 FROM measurement_types WHERE id = ?1",
                params![id],
                Self::measurement_type_from_row,
            )
            .context("Measurement type not found")
    }

    /// First type with exactly this name, if any.
    pub fn get_measurement_type_by_name(&self, name: &str) -> Result<Option<MeasurementType>> {
        let found = self
            .conn
            .query_row(
                "SELECT id, uuid, name, unit, color_hex, emoji, is_system_type, created_at
                 FROM measurement_types WHERE name = ?1 ORDER BY id LIMIT 1",
                params![name],
                Self::measurement_type_from_row,
            )
            .optional()?;
        Ok(found)
    }

    /// Deleting a type also deletes its measurements and chart settings.
    pub fn delete_measurement_type(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM measurement_types WHERE id = ?1", params![id])?;
        if rows > 0 {
            tracing::info!(type_id = id, "deleted measurement type");
        }
        Ok(rows > 0)
    }

    // --- Measurements ---

    pub fn get_measurement(&self, id: i64) -> Result<Measurement> {
        Self::measurement_by_id(&self.conn, id)
    }

    fn measurement_by_id(conn: &Connection, id: i64) -> Result<Measurement> {
        conn.query_row(
            &format!(
                "SELECT {MEASUREMENT_COLUMNS}
                 FROM measurements m
                 LEFT JOIN measurement_types t ON t.id = m.type_id
                 WHERE m.id = ?1"
            ),
            params![id],
            Self::measurement_from_row,
        )
        .context("Measurement not found")
    }

    pub fn insert_measurement(&self, new: &NewMeasurement) -> Result<Measurement> {
        self.insert_measurements(std::slice::from_ref(new))?
            .pop()
            .context("Measurement not found after insert")
    }

    pub fn delete_measurement(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM measurements WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    /// Readings of one type, newest first.
    pub fn measurements_for_type(&self, type_id: i64) -> Result<Vec<Measurement>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MEASUREMENT_COLUMNS}
             FROM measurements m
             LEFT JOIN measurement_types t ON t.id = m.type_id
             WHERE m.type_id = ?1
             ORDER BY m.timestamp DESC, m.id DESC"
        ))?;
        let measurements = stmt
            .query_map(params![type_id], Self::measurement_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(measurements)
    }
}

impl RecordStore for Database {
    fn list_measurement_types(&self) -> Result<Vec<MeasurementType>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, uuid, name, unit, color_hex, emoji, is_system_type, created_at
             FROM measurement_types ORDER BY id",
        )?;
        let types = stmt
            .query_map([], Self::measurement_type_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(types)
    }

    fn list_measurements(&self) -> Result<Vec<Measurement>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MEASUREMENT_COLUMNS}
             FROM measurements m
             LEFT JOIN measurement_types t ON t.id = m.type_id
             ORDER BY m.timestamp, m.id"
        ))?;
        let measurements = stmt
            .query_map([], Self::measurement_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(measurements)
    }

    fn insert_measurement_type(&self, new_type: &NewMeasurementType) -> Result<MeasurementType> {
        validate_measurement_type(new_type)?;
        let now = timestamp_to_sql(&Local::now());
        let uuid = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO measurement_types (uuid, name, unit, color_hex, emoji, is_system_type, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                uuid,
                new_type.name,
                new_type.unit,
                new_type.color_hex,
                new_type.emoji,
                new_type.is_system_type,
                now,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_measurement_type(id)
    }

    fn insert_measurements(&self, batch: &[NewMeasurement]) -> Result<Vec<Measurement>> {
        let tx = self.conn.unchecked_transaction()?;
        let mut ids = Vec::with_capacity(batch.len());
        for new in batch {
            tx.execute(
                "INSERT INTO measurements (uuid, type_id, value, timestamp, notes)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    Uuid::new_v4().to_string(),
                    new.type_id,
                    new.value,
                    timestamp_to_sql(&new.timestamp),
                    new.notes,
                ],
            )
            .with_context(|| format!("Failed to insert measurement for type {}", new.type_id))?;
            ids.push(tx.last_insert_rowid());
        }
        let inserted = ids
            .into_iter()
            .map(|id| Self::measurement_by_id(&tx, id))
            .collect::<Result<Vec<_>>>()?;
        tx.commit()?;
        tracing::debug!(count = inserted.len(), "inserted measurements");
        Ok(inserted)
    }

    fn get_customization(&self, type_id: i64) -> Result<Option<CustomizationRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT type_id, point_size, point_color_hex, show_points, show_line,
                        line_color_hex, line_width
                 FROM chart_customizations WHERE type_id = ?1",
                params![type_id],
                Self::customization_from_row,
            )
            .optional()?;
        Ok(record)
    }

    fn upsert_customization(&self, record: &CustomizationRecord) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO chart_customizations
                    (type_id, point_size, point_color_hex, show_points, show_line, line_color_hex, line_width)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(type_id) DO UPDATE SET
                    point_size = excluded.point_size,
                    point_color_hex = excluded.point_color_hex,
                    show_points = excluded.show_points,
                    show_line = excluded.show_line,
                    line_color_hex = excluded.line_color_hex,
                    line_width = excluded.line_width",
                params![
                    record.type_id,
                    record.point_size,
                    record.point_color_hex,
                    record.show_points,
                    record.show_line,
                    record.line_color_hex,
                    record.line_width,
                ],
            )
            .with_context(|| format!("Failed to save chart settings for type {}", record.type_id))?;
        Ok(())
    }
}

// Stored as UTC RFC 3339 so text ordering matches time ordering.
fn timestamp_to_sql(at: &DateTime<Local>) -> String {
    at.with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn timestamp_from_sql(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Local>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Local))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_codec::{export_csv, import_csv_str};
    use crate::customization::{ChartCustomization, Color, customization_for, save_customization};
    use crate::store::seed_default_types;
    use chrono::TimeZone;

    fn local(d: u32, h: u32, min: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, d, h, min, 0).earliest().unwrap()
    }

    fn steps_type(db: &Database) -> MeasurementType {
        db.insert_measurement_type(&NewMeasurementType::new("Steps", "count"))
            .unwrap()
    }

    fn new_reading(type_id: i64, value: f64, at: DateTime<Local>) -> NewMeasurement {
        NewMeasurement {
            type_id,
            value,
            timestamp: at,
            notes: None,
        }
    }

    #[test]
    fn test_insert_and_get_measurement_type() {
        let db = Database::open_in_memory().unwrap();
        let mut new_type = NewMeasurementType::new("Blood Pressure", "mmHg");
        new_type.emoji = Some("❤️".to_string());
        new_type.color_hex = "FF0000".to_string();
        let created = db.insert_measurement_type(&new_type).unwrap();

        assert_eq!(created.name, "Blood Pressure");
        assert_eq!(created.unit, "mmHg");
        assert_eq!(created.emoji.as_deref(), Some("❤️"));
        assert!(!created.is_system_type);
        assert!(!created.uuid.is_empty());

        let fetched = db.get_measurement_type(created.id).unwrap();
        assert_eq!(fetched, created);
    }

    #[test]
    fn test_insert_measurement_type_rejects_invalid() {
        let db = Database::open_in_memory().unwrap();
        let mut bad = NewMeasurementType::new("Steps", "count");
        bad.color_hex = "nope".to_string();
        assert!(db.insert_measurement_type(&bad).is_err());
        assert!(db.list_measurement_types().unwrap().is_empty());
    }

    #[test]
    fn test_get_measurement_type_by_name_first_match() {
        let db = Database::open_in_memory().unwrap();
        let first = steps_type(&db);
        steps_type(&db);
        let found = db.get_measurement_type_by_name("Steps").unwrap().unwrap();
        assert_eq!(found.id, first.id);
        assert!(db.get_measurement_type_by_name("steps").unwrap().is_none());
    }

    #[test]
    fn test_seed_defaults() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(seed_default_types(&db).unwrap(), 3);
        let types = db.list_measurement_types().unwrap();
        let names: Vec<&str> = types.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Glucose", "Ketones", "Weight"]);
        assert!(types.iter().all(|t| t.is_system_type));
        assert_eq!(seed_default_types(&db).unwrap(), 0);
    }

    #[test]
    fn test_measurement_timestamp_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let t = steps_type(&db);
        let at = local(4, 7, 30);
        let m = db
            .insert_measurement(&NewMeasurement {
                type_id: t.id,
                value: 8123.0,
                timestamp: at,
                notes: Some("walk".to_string()),
            })
            .unwrap();

        assert_eq!(m.timestamp, at);
        assert_eq!(m.value, 8123.0);
        assert_eq!(m.notes.as_deref(), Some("walk"));
        assert_eq!(m.measurement_type.as_ref().unwrap().name, "Steps");

        let fetched = db.get_measurement(m.id).unwrap();
        assert_eq!(fetched.timestamp, at);
    }

    #[test]
    fn test_list_measurements_oldest_first() {
        let db = Database::open_in_memory().unwrap();
        let t = steps_type(&db);
        db.insert_measurements(&[
            new_reading(t.id, 3.0, local(3, 8, 0)),
            new_reading(t.id, 1.0, local(1, 8, 0)),
            new_reading(t.id, 2.0, local(2, 8, 0)),
        ])
        .unwrap();

        let values: Vec<f64> = db
            .list_measurements()
            .unwrap()
            .iter()
            .map(|m| m.value)
            .collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);

        let newest_first: Vec<f64> = db
            .measurements_for_type(t.id)
            .unwrap()
            .iter()
            .map(|m| m.value)
            .collect();
        assert_eq!(newest_first, vec![3.0, 2.0, 1.0]);
    }

    #[test]
    fn test_insert_measurements_is_atomic() {
        let db = Database::open_in_memory().unwrap();
        let t = steps_type(&db);
        let result = db.insert_measurements(&[
            new_reading(t.id, 1.0, local(1, 8, 0)),
            new_reading(t.id + 100, 2.0, local(1, 9, 0)),
        ]);
        assert!(result.is_err());
        assert!(db.list_measurements().unwrap().is_empty());
    }

    #[test]
    fn test_insert_measurements_returns_stored_rows() {
        let db = Database::open_in_memory().unwrap();
        let t = steps_type(&db);
        let inserted = db
            .insert_measurements(&[
                new_reading(t.id, 1.0, local(1, 8, 0)),
                new_reading(t.id, 2.0, local(2, 8, 0)),
            ])
            .unwrap();
        let listed = db.list_measurements().unwrap();
        assert_eq!(inserted.len(), 2);
        for (returned, stored) in inserted.iter().zip(&listed) {
            assert_eq!(returned.id, stored.id);
            assert_eq!(returned.uuid, stored.uuid);
            assert_eq!(returned.timestamp, stored.timestamp);
            assert!(returned.belongs_to(t.id));
        }
    }

    #[test]
    fn test_import_skips_nan_row_and_keeps_the_rest() {
        let db = Database::open_in_memory().unwrap();
        seed_default_types(&db).unwrap();
        let types = db.list_measurement_types().unwrap();
        let csv = "Date,Time,Measurement Type,Value,Unit,Notes\n\
                   2025-03-01,08:00:00,Glucose,95.5,mg/dL,\n\
                   2025-03-01,09:00:00,Ketones,NaN,mmol/L,\n\
                   2025-03-01,10:00:00,Glucose,99,mg/dL,\n";
        let report = import_csv_str(csv, &types, &db);
        assert_eq!(report.success_count, 2);
        assert_eq!(report.error_count, 1);
        assert_eq!(report.messages, vec!["Row 2: Invalid value 'NaN'".to_string()]);
        assert_eq!(db.list_measurements().unwrap().len(), 2);
    }

    #[test]
    fn test_delete_measurement() {
        let db = Database::open_in_memory().unwrap();
        let t = steps_type(&db);
        let m = db
            .insert_measurement(&new_reading(t.id, 1.0, local(1, 8, 0)))
            .unwrap();
        assert!(db.delete_measurement(m.id).unwrap());
        assert!(!db.delete_measurement(m.id).unwrap());
        assert!(db.get_measurement(m.id).is_err());
    }

    #[test]
    fn test_delete_type_cascades() {
        let db = Database::open_in_memory().unwrap();
        let t = steps_type(&db);
        db.insert_measurement(&new_reading(t.id, 1.0, local(1, 8, 0)))
            .unwrap();
        save_customization(&db, t.id, &ChartCustomization::default()).unwrap();

        assert!(db.delete_measurement_type(t.id).unwrap());
        assert!(db.list_measurements().unwrap().is_empty());
        assert!(db.get_customization(t.id).unwrap().is_none());
        assert!(!db.delete_measurement_type(t.id).unwrap());
    }

    #[test]
    fn test_customization_defaults_and_upsert() {
        let db = Database::open_in_memory().unwrap();
        let t = steps_type(&db);
        assert_eq!(
            customization_for(&db, t.id).unwrap(),
            ChartCustomization::default()
        );

        let mut settings = ChartCustomization {
            point_size: 12.0,
            point_color: Color::from_rgb8(0xFF, 0x6B, 0x6B),
            show_points: false,
            ..ChartCustomization::default()
        };
        save_customization(&db, t.id, &settings).unwrap();
        let loaded = customization_for(&db, t.id).unwrap();
        assert_eq!(loaded.point_size, 12.0);
        assert!(!loaded.show_points);
        assert_eq!(loaded.point_color.to_hex(), "FF6B6B");

        settings.line_width = 4.0;
        save_customization(&db, t.id, &settings).unwrap();
        let record = db.get_customization(t.id).unwrap().unwrap();
        assert_eq!(record.line_width, 4.0);
        assert_eq!(record.point_color_hex, "FF6B6B");
    }

    #[test]
    fn test_csv_round_trip_through_database() {
        let db = Database::open_in_memory().unwrap();
        seed_default_types(&db).unwrap();
        let glucose = db.get_measurement_type_by_name("Glucose").unwrap().unwrap();
        db.insert_measurements(&[
            NewMeasurement {
                type_id: glucose.id,
                value: 95.0,
                timestamp: local(5, 7, 15),
                notes: Some("fasting".to_string()),
            },
            new_reading(glucose.id, 110.5, local(5, 12, 0)),
        ])
        .unwrap();

        let csv = export_csv(&db.list_measurements().unwrap()).unwrap();

        let other = Database::open_in_memory().unwrap();
        seed_default_types(&other).unwrap();
        let types = other.list_measurement_types().unwrap();
        let report = import_csv_str(&csv, &types, &other);
        assert_eq!(report.success_count, 2);
        assert_eq!(report.error_count, 0);

        let imported = other.list_measurements().unwrap();
        assert_eq!(imported.len(), 2);
        assert_eq!(imported[0].value, 95.0);
        assert_eq!(imported[0].timestamp, local(5, 7, 15));
        assert_eq!(imported[0].notes.as_deref(), Some("fasting"));
        assert_eq!(imported[1].notes, None);
    }
}
