use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local};

use crate::chart::{self, AxisRange};
use crate::csv_codec::{self, ImportReport};
use crate::customization::{self, ChartCustomization};
use crate::date_range::DateWindow;
use crate::db::Database;
use crate::error::ImportError;
use crate::gki::{self, GkiConfig, GkiPoint};
use crate::models::{
    Measurement, MeasurementType, NewMeasurement, NewMeasurementType, normalize_notes,
    parse_measurement_value,
};
use crate::store::{self, RecordStore};

/// Application-facing entry point over the SQLite store.
///
/// Opening a service seeds the default measurement types into an empty
/// database.
pub struct ChartbookService {
    db: Database,
    gki_config: GkiConfig,
}

impl ChartbookService {
    pub fn new(db_path: &Path) -> Result<Self> {
        let db = Database::open(db_path)?;
        Self::with_database(db)
    }

    pub fn new_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        Self::with_database(db)
    }

    fn with_database(db: Database) -> Result<Self> {
        store::seed_default_types(&db)?;
        Ok(Self {
            db,
            gki_config: GkiConfig::default(),
        })
    }

    #[must_use]
    pub fn with_gki_config(mut self, config: GkiConfig) -> Self {
        self.gki_config = config;
        self
    }

    pub fn seed_default_types(&self) -> Result<usize> {
        store::seed_default_types(&self.db)
    }

    // --- Measurement types ---

    pub fn list_measurement_types(&self) -> Result<Vec<MeasurementType>> {
        self.db.list_measurement_types()
    }

    pub fn add_measurement_type(&self, new_type: &NewMeasurementType) -> Result<MeasurementType> {
        let created = self.db.insert_measurement_type(new_type)?;
        tracing::info!(type_id = created.id, name = %created.name, "added measurement type");
        Ok(created)
    }

    /// Look a type up by its exact name.
    pub fn find_measurement_type(&self, name: &str) -> Result<MeasurementType> {
        self.db
            .get_measurement_type_by_name(name)?
            .with_context(|| format!("Unknown measurement type '{name}'"))
    }

    pub fn delete_measurement_type(&self, id: i64) -> Result<bool> {
        self.db.delete_measurement_type(id)
    }

    // --- Measurements ---

    /// Record one manually entered reading. `raw_value` is the text the user
    /// typed.
    pub fn log_measurement(
        &self,
        type_name: &str,
        raw_value: &str,
        timestamp: DateTime<Local>,
        notes: Option<String>,
    ) -> Result<Measurement> {
        let measurement_type = self.find_measurement_type(type_name)?;
        let value = parse_measurement_value(raw_value)?;
        self.db.insert_measurement(&NewMeasurement {
            type_id: measurement_type.id,
            value,
            timestamp,
            notes: normalize_notes(notes),
        })
    }

    pub fn get_measurement(&self, id: i64) -> Result<Measurement> {
        self.db.get_measurement(id)
    }

    pub fn delete_measurement(&self, id: i64) -> Result<()> {
        if !self.db.delete_measurement(id)? {
            bail!("Measurement {id} not found");
        }
        Ok(())
    }

    /// Readings inside `window`, optionally limited to one type, oldest first.
    pub fn list_measurements(
        &self,
        type_name: Option<&str>,
        window: &DateWindow,
    ) -> Result<Vec<Measurement>> {
        let type_id = type_name
            .map(|name| self.find_measurement_type(name).map(|t| t.id))
            .transpose()?;
        let all = self.db.list_measurements()?;
        let selected = match type_id {
            Some(id) => chart::series_for_type(&all, id, window),
            None => window.filter(&all),
        };
        Ok(selected.into_iter().cloned().collect())
    }

    /// Padded value axis for one type's chart inside `window`.
    pub fn chart_axis(&self, type_name: &str, window: &DateWindow) -> Result<AxisRange> {
        let series = self.list_measurements(Some(type_name), window)?;
        Ok(AxisRange::padded(series.iter().map(|m| m.value)))
    }

    // --- CSV exchange ---

    pub fn export_csv(&self) -> Result<String> {
        let measurements = self.db.list_measurements()?;
        Ok(csv_codec::export_csv(&measurements)?)
    }

    /// Write the export payload to `path` and return the number of rows.
    pub fn export_csv_file(&self, path: &Path) -> Result<usize> {
        let measurements = self.db.list_measurements()?;
        let file = File::create(path)
            .with_context(|| format!("Failed to create export file: {}", path.display()))?;
        let rows = csv_codec::write_export(&measurements, file)
            .with_context(|| format!("Failed to write export file: {}", path.display()))?;
        Ok(rows)
    }

    pub fn import_csv(&self, csv_data: &str) -> Result<ImportReport> {
        let types = self.db.list_measurement_types()?;
        Ok(csv_codec::import_csv_str(csv_data, &types, &self.db))
    }

    /// An unreadable file is reported like any other read failure, not
    /// returned as an error.
    pub fn import_csv_file(&self, path: &Path) -> Result<ImportReport> {
        let types = self.db.list_measurement_types()?;
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) => {
                let err = ImportError::from(err);
                tracing::warn!(error = %err, path = %path.display(), "could not open CSV file");
                return Ok(ImportReport::fatal(&err));
            }
        };
        Ok(csv_codec::import_csv(file, &types, &self.db))
    }

    // --- Derived series ---

    pub fn gki_series(&self, window: &DateWindow) -> Result<Vec<GkiPoint>> {
        let measurements = self.db.list_measurements()?;
        let types = self.db.list_measurement_types()?;
        Ok(gki::compute_gki(
            &measurements,
            &types,
            window,
            &self.gki_config,
        ))
    }

    /// The GKI point closest in time to `at`, as picked on the chart.
    pub fn gki_point_near(
        &self,
        window: &DateWindow,
        at: DateTime<Local>,
    ) -> Result<Option<GkiPoint>> {
        let points = self.gki_series(window)?;
        Ok(chart::nearest_point(&points, at).copied())
    }

    // --- Chart customization ---

    pub fn get_customization(&self, type_name: &str) -> Result<ChartCustomization> {
        let measurement_type = self.find_measurement_type(type_name)?;
        customization::customization_for(&self.db, measurement_type.id)
    }

    pub fn set_customization(&self, type_name: &str, settings: &ChartCustomization) -> Result<()> {
        let measurement_type = self.find_measurement_type(type_name)?;
        customization::save_customization(&self.db, measurement_type.id, settings)
    }
}
