//! The storage collaborator the exchange and derivation code runs against.
//!
//! [`Database`](crate::db::Database) is the SQLite backend; [`MemoryStore`]
//! keeps everything in process and is what most unit tests use.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use anyhow::{Result, bail};
use chrono::Local;
use uuid::Uuid;

use crate::customization::CustomizationRecord;
use crate::models::{
    Measurement, MeasurementType, NewMeasurement, NewMeasurementType, default_measurement_types,
    validate_measurement_type,
};

pub trait RecordStore {
    /// All measurement types, oldest first.
    fn list_measurement_types(&self) -> Result<Vec<MeasurementType>>;

    /// All measurements, each joined with its type when the reference resolves.
    fn list_measurements(&self) -> Result<Vec<Measurement>>;

    fn insert_measurement_type(&self, new_type: &NewMeasurementType) -> Result<MeasurementType>;

    /// Persist a batch as one unit: either every measurement is stored or none is.
    fn insert_measurements(&self, batch: &[NewMeasurement]) -> Result<Vec<Measurement>>;

    fn get_customization(&self, type_id: i64) -> Result<Option<CustomizationRecord>>;

    fn upsert_customization(&self, record: &CustomizationRecord) -> Result<()>;
}

/// Insert the default types into a store that has none. Returns how many
/// were created.
pub fn seed_default_types<S: RecordStore + ?Sized>(store: &S) -> Result<usize> {
    if !store.list_measurement_types()?.is_empty() {
        return Ok(0);
    }
    let defaults = default_measurement_types();
    for new_type in &defaults {
        store.insert_measurement_type(new_type)?;
    }
    tracing::info!(count = defaults.len(), "seeded default measurement types");
    Ok(defaults.len())
}

#[derive(Default)]
struct MemoryState {
    types: Vec<MeasurementType>,
    // (type_id, measurement without its joined type)
    measurements: Vec<(i64, Measurement)>,
    customizations: HashMap<i64, CustomizationRecord>,
    next_id: i64,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-process [`RecordStore`]. Deleting a type cascades to its measurements.
#[derive(Default)]
pub struct MemoryStore {
    state: RefCell<MemoryState>,
    fail_next_commit: Cell<bool>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next [`RecordStore::insert_measurements`] call fail without
    /// storing anything.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.set(true);
    }

    pub fn delete_measurement_type(&self, type_id: i64) -> bool {
        let mut state = self.state.borrow_mut();
        let before = state.types.len();
        state.types.retain(|t| t.id != type_id);
        state.measurements.retain(|(owner, _)| *owner != type_id);
        state.customizations.remove(&type_id);
        state.types.len() != before
    }

    #[must_use]
    pub fn measurement_count(&self) -> usize {
        self.state.borrow().measurements.len()
    }
}

impl RecordStore for MemoryStore {
    fn list_measurement_types(&self) -> Result<Vec<MeasurementType>> {
        Ok(self.state.borrow().types.clone())
    }

    fn list_measurements(&self) -> Result<Vec<Measurement>> {
        let state = self.state.borrow();
        Ok(state
            .measurements
            .iter()
            .map(|(type_id, m)| Measurement {
                measurement_type: state.types.iter().find(|t| t.id == *type_id).cloned(),
                ..m.clone()
            })
            .collect())
    }

    fn insert_measurement_type(&self, new_type: &NewMeasurementType) -> Result<MeasurementType> {
        validate_measurement_type(new_type)?;
        let mut state = self.state.borrow_mut();
        let id = state.next_id();
        let created = MeasurementType {
            id,
            uuid: Uuid::new_v4().to_string(),
            name: new_type.name.clone(),
            unit: new_type.unit.clone(),
            color_hex: new_type.color_hex.clone(),
            emoji: new_type.emoji.clone(),
            is_system_type: new_type.is_system_type,
            created_at: Local::now(),
        };
        state.types.push(created.clone());
        Ok(created)
    }

    fn insert_measurements(&self, batch: &[NewMeasurement]) -> Result<Vec<Measurement>> {
        if self.fail_next_commit.replace(false) {
            bail!("simulated commit failure");
        }
        if batch.iter().any(|m| m.value.is_nan()) {
            bail!("Measurement value must be a number");
        }
        let mut state = self.state.borrow_mut();
        if let Some(missing) = batch
            .iter()
            .find(|m| !state.types.iter().any(|t| t.id == m.type_id))
        {
            bail!("Measurement type {} not found", missing.type_id);
        }

        let mut inserted = Vec::with_capacity(batch.len());
        for new in batch {
            let id = state.next_id();
            let measurement = Measurement {
                id,
                uuid: Uuid::new_v4().to_string(),
                value: new.value,
                timestamp: new.timestamp,
                notes: new.notes.clone(),
                measurement_type: None,
            };
            state.measurements.push((new.type_id, measurement.clone()));
            inserted.push(Measurement {
                measurement_type: state.types.iter().find(|t| t.id == new.type_id).cloned(),
                ..measurement
            });
        }
        Ok(inserted)
    }

    fn get_customization(&self, type_id: i64) -> Result<Option<CustomizationRecord>> {
        Ok(self.state.borrow().customizations.get(&type_id).cloned())
    }

    fn upsert_customization(&self, record: &CustomizationRecord) -> Result<()> {
        self.state
            .borrow_mut()
            .customizations
            .insert(record.type_id, record.clone());
        Ok(())
    }
}
