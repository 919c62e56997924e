use std::collections::HashSet;

use serde_json::Value;

use crate::domain::{Incident, ValidationWarning};
use crate::error::AppError;
use crate::storage::KeyValueStorage;
use crate::validate::validate_stored_incident;

/// Slot holding the serialized collection. A change to the record shape gets a new key
/// instead of an in-place migration.
pub const STORAGE_KEY: &str = "incidents_data_v1";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub incidents: Vec<Incident>,
    pub warnings: Vec<ValidationWarning>,
}

/// Reads and writes the whole incident collection as one JSON array under a fixed key.
pub struct PersistenceAdapter<S> {
    storage: S,
    key: String,
}

impl<S: KeyValueStorage> PersistenceAdapter<S> {
    pub fn new(storage: S) -> Self {
        Self::with_key(storage, STORAGE_KEY)
    }

    pub fn with_key(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Load the stored collection. Never fails: unreadable storage, non-JSON values and
    /// non-array roots all degrade to an empty collection.
    pub fn load(&self) -> Vec<Incident> {
        self.load_with_report().incidents
    }

    /// Like [`load`](Self::load), additionally reporting why records or the whole slot
    /// were discarded.
    pub fn load_with_report(&self) -> LoadReport {
        let raw = match self.storage.get_item(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return LoadReport::default(),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "failed to read incident storage");
                return degraded(
                    ValidationWarning::new("STORAGE_READ_FAILED", "Failed to read stored incidents")
                        .with_details(e.to_string()),
                );
            }
        };

        let root: Value = match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "stored incidents are not valid JSON");
                return degraded(
                    ValidationWarning::new(
                        "STORAGE_PARSE_FAILED",
                        "Stored incidents are not valid JSON",
                    )
                    .with_details(e.to_string()),
                );
            }
        };

        let Value::Array(items) = root else {
            tracing::warn!(key = %self.key, "stored incidents are not an array");
            return degraded(ValidationWarning::new(
                "STORAGE_NOT_AN_ARRAY",
                "Stored incidents are not an array",
            ));
        };

        decode_records(items)
    }

    /// Overwrite the slot with the full collection.
    pub fn save(&mut self, incidents: &[Incident]) -> Result<(), AppError> {
        let json = serde_json::to_string(incidents).map_err(|e| {
            AppError::new("STORAGE_SERIALIZE_FAILED", "Failed to serialize incidents")
                .with_details(e.to_string())
        })?;
        self.storage.set_item(&self.key, &json)
    }
}

fn degraded(warning: ValidationWarning) -> LoadReport {
    LoadReport {
        incidents: Vec::new(),
        warnings: vec![warning],
    }
}

fn decode_records(items: Vec<Value>) -> LoadReport {
    let mut report = LoadReport::default();
    let mut seen_ids = HashSet::new();

    for (idx, item) in items.into_iter().enumerate() {
        let incident: Incident = match serde_json::from_value(item) {
            Ok(i) => i,
            Err(e) => {
                tracing::warn!(index = idx, error = %e, "dropping malformed stored incident");
                report.warnings.push(
                    ValidationWarning::new(
                        "STORAGE_RECORD_MALFORMED",
                        "Dropped malformed stored incident",
                    )
                    .with_details(format!("index={idx}; err={e}")),
                );
                continue;
            }
        };

        let problems = validate_stored_incident(&incident);
        if !problems.is_empty() {
            tracing::warn!(index = idx, id = incident.id, "dropping invalid stored incident");
            report.warnings.extend(problems);
            continue;
        }

        if !seen_ids.insert(incident.id) {
            tracing::warn!(index = idx, id = incident.id, "dropping duplicate stored incident id");
            report.warnings.push(
                ValidationWarning::new(
                    "STORAGE_DUPLICATE_ID",
                    "Dropped stored incident with duplicate id",
                )
                .with_details(format!("index={idx}; id={}", incident.id)),
            );
            continue;
        }

        report.incidents.push(incident);
    }

    report
}
