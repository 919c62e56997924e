use std::collections::HashSet;

use time::OffsetDateTime;

use crate::domain::{Incident, IncidentInput, IncidentPatch};
use crate::error::AppError;
use crate::persist::PersistenceAdapter;
use crate::storage::KeyValueStorage;
use crate::validate::{validate_fields, validate_input};

/// Authoritative in-memory incident collection with write-through persistence.
///
/// Mutations either succeed completely or leave the collection untouched. A failed storage
/// write does not fail the mutation; it is logged and kept in
/// [`last_storage_error`](Self::last_storage_error).
pub struct IncidentStore<S> {
    incidents: Vec<Incident>,
    persistence: PersistenceAdapter<S>,
    last_storage_error: Option<AppError>,
}

impl<S: KeyValueStorage> IncidentStore<S> {
    /// Hydrate from storage.
    pub fn init(persistence: PersistenceAdapter<S>) -> Self {
        let incidents = persistence.load();
        tracing::debug!(count = incidents.len(), "incident store hydrated");
        Self {
            incidents,
            persistence,
            last_storage_error: None,
        }
    }

    /// Hydrate from storage, falling back to `seed` (and persisting it) when storage holds
    /// no incidents.
    pub fn init_with_seed(persistence: PersistenceAdapter<S>, seed: Vec<Incident>) -> Self {
        let mut store = Self::init(persistence);
        if store.incidents.is_empty() && !seed.is_empty() {
            tracing::debug!(count = seed.len(), "seeding empty incident store");
            store.incidents = seed;
            store.persist();
        }
        store
    }

    pub fn all(&self) -> &[Incident] {
        &self.incidents
    }

    pub fn get(&self, id: i64) -> Option<&Incident> {
        self.incidents.iter().find(|i| i.id == id)
    }

    pub fn len(&self) -> usize {
        self.incidents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.incidents.is_empty()
    }

    /// One past the largest id in the collection.
    pub fn next_id(&self) -> Result<i64, AppError> {
        let max = self.incidents.iter().map(|i| i.id).max().unwrap_or(0);
        max.checked_add(1).ok_or_else(|| {
            AppError::new(
                "INCIDENT_ID_EXHAUSTED",
                "No incident ids left above the current maximum",
            )
            .with_details(format!("max_id={max}"))
        })
    }

    pub fn create(
        &mut self,
        input: IncidentInput,
        reported_at: OffsetDateTime,
    ) -> Result<Incident, AppError> {
        validate_input(&input)?;
        let id = self.next_id()?;

        let incident = Incident {
            id,
            title: input.title,
            description: input.description,
            severity: input.severity,
            reported_at,
        };
        self.incidents.insert(0, incident.clone());
        tracing::debug!(id = incident.id, severity = %incident.severity, "incident created");
        self.persist();
        Ok(incident)
    }

    pub fn update(&mut self, id: i64, patch: IncidentPatch) -> Result<Incident, AppError> {
        let Some(pos) = self.incidents.iter().position(|i| i.id == id) else {
            return Err(AppError::new("INCIDENT_NOT_FOUND", "Incident not found")
                .with_details(format!("id={id}")));
        };

        let current = &self.incidents[pos];
        let updated = Incident {
            id: current.id,
            title: patch.title.unwrap_or_else(|| current.title.clone()),
            description: patch
                .description
                .unwrap_or_else(|| current.description.clone()),
            severity: patch.severity.unwrap_or(current.severity),
            reported_at: current.reported_at,
        };
        validate_fields(&updated.title, &updated.description)?;

        self.incidents[pos] = updated.clone();
        tracing::debug!(id, "incident updated");
        self.persist();
        Ok(updated)
    }

    /// Remove one incident. Returns whether anything was removed; an unknown id is a no-op.
    pub fn delete(&mut self, id: i64) -> bool {
        let before = self.incidents.len();
        self.incidents.retain(|i| i.id != id);
        let removed = self.incidents.len() != before;
        if removed {
            tracing::debug!(id, "incident deleted");
            self.persist();
        }
        removed
    }

    /// Remove every incident whose id is in `ids`; unknown ids are ignored.
    pub fn bulk_delete<I>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = i64>,
    {
        let ids: HashSet<i64> = ids.into_iter().collect();
        let before = self.incidents.len();
        self.incidents.retain(|i| !ids.contains(&i.id));
        let removed = before - self.incidents.len();
        if removed > 0 {
            tracing::debug!(removed, "incidents bulk deleted");
            self.persist();
        }
        removed
    }

    pub fn last_storage_error(&self) -> Option<&AppError> {
        self.last_storage_error.as_ref()
    }

    pub fn take_storage_error(&mut self) -> Option<AppError> {
        self.last_storage_error.take()
    }

    pub fn persistence(&self) -> &PersistenceAdapter<S> {
        &self.persistence
    }

    fn persist(&mut self) {
        match self.persistence.save(&self.incidents) {
            Ok(()) => self.last_storage_error = None,
            Err(e) => {
                tracing::warn!(error = %e, "failed to persist incidents; continuing in memory");
                self.last_storage_error = Some(e);
            }
        }
    }
}
