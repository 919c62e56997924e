//! Session facade consumed by the presentation layer.
//!
//! Owns the store, the current filter criteria, the selection set and alert bookkeeping, and
//! exposes the operations a dashboard front end issues.

use std::collections::BTreeSet;

use serde::Serialize;
use time::UtcOffset;

use crate::analytics::{
    fresh_high_severity, severity_distribution, summary_cards, timeline, FreshAlert,
    SeverityDistribution, SummaryCards, TimelineBucket, DEFAULT_FRESH_ALERT_SECS,
    DEFAULT_TIMELINE_DAYS,
};
use crate::clock::Clock;
use crate::config::DashboardConfig;
use crate::domain::{FilterCriteria, Incident, IncidentInput, IncidentPatch};
use crate::error::AppError;
use crate::export::{export_filename, render_csv};
use crate::query::{list_view, list_visible, ListView};
use crate::storage::KeyValueStorage;
use crate::store::IncidentStore;
use crate::summary::{summarize, IncidentSummary};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CsvExport {
    pub filename: String,
    pub content: String,
    pub row_count: usize,
}

pub struct Dashboard<S> {
    store: IncidentStore<S>,
    clock: Box<dyn Clock>,
    criteria: FilterCriteria,
    selection: BTreeSet<i64>,
    last_alerted_id: Option<i64>,
    timeline_days: u32,
    fresh_alert_secs: i64,
}

impl<S: KeyValueStorage> Dashboard<S> {
    pub fn new(store: IncidentStore<S>, clock: Box<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            criteria: FilterCriteria::default(),
            selection: BTreeSet::new(),
            last_alerted_id: None,
            timeline_days: DEFAULT_TIMELINE_DAYS,
            fresh_alert_secs: DEFAULT_FRESH_ALERT_SECS,
        }
    }

    pub fn with_config(mut self, config: &DashboardConfig) -> Self {
        self.timeline_days = config.timeline_days;
        self.fresh_alert_secs = config.fresh_alert_secs;
        self
    }

    pub fn incidents(&self) -> &[Incident] {
        self.store.all()
    }

    pub fn get(&self, id: i64) -> Option<&Incident> {
        self.store.get(id)
    }

    /// Offset used for calendar-day filtering and display strings.
    pub fn local_offset(&self) -> UtcOffset {
        self.clock.local_offset()
    }

    // Filters

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
    }

    pub fn clear_filters(&mut self) {
        self.criteria.clear();
    }

    pub fn list_visible(&self, criteria: &FilterCriteria) -> Vec<Incident> {
        list_visible(self.store.all(), criteria, self.clock.local_offset())
    }

    /// Visible list for the session's current criteria.
    pub fn visible(&self) -> Vec<Incident> {
        self.list_visible(&self.criteria)
    }

    pub fn list_view(&self) -> ListView {
        list_view(self.store.all(), &self.criteria, self.clock.local_offset())
    }

    // Mutations

    pub fn create(&mut self, input: IncidentInput) -> Result<Incident, AppError> {
        let now = self.clock.now_utc();
        self.store.create(input, now)
    }

    pub fn update(&mut self, id: i64, patch: IncidentPatch) -> Result<Incident, AppError> {
        self.store.update(id, patch)
    }

    pub fn delete(&mut self, id: i64) -> bool {
        self.selection.remove(&id);
        self.store.delete(id)
    }

    pub fn bulk_delete<I>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = i64>,
    {
        let ids: Vec<i64> = ids.into_iter().collect();
        for id in &ids {
            self.selection.remove(id);
        }
        self.store.bulk_delete(ids)
    }

    /// Last storage write failure since it was last taken, if any.
    pub fn take_storage_error(&mut self) -> Option<AppError> {
        self.store.take_storage_error()
    }

    // Selection

    pub fn selection(&self) -> &BTreeSet<i64> {
        &self.selection
    }

    /// Flip selection of `id`. Unknown ids are ignored; returns whether `id` is now selected.
    pub fn toggle_select(&mut self, id: i64) -> bool {
        if self.selection.remove(&id) {
            return false;
        }
        if self.store.get(id).is_none() {
            return false;
        }
        self.selection.insert(id);
        true
    }

    /// Select every visible incident, or clear the selection if all of them already are.
    pub fn toggle_select_all(&mut self) {
        let visible: BTreeSet<i64> = self.visible().iter().map(|i| i.id).collect();
        if !visible.is_empty() && visible.is_subset(&self.selection) {
            self.selection.clear();
        } else {
            self.selection = visible;
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn delete_selected(&mut self) -> usize {
        let ids = std::mem::take(&mut self.selection);
        self.store.bulk_delete(ids)
    }

    // Aggregates

    pub fn aggregate_severity(&self) -> SeverityDistribution {
        severity_distribution(self.store.all())
    }

    pub fn aggregate_timeline(&self) -> Vec<TimelineBucket> {
        timeline(
            self.store.all(),
            self.clock.today(),
            self.clock.local_offset(),
            self.timeline_days,
        )
    }

    pub fn cards(&self) -> SummaryCards {
        summary_cards(self.store.all(), self.clock.now_utc())
    }

    pub fn summary(&self) -> IncidentSummary {
        summarize(self.store.all(), self.clock.now_utc())
    }

    /// Fresh high-severity alert, returned at most once per incident.
    pub fn take_fresh_alert(&mut self) -> Option<FreshAlert> {
        let alert = fresh_high_severity(
            self.store.all(),
            self.clock.now_utc(),
            self.fresh_alert_secs,
        )?;
        if self.last_alerted_id == Some(alert.incident_id) {
            return None;
        }
        self.last_alerted_id = Some(alert.incident_id);
        Some(alert)
    }

    // Export

    pub fn export_current_view(&self) -> Result<CsvExport, AppError> {
        let visible = self.visible();
        let content = render_csv(&visible, self.clock.local_offset())?;
        Ok(CsvExport {
            filename: export_filename(self.clock.today()),
            content,
            row_count: visible.len(),
        })
    }
}
