use serde::{Deserialize, Serialize};
use time::{Date, Duration, OffsetDateTime, UtcOffset};

use crate::domain::{Incident, Severity};
use crate::normalize::timestamps::{format_day_label, format_iso_date, local_date};

pub const DEFAULT_TIMELINE_DAYS: u32 = 7;
pub const MAX_TIMELINE_DAYS: u32 = 366;
pub const DEFAULT_FRESH_ALERT_SECS: i64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeverityCount {
    pub severity: Severity,
    pub count: i64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeverityDistribution {
    pub low: i64,
    pub medium: i64,
    pub high: i64,
}

impl SeverityDistribution {
    pub fn count(&self, severity: Severity) -> i64 {
        match severity {
            Severity::Low => self.low,
            Severity::Medium => self.medium,
            Severity::High => self.high,
        }
    }

    pub fn total(&self) -> i64 {
        self.low + self.medium + self.high
    }

    /// Chart rows in Low, Medium, High order.
    pub fn buckets(&self) -> Vec<SeverityCount> {
        Severity::ALL
            .iter()
            .map(|&severity| SeverityCount {
                severity,
                count: self.count(severity),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimelineBucket {
    /// `YYYY-MM-DD`
    pub day: String,
    /// Chart label, e.g. `Mar 15`.
    pub label: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FreshAlert {
    pub incident_id: i64,
    pub title: String,
    pub age_seconds: i64,
}

impl FreshAlert {
    pub fn message(&self) -> String {
        format!("High Severity Alert: {}", self.title)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SummaryCards {
    pub total: i64,
    pub severity: SeverityDistribution,
    pub reported_last_7_days: i64,
}

pub fn severity_distribution(incidents: &[Incident]) -> SeverityDistribution {
    let mut dist = SeverityDistribution::default();
    for inc in incidents {
        match inc.severity {
            Severity::Low => dist.low += 1,
            Severity::Medium => dist.medium += 1,
            Severity::High => dist.high += 1,
        }
    }
    dist
}

/// Per-day counts for the `days`-day window ending on `today` (local calendar days),
/// oldest first. Days without incidents are present with a zero count.
pub fn timeline(
    incidents: &[Incident],
    today: Date,
    offset: UtcOffset,
    days: u32,
) -> Vec<TimelineBucket> {
    let window: Vec<Date> = (0..days)
        .rev()
        .filter_map(|back| today.checked_sub(Duration::days(i64::from(back))))
        .collect();

    let mut counts = vec![0i64; window.len()];
    for inc in incidents {
        let day = local_date(inc.reported_at, offset);
        if let Some(idx) = window.iter().position(|d| *d == day) {
            counts[idx] += 1;
        }
    }

    window
        .into_iter()
        .zip(counts)
        .map(|(day, count)| TimelineBucket {
            day: format_iso_date(day),
            label: format_day_label(day),
            count,
        })
        .collect()
}

/// The newest High incident, if it was reported less than `window_secs` before `now`.
pub fn fresh_high_severity(
    incidents: &[Incident],
    now: OffsetDateTime,
    window_secs: i64,
) -> Option<FreshAlert> {
    let latest = incidents
        .iter()
        .filter(|i| i.severity == Severity::High)
        .fold(None::<&Incident>, |best, cur| match best {
            Some(b) if b.reported_at >= cur.reported_at => Some(b),
            _ => Some(cur),
        })?;

    let age = now - latest.reported_at;
    if age < Duration::seconds(window_secs) {
        Some(FreshAlert {
            incident_id: latest.id,
            title: latest.title.clone(),
            age_seconds: age.whole_seconds(),
        })
    } else {
        None
    }
}

/// Incidents reported within the rolling `days * 24h` before `now`.
pub fn count_reported_since(incidents: &[Incident], now: OffsetDateTime, days: u32) -> i64 {
    let cutoff = now - Duration::days(i64::from(days));
    incidents.iter().filter(|i| i.reported_at > cutoff).count() as i64
}

pub fn summary_cards(incidents: &[Incident], now: OffsetDateTime) -> SummaryCards {
    SummaryCards {
        total: incidents.len() as i64,
        severity: severity_distribution(incidents),
        reported_last_7_days: count_reported_since(incidents, now, DEFAULT_TIMELINE_DAYS),
    }
}
