use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::analytics::{count_reported_since, severity_distribution, DEFAULT_TIMELINE_DAYS};
use crate::domain::Incident;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertLevel {
    High,
    Normal,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::High => "High",
            AlertLevel::Normal => "Normal",
        }
    }
}

/// Counts behind the "AI Incident Analysis" panel. There is no model behind it: the text is
/// a fixed template over these numbers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IncidentSummary {
    pub total: i64,
    pub high_severity: i64,
    pub recent: i64,
    pub alert_level: AlertLevel,
}

impl IncidentSummary {
    pub fn render(&self) -> String {
        format!(
            "Analysis of {} incidents:\n- {} high severity incidents identified\n- {} incidents reported in the last 7 days\nKey trends: {} alert level",
            self.total,
            self.high_severity,
            self.recent,
            self.alert_level.as_str()
        )
    }
}

pub fn summarize(incidents: &[Incident], now: OffsetDateTime) -> IncidentSummary {
    let total = incidents.len() as i64;
    let high_severity = severity_distribution(incidents).high;
    // High when more than a third of all incidents are High.
    let alert_level = if high_severity * 3 > total {
        AlertLevel::High
    } else {
        AlertLevel::Normal
    };

    IncidentSummary {
        total,
        high_severity,
        recent: count_reported_since(incidents, now, DEFAULT_TIMELINE_DAYS),
        alert_level,
    }
}
