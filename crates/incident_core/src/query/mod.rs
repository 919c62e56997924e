//! Filter, search, date-range and sort pipeline producing the visible incident list.
//!
//! Everything here is pure: the same collection, criteria and offset always yield the
//! same output.

use std::cmp::Reverse;

use serde::Serialize;
use time::UtcOffset;

use crate::domain::{FilterCriteria, Incident, SortOrder};
use crate::normalize::timestamps::local_date;

/// Visible incidents plus the size of the collection they were drawn from.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ListView {
    pub incidents: Vec<Incident>,
    pub total: usize,
}

impl ListView {
    pub fn showing_line(&self) -> String {
        format!(
            "Showing {} of {} incidents",
            self.incidents.len(),
            self.total
        )
    }
}

pub fn matches_severity(incident: &Incident, criteria: &FilterCriteria) -> bool {
    criteria.severities.is_empty() || criteria.severities.contains(&incident.severity)
}

/// Case-insensitive substring match on title or description. A blank query matches all.
pub fn matches_search(incident: &Incident, search_text: &str) -> bool {
    if search_text.trim().is_empty() {
        return true;
    }
    let needle = search_text.to_lowercase();
    incident.title.to_lowercase().contains(&needle)
        || incident.description.to_lowercase().contains(&needle)
}

/// Inclusive calendar-day bounds evaluated at `offset`.
pub fn matches_date_range(
    incident: &Incident,
    criteria: &FilterCriteria,
    offset: UtcOffset,
) -> bool {
    let day = local_date(incident.reported_at, offset);
    criteria.date_start.map_or(true, |start| day >= start)
        && criteria.date_end.map_or(true, |end| day <= end)
}

pub fn matches(incident: &Incident, criteria: &FilterCriteria, offset: UtcOffset) -> bool {
    matches_severity(incident, criteria)
        && matches_search(incident, &criteria.search_text)
        && matches_date_range(incident, criteria, offset)
}

/// Stable sort by `reported_at`; equal timestamps keep their input order.
pub fn sort_incidents(incidents: &mut [Incident], order: SortOrder) {
    match order {
        SortOrder::Newest => incidents.sort_by_key(|i| Reverse(i.reported_at)),
        SortOrder::Oldest => incidents.sort_by_key(|i| i.reported_at),
    }
}

pub fn list_visible(
    incidents: &[Incident],
    criteria: &FilterCriteria,
    offset: UtcOffset,
) -> Vec<Incident> {
    let mut out: Vec<Incident> = incidents
        .iter()
        .filter(|i| matches_severity(i, criteria))
        .filter(|i| matches_search(i, &criteria.search_text))
        .filter(|i| matches_date_range(i, criteria, offset))
        .cloned()
        .collect();
    sort_incidents(&mut out, criteria.sort_order);
    out
}

pub fn list_view(
    incidents: &[Incident],
    criteria: &FilterCriteria,
    offset: UtcOffset,
) -> ListView {
    ListView {
        incidents: list_visible(incidents, criteria, offset),
        total: incidents.len(),
    }
}

pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Byte length of a case-insensitive match of `needle` at the start of `hay`, if any.
fn match_len_at(hay: &str, needle: &[char]) -> Option<usize> {
    let mut want = needle.iter();
    let mut pending = want.next();
    for (idx, c) in hay.char_indices() {
        for lc in c.to_lowercase() {
            match pending {
                Some(&w) if w == lc => pending = want.next(),
                _ => return None,
            }
        }
        if pending.is_none() {
            return Some(idx + c.len_utf8());
        }
    }
    None
}

/// HTML-escaped `text` with each case-insensitive occurrence of `query` wrapped in
/// `<mark>`. Both the matched and unmatched segments are escaped.
pub fn highlight_matches(text: &str, query: &str) -> String {
    if query.trim().is_empty() {
        return escape_html(text);
    }
    let needle: Vec<char> = query.chars().flat_map(char::to_lowercase).collect();

    let mut out = String::with_capacity(text.len());
    let mut plain_start = 0;
    let mut pos = 0;
    while pos < text.len() {
        if let Some(len) = match_len_at(&text[pos..], &needle) {
            out.push_str(&escape_html(&text[plain_start..pos]));
            out.push_str("<mark>");
            out.push_str(&escape_html(&text[pos..pos + len]));
            out.push_str("</mark>");
            pos += len;
            plain_start = pos;
        } else {
            let step = text[pos..].chars().next().map_or(1, char::len_utf8);
            pos += step;
        }
    }
    out.push_str(&escape_html(&text[plain_start..]));
    out
}
