use time::macros::format_description;
use time::{Date, OffsetDateTime, UtcOffset};

use crate::error::AppError;

/// Parse a `YYYY-MM-DD` calendar day (date pickers, CLI flags).
pub fn parse_calendar_day(field: &str, raw: &str) -> Result<Date, AppError> {
    let trimmed = raw.trim();
    Date::parse(trimmed, format_description!("[year]-[month]-[day]")).map_err(|e| {
        AppError::new("INPUT_DATE_UNPARSEABLE", format!("Unparseable date for {field}"))
            .with_details(format!("value={trimmed}; err={e}"))
    })
}

/// Calendar day of `ts` as seen at `offset`.
pub fn local_date(ts: OffsetDateTime, offset: UtcOffset) -> Date {
    ts.to_offset(offset).date()
}

/// en-US style display string, e.g. `3/15/2025, 10:00:00 AM`.
pub fn format_display(ts: OffsetDateTime, offset: UtcOffset) -> Result<String, AppError> {
    ts.to_offset(offset)
        .format(format_description!(
            "[month padding:none]/[day padding:none]/[year], [hour repr:12 padding:none]:[minute]:[second] [period]"
        ))
        .map_err(|e| {
            AppError::new("TIME_FORMAT_FAILED", "Failed to format display timestamp")
                .with_details(e.to_string())
        })
}

/// Short chart label, e.g. `Mar 15`.
pub fn format_day_label(day: Date) -> String {
    day.format(format_description!("[month repr:short] [day padding:none]"))
        .unwrap_or_else(|_| day.to_string())
}

/// `YYYY-MM-DD`.
pub fn format_iso_date(day: Date) -> String {
    day.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| day.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime, offset};

    #[test]
    fn display_uses_twelve_hour_clock_in_local_offset() {
        let ts = datetime!(2025-04-01 14:30:05 UTC);
        assert_eq!(format_display(ts, UtcOffset::UTC).unwrap(), "4/1/2025, 2:30:05 PM");
        assert_eq!(format_display(ts, offset!(-5)).unwrap(), "4/1/2025, 9:30:05 AM");
    }

    #[test]
    fn midnight_renders_as_twelve_am() {
        let ts = datetime!(2025-03-15 00:00:00 UTC);
        assert_eq!(format_display(ts, UtcOffset::UTC).unwrap(), "3/15/2025, 12:00:00 AM");
    }

    #[test]
    fn calendar_day_round_trips() {
        let d = parse_calendar_day("date_start", " 2025-03-16 ").unwrap();
        assert_eq!(d, date!(2025 - 03 - 16));
        assert_eq!(format_iso_date(d), "2025-03-16");
        assert_eq!(format_day_label(d), "Mar 16");
    }

    #[test]
    fn bad_calendar_day_is_an_input_error() {
        let err = parse_calendar_day("date_end", "03/16/2025").unwrap_err();
        assert_eq!(err.code, "INPUT_DATE_UNPARSEABLE");
    }
}
