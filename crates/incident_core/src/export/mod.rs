use std::fs;
use std::path::{Path, PathBuf};

use csv::{QuoteStyle, Terminator, WriterBuilder};
use time::{Date, UtcOffset};

use crate::domain::Incident;
use crate::error::AppError;
use crate::normalize::timestamps::{format_display, format_iso_date};

pub const CSV_HEADERS: [&str; 4] = ["Title", "Description", "Severity", "Reported At"];

fn csv_err(e: impl ToString) -> AppError {
    AppError::new("EXPORT_CSV_FAILED", "Failed to render CSV export").with_details(e.to_string())
}

/// Render incidents (already filtered and sorted by the caller) as CSV.
///
/// The header row is bare; every data field is double-quoted with embedded quotes doubled.
/// Timestamps are display strings in local time, so the output is meant for people, not
/// for re-import.
pub fn render_csv(incidents: &[Incident], offset: UtcOffset) -> Result<String, AppError> {
    let mut header = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .quote_style(QuoteStyle::Necessary)
        .from_writer(Vec::new());
    header.write_record(CSV_HEADERS).map_err(csv_err)?;
    let buf = header.into_inner().map_err(csv_err)?;

    let mut rows = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .quote_style(QuoteStyle::Always)
        .from_writer(buf);
    for inc in incidents {
        let reported_at = format_display(inc.reported_at, offset)?;
        rows.write_record([
            inc.title.as_str(),
            inc.description.as_str(),
            inc.severity.as_str(),
            reported_at.as_str(),
        ])
        .map_err(csv_err)?;
    }
    let bytes = rows.into_inner().map_err(csv_err)?;

    String::from_utf8(bytes).map_err(csv_err)
}

/// `incidents_YYYY-MM-DD.csv`
pub fn export_filename(today: Date) -> String {
    format!("incidents_{}.csv", format_iso_date(today))
}

/// Write rendered CSV as `destination_dir/filename`.
pub fn write_export(
    destination_dir: &Path,
    filename: &str,
    csv_text: &str,
) -> Result<PathBuf, AppError> {
    if !destination_dir.is_dir() {
        return Err(AppError::new(
            "EXPORT_DEST_NOT_DIR",
            "Export destination must be an existing directory",
        )
        .with_details(destination_dir.display().to_string()));
    }

    let path = destination_dir.join(filename);
    fs::write(&path, csv_text).map_err(|e| {
        AppError::new("EXPORT_WRITE_FAILED", "Failed to write CSV export")
            .with_details(format!("path={}: {}", path.display(), e))
    })?;
    tracing::info!(path = %path.display(), bytes = csv_text.len(), "csv export written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Severity;
    use time::macros::{date, datetime};

    #[test]
    fn empty_view_exports_header_only() {
        assert_eq!(
            render_csv(&[], UtcOffset::UTC).unwrap(),
            "Title,Description,Severity,Reported At\n"
        );
    }

    #[test]
    fn embedded_quotes_are_doubled() {
        let inc = Incident {
            id: 1,
            title: r#"The "bad" bot"#.to_string(),
            description: "said, \"hi\"".to_string(),
            severity: Severity::High,
            reported_at: datetime!(2025-04-01 14:30:00 UTC),
        };
        let text = render_csv(&[inc], UtcOffset::UTC).unwrap();
        let row = text.lines().nth(1).unwrap();
        assert_eq!(
            row,
            r#""The ""bad"" bot","said, ""hi""","High","4/1/2025, 2:30:00 PM""#
        );
    }

    #[test]
    fn filename_embeds_date() {
        assert_eq!(export_filename(date!(2026 - 10 - 16)), "incidents_2026-10-16.csv");
    }

    #[test]
    fn write_uses_the_given_filename() {
        let dir = tempfile::tempdir().unwrap();
        let name = export_filename(date!(2025 - 04 - 03));
        let path = write_export(dir.path(), &name, "Title\n").unwrap();
        assert_eq!(path, dir.path().join("incidents_2025-04-03.csv"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Title\n");
    }

    #[test]
    fn missing_destination_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_export(&dir.path().join("nope"), "x.csv", "").unwrap_err();
        assert_eq!(err.code, "EXPORT_DEST_NOT_DIR");
    }
}
