use std::io::Write;

use serde::Serialize;

use incident_core::analytics::{SeverityCount, SummaryCards, TimelineBucket};
use incident_core::clock::{Clock, SystemClock};
use incident_core::config::DashboardConfig;
use incident_core::dashboard::Dashboard;
use incident_core::demo::seed_incidents;
use incident_core::domain::{
    FilterCriteria, Incident, IncidentInput, IncidentPatch, Severity, SortOrder,
};
use incident_core::error::AppError;
use incident_core::export::write_export;
use incident_core::normalize::timestamps::{format_display, parse_calendar_day};
use incident_core::persist::PersistenceAdapter;
use incident_core::storage::{create_storage, KeyValueStorage};
use incident_core::store::IncidentStore;

pub mod cli;

use cli::{Cli, Commands, FilterArgs};

pub const DEFAULT_LOG_FILTER: &str = "incidentdash=info,incidentdash_lib=info,incident_core=warn";

type Session = Dashboard<Box<dyn KeyValueStorage>>;

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: usize,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub cards: SummaryCards,
    pub severity: Vec<SeverityCount>,
    pub timeline: Vec<TimelineBucket>,
}

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub path: String,
    pub row_count: usize,
}

#[derive(Debug, Serialize)]
pub struct SeedResponse {
    pub seeded: usize,
    pub skipped: bool,
}

fn output_err(e: std::io::Error) -> AppError {
    AppError::new("OUTPUT_WRITE_FAILED", "Failed to write command output")
        .with_details(e.to_string())
}

fn emit(out: &mut dyn Write, text: &str) -> Result<(), AppError> {
    writeln!(out, "{text}").map_err(output_err)
}

fn emit_json<T: Serialize>(out: &mut dyn Write, value: &T) -> Result<(), AppError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| {
        AppError::new("OUTPUT_SERIALIZE_FAILED", "Failed to serialize command output")
            .with_details(e.to_string())
    })?;
    emit(out, &text)
}

/// Config file (if any), env overrides, then `--db`.
pub fn load_config(cli: &Cli) -> Result<DashboardConfig, AppError> {
    let mut config = DashboardConfig::load(cli.config.as_deref())?;
    if let Some(db) = &cli.db {
        config.db_path = db.clone();
    }
    Ok(config)
}

pub fn open_dashboard(
    config: &DashboardConfig,
    clock: Box<dyn Clock>,
) -> Result<Session, AppError> {
    let storage = create_storage(config)?;
    let adapter = PersistenceAdapter::with_key(storage, config.storage_key.clone());
    let store = if config.seed_demo_when_empty {
        IncidentStore::init_with_seed(adapter, seed_incidents())
    } else {
        IncidentStore::init(adapter)
    };
    Ok(Dashboard::new(store, clock).with_config(config))
}

fn parse_severity(raw: &str) -> Result<Severity, AppError> {
    raw.parse::<Severity>().map_err(|e| {
        AppError::new("INPUT_SEVERITY_INVALID", "Severity must be Low, Medium or High")
            .with_details(e)
    })
}

pub fn criteria_from_args(args: &FilterArgs) -> Result<FilterCriteria, AppError> {
    let mut criteria = FilterCriteria::default();
    if let Some(search) = &args.search {
        criteria = criteria.with_search(search.clone());
    }
    for raw in &args.severities {
        criteria = criteria.with_severity(parse_severity(raw)?);
    }
    let start = args
        .from
        .as_deref()
        .map(|raw| parse_calendar_day("from", raw))
        .transpose()?;
    let end = args
        .to
        .as_deref()
        .map(|raw| parse_calendar_day("to", raw))
        .transpose()?;
    let sort = args.sort.parse::<SortOrder>().map_err(|e| {
        AppError::new("INPUT_SORT_INVALID", "Sort must be newest or oldest").with_details(e)
    })?;
    Ok(criteria.with_date_range(start, end).with_sort(sort))
}

/// Storage failures never fail a command; they are reported and the command carries on.
fn report_storage_error(dash: &mut Session) {
    if let Some(e) = dash.take_storage_error() {
        tracing::warn!(code = %e.code, "changes were not saved");
        eprintln!("Warning: {e}");
    }
}

fn report_fresh_alert(dash: &mut Session, out: &mut dyn Write, json: bool) -> Result<(), AppError> {
    if let Some(alert) = dash.take_fresh_alert() {
        if json {
            tracing::info!(incident_id = alert.incident_id, "{}", alert.message());
        } else {
            emit(out, &alert.message())?;
        }
    }
    Ok(())
}

fn incident_line(dash: &Session, inc: &Incident) -> Result<String, AppError> {
    Ok(format!(
        "#{:<4} {:<8} {}  ({})",
        inc.id,
        format!("[{}]", inc.severity),
        inc.title,
        format_display(inc.reported_at, dash.local_offset())?
    ))
}

pub fn run(cli: Cli, out: &mut dyn Write) -> Result<(), AppError> {
    run_with_clock(cli, Box::new(SystemClock::new()), out)
}

pub fn run_with_clock(
    cli: Cli,
    clock: Box<dyn Clock>,
    out: &mut dyn Write,
) -> Result<(), AppError> {
    let config = load_config(&cli)?;
    let json = cli.json;

    if let Commands::Seed { force } = cli.command {
        return handle_seed(&config, force, json, out);
    }

    let mut dash = open_dashboard(&config, clock)?;
    match cli.command {
        Commands::List(filters) => handle_list(&mut dash, &filters, json, out),
        Commands::Show { id } => handle_show(&dash, id, json, out),
        Commands::Create {
            title,
            description,
            severity,
        } => handle_create(&mut dash, title, description, &severity, json, out),
        Commands::Update {
            id,
            title,
            description,
            severity,
        } => handle_update(&mut dash, id, title, description, severity, json, out),
        Commands::Delete { id } => handle_delete(&mut dash, vec![id], json, out),
        Commands::BulkDelete { ids } => handle_delete(&mut dash, ids, json, out),
        Commands::Stats => handle_stats(&dash, json, out),
        Commands::Summary => handle_summary(&dash, json, out),
        Commands::Export { filters, out: dir } => {
            handle_export(&mut dash, &filters, &dir, json, out)
        }
        Commands::Seed { .. } => Ok(()),
    }
}

fn handle_list(
    dash: &mut Session,
    filters: &FilterArgs,
    json: bool,
    out: &mut dyn Write,
) -> Result<(), AppError> {
    dash.set_criteria(criteria_from_args(filters)?);
    let view = dash.list_view();

    if json {
        emit_json(out, &view)?;
    } else {
        if view.incidents.is_empty() {
            emit(out, "No incidents match the current filters.")?;
        }
        for inc in &view.incidents {
            emit(out, &incident_line(dash, inc)?)?;
        }
        emit(out, &view.showing_line())?;
    }
    report_fresh_alert(dash, out, json)
}

fn handle_show(dash: &Session, id: i64, json: bool, out: &mut dyn Write) -> Result<(), AppError> {
    let inc = dash.get(id).ok_or_else(|| {
        AppError::new("INCIDENT_NOT_FOUND", "Incident not found").with_details(format!("id={id}"))
    })?;

    if json {
        return emit_json(out, inc);
    }
    emit(out, &format!("#{} {}", inc.id, inc.title))?;
    emit(out, &format!("Severity: {}", inc.severity))?;
    emit(
        out,
        &format!(
            "Reported: {}",
            format_display(inc.reported_at, dash.local_offset())?
        ),
    )?;
    emit(out, "")?;
    emit(out, &inc.description)
}

fn handle_create(
    dash: &mut Session,
    title: String,
    description: String,
    severity: &str,
    json: bool,
    out: &mut dyn Write,
) -> Result<(), AppError> {
    let input = IncidentInput::new(title, description, parse_severity(severity)?);
    let created = dash.create(input)?;
    report_storage_error(dash);

    if json {
        emit_json(out, &created)?;
    } else {
        emit(out, &format!("Created incident #{}", created.id))?;
    }
    report_fresh_alert(dash, out, json)
}

fn handle_update(
    dash: &mut Session,
    id: i64,
    title: Option<String>,
    description: Option<String>,
    severity: Option<String>,
    json: bool,
    out: &mut dyn Write,
) -> Result<(), AppError> {
    let patch = IncidentPatch {
        title,
        description,
        severity: severity.as_deref().map(parse_severity).transpose()?,
    };
    if patch.is_empty() {
        return Err(AppError::new(
            "INPUT_NOTHING_TO_UPDATE",
            "Pass at least one of --title, --description or --severity",
        )
        .with_details(format!("id={id}")));
    }
    let updated = dash.update(id, patch)?;
    report_storage_error(dash);

    if json {
        emit_json(out, &updated)
    } else {
        emit(out, &format!("Updated incident #{}", updated.id))
    }
}

fn handle_delete(
    dash: &mut Session,
    ids: Vec<i64>,
    json: bool,
    out: &mut dyn Write,
) -> Result<(), AppError> {
    let deleted = dash.bulk_delete(ids);
    report_storage_error(dash);

    if json {
        emit_json(out, &DeleteResponse { deleted })
    } else {
        let noun = if deleted == 1 { "incident" } else { "incidents" };
        emit(out, &format!("Deleted {deleted} {noun}"))
    }
}

fn handle_stats(dash: &Session, json: bool, out: &mut dyn Write) -> Result<(), AppError> {
    let cards = dash.cards();
    let severity = cards.severity.buckets();
    let timeline = dash.aggregate_timeline();

    if json {
        return emit_json(
            out,
            &StatsResponse {
                cards,
                severity,
                timeline,
            },
        );
    }

    emit(out, &format!("Total incidents: {}", cards.total))?;
    emit(
        out,
        &format!("Reported in the last 7 days: {}", cards.reported_last_7_days),
    )?;
    emit(out, "")?;
    emit(out, "By severity:")?;
    for bucket in &severity {
        emit(out, &format!("  {:<8} {}", bucket.severity.as_str(), bucket.count))?;
    }
    emit(out, "")?;
    emit(out, "Timeline:")?;
    for bucket in &timeline {
        emit(out, &format!("  {:<8} {}", bucket.label, bucket.count))?;
    }
    Ok(())
}

fn handle_summary(dash: &Session, json: bool, out: &mut dyn Write) -> Result<(), AppError> {
    let summary = dash.summary();
    if json {
        emit_json(out, &summary)
    } else {
        emit(out, &summary.render())
    }
}

fn handle_export(
    dash: &mut Session,
    filters: &FilterArgs,
    dir: &std::path::Path,
    json: bool,
    out: &mut dyn Write,
) -> Result<(), AppError> {
    dash.set_criteria(criteria_from_args(filters)?);
    let export = dash.export_current_view()?;
    let path = write_export(dir, &export.filename, &export.content)?;

    let response = ExportResponse {
        path: path.to_string_lossy().to_string(),
        row_count: export.row_count,
    };
    if json {
        emit_json(out, &response)
    } else {
        emit(
            out,
            &format!("Exported {} incidents to {}", response.row_count, response.path),
        )
    }
}

fn handle_seed(
    config: &DashboardConfig,
    force: bool,
    json: bool,
    out: &mut dyn Write,
) -> Result<(), AppError> {
    let storage = create_storage(config)?;
    let mut adapter = PersistenceAdapter::with_key(storage, config.storage_key.clone());

    let existing = adapter.load().len();
    let response = if existing > 0 && !force {
        SeedResponse {
            seeded: 0,
            skipped: true,
        }
    } else {
        let seed = seed_incidents();
        adapter.save(&seed)?;
        SeedResponse {
            seeded: seed.len(),
            skipped: false,
        }
    };

    if json {
        emit_json(out, &response)
    } else if response.skipped {
        emit(
            out,
            &format!("Storage already holds {existing} incidents; use --force to replace them"),
        )
    } else {
        emit(out, &format!("Seeded {} demo incidents", response.seeded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use incident_core::clock::FixedClock;
    use incident_core::error::ErrorKind;
    use pretty_assertions::assert_eq;
    use std::path::Path;
    use time::macros::datetime;

    fn exec(db: &Path, args: &[&str]) -> Result<String, AppError> {
        let mut argv = vec!["incidentdash", "--db", db.to_str().unwrap()];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv).unwrap();
        let clock = FixedClock::new(datetime!(2025-04-03 12:00:00 UTC));
        let mut out = Vec::new();
        run_with_clock(cli, Box::new(clock), &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn seeded_list_is_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("dash.sqlite");

        assert_eq!(exec(&db, &["seed"]).unwrap(), "Seeded 3 demo incidents\n");
        let text = exec(&db, &["list"]).unwrap();
        let ids: Vec<&str> = text
            .lines()
            .filter_map(|l| l.split_whitespace().next())
            .filter(|w| w.starts_with('#'))
            .collect();
        assert_eq!(ids, vec!["#2", "#3", "#1"]);
        assert!(text.ends_with("Showing 3 of 3 incidents\n"));
    }

    #[test]
    fn seed_does_not_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("dash.sqlite");

        exec(&db, &["seed"]).unwrap();
        exec(&db, &["delete", "1"]).unwrap();
        let text = exec(&db, &["seed"]).unwrap();
        assert!(text.contains("use --force"));
        assert_eq!(exec(&db, &["seed", "--force"]).unwrap(), "Seeded 3 demo incidents\n");
    }

    #[test]
    fn blank_title_is_a_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("dash.sqlite");

        let err = exec(&db, &["create", "  ", "-d", "desc"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(exec(&db, &["list"]).unwrap().contains("Showing 0 of 0 incidents"));
    }

    #[test]
    fn updating_a_missing_incident_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("dash.sqlite");

        let err = exec(&db, &["update", "42", "--title", "x"]).unwrap_err();
        assert_eq!(err.code, "INCIDENT_NOT_FOUND");
    }

    #[test]
    fn update_without_fields_is_rejected_before_touching_storage() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("dash.sqlite");

        exec(&db, &["seed"]).unwrap();
        let err = exec(&db, &["update", "1"]).unwrap_err();
        assert_eq!(err.code, "INPUT_NOTHING_TO_UPDATE");
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[test]
    fn export_writes_under_the_session_filename() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("dash.sqlite");

        exec(&db, &["seed"]).unwrap();
        let text = exec(&db, &["--json", "export", "-o", dir.path().to_str().unwrap()]).unwrap();
        let response: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(response["row_count"], 3);
        let expected = dir.path().join("incidents_2025-04-03.csv");
        assert_eq!(response["path"], &*expected.to_string_lossy());
        assert!(expected.is_file());
    }

    #[test]
    fn bulk_delete_counts_only_existing_ids() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("dash.sqlite");

        exec(&db, &["seed"]).unwrap();
        assert_eq!(exec(&db, &["bulk-delete", "2", "99"]).unwrap(), "Deleted 1 incident\n");
        assert!(exec(&db, &["list"]).unwrap().contains("Showing 2 of 2 incidents"));
    }

    #[test]
    fn new_high_incident_raises_an_alert() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("dash.sqlite");

        let args = ["create", "Prompt leak", "-d", "System prompt exposed", "-s", "high"];
        let text = exec(&db, &args).unwrap();
        assert_eq!(
            text,
            "Created incident #1\nHigh Severity Alert: Prompt leak\n"
        );
    }

    #[test]
    fn export_writes_filtered_rows_to_a_dated_file() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("dash.sqlite");
        let out_dir = dir.path().join("exports");
        std::fs::create_dir(&out_dir).unwrap();

        exec(&db, &["seed"]).unwrap();
        exec(
            &db,
            &["export", "-s", "low", "-o", out_dir.to_str().unwrap()],
        )
        .unwrap();

        let csv = std::fs::read_to_string(out_dir.join("incidents_2025-04-03.csv")).unwrap();
        assert_eq!(
            csv,
            "Title,Description,Severity,Reported At\n\
             \"Minor Data Leak via Chatbot\",\"Chatbot inadvertently exposed non-sensitive user metadata...\",\"Low\",\"3/20/2025, 9:15:00 AM\"\n"
        );
    }

    #[test]
    fn bad_filter_values_are_input_errors() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("dash.sqlite");

        let err = exec(&db, &["list", "-s", "critical"]).unwrap_err();
        assert_eq!(err.code, "INPUT_SEVERITY_INVALID");
        let err = exec(&db, &["list", "--from", "03/16/2025"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
        let err = exec(&db, &["list", "--sort", "sideways"]).unwrap_err();
        assert_eq!(err.code, "INPUT_SORT_INVALID");
    }

    #[test]
    fn summary_renders_the_analysis_template() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("dash.sqlite");

        exec(&db, &["seed"]).unwrap();
        assert_eq!(
            exec(&db, &["summary"]).unwrap(),
            "Analysis of 3 incidents:\n- 1 high severity incidents identified\n- 1 incidents reported in the last 7 days\nKey trends: Normal alert level\n"
        );
    }
}
