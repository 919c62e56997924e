use pretty_assertions::assert_eq;
use time::macros::{date, datetime, offset};
use time::{OffsetDateTime, UtcOffset};

use incident_core::demo::seed_incidents;
use incident_core::domain::{FilterCriteria, Incident, Severity, SortOrder};
use incident_core::query::{list_view, list_visible, matches};

fn inc(
    id: i64,
    title: &str,
    description: &str,
    severity: Severity,
    at: OffsetDateTime,
) -> Incident {
    Incident {
        id,
        title: title.to_string(),
        description: description.to_string(),
        severity,
        reported_at: at,
    }
}

fn ids(incidents: &[Incident]) -> Vec<i64> {
    incidents.iter().map(|i| i.id).collect()
}

fn sample() -> Vec<Incident> {
    use Severity::{High, Low, Medium};
    let tie = datetime!(2025-03-04 09:00:00 UTC);
    let rows = [
        (1, "Login outage", "SSO provider down", High, datetime!(2025-03-01 08:00:00 UTC)),
        (2, "Slow search", "Index rebuild lag", Low, datetime!(2025-03-02 23:30:00 UTC)),
        (3, "Billing drift", "Invoices off by a cent", Medium, datetime!(2025-03-03 00:15:00 UTC)),
        (4, "Chatbot leak", "Exposed LOGIN hints", High, datetime!(2025-03-03 12:00:00 UTC)),
        (5, "Same instant A", "tie", Low, tie),
        (6, "Same instant B", "tie", Medium, tie),
        (7, "Same instant C", "tie", High, tie),
    ];
    rows.into_iter()
        .map(|(id, title, description, severity, at)| inc(id, title, description, severity, at))
        .collect()
}

#[test]
fn default_criteria_list_everything_newest_first() {
    let visible = list_visible(&seed_incidents(), &FilterCriteria::default(), UtcOffset::UTC);
    assert_eq!(ids(&visible), vec![2, 3, 1]);
}

#[test]
fn date_range_scenario_from_seed_data() {
    let seed = seed_incidents();

    let criteria = FilterCriteria::default()
        .with_date_range(Some(date!(2025 - 03 - 16)), Some(date!(2025 - 04 - 02)));
    let visible = list_visible(&seed, &criteria, UtcOffset::UTC);
    // 2025-04-01 and 2025-03-20 both fall inside the inclusive window.
    assert_eq!(ids(&visible), vec![2, 3]);

    let criteria = FilterCriteria::default()
        .with_date_range(Some(date!(2025 - 03 - 21)), Some(date!(2025 - 04 - 02)));
    let visible = list_visible(&seed, &criteria, UtcOffset::UTC);
    assert_eq!(ids(&visible), vec![2]);
    assert_eq!(visible[0].severity, Severity::High);
}

#[test]
fn date_bounds_are_inclusive_whole_days() {
    let incidents = sample();
    let criteria = FilterCriteria::default()
        .with_date_range(Some(date!(2025 - 03 - 02)), Some(date!(2025 - 03 - 03)))
        .with_sort(SortOrder::Oldest);
    let visible = list_visible(&incidents, &criteria, UtcOffset::UTC);
    assert_eq!(ids(&visible), vec![2, 3, 4]);
}

#[test]
fn date_bounds_use_the_local_calendar_day() {
    let incidents = sample();
    let criteria = FilterCriteria::default()
        .with_date_range(Some(date!(2025 - 03 - 03)), Some(date!(2025 - 03 - 03)));

    // At UTC-5, 2025-03-03T00:15Z is still March 2 and 2025-03-02T23:30Z is March 2.
    let visible = list_visible(&incidents, &criteria, offset!(-5));
    assert_eq!(ids(&visible), vec![4]);

    // At UTC+1, 2025-03-02T23:30Z is already March 3.
    let visible = list_visible(&incidents, &criteria, offset!(+1));
    assert_eq!(ids(&visible), vec![4, 3, 2]);
}

#[test]
fn search_is_case_insensitive_over_title_and_description() {
    let incidents = sample();
    let visible = list_visible(
        &incidents,
        &FilterCriteria::default().with_search("login"),
        UtcOffset::UTC,
    );
    assert_eq!(ids(&visible), vec![4, 1]);
}

#[test]
fn whitespace_only_search_matches_everything() {
    let incidents = sample();
    let visible = list_visible(
        &incidents,
        &FilterCriteria::default().with_search("   "),
        UtcOffset::UTC,
    );
    assert_eq!(visible.len(), incidents.len());
}

#[test]
fn severity_filter_combines_with_search() {
    let incidents = sample();
    let criteria = FilterCriteria::default()
        .with_severity(Severity::High)
        .with_severity(Severity::Medium)
        .with_search("i");
    let visible = list_visible(&incidents, &criteria, UtcOffset::UTC);
    assert_eq!(ids(&visible), vec![6, 7, 4, 3, 1]);
}

#[test]
fn ties_keep_collection_order_in_both_directions() {
    let incidents = sample();
    let newest = list_visible(&incidents, &FilterCriteria::default(), UtcOffset::UTC);
    assert_eq!(ids(&newest), vec![5, 6, 7, 4, 3, 2, 1]);

    let oldest = list_visible(
        &incidents,
        &FilterCriteria::default().with_sort(SortOrder::Oldest),
        UtcOffset::UTC,
    );
    assert_eq!(ids(&oldest), vec![1, 2, 3, 4, 5, 6, 7]);

    let mut reordered = incidents.clone();
    reordered.swap(4, 6);
    let newest = list_visible(&reordered, &FilterCriteria::default(), UtcOffset::UTC);
    assert_eq!(ids(&newest[..3]), vec![7, 6, 5]);
}

#[test]
fn no_match_is_an_empty_list() {
    let view = list_view(
        &sample(),
        &FilterCriteria::default().with_search("nothing like this"),
        UtcOffset::UTC,
    );
    assert!(view.incidents.is_empty());
    assert_eq!(view.showing_line(), "Showing 0 of 7 incidents");
}

#[test]
fn output_is_exactly_the_matching_subset_for_many_criteria() {
    let incidents = sample();
    let searches = ["", "tie", "LOGIN", "cent", "zzz"];
    let severity_sets: [&[Severity]; 4] = [
        &[],
        &[Severity::Low],
        &[Severity::High, Severity::Medium],
        &[Severity::Low, Severity::Medium, Severity::High],
    ];
    let ranges = [
        (None, None),
        (Some(date!(2025 - 03 - 02)), None),
        (None, Some(date!(2025 - 03 - 03))),
        (Some(date!(2025 - 03 - 04)), Some(date!(2025 - 03 - 01))),
    ];

    for search in searches {
        for sevs in severity_sets {
            for (start, end) in ranges {
                for order in [SortOrder::Newest, SortOrder::Oldest] {
                    let mut criteria = FilterCriteria::default()
                        .with_search(search)
                        .with_date_range(start, end)
                        .with_sort(order);
                    criteria.severities.extend(sevs.iter().copied());

                    let visible = list_visible(&incidents, &criteria, UtcOffset::UTC);

                    let mut got = ids(&visible);
                    got.sort();
                    let mut want: Vec<i64> = incidents
                        .iter()
                        .filter(|i| matches(i, &criteria, UtcOffset::UTC))
                        .map(|i| i.id)
                        .collect();
                    want.sort();
                    assert_eq!(got, want, "criteria={criteria:?}");

                    for pair in visible.windows(2) {
                        match order {
                            SortOrder::Newest => {
                                assert!(pair[0].reported_at >= pair[1].reported_at)
                            }
                            SortOrder::Oldest => {
                                assert!(pair[0].reported_at <= pair[1].reported_at)
                            }
                        }
                    }
                }
            }
        }
    }
}
