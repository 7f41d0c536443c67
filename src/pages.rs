//! Askama views for the three dashboard pages. Charts are rendered as
//! tables of the same data the `/api` endpoints return.

use std::collections::HashSet;

use askama::Template;

use crate::config::{BURN_RISK_EXCLUDED_RATE, BURN_RISK_LIMIT};
use crate::dataset::{Dataset, HistogramScope};
use crate::health::HealthStats;
use crate::models::{HistogramBin, TeamId};

pub struct Table {
    pub title: String,
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    fn new(title: impl Into<String>, headers: &[&'static str], rows: Vec<Vec<String>>) -> Self {
        Self {
            title: title.into(),
            headers: headers.to_vec(),
            rows,
        }
    }
}

pub struct TeamChoice {
    pub label: String,
    pub selected: bool,
}

#[derive(Template)]
#[template(path = "executive.html")]
pub struct ExecutiveTemplate {
    active: &'static str,
    burn_risk: Table,
    mean_line: String,
    charts: Vec<Table>,
}

#[derive(Template)]
#[template(path = "team_view.html")]
pub struct TeamViewTemplate {
    active: &'static str,
    choices: Vec<TeamChoice>,
    charts: Vec<Table>,
}

#[derive(Template)]
#[template(path = "causes.html")]
pub struct CausesTemplate {
    active: &'static str,
    has_stats: bool,
    tables: Vec<Table>,
}

fn histogram_table(title: &str, bins: Vec<HistogramBin>) -> Table {
    let rows = bins
        .into_iter()
        .map(|bin| {
            vec![
                bin.gender,
                format!("{}-{}", bin.lower, bin.upper),
                bin.count.to_string(),
            ]
        })
        .collect();
    Table::new(title, &["Gender", "MFS", "Employees"], rows)
}

fn team_score_table(dataset: &Dataset) -> Table {
    let rows = dataset
        .aggregate_mean_score_by_team()
        .into_iter()
        .map(|team| {
            vec![
                team.team.to_string(),
                format!("{:.2}", team.mean_score),
                team.member_count.to_string(),
            ]
        })
        .collect();
    Table::new(
        "MFS of most stressed teams",
        &["Team", "Mean MFS", "Members"],
        rows,
    )
}

pub fn executive_summary(dataset: &Dataset) -> ExecutiveTemplate {
    let rows = dataset
        .top_n_by_burn_rate(BURN_RISK_LIMIT, BURN_RISK_EXCLUDED_RATE)
        .into_iter()
        .map(|record| {
            vec![
                record.employee_code.clone(),
                record.team.to_string(),
                record.designation.to_string(),
                record.resource_allocation.to_string(),
                format!("{:.2}", record.burn_rate),
            ]
        })
        .collect();
    let burn_risk = Table::new(
        "Employees most likely to burn",
        &["emp_code", "team", "Designation", "Resource Allocation", "Burn Rate"],
        rows,
    );

    let mean_line = match dataset.mean_score() {
        Some(mean) => format!("Average Mental Fatigue Score (MFS) of your Employees is {mean:.2}"),
        None => "No employees loaded.".to_string(),
    };

    let bucket_rows = dataset
        .bucket_counts()
        .into_iter()
        .map(|bucket| vec![bucket.bucket.label().to_string(), bucket.count.to_string()])
        .collect();

    ExecutiveTemplate {
        active: "/",
        burn_risk,
        mean_line,
        charts: vec![
            histogram_table(
                "Distribution of MFS",
                dataset.score_histogram(HistogramScope::All),
            ),
            team_score_table(dataset),
            Table::new("MFS by Groups", &["Group", "Employees"], bucket_rows),
        ],
    }
}

pub fn team_view(dataset: &Dataset, selected: &HashSet<TeamId>) -> TeamViewTemplate {
    let choices = dataset
        .team_options()
        .into_iter()
        .map(|team| TeamChoice {
            label: team.to_string(),
            selected: selected.contains(&team),
        })
        .collect();

    let members = dataset
        .team_members_by_score(selected)
        .into_iter()
        .map(|record| {
            vec![
                record.employee_code.clone(),
                record.team.to_string(),
                format!("{:.1}", record.mental_fatigue_score),
            ]
        })
        .collect();

    let seniority = dataset
        .seniority_points(selected)
        .into_iter()
        .map(|point| {
            vec![
                point.employee_code,
                point.designation.to_string(),
                format!("{:.1}", point.mental_fatigue_score),
                point.resource_allocation.to_string(),
            ]
        })
        .collect();

    TeamViewTemplate {
        active: "/page-1",
        choices,
        charts: vec![
            Table::new("MFS of Team Members", &["emp_code", "team", "MFS"], members),
            team_score_table(dataset),
            Table::new(
                "Correlation of Level of Seniority & MFS",
                &["emp_code", "Designation", "MFS", "Resource Allocation"],
                seniority,
            ),
            histogram_table(
                "Distribution of MFS for Mid & Top Management",
                dataset.score_histogram(HistogramScope::Management),
            ),
        ],
    }
}

pub fn causes_view(
    health: &HealthStats,
    cause: Option<&str>,
    locations: &HashSet<String>,
    countries: &HashSet<String>,
) -> CausesTemplate {
    let mut tables = Vec::new();

    if health.has_burden() {
        let cause = cause
            .map(str::to_string)
            .or_else(|| health.causes().first().cloned())
            .unwrap_or_default();
        let rows = health
            .cause_trend(&cause, locations)
            .into_iter()
            .map(|row| {
                vec![
                    row.location_name.clone(),
                    row.year.to_string(),
                    format!("{:.4}", row.val),
                ]
            })
            .collect();
        tables.push(Table::new(
            format!("Incidence of {cause} (%)"),
            &["Location", "Year", "Value"],
            rows,
        ));
    }

    if health.has_institutions() {
        let rows = health
            .hospitals_by_country(countries)
            .into_iter()
            .map(|row| vec![row.country.clone(), format!("{:.2}", row.hospitals_per_100k)])
            .collect();
        tables.push(Table::new(
            "Mental hospitals per 100K population",
            &["Country", "Hospitals"],
            rows,
        ));
    }

    CausesTemplate {
        active: "/page-2",
        has_stats: !health.is_empty(),
        tables,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::tests::sample_record;
    use crate::models::InstitutionRecord;

    #[test]
    fn cell_values_are_escaped() {
        let mut record = sample_record(0, 0, 5.0, 0.5);
        record.gender = "<b>".to_string();
        let dataset = Dataset::new(vec![record], None, 20, 0);
        let html = executive_summary(&dataset).render().unwrap();
        assert!(html.contains("<td>&lt;b&gt;</td>"));
        assert!(!html.contains("<td><b></td>"));
    }

    #[test]
    fn marks_the_active_page() {
        let dataset = Dataset::new(vec![sample_record(0, 0, 5.0, 0.5)], None, 20, 0);
        let html = executive_summary(&dataset).render().unwrap();
        assert!(html.contains("<a href=\"/\" class=\"active\">Executive Summary</a>"));
        assert!(html.contains("<a href=\"/page-1\">Team &amp; Employee View</a>"));
        assert!(html.contains("Average Mental Fatigue Score (MFS) of your Employees is 5.00"));
    }

    #[test]
    fn team_view_preselects_teams() {
        let dataset = Dataset::new(
            vec![sample_record(0, 0, 5.0, 0.5), sample_record(1, 1, 3.0, 0.5)],
            None,
            1,
            0,
        );
        let selected: HashSet<TeamId> = [TeamId(1)].into_iter().collect();
        let html = team_view(&dataset, &selected).render().unwrap();
        assert!(html.contains("<option value=\"T1\" selected>T1</option>"));
        assert!(html.contains("<option value=\"T0\">T0</option>"));
        assert!(html.contains("<td>E1</td>"));
        assert!(html.contains("<a href=\"/page-1\" class=\"active\">"));
    }

    #[test]
    fn causes_view_without_stats_shows_placeholder() {
        let html = causes_view(&HealthStats::default(), None, &HashSet::new(), &HashSet::new())
            .render()
            .unwrap();
        assert!(html.contains("No public-health statistics loaded."));

        let health = HealthStats::new(
            vec![InstitutionRecord {
                country: "Japan".to_string(),
                hospitals_per_100k: 0.85,
            }],
            Vec::new(),
        );
        let countries: HashSet<String> = ["Japan".to_string()].into_iter().collect();
        let html = causes_view(&health, None, &HashSet::new(), &countries)
            .render()
            .unwrap();
        assert!(html.contains("<td>Japan</td><td>0.85</td>"));
        assert!(!html.contains("No public-health statistics loaded."));
    }
}
