//! HTTP surface: the three dashboard pages and the JSON behind each chart.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;

use askama::Template;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::{BURN_RISK_EXCLUDED_RATE, BURN_RISK_LIMIT, DEFAULT_TEAM_SELECTION};
use crate::dataset::{Dataset, HistogramScope};
use crate::health::HealthStats;
use crate::models::{
    BucketCount, BurdenRecord, HistogramBin, InstitutionRecord, Record, SeniorityPoint, TeamId,
    TeamScore,
};
use crate::pages;

/// Location preselected on the causes page.
const DEFAULT_LOCATION: &str = "Global";

#[derive(Clone)]
pub struct AppState {
    dataset: Arc<Dataset>,
    health: Arc<HealthStats>,
}

impl AppState {
    pub fn new(dataset: Dataset, health: HealthStats) -> Self {
        Self {
            dataset: Arc::new(dataset),
            health: Arc::new(health),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(executive_summary))
        .route("/page-1", get(team_view))
        .route("/page-2", get(causes_view))
        .route("/api/summary", get(summary))
        .route("/api/teams", get(teams))
        .route("/api/records", get(records))
        .route("/api/team-scores", get(team_scores))
        .route("/api/burn-risk", get(burn_risk))
        .route("/api/buckets", get(buckets))
        .route("/api/score-distribution", get(score_distribution))
        .route("/api/seniority", get(seniority))
        .route("/api/health/hospitals", get(hospitals))
        .route("/api/health/causes", get(cause_trend))
        .with_state(state)
}

pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

type Pairs = Query<Vec<(String, String)>>;

/// All comma-separated values given for `key`, or `None` when the key is
/// absent. `key=` yields an empty list.
fn list_param<'a>(pairs: &'a [(String, String)], key: &str) -> Option<Vec<&'a str>> {
    let mut found = false;
    let mut values = Vec::new();
    for (name, value) in pairs {
        if name != key {
            continue;
        }
        found = true;
        values.extend(value.split(',').map(str::trim).filter(|v| !v.is_empty()));
    }
    found.then_some(values)
}

fn selected_teams(pairs: &[(String, String)], default: &[&str]) -> HashSet<TeamId> {
    list_param(pairs, "teams")
        .unwrap_or_else(|| default.to_vec())
        .into_iter()
        .filter_map(TeamId::parse)
        .collect()
}

fn selected_strings(pairs: &[(String, String)], key: &str, default: Vec<String>) -> HashSet<String> {
    match list_param(pairs, key) {
        Some(values) => values.into_iter().map(str::to_string).collect(),
        None => default.into_iter().collect(),
    }
}

fn first_param<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.as_str())
        .filter(|value| !value.is_empty())
}

type Page = Result<Html<String>, StatusCode>;

fn render(template: impl Template) -> Page {
    template.render().map(Html).map_err(|err| {
        error!(%err, "failed to render page");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

async fn executive_summary(State(state): State<AppState>) -> Page {
    render(pages::executive_summary(&state.dataset))
}

async fn team_view(State(state): State<AppState>, Query(pairs): Pairs) -> Page {
    let teams = selected_teams(&pairs, &[DEFAULT_TEAM_SELECTION]);
    debug!(teams = teams.len(), "rendering team view");
    render(pages::team_view(&state.dataset, &teams))
}

async fn causes_view(State(state): State<AppState>, Query(pairs): Pairs) -> Page {
    let locations = selected_strings(&pairs, "locations", vec![DEFAULT_LOCATION.to_string()]);
    let countries = selected_strings(&pairs, "countries", state.health.countries());
    render(pages::causes_view(
        &state.health,
        first_param(&pairs, "cause"),
        &locations,
        &countries,
    ))
}

#[derive(Debug, Serialize)]
struct Summary {
    load_id: Uuid,
    loaded_at: DateTime<Utc>,
    records: usize,
    dropped: usize,
    team_size: usize,
    mean_score: Option<f64>,
    quintile_edges: Option<[f64; 6]>,
}

async fn summary(State(state): State<AppState>) -> Json<Summary> {
    let dataset = &state.dataset;
    Json(Summary {
        load_id: dataset.load_id(),
        loaded_at: dataset.loaded_at(),
        records: dataset.records().len(),
        dropped: dataset.dropped(),
        team_size: dataset.team_size(),
        mean_score: dataset.mean_score(),
        quintile_edges: dataset.quintile_edges().copied(),
    })
}

async fn teams(State(state): State<AppState>) -> Json<Vec<TeamId>> {
    Json(state.dataset.team_options())
}

async fn records(State(state): State<AppState>, Query(pairs): Pairs) -> Json<Vec<Record>> {
    let teams = selected_teams(&pairs, &[]);
    Json(
        state
            .dataset
            .filter_by_team(&teams)
            .into_iter()
            .cloned()
            .collect(),
    )
}

async fn team_scores(State(state): State<AppState>) -> Json<Vec<TeamScore>> {
    Json(state.dataset.aggregate_mean_score_by_team())
}

#[derive(Debug, Deserialize)]
struct BurnRiskQuery {
    n: Option<usize>,
    exclude: Option<f64>,
}

async fn burn_risk(
    State(state): State<AppState>,
    Query(query): Query<BurnRiskQuery>,
) -> Json<Vec<Record>> {
    let n = query.n.unwrap_or(BURN_RISK_LIMIT);
    let exclude = query.exclude.unwrap_or(BURN_RISK_EXCLUDED_RATE);
    Json(
        state
            .dataset
            .top_n_by_burn_rate(n, exclude)
            .into_iter()
            .cloned()
            .collect(),
    )
}

async fn buckets(State(state): State<AppState>) -> Json<Vec<BucketCount>> {
    Json(state.dataset.bucket_counts())
}

#[derive(Debug, Deserialize)]
struct DistributionQuery {
    #[serde(default)]
    scope: HistogramScope,
}

async fn score_distribution(
    State(state): State<AppState>,
    Query(query): Query<DistributionQuery>,
) -> Json<Vec<HistogramBin>> {
    Json(state.dataset.score_histogram(query.scope))
}

async fn seniority(State(state): State<AppState>, Query(pairs): Pairs) -> Json<Vec<SeniorityPoint>> {
    let teams = selected_teams(&pairs, &[]);
    Json(state.dataset.seniority_points(&teams))
}

async fn hospitals(
    State(state): State<AppState>,
    Query(pairs): Pairs,
) -> Json<Vec<InstitutionRecord>> {
    let countries = selected_strings(&pairs, "countries", state.health.countries());
    Json(
        state
            .health
            .hospitals_by_country(&countries)
            .into_iter()
            .cloned()
            .collect(),
    )
}

async fn cause_trend(State(state): State<AppState>, Query(pairs): Pairs) -> Json<Vec<BurdenRecord>> {
    let locations = selected_strings(&pairs, "locations", vec![DEFAULT_LOCATION.to_string()]);
    let Some(cause) = first_param(&pairs, "cause") else {
        return Json(Vec::new());
    };
    Json(
        state
            .health
            .cause_trend(cause, &locations)
            .into_iter()
            .cloned()
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::tests::sample_record;
    use crate::models::BurdenRecord;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn team_selection_accepts_lists_and_repeats() {
        let selected = selected_teams(&pairs(&[("teams", "T1,T3"), ("teams", "T4")]), &["T0"]);
        let expected: HashSet<TeamId> = [TeamId(1), TeamId(3), TeamId(4)].into_iter().collect();
        assert_eq!(selected, expected);

        let defaulted = selected_teams(&[], &["T0"]);
        let expected: HashSet<TeamId> = [TeamId(0)].into_iter().collect();
        assert_eq!(defaulted, expected);

        assert!(selected_teams(&pairs(&[("teams", "")]), &["T0"]).is_empty());
        assert!(selected_teams(&pairs(&[("teams", "bogus")]), &["T0"]).is_empty());
    }

    async fn spawn() -> String {
        let records = (0..40)
            .map(|i| sample_record(i, i / 20, (i % 10) as f64, f64::from(i as u32) / 40.0))
            .collect();
        let dataset = Dataset::new(records, None, 20, 0);
        let health = HealthStats::new(
            Vec::new(),
            vec![
                BurdenRecord {
                    cause_name: "Mental disorders".to_string(),
                    location_name: "Global".to_string(),
                    year: 2001,
                    val: 0.03,
                },
                BurdenRecord {
                    cause_name: "Mental disorders".to_string(),
                    location_name: "Global".to_string(),
                    year: 2000,
                    val: 0.02,
                },
            ],
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(AppState::new(dataset, health));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn serves_pages_and_404s_unknown_paths() {
        let base = spawn().await;

        let home = reqwest::get(format!("{base}/")).await.unwrap();
        assert!(home.status().is_success());
        assert!(home.text().await.unwrap().contains("Employees most likely to burn"));

        let page = reqwest::get(format!("{base}/page-1?teams=T1"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(page.contains("<option value=\"T1\" selected>T1</option>"));

        let missing = reqwest::get(format!("{base}/page-3")).await.unwrap();
        assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn api_filters_and_aggregates() {
        let base = spawn().await;

        let records: serde_json::Value = reqwest::get(format!("{base}/api/records?teams=T1"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let records = records.as_array().unwrap();
        assert_eq!(records.len(), 20);
        assert!(records.iter().all(|r| r["team"] == "T1"));

        let empty: serde_json::Value = reqwest::get(format!("{base}/api/records?teams="))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(empty.as_array().unwrap().len(), 0);

        let padded: serde_json::Value = reqwest::get(format!("{base}/api/records?teams=T01,T%2B1"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(padded.as_array().unwrap().len(), 0);

        let risk: serde_json::Value = reqwest::get(format!("{base}/api/burn-risk?n=5"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let risk = risk.as_array().unwrap();
        assert_eq!(risk.len(), 5);
        assert_eq!(risk[0]["employee_code"], "E39");

        let teams: serde_json::Value = reqwest::get(format!("{base}/api/teams"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(teams, serde_json::json!(["T0", "T1"]));

        let trend: serde_json::Value =
            reqwest::get(format!("{base}/api/health/causes?cause=Mental%20disorders"))
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
        let years: Vec<i64> = trend
            .as_array()
            .unwrap()
            .iter()
            .map(|row| row["year"].as_i64().unwrap())
            .collect();
        assert_eq!(years, vec![2000, 2001]);
    }
}
