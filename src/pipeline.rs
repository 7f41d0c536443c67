//! Turns raw survey rows into the enriched record set.
//!
//! Steps run in a fixed order: concatenate, assign employee codes, assign
//! teams, drop incomplete rows, bucket the fatigue score. Codes and teams
//! are positional over the concatenated sequence, so they are assigned
//! before incomplete rows are removed.

use tracing::{info, warn};

use crate::config::{PipelineOptions, TeamLayout};
use crate::dataset::Dataset;
use crate::error::{PipelineError, Result};
use crate::models::{FatigueBucket, RawSurveyRow, Record, TeamId, REQUIRED_SURVEY_COLUMNS};
use crate::source::Source;

/// Quantiles that delimit the five fatigue buckets.
const QUINTILES: [f64; 6] = [0.0, 0.2, 0.4, 0.6, 0.8, 1.0];

/// A raw row once it has a position-derived code and team.
#[derive(Debug, Clone)]
pub struct PositionedRow {
    pub employee_code: String,
    pub team: TeamId,
    pub raw: RawSurveyRow,
}

/// Loads every source in order and builds the dataset.
pub async fn load_dataset(sources: &[Source], options: &PipelineOptions) -> Result<Dataset> {
    if sources.is_empty() {
        return Err(PipelineError::NoSources);
    }

    let mut tables = Vec::with_capacity(sources.len());
    for source in sources {
        let rows: Vec<RawSurveyRow> = source.load_rows(&REQUIRED_SURVEY_COLUMNS).await?;
        info!(source = %source, rows = rows.len(), "loaded survey source");
        tables.push(rows);
    }

    Ok(build_dataset(tables, options))
}

/// Runs every derivation step over already-parsed tables.
pub fn build_dataset(tables: Vec<Vec<RawSurveyRow>>, options: &PipelineOptions) -> Dataset {
    let rows = concatenate(tables);
    let row_count = rows.len();
    let positioned = assign_positions(rows, options);
    let (complete, dropped) = drop_incomplete(positioned);
    if dropped > 0 {
        warn!(dropped, "dropped survey rows with missing fields");
    }

    let scores: Vec<f64> = complete.iter().map(|row| row.mental_fatigue_score).collect();
    let edges = quintile_edges(&scores);
    let records: Vec<Record> = complete
        .into_iter()
        .map(|row| {
            let bucket = edges
                .as_ref()
                .map(|edges| bucket_for(row.mental_fatigue_score, edges))
                .unwrap_or(FatigueBucket::Below2);
            row.into_record(bucket)
        })
        .collect();

    info!(
        rows = row_count,
        records = records.len(),
        team_size = options.team_size,
        "built survey dataset"
    );
    Dataset::new(records, edges, options.team_size, dropped)
}

pub fn concatenate(tables: Vec<Vec<RawSurveyRow>>) -> Vec<RawSurveyRow> {
    tables.into_iter().flatten().collect()
}

pub fn employee_code(position: usize) -> String {
    format!("E{position}")
}

/// Team for the row at `position` in a sequence of `row_count` rows.
pub fn team_for_position(
    position: usize,
    row_count: usize,
    team_size: usize,
    layout: TeamLayout,
) -> TeamId {
    let team_count = row_count / team_size.max(1);
    if team_count == 0 {
        return TeamId(0);
    }
    match layout {
        TeamLayout::Blocks => TeamId((position / team_size).min(team_count - 1)),
        TeamLayout::RoundRobin => TeamId(position % team_count),
    }
}

pub fn assign_positions(rows: Vec<RawSurveyRow>, options: &PipelineOptions) -> Vec<PositionedRow> {
    let row_count = rows.len();
    rows.into_iter()
        .enumerate()
        .map(|(position, raw)| PositionedRow {
            employee_code: employee_code(position),
            team: team_for_position(position, row_count, options.team_size, options.layout),
            raw,
        })
        .collect()
}

/// A row with every required field present, score already under its
/// canonical name.
#[derive(Debug, Clone)]
pub struct CompleteRow {
    pub employee_code: String,
    pub team: TeamId,
    pub employee_id: Option<String>,
    pub date_of_joining: Option<String>,
    pub gender: String,
    pub company_type: Option<String>,
    pub wfh_setup_available: Option<String>,
    pub designation: f64,
    pub resource_allocation: f64,
    pub mental_fatigue_score: f64,
    pub burn_rate: f64,
}

impl CompleteRow {
    fn from_positioned(row: PositionedRow) -> Option<Self> {
        let raw = row.raw;
        let gender = raw.gender.filter(|gender| !gender.is_empty())?;
        Some(Self {
            employee_code: row.employee_code,
            team: row.team,
            employee_id: raw.employee_id,
            date_of_joining: raw.date_of_joining,
            gender,
            company_type: raw.company_type,
            wfh_setup_available: raw.wfh_setup_available,
            designation: finite(raw.designation)?,
            resource_allocation: finite(raw.resource_allocation)?,
            mental_fatigue_score: finite(raw.mental_fatigue_score)?,
            burn_rate: finite(raw.burn_rate)?,
        })
    }

    fn into_record(self, fatigue_bucket: FatigueBucket) -> Record {
        Record {
            employee_code: self.employee_code,
            team: self.team,
            employee_id: self.employee_id,
            date_of_joining: self.date_of_joining,
            gender: self.gender,
            company_type: self.company_type,
            wfh_setup_available: self.wfh_setup_available,
            designation: self.designation,
            resource_allocation: self.resource_allocation,
            mental_fatigue_score: self.mental_fatigue_score,
            burn_rate: self.burn_rate,
            fatigue_bucket,
        }
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|value| value.is_finite())
}

/// Splits off rows missing a required field; returns the kept rows and
/// the number dropped.
pub fn drop_incomplete(rows: Vec<PositionedRow>) -> (Vec<CompleteRow>, usize) {
    let total = rows.len();
    let complete: Vec<CompleteRow> = rows
        .into_iter()
        .filter_map(CompleteRow::from_positioned)
        .collect();
    let dropped = total - complete.len();
    (complete, dropped)
}

/// Percentile with linear interpolation between order statistics.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let rank = (sorted.len() - 1) as f64 * q;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Equal-frequency cut points over `scores`; `None` for an empty table.
pub fn quintile_edges(scores: &[f64]) -> Option<[f64; 6]> {
    if scores.is_empty() {
        return None;
    }
    let mut sorted = scores.to_vec();
    sorted.sort_by(f64::total_cmp);
    Some(QUINTILES.map(|q| percentile(&sorted, q)))
}

pub fn bucket_for(score: f64, edges: &[f64; 6]) -> FatigueBucket {
    FatigueBucket::ALL
        .iter()
        .zip(&edges[1..])
        .find(|(_, upper)| score <= **upper)
        .map(|(bucket, _)| *bucket)
        .unwrap_or(FatigueBucket::Above8)
}
