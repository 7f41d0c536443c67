//! The enriched survey table and the read-only queries behind each chart.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::{MANAGEMENT_DESIGNATION, SENTINEL_SCORE, TEAM_AGGREGATE_LIMIT};
use crate::models::{BucketCount, FatigueBucket, HistogramBin, Record, SeniorityPoint, TeamId, TeamScore};

/// Which rows feed the score histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistogramScope {
    /// Everyone except the sentinel score.
    #[default]
    All,
    /// Mid and top management only.
    Management,
}

/// The enriched survey table. Built once, then only read.
#[derive(Debug)]
pub struct Dataset {
    load_id: Uuid,
    loaded_at: DateTime<Utc>,
    team_size: usize,
    dropped: usize,
    quintile_edges: Option<[f64; 6]>,
    records: Vec<Record>,
}

impl Dataset {
    pub fn new(
        records: Vec<Record>,
        quintile_edges: Option<[f64; 6]>,
        team_size: usize,
        dropped: usize,
    ) -> Self {
        Self {
            load_id: Uuid::new_v4(),
            loaded_at: Utc::now(),
            team_size,
            dropped,
            quintile_edges,
            records,
        }
    }

    pub fn load_id(&self) -> Uuid {
        self.load_id
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn team_size(&self) -> usize {
        self.team_size
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn quintile_edges(&self) -> Option<&[f64; 6]> {
        self.quintile_edges.as_ref()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn filter_by_team(&self, teams: &HashSet<TeamId>) -> Vec<&Record> {
        self.records
            .iter()
            .filter(|record| teams.contains(&record.team))
            .collect()
    }

    /// Mean score of the first teams in label order (`T0`, `T1`, `T10`, ...),
    /// least stressed first.
    pub fn aggregate_mean_score_by_team(&self) -> Vec<TeamScore> {
        let mut totals: BTreeMap<String, (TeamId, f64, usize)> = BTreeMap::new();
        for record in &self.records {
            let entry = totals
                .entry(record.team.to_string())
                .or_insert((record.team, 0.0, 0));
            entry.1 += record.mental_fatigue_score;
            entry.2 += 1;
        }

        let mut scores: Vec<TeamScore> = totals
            .into_values()
            .take(TEAM_AGGREGATE_LIMIT)
            .map(|(team, total, count)| TeamScore {
                team,
                mean_score: total / count as f64,
                member_count: count,
            })
            .collect();
        scores.sort_by(|a, b| a.mean_score.total_cmp(&b.mean_score));
        scores
    }

    pub fn top_n_by_burn_rate(&self, n: usize, exclude_value: f64) -> Vec<&Record> {
        let mut candidates: Vec<&Record> = self
            .records
            .iter()
            .filter(|record| record.burn_rate != exclude_value)
            .collect();
        candidates.sort_by(|a, b| b.burn_rate.total_cmp(&a.burn_rate));
        candidates.truncate(n);
        candidates
    }

    pub fn bucket_counts(&self) -> Vec<BucketCount> {
        FatigueBucket::ALL
            .iter()
            .map(|bucket| BucketCount {
                bucket: *bucket,
                count: self
                    .records
                    .iter()
                    .filter(|record| record.fatigue_bucket == *bucket)
                    .count(),
            })
            .collect()
    }

    pub fn team_options(&self) -> Vec<TeamId> {
        self.records
            .iter()
            .map(|record| record.team)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn team_members_by_score(&self, teams: &HashSet<TeamId>) -> Vec<&Record> {
        let mut members = self.filter_by_team(teams);
        members.sort_by(|a, b| a.mental_fatigue_score.total_cmp(&b.mental_fatigue_score));
        members
    }

    pub fn seniority_points(&self, teams: &HashSet<TeamId>) -> Vec<SeniorityPoint> {
        self.filter_by_team(teams)
            .into_iter()
            .map(|record| SeniorityPoint {
                employee_code: record.employee_code.clone(),
                team: record.team,
                designation: record.designation,
                mental_fatigue_score: record.mental_fatigue_score,
                resource_allocation: record.resource_allocation,
            })
            .collect()
    }

    /// Mean fatigue score rounded to two decimals.
    pub fn mean_score(&self) -> Option<f64> {
        if self.records.is_empty() {
            return None;
        }
        let total: f64 = self.records.iter().map(|record| record.mental_fatigue_score).sum();
        let mean = total / self.records.len() as f64;
        Some((mean * 100.0).round() / 100.0)
    }

    /// Counts per gender and unit-width score bin.
    pub fn score_histogram(&self, scope: HistogramScope) -> Vec<HistogramBin> {
        let mut bins: BTreeMap<(String, i64), usize> = BTreeMap::new();
        let selected = self.records.iter().filter(|record| match scope {
            HistogramScope::All => record.mental_fatigue_score != SENTINEL_SCORE,
            HistogramScope::Management => record.designation >= MANAGEMENT_DESIGNATION,
        });
        for record in selected {
            let bin = record.mental_fatigue_score.floor() as i64;
            *bins.entry((record.gender.clone(), bin)).or_insert(0) += 1;
        }

        bins.into_iter()
            .map(|((gender, bin), count)| HistogramBin {
                gender,
                lower: bin as f64,
                upper: (bin + 1) as f64,
                count,
            })
            .collect()
    }
}
