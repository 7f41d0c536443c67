//! Markdown summary of a loaded dataset.

use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::config::{BURN_RISK_EXCLUDED_RATE, BURN_RISK_LIMIT};
use crate::dataset::Dataset;

pub fn build_report(dataset: &Dataset, generated_at: DateTime<Utc>) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Mental Health Monitor Report");
    let _ = writeln!(
        output,
        "Generated {} from load {} ({} employees, {} incomplete rows dropped, teams of {})",
        generated_at.format("%Y-%m-%d %H:%M UTC"),
        dataset.load_id(),
        dataset.records().len(),
        dataset.dropped(),
        dataset.team_size()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Average Mental Fatigue Score");

    match dataset.mean_score() {
        Some(mean) => {
            let _ = writeln!(output, "Average MFS across all employees is {mean:.2}.");
        }
        None => {
            let _ = writeln!(output, "No employees loaded.");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## MFS by Group");

    let total = dataset.records().len();
    if total == 0 {
        let _ = writeln!(output, "No employees loaded.");
    } else {
        for bucket in dataset.bucket_counts() {
            let _ = writeln!(
                output,
                "- {}: {} employees ({:.1}%)",
                bucket.bucket.label(),
                bucket.count,
                bucket.count as f64 * 100.0 / total as f64
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Most Stressed Teams");

    let mut teams = dataset.aggregate_mean_score_by_team();
    teams.reverse();
    if teams.is_empty() {
        let _ = writeln!(output, "No teams formed.");
    } else {
        for team in teams.iter().take(10) {
            let _ = writeln!(
                output,
                "- {}: mean MFS {:.2} across {} members",
                team.team, team.mean_score, team.member_count
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Employees Most Likely to Burn");

    let at_risk = dataset.top_n_by_burn_rate(BURN_RISK_LIMIT, BURN_RISK_EXCLUDED_RATE);
    if at_risk.is_empty() {
        let _ = writeln!(output, "No employees at risk.");
    } else {
        for record in at_risk {
            let _ = writeln!(
                output,
                "- {} ({}, designation {}, resource allocation {}) burn rate {:.2}",
                record.employee_code,
                record.team,
                record.designation,
                record.resource_allocation,
                record.burn_rate
            );
        }
    }

    output
}
