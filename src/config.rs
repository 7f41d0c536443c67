//! Defaults for the dashboard. CLI flags and environment variables
//! override these in `main`.

/// Public burn-out survey extracts the dashboard was first built on.
pub const DEFAULT_SURVEY_SOURCES: [&str; 2] = [
    "https://raw.githubusercontent.com/nickzumbuehl/sanguinehealth/master/burn_out_train.csv",
    "https://raw.githubusercontent.com/nickzumbuehl/sanguinehealth/master/burn_out_test.csv",
];

pub const DEFAULT_PORT: u16 = 7777;
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_TEAM_SIZE: usize = 20;

/// Rows in the "employees most likely to burn" table.
pub const BURN_RISK_LIMIT: usize = 15;
/// A burn rate of exactly 1.0 is an already-burnt-out employee, not a risk.
pub const BURN_RISK_EXCLUDED_RATE: f64 = 1.0;
/// Teams shown in the "most stressed teams" chart.
pub const TEAM_AGGREGATE_LIMIT: usize = 20;
/// Designation level from which an employee counts as mid/top management.
pub const MANAGEMENT_DESIGNATION: f64 = 4.0;
/// Placeholder score some extracts use for "not measured".
pub const SENTINEL_SCORE: f64 = 100.0;
/// Team preselected on the team view.
pub const DEFAULT_TEAM_SELECTION: &str = "T0";

/// How synthetic teams are laid over the row sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum TeamLayout {
    /// Consecutive blocks of `team_size` rows; leftovers join the last team.
    #[default]
    Blocks,
    /// Row `i` joins team `i mod team_count`.
    RoundRobin,
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub team_size: usize,
    pub layout: TeamLayout,
}

impl PipelineOptions {
    pub fn new(team_size: usize, layout: TeamLayout) -> Self {
        Self {
            team_size: team_size.max(1),
            layout,
        }
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::new(DEFAULT_TEAM_SIZE, TeamLayout::Blocks)
    }
}
