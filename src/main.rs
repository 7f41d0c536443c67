use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};

mod config;
mod dataset;
mod error;
mod health;
mod models;
mod pages;
mod pipeline;
mod report;
mod server;
mod source;

use config::{PipelineOptions, TeamLayout};
use source::Source;

#[derive(Parser)]
#[command(name = "mental-health-monitor")]
#[command(about = "Employee burnout and mental fatigue dashboard", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Args)]
struct SurveyArgs {
    /// Survey CSV paths or http(s) URLs, loaded and concatenated in order
    #[arg(long = "source", env = "MHM_SOURCES", value_delimiter = ',')]
    sources: Vec<String>,
    /// Employees per synthetic team
    #[arg(
        long,
        env = "MHM_TEAM_SIZE",
        default_value_t = config::DEFAULT_TEAM_SIZE,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    team_size: usize,
    #[arg(long, value_enum, default_value_t = TeamLayout::Blocks)]
    team_layout: TeamLayout,
}

impl SurveyArgs {
    fn sources(&self) -> Vec<Source> {
        if self.sources.is_empty() {
            config::DEFAULT_SURVEY_SOURCES
                .iter()
                .map(|location| Source::parse(location))
                .collect()
        } else {
            self.sources.iter().map(|location| Source::parse(location)).collect()
        }
    }

    async fn load(&self) -> anyhow::Result<dataset::Dataset> {
        let options = PipelineOptions::new(self.team_size, self.team_layout);
        pipeline::load_dataset(&self.sources(), &options)
            .await
            .context("failed to build the survey dataset")
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the dashboard over HTTP
    Serve {
        #[command(flatten)]
        survey: SurveyArgs,
        #[arg(long, default_value = config::DEFAULT_HOST)]
        host: IpAddr,
        #[arg(long, env = "MHM_PORT", default_value_t = config::DEFAULT_PORT)]
        port: u16,
        /// Mental institutions per country CSV
        #[arg(long)]
        institutions: Option<String>,
        /// Global Burden of Disease CSV extract
        #[arg(long)]
        burden: Option<String>,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        survey: SurveyArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Print the employees most likely to burn out
    Top {
        #[command(flatten)]
        survey: SurveyArgs,
        #[arg(long, default_value_t = config::BURN_RISK_LIMIT)]
        limit: usize,
        #[arg(long, default_value_t = config::BURN_RISK_EXCLUDED_RATE)]
        exclude: f64,
    },
}

fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = match cli.verbose {
        0 => "mental_health_monitor=info",
        1 => "mental_health_monitor=debug",
        _ => "mental_health_monitor=trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => fmt().with_env_filter(env_filter).with_target(false).init(),
        LogFormat::Json => fmt().json().with_env_filter(env_filter).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    match cli.command {
        Commands::Serve {
            survey,
            host,
            port,
            institutions,
            burden,
        } => {
            let dataset = survey.load().await?;
            let institutions = institutions.as_deref().map(Source::parse);
            let burden = burden.as_deref().map(Source::parse);
            let health = health::HealthStats::load(institutions.as_ref(), burden.as_ref())
                .await
                .context("failed to load public-health statistics")?;
            let state = server::AppState::new(dataset, health);
            server::serve(state, SocketAddr::new(host, port)).await?;
        }
        Commands::Report { survey, out } => {
            let dataset = survey.load().await?;
            let report = report::build_report(&dataset, chrono::Utc::now());
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Top {
            survey,
            limit,
            exclude,
        } => {
            let dataset = survey.load().await?;
            let at_risk = dataset.top_n_by_burn_rate(limit, exclude);

            if at_risk.is_empty() {
                println!("No employees at risk.");
                return Ok(());
            }

            println!("Employees most likely to burn:");
            for record in at_risk {
                println!(
                    "- {} ({}, designation {}, resource allocation {}) burn rate {:.2}",
                    record.employee_code,
                    record.team,
                    record.designation,
                    record.resource_allocation,
                    record.burn_rate
                );
            }
        }
    }

    Ok(())
}
