// =============================================================================
// main.rs — KBO CRAWL ENGINE
// =============================================================================
//
// Command-line front end. Parses the command, loads configuration from the
// environment (and `.env`), sets up logging, and hands over to the pipeline.
//
// Dates are `YYYY-MM-DD`, months `YYYY-MM`. Commands that take an optional
// date default the way the scheduled jobs call them: results for yesterday,
// schedules for the current month, standings for today.
//
// Exit status is non-zero when the run failed outright or when any batch
// was refused by the backend.
// =============================================================================

use anyhow::{bail, Result};
use chrono::{Datelike, Duration, Local, NaiveDate};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use kbo_crawl_engine::config::Config;
use kbo_crawl_engine::dates;
use kbo_crawl_engine::pipeline::{self, Command};

#[derive(Parser)]
#[command(name = "kbo_crawl_engine")]
#[command(about = "Crawl KBO schedules, results, box scores and standings", long_about = None)]
struct Cli {
    /// Print batches as JSON instead of sending them
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// One day's schedule
    Schedule {
        #[arg(value_parser = dates::parse_iso_date)]
        date: NaiveDate,
    },
    /// Every day from START to END, one batch per day
    ScheduleRange {
        #[arg(value_parser = dates::parse_iso_date)]
        start: NaiveDate,
        #[arg(value_parser = dates::parse_iso_date)]
        end: NaiveDate,
    },
    /// A whole month's schedule, team names only
    MonthlySchedule {
        /// YYYY-MM, defaults to the current month
        #[arg(value_parser = dates::parse_year_month)]
        year_month: Option<(i32, u32)>,
    },
    /// Results of a day, then the box scores of its finished games
    #[command(alias = "full")]
    DailyUpdate {
        /// Defaults to yesterday
        #[arg(value_parser = dates::parse_iso_date)]
        date: Option<NaiveDate>,
    },
    /// Box scores of games the backend already has review links for
    PlayerStats {
        #[arg(value_parser = dates::parse_iso_date)]
        date: NaiveDate,
    },
    /// Team standings
    TeamRankings {
        /// Standings as of this date; the live table when omitted
        #[arg(long, value_parser = dates::parse_iso_date)]
        date: Option<NaiveDate>,
    },
    /// Team win rates only
    TeamWinrates {
        /// Defaults to today
        #[arg(long, value_parser = dates::parse_iso_date)]
        date: Option<NaiveDate>,
    },
    /// One day's games from the JSON schedule service
    ScheduleApi {
        #[arg(value_parser = dates::parse_iso_date)]
        date: NaiveDate,
    },
    /// Check that the storage backend is up
    Health,
}

impl Commands {
    fn into_command(self, today: NaiveDate) -> Command {
        match self {
            Commands::Schedule { date } => Command::Schedule { date },
            Commands::ScheduleRange { start, end } => Command::ScheduleRange { start, end },
            Commands::MonthlySchedule { year_month } => {
                let (year, month) = year_month.unwrap_or((today.year(), today.month()));
                Command::MonthlySchedule { year, month }
            }
            Commands::DailyUpdate { date } => Command::DailyUpdate {
                date: date.unwrap_or(today - Duration::days(1)),
            },
            Commands::PlayerStats { date } => Command::PlayerStats { date },
            Commands::TeamRankings { date } => Command::TeamRankings { date },
            Commands::TeamWinrates { date } => Command::TeamWinRates {
                date: date.unwrap_or(today),
            },
            Commands::ScheduleApi { date } => Command::ScheduleApi { date },
            Commands::Health => Command::Health,
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);
    if json {
        builder.json().init();
    } else {
        builder.with_ansi(true).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env();
    init_tracing(config.log_json);

    let command = cli.command.into_command(Local::now().date_naive());
    info!(command = command.name(), site = %config.site_origin, backend = %config.backend_url, "kbo crawl engine starting");

    let summary = pipeline::run(&config, command, cli.dry_run).await?;
    if summary.batches_failed > 0 {
        bail!("{} batch(es) refused by the backend", summary.batches_failed);
    }
    Ok(())
}
