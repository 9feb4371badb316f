// =============================================================================
// pipeline.rs — WHAT EACH COMMAND ACTUALLY DOES
// =============================================================================
//
// A command is a crawl plus the batches that follow from it:
//
//   schedule          one day's schedule           -> /api/kbo/games
//   schedule-range    every day, one batch per day -> /api/kbo/games
//   monthly-schedule  a month, team names only     -> /api/kbo/games/schedule
//   daily-update      results, then box scores     -> /api/kbo/games/results
//                                                     /api/kbo/player-stats
//   player-stats      box scores of stored games   -> /api/kbo/player-stats
//   team-rankings     standings                    -> /api/kbo/team-rankings
//   team-winrates     standings, rate only         -> /api/kbo/team-rankings/win-rates
//   schedule-api      one day from the JSON service -> /api/kbo/games
//   health            GET /actuator/health on the backend
//
// `Pipeline` holds borrowed backends so tests can hand it fixtures and a
// recording sink. `run` is the production entry point: it builds the real
// backends, opens a span with a fresh run id, and guarantees the browser
// session is closed however the command ends.
//
// With `dry_run` set, batches are printed as pretty JSON on stdout instead of
// being sent, and count as accepted.
// =============================================================================

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

use crate::config::{Config, RenderMode};
use crate::crawlers::Crawler;
use crate::dates;
use crate::fetcher::{BrowserSession, FormSource, PageFetcher, StaticFetcher};
use crate::metrics::CrawlMetrics;
use crate::models::ScheduleEntry;
use crate::sink::{Batch, GameLookup, HttpSink, RecordSink};
use crate::teams;

/// One invocation of the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Schedule { date: NaiveDate },
    ScheduleRange { start: NaiveDate, end: NaiveDate },
    MonthlySchedule { year: i32, month: u32 },
    DailyUpdate { date: NaiveDate },
    PlayerStats { date: NaiveDate },
    TeamRankings { date: Option<NaiveDate> },
    TeamWinRates { date: NaiveDate },
    ScheduleApi { date: NaiveDate },
    Health,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Schedule { .. } => "schedule",
            Command::ScheduleRange { .. } => "schedule-range",
            Command::MonthlySchedule { .. } => "monthly-schedule",
            Command::DailyUpdate { .. } => "daily-update",
            Command::PlayerStats { .. } => "player-stats",
            Command::TeamRankings { .. } => "team-rankings",
            Command::TeamWinRates { .. } => "team-winrates",
            Command::ScheduleApi { .. } => "schedule-api",
            Command::Health => "health",
        }
    }

    /// Commands that read the script-rendered schedule or review pages.
    fn needs_rendering(&self) -> bool {
        matches!(
            self,
            Command::Schedule { .. }
                | Command::ScheduleRange { .. }
                | Command::MonthlySchedule { .. }
                | Command::DailyUpdate { .. }
                | Command::PlayerStats { .. }
        )
    }
}

/// What a command produced and how much of it the backend took.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct RunSummary {
    pub records: usize,
    pub batches_sent: usize,
    pub batches_failed: usize,
}

/// The collaborators of one run.
pub struct Pipeline<'a> {
    pub config: &'a Config,
    /// Schedule, result and review pages.
    pub pages: &'a dyn PageFetcher,
    /// The server-rendered standings page.
    pub standings: &'a dyn PageFetcher,
    pub forms: &'a dyn FormSource,
    pub sink: &'a dyn RecordSink,
    pub lookup: &'a dyn GameLookup,
    pub metrics: &'a CrawlMetrics,
    pub dry_run: bool,
}

fn iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

impl Pipeline<'_> {
    fn page_crawler(&self) -> Crawler<'_, dyn PageFetcher + '_> {
        Crawler::new(self.pages, self.config, self.metrics)
    }

    async fn emit(&self, batch: Batch<'_>, summary: &mut RunSummary) -> bool {
        summary.records += batch.len();
        let accepted = if self.dry_run {
            match batch.payload().and_then(|p| Ok(serde_json::to_string_pretty(&p)?)) {
                Ok(json) => {
                    println!("{json}");
                    true
                }
                Err(e) => {
                    error!(endpoint = batch.path(), error = %e, "could not encode batch");
                    false
                }
            }
        } else {
            self.sink.send(batch).await
        };

        self.metrics.record_batch(accepted);
        if accepted {
            summary.batches_sent += 1;
        } else {
            summary.batches_failed += 1;
        }
        accepted
    }

    /// Run any command except `health`, which needs the concrete backend.
    pub async fn execute(&self, command: &Command) -> Result<RunSummary> {
        match *command {
            Command::Schedule { date } => self.schedule(date).await,
            Command::ScheduleRange { start, end } => self.schedule_range(start, end).await,
            Command::MonthlySchedule { year, month } => self.monthly_schedule(year, month).await,
            Command::DailyUpdate { date } => self.daily_update(date).await,
            Command::PlayerStats { date } => self.player_stats(date).await,
            Command::TeamRankings { date } => self.team_rankings(date).await,
            Command::TeamWinRates { date } => self.team_win_rates(date).await,
            Command::ScheduleApi { date } => self.schedule_api(date).await,
            Command::Health => bail!("health is answered by the backend, not by a crawl"),
        }
    }

    async fn send_day(&self, date: NaiveDate, games: &[ScheduleEntry], summary: &mut RunSummary) {
        if games.is_empty() {
            warn!(date = %date, "no games to send");
            return;
        }
        let game_date = iso(date);
        self.emit(
            Batch::DailyGames {
                game_date: &game_date,
                games,
            },
            summary,
        )
        .await;
    }

    pub async fn schedule(&self, date: NaiveDate) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let games = self.page_crawler().daily_schedule(date).await;
        self.send_day(date, &games, &mut summary).await;
        Ok(summary)
    }

    pub async fn schedule_range(&self, start: NaiveDate, end: NaiveDate) -> Result<RunSummary> {
        if end < start {
            bail!("range end {end} is before start {start}");
        }
        let mut summary = RunSummary::default();
        let outcome = self.page_crawler().schedule_range(start, end).await;
        for (date, games) in &outcome.days {
            if !games.is_empty() {
                self.send_day(*date, games, &mut summary).await;
            }
        }
        info!(
            days = outcome.days.len(),
            games = outcome.total(),
            failed_days = ?outcome.failed,
            "schedule range finished"
        );
        Ok(summary)
    }

    pub async fn monthly_schedule(&self, year: i32, month: u32) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let outcome = self
            .page_crawler()
            .monthly_schedule(year, month)
            .await
            .context("monthly schedule")?;
        let games = outcome.entries();
        if games.is_empty() {
            warn!(year, month, "no games found for the month");
            return Ok(summary);
        }
        let year_month = format!("{year:04}-{month:02}");
        self.emit(
            Batch::MonthlySchedule {
                year_month: &year_month,
                games: &games,
            },
            &mut summary,
        )
        .await;
        Ok(summary)
    }

    /// Results first; box scores only once the backend has the results.
    pub async fn daily_update(&self, date: NaiveDate) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let crawler = self.page_crawler();
        let games = crawler.daily_results(date).await;
        if games.is_empty() {
            warn!(date = %date, "no finished games");
            return Ok(summary);
        }

        let game_date = iso(date);
        let accepted = self
            .emit(
                Batch::Results {
                    game_date: &game_date,
                    games: &games,
                },
                &mut summary,
            )
            .await;
        if !accepted {
            error!(date = %date, "results rejected, skipping box scores");
            return Ok(summary);
        }

        let mut stats_sent = 0;
        for game in &games {
            let Some(url) = game.boxscore_url.as_deref() else {
                continue;
            };
            let row_codes = (
                teams::code_for_name(&game.away_team),
                teams::code_for_name(&game.home_team),
            );
            if self
                .stats_for_game(&crawler, &game.game_id, url, Some(row_codes), &mut summary)
                .await
            {
                stats_sent += 1;
            }
        }
        info!(date = %date, games = games.len(), stats_sent, "daily update finished");
        Ok(summary)
    }

    /// Box scores for games the backend already has review links for.
    pub async fn player_stats(&self, date: NaiveDate) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let stored = self
            .lookup
            .games_with_boxscore(&iso(date))
            .await
            .with_context(|| format!("looking up stored games for {date}"))?;
        if stored.is_empty() {
            warn!(date = %date, "no stored games with review links");
            return Ok(summary);
        }

        let crawler = self.page_crawler();
        let mut stats_sent = 0;
        for game in &stored {
            let stored_codes = dates::team_codes_from_game_id(&game.game_id);
            if self
                .stats_for_game(&crawler, &game.game_id, &game.boxscore_url, stored_codes, &mut summary)
                .await
            {
                stats_sent += 1;
            }
        }
        info!(date = %date, stats_sent, games = stored.len(), "player stats finished");
        Ok(summary)
    }

    async fn stats_for_game(
        &self,
        crawler: &Crawler<'_, dyn PageFetcher + '_>,
        game_id: &str,
        review_url: &str,
        fallback: Option<(String, String)>,
        summary: &mut RunSummary,
    ) -> bool {
        // The URL's gameId is authoritative; synthesized ids are home-first.
        let codes = dates::extract_game_id_from_url(review_url)
            .as_deref()
            .and_then(dates::team_codes_from_game_id)
            .or(fallback);
        let stats = crawler.player_stats(review_url, codes).await;
        if stats.is_empty() {
            warn!(game_id, "no player lines on review page");
            return false;
        }
        self.emit(Batch::PlayerStats { game_id, stats: &stats }, summary)
            .await
    }

    pub async fn team_rankings(&self, date: Option<NaiveDate>) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let crawler = Crawler::new(self.standings, self.config, self.metrics);
        let rankings = crawler.team_rankings(date, Local::now().naive_local()).await;
        if rankings.is_empty() {
            warn!(date = ?date, "no standings rows");
            return Ok(summary);
        }
        for team in &rankings {
            info!(
                rank = team.rank,
                team = %team.team_name,
                win_rate = team.win_rate,
                wins = team.wins,
                losses = team.losses,
                draws = team.draws,
                "standing"
            );
        }

        let date = date.map(iso);
        self.emit(
            Batch::Rankings {
                date: date.as_deref(),
                rankings: &rankings,
                crawled_at: Local::now().naive_local(),
            },
            &mut summary,
        )
        .await;
        Ok(summary)
    }

    pub async fn team_win_rates(&self, date: NaiveDate) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let crawler = Crawler::new(self.standings, self.config, self.metrics);
        let rates = crawler.team_win_rates(date).await;
        if rates.is_empty() {
            warn!(date = %date, "no win rates");
            return Ok(summary);
        }

        let date = iso(date);
        self.emit(
            Batch::WinRates {
                date: Some(&date),
                win_rates: &rates,
                crawled_at: Local::now().naive_local(),
            },
            &mut summary,
        )
        .await;
        Ok(summary)
    }

    pub async fn schedule_api(&self, date: NaiveDate) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let crawler = Crawler::new(self.forms, self.config, self.metrics);
        let games = crawler.schedule_from_api(date).await;
        self.send_day(date, &games, &mut summary).await;
        Ok(summary)
    }
}

// =============================================================================
// Production entry point
// =============================================================================

/// Run `command` against the live site and backend.
pub async fn run(config: &Config, command: Command, dry_run: bool) -> Result<RunSummary> {
    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("run", %run_id, command = command.name());

    async move {
        info!(dry_run, render_mode = %config.render_mode, "run started");
        let sink = HttpSink::new(config).context("building backend client")?;

        if command == Command::Health {
            if sink.health().await {
                return Ok(RunSummary::default());
            }
            bail!("backend at {} is not healthy", config.backend_url);
        }

        let metrics = CrawlMetrics::new();
        let static_pages = StaticFetcher::new(config).context("building page client")?;
        let session = match config.render_mode {
            RenderMode::Rendered if command.needs_rendering() => {
                Some(BrowserSession::acquire(config).context("acquiring browser session")?)
            }
            _ => None,
        };
        let pages: &dyn PageFetcher = match &session {
            Some(session) => session,
            None => &static_pages,
        };

        let pipeline = Pipeline {
            config,
            pages,
            standings: &static_pages,
            forms: &static_pages,
            sink: &sink,
            lookup: &sink,
            metrics: &metrics,
            dry_run,
        };
        let result = pipeline.execute(&command).await;

        if let Some(session) = &session {
            session.close();
        }

        match serde_json::to_string(&metrics.snapshot()) {
            Ok(json) => info!(metrics = %json, "run metrics"),
            Err(e) => warn!(error = %e, "could not encode run metrics"),
        }
        match serde_json::to_string(&sink.stats().snapshot()) {
            Ok(json) => info!(sink = %json, "backend transmission"),
            Err(e) => warn!(error = %e, "could not encode sink stats"),
        }
        match &result {
            Ok(summary) => info!(
                records = summary.records,
                batches_sent = summary.batches_sent,
                batches_failed = summary.batches_failed,
                "run finished"
            ),
            Err(e) => error!(error = %e, "run failed"),
        }
        result
    }
    .instrument(span)
    .await
}
