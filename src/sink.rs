// =============================================================================
// sink.rs — HANDING RECORDS TO THE STORAGE BACKEND
// =============================================================================
//
// The crawl engine stores nothing itself. Every batch it produces goes to the
// storage service as one JSON POST, and the only answer we care about is
// "did it take it": a 2xx is true, anything else (refused connection,
// timeout, 500, 400 with an apologetic body) is logged and reported as false.
// There is no retry here. Whoever scheduled the crawl can schedule it again.
//
// The other direction is the lookup: the stats crawl can run on its own, a
// day later, using the review links the backend stored from the results
// crawl.
//
// Batches are a closed enum rather than six methods so that every endpoint
// path, query string and payload shape lives in one match, and so the
// recording fake used by the driver tests sees exactly what the wire would.
// =============================================================================

use async_trait::async_trait;
use chrono::NaiveDateTime;
use portable_atomic::{AtomicU64, Ordering};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::SinkError;
use crate::models::{crawl_timestamp, GameRef, PlayerStats, ScheduleEntry, TeamRanking, TeamWinRate};

/// One unit of transmission, with the context the backend needs to file it.
#[derive(Debug, Clone, Copy)]
pub enum Batch<'a> {
    /// A day of schedule entries from a range crawl.
    DailyGames {
        game_date: &'a str,
        games: &'a [ScheduleEntry],
    },
    MonthlySchedule {
        year_month: &'a str,
        games: &'a [ScheduleEntry],
    },
    Results {
        game_date: &'a str,
        games: &'a [ScheduleEntry],
    },
    PlayerStats {
        game_id: &'a str,
        stats: &'a PlayerStats,
    },
    Rankings {
        /// `None` when the standings were read "as of today".
        date: Option<&'a str>,
        rankings: &'a [TeamRanking],
        crawled_at: NaiveDateTime,
    },
    WinRates {
        date: Option<&'a str>,
        win_rates: &'a [TeamWinRate],
        crawled_at: NaiveDateTime,
    },
}

impl Batch<'_> {
    pub fn path(&self) -> &'static str {
        match self {
            Batch::DailyGames { .. } => "/api/kbo/games",
            Batch::MonthlySchedule { .. } => "/api/kbo/games/schedule",
            Batch::Results { .. } => "/api/kbo/games/results",
            Batch::PlayerStats { .. } => "/api/kbo/player-stats",
            Batch::Rankings { .. } => "/api/kbo/team-rankings",
            Batch::WinRates { .. } => "/api/kbo/team-rankings/win-rates",
        }
    }

    /// Query parameters that ride along with the POST.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        match self {
            Batch::PlayerStats { game_id, .. } => vec![("gameId", game_id.to_string())],
            _ => Vec::new(),
        }
    }

    /// Number of records in the batch, for logs and metrics.
    pub fn len(&self) -> usize {
        match self {
            Batch::DailyGames { games, .. }
            | Batch::MonthlySchedule { games, .. }
            | Batch::Results { games, .. } => games.len(),
            Batch::PlayerStats { stats, .. } => stats.pitchers.len() + stats.hitters.len(),
            Batch::Rankings { rankings, .. } => rankings.len(),
            Batch::WinRates { win_rates, .. } => win_rates.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The JSON body the backend expects for this endpoint.
    pub fn payload(&self) -> Result<Value, SinkError> {
        let crawled = |at: &NaiveDateTime| at.format(crawl_timestamp::FORMAT).to_string();
        Ok(match self {
            Batch::DailyGames { game_date, games } => json!({
                "gameDate": game_date,
                "games": games,
            }),
            Batch::MonthlySchedule { year_month, games } => json!({
                "games": games,
                "yearMonth": year_month,
                "type": "SCHEDULE",
            }),
            Batch::Results { game_date, games } => json!({
                "games": games,
                "gameDate": game_date,
                "type": "RESULTS",
            }),
            Batch::PlayerStats { stats, .. } => serde_json::to_value(stats)?,
            Batch::Rankings {
                date,
                rankings,
                crawled_at,
            } => json!({
                "date": date,
                "rankings": rankings,
                "totalTeams": rankings.len(),
                "crawledAt": crawled(crawled_at),
            }),
            Batch::WinRates {
                date,
                win_rates,
                crawled_at,
            } => json!({
                "date": date,
                "winRates": win_rates,
                "totalTeams": win_rates.len(),
                "crawledAt": crawled(crawled_at),
            }),
        })
    }
}

/// Where finished batches go. `true` means the batch was accepted.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn send(&self, batch: Batch<'_>) -> bool;
}

/// Previously stored games that have a review link.
#[async_trait]
pub trait GameLookup: Send + Sync {
    async fn games_with_boxscore(&self, game_date: &str) -> Result<Vec<GameRef>, SinkError>;
}

/// Transmission counters.
#[derive(Default)]
pub struct SinkStats {
    pub batches_sent: AtomicU64,
    pub records_sent: AtomicU64,
    pub batches_failed: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SinkSnapshot {
    pub batches_sent: u64,
    pub records_sent: u64,
    pub batches_failed: u64,
}

impl SinkStats {
    pub fn snapshot(&self) -> SinkSnapshot {
        SinkSnapshot {
            batches_sent: self.batches_sent.load(Ordering::Relaxed),
            records_sent: self.records_sent.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
        }
    }
}

/// The storage service over HTTP.
pub struct HttpSink {
    client: reqwest::Client,
    base_url: String,
    stats: Arc<SinkStats>,
}

impl HttpSink {
    /// # Arguments
    /// * `config` - supplies the backend URL, timeout and user agent
    pub fn new(config: &Config) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .timeout(config.sink_timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self {
            client,
            base_url: config.backend_url.clone(),
            stats: Arc::new(SinkStats::default()),
        })
    }

    pub fn stats(&self) -> Arc<SinkStats> {
        Arc::clone(&self.stats)
    }

    async fn post(&self, batch: &Batch<'_>) -> Result<(), SinkError> {
        let url = format!("{}{}", self.base_url, batch.path());
        let body = batch.payload()?;

        let response = self
            .client
            .post(&url)
            .query(&batch.query())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(SinkError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }

    /// `GET /actuator/health`. Any 2xx counts as healthy.
    pub async fn health(&self) -> bool {
        let url = format!("{}/actuator/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => {
                info!(backend = %self.base_url, "backend healthy");
                true
            }
            Ok(resp) => {
                warn!(backend = %self.base_url, status = resp.status().as_u16(), "backend unhealthy");
                false
            }
            Err(e) => {
                error!(backend = %self.base_url, error = %e, "backend unreachable");
                false
            }
        }
    }
}

#[async_trait]
impl RecordSink for HttpSink {
    async fn send(&self, batch: Batch<'_>) -> bool {
        let records = batch.len();
        match self.post(&batch).await {
            Ok(()) => {
                self.stats.batches_sent.fetch_add(1, Ordering::Relaxed);
                self.stats
                    .records_sent
                    .fetch_add(records as u64, Ordering::Relaxed);
                info!(endpoint = batch.path(), records, "batch accepted");
                true
            }
            Err(e) => {
                self.stats.batches_failed.fetch_add(1, Ordering::Relaxed);
                error!(endpoint = batch.path(), records, error = %e, "batch rejected");
                false
            }
        }
    }
}

#[async_trait]
impl GameLookup for HttpSink {
    async fn games_with_boxscore(&self, game_date: &str) -> Result<Vec<GameRef>, SinkError> {
        let url = format!("{}/api/kbo/games/with-boxscore", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("gameDate", game_date)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let games: Vec<GameRef> = response.json().await?;
        debug!(game_date, games = games.len(), "stored games with review links");
        Ok(games)
    }
}

// =============================================================================
// Recording fake for driver tests
// =============================================================================


#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GameSlot, HitterStat};
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 7, 6)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_monthly_payload_shape() {
        let games = vec![ScheduleEntry::scheduled(GameSlot {
            away_team: "LG".into(),
            home_team: "두산".into(),
            game_id: "20250601OBLG0".into(),
            ..Default::default()
        })];
        let batch = Batch::MonthlySchedule {
            year_month: "2025-06",
            games: &games,
        };
        let payload = batch.payload().unwrap();
        assert_eq!(batch.path(), "/api/kbo/games/schedule");
        assert_eq!(payload["type"], "SCHEDULE");
        assert_eq!(payload["yearMonth"], "2025-06");
        assert_eq!(payload["games"][0]["status"], "SCHEDULED");
        assert_eq!(payload["games"][0]["boxscoreUrl"], Value::Null);
    }

    #[test]
    fn test_player_stats_go_by_query_parameter() {
        let stats = PlayerStats {
            pitchers: vec![],
            hitters: vec![HitterStat {
                team: "LG".into(),
                player_name: "홍창기".into(),
                at_bats: 4,
                hits: 2,
            }],
        };
        let batch = Batch::PlayerStats {
            game_id: "20250601LGOB0",
            stats: &stats,
        };
        assert_eq!(batch.query(), vec![("gameId", "20250601LGOB0".to_string())]);
        assert_eq!(batch.len(), 1);
        let payload = batch.payload().unwrap();
        assert_eq!(payload["hitters"][0]["atBats"], 4);
        assert!(payload["pitchers"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_rankings_payload_counts_teams() {
        let rankings = vec![TeamRanking {
            rank: 1,
            team_name: "LG".into(),
            games_played: 10,
            wins: 7,
            losses: 2,
            draws: 1,
            win_rate: 0.778,
            game_behind: 0.0,
            crawled_at: at(),
        }];
        let payload = Batch::Rankings {
            date: Some("2025-07-06"),
            rankings: &rankings,
            crawled_at: at(),
        }
        .payload()
        .unwrap();
        assert_eq!(payload["totalTeams"], 1);
        assert_eq!(payload["crawledAt"], "2025-07-06 09:00:00");
        assert_eq!(payload["rankings"][0]["teamName"], "LG");
    }

    #[tokio::test]
    async fn test_unreachable_backend_reports_false() {
        let config = Config::from_lookup(|k| match k {
            "KBO_CRAWL_BACKEND_URL" => Some("http://127.0.0.1:1".to_string()),
            "KBO_CRAWL_SINK_TIMEOUT_SECS" => Some("2".to_string()),
            _ => None,
        });
        let sink = HttpSink::new(&config).unwrap();
        let games: Vec<ScheduleEntry> = Vec::new();
        let accepted = sink
            .send(Batch::Results {
                game_date: "2025-06-01",
                games: &games,
            })
            .await;
        assert!(!accepted);
        assert_eq!(sink.stats().snapshot().batches_failed, 1);
        assert!(!sink.health().await);
    }
}
