// =============================================================================
// models.rs — THE CANONICAL RECORD SHAPES
// =============================================================================
//
// Everything the crawlers produce ends up as one of these structs, and
// everything the backend receives is one of these structs serialized with
// camelCase field names. The field names are a contract with the storage
// service: rename one and the backend silently stores nulls.
//
// Records are created fresh per crawl, kept in plain Vecs, and handed to the
// sink. Nothing here outlives a single invocation.
// =============================================================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a game is in its life. The backend uses this to decide whether a
/// schedule row is a placeholder or a final.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    /// Not played yet. Scores are zero and there is no box score link.
    Scheduled,
    /// Final. Both scores were on the page.
    Completed,
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameStatus::Scheduled => write!(f, "SCHEDULED"),
            GameStatus::Completed => write!(f, "COMPLETED"),
        }
    }
}

/// One game on the schedule, before or after it was played.
///
/// The two constructors are the only way the crawlers build entries, so the
/// status invariant holds by construction:
/// `Scheduled` means zero scores and no box score link,
/// `Completed` means both scores came off the page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub away_team: String,
    pub home_team: String,
    pub away_score: u32,
    pub home_score: u32,
    pub stadium: String,
    /// Time of day as shown on the schedule page ("18:30"), or whatever the
    /// JSON endpoint sends.
    pub game_date_time: String,
    pub boxscore_url: Option<String>,
    pub game_id: String,
    pub status: GameStatus,
}

/// Fields shared by both kinds of schedule entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameSlot {
    pub away_team: String,
    pub home_team: String,
    pub stadium: String,
    pub game_date_time: String,
    pub game_id: String,
}

impl ScheduleEntry {
    pub fn scheduled(slot: GameSlot) -> Self {
        Self {
            away_team: slot.away_team,
            home_team: slot.home_team,
            away_score: 0,
            home_score: 0,
            stadium: slot.stadium,
            game_date_time: slot.game_date_time,
            boxscore_url: None,
            game_id: slot.game_id,
            status: GameStatus::Scheduled,
        }
    }

    pub fn completed(
        slot: GameSlot,
        away_score: u32,
        home_score: u32,
        boxscore_url: Option<String>,
    ) -> Self {
        Self {
            away_team: slot.away_team,
            home_team: slot.home_team,
            away_score,
            home_score,
            stadium: slot.stadium,
            game_date_time: slot.game_date_time,
            boxscore_url,
            game_id: slot.game_id,
            status: GameStatus::Completed,
        }
    }
}

impl fmt::Display for ScheduleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            GameStatus::Scheduled => write!(
                f,
                "[{}] {} vs {} @ {} {}",
                self.game_id, self.away_team, self.home_team, self.stadium, self.game_date_time
            ),
            GameStatus::Completed => write!(
                f,
                "[{}] {} {}-{} {} @ {}",
                self.game_id,
                self.away_team,
                self.away_score,
                self.home_score,
                self.home_team,
                self.stadium
            ),
        }
    }
}

/// A pitcher's line from a box score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PitcherStat {
    /// Canonical team name ("두산"), never the league code ("OB").
    pub team: String,
    pub player_name: String,
    /// Innings pitched as a decimal string: "6.0", "0.6666666666666666".
    pub innings: String,
    pub earned_runs: u32,
}

/// A hitter's line from a box score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HitterStat {
    pub team: String,
    pub player_name: String,
    pub at_bats: u32,
    pub hits: u32,
}

impl HitterStat {
    /// More hits than at-bats. The source does produce these; callers log
    /// them as a data-quality warning and keep the record.
    pub fn is_suspect(&self) -> bool {
        self.hits > self.at_bats
    }
}

/// Everything a single review page yields. Serialized as-is for the
/// player-stats endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PlayerStats {
    pub pitchers: Vec<PitcherStat>,
    pub hitters: Vec<HitterStat>,
}

impl PlayerStats {
    pub fn is_empty(&self) -> bool {
        self.pitchers.is_empty() && self.hitters.is_empty()
    }
}

/// One row of the standings table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TeamRanking {
    pub rank: u32,
    pub team_name: String,
    pub games_played: u32,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    /// In [0, 1]. Anything else on the page becomes 0.0.
    pub win_rate: f64,
    /// 0.0 for the leader ("-" on the page).
    pub game_behind: f64,
    #[serde(with = "crawl_timestamp")]
    pub crawled_at: NaiveDateTime,
}

impl TeamRanking {
    /// Standings are published as W/L/D plus games played; they should add
    /// up but the page is not obliged to agree with arithmetic.
    pub fn totals_agree(&self) -> bool {
        u64::from(self.wins) + u64::from(self.losses) + u64::from(self.draws)
            == u64::from(self.games_played)
    }
}

/// The reduced standings row sent by the win-rate-only crawl.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TeamWinRate {
    pub team: String,
    pub win_rate: f64,
    pub date: Option<String>,
}

/// A previously stored game, as returned by the lookup collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameRef {
    pub game_id: String,
    pub boxscore_url: String,
}

/// `crawledAt` goes over the wire as "YYYY-MM-DD HH:MM:SS", local time.
pub mod crawl_timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}
