// =============================================================================
// extract.rs — FROM CELL TEXT TO TYPED RECORDS
// =============================================================================
//
// This is where "LG2vs5두산" becomes two teams and two scores, where "1 1/3"
// becomes 1.333 innings, and where a standings cell reading "1.234" is
// quietly turned into 0.0 because no team has ever won more games than it
// played.
//
// The rule throughout: one bad cell costs one record, never the crawl.
// Functions that can reject a row return ExtractError and the caller logs it
// at debug. Functions that parse cosmetic numbers (innings, games behind)
// fall back to zero instead.
// =============================================================================

use chrono::{NaiveDate, NaiveDateTime};
use memchr::memmem;
use scraper::ElementRef;
use serde_json::Value;
use tracing::{debug, warn};

use crate::classifier::{body_rows, table_headers, GameRowCells};
use crate::config::Config;
use crate::dates;
use crate::error::{ExtractError, FormatError};
use crate::fetcher::{attr_of, select_within, text_of};
use crate::markers::{self, HeaderLabel};
use crate::models::{
    GameSlot, GameStatus, HitterStat, PitcherStat, ScheduleEntry, TeamRanking, TeamWinRate,
};

// =============================================================================
// Matchup strings
// =============================================================================

/// Both sides of a matchup cell. Scores are `None` before the game is played.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matchup {
    pub away_team: String,
    pub away_score: Option<u32>,
    pub home_team: String,
    pub home_score: Option<u32>,
}

impl Matchup {
    pub fn scores(&self) -> Option<(u32, u32)> {
        Some((self.away_score?, self.home_score?))
    }
}

fn split_on_vs(text: &str) -> Result<(&str, &str), ExtractError> {
    let finder = memmem::Finder::new(b"vs");
    let mut hits = finder.find_iter(text.as_bytes());
    let pos = hits
        .next()
        .ok_or_else(|| ExtractError::MissingSeparator(text.to_string()))?;
    if hits.next().is_some() {
        return Err(ExtractError::MissingSeparator(text.to_string()));
    }
    Ok((text[..pos].trim(), text[pos + 2..].trim()))
}

fn parse_score(digits: &str) -> Option<u32> {
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}

/// Split `"<Away><awayScore>vs<homeScore><Home>"`.
///
/// The away score is the run of digits at the right end of the left side;
/// the home score is the run at the left end of the right side. Either may
/// be missing (game not played yet).
pub fn split_matchup(text: &str) -> Result<Matchup, ExtractError> {
    let (left, right) = split_on_vs(text)?;

    let away_boundary = left
        .char_indices()
        .rev()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    let (away_team, away_digits) = left.split_at(away_boundary);

    let home_boundary = right
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(right.len());
    let (home_digits, home_team) = right.split_at(home_boundary);

    let away_team = away_team.trim();
    let home_team = home_team.trim();
    if away_team.is_empty() {
        return Err(ExtractError::EmptyField("away team"));
    }
    if home_team.is_empty() {
        return Err(ExtractError::EmptyField("home team"));
    }

    Ok(Matchup {
        away_team: away_team.to_string(),
        away_score: parse_score(away_digits),
        home_team: home_team.to_string(),
        home_score: parse_score(home_digits),
    })
}

/// Team names only: every digit stripped from each side of the "vs".
pub fn split_matchup_teams_only(text: &str) -> Result<(String, String), ExtractError> {
    let (left, right) = split_on_vs(text)?;
    let strip = |s: &str| -> String {
        s.chars()
            .filter(|c| !c.is_ascii_digit())
            .collect::<String>()
            .trim()
            .to_string()
    };
    let (away, home) = (strip(left), strip(right));
    if away.is_empty() {
        return Err(ExtractError::EmptyField("away team"));
    }
    if home.is_empty() {
        return Err(ExtractError::EmptyField("home team"));
    }
    Ok((away, home))
}

// =============================================================================
// Numbers
// =============================================================================

fn ratio(fraction: &str) -> Option<f64> {
    let (num, den) = fraction.split_once('/')?;
    let num: f64 = num.trim().parse().ok()?;
    let den: f64 = den.trim().parse().ok()?;
    if den == 0.0 {
        None
    } else {
        Some(num / den)
    }
}

/// Innings pitched: "6", "6.0", "2/3" or "1 1/3". Anything else is 0.0.
pub fn parse_innings(text: &str) -> f64 {
    let text = text.trim();
    let parsed = if text.contains('/') {
        let parts: Vec<&str> = text.split_whitespace().collect();
        match parts.as_slice() {
            [fraction] => ratio(fraction),
            [whole, fraction] => whole
                .parse::<f64>()
                .ok()
                .zip(ratio(fraction))
                .map(|(w, f)| w + f),
            _ => None,
        }
    } else {
        text.parse::<f64>().ok()
    };

    match parsed {
        Some(v) if v.is_finite() && v >= 0.0 => v,
        _ => {
            if !text.is_empty() {
                debug!(innings = text, "unparseable innings, using 0.0");
            }
            0.0
        }
    }
}

/// Decimal string sent for innings: whole numbers keep one decimal ("6.0"),
/// fractions keep full precision ("0.6666666666666666").
pub fn innings_to_string(innings: f64) -> String {
    if innings.fract() == 0.0 {
        format!("{innings:.1}")
    } else {
        format!("{innings}")
    }
}

/// Integer cell under a pure-digit check; anything else counts as zero.
pub fn digits_or_zero(text: &str) -> u32 {
    let text = text.trim();
    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        text.parse().unwrap_or(0)
    } else {
        0
    }
}

/// A winning percentage, only if it is a float in [0, 1].
pub fn parse_win_rate(text: &str) -> Result<f64, FormatError> {
    let text = text.trim();
    match text.parse::<f64>() {
        Ok(v) if (0.0..=1.0).contains(&v) => Ok(v),
        _ => Err(FormatError::Number(text.to_string())),
    }
}

/// Games behind the leader. The leader shows "-".
pub fn parse_game_behind(text: &str) -> f64 {
    let text = text.trim();
    if text.is_empty() || text == "-" {
        return 0.0;
    }
    match text.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => v,
        _ => {
            debug!(game_behind = text, "unparseable games-behind, using 0.0");
            0.0
        }
    }
}

// =============================================================================
// Review links
// =============================================================================

/// The first link in a row that points at the game's review page.
///
/// Highlight links are rewritten to review links, relative hrefs are made
/// absolute against the site origin. `None` is normal for games that have
/// not started.
pub fn find_review_url(cells: &[ElementRef<'_>], config: &Config) -> Option<String> {
    for (i, cell) in cells.iter().enumerate() {
        for link in select_within(*cell, "a") {
            let Some(href) = attr_of(link, "href").filter(|h| !h.trim().is_empty()) else {
                continue;
            };
            let caption = text_of(link);
            if markers::is_review_href(&href) || markers::is_review_caption(&caption) {
                let url = config.absolutize(&markers::rewrite_highlight_to_review(href.trim()));
                debug!(cell = i, url = %url, "review link found");
                return Some(url);
            }
        }
    }
    debug!("no review link in row");
    None
}

// =============================================================================
// Schedule rows
// =============================================================================

/// How much of a schedule row to trust.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryMode {
    /// Daily schedule: scores and link kept when the game is final.
    Schedule,
    /// Daily results: a row without both scores is rejected.
    Results,
    /// Monthly schedule: team names only, everything else zeroed.
    ScheduleOnly,
}

/// Build one entry from a located schedule row.
///
/// `date` is the day being crawled; it supplies the year for synthesized ids.
pub fn game_from_row(
    cells: &GameRowCells<'_>,
    date: NaiveDate,
    mode: EntryMode,
    config: &Config,
) -> Result<ScheduleEntry, ExtractError> {
    let time = text_of(cells.time);
    let matchup_text = text_of(cells.matchup);
    let stadium = text_of(cells.stadium);

    if mode == EntryMode::ScheduleOnly {
        let (away_team, home_team) = split_matchup_teams_only(&matchup_text)?;
        let game_id = dates::derive_game_id_for(date, &away_team, &home_team);
        return Ok(ScheduleEntry::scheduled(GameSlot {
            away_team,
            home_team,
            stadium,
            game_date_time: time,
            game_id,
        }));
    }

    let matchup = split_matchup(&matchup_text)?;
    let review_url = find_review_url(cells.all, config);
    let game_id = review_url
        .as_deref()
        .and_then(dates::extract_game_id_from_url)
        .unwrap_or_else(|| dates::derive_game_id_for(date, &matchup.away_team, &matchup.home_team));

    let slot = GameSlot {
        away_team: matchup.away_team.clone(),
        home_team: matchup.home_team.clone(),
        stadium,
        game_date_time: time,
        game_id,
    };

    match (matchup.scores(), mode) {
        (Some((away, home)), _) => Ok(ScheduleEntry::completed(slot, away, home, review_url)),
        (None, EntryMode::Results) => Err(ExtractError::MissingScore(matchup_text)),
        (None, _) => Ok(ScheduleEntry::scheduled(slot)),
    }
}

// =============================================================================
// Box scores
// =============================================================================

/// Hitters of one team: names from the lineup table, at-bats and hits from
/// the stats table, rows zipped in order.
pub fn extract_hitters(
    lineup: ElementRef<'_>,
    stats: ElementRef<'_>,
    team: &str,
) -> Result<Vec<HitterStat>, ExtractError> {
    let lineup_headers = table_headers(lineup);
    let stat_headers = table_headers(stats);
    let name_col = markers::header_index(&lineup_headers, HeaderLabel::PlayerName)
        .ok_or_else(|| ExtractError::MissingColumn(HeaderLabel::PlayerName.caption().into()))?;
    let at_bats_col = markers::header_index(&stat_headers, HeaderLabel::AtBats)
        .ok_or_else(|| ExtractError::MissingColumn(HeaderLabel::AtBats.caption().into()))?;
    let hits_col = markers::header_index(&stat_headers, HeaderLabel::Hits)
        .ok_or_else(|| ExtractError::MissingColumn(HeaderLabel::Hits.caption().into()))?;

    let mut hitters = Vec::new();
    for (name_row, stat_row) in body_rows(lineup).into_iter().zip(body_rows(stats)) {
        let name_cells = select_within(name_row, "th, td");
        let Some(player_name) = name_cells.get(name_col).map(|c| text_of(*c)) else {
            continue;
        };
        if player_name.is_empty() {
            continue;
        }

        let stat_cells = select_within(stat_row, "td");
        if stat_cells.len() <= at_bats_col.max(hits_col) {
            debug!(player = %player_name, cells = stat_cells.len(), "hitter stat row too short");
            continue;
        }

        let hitter = HitterStat {
            team: team.to_string(),
            player_name,
            at_bats: digits_or_zero(&text_of(stat_cells[at_bats_col])),
            hits: digits_or_zero(&text_of(stat_cells[hits_col])),
        };
        if hitter.is_suspect() {
            warn!(
                team,
                player = %hitter.player_name,
                at_bats = hitter.at_bats,
                hits = hitter.hits,
                "more hits than at-bats"
            );
        }
        hitters.push(hitter);
    }
    Ok(hitters)
}

/// Pitchers of one team from a pitcher stats table.
pub fn extract_pitchers(table: ElementRef<'_>, team: &str) -> Result<Vec<PitcherStat>, ExtractError> {
    let headers = table_headers(table);
    let name_col = markers::header_index(&headers, HeaderLabel::PlayerName).unwrap_or(0);
    let innings_col = markers::header_index(&headers, HeaderLabel::Innings)
        .ok_or_else(|| ExtractError::MissingColumn(HeaderLabel::Innings.caption().into()))?;
    let earned_col = markers::header_index(&headers, HeaderLabel::EarnedRuns)
        .ok_or_else(|| ExtractError::MissingColumn(HeaderLabel::EarnedRuns.caption().into()))?;
    let needed = name_col.max(innings_col).max(earned_col) + 1;

    Ok(body_rows(table)
        .into_iter()
        .filter_map(|row| {
            let cells = select_within(row, "td");
            if cells.len() < needed {
                debug!(team, found = cells.len(), needed, "pitcher row too short");
                return None;
            }
            let player_name = text_of(cells[name_col]);
            if player_name.is_empty() {
                return None;
            }
            Some(PitcherStat {
                team: team.to_string(),
                player_name,
                innings: innings_to_string(parse_innings(&text_of(cells[innings_col]))),
                earned_runs: digits_or_zero(&text_of(cells[earned_col])),
            })
        })
        .collect())
}

// =============================================================================
// Standings
// =============================================================================

/// One standings row. `cells` are the row's `td` texts, already known to be
/// a team row (see `classifier::classify_ranking_row`).
pub fn ranking_from_cells(
    cells: &[String],
    crawled_at: NaiveDateTime,
) -> Result<TeamRanking, ExtractError> {
    if cells.len() < 7 {
        return Err(ExtractError::ShortRow {
            found: cells.len(),
            needed: 7,
        });
    }
    let team_name = cells[1].trim();
    if team_name.is_empty() {
        return Err(ExtractError::EmptyField("team name"));
    }

    let win_rate = parse_win_rate(&cells[6]).unwrap_or_else(|e| {
        debug!(team = team_name, error = %e, "win rate out of range, using 0.0");
        0.0
    });

    Ok(TeamRanking {
        rank: digits_or_zero(&cells[0]),
        team_name: team_name.to_string(),
        games_played: digits_or_zero(&cells[2]),
        wins: digits_or_zero(&cells[3]),
        losses: digits_or_zero(&cells[4]),
        draws: digits_or_zero(&cells[5]),
        win_rate,
        game_behind: cells.get(7).map(|c| parse_game_behind(c)).unwrap_or(0.0),
        crawled_at,
    })
}

/// The reduced win-rate row. Unlike the full ranking, a bad win rate
/// rejects the row.
pub fn win_rate_from_cells(cells: &[String], date: Option<&str>) -> Result<TeamWinRate, ExtractError> {
    if cells.len() < 7 {
        return Err(ExtractError::ShortRow {
            found: cells.len(),
            needed: 7,
        });
    }
    let team = cells[1].trim();
    if team.is_empty() {
        return Err(ExtractError::EmptyField("team name"));
    }
    Ok(TeamWinRate {
        team: team.to_string(),
        win_rate: parse_win_rate(&cells[6])?,
        date: date.map(str::to_string),
    })
}

// =============================================================================
// JSON schedule service
// =============================================================================

/// Accepted key names per field, in order of preference. The service has
/// shipped both spellings.
pub mod aliases {
    pub const DATE: &[&str] = &["GDATE", "PlayDate"];
    pub const AWAY_TEAM: &[&str] = &["AT_NM", "AwayName"];
    pub const HOME_TEAM: &[&str] = &["HT_NM", "HomeName"];
    pub const AWAY_SCORE: &[&str] = &["AT_SR", "AwayScore"];
    pub const HOME_SCORE: &[&str] = &["HT_SR", "HomeScore"];
    pub const TIME: &[&str] = &["G_TM", "GameTime"];
    pub const STADIUM: &[&str] = &["ST_NM", "StadiumName"];
    pub const BOX_LINK: &[&str] = &["T1_URL", "BoxScoreUrl"];
}

/// A row of the JSON schedule with its aliases resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiScheduleRow {
    pub date: String,
    pub away_team: String,
    pub home_team: String,
    pub away_score: Option<u32>,
    pub home_score: Option<u32>,
    pub time: String,
    pub stadium: String,
    pub box_link: Option<String>,
}

/// The first alias present with a non-empty string or a number.
fn resolve_alias(row: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match row.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

impl ApiScheduleRow {
    pub fn from_json(row: &Value) -> Self {
        let text = |keys: &[&str]| resolve_alias(row, keys).unwrap_or_default();
        let score = |keys: &[&str]| resolve_alias(row, keys).and_then(|s| s.parse::<u32>().ok());
        Self {
            date: text(aliases::DATE),
            away_team: text(aliases::AWAY_TEAM),
            home_team: text(aliases::HOME_TEAM),
            away_score: score(aliases::AWAY_SCORE),
            home_score: score(aliases::HOME_SCORE),
            time: text(aliases::TIME),
            stadium: text(aliases::STADIUM),
            box_link: resolve_alias(row, aliases::BOX_LINK),
        }
    }
}

/// The row array of a service response: `d.rows`, or `rows` at the top.
/// ASMX services sometimes deliver `d` as a JSON document inside a string.
pub fn api_rows(body: &Value) -> Vec<Value> {
    let from_d = match body.get("d") {
        Some(Value::String(inner)) => serde_json::from_str::<Value>(inner)
            .ok()
            .and_then(|v| v.get("rows").cloned()),
        Some(d) => d.get("rows").cloned(),
        None => None,
    };
    match from_d.or_else(|| body.get("rows").cloned()) {
        Some(Value::Array(rows)) => rows,
        _ => Vec::new(),
    }
}

/// Turn a resolved JSON row into an entry for `date`.
pub fn game_from_api_row(
    row: ApiScheduleRow,
    date: NaiveDate,
    config: &Config,
) -> Result<ScheduleEntry, ExtractError> {
    if row.away_team.is_empty() {
        return Err(ExtractError::EmptyField("away team"));
    }
    if row.home_team.is_empty() {
        return Err(ExtractError::EmptyField("home team"));
    }

    let review_url = row.box_link.as_deref().map(|link| {
        let url = config.absolutize(link);
        if markers::has_section_param(&url) {
            url
        } else if url.contains('?') {
            format!("{url}&section=REVIEW")
        } else {
            format!("{url}?section=REVIEW")
        }
    });
    let game_id = review_url
        .as_deref()
        .and_then(dates::extract_game_id_from_url)
        .unwrap_or_else(|| dates::derive_game_id_for(date, &row.away_team, &row.home_team));

    let slot = GameSlot {
        away_team: row.away_team,
        home_team: row.home_team,
        stadium: row.stadium,
        game_date_time: row.time,
        game_id,
    };
    Ok(match (row.away_score, row.home_score) {
        (Some(away), Some(home)) => ScheduleEntry::completed(slot, away, home, review_url),
        _ => ScheduleEntry::scheduled(slot),
    })
}

/// Status of an entry, for log fields.
pub fn status_label(entry: &ScheduleEntry) -> &'static str {
    match entry.status {
        GameStatus::Scheduled => "scheduled",
        GameStatus::Completed => "completed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::RowKind;
    use crate::fetcher::Document;
    use serde_json::json;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 7, 6)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_split_scored_matchup() {
        let m = split_matchup("LG2vs5두산").unwrap();
        assert_eq!(m.away_team, "LG");
        assert_eq!(m.away_score, Some(2));
        assert_eq!(m.home_team, "두산");
        assert_eq!(m.home_score, Some(5));
    }

    #[test]
    fn test_split_double_digit_scores_with_spacing() {
        let m = split_matchup("KIA 12 vs 10 롯데").unwrap();
        assert_eq!(m.scores(), Some((12, 10)));
        assert_eq!((m.away_team.as_str(), m.home_team.as_str()), ("KIA", "롯데"));
    }

    #[test]
    fn test_split_unplayed_matchup() {
        let m = split_matchup("LG vs 두산").unwrap();
        assert_eq!(m.away_team, "LG");
        assert_eq!(m.home_team, "두산");
        assert_eq!(m.scores(), None);
    }

    #[test]
    fn test_teams_only_strips_digits() {
        assert_eq!(
            split_matchup_teams_only("LG vs 두산").unwrap(),
            ("LG".to_string(), "두산".to_string())
        );
        assert_eq!(
            split_matchup_teams_only("SSG3vs1NC").unwrap(),
            ("SSG".to_string(), "NC".to_string())
        );
    }

    #[test]
    fn test_matchup_without_separator_is_rejected() {
        assert_eq!(
            split_matchup("우천취소"),
            Err(ExtractError::MissingSeparator("우천취소".into()))
        );
        assert!(split_matchup("2vs5두산").is_err());
        assert!(split_matchup_teams_only("LG vs ").is_err());
    }

    #[test]
    fn test_innings_forms() {
        assert!((parse_innings("1 1/3") - 4.0 / 3.0).abs() < 1e-9);
        assert!((parse_innings("2/3") - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(parse_innings("6"), 6.0);
        assert_eq!(parse_innings("abc"), 0.0);
        assert_eq!(parse_innings("1/0"), 0.0);
        assert_eq!(parse_innings(""), 0.0);
    }

    #[test]
    fn test_innings_string_form() {
        assert_eq!(innings_to_string(6.0), "6.0");
        assert_eq!(innings_to_string(0.0), "0.0");
        assert_eq!(innings_to_string(2.0 / 3.0), "0.6666666666666666");
        assert_eq!(innings_to_string(4.0 / 3.0), "1.3333333333333333");
    }

    #[test]
    fn test_defensive_numbers() {
        assert_eq!(digits_or_zero("12"), 12);
        assert_eq!(digits_or_zero("-"), 0);
        assert_eq!(digits_or_zero("1.5"), 0);
        assert_eq!(parse_game_behind("-"), 0.0);
        assert_eq!(parse_game_behind("2.5"), 2.5);
        assert_eq!(parse_game_behind("n/a"), 0.0);
    }

    #[test]
    fn test_out_of_range_win_rate_becomes_zero_in_rankings() {
        let cells = strings(&["1", "LG", "10", "7", "2", "1", "1.234", "-"]);
        let ranking = ranking_from_cells(&cells, noon()).unwrap();
        assert_eq!(ranking.win_rate, 0.0);
        assert_eq!(ranking.rank, 1);
        assert_eq!(ranking.game_behind, 0.0);
        assert!(ranking.totals_agree());
    }

    #[test]
    fn test_ranking_without_games_behind_column() {
        let cells = strings(&["3", "KT", "10", "5", "5", "0", "0.500"]);
        let ranking = ranking_from_cells(&cells, noon()).unwrap();
        assert_eq!(ranking.win_rate, 0.5);
        assert_eq!(ranking.game_behind, 0.0);
    }

    #[test]
    fn test_short_ranking_row_is_rejected() {
        let cells = strings(&["1", "LG", "10"]);
        assert_eq!(
            ranking_from_cells(&cells, noon()).unwrap_err(),
            ExtractError::ShortRow { found: 3, needed: 7 }
        );
    }

    #[test]
    fn test_win_rate_row_rejects_bad_rate() {
        let good = strings(&["1", "LG", "10", "7", "2", "1", "0.778"]);
        let rate = win_rate_from_cells(&good, Some("2025-07-06")).unwrap();
        assert_eq!(rate.win_rate, 0.778);
        assert_eq!(rate.date.as_deref(), Some("2025-07-06"));

        let bad = strings(&["1", "LG", "10", "7", "2", "1", "1.234"]);
        assert!(matches!(
            win_rate_from_cells(&bad, None),
            Err(ExtractError::Format(FormatError::Number(_)))
        ));
    }

    fn row_cells(html: &str) -> Document {
        Document::parse(&format!("<table><tbody>{html}</tbody></table>"))
    }

    #[test]
    fn test_review_url_highlight_rewritten_and_absolutized() {
        let doc = row_cells(
            r#"<tr><td><a href="/Schedule/GameCenter/Main.aspx?gameDate=20250601&gameId=20250601LGOB0&section=HIGHLIGHT">하이라이트</a></td></tr>"#,
        );
        let cells = doc.select_all("td");
        assert_eq!(
            find_review_url(&cells, &Config::default()).as_deref(),
            Some("https://www.koreabaseball.com/Schedule/GameCenter/Main.aspx?gameDate=20250601&gameId=20250601LGOB0&section=REVIEW")
        );
    }

    #[test]
    fn test_review_url_by_caption_and_absence() {
        let doc = row_cells(
            r#"<tr><td><a href="/tv">TV</a></td><td><a href="https://other.test/gc">게임센터</a></td></tr>"#,
        );
        let cells = doc.select_all("td");
        assert_eq!(
            find_review_url(&cells, &Config::default()).as_deref(),
            Some("https://other.test/gc")
        );

        let doc = row_cells(r#"<tr><td><a>리뷰</a></td><td>잠실</td></tr>"#);
        assert_eq!(find_review_url(&doc.select_all("td"), &Config::default()), None);
    }

    const FIRST_ROW: &str = r#"<tr><td>06.01(일)</td><td>14:00</td>
        <td><span>LG</span><em><span>2</span><span>vs</span><span>5</span></em><span>두산</span></td>
        <td><a href="/Schedule/GameCenter/Main.aspx?gameId=20250601LGOB0&section=REVIEW">리뷰</a></td>
        <td></td><td></td><td></td><td>잠실</td><td></td></tr>"#;

    const UNPLAYED_ROW: &str = r#"<tr><td>18:30</td><td>KT vs 키움</td>
        <td><a href="/Schedule/GameCenter/Main.aspx?gameId=20250601KTWO0&section=PREVIEW">프리뷰</a></td>
        <td></td><td></td><td></td><td>고척</td></tr>"#;

    fn june_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[test]
    fn test_completed_game_row() {
        let doc = row_cells(FIRST_ROW);
        let cells = doc.select_all("td");
        let located = GameRowCells::locate(RowKind::FirstGame, &cells).unwrap();
        let entry = game_from_row(&located, june_first(), EntryMode::Results, &Config::default()).unwrap();
        assert_eq!(entry.status, GameStatus::Completed);
        assert_eq!((entry.away_score, entry.home_score), (2, 5));
        assert_eq!(entry.game_id, "20250601LGOB0");
        assert_eq!(entry.stadium, "잠실");
        assert_eq!(entry.game_date_time, "14:00");
        assert!(entry.boxscore_url.unwrap().ends_with("section=REVIEW"));
    }

    #[test]
    fn test_unplayed_row_in_each_mode() {
        let doc = row_cells(UNPLAYED_ROW);
        let cells = doc.select_all("td");
        let located = GameRowCells::locate(RowKind::SubsequentGame, &cells).unwrap();
        let config = Config::default();

        let scheduled = game_from_row(&located, june_first(), EntryMode::Schedule, &config).unwrap();
        assert_eq!(scheduled.status, GameStatus::Scheduled);
        assert_eq!(scheduled.boxscore_url, None);
        assert_eq!(scheduled.game_id, "20250601KTWO0");

        assert!(matches!(
            game_from_row(&located, june_first(), EntryMode::Results, &config),
            Err(ExtractError::MissingScore(_))
        ));

        let monthly = game_from_row(&located, june_first(), EntryMode::ScheduleOnly, &config).unwrap();
        assert_eq!(monthly.game_id, "20250601WOKT0");
        assert_eq!(monthly.away_team, "KT");
        assert_eq!(monthly.home_team, "키움");
    }

    const BOX_SCORE: &str = r#"
        <table class="tbl"><thead><tr><th>타순</th><th>포지션</th><th>선수명</th></tr></thead>
          <tbody>
            <tr><th>1</th><td>중</td><td>홍창기</td></tr>
            <tr><th>2</th><td>유</td><td>오지환</td></tr>
            <tr><th>3</th><td>좌</td><td></td></tr>
          </tbody></table>
        <table class="tbl"><thead><tr><th>타수</th><th>안타</th><th>타점</th></tr></thead>
          <tbody>
            <tr><td>4</td><td>2</td><td>1</td></tr>
            <tr><td>3</td><td>4</td><td>0</td></tr>
            <tr><td>3</td><td>1</td><td>0</td></tr>
          </tbody></table>
        <table class="tbl"><thead><tr><th>선수명</th><th>등판</th><th>이닝</th><th>자책</th></tr></thead>
          <tbody>
            <tr><td>임찬규</td><td>선발</td><td>6</td><td>2</td></tr>
            <tr><td>유영찬</td><td>9</td><td>2/3</td><td>0</td></tr>
            <tr><td>합계</td></tr>
          </tbody></table>"#;

    #[test]
    fn test_hitters_zip_lineup_and_stats() {
        let doc = Document::parse(BOX_SCORE);
        let tables = doc.select_all("table.tbl");
        let hitters = extract_hitters(tables[0], tables[1], "LG").unwrap();
        assert_eq!(hitters.len(), 2);
        assert_eq!(hitters[0].player_name, "홍창기");
        assert_eq!((hitters[0].at_bats, hitters[0].hits), (4, 2));
        assert!(hitters[1].is_suspect());
    }

    #[test]
    fn test_hitters_need_the_name_column() {
        let doc = Document::parse(BOX_SCORE);
        let tables = doc.select_all("table.tbl");
        assert_eq!(
            extract_hitters(tables[1], tables[1], "LG").unwrap_err(),
            ExtractError::MissingColumn("선수명".into())
        );
    }

    #[test]
    fn test_pitchers_by_header_columns() {
        let doc = Document::parse(BOX_SCORE);
        let tables = doc.select_all("table.tbl");
        let pitchers = extract_pitchers(tables[2], "LG").unwrap();
        assert_eq!(pitchers.len(), 2);
        assert_eq!(pitchers[0].innings, "6.0");
        assert_eq!(pitchers[0].earned_runs, 2);
        assert_eq!(pitchers[1].innings, "0.6666666666666666");
    }

    #[test]
    fn test_pitchers_need_the_innings_column() {
        let doc = Document::parse(BOX_SCORE);
        let tables = doc.select_all("table.tbl");
        assert_eq!(
            extract_pitchers(tables[1], "LG").unwrap_err(),
            ExtractError::MissingColumn("이닝".into())
        );
    }

    #[test]
    fn test_api_aliases_resolve_in_order() {
        let row = json!({
            "PlayDate": "2025-06-01",
            "GDATE": "2025-06-01 18:30",
            "AwayName": "LG",
            "HT_NM": "두산",
            "AT_SR": 3,
            "HomeScore": "4",
            "GameTime": "18:30",
            "ST_NM": "잠실",
            "T1_URL": ""
        });
        let resolved = ApiScheduleRow::from_json(&row);
        assert_eq!(resolved.date, "2025-06-01 18:30");
        assert_eq!(resolved.away_team, "LG");
        assert_eq!(resolved.home_team, "두산");
        assert_eq!((resolved.away_score, resolved.home_score), (Some(3), Some(4)));
        assert_eq!(resolved.box_link, None);
    }

    #[test]
    fn test_api_rows_from_either_envelope() {
        assert_eq!(api_rows(&json!({"d": {"rows": [1, 2]}})).len(), 2);
        assert_eq!(api_rows(&json!({"rows": [1]})).len(), 1);
        assert_eq!(api_rows(&json!({"d": "{\"rows\":[1,2,3]}"})).len(), 3);
        assert!(api_rows(&json!({"d": null})).is_empty());
    }

    #[test]
    fn test_api_box_link_gets_review_section() {
        let row = ApiScheduleRow {
            away_team: "LG".into(),
            home_team: "두산".into(),
            away_score: Some(1),
            home_score: Some(0),
            box_link: Some("/Schedule/GameCenter/Main.aspx?gameId=20250601LGOB0".into()),
            ..Default::default()
        };
        let entry = game_from_api_row(row, june_first(), &Config::default()).unwrap();
        assert_eq!(entry.game_id, "20250601LGOB0");
        assert_eq!(
            entry.boxscore_url.as_deref(),
            Some("https://www.koreabaseball.com/Schedule/GameCenter/Main.aspx?gameId=20250601LGOB0&section=REVIEW")
        );
        assert_eq!(status_label(&entry), "completed");
    }
}
