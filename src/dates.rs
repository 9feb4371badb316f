// =============================================================================
// dates.rs — DATE LABELS AND GAME IDENTIFIERS
// =============================================================================
//
// The schedule page labels its date groups "06.01(일)", the ranking page wants
// "2025.06.01", the rest of the world says "2025-06-01", and game ids glue a
// date onto two team codes. This module converts between all of them.
//
// Everything here is pure except `current_year()`, and that one only gets
// consulted when a caller hands us a bare "MM.DD" label with no year attached.
// =============================================================================

use chrono::{Datelike, Local, NaiveDate};
use memchr::memmem;
use url::Url;

use crate::error::FormatError;
use crate::teams;

const ISO_FORMAT: &str = "%Y-%m-%d";

/// Parse a `YYYY-MM-DD` date.
pub fn parse_iso_date(input: &str) -> Result<NaiveDate, FormatError> {
    NaiveDate::parse_from_str(input.trim(), ISO_FORMAT).map_err(|_| FormatError::Date {
        input: input.to_string(),
        expected: "YYYY-MM-DD",
    })
}

/// Parse a `YYYY-MM` month into (year, month).
pub fn parse_year_month(input: &str) -> Result<(i32, u32), FormatError> {
    let err = || FormatError::Date {
        input: input.to_string(),
        expected: "YYYY-MM",
    };
    let (year, month) = input.trim().split_once('-').ok_or_else(err)?;
    let year: i32 = year.parse().map_err(|_| err())?;
    let month: u32 = month.parse().map_err(|_| err())?;
    NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(err)?;
    Ok((year, month))
}

/// `YYYY-MM-DD` -> the schedule page's `MM.DD` group label.
pub fn to_source_date_format(iso_date: &str) -> Result<String, FormatError> {
    Ok(short_label(parse_iso_date(iso_date)?))
}

/// The `MM.DD` label for a date.
pub fn short_label(date: NaiveDate) -> String {
    date.format("%m.%d").to_string()
}

/// `YYYY-MM-DD` -> `YYYY.MM.DD`, the ranking page's query format.
pub fn to_ranking_date_format(iso_date: &str) -> Result<String, FormatError> {
    Ok(parse_iso_date(iso_date)?.format("%Y.%m.%d").to_string())
}

/// Every day of a month, first to last.
pub fn days_of_month(year: i32, month: u32) -> Result<Vec<NaiveDate>, FormatError> {
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| FormatError::Date {
        input: format!("{year}-{month}"),
        expected: "a real month",
    })?;
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    let last = next_first
        .and_then(|d| d.pred_opt())
        .unwrap_or(first);
    Ok(days_between(first, last))
}

/// Inclusive day range. Empty when `end` is before `start`.
pub fn days_between(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut current = start;
    while current <= end {
        days.push(current);
        match current.succ_opt() {
            Some(next) => current = next,
            None => break,
        }
    }
    days
}

/// The year assumed for a bare `MM.DD` label.
///
/// Wrong for December games crawled in January; callers that know the year
/// should use [`derive_game_id_for`] instead.
pub fn current_year() -> i32 {
    Local::now().year()
}

/// Synthesize a game id from a date and the two team display names.
///
/// `date` is either `YYYY-MM-DD` or the page's `MM.DD` label (anything after
/// the fifth character is ignored, so "06.01(일)" works). Layout:
/// `{YYYY}{MM}{DD}{homeCode}{awayCode}0`.
pub fn derive_game_id(date: &str, away_team: &str, home_team: &str) -> Result<String, FormatError> {
    let date = date.trim();
    let parsed = match parse_iso_date(date) {
        Ok(d) => d,
        Err(_) => parse_short_label(date, current_year())?,
    };
    Ok(derive_game_id_for(parsed, away_team, home_team))
}

/// Same as [`derive_game_id`] with the year supplied by the caller.
pub fn derive_game_id_for(date: NaiveDate, away_team: &str, home_team: &str) -> String {
    format!(
        "{}{}{}0",
        date.format("%Y%m%d"),
        teams::code_for_name(home_team),
        teams::code_for_name(away_team)
    )
}

/// Parse `MM.DD` (plus any trailing decoration) in the given year.
pub fn parse_short_label(label: &str, year: i32) -> Result<NaiveDate, FormatError> {
    let err = || FormatError::Date {
        input: label.to_string(),
        expected: "MM.DD",
    };
    let head = label.get(..5).ok_or_else(err)?;
    let (month, day) = head.split_once('.').ok_or_else(err)?;
    let month: u32 = month.parse().map_err(|_| err())?;
    let day: u32 = day.parse().map_err(|_| err())?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(err)
}

/// Pull the `gameId` query parameter out of a review/box-score URL.
///
/// Absolute URLs go through a real parser; relative ones and anything the
/// parser rejects fall back to a plain substring scan. Never fails loudly.
pub fn extract_game_id_from_url(url: &str) -> Option<String> {
    if url.is_empty() {
        return None;
    }

    if let Ok(parsed) = Url::parse(url) {
        if let Some((_, value)) = parsed.query_pairs().find(|(k, _)| k == "gameId") {
            return non_empty(value.into_owned());
        }
    }

    let needle = b"gameId=";
    let start = memmem::find(url.as_bytes(), needle)? + needle.len();
    let rest = &url[start..];
    let end = rest.find(|c: char| c == '&' || c == '#').unwrap_or(rest.len());
    non_empty(rest[..end].to_string())
}

/// The (away, home) codes embedded at fixed offsets of a site-issued game id
/// such as `20250601KTWO0`. `None` if the id is too short.
pub fn team_codes_from_game_id(game_id: &str) -> Option<(String, String)> {
    let away = game_id.get(8..10)?;
    let home = game_id.get(10..12)?;
    if away.chars().chain(home.chars()).all(|c| c.is_ascii_alphanumeric()) {
        Some((away.to_string(), home.to_string()))
    } else {
        None
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
