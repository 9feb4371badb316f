// =============================================================================
// crawlers/schedule_api.rs — THE SCHEDULE WEB SERVICE
// =============================================================================
//
// The league also serves the month's schedule as JSON from a form-POST
// endpoint. No rendering, no row classification: one request per month,
// filter to the day, resolve the field aliases, done.
//
// The envelope and the key spellings have both changed over the years.
// extract.rs knows every variant; this file only asks and filters.
// =============================================================================

use chrono::{Datelike, NaiveDate};
use serde_json::Value;
use tracing::{debug, error, info};

use super::Crawler;
use crate::config::Config;
use crate::extract::{self, ApiScheduleRow};
use crate::fetcher::FormSource;
use crate::metrics::CrawlMetrics;
use crate::models::ScheduleEntry;

/// League id of the KBO regular league.
const LEAGUE_ID: &str = "1";
/// Regular season, exhibition and postseason series.
const SERIES_IDS: &str = "0,9,6";

/// The form fields for one month.
pub fn schedule_form(date: NaiveDate) -> Vec<(&'static str, String)> {
    vec![
        ("leId", LEAGUE_ID.to_string()),
        ("srIdList", SERIES_IDS.to_string()),
        ("seasonId", date.year().to_string()),
        ("gameMonth", date.month().to_string()),
        ("teamId", String::new()),
    ]
}

impl<F: FormSource + ?Sized> Crawler<'_, F> {
    /// Games of `date` according to the JSON schedule service.
    pub async fn schedule_from_api(&self, date: NaiveDate) -> Vec<ScheduleEntry> {
        let url = self.config.schedule_api_url();
        let body = match self.fetcher.post_form(&url, &schedule_form(date)).await {
            Ok(body) => {
                self.metrics.increment_pages_fetched();
                body
            }
            Err(e) => {
                self.metrics.increment_fetch_failures();
                error!(url = %url, error = %e, "schedule service unavailable");
                return Vec::new();
            }
        };

        let json: Value = match serde_json::from_str(&body) {
            Ok(json) => json,
            Err(e) => {
                error!(url = %url, error = %e, "schedule service returned invalid JSON");
                return Vec::new();
            }
        };

        let games = entries_for_day(&json, date, self.config, self.metrics);
        info!(date = %date, games = games.len(), "schedule service crawled");
        games
    }
}

/// Rows of the response whose date starts with `date`, as entries.
pub fn entries_for_day(
    body: &Value,
    date: NaiveDate,
    config: &Config,
    metrics: &CrawlMetrics,
) -> Vec<ScheduleEntry> {
    let prefix = date.format("%Y-%m-%d").to_string();
    let rows = extract::api_rows(body);
    metrics.add_rows_seen(rows.len());

    let mut games = Vec::new();
    for row in rows.iter().map(ApiScheduleRow::from_json) {
        if !row.date.starts_with(&prefix) {
            metrics.increment_rows_skipped();
            continue;
        }
        match extract::game_from_api_row(row, date, config) {
            Ok(game) => games.push(game),
            Err(e) => {
                debug!(error = %e, "service row rejected");
                metrics.increment_rows_skipped();
            }
        }
    }
    metrics.add_records_extracted(games.len());
    games
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::testing::FixtureFetcher;
    use crate::models::GameStatus;
    use serde_json::json;

    fn june_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn response() -> Value {
        json!({
            "d": {
                "rows": [
                    {"GDATE": "2025-05-31", "AT_NM": "SSG", "HT_NM": "NC", "AT_SR": "3", "HT_SR": "1"},
                    {"GDATE": "2025-06-01", "AT_NM": "LG", "HT_NM": "두산", "AT_SR": "2", "HT_SR": "5",
                     "G_TM": "14:00", "ST_NM": "잠실",
                     "T1_URL": "/Schedule/GameCenter/Main.aspx?gameId=20250601LGOB0"},
                    {"PlayDate": "2025-06-01", "AwayName": "KT", "HomeName": "키움",
                     "GameTime": "18:30", "StadiumName": "고척"},
                    {"GDATE": "2025-06-01", "AT_NM": "", "HT_NM": "한화"}
                ]
            }
        })
    }

    #[test]
    fn test_form_names_the_month() {
        let form = schedule_form(june_first());
        assert!(form.contains(&("seasonId", "2025".to_string())));
        assert!(form.contains(&("gameMonth", "6".to_string())));
        assert!(form.contains(&("teamId", String::new())));
    }

    #[test]
    fn test_rows_filtered_to_the_day() {
        let metrics = CrawlMetrics::new();
        let games = entries_for_day(&response(), june_first(), &Config::default(), &metrics);

        assert_eq!(games.len(), 2);
        assert_eq!(games[0].status, GameStatus::Completed);
        assert_eq!(games[0].game_id, "20250601LGOB0");
        assert!(games[0].boxscore_url.as_deref().unwrap().ends_with("&section=REVIEW"));
        assert_eq!(games[1].status, GameStatus::Scheduled);
        assert_eq!(games[1].game_id, "20250601WOKT0");
        assert_eq!(metrics.snapshot().rows_skipped, 2);
    }

    #[tokio::test]
    async fn test_driver_posts_to_service() {
        let config = Config::default();
        let fetcher = FixtureFetcher::new().with_page(config.schedule_api_url(), response().to_string());
        let metrics = CrawlMetrics::new();
        let crawler = Crawler::new(&fetcher, &config, &metrics);

        assert_eq!(crawler.schedule_from_api(june_first()).await.len(), 2);
        assert_eq!(fetcher.requested(), vec![config.schedule_api_url()]);
    }

    #[tokio::test]
    async fn test_invalid_json_is_empty() {
        let config = Config::default();
        let fetcher = FixtureFetcher::new().with_page(config.schedule_api_url(), "<html>error</html>");
        let metrics = CrawlMetrics::new();
        let crawler = Crawler::new(&fetcher, &config, &metrics);

        assert!(crawler.schedule_from_api(june_first()).await.is_empty());
    }
}
