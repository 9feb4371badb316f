// =============================================================================
// crawlers/schedule.rs — THE CALENDAR
// =============================================================================
//
// Three ways to read the schedule page:
//
//   daily_schedule   one day, scores and review link kept when the game is final
//   schedule_range   every day from start to end inclusive, same extraction
//   monthly_schedule every day of a month, team names only
//
// The site serves the whole month on every date URL, but only the requested
// day's group is trusted: the page can shift under us between requests, and
// asking once per day keeps each day's result tied to the page fetched for it.
//
// Multi-day crawls pause `politeness_delay` between pages and never stop on
// a bad day. The day is recorded as failed and contributes nothing.
// =============================================================================

use chrono::NaiveDate;
use tracing::{error, info, warn};

use super::{parse_schedule_page, Crawler, RangeOutcome};
use crate::dates;
use crate::error::{FetchError, FormatError};
use crate::extract::EntryMode;
use crate::fetcher::PageFetcher;
use crate::models::ScheduleEntry;

/// Readiness selector for schedule and result pages.
pub const SCHEDULE_ROOT: &str = "table.tbl";

impl<F: PageFetcher + ?Sized> Crawler<'_, F> {
    /// Fetch one day's page and extract its games in `mode`.
    pub(crate) async fn fetch_schedule_day(
        &self,
        date: NaiveDate,
        mode: EntryMode,
    ) -> Result<Vec<ScheduleEntry>, FetchError> {
        let iso = date.format("%Y-%m-%d").to_string();
        let url = self.config.schedule_url(&iso);

        let html = match self.fetcher.fetch(&url, SCHEDULE_ROOT).await {
            Ok(html) => {
                self.metrics.increment_pages_fetched();
                html
            }
            Err(e) => {
                self.metrics.increment_fetch_failures();
                return Err(e);
            }
        };

        Ok(parse_schedule_page(&html, date, mode, self.config, self.metrics))
    }

    /// Games of one day. Empty when the day has none or the page failed.
    pub async fn daily_schedule(&self, date: NaiveDate) -> Vec<ScheduleEntry> {
        match self.fetch_schedule_day(date, EntryMode::Schedule).await {
            Ok(games) => {
                info!(date = %date, games = games.len(), "daily schedule crawled");
                games
            }
            Err(e) => {
                error!(date = %date, error = %e, "schedule page unavailable");
                Vec::new()
            }
        }
    }

    /// Games of every day from `start` to `end`, inclusive.
    pub async fn schedule_range(&self, start: NaiveDate, end: NaiveDate) -> RangeOutcome {
        self.crawl_days(&dates::days_between(start, end), EntryMode::Schedule)
            .await
    }

    /// Every day of `year`-`month` through the team-names-only extraction.
    pub async fn monthly_schedule(&self, year: i32, month: u32) -> Result<RangeOutcome, FormatError> {
        let days = dates::days_of_month(year, month)?;
        let outcome = self.crawl_days(&days, EntryMode::ScheduleOnly).await;
        info!(
            year,
            month,
            games = outcome.total(),
            failed_days = outcome.failed.len(),
            "monthly schedule crawled"
        );
        Ok(outcome)
    }

    async fn crawl_days(&self, days: &[NaiveDate], mode: EntryMode) -> RangeOutcome {
        let mut outcome = RangeOutcome::default();

        for (i, &date) in days.iter().enumerate() {
            if i > 0 && !self.config.politeness_delay.is_zero() {
                tokio::time::sleep(self.config.politeness_delay).await;
            }

            match self.fetch_schedule_day(date, mode).await {
                Ok(games) => {
                    info!(date = %date, games = games.len(), "day crawled");
                    outcome.days.push((date, games));
                }
                Err(e) => {
                    warn!(date = %date, error = %e, "day failed, continuing with the next");
                    outcome.days.push((date, Vec::new()));
                    outcome.failed.push(date);
                }
            }
        }

        if !outcome.failed.is_empty() {
            warn!(failed = ?outcome.failed, "some days could not be crawled");
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::crawlers::fixtures::{EMPTY_PAGE, JUNE_PAGE};
    use crate::fetcher::testing::FixtureFetcher;
    use crate::metrics::CrawlMetrics;
    use crate::models::GameStatus;

    fn no_delay() -> Config {
        Config::from_lookup(|key| (key == "KBO_CRAWL_DELAY_MILLIS").then(|| "0".to_string()))
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn url(config: &Config, d: u32) -> String {
        config.schedule_url(&format!("2025-06-{d:02}"))
    }

    #[tokio::test]
    async fn test_daily_schedule_reads_target_day() {
        let config = no_delay();
        let fetcher = FixtureFetcher::new().with_page(url(&config, 1), JUNE_PAGE);
        let metrics = CrawlMetrics::new();
        let crawler = Crawler::new(&fetcher, &config, &metrics);

        let games = crawler.daily_schedule(day(1)).await;
        assert_eq!(games.len(), 2);
        assert_eq!(fetcher.requested(), vec![url(&config, 1)]);
        assert_eq!(metrics.snapshot().pages_fetched, 1);
    }

    #[tokio::test]
    async fn test_daily_schedule_swallows_fetch_failure() {
        let config = no_delay();
        let fetcher = FixtureFetcher::new().failing(url(&config, 1));
        let metrics = CrawlMetrics::new();
        let crawler = Crawler::new(&fetcher, &config, &metrics);

        assert!(crawler.daily_schedule(day(1)).await.is_empty());
        assert_eq!(metrics.snapshot().fetch_failures, 1);
    }

    #[tokio::test]
    async fn test_range_continues_past_a_failed_day() {
        let config = no_delay();
        let mut fetcher = FixtureFetcher::new().failing(url(&config, 3));
        for d in [1, 2, 4, 5] {
            fetcher = fetcher.with_page(url(&config, d), JUNE_PAGE.replace("06.01", &format!("06.{d:02}")));
        }
        let metrics = CrawlMetrics::new();
        let crawler = Crawler::new(&fetcher, &config, &metrics);

        let outcome = crawler.schedule_range(day(1), day(5)).await;
        assert_eq!(outcome.days.len(), 5);
        assert_eq!(outcome.failed, vec![day(3)]);
        assert!(outcome.days[2].1.is_empty());
        for (date, games) in [&outcome.days[0], &outcome.days[1], &outcome.days[3], &outcome.days[4]] {
            assert!(!games.is_empty(), "{date} should have games");
        }
        assert_eq!(fetcher.requested().len(), 5);
    }

    #[tokio::test]
    async fn test_monthly_schedule_zeroes_scores() {
        let config = no_delay();
        let mut fetcher = FixtureFetcher::new().with_page(url(&config, 1), JUNE_PAGE);
        for d in 2..=30 {
            fetcher = fetcher.with_page(url(&config, d), EMPTY_PAGE);
        }
        let metrics = CrawlMetrics::new();
        let crawler = Crawler::new(&fetcher, &config, &metrics);

        let outcome = crawler.monthly_schedule(2025, 6).await.unwrap();
        assert_eq!(outcome.days.len(), 30);
        assert!(outcome.failed.is_empty());

        let games = outcome.entries();
        assert_eq!(games.len(), 2);
        for game in &games {
            assert_eq!(game.status, GameStatus::Scheduled);
            assert_eq!((game.away_score, game.home_score), (0, 0));
            assert_eq!(game.boxscore_url, None);
        }
        assert_eq!(games[0].game_id, "20250601OBLG0");
    }

    #[tokio::test]
    async fn test_monthly_schedule_rejects_bad_month() {
        let config = no_delay();
        let fetcher = FixtureFetcher::new();
        let metrics = CrawlMetrics::new();
        let crawler = Crawler::new(&fetcher, &config, &metrics);
        assert!(crawler.monthly_schedule(2025, 13).await.is_err());
        assert!(fetcher.requested().is_empty());
    }
}
