// =============================================================================
// crawlers/results.rs — FINAL SCORES
// =============================================================================
//
// Same page as the schedule, read strictly: a row without both scores is a
// game that has not finished and is dropped. What survives carries the
// review URL the stats driver needs.
// =============================================================================

use chrono::NaiveDate;
use tracing::{error, info};

use super::Crawler;
use crate::extract::EntryMode;
use crate::fetcher::PageFetcher;
use crate::models::ScheduleEntry;

impl<F: PageFetcher + ?Sized> Crawler<'_, F> {
    /// Finished games of one day.
    pub async fn daily_results(&self, date: NaiveDate) -> Vec<ScheduleEntry> {
        match self.fetch_schedule_day(date, EntryMode::Results).await {
            Ok(games) => {
                let with_review = games.iter().filter(|g| g.boxscore_url.is_some()).count();
                info!(date = %date, games = games.len(), with_review, "daily results crawled");
                games
            }
            Err(e) => {
                error!(date = %date, error = %e, "result page unavailable");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::crawlers::fixtures::JUNE_PAGE;
    use crate::fetcher::testing::FixtureFetcher;
    use crate::metrics::CrawlMetrics;
    use crate::models::GameStatus;

    #[tokio::test]
    async fn test_results_keep_only_finished_games() {
        let config = Config::default();
        let fetcher = FixtureFetcher::new().with_page(config.schedule_url("2025-06-01"), JUNE_PAGE);
        let metrics = CrawlMetrics::new();
        let crawler = Crawler::new(&fetcher, &config, &metrics);

        let games = crawler
            .daily_results(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap())
            .await;
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].status, GameStatus::Completed);
        assert_eq!(games[0].home_team, "두산");
        assert_eq!(
            games[0].boxscore_url.as_deref(),
            Some("https://www.koreabaseball.com/Schedule/GameCenter/Main.aspx?gameId=20250601LGOB0&section=REVIEW")
        );
    }

    #[tokio::test]
    async fn test_missing_root_yields_nothing() {
        let config = Config::default();
        let fetcher = FixtureFetcher::new()
            .with_page(config.schedule_url("2025-06-01"), "<html><body>점검 중</body></html>");
        let metrics = CrawlMetrics::new();
        let crawler = Crawler::new(&fetcher, &config, &metrics);

        let games = crawler
            .daily_results(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap())
            .await;
        assert!(games.is_empty());
        assert_eq!(metrics.snapshot().fetch_failures, 1);
    }
}
