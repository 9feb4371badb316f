// =============================================================================
// crawlers/rankings.rs — THE STANDINGS
// =============================================================================
//
// The standings page is server-rendered, so this driver normally runs over
// the static fetcher. Two readings of the same table: the full ranking row,
// and a reduced (team, win rate) row for consumers that only want the rate.
//
// The full reading turns a bad win rate into 0.0. The reduced one drops
// the row.
// =============================================================================

use chrono::{NaiveDate, NaiveDateTime};
use scraper::ElementRef;
use tracing::{debug, error, info, warn};

use super::Crawler;
use crate::classifier::{self, RankingRowKind};
use crate::extract;
use crate::fetcher::{select_within, text_of, Document, PageFetcher};
use crate::metrics::CrawlMetrics;
use crate::models::{TeamRanking, TeamWinRate};

fn row_texts(row: ElementRef<'_>) -> Vec<String> {
    select_within(row, "td").into_iter().map(text_of).collect()
}

/// Team rows of the standings table, as cell texts. Aggregate and short
/// rows are dropped here.
fn team_rows(html: &str, metrics: &CrawlMetrics) -> Vec<Vec<String>> {
    let doc = Document::parse(html);
    let Some((body, selector)) = classifier::locate_ranking_body(&doc) else {
        warn!("no standings table on page");
        return Vec::new();
    };

    let rows = select_within(body, "tr");
    metrics.add_rows_seen(rows.len());
    debug!(selector, rows = rows.len(), "standings rows found");

    rows.into_iter()
        .map(row_texts)
        .filter(|cells| match classifier::classify_ranking_row(cells) {
            RankingRowKind::Team => true,
            kind => {
                debug!(?kind, first = ?cells.first(), "standings row skipped");
                metrics.increment_rows_skipped();
                false
            }
        })
        .collect()
}

/// Full ranking rows from a standings page.
pub fn parse_rankings(html: &str, crawled_at: NaiveDateTime, metrics: &CrawlMetrics) -> Vec<TeamRanking> {
    let rankings: Vec<TeamRanking> = team_rows(html, metrics)
        .iter()
        .filter_map(|cells| match extract::ranking_from_cells(cells, crawled_at) {
            Ok(ranking) => {
                if !ranking.totals_agree() {
                    debug!(team = %ranking.team_name, "wins + losses + draws != games played");
                }
                Some(ranking)
            }
            Err(e) => {
                debug!(error = %e, "standings row rejected");
                metrics.increment_rows_skipped();
                None
            }
        })
        .collect();
    metrics.add_records_extracted(rankings.len());
    rankings
}

/// Reduced win-rate rows from a standings page. `date` is `YYYY-MM-DD`.
pub fn parse_win_rates(html: &str, date: Option<&str>, metrics: &CrawlMetrics) -> Vec<TeamWinRate> {
    let rates: Vec<TeamWinRate> = team_rows(html, metrics)
        .iter()
        .filter_map(|cells| match extract::win_rate_from_cells(cells, date) {
            Ok(rate) => Some(rate),
            Err(e) => {
                debug!(team = ?cells.get(1), error = %e, "win-rate row rejected");
                metrics.increment_rows_skipped();
                None
            }
        })
        .collect();
    metrics.add_records_extracted(rates.len());
    rates
}

impl<F: PageFetcher + ?Sized> Crawler<'_, F> {
    async fn fetch_standings(&self, date: Option<NaiveDate>) -> Option<String> {
        let dotted = date.map(|d| d.format("%Y.%m.%d").to_string());
        let url = self.config.ranking_url(dotted.as_deref());
        match self.fetcher.fetch(&url, "").await {
            Ok(html) => {
                self.metrics.increment_pages_fetched();
                Some(html)
            }
            Err(e) => {
                self.metrics.increment_fetch_failures();
                error!(url = %url, error = %e, "standings page unavailable");
                None
            }
        }
    }

    /// Standings as of `date`, or as of today when `None`.
    pub async fn team_rankings(&self, date: Option<NaiveDate>, crawled_at: NaiveDateTime) -> Vec<TeamRanking> {
        let Some(html) = self.fetch_standings(date).await else {
            return Vec::new();
        };
        let rankings = parse_rankings(&html, crawled_at, self.metrics);
        info!(date = ?date, teams = rankings.len(), "team rankings crawled");
        rankings
    }

    /// Win rates as of `date`. Each record carries the date.
    pub async fn team_win_rates(&self, date: NaiveDate) -> Vec<TeamWinRate> {
        let Some(html) = self.fetch_standings(Some(date)).await else {
            return Vec::new();
        };
        let iso = date.format("%Y-%m-%d").to_string();
        let rates = parse_win_rates(&html, Some(&iso), self.metrics);
        info!(date = %iso, teams = rates.len(), "team win rates crawled");
        rates
    }
}
