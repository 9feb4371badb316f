// =============================================================================
// crawlers/player_stats.rs — THE BOX SCORE
// =============================================================================
//
// One review page per finished game. The page has no team labels on its
// stats tables, so the two teams come from outside: either the caller names
// them, or we slice the codes out of the `gameId` in the review URL
// (`20250601LGOB0` -> away "LG", home "OB") and turn them into display names.
//
// Tables are then paired with teams by order of appearance, away first.
// See classifier.rs for why that is an assumption and not a fact.
// =============================================================================

use tracing::{debug, error, info, warn};

use super::Crawler;
use crate::classifier::{table_headers, StatsTableIndex};
use crate::dates;
use crate::extract;
use crate::fetcher::{Document, PageFetcher};
use crate::metrics::CrawlMetrics;
use crate::models::PlayerStats;
use crate::teams;

/// Readiness selector for review pages.
pub const REVIEW_ROOT: &str = "table.tbl";

/// Codes used when the review URL carries no usable game id.
const PLACEHOLDER_CODES: (&str, &str) = ("AW", "HM");

/// (away, home) league codes for a review URL.
pub fn team_codes_for(review_url: &str) -> (String, String) {
    match dates::extract_game_id_from_url(review_url)
        .as_deref()
        .and_then(dates::team_codes_from_game_id)
    {
        Some(codes) => codes,
        None => {
            warn!(url = review_url, "no game id in review URL, using placeholder team codes");
            (PLACEHOLDER_CODES.0.to_string(), PLACEHOLDER_CODES.1.to_string())
        }
    }
}

impl<F: PageFetcher + ?Sized> Crawler<'_, F> {
    /// Pitcher and hitter lines of one game.
    ///
    /// # Arguments
    /// * `review_url` - Absolute URL of the game's review page.
    /// * `codes` - (away, home) league codes; derived from the URL when `None`.
    pub async fn player_stats(&self, review_url: &str, codes: Option<(String, String)>) -> PlayerStats {
        let (away_code, home_code) = codes.unwrap_or_else(|| team_codes_for(review_url));
        let away = teams::name_for_code(&away_code);
        let home = teams::name_for_code(&home_code);

        let html = match self.fetcher.fetch(review_url, REVIEW_ROOT).await {
            Ok(html) => {
                self.metrics.increment_pages_fetched();
                html
            }
            Err(e) => {
                self.metrics.increment_fetch_failures();
                error!(url = review_url, error = %e, "review page unavailable");
                return PlayerStats::default();
            }
        };

        let stats = parse_box_score(&html, &away, &home, self.metrics);
        info!(
            url = review_url,
            away = %away,
            home = %home,
            pitchers = stats.pitchers.len(),
            hitters = stats.hitters.len(),
            "player stats crawled"
        );
        stats
    }
}

/// Extract both teams' lines from a review page.
pub fn parse_box_score(html: &str, away: &str, home: &str, metrics: &CrawlMetrics) -> PlayerStats {
    let doc = Document::parse(html);
    let tables = doc.select_all("table.tbl");
    let headers: Vec<Vec<String>> = tables.iter().map(|t| table_headers(*t)).collect();
    let index = StatsTableIndex::classify(&headers);
    let teams = [away, home];

    let mut stats = PlayerStats::default();

    match index.hitter_pairs() {
        Ok(pairs) => {
            for ((lineup, hitter), team) in pairs.into_iter().zip(teams) {
                match extract::extract_hitters(tables[lineup], tables[hitter], team) {
                    Ok(rows) => stats.hitters.extend(rows),
                    Err(e) => debug!(team, error = %e, "hitter table skipped"),
                }
            }
        }
        Err(e) => warn!(tables = tables.len(), error = %e, "no hitter tables on review page"),
    }

    match index.pitcher_tables() {
        Ok(pitcher_tables) => {
            for (table, team) in pitcher_tables.into_iter().zip(teams) {
                match extract::extract_pitchers(tables[table], team) {
                    Ok(rows) => stats.pitchers.extend(rows),
                    Err(e) => debug!(team, error = %e, "pitcher table skipped"),
                }
            }
        }
        Err(e) => warn!(tables = tables.len(), error = %e, "no pitcher tables on review page"),
    }

    metrics.add_records_extracted(stats.pitchers.len() + stats.hitters.len());
    stats
}
