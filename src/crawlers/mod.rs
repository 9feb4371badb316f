// =============================================================================
// crawlers/mod.rs — ONE DRIVER PER KIND OF PAGE
// =============================================================================
//
// Every driver has the same shape: fetch a page, classify its rows, extract
// records, and for multi-day crawls sleep and go again. They differ only in
// which page they ask for and which extractor they feed.
//
// A driver never returns an error to its caller. A page that cannot be
// fetched is logged and yields nothing; a row that cannot be read is logged
// at debug and skipped. The pipeline decides what an empty result means.
//
// Drivers are methods on `Crawler`, which borrows the fetcher, the config
// and the run's counters. Each file adds its own `impl` block, bounded on
// whichever fetcher capability it needs.
// =============================================================================

pub mod player_stats;
pub mod rankings;
pub mod results;
pub mod schedule;
pub mod schedule_api;

use chrono::NaiveDate;
use tracing::debug;

use crate::classifier::{self, GameRowCells, RowClassifier, RowKind};
use crate::config::Config;
use crate::dates;
use crate::extract::{self, EntryMode};
use crate::fetcher::{select_within, text_of, Document};
use crate::metrics::CrawlMetrics;
use crate::models::ScheduleEntry;

/// What the drivers of one run share.
pub struct Crawler<'a, F: ?Sized> {
    pub fetcher: &'a F,
    pub config: &'a Config,
    pub metrics: &'a CrawlMetrics,
}

impl<'a, F: ?Sized> Crawler<'a, F> {
    pub fn new(fetcher: &'a F, config: &'a Config, metrics: &'a CrawlMetrics) -> Self {
        Self {
            fetcher,
            config,
            metrics,
        }
    }
}

/// Outcome of a multi-day crawl: every day that was attempted, in order,
/// plus the days whose page could not be fetched. A failed day is also in
/// `days`, with no entries.
#[derive(Debug, Clone, Default)]
pub struct RangeOutcome {
    pub days: Vec<(NaiveDate, Vec<ScheduleEntry>)>,
    pub failed: Vec<NaiveDate>,
}

impl RangeOutcome {
    /// All entries of all days, in day order.
    pub fn entries(&self) -> Vec<ScheduleEntry> {
        self.days
            .iter()
            .flat_map(|(_, games)| games.iter().cloned())
            .collect()
    }

    pub fn total(&self) -> usize {
        self.days.iter().map(|(_, games)| games.len()).sum()
    }
}

/// Walk one schedule page and extract the games of `date`.
///
/// The page is the month's table; the row classifier tracks which date
/// group each row belongs to. Rows of other days, filler rows and rows the
/// extractor rejects are skipped.
pub fn parse_schedule_page(
    html: &str,
    date: NaiveDate,
    mode: EntryMode,
    config: &Config,
    metrics: &CrawlMetrics,
) -> Vec<ScheduleEntry> {
    let doc = Document::parse(html);
    let rows = doc.select_all(classifier::SCHEDULE_ROWS_SELECTOR);
    metrics.add_rows_seen(rows.len());

    let mut classifier = RowClassifier::new(dates::short_label(date));
    let mut entries = Vec::new();

    for (i, row) in rows.into_iter().enumerate() {
        let cells = select_within(row, "td");
        let first = cells.first().map(|c| text_of(*c)).unwrap_or_default();

        let kind = classifier.classify(&first, cells.len());
        if let RowKind::Skip(reason) = kind {
            debug!(
                row = i,
                ?reason,
                state = ?classifier.state(),
                group = classifier.current_label().unwrap_or("-"),
                "schedule row skipped"
            );
            metrics.increment_rows_skipped();
            continue;
        }

        let entry = GameRowCells::locate(kind, &cells)
            .and_then(|located| extract::game_from_row(&located, date, mode, config));
        match entry {
            Ok(entry) => {
                debug!(
                    row = i,
                    game_id = %entry.game_id,
                    status = extract::status_label(&entry),
                    "game extracted"
                );
                entries.push(entry);
            }
            Err(e) => {
                debug!(row = i, error = %e, "game row rejected");
                metrics.increment_rows_skipped();
            }
        }
    }

    metrics.add_records_extracted(entries.len());
    entries
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! A month page in the league's schedule layout, shared by the driver
    //! tests.

    /// June 1st: one finished game, one unplayed. June 2nd: one finished game.
    /// A filler row sits inside the first group.
    pub const JUNE_PAGE: &str = r#"<html><body>
      <table class="tbl"><tbody>
        <tr><td>05.31(토)</td><td>17:00</td><td>SSG3vs1NC</td>
            <td><a href="/Schedule/GameCenter/Main.aspx?gameId=20250531NCSK0&section=REVIEW">리뷰</a></td>
            <td></td><td></td><td></td><td>문학</td><td></td></tr>
        <tr><td>06.01(일)</td><td>14:00</td>
            <td><span>LG</span><em><span>2</span><span>vs</span><span>5</span></em><span>두산</span></td>
            <td><a href="/Schedule/GameCenter/Main.aspx?gameId=20250601LGOB0&section=HIGHLIGHT">하이라이트</a></td>
            <td></td><td></td><td></td><td>잠실</td><td></td></tr>
        <tr><td colspan="9">우천 취소 안내</td></tr>
        <tr><td>18:30</td><td>KT vs 키움</td><td></td>
            <td></td><td></td><td></td><td>고척</td></tr>
        <tr><td>06.02(월)</td><td>18:30</td><td>한화7vs0롯데</td>
            <td><a href="/Schedule/GameCenter/Main.aspx?gameId=20250602HHLT0&section=REVIEW">리뷰</a></td>
            <td></td><td></td><td></td><td>사직</td><td></td></tr>
      </tbody></table>
    </body></html>"#;

    pub const EMPTY_PAGE: &str =
        r#"<html><body><table class="tbl"><tbody><tr><td>경기 일정이 없습니다.</td></tr></tbody></table></body></html>"#;
}
