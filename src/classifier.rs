// =============================================================================
// classifier.rs — WHICH ROWS, WHICH TABLES
// =============================================================================
//
// The schedule page is one long table for the whole month. A date appears
// once, in the first row of its group (the cell has a rowspan), and every
// following row of that day starts with a kick-off time instead. So whether
// a "18:30" row belongs to the day we asked for depends on the last date
// row we walked past. That memory is the `RowClassifier` below: two states,
// switched only by date rows.
//
// Box-score pages carry a dozen anonymous `table.tbl`s. We tell them apart by
// header captions and pair them with teams by order of appearance, away
// first. Nothing in the markup confirms that pairing; if the site ever flips
// the order, every stat for that page lands on the wrong team.
//
// The standings page has moved its table class around over the seasons, so
// we try a short list of selectors and take the first that matches.
// =============================================================================

use scraper::ElementRef;
use tracing::{debug, warn};

use crate::error::ExtractError;
use crate::fetcher::{select_within, text_of, Document};
use crate::markers::{self, HeaderLabel};

/// Rows with fewer cells are layout filler ("no games scheduled" banners).
pub const MIN_SCHEDULE_CELLS: usize = 6;
/// First row of a date group: date, time, matchup, ..., stadium at index 7.
pub const MIN_FIRST_GAME_CELLS: usize = 8;
/// Later rows of the group: time, matchup, ..., stadium at index 6.
pub const MIN_SUBSEQUENT_GAME_CELLS: usize = 7;
pub const MIN_RANKING_CELLS: usize = 7;

/// Candidate bodies of the standings table, most specific first.
pub const RANKING_BODY_SELECTORS: &[&str] = &[
    "table.tData tbody",
    "table.tbl tbody",
    ".tData tbody",
    ".tbl tbody",
];

pub const SCHEDULE_ROWS_SELECTOR: &str = "table.tbl tbody tr";

fn two_digits(bytes: &[u8]) -> bool {
    bytes.len() == 2 && bytes.iter().all(u8::is_ascii_digit)
}

/// `MM.DD` at the start of the text ("06.01(일)").
pub fn is_date_marker(text: &str) -> bool {
    let b = text.as_bytes();
    b.len() >= 5 && two_digits(&b[0..2]) && b[2] == b'.' && two_digits(&b[3..5])
}

/// `HH:MM` at the start of the text ("18:30").
pub fn is_time_marker(text: &str) -> bool {
    let b = text.as_bytes();
    b.len() >= 5 && two_digits(&b[0..2]) && b[2] == b':' && two_digits(&b[3..5])
}

// =============================================================================
// Schedule rows
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupState {
    OutsideTargetDate,
    InsideTargetDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    TooFewCells,
    OtherDate,
    NotAGameRow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    /// Opens the target date's group. Cells: date, time, matchup, ...
    FirstGame,
    /// Continues the target date's group. Cells: time, matchup, ...
    SubsequentGame,
    Skip(SkipReason),
}

/// Walks the schedule table row by row, remembering which date group it is in.
///
/// Only a date-marker row can change the state; time rows and junk rows
/// leave it alone. Rows under `MIN_SCHEDULE_CELLS` are skipped before they
/// are even looked at, so a short banner row between two games of the same
/// day does not end the group.
#[derive(Debug, Clone)]
pub struct RowClassifier {
    target_label: String,
    state: GroupState,
    current_label: Option<String>,
}

impl RowClassifier {
    /// `target_label` is the `MM.DD` label of the day being crawled.
    pub fn new(target_label: impl Into<String>) -> Self {
        Self {
            target_label: target_label.into(),
            state: GroupState::OutsideTargetDate,
            current_label: None,
        }
    }

    pub fn state(&self) -> GroupState {
        self.state
    }

    /// The `MM.DD` label of the group the last row belonged to.
    pub fn current_label(&self) -> Option<&str> {
        self.current_label.as_deref()
    }

    pub fn classify(&mut self, first_cell: &str, cell_count: usize) -> RowKind {
        if cell_count < MIN_SCHEDULE_CELLS {
            return RowKind::Skip(SkipReason::TooFewCells);
        }

        let first_cell = first_cell.trim();
        if is_date_marker(first_cell) {
            let label = &first_cell[..5];
            self.state = if label == self.target_label {
                GroupState::InsideTargetDate
            } else {
                GroupState::OutsideTargetDate
            };
            self.current_label = Some(label.to_string());
            return match self.state {
                GroupState::InsideTargetDate => RowKind::FirstGame,
                GroupState::OutsideTargetDate => RowKind::Skip(SkipReason::OtherDate),
            };
        }

        if is_time_marker(first_cell) {
            return match self.state {
                GroupState::InsideTargetDate => RowKind::SubsequentGame,
                GroupState::OutsideTargetDate => RowKind::Skip(SkipReason::OtherDate),
            };
        }

        RowKind::Skip(SkipReason::NotAGameRow)
    }
}

/// The cells of one schedule row that the extractor needs, already located
/// according to the row's shape.
#[derive(Debug, Clone, Copy)]
pub struct GameRowCells<'a> {
    pub time: ElementRef<'a>,
    pub matchup: ElementRef<'a>,
    pub stadium: ElementRef<'a>,
    /// Every cell of the row; review links can sit in any of them.
    pub all: &'a [ElementRef<'a>],
}

impl<'a> GameRowCells<'a> {
    pub fn locate(kind: RowKind, cells: &'a [ElementRef<'a>]) -> Result<Self, ExtractError> {
        let (offset, needed) = match kind {
            RowKind::FirstGame => (1, MIN_FIRST_GAME_CELLS),
            RowKind::SubsequentGame => (0, MIN_SUBSEQUENT_GAME_CELLS),
            RowKind::Skip(_) => return Err(ExtractError::EmptyField("game row")),
        };
        if cells.len() < needed {
            return Err(ExtractError::ShortRow {
                found: cells.len(),
                needed,
            });
        }
        Ok(Self {
            time: cells[offset],
            matchup: cells[offset + 1],
            stadium: cells[offset + 6],
            all: cells,
        })
    }
}

// =============================================================================
// Box-score tables
// =============================================================================

/// Indexes (into the page's `table.tbl` list) of each kind of stats table,
/// in page order. Element 0 of each list is the away team's table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsTableIndex {
    pub lineup: Vec<usize>,
    pub hitter: Vec<usize>,
    pub pitcher: Vec<usize>,
}

impl StatsTableIndex {
    /// Classify tables by their header captions. A table can land in more
    /// than one list; the lineup and hitter tables are sometimes one table.
    pub fn classify(headers: &[Vec<String>]) -> Self {
        let mut index = StatsTableIndex::default();
        for (i, hdrs) in headers.iter().enumerate() {
            let has = |label| markers::header_index(hdrs, label).is_some();
            if has(HeaderLabel::PlayerName) {
                index.lineup.push(i);
            }
            if has(HeaderLabel::AtBats) && has(HeaderLabel::Hits) {
                index.hitter.push(i);
            }
            if has(HeaderLabel::Innings) && has(HeaderLabel::EarnedRuns) {
                index.pitcher.push(i);
            }
        }
        debug!(
            lineup = ?index.lineup,
            hitter = ?index.hitter,
            pitcher = ?index.pitcher,
            "stats tables classified"
        );
        index
    }

    /// (lineup, hitter) table pairs by position: away first, then home.
    pub fn hitter_pairs(&self) -> Result<Vec<(usize, usize)>, ExtractError> {
        if self.lineup.len() < 2 || self.hitter.len() < 2 {
            return Err(ExtractError::UnclassifiedTable("lineup + hitter"));
        }
        if self.lineup.len() != 2 || self.hitter.len() != 2 {
            warn!(
                lineup = self.lineup.len(),
                hitter = self.hitter.len(),
                "unexpected number of hitter tables, pairing the first two by position"
            );
        }
        Ok(self
            .lineup
            .iter()
            .copied()
            .zip(self.hitter.iter().copied())
            .take(2)
            .collect())
    }

    /// Pitcher tables by position: away first, then home.
    pub fn pitcher_tables(&self) -> Result<Vec<usize>, ExtractError> {
        if self.pitcher.len() < 2 {
            return Err(ExtractError::UnclassifiedTable("pitcher"));
        }
        if self.pitcher.len() != 2 {
            warn!(
                pitcher = self.pitcher.len(),
                "unexpected number of pitcher tables, using the first two by position"
            );
        }
        Ok(self.pitcher.iter().copied().take(2).collect())
    }
}

/// Header captions of a table (`thead th`), trimmed.
pub fn table_headers(table: ElementRef<'_>) -> Vec<String> {
    select_within(table, "thead th")
        .into_iter()
        .map(text_of)
        .collect()
}

/// Rows of a table's body.
pub fn body_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    select_within(table, "tbody tr")
}

// =============================================================================
// Standings
// =============================================================================

/// The first standings-table body any of the known selectors finds.
pub fn locate_ranking_body(doc: &Document) -> Option<(ElementRef<'_>, &'static str)> {
    RANKING_BODY_SELECTORS.iter().find_map(|sel| {
        doc.select_first(sel).map(|body| {
            debug!(selector = sel, "standings table located");
            (body, *sel)
        })
    })
}

/// Why a standings row is not a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingRowKind {
    Team,
    TooFewCells,
    Aggregate,
}

/// `cells` are the trimmed texts of a standings row's `td`s.
pub fn classify_ranking_row(cells: &[String]) -> RankingRowKind {
    if cells.len() < MIN_RANKING_CELLS {
        return RankingRowKind::TooFewCells;
    }
    let team = cells[1].trim();
    if team.is_empty() || markers::is_aggregate_row_label(team) {
        return RankingRowKind::Aggregate;
    }
    RankingRowKind::Team
}
