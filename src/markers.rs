// =============================================================================
// markers.rs — THE LITTLE WORDS THAT TELL US WHERE WE ARE
// =============================================================================
//
// The league's markup has no ids worth trusting, so we navigate by text.
// A review link announces itself with "gameId=" or "section=REVIEW" in its
// href, or with "게임센터" on its face. A stats table announces itself with
// "선수명" or "이닝" in its header row. A standings footer calls itself "합계".
//
// Every one of those checks is a handful of patterns against a short string,
// so each family gets one Aho-Corasick automaton, built once on first use.
// =============================================================================

use aho_corasick::{AhoCorasick, MatchKind};
use std::sync::LazyLock;

/// Substrings of an href that mark a per-game detail link.
const REVIEW_HREF_MARKERS: &[&str] = &["gameId=", "section=HIGHLIGHT", "section=REVIEW"];

/// Link captions that mark the same thing when the href is opaque.
const REVIEW_TEXT_LABELS: &[&str] = &["게임센터", "리뷰"];

/// Team-name cells that belong to a totals/footer row, not a team.
const AGGREGATE_ROW_LABELS: &[&str] = &["합계", "계", "Total"];

const HIGHLIGHT_SECTION: &str = "section=HIGHLIGHT";
const REVIEW_SECTION: &str = "section=REVIEW";

/// The header captions that identify box-score tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderLabel {
    /// "선수명": the lineup table's player-name column.
    PlayerName,
    /// "타수"
    AtBats,
    /// "안타"
    Hits,
    /// "이닝"
    Innings,
    /// "자책"
    EarnedRuns,
}

impl HeaderLabel {
    const ALL: [HeaderLabel; 5] = [
        HeaderLabel::PlayerName,
        HeaderLabel::AtBats,
        HeaderLabel::Hits,
        HeaderLabel::Innings,
        HeaderLabel::EarnedRuns,
    ];

    pub fn caption(self) -> &'static str {
        match self {
            HeaderLabel::PlayerName => "선수명",
            HeaderLabel::AtBats => "타수",
            HeaderLabel::Hits => "안타",
            HeaderLabel::Innings => "이닝",
            HeaderLabel::EarnedRuns => "자책",
        }
    }
}

static REVIEW_HREF_AUTOMATON: LazyLock<AhoCorasick> = LazyLock::new(|| {
    AhoCorasick::new(REVIEW_HREF_MARKERS).expect("review href markers are valid patterns")
});

static REVIEW_TEXT_AUTOMATON: LazyLock<AhoCorasick> = LazyLock::new(|| {
    AhoCorasick::new(REVIEW_TEXT_LABELS).expect("review link labels are valid patterns")
});

/// Leftmost-longest so "자책" never loses to a shorter overlapping caption.
static HEADER_AUTOMATON: LazyLock<AhoCorasick> = LazyLock::new(|| {
    AhoCorasick::builder()
        .match_kind(MatchKind::LeftmostLongest)
        .build(HeaderLabel::ALL.map(HeaderLabel::caption))
        .expect("header captions are valid patterns")
});

/// True if an href points at a game-center / review / highlight page.
pub fn is_review_href(href: &str) -> bool {
    REVIEW_HREF_AUTOMATON.is_match(href)
}

/// True if a link's visible text is one of the review captions.
pub fn is_review_caption(text: &str) -> bool {
    REVIEW_TEXT_AUTOMATON.is_match(text)
}

/// Highlight and review pages share a template; always ask for the review.
pub fn rewrite_highlight_to_review(href: &str) -> String {
    href.replace(HIGHLIGHT_SECTION, REVIEW_SECTION)
}

/// True if the href already selects a section of the game center.
pub fn has_section_param(href: &str) -> bool {
    memchr::memmem::find(href.as_bytes(), b"section=").is_some()
}

/// The caption a header cell carries, if it is one we care about.
///
/// Header cells must match exactly (after trimming); "타수비율" is not "타수".
pub fn classify_header(text: &str) -> Option<HeaderLabel> {
    let text = text.trim();
    let m = HEADER_AUTOMATON.find(text)?;
    if m.start() != 0 || m.end() != text.len() {
        return None;
    }
    Some(HeaderLabel::ALL[m.pattern().as_usize()])
}

/// Index of the first header cell carrying `label`.
pub fn header_index(headers: &[String], label: HeaderLabel) -> Option<usize> {
    headers.iter().position(|h| classify_header(h) == Some(label))
}

/// True if a standings team cell is really a totals or footer row.
pub fn is_aggregate_row_label(team_name: &str) -> bool {
    AGGREGATE_ROW_LABELS.contains(&team_name.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_href_markers() {
        assert!(is_review_href("/Schedule/GameCenter/Main.aspx?gameId=20250601KTWO0"));
        assert!(is_review_href("/x?section=HIGHLIGHT"));
        assert!(is_review_href("/x?section=REVIEW"));
        assert!(!is_review_href("/Schedule/Schedule.aspx?date=2025-06-01"));
    }

    #[test]
    fn test_review_caption() {
        assert!(is_review_caption("리뷰"));
        assert!(is_review_caption(" 게임센터 "));
        assert!(!is_review_caption("하이라이트"));
    }

    #[test]
    fn test_highlight_rewritten_to_review() {
        assert_eq!(
            rewrite_highlight_to_review("/Main.aspx?gameId=X&section=HIGHLIGHT"),
            "/Main.aspx?gameId=X&section=REVIEW"
        );
        assert_eq!(rewrite_highlight_to_review("/Main.aspx?gameId=X"), "/Main.aspx?gameId=X");
    }

    #[test]
    fn test_header_captions_match_exactly() {
        assert_eq!(classify_header("선수명"), Some(HeaderLabel::PlayerName));
        assert_eq!(classify_header(" 자책 "), Some(HeaderLabel::EarnedRuns));
        assert_eq!(classify_header("타수비율"), None);
        assert_eq!(classify_header("평균자책"), None);
        assert_eq!(classify_header(""), None);
    }

    #[test]
    fn test_header_index() {
        let headers: Vec<String> = ["선수명", "포지션", "타수", "안타"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(header_index(&headers, HeaderLabel::Hits), Some(3));
        assert_eq!(header_index(&headers, HeaderLabel::Innings), None);
    }

    #[test]
    fn test_aggregate_rows() {
        assert!(is_aggregate_row_label("합계"));
        assert!(is_aggregate_row_label("Total"));
        assert!(!is_aggregate_row_label("LG"));
    }

    #[test]
    fn test_section_param() {
        assert!(has_section_param("/Main.aspx?gameId=X&section=REVIEW"));
        assert!(!has_section_param("/Main.aspx?gameId=X"));
    }
}
