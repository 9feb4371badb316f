// =============================================================================
// error.rs — EVERYTHING THAT CAN GO WRONG BETWEEN A WEB PAGE AND A RECORD
// =============================================================================
//
// Four families of failure, and only one of them is allowed to be loud:
//
// - FetchError:   the page never arrived, or arrived without its tables.
// - FormatError:  a date or number is not shaped the way we need it.
// - ExtractError: a row or table is ambiguous ("no vs", "no header").
// - SinkError:    the storage backend said no.
//
// Drivers swallow the first three (logged, zero records for that unit of
// work). The sink reports the fourth as a plain `false` per batch.
// =============================================================================

use thiserror::Error;

/// A page could not be obtained, or came back without the expected markup.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error fetching {url}: {message}")]
    Network { url: String, message: String },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("timed out after {secs}s waiting for {url}")]
    Timeout { url: String, secs: u64 },

    /// The page loaded but the root selector never showed up.
    #[error("selector `{selector}` not present on {url}")]
    MissingRoot { url: String, selector: String },

    #[error("browser session error: {0}")]
    Session(String),
}

impl FetchError {
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else if let Some(status) = err.status() {
            FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            FetchError::Network {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}

/// A date or numeric string does not match the expected shape.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("invalid date `{input}` (expected {expected})")]
    Date { input: String, expected: &'static str },

    #[error("invalid number `{0}`")]
    Number(String),
}

/// Row-level ambiguity. Never escapes a driver; the row is skipped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("matchup `{0}` has no `vs` separator")]
    MissingSeparator(String),

    #[error("matchup `{0}` has no score on one side")]
    MissingScore(String),

    #[error("no table on the page matches `{0}`")]
    UnclassifiedTable(&'static str),

    #[error("row has {found} cells, needs at least {needed}")]
    ShortRow { found: usize, needed: usize },

    #[error("column `{0}` not found in table header")]
    MissingColumn(String),

    #[error("empty {0}")]
    EmptyField(&'static str),

    #[error(transparent)]
    Format(#[from] FormatError),
}

/// The storage backend rejected or never received a batch.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("network error talking to backend: {0}")]
    Network(String),

    #[error("backend answered HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for SinkError {
    fn from(err: reqwest::Error) -> Self {
        SinkError::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offender() {
        let err = FetchError::MissingRoot {
            url: "https://example.test/page".into(),
            selector: "table.tbl".into(),
        };
        assert_eq!(
            err.to_string(),
            "selector `table.tbl` not present on https://example.test/page"
        );

        let err = ExtractError::ShortRow { found: 4, needed: 6 };
        assert_eq!(err.to_string(), "row has 4 cells, needs at least 6");
    }
}
