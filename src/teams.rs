// =============================================================================
// teams.rs — LEAGUE CODES <-> DISPLAY NAMES
// =============================================================================
//
// The league's pages mix two vocabularies: schedule rows say "두산", game
// identifiers say "OB". Box-score tables only know their position, so the
// stats crawler gets codes and has to turn them back into names.
//
// Best-effort normalization, not a closed enum: franchises rename, codes
// outlive the teams they were minted for ("OB" is a brewery that sold the
// Bears in 1998), and anything we don't recognise passes through untouched.
// =============================================================================

use tracing::{debug, warn};

/// Display name -> the code used when synthesizing game identifiers.
const NAME_TO_CODE: &[(&str, &str)] = &[
    ("두산", "OB"),
    ("LG", "LG"),
    ("키움", "WO"),
    ("KT", "KT"),
    ("SSG", "SK"),
    ("롯데", "LT"),
    ("삼성", "SS"),
    ("한화", "HH"),
    ("KIA", "HT"),
    ("NC", "NC"),
];

/// League code -> display name. Historical and alternate codes included.
const CODE_TO_NAME: &[(&str, &str)] = &[
    ("OB", "두산"),
    ("DS", "두산"),
    ("LG", "LG"),
    ("WO", "키움"),
    ("WS", "키움"),
    ("NX", "키움"),
    ("KT", "KT"),
    ("SK", "SSG"),
    ("LT", "롯데"),
    ("LO", "롯데"),
    ("SS", "삼성"),
    ("SA", "삼성"),
    ("HH", "한화"),
    ("HW", "한화"),
    ("HT", "KIA"),
    ("KI", "KIA"),
    ("NC", "NC"),
];

/// The code used inside synthesized game ids for a display name.
///
/// Unknown names fall back to their first two characters, uppercased, so
/// the id is still deterministic for a team we have never heard of.
pub fn code_for_name(name: &str) -> String {
    let name = name.trim();
    NAME_TO_CODE
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, code)| code.to_string())
        .unwrap_or_else(|| {
            let fallback: String = name.chars().take(2).collect::<String>().to_uppercase();
            debug!(team = name, code = %fallback, "no code mapping for team, using prefix");
            fallback
        })
}

/// The display name for a league code. Unknown codes come back unchanged.
pub fn name_for_code(code: &str) -> String {
    let code = code.trim();
    match CODE_TO_NAME.iter().find(|(c, _)| *c == code) {
        Some((_, name)) => name.to_string(),
        None => {
            warn!(code = code, "unknown team code, passing through");
            code.to_string()
        }
    }
}
