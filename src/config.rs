// =============================================================================
// config.rs — WHERE THE PAGES LIVE AND HOW POLITELY WE ASK FOR THEM
// =============================================================================
//
// One flat struct, read once at startup. Every field has a default that
// points at the public league site and a storage backend on localhost, so a
// bare `cargo run -- schedule` does something sensible on a dev box.
//
// All values can be overridden with KBO_CRAWL_* environment variables (or a
// .env file). A malformed number falls back to the default instead of
// refusing to start; the crawl is more useful than the complaint.
// =============================================================================

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How schedule and box-score pages are obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Through the headless-browser rendering service. The schedule tables
    /// are filled in client-side, so this is the default.
    Rendered,
    /// Plain GET plus an HTML parser. Enough for the standings page and for
    /// mirrors that serve pre-rendered markup.
    Static,
}

impl FromStr for RenderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rendered" | "browser" => Ok(RenderMode::Rendered),
            "static" | "http" => Ok(RenderMode::Static),
            other => Err(format!("unknown render mode `{other}`")),
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderMode::Rendered => write!(f, "rendered"),
            RenderMode::Static => write!(f, "static"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // SOURCE SITE
    // =========================================================================

    /// Scheme + host of the league site. Relative hrefs are resolved against it.
    pub site_origin: String,

    /// Schedule/result page. Queried with `?date=YYYY-MM-DD`.
    pub schedule_path: String,

    /// Daily standings page. Queried with `?date=YYYY.MM.DD`, or bare for today.
    pub ranking_path: String,

    /// The JSON schedule web service (form POST).
    pub schedule_api_path: String,

    // =========================================================================
    // COLLABORATORS
    // =========================================================================

    /// The storage service that receives every batch.
    pub backend_url: String,

    /// Browserless-compatible rendering service.
    pub browserless_url: String,

    pub browserless_token: Option<String>,

    pub render_mode: RenderMode,

    // =========================================================================
    // TIMING
    // =========================================================================

    /// How long a page gets to produce its root selector. Default: 15s.
    pub wait_timeout: Duration,

    /// Request timeout for static page fetches. Default: 10s.
    pub http_timeout: Duration,

    /// Request timeout for backend calls. Default: 30s.
    pub sink_timeout: Duration,

    /// Pause between consecutive pages of a multi-day crawl. Default: 1s.
    pub politeness_delay: Duration,

    pub user_agent: String,

    /// JSON log lines instead of the human formatter.
    pub log_json: bool,
}

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

impl Config {
    /// Load configuration from the process environment, after merging in a
    /// `.env` file if one exists.
    pub fn from_env() -> Self {
        // Missing .env is the normal case in production.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key -> value source. `from_env` is this with
    /// the process environment; tests hand it a map.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_or_default = |key: &str, default: &str| -> String {
            lookup(key).unwrap_or_else(|| default.to_string())
        };
        let secs = |key: &str, default: u64| -> Duration {
            Duration::from_secs(env_or_default(key, &default.to_string()).parse().unwrap_or(default))
        };

        Config {
            site_origin: env_or_default("KBO_CRAWL_SITE_ORIGIN", "https://www.koreabaseball.com")
                .trim_end_matches('/')
                .to_string(),
            schedule_path: env_or_default("KBO_CRAWL_SCHEDULE_PATH", "/Schedule/Schedule.aspx"),
            ranking_path: env_or_default(
                "KBO_CRAWL_RANKING_PATH",
                "/Record/TeamRank/TeamRankDaily.aspx",
            ),
            schedule_api_path: env_or_default(
                "KBO_CRAWL_SCHEDULE_API_PATH",
                "/ws/Schedule.asmx/GetScheduleList",
            ),

            backend_url: env_or_default("KBO_CRAWL_BACKEND_URL", "http://127.0.0.1:8080")
                .trim_end_matches('/')
                .to_string(),
            browserless_url: env_or_default("KBO_CRAWL_BROWSERLESS_URL", "http://127.0.0.1:3000")
                .trim_end_matches('/')
                .to_string(),
            browserless_token: lookup("KBO_CRAWL_BROWSERLESS_TOKEN").filter(|t| !t.is_empty()),
            render_mode: env_or_default("KBO_CRAWL_RENDER_MODE", "rendered")
                .parse()
                .unwrap_or(RenderMode::Rendered),

            wait_timeout: secs("KBO_CRAWL_WAIT_TIMEOUT_SECS", 15),
            http_timeout: secs("KBO_CRAWL_HTTP_TIMEOUT_SECS", 10),
            sink_timeout: secs("KBO_CRAWL_SINK_TIMEOUT_SECS", 30),
            politeness_delay: Duration::from_millis(
                env_or_default("KBO_CRAWL_DELAY_MILLIS", "1000")
                    .parse()
                    .unwrap_or(1000),
            ),
            user_agent: env_or_default("KBO_CRAWL_USER_AGENT", DEFAULT_USER_AGENT),
            log_json: env_or_default("KBO_CRAWL_LOG_JSON", "false")
                .parse()
                .unwrap_or(false),
        }
    }

    /// Schedule/result page for one day (`iso_date` is `YYYY-MM-DD`).
    pub fn schedule_url(&self, iso_date: &str) -> String {
        format!("{}{}?date={}", self.site_origin, self.schedule_path, iso_date)
    }

    /// Standings page. `dotted_date` is `YYYY.MM.DD`; `None` means "as of today".
    pub fn ranking_url(&self, dotted_date: Option<&str>) -> String {
        match dotted_date {
            Some(date) => format!("{}{}?date={}", self.site_origin, self.ranking_path, date),
            None => format!("{}{}", self.site_origin, self.ranking_path),
        }
    }

    pub fn schedule_api_url(&self) -> String {
        format!("{}{}", self.site_origin, self.schedule_api_path)
    }

    /// Resolve an href from the league's pages against the site origin.
    /// Anything already starting with "http" is returned as-is.
    pub fn absolutize(&self, href: &str) -> String {
        if href.starts_with("http") {
            href.to_string()
        } else if href.starts_with('/') {
            format!("{}{}", self.site_origin, href)
        } else {
            format!("{}/{}", self.site_origin, href)
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
