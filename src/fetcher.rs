// =============================================================================
// fetcher.rs — GETTING THE MARKUP, ONE WAY OR ANOTHER
// =============================================================================
//
// The league's schedule and box-score tables are assembled by JavaScript
// after the page loads, so a plain GET returns an empty shell. The standings
// page is server-rendered. The schedule web service speaks JSON.
//
// Everything above this module only cares that it can ask for a URL, name
// the selector that proves the page is ready, and get markup back. Two
// backends satisfy that:
//
// - StaticFetcher:  reqwest GET, then check the selector in the parsed body.
// - BrowserSession: hand the URL to a Browserless-style rendering service,
//                   which waits for the selector and returns the final DOM.
//
// Fetchers return the HTML as a String and callers parse it into a
// `Document` on their side of the await. scraper's tree is not Send, and a
// crawl future that holds one across a sleep would not be either.
//
// There is no retry in here. A failure is a FetchError and the driver
// decides what zero records for that day means.
// =============================================================================

use async_trait::async_trait;
use parking_lot::Mutex;
use portable_atomic::{AtomicBool, Ordering};
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::config::Config;
use crate::error::FetchError;

/// Anything that can turn a URL into ready markup.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url` and return its HTML once `wait_for` (a CSS selector) is
    /// present. An empty `wait_for` skips the readiness check.
    async fn fetch(&self, url: &str, wait_for: &str) -> Result<String, FetchError>;
}

/// Form-POST endpoints that answer with a JSON (or JSON-ish) body.
#[async_trait]
pub trait FormSource: Send + Sync {
    async fn post_form(&self, url: &str, form: &[(&str, String)]) -> Result<String, FetchError>;
}

// =============================================================================
// Document handle
// =============================================================================

/// A parsed page. Thin wrapper over scraper's tree that hides selector
/// parsing and text normalization from the classifiers.
pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
        }
    }

    /// True if at least one element matches `css`.
    pub fn has(&self, css: &str) -> bool {
        match parse_selector(css) {
            Some(sel) => self.html.select(&sel).next().is_some(),
            None => false,
        }
    }

    /// Every element matching `css`, in document order.
    pub fn select_all(&self, css: &str) -> Vec<ElementRef<'_>> {
        match parse_selector(css) {
            Some(sel) => self.html.select(&sel).collect(),
            None => Vec::new(),
        }
    }

    /// The first element matching `css`.
    pub fn select_first(&self, css: &str) -> Option<ElementRef<'_>> {
        let sel = parse_selector(css)?;
        self.html.select(&sel).next()
    }
}

/// Descendants of `el` matching `css`.
pub fn select_within<'a>(el: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match parse_selector(css) {
        Some(sel) => el.select(&sel).collect(),
        None => Vec::new(),
    }
}

/// Visible text of an element: text nodes joined, whitespace runs collapsed
/// to one space, trimmed. Roughly what a browser reports as innerText for
/// the simple cells we read.
pub fn text_of(el: ElementRef<'_>) -> String {
    let joined: String = el.text().collect();
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// An attribute value, if present.
pub fn attr_of(el: ElementRef<'_>, name: &str) -> Option<String> {
    el.value().attr(name).map(str::to_string)
}

fn parse_selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(sel) => Some(sel),
        Err(e) => {
            warn!(selector = css, error = %e, "invalid CSS selector");
            None
        }
    }
}

/// Readiness check shared by both backends.
fn ensure_root(url: &str, html: &str, wait_for: &str) -> Result<(), FetchError> {
    if wait_for.is_empty() || Document::parse(html).has(wait_for) {
        Ok(())
    } else {
        Err(FetchError::MissingRoot {
            url: url.to_string(),
            selector: wait_for.to_string(),
        })
    }
}

// =============================================================================
// Static backend
// =============================================================================

/// Plain HTTP. Used for the standings page, the JSON schedule service, and
/// every page when rendering is switched off.
pub struct StaticFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl StaticFetcher {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| FetchError::Session(format!("could not build HTTP client: {e}")))?;
        Ok(Self {
            client,
            timeout: config.http_timeout,
        })
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(&self, url: &str, wait_for: &str) -> Result<String, FetchError> {
        let secs = self.timeout.as_secs();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| FetchError::from_reqwest(url, e, secs))?;
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e, secs))?;

        ensure_root(url, &body, wait_for)?;
        debug!(url, bytes = body.len(), "static page fetched");
        Ok(body)
    }
}

#[async_trait]
impl FormSource for StaticFetcher {
    async fn post_form(&self, url: &str, form: &[(&str, String)]) -> Result<String, FetchError> {
        let secs = self.timeout.as_secs();
        let response = self
            .client
            .post(url)
            .form(form)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| FetchError::from_reqwest(url, e, secs))?;
        response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e, secs))
    }
}

// =============================================================================
// Rendered backend
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ContentRequest<'a> {
    url: &'a str,
    wait_for_selector: WaitForSelector<'a>,
}

#[derive(Serialize)]
struct WaitForSelector<'a> {
    selector: &'a str,
    timeout: u64,
}

/// One exclusive handle on the rendering service.
///
/// Acquire one per driver run and close it when the run is over. `Drop`
/// releases it too, so an early return or a panic cannot leak it, but the
/// explicit `close()` is what the pipeline calls. Once closed, every fetch
/// fails with `FetchError::Session`.
pub struct BrowserSession {
    id: Uuid,
    client: Mutex<Option<reqwest::Client>>,
    content_url: String,
    wait_timeout: Duration,
    open: AtomicBool,
}

/// The rendering service's `/content` endpoint, with the token query-escaped.
fn content_endpoint(service_url: &str, token: Option<&str>) -> Result<String, FetchError> {
    let mut url = Url::parse(&format!("{}/content", service_url.trim_end_matches('/')))
        .map_err(|e| FetchError::Session(format!("bad rendering service URL {service_url}: {e}")))?;
    if let Some(token) = token {
        url.query_pairs_mut().append_pair("token", token);
    }
    Ok(url.into())
}

impl BrowserSession {
    pub fn acquire(config: &Config) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            // The service itself waits up to wait_timeout; leave it room to answer.
            .timeout(config.wait_timeout + config.http_timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| FetchError::Session(format!("could not build HTTP client: {e}")))?;

        let content_url = content_endpoint(&config.browserless_url, config.browserless_token.as_deref())?;

        let id = Uuid::new_v4();
        info!(session = %id, service = %config.browserless_url, "browser session acquired");

        Ok(Self {
            id,
            client: Mutex::new(Some(client)),
            content_url,
            wait_timeout: config.wait_timeout,
            open: AtomicBool::new(true),
        })
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Release the session. Idempotent.
    pub fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            self.client.lock().take();
            info!(session = %self.id, "browser session released");
        }
    }

    fn client(&self) -> Result<reqwest::Client, FetchError> {
        if !self.is_open() {
            return Err(FetchError::Session(format!("session {} is closed", self.id)));
        }
        self.client
            .lock()
            .clone()
            .ok_or_else(|| FetchError::Session(format!("session {} is closed", self.id)))
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if self.is_open() {
            debug!(session = %self.id, "browser session dropped while open");
            self.close();
        }
    }
}

#[async_trait]
impl PageFetcher for BrowserSession {
    async fn fetch(&self, url: &str, wait_for: &str) -> Result<String, FetchError> {
        let client = self.client()?;
        let secs = self.wait_timeout.as_secs();
        let request = ContentRequest {
            url,
            wait_for_selector: WaitForSelector {
                selector: if wait_for.is_empty() { "body" } else { wait_for },
                timeout: self.wait_timeout.as_millis() as u64,
            },
        };

        let response = client
            .post(&self.content_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e, secs))?;

        let status = response.status();
        // The service reports a selector that never appeared as 408 or 5xx.
        if status.as_u16() == 408 || status.is_server_error() {
            return Err(FetchError::Timeout {
                url: url.to_string(),
                secs,
            });
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e, secs))?;
        ensure_root(url, &body, wait_for)?;
        debug!(session = %self.id, url, bytes = body.len(), "rendered page fetched");
        Ok(body)
    }
}

// =============================================================================
// In-memory fixtures for driver tests
// =============================================================================

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::{HashMap, HashSet};

    /// Serves canned markup keyed by exact URL. Unknown URLs are a 404;
    /// URLs registered with `failing` are a network error.
    #[derive(Default)]
    pub struct FixtureFetcher {
        pages: HashMap<String, String>,
        failing: HashSet<String>,
        requested: Mutex<Vec<String>>,
    }

    impl FixtureFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
            self.pages.insert(url.into(), html.into());
            self
        }

        pub fn failing(mut self, url: impl Into<String>) -> Self {
            self.failing.insert(url.into());
            self
        }

        pub fn requested(&self) -> Vec<String> {
            self.requested.lock().clone()
        }

        fn serve(&self, url: &str) -> Result<String, FetchError> {
            self.requested.lock().push(url.to_string());
            if self.failing.contains(url) {
                return Err(FetchError::Network {
                    url: url.to_string(),
                    message: "connection reset by fixture".into(),
                });
            }
            self.pages.get(url).cloned().ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
        }
    }

    #[async_trait]
    impl PageFetcher for FixtureFetcher {
        async fn fetch(&self, url: &str, wait_for: &str) -> Result<String, FetchError> {
            let body = self.serve(url)?;
            ensure_root(url, &body, wait_for)?;
            Ok(body)
        }
    }

    #[async_trait]
    impl FormSource for FixtureFetcher {
        async fn post_form(&self, url: &str, _form: &[(&str, String)]) -> Result<String, FetchError> {
            self.serve(url)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FixtureFetcher;
    use super::*;

    const PAGE: &str = r#"<html><body>
        <table class="tbl"><tbody>
          <tr><td>  06.01(일) </td><td><a href="/x?gameId=1">리뷰</a></td></tr>
        </tbody></table>
    </body></html>"#;

    #[test]
    fn test_document_selects_and_reads_text() {
        let doc = Document::parse(PAGE);
        assert!(doc.has("table.tbl"));
        assert!(!doc.has("table.tData"));

        let rows = doc.select_all("table.tbl tbody tr");
        assert_eq!(rows.len(), 1);
        let cells = select_within(rows[0], "td");
        assert_eq!(text_of(cells[0]), "06.01(일)");

        let link = select_within(cells[1], "a")[0];
        assert_eq!(attr_of(link, "href").as_deref(), Some("/x?gameId=1"));
        assert_eq!(attr_of(link, "title"), None);
    }

    #[test]
    fn test_content_endpoint_escapes_token() {
        assert_eq!(
            content_endpoint("http://127.0.0.1:3000/", Some("a&b=c d")).unwrap(),
            "http://127.0.0.1:3000/content?token=a%26b%3Dc+d"
        );
        assert_eq!(
            content_endpoint("http://127.0.0.1:3000", None).unwrap(),
            "http://127.0.0.1:3000/content"
        );
        assert!(content_endpoint("not a url", None).is_err());
    }

    #[test]
    fn test_invalid_selector_matches_nothing() {
        let doc = Document::parse(PAGE);
        assert!(doc.select_all("table[").is_empty());
        assert!(!doc.has("table["));
    }

    #[test]
    fn test_text_collapses_whitespace_between_nodes() {
        let doc = Document::parse("<table><tr><td><span>LG</span>\n  <em>2</em> vs <em>5</em><span>두산</span></td></tr></table>");
        let cell = doc.select_first("td").unwrap();
        assert_eq!(text_of(cell), "LG 2 vs 5두산");
    }

    #[tokio::test]
    async fn test_fixture_fetcher_enforces_root_selector() {
        let fetcher = FixtureFetcher::new()
            .with_page("https://site.test/a", PAGE)
            .failing("https://site.test/b");

        assert!(fetcher.fetch("https://site.test/a", "table.tbl").await.is_ok());
        assert!(matches!(
            fetcher.fetch("https://site.test/a", "table.tData").await,
            Err(FetchError::MissingRoot { .. })
        ));
        assert!(matches!(
            fetcher.fetch("https://site.test/b", "").await,
            Err(FetchError::Network { .. })
        ));
        assert!(matches!(
            fetcher.fetch("https://site.test/c", "").await,
            Err(FetchError::Status { status: 404, .. })
        ));
        assert_eq!(fetcher.requested().len(), 4);
    }

    #[tokio::test]
    async fn test_closed_session_refuses_to_fetch() {
        let session = BrowserSession::acquire(&Config::default()).unwrap();
        assert!(session.is_open());
        session.close();
        session.close();
        assert!(!session.is_open());
        assert!(matches!(
            session.fetch("https://site.test/a", "table.tbl").await,
            Err(FetchError::Session(_))
        ));
    }
}
