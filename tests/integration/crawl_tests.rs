//! Integration tests for full harvest runs
//!
//! These tests use wiremock to serve the publication sitemap and a scripted
//! in-process browser to render posts, and run the coordinator end-to-end
//! against temporary output directories.

use async_trait::async_trait;
use press_harvest::auth::Authenticator;
use press_harvest::config::{Config, HarvestConfig, OutputConfig, SessionConfig};
use press_harvest::crawler::{Coordinator, PostExtractor};
use press_harvest::output::PostRecord;
use press_harvest::session::{BrowserDriver, BrowserLauncher, Locator, SessionPool};
use press_harvest::state::{DateKey, ScrapeState};
use press_harvest::storage::{JsonStateStore, StateStore};
use press_harvest::{publication_name, SessionError, SessionResult};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GATE_HTML: &str = r#"<html><body><article>
  <h1 class="post-title">Members only</h1>
  <div class="paywall"><h2 class="paywall-title">This post is for paid subscribers</h2></div>
</article></body></html>"#;

fn post_html(title: &str, datetime: &str) -> String {
    format!(
        r#"<html><body><article>
  <h1 class="post-title">{title}</h1>
  <div class="post-header"><time datetime="{datetime}">ignored</time></div>
  <a class="post-ufi-button"><span class="label">3</span></a>
  <div class="available-content"><div class="body markup"><p>Body of {title}</p></div></div>
</article></body></html>"#
    )
}

#[derive(Default)]
struct BrowserState {
    pages: HashMap<String, String>,
    drop_on: HashMap<String, u32>,
    alive: HashSet<u64>,
    next_id: u64,
    navigations: Vec<String>,
    active: usize,
    max_active: usize,
}

/// Scripted browser shared by every session launched from it
#[derive(Clone, Default)]
struct ScriptedBrowser {
    inner: Arc<Mutex<BrowserState>>,
}

impl ScriptedBrowser {
    fn state(&self) -> MutexGuard<'_, BrowserState> {
        self.inner.lock().unwrap()
    }

    fn post(self, url: &str, title: &str, datetime: &str) -> Self {
        self.state().pages.insert(url.to_string(), post_html(title, datetime));
        self
    }

    fn gated(self, url: &str) -> Self {
        self.state().pages.insert(url.to_string(), GATE_HTML.to_string());
        self
    }

    /// Navigation to `url` kills the browser the first `times` times
    fn drop_on(self, url: &str, times: u32) -> Self {
        self.state().drop_on.insert(url.to_string(), times);
        self
    }

    fn navigations_to(&self, url: &str) -> usize {
        self.state().navigations.iter().filter(|u| *u == url).count()
    }

    fn max_active(&self) -> usize {
        self.state().max_active
    }
}

#[async_trait]
impl BrowserLauncher for ScriptedBrowser {
    async fn launch(&self) -> SessionResult<Box<dyn BrowserDriver>> {
        let mut state = self.state();
        state.next_id += 1;
        let id = state.next_id;
        state.alive.insert(id);
        Ok(Box::new(ScriptedPage {
            browser: self.clone(),
            id,
            url: "about:blank".to_string(),
        }))
    }
}

struct ScriptedPage {
    browser: ScriptedBrowser,
    id: u64,
    url: String,
}

impl ScriptedPage {
    fn check_alive(&self) -> SessionResult<()> {
        if self.browser.state().alive.contains(&self.id) {
            Ok(())
        } else {
            Err(SessionError::Disconnected("browser gone".to_string()))
        }
    }
}

#[async_trait]
impl BrowserDriver for ScriptedPage {
    async fn navigate(&mut self, url: &str) -> SessionResult<()> {
        self.check_alive()?;
        {
            let mut state = self.browser.state();
            state.navigations.push(url.to_string());
            state.active += 1;
            state.max_active = state.max_active.max(state.active);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;

        let mut guard = self.browser.state();
        let state = &mut *guard;
        state.active -= 1;
        if let Some(remaining) = state.drop_on.get_mut(url) {
            if *remaining > 0 {
                *remaining -= 1;
                state.alive.remove(&self.id);
                return Err(SessionError::Disconnected(format!("dropped on {url}")));
            }
        }
        self.url = url.to_string();
        Ok(())
    }

    async fn current_url(&mut self) -> SessionResult<String> {
        self.check_alive()?;
        Ok(self.url.clone())
    }

    async fn content(&mut self) -> SessionResult<String> {
        self.check_alive()?;
        Ok(self
            .browser
            .state()
            .pages
            .get(&self.url)
            .cloned()
            .unwrap_or_else(|| "<html><body><h1>Not found</h1></body></html>".to_string()))
    }

    async fn click(&mut self, _locator: &Locator) -> SessionResult<bool> {
        self.check_alive()?;
        Ok(false)
    }

    async fn fill(&mut self, _locator: &Locator, _value: &str) -> SessionResult<bool> {
        self.check_alive()?;
        Ok(false)
    }

    async fn press_enter(&mut self, _locator: &Locator) -> SessionResult<bool> {
        self.check_alive()?;
        Ok(false)
    }

    async fn close(self: Box<Self>) {
        self.browser.state().alive.remove(&self.id);
    }
}

/// A publication served by wiremock plus its output directories
struct TestPublication {
    server: MockServer,
    out: TempDir,
}

impl TestPublication {
    async fn start(slugs: &[&str]) -> Self {
        let server = MockServer::start().await;
        let entries: String = slugs
            .iter()
            .map(|slug| format!("<url><loc>{}/p/{}</loc></url>", server.uri(), slug))
            .collect();
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</urlset>"#,
                entries
            )))
            .mount(&server)
            .await;

        Self {
            server,
            out: TempDir::new().unwrap(),
        }
    }

    fn url(&self, slug: &str) -> String {
        format!("{}/p/{}", self.server.uri(), slug)
    }

    fn name(&self) -> String {
        publication_name(&self.server.uri()).unwrap()
    }

    fn markdown_dir(&self) -> PathBuf {
        self.out.path().join("md").join(self.name())
    }

    fn results_path(&self) -> PathBuf {
        self.out.path().join("data").join(format!("{}.json", self.name()))
    }

    fn config(&self, continuous: bool) -> Config {
        Config {
            publications: vec![self.server.uri()],
            harvest: HarvestConfig {
                max_concurrent: 2,
                delay_min: 0.0,
                delay_max: 0.0,
                continuous,
                ..Default::default()
            },
            session: SessionConfig {
                pool_size: 2,
                operation_timeout_secs: 5,
                settle_delay_ms: 0,
                max_reconnect_attempts: 1,
                ..Default::default()
            },
            output: OutputConfig {
                markdown_dir: self.out.path().join("md").to_string_lossy().to_string(),
                html_dir: self.out.path().join("html").to_string_lossy().to_string(),
                data_dir: self.out.path().join("data").to_string_lossy().to_string(),
            },
            ..Default::default()
        }
    }

    fn coordinator(&self, browser: &ScriptedBrowser, continuous: bool) -> Coordinator {
        let config = self.config(continuous);
        let authenticator = Arc::new(Authenticator::new(
            None,
            "https://sign-in.test/",
            Duration::ZERO,
            Duration::from_secs(1),
        ));
        let pool = SessionPool::from_config(&config.session, Arc::new(browser.clone()), authenticator);
        Coordinator::new(config, pool, Arc::new(PostExtractor)).unwrap()
    }

    fn markdown_files(&self) -> Vec<String> {
        let mut names: Vec<String> = match fs::read_dir(self.markdown_dir()) {
            Ok(entries) => entries
                .flatten()
                .map(|e| e.file_name().to_string_lossy().to_string())
                .filter(|name| name.ends_with(".md"))
                .collect(),
            Err(_) => Vec::new(),
        };
        names.sort();
        names
    }

    fn state(&self) -> ScrapeState {
        JsonStateStore::in_dir(&self.markdown_dir()).load()
    }
}

fn read_results(path: &Path) -> Vec<PostRecord> {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_full_run_skips_slugs_already_on_disk() {
    let publication = TestPublication::start(&["alpha", "beta", "gamma"]).await;
    let browser = ScriptedBrowser::default()
        .post(&publication.url("alpha"), "Alpha", "2024-01-01T00:00:00Z")
        .post(&publication.url("beta"), "Beta", "2024-01-02T00:00:00Z")
        .post(&publication.url("gamma"), "Gamma", "2024-01-03T00:00:00Z");
    fs::create_dir_all(publication.markdown_dir()).unwrap();
    fs::write(publication.markdown_dir().join("20240102-beta.md"), "kept").unwrap();

    let coordinator = publication.coordinator(&browser, false);
    let summary = coordinator
        .run_publication(&publication.server.uri())
        .await
        .unwrap();

    assert_eq!(summary.candidates, 3);
    assert_eq!(summary.queued, 2);
    assert_eq!(summary.accepted, 2);
    assert_eq!(browser.navigations_to(&publication.url("beta")), 0);
    assert_eq!(
        publication.markdown_files(),
        vec!["20240101-alpha.md", "20240102-beta.md", "20240103-gamma.md"]
    );
    assert_eq!(
        fs::read_to_string(publication.markdown_dir().join("20240102-beta.md")).unwrap(),
        "kept"
    );
    assert!(!summary.state_committed);
    assert_eq!(read_results(&publication.results_path()).len(), 2);
}

#[tokio::test]
async fn test_continuous_run_drops_posts_older_than_watermark() {
    let publication = TestPublication::start(&["old-news", "fresh"]).await;
    let browser = ScriptedBrowser::default()
        .post(&publication.url("old-news"), "Old", "2023-12-15T00:00:00Z")
        .post(&publication.url("fresh"), "Fresh", "2024-02-01T00:00:00Z");

    let mut seeded = ScrapeState::new();
    seeded.record("https://elsewhere.test/p/seed", &DateKey::parse("20240101").unwrap());
    JsonStateStore::in_dir(&publication.markdown_dir())
        .commit(&seeded)
        .unwrap();

    let coordinator = publication.coordinator(&browser, true);
    let summary = coordinator
        .run_publication(&publication.server.uri())
        .await
        .unwrap();

    assert_eq!(browser.navigations_to(&publication.url("old-news")), 1);
    assert_eq!(summary.stale, 1);
    assert_eq!(summary.accepted, 1);
    assert!(summary.state_committed);
    assert_eq!(publication.markdown_files(), vec!["20240201-fresh.md"]);

    let state = publication.state();
    assert!(!state.processed_slugs.contains("old-news"));
    assert!(state.processed_slugs.contains("fresh"));
    assert_eq!(state.latest_processed_date, DateKey::parse("20240201"));
}

#[tokio::test]
async fn test_gated_post_without_credentials_is_skipped() {
    let publication = TestPublication::start(&["open", "members"]).await;
    let browser = ScriptedBrowser::default()
        .post(&publication.url("open"), "Open", "2024-01-01T00:00:00Z")
        .gated(&publication.url("members"));

    let coordinator = publication.coordinator(&browser, false);
    let summary = coordinator
        .run_publication(&publication.server.uri())
        .await
        .unwrap();

    assert_eq!(summary.skipped_paywalled, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.accepted, 1);
    assert_eq!(publication.markdown_files(), vec!["20240101-open.md"]);
}

#[tokio::test]
async fn test_permanent_disconnect_fails_only_that_item() {
    let publication = TestPublication::start(&["e", "f", "g"]).await;
    let browser = ScriptedBrowser::default()
        .post(&publication.url("e"), "E", "2024-01-05T00:00:00Z")
        .post(&publication.url("f"), "F", "2024-01-06T00:00:00Z")
        .post(&publication.url("g"), "G", "2024-01-07T00:00:00Z")
        .drop_on(&publication.url("e"), 2);

    let coordinator = publication.coordinator(&browser, false);
    let summary = coordinator
        .run_publication(&publication.server.uri())
        .await
        .unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failures[0].0, publication.url("e"));
    assert_eq!(summary.failures[0].1, "browser session lost");
    assert_eq!(browser.navigations_to(&publication.url("e")), 2);
    assert_eq!(summary.accepted, 2);
    assert_eq!(
        publication.markdown_files(),
        vec!["20240106-f.md", "20240107-g.md"]
    );
}

#[tokio::test]
async fn test_second_continuous_run_is_idempotent() {
    let publication = TestPublication::start(&["one", "two"]).await;
    let browser = ScriptedBrowser::default()
        .post(&publication.url("one"), "One", "2024-03-01T00:00:00Z")
        .post(&publication.url("two"), "Two", "2024-03-02T00:00:00Z");
    let coordinator = publication.coordinator(&browser, true);

    let first = coordinator
        .run_publication(&publication.server.uri())
        .await
        .unwrap();
    let state_after_first = publication.state();
    let files_after_first = publication.markdown_files();

    let second = coordinator
        .run_publication(&publication.server.uri())
        .await
        .unwrap();
    let state_after_second = publication.state();

    assert_eq!(first.accepted, 2);
    assert_eq!(second.queued, 0);
    assert_eq!(second.accepted, 0);
    assert_eq!(publication.markdown_files(), files_after_first);
    assert_eq!(
        state_after_first.processed_slugs,
        state_after_second.processed_slugs
    );
    assert!(state_after_second.latest_processed_date >= state_after_first.latest_processed_date);
    assert_eq!(read_results(&publication.results_path()).len(), 2);
}

#[tokio::test]
async fn test_watermark_never_moves_backwards() {
    let publication = TestPublication::start(&["later", "earlier"]).await;
    let browser = ScriptedBrowser::default()
        .post(&publication.url("later"), "Later", "2024-05-10T00:00:00Z")
        .post(&publication.url("earlier"), "Earlier", "2024-04-01T00:00:00Z");

    let mut seeded = ScrapeState::new();
    seeded.record(&publication.url("earlier"), &DateKey::parse("20240401").unwrap());
    seeded.record("https://elsewhere.test/p/newest", &DateKey::parse("20240601").unwrap());
    JsonStateStore::in_dir(&publication.markdown_dir())
        .commit(&seeded)
        .unwrap();

    let coordinator = publication.coordinator(&browser, true);
    let summary = coordinator
        .run_publication(&publication.server.uri())
        .await
        .unwrap();

    assert_eq!(summary.queued, 1);
    assert_eq!(summary.stale, 1);
    assert_eq!(
        publication.state().latest_processed_date,
        DateKey::parse("20240601")
    );
}

#[tokio::test]
async fn test_concurrency_bound_holds() {
    let slugs = ["p1", "p2", "p3", "p4", "p5", "p6"];
    let publication = TestPublication::start(&slugs).await;
    let mut browser = ScriptedBrowser::default();
    for (i, slug) in slugs.iter().enumerate() {
        browser = browser.post(
            &publication.url(slug),
            slug,
            &format!("2024-01-0{}T00:00:00Z", i + 1),
        );
    }

    let coordinator = publication.coordinator(&browser, false);
    let summary = coordinator
        .run_publication(&publication.server.uri())
        .await
        .unwrap();

    assert_eq!(summary.accepted, 6);
    assert!(browser.max_active() <= 2);
}
