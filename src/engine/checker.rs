//! Built-in link checker
//!
//! Breadth-first crawl over the scan target: every distinct link is checked
//! once, pages on the target's origin are crawled when `recurse` is set, and
//! in-flight requests are bounded by `concurrency`.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

use super::extract::{self, ContentKind};
use super::fetch::{self, RetryPolicy};
use super::local::LocalSite;
use super::skip::SkipRules;
use super::{CheckObserver, CheckResult, EngineError, LinkEngine, LinkOutcome, LinkState};
use crate::scan::CheckOptions;

const DEFAULT_CONCURRENCY: u32 = 100;
const DEFAULT_RETRY_ERRORS_COUNT: u32 = 5;
const DEFAULT_RETRY_ERRORS_JITTER_MS: u64 = 3000;
pub const DEFAULT_USER_AGENT: &str = concat!("linkscan-mcp/", env!("CARGO_PKG_VERSION"));

/// Link checker backed by `reqwest`, with local directories served from disk
#[derive(Debug, Clone, Default)]
pub struct HttpLinkChecker {
    user_agent: Option<String>,
}

impl HttpLinkChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// User agent used when a scan does not supply one
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    fn build_client(&self, options: &CheckOptions) -> Result<Client, EngineError> {
        let user_agent = options
            .user_agent
            .as_deref()
            .or(self.user_agent.as_deref())
            .unwrap_or(DEFAULT_USER_AGENT);

        let mut builder = Client::builder()
            .user_agent(user_agent)
            .danger_accept_invalid_certs(options.allow_insecure_certs.unwrap_or(false));
        if let Some(timeout) = options.timeout.filter(|ms| *ms > 0) {
            builder = builder.timeout(Duration::from_millis(timeout));
        }
        Ok(builder.build()?)
    }
}

impl LinkEngine for HttpLinkChecker {
    async fn check(
        &self,
        options: CheckOptions,
        observer: Arc<dyn CheckObserver>,
    ) -> Result<CheckResult, EngineError> {
        let crawl = Arc::new(Crawl::prepare(self.build_client(&options)?, &options).await?);
        log::info!("Checking links starting at {}", crawl.target);
        crawl.run(observer).await
    }
}

/// One link waiting to be checked
#[derive(Debug)]
struct Job {
    url: Url,
    parent: Option<String>,
}

#[derive(Debug)]
struct Checked {
    outcome: LinkOutcome,
    /// Page the links were found on and the links themselves
    discovered: Option<(Url, Vec<Url>)>,
}

/// Per-scan state shared by the link check tasks
struct Crawl {
    client: Client,
    local: Option<LocalSite>,
    target: Url,
    skip: SkipRules,
    retry: RetryPolicy,
    recurse: bool,
    check_css: bool,
    check_fragments: bool,
    markdown: bool,
    permits: Semaphore,
}

impl Crawl {
    async fn prepare(client: Client, options: &CheckOptions) -> Result<Self, EngineError> {
        let skip = SkipRules::compile(options.links_to_skip.as_deref().unwrap_or_default())?;

        let is_remote = options.path.starts_with("http://") || options.path.starts_with("https://");
        let (local, target) = if is_remote {
            let target = Url::parse(&options.path).map_err(|source| EngineError::InvalidTarget {
                url: options.path.clone(),
                source,
            })?;
            (None, target)
        } else {
            let (site, target) = LocalSite::open(
                &options.path,
                options.server_root.as_deref(),
                options.port,
                options.directory_listing.unwrap_or(false),
                options.clean_urls.unwrap_or(false),
            )
            .await?;
            (Some(site), target)
        };

        let concurrency = options.concurrency.unwrap_or(DEFAULT_CONCURRENCY).max(1);

        Ok(Self {
            client,
            local,
            target,
            skip,
            retry: RetryPolicy {
                rate_limited: options.retry.unwrap_or(false),
                errors: options.retry_errors.unwrap_or(false),
                error_attempts: options.retry_errors_count.unwrap_or(DEFAULT_RETRY_ERRORS_COUNT),
                jitter: Duration::from_millis(
                    options
                        .retry_errors_jitter
                        .unwrap_or(DEFAULT_RETRY_ERRORS_JITTER_MS),
                ),
            },
            recurse: options.recurse.unwrap_or(false),
            check_css: options.check_css.unwrap_or(false),
            check_fragments: options.check_fragments.unwrap_or(false),
            markdown: options.markdown.unwrap_or(false),
            permits: Semaphore::new(concurrency as usize),
        })
    }

    async fn run(self: Arc<Self>, observer: Arc<dyn CheckObserver>) -> Result<CheckResult, EngineError> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();
        let mut tasks = JoinSet::new();
        let mut links = Vec::new();

        let target = self.normalize(self.target.clone());
        seen.insert(target.to_string());
        queue.push_back(Job {
            url: target,
            parent: None,
        });

        loop {
            while let Some(job) = queue.pop_front() {
                let crawl = Arc::clone(&self);
                let observer = Arc::clone(&observer);
                tasks.spawn(async move { crawl.check_link(job, observer.as_ref()).await });
            }

            let Some(joined) = tasks.join_next().await else {
                break;
            };
            let checked = joined
                .map_err(|e| EngineError::Other(format!("link check task failed: {e}")))?;

            observer.on_link(&checked.outcome);
            links.push(checked.outcome);

            if let Some((page, found)) = checked.discovered {
                let parent = page.to_string();
                for url in found {
                    let url = self.normalize(url);
                    if seen.insert(url.to_string()) {
                        queue.push_back(Job {
                            url,
                            parent: Some(parent.clone()),
                        });
                    }
                }
            }
        }

        let result = CheckResult::from_links(links);
        log::info!(
            "Finished checking {} links from {} ({})",
            result.links.len(),
            self.target,
            if result.passed { "passed" } else { "failed" }
        );
        Ok(result)
    }

    /// Fragments only distinguish links when they are being verified
    fn normalize(&self, mut url: Url) -> Url {
        if !self.check_fragments {
            url.set_fragment(None);
        }
        url
    }

    fn is_same_origin(&self, url: &Url) -> bool {
        url.origin() == self.target.origin()
    }

    async fn check_link(&self, job: Job, observer: &dyn CheckObserver) -> Checked {
        let Job { url, parent } = job;
        let outcome = |state, status| {
            let outcome = LinkOutcome::new(url.as_str(), state, status);
            match &parent {
                Some(parent) => outcome.with_parent(parent.clone()),
                None => outcome,
            }
        };

        if self.skip.should_skip(&url) {
            return Checked {
                outcome: outcome(LinkState::Skipped, None),
                discovered: None,
            };
        }

        let fragment = url
            .fragment()
            .filter(|f| self.check_fragments && !f.is_empty() && *f != "top")
            .map(str::to_string);
        let crawl_page = (parent.is_none() || (self.recurse && self.is_same_origin(&url)))
            && (parent.is_none() || url.fragment().is_none());
        let want_body = crawl_page || fragment.is_some();

        let (status, kind, body) = {
            let _permit = self.permits.acquire().await.ok();
            match &self.local {
                Some(site) if site.contains(&url) => {
                    let response = site.fetch(&url, want_body).await;
                    (response.status, response.kind, response.body)
                }
                _ => match fetch::fetch(&self.client, &url, want_body, &self.retry).await {
                    Ok(response) => {
                        let kind = ContentKind::detect(response.content_type.as_deref(), &url);
                        (response.status, kind, response.body)
                    }
                    Err(e) => {
                        log::debug!("Request to {url} failed: {e}");
                        return Checked {
                            outcome: outcome(LinkState::Broken, None).with_failure(e.to_string()),
                            discovered: None,
                        };
                    }
                },
            }
        };

        if !(200..300).contains(&status) {
            return Checked {
                outcome: outcome(LinkState::Broken, Some(status)),
                discovered: None,
            };
        }

        if let (Some(fragment), ContentKind::Html, Some(body)) = (&fragment, kind, &body)
            && !extract::fragment_targets(body).contains(fragment)
        {
            return Checked {
                outcome: outcome(LinkState::Broken, Some(status))
                    .with_failure(format!("missing fragment #{fragment}")),
                discovered: None,
            };
        }

        let discovered = match body {
            Some(body) if crawl_page => self.extract(&url, kind, &body, observer),
            _ => None,
        };

        Checked {
            outcome: outcome(LinkState::Ok, Some(status)),
            discovered,
        }
    }

    fn extract(
        &self,
        url: &Url,
        kind: ContentKind,
        body: &str,
        observer: &dyn CheckObserver,
    ) -> Option<(Url, Vec<Url>)> {
        let mut page = url.clone();
        page.set_fragment(None);

        let found = match kind {
            ContentKind::Html => {
                observer.on_page_start(page.as_str());
                extract::html_links(body, &page, self.check_css)
            }
            ContentKind::Css if self.check_css => {
                observer.on_page_start(page.as_str());
                extract::css_links(body, &page)
            }
            ContentKind::Markdown if self.markdown => {
                observer.on_page_start(page.as_str());
                extract::markdown_links(body, &page)
            }
            _ => return None,
        };

        log::debug!("Found {} links on {page}", found.len());
        Some((page, found))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::NoOpObserver;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingObserver {
        pages: Mutex<Vec<String>>,
        links: Mutex<Vec<LinkOutcome>>,
    }

    impl CheckObserver for RecordingObserver {
        fn on_page_start(&self, url: &str) {
            self.pages.lock().push(url.to_string());
        }

        fn on_link(&self, outcome: &LinkOutcome) {
            self.links.lock().push(outcome.clone());
        }
    }

    fn options(path: impl Into<String>) -> CheckOptions {
        CheckOptions {
            path: path.into(),
            ..Default::default()
        }
    }

    fn find<'a>(result: &'a CheckResult, suffix: &str) -> &'a LinkOutcome {
        result
            .links
            .iter()
            .find(|l| l.url.ends_with(suffix))
            .unwrap_or_else(|| panic!("no outcome for {suffix}: {:?}", result.links))
    }

    #[tokio::test]
    async fn test_remote_page_with_broken_link() {
        let mut server = mockito::Server::new_async().await;
        let base = server.url();
        let _page = server
            .mock("GET", "/")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body(r#"<a href="/ok">ok</a><a href="/missing">missing</a><a href="mailto:x@y.z">mail</a>"#)
            .create_async()
            .await;
        let _ok = server.mock("HEAD", "/ok").with_status(200).create_async().await;
        let _missing_head = server.mock("HEAD", "/missing").with_status(404).create_async().await;
        let _missing_get = server.mock("GET", "/missing").with_status(404).create_async().await;

        let observer = Arc::new(RecordingObserver::default());
        let result = HttpLinkChecker::new()
            .check(options(format!("{base}/")), observer.clone())
            .await
            .unwrap();

        assert!(!result.passed);
        assert_eq!(result.links.len(), 4);
        assert_eq!(result.links[0].url, format!("{base}/"));
        assert_eq!(result.links[0].parent, None);

        let missing = find(&result, "/missing");
        assert_eq!(missing.state, LinkState::Broken);
        assert_eq!(missing.status, Some(404));
        assert_eq!(missing.parent.as_deref(), Some(format!("{base}/").as_str()));

        assert_eq!(find(&result, "/ok").state, LinkState::Ok);
        assert_eq!(find(&result, "x@y.z").state, LinkState::Skipped);

        assert_eq!(*observer.pages.lock(), vec![format!("{base}/")]);
        assert_eq!(observer.links.lock().len(), 4);
    }

    #[tokio::test]
    async fn test_recursion_stays_on_origin() {
        let mut server = mockito::Server::new_async().await;
        let base = server.url();
        let _index = server
            .mock("GET", "/")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body(r#"<a href="/docs">docs</a><a href="https://external.invalid/">ext</a>"#)
            .create_async()
            .await;
        let docs = server
            .mock("GET", "/docs")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body(r#"<a href="/">home</a><a href="/docs/deep">deep</a>"#)
            .expect(1)
            .create_async()
            .await;
        let _deep = server
            .mock("GET", "/docs/deep")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<p>end</p>")
            .create_async()
            .await;

        let mut opts = options(format!("{base}/"));
        opts.recurse = Some(true);
        opts.links_to_skip = Some(vec!["external\\.invalid".to_string()]);
        opts.timeout = Some(5_000);

        let observer = Arc::new(RecordingObserver::default());
        let result = HttpLinkChecker::new().check(opts, observer.clone()).await.unwrap();

        assert!(result.passed);
        // target, /docs, external (skipped), /docs/deep; "/" is not re-checked
        assert_eq!(result.links.len(), 4);
        assert_eq!(find(&result, "external.invalid/").state, LinkState::Skipped);
        assert_eq!(find(&result, "/docs/deep").parent.as_deref(), Some(format!("{base}/docs").as_str()));
        assert_eq!(observer.pages.lock().len(), 3);
        docs.assert_async().await;
    }

    #[tokio::test]
    async fn test_local_directory_scan() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("index.html"),
            r##"<a href="about.html">about</a><a href="gone.html">gone</a><a href="#intro">intro</a><h1 id="intro">x</h1>"##,
        )
        .unwrap();
        std::fs::write(dir.path().join("about.html"), r#"<a href="index.html#nowhere">back</a>"#).unwrap();

        let mut opts = options(dir.path().to_string_lossy());
        opts.recurse = Some(true);
        opts.check_fragments = Some(true);
        opts.port = Some(8123);

        let result = HttpLinkChecker::new()
            .check(opts, Arc::new(NoOpObserver))
            .await
            .unwrap();

        assert!(!result.passed);
        assert_eq!(result.links[0].url, "http://localhost:8123/");
        assert_eq!(find(&result, "/about.html").state, LinkState::Ok);
        assert_eq!(find(&result, "/gone.html").status, Some(404));
        assert_eq!(find(&result, "#intro").state, LinkState::Ok);

        let missing = find(&result, "#nowhere");
        assert_eq!(missing.state, LinkState::Broken);
        assert_eq!(missing.parent.as_deref(), Some("http://localhost:8123/about.html"));
    }

    #[tokio::test]
    async fn test_local_markdown_only_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("README.md"), "[missing](missing.md)").unwrap();
        let readme = dir.path().join("README.md");

        let plain = HttpLinkChecker::new()
            .check(options(readme.to_string_lossy()), Arc::new(NoOpObserver))
            .await
            .unwrap();
        assert_eq!(plain.links.len(), 1);
        assert!(plain.passed);

        let mut opts = options(readme.to_string_lossy());
        opts.markdown = Some(true);
        let parsed = HttpLinkChecker::new()
            .check(opts, Arc::new(NoOpObserver))
            .await
            .unwrap();
        assert_eq!(parsed.links.len(), 2);
        assert!(!parsed.passed);
    }

    #[tokio::test]
    async fn test_invalid_skip_pattern_fails_scan() {
        let mut opts = options("https://example.com");
        opts.links_to_skip = Some(vec!["[".to_string()]);
        let err = HttpLinkChecker::new()
            .check(opts, Arc::new(NoOpObserver))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidSkipPattern { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_broken_without_status() {
        let result = HttpLinkChecker::new()
            .check(options("http://127.0.0.1:9/"), Arc::new(NoOpObserver))
            .await
            .unwrap();
        assert!(!result.passed);
        assert_eq!(result.links[0].status, None);
        assert!(result.links[0].failure.is_some());
    }
}
