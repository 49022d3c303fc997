//! Link checking engine
//!
//! The scan tool talks to the engine through [`LinkEngine`] and receives
//! progress through [`CheckObserver`]. [`HttpLinkChecker`] is the built-in
//! implementation; tests substitute their own engines.

mod checker;
mod extract;
mod fetch;
mod local;
mod skip;

use std::future::Future;

use serde::{Deserialize, Serialize};

pub use checker::HttpLinkChecker;

use crate::scan::CheckOptions;

/// Resolution state of a checked link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LinkState {
    Ok,
    Broken,
    Skipped,
}

/// One checked link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkOutcome {
    pub url: String,
    pub state: LinkState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Page the link was found on; `None` for the scan target itself
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Network-level failure detail when no HTTP status was obtained
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl LinkOutcome {
    pub fn new(url: impl Into<String>, state: LinkState, status: Option<u16>) -> Self {
        Self {
            url: url.into(),
            state,
            status,
            parent: None,
            failure: None,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_failure(mut self, failure: impl Into<String>) -> Self {
        self.failure = Some(failure.into());
        self
    }

    pub fn is_broken(&self) -> bool {
        self.state == LinkState::Broken
    }
}

/// Final result of a scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub passed: bool,
    pub links: Vec<LinkOutcome>,
}

impl CheckResult {
    /// Build a result whose `passed` flag reflects the absence of broken links
    pub fn from_links(links: Vec<LinkOutcome>) -> Self {
        let passed = !links.iter().any(LinkOutcome::is_broken);
        Self { passed, links }
    }
}

/// Errors that abort a whole scan
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid target URL '{url}': {source}")]
    InvalidTarget {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("cannot read local path '{path}': {source}")]
    LocalPath {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid linksToSkip pattern '{pattern}': {source}")]
    InvalidSkipPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

/// Receives lifecycle events while a scan is running
///
/// Callbacks may arrive concurrently from several engine tasks and must not
/// block.
pub trait CheckObserver: Send + Sync {
    /// A page is about to be crawled for links
    fn on_page_start(&self, url: &str);

    /// A link finished resolving
    fn on_link(&self, outcome: &LinkOutcome);
}

/// Observer that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl CheckObserver for NoOpObserver {
    fn on_page_start(&self, _url: &str) {}

    fn on_link(&self, _outcome: &LinkOutcome) {}
}

/// A link checking engine
pub trait LinkEngine: Send + Sync + 'static {
    fn check(
        &self,
        options: CheckOptions,
        observer: std::sync::Arc<dyn CheckObserver>,
    ) -> impl Future<Output = Result<CheckResult, EngineError>> + Send;
}
