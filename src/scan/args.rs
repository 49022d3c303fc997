//! `scan_page` tool arguments

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Tool name advertised over MCP
pub const SCAN_PAGE: &str = "scan_page";

/// Arguments of the `scan_page` tool
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScanPageArgs {
    /// URL or local file path to scan
    pub path: String,

    // Connection settings
    /// Number of simultaneous connections (default: 100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<u32>,

    /// Server port for local scanning (random port by default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Request timeout in milliseconds (0 = no timeout)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    // Crawling behavior
    /// Follow links recursively on the same domain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurse: Option<bool>,

    /// Custom disk location where the server starts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_root: Option<String>,

    /// Auto-serve directory index files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory_listing: Option<bool>,

    /// Enable extensionless link resolution (e.g., /about -> /about.html)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clean_urls: Option<bool>,

    // Content parsing
    /// Parse and scan markdown files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown: Option<bool>,

    /// Extract and validate URLs in CSS properties
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_css: Option<bool>,

    /// Validate URL anchor identifiers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_fragments: Option<bool>,

    // Filtering & customization
    /// URL patterns to exclude (regex strings)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links_to_skip: Option<Vec<String>>,

    /// Custom user agent header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    // Retry logic
    /// Retry HTTP 429 responses with retry-after header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<bool>,

    /// Retry 5xx errors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_errors: Option<bool>,

    /// Retry attempt limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_errors_count: Option<u32>,

    /// Random delay between retries in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_errors_jitter: Option<u64>,

    // Link validation
    /// Accept invalid SSL certificates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_insecure_certs: Option<bool>,
}

impl ScanPageArgs {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }
}
