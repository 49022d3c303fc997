//! Mapping from tool arguments to engine options

use serde::{Deserialize, Serialize};

use super::args::ScanPageArgs;

/// Engine configuration for one scan
///
/// Absent fields mean "engine default"; nothing is defaulted here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOptions {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurse: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_root: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory_listing: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clean_urls: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markdown: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_css: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_fragments: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links_to_skip: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_errors: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_errors_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_errors_jitter: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_insecure_certs: Option<bool>,
}

/// Build engine options from tool arguments
///
/// Every provided field is passed through unchanged, except an empty
/// `linksToSkip` list which is dropped entirely.
pub fn build_check_options(args: &ScanPageArgs) -> CheckOptions {
    CheckOptions {
        path: args.path.clone(),
        concurrency: args.concurrency,
        port: args.port,
        timeout: args.timeout,
        recurse: args.recurse,
        server_root: args.server_root.clone(),
        directory_listing: args.directory_listing,
        clean_urls: args.clean_urls,
        markdown: args.markdown,
        check_css: args.check_css,
        check_fragments: args.check_fragments,
        links_to_skip: args
            .links_to_skip
            .as_ref()
            .filter(|patterns| !patterns.is_empty())
            .cloned(),
        user_agent: args.user_agent.clone(),
        retry: args.retry,
        retry_errors: args.retry_errors,
        retry_errors_count: args.retry_errors_count,
        retry_errors_jitter: args.retry_errors_jitter,
        allow_insecure_certs: args.allow_insecure_certs,
    }
}
