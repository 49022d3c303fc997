use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use linkscan_mcp::{ScanPageArgs, ServerConfig};

/// linkscan-mcp - broken link scanning for AI agents over MCP
///
/// Without a subcommand the server speaks MCP on stdin/stdout and exposes
/// the `scan_page` tool.
#[derive(Parser, Debug)]
#[command(name = "linkscan-mcp")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Load server settings from JSON file
    ///
    /// JSON format:
    /// ```json
    /// {
    ///   "max_broken_links": 100,
    ///   "progress_interval": 10,
    ///   "user_agent": "my-bot/1.0"
    /// }
    /// ```
    ///
    /// Defaults to {config_dir}/linkscan-mcp/config.json when it exists.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Maximum broken links listed in a report
    /// Can also be set via `LINKSCAN_MAX_BROKEN_LINKS` environment variable
    #[arg(long, value_name = "COUNT", env = "LINKSCAN_MAX_BROKEN_LINKS", global = true)]
    pub max_broken_links: Option<usize>,

    /// Checked links between progress updates
    /// Can also be set via `LINKSCAN_PROGRESS_INTERVAL` environment variable
    #[arg(long, value_name = "COUNT", env = "LINKSCAN_PROGRESS_INTERVAL", global = true)]
    pub progress_interval: Option<u64>,

    /// List available tool names and exit
    #[arg(long)]
    pub list_tools: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan a URL or local path once and print the report
    Scan(ScanCommand),
}

/// Flags of the `scan` subcommand
#[derive(Args, Debug, Clone)]
pub struct ScanCommand {
    /// URL or local file path to scan
    pub path: String,

    /// Follow links recursively on the same domain
    #[arg(short, long)]
    pub recurse: bool,

    /// Number of simultaneous connections
    #[arg(long, value_name = "COUNT")]
    pub concurrency: Option<u32>,

    /// Request timeout in milliseconds (0 = no timeout)
    #[arg(long, value_name = "MS")]
    pub timeout: Option<u64>,

    /// URL pattern (regex) to skip; can be repeated
    #[arg(long = "skip", value_name = "REGEX")]
    pub skip: Vec<String>,

    /// Custom disk location where local scans are rooted
    #[arg(long, value_name = "PATH")]
    pub server_root: Option<String>,

    /// Port used in URLs of local scans
    #[arg(long)]
    pub port: Option<u16>,

    /// Serve directory listings for directories without index.html
    #[arg(long)]
    pub directory_listing: bool,

    /// Resolve extensionless links to .html files
    #[arg(long)]
    pub clean_urls: bool,

    /// Parse and scan markdown files
    #[arg(long)]
    pub markdown: bool,

    /// Extract and validate URLs in CSS
    #[arg(long)]
    pub check_css: bool,

    /// Validate URL anchor identifiers
    #[arg(long)]
    pub check_fragments: bool,

    /// Custom user agent header
    #[arg(long, value_name = "AGENT")]
    pub user_agent: Option<String>,

    /// Retry HTTP 429 responses with retry-after header
    #[arg(long)]
    pub retry: bool,

    /// Retry 5xx errors and network failures
    #[arg(long)]
    pub retry_errors: bool,

    /// Retry attempt limit
    #[arg(long, value_name = "COUNT")]
    pub retry_errors_count: Option<u32>,

    /// Random delay between retries in milliseconds
    #[arg(long, value_name = "MS")]
    pub retry_errors_jitter: Option<u64>,

    /// Accept invalid TLS certificates
    #[arg(long)]
    pub allow_insecure_certs: bool,
}

/// `Some(true)` for a set flag, absent otherwise
fn flag(set: bool) -> Option<bool> {
    set.then_some(true)
}

impl From<ScanCommand> for ScanPageArgs {
    fn from(cmd: ScanCommand) -> Self {
        Self {
            path: cmd.path,
            concurrency: cmd.concurrency,
            port: cmd.port,
            timeout: cmd.timeout,
            recurse: flag(cmd.recurse),
            server_root: cmd.server_root,
            directory_listing: flag(cmd.directory_listing),
            clean_urls: flag(cmd.clean_urls),
            markdown: flag(cmd.markdown),
            check_css: flag(cmd.check_css),
            check_fragments: flag(cmd.check_fragments),
            links_to_skip: Some(cmd.skip),
            user_agent: cmd.user_agent,
            retry: flag(cmd.retry),
            retry_errors: flag(cmd.retry_errors),
            retry_errors_count: cmd.retry_errors_count,
            retry_errors_jitter: cmd.retry_errors_jitter,
            allow_insecure_certs: flag(cmd.allow_insecure_certs),
        }
    }
}

impl Cli {
    /// Load the config file and apply command line overrides
    pub fn server_config(&self) -> anyhow::Result<ServerConfig> {
        let mut config = ServerConfig::load(self.config.as_deref())?;
        if let Some(max) = self.max_broken_links {
            config.max_broken_links = max;
        }
        if let Some(interval) = self.progress_interval {
            config.progress_interval = interval;
        }
        config.validate()?;
        Ok(config)
    }
}
