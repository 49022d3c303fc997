//! MCP server exposing a link checker as the `scan_page` tool.

pub mod config;
pub mod engine;
pub mod scan;
pub mod stdio;

pub use config::ServerConfig;
pub use engine::{CheckResult, HttpLinkChecker, LinkEngine, LinkOutcome, LinkState};
pub use scan::{ScanPageArgs, ScanTool};
pub use stdio::LinkScanServer;
