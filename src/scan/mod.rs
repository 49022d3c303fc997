//! The `scan_page` tool: argument mapping, progress reporting and the text report

pub mod args;
pub mod options;
pub mod progress;
pub mod report;
pub mod tool;

pub use args::{SCAN_PAGE, ScanPageArgs};
pub use options::{CheckOptions, build_check_options};
pub use progress::{McpProgressSink, ProgressBridge, ProgressSink};
pub use report::{ScanReport, format_scan_results};
pub use tool::{ERROR_PREFIX, ScanError, ScanTool};
