//! Static tool metadata served by `tools/list`.

use rmcp::schemars::{JsonSchema, schema_for};
use serde_json::Value;

use crate::scan::{SCAN_PAGE, ScanPageArgs};

/// Metadata for a single tool.
#[derive(Debug, Clone)]
pub struct ToolMetadata {
    pub name: &'static str,
    pub description: &'static str,
    pub schema: Value,
}

/// Helper to build schema from Args type.
pub fn build_schema<T: JsonSchema>() -> Value {
    serde_json::to_value(schema_for!(T)).unwrap_or(Value::Null)
}

/// All tools this server provides.
pub fn all_tool_metadata() -> Vec<ToolMetadata> {
    vec![ToolMetadata {
        name: SCAN_PAGE,
        description: "Scan links in a webpage or local file path. Checks for broken links, validates anchors, and can crawl recursively. Supports progress notifications for long-running scans.",
        schema: build_schema::<ScanPageArgs>(),
    }]
}

/// Names of all tools this server provides.
pub fn available_tools() -> Vec<&'static str> {
    all_tool_metadata().iter().map(|tool| tool.name).collect()
}
