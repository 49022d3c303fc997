pub mod metadata;
pub mod server;

pub use metadata::{all_tool_metadata, available_tools};
pub use server::LinkScanServer;
