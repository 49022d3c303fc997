use anyhow::Result;

use linkscan_mcp::scan::ERROR_PREFIX;
use linkscan_mcp::{LinkEngine, ScanPageArgs, ScanTool, scan::ScanReport};

/// Run one scan from the terminal
///
/// Progress goes to the log on stderr and the report to stdout. Returns
/// whether the scan passed.
pub async fn handle_scan<E: LinkEngine>(tool: &ScanTool<E>, args: ScanPageArgs) -> Result<bool> {
    match tool.run(&args, None).await {
        Ok(result) => {
            let report = ScanReport::from_result(&result);
            print!("{}", report.render(&args.path, tool.max_broken_links()));
            Ok(report.passed)
        }
        Err(e) => Err(anyhow::anyhow!("{ERROR_PREFIX}{e}")),
    }
}
