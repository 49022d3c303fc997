//! Text summary of a finished scan

use std::collections::HashSet;

use crate::engine::{CheckResult, LinkOutcome, LinkState};

/// Broken links listed before the report switches to an overflow line
pub const DEFAULT_MAX_BROKEN_LINKS: usize = 100;
/// Shown instead of an HTTP status when the engine got none
pub const STATUS_PLACEHOLDER: &str = "???";

/// Counts derived from a scan result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport<'a> {
    pub passed: bool,
    pub pages: usize,
    pub total: usize,
    pub ok: usize,
    pub broken: usize,
    pub skipped: usize,
    pub broken_links: Vec<&'a LinkOutcome>,
}

impl<'a> ScanReport<'a> {
    pub fn from_result(result: &'a CheckResult) -> Self {
        let count = |state| result.links.iter().filter(|l| l.state == state).count();

        let pages = result
            .links
            .iter()
            .filter_map(|l| l.parent.as_deref())
            .filter(|p| !p.is_empty())
            .collect::<HashSet<_>>()
            .len();

        Self {
            passed: result.passed,
            pages,
            total: result.links.len(),
            ok: count(LinkState::Ok),
            broken: count(LinkState::Broken),
            skipped: count(LinkState::Skipped),
            broken_links: result.links.iter().filter(|l| l.is_broken()).collect(),
        }
    }

    /// Render the report for the scan of `path`
    pub fn render(&self, path: &str, max_broken_links: usize) -> String {
        let status = if self.passed { "PASSED" } else { "FAILED" };
        let mut output = format!(
            "Scan complete: {path}\n\
             Status: {status}\n\
             Scanned {} pages, checked {} links\n\
             OK: {} | Broken: {} | Skipped: {}\n",
            self.pages, self.total, self.ok, self.broken, self.skipped
        );

        if !self.broken_links.is_empty() {
            output.push_str("\nBroken links:\n");
            for link in self.broken_links.iter().take(max_broken_links) {
                output.push_str(&broken_line(link));
            }

            if self.broken_links.len() > max_broken_links {
                output.push_str(&format!(
                    "\n... and {} more\n",
                    self.broken_links.len() - max_broken_links
                ));
            }
        }

        output
    }
}

/// `[status] url (found on parent)` line of the broken links section
fn broken_line(link: &LinkOutcome) -> String {
    let status = match link.status {
        Some(status) if status != 0 => status.to_string(),
        _ => STATUS_PLACEHOLDER.to_string(),
    };
    match link.parent.as_deref().filter(|p| !p.is_empty()) {
        Some(parent) => format!("[{status}] {} (found on {parent})\n", link.url),
        None => format!("[{status}] {}\n", link.url),
    }
}

/// Format scan results into the text returned to the caller
pub fn format_scan_results(result: &CheckResult, path: &str, max_broken_links: usize) -> String {
    ScanReport::from_result(result).render(path, max_broken_links)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(url: &str) -> LinkOutcome {
        LinkOutcome::new(url, LinkState::Ok, Some(200))
    }

    fn broken(url: &str, status: Option<u16>) -> LinkOutcome {
        LinkOutcome::new(url, LinkState::Broken, status)
    }

    #[test]
    fn test_all_links_passing() {
        let result = CheckResult {
            passed: true,
            links: vec![ok("https://example.com/page1"), ok("https://example.com/page2")],
        };

        let output = format_scan_results(&result, "https://example.com", DEFAULT_MAX_BROKEN_LINKS);

        assert!(output.contains("Scan complete: https://example.com"));
        assert!(output.contains("Status: PASSED"));
        assert!(output.contains("checked 2 links"));
        assert!(output.contains("OK: 2"));
        assert!(output.contains("Broken: 0"));
        assert!(!output.contains("Broken links:"));
    }

    #[test]
    fn test_single_link_example() {
        let result = CheckResult {
            passed: true,
            links: vec![ok("https://example.com")],
        };
        let output = format_scan_results(&result, "https://example.com", DEFAULT_MAX_BROKEN_LINKS);
        assert_eq!(
            output,
            "Scan complete: https://example.com\n\
             Status: PASSED\n\
             Scanned 0 pages, checked 1 links\n\
             OK: 1 | Broken: 0 | Skipped: 0\n"
        );
    }

    #[test]
    fn test_broken_links_listed_with_parent() {
        let parent = "https://example.com/page1";
        let result = CheckResult {
            passed: false,
            links: vec![
                ok(parent),
                broken("https://example.com/broken", Some(404)).with_parent(parent),
                broken("https://example.com/server-error", Some(500)).with_parent(parent),
            ],
        };

        let output = format_scan_results(&result, "https://example.com", DEFAULT_MAX_BROKEN_LINKS);

        assert!(output.contains("Status: FAILED"));
        assert!(output.contains("Broken: 2"));
        assert!(output.contains("Scanned 1 pages, checked 3 links"));
        assert!(output.contains(
            "\nBroken links:\n\
             [404] https://example.com/broken (found on https://example.com/page1)\n\
             [500] https://example.com/server-error (found on https://example.com/page1)\n"
        ));
    }

    #[test]
    fn test_missing_status_uses_placeholder() {
        let result = CheckResult {
            passed: false,
            links: vec![
                broken("https://down.example.com/", None),
                broken("https://zero.example.com/", Some(0)),
            ],
        };
        let output = format_scan_results(&result, "https://example.com", DEFAULT_MAX_BROKEN_LINKS);
        assert!(output.contains("[???] https://down.example.com/\n"));
        assert!(output.contains("[???] https://zero.example.com/\n"));
    }

    #[test]
    fn test_full_report_text() {
        let result = CheckResult::from_links(vec![
            ok("https://example.com/"),
            broken("https://example.com/gone", Some(404)).with_parent("https://example.com/"),
            broken("https://down.example.org/", None).with_parent("https://example.com/"),
            broken("https://example.com/orphan", Some(0)),
        ]);

        let output = format_scan_results(&result, "https://example.com", 2);

        assert_eq!(
            output,
            "Scan complete: https://example.com\n\
             Status: FAILED\n\
             Scanned 1 pages, checked 4 links\n\
             OK: 1 | Broken: 3 | Skipped: 0\n\
             \n\
             Broken links:\n\
             [404] https://example.com/gone (found on https://example.com/)\n\
             [???] https://down.example.org/ (found on https://example.com/)\n\
             \n\
             ... and 1 more\n"
        );
    }

    #[test]
    fn test_broken_list_is_capped() {
        let links: Vec<_> = (0..150)
            .map(|i| broken(&format!("https://example.com/{i}"), Some(404)))
            .collect();
        let result = CheckResult {
            passed: false,
            links,
        };

        let output = format_scan_results(&result, "https://example.com", DEFAULT_MAX_BROKEN_LINKS);

        let listed = output.lines().filter(|l| l.starts_with("[404]")).count();
        assert_eq!(listed, 100);
        assert!(output.contains("https://example.com/99\n"));
        assert!(!output.contains("https://example.com/100\n"));
        assert!(output.ends_with("\n... and 50 more\n"));
    }

    #[test]
    fn test_exactly_cap_has_no_overflow_line() {
        let links: Vec<_> = (0..3)
            .map(|i| broken(&format!("https://example.com/{i}"), Some(410)))
            .collect();
        let result = CheckResult {
            passed: false,
            links,
        };
        let output = format_scan_results(&result, "x", 3);
        assert!(!output.contains("more"));
    }

    #[test]
    fn test_counts_add_up_and_pages_are_distinct_parents() {
        let result = CheckResult {
            passed: false,
            links: vec![
                ok("https://example.com/"),
                ok("https://example.com/a").with_parent("https://example.com/"),
                broken("https://example.com/b", Some(404)).with_parent("https://example.com/"),
                LinkOutcome::new("mailto:x@y.z", LinkState::Skipped, None)
                    .with_parent("https://example.com/a"),
                ok("https://example.com/c").with_parent(""),
            ],
        };
        let report = ScanReport::from_result(&result);
        assert_eq!(report.ok + report.broken + report.skipped, report.total);
        assert_eq!(report.pages, 2);
        assert_eq!(report.skipped, 1);
    }
}
