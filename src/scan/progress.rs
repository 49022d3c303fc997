//! Progress bridge between engine events and MCP progress notifications
//!
//! Each message produced here goes to two places: the diagnostic log
//! (always) and, when the caller supplied a progress token, an outbound
//! `notifications/progress`. Outbound delivery is best-effort: at most once
//! per event, never awaited by the event handler, no retry, and failures are
//! logged at debug level and dropped. Notifications of one request are
//! delivered in the order they were produced.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use rmcp::{
    Peer, RoleServer,
    model::{ProgressNotificationParam, ProgressToken},
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::engine::{CheckObserver, LinkOutcome};

/// Log target for progress diagnostics
pub const PROGRESS_TARGET: &str = "linkscan_mcp::progress";

/// Destination for outbound progress notifications
pub trait ProgressSink: Send + Sync {
    /// Hand off a notification without blocking the caller
    fn notify(&self, progress: u64, message: String);

    /// Stop accepting notifications; the returned task completes once
    /// everything already handed off has been delivered
    fn finish(&self) -> Option<JoinHandle<()>> {
        None
    }
}

/// Sends `notifications/progress` to the MCP client that made the request
///
/// Notifications are queued on an unbounded channel and a single forwarding
/// task sends them to the peer one after another.
pub struct McpProgressSink {
    token: ProgressToken,
    sender: Mutex<Option<mpsc::UnboundedSender<ProgressNotificationParam>>>,
    forwarder: Mutex<Option<JoinHandle<()>>>,
}

impl McpProgressSink {
    /// Must be called from within a Tokio runtime
    pub fn new(peer: Peer<RoleServer>, token: ProgressToken) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<ProgressNotificationParam>();
        let forwarder = tokio::spawn(async move {
            while let Some(param) = receiver.recv().await {
                if let Err(e) = peer.notify_progress(param).await {
                    log::debug!("Dropped progress notification: {e}");
                }
            }
        });
        Self {
            token,
            sender: Mutex::new(Some(sender)),
            forwarder: Mutex::new(Some(forwarder)),
        }
    }
}

impl ProgressSink for McpProgressSink {
    fn notify(&self, progress: u64, message: String) {
        let param = ProgressNotificationParam {
            progress_token: self.token.clone(),
            progress: progress as f64,
            total: None,
            message: Some(message),
        };
        let sent = match self.sender.lock().as_ref() {
            Some(sender) => sender.send(param).is_ok(),
            None => false,
        };
        if !sent {
            log::debug!("Dropped progress notification: request already finished");
        }
    }

    fn finish(&self) -> Option<JoinHandle<()>> {
        // Closing the channel lets the forwarder exit after draining it
        self.sender.lock().take();
        self.forwarder.lock().take()
    }
}

#[derive(Debug, Default)]
struct Counters {
    pages: HashSet<String>,
    links_checked: u64,
    broken: u64,
}

/// Turns engine events into progress messages
pub struct ProgressBridge {
    sink: Option<Arc<dyn ProgressSink>>,
    interval: u64,
    counters: Mutex<Counters>,
}

impl ProgressBridge {
    /// `interval` is the number of checked links between periodic updates
    pub fn new(sink: Option<Arc<dyn ProgressSink>>, interval: u64) -> Self {
        Self {
            sink,
            interval: interval.max(1),
            counters: Mutex::new(Counters::default()),
        }
    }

    fn emit(&self, progress: u64, message: String) {
        log::info!(target: PROGRESS_TARGET, "{message}");
        if let Some(sink) = &self.sink {
            sink.notify(progress, message);
        }
    }
}

impl CheckObserver for ProgressBridge {
    fn on_page_start(&self, url: &str) {
        // Emitted under the lock so messages leave in counter order
        let mut counters = self.counters.lock();
        counters.pages.insert(url.to_string());
        let message = format!("📄 Page {}: {url}", counters.pages.len());
        self.emit(counters.links_checked, message);
    }

    fn on_link(&self, outcome: &LinkOutcome) {
        let mut counters = self.counters.lock();
        counters.links_checked += 1;
        if outcome.is_broken() {
            counters.broken += 1;
        }
        if counters.links_checked % self.interval == 0 {
            let message = format!(
                "⏳ {} links | {} pages | {} broken",
                counters.links_checked,
                counters.pages.len(),
                counters.broken
            );
            self.emit(counters.links_checked, message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::LinkState;

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<(u64, String)>>,
    }

    impl ProgressSink for RecordingSink {
        fn notify(&self, progress: u64, message: String) {
            self.sent.lock().push((progress, message));
        }
    }

    fn link(state: LinkState) -> LinkOutcome {
        LinkOutcome::new("https://example.com/x", state, None)
    }

    #[test]
    fn test_page_start_counts_distinct_pages() {
        let sink = Arc::new(RecordingSink::default());
        let bridge = ProgressBridge::new(Some(sink.clone()), 10);

        bridge.on_page_start("https://example.com/");
        bridge.on_page_start("https://example.com/");
        bridge.on_page_start("https://example.com/docs");

        let sent = sink.sent.lock();
        assert_eq!(
            *sent,
            vec![
                (0, "📄 Page 1: https://example.com/".to_string()),
                (0, "📄 Page 1: https://example.com/".to_string()),
                (0, "📄 Page 2: https://example.com/docs".to_string()),
            ]
        );
    }

    #[test]
    fn test_link_updates_every_interval() {
        let sink = Arc::new(RecordingSink::default());
        let bridge = ProgressBridge::new(Some(sink.clone()), 10);

        bridge.on_page_start("https://example.com/");
        for i in 0..25 {
            let state = if i % 5 == 0 { LinkState::Broken } else { LinkState::Ok };
            bridge.on_link(&link(state));
        }

        let sent = sink.sent.lock();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[1], (10, "⏳ 10 links | 1 pages | 2 broken".to_string()));
        assert_eq!(sent[2], (20, "⏳ 20 links | 1 pages | 4 broken".to_string()));
    }

    #[test]
    fn test_progress_value_is_links_checked() {
        let sink = Arc::new(RecordingSink::default());
        let bridge = ProgressBridge::new(Some(sink.clone()), 2);

        bridge.on_link(&link(LinkState::Ok));
        bridge.on_link(&link(LinkState::Skipped));
        bridge.on_link(&link(LinkState::Ok));
        bridge.on_page_start("https://example.com/next");

        let progress: Vec<u64> = sink.sent.lock().iter().map(|(p, _)| *p).collect();
        assert_eq!(progress, vec![2, 3]);
    }

    #[test]
    fn test_without_sink_nothing_is_sent() {
        let bridge = ProgressBridge::new(None, 1);
        bridge.on_page_start("https://example.com/");
        bridge.on_link(&link(LinkState::Broken));
        assert_eq!(bridge.counters.lock().broken, 1);
        assert_eq!(bridge.counters.lock().links_checked, 1);
    }

    #[test]
    fn test_concurrent_events_reach_sink_in_counter_order() {
        let sink = Arc::new(RecordingSink::default());
        let bridge = Arc::new(ProgressBridge::new(Some(sink.clone()), 1));

        let workers: Vec<_> = (0..8)
            .map(|worker| {
                let bridge = Arc::clone(&bridge);
                std::thread::spawn(move || {
                    for i in 0..250 {
                        if i % 50 == 0 {
                            bridge.on_page_start(&format!("https://example.com/{worker}/{i}"));
                        }
                        bridge.on_link(&link(LinkState::Ok));
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let sent = sink.sent.lock();
        assert_eq!(sent.len(), 2000 + 8 * 5);
        assert!(sent.windows(2).all(|pair| pair[0].0 <= pair[1].0));
        assert_eq!(sent.last().unwrap().0, 2000);
    }

    #[test]
    fn test_default_sink_has_nothing_to_flush() {
        assert!(RecordingSink::default().finish().is_none());
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let sink = Arc::new(RecordingSink::default());
        let bridge = ProgressBridge::new(Some(sink.clone()), 0);
        bridge.on_link(&link(LinkState::Ok));
        assert_eq!(sink.sent.lock().len(), 1);
    }
}
