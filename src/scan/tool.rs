//! `scan_page` tool execution
//!
//! Runs option mapping, the engine (with the progress bridge attached) and
//! the report formatter. A failed scan still produces a normal text result.

use std::any::Any;
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::engine::{CheckResult, EngineError, LinkEngine};

use super::args::ScanPageArgs;
use super::options::build_check_options;
use super::progress::{ProgressBridge, ProgressSink};
use super::report::format_scan_results;

/// Prefix of the text returned when a scan fails
pub const ERROR_PREFIX: &str = "Error scanning links: ";

/// Why a scan produced no report
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The engine panicked; holds the panic payload as text
    #[error("{0}")]
    Panicked(String),

    #[error("scan was cancelled")]
    Cancelled,
}

/// Panic payload as a string, the way `panic!` formats it
fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(message) => (*message).to_string(),
            Err(_) => "engine panicked".to_string(),
        },
    }
}

/// The `scan_page` tool bound to an engine
pub struct ScanTool<E> {
    engine: Arc<E>,
    max_broken_links: usize,
    progress_interval: u64,
}

impl<E> Clone for ScanTool<E> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            max_broken_links: self.max_broken_links,
            progress_interval: self.progress_interval,
        }
    }
}

impl<E: LinkEngine> ScanTool<E> {
    pub fn new(engine: E, config: &ServerConfig) -> Self {
        Self {
            engine: Arc::new(engine),
            max_broken_links: config.max_broken_links,
            progress_interval: config.progress_interval,
        }
    }

    /// Run one scan to completion
    ///
    /// The engine runs on its own task so that a panic inside it surfaces as
    /// [`ScanError::Panicked`] instead of tearing down the caller.
    pub async fn run(
        &self,
        args: &ScanPageArgs,
        sink: Option<Arc<dyn ProgressSink>>,
    ) -> Result<CheckResult, ScanError> {
        let options = build_check_options(args);

        if sink.is_some() {
            log::info!("Progress token provided, will send notifications");
        } else {
            log::info!("No progress token provided, progress goes to the log only");
        }

        let bridge = Arc::new(ProgressBridge::new(sink.clone(), self.progress_interval));
        let engine = Arc::clone(&self.engine);
        let handle = tokio::spawn(async move { engine.check(options, bridge).await });
        let joined = handle.await;

        // Queued progress goes out before the result does
        if let Some(forwarder) = sink.and_then(|sink| sink.finish())
            && let Err(e) = forwarder.await
        {
            log::debug!("Progress forwarder stopped early: {e}");
        }

        match joined {
            Ok(result) => Ok(result?),
            Err(e) if e.is_panic() => Err(ScanError::Panicked(panic_message(e.into_panic()))),
            Err(_) => Err(ScanError::Cancelled),
        }
    }

    /// Run a scan and render the text returned to the caller
    pub async fn execute(&self, args: &ScanPageArgs, sink: Option<Arc<dyn ProgressSink>>) -> String {
        match self.run(args, sink).await {
            Ok(result) => format_scan_results(&result, &args.path, self.max_broken_links),
            Err(e) => {
                log::warn!("Scan of {} failed: {e}", args.path);
                format!("{ERROR_PREFIX}{e}")
            }
        }
    }

    pub fn max_broken_links(&self) -> usize {
        self.max_broken_links
    }
}
