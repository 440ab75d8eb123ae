/// Scroll stabilization for infinite-scroll listings.
///
/// The stabilizer repeatedly scrolls to the current content extent, waits for the page to
/// settle, and re-measures. It stops as soon as the extent stops growing, or after a fixed
/// number of scrolls. Bounded effort is the policy: cap exhaustion is a normal outcome,
/// not an error, and nothing here is retried.
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::provider::{ContentProvider, FragmentSelector};

pub const DEFAULT_MAX_ITERATIONS: u32 = 3;
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(3);
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(15);

/// How the scroll loop ended. Every variant except `NoContent` proceeds to extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ScrollOutcome {
    /// Nothing matching the fragment selector appeared before the readiness timeout.
    NoContent,
    /// The extent did not change after the last scroll.
    Stable { scrolls: u32 },
    /// The iteration cap was reached while the extent was still growing.
    CapExhausted { scrolls: u32 },
    /// The provider failed while scrolling or measuring; whatever is loaded is used.
    Interrupted { scrolls: u32 },
}

impl ScrollOutcome {
    pub fn has_content(&self) -> bool {
        !matches!(self, ScrollOutcome::NoContent)
    }

    pub fn scrolls(&self) -> u32 {
        match *self {
            ScrollOutcome::NoContent => 0,
            ScrollOutcome::Stable { scrolls }
            | ScrollOutcome::CapExhausted { scrolls }
            | ScrollOutcome::Interrupted { scrolls } => scrolls,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScrollStabilizer {
    max_iterations: u32,
    settle_delay: Duration,
    ready_timeout: Duration,
}

impl Default for ScrollStabilizer {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            settle_delay: DEFAULT_SETTLE_DELAY,
            ready_timeout: DEFAULT_READY_TIMEOUT,
        }
    }
}

impl ScrollStabilizer {
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    pub fn with_ready_timeout(mut self, ready_timeout: Duration) -> Self {
        self.ready_timeout = ready_timeout;
        self
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    pub fn ready_timeout(&self) -> Duration {
        self.ready_timeout
    }

    /// Wait for content, then scroll until the extent is stable or the cap is hit.
    pub async fn stabilize(
        &self,
        provider: &dyn ContentProvider,
        selector: &FragmentSelector,
    ) -> ScrollOutcome {
        match provider.ready(selector, self.ready_timeout).await {
            Ok(true) => {}
            Ok(false) => {
                info!(
                    timeout_ms = self.ready_timeout.as_millis(),
                    selector = selector.as_css(),
                    "no content appeared before readiness timeout"
                );
                return ScrollOutcome::NoContent;
            }
            Err(e) => {
                warn!(error = %e, "readiness wait failed, treating as no content");
                return ScrollOutcome::NoContent;
            }
        }

        let mut last = match provider.extent().await {
            Ok(extent) => extent,
            Err(e) => {
                warn!(error = %e, "initial extent measurement failed");
                return ScrollOutcome::Interrupted { scrolls: 0 };
            }
        };

        let mut scrolls = 0;
        while scrolls < self.max_iterations {
            if let Err(e) = provider.scroll_to(last).await {
                warn!(error = %e, scrolls, "scroll failed, extracting what is loaded");
                return ScrollOutcome::Interrupted { scrolls };
            }
            scrolls += 1;
            tokio::time::sleep(self.settle_delay).await;

            let current = match provider.extent().await {
                Ok(extent) => extent,
                Err(e) => {
                    warn!(error = %e, scrolls, "extent measurement failed, extracting what is loaded");
                    return ScrollOutcome::Interrupted { scrolls };
                }
            };
            debug!(scrolls, previous = last, current, "measured extent");

            if current == last {
                return ScrollOutcome::Stable { scrolls };
            }
            last = current;
        }

        debug!(scrolls, extent = last, "scroll cap reached");
        ScrollOutcome::CapExhausted { scrolls }
    }
}
