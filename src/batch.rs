//! # Batch Orchestrator
//!
//! Runs a unit of work over many participants, strictly one after another.
//!
//! - Items run in input order; the next item starts only after the previous
//!   one (and its pacing delay) has finished.
//! - A failing item is recorded and the batch moves on. Nothing is retried.
//! - After each successful item that is not the last one, the orchestrator
//!   sleeps for the batch's pacing delay so the delivery collaborator (or the
//!   file system) is not flooded.
//! - There is no cancellation once a batch has started.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use crate::error::CertError;

/// Pacing between certificates written by "download all".
pub const DOWNLOAD_PACING: Duration = Duration::from_millis(500);
/// Pacing between certificates sent by "bulk email".
pub const SEND_PACING: Duration = Duration::from_millis(1500);

/// One kind of per-item work (render-and-save, render-and-send, ...).
#[async_trait]
pub trait BatchWork: Send {
    type Item: Send + Sync;

    /// Display label for failure reports, usually the participant's name.
    fn label(&self, item: &Self::Item) -> String;

    async fn run(&mut self, item: &Self::Item) -> Result<(), CertError>;
}

/// One failed item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchFailure {
    pub name: String,
    pub error: String,
}

/// Tally of a finished batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn is_complete_success(&self) -> bool {
        self.failed == 0
    }

    /// One-line outcome suitable for a status message.
    pub fn summary(&self) -> String {
        if self.is_complete_success() {
            format!("{} of {} completed successfully", self.succeeded, self.total)
        } else {
            format!(
                "Completed with errors: {} succeeded, {} failed",
                self.succeeded, self.failed
            )
        }
    }
}

/// Run `work` over `items` sequentially.
pub async fn run_batch<W: BatchWork>(
    work: &mut W,
    items: &[W::Item],
    pacing: Duration,
) -> BatchReport {
    let mut report = BatchReport {
        total: items.len(),
        ..Default::default()
    };

    for (i, item) in items.iter().enumerate() {
        let label = work.label(item);
        tracing::debug!(index = i + 1, total = items.len(), item = %label, "batch item");

        match work.run(item).await {
            Ok(()) => {
                report.succeeded += 1;
                if i + 1 < items.len() && !pacing.is_zero() {
                    tokio::time::sleep(pacing).await;
                }
            }
            Err(e) => {
                tracing::warn!(item = %label, error = %e, "batch item failed");
                report.failed += 1;
                report.errors.push(BatchFailure {
                    name: label,
                    error: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        total = report.total,
        succeeded = report.succeeded,
        failed = report.failed,
        "batch finished"
    );
    report
}
