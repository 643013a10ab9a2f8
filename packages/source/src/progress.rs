//! Progress reporting for timeline scans.
//!
//! A scan reports one unit per input file. The [`ProgressCallback`] trait
//! keeps the scanning code independent of how progress is rendered; the
//! CLI plugs in an `indicatif` bar, tests use [`NullProgress`].

use std::sync::Arc;

/// Receives progress updates from a running scan.
///
/// Implementations are shared across blocking worker tasks, hence
/// `Send + Sync`.
pub trait ProgressCallback: Send + Sync {
    /// Sets the number of files to be scanned.
    fn set_total(&self, total: u64);

    /// Marks `delta` more files as scanned.
    fn inc(&self, delta: u64);

    /// Updates the message shown next to the indicator.
    fn set_message(&self, msg: String);

    /// Completes the indicator with a final message.
    fn finish(&self, msg: String);
}

/// Ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// Returns a shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
