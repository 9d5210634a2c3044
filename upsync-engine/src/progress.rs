//! Progress reporting hook.
//!
//! Observability only: nothing the pipeline decides depends on what a
//! renderer does with these calls.

/// Receives per-item notifications for each batch of remote operations.
pub trait Progress {
    /// About to process `name`; `done` of `total` items in this batch are
    /// already complete.
    fn item(&mut self, done: usize, total: usize, name: &str);

    /// The current batch finished.
    fn end_batch(&mut self) {}
}

/// Discards all notifications.
#[derive(Debug, Default)]
pub struct NullProgress;

impl Progress for NullProgress {
    fn item(&mut self, _done: usize, _total: usize, _name: &str) {}
}
