use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{DagError, DagResult};

/// Shared cancellation flag for in-flight builds and reads.
///
/// Clones observe the same flag. Once cancelled, a builder or reader issues
/// no further store calls and returns [`DagError::Cancelled`].
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// A token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// `Err(Cancelled)` once cancellation has been requested.
    pub fn check(&self) -> DagResult<()> {
        if self.is_cancelled() {
            Err(DagError::Cancelled)
        } else {
            Ok(())
        }
    }
}
