//! Drop guard for scope-exit cleanup.

/// Guard that runs cleanup when dropped.
///
/// Cleanup also runs when the owning future is dropped mid-await, which is
/// how an abandoned chain releases its registry entry.
pub struct CleanupGuard {
    cleanup: Option<Box<dyn FnOnce() + Send>>,
}

impl CleanupGuard {
    /// Creates a new cleanup guard.
    pub fn new<F>(cleanup: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            cleanup: Some(Box::new(cleanup)),
        }
    }

    /// Disarms the guard, preventing cleanup from running.
    pub fn disarm(&mut self) {
        self.cleanup = None;
    }

    /// Returns true while cleanup is still pending.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.cleanup.is_some()
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup();
        }
    }
}

impl std::fmt::Debug for CleanupGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanupGuard")
            .field("armed", &self.is_armed())
            .finish()
    }
}
