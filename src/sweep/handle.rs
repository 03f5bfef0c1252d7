use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Requests that a running sweep stop before it pulls the next object.
///
/// Clones share the same flag. Objects already being deleted finish; objects
/// not yet enumerated are left untouched.
#[derive(Debug, Clone, Default)]
pub struct SweepHandle {
    cancelled: Arc<AtomicBool>,
}

impl SweepHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Clears a previous cancellation so the deleter can run again.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_flag() {
        let handle = SweepHandle::new();
        let other = handle.clone();
        assert!(!handle.is_cancelled());

        other.cancel();
        assert!(handle.is_cancelled());

        handle.reset();
        assert!(!other.is_cancelled());
    }
}
