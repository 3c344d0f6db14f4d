use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation handle shared between a caller and a
/// long-running operation (fetch, push, GC, repack).
///
/// Cancellation is checked at coarse-grained boundaries — per object in the
/// pack writer, per command in receive-pack, per ref in a ref-advertisement
/// list — rather than preemptively, so callers don't need `async`/threads to
/// participate. `cancel()` can be called from another thread (e.g. a signal
/// handler or a UI "stop" button); `is_cancelled()`/`check()` are what the
/// operation itself polls.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// A fresh, not-yet-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent; safe to call from any thread.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether `cancel()` has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Return [`Cancelled`] if the token has been cancelled, otherwise `Ok(())`.
    /// Intended for `token.check()?` at a loop's coarse-grained boundary.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Marker error for a cooperative cancellation point. Callers convert this
/// into their own error type's `Cancelled` variant via `#[from]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation cancelled")]
pub struct Cancelled;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_is_not_cancelled() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        assert!(token.check().is_ok());
    }

    #[test]
    fn cancel_is_visible_through_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(token.check(), Err(Cancelled)));
    }
}
