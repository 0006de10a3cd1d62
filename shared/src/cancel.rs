use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Cooperative cancellation flag shared between a task and whoever replaced it.
///
/// Cancelling never interrupts anything by itself; the task checks
/// [`is_cancelled`](Self::is_cancelled) after each await point or races
/// [`cancelled`](Self::cancelled) against a timer.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    generation: u64,
    tx: Arc<watch::Sender<bool>>,
}

impl CancellationToken {
    fn new(generation: u64) -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            generation,
            tx: Arc::new(tx),
        }
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once the token is cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Holds the single outstanding task of one category (fetch, search).
///
/// Starting a new task cancels the one it replaces.
#[derive(Debug, Default)]
pub struct TaskSlot {
    next_generation: AtomicU64,
    current: Mutex<Option<CancellationToken>>,
}

impl TaskSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the current task, if any, and installs a fresh token.
    pub fn replace(&self) -> CancellationToken {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        let token = CancellationToken::new(generation);
        let mut current = self
            .current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(previous) = current.replace(token.clone()) {
            previous.cancel();
        }
        token
    }

    /// Cancels the current task and leaves the slot empty. Returns whether one was running.
    pub fn cancel(&self) -> bool {
        let previous = self
            .current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        match previous {
            Some(token) if !token.is_cancelled() => {
                token.cancel();
                true
            }
            Some(_) | None => false,
        }
    }

    /// Clears the slot if `token` is still the one installed.
    pub fn finish(&self, token: &CancellationToken) {
        let mut current = self
            .current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if current
            .as_ref()
            .is_some_and(|t| t.generation() == token.generation())
        {
            *current = None;
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .as_ref()
            .is_some_and(|t| !t.is_cancelled())
    }
}
