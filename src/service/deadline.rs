//! Query deadlines and last-request-wins cancellation

use crate::error::{AppError, Result};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Time budget for a single database call
#[derive(Debug, Clone, Copy)]
pub struct QueryDeadline {
    budget: Duration,
}

impl QueryDeadline {
    pub fn new(budget: Duration) -> Self {
        Self { budget }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    fn budget_ms(&self) -> u64 {
        u64::try_from(self.budget.as_millis()).unwrap_or(u64::MAX)
    }

    /// Drive `fut` until it completes, the budget runs out, or `cancel` fires.
    ///
    /// On expiry or cancellation `fut` is dropped, which releases any pooled
    /// connection it holds.
    pub async fn run<F, T>(&self, cancel: &CancellationToken, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AppError::Superseded),
            outcome = tokio::time::timeout(self.budget, fut) => match outcome {
                Ok(result) => result,
                Err(_) => Err(AppError::QueryTimeout(self.budget_ms())),
            },
        }
    }
}

/// Registry of searches still running, one per key
#[derive(Debug, Default)]
pub struct InFlightSearches {
    entries: Mutex<HashMap<String, (u64, CancellationToken)>>,
    generation: AtomicU64,
}

impl InFlightSearches {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, (u64, CancellationToken)>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a search under `key`, cancelling the one it replaces
    pub fn begin(&self, key: impl Into<String>) -> SearchTicket<'_> {
        let key = key.into();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();

        let replaced = self
            .lock()
            .insert(key.clone(), (generation, token.clone()));
        if let Some((_, previous)) = replaced {
            tracing::debug!(key = %key, "Cancelling superseded search");
            previous.cancel();
        }

        SearchTicket {
            registry: self,
            key,
            generation,
            token,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Registration of one running search; deregisters on drop
#[derive(Debug)]
pub struct SearchTicket<'a> {
    registry: &'a InFlightSearches,
    key: String,
    generation: u64,
    token: CancellationToken,
}

impl SearchTicket<'_> {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for SearchTicket<'_> {
    fn drop(&mut self) {
        let mut entries = self.registry.lock();
        // A newer search may already own the key
        if entries
            .get(&self.key)
            .is_some_and(|(generation, _)| *generation == self.generation)
        {
            entries.remove(&self.key);
        }
    }
}
