use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// Request-scoped time budget shared by cache lookups and the store query
/// that follows a miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(Instant);

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self(Instant::now() + budget)
    }

    /// Time left before the deadline, zero once it has passed.
    pub fn remaining(&self) -> Duration {
        self.0.saturating_duration_since(Instant::now())
    }

    /// Runs `fut`, giving up at the deadline or after `cap`, whichever is
    /// sooner.
    pub async fn bound<F: Future>(
        &self,
        cap: Duration,
        fut: F,
    ) -> Result<F::Output, tokio::time::error::Elapsed> {
        tokio::time::timeout(self.remaining().min(cap), fut).await
    }
}
