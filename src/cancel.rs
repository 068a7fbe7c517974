use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use crate::error::{QueryError, QueryResult};

/// Cooperative cancellation token with an optional deadline.
/// Clones share the same flag, so any clone can cancel the query it was handed to.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
    deadline: Option<(Instant, Duration)>,
}

impl Cancellation {
    pub fn new() -> Self { Self::default() }

    /// A token that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { flag: Arc::default(), deadline: Some((Instant::now() + timeout, timeout)) }
    }

    /// A clone of this token that also expires `timeout` from now (the earlier deadline wins).
    pub fn child(&self, timeout: Option<Duration>) -> Self {
        let deadline = match (self.deadline, timeout) {
            (None, None) => None,
            (Some(d), None) => Some(d),
            (None, Some(t)) => Some((Instant::now() + t, t)),
            (Some(d), Some(t)) => Some(std::cmp::min_by_key(d, (Instant::now() + t, t), |(at, _)| *at)),
        };
        Self { flag: self.flag.clone(), deadline }
    }

    pub fn cancel(&self) { self.flag.store(true, Ordering::Relaxed) }

    #[inline]
    pub fn is_cancelled(&self) -> bool { self.flag.load(Ordering::Relaxed) }

    /// `Err(Cancelled)` once cancelled, `Err(DeadlineExceeded)` once past the deadline.
    #[inline]
    pub fn check(&self) -> QueryResult<()> {
        if self.is_cancelled() {
            return Err(QueryError::Cancelled);
        }
        match self.deadline {
            Some((at, timeout)) if Instant::now() >= at => Err(QueryError::DeadlineExceeded(timeout)),
            _ => Ok(()),
        }
    }
}
