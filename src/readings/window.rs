use chrono::{DateTime, TimeDelta, Utc};

/// Which slice of the reading history a query aggregates over.
/// There is no default: callers always state the window they mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    /// Every reading with `start <= observed_at < end`.
    Range { start: DateTime<Utc>, end: DateTime<Utc> },
    /// Only the most recent observation batch no older than `max_age` at `as_of`.
    LatestBatch { as_of: DateTime<Utc>, max_age: TimeDelta },
}

/// A window resolved against the batches a source actually holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFilter {
    Range { start: DateTime<Utc>, end: DateTime<Utc> },
    Batch(DateTime<Utc>),
}

impl TimeWindow {
    #[inline]
    pub fn range(start: DateTime<Utc>, end: DateTime<Utc>) -> Self { TimeWindow::Range { start, end } }

    #[inline]
    pub fn latest(as_of: DateTime<Utc>, max_age: TimeDelta) -> Self { TimeWindow::LatestBatch { as_of, max_age } }

    /// The `duration` leading up to `as_of`.
    #[inline]
    pub fn trailing(duration: TimeDelta, as_of: DateTime<Utc>) -> Self {
        TimeWindow::Range { start: as_of - duration, end: as_of }
    }

    /// Resolve against a source's sorted, de-duplicated batch timestamps.
    /// Returns `None` when nothing can match (empty range, or no batch fresh enough).
    pub fn resolve(&self, batches: &[DateTime<Utc>]) -> Option<TimeFilter> {
        match *self {
            TimeWindow::Range { start, end } => (start < end).then_some(TimeFilter::Range { start, end }),
            TimeWindow::LatestBatch { as_of, max_age } => {
                // Last batch at or before `as_of`.
                let upto = batches.partition_point(|&t| t <= as_of);
                let latest = *batches[..upto].last()?;
                (as_of - latest <= max_age).then_some(TimeFilter::Batch(latest))
            }
        }
    }
}

impl TimeFilter {
    #[inline]
    pub fn contains(&self, observed_at: DateTime<Utc>) -> bool {
        match *self {
            TimeFilter::Range { start, end } => start <= observed_at && observed_at < end,
            TimeFilter::Batch(batch) => observed_at == batch,
        }
    }
}
