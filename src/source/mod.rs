//! Fetch capability abstraction.
//!
//! This module defines the [`Fetch`] trait and [`FetchResult`].  Concrete
//! sources live in sub-modules: [`rss`] for real feeds and [`fake`] for
//! synthetic items.
//!
//! ## For contributors — adding a new source
//!
//! 1. Create a new file in this directory (e.g. `atom.rs`).
//! 2. Define a struct (e.g. `AtomSource`) and implement [`Fetch`] for it.
//! 3. Add `mod atom;` below and re-export your struct in the `pub use` block.
//! 4. Hand an instance to [`crate::subscribe`].
//!
//! Scheduling, de-duplication, buffering and merging are all source-agnostic.

mod fake;
mod rss;

pub use fake::FakeSource;
pub use rss::RssSource;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::time::Instant;

use crate::item::Item;

/// One successful fetch: a batch of items and when to fetch next.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// Items in the order the source returned them.
    pub items: Vec<Item>,
    /// Earliest time the next fetch should start.  A time in the past means
    /// "as soon as possible".
    pub next_attempt_at: Instant,
}

impl FetchResult {
    pub fn new(items: Vec<Item>, next_attempt_at: Instant) -> Self {
        Self {
            items,
            next_attempt_at,
        }
    }

    /// Batch whose next attempt is `delay` from now.  Delays too large to
    /// represent saturate at [`FAR_FUTURE`] from now.
    pub fn after(items: Vec<Item>, delay: Duration) -> Self {
        Self::new(items, Instant::now() + delay.min(FAR_FUTURE))
    }
}

/// Longest delay [`FetchResult::after`] will schedule (about 30 years).
pub const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Trait that every source must implement.
///
/// A subscription runs [`fetch()`](Fetch::fetch) on its own task, never more
/// than one at a time, so implementations may keep mutable state between
/// calls and must be [`Send`].
///
/// ## Implementing a new source
///
/// ```ignore
/// pub struct MySource { /* config fields */ }
///
/// #[async_trait]
/// impl Fetch for MySource {
///     fn name(&self) -> &str { "my-source" }
///
///     async fn fetch(&mut self) -> anyhow::Result<FetchResult> {
///         // Perform HTTP / IO, then convert into Item values.
///         todo!()
///     }
/// }
/// ```
#[async_trait]
pub trait Fetch: Send {
    /// Human-readable label used in logs and errors.
    fn name(&self) -> &str;

    /// Fetch the latest batch of items.
    ///
    /// An `Err` is a transient failure: the subscription remembers it, waits
    /// out the failure backoff and tries again.
    async fn fetch(&mut self) -> Result<FetchResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn after_saturates_huge_delays() {
        let before = Instant::now();
        let batch = FetchResult::after(Vec::new(), Duration::MAX);

        assert!(batch.next_attempt_at >= before + FAR_FUTURE);
    }
}
