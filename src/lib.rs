//! feedsub — cancellable, de-duplicating subscriptions to polled sources.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌──────────┐  fetch()   ┌─────────────────┐  Updates  ┌─────────┐
//! │  source/ │ ◄───────── │  subscribe.rs   │ ────────► │         │
//! │ (Fetch)  │  (task)    │  (loop task)    │           │         │
//! └──────────┘            └─────────────────┘           │ merge.rs│ ──► merged Updates
//! ┌──────────┐            ┌─────────────────┐  Updates  │         │
//! │  source/ │ ◄───────── │  subscribe.rs   │ ────────► │         │
//! └──────────┘            └─────────────────┘           └─────────┘
//! ```
//!
//! * **`source/`** — the [`Fetch`] trait and concrete implementations (RSS
//!   and a synthetic source).
//! * **`subscribe`** — one loop task per source: schedules fetches, drops
//!   duplicates, buffers up to [`SubscribeConfig::max_pending`] items and
//!   hands them to the consumer one at a time.
//! * **`merge`** — fans any number of subscriptions, merged ones included,
//!   into a single stream with the same close contract.
//! * **`subscription`** — the [`Subscription`] trait and the [`Updates`]
//!   stream both kinds share.
//!
//! ```no_run
//! use feedsub::{merge, subscribe, FakeSource, Subscription};
//! use futures::StreamExt;
//!
//! # async fn demo() {
//! let mut merged = merge([
//!     subscribe(FakeSource::new("blog.example.org")).boxed(),
//!     subscribe(FakeSource::new("news.example.org")).boxed(),
//! ]);
//! let mut updates = merged.updates();
//! while let Some(item) = updates.next().await {
//!     println!("{} {}", item.source_id, item.title);
//! #   break;
//! }
//! merged.close().await.ok();
//! # }
//! ```

pub mod config;
pub mod error;
pub mod item;
pub mod merge;
mod pending;
pub mod source;
pub mod subscribe;
pub mod subscription;

pub use config::SubscribeConfig;
pub use error::{Error, Result};
pub use item::Item;
pub use merge::{merge, MergedSubscription};
pub use source::{FakeSource, Fetch, FetchResult, RssSource};
pub use subscribe::{subscribe, subscribe_with, SourceSubscription};
pub use subscription::{Subscription, Updates};
