//! The item type every source produces.
//!
//! `Item` is the unit a subscription delivers.  Every [`Fetch`] implementation
//! converts its native format into `Item`s so the scheduling, de-duplication
//! and merging code can stay source-agnostic.
//!
//! ## For contributors
//!
//! If you are adding a new source you do **not** need to modify this file
//! unless your source requires extra fields.  Just construct `Item` values in
//! your source's `fetch()` implementation.
//!
//! [`Fetch`]: crate::source::Fetch

use chrono::{DateTime, Utc};

/// A single entry, normalised from any source.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Item {
    /// Human-readable headline.
    pub title: String,

    /// Name of the source this came from (e.g. the feed's label or domain).
    pub source_id: String,

    /// Key used for de-duplication within one subscription.
    ///
    /// For RSS this is the `<guid>` element (falling back to `<link>`).
    /// Identities are compared literally: two items with an empty identity
    /// are duplicates of each other.
    pub identity: String,

    /// Publication timestamp, if the source provided one.
    ///
    /// Informational only; delivery order is fetch order, not date order.
    pub published: Option<DateTime<Utc>>,
}

impl Item {
    pub fn new(
        source_id: impl Into<String>,
        title: impl Into<String>,
        identity: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            source_id: source_id.into(),
            identity: identity.into(),
            published: None,
        }
    }

    pub fn with_published(mut self, published: DateTime<Utc>) -> Self {
        self.published = Some(published);
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
