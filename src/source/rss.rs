//! RSS feed source implementation.
//!
//! This module shows how to implement the [`Fetch`] trait for a concrete
//! feed format.  Use it as a template when adding support for Atom, JSON Feed,
//! or any other format.
//!
//! The feed's own `<ttl>` (minutes) decides when it is fetched next; feeds
//! without one are polled every [`DEFAULT_POLL_INTERVAL`].

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use super::{Fetch, FetchResult};
use crate::item::Item;

/// Poll interval for feeds that do not advertise a `<ttl>`.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Upper bound on a feed-supplied `<ttl>`.
pub const MAX_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// An RSS feed source.
///
/// Fetches and parses an RSS 2.0 feed over HTTP using the [`rss`] crate.
pub struct RssSource {
    /// The feed URL to poll.
    pub url: String,
    /// Label stamped on every item as its `source_id`.
    pub label: String,
    poll_interval: Duration,
    client: reqwest::Client,
}

impl RssSource {
    /// Create a new RSS source.
    ///
    /// # Arguments
    ///
    /// * `url` — full URL of the RSS feed (e.g.
    ///   `https://feeds.bbci.co.uk/news/rss.xml`).
    /// * `label` — short name recorded as each item's `source_id`.
    pub fn new(url: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            label: label.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            client: reqwest::Client::new(),
        }
    }

    /// Override the fallback poll interval used when the feed has no `<ttl>`.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Parse an already-fetched [`rss::Channel`] into [`Item`]s.
    ///
    /// This is a pure function (no I/O) so that tests can exercise the
    /// parsing logic without hitting the network.
    pub fn parse_channel(channel: &rss::Channel, label: &str) -> Vec<Item> {
        channel
            .items()
            .iter()
            .map(|item| {
                // Prefer <guid>, fall back to <link>, then empty string.
                let identity = item
                    .guid()
                    .map(|g| g.value().to_string())
                    .or_else(|| item.link().map(String::from))
                    .unwrap_or_default();

                // Parse RFC-2822 date; gracefully degrade to None on failure.
                let published = item
                    .pub_date()
                    .and_then(|d| DateTime::parse_from_rfc2822(d).ok())
                    .map(|dt| dt.with_timezone(&Utc));

                Item {
                    title: item.title().unwrap_or("(untitled)").to_string(),
                    source_id: label.to_string(),
                    identity,
                    published,
                }
            })
            .collect()
    }

    /// Delay until the next fetch: the channel's `<ttl>` if it parses as a
    /// whole number of minutes, otherwise `fallback`.  The ttl comes from the
    /// remote server, so it is capped at [`MAX_TTL`].
    pub fn next_delay(channel: &rss::Channel, fallback: Duration) -> Duration {
        channel
            .ttl()
            .and_then(|ttl| ttl.trim().parse::<u64>().ok())
            .map(|minutes| {
                minutes
                    .checked_mul(60)
                    .map_or(MAX_TTL, Duration::from_secs)
                    .min(MAX_TTL)
            })
            .unwrap_or(fallback)
    }
}

#[async_trait]
impl Fetch for RssSource {
    fn name(&self) -> &str {
        &self.label
    }

    async fn fetch(&mut self) -> Result<FetchResult> {
        let body = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .with_context(|| format!("requesting {}", self.url))?
            .bytes()
            .await
            .with_context(|| format!("reading body of {}", self.url))?;
        let channel = rss::Channel::read_from(body.as_ref())
            .with_context(|| format!("parsing feed at {}", self.url))?;

        let items = Self::parse_channel(&channel, &self.label);
        let delay = Self::next_delay(&channel, self.poll_interval);
        debug!(feed = %self.label, items = items.len(), ?delay, "parsed feed");
        Ok(FetchResult::after(items, delay))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_channel_extracts_items() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test Feed</title>
    <item>
      <title>First Post</title>
      <link>https://example.com/1</link>
      <guid>guid-1</guid>
      <pubDate>Mon, 01 Jan 2024 00:00:00 +0000</pubDate>
    </item>
    <item>
      <title>Second Post</title>
      <link>https://example.com/2</link>
      <guid>guid-2</guid>
    </item>
  </channel>
</rss>"#;

        let channel = rss::Channel::read_from(xml.as_bytes()).unwrap();
        let items = RssSource::parse_channel(&channel, "TestFeed");

        assert_eq!(items.len(), 2);

        assert_eq!(items[0].identity, "guid-1");
        assert_eq!(items[0].title, "First Post");
        assert_eq!(items[0].source_id, "TestFeed");
        assert!(items[0].published.is_some());

        assert_eq!(items[1].identity, "guid-2");
        assert_eq!(items[1].title, "Second Post");
        assert!(items[1].published.is_none());
    }

    #[test]
    fn falls_back_to_link_when_no_guid() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test</title>
    <item>
      <title>No GUID</title>
      <link>https://example.com/no-guid</link>
    </item>
  </channel>
</rss>"#;

        let channel = rss::Channel::read_from(xml.as_bytes()).unwrap();
        let items = RssSource::parse_channel(&channel, "t");

        assert_eq!(items[0].identity, "https://example.com/no-guid");
    }

    #[test]
    fn missing_guid_and_link_gives_empty_identity() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test</title>
    <item>
      <title>Anonymous</title>
    </item>
  </channel>
</rss>"#;

        let channel = rss::Channel::read_from(xml.as_bytes()).unwrap();
        let items = RssSource::parse_channel(&channel, "t");

        assert_eq!(items[0].identity, "");
    }

    #[test]
    fn handles_missing_title() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test</title>
    <item>
      <guid>g1</guid>
    </item>
  </channel>
</rss>"#;

        let channel = rss::Channel::read_from(xml.as_bytes()).unwrap();
        let items = RssSource::parse_channel(&channel, "t");

        assert_eq!(items[0].title, "(untitled)");
    }

    #[test]
    fn handles_invalid_date() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test</title>
    <item>
      <guid>g1</guid>
      <title>Bad Date</title>
      <pubDate>not-a-real-date</pubDate>
    </item>
  </channel>
</rss>"#;

        let channel = rss::Channel::read_from(xml.as_bytes()).unwrap();
        let items = RssSource::parse_channel(&channel, "t");

        assert!(items[0].published.is_none());
    }

    #[test]
    fn next_delay_uses_ttl_minutes() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test</title>
    <ttl>15</ttl>
  </channel>
</rss>"#;

        let channel = rss::Channel::read_from(xml.as_bytes()).unwrap();
        let delay = RssSource::next_delay(&channel, DEFAULT_POLL_INTERVAL);

        assert_eq!(delay, Duration::from_secs(15 * 60));
    }

    #[test]
    fn next_delay_falls_back_without_usable_ttl() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test</title>
    <ttl>soon</ttl>
  </channel>
</rss>"#;

        let channel = rss::Channel::read_from(xml.as_bytes()).unwrap();
        let fallback = Duration::from_secs(42);

        assert_eq!(RssSource::next_delay(&channel, fallback), fallback);
    }

    #[test]
    fn next_delay_caps_huge_ttl() {
        for ttl in ["200000000000000000", "18446744073709551615", "20160"] {
            let xml = format!(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test</title>
    <ttl>{ttl}</ttl>
  </channel>
</rss>"#
            );

            let channel = rss::Channel::read_from(xml.as_bytes()).unwrap();
            let delay = RssSource::next_delay(&channel, DEFAULT_POLL_INTERVAL);

            assert_eq!(delay, MAX_TTL, "ttl {ttl} should be capped");
        }
    }

    #[test]
    fn name_returns_label() {
        let src = RssSource::new("http://example.com/feed", "My Feed");
        assert_eq!(src.name(), "My Feed");
    }
}
