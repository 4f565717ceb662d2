//! Synthetic source for demos and load experiments.
//!
//! Each fetch invents one new item and asks to be fetched again after a
//! random delay of 0, 0.5, 1, 1.5 or 2 seconds.

use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use rand::Rng;

use super::{Fetch, FetchResult};
use crate::item::Item;

/// Invents items named `Item 0`, `Item 1`, ... for one channel.
pub struct FakeSource {
    channel: String,
    history: Vec<Item>,
    duplicates: bool,
    fail_every: Option<u32>,
    attempts: u32,
}

impl FakeSource {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            history: Vec::new(),
            duplicates: false,
            fail_every: None,
            attempts: 0,
        }
    }

    /// Return the whole history on every fetch instead of only the new item.
    pub fn with_duplicates(mut self, duplicates: bool) -> Self {
        self.duplicates = duplicates;
        self
    }

    /// Fail every `n`-th fetch. `0` disables failures.
    pub fn fail_every(mut self, n: u32) -> Self {
        self.fail_every = (n > 0).then_some(n);
        self
    }

    fn random_delay() -> Duration {
        Duration::from_millis(rand::rng().random_range(0..5u64) * 500)
    }
}

#[async_trait]
impl Fetch for FakeSource {
    fn name(&self) -> &str {
        &self.channel
    }

    async fn fetch(&mut self) -> Result<FetchResult> {
        self.attempts += 1;
        if let Some(n) = self.fail_every {
            if self.attempts % n == 0 {
                bail!("simulated outage on attempt {}", self.attempts);
            }
        }

        let title = format!("Item {}", self.history.len());
        let identity = format!("{}/{}", self.channel, title);
        let item = Item::new(&self.channel, title, identity);
        self.history.push(item.clone());

        let items = if self.duplicates {
            self.history.clone()
        } else {
            vec![item]
        };
        Ok(FetchResult::after(items, Self::random_delay()))
    }
}
