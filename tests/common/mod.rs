//! Test doubles shared by the integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::time::Instant;

use feedsub::{Error, Fetch, FetchResult, Item, Subscription, Updates};

/// Shorthand constructor for tests.
pub fn make_item(source: &str, identity: &str) -> Item {
    Item::new(source, format!("title {identity}"), identity)
}

/// One scripted fetch outcome.
pub enum Step {
    Items(Vec<&'static str>, Duration),
    Fail(&'static str),
    /// Panics with the given message.
    Panic(&'static str),
    /// Never completes.
    Hang,
}

/// Replays a fixed script of fetch outcomes.  Once the script runs out every
/// fetch returns nothing and asks to be called again in an hour.
pub struct ScriptedSource {
    name: String,
    steps: VecDeque<Step>,
    fetches: Arc<Mutex<Vec<Instant>>>,
}

impl ScriptedSource {
    pub fn new(name: &str, steps: Vec<Step>) -> Self {
        Self {
            name: name.to_string(),
            steps: steps.into(),
            fetches: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Times at which fetches started, shared with the source.
    pub fn fetch_log(&self) -> Arc<Mutex<Vec<Instant>>> {
        Arc::clone(&self.fetches)
    }
}

#[async_trait]
impl Fetch for ScriptedSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&mut self) -> Result<FetchResult> {
        self.fetches.lock().unwrap().push(Instant::now());
        match self.steps.pop_front() {
            Some(Step::Items(identities, delay)) => {
                let items = identities
                    .into_iter()
                    .map(|id| make_item(&self.name, id))
                    .collect();
                Ok(FetchResult::after(items, delay))
            }
            Some(Step::Fail(message)) => Err(anyhow!(message)),
            Some(Step::Panic(message)) => panic!("{message}"),
            Some(Step::Hang) => std::future::pending().await,
            None => Ok(FetchResult::after(Vec::new(), Duration::from_secs(3600))),
        }
    }
}

/// Returns a fresh batch of `batch` never-seen items on every fetch,
/// immediately ready for the next one.
pub struct EndlessSource {
    name: String,
    batch: usize,
    next: usize,
    fetches: Arc<Mutex<usize>>,
}

impl EndlessSource {
    pub fn new(name: &str, batch: usize) -> Self {
        Self {
            name: name.to_string(),
            batch,
            next: 0,
            fetches: Arc::new(Mutex::new(0)),
        }
    }

    pub fn fetch_count(&self) -> Arc<Mutex<usize>> {
        Arc::clone(&self.fetches)
    }
}

#[async_trait]
impl Fetch for EndlessSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&mut self) -> Result<FetchResult> {
        *self.fetches.lock().unwrap() += 1;
        let items = (self.next..self.next + self.batch)
            .map(|n| Item::new(&self.name, format!("Item {n}"), n.to_string()))
            .collect();
        self.next += self.batch;
        Ok(FetchResult::after(items, Duration::ZERO))
    }
}

/// A subscription with no items whose close takes `delay` and then fails.
pub struct SlowClose {
    pub name: &'static str,
    pub delay: Duration,
}

#[async_trait]
impl Subscription for SlowClose {
    fn updates(&mut self) -> Updates {
        Updates::empty()
    }

    async fn close(self: Box<Self>) -> feedsub::Result<()> {
        tokio::time::sleep(self.delay).await;
        Err(Error::Fetch {
            source_name: self.name.to_string(),
            source: anyhow!("slow close"),
        })
    }
}
