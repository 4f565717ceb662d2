//! Single-source subscriptions.
//!
//! [`subscribe`] spawns one task that owns a [`Fetch`] implementation and
//! everything the subscription knows: the pending queue, the seen set, the
//! next-attempt time and the last error.  The public handle only talks to
//! that task through channels, so there are no locks.
//!
//! Each turn of the loop waits for whichever of these happens first:
//!
//! * a close request (always honoured),
//! * the fetch timer, armed only while no fetch is in flight and the queue
//!   has room,
//! * completion of the fetch in flight,
//! * room in the one-item delivery slot, offered only while the queue is
//!   non-empty.  The head item moves into the slot and the consumer reads it
//!   from there.
//!
//! A full queue stops fetching, so a slow consumer throttles the source.  The
//! slot holds one item on top of the queue: with nobody reading, at most
//! `max_pending + 1` items are buffered.
//!
//! Fetch failures, including a panicking fetch, are retried after a fixed
//! backoff and only reported by [`SourceSubscription::close`].

use std::any::Any;
use std::panic::AssertUnwindSafe;

use anyhow::anyhow;
use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::config::SubscribeConfig;
use crate::error::{Error, Result};
use crate::item::Item;
use crate::pending::PendingQueue;
use crate::source::{Fetch, FetchResult};
use crate::subscription::{CloseAck, Closer, Subscription, Updates};

/// Subscribe to `fetcher` with the default [`SubscribeConfig`].
///
/// Must be called from within a tokio runtime; the first fetch starts
/// immediately.
pub fn subscribe(fetcher: impl Fetch + 'static) -> SourceSubscription {
    subscribe_with(fetcher, SubscribeConfig::default())
}

/// Subscribe to `fetcher` with explicit settings.
pub fn subscribe_with(fetcher: impl Fetch + 'static, config: SubscribeConfig) -> SourceSubscription {
    let name = fetcher.name().to_string();
    let (tx, rx) = mpsc::channel(1);
    let (closer, close_requests) = Closer::channel();
    let closed = CancellationToken::new();

    let fetch_loop = FetchLoop {
        name: name.clone(),
        fetcher: Some(Box::new(fetcher)),
        in_flight: None,
        pending: PendingQueue::new(config.max_pending),
        next_attempt_at: Instant::now(),
        last_error: None,
        config,
    };
    tokio::spawn(fetch_loop.run(tx, close_requests, closed.clone()));
    debug!(source = %name, "subscribed");

    SourceSubscription {
        name,
        updates: Some(Updates::new(rx, closed)),
        closer,
    }
}

/// Handle to a running single-source subscription.
#[derive(Debug)]
pub struct SourceSubscription {
    name: String,
    updates: Option<Updates>,
    closer: Closer,
}

impl SourceSubscription {
    /// Name of the underlying source.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Take the item stream.  Later calls return an exhausted stream.
    pub fn updates(&mut self) -> Updates {
        self.updates.take().unwrap_or_else(Updates::empty)
    }

    /// Stop the loop and return the last fetch error, if any.
    ///
    /// Returns as soon as the loop acknowledges, even with items queued, a
    /// fetch in flight or nobody reading the stream.
    pub async fn close(self) -> Result<()> {
        self.closer.close().await
    }
}

#[async_trait]
impl Subscription for SourceSubscription {
    fn updates(&mut self) -> Updates {
        SourceSubscription::updates(self)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        SourceSubscription::close(*self).await
    }
}

// ---------------------------------------------------------------------------
// Loop
// ---------------------------------------------------------------------------

/// What a fetch task hands back: the fetcher itself and its result.
type Completion = (Box<dyn Fetch>, anyhow::Result<FetchResult>);

struct FetchLoop {
    name: String,
    /// `None` while the fetcher is lent to the task in `in_flight`.
    fetcher: Option<Box<dyn Fetch>>,
    in_flight: Option<JoinHandle<Completion>>,
    pending: PendingQueue,
    next_attempt_at: Instant,
    last_error: Option<Error>,
    config: SubscribeConfig,
}

impl FetchLoop {
    async fn run(
        mut self,
        updates: mpsc::Sender<Item>,
        mut close_requests: oneshot::Receiver<CloseAck>,
        closed: CancellationToken,
    ) {
        loop {
            let can_fetch = self.fetcher.is_some() && self.pending.has_room();
            let can_deliver = !self.pending.is_empty() && !updates.is_closed();
            let fetching = self.in_flight.is_some();

            tokio::select! {
                request = &mut close_requests => {
                    closed.cancel();
                    self.shut_down(request.ok());
                    return;
                }
                () = time::sleep_until(self.next_attempt_at), if can_fetch => {
                    self.start_fetch();
                }
                done = completion(&mut self.in_flight), if fetching => {
                    self.in_flight = None;
                    self.finish_fetch(done);
                }
                permit = updates.reserve(), if can_deliver => {
                    // Err means the consumer dropped the stream; `is_closed`
                    // keeps delivery disabled from now on.
                    if let Ok(permit) = permit {
                        if let Some(item) = self.pending.pop_front() {
                            trace!(source = %self.name, identity = %item.identity, "delivering");
                            permit.send(item);
                        }
                    }
                }
            }
        }
    }

    fn start_fetch(&mut self) {
        let Some(mut fetcher) = self.fetcher.take() else {
            return;
        };
        debug!(source = %self.name, pending = self.pending.len(), "starting fetch");
        self.in_flight = Some(tokio::spawn(async move {
            let result = match AssertUnwindSafe(fetcher.fetch()).catch_unwind().await {
                Ok(result) => result,
                Err(panic) => Err(anyhow!("fetch panicked: {}", panic_message(&*panic))),
            };
            (fetcher, result)
        }));
    }

    fn finish_fetch(&mut self, done: Result<Completion, JoinError>) {
        let (fetcher, result) = match done {
            Ok(completion) => completion,
            Err(source) => {
                // Only reachable when the runtime shuts down under us.
                warn!(source = %self.name, error = %source, "fetch task cancelled; no further fetches");
                self.last_error = Some(Error::FetchTask {
                    source_name: self.name.clone(),
                    source,
                });
                return;
            }
        };
        self.fetcher = Some(fetcher);

        match result {
            Ok(batch) => {
                let admitted = self.pending.admit(batch.items);
                if admitted.deferred > 0 {
                    warn!(
                        source = %self.name,
                        deferred = admitted.deferred,
                        "queue full; deferring new items to a later fetch"
                    );
                }
                debug!(
                    source = %self.name,
                    queued = admitted.queued,
                    duplicates = admitted.duplicates,
                    "fetch finished"
                );
                self.next_attempt_at = batch.next_attempt_at;
            }
            Err(source) => {
                let message = format!("{source:#}");
                warn!(
                    source = %self.name,
                    error = %message,
                    retry_in = ?self.config.failure_backoff,
                    "fetch failed"
                );
                self.last_error = Some(Error::Fetch {
                    source_name: self.name.clone(),
                    source,
                });
                self.next_attempt_at = Instant::now() + self.config.failure_backoff;
            }
        }
    }

    /// Answer the close request, if the handle made one rather than being
    /// dropped.  A fetch still in flight is detached and its result lost.
    fn shut_down(&mut self, ack: Option<CloseAck>) {
        debug!(
            source = %self.name,
            pending = self.pending.len(),
            fetching = self.in_flight.is_some(),
            "closing"
        );
        let result = match self.last_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        };
        if let Some(ack) = ack {
            let _ = ack.send(result);
        }
    }
}

/// Resolves when the fetch in flight finishes; never resolves without one.
async fn completion(in_flight: &mut Option<JoinHandle<Completion>>) -> Result<Completion, JoinError> {
    match in_flight {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

fn panic_message<'a>(panic: &'a (dyn Any + Send + 'static)) -> &'a str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string payload"
    }
}
