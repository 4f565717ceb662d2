//! Fan-in of many subscriptions into one.
//!
//! ```text
//!   child 0 ──► forwarder 0 ──┐
//!   child 1 ──► forwarder 1 ──┼──► merged Updates
//!   child N ──► forwarder N ──┘
//!                  ▲
//!                  │ cancel (broadcast)
//!             supervisor ◄── close()
//! ```
//!
//! Forwarders only ever close their own child.  The supervisor cancels them
//! all at once, waits for every one of them to finish, and only then marks
//! the merged stream closed and answers the caller.  Shutdown therefore takes
//! as long as the slowest child, not the sum of all of them.

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Error, Result};
use crate::item::Item;
use crate::subscription::{CloseAck, Closer, Subscription, Updates};

/// Merge `subs` into one subscription.
///
/// Items from different children interleave in no particular order; items
/// from the same child keep their order.  Identities are not de-duplicated
/// across children.
///
/// Must be called from within a tokio runtime unless `subs` is empty.
pub fn merge<I>(subs: I) -> MergedSubscription
where
    I: IntoIterator<Item = Box<dyn Subscription>>,
{
    let children: Vec<_> = subs.into_iter().collect();
    if children.is_empty() {
        return MergedSubscription {
            children: 0,
            updates: Some(Updates::empty()),
            closer: None,
        };
    }

    let count = children.len();
    let (tx, rx) = mpsc::channel(1);
    let cancel = CancellationToken::new();
    let output_closed = CancellationToken::new();

    let mut forwarders = JoinSet::new();
    for (index, child) in children.into_iter().enumerate() {
        forwarders.spawn(forward(index, child, tx.clone(), cancel.clone()));
    }
    // Only the forwarders hold senders now, so the output ends with them.
    drop(tx);

    let (closer, close_requests) = Closer::channel();
    tokio::spawn(supervise(forwarders, close_requests, cancel, output_closed.clone()));
    debug!(children = count, "merged subscriptions");

    MergedSubscription {
        children: count,
        updates: Some(Updates::new(rx, output_closed)),
        closer: Some(closer),
    }
}

/// Handle to a merged subscription.
#[derive(Debug)]
pub struct MergedSubscription {
    children: usize,
    updates: Option<Updates>,
    /// `None` for a merge of nothing.
    closer: Option<Closer>,
}

impl MergedSubscription {
    /// Number of children merged.
    pub fn len(&self) -> usize {
        self.children
    }

    pub fn is_empty(&self) -> bool {
        self.children == 0
    }

    /// Take the merged stream.  Later calls return an exhausted stream.
    pub fn updates(&mut self) -> Updates {
        self.updates.take().unwrap_or_else(Updates::empty)
    }

    /// Close every child and wait for all forwarding to stop.
    ///
    /// Returns the first error any child reported on close, in the order
    /// the children finished closing.
    pub async fn close(self) -> Result<()> {
        match self.closer {
            Some(closer) => closer.close().await,
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Subscription for MergedSubscription {
    fn updates(&mut self) -> Updates {
        MergedSubscription::updates(self)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        MergedSubscription::close(*self).await
    }
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

async fn supervise(
    mut forwarders: JoinSet<Result<()>>,
    close_requests: oneshot::Receiver<CloseAck>,
    cancel: CancellationToken,
    output_closed: CancellationToken,
) {
    // A dropped handle shuts the merge down just like a close request.
    let ack = close_requests.await.ok();
    cancel.cancel();

    let mut first_error = None;
    while let Some(joined) = forwarders.join_next().await {
        let result = joined.unwrap_or_else(|err| Err(Error::Forwarder(err)));
        if let Err(err) = result {
            if first_error.is_none() {
                first_error = Some(err);
            } else {
                debug!(error = %err, "discarding additional close error");
            }
        }
    }

    output_closed.cancel();
    debug!(failed = first_error.is_some(), "merge closed");
    if let Some(ack) = ack {
        let _ = ack.send(first_error.map_or(Ok(()), Err));
    }
}

/// Copy items from `child` into `out` until cancelled, then close `child`.
async fn forward(
    index: usize,
    mut child: Box<dyn Subscription>,
    out: mpsc::Sender<Item>,
    cancel: CancellationToken,
) -> Result<()> {
    let mut updates = child.updates();
    loop {
        let next = tokio::select! {
            () = cancel.cancelled() => break,
            next = updates.next() => next,
        };
        let Some(item) = next else {
            // The child ended on its own; keep it until we are told to close it.
            debug!(child = index, "child stream ended");
            cancel.cancelled().await;
            break;
        };
        tokio::select! {
            () = cancel.cancelled() => break,
            sent = out.send(item) => {
                if sent.is_err() {
                    // Nobody is reading the merged stream any more.
                    cancel.cancelled().await;
                    break;
                }
            }
        }
    }
    drop(updates);
    child.close().await
}
