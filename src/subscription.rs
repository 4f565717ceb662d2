//! The contract shared by single-source and merged subscriptions.
//!
//! A subscription hands out its item stream once through
//! [`Subscription::updates`] and is shut down by consuming it with
//! [`Subscription::close`].  Because `close` takes the subscription by value a
//! second close cannot be written; dropping the handle has the same effect as
//! closing it and discarding the result.

use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::Stream;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::item::Item;

/// A cancellable source of [`Item`]s.
#[async_trait]
pub trait Subscription: Send {
    /// Take the item stream.
    ///
    /// The stream is not restartable: only the first call returns the live
    /// stream, later calls return one that is already exhausted.  The consumer
    /// has to keep draining it, otherwise the producer stalls.
    fn updates(&mut self) -> Updates;

    /// Stop the subscription and wait until it has stopped.
    ///
    /// Returns the error the subscription recorded, if any.  Once this
    /// returns, the stream yields no further items.
    async fn close(self: Box<Self>) -> Result<()>;

    fn boxed(self) -> Box<dyn Subscription>
    where
        Self: Sized + 'static,
    {
        Box::new(self)
    }
}

// ---------------------------------------------------------------------------
// Item stream
// ---------------------------------------------------------------------------

/// Stream of items delivered by a subscription.
///
/// Items arrive through a one-slot channel.  The producer marks the stream
/// closed before it acknowledges a close request, and from then on the stream
/// ends even if an item is still sitting in the slot.
#[derive(Debug)]
pub struct Updates {
    rx: Option<mpsc::Receiver<Item>>,
    closed: CancellationToken,
}

impl Updates {
    pub(crate) fn new(rx: mpsc::Receiver<Item>, closed: CancellationToken) -> Self {
        Self {
            rx: Some(rx),
            closed,
        }
    }

    /// A stream that has already ended.
    pub fn empty() -> Self {
        Self {
            rx: None,
            closed: CancellationToken::new(),
        }
    }
}

impl Stream for Updates {
    type Item = Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Item>> {
        if self.closed.is_cancelled() {
            self.rx = None;
            return Poll::Ready(None);
        }
        let Some(rx) = self.rx.as_mut() else {
            return Poll::Ready(None);
        };
        match rx.poll_recv(cx) {
            Poll::Ready(None) => {
                self.rx = None;
                Poll::Ready(None)
            }
            other => other,
        }
    }
}

// ---------------------------------------------------------------------------
// Close rendezvous
// ---------------------------------------------------------------------------

/// Reply slot the owning task answers a close request on.
pub(crate) type CloseAck = oneshot::Sender<Result<()>>;

/// Caller side of the close request/response rendezvous.
#[derive(Debug)]
pub(crate) struct Closer {
    request: oneshot::Sender<CloseAck>,
}

impl Closer {
    /// Returns the closer and the receiver the owning task listens on.  The
    /// receiver resolves to `Err` when the closer is dropped unused.
    pub(crate) fn channel() -> (Self, oneshot::Receiver<CloseAck>) {
        let (request, requests) = oneshot::channel();
        (Self { request }, requests)
    }

    pub(crate) async fn close(self) -> Result<()> {
        let (ack, reply) = oneshot::channel();
        self.request.send(ack).map_err(|_| Error::Detached)?;
        reply.await.map_err(|_| Error::Detached)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn empty_stream_is_exhausted() {
        let mut updates = Updates::empty();
        assert!(updates.next().await.is_none());
        assert!(updates.next().await.is_none());
    }

    #[tokio::test]
    async fn closed_stream_hides_buffered_item() {
        let (tx, rx) = mpsc::channel(1);
        let closed = CancellationToken::new();
        let mut updates = Updates::new(rx, closed.clone());

        tx.send(Item::new("s", "t", "i")).await.unwrap();
        closed.cancel();

        assert!(updates.next().await.is_none());
    }

    #[tokio::test]
    async fn stream_ends_when_producer_goes_away() {
        let (tx, rx) = mpsc::channel(1);
        let mut updates = Updates::new(rx, CancellationToken::new());

        tx.send(Item::new("s", "t", "i")).await.unwrap();
        drop(tx);

        assert_eq!(updates.next().await.map(|i| i.identity), Some("i".into()));
        assert!(updates.next().await.is_none());
    }

    #[tokio::test]
    async fn close_reports_owner_reply() {
        let (closer, requests) = Closer::channel();
        tokio::spawn(async move {
            if let Ok(ack) = requests.await {
                let _ = ack.send(Err(Error::Detached));
            }
        });

        assert!(matches!(closer.close().await, Err(Error::Detached)));
    }

    #[tokio::test]
    async fn close_without_owner_is_detached() {
        let (closer, requests) = Closer::channel();
        drop(requests);

        assert!(matches!(closer.close().await, Err(Error::Detached)));
    }
}
