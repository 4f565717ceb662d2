use thiserror::Error;
use tokio::task::JoinError;

/// Errors surfaced by [`Subscription::close`](crate::Subscription::close).
#[derive(Debug, Error)]
pub enum Error {
    /// The most recent fetch of a source failed or panicked.
    #[error("fetch from `{source_name}` failed")]
    Fetch {
        source_name: String,
        #[source]
        source: anyhow::Error,
    },

    /// The task running a fetch was cancelled by a runtime shutdown.  The
    /// fetcher went down with the task, so the subscription stops fetching.
    #[error("fetch task for `{source_name}` did not complete")]
    FetchTask {
        source_name: String,
        #[source]
        source: JoinError,
    },

    /// A merge forwarder task panicked.
    #[error("merge forwarder did not complete")]
    Forwarder(#[source] JoinError),

    /// The subscription's task exited without acknowledging the close request.
    #[error("subscription task exited before acknowledging close")]
    Detached,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
