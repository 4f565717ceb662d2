//! feedsub demo — subscribe to feeds, merge them, print what arrives.
//!
//! With no URLs it subscribes to three synthetic sources, prints their
//! merged stream for a few seconds and then closes everything, reporting
//! the first error any source hit.

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use futures::StreamExt;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use feedsub::{merge, subscribe_with, FakeSource, RssSource, SubscribeConfig, Subscription};

const DEFAULT_FAKE_CHANNELS: [&str; 3] = [
    "blog.golang.org",
    "googleblog.blogspot.com",
    "googledevelopers.blogspot.com",
];

/// Print a merged, de-duplicated stream of feed items
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// RSS feed URLs; synthetic sources are used when none are given
    feeds: Vec<String>,

    /// Make synthetic sources resend their whole history on every fetch
    #[arg(long)]
    duplicates: bool,

    /// Make every n-th synthetic fetch fail (0 disables)
    #[arg(long, default_value_t = 0)]
    fail_every: u32,

    /// Seconds to run before closing; 0 runs until Ctrl-C
    #[arg(long, default_value_t = 3)]
    run_for: u64,

    /// Items buffered per source before fetching pauses
    #[arg(long, default_value_t = feedsub::config::DEFAULT_MAX_PENDING)]
    max_pending: usize,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("feedsub={}", args.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // -- configure subscriptions ---------------------------------------------
    let config = SubscribeConfig::default().with_max_pending(args.max_pending);
    let subs: Vec<Box<dyn Subscription>> = if args.feeds.is_empty() {
        DEFAULT_FAKE_CHANNELS
            .iter()
            .map(|channel| {
                let source = FakeSource::new(*channel)
                    .with_duplicates(args.duplicates)
                    .fail_every(args.fail_every);
                subscribe_with(source, config).boxed()
            })
            .collect()
    } else {
        args.feeds
            .iter()
            .map(|url| subscribe_with(RssSource::new(url, url), config).boxed())
            .collect()
    };
    info!(sources = subs.len(), "subscribing");

    let mut merged = merge(subs);
    let mut updates = merged.updates();

    // -- close after the deadline (or Ctrl-C) ---------------------------------
    let run_for = args.run_for;
    let closer = tokio::spawn(async move {
        if run_for == 0 {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = %err, "cannot listen for Ctrl-C; closing now");
            }
        } else {
            tokio::select! {
                () = tokio::time::sleep(Duration::from_secs(run_for)) => {}
                _ = tokio::signal::ctrl_c() => {}
            }
        }
        merged.close().await
    });

    // -- print the stream -----------------------------------------------------
    while let Some(item) = updates.next().await {
        println!("{} {}", item.source_id, item.title);
    }

    match closer.await? {
        Ok(()) => info!("closed cleanly"),
        Err(err) => println!("closed: {:#}", anyhow::Error::new(err)),
    }
    Ok(())
}
