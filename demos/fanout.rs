//! Fan-out demo: two live feeds, one shared handler.
//!
//! Two producer tasks feed posts and comments into channel sources. A
//! single handler is stacked onto both sources (it appears once per
//! source, each registration with its own failure handler) while a
//! second handler watches only the posts feed. The loop runs with
//! fairness enabled until ctrl-c (or a five second timer, whichever
//! comes first).
//!
//! Running This Demo:
//! ```bash
//! cargo run --example fanout
//! ```

use std::time::Duration;

use miette::Result;
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use eventweave::handler::{HandlerError, failure_fn, handler_fn};
use eventweave::scheduler::{RunOptions, Scheduler, shutdown_channel};
use eventweave::source::{ChannelSource, SourceConfig};

fn init_tracing() {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_line_number(false);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info,eventweave=debug"))
        .unwrap();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(ErrorLayer::default())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    miette::set_panic_hook();

    let (posts_tx, posts_rx) = flume::unbounded::<String>();
    let (comments_tx, comments_rx) = flume::unbounded::<String>();

    // Producers stand in for the real pollers that would talk to a feed API.
    tokio::spawn(async move {
        for n in 1.. {
            if posts_tx.send(format!("post #{n}")).is_err() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(400)).await;
        }
    });
    tokio::spawn(async move {
        for n in 1.. {
            if comments_tx.send(format!("comment #{n}")).is_err() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
    });

    let mut scheduler = Scheduler::new();
    let posts = scheduler.add_source_named(
        "posts",
        ChannelSource::new(posts_rx),
        SourceConfig::default(),
    );
    let comments = scheduler.add_source_named(
        "comments",
        ChannelSource::new(comments_rx),
        SourceConfig::default(),
    );

    // One handler stacked onto both feeds.
    let announce = scheduler
        .register(&posts)
        .named("announce")
        .with_failure_handler(failure_fn(|err| info!("post announce failed: {err}")))
        .bind(handler_fn(|item: String| async move {
            info!("📣 {item}");
            Ok::<(), HandlerError>(())
        }));
    scheduler
        .register(&comments)
        .named("announce")
        .with_failure_handler(failure_fn(|err| info!("comment announce failed: {err}")))
        .bind_shared(announce);

    // A second handler that only watches posts; it runs after `announce`
    // for every post, never concurrently with it.
    scheduler
        .register(&posts)
        .named("archive")
        .bind(handler_fn(|item: String| async move {
            info!("🗄  archived {:?}", item);
            Ok::<(), HandlerError>(())
        }));

    let (stop, signal) = shutdown_channel();
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("ctrl-c received, shutting down"),
            _ = tokio::time::sleep(Duration::from_secs(5)) => info!("demo timer elapsed, shutting down"),
        }
        stop.trigger();
    });

    scheduler
        .run(RunOptions::default().with_shutdown(signal))
        .await
        .map_err(|err| miette::miette!("run loop failed: {err}"))?;

    info!("clean shutdown");
    Ok(())
}
