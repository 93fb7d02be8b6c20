//! Fairness demo: a firehose next to a trickle.
//!
//! The same pair of sources (one with a deep backlog, one with two items)
//! is run twice: once with fairness enabled (the default) and once with
//! it disabled. With fairness on, the trickle's items land within the
//! first rounds; with it off, the firehose drains completely first.
//!
//! Running This Demo:
//! ```bash
//! cargo run --example fairness
//! ```

use std::time::Duration;

use miette::Result;
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use eventweave::handler::CollectorHandler;
use eventweave::scheduler::{RunOptions, Scheduler, shutdown_channel};
use eventweave::source::{IterSource, SourceConfig};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(ErrorLayer::default())
        .init();
}

async fn dispatch_order(fair: bool) -> Result<Vec<String>> {
    let firehose: Vec<String> = (1..=8).map(|n| format!("firehose-{n}")).collect();
    let trickle: Vec<String> = (1..=2).map(|n| format!("trickle-{n}")).collect();

    let mut scheduler = Scheduler::new();
    let busy = scheduler.add_source_named("firehose", IterSource::new(firehose), SourceConfig::default());
    let quiet = scheduler.add_source_named("trickle", IterSource::new(trickle), SourceConfig::default());

    let seen = CollectorHandler::<String>::new();
    let order = seen.clone();
    let shared = scheduler.register(&busy).bind(seen);
    scheduler.register(&quiet).bind_shared(shared);

    let (stop, signal) = shutdown_channel();
    let handle = tokio::spawn(
        scheduler.run(
            RunOptions::default()
                .with_fairness(fair)
                .with_shutdown(signal),
        ),
    );
    tokio::time::sleep(Duration::from_millis(300)).await;
    stop.trigger();
    handle
        .await
        .expect("join run loop")
        .map_err(|err| miette::miette!("run loop failed: {err}"))?;

    Ok(order.take())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    miette::set_panic_hook();

    info!("── fairness enabled ──");
    for item in dispatch_order(true).await? {
        info!("  {item}");
    }

    info!("── fairness disabled ──");
    for item in dispatch_order(false).await? {
        info!("  {item}");
    }

    Ok(())
}
