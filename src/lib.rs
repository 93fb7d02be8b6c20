//! # Eventweave: Fair Multi-Stream Event Scheduling
//!
//! Eventweave lets a program subscribe to any number of independent,
//! effectively-infinite event sources, attach one or more handlers to each,
//! and drive everything from a single cooperative loop that guarantees no
//! high-volume source can starve the others and no handler failure can
//! corrupt processing it wasn't meant to stop.
//!
//! ## Core Concepts
//!
//! - **Sources**: Async producers of items over time, behind one polling
//!   contract ([`source::EventSource`])
//! - **Pause sentinel**: The distinguished "nothing right now" value a
//!   source yields to hand control back to the loop
//! - **Interleaving**: The fairness adapter that inserts a pause after
//!   every item, so round-robin turns stay short
//! - **Handlers**: Ordered per-source callbacks, each with an optional
//!   failure handler that recovers its errors
//! - **Scheduler**: The registry plus the run loop that visits every
//!   source round-robin, forever
//!
//! ## Quick Start
//!
//! ```no_run
//! use eventweave::handler::{failure_fn, handler_fn, HandlerError};
//! use eventweave::scheduler::{shutdown_channel, RunOptions, Scheduler};
//! use eventweave::source::{ChannelSource, SourceConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let (posts_tx, posts_rx) = flume::unbounded::<String>();
//! let (votes_tx, votes_rx) = flume::unbounded::<String>();
//!
//! let mut scheduler = Scheduler::new();
//! let posts = scheduler.add_source_named(
//!     "posts",
//!     ChannelSource::new(posts_rx),
//!     SourceConfig::default().with_skip_existing(true),
//! );
//! let votes = scheduler.add_source_named(
//!     "votes",
//!     ChannelSource::new(votes_rx),
//!     SourceConfig::default(),
//! );
//!
//! // One handler, stacked onto both sources, each registration with its
//! // own failure handler.
//! let log_item = scheduler
//!     .register(&posts)
//!     .with_failure_handler(failure_fn(|err| eprintln!("post handler failed: {err}")))
//!     .bind(handler_fn(|item: String| async move {
//!         println!("{item}");
//!         Ok::<(), HandlerError>(())
//!     }));
//! scheduler.register(&votes).bind_shared(log_item);
//!
//! let (stop, signal) = shutdown_channel();
//! tokio::spawn(async move {
//!     tokio::signal::ctrl_c().await.ok();
//!     stop.trigger();
//! });
//!
//! posts_tx.send("first post".to_string())?;
//! votes_tx.send("upvote".to_string())?;
//! scheduler.run(RunOptions::default().with_shutdown(signal)).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Fairness
//!
//! With fairness enabled (the default), every source is wrapped so that a
//! pause follows each item: a source that has ten thousand items queued
//! still hands control back after every single one, and a source with one
//! item gets its turn within the same round. Disabling fairness
//! ([`scheduler::RunOptions::with_fairness`]) drains each source to its
//! own pause point first, an explicit opt-out for callers whose sources
//! pause themselves via [`source::SourceConfig`].
//!
//! ## Failure Semantics
//!
//! A handler error with a registered failure handler is recovered locally:
//! the failure handler receives the exact error, and dispatch continues
//! with the next handler. Everything else (a handler error without a
//! failure handler, or a source failing to produce) is fatal to the
//! whole loop, which stops and surfaces the error to the hosting process.
//! There is one shared loop; see
//! [`scheduler::Scheduler::run`] for the full contract.
//!
//! ## Module Guide
//!
//! - [`source`] - The event source contract, configuration, fairness
//!   adapter, and ready-made channel/iterator/stream sources
//! - [`handler`] - Handler trait, closure adapters, and failure handlers
//! - [`registry`] - Source identity, handler entries, and the
//!   registration binder
//! - [`dispatch`] - Ordered handler fan-out with failure routing
//! - [`scheduler`] - The round-robin run loop and its options

pub mod dispatch;
pub mod handler;
pub mod registry;
pub mod scheduler;
pub mod source;
