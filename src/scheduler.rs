//! The cooperative run loop driving every registered source round-robin.
//!
//! [`Scheduler`] is both the registration surface (build the registry with
//! [`add_source`](Scheduler::add_source) and
//! [`register`](Scheduler::register)) and the entry point that consumes it
//! ([`run`](Scheduler::run)). Consuming `self` is what makes the registry
//! read-only once the loop starts: there is no way to mutate it from the
//! outside afterwards, and no locking is needed because the loop is the
//! single logical thread of control.

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::instrument;

use crate::dispatch::{DispatchError, dispatch};
use crate::registry::{Binder, HandlerEntry, RegisteredSlot, SlotMeta, SourceId, SourceSlot, SourceToken};
use crate::source::{EventSource, SourceConfig, SourceError, SourceEvent};

/// Errors that terminate [`Scheduler::run`].
#[derive(Debug, Error, Diagnostic)]
pub enum RunError {
    /// `run` was called on an empty registry.
    #[error("no event sources registered")]
    #[diagnostic(
        code(eventweave::scheduler::no_sources),
        help("Register at least one source with add_source before calling run.")
    )]
    NoSources,

    /// A source failed to produce its next event.
    #[error("event source `{source_label}` failed")]
    #[diagnostic(
        code(eventweave::scheduler::source),
        help("Source errors are fatal to the run loop; the hosting process decides whether to restart.")
    )]
    Source {
        source_label: String,
        #[source]
        source: SourceError,
    },

    /// A handler failed and had no failure handler to recover it.
    #[error("unrecovered handler failure on source `{source_label}`")]
    #[diagnostic(code(eventweave::scheduler::dispatch))]
    Dispatch {
        source_label: String,
        #[source]
        source: DispatchError,
    },
}

/// Create a linked shutdown trigger/signal pair.
///
/// Hand the signal to [`RunOptions::with_shutdown`] and keep the trigger;
/// firing it (or dropping it) stops the loop at its next suspension point
/// and makes [`Scheduler::run`] return `Ok(())`.
pub fn shutdown_channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (sender, receiver) = oneshot::channel();
    (
        ShutdownTrigger { sender },
        ShutdownSignal {
            receiver: Some(receiver),
        },
    )
}

/// Caller-held half of [`shutdown_channel`].
#[derive(Debug)]
pub struct ShutdownTrigger {
    sender: oneshot::Sender<()>,
}

impl ShutdownTrigger {
    /// Request a graceful stop.
    pub fn trigger(self) {
        let _ = self.sender.send(());
    }
}

/// Loop-held half of [`shutdown_channel`].
///
/// The loop observes the signal only while waiting for a source's next
/// event; a dispatch already in progress always runs to completion.
#[derive(Debug)]
pub struct ShutdownSignal {
    receiver: Option<oneshot::Receiver<()>>,
}

impl ShutdownSignal {
    /// A signal that never fires; the loop runs until an error escapes.
    pub fn never() -> Self {
        Self { receiver: None }
    }

    pub(crate) async fn wait(&mut self) {
        match self.receiver.as_mut() {
            // Resolves on trigger() and on a dropped trigger alike; both
            // mean nobody wants the loop running anymore.
            Some(receiver) => {
                let _ = receiver.await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

/// Options for one [`Scheduler::run`] invocation.
#[derive(Debug)]
pub struct RunOptions {
    fair: bool,
    shutdown: ShutdownSignal,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            fair: true,
            shutdown: ShutdownSignal::never(),
        }
    }
}

impl RunOptions {
    /// Enable or disable fairness (enabled by default).
    ///
    /// With fairness disabled no interleaving happens: each source is
    /// drained to its own natural pause point before the next gets a
    /// turn. Every source must then carry a finite
    /// [`pause_after`](SourceConfig::with_pause_after) or it will
    /// monopolize the loop; the scheduler does not detect this.
    #[must_use]
    pub fn with_fairness(mut self, fair: bool) -> Self {
        self.fair = fair;
        self
    }

    /// Attach a shutdown signal from [`shutdown_channel`].
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = shutdown;
        self
    }
}

/// What one source did with its turn in the current round.
pub(crate) enum RoundOutcome {
    /// The source yielded `items` items and then paused.
    Drained { items: usize },
    /// The shutdown signal fired while waiting on the source.
    Stopped,
}

/// Object-safe running form of a registered slot.
#[async_trait]
pub(crate) trait RunSlot: Send {
    fn label(&self) -> &str;

    fn handler_count(&self) -> usize;

    /// Drain the source until it pauses, dispatching every item.
    async fn drain_round(&mut self, shutdown: &mut ShutdownSignal) -> Result<RoundOutcome, RunError>;
}

pub(crate) struct RunSlotImpl<S: EventSource> {
    meta: SlotMeta,
    source: S,
    entries: Vec<HandlerEntry<S::Item>>,
}

impl<S> RunSlotImpl<S>
where
    S: EventSource + 'static,
    S::Item: Clone + Send + 'static,
{
    pub(crate) fn new(meta: SlotMeta, source: S, entries: Vec<HandlerEntry<S::Item>>) -> Self {
        Self {
            meta,
            source,
            entries,
        }
    }
}

#[async_trait]
impl<S> RunSlot for RunSlotImpl<S>
where
    S: EventSource + 'static,
    S::Item: Clone + Send + 'static,
{
    fn label(&self) -> &str {
        &self.meta.label
    }

    fn handler_count(&self) -> usize {
        self.entries.len()
    }

    async fn drain_round(&mut self, shutdown: &mut ShutdownSignal) -> Result<RoundOutcome, RunError> {
        let mut items = 0usize;
        loop {
            let polled = tokio::select! {
                _ = shutdown.wait() => return Ok(RoundOutcome::Stopped),
                polled = self.source.next_event() => polled,
            };
            let event = polled.map_err(|source| RunError::Source {
                source_label: self.meta.label.clone(),
                source,
            })?;
            match event {
                SourceEvent::Pause => return Ok(RoundOutcome::Drained { items }),
                SourceEvent::Item(item) => {
                    dispatch(item, &self.entries)
                        .await
                        .map_err(|source| RunError::Dispatch {
                            source_label: self.meta.label.clone(),
                            source,
                        })?;
                    items += 1;
                }
            }
        }
    }
}

/// Fair multi-stream event scheduler.
///
/// Owns the registry (sources in insertion order, each with its ordered
/// handler list) and the cooperative loop that drives it. Registration is
/// a setup-time API; [`run`](Self::run) consumes the scheduler, after
/// which the registry can no longer change.
///
/// # Example
///
/// ```no_run
/// use eventweave::handler::{handler_fn, HandlerError};
/// use eventweave::scheduler::{RunOptions, Scheduler};
/// use eventweave::source::{ChannelSource, SourceConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let (posts_tx, posts_rx) = flume::unbounded::<String>();
///
/// let mut scheduler = Scheduler::new();
/// let posts = scheduler.add_source_named(
///     "posts",
///     ChannelSource::new(posts_rx),
///     SourceConfig::default(),
/// );
/// scheduler.register(&posts).bind(handler_fn(|post: String| async move {
///     println!("new post: {post}");
///     Ok::<(), HandlerError>(())
/// }));
///
/// posts_tx.send("hello".to_string())?;
/// scheduler.run(RunOptions::default()).await?;
/// # Ok(())
/// # }
/// ```
pub struct Scheduler {
    slots: Vec<Box<dyn RegisteredSlot>>,
    index: FxHashMap<SourceId, usize>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    /// Number of registered sources.
    pub fn source_count(&self) -> usize {
        self.slots.len()
    }

    /// Register an event source with an auto-generated label.
    ///
    /// Explicitly creates the source's registry slot (initially with no
    /// handlers) and returns the token later `register` calls address it
    /// by. `config` is forwarded to the source via
    /// [`EventSource::apply_config`] before the first poll.
    pub fn add_source<S>(&mut self, source: S, config: SourceConfig) -> SourceToken<S::Item>
    where
        S: EventSource + 'static,
        S::Item: Clone + Send + 'static,
    {
        let label = format!("source-{}", self.slots.len());
        self.add_source_named(label, source, config)
    }

    /// [`add_source`](Self::add_source) with a caller-chosen label for
    /// logs and error reports.
    pub fn add_source_named<S>(
        &mut self,
        label: impl Into<String>,
        mut source: S,
        config: SourceConfig,
    ) -> SourceToken<S::Item>
    where
        S: EventSource + 'static,
        S::Item: Clone + Send + 'static,
    {
        source.apply_config(&config);
        let meta = SlotMeta {
            id: SourceId::mint(),
            label: label.into(),
        };
        let token = SourceToken::new(meta.id);
        tracing::debug!(source = %meta.label, id = %meta.id, ?config, "source registered");
        self.index.insert(meta.id, self.slots.len());
        self.slots.push(Box::new(SourceSlot::new(meta, source)));
        token
    }

    /// Start a registration against the source behind `token`.
    ///
    /// Returns a one-shot [`Binder`]; consume it with
    /// [`bind`](Binder::bind) to append one handler to the source's entry
    /// list. Handlers appended through successive `register` calls run in
    /// exactly that order for every item.
    ///
    /// # Panics
    ///
    /// Panics if `token` was minted by a different scheduler.
    pub fn register<T>(&mut self, token: &SourceToken<T>) -> Binder<'_, T>
    where
        T: Clone + Send + 'static,
    {
        let index = *self
            .index
            .get(&token.id())
            .expect("source token does not belong to this scheduler");
        let label = self.slots[index].meta().label.clone();
        let entries = self.slots[index]
            .entries_any()
            .downcast_mut::<Vec<HandlerEntry<T>>>()
            .expect("source token item type matches its slot");
        Binder::new(entries, label)
    }

    /// Run the loop until it is shut down or an error escapes.
    ///
    /// Sources are visited round-robin in registration order, each drained
    /// until it pauses. With fairness enabled (the default) every source
    /// is wrapped in [`Interleaved`](crate::source::Interleaved), so a
    /// pause follows every item and no high-volume source can starve the
    /// others; with fairness disabled each source runs to its own pause
    /// point first.
    ///
    /// The pause sentinel is consumed here; handlers only ever see real
    /// items. Handlers for one item run sequentially, and the loop drives
    /// one source at a time, so nothing in the registry executes
    /// concurrently with anything else.
    ///
    /// Failure semantics are fail-fast and shared: an unrecovered handler
    /// error or a source error stops processing of *all* sources, because
    /// there is one loop. `Ok(())` is returned only when a
    /// [`shutdown_channel`] signal fires.
    #[instrument(skip(self, options), err)]
    pub async fn run(self, options: RunOptions) -> Result<(), RunError> {
        if self.slots.is_empty() {
            return Err(RunError::NoSources);
        }
        let fair = options.fair;
        let mut shutdown = options.shutdown;

        let mut slots: Vec<Box<dyn RunSlot>> = self
            .slots
            .into_iter()
            .map(|slot| slot.into_run_slot(fair))
            .collect();
        for slot in &slots {
            if slot.handler_count() == 0 {
                tracing::warn!(
                    source = %slot.label(),
                    "source has no handlers; its items will be discarded"
                );
            }
        }
        tracing::info!(sources = slots.len(), fair, "run loop started");

        loop {
            let mut dispatched = 0usize;
            for slot in slots.iter_mut() {
                match slot.drain_round(&mut shutdown).await? {
                    RoundOutcome::Stopped => {
                        tracing::info!("run loop stopped by shutdown signal");
                        return Ok(());
                    }
                    RoundOutcome::Drained { items } => {
                        if items > 0 {
                            tracing::debug!(source = %slot.label(), items, "source drained for this round");
                        }
                        dispatched += items;
                    }
                }
            }
            if dispatched == 0 {
                // Keep an all-idle registry cooperative on the runtime.
                tokio::task::yield_now().await;
            }
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
