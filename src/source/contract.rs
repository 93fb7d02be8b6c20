//! The polling contract between the scheduler and a concrete event source.

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

use super::config::SourceConfig;

/// A single poll result from an event source.
///
/// `Pause` is the sentinel: a distinguished value, disjoint from any real
/// item, meaning "nothing more to offer right now; yield to the
/// scheduler". The scheduler intercepts it to end the source's turn in the
/// current round; it is never delivered to a handler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceEvent<T> {
    /// A real item produced by the source.
    Item(T),
    /// The source has nothing right now; control returns to the scheduler.
    Pause,
}

impl<T> SourceEvent<T> {
    /// Returns `true` for the pause sentinel.
    pub fn is_pause(&self) -> bool {
        matches!(self, SourceEvent::Pause)
    }

    /// Extract the item, if any.
    pub fn into_item(self) -> Option<T> {
        match self {
            SourceEvent::Item(item) => Some(item),
            SourceEvent::Pause => None,
        }
    }
}

/// Errors produced by an event source itself.
///
/// The scheduler has no recovery path for these: a failing source
/// terminates the whole run loop, the same way an unhandled handler error
/// does.
#[derive(Debug, Error, Diagnostic)]
pub enum SourceError {
    /// The producer side went away; the source can never yield again.
    #[error("event source disconnected")]
    #[diagnostic(
        code(eventweave::source::disconnected),
        help("The producer feeding this source was dropped. Check the producing task.")
    )]
    Disconnected,

    /// Source-specific failure.
    #[error("event source failed: {0}")]
    #[diagnostic(code(eventweave::source::other))]
    Other(String),
}

impl SourceError {
    pub fn other(error: impl Into<String>) -> Self {
        Self::Other(error.into())
    }
}

/// An abstract producer of items over time.
///
/// Implementations wrap whatever actually fetches items (a channel, a
/// paginated API poller, a socket) behind a single suspendable call:
/// [`next_event`](EventSource::next_event) resolves to the next item, the
/// [`SourceEvent::Pause`] sentinel, or a fatal [`SourceError`].
///
/// # Pausing
///
/// A source configured with [`PauseAfter::Never`](super::PauseAfter) may
/// block in `next_event` for as long as it takes to produce an item. That
/// is the intended mode when the scheduler runs with fairness enabled: the
/// [`Interleaved`](super::Interleaved) adapter supplies the yield points.
/// With fairness disabled the source must pause on its own (a finite
/// `pause_after`) or it will monopolize the loop; that trade-off belongs
/// to the caller, the scheduler does not detect it.
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use eventweave::source::{EventSource, SourceError, SourceEvent};
///
/// /// Counts upward forever.
/// struct Counter(u64);
///
/// #[async_trait]
/// impl EventSource for Counter {
///     type Item = u64;
///
///     async fn next_event(&mut self) -> Result<SourceEvent<u64>, SourceError> {
///         self.0 += 1;
///         Ok(SourceEvent::Item(self.0))
///     }
/// }
/// ```
#[async_trait]
pub trait EventSource: Send {
    /// The item type this source produces.
    type Item: Send + 'static;

    /// Produce the next item or the pause sentinel. Suspendable: the
    /// caller yields control while waiting.
    async fn next_event(&mut self) -> Result<SourceEvent<Self::Item>, SourceError>;

    /// Accept the configuration supplied at registration.
    ///
    /// Called exactly once, before the first poll. Sources apply the keys
    /// that are meaningful to them (`pause_after`, `skip_existing`) and
    /// ignore the rest. The default implementation ignores everything.
    fn apply_config(&mut self, _config: &SourceConfig) {}
}
