//! The interleaving adapter behind the scheduler's fairness guarantee.

use async_trait::async_trait;

use super::config::SourceConfig;
use super::contract::{EventSource, SourceError, SourceEvent};

/// Wraps a source so that one [`SourceEvent::Pause`] follows every real
/// item: `item, Pause, item, Pause, …`.
///
/// A source configured to never pause would otherwise hold the run loop
/// for as long as it has items; the injected pause guarantees the
/// scheduler regains control after each one, regardless of how the
/// underlying source behaves. Pauses and errors from the inner source pass
/// through unchanged.
///
/// This is a pure transformation over the [`EventSource`] contract; the
/// scheduler applies it to every source when fairness is enabled.
#[derive(Debug)]
pub struct Interleaved<S> {
    inner: S,
    pending_pause: bool,
}

impl<S> Interleaved<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            pending_pause: false,
        }
    }

    /// Unwrap the adapter, discarding any pending pause.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

#[async_trait]
impl<S> EventSource for Interleaved<S>
where
    S: EventSource,
{
    type Item = S::Item;

    async fn next_event(&mut self) -> Result<SourceEvent<Self::Item>, SourceError> {
        if self.pending_pause {
            self.pending_pause = false;
            return Ok(SourceEvent::Pause);
        }
        match self.inner.next_event().await? {
            SourceEvent::Item(item) => {
                self.pending_pause = true;
                Ok(SourceEvent::Item(item))
            }
            SourceEvent::Pause => Ok(SourceEvent::Pause),
        }
    }

    fn apply_config(&mut self, config: &SourceConfig) {
        self.inner.apply_config(config);
    }
}
