//! Scripted event source over a finite iterator.

use std::time::Duration;

use async_trait::async_trait;

use super::contract::{EventSource, SourceError, SourceEvent};

/// An [`EventSource`] that yields a fixed sequence of items, then pauses
/// forever.
///
/// Useful for tests and demos where the arrival pattern must be exact.
/// Once exhausted, every poll waits [`idle_wait`](Self::with_idle_wait)
/// (so an idle registry does not spin hot) and then returns the pause
/// sentinel.
#[derive(Debug)]
pub struct IterSource<I> {
    items: I,
    idle_wait: Duration,
}

impl<I: Iterator> IterSource<I> {
    pub const DEFAULT_IDLE_WAIT: Duration = Duration::from_millis(10);

    pub fn new(items: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            items: items.into_iter(),
            idle_wait: Self::DEFAULT_IDLE_WAIT,
        }
    }

    /// Time to wait before each pause once the sequence is exhausted.
    #[must_use]
    pub fn with_idle_wait(mut self, idle_wait: Duration) -> Self {
        self.idle_wait = idle_wait;
        self
    }
}

#[async_trait]
impl<I> EventSource for IterSource<I>
where
    I: Iterator + Send,
    I::Item: Send + 'static,
{
    type Item = I::Item;

    async fn next_event(&mut self) -> Result<SourceEvent<I::Item>, SourceError> {
        match self.items.next() {
            Some(item) => Ok(SourceEvent::Item(item)),
            None => {
                tokio::time::sleep(self.idle_wait).await;
                Ok(SourceEvent::Pause)
            }
        }
    }
}
