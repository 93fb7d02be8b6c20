//! Channel-fed event source.

use std::time::Duration;

use async_trait::async_trait;

use super::config::{PauseAfter, SourceConfig};
use super::contract::{EventSource, SourceError, SourceEvent};

/// An [`EventSource`] fed through a `flume` receiver.
///
/// The producing side of the program (a poller task, a network client, a
/// test) sends items into the channel; the scheduler drains them from
/// here. Honours both registration config keys:
///
/// - `pause_after`: with [`PauseAfter::Never`] (the default) the source
///   blocks in `next_event` until an item arrives; with
///   [`PauseAfter::After(n)`](PauseAfter::After) it emits the pause
///   sentinel after `n` consecutive empty polls, sleeping
///   [`poll_interval`](Self::with_poll_interval) between them.
/// - `skip_existing`: items already queued when the source is first polled
///   are drained and discarded; only future arrivals are delivered.
///
/// A dropped sender surfaces as [`SourceError::Disconnected`].
///
/// # Example
///
/// ```
/// use eventweave::source::{ChannelSource, EventSource, SourceEvent};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let (tx, rx) = flume::unbounded();
/// let mut source = ChannelSource::new(rx);
///
/// tx.send("first").unwrap();
/// let polled = source.next_event().await.unwrap();
/// assert_eq!(polled, SourceEvent::Item("first"));
/// # }
/// ```
#[derive(Debug)]
pub struct ChannelSource<T> {
    receiver: flume::Receiver<T>,
    pause_after: PauseAfter,
    skip_existing: bool,
    poll_interval: Duration,
    subscribed: bool,
}

impl<T: Send + 'static> ChannelSource<T> {
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(25);

    pub fn new(receiver: flume::Receiver<T>) -> Self {
        Self {
            receiver,
            pause_after: PauseAfter::Never,
            skip_existing: false,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            subscribed: false,
        }
    }

    /// Time to wait between empty polls when `pause_after` is finite.
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn drain_backlog(&mut self) {
        let mut discarded = 0usize;
        while self.receiver.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            tracing::debug!(discarded, "skip_existing discarded queued backlog");
        }
    }
}

#[async_trait]
impl<T: Send + 'static> EventSource for ChannelSource<T> {
    type Item = T;

    async fn next_event(&mut self) -> Result<SourceEvent<T>, SourceError> {
        if !self.subscribed {
            self.subscribed = true;
            if self.skip_existing {
                self.drain_backlog();
            }
        }

        let Some(budget) = self.pause_after.poll_budget() else {
            return match self.receiver.recv_async().await {
                Ok(item) => Ok(SourceEvent::Item(item)),
                Err(flume::RecvError::Disconnected) => Err(SourceError::Disconnected),
            };
        };

        let mut empty_polls = 0u32;
        loop {
            match self.receiver.try_recv() {
                Ok(item) => return Ok(SourceEvent::Item(item)),
                Err(flume::TryRecvError::Disconnected) => return Err(SourceError::Disconnected),
                Err(flume::TryRecvError::Empty) => {
                    empty_polls += 1;
                    if empty_polls >= budget {
                        return Ok(SourceEvent::Pause);
                    }
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }

    fn apply_config(&mut self, config: &SourceConfig) {
        self.pause_after = config.pause_after;
        self.skip_existing = config.skip_existing;
    }
}
