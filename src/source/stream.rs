//! Adapter from `futures` streams to the [`EventSource`] contract.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};

use super::contract::{EventSource, SourceError, SourceEvent};

/// Drives any [`futures_util::Stream`] as an [`EventSource`].
///
/// Pending stream items suspend inside `next_event`, so a stream that
/// waits on I/O yields control exactly like a native source. When the
/// stream ends, the source pauses forever (with a short idle wait per
/// poll, matching [`IterSource`](super::IterSource)).
#[derive(Debug)]
pub struct StreamSource<St> {
    stream: St,
    idle_wait: Duration,
    ended: bool,
}

impl<St> StreamSource<St>
where
    St: Stream + Unpin + Send,
{
    pub const DEFAULT_IDLE_WAIT: Duration = Duration::from_millis(10);

    pub fn new(stream: St) -> Self {
        Self {
            stream,
            idle_wait: Self::DEFAULT_IDLE_WAIT,
            ended: false,
        }
    }

    /// Time to wait before each pause once the stream has ended.
    #[must_use]
    pub fn with_idle_wait(mut self, idle_wait: Duration) -> Self {
        self.idle_wait = idle_wait;
        self
    }
}

#[async_trait]
impl<St> EventSource for StreamSource<St>
where
    St: Stream + Unpin + Send,
    St::Item: Send + 'static,
{
    type Item = St::Item;

    async fn next_event(&mut self) -> Result<SourceEvent<St::Item>, SourceError> {
        if self.ended {
            tokio::time::sleep(self.idle_wait).await;
            return Ok(SourceEvent::Pause);
        }
        match self.stream.next().await {
            Some(item) => Ok(SourceEvent::Item(item)),
            None => {
                self.ended = true;
                tokio::time::sleep(self.idle_wait).await;
                Ok(SourceEvent::Pause)
            }
        }
    }
}
