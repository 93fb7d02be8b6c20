//! Registration-time configuration forwarded to event sources.

use serde::{Deserialize, Serialize};

/// How many consecutive empty polls a source tolerates before it emits the
/// pause sentinel on its own.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PauseAfter {
    /// Never pause: block in `next_event` until an item arrives.
    ///
    /// This is the required mode when the scheduler runs with fairness
    /// enabled; the interleaving adapter supplies the yield points.
    #[default]
    Never,
    /// Emit a pause after this many consecutive empty polls.
    ///
    /// `After(0)` is treated as `After(1)`: pause on the first empty poll.
    After(u32),
}

impl PauseAfter {
    /// Empty-poll budget, clamped to at least one.
    pub(crate) fn poll_budget(self) -> Option<u32> {
        match self {
            PauseAfter::Never => None,
            PauseAfter::After(limit) => Some(limit.max(1)),
        }
    }
}

/// Configuration keys recognised by event sources, forwarded verbatim from
/// [`Scheduler::add_source`](crate::scheduler::Scheduler::add_source) via
/// [`EventSource::apply_config`](super::EventSource::apply_config).
///
/// # Example
///
/// ```
/// use eventweave::source::{PauseAfter, SourceConfig};
///
/// let config = SourceConfig::default()
///     .with_pause_after(PauseAfter::After(3))
///     .with_skip_existing(true);
/// assert_eq!(config.pause_after, PauseAfter::After(3));
/// assert!(config.skip_existing);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// When the source should emit the pause sentinel by itself.
    pub pause_after: PauseAfter,
    /// Discard items that existed before subscription; deliver only future
    /// arrivals.
    pub skip_existing: bool,
}

impl SourceConfig {
    #[must_use]
    pub fn with_pause_after(mut self, pause_after: PauseAfter) -> Self {
        self.pause_after = pause_after;
        self
    }

    #[must_use]
    pub fn with_skip_existing(mut self, skip_existing: bool) -> Self {
        self.skip_existing = skip_existing;
        self
    }
}
