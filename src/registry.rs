//! Registry primitives: source identity, handler entries, and the
//! registration binder.
//!
//! The registry itself lives inside [`Scheduler`](crate::scheduler::Scheduler)
//! as an insertion-ordered list of type-erased source slots; this module
//! provides the pieces it is built from. Each slot pairs one event source
//! with the ordered list of [`HandlerEntry`] values bound to it; slot order
//! determines round order, entry order determines dispatch order, and both
//! are fixed once the scheduler starts running.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::handler::{FailureHandler, Handler};
use crate::scheduler::{RunSlot, RunSlotImpl};
use crate::source::{EventSource, Interleaved};

/// Stable identity of one registered source instance.
///
/// Every [`add_source`](crate::scheduler::Scheduler::add_source) call
/// mints a fresh id, so two registrations of otherwise identical sources
/// never collapse onto one registry key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceId(Uuid);

impl SourceId {
    pub(crate) fn mint() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Typed capability returned by `add_source`, used to address the slot in
/// later [`register`](crate::scheduler::Scheduler::register) calls.
///
/// The token carries the slot's item type, so binding a handler of the
/// wrong type is a compile error rather than a runtime surprise.
pub struct SourceToken<T> {
    id: SourceId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> SourceToken<T> {
    pub(crate) fn new(id: SourceId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> SourceId {
        self.id
    }
}

impl<T> Clone for SourceToken<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SourceToken<T> {}

impl<T> fmt::Debug for SourceToken<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SourceToken").field(&self.id).finish()
    }
}

/// One handler bound to a source: the callback plus its optional failure
/// handler and a label for logs and error reports.
///
/// Entries are immutable once appended; the dispatcher walks them in
/// insertion order.
pub struct HandlerEntry<T> {
    handler: Arc<dyn Handler<T>>,
    failure_handler: Option<FailureHandler>,
    label: String,
}

impl<T> HandlerEntry<T> {
    pub fn new<H>(handler: H) -> Self
    where
        H: Handler<T> + 'static,
    {
        Self::from_shared(Arc::new(handler))
    }

    pub fn from_shared(handler: Arc<dyn Handler<T>>) -> Self {
        let label = handler.name().to_string();
        Self {
            handler,
            failure_handler: None,
            label,
        }
    }

    #[must_use]
    pub fn with_failure_handler(mut self, failure_handler: FailureHandler) -> Self {
        self.failure_handler = Some(failure_handler);
        self
    }

    #[must_use]
    pub fn named(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn handler(&self) -> &Arc<dyn Handler<T>> {
        &self.handler
    }

    pub fn failure_handler(&self) -> Option<&FailureHandler> {
        self.failure_handler.as_ref()
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl<T> fmt::Debug for HandlerEntry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerEntry")
            .field("label", &self.label)
            .field("failure_handler", &self.failure_handler.is_some())
            .finish()
    }
}

/// Registry metadata shared by a slot and its running counterpart.
#[derive(Clone, Debug)]
pub(crate) struct SlotMeta {
    pub(crate) id: SourceId,
    pub(crate) label: String,
}

/// A registered source together with its ordered handler entries, before
/// the scheduler starts.
pub(crate) struct SourceSlot<S: EventSource> {
    meta: SlotMeta,
    source: S,
    entries: Vec<HandlerEntry<S::Item>>,
}

impl<S> SourceSlot<S>
where
    S: EventSource + 'static,
    S::Item: Clone + Send + 'static,
{
    pub(crate) fn new(meta: SlotMeta, source: S) -> Self {
        Self {
            meta,
            source,
            entries: Vec::new(),
        }
    }
}

/// Object-safe view of a [`SourceSlot`] so slots with different item types
/// share one insertion-ordered list.
pub(crate) trait RegisteredSlot: Send {
    fn meta(&self) -> &SlotMeta;

    fn entry_count(&self) -> usize;

    /// The slot's `Vec<HandlerEntry<Item>>`, erased. [`Binder`] downcasts
    /// it back using the item type carried by the [`SourceToken`].
    fn entries_any(&mut self) -> &mut dyn Any;

    /// Convert into the running representation, wrapping the source in
    /// [`Interleaved`] when fairness is enabled.
    fn into_run_slot(self: Box<Self>, fair: bool) -> Box<dyn RunSlot>;
}

impl<S> RegisteredSlot for SourceSlot<S>
where
    S: EventSource + 'static,
    S::Item: Clone + Send + 'static,
{
    fn meta(&self) -> &SlotMeta {
        &self.meta
    }

    fn entry_count(&self) -> usize {
        self.entries.len()
    }

    fn entries_any(&mut self) -> &mut dyn Any {
        &mut self.entries
    }

    fn into_run_slot(self: Box<Self>, fair: bool) -> Box<dyn RunSlot> {
        let slot = *self;
        if fair {
            Box::new(RunSlotImpl::new(
                slot.meta,
                Interleaved::new(slot.source),
                slot.entries,
            ))
        } else {
            Box::new(RunSlotImpl::new(slot.meta, slot.source, slot.entries))
        }
    }
}

/// One-shot capability that appends a handler to a source's entry list.
///
/// Returned by [`Scheduler::register`](crate::scheduler::Scheduler::register);
/// configure it with [`with_failure_handler`](Self::with_failure_handler)
/// and [`named`](Self::named), then consume it with [`bind`](Self::bind).
/// Each binder belongs to one `register` call and binds exactly one
/// handler: `bind` takes the binder by value, so reuse is a compile
/// error.
///
/// `bind` hands the handler back as an `Arc`, which is what makes
/// stacking work: the same handler value can be passed to another
/// binder via [`bind_shared`](Self::bind_shared), appearing once per
/// source it was registered against, each time with its own failure
/// handler.
pub struct Binder<'a, T> {
    entries: &'a mut Vec<HandlerEntry<T>>,
    source_label: String,
    failure_handler: Option<FailureHandler>,
    label: Option<String>,
}

impl<'a, T: Send + 'static> Binder<'a, T> {
    pub(crate) fn new(entries: &'a mut Vec<HandlerEntry<T>>, source_label: String) -> Self {
        Self {
            entries,
            source_label,
            failure_handler: None,
            label: None,
        }
    }

    /// Associate a failure handler with the handler about to be bound.
    #[must_use]
    pub fn with_failure_handler(mut self, failure_handler: FailureHandler) -> Self {
        self.failure_handler = Some(failure_handler);
        self
    }

    /// Override the label used for this entry in logs and error reports.
    #[must_use]
    pub fn named(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Append the handler to the source's entry list and return it,
    /// shared, for further registrations.
    pub fn bind<H>(self, handler: H) -> Arc<dyn Handler<T>>
    where
        H: Handler<T> + 'static,
    {
        self.bind_shared(Arc::new(handler))
    }

    /// [`bind`](Self::bind) for an already-shared handler (stacking).
    pub fn bind_shared(self, handler: Arc<dyn Handler<T>>) -> Arc<dyn Handler<T>> {
        let mut entry = HandlerEntry::from_shared(Arc::clone(&handler));
        if let Some(label) = self.label {
            entry = entry.named(label);
        }
        if let Some(failure_handler) = self.failure_handler {
            entry = entry.with_failure_handler(failure_handler);
        }
        tracing::debug!(
            source = %self.source_label,
            handler = %entry.label(),
            position = self.entries.len(),
            "handler registered"
        );
        self.entries.push(entry);
        handler
    }
}
