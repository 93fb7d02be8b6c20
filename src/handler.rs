//! Handler contract for the eventweave dispatch pipeline.
//!
//! This module provides the [`Handler`] trait implemented by every
//! callback registered against a source, closure adapters, the error type
//! handlers report failures through, and the per-handler failure-handler
//! hook.
//!
//! # Uniform invocation
//!
//! There is exactly one invocation contract: the dispatcher awaits
//! [`Handler::handle`] for every entry. A synchronous handler is simply an
//! async one that never suspends; no runtime inspection of the callable
//! is ever performed.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use miette::Diagnostic;
use parking_lot::Mutex;
use thiserror::Error;

/// A callback invoked once per item arriving on the source it was
/// registered against.
///
/// Handlers for one item run strictly sequentially in registration order;
/// a handler that suspends holds its turn until it completes. Returning an
/// error routes to the entry's failure handler when one was registered,
/// and otherwise terminates the whole run loop (fail-fast).
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use eventweave::handler::{Handler, HandlerError};
///
/// struct Announcer;
///
/// #[async_trait]
/// impl Handler<String> for Announcer {
///     async fn handle(&self, item: String) -> Result<(), HandlerError> {
///         println!("new item: {item}");
///         Ok(())
///     }
///
///     fn name(&self) -> &'static str {
///         "announcer"
///     }
/// }
/// ```
#[async_trait]
pub trait Handler<T>: Send + Sync {
    /// Process one item. The dispatcher awaits completion before invoking
    /// the next handler for the same item.
    async fn handle(&self, item: T) -> Result<(), HandlerError>;

    /// Name used in logs and error reports.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose;
    /// override it, or set a label with
    /// [`Binder::named`](crate::registry::Binder::named).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Error reported by a failing handler.
#[derive(Debug, Error, Diagnostic)]
pub enum HandlerError {
    #[error("{0}")]
    #[diagnostic(code(eventweave::handler::message))]
    Message(String),

    #[error(transparent)]
    #[diagnostic(code(eventweave::handler::other))]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl HandlerError {
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    pub fn other(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Other(Box::new(error))
    }
}

/// Per-handler recovery hook, associated at registration time and
/// immutable thereafter. Invoked with the exact error the handler
/// returned; once it returns, the error counts as handled and dispatch
/// continues with the next entry.
pub type FailureHandler = Arc<dyn Fn(&HandlerError) + Send + Sync>;

/// Wrap a closure as a [`FailureHandler`].
pub fn failure_fn<F>(f: F) -> FailureHandler
where
    F: Fn(&HandlerError) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Adapter turning an async closure into a [`Handler`].
///
/// ```
/// use eventweave::handler::{handler_fn, Handler, HandlerError};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let shout = handler_fn(|item: String| async move {
///     println!("{}", item.to_uppercase());
///     Ok::<(), HandlerError>(())
/// });
/// shout.handle("hello".to_string()).await.unwrap();
/// # }
/// ```
pub fn handler_fn<F>(f: F) -> FnHandler<F> {
    FnHandler(f)
}

/// See [`handler_fn`].
pub struct FnHandler<F>(F);

#[async_trait]
impl<T, F, Fut> Handler<T> for FnHandler<F>
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send,
{
    async fn handle(&self, item: T) -> Result<(), HandlerError> {
        (self.0)(item).await
    }

    fn name(&self) -> &'static str {
        "fn-handler"
    }
}

/// Handler that records every item it receives into shared memory.
///
/// Cloning shares the underlying buffer, so a test can keep one clone and
/// bind the other. Mirrors the snapshot workflow of an in-memory sink.
///
/// ```
/// use eventweave::handler::{CollectorHandler, Handler};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let collector = CollectorHandler::new();
/// let probe = collector.clone();
/// collector.handle(7u32).await.unwrap();
/// assert_eq!(probe.snapshot(), vec![7]);
/// # }
/// ```
pub struct CollectorHandler<T> {
    items: Arc<Mutex<Vec<T>>>,
}

impl<T> CollectorHandler<T> {
    pub fn new() -> Self {
        Self {
            items: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Snapshot of everything collected so far.
    pub fn snapshot(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.items.lock().clone()
    }

    /// Drain and return everything collected so far.
    pub fn take(&self) -> Vec<T> {
        std::mem::take(&mut *self.items.lock())
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

impl<T> Default for CollectorHandler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for CollectorHandler<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
        }
    }
}

#[async_trait]
impl<T: Send + 'static> Handler<T> for CollectorHandler<T> {
    async fn handle(&self, item: T) -> Result<(), HandlerError> {
        self.items.lock().push(item);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "collector"
    }
}
