//! Item dispatch: ordered handler fan-out with per-handler failure
//! routing.

use miette::Diagnostic;
use thiserror::Error;

use crate::handler::HandlerError;
use crate::registry::HandlerEntry;

/// A handler failed and no failure handler was registered for it.
///
/// Raised out of [`dispatch`]; remaining entries for the item are not
/// invoked, and inside the run loop this terminates the whole run
/// (fail-fast).
#[derive(Debug, Error, Diagnostic)]
#[error("handler `{handler}` failed: {source}")]
#[diagnostic(
    code(eventweave::dispatch::unhandled),
    help("Attach a failure handler at registration to recover this handler's errors.")
)]
pub struct DispatchError {
    handler: String,
    #[source]
    source: HandlerError,
}

impl DispatchError {
    /// Label of the handler that failed.
    pub fn handler(&self) -> &str {
        &self.handler
    }

    /// The error the handler returned.
    pub fn error(&self) -> &HandlerError {
        &self.source
    }
}

/// Deliver one item to every entry, in registration order.
///
/// Each handler is awaited to completion before the next starts: entry
/// N+1 never begins until entry N has finished, including its failure
/// handler if one runs. Every handler receives its own clone of the item.
///
/// A failing entry with a failure handler routes the error there and
/// continues; a failing entry without one stops the fan-out and returns a
/// [`DispatchError`] naming the handler. The dispatcher holds no state of
/// its own.
pub async fn dispatch<T>(item: T, entries: &[HandlerEntry<T>]) -> Result<(), DispatchError>
where
    T: Clone + Send + 'static,
{
    for entry in entries {
        match entry.handler().handle(item.clone()).await {
            Ok(()) => {}
            Err(error) => match entry.failure_handler() {
                Some(failure_handler) => {
                    tracing::warn!(
                        handler = %entry.label(),
                        %error,
                        "handler failed; error routed to its failure handler"
                    );
                    failure_handler(&error);
                }
                None => {
                    return Err(DispatchError {
                        handler: entry.label().to_string(),
                        source: error,
                    });
                }
            },
        }
    }
    Ok(())
}
