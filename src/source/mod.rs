//! Event source abstractions: the polling contract, configuration, the
//! interleaving adapter, and ready-made sources for channels, iterators,
//! and `futures` streams.
//!
//! The module is organised around the [`EventSource`] trait; everything the
//! scheduler knows about a source goes through it.

pub mod channel;
pub mod config;
pub mod contract;
pub mod interleave;
pub mod iter;
pub mod stream;

pub use channel::ChannelSource;
pub use config::{PauseAfter, SourceConfig};
pub use contract::{EventSource, SourceError, SourceEvent};
pub use interleave::Interleaved;
pub use iter::IterSource;
pub use stream::StreamSource;
