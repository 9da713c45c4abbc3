//! The idempotent consumer framework (C8): exactly-once projections over
//! an at-least-once event stream, via a `(consumer_id, event_id)` dedupe
//! table and a commit-hash-chained state.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dedupe;
pub mod engine;
pub mod error;
pub mod handler;
pub mod schema;
pub mod state;

pub use dedupe::{DedupeTable, EventResult, DEFAULT_DEDUPE_TTL_SECS};
pub use engine::{ConsumerConfig, ConsumerInfo, IdempotentConsumer};
pub use error::{consumer_error_to_oms_error, ConsumerError};
pub use handler::{ConsumerEvent, ConsumerHandler, HandlerOutcome, HandlerRegistry};
pub use schema::register_schema_handlers;
pub use state::ConsumerState;
