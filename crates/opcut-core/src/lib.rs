#![forbid(unsafe_code)]

//! Core: immutable JSON-shaped values and the structural operations the
//! renderer state is built on.
//!
//! - [`Value`]: reference-counted, cheaply clonable state value.
//! - [`Path`]: key/index sequence addressing a location in a value.
//! - [`ops`]: `equals`, `get`, copy-on-write `change`/`set`/`omit`.
//! - [`collection`]: shape-dispatching `map`/`filter`/`reduce`/`merge`/...
//! - [`parse`]: strict numeric parsing for form input.

pub mod collection;
pub mod error;
pub mod logging;
pub mod ops;
pub mod parse;
pub mod path;
pub mod value;

pub use error::{Error, Result};
pub use path::{Path, Segment};
pub use value::{Map, Value, ValueKind};

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{debug, debug_span, trace, trace_span, warn};
