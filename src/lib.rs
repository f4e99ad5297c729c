//! Processes converted LTTng/CTF userspace trace events into structured,
//! queryable data models.
//!
//! A trace is first converted (externally) into a flat snapshot of
//! `(event name, metadata, fields)` records; this crate reads such snapshots
//! back ([`snapshot`]) or accepts the triples from any other source, and
//! drives them through an event [`processor`]: a registry binding recognized
//! event kinds to handler logic. The shipped handler,
//! [`processor::MemoryUsageHandler`], reconstructs per-thread memory
//! allocation deltas from the LTTng libc wrapper events into a
//! [`model::MemoryUsageModel`].
//!
//! ```
//! use lttng_trace_processor::event::{EventMetadata, EventRecord, TraceEvent};
//! use lttng_trace_processor::processor::{MemoryUsageHandler, Processor};
//!
//! let stream = vec![
//!     TraceEvent::new(
//!         "lttng_ust_libc:malloc",
//!         EventRecord::new().with_field("ptr", 0x100u64).with_field("size", 64u64),
//!         EventMetadata::new(10u64.into(), 1u32.into()),
//!     ),
//!     TraceEvent::new(
//!         "lttng_ust_libc:free",
//!         EventRecord::new().with_field("ptr", 0x100u64),
//!         EventMetadata::new(20u64.into(), 1u32.into()),
//!     ),
//! ];
//!
//! let mut processor = Processor::new(MemoryUsageHandler::new())?;
//! processor.process(stream)?;
//!
//! let model = processor.into_handler().into_data();
//! assert_eq!(model.len(), 2);
//! assert_eq!(model.net_change().get_raw(), 0);
//! # Ok::<(), lttng_trace_processor::Error>(())
//! ```

pub use error::Error;

pub mod error;
pub mod event;
pub mod model;
pub mod processor;
pub mod snapshot;
pub mod time;
pub mod types;
