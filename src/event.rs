//! Converted trace events: recognized kinds, raw records, and the per-event
//! metadata attached before dispatch.

use crate::error::Error;
use crate::time::Timestamp;
use crate::types::ThreadId;
use derive_more::Display;
use enum_iterator::Sequence;
use std::collections::HashMap;

/// Field names used by the libc wrapper events
pub const FIELD_PTR: &str = "ptr";
pub const FIELD_IN_PTR: &str = "in_ptr";
pub const FIELD_OUT_PTR: &str = "out_ptr";
pub const FIELD_SIZE: &str = "size";
pub const FIELD_NMEMB: &str = "nmemb";

/// The recognized LTTng libc wrapper event kinds.
///
/// These events are generated when `LD_PRELOAD`-ing
/// `liblttng-ust-libc-wrapper.so`, see:
/// <https://lttng.org/docs/#doc-liblttng-ust-libc-pthread-wrapper>
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Sequence)]
pub enum EventKind {
    #[display(fmt = "lttng_ust_libc:malloc")]
    Malloc,
    #[display(fmt = "lttng_ust_libc:calloc")]
    Calloc,
    #[display(fmt = "lttng_ust_libc:realloc")]
    Realloc,
    #[display(fmt = "lttng_ust_libc:free")]
    Free,
    #[display(fmt = "lttng_ust_libc:memalign")]
    Memalign,
    #[display(fmt = "lttng_ust_libc:posix_memalign")]
    PosixMemalign,
}

impl EventKind {
    /// The fully qualified event name as it appears in the trace
    pub fn trace_name(&self) -> &'static str {
        match self {
            EventKind::Malloc => "lttng_ust_libc:malloc",
            EventKind::Calloc => "lttng_ust_libc:calloc",
            EventKind::Realloc => "lttng_ust_libc:realloc",
            EventKind::Free => "lttng_ust_libc:free",
            EventKind::Memalign => "lttng_ust_libc:memalign",
            EventKind::PosixMemalign => "lttng_ust_libc:posix_memalign",
        }
    }

    /// Resolve a trace event name to a recognized kind.
    ///
    /// Trace streams mix many unrelated event kinds; an unrecognized name is
    /// not an error, it's simply of no interest here.
    pub fn from_trace_name(name: &str) -> Option<Self> {
        enum_iterator::all::<Self>().find(|k| k.trace_name() == name)
    }
}

/// Type tag of a [`FieldValue`], used in error reporting
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
pub enum FieldType {
    #[display(fmt = "u64")]
    U64,
    #[display(fmt = "i64")]
    I64,
    #[display(fmt = "string")]
    Str,
}

/// A single field value on a converted trace event.
///
/// The CTF converter emits unsigned and signed integers and strings; pointer
/// and size fields are unsigned integers.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
pub enum FieldValue {
    #[display(fmt = "{_0}")]
    U64(u64),
    #[display(fmt = "{_0}")]
    I64(i64),
    #[display(fmt = "{_0}")]
    Str(String),
}

impl FieldValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::U64(_) => FieldType::U64,
            FieldValue::I64(_) => FieldType::I64,
            FieldValue::Str(_) => FieldType::Str,
        }
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        FieldValue::U64(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::I64(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Str(v.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Str(v)
    }
}

/// Raw event payload: the named fields of one converted trace event.
///
/// Opaque to the dispatch layer; handlers pull out the fields they understand
/// through the typed accessors.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct EventRecord(HashMap<String, FieldValue>);

impl EventRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field insertion, overwriting any previous value
    pub fn with_field<N: Into<String>, V: Into<FieldValue>>(mut self, name: N, value: V) -> Self {
        self.set_field(name, value);
        self
    }

    pub fn set_field<N: Into<String>, V: Into<FieldValue>>(&mut self, name: N, value: V) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Extract a required `u64` field.
    ///
    /// Fails with [`Error::MissingField`] if the field is absent and
    /// [`Error::FieldType`] if it holds something other than a `u64`; both
    /// name the event kind and field for the caller.
    pub fn field_u64(&self, kind: EventKind, name: &'static str) -> Result<u64, Error> {
        match self.get(name) {
            None => Err(Error::MissingField(kind, name)),
            Some(FieldValue::U64(v)) => Ok(*v),
            Some(other) => Err(Error::FieldType {
                kind,
                field: name,
                found: other.field_type(),
                expected: FieldType::U64,
            }),
        }
    }

    /// Extract a required `i64` field
    pub fn field_i64(&self, kind: EventKind, name: &'static str) -> Result<i64, Error> {
        match self.get(name) {
            None => Err(Error::MissingField(kind, name)),
            Some(FieldValue::I64(v)) => Ok(*v),
            Some(other) => Err(Error::FieldType {
                kind,
                field: name,
                found: other.field_type(),
                expected: FieldType::I64,
            }),
        }
    }
}

/// Immutable per-event context, set once before any handler runs
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
#[display(fmt = "[{timestamp}]:{thread_id}")]
pub struct EventMetadata {
    pub timestamp: Timestamp,
    pub thread_id: ThreadId,
}

impl EventMetadata {
    pub fn new(timestamp: Timestamp, thread_id: ThreadId) -> Self {
        Self {
            timestamp,
            thread_id,
        }
    }
}

/// One item of the input stream: the event's trace name, its raw payload, and
/// its metadata
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct TraceEvent {
    pub name: String,
    pub record: EventRecord,
    pub metadata: EventMetadata,
}

impl TraceEvent {
    pub fn new<N: Into<String>>(name: N, record: EventRecord, metadata: EventMetadata) -> Self {
        Self {
            name: name.into(),
            record,
            metadata,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn kind_round_trips_through_trace_name() {
        for kind in enum_iterator::all::<EventKind>() {
            assert_eq!(EventKind::from_trace_name(kind.trace_name()), Some(kind));
            assert_eq!(kind.to_string(), kind.trace_name());
        }
    }

    #[test]
    fn unrecognized_names_resolve_to_none() {
        assert_eq!(EventKind::from_trace_name("sched_switch"), None);
        assert_eq!(EventKind::from_trace_name("lttng_ust_libc:mallocz"), None);
        assert_eq!(EventKind::from_trace_name(""), None);
    }

    #[test]
    fn missing_field_names_kind_and_field() {
        let record = EventRecord::new().with_field(FIELD_PTR, 0x10u64);
        let err = record.field_u64(EventKind::Malloc, FIELD_SIZE).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("lttng_ust_libc:malloc"));
        assert!(msg.contains("size"));
    }

    #[test]
    fn field_type_mismatch() {
        let record = EventRecord::new().with_field(FIELD_SIZE, "forty-two");
        let err = record.field_u64(EventKind::Malloc, FIELD_SIZE).unwrap_err();
        assert!(matches!(err, Error::FieldType { .. }));
    }
}
