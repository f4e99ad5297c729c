use crate::event::{EventKind, FieldType};
use thiserror::Error;

#[derive(Copy, Clone, Eq, PartialEq, Debug, Error)]
pub enum Error {
    /// A field the handler requires is absent on an event it claims to
    /// understand. Surfaced to the caller; never silently swallowed.
    #[error("Event {0} is missing required field '{1}'")]
    MissingField(EventKind, &'static str),

    #[error("Field '{field}' on event {kind} has type {found}, expected {expected}")]
    FieldType {
        kind: EventKind,
        field: &'static str,
        found: FieldType,
        expected: FieldType,
    },

    /// A handler was registered with an empty subscription set; it could
    /// never be dispatched to.
    #[error("Handler subscribes to no event kinds")]
    EmptyHandlerSubscriptions,
}
