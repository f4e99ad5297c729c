//! Event dispatch: binds recognized event kinds to handler logic and drives
//! an event stream through it.

use crate::error::Error;
use crate::event::{EventKind, EventMetadata, EventRecord, TraceEvent};
use std::collections::BTreeSet;
use tracing::{debug, trace};

pub use memory_usage::MemoryUsageHandler;

pub mod memory_usage;

/// Handler logic for a set of recognized event kinds.
///
/// A handler declares the kinds it subscribes to and receives each matching
/// event together with its metadata, in delivery order. Handlers own their
/// working state and their output data model for one processing session.
pub trait EventHandler {
    /// The event kinds this handler wants dispatched to it
    fn subscriptions(&self) -> Vec<EventKind>;

    /// Process one event of a subscribed kind
    fn handle(
        &mut self,
        kind: EventKind,
        record: &EventRecord,
        metadata: &EventMetadata,
    ) -> Result<(), Error>;
}

/// Drives a stream of converted trace events through an [`EventHandler`].
///
/// The binding table is snapshotted from the handler's subscriptions at
/// construction and never mutated afterwards. Events whose kind is not bound
/// (or not recognized at all) are silently skipped; trace streams mix many
/// unrelated event kinds and most are of no interest to any one handler.
///
/// Processing is single threaded and fully synchronous: one event is
/// dispatched and applied before the next is read. A processor is scoped to
/// one session; build a fresh one per stream.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Processor<H> {
    handler: H,
    bindings: BTreeSet<EventKind>,
}

impl<H: EventHandler> Processor<H> {
    /// Bind the handler's subscriptions.
    ///
    /// Fails with [`Error::EmptyHandlerSubscriptions`] if the handler
    /// subscribes to nothing, since no event could ever reach it.
    pub fn new(handler: H) -> Result<Self, Error> {
        let bindings: BTreeSet<EventKind> = handler.subscriptions().into_iter().collect();
        if bindings.is_empty() {
            return Err(Error::EmptyHandlerSubscriptions);
        }
        debug!(bindings = bindings.len(), "Bound event handler");
        Ok(Self { handler, bindings })
    }

    /// Dispatch a single event by its trace name.
    ///
    /// Unrecognized and unbound event names are a no-op. Handler errors
    /// (e.g. a missing field on a recognized event) propagate to the caller;
    /// whether to abort or skip the offending event is the caller's policy.
    pub fn dispatch(
        &mut self,
        name: &str,
        record: &EventRecord,
        metadata: &EventMetadata,
    ) -> Result<(), Error> {
        let Some(kind) = EventKind::from_trace_name(name) else {
            trace!(event = name, "Skipping unrecognized event");
            return Ok(());
        };
        if !self.bindings.contains(&kind) {
            trace!(event = %kind, "Skipping unbound event");
            return Ok(());
        }
        self.handler.handle(kind, record, metadata)
    }

    /// Process an entire event stream in delivery order, failing fast on the
    /// first handler error. Returns the number of events seen, including
    /// skipped ones.
    pub fn process<I>(&mut self, events: I) -> Result<usize, Error>
    where
        I: IntoIterator<Item = TraceEvent>,
    {
        let mut count = 0;
        for event in events {
            self.dispatch(&event.name, &event.record, &event.metadata)?;
            count += 1;
        }
        debug!(events = count, "Processed event stream");
        Ok(count)
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Recover the handler (and the data model it owns) after processing
    pub fn into_handler(self) -> H {
        self.handler
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::event::{FIELD_PTR, FIELD_SIZE};
    use crate::time::Timestamp;
    use crate::types::ThreadId;

    #[derive(Default)]
    struct CountingHandler {
        seen: Vec<EventKind>,
    }

    impl EventHandler for CountingHandler {
        fn subscriptions(&self) -> Vec<EventKind> {
            vec![EventKind::Malloc, EventKind::Free]
        }

        fn handle(
            &mut self,
            kind: EventKind,
            _record: &EventRecord,
            _metadata: &EventMetadata,
        ) -> Result<(), Error> {
            self.seen.push(kind);
            Ok(())
        }
    }

    struct Unsubscribed;

    impl EventHandler for Unsubscribed {
        fn subscriptions(&self) -> Vec<EventKind> {
            Vec::new()
        }

        fn handle(
            &mut self,
            _kind: EventKind,
            _record: &EventRecord,
            _metadata: &EventMetadata,
        ) -> Result<(), Error> {
            unreachable!("never bound")
        }
    }

    fn meta() -> EventMetadata {
        EventMetadata::new(Timestamp::zero(), ThreadId::from(1))
    }

    #[test]
    fn empty_subscriptions_is_a_configuration_error() {
        assert_eq!(
            Processor::new(Unsubscribed).err(),
            Some(Error::EmptyHandlerSubscriptions)
        );
    }

    #[test]
    fn unrecognized_and_unbound_events_are_skipped() {
        let mut p = Processor::new(CountingHandler::default()).unwrap();
        let record = EventRecord::new();
        p.dispatch("sched_switch", &record, &meta()).unwrap();
        p.dispatch("lttng_ust_libc:calloc", &record, &meta()).unwrap();
        assert!(p.handler().seen.is_empty());
    }

    #[test]
    fn bound_events_reach_the_handler_in_order() {
        let mut p = Processor::new(CountingHandler::default()).unwrap();
        let record = EventRecord::new()
            .with_field(FIELD_PTR, 0x100u64)
            .with_field(FIELD_SIZE, 8u64);
        let stream = vec![
            TraceEvent::new("lttng_ust_libc:free", record.clone(), meta()),
            TraceEvent::new("sched_wakeup", EventRecord::new(), meta()),
            TraceEvent::new("lttng_ust_libc:malloc", record, meta()),
        ];
        let count = p.process(stream).unwrap();
        assert_eq!(count, 3);
        assert_eq!(p.into_handler().seen, vec![EventKind::Free, EventKind::Malloc]);
    }
}
