//! Handler that extracts per-thread memory allocation deltas from the LTTng
//! libc wrapper events.
//!
//! Implementation inspired by Trace Compass' UST memory state provider.

use crate::error::Error;
use crate::event::{
    EventKind, EventMetadata, EventRecord, FIELD_IN_PTR, FIELD_NMEMB, FIELD_OUT_PTR, FIELD_PTR,
    FIELD_SIZE,
};
use crate::model::MemoryUsageModel;
use crate::processor::EventHandler;
use crate::types::{Address, AllocationSize, SizeDelta};
use std::collections::HashMap;
use tracing::trace;

/// Reconstructs net memory change per allocation site from a stream of raw,
/// possibly-incomplete allocation/deallocation events.
///
/// The handler keeps a pointer -> last-known-size table so that deallocation
/// events, which carry no size, can be resolved to a negative delta. The
/// table only reflects what this session has observed; a release of an
/// allocation made before trace capture began resolves to no change at all.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct MemoryUsageHandler {
    model: MemoryUsageModel,

    /// Last known allocation size at each observed address.
    ///
    /// Entries are overwritten by any nonzero allocation effect and left
    /// stale (never removed) by release effects; only the answer to "what
    /// was the last known size here" matters for the delta computation.
    allocations: HashMap<Address, AllocationSize>,
}

impl MemoryUsageHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(&self) -> &MemoryUsageModel {
        &self.model
    }

    /// Consume the handler, yielding the populated data model
    pub fn into_data(self) -> MemoryUsageModel {
        self.model
    }

    /// The live allocation table as observed so far
    pub fn tracked_allocations(&self) -> &HashMap<Address, AllocationSize> {
        &self.allocations
    }

    fn handle_malloc(
        &mut self,
        record: &EventRecord,
        metadata: &EventMetadata,
        kind: EventKind,
    ) -> Result<(), Error> {
        let ptr = Address::from(record.field_u64(kind, FIELD_PTR)?);
        if !ptr.is_null() {
            let size = record.field_u64(kind, FIELD_SIZE)?;
            self.apply_effect(metadata, ptr, AllocationSize::from(size));
        }
        Ok(())
    }

    fn handle_calloc(
        &mut self,
        record: &EventRecord,
        metadata: &EventMetadata,
    ) -> Result<(), Error> {
        let kind = EventKind::Calloc;
        let ptr = Address::from(record.field_u64(kind, FIELD_PTR)?);
        if !ptr.is_null() {
            let nmemb = record.field_u64(kind, FIELD_NMEMB)?;
            let size = record.field_u64(kind, FIELD_SIZE)?;
            self.apply_effect(
                metadata,
                ptr,
                AllocationSize::from(size.saturating_mul(nmemb)),
            );
        }
        Ok(())
    }

    fn handle_realloc(
        &mut self,
        record: &EventRecord,
        metadata: &EventMetadata,
    ) -> Result<(), Error> {
        let kind = EventKind::Realloc;
        let ptr = Address::from(record.field_u64(kind, FIELD_PTR)?);
        if !ptr.is_null() {
            let new_ptr = Address::from(record.field_u64(kind, FIELD_IN_PTR)?);
            let size = record.field_u64(kind, FIELD_SIZE)?;
            // Modeled as "free old, allocate new", two effects in that
            // order, even when the old and new pointers are equal
            self.apply_effect(metadata, ptr, AllocationSize::from(0));
            self.apply_effect(metadata, new_ptr, AllocationSize::from(size));
        }
        Ok(())
    }

    fn handle_free(&mut self, record: &EventRecord, metadata: &EventMetadata) -> Result<(), Error> {
        let ptr = Address::from(record.field_u64(EventKind::Free, FIELD_PTR)?);
        if !ptr.is_null() {
            self.apply_effect(metadata, ptr, AllocationSize::from(0));
        }
        Ok(())
    }

    fn handle_posix_memalign(
        &mut self,
        record: &EventRecord,
        metadata: &EventMetadata,
    ) -> Result<(), Error> {
        let kind = EventKind::PosixMemalign;
        let ptr = Address::from(record.field_u64(kind, FIELD_OUT_PTR)?);
        if !ptr.is_null() {
            let size = record.field_u64(kind, FIELD_SIZE)?;
            self.apply_effect(metadata, ptr, AllocationSize::from(size));
        }
        Ok(())
    }

    /// Apply one normalized allocation effect: a gross `requested_size` being
    /// set at `pointer`, where a zero size means a release at that pointer.
    ///
    /// A nonzero size establishes a fresh absolute allocation at the address,
    /// overwriting whatever was tracked there before; no relative delta
    /// against the prior allocation is computed. A zero size resolves to the
    /// negated last known size, or to nothing at all if the pointer was never
    /// observed (a normal artifact of partial trace windows, not an error).
    /// Effects that resolve to a zero delta append no record.
    fn apply_effect(
        &mut self,
        metadata: &EventMetadata,
        pointer: Address,
        requested_size: AllocationSize,
    ) {
        let size_delta = if requested_size.get_raw() != 0 {
            self.allocations.insert(pointer, requested_size);
            SizeDelta::from(requested_size)
        } else {
            match self.allocations.get(&pointer) {
                Some(&last_known) => -SizeDelta::from(last_known),
                None => {
                    trace!(pointer = %pointer, "Release of an untracked allocation");
                    SizeDelta::ZERO
                }
            }
        };

        if !size_delta.is_zero() {
            self.model
                .append(metadata.timestamp, metadata.thread_id, size_delta);
        }
    }
}

impl EventHandler for MemoryUsageHandler {
    fn subscriptions(&self) -> Vec<EventKind> {
        enum_iterator::all::<EventKind>().collect()
    }

    fn handle(
        &mut self,
        kind: EventKind,
        record: &EventRecord,
        metadata: &EventMetadata,
    ) -> Result<(), Error> {
        match kind {
            // malloc, memalign and posix_memalign all carry a pointer and a
            // gross size; they differ only in which field names the pointer
            EventKind::Malloc | EventKind::Memalign => {
                self.handle_malloc(record, metadata, kind)
            }
            EventKind::Calloc => self.handle_calloc(record, metadata),
            EventKind::Realloc => self.handle_realloc(record, metadata),
            EventKind::Free => self.handle_free(record, metadata),
            EventKind::PosixMemalign => self.handle_posix_memalign(record, metadata),
        }
    }
}
