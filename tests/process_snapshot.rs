use lttng_trace_processor::event::{EventMetadata, EventRecord, TraceEvent};
use lttng_trace_processor::processor::{MemoryUsageHandler, Processor};
use lttng_trace_processor::snapshot::{SnapshotReader, SnapshotWriter};
use lttng_trace_processor::types::{Address, AllocationSize, Endianness, ThreadId};
use lttng_trace_processor::Error;
use pretty_assertions::assert_eq;

struct StreamBuilder {
    events: Vec<TraceEvent>,
    next_ts: u64,
}

impl StreamBuilder {
    fn new() -> Self {
        Self {
            events: Vec::new(),
            next_ts: 1000,
        }
    }

    fn push(&mut self, name: &str, tid: u32, record: EventRecord) -> &mut Self {
        let metadata = EventMetadata::new(self.next_ts.into(), tid.into());
        self.next_ts += 10;
        self.events.push(TraceEvent::new(name, record, metadata));
        self
    }

    fn malloc(&mut self, tid: u32, ptr: u64, size: u64) -> &mut Self {
        self.push(
            "lttng_ust_libc:malloc",
            tid,
            EventRecord::new().with_field("ptr", ptr).with_field("size", size),
        )
    }

    fn free(&mut self, tid: u32, ptr: u64) -> &mut Self {
        self.push(
            "lttng_ust_libc:free",
            tid,
            EventRecord::new().with_field("ptr", ptr),
        )
    }

    fn snapshot(&self, endianness: Endianness) -> Vec<u8> {
        let mut writer = SnapshotWriter::new(Vec::new(), endianness).unwrap();
        for event in &self.events {
            writer.write_event(event).unwrap();
        }
        writer.into_inner()
    }
}

#[test_log::test]
fn snapshot_stream_end_to_end() {
    let mut stream = StreamBuilder::new();
    stream
        .malloc(1, 100, 50)
        .malloc(2, 200, 30)
        // Unrelated event kinds are interleaved in any real trace
        .push("sched_switch", 1, EventRecord::new().with_field("prev_comm", "demo"))
        .free(1, 100)
        .free(1, 999);
    let bytes = stream.snapshot(Endianness::Little);

    let mut reader = SnapshotReader::new(bytes.as_slice()).unwrap();
    let events = reader.read_all().unwrap();
    assert_eq!(events.len(), 5);

    let mut processor = Processor::new(MemoryUsageHandler::new()).unwrap();
    let count = processor.process(events).unwrap();
    assert_eq!(count, 5);

    let handler = processor.into_handler();

    // The free of the never-observed pointer 999 is suppressed
    let deltas: Vec<i64> = handler
        .data()
        .iter()
        .map(|r| r.size_delta.get_raw())
        .collect();
    assert_eq!(deltas, vec![50, 30, -50]);

    // Records carry the metadata they were dispatched with, in stream order
    let first = handler.data().records()[0];
    assert_eq!(first.timestamp.nanos(), 1000);
    assert_eq!(first.thread_id, ThreadId::from(1));

    // Pointer 100 stays tracked (stale), 999 never enters the table
    let table = handler.tracked_allocations();
    assert_eq!(table.len(), 2);
    assert_eq!(table[&Address::from(100u64)], AllocationSize::from(50));
    assert_eq!(table[&Address::from(200u64)], AllocationSize::from(30));

    let per_thread = handler.data().net_change_by_thread();
    assert_eq!(per_thread[&ThreadId::from(1)].get_raw(), 0);
    assert_eq!(per_thread[&ThreadId::from(2)].get_raw(), 30);
}

#[test_log::test]
fn big_endian_snapshots_process_identically() {
    let mut stream = StreamBuilder::new();
    stream.malloc(7, 0xA000, 128).free(7, 0xA000);

    for endianness in [Endianness::Little, Endianness::Big] {
        let bytes = stream.snapshot(endianness);
        let mut reader = SnapshotReader::new(bytes.as_slice()).unwrap();
        let mut processor = Processor::new(MemoryUsageHandler::new()).unwrap();
        processor.process(reader.read_all().unwrap()).unwrap();
        let model = processor.into_handler().into_data();
        assert_eq!(model.len(), 2);
        assert_eq!(model.net_change().get_raw(), 0);
    }
}

#[test_log::test]
fn malformed_event_aborts_processing() {
    let mut stream = StreamBuilder::new();
    stream
        .malloc(1, 0x100, 16)
        // A malloc that claims the kind but lacks its size field
        .push(
            "lttng_ust_libc:malloc",
            1,
            EventRecord::new().with_field("ptr", 0x200u64),
        )
        .malloc(1, 0x300, 32);
    let bytes = stream.snapshot(Endianness::Little);

    let mut reader = SnapshotReader::new(bytes.as_slice()).unwrap();
    let mut processor = Processor::new(MemoryUsageHandler::new()).unwrap();
    let err = processor.process(reader.read_all().unwrap()).unwrap_err();
    assert!(matches!(err, Error::MissingField(_, "size")));

    // Fail fast: the event after the malformed one was never applied
    assert_eq!(processor.handler().data().len(), 1);
}

#[test_log::test]
fn skip_and_continue_is_the_callers_choice() {
    let mut stream = StreamBuilder::new();
    stream
        .malloc(1, 0x100, 16)
        .push(
            "lttng_ust_libc:malloc",
            1,
            EventRecord::new().with_field("ptr", 0x200u64),
        )
        .free(1, 0x100);
    let bytes = stream.snapshot(Endianness::Little);

    let mut reader = SnapshotReader::new(bytes.as_slice()).unwrap();
    let mut processor = Processor::new(MemoryUsageHandler::new()).unwrap();

    // Driving dispatch directly implements the skip policy
    let mut skipped = 0;
    while let Some(event) = reader.read_event().unwrap() {
        if processor
            .dispatch(&event.name, &event.record, &event.metadata)
            .is_err()
        {
            skipped += 1;
        }
    }
    assert_eq!(skipped, 1);

    let model = processor.into_handler().into_data();
    let deltas: Vec<i64> = model.iter().map(|r| r.size_delta.get_raw()).collect();
    assert_eq!(deltas, vec![16, -16]);
}
