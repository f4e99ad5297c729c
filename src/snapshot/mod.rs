//! Binary snapshot codec for converted trace events.
//!
//! A CTF trace is converted once into a flat snapshot file of
//! `(event name, metadata, fields)` records; processing then reads the
//! snapshot back instead of re-parsing the trace. This module is the load
//! side of that pipeline (plus the matching writer, used by converters and
//! tests); the CTF parsing itself lives in the external converter.

use crate::event::{EventMetadata, EventRecord, FieldValue, TraceEvent};
use crate::time::Timestamp;
use crate::types::{Endianness, ThreadId};
use byteordered::ByteOrdered;
use std::io::{self, Read, Write};
use tracing::debug;

pub use error::Error;

pub mod error;

const TAG_U64: u8 = 0x00;
const TAG_I64: u8 = 0x01;
const TAG_STR: u8 = 0x02;

/// Snapshot file header: an endianness-revealing magic word followed by the
/// format version
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct HeaderInfo {
    pub endianness: Endianness,
    pub format_version: u16,
}

impl HeaderInfo {
    pub const WIRE_SIZE: usize = 6;
    /// `b"LTPS"` in the file's native byte order
    pub const MAGIC: u32 = 0x4C_54_50_53;
    pub const FORMAT_VERSION: u16 = 1;

    pub fn read_magic_word<R: Read>(r: &mut R) -> Result<Endianness, Error> {
        let mut magic = [0; 4];
        r.read_exact(&mut magic)?;
        let raw = u32::from_le_bytes(magic);
        let endianness = if raw == Self::MAGIC {
            Endianness::Little
        } else if raw.swap_bytes() == Self::MAGIC {
            Endianness::Big
        } else {
            return Err(Error::EndiannessIdentifier(raw));
        };
        Ok(endianness)
    }

    pub fn read<R: Read>(r: &mut R) -> Result<Self, Error> {
        let endianness = Self::read_magic_word(r)?;

        // The remaining fields are endian-aware
        let mut r = ByteOrdered::new(r, byteordered::Endianness::from(endianness));
        let format_version = r.read_u16()?;
        debug!(format_version = format_version, endianness = %endianness, "Found snapshot header");
        if format_version != Self::FORMAT_VERSION {
            return Err(Error::UnsupportedFormatVersion(format_version));
        }

        Ok(Self {
            endianness,
            format_version,
        })
    }

    pub fn write<W: Write>(&self, w: &mut W) -> Result<(), Error> {
        let mut w = ByteOrdered::new(w, byteordered::Endianness::from(self.endianness));
        w.write_u32(Self::MAGIC)?;
        w.write_u16(self.format_version)?;
        Ok(())
    }
}

/// Reads converted trace events back out of a snapshot stream.
///
/// [`read_event`](Self::read_event) yields `Ok(None)` on a clean end of
/// stream (at a record boundary); a truncated record is an error.
#[derive(Debug)]
pub struct SnapshotReader<R> {
    header: HeaderInfo,
    endianness: byteordered::Endianness,
    inner: R,
}

impl<R: Read> SnapshotReader<R> {
    /// Read and validate the snapshot header
    pub fn new(mut r: R) -> Result<Self, Error> {
        let header = HeaderInfo::read(&mut r)?;
        Ok(Self {
            header,
            endianness: header.endianness.into(),
            inner: r,
        })
    }

    pub fn header(&self) -> &HeaderInfo {
        &self.header
    }

    pub fn read_event(&mut self) -> Result<Option<TraceEvent>, Error> {
        let mut r = ByteOrdered::new(&mut self.inner, self.endianness);

        let name_len = match r.read_u16() {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let name = read_string(&mut r, usize::from(name_len))?;
        let timestamp = Timestamp::from_nanos(r.read_u64()?);
        let thread_id = ThreadId::from(r.read_u32()?);

        let num_fields = r.read_u8()?;
        let mut record = EventRecord::new();
        for _ in 0..num_fields {
            let field_name_len = r.read_u8()?;
            let field_name = read_string(&mut r, usize::from(field_name_len))?;
            let value = match r.read_u8()? {
                TAG_U64 => FieldValue::U64(r.read_u64()?),
                TAG_I64 => FieldValue::I64(r.read_i64()?),
                TAG_STR => {
                    let len = r.read_u16()?;
                    FieldValue::Str(read_string(&mut r, usize::from(len))?)
                }
                bad_tag => return Err(Error::InvalidFieldValueTag(bad_tag)),
            };
            record.set_field(field_name, value);
        }

        Ok(Some(TraceEvent::new(
            name,
            record,
            EventMetadata::new(timestamp, thread_id),
        )))
    }

    /// Drain the remaining events into memory, e.g. to feed
    /// `Processor::process`
    pub fn read_all(&mut self) -> Result<Vec<TraceEvent>, Error> {
        let mut events = Vec::new();
        while let Some(event) = self.read_event()? {
            events.push(event);
        }
        debug!(events = events.len(), "Read snapshot");
        Ok(events)
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Writes the snapshot form consumed by [`SnapshotReader`].
///
/// Fields are written in name order so that identical events serialize
/// identically regardless of record-construction order.
#[derive(Debug)]
pub struct SnapshotWriter<W> {
    endianness: byteordered::Endianness,
    inner: W,
}

impl<W: Write> SnapshotWriter<W> {
    /// Write the snapshot header
    pub fn new(mut w: W, endianness: Endianness) -> Result<Self, Error> {
        let header = HeaderInfo {
            endianness,
            format_version: HeaderInfo::FORMAT_VERSION,
        };
        header.write(&mut w)?;
        Ok(Self {
            endianness: endianness.into(),
            inner: w,
        })
    }

    pub fn write_event(&mut self, event: &TraceEvent) -> Result<(), Error> {
        let mut w = ByteOrdered::new(&mut self.inner, self.endianness);

        w.write_u16(wire_len_u16(&event.name)?)?;
        w.write_all(event.name.as_bytes())?;
        w.write_u64(event.metadata.timestamp.get_raw())?;
        w.write_u32(event.metadata.thread_id.get_raw())?;

        let num_fields = u8::try_from(event.record.len())
            .map_err(|_| Error::OversizedRecord(event.record.len()))?;
        w.write_u8(num_fields)?;

        let mut fields: Vec<(&str, &FieldValue)> = event.record.fields().collect();
        fields.sort_by_key(|(name, _)| *name);
        for (name, value) in fields {
            let name_len = u8::try_from(name.len())
                .map_err(|_| Error::OversizedRecord(name.len()))?;
            w.write_u8(name_len)?;
            w.write_all(name.as_bytes())?;
            match value {
                FieldValue::U64(v) => {
                    w.write_u8(TAG_U64)?;
                    w.write_u64(*v)?;
                }
                FieldValue::I64(v) => {
                    w.write_u8(TAG_I64)?;
                    w.write_i64(*v)?;
                }
                FieldValue::Str(v) => {
                    w.write_u8(TAG_STR)?;
                    w.write_u16(wire_len_u16(v)?)?;
                    w.write_all(v.as_bytes())?;
                }
            }
        }
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

fn wire_len_u16(s: &str) -> Result<u16, Error> {
    u16::try_from(s.len()).map_err(|_| Error::OversizedRecord(s.len()))
}

fn read_string<T: Read, E: byteordered::Endian>(
    r: &mut ByteOrdered<T, E>,
    len: usize,
) -> Result<String, Error> {
    let mut buf = vec![0; len];
    r.read_exact(&mut buf)?;
    Ok(String::from_utf8(buf)?)
}
