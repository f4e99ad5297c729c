//! Types shared by the event stream and the data models

use derive_more::{Add, AddAssign, Binary, Display, From, Into, LowerHex, Neg, Octal, Sum, UpperHex};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
pub enum Endianness {
    #[display(fmt = "little-endian")]
    Little,
    #[display(fmt = "big-endian")]
    Big,
}

impl From<byteordered::Endianness> for Endianness {
    fn from(e: byteordered::Endianness) -> Self {
        match e {
            byteordered::Endianness::Little => Endianness::Little,
            byteordered::Endianness::Big => Endianness::Big,
        }
    }
}

impl From<Endianness> for byteordered::Endianness {
    fn from(e: Endianness) -> byteordered::Endianness {
        match e {
            Endianness::Little => byteordered::Endianness::Little,
            Endianness::Big => byteordered::Endianness::Big,
        }
    }
}

/// Identifier of the thread a trace event was captured on (the tracer's
/// `vtid`).
#[derive(
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Debug,
    From,
    Into,
    Display,
    Binary,
    Octal,
    LowerHex,
    UpperHex,
)]
#[display(fmt = "{_0}")]
pub struct ThreadId(pub(crate) u32);

impl ThreadId {
    pub fn get_raw(&self) -> u32 {
        self.0
    }
}

/// Opaque address key identifying an allocation site for as long as the
/// tracker observes it live. Never validated against real memory.
#[derive(
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Debug,
    From,
    Into,
    Display,
    Binary,
    Octal,
    LowerHex,
    UpperHex,
)]
#[display(fmt = "0x{_0:X}")]
pub struct Address(pub(crate) u64);

impl Address {
    /// The null address; guarded out upstream, never tracked.
    pub const NULL: Self = Self(0);

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }

    pub fn get_raw(&self) -> u64 {
        self.0
    }
}

/// Gross allocation size in bytes, as reported by a libc wrapper event.
#[derive(
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Debug,
    From,
    Into,
    Display,
    Add,
    Sum,
    AddAssign,
)]
#[display(fmt = "{_0}")]
pub struct AllocationSize(pub(crate) u64);

impl AllocationSize {
    pub fn get_raw(&self) -> u64 {
        self.0
    }
}

/// Signed byte count: the net change in tracked allocation size attributable
/// to one event. Positive is growth, negative is shrink.
#[derive(
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Debug,
    From,
    Into,
    Display,
    Add,
    Sum,
    AddAssign,
    Neg,
)]
#[display(fmt = "{_0}")]
pub struct SizeDelta(pub(crate) i64);

impl SizeDelta {
    pub const ZERO: Self = Self(0);

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn get_raw(&self) -> i64 {
        self.0
    }
}

impl From<AllocationSize> for SizeDelta {
    fn from(size: AllocationSize) -> Self {
        Self(size.0 as i64)
    }
}
