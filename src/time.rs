use derive_more::{Add, AddAssign, Binary, Display, Into, LowerHex, Octal, Sub, Sum, UpperHex};

/// Timestamp of a trace event, in source-clock units (monotonic nanoseconds
/// as captured by the tracer).
///
/// Stream order is authoritative for processing; timestamps are carried
/// through to the output records untouched.
#[derive(
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Debug,
    Display,
    Into,
    Binary,
    Octal,
    LowerHex,
    UpperHex,
    Add,
    Sub,
    Sum,
    AddAssign,
)]
#[display(fmt = "{_0}")]
pub struct Timestamp(pub(crate) u64);

impl Timestamp {
    pub fn zero() -> Self {
        Self(0)
    }

    pub fn from_nanos(ns: u64) -> Self {
        Self(ns)
    }

    pub fn get_raw(&self) -> u64 {
        self.0
    }

    pub fn nanos(&self) -> u64 {
        self.get_raw()
    }
}

impl From<u64> for Timestamp {
    fn from(ns: u64) -> Self {
        Self::from_nanos(ns)
    }
}
