//! Identity memoization for a single walk over an object graph.
//!
//! A memoizing context numbers every memoized object in the order it is
//! first met. The first occurrence is written in full after a `New` marker;
//! later occurrences of the same allocation are written as a `BackRef`
//! marker only. The decoder replays the numbering, so both sides agree on
//! ids without ever writing them ahead of time.
//!
//! The marker is a single unsigned varint, `(id << 1) | kind`, written
//! right after the tag of a memoized codec.

mod deserializer;
mod serializer;

pub(crate) use deserializer::MemoDeserializer;
pub(crate) use serializer::MemoSerializer;

use crate::error::{ProtocolError, SerializationError};
use crate::io::{CodedInput, CodedOutput};

/// Sequential index of a memoized object within one walk.
pub type MemoId = u32;

// -----------------------------------------------------------------------------
// MemoMarker

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MemoMarker {
    /// The payload follows and gets the next id.
    New(MemoId),
    /// No payload, the object was seen before.
    BackRef(MemoId),
}

impl MemoMarker {
    const BACK_REF_BIT: u64 = 1;

    pub(crate) fn write(self, out: &mut CodedOutput) {
        let raw = match self {
            Self::New(id) => u64::from(id) << 1,
            Self::BackRef(id) => (u64::from(id) << 1) | Self::BACK_REF_BIT,
        };
        out.write_varint_u64(raw);
    }

    pub(crate) fn read(input: &mut CodedInput<'_>) -> Result<Self, SerializationError> {
        let raw = input.read_varint_u64()?;
        let id = MemoId::try_from(raw >> 1).map_err(|_| ProtocolError::MalformedVarint)?;
        if raw & Self::BACK_REF_BIT == 0 {
            Ok(Self::New(id))
        } else {
            Ok(Self::BackRef(id))
        }
    }
}

// -----------------------------------------------------------------------------
// Tests
