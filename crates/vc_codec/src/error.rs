//! Error taxonomy of the codec engine.
//!
//! - [`ProtocolError`]: the byte stream does not follow the wire format.
//! - [`IoError`]: the underlying byte source or sink failed.
//! - [`RegistryError`]: a lookup into the [`CodecRegistry`](crate::registry::CodecRegistry) failed.
//! - [`ContextStateError`]: a context was driven through an illegal state transition.
//! - [`SerializationError`]: the umbrella returned by every (de)serialize call.

use alloc::string::{String, ToString};
use core::any::TypeId;
use core::fmt::Display;

use thiserror::Error;

use crate::memo::MemoId;
use crate::registry::Tag;

// -----------------------------------------------------------------------------
// IoError

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IoError {
    #[error("unexpected end of input: needed {needed} byte(s), {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    #[cfg(feature = "std")]
    #[error("byte sink failed: {0}")]
    Sink(#[from] std::io::Error),
}

// -----------------------------------------------------------------------------
// ProtocolError

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProtocolError {
    #[error("no codec or constant registered for tag {0}")]
    UnknownTag(Tag),

    #[error("malformed varint")]
    MalformedVarint,

    #[error("byte {0:#04x} is not a valid bool")]
    InvalidBool(u8),

    #[error("string payload is not valid UTF-8")]
    InvalidUtf8,

    #[error("type mismatch: expected `{expected}`, found `{found}`")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("unexpected null where `{expected}` is required")]
    UnexpectedNull { expected: &'static str },

    #[error("memo id {found} is out of sequence, expected {expected}")]
    InvalidMemoId { found: MemoId, expected: MemoId },

    #[error("back-reference to unknown memo id {0}")]
    DanglingBackReference(MemoId),

    #[error("cyclic reference to `{type_name}`, which is not registered as cycle-safe")]
    CyclicReference { type_name: &'static str },

    #[error("{remaining} trailing byte(s) after the root value")]
    TrailingBytes { remaining: usize },
}

// -----------------------------------------------------------------------------
// RegistryError

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RegistryError {
    #[error("no codec registered for type `{}` ({type_id:?})", .type_name.unwrap_or("<erased>"))]
    UnknownType {
        type_id: TypeId,
        type_name: Option<&'static str>,
    },

    #[error("tag {0} does not denote a registered codec")]
    InvalidTag(Tag),

    #[error("registry holds more entries than the tag space allows")]
    TagSpaceExhausted,
}

// -----------------------------------------------------------------------------
// ContextStateError

/// Illegal context state transitions.
///
/// These indicate a defect in the calling code rather than bad data.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ContextStateError {
    #[error("memoization disabled")]
    MemoizationDisabled,

    #[error("memoization already disabled")]
    MemoizationAlreadyDisabled,

    #[error("memoizer already attached")]
    MemoizerAlreadyAttached,

    #[error("operation requires a memoizing context")]
    NotMemoizing,
}

// -----------------------------------------------------------------------------
// SerializationError

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SerializationError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Io(#[from] IoError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    State(#[from] ContextStateError),

    #[error("codec for `{type_name}` failed: {message}")]
    Codec {
        type_name: &'static str,
        message: String,
        /// Types being processed when the error was raised, outermost first.
        ///
        /// Only filled with the `debug` feature in debug builds.
        trace: Option<String>,
    },

    #[error("nesting depth exceeds the limit of {limit}")]
    DepthLimitExceeded { limit: usize },

    #[error("type `{type_name}` is not explicitly allowed in this context")]
    TypeNotAllowed { type_name: &'static str },
}

impl SerializationError {
    /// Creates a [`SerializationError::Codec`] for values of type `T`.
    ///
    /// Codecs use this for malformed payloads and invariant violations
    /// in reconstructed values.
    pub fn codec<T: ?Sized>(message: impl Display) -> Self {
        Self::Codec {
            type_name: core::any::type_name::<T>(),
            message: message.to_string(),
            trace: None,
        }
    }

    /// Returns the recorded type stack, if any.
    pub fn trace(&self) -> Option<&str> {
        match self {
            Self::Codec { trace, .. } => trace.as_deref(),
            _ => None,
        }
    }

    /// Returns `true` for failures of the byte source or sink.
    #[inline]
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }

    /// Returns `true` for wire format violations.
    #[inline]
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol(_))
    }
}
