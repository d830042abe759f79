#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

// -----------------------------------------------------------------------------
// no_std support

#[cfg(any(test, feature = "std"))]
extern crate std;

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod codec;
mod context;
mod dependency;
mod memo;
mod object_codecs;

pub mod codecs;
pub mod error;
pub mod io;
pub mod registry;

// -----------------------------------------------------------------------------
// Top-level exports

pub use codec::{MemoStrategy, ObjectCodec, ObjectRef};
pub use context::{
    CodecOptions, DEFAULT_MAX_DEPTH, DeserializationContext, MemoizationPermission,
    SerializationContext,
};
pub use dependency::{DependencyMap, DependencyMapBuilder};
pub use error::SerializationError;
pub use memo::MemoId;
pub use object_codecs::ObjectCodecs;
pub use registry::CodecRegistry;
