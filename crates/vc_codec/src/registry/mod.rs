//! Mapping between types, tags and codecs.
//!
//! ## Menu
//!
//! - [`Tag`]: the integer written in front of every encoded value.
//! - [`CodecDescriptor`]: a registered codec together with its tag and type.
//! - [`CodecRegistry`]: the immutable lookup table, built once and shared.
//! - [`CodecRegistryBuilder`]: collects codecs and constants and assigns tags.
//!
//! ## Tag layout
//!
//! - `0` denotes null.
//! - `1..=C` denote the `C` constants, in the order they were added.
//! - `C+1..=C+N` denote the `N` codecs, ordered by type name.

// -----------------------------------------------------------------------------
// Modules

mod builder;
mod codec_registry;
mod descriptor;
mod tag;

// -----------------------------------------------------------------------------
// Exports

pub use builder::CodecRegistryBuilder;
pub use codec_registry::CodecRegistry;
pub use descriptor::CodecDescriptor;
pub use tag::Tag;
