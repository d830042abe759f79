//! Codecs for leaf types that need no nested values.
//!
//! Register them one by one, or all at once with
//! [`register_builtin_codecs`].

mod bytes;
mod int;
mod string;

pub use bytes::BytesCodec;
pub use int::I64Codec;
pub use string::StringCodec;

use crate::registry::CodecRegistryBuilder;

/// Registers [`StringCodec`], [`I64Codec`] and [`BytesCodec`].
///
/// Types that already have a codec in `builder` keep it.
pub fn register_builtin_codecs(builder: &mut CodecRegistryBuilder) {
    builder.register(StringCodec);
    builder.register(I64Codec);
    builder.register(BytesCodec);
}
