use alloc::boxed::Box;
use core::any::TypeId;
use core::fmt;

use crate::codec::{ErasedCodec, MemoStrategy, ObjectRef};
use crate::context::{DeserializationContext, SerializationContext};
use crate::error::SerializationError;
use crate::io::{CodedInput, CodedOutput};
use crate::registry::Tag;

/// A registered codec together with its [`Tag`] and value type.
///
/// Obtained from [`CodecRegistry::lookup_by_tag`] or
/// [`CodecRegistry::lookup_by_type_id`].
///
/// [`CodecRegistry::lookup_by_tag`]: crate::registry::CodecRegistry::lookup_by_tag
/// [`CodecRegistry::lookup_by_type_id`]: crate::registry::CodecRegistry::lookup_by_type_id
pub struct CodecDescriptor {
    tag: Tag,
    codec: Box<dyn ErasedCodec>,
}

impl CodecDescriptor {
    #[inline]
    pub(super) fn new(tag: Tag, codec: Box<dyn ErasedCodec>) -> Self {
        Self { tag, codec }
    }

    #[inline]
    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// The [`TypeId`] of the values handled by the codec.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.codec.value_type_id()
    }

    /// The type name of the values handled by the codec.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.codec.value_type_name()
    }

    #[inline]
    pub fn memo_strategy(&self) -> MemoStrategy {
        self.codec.memo_strategy()
    }

    /// Runs the codec on `value`, without writing the tag.
    #[inline]
    pub(crate) fn serialize(
        &self,
        ctx: &mut SerializationContext<'_>,
        value: &ObjectRef,
        out: &mut CodedOutput,
    ) -> Result<(), SerializationError> {
        self.codec.serialize_erased(ctx, value, out)
    }

    /// Runs the codec on the payload following the tag.
    #[inline]
    pub(crate) fn deserialize(
        &self,
        ctx: &mut DeserializationContext<'_>,
        input: &mut CodedInput<'_>,
    ) -> Result<ObjectRef, SerializationError> {
        self.codec.deserialize_erased(ctx, input)
    }
}

impl fmt::Debug for CodecDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecDescriptor")
            .field("tag", &self.tag)
            .field("type_name", &self.type_name())
            .field("memo_strategy", &self.memo_strategy())
            .finish()
    }
}
