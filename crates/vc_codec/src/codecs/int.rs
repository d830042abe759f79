use alloc::sync::Arc;

use crate::codec::{MemoStrategy, ObjectCodec};
use crate::context::{DeserializationContext, SerializationContext};
use crate::error::SerializationError;
use crate::io::{CodedInput, CodedOutput};

/// Zigzag varint codec for [`i64`].
///
/// Integers are never memoized: a back-reference would not be shorter
/// than the value itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct I64Codec;

impl ObjectCodec for I64Codec {
    type Value = i64;

    #[inline]
    fn memo_strategy(&self) -> MemoStrategy {
        MemoStrategy::DoNotMemoize
    }

    fn serialize(
        &self,
        _ctx: &mut SerializationContext<'_>,
        value: &i64,
        out: &mut CodedOutput,
    ) -> Result<(), SerializationError> {
        out.write_varint_i64(*value);
        Ok(())
    }

    fn deserialize(
        &self,
        _ctx: &mut DeserializationContext<'_>,
        input: &mut CodedInput<'_>,
    ) -> Result<Arc<i64>, SerializationError> {
        input.read_varint_i64().map(Arc::new)
    }
}
