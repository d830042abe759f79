use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::codec::ObjectCodec;
use crate::context::{DeserializationContext, SerializationContext};
use crate::error::SerializationError;
use crate::io::{CodedInput, CodedOutput};

/// Length-prefixed codec for byte strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesCodec;

impl ObjectCodec for BytesCodec {
    type Value = Vec<u8>;

    fn serialize(
        &self,
        _ctx: &mut SerializationContext<'_>,
        value: &Vec<u8>,
        out: &mut CodedOutput,
    ) -> Result<(), SerializationError> {
        out.write_bytes(value);
        Ok(())
    }

    fn deserialize(
        &self,
        _ctx: &mut DeserializationContext<'_>,
        input: &mut CodedInput<'_>,
    ) -> Result<Arc<Vec<u8>>, SerializationError> {
        let bytes = input.read_bytes()?;
        Ok(Arc::new(bytes.to_vec()))
    }
}
