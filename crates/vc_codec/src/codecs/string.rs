use alloc::string::String;
use alloc::sync::Arc;

use crate::codec::ObjectCodec;
use crate::context::{DeserializationContext, SerializationContext};
use crate::error::SerializationError;
use crate::io::{CodedInput, CodedOutput};

/// Length-prefixed UTF-8 codec for [`String`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StringCodec;

impl ObjectCodec for StringCodec {
    type Value = String;

    fn serialize(
        &self,
        _ctx: &mut SerializationContext<'_>,
        value: &String,
        out: &mut CodedOutput,
    ) -> Result<(), SerializationError> {
        out.write_str(value);
        Ok(())
    }

    fn deserialize(
        &self,
        _ctx: &mut DeserializationContext<'_>,
        input: &mut CodedInput<'_>,
    ) -> Result<Arc<String>, SerializationError> {
        input.read_string().map(Arc::new)
    }
}
