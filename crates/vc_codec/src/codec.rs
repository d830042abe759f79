//! The [`ObjectCodec`] capability and its type-erased form.

use alloc::sync::Arc;
use core::any::{Any, TypeId};

use crate::context::{DeserializationContext, SerializationContext};
use crate::error::{ProtocolError, SerializationError};
use crate::io::{CodedInput, CodedOutput};

// -----------------------------------------------------------------------------
// ObjectRef

/// A shared, type-erased object.
///
/// The identity of an object is the address of its `Arc` allocation:
/// two `ObjectRef`s alias exactly when [`Arc::ptr_eq`] holds.
pub type ObjectRef = Arc<dyn Any + Send + Sync>;

/// Returns the identity of `object`, i.e. the address of its allocation.
#[inline]
pub(crate) fn object_addr(object: &ObjectRef) -> usize {
    Arc::as_ptr(object).cast::<()>().addr()
}

/// Returns the [`TypeId`] of the value behind `object`.
#[inline]
pub(crate) fn object_type_id(object: &ObjectRef) -> TypeId {
    // Deref twice, otherwise this is the `TypeId` of the `Arc` itself.
    Any::type_id(&**object)
}

// -----------------------------------------------------------------------------
// MemoStrategy

/// How values of a codec's type take part in memoization.
///
/// Only meaningful for memoizing contexts; other contexts ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MemoStrategy {
    /// No memo marker is written; every occurrence is encoded in full.
    ///
    /// Suitable for small value types where identity does not matter.
    DoNotMemoize,
    /// The codec registers a provisional value through
    /// [`DeserializationContext::register_initial_value`] before decoding
    /// nested fields, so nested references back to it resolve to the same
    /// allocation. Required for types that can appear in a cycle.
    ///
    /// The same codec also runs in plain contexts, where there is no memo
    /// table to register with, so the call is guarded by
    /// [`DeserializationContext::is_memoizing`].
    MemoizeBefore,
    /// The value enters the memo table once it is fully decoded.
    ///
    /// Shared references are preserved, but a reference back to the value
    /// from inside its own payload fails with
    /// [`ProtocolError::CyclicReference`].
    #[default]
    MemoizeAfter,
}

// -----------------------------------------------------------------------------
// ObjectCodec

/// Encodes and decodes the fields of one type.
///
/// Nested values are written and read through the context, which selects
/// their codecs by tag. The field order of `serialize` must match the
/// order of `deserialize` exactly; the wire carries no field tags.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use vc_codec::{ObjectCodec, SerializationContext, DeserializationContext, SerializationError};
/// use vc_codec::io::{CodedInput, CodedOutput};
///
/// struct Label {
///     text: Arc<String>,
///     weight: i64,
/// }
///
/// struct LabelCodec;
///
/// impl ObjectCodec for LabelCodec {
///     type Value = Label;
///
///     fn serialize(
///         &self,
///         ctx: &mut SerializationContext<'_>,
///         value: &Label,
///         out: &mut CodedOutput,
///     ) -> Result<(), SerializationError> {
///         ctx.serialize(Some(&value.text), out)?;
///         out.write_varint_i64(value.weight);
///         Ok(())
///     }
///
///     fn deserialize(
///         &self,
///         ctx: &mut DeserializationContext<'_>,
///         input: &mut CodedInput<'_>,
///     ) -> Result<Arc<Label>, SerializationError> {
///         let text = ctx.deserialize_required::<String>(input)?;
///         let weight = input.read_varint_i64()?;
///         Ok(Arc::new(Label { text, weight }))
///     }
/// }
/// ```
pub trait ObjectCodec: Send + Sync + 'static {
    /// The type handled by this codec.
    type Value: Any + Send + Sync;

    /// See [`MemoStrategy`].
    fn memo_strategy(&self) -> MemoStrategy {
        MemoStrategy::MemoizeAfter
    }

    fn serialize(
        &self,
        ctx: &mut SerializationContext<'_>,
        value: &Self::Value,
        out: &mut CodedOutput,
    ) -> Result<(), SerializationError>;

    fn deserialize(
        &self,
        ctx: &mut DeserializationContext<'_>,
        input: &mut CodedInput<'_>,
    ) -> Result<Arc<Self::Value>, SerializationError>;
}

// -----------------------------------------------------------------------------
// ErasedCodec

/// Object-safe view of an [`ObjectCodec`], stored in the registry.
pub(crate) trait ErasedCodec: Send + Sync {
    fn value_type_id(&self) -> TypeId;

    fn value_type_name(&self) -> &'static str;

    fn memo_strategy(&self) -> MemoStrategy;

    fn serialize_erased(
        &self,
        ctx: &mut SerializationContext<'_>,
        value: &ObjectRef,
        out: &mut CodedOutput,
    ) -> Result<(), SerializationError>;

    fn deserialize_erased(
        &self,
        ctx: &mut DeserializationContext<'_>,
        input: &mut CodedInput<'_>,
    ) -> Result<ObjectRef, SerializationError>;
}

pub(crate) struct CodecAdapter<C>(pub C);

impl<C: ObjectCodec> ErasedCodec for CodecAdapter<C> {
    #[inline]
    fn value_type_id(&self) -> TypeId {
        TypeId::of::<C::Value>()
    }

    #[inline]
    fn value_type_name(&self) -> &'static str {
        core::any::type_name::<C::Value>()
    }

    #[inline]
    fn memo_strategy(&self) -> MemoStrategy {
        self.0.memo_strategy()
    }

    fn serialize_erased(
        &self,
        ctx: &mut SerializationContext<'_>,
        value: &ObjectRef,
        out: &mut CodedOutput,
    ) -> Result<(), SerializationError> {
        match value.downcast_ref::<C::Value>() {
            Some(value) => self.0.serialize(ctx, value, out),
            // Descriptors are selected by `TypeId`, so this is a registry defect.
            None => Err(ProtocolError::TypeMismatch {
                expected: core::any::type_name::<C::Value>(),
                found: "<erased>",
            }
            .into()),
        }
    }

    fn deserialize_erased(
        &self,
        ctx: &mut DeserializationContext<'_>,
        input: &mut CodedInput<'_>,
    ) -> Result<ObjectRef, SerializationError> {
        let value: ObjectRef = self.0.deserialize(ctx, input)?;
        Ok(value)
    }
}
