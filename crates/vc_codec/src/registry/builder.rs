use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::{Any, TypeId};

use vc_utils::TypeIdMap;
use vc_utils::hash::{FixedHashState, HashSet};

use crate::codec::{CodecAdapter, ErasedCodec, ObjectCodec, ObjectRef, object_addr};
use crate::error::RegistryError;
use crate::registry::{CodecDescriptor, CodecRegistry, Tag};

// -----------------------------------------------------------------------------
// CodecRegistryBuilder

/// Collects codecs and constants, then assigns tags in [`build`](Self::build).
///
/// Tag assignment only depends on the registered types and on the order in
/// which constants were added. Codecs are ordered by type name, and types
/// that share a name (one type from two crate versions, or types differing
/// only in lifetimes) by `TypeId`. Within one build of the program, two
/// builders fed the same codecs produce the same tags regardless of
/// registration order.
pub struct CodecRegistryBuilder {
    codecs: Vec<Box<dyn ErasedCodec>>,
    registered: TypeIdMap<()>,
    constants: Vec<ObjectRef>,
    constant_addrs: HashSet<usize>,
}

impl Default for CodecRegistryBuilder {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl CodecRegistryBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self {
            codecs: Vec::new(),
            registered: TypeIdMap::new(),
            constants: Vec::new(),
            constant_addrs: HashSet::with_hasher(FixedHashState),
        }
    }

    /// Registers `codec` for its value type.
    ///
    /// - Returns `true` if the type had no codec yet.
    /// - Returns `false` and keeps the existing codec otherwise.
    pub fn register<C: ObjectCodec>(&mut self, codec: C) -> bool {
        let type_id = TypeId::of::<C::Value>();
        if self.registered.try_insert(type_id, || ()) {
            self.codecs.push(Box::new(CodecAdapter(codec)));
            true
        } else {
            log::warn!(
                "codec for `{}` is already registered, ignoring `{}`",
                core::any::type_name::<C::Value>(),
                core::any::type_name::<C>(),
            );
            false
        }
    }

    /// Whether a codec for `T` has been registered.
    #[inline]
    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        self.registered.contains_type::<T>()
    }

    /// Adds `value` to the constant pool.
    ///
    /// Returns `false` if this allocation is already pooled.
    #[inline]
    pub fn add_constant<T: Any + Send + Sync>(&mut self, value: Arc<T>) -> bool {
        self.add_constant_object(value)
    }

    /// Type-erased form of [`add_constant`](Self::add_constant).
    pub fn add_constant_object(&mut self, value: ObjectRef) -> bool {
        if self.constant_addrs.insert(object_addr(&value)) {
            self.constants.push(value);
            true
        } else {
            false
        }
    }

    /// Assigns tags and freezes the registry.
    ///
    /// Constants take tags `1..=C` in insertion order, codecs follow,
    /// ordered by type name.
    pub fn build(self) -> Result<CodecRegistry, RegistryError> {
        let Self {
            mut codecs,
            constants,
            ..
        } = self;

        let total = constants.len() + codecs.len();
        if total > i32::MAX as usize {
            return Err(RegistryError::TagSpaceExhausted);
        }

        codecs.sort_by(|a, b| {
            a.value_type_name()
                .cmp(b.value_type_name())
                .then_with(|| a.value_type_id().cmp(&b.value_type_id()))
        });

        let first = constants.len() as i32 + 1;
        let descriptors: Vec<CodecDescriptor> = codecs
            .into_iter()
            .enumerate()
            .map(|(index, codec)| CodecDescriptor::new(Tag::new(first + index as i32), codec))
            .collect();

        log::debug!(
            "built codec registry: {} constant(s), {} codec(s)",
            constants.len(),
            descriptors.len(),
        );

        Ok(CodecRegistry::from_parts(descriptors, constants))
    }
}

// -----------------------------------------------------------------------------
// Tests
