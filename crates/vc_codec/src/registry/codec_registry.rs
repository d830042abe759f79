use alloc::vec::Vec;
use core::any::TypeId;
use core::fmt;

use vc_utils::TypeIdMap;
use vc_utils::hash::{FixedHashState, HashMap};

use crate::codec::{ObjectRef, object_addr};
use crate::error::RegistryError;
use crate::registry::{CodecDescriptor, CodecRegistryBuilder, Tag};

// -----------------------------------------------------------------------------
// CodecRegistry

/// Immutable mapping from types to tags and codecs, and from tags back.
///
/// Also holds a constant pool: well-known singletons that are written as a
/// bare tag and decoded to the very same allocation, without any codec.
///
/// A registry never changes after [`CodecRegistryBuilder::build`], so it can
/// be shared freely between threads and sessions.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use vc_codec::registry::{CodecRegistry, Tag};
/// use vc_codec::codecs::StringCodec;
///
/// let empty = Arc::new(String::new());
///
/// let mut builder = CodecRegistry::builder();
/// builder.add_constant(empty.clone());
/// builder.register(StringCodec);
/// let registry = builder.build().unwrap();
///
/// // Constants come first.
/// assert_eq!(registry.constant_count(), 1);
/// assert!(registry.maybe_get_constant(Tag::new(1)).is_some());
///
/// let descriptor = registry.lookup::<String>().unwrap();
/// assert_eq!(descriptor.tag(), Tag::new(2));
/// assert_eq!(registry.lookup_by_tag(Tag::new(2)).unwrap().type_name(), descriptor.type_name());
/// ```
pub struct CodecRegistry {
    // Indexed by `tag - constants.len() - 1`.
    descriptors: Vec<CodecDescriptor>,
    type_to_index: TypeIdMap<usize>,
    // Indexed by `tag - 1`.
    constants: Vec<ObjectRef>,
    constant_addr_to_tag: HashMap<usize, Tag>,
}

impl CodecRegistry {
    /// Creates a builder, see [`CodecRegistryBuilder`].
    #[inline]
    pub fn builder() -> CodecRegistryBuilder {
        CodecRegistryBuilder::new()
    }

    /// Assembles a registry from entries already put in tag order.
    pub(super) fn from_parts(
        descriptors: Vec<CodecDescriptor>,
        constants: Vec<ObjectRef>,
    ) -> Self {
        let mut type_to_index = TypeIdMap::with_capacity(descriptors.len());
        for (index, descriptor) in descriptors.iter().enumerate() {
            type_to_index.insert(descriptor.type_id(), index);
        }

        let mut constant_addr_to_tag =
            HashMap::with_capacity_and_hasher(constants.len(), FixedHashState);
        for (index, constant) in constants.iter().enumerate() {
            // Tags were validated by the builder.
            constant_addr_to_tag.insert(object_addr(constant), Tag::new(index as i32 + 1));
        }

        Self {
            descriptors,
            type_to_index,
            constants,
            constant_addr_to_tag,
        }
    }

    /// Returns the descriptor for values of the given type.
    pub fn lookup_by_type_id(&self, type_id: TypeId) -> Result<&CodecDescriptor, RegistryError> {
        match self.type_to_index.get(&type_id) {
            Some(index) => Ok(&self.descriptors[*index]),
            None => Err(RegistryError::UnknownType {
                type_id,
                type_name: None,
            }),
        }
    }

    /// Returns the descriptor for values of type `T`.
    pub fn lookup<T: ?Sized + 'static>(&self) -> Result<&CodecDescriptor, RegistryError> {
        match self.type_to_index.get_type::<T>() {
            Some(index) => Ok(&self.descriptors[*index]),
            None => Err(RegistryError::UnknownType {
                type_id: TypeId::of::<T>(),
                type_name: Some(core::any::type_name::<T>()),
            }),
        }
    }

    /// Returns the descriptor assigned to `tag`.
    ///
    /// Null and constant tags are not codec tags and yield
    /// [`RegistryError::InvalidTag`].
    pub fn lookup_by_tag(&self, tag: Tag) -> Result<&CodecDescriptor, RegistryError> {
        let first = self.constants.len() as i64 + 1;
        let offset = i64::from(tag.get()) - first;
        usize::try_from(offset)
            .ok()
            .and_then(|index| self.descriptors.get(index))
            .ok_or(RegistryError::InvalidTag(tag))
    }

    /// Returns the constant assigned to `tag`, if any.
    #[inline]
    pub fn maybe_get_constant(&self, tag: Tag) -> Option<&ObjectRef> {
        let index = usize::try_from(tag.get()).ok()?.checked_sub(1)?;
        self.constants.get(index)
    }

    /// Returns the tag of `object` if it is one of the pooled constants.
    ///
    /// Matching is by identity, not by value.
    #[inline]
    pub fn constant_tag_of(&self, object: &ObjectRef) -> Option<Tag> {
        self.constant_addr_to_tag.get(&object_addr(object)).copied()
    }

    /// Whether a codec is registered for the given [`TypeId`].
    #[inline]
    pub fn contains(&self, type_id: TypeId) -> bool {
        self.type_to_index.contains(&type_id)
    }

    /// Number of registered codecs.
    #[inline]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty() && self.constants.is_empty()
    }

    /// Number of pooled constants.
    #[inline]
    pub fn constant_count(&self) -> usize {
        self.constants.len()
    }

    /// Iterates over the descriptors in tag order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &CodecDescriptor> {
        self.descriptors.iter()
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("constants", &self.constants.len())
            .field("descriptors", &self.descriptors)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Tests
