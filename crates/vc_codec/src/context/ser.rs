use alloc::sync::Arc;
use core::any::{Any, TypeId};
use core::fmt;

use vc_utils::TypeIdMap;

#[cfg(all(debug_assertions, feature = "debug"))]
use super::trace::TypeStack;
use super::{CodecOptions, MemoizationPermission};
use crate::codec::{MemoStrategy, ObjectRef, object_type_id};
use crate::dependency::DependencyMap;
use crate::error::{ContextStateError, SerializationError};
use crate::io::CodedOutput;
use crate::memo::{MemoMarker, MemoSerializer};
use crate::registry::{CodecDescriptor, CodecRegistry, Tag};

// -----------------------------------------------------------------------------
// SerializationContext

/// Encode-side context handed to every [`ObjectCodec::serialize`].
///
/// Writes values as `tag [memo-marker] [payload]`:
///
/// - `None` is the null tag alone.
/// - A pooled constant is its tag alone.
/// - Anything else is the tag of its codec followed by the codec output.
///   Memoizing contexts put a memo marker in between, and write an object
///   seen before as a back-reference without payload.
///
/// [`ObjectCodec::serialize`]: crate::ObjectCodec::serialize
pub struct SerializationContext<'a> {
    registry: &'a CodecRegistry,
    dependencies: &'a DependencyMap,
    permission: MemoizationPermission,
    memo: Option<MemoSerializer>,
    allowed_types: TypeIdMap<()>,
    depth: usize,
    max_depth: usize,
    #[cfg(all(debug_assertions, feature = "debug"))]
    types: TypeStack,
}

impl<'a> SerializationContext<'a> {
    /// Creates a fresh, non-memoizing context with default options.
    #[inline]
    pub fn new(registry: &'a CodecRegistry, dependencies: &'a DependencyMap) -> Self {
        Self::with_options(registry, dependencies, CodecOptions::new())
    }

    pub fn with_options(
        registry: &'a CodecRegistry,
        dependencies: &'a DependencyMap,
        options: CodecOptions,
    ) -> Self {
        Self {
            registry,
            dependencies,
            permission: MemoizationPermission::Allowed,
            memo: None,
            allowed_types: TypeIdMap::new(),
            depth: 0,
            max_depth: options.max_depth,
            #[cfg(all(debug_assertions, feature = "debug"))]
            types: TypeStack::new(),
        }
    }

    #[inline]
    pub fn registry(&self) -> &'a CodecRegistry {
        self.registry
    }

    #[inline]
    pub fn permission(&self) -> MemoizationPermission {
        self.permission
    }

    #[inline]
    pub fn is_memoizing(&self) -> bool {
        self.memo.is_some()
    }

    /// Returns the dependency registered for `T`, if any.
    #[inline]
    pub fn get_dependency<T: Any + Send + Sync>(&self) -> Option<&'a T> {
        self.dependencies.get::<T>()
    }

    /// Switches memoization on.
    ///
    /// Returns the context itself, with the same memo table, if it is
    /// already memoizing.
    ///
    /// # Errors
    ///
    /// [`ContextStateError::MemoizationDisabled`] if this context lineage
    /// had memoization disabled.
    pub fn get_memoizing_context(mut self) -> Result<Self, ContextStateError> {
        if self.permission == MemoizationPermission::Disabled {
            return Err(ContextStateError::MemoizationDisabled);
        }
        if self.memo.is_none() {
            self.memo = Some(MemoSerializer::new());
        }
        Ok(self)
    }

    /// Forbids memoization for this context for good.
    ///
    /// # Errors
    ///
    /// - [`ContextStateError::MemoizationAlreadyDisabled`] if called twice.
    /// - [`ContextStateError::MemoizerAlreadyAttached`] on a memoizing context.
    pub fn disable_memoization(mut self) -> Result<Self, ContextStateError> {
        if self.permission == MemoizationPermission::Disabled {
            return Err(ContextStateError::MemoizationAlreadyDisabled);
        }
        if self.memo.is_some() {
            return Err(ContextStateError::MemoizerAlreadyAttached);
        }
        self.permission = MemoizationPermission::Disabled;
        Ok(self)
    }

    /// Marks `T` as explicitly allowed for the rest of this walk.
    ///
    /// Codecs that only accept a closed set of nested types check it with
    /// [`check_type_allowed`](Self::check_type_allowed).
    pub fn allow_type<T: Any>(&mut self) -> Result<(), ContextStateError> {
        if self.memo.is_none() {
            return Err(ContextStateError::NotMemoizing);
        }
        self.allowed_types.insert(TypeId::of::<T>(), ());
        Ok(())
    }

    pub fn check_type_allowed<T: Any>(&self) -> Result<(), SerializationError> {
        if self.allowed_types.contains_type::<T>() {
            Ok(())
        } else {
            Err(SerializationError::TypeNotAllowed {
                type_name: core::any::type_name::<T>(),
            })
        }
    }

    /// Writes `value`, or the null tag for `None`.
    #[inline]
    pub fn serialize<T: Any + Send + Sync>(
        &mut self,
        value: Option<&Arc<T>>,
        out: &mut CodedOutput,
    ) -> Result<(), SerializationError> {
        match value {
            Some(value) => {
                let object: ObjectRef = value.clone();
                self.serialize_object(Some(&object), out)
            }
            None => self.serialize_object(None, out),
        }
    }

    /// Type-erased form of [`serialize`](Self::serialize).
    pub fn serialize_object(
        &mut self,
        object: Option<&ObjectRef>,
        out: &mut CodedOutput,
    ) -> Result<(), SerializationError> {
        let Some(object) = object else {
            out.write_varint_i32(Tag::NULL.get());
            return Ok(());
        };

        let registry = self.registry;
        if let Some(tag) = registry.constant_tag_of(object) {
            out.write_varint_i32(tag.get());
            return Ok(());
        }

        let descriptor = registry.lookup_by_type_id(object_type_id(object))?;

        if self.depth >= self.max_depth {
            return Err(SerializationError::DepthLimitExceeded {
                limit: self.max_depth,
            });
        }
        self.depth += 1;
        #[cfg(all(debug_assertions, feature = "debug"))]
        self.types.push(descriptor.type_name());

        let result = self.serialize_with(descriptor, object, out);

        #[cfg(all(debug_assertions, feature = "debug"))]
        let result = {
            let result = result.map_err(|error| self.types.attach(error));
            self.types.pop();
            result
        };
        self.depth -= 1;
        result
    }

    fn serialize_with(
        &mut self,
        descriptor: &CodecDescriptor,
        object: &ObjectRef,
        out: &mut CodedOutput,
    ) -> Result<(), SerializationError> {
        out.write_varint_i32(descriptor.tag().get());

        let strategy = descriptor.memo_strategy();
        if strategy == MemoStrategy::DoNotMemoize {
            return descriptor.serialize(self, object, out);
        }
        let Some(memo) = self.memo.as_mut() else {
            return descriptor.serialize(self, object, out);
        };

        let marker = memo.memoize(object, strategy, descriptor.type_name())?;
        marker.write(out);

        match marker {
            MemoMarker::BackRef(_) => Ok(()),
            MemoMarker::New(id) => {
                descriptor.serialize(self, object, out)?;
                if let Some(memo) = self.memo.as_mut() {
                    memo.finish(id);
                }
                Ok(())
            }
        }
    }
}

impl fmt::Debug for SerializationContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializationContext")
            .field("permission", &self.permission)
            .field("memoized", &self.memo.as_ref().map(MemoSerializer::len))
            .field("depth", &self.depth)
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// Tests
