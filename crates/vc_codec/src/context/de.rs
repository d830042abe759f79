use alloc::sync::Arc;
use core::any::Any;
use core::fmt;

#[cfg(all(debug_assertions, feature = "debug"))]
use super::trace::TypeStack;
use super::{CodecOptions, MemoizationPermission};
use crate::codec::{MemoStrategy, ObjectRef, object_type_id};
use crate::dependency::DependencyMap;
use crate::error::{ContextStateError, ProtocolError, SerializationError};
use crate::io::CodedInput;
use crate::memo::{MemoDeserializer, MemoMarker};
use crate::registry::{CodecDescriptor, CodecRegistry, Tag};

// -----------------------------------------------------------------------------
// DeserializationContext

/// Decode-side context handed to every [`ObjectCodec::deserialize`].
///
/// The inverse of [`SerializationContext`]: reads a tag, then resolves it
/// to null, a pooled constant, or a codec. A memoizing context must be
/// used to read what a memoizing [`SerializationContext`] wrote, and a
/// plain context to read plain output.
///
/// [`ObjectCodec::deserialize`]: crate::ObjectCodec::deserialize
/// [`SerializationContext`]: crate::SerializationContext
pub struct DeserializationContext<'a> {
    registry: &'a CodecRegistry,
    dependencies: &'a DependencyMap,
    permission: MemoizationPermission,
    memo: Option<MemoDeserializer>,
    depth: usize,
    max_depth: usize,
    #[cfg(all(debug_assertions, feature = "debug"))]
    types: TypeStack,
}

impl<'a> DeserializationContext<'a> {
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

    /// Switches memoization on, the inverse of
    /// [`SerializationContext::get_memoizing_context`].
    ///
    /// Returns the context itself, with the same memo table, if it is
    /// already memoizing.
    ///
    /// [`SerializationContext::get_memoizing_context`]: crate::SerializationContext::get_memoizing_context
    pub fn get_memoizing_context(mut self) -> Result<Self, ContextStateError> {
        if self.permission == MemoizationPermission::Disabled {
            return Err(ContextStateError::MemoizationDisabled);
        }
        if self.memo.is_none() {
            self.memo = Some(MemoDeserializer::new());
        }
        Ok(self)
    }

    /// Forbids memoization for this context for good.
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

    /// Publishes `value` as the object being decoded before its fields are.
    ///
    /// Codecs of types that can be part of a cycle call this right after
    /// allocating the value, so nested back-references resolve to it. The
    /// codec must then return this very allocation.
    ///
    /// Only call it when [`is_memoizing`](Self::is_memoizing) holds; a plain
    /// context decodes the same codec without any memo table.
    ///
    /// ```ignore
    /// let node = Arc::new(Node::empty());
    /// if ctx.is_memoizing() {
    ///     ctx.register_initial_value(Arc::clone(&node));
    /// }
    /// ```
    ///
    /// # Panics
    ///
    /// - The context is not memoizing, or the running codec is not memoized.
    /// - `value` is not of the type being decoded.
    pub fn register_initial_value<T: Any + Send + Sync>(&mut self, value: Arc<T>) {
        match self.memo.as_mut() {
            Some(memo) => memo.register_initial(value),
            None => panic!("`register_initial_value` requires a memoizing context"),
        }
    }

    /// Reads a value of type `T`, or `None` for the null tag.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::TypeMismatch`] if the stream holds another type.
    pub fn deserialize<T: Any + Send + Sync>(
        &mut self,
        input: &mut CodedInput<'_>,
    ) -> Result<Option<Arc<T>>, SerializationError> {
        let Some(object) = self.deserialize_object(input)? else {
            return Ok(None);
        };
        match object.downcast::<T>() {
            Ok(value) => Ok(Some(value)),
            Err(object) => Err(ProtocolError::TypeMismatch {
                expected: core::any::type_name::<T>(),
                found: self.type_name_of(&object),
            }
            .into()),
        }
    }

    /// Like [`deserialize`](Self::deserialize), but null is an error.
    pub fn deserialize_required<T: Any + Send + Sync>(
        &mut self,
        input: &mut CodedInput<'_>,
    ) -> Result<Arc<T>, SerializationError> {
        self.deserialize::<T>(input)?.ok_or_else(|| {
            ProtocolError::UnexpectedNull {
                expected: core::any::type_name::<T>(),
            }
            .into()
        })
    }

    /// Type-erased form of [`deserialize`](Self::deserialize).
    ///
    /// An unknown tag fails before any byte past it is consumed.
    pub fn deserialize_object(
        &mut self,
        input: &mut CodedInput<'_>,
    ) -> Result<Option<ObjectRef>, SerializationError> {
        let tag = Tag::new(input.read_varint_i32()?);
        if tag.is_null() {
            return Ok(None);
        }

        let registry = self.registry;
        if let Some(constant) = registry.maybe_get_constant(tag) {
            return Ok(Some(constant.clone()));
        }
        let descriptor = registry
            .lookup_by_tag(tag)
            .map_err(|_| ProtocolError::UnknownTag(tag))?;

        if self.depth >= self.max_depth {
            return Err(SerializationError::DepthLimitExceeded {
                limit: self.max_depth,
            });
        }
        self.depth += 1;
        #[cfg(all(debug_assertions, feature = "debug"))]
        self.types.push(descriptor.type_name());

        let result = self.deserialize_with(descriptor, input);

        #[cfg(all(debug_assertions, feature = "debug"))]
        let result = {
            let result = result.map_err(|error| self.types.attach(error));
            self.types.pop();
            result
        };
        self.depth -= 1;
        result.map(Some)
    }

    fn deserialize_with(
        &mut self,
        descriptor: &CodecDescriptor,
        input: &mut CodedInput<'_>,
    ) -> Result<ObjectRef, SerializationError> {
        let Some(memo) = self.memo.as_mut() else {
            return descriptor.deserialize(self, input);
        };

        if descriptor.memo_strategy() == MemoStrategy::DoNotMemoize {
            memo.begin_unmemoized();
            let result = descriptor.deserialize(self, input);
            if let Some(memo) = self.memo.as_mut() {
                memo.end_unmemoized();
            }
            return result;
        }

        let id = match MemoMarker::read(input)? {
            MemoMarker::BackRef(id) => {
                return memo.resolve(id, descriptor.type_id(), descriptor.type_name());
            }
            MemoMarker::New(id) => {
                memo.begin(id, descriptor.type_id(), descriptor.type_name())?;
                id
            }
        };

        let result = descriptor.deserialize(self, input);
        let Some(memo) = self.memo.as_mut() else {
            return result;
        };
        match result {
            Ok(value) => memo.finish(id, value),
            Err(error) => {
                memo.abort();
                Err(error)
            }
        }
    }

    fn type_name_of(&self, object: &ObjectRef) -> &'static str {
        self.registry
            .lookup_by_type_id(object_type_id(object))
            .map_or("<unregistered>", CodecDescriptor::type_name)
    }
}

impl fmt::Debug for DeserializationContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeserializationContext")
            .field("permission", &self.permission)
            .field("memoizing", &self.memo.is_some())
            .field("depth", &self.depth)
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// Tests
