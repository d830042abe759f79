use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::Any;

use crate::context::{CodecOptions, DeserializationContext, SerializationContext};
use crate::dependency::DependencyMap;
use crate::error::{ContextStateError, ProtocolError, SerializationError};
use crate::io::{CodedInput, CodedOutput};
use crate::registry::CodecRegistry;

// -----------------------------------------------------------------------------
// ObjectCodecs

/// A registry and a dependency map bundled for one-call (de)serialization.
///
/// Cloning is cheap, both parts are shared. `ObjectCodecs` is `Send + Sync`
/// and is the value to share between threads: contexts own their depth
/// counter and memo table and decode through `&mut self`, so each thread
/// creates its own from here.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use vc_codec::{DependencyMap, ObjectCodecs};
/// use vc_codec::codecs::register_builtin_codecs;
/// use vc_codec::registry::CodecRegistry;
///
/// let mut builder = CodecRegistry::builder();
/// register_builtin_codecs(&mut builder);
/// let codecs = ObjectCodecs::new(builder.build().unwrap(), DependencyMap::empty());
///
/// let bytes = codecs.serialize(Some(&Arc::new(String::from("hi")))).unwrap();
/// let value = codecs.deserialize::<String>(&bytes).unwrap().unwrap();
/// assert_eq!(*value, "hi");
/// ```
#[derive(Debug, Clone)]
pub struct ObjectCodecs {
    registry: Arc<CodecRegistry>,
    dependencies: Arc<DependencyMap>,
    options: CodecOptions,
}

impl ObjectCodecs {
    pub fn new(
        registry: impl Into<Arc<CodecRegistry>>,
        dependencies: impl Into<Arc<DependencyMap>>,
    ) -> Self {
        Self {
            registry: registry.into(),
            dependencies: dependencies.into(),
            options: CodecOptions::new(),
        }
    }

    #[inline]
    pub fn with_options(mut self, options: CodecOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns a copy sharing the registry, whose dependencies are these
    /// ones replaced or extended by `overrides`.
    pub fn with_dependency_overrides(&self, overrides: &DependencyMap) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            dependencies: Arc::new(self.dependencies.with_overrides(overrides)),
            options: self.options,
        }
    }

    #[inline]
    pub fn registry(&self) -> &Arc<CodecRegistry> {
        &self.registry
    }

    #[inline]
    pub fn dependencies(&self) -> &Arc<DependencyMap> {
        &self.dependencies
    }

    #[inline]
    pub fn options(&self) -> CodecOptions {
        self.options
    }

    /// A fresh, non-memoizing encode context.
    #[inline]
    pub fn serialization_context(&self) -> SerializationContext<'_> {
        SerializationContext::with_options(&self.registry, &self.dependencies, self.options)
    }

    /// A fresh, non-memoizing decode context.
    #[inline]
    pub fn deserialization_context(&self) -> DeserializationContext<'_> {
        DeserializationContext::with_options(&self.registry, &self.dependencies, self.options)
    }

    /// Encodes `value` without memoization.
    pub fn serialize<T: Any + Send + Sync>(
        &self,
        value: Option<&Arc<T>>,
    ) -> Result<Vec<u8>, SerializationError> {
        let mut out = CodedOutput::new();
        self.serialization_context().serialize(value, &mut out)?;
        Ok(out.into_bytes())
    }

    /// Encodes `value`, writing every shared object only once.
    pub fn serialize_memoized<T: Any + Send + Sync>(
        &self,
        value: Option<&Arc<T>>,
    ) -> Result<Vec<u8>, SerializationError> {
        let mut out = CodedOutput::new();
        self.memoizing_serialization_context()?.serialize(value, &mut out)?;
        Ok(out.into_bytes())
    }

    /// Encodes `value` with memoization straight into `writer`.
    #[cfg(feature = "std")]
    pub fn serialize_to_writer<T: Any + Send + Sync, W: std::io::Write>(
        &self,
        value: Option<&Arc<T>>,
        writer: W,
    ) -> Result<(), SerializationError> {
        let mut out = CodedOutput::new();
        self.memoizing_serialization_context()?.serialize(value, &mut out)?;
        out.write_to(writer)?;
        Ok(())
    }

    /// Decodes a buffer written by [`serialize`](Self::serialize).
    ///
    /// The whole buffer must be consumed.
    pub fn deserialize<T: Any + Send + Sync>(
        &self,
        bytes: &[u8],
    ) -> Result<Option<Arc<T>>, SerializationError> {
        let mut input = CodedInput::new(bytes);
        let value = self.deserialization_context().deserialize::<T>(&mut input)?;
        expect_end(&input)?;
        Ok(value)
    }

    /// Decodes a buffer written by [`serialize_memoized`](Self::serialize_memoized)
    /// or [`serialize_to_writer`](Self::serialize_to_writer).
    pub fn deserialize_memoized<T: Any + Send + Sync>(
        &self,
        bytes: &[u8],
    ) -> Result<Option<Arc<T>>, SerializationError> {
        let mut input = CodedInput::new(bytes);
        let value = self
            .deserialization_context()
            .get_memoizing_context()?
            .deserialize::<T>(&mut input)?;
        expect_end(&input)?;
        Ok(value)
    }

    #[inline]
    fn memoizing_serialization_context(
        &self,
    ) -> Result<SerializationContext<'_>, ContextStateError> {
        self.serialization_context().get_memoizing_context()
    }
}

fn expect_end(input: &CodedInput<'_>) -> Result<(), ProtocolError> {
    match input.remaining() {
        0 => Ok(()),
        remaining => Err(ProtocolError::TrailingBytes { remaining }),
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::sync::Arc;
    use alloc::vec::Vec;
    use std::sync::OnceLock;

    use super::ObjectCodecs;
    use crate::codec::{MemoStrategy, ObjectCodec, ObjectRef};
    use crate::codecs::register_builtin_codecs;
    use crate::context::{CodecOptions, DeserializationContext, SerializationContext};
    use crate::dependency::DependencyMap;
    use crate::error::{ProtocolError, SerializationError};
    use crate::io::{CodedInput, CodedOutput};
    use crate::registry::{CodecRegistry, CodecRegistryBuilder};

    // -------------------------------------------------------------------------
    // Fixtures

    /// A linked node; `next` is set after construction so cycles can be built.
    struct Node {
        label: String,
        next: OnceLock<Arc<Node>>,
    }

    impl Node {
        fn new(label: &str) -> Arc<Self> {
            Arc::new(Self {
                label: String::from(label),
                next: OnceLock::new(),
            })
        }

        fn link(&self, next: &Arc<Node>) {
            assert!(self.next.set(Arc::clone(next)).is_ok());
        }

        fn next(&self) -> &Arc<Node> {
            self.next.get().unwrap()
        }
    }

    /// Cycle-safe when `register_early` is set, `MemoizeAfter` otherwise.
    struct NodeCodec {
        register_early: bool,
    }

    impl ObjectCodec for NodeCodec {
        type Value = Node;

        fn memo_strategy(&self) -> MemoStrategy {
            if self.register_early {
                MemoStrategy::MemoizeBefore
            } else {
                MemoStrategy::MemoizeAfter
            }
        }

        fn serialize(
            &self,
            ctx: &mut SerializationContext<'_>,
            value: &Node,
            out: &mut CodedOutput,
        ) -> Result<(), SerializationError> {
            out.write_str(&value.label);
            ctx.serialize(value.next.get(), out)
        }

        fn deserialize(
            &self,
            ctx: &mut DeserializationContext<'_>,
            input: &mut CodedInput<'_>,
        ) -> Result<Arc<Node>, SerializationError> {
            let node = Node::new(input.read_str()?);
            if self.register_early && ctx.is_memoizing() {
                ctx.register_initial_value(Arc::clone(&node));
            }
            if let Some(next) = ctx.deserialize::<Node>(input)? {
                node.link(&next);
            }
            Ok(node)
        }
    }

    struct Pair {
        left: Option<Arc<String>>,
        right: Option<Arc<String>>,
    }

    struct PairCodec;

    impl ObjectCodec for PairCodec {
        type Value = Pair;

        fn serialize(
            &self,
            ctx: &mut SerializationContext<'_>,
            value: &Pair,
            out: &mut CodedOutput,
        ) -> Result<(), SerializationError> {
            ctx.serialize(value.left.as_ref(), out)?;
            ctx.serialize(value.right.as_ref(), out)
        }

        fn deserialize(
            &self,
            ctx: &mut DeserializationContext<'_>,
            input: &mut CodedInput<'_>,
        ) -> Result<Arc<Pair>, SerializationError> {
            let left = ctx.deserialize::<String>(input)?;
            let right = ctx.deserialize::<String>(input)?;
            Ok(Arc::new(Pair { left, right }))
        }
    }

    /// Holds any registered value.
    #[derive(Debug)]
    struct Boxed(Option<ObjectRef>);

    struct BoxedCodec;

    impl ObjectCodec for BoxedCodec {
        type Value = Boxed;

        fn serialize(
            &self,
            ctx: &mut SerializationContext<'_>,
            value: &Boxed,
            out: &mut CodedOutput,
        ) -> Result<(), SerializationError> {
            ctx.serialize_object(value.0.as_ref(), out)
        }

        fn deserialize(
            &self,
            ctx: &mut DeserializationContext<'_>,
            input: &mut CodedInput<'_>,
        ) -> Result<Arc<Boxed>, SerializationError> {
            Ok(Arc::new(Boxed(ctx.deserialize_object(input)?)))
        }
    }

    /// An integer scaled by the `Scale` dependency when decoded.
    struct Scaled(i64);

    struct Scale(i64);

    struct ScaledCodec;

    impl ObjectCodec for ScaledCodec {
        type Value = Scaled;

        fn memo_strategy(&self) -> MemoStrategy {
            MemoStrategy::DoNotMemoize
        }

        fn serialize(
            &self,
            _ctx: &mut SerializationContext<'_>,
            value: &Scaled,
            out: &mut CodedOutput,
        ) -> Result<(), SerializationError> {
            out.write_varint_i64(value.0);
            Ok(())
        }

        fn deserialize(
            &self,
            ctx: &mut DeserializationContext<'_>,
            input: &mut CodedInput<'_>,
        ) -> Result<Arc<Scaled>, SerializationError> {
            let factor = ctx.get_dependency::<Scale>().map_or(1, |scale| scale.0);
            Ok(Arc::new(Scaled(input.read_varint_i64()? * factor)))
        }
    }

    struct Broken;

    struct BrokenCodec;

    impl ObjectCodec for BrokenCodec {
        type Value = Broken;

        fn serialize(
            &self,
            _ctx: &mut SerializationContext<'_>,
            _value: &Broken,
            _out: &mut CodedOutput,
        ) -> Result<(), SerializationError> {
            Err(SerializationError::codec::<Broken>("refused"))
        }

        fn deserialize(
            &self,
            _ctx: &mut DeserializationContext<'_>,
            _input: &mut CodedInput<'_>,
        ) -> Result<Arc<Broken>, SerializationError> {
            Err(SerializationError::codec::<Broken>("refused"))
        }
    }

    fn builder(cycle_safe_nodes: bool) -> CodecRegistryBuilder {
        let mut builder = CodecRegistry::builder();
        register_builtin_codecs(&mut builder);
        builder.register(NodeCodec {
            register_early: cycle_safe_nodes,
        });
        builder.register(PairCodec);
        builder.register(BoxedCodec);
        builder.register(ScaledCodec);
        builder.register(BrokenCodec);
        builder
    }

    fn codecs() -> ObjectCodecs {
        ObjectCodecs::new(builder(true).build().unwrap(), DependencyMap::empty())
    }

    fn occurrences(haystack: &[u8], needle: &[u8]) -> usize {
        haystack
            .windows(needle.len())
            .filter(|window| *window == needle)
            .count()
    }

    // -------------------------------------------------------------------------
    // Round trips

    #[test]
    fn round_trip() {
        let codecs = codecs();

        let text = Arc::new(String::from("text"));
        let bytes = codecs.serialize(Some(&text)).unwrap();
        assert_eq!(*codecs.deserialize::<String>(&bytes).unwrap().unwrap(), *text);

        let blob = Arc::new(Vec::from([0_u8, 1, 255]));
        let bytes = codecs.serialize_memoized(Some(&blob)).unwrap();
        let decoded = codecs.deserialize_memoized::<Vec<u8>>(&bytes).unwrap().unwrap();
        assert_eq!(*decoded, *blob);

        let number = Arc::new(-1234_i64);
        let bytes = codecs.serialize(Some(&number)).unwrap();
        assert_eq!(*codecs.deserialize::<i64>(&bytes).unwrap().unwrap(), -1234);

        let chain = Node::new("a");
        chain.link(&Node::new("b"));
        let bytes = codecs.serialize(Some(&chain)).unwrap();
        let decoded = codecs.deserialize::<Node>(&bytes).unwrap().unwrap();
        assert_eq!(decoded.label, "a");
        assert_eq!(decoded.next().label, "b");
        assert!(decoded.next().next.get().is_none());
    }

    #[test]
    fn memoize_before_codec_in_plain_context() {
        let head = Node::new("x");
        let tail = Node::new("y");
        head.link(&tail);
        tail.link(&Node::new("z"));

        let codecs = codecs();
        for decoded in [
            codecs.deserialize::<Node>(&codecs.serialize(Some(&head)).unwrap()),
            codecs.deserialize_memoized::<Node>(&codecs.serialize_memoized(Some(&head)).unwrap()),
        ] {
            let decoded = decoded.unwrap().unwrap();
            assert_eq!(decoded.label, "x");
            assert_eq!(decoded.next().label, "y");
            assert_eq!(decoded.next().next().label, "z");
        }
    }

    #[test]
    fn is_send_sync() {
        fn is_send<T: Send>() {}
        fn is_sync<T: Sync>() {}

        is_send::<ObjectCodecs>();
        is_sync::<ObjectCodecs>();
    }

    #[test]
    fn null() {
        let codecs = codecs();

        let bytes = codecs.serialize::<String>(None).unwrap();
        assert_eq!(bytes, [0]);
        assert!(codecs.deserialize::<String>(&bytes).unwrap().is_none());
        assert!(codecs.deserialize_memoized::<Node>(&bytes).unwrap().is_none());

        let pair = Arc::new(Pair {
            left: None,
            right: Some(Arc::new(String::from("r"))),
        });
        let bytes = codecs.serialize_memoized(Some(&pair)).unwrap();
        let decoded = codecs.deserialize_memoized::<Pair>(&bytes).unwrap().unwrap();
        assert!(decoded.left.is_none());
        assert_eq!(decoded.right.as_deref().map(String::as_str), Some("r"));
    }

    #[test]
    fn constants_short_circuit() {
        let empty = Arc::new(String::new());
        let mut builder = builder(true);
        builder.add_constant(Arc::clone(&empty));
        let codecs = ObjectCodecs::new(builder.build().unwrap(), DependencyMap::empty());

        // Tag 1, zigzag encoded, and nothing else.
        let bytes = codecs.serialize_memoized(Some(&empty)).unwrap();
        assert_eq!(bytes, [2]);

        let decoded = codecs.deserialize_memoized::<String>(&bytes).unwrap().unwrap();
        assert!(Arc::ptr_eq(&decoded, &empty));
        let decoded = codecs.deserialize::<String>(&bytes).unwrap().unwrap();
        assert!(Arc::ptr_eq(&decoded, &empty));

        // An equal value that is not the constant goes through the codec.
        let lookalike = Arc::new(String::new());
        let bytes = codecs.serialize(Some(&lookalike)).unwrap();
        assert_ne!(bytes, [2]);
        let decoded = codecs.deserialize::<String>(&bytes).unwrap().unwrap();
        assert!(!Arc::ptr_eq(&decoded, &empty));
    }

    // -------------------------------------------------------------------------
    // Memoization

    #[test]
    fn sharing_is_preserved() {
        let codecs = codecs();
        let shared = Arc::new(String::from("shared-payload"));
        let pair = Arc::new(Pair {
            left: Some(Arc::clone(&shared)),
            right: Some(Arc::clone(&shared)),
        });

        let bytes = codecs.serialize_memoized(Some(&pair)).unwrap();
        assert_eq!(occurrences(&bytes, b"shared-payload"), 1);
        let decoded = codecs.deserialize_memoized::<Pair>(&bytes).unwrap().unwrap();
        let (left, right) = (decoded.left.as_ref().unwrap(), decoded.right.as_ref().unwrap());
        assert!(Arc::ptr_eq(left, right));
        assert_eq!(**left, "shared-payload");

        // Without memoization every occurrence is written in full.
        let bytes = codecs.serialize(Some(&pair)).unwrap();
        assert_eq!(occurrences(&bytes, b"shared-payload"), 2);
        let decoded = codecs.deserialize::<Pair>(&bytes).unwrap().unwrap();
        let (left, right) = (decoded.left.as_ref().unwrap(), decoded.right.as_ref().unwrap());
        assert!(!Arc::ptr_eq(left, right));
        assert_eq!(left, right);
    }

    #[test]
    fn cycles_round_trip() {
        let codecs = codecs();
        let a = Node::new("a");
        let b = Node::new("b");
        a.link(&b);
        b.link(&a);

        let bytes = codecs.serialize_memoized(Some(&a)).unwrap();
        let decoded = codecs.deserialize_memoized::<Node>(&bytes).unwrap().unwrap();

        assert_eq!(decoded.label, "a");
        assert_eq!(decoded.next().label, "b");
        assert!(Arc::ptr_eq(decoded.next().next(), &decoded));

        // A self loop.
        let c = Node::new("c");
        c.link(&c);
        let bytes = codecs.serialize_memoized(Some(&c)).unwrap();
        let decoded = codecs.deserialize_memoized::<Node>(&bytes).unwrap().unwrap();
        assert!(Arc::ptr_eq(decoded.next(), &decoded));
    }

    #[test]
    fn cycles_through_memoize_after_fail() {
        let codecs = ObjectCodecs::new(builder(false).build().unwrap(), DependencyMap::empty());
        let a = Node::new("a");
        a.link(&a);

        assert!(matches!(
            codecs.serialize_memoized(Some(&a)),
            Err(SerializationError::Protocol(ProtocolError::CyclicReference { .. }))
        ));

        // The same stream crafted by hand: the back-reference to #0 appears
        // while #0 is still being decoded.
        let tag = codecs.registry().lookup::<Node>().unwrap().tag();
        let mut out = CodedOutput::new();
        out.write_varint_i32(tag.get());
        out.write_varint_u64(0); // new #0
        out.write_str("a");
        out.write_varint_i32(tag.get());
        out.write_varint_u64(1); // back-reference to #0

        assert!(matches!(
            codecs.deserialize_memoized::<Node>(out.as_bytes()),
            Err(SerializationError::Protocol(ProtocolError::CyclicReference { .. }))
        ));
    }

    #[test]
    fn upgrade_keeps_memo_table() {
        let codecs = codecs();
        let shared = Arc::new(String::from("once"));

        let mut out = CodedOutput::new();
        let mut ctx = codecs.serialization_context().get_memoizing_context().unwrap();
        ctx.serialize(Some(&shared), &mut out).unwrap();
        let first = out.len();

        let mut ctx = ctx.get_memoizing_context().unwrap();
        ctx.serialize(Some(&shared), &mut out).unwrap();
        // Tag and back-reference marker, one byte each.
        assert_eq!(out.len() - first, 2);

        let mut input = CodedInput::new(out.as_bytes());
        let ctx = codecs.deserialization_context().get_memoizing_context().unwrap();
        let mut ctx = ctx.get_memoizing_context().unwrap();
        let a = ctx.deserialize_required::<String>(&mut input).unwrap();
        let b = ctx.deserialize_required::<String>(&mut input).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(input.is_at_end());
    }

    #[test]
    fn integers_are_not_memoized() {
        let codecs = codecs();
        let number: ObjectRef = Arc::new(300_i64);
        let boxed = Arc::new(Boxed(Some(number)));

        let bytes = codecs.serialize_memoized(Some(&boxed)).unwrap();
        let plain = codecs.serialize(Some(&boxed)).unwrap();
        // Only the outer `Boxed` carries a memo marker.
        assert_eq!(bytes.len(), plain.len() + 1);

        let decoded = codecs.deserialize_memoized::<Boxed>(&bytes).unwrap().unwrap();
        let inner = decoded.0.clone().unwrap().downcast::<i64>().unwrap();
        assert_eq!(*inner, 300);
    }

    #[test]
    fn bad_memo_ids() {
        let codecs = codecs();
        let tag = codecs.registry().lookup::<String>().unwrap().tag();

        let mut out = CodedOutput::new();
        out.write_varint_i32(tag.get());
        out.write_varint_u64(5 << 1);
        out.write_str("x");
        assert!(matches!(
            codecs.deserialize_memoized::<String>(out.as_bytes()),
            Err(SerializationError::Protocol(ProtocolError::InvalidMemoId {
                found: 5,
                expected: 0
            }))
        ));

        let mut out = CodedOutput::new();
        out.write_varint_i32(tag.get());
        out.write_varint_u64((3 << 1) | 1);
        assert!(matches!(
            codecs.deserialize_memoized::<String>(out.as_bytes()),
            Err(SerializationError::Protocol(ProtocolError::DanglingBackReference(3)))
        ));
    }

    // -------------------------------------------------------------------------
    // Context and facade

    #[test]
    fn dependencies() {
        let codecs = codecs();
        let bytes = codecs.serialize(Some(&Arc::new(Scaled(7)))).unwrap();

        let decoded = codecs.deserialize::<Scaled>(&bytes).unwrap().unwrap();
        assert_eq!(decoded.0, 7);

        let overrides = DependencyMap::builder().with(Scale(3)).build();
        let scaled = codecs.with_dependency_overrides(&overrides);
        assert!(Arc::ptr_eq(scaled.registry(), codecs.registry()));
        let decoded = scaled.deserialize::<Scaled>(&bytes).unwrap().unwrap();
        assert_eq!(decoded.0, 21);
        assert!(codecs.dependencies().is_empty());
    }

    #[test]
    fn trailing_bytes() {
        let codecs = codecs();
        let mut bytes = codecs.serialize(Some(&Arc::new(String::from("x")))).unwrap();
        bytes.push(0);

        assert!(matches!(
            codecs.deserialize::<String>(&bytes),
            Err(SerializationError::Protocol(ProtocolError::TrailingBytes { remaining: 1 }))
        ));
    }

    #[test]
    fn truncated_input() {
        let codecs = codecs();
        let bytes = codecs.serialize(Some(&Arc::new(String::from("long enough")))).unwrap();

        let result = codecs.deserialize::<String>(&bytes[..bytes.len() - 3]);
        assert!(result.unwrap_err().is_io());
    }

    #[test]
    fn depth_limit() {
        let head = Node::new("0");
        let mut tail = Arc::clone(&head);
        for index in 1..10 {
            let node = Node::new(&alloc::format!("{index}"));
            tail.link(&node);
            tail = node;
        }

        let codecs = codecs();
        let bytes = codecs.serialize(Some(&head)).unwrap();

        let shallow = codecs.clone().with_options(CodecOptions::new().with_max_depth(4));
        assert!(matches!(
            shallow.serialize(Some(&head)),
            Err(SerializationError::DepthLimitExceeded { limit: 4 })
        ));
        assert!(matches!(
            shallow.deserialize::<Node>(&bytes),
            Err(SerializationError::DepthLimitExceeded { limit: 4 })
        ));
        assert!(codecs.deserialize::<Node>(&bytes).is_ok());
    }

    #[test]
    #[should_panic(expected = "outside of a memoized deserialization")]
    fn register_initial_value_in_unmemoized_codec() {
        struct Eager;

        struct EagerCodec;

        impl ObjectCodec for EagerCodec {
            type Value = Eager;

            fn memo_strategy(&self) -> MemoStrategy {
                MemoStrategy::DoNotMemoize
            }

            fn serialize(
                &self,
                _ctx: &mut SerializationContext<'_>,
                _value: &Eager,
                _out: &mut CodedOutput,
            ) -> Result<(), SerializationError> {
                Ok(())
            }

            fn deserialize(
                &self,
                ctx: &mut DeserializationContext<'_>,
                _input: &mut CodedInput<'_>,
            ) -> Result<Arc<Eager>, SerializationError> {
                let value = Arc::new(Eager);
                ctx.register_initial_value(Arc::clone(&value));
                Ok(value)
            }
        }

        let mut builder = CodecRegistry::builder();
        builder.register(EagerCodec);
        let codecs = ObjectCodecs::new(builder.build().unwrap(), DependencyMap::empty());

        let bytes = codecs.serialize_memoized(Some(&Arc::new(Eager))).unwrap();
        let _ = codecs.deserialize_memoized::<Eager>(&bytes);
    }

    #[test]
    fn state_errors_surface() {
        let codecs = codecs();
        let ctx = codecs.serialization_context().disable_memoization().unwrap();
        assert!(matches!(
            ctx.get_memoizing_context().map_err(SerializationError::from),
            Err(SerializationError::State(_))
        ));
    }

    #[cfg(all(debug_assertions, feature = "debug"))]
    #[test]
    fn codec_errors_carry_type_stack() {
        let codecs = codecs();
        let boxed = Arc::new(Boxed(Some(Arc::new(Broken))));

        let error = codecs.serialize(Some(&boxed)).unwrap_err();
        let trace = error.trace().unwrap();
        assert!(trace.contains("Boxed` -> `"));
        assert!(trace.ends_with("Broken`"));

        let registry = codecs.registry();
        let mut out = CodedOutput::new();
        out.write_varint_i32(registry.lookup::<Boxed>().unwrap().tag().get());
        out.write_varint_i32(registry.lookup::<Broken>().unwrap().tag().get());

        let error = codecs.deserialize::<Boxed>(out.as_bytes()).unwrap_err();
        let trace = error.trace().unwrap();
        assert!(trace.contains("Boxed` -> `"));
        assert!(trace.ends_with("Broken`"));
    }

    #[cfg(feature = "std")]
    #[test]
    fn serialize_to_writer() {
        let codecs = codecs();
        let shared = Arc::new(String::from("w"));
        let pair = Arc::new(Pair {
            left: Some(Arc::clone(&shared)),
            right: Some(shared),
        });

        let mut sink: Vec<u8> = Vec::new();
        codecs.serialize_to_writer(Some(&pair), &mut sink).unwrap();
        assert_eq!(sink, codecs.serialize_memoized(Some(&pair)).unwrap());
    }
}
