use alloc::sync::Arc;
use core::any::{Any, TypeId};
use core::fmt;

use vc_utils::TypeIdMap;

// -----------------------------------------------------------------------------
// DependencyMap

/// Immutable, type-keyed table of contextual objects for codecs.
///
/// Holds data that is not part of the wire format but is needed to rebuild
/// values, such as configuration or environment handles. Each type maps to
/// at most one instance. Absent entries are not an error: codecs receive
/// `None` and must cope with missing optional dependencies.
///
/// # Examples
///
/// ```
/// use vc_codec::DependencyMap;
///
/// struct Root(&'static str);
///
/// let deps = DependencyMap::builder().with(Root("/workspace")).build();
///
/// assert_eq!(deps.get::<Root>().unwrap().0, "/workspace");
/// assert!(deps.get::<u32>().is_none());
/// ```
#[derive(Clone, Default)]
pub struct DependencyMap {
    entries: TypeIdMap<Arc<dyn Any + Send + Sync>>,
}

impl DependencyMap {
    /// An empty map.
    #[inline]
    pub const fn empty() -> Self {
        Self {
            entries: TypeIdMap::new(),
        }
    }

    #[inline]
    pub fn builder() -> DependencyMapBuilder {
        DependencyMapBuilder {
            entries: TypeIdMap::new(),
        }
    }

    /// Returns the instance registered for `T`, if any.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.entries
            .get_type::<T>()
            .and_then(|value| value.downcast_ref::<T>())
    }

    /// Returns a shared handle to the instance registered for `T`, if any.
    pub fn get_arc<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let value = self.entries.get_type::<T>()?;
        Arc::clone(value).downcast::<T>().ok()
    }

    #[inline]
    pub fn contains<T: Any>(&self) -> bool {
        self.entries.contains_type::<T>()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns a new map where the entries of `overrides` replace or extend
    /// the entries of `self`.
    pub fn with_overrides(&self, overrides: &DependencyMap) -> DependencyMap {
        let mut entries = self.entries.clone();
        entries.extend(
            overrides
                .entries
                .iter()
                .map(|(type_id, value)| (*type_id, Arc::clone(value))),
        );
        DependencyMap { entries }
    }
}

impl fmt::Debug for DependencyMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.entries.iter().map(|(type_id, _)| type_id))
            .finish()
    }
}

// -----------------------------------------------------------------------------
// DependencyMapBuilder

/// Builder for [`DependencyMap`]; the only way to populate one.
pub struct DependencyMapBuilder {
    entries: TypeIdMap<Arc<dyn Any + Send + Sync>>,
}

impl DependencyMapBuilder {
    /// Adds `value` keyed by its own type, replacing a previous entry.
    #[inline]
    pub fn with<T: Any + Send + Sync>(self, value: T) -> Self {
        self.with_arc(Arc::new(value))
    }

    /// Adds an already shared `value` keyed by `T`.
    pub fn with_arc<T: Any + Send + Sync>(mut self, value: Arc<T>) -> Self {
        if self.entries.insert(TypeId::of::<T>(), value).is_some() {
            log::debug!("dependency `{}` replaced", core::any::type_name::<T>());
        }
        self
    }

    #[inline]
    pub fn build(self) -> DependencyMap {
        DependencyMap {
            entries: self.entries,
        }
    }
}

// -----------------------------------------------------------------------------
// Tests
