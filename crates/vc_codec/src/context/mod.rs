//! Per-session state threaded through every codec call.
//!
//! A context borrows the shared [`CodecRegistry`] and [`DependencyMap`] and
//! owns what is specific to one walk: the memoization permission, the memo
//! table once memoization is switched on, and the nesting depth.
//!
//! A context moves through three states:
//!
//! ```text
//!            get_memoizing_context
//!   Fresh  ------------------------>  Memoizing
//!     |
//!     |  disable_memoization
//!     +------------------------------>  Disabled
//! ```
//!
//! Both transitions consume the context, and both target states are final.
//! Since every (de)serialize call takes `&mut self`, a memo table can only
//! ever be driven by one call tree.
//!
//! [`CodecRegistry`]: crate::registry::CodecRegistry
//! [`DependencyMap`]: crate::DependencyMap

mod de;
mod ser;

#[cfg(all(debug_assertions, feature = "debug"))]
mod trace;

pub use de::DeserializationContext;
pub use ser::SerializationContext;

// -----------------------------------------------------------------------------
// MemoizationPermission

/// Whether a context lineage may ever switch memoization on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MemoizationPermission {
    #[default]
    Allowed,
    Disabled,
}

// -----------------------------------------------------------------------------
// CodecOptions

/// Default for [`CodecOptions::max_depth`].
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Limits applied to every context created from the same configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecOptions {
    /// How many codecs may run nested inside each other.
    ///
    /// Exceeding it fails with
    /// [`SerializationError::DepthLimitExceeded`](crate::SerializationError::DepthLimitExceeded)
    /// instead of overflowing the stack on deep or hostile input.
    pub max_depth: usize,
}

impl CodecOptions {
    pub const fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    #[inline]
    pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl Default for CodecOptions {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
