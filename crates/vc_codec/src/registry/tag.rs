use core::fmt;

/// Identifies null, a constant, or a registered codec on the wire.
///
/// Tags are only meaningful for the [`CodecRegistry`](super::CodecRegistry)
/// that assigned them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag(i32);

impl Tag {
    /// The tag written for a null value.
    pub const NULL: Self = Self(0);

    #[inline]
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// Returns the raw integer.
    #[inline]
    pub const fn get(self) -> i32 {
        self.0
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Tag {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
