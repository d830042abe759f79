use alloc::format;
use alloc::vec::Vec;
use core::fmt::{self, Debug, Display, Formatter};

use crate::error::SerializationError;

/// Names of the types being (de)serialized, outermost first.
///
/// Attached to codec errors so a failure deep inside a graph can be traced
/// back to the value that contained it.
#[derive(Default, Clone)]
pub(super) struct TypeStack {
    stack: Vec<&'static str>,
}

impl TypeStack {
    pub const fn new() -> Self {
        Self { stack: Vec::new() }
    }

    #[inline]
    pub fn push(&mut self, type_name: &'static str) {
        self.stack.push(type_name);
    }

    #[inline]
    pub fn pop(&mut self) {
        self.stack.pop();
    }

    /// Fills the trace of a codec error that has none yet.
    ///
    /// The innermost context to see the error records it, so the trace
    /// reaches down to the failing codec.
    pub fn attach(&self, mut error: SerializationError) -> SerializationError {
        if let SerializationError::Codec { trace, .. } = &mut error
            && trace.is_none()
        {
            *trace = Some(format!("{self}"));
        }
        error
    }
}

impl Display for TypeStack {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut iter = self.stack.iter();

        if let Some(first) = iter.next() {
            write!(f, "`{first}`")?;
        }

        for type_name in iter {
            write!(f, " -> `{type_name}`")?;
        }

        Ok(())
    }
}

impl Debug for TypeStack {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}
