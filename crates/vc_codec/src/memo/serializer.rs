use alloc::string::String;
use alloc::vec::Vec;

use vc_utils::hash::{FixedHashState, HashMap, HashSet};

use super::{MemoId, MemoMarker};
use crate::codec::{MemoStrategy, ObjectRef, object_addr};
use crate::error::{ProtocolError, SerializationError};

/// Encode-side memo table.
///
/// Every memoized object is pinned until the table is dropped, so an
/// allocation address cannot be reused by another object during the walk.
pub(crate) struct MemoSerializer {
    ids: HashMap<usize, MemoId>,
    pinned: Vec<ObjectRef>,
    // `MemoizeAfter` objects whose payload is being written.
    in_progress: HashSet<MemoId>,
}

impl MemoSerializer {
    pub(crate) fn new() -> Self {
        Self {
            ids: HashMap::with_hasher(FixedHashState),
            pinned: Vec::new(),
            in_progress: HashSet::with_hasher(FixedHashState),
        }
    }

    /// Decides how `object` is written.
    ///
    /// A `New` marker must be followed by the payload and a call to
    /// [`finish`](Self::finish).
    pub(crate) fn memoize(
        &mut self,
        object: &ObjectRef,
        strategy: MemoStrategy,
        type_name: &'static str,
    ) -> Result<MemoMarker, SerializationError> {
        let addr = object_addr(object);
        if let Some(&id) = self.ids.get(&addr) {
            if self.in_progress.contains(&id) {
                return Err(ProtocolError::CyclicReference { type_name }.into());
            }
            log::trace!("memo: back-reference to #{id} (`{type_name}`)");
            return Ok(MemoMarker::BackRef(id));
        }

        let id = MemoId::try_from(self.pinned.len()).map_err(|_| SerializationError::Codec {
            type_name,
            message: String::from("memo table exhausted"),
            trace: None,
        })?;
        self.ids.insert(addr, id);
        self.pinned.push(object.clone());
        if strategy == MemoStrategy::MemoizeAfter {
            self.in_progress.insert(id);
        }

        log::trace!("memo: new #{id} (`{type_name}`)");
        Ok(MemoMarker::New(id))
    }

    /// Marks the payload of `id` as fully written.
    #[inline]
    pub(crate) fn finish(&mut self, id: MemoId) {
        self.in_progress.remove(&id);
    }

    /// Number of memoized objects.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.pinned.len()
    }
}

// -----------------------------------------------------------------------------
// Tests
