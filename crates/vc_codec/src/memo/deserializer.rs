use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::TypeId;

use super::MemoId;
use crate::codec::{ObjectRef, object_type_id};
use crate::error::{ProtocolError, SerializationError};

// -----------------------------------------------------------------------------
// Slot

enum SlotState {
    /// The payload is being decoded and nothing was registered yet.
    Pending,
    /// The codec registered its value before decoding nested fields.
    Provisional(ObjectRef),
    Ready(ObjectRef),
}

struct Slot {
    type_id: TypeId,
    type_name: &'static str,
    state: SlotState,
}

enum Frame {
    Memoized(MemoId),
    // A `DoNotMemoize` codec, which has no slot of its own.
    Unmemoized,
}

// -----------------------------------------------------------------------------
// MemoDeserializer

/// Decode-side memo table: an append-only arena of slots indexed by
/// [`MemoId`], plus the stack of codecs currently running.
pub(crate) struct MemoDeserializer {
    slots: Vec<Slot>,
    frames: Vec<Frame>,
}

impl MemoDeserializer {
    pub(crate) const fn new() -> Self {
        Self {
            slots: Vec::new(),
            frames: Vec::new(),
        }
    }

    #[inline]
    fn next_id(&self) -> MemoId {
        MemoId::try_from(self.slots.len()).unwrap_or(MemoId::MAX)
    }

    /// Opens the slot announced by a `New` marker.
    pub(crate) fn begin(
        &mut self,
        id: MemoId,
        type_id: TypeId,
        type_name: &'static str,
    ) -> Result<(), SerializationError> {
        let expected = self.next_id();
        if id != expected || self.slots.len() > MemoId::MAX as usize {
            return Err(ProtocolError::InvalidMemoId {
                found: id,
                expected,
            }
            .into());
        }

        log::trace!("memo: new #{id} (`{type_name}`)");
        self.slots.push(Slot {
            type_id,
            type_name,
            state: SlotState::Pending,
        });
        self.frames.push(Frame::Memoized(id));
        Ok(())
    }

    /// Shields enclosing slots from a codec that is not memoized.
    #[inline]
    pub(crate) fn begin_unmemoized(&mut self) {
        self.frames.push(Frame::Unmemoized);
    }

    #[inline]
    pub(crate) fn end_unmemoized(&mut self) {
        self.frames.pop();
    }

    /// Records `value` as the provisional value of the slot being decoded.
    ///
    /// # Panics
    ///
    /// - No memoized codec is running, or the innermost one is not memoized.
    /// - `value` is not of the slot's type.
    /// - A value was already registered for the slot.
    pub(crate) fn register_initial(&mut self, value: ObjectRef) {
        let Some(Frame::Memoized(id)) = self.frames.last() else {
            panic!("`register_initial_value` called outside of a memoized deserialization");
        };
        let slot = &mut self.slots[*id as usize];

        assert!(
            object_type_id(&value) == slot.type_id,
            "initial value registered for memo #{id} is not a `{}`",
            slot.type_name,
        );
        match slot.state {
            SlotState::Pending => slot.state = SlotState::Provisional(value),
            _ => panic!("initial value registered twice for memo #{id}"),
        }
    }

    /// Resolves a `BackRef` marker read after a tag of `type_id`.
    pub(crate) fn resolve(
        &self,
        id: MemoId,
        type_id: TypeId,
        type_name: &'static str,
    ) -> Result<ObjectRef, SerializationError> {
        let slot = usize::try_from(id)
            .ok()
            .and_then(|index| self.slots.get(index))
            .ok_or(ProtocolError::DanglingBackReference(id))?;

        if slot.type_id != type_id {
            return Err(ProtocolError::TypeMismatch {
                expected: type_name,
                found: slot.type_name,
            }
            .into());
        }

        match &slot.state {
            SlotState::Pending => Err(ProtocolError::CyclicReference {
                type_name: slot.type_name,
            }
            .into()),
            SlotState::Provisional(value) | SlotState::Ready(value) => {
                log::trace!("memo: back-reference to #{id} (`{type_name}`)");
                Ok(value.clone())
            }
        }
    }

    /// Closes slot `id` with its decoded value.
    pub(crate) fn finish(
        &mut self,
        id: MemoId,
        value: ObjectRef,
    ) -> Result<ObjectRef, SerializationError> {
        self.frames.pop();
        let Some(slot) = self.slots.get_mut(id as usize) else {
            return Err(ProtocolError::DanglingBackReference(id).into());
        };

        if let SlotState::Provisional(initial) = &slot.state
            && !Arc::ptr_eq(initial, &value)
        {
            return Err(SerializationError::Codec {
                type_name: slot.type_name,
                message: String::from("decoded value is not the registered initial value"),
                trace: None,
            });
        }

        slot.state = SlotState::Ready(value.clone());
        Ok(value)
    }

    /// Closes the innermost slot after its codec failed.
    #[inline]
    pub(crate) fn abort(&mut self) {
        self.frames.pop();
    }
}

// -----------------------------------------------------------------------------
// Tests
