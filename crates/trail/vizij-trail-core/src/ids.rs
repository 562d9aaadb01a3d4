//! Identifiers and simple allocators for core entities.

use serde::{Deserialize, Serialize};

/// Handle to one trail instance owned by a [`crate::TrailSystem`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct TrailId(pub u32);

/// Identity of a geometry buffer generation.
///
/// Segments remember the id of the buffer that issued them; a buffer reset
/// (scene reload) bumps the generation so stale segments stop matching.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct BufferId(pub u32);

/// Opaque material reference passed through to the renderer untouched.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct MaterialKey(pub String);

/// Monotonic allocator for TrailId and BufferId.
#[derive(Default, Debug)]
pub struct IdAllocator {
    next_trail: u32,
    next_buffer: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc_trail(&mut self) -> TrailId {
        let id = TrailId(self.next_trail);
        self.next_trail = self.next_trail.wrapping_add(1);
        id
    }

    #[inline]
    pub fn alloc_buffer(&mut self) -> BufferId {
        let id = BufferId(self.next_buffer);
        self.next_buffer = self.next_buffer.wrapping_add(1);
        id
    }

    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
