//! Anchor snapshots and the free-list pool that recycles them.
//!
//! The pool is an arena of snapshot slots plus a stack of free slot handles,
//! so steady-state sampling never allocates: a released slot is handed back
//! out by the next `acquire`.

use glam::Vec3;

/// One recorded pair of anchor positions.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Snapshot {
    pub point_start: Vec3,
    pub point_end: Vec3,
}

impl Snapshot {
    pub fn new(point_start: Vec3, point_end: Vec3) -> Self {
        Self {
            point_start,
            point_end,
        }
    }

    #[inline]
    pub fn set(&mut self, point_start: Vec3, point_end: Vec3) {
        self.point_start = point_start;
        self.point_end = point_end;
    }

    /// Midpoint between the anchors; the ribbon centerline passes through it.
    #[inline]
    pub fn midpoint(&self) -> Vec3 {
        (self.point_start + self.point_end) * 0.5
    }

    /// Start-to-end vector; its length is the ribbon width at this sample.
    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.point_end - self.point_start
    }
}

/// Index of a slot in a [`SnapshotPool`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct SnapshotHandle(pub(crate) u32);

impl SnapshotHandle {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Default)]
pub struct SnapshotPool {
    slots: Vec<Snapshot>,
    free: Vec<SnapshotHandle>,
}

impl SnapshotPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-size the arena so the first `capacity` acquires do not reallocate.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::with_capacity(capacity),
        }
    }

    /// Reuse a free slot or construct a new one. The returned snapshot keeps
    /// whatever points it held before; callers overwrite them.
    pub fn acquire(&mut self) -> SnapshotHandle {
        if let Some(handle) = self.free.pop() {
            return handle;
        }
        let handle = SnapshotHandle(self.slots.len() as u32);
        self.slots.push(Snapshot::default());
        handle
    }

    /// Return a slot to the free stack.
    ///
    /// Releasing the handle that is already on top of the free stack is
    /// reported and ignored. Deeper duplicates are not detected.
    pub fn release(&mut self, handle: SnapshotHandle) {
        if self.free.last() == Some(&handle) {
            log::warn!(
                "snapshot pool: double release of slot {} ignored",
                handle.index()
            );
            return;
        }
        debug_assert!(handle.index() < self.slots.len(), "foreign snapshot handle");
        self.free.push(handle);
    }

    #[inline]
    pub fn get(&self, handle: SnapshotHandle) -> &Snapshot {
        &self.slots[handle.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, handle: SnapshotHandle) -> &mut Snapshot {
        &mut self.slots[handle.index()]
    }

    /// Slots ever constructed.
    #[inline]
    pub fn count_all(&self) -> usize {
        self.slots.len()
    }

    /// Slots currently handed out.
    #[inline]
    pub fn count_active(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Slots waiting on the free stack.
    #[inline]
    pub fn count_inactive(&self) -> usize {
        self.free.len()
    }
}
