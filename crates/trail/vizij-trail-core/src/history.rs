//! Sliding window of anchor snapshots.
//!
//! Index 0 is the live slot, overwritten every tick. Index 1 holds the most
//! recent pushed sample and the tail holds the oldest one.

use glam::Vec3;

use crate::snapshot::{Snapshot, SnapshotHandle, SnapshotPool};

#[derive(Debug)]
pub struct HistoryWindow {
    pool: SnapshotPool,
    entries: Vec<SnapshotHandle>,
    max_frame: usize,
}

impl HistoryWindow {
    /// Build a window holding the live slot plus one sample, both at the
    /// given anchors. `max_frame` below 2 is raised to 2.
    pub fn new(max_frame: usize, start: Vec3, end: Vec3) -> Self {
        let max_frame = max_frame.max(2);
        // One spare slot: a push acquires before the tail is recycled.
        let mut pool = SnapshotPool::with_capacity(max_frame + 1);
        let mut entries = Vec::with_capacity(max_frame);
        for _ in 0..2 {
            let h = pool.acquire();
            pool.get_mut(h).set(start, end);
            entries.push(h);
        }
        Self {
            pool,
            entries,
            max_frame,
        }
    }

    /// Overwrite the live slot.
    #[inline]
    pub fn record_head(&mut self, start: Vec3, end: Vec3) {
        let head = self.entries[0];
        self.pool.get_mut(head).set(start, end);
    }

    /// Insert a new sample right behind the live slot, evicting the oldest
    /// entry first when the window is full.
    pub fn push_sample(&mut self, start: Vec3, end: Vec3) {
        if self.entries.len() >= self.max_frame {
            if let Some(tail) = self.entries.pop() {
                self.pool.release(tail);
            }
        }
        let h = self.pool.acquire();
        self.pool.get_mut(h).set(start, end);
        self.entries.insert(1, h);
    }

    /// Collapse every entry, live slot included, onto the given anchors.
    pub fn reset_all(&mut self, start: Vec3, end: Vec3) {
        for &h in &self.entries {
            self.pool.get_mut(h).set(start, end);
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn max_frame(&self) -> usize {
        self.max_frame
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Snapshot> {
        self.entries.get(index).map(|&h| self.pool.get(h))
    }

    /// The live slot.
    #[inline]
    pub fn head(&self) -> &Snapshot {
        self.pool.get(self.entries[0])
    }

    /// The oldest entry.
    #[inline]
    pub fn tail(&self) -> &Snapshot {
        self.pool.get(self.entries[self.entries.len() - 1])
    }

    /// Newest to oldest.
    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> + '_ {
        self.entries.iter().map(move |&h| self.pool.get(h))
    }

    #[inline]
    pub fn pool(&self) -> &SnapshotPool {
        &self.pool
    }
}
