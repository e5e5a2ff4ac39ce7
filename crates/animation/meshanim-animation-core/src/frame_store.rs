//! Shared per-vertex sample arena for frame-mode animations.
//!
//! Every vertex owns one sample array of `slots` entries. A frame-capable
//! animation with allocated storage owns the range
//! `[frame0, frame0 + frame_count)` of every vertex's array. Ranges of
//! different animations never overlap. All size changes go through
//! [`FrameStore::splice`], after which the caller rewrites the other ranges
//! with [`shift_start`].

use serde::{Deserialize, Serialize};

use crate::interp::Vec3;
use crate::keyframe::Interp;

/// One sample of one vertex in one absolute slot.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameAnimVertex {
    pub coord: Vec3,
    pub interp: Interp,
}

impl FrameAnimVertex {
    pub const EMPTY: FrameAnimVertex = FrameAnimVertex {
        coord: [0.0; 3],
        interp: Interp::None,
    };

    pub fn new(coord: Vec3, interp: Interp) -> Self {
        Self { coord, interp }
    }

    #[inline]
    pub fn is_present(&self) -> bool {
        self.interp != Interp::None
    }
}

/// New start of a range that began at `start` after `remove` slots at `at`
/// were replaced by `inserted` slots.
#[inline]
pub fn shift_start(start: usize, at: usize, remove: usize, inserted: usize) -> usize {
    if start >= at + remove {
        start + inserted - remove
    } else {
        start
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameStore {
    vertices: Vec<Vec<FrameAnimVertex>>,
    slots: usize,
}

impl FrameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from per-vertex arrays, which must all have the same length.
    pub fn from_vertices(vertices: Vec<Vec<FrameAnimVertex>>) -> Option<Self> {
        let slots = vertices.first().map_or(0, Vec::len);
        if vertices.iter().any(|v| v.len() != slots) {
            return None;
        }
        Some(Self { vertices, slots })
    }

    pub fn into_vertices(self) -> Vec<Vec<FrameAnimVertex>> {
        self.vertices
    }

    /// Slots per vertex.
    #[inline]
    pub fn slots(&self) -> usize {
        self.slots
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Add a vertex with an all-empty sample array.
    pub fn push_vertex(&mut self) -> usize {
        self.vertices.push(vec![FrameAnimVertex::EMPTY; self.slots]);
        self.vertices.len() - 1
    }

    pub fn samples(&self, vertex: usize) -> Option<&[FrameAnimVertex]> {
        self.vertices.get(vertex).map(Vec::as_slice)
    }

    #[inline]
    pub fn get(&self, vertex: usize, slot: usize) -> Option<&FrameAnimVertex> {
        self.vertices.get(vertex)?.get(slot)
    }

    /// Overwrite one sample, returning the previous one.
    pub(crate) fn set(
        &mut self,
        vertex: usize,
        slot: usize,
        sample: FrameAnimVertex,
    ) -> Option<FrameAnimVertex> {
        let cell = self.vertices.get_mut(vertex)?.get_mut(slot)?;
        Some(std::mem::replace(cell, sample))
    }

    /// Copy `count` slots starting at `at` from every vertex.
    pub fn copy_range(&self, at: usize, count: usize) -> Vec<Vec<FrameAnimVertex>> {
        self.vertices
            .iter()
            .map(|v| v.get(at..at + count).map(<[_]>::to_vec).unwrap_or_default())
            .collect()
    }

    /// Replace `remove` slots at `at` with `count` new slots in every
    /// vertex's array. `runs` supplies the new samples per vertex; vertices
    /// without a run of length `count` get empty samples. Returns the removed
    /// samples per vertex. Out-of-range requests are clamped to the arena end.
    pub(crate) fn splice(
        &mut self,
        at: usize,
        remove: usize,
        count: usize,
        runs: Vec<Vec<FrameAnimVertex>>,
    ) -> Vec<Vec<FrameAnimVertex>> {
        let at = at.min(self.slots);
        let remove = remove.min(self.slots - at);
        let mut runs = runs.into_iter();
        let removed = self
            .vertices
            .iter_mut()
            .map(|samples| {
                let replacement = runs
                    .next()
                    .filter(|run| run.len() == count)
                    .unwrap_or_else(|| vec![FrameAnimVertex::EMPTY; count]);
                samples.splice(at..at + remove, replacement).collect()
            })
            .collect();
        self.slots = self.slots + count - remove;
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(x: f64) -> FrameAnimVertex {
        FrameAnimVertex::new([x, 0.0, 0.0], Interp::Lerp)
    }

    #[test]
    fn splice_inserts_and_returns_removed() {
        let mut store = FrameStore::new();
        store.push_vertex();
        store.push_vertex();
        store.splice(0, 0, 3, Vec::new());
        assert_eq!(store.slots(), 3);
        store.set(0, 1, sample(1.0));
        store.set(1, 2, sample(2.0));

        let removed = store.splice(1, 2, 1, vec![vec![sample(9.0)], vec![sample(8.0)]]);
        assert_eq!(store.slots(), 2);
        assert_eq!(removed[0], vec![sample(1.0), FrameAnimVertex::EMPTY]);
        assert_eq!(removed[1], vec![FrameAnimVertex::EMPTY, sample(2.0)]);
        assert_eq!(store.get(0, 1), Some(&sample(9.0)));
        assert_eq!(store.get(1, 1), Some(&sample(8.0)));
    }

    #[test]
    fn new_vertices_match_slot_count() {
        let mut store = FrameStore::new();
        store.splice(0, 0, 4, Vec::new());
        let v = store.push_vertex();
        assert_eq!(store.samples(v).map(<[_]>::len), Some(4));

        // Slot count is tracked even without vertices.
        let mut bare = FrameStore::new();
        bare.splice(0, 0, 2, Vec::new());
        assert_eq!(bare.slots(), 2);
    }

    #[test]
    fn ranges_after_the_splice_shift() {
        // [A: 0..2][B: 2..5][C: 5..6], B grows by 2 at its end.
        assert_eq!(shift_start(0, 5, 0, 2), 0);
        assert_eq!(shift_start(5, 5, 0, 2), 7);
        // B loses its first slot.
        assert_eq!(shift_start(5, 2, 1, 0), 4);
        assert_eq!(shift_start(0, 2, 1, 0), 0);
    }

    #[test]
    fn mismatched_vertex_arrays_rejected() {
        assert!(FrameStore::from_vertices(vec![vec![sample(0.0)], vec![]]).is_none());
    }
}
