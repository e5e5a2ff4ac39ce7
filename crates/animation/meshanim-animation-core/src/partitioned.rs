//! A vector kept sorted by a small partition key.
//!
//! Only partition-preserving operations are exposed: items are appended to
//! the end of their partition, inserted inside it, moved within it, or
//! relocated to the nearest edge of another partition.

use std::ops::Range;

use serde::{Deserialize, Serialize};

pub trait Partitioned {
    fn partition(&self) -> usize;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionedVec<T> {
    items: Vec<T>,
}

impl<T> Default for PartitionedVec<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Partitioned> PartitionedVec<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing vector; fails when it is not partition ordered.
    pub fn from_vec(items: Vec<T>) -> Result<Self, Vec<T>> {
        if items.windows(2).all(|w| w[0].partition() <= w[1].partition()) {
            Ok(Self { items })
        } else {
            Err(items)
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// Mutable access. Callers must not change the item's partition.
    #[inline]
    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }

    /// Indices occupied by `partition`. Empty partitions yield an empty
    /// range positioned where their first item would go.
    pub fn partition_range(&self, partition: usize) -> Range<usize> {
        let start = self.items.partition_point(|x| x.partition() < partition);
        let end = self.items.partition_point(|x| x.partition() <= partition);
        start..end
    }

    /// Append at the end of the item's partition; returns its index.
    pub fn push(&mut self, item: T) -> usize {
        let index = self.partition_range(item.partition()).end;
        self.items.insert(index, item);
        index
    }

    /// Insert at `index`, which must lie within (or at the end of) the item's
    /// partition. The item is handed back otherwise.
    pub fn insert(&mut self, index: usize, item: T) -> Result<(), T> {
        let range = self.partition_range(item.partition());
        if index < range.start || index > range.end {
            return Err(item);
        }
        self.items.insert(index, item);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Option<T> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    /// Move an item to another index of the same partition.
    pub fn move_within(&mut self, from: usize, to: usize) -> bool {
        let Some(item) = self.items.get(from) else {
            return false;
        };
        let range = self.partition_range(item.partition());
        if to < range.start || to >= range.end {
            return false;
        }
        let item = self.items.remove(from);
        self.items.insert(to, item);
        true
    }

    /// Apply `change` (which may alter the partition key) and move the item to
    /// the nearest edge of its new partition. Returns the new index.
    pub fn relocate(&mut self, index: usize, change: impl FnOnce(&mut T)) -> Option<usize> {
        let mut item = self.remove(index)?;
        let old = item.partition();
        change(&mut item);
        let range = self.partition_range(item.partition());
        let target = if item.partition() > old {
            range.start
        } else if item.partition() < old {
            range.end
        } else {
            index.clamp(range.start, range.end)
        };
        self.items.insert(target, item);
        Some(target)
    }
}

impl<'a, T> IntoIterator for &'a PartitionedVec<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item(usize, &'static str);

    impl Partitioned for Item {
        fn partition(&self) -> usize {
            self.0
        }
    }

    fn names(v: &PartitionedVec<Item>) -> Vec<&'static str> {
        v.iter().map(|i| i.1).collect()
    }

    #[test]
    fn push_appends_to_partition() {
        let mut v = PartitionedVec::new();
        assert_eq!(v.push(Item(2, "c0")), 0);
        assert_eq!(v.push(Item(0, "a0")), 0);
        assert_eq!(v.push(Item(1, "b0")), 1);
        assert_eq!(v.push(Item(0, "a1")), 1);
        assert_eq!(names(&v), vec!["a0", "a1", "b0", "c0"]);
        assert_eq!(v.partition_range(1), 2..3);
        assert_eq!(v.partition_range(3), 4..4);
    }

    #[test]
    fn insert_and_move_stay_inside_partition() {
        let mut v = PartitionedVec::new();
        v.push(Item(0, "a0"));
        v.push(Item(1, "b0"));
        v.push(Item(1, "b1"));
        assert!(v.insert(0, Item(1, "bad")).is_err());
        assert!(v.insert(1, Item(1, "b-")).is_ok());
        assert!(!v.move_within(1, 0));
        assert!(v.move_within(1, 3));
        assert_eq!(names(&v), vec!["a0", "b0", "b1", "b-"]);
    }

    #[test]
    fn relocate_goes_to_nearest_edge() {
        let mut v = PartitionedVec::new();
        for (p, n) in [(0, "a0"), (0, "a1"), (1, "b0"), (2, "c0"), (2, "c1")] {
            v.push(Item(p, n));
        }
        assert_eq!(v.relocate(0, |i| i.0 = 2), Some(2));
        assert_eq!(names(&v), vec!["a1", "b0", "a0", "c0", "c1"]);
        assert_eq!(v.relocate(4, |i| i.0 = 0), Some(1));
        assert_eq!(names(&v), vec!["a1", "c1", "b0", "a0", "c0"]);
    }

    #[test]
    fn from_vec_checks_order() {
        assert!(PartitionedVec::from_vec(vec![Item(1, "x"), Item(0, "y")]).is_err());
        assert!(PartitionedVec::from_vec(vec![Item(0, "x"), Item(0, "y")]).is_ok());
    }
}
