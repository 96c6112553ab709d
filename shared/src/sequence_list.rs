use thiserror::Error;

use crate::{sequence_less_than, types::PacketIndex};

/// Errors that can occur during SequenceList operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequenceError {
    /// Attempted to insert a duplicate ID into the sequence list
    #[error("Duplicate sequence ID {id} not allowed in SequenceList")]
    DuplicateId { id: PacketIndex },
}

/// A list of items keyed by wrapping packet index, always sorted oldest to
/// newest and free of duplicate keys. Most traffic lands at the back, so
/// lookups and inserts scan from there.
pub struct SequenceList<T> {
    list: Vec<(PacketIndex, T)>,
}

impl<T> Default for SequenceList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SequenceList<T> {
    pub fn new() -> Self {
        Self { list: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn clear(&mut self) {
        self.list.clear();
    }

    pub fn front(&self) -> Option<&(PacketIndex, T)> {
        self.list.first()
    }

    pub fn back(&self) -> Option<&(PacketIndex, T)> {
        self.list.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(PacketIndex, T)> {
        self.list.iter()
    }

    fn position_scan_from_back(&self, id: PacketIndex) -> Result<usize, usize> {
        for (index, (old_id, _)) in self.list.iter().enumerate().rev() {
            if *old_id == id {
                return Ok(index);
            }
            if sequence_less_than(*old_id, id) {
                return Err(index + 1);
            }
        }
        Err(0)
    }

    pub fn get_scan_from_back(&self, id: &PacketIndex) -> Option<&T> {
        let index = self.position_scan_from_back(*id).ok()?;
        self.list.get(index).map(|(_, item)| item)
    }

    /// Returns the item with the given ID or, failing that, the newest item
    /// older than it.
    pub fn find_nearest_prior(&self, id: &PacketIndex) -> Option<&(PacketIndex, T)> {
        match self.position_scan_from_back(*id) {
            Ok(index) => self.list.get(index),
            Err(0) => None,
            Err(index) => self.list.get(index - 1),
        }
    }

    /// Attempts to insert an item with the given ID, scanning from the back.
    /// Returns an error if the ID already exists.
    pub fn try_insert_scan_from_back(
        &mut self,
        id: PacketIndex,
        item: T,
    ) -> Result<(), SequenceError> {
        match self.position_scan_from_back(id) {
            Ok(_) => Err(SequenceError::DuplicateId { id }),
            Err(index) => {
                self.list.insert(index, (id, item));
                Ok(())
            }
        }
    }

    pub fn remove_scan_from_front(&mut self, id: &PacketIndex) -> Option<T> {
        let index = self.list.iter().position(|(old_id, _)| old_id == id)?;
        Some(self.list.remove(index).1)
    }

    /// Removes every item strictly older than `id`, returning how many were
    /// dropped.
    pub fn prune_before(&mut self, id: &PacketIndex) -> usize {
        let keep_from = self
            .list
            .iter()
            .position(|(old_id, _)| !sequence_less_than(*old_id, *id))
            .unwrap_or(self.list.len());
        self.list.drain(..keep_from);
        keep_from
    }
}

#[cfg(test)]
mod tests {
    use super::SequenceList;

    #[test]
    fn inserts_stay_sorted_across_wrap() {
        let mut list = SequenceList::new();
        list.try_insert_scan_from_back(65534, 'a').unwrap();
        list.try_insert_scan_from_back(1, 'c').unwrap();
        list.try_insert_scan_from_back(65535, 'b').unwrap();

        let ids: Vec<u16> = list.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![65534, 65535, 1]);
    }

    #[test]
    fn nearest_prior() {
        let mut list = SequenceList::new();
        list.try_insert_scan_from_back(5, "five").unwrap();
        list.try_insert_scan_from_back(7, "seven").unwrap();

        assert_eq!(list.find_nearest_prior(&5).map(|(id, _)| *id), Some(5));
        assert_eq!(list.find_nearest_prior(&6).map(|(id, _)| *id), Some(5));
        assert_eq!(list.find_nearest_prior(&9).map(|(id, _)| *id), Some(7));
        assert!(list.find_nearest_prior(&4).is_none());
    }

    #[test]
    fn prune_before_keeps_boundary() {
        let mut list = SequenceList::new();
        for id in [3u16, 4, 5, 6] {
            list.try_insert_scan_from_back(id, ()).unwrap();
        }
        assert_eq!(list.prune_before(&5), 2);
        assert_eq!(list.front().map(|(id, _)| *id), Some(5));
        assert_eq!(list.len(), 2);
    }
}
