//! # Item Store
//!
//! Insertion-ordered collection of queued items.
//!
//! ## Overview
//!
//! The store is the single owner of every [`FileItem`]. Order is admission
//! order and never changes while an item lives, so the queue position the
//! user sees is stable across retries and settings edits. All mutation goes
//! through the scheduler, which holds the store exclusively.

use crate::item::{FileItem, FileItemId, ItemStatus};
use bytes::Bytes;
use codec_traits::OperationParams;
use serde::Serialize;

/// Owns all queued items in admission order.
#[derive(Debug, Default)]
pub struct ItemStore {
    items: Vec<FileItem>,
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, item: FileItem) {
        self.items.push(item);
    }

    pub fn get(&self, id: &FileItemId) -> Option<&FileItem> {
        self.items.iter().find(|item| item.id == *id)
    }

    pub fn get_mut(&mut self, id: &FileItemId) -> Option<&mut FileItem> {
        self.items.iter_mut().find(|item| item.id == *id)
    }

    /// Remove an item, returning it so the caller can release its resources.
    pub fn remove(&mut self, id: &FileItemId) -> Option<FileItem> {
        let index = self.items.iter().position(|item| item.id == *id)?;
        Some(self.items.remove(index))
    }

    pub fn contains(&self, id: &FileItemId) -> bool {
        self.items.iter().any(|item| item.id == *id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileItem> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut FileItem> {
        self.items.iter_mut()
    }

    /// First pending item, in admission order, whose id passes `eligible`.
    pub fn next_pending<F>(&self, eligible: F) -> Option<FileItemId>
    where
        F: Fn(FileItemId) -> bool,
    {
        self.items
            .iter()
            .filter(|item| item.status == ItemStatus::Pending)
            .map(|item| item.id)
            .find(|id| eligible(*id))
    }

    /// Count items in the given status.
    pub fn count_status(&self, status: ItemStatus) -> usize {
        self.items.iter().filter(|item| item.status == status).count()
    }
}

/// Read-only snapshot of one item for display.
///
/// Views are cheap: the result bytes are reference-counted, not copied.
#[derive(Debug, Clone, Serialize)]
pub struct FileItemView {
    pub id: FileItemId,
    pub name: String,
    pub mime_type: String,
    pub status: ItemStatus,
    pub progress: u8,
    pub attempts: u32,
    /// User-facing failure message, if the last run failed
    pub failure: Option<String>,
    /// Effective settings for the item's next or last run
    pub settings: OperationParams,
    /// Whether the item carries its own settings fork
    pub own_settings: bool,
    /// Converted output, present only when `Done`
    #[serde(skip)]
    pub result: Option<Bytes>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str) -> FileItem {
        FileItem::new(name, "application/pdf", Bytes::from_static(b"%PDF"))
    }

    #[test]
    fn test_admission_order_is_stable() {
        let mut store = ItemStore::new();
        let ids: Vec<_> = ["a", "b", "c"]
            .iter()
            .map(|name| {
                let item = item(name);
                let id = item.id;
                store.insert(item);
                id
            })
            .collect();

        let order: Vec<_> = store.iter().map(|item| item.id).collect();
        assert_eq!(order, ids);

        store.remove(&ids[1]);
        let order: Vec<_> = store.iter().map(|item| item.id).collect();
        assert_eq!(order, vec![ids[0], ids[2]]);
    }

    #[test]
    fn test_next_pending_respects_order_and_filter() {
        let mut store = ItemStore::new();
        let first = item("a");
        let first_id = first.id;
        let mut second = item("b");
        let second_id = second.id;
        second.start().unwrap();
        let third = item("c");
        let third_id = third.id;

        store.insert(first);
        store.insert(second);
        store.insert(third);

        assert_eq!(store.next_pending(|_| true), Some(first_id));
        assert_eq!(
            store.next_pending(|id| id != first_id),
            Some(third_id)
        );
        assert!(!store.get(&second_id).unwrap().status.is_terminal());
    }

    #[test]
    fn test_count_status() {
        let mut store = ItemStore::new();
        store.insert(item("a"));
        let mut running = item("b");
        running.start().unwrap();
        store.insert(running);

        assert_eq!(store.count_status(ItemStatus::Pending), 1);
        assert_eq!(store.count_status(ItemStatus::Running), 1);
        assert_eq!(store.count_status(ItemStatus::Done), 0);
    }
}
