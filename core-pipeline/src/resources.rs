//! # Resource Tracker
//!
//! Explicit ownership accounting for transient result binaries.
//!
//! ## Overview
//!
//! Converted outputs live in memory until the user saves or discards them.
//! The tracker owns every such payload and hands out move-only
//! [`ResourceHandle`] keys; whoever holds the handle is the owner, and
//! releasing consumes the handle, so a double release does not compile.
//!
//! Replacing an item's result goes through [`ResourceTracker::retrack`],
//! which registers the new payload before releasing the old one so there is
//! no instant where the item owns nothing.

use crate::item::FileItemId;
use bytes::Bytes;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Move-only key to one tracked payload.
///
/// Deliberately neither `Clone` nor `Copy`: exactly one owner exists at any
/// time, and [`ResourceTracker::release`] consumes it.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ResourceHandle {
    id: u64,
    item_id: FileItemId,
}

impl ResourceHandle {
    /// The item this payload belongs to.
    pub fn item_id(&self) -> FileItemId {
        self.item_id
    }
}

/// Owns result payloads and accounts for every live allocation.
#[derive(Debug, Default)]
pub struct ResourceTracker {
    next_id: u64,
    entries: HashMap<u64, (FileItemId, Bytes)>,
}

impl ResourceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `data` on behalf of `item_id`.
    pub fn track(&mut self, item_id: FileItemId, data: Bytes) -> ResourceHandle {
        let id = self.next_id;
        self.next_id += 1;
        debug!(item_id = %item_id, bytes = data.len(), "Tracking result payload");
        self.entries.insert(id, (item_id, data));
        ResourceHandle { id, item_id }
    }

    /// Replace an item's payload: track the new data, then release the old
    /// handle if one is given.
    pub fn retrack(
        &mut self,
        item_id: FileItemId,
        data: Bytes,
        old: Option<ResourceHandle>,
    ) -> ResourceHandle {
        let handle = self.track(item_id, data);
        if let Some(old) = old {
            self.release(old);
        }
        handle
    }

    /// Borrow the payload behind a live handle.
    ///
    /// Returns `None` only if the payload was already removed by
    /// [`ResourceTracker::release_all`].
    pub fn get(&self, handle: &ResourceHandle) -> Option<&Bytes> {
        self.entries.get(&handle.id).map(|(_, data)| data)
    }

    /// Release one payload, consuming its handle.
    pub fn release(&mut self, handle: ResourceHandle) {
        if self.entries.remove(&handle.id).is_none() {
            // Already swept by release_all; the handle was inert.
            debug!(item_id = %handle.item_id, "Released handle had no live payload");
        }
    }

    /// Release every payload still held for `item_id`.
    ///
    /// Safe to call repeatedly; outstanding handles for the item become
    /// inert. Used when an item is removed from the queue.
    pub fn release_all(&mut self, item_id: FileItemId) {
        self.entries.retain(|_, (owner, _)| *owner != item_id);
    }

    /// Number of live payloads.
    pub fn live_count(&self) -> usize {
        self.entries.len()
    }

    /// Total bytes held across all live payloads.
    pub fn live_bytes(&self) -> usize {
        self.entries.values().map(|(_, data)| data.len()).sum()
    }
}

impl Drop for ResourceTracker {
    fn drop(&mut self) {
        if !self.entries.is_empty() {
            warn!(
                live = self.entries.len(),
                bytes = self.live_bytes(),
                "Resource tracker dropped with live payloads"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_and_get() {
        let mut tracker = ResourceTracker::new();
        let item_id = FileItemId::new();
        let handle = tracker.track(item_id, Bytes::from_static(b"output"));

        assert_eq!(handle.item_id(), item_id);
        assert_eq!(tracker.get(&handle).map(|b| &b[..]), Some(&b"output"[..]));
        assert_eq!(tracker.live_count(), 1);
        assert_eq!(tracker.live_bytes(), 6);
    }

    #[test]
    fn test_release_consumes_the_handle() {
        let mut tracker = ResourceTracker::new();
        let handle = tracker.track(FileItemId::new(), Bytes::from_static(b"x"));

        tracker.release(handle);
        assert_eq!(tracker.live_count(), 0);
        // `handle` has moved; a second release is a compile error.
    }

    #[test]
    fn test_retrack_swaps_payloads_without_a_gap() {
        let mut tracker = ResourceTracker::new();
        let item_id = FileItemId::new();
        let first = tracker.track(item_id, Bytes::from_static(b"v1"));

        let second = tracker.retrack(item_id, Bytes::from_static(b"v2"), Some(first));
        assert_eq!(tracker.live_count(), 1);
        assert_eq!(tracker.get(&second).map(|b| &b[..]), Some(&b"v2"[..]));
    }

    #[test]
    fn test_release_all_is_idempotent_and_scoped() {
        let mut tracker = ResourceTracker::new();
        let removed = FileItemId::new();
        let kept = FileItemId::new();
        let dangling = tracker.track(removed, Bytes::from_static(b"a"));
        tracker.track(removed, Bytes::from_static(b"b"));
        let kept_handle = tracker.track(kept, Bytes::from_static(b"c"));

        tracker.release_all(removed);
        tracker.release_all(removed);

        assert_eq!(tracker.live_count(), 1);
        assert!(tracker.get(&dangling).is_none());
        assert!(tracker.get(&kept_handle).is_some());

        // Releasing a swept handle is harmless.
        tracker.release(dangling);
        assert_eq!(tracker.live_count(), 1);
    }
}
