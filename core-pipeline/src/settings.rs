//! # Settings Model
//!
//! Global conversion settings with explicit per-item forks.
//!
//! ## Overview
//!
//! Every item either follows the global [`OperationParams`] or carries its
//! own fork; the binding is stored on the item, never inferred by comparing
//! values. Any settings edit resets the affected items to `Pending` so they
//! re-run with the new parameters, and the model hands back the result
//! handles those resets displaced so the scheduler can release them.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let mut model = SettingsModel::new(OperationParams::new(OperationKind::CompressPdf));
//!
//! // Fork one item, then push a global change to everyone still following it
//! model.update_item(item_id, patch, &mut store)?;
//! let outcome = model.update_global(other_patch, &mut store);
//! ```

use crate::error::{PipelineError, Result};
use crate::item::{FileItem, FileItemId};
use crate::resources::ResourceHandle;
use crate::store::ItemStore;
use codec_traits::{OperationParams, OutputFormat};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Whether an item follows global settings or carries its own fork.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "binding", rename_all = "lowercase")]
pub enum SettingsBinding {
    /// The item uses whatever the global settings currently are
    Global,
    /// The item froze its own copy and ignores global edits
    Own(OperationParams),
}

impl SettingsBinding {
    pub fn is_global(&self) -> bool {
        matches!(self, SettingsBinding::Global)
    }
}

/// A partial settings edit.
///
/// `None` fields are left untouched; the nested options allow clearing
/// optional parameters explicitly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsPatch {
    pub quality: Option<u8>,
    pub format: Option<OutputFormat>,
    pub dimensions: Option<Option<(u32, u32)>>,
    pub target_size_bytes: Option<Option<u64>>,
}

impl SettingsPatch {
    fn apply_to(&self, params: &mut OperationParams) {
        if let Some(quality) = self.quality {
            params.quality = quality.min(100);
        }
        if let Some(format) = self.format {
            params.format = format;
        }
        if let Some(dimensions) = self.dimensions {
            params.dimensions = dimensions;
        }
        if let Some(target) = self.target_size_bytes {
            params.target_size_bytes = target;
        }
    }
}

/// Items reset by a settings edit, plus the result handles the resets
/// displaced. The caller releases the handles and requeues the items.
#[derive(Debug, Default)]
pub struct ResetOutcome {
    pub reset: Vec<FileItemId>,
    pub released: Vec<ResourceHandle>,
}

impl ResetOutcome {
    fn absorb(&mut self, item: &mut FileItem) {
        if let Some(handle) = item.reset() {
            self.released.push(handle);
        }
        self.reset.push(item.id);
    }
}

/// Holds the global settings and applies edits across the store.
#[derive(Debug)]
pub struct SettingsModel {
    global: OperationParams,
}

impl SettingsModel {
    pub fn new(global: OperationParams) -> Self {
        Self { global }
    }

    /// The current global settings.
    pub fn global(&self) -> &OperationParams {
        &self.global
    }

    /// The settings a run of `item` would use right now.
    pub fn effective<'a>(&'a self, item: &'a FileItem) -> &'a OperationParams {
        match &item.settings {
            SettingsBinding::Global => &self.global,
            SettingsBinding::Own(params) => params,
        }
    }

    /// Edit the global settings.
    ///
    /// Every item still bound to global resets to `Pending` so it re-runs
    /// with the new values; forked items are untouched.
    pub fn update_global(&mut self, patch: &SettingsPatch, store: &mut ItemStore) -> ResetOutcome {
        patch.apply_to(&mut self.global);

        let mut outcome = ResetOutcome::default();
        for item in store.iter_mut() {
            if item.settings.is_global() {
                outcome.absorb(item);
            }
        }
        debug!(reset = outcome.reset.len(), "Global settings updated");
        outcome
    }

    /// Edit one item's settings, forking it off global if it still follows.
    ///
    /// The item resets to `Pending` and re-runs with its forked values.
    ///
    /// # Errors
    ///
    /// Returns an error if the item does not exist
    pub fn update_item(
        &self,
        item_id: FileItemId,
        patch: &SettingsPatch,
        store: &mut ItemStore,
    ) -> Result<ResetOutcome> {
        let item = store
            .get_mut(&item_id)
            .ok_or(PipelineError::ItemNotFound { item_id })?;

        let mut params = self.effective(item).clone();
        patch.apply_to(&mut params);
        item.settings = SettingsBinding::Own(params);

        let mut outcome = ResetOutcome::default();
        outcome.absorb(item);
        debug!(item_id = %item_id, "Item settings forked");
        Ok(outcome)
    }

    /// Rebind every item to the current global settings and reset it.
    pub fn apply_global_to_all(&self, store: &mut ItemStore) -> ResetOutcome {
        let mut outcome = ResetOutcome::default();
        for item in store.iter_mut() {
            item.settings = SettingsBinding::Global;
            outcome.absorb(item);
        }
        outcome
    }

    /// Adopt one item's effective settings as the new global values, then
    /// rebind and reset every item.
    ///
    /// # Errors
    ///
    /// Returns an error if the item does not exist
    pub fn adopt_item_as_global(
        &mut self,
        item_id: FileItemId,
        store: &mut ItemStore,
    ) -> Result<ResetOutcome> {
        let item = store
            .get(&item_id)
            .ok_or(PipelineError::ItemNotFound { item_id })?;
        self.global = self.effective(item).clone();
        Ok(self.apply_global_to_all(store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use codec_traits::OperationKind;

    fn store_with(names: &[&str]) -> (ItemStore, Vec<FileItemId>) {
        let mut store = ItemStore::new();
        let ids = names
            .iter()
            .map(|name| {
                let item = FileItem::new(*name, "application/pdf", Bytes::from_static(b"%PDF"));
                let id = item.id;
                store.insert(item);
                id
            })
            .collect();
        (store, ids)
    }

    fn model() -> SettingsModel {
        SettingsModel::new(OperationParams::new(OperationKind::CompressPdf))
    }

    #[test]
    fn test_global_edit_resets_followers_only() {
        let (mut store, ids) = store_with(&["a.pdf", "b.pdf"]);
        let mut model = model();

        // Fork b.pdf first
        let patch = SettingsPatch {
            quality: Some(40),
            ..Default::default()
        };
        model.update_item(ids[1], &patch, &mut store).unwrap();

        let outcome = model.update_global(
            &SettingsPatch {
                quality: Some(90),
                ..Default::default()
            },
            &mut store,
        );

        assert_eq!(outcome.reset, vec![ids[0]]);
        assert_eq!(model.global().quality, 90);
        let forked = store.get(&ids[1]).unwrap();
        assert_eq!(model.effective(forked).quality, 40);
    }

    #[test]
    fn test_item_edit_forks_off_global() {
        let (mut store, ids) = store_with(&["a.pdf"]);
        let model = model();

        let outcome = model
            .update_item(
                ids[0],
                &SettingsPatch {
                    quality: Some(55),
                    ..Default::default()
                },
                &mut store,
            )
            .unwrap();

        assert_eq!(outcome.reset, vec![ids[0]]);
        let item = store.get(&ids[0]).unwrap();
        assert!(!item.settings.is_global());
        assert_eq!(model.effective(item).quality, 55);
        // Global untouched
        assert_eq!(model.global().quality, 80);
    }

    #[test]
    fn test_apply_global_to_all_rebinds_forks() {
        let (mut store, ids) = store_with(&["a.pdf", "b.pdf"]);
        let model = model();
        model
            .update_item(
                ids[0],
                &SettingsPatch {
                    quality: Some(10),
                    ..Default::default()
                },
                &mut store,
            )
            .unwrap();

        let outcome = model.apply_global_to_all(&mut store);

        assert_eq!(outcome.reset.len(), 2);
        assert!(store.get(&ids[0]).unwrap().settings.is_global());
    }

    #[test]
    fn test_adopt_item_as_global() {
        let (mut store, ids) = store_with(&["a.pdf", "b.pdf"]);
        let mut model = model();
        model
            .update_item(
                ids[0],
                &SettingsPatch {
                    quality: Some(33),
                    ..Default::default()
                },
                &mut store,
            )
            .unwrap();

        let outcome = model.adopt_item_as_global(ids[0], &mut store).unwrap();

        assert_eq!(model.global().quality, 33);
        assert_eq!(outcome.reset.len(), 2);
        assert!(store.iter().all(|item| item.settings.is_global()));
    }

    #[test]
    fn test_patch_can_clear_optional_fields() {
        let mut params = OperationParams::new(OperationKind::ConvertImage)
            .with_dimensions(800, 600);
        let patch = SettingsPatch {
            dimensions: Some(None),
            ..Default::default()
        };
        patch.apply_to(&mut params);
        assert!(params.dimensions.is_none());
    }

    #[test]
    fn test_update_missing_item_errors() {
        let (mut store, _) = store_with(&[]);
        let model = model();
        let result = model.update_item(FileItemId::new(), &SettingsPatch::default(), &mut store);
        assert!(matches!(result, Err(PipelineError::ItemNotFound { .. })));
    }
}
