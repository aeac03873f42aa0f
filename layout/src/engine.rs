//! Column layout engine: schema merge, ordering, the frozen-prefix
//! invariant, and write-through persistence.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use despacho_types::{
    ACTION_COLUMN_ORDER, ColumnDescriptor, ColumnStyles, RuntimeSettings, column_slug,
};

use crate::store::LayoutStore;

/// Persisted record format version. Bumped on incompatible changes; a
/// mismatched record is discarded and the schema defaults win.
const LAYOUT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct SavedLayout {
    version: u32,
    columns: Vec<ColumnDescriptor>,
}

/// Layout state for one table identity.
///
/// The engine owns the authoritative descriptor set between `initialize`
/// calls and writes every mutation through to the durable store. Storage
/// failures are logged and swallowed: customization degrades to the current
/// session, it never breaks the table.
pub struct LayoutEngine {
    table_key: String,
    store: Arc<dyn LayoutStore>,
    settings: RuntimeSettings,
    columns: Vec<ColumnDescriptor>,
}

impl LayoutEngine {
    #[must_use]
    pub fn new(
        table_key: impl Into<String>,
        store: Arc<dyn LayoutStore>,
        settings: RuntimeSettings,
    ) -> Self {
        Self {
            table_key: table_key.into(),
            store,
            settings,
            columns: Vec::new(),
        }
    }

    /// Rebuild the descriptor set from the table's current column list,
    /// merging in previously persisted customization by normalized id.
    ///
    /// Known columns keep their saved visibility, order, frozen flag, and
    /// styles but refresh their display name; new columns are appended after
    /// every known one, visible and unfrozen; saved columns absent from the
    /// new schema are silently dropped. The synthetic row-action column is
    /// always pinned to order -1 regardless of saved state.
    pub fn initialize<S: AsRef<str>>(
        &mut self,
        names: &[S],
        action: Option<&str>,
    ) -> &[ColumnDescriptor] {
        let saved = self.load();
        let mut next_order = saved
            .iter()
            .filter(|c| !c.is_action)
            .map(|c| c.order)
            .max()
            .map_or(0, |max| max + 1);
        let mut saved_by_id: HashMap<String, ColumnDescriptor> =
            saved.into_iter().map(|c| (c.id.clone(), c)).collect();

        let mut columns = Vec::with_capacity(names.len() + 1);
        let mut seen: HashSet<String> = HashSet::new();

        if let Some(name) = action {
            let mut column = ColumnDescriptor::action(name, 0);
            if let Some(previous) = saved_by_id.remove(&column.id) {
                column.visible = previous.visible;
                column.styles = previous.styles;
            }
            seen.insert(column.id.clone());
            columns.push(column);
        }

        let base = usize::from(action.is_some());
        for (index, name) in names.iter().enumerate() {
            let name = name.as_ref();
            let slug = column_slug(name);
            if slug.is_empty() || !seen.insert(slug.clone()) {
                tracing::debug!(name, "skipping column with empty or duplicate slug");
                continue;
            }
            let column = match saved_by_id.remove(&slug) {
                Some(mut previous) => {
                    previous.name = name.to_string();
                    previous.original_index = base + index;
                    previous.is_action = false;
                    previous
                }
                None => {
                    let fresh = ColumnDescriptor::from_schema(name, base + index, next_order);
                    next_order += 1;
                    fresh
                }
            };
            columns.push(column);
        }

        self.columns = columns;
        self.enforce_fixed_prefix();
        self.sort_columns();
        self.persist();
        &self.columns
    }

    /// Reassign `order` 0..n-1 from a permutation of the current order
    /// values. Order values missing from the permutation keep their columns:
    /// those are appended at the end in their old relative order. Unknown
    /// values are ignored.
    pub fn reorder(&mut self, new_order: &[i32]) {
        let mut by_order: HashMap<i32, usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_action)
            .map(|(i, c)| (c.order, i))
            .collect();

        let mut assignments: Vec<(usize, i32)> = Vec::with_capacity(by_order.len());
        let mut seq = 0;
        for value in new_order {
            if let Some(index) = by_order.remove(value) {
                assignments.push((index, seq));
                seq += 1;
            }
        }
        let mut leftovers: Vec<(i32, usize)> = by_order.into_iter().collect();
        leftovers.sort_unstable();
        for (_, index) in leftovers {
            assignments.push((index, seq));
            seq += 1;
        }
        for (index, order) in assignments {
            self.columns[index].order = order;
        }

        self.enforce_fixed_prefix();
        self.sort_columns();
        self.persist();
    }

    /// Flip a column's visibility. A hidden column cannot stay frozen, so
    /// hiding also unfreezes, which may unfreeze trailing columns to keep
    /// the prefix contiguous.
    pub fn toggle_visibility(&mut self, id: &str) {
        let Some(column) = self.columns.iter_mut().find(|c| c.id == id) else {
            return;
        };
        column.visible = !column.visible;
        if !column.visible {
            column.is_fixed = false;
        }
        self.enforce_fixed_prefix();
        self.persist();
    }

    /// Freeze or unfreeze a column, cascading so the frozen set stays a
    /// contiguous leading run of the visible order: freezing also freezes
    /// every column before it, unfreezing also unfreezes every column after
    /// it. No-op for hidden or unknown columns and for the action column,
    /// which is pinned leftmost anyway.
    pub fn set_fixed(&mut self, id: &str, fixed: bool) {
        let ordered = self.visible_data_indices();
        let Some(position) = ordered.iter().position(|&i| self.columns[i].id == id) else {
            return;
        };
        if fixed {
            for &index in &ordered[..=position] {
                self.columns[index].is_fixed = true;
            }
        } else {
            for &index in &ordered[position..] {
                self.columns[index].is_fixed = false;
            }
        }
        self.persist();
    }

    /// Shallow-merge presentation attributes into a column's styles.
    pub fn update_styles(&mut self, id: &str, update: &ColumnStyles) {
        let Some(column) = self.columns.iter_mut().find(|c| c.id == id) else {
            return;
        };
        column.styles.apply(update);
        self.persist();
    }

    /// Restore default order (schema order), full visibility, nothing
    /// frozen. Styles are untouched.
    pub fn reset_layout(&mut self) {
        self.apply_layout_reset();
        self.persist();
    }

    /// Clear every column's styles. Order, visibility, and frozen state are
    /// untouched.
    pub fn reset_styles(&mut self) {
        self.apply_styles_reset();
        self.persist();
    }

    /// Restore layout and styles defaults and forget the persisted record
    /// entirely.
    pub fn reset_all(&mut self) {
        self.apply_layout_reset();
        self.apply_styles_reset();
        self.store.delete(&self.table_key);
    }

    /// Current descriptor set, action column first, then by order.
    #[must_use]
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Visible subset in render order.
    #[must_use]
    pub fn visible_columns(&self) -> Vec<&ColumnDescriptor> {
        self.columns.iter().filter(|c| c.visible).collect()
    }

    /// Left offset of a frozen column during horizontal scroll, assuming the
    /// configured uniform width for every frozen column before it (the
    /// action column included). `None` for columns that are not frozen.
    #[must_use]
    pub fn fixed_left_offset(&self, id: &str) -> Option<u32> {
        let column = self.columns.iter().find(|c| c.id == id)?;
        if column.is_action {
            return Some(0);
        }
        if !column.is_fixed || !column.visible {
            return None;
        }
        let preceding = self
            .columns
            .iter()
            .filter(|c| c.visible && (c.is_action || (c.is_fixed && c.order < column.order)))
            .count();
        Some(preceding as u32 * self.settings.action_column_width)
    }

    fn apply_layout_reset(&mut self) {
        let base = self.columns.iter().filter(|c| c.is_action).count();
        for column in &mut self.columns {
            column.visible = true;
            column.is_fixed = false;
            column.order = if column.is_action {
                ACTION_COLUMN_ORDER
            } else {
                (column.original_index - base) as i32
            };
        }
        self.sort_columns();
    }

    fn apply_styles_reset(&mut self) {
        for column in &mut self.columns {
            column.styles = ColumnStyles::default();
        }
    }

    /// Indices of visible, non-action columns in ascending order.
    fn visible_data_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.visible && !c.is_action)
            .map(|(i, _)| i)
            .collect();
        indices.sort_by_key(|&i| self.columns[i].order);
        indices
    }

    /// Re-establish the frozen-prefix invariant: no hidden column is
    /// frozen, and past the first unfrozen visible column nothing is.
    fn enforce_fixed_prefix(&mut self) {
        for column in &mut self.columns {
            if !column.visible {
                column.is_fixed = false;
            }
        }
        let mut in_prefix = true;
        for index in self.visible_data_indices() {
            if !self.columns[index].is_fixed {
                in_prefix = false;
            } else if !in_prefix {
                self.columns[index].is_fixed = false;
            }
        }
    }

    fn sort_columns(&mut self) {
        self.columns
            .sort_by(|a, b| a.order.cmp(&b.order).then(a.original_index.cmp(&b.original_index)));
    }

    fn load(&self) -> Vec<ColumnDescriptor> {
        let Some(blob) = self.store.read(&self.table_key) else {
            return Vec::new();
        };
        match serde_json::from_str::<SavedLayout>(&blob) {
            Ok(saved) if saved.version == LAYOUT_VERSION => saved.columns,
            Ok(saved) => {
                tracing::warn!(
                    key = %self.table_key,
                    version = saved.version,
                    "persisted layout has unknown version; using schema defaults"
                );
                Vec::new()
            }
            Err(error) => {
                tracing::warn!(
                    key = %self.table_key,
                    %error,
                    "persisted layout is corrupt; using schema defaults"
                );
                Vec::new()
            }
        }
    }

    /// Write-through persistence, fire-and-forget. Inside a tokio runtime
    /// the write happens on a blocking task so the caller never waits on
    /// storage; otherwise it happens inline. Failures are logged only.
    fn persist(&self) {
        let record = SavedLayout {
            version: LAYOUT_VERSION,
            columns: self.columns.clone(),
        };
        let blob = match serde_json::to_string(&record) {
            Ok(blob) => blob,
            Err(error) => {
                tracing::warn!(key = %self.table_key, %error, "layout serialization failed");
                return;
            }
        };

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let store = Arc::clone(&self.store);
            let key = self.table_key.clone();
            handle.spawn_blocking(move || {
                if let Err(error) = store.write(&key, &blob) {
                    tracing::warn!(%key, %error, "layout persist failed; session is in-memory only");
                }
            });
        } else if let Err(error) = self.store.write(&self.table_key, &blob) {
            tracing::warn!(key = %self.table_key, %error, "layout persist failed; session is in-memory only");
        }
    }
}
