//! Table column configuration types.
//!
//! A [`ColumnDescriptor`] captures everything the layout engine persists
//! about one column: identity, ordering, visibility, the frozen-prefix flag,
//! and opaque presentation styles.

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Order value reserved for the synthetic row-action column so it always
/// sorts ahead of user-orderable columns.
pub const ACTION_COLUMN_ORDER: i32 = -1;

/// Derive a stable column id from its display name.
///
/// Lower-cases, strips diacritics (NFD decomposition with combining marks
/// removed), and collapses every non-alphanumeric run to a single `-`.
/// Stable across renders as long as the display name is unchanged; a renamed
/// header produces a new slug and is treated as a brand-new column.
#[must_use]
pub fn column_slug(name: &str) -> String {
    let stripped: String = name.nfd().filter(|c| !is_combining_mark(*c)).collect();

    let mut slug = String::with_capacity(stripped.len());
    let mut pending_separator = false;
    for c in stripped.chars() {
        if c.is_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            for lower in c.to_lowercase() {
                slug.push(lower);
            }
        } else {
            pending_separator = true;
        }
    }
    slug
}

/// Free-form presentation attributes. Opaque to the layout engine except
/// for shallow merging: an update only replaces the fields it sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnStyles {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
}

impl ColumnStyles {
    /// Shallow merge: fields set in `update` replace, unset fields keep
    /// their current value.
    pub fn apply(&mut self, update: &ColumnStyles) {
        if update.background.is_some() {
            self.background.clone_from(&update.background);
        }
        if update.color.is_some() {
            self.color.clone_from(&update.color);
        }
        if update.bold.is_some() {
            self.bold = update.bold;
        }
        if update.italic.is_some() {
            self.italic = update.italic;
        }
    }

    #[must_use]
    pub fn is_default(&self) -> bool {
        *self == ColumnStyles::default()
    }
}

/// One table column's full configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Stable identity, derived from the display name via [`column_slug`].
    pub id: String,
    /// Current display name.
    pub name: String,
    /// Position in the schema as supplied by the caller; used to restore
    /// default ordering.
    pub original_index: usize,
    pub visible: bool,
    /// Sort key for the visible set. The synthetic row-action column is
    /// pinned at [`ACTION_COLUMN_ORDER`].
    pub order: i32,
    /// Whether the column is frozen during horizontal scrolling. Fixed
    /// columns must form a contiguous prefix of the sorted visible order.
    pub is_fixed: bool,
    /// True for the synthetic row-action column.
    #[serde(default)]
    pub is_action: bool,
    #[serde(default, skip_serializing_if = "ColumnStyles::is_default")]
    pub styles: ColumnStyles,
}

impl ColumnDescriptor {
    /// Descriptor for a schema column at its default position.
    #[must_use]
    pub fn from_schema(name: &str, original_index: usize, order: i32) -> Self {
        Self {
            id: column_slug(name),
            name: name.to_string(),
            original_index,
            visible: true,
            order,
            is_fixed: false,
            is_action: false,
            styles: ColumnStyles::default(),
        }
    }

    /// Descriptor for the synthetic row-action column.
    #[must_use]
    pub fn action(name: &str, original_index: usize) -> Self {
        Self {
            id: column_slug(name),
            name: name.to_string(),
            original_index,
            visible: true,
            order: ACTION_COLUMN_ORDER,
            is_fixed: false,
            is_action: true,
            styles: ColumnStyles::default(),
        }
    }
}
