//! Color tags and favorites.
//!
//! Plain key/value overlays merged into the frame at render time. Layout
//! and path finding never read them.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::schema::{ColumnRef, TableId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorTag {
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Purple,
    Gray,
}

impl ColorTag {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "red" => Some(Self::Red),
            "orange" => Some(Self::Orange),
            "yellow" => Some(Self::Yellow),
            "green" => Some(Self::Green),
            "blue" => Some(Self::Blue),
            "purple" => Some(Self::Purple),
            "gray" | "grey" => Some(Self::Gray),
            _ => None,
        }
    }

    pub fn hex(&self) -> &'static str {
        match self {
            Self::Red => "#ef4444",
            Self::Orange => "#f97316",
            Self::Yellow => "#eab308",
            Self::Green => "#22c55e",
            Self::Blue => "#3b82f6",
            Self::Purple => "#a855f7",
            Self::Gray => "#6b7280",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagOverlay {
    tables: BTreeMap<TableId, ColorTag>,
    columns: BTreeMap<ColumnRef, ColorTag>,
    favorites: BTreeSet<TableId>,
}

impl TagOverlay {
    pub fn table(&self, id: &TableId) -> Option<ColorTag> {
        self.tables.get(id).copied()
    }

    pub fn column(&self, column: &ColumnRef) -> Option<ColorTag> {
        self.columns.get(column).copied()
    }

    /// `None` removes the tag.
    pub fn set_table(&mut self, id: TableId, tag: Option<ColorTag>) {
        match tag {
            Some(tag) => {
                self.tables.insert(id, tag);
            }
            None => {
                self.tables.remove(&id);
            }
        }
    }

    pub fn set_column(&mut self, column: ColumnRef, tag: Option<ColorTag>) {
        match tag {
            Some(tag) => {
                self.columns.insert(column, tag);
            }
            None => {
                self.columns.remove(&column);
            }
        }
    }

    pub fn table_tags(&self) -> &BTreeMap<TableId, ColorTag> {
        &self.tables
    }

    pub fn column_tags(&self) -> &BTreeMap<ColumnRef, ColorTag> {
        &self.columns
    }

    /// Replace both tag maps at once; favorites are untouched.
    pub fn replace_tags(
        &mut self,
        tables: BTreeMap<TableId, ColorTag>,
        columns: BTreeMap<ColumnRef, ColorTag>,
    ) {
        self.tables = tables;
        self.columns = columns;
    }

    pub fn clear_tags(&mut self) {
        self.tables.clear();
        self.columns.clear();
    }

    /// Returns whether the table is a favorite afterwards.
    pub fn toggle_favorite(&mut self, id: TableId) -> bool {
        if self.favorites.remove(&id) {
            false
        } else {
            self.favorites.insert(id);
            true
        }
    }

    pub fn is_favorite(&self, id: &TableId) -> bool {
        self.favorites.contains(id)
    }
}
