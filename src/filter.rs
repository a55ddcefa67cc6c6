//! Search term and color-tag filtering of the active table set.

use crate::interaction::{ColorTag, TagOverlay};
use crate::schema::{ColumnRef, Schema, Table};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    /// Case-insensitive substring matched against table ids, names and
    /// column names.
    pub search: String,
    pub tag: Option<ColorTag>,
    pub favorites_only: bool,
}

impl Filter {
    pub fn is_empty(&self) -> bool {
        self.search.trim().is_empty() && self.tag.is_none() && !self.favorites_only
    }

    pub fn matches(&self, table: &Table, tags: &TagOverlay) -> bool {
        let id = table.id();
        let term = self.search.trim().to_lowercase();
        if !term.is_empty() {
            let hit = id.as_str().to_lowercase().contains(&term)
                || table
                    .columns
                    .iter()
                    .any(|c| c.name.to_lowercase().contains(&term));
            if !hit {
                return false;
            }
        }
        if let Some(tag) = self.tag {
            let tagged = tags.table(&id) == Some(tag)
                || table
                    .columns
                    .iter()
                    .any(|c| tags.column(&ColumnRef::new(id.clone(), &c.name)) == Some(tag));
            if !tagged {
                return false;
            }
        }
        if self.favorites_only && !tags.is_favorite(&id) {
            return false;
        }
        true
    }

    /// Matching tables in schema order.
    pub fn apply<'a>(&self, schema: &'a Schema, tags: &TagOverlay) -> Vec<&'a Table> {
        schema
            .tables()
            .iter()
            .filter(|t| self.matches(t, tags))
            .collect()
    }
}
