//! Two-slot column selection handed to the relation collaborators.

use thiserror::Error;

use crate::graph::VirtualRelation;
use crate::schema::{ColumnRef, TableId};

#[derive(Debug, Error, PartialEq)]
pub enum RelationError {
    #[error("Select two columns before creating a relation")]
    IncompleteSelection,
    #[error("Unknown column: {0}")]
    UnknownColumn(ColumnRef),
    #[error("Both columns belong to {0}")]
    SameTable(TableId),
    #[error("Relation between {0} and {1} already exists")]
    Duplicate(ColumnRef, ColumnRef),
    #[error("Columns do not intersect: {0}")]
    Rejected(String),
    #[error("Failed to register relation: {0}")]
    Registration(String),
}

/// Checks whether two columns actually share values.
pub trait IntersectionValidator {
    fn validate(&mut self, first: &ColumnRef, second: &ColumnRef) -> Result<(), String>;
}

/// Persists a user-confirmed relation somewhere outside the diagram.
pub trait RelationRegistrar {
    fn register(&mut self, relation: &VirtualRelation) -> Result<(), String>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionPair {
    first: Option<ColumnRef>,
    second: Option<ColumnRef>,
}

impl SelectionPair {
    pub fn first(&self) -> Option<&ColumnRef> {
        self.first.as_ref()
    }

    pub fn second(&self) -> Option<&ColumnRef> {
        self.second.as_ref()
    }

    pub fn contains(&self, column: &ColumnRef) -> bool {
        self.first.as_ref() == Some(column) || self.second.as_ref() == Some(column)
    }

    /// Clicking a selected column clears it; otherwise the column fills the
    /// next slot, and when both are taken the oldest is shifted out.
    /// `first` is always the older entry.
    pub fn toggle(&mut self, column: ColumnRef) {
        if self.first.as_ref() == Some(&column) {
            self.first = self.second.take();
        } else if self.second.as_ref() == Some(&column) {
            self.second = None;
        } else if self.first.is_none() {
            self.first = Some(column);
        } else if self.second.is_none() {
            self.second = Some(column);
        } else {
            self.first = self.second.take();
            self.second = Some(column);
        }
    }

    pub fn complete(&self) -> Option<(&ColumnRef, &ColumnRef)> {
        Some((self.first.as_ref()?, self.second.as_ref()?))
    }

    pub fn clear(&mut self) {
        self.first = None;
        self.second = None;
    }

    pub fn is_empty(&self) -> bool {
        self.first.is_none() && self.second.is_none()
    }

    pub fn to_relation(&self) -> Option<VirtualRelation> {
        let (a, b) = self.complete()?;
        Some(VirtualRelation {
            table_a: a.table.clone(),
            column_a: a.column.clone(),
            table_b: b.table.clone(),
            column_b: b.column.clone(),
        })
    }
}
