//! Layout snapshot files: node positions plus color tags.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::interaction::{ColorTag, TagOverlay};
use crate::layout::Positions;
use crate::schema::{ColumnRef, TableId};

#[derive(Debug, Error)]
pub enum LayoutFileError {
    #[error("Invalid layout file: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("Failed to serialize layout: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("Invalid column key in layout file: {0}")]
    ColumnKey(String),
    #[error("Invalid position for {0}")]
    Position(TableId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSnapshot {
    #[serde(default)]
    pub schema_name: String,
    pub positions: Positions,
    #[serde(default)]
    pub table_colors: BTreeMap<TableId, ColorTag>,
    /// Keyed by `schema.table.column`.
    #[serde(default)]
    pub column_colors: BTreeMap<String, ColorTag>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl LayoutSnapshot {
    pub fn capture(
        schema_name: &str,
        positions: &Positions,
        tags: &TagOverlay,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            schema_name: schema_name.to_string(),
            positions: positions.clone(),
            table_colors: tags.table_tags().clone(),
            column_colors: tags
                .column_tags()
                .iter()
                .map(|(c, tag)| (c.key(), *tag))
                .collect(),
            timestamp: Some(timestamp),
        }
    }

    pub fn to_json(&self) -> Result<String, LayoutFileError> {
        serde_json::to_string_pretty(self).map_err(LayoutFileError::Serialize)
    }

    /// Parse and validate. Nothing in the returned snapshot needs further
    /// checking before it is applied.
    pub fn from_json(input: &str) -> Result<Self, LayoutFileError> {
        let snapshot: Self = serde_json::from_str(input).map_err(LayoutFileError::Parse)?;
        if let Some((id, _)) = snapshot
            .positions
            .iter()
            .find(|(_, p)| !p.x.is_finite() || !p.y.is_finite())
        {
            return Err(LayoutFileError::Position(id.clone()));
        }
        snapshot.column_tags()?;
        Ok(snapshot)
    }

    pub fn column_tags(&self) -> Result<BTreeMap<ColumnRef, ColorTag>, LayoutFileError> {
        self.column_colors
            .iter()
            .map(|(key, tag)| {
                ColumnRef::from_key(key)
                    .map(|c| (c, *tag))
                    .ok_or_else(|| LayoutFileError::ColumnKey(key.clone()))
            })
            .collect()
    }
}
