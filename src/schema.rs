//! Schema data model: tables, columns and their identifiers.
//!
//! Tables are immutable once loaded. The schema keeps them in the order the
//! introspection source supplied, which is the order the layout engine packs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Invalid schema JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Duplicate table: {0}")]
    DuplicateTable(TableId),
}

/// Qualified table identifier, `schema.name`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableId(String);

impl TableId {
    pub fn new(schema: &str, name: &str) -> Self {
        Self(format!("{}.{}", schema, name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TableId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::borrow::Borrow<str> for TableId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A column on a specific table, used by hover, selection and tagging.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table: TableId,
    pub column: String,
}

impl ColumnRef {
    pub fn new(table: TableId, column: impl Into<String>) -> Self {
        Self {
            table,
            column: column.into(),
        }
    }

    /// Flat `schema.table.column` key used in exported layout files.
    pub fn key(&self) -> String {
        format!("{}.{}", self.table, self.column)
    }

    /// Inverse of [`ColumnRef::key`]; the column is the last segment.
    pub fn from_key(key: &str) -> Option<Self> {
        let (table, column) = key.rsplit_once('.')?;
        if table.is_empty() || column.is_empty() {
            return None;
        }
        Some(Self::new(TableId::from(table), column))
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    #[serde(rename = "type", default)]
    pub typ: String,
    #[serde(default)]
    pub is_primary_key: bool,
    #[serde(default)]
    pub is_foreign_key: bool,
    /// Dotted `[schema.]table.column`, or a bare column on the same table.
    #[serde(default)]
    pub references: Option<String>,
}

impl Column {
    pub fn new(name: &str, typ: &str) -> Self {
        Self {
            name: name.to_string(),
            typ: typ.to_string(),
            is_primary_key: false,
            is_foreign_key: false,
            references: None,
        }
    }

    pub fn pk(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    pub fn fk(mut self, references: &str) -> Self {
        self.is_foreign_key = true;
        self.references = Some(references.to_string());
        self
    }

    pub fn is_key(&self) -> bool {
        self.is_primary_key || self.is_foreign_key
    }
}

fn default_schema() -> String {
    "public".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    #[serde(default = "default_schema")]
    pub schema: String,
    pub name: String,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Table {
    pub fn new(schema: &str, name: &str, columns: Vec<Column>) -> Self {
        Self {
            schema: schema.to_string(),
            name: name.to_string(),
            columns,
            description: None,
        }
    }

    pub fn id(&self) -> TableId {
        TableId::new(&self.schema, &self.name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

/// An ordered, read-only set of tables with an id index.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    name: String,
    tables: Vec<Table>,
    index: HashMap<TableId, usize>,
}

#[derive(Deserialize)]
struct SchemaFile {
    #[serde(default)]
    name: String,
    tables: Vec<Table>,
}

impl Schema {
    pub fn new(name: &str, tables: Vec<Table>) -> Result<Self, SchemaError> {
        let mut index = HashMap::with_capacity(tables.len());
        for (i, table) in tables.iter().enumerate() {
            let id = table.id();
            if index.insert(id.clone(), i).is_some() {
                return Err(SchemaError::DuplicateTable(id));
            }
        }
        Ok(Self {
            name: name.to_string(),
            tables,
            index,
        })
    }

    pub fn from_json(input: &str) -> Result<Self, SchemaError> {
        let file: SchemaFile = serde_json::from_str(input)?;
        Self::new(&file.name, file.tables)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn table(&self, id: &str) -> Option<&Table> {
        self.index.get(id).map(|&i| &self.tables[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_defaults() {
        let input = r#"{
            "name": "shop",
            "tables": [
                { "name": "users", "columns": [
                    { "name": "id", "type": "integer", "isPrimaryKey": true }
                ]},
                { "schema": "sales", "name": "orders", "columns": [
                    { "name": "id", "type": "integer", "isPrimaryKey": true },
                    { "name": "user_id", "type": "integer", "isForeignKey": true,
                      "references": "public.users.id" }
                ]}
            ]
        }"#;
        let schema = Schema::from_json(input).unwrap();

        assert_eq!(schema.name(), "shop");
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.tables()[0].id().as_str(), "public.users");
        let orders = schema.table("sales.orders").unwrap();
        assert!(orders.columns[1].is_foreign_key);
        assert!(!orders.columns[1].is_primary_key);
        assert_eq!(orders.column_index("user_id"), Some(1));
    }

    #[test]
    fn test_duplicate_table_rejected() {
        let tables = vec![
            Table::new("public", "a", vec![]),
            Table::new("public", "a", vec![]),
        ];
        let err = Schema::new("dup", tables).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateTable(id) if id.as_str() == "public.a"));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            Schema::from_json("{ not json"),
            Err(SchemaError::Json(_))
        ));
    }

    #[test]
    fn test_column_key_roundtrip() {
        let col = ColumnRef::new(TableId::new("public", "users"), "email");
        assert_eq!(col.key(), "public.users.email");
        assert_eq!(ColumnRef::from_key(&col.key()), Some(col));
        assert_eq!(ColumnRef::from_key("nodot"), None);
    }
}
