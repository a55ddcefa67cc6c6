//! Relationship graph built from foreign-key declarations.
//!
//! The undirected adjacency answers connectivity questions (neighbors,
//! paths); the directed foreign-key list is what the edge router draws.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::schema::{ColumnRef, Schema, Table, TableId};

/// A relationship confirmed by the user that the schema does not declare.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualRelation {
    pub table_a: TableId,
    pub column_a: String,
    pub table_b: TableId,
    pub column_b: String,
}

/// Directed foreign key: `source.source_column -> target.target_column`.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    pub source: TableId,
    pub source_column: String,
    pub source_index: usize,
    pub target: TableId,
    pub target_column: String,
    /// `None` when the referenced column does not exist on the target.
    pub target_index: Option<usize>,
    pub is_virtual: bool,
}

impl ForeignKey {
    pub fn touches(&self, table: &str) -> bool {
        self.source.as_str() == table || self.target.as_str() == table
    }

    pub fn connects(&self, a: &str, b: &str) -> bool {
        (self.source.as_str() == a && self.target.as_str() == b)
            || (self.source.as_str() == b && self.target.as_str() == a)
    }

    /// Whether this edge already links exactly these two columns, either way.
    pub fn joins(&self, a: &ColumnRef, b: &ColumnRef) -> bool {
        let ends = |x: &ColumnRef, y: &ColumnRef| {
            self.source == x.table
                && self.source_column == x.column
                && self.target == y.table
                && self.target_column == y.column
        };
        ends(a, b) || ends(b, a)
    }
}

/// Index into [`RelationshipGraph::edges`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeKey(pub usize);

#[derive(Debug, Clone, Default)]
pub struct RelationshipGraph {
    adjacency: BTreeMap<TableId, BTreeSet<TableId>>,
    edges: Vec<ForeignKey>,
}

impl RelationshipGraph {
    pub fn build(schema: &Schema, virtual_relations: &[VirtualRelation]) -> Self {
        let mut graph = RelationshipGraph::default();
        for table in schema.tables() {
            graph.adjacency.entry(table.id()).or_default();
        }

        let mut dropped = 0usize;
        for table in schema.tables() {
            let source = table.id();
            for (source_index, column) in table.columns.iter().enumerate() {
                let Some(reference) = column.references.as_deref() else {
                    continue;
                };
                let Some((target, target_column)) = resolve_reference(table, reference) else {
                    dropped += 1;
                    continue;
                };
                let Some(target_table) = schema.table(target.as_str()) else {
                    debug!(%source, reference, "dropping dangling foreign key");
                    dropped += 1;
                    continue;
                };
                let target_index = target_table.column_index(&target_column);
                graph.push_edge(ForeignKey {
                    source: source.clone(),
                    source_column: column.name.clone(),
                    source_index,
                    target,
                    target_column,
                    target_index,
                    is_virtual: false,
                });
            }
        }

        for relation in virtual_relations {
            let (Some(a), Some(b)) = (
                schema.table(relation.table_a.as_str()),
                schema.table(relation.table_b.as_str()),
            ) else {
                dropped += 1;
                continue;
            };
            let Some(source_index) = a.column_index(&relation.column_a) else {
                dropped += 1;
                continue;
            };
            graph.push_edge(ForeignKey {
                source: relation.table_a.clone(),
                source_column: relation.column_a.clone(),
                source_index,
                target: relation.table_b.clone(),
                target_column: relation.column_b.clone(),
                target_index: b.column_index(&relation.column_b),
                is_virtual: true,
            });
        }

        debug!(
            tables = graph.adjacency.len(),
            edges = graph.edges.len(),
            dropped,
            "built relationship graph"
        );
        graph
    }

    fn push_edge(&mut self, edge: ForeignKey) {
        if edge.source != edge.target {
            self.adjacency
                .entry(edge.source.clone())
                .or_default()
                .insert(edge.target.clone());
            self.adjacency
                .entry(edge.target.clone())
                .or_default()
                .insert(edge.source.clone());
        }
        self.edges.push(edge);
    }

    pub fn contains(&self, table: &str) -> bool {
        self.adjacency.contains_key(table)
    }

    /// Tables sharing at least one foreign key with `table`, in id order.
    pub fn neighbors(&self, table: &str) -> Option<&BTreeSet<TableId>> {
        self.adjacency.get(table)
    }

    pub fn edges(&self) -> &[ForeignKey] {
        &self.edges
    }

    pub fn edge(&self, key: EdgeKey) -> Option<&ForeignKey> {
        self.edges.get(key.0)
    }

    pub fn edges_touching<'a>(
        &'a self,
        table: &'a str,
    ) -> impl Iterator<Item = (EdgeKey, &'a ForeignKey)> + 'a {
        self.edges
            .iter()
            .enumerate()
            .filter(move |(_, e)| e.touches(table))
            .map(|(i, e)| (EdgeKey(i), e))
    }
}

/// Resolve a dotted reference relative to the referencing table.
///
/// `col` names a column on the same table, `table.col` defaults the schema
/// to the referencing table's, `schema.table.col` is fully qualified.
pub fn resolve_reference(from: &Table, reference: &str) -> Option<(TableId, String)> {
    parse_reference(from, reference).map(|target| (target.table_id(), target.column))
}

/// Target of a foreign key with its schema and table kept apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceTarget {
    pub schema: String,
    pub table: String,
    pub column: String,
}

impl ReferenceTarget {
    pub fn table_id(&self) -> TableId {
        TableId::new(&self.schema, &self.table)
    }
}

pub fn parse_reference(from: &Table, reference: &str) -> Option<ReferenceTarget> {
    let parts: Vec<&str> = reference.trim().split('.').map(str::trim).collect();
    if parts.iter().any(|p| p.is_empty()) {
        return None;
    }
    let (schema, table, column) = match parts.as_slice() {
        [column] => (from.schema.as_str(), from.name.as_str(), *column),
        [table, column] => (from.schema.as_str(), *table, *column),
        [schema, table, column] => (*schema, *table, *column),
        _ => return None,
    };
    Some(ReferenceTarget {
        schema: schema.to_string(),
        table: table.to_string(),
        column: column.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Column;

    fn abc_schema() -> Schema {
        Schema::new(
            "abc",
            vec![
                Table::new("public", "A", vec![Column::new("id", "int").pk()]),
                Table::new(
                    "public",
                    "B",
                    vec![Column::new("id", "int").pk(), Column::new("a_id", "int").fk("A.id")],
                ),
                Table::new(
                    "public",
                    "C",
                    vec![Column::new("id", "int").pk(), Column::new("b_id", "int").fk("B.id")],
                ),
            ],
        )
        .unwrap()
    }

    fn ids(set: &BTreeSet<TableId>) -> Vec<&str> {
        set.iter().map(|t| t.as_str()).collect()
    }

    #[test]
    fn test_adjacency_is_undirected() {
        let graph = RelationshipGraph::build(&abc_schema(), &[]);

        assert_eq!(ids(graph.neighbors("public.A").unwrap()), vec!["public.B"]);
        assert_eq!(
            ids(graph.neighbors("public.B").unwrap()),
            vec!["public.A", "public.C"]
        );
        assert_eq!(ids(graph.neighbors("public.C").unwrap()), vec!["public.B"]);
        assert_eq!(graph.edges().len(), 2);
        assert_eq!(graph.edges()[0].source.as_str(), "public.B");
        assert_eq!(graph.edges()[0].target_index, Some(0));
    }

    #[test]
    fn test_resolve_reference_segments() {
        let t = Table::new("sales", "orders", vec![]);
        assert_eq!(
            resolve_reference(&t, "parent_id"),
            Some((TableId::from("sales.orders"), "parent_id".to_string()))
        );
        assert_eq!(
            resolve_reference(&t, "users.id"),
            Some((TableId::from("sales.users"), "id".to_string()))
        );
        assert_eq!(
            resolve_reference(&t, "auth.users.id"),
            Some((TableId::from("auth.users"), "id".to_string()))
        );
        assert_eq!(resolve_reference(&t, "a.b.c.d"), None);
        assert_eq!(resolve_reference(&t, "users..id"), None);
        assert_eq!(resolve_reference(&t, ""), None);
    }

    #[test]
    fn test_dangling_reference_dropped() {
        let schema = Schema::new(
            "d",
            vec![Table::new(
                "public",
                "orders",
                vec![Column::new("ghost_id", "int").fk("ghosts.id")],
            )],
        )
        .unwrap();
        let graph = RelationshipGraph::build(&schema, &[]);

        assert!(graph.edges().is_empty());
        assert!(graph.neighbors("public.orders").unwrap().is_empty());
    }

    #[test]
    fn test_self_reference_kept_as_edge_not_adjacency() {
        let schema = Schema::new(
            "s",
            vec![Table::new(
                "public",
                "employees",
                vec![
                    Column::new("id", "int").pk(),
                    Column::new("manager_id", "int").fk("id"),
                ],
            )],
        )
        .unwrap();
        let graph = RelationshipGraph::build(&schema, &[]);

        assert_eq!(graph.edges().len(), 1);
        assert!(graph.neighbors("public.employees").unwrap().is_empty());
    }

    #[test]
    fn test_virtual_relation_joins_graph() {
        let schema = abc_schema();
        let relation = VirtualRelation {
            table_a: TableId::from("public.A"),
            column_a: "id".to_string(),
            table_b: TableId::from("public.C"),
            column_b: "id".to_string(),
        };
        let graph = RelationshipGraph::build(&schema, &[relation]);

        assert!(graph.neighbors("public.A").unwrap().contains("public.C"));
        assert!(graph.edges().last().unwrap().is_virtual);
        assert_eq!(graph.edges_touching("public.C").count(), 2);
    }
}
