//! The engine facade.
//!
//! [`Diagram`] owns the loaded schema, the relationship graph and the
//! interaction controller. Input goes through it so it can hit test and
//! re-run layout when the active filter changes; output is a
//! [`RenderFrame`] of plain data that any renderer can draw.

use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::ddl;
use crate::graph::{EdgeKey, RelationshipGraph, VirtualRelation};
use crate::interaction::{
    ColorTag, ContextMenu, Controller, DiagramEvent, HitTarget, InteractionState,
    IntersectionValidator, Key, Millis, PathPick, PointerButton, RelationError, RelationRegistrar,
};
use crate::layout::{self, LayoutEngine, Positions};
use crate::minimap::MinimapFrame;
use crate::pathfind::{path_edges, shortest_path};
use crate::persist::{LayoutFileError, LayoutSnapshot};
use crate::routing::{route, Anchor, EdgePath};
use crate::schema::{ColumnRef, Schema, TableId};
use crate::svg::SvgRenderer;
use crate::viewport::{Point, Rect, Size, Viewport};
use crate::visibility::{
    self, detail_tier, displayed_rows, edge_budget_exceeded, DetailTier, Focus, VisibilityInput,
    VisibleNode,
};

/// Attribute marking elements an image export must leave out.
pub const EXPORT_IGNORE_ATTR: &str = "data-export-ignore";

#[derive(Debug, Error, PartialEq)]
pub enum ExportError {
    #[error("Image export failed: {0}")]
    Rasterize(String),
}

/// Turns rendered SVG into an image file somewhere outside the engine.
pub trait ImageExporter {
    fn export(&mut self, svg: &str, ignore_attribute: &str) -> Result<(), String>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoutedEdge {
    pub key: EdgeKey,
    pub source: TableId,
    pub target: TableId,
    pub path: EdgePath,
    pub is_virtual: bool,
    /// Touches the hovered node or column.
    pub highlighted: bool,
    pub selected: bool,
    pub on_path: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PathStatus {
    Inactive,
    PickStart,
    PickEnd { start: TableId },
    Found(Vec<TableId>),
    NoConnection { start: TableId, end: TableId },
}

impl PathStatus {
    pub fn tables(&self) -> &[TableId] {
        match self {
            Self::Found(path) => path,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnView {
    pub index: usize,
    pub name: String,
    pub typ: String,
    pub is_primary_key: bool,
    pub is_foreign_key: bool,
    pub tag: Option<ColorTag>,
    pub selected: bool,
    pub hovered: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeView {
    pub node: VisibleNode,
    pub schema: String,
    pub name: String,
    pub columns: Vec<ColumnView>,
    /// Columns the node has but does not show at its tier.
    pub hidden_columns: usize,
    pub tag: Option<ColorTag>,
    pub favorite: bool,
    pub hovered: bool,
    /// Neighbor of the focused node.
    pub related: bool,
    pub on_path: bool,
}

/// Everything a renderer needs for one frame. World coordinates throughout
/// except the minimap, which is in its own pixel space.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrame {
    pub viewport: Viewport,
    pub screen: Size,
    pub interacting: bool,
    /// Nodes in draw order; magnified nodes come last.
    pub nodes: Vec<NodeView>,
    pub edges: Vec<RoutedEdge>,
    pub edges_skipped: bool,
    pub path: PathStatus,
    pub minimap: Option<MinimapFrame>,
    pub context_menu: Option<ContextMenu>,
}

pub struct Diagram {
    config: EngineConfig,
    schema: Schema,
    graph: RelationshipGraph,
    virtual_relations: Vec<VirtualRelation>,
    engine: LayoutEngine,
    controller: Controller,
}

impl Diagram {
    pub fn new(schema: Schema, config: EngineConfig) -> Self {
        let graph = RelationshipGraph::build(&schema, &[]);
        let engine = LayoutEngine::new(config.layout.clone(), config.node.clone());
        let controller = Controller::new(config.interaction.clone(), config.viewport.clone());
        let mut diagram = Self {
            config,
            schema,
            graph,
            virtual_relations: Vec::new(),
            engine,
            controller,
        };
        diagram.relayout();
        info!(
            schema = diagram.schema.name(),
            tables = diagram.schema.len(),
            edges = diagram.graph.edges().len(),
            "opened diagram"
        );
        diagram
    }

    /// Include relations registered in an earlier session.
    pub fn with_virtual_relations(mut self, relations: Vec<VirtualRelation>) -> Self {
        self.virtual_relations = relations;
        self.rebuild_graph();
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn graph(&self) -> &RelationshipGraph {
        &self.graph
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn positions(&self) -> &Positions {
        self.controller.positions()
    }

    pub fn virtual_relations(&self) -> &[VirtualRelation] {
        &self.virtual_relations
    }

    pub fn take_events(&mut self) -> Vec<DiagramEvent> {
        self.controller.take_events()
    }

    fn rebuild_graph(&mut self) {
        self.graph = RelationshipGraph::build(&self.schema, &self.virtual_relations);
    }

    fn relayout(&mut self) {
        let tables = self
            .controller
            .filter()
            .apply(&self.schema, self.controller.tags());
        let positions = self.engine.layout(&tables);
        debug!(
            laid_out = positions.len(),
            total = self.schema.len(),
            "relayout after filter change"
        );
        self.controller.replace_positions(positions);
    }

    fn filter_reads_tags(&self) -> bool {
        let filter = self.controller.filter();
        filter.tag.is_some() || filter.favorites_only
    }

    /// Close and reopen: defaults for viewport and overlays, fresh layout.
    pub fn reset(&mut self) {
        self.controller.reset();
        self.relayout();
    }

    pub fn resize(&mut self, screen: Size) {
        self.controller.resize(screen);
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub fn visible_nodes(&self, now: Millis) -> Vec<VisibleNode> {
        let focus = self.controller.focus();
        let input = VisibilityInput {
            schema: &self.schema,
            positions: self.controller.positions(),
            viewport: self.controller.viewport(),
            screen: self.controller.screen(),
            focus: &focus,
            interacting: self.controller.is_interacting(now),
        };
        visibility::visible_nodes(&input, &self.config.node, &self.config.lod)
    }

    /// Route every edge with at least one visible endpoint. Empty when the
    /// edge budget is exceeded and nothing is focused.
    pub fn edges_for(&self, visible: &[VisibleNode], now: Millis) -> Vec<RoutedEdge> {
        let focus = self.controller.focus();
        if edge_budget_exceeded(visible.len(), &focus, &self.config.lod) {
            debug!(visible = visible.len(), "edge budget exceeded, skipping edges");
            return Vec::new();
        }

        let by_id: HashMap<&TableId, &VisibleNode> = visible.iter().map(|n| (&n.id, n)).collect();
        let tier = detail_tier(
            self.controller.viewport().scale(),
            false,
            self.controller.is_interacting(now),
            &self.config.lod,
        );
        let path = self.current_path();
        let path_pairs: Vec<(&TableId, &TableId)> = path_edges(&path).collect();

        self.graph
            .edges()
            .iter()
            .enumerate()
            .filter_map(|(i, fk)| {
                let source_node = by_id.get(&fk.source).copied();
                let target_node = by_id.get(&fk.target).copied();
                if source_node.is_none() && target_node.is_none() {
                    return None;
                }
                let source = self.anchor(&fk.source, Some(fk.source_index), source_node, tier)?;
                let target = self.anchor(&fk.target, fk.target_index, target_node, tier)?;
                let key = EdgeKey(i);

                let touches_node = focus.node.as_ref().is_some_and(|n| fk.touches(n.as_str()));
                let touches_column = focus.column.as_ref().is_some_and(|c| {
                    (c.table == fk.source && c.column == fk.source_column)
                        || (c.table == fk.target && c.column == fk.target_column)
                });
                Some(RoutedEdge {
                    key,
                    source: fk.source.clone(),
                    target: fk.target.clone(),
                    path: route(&source, &target, tier, &self.config.router),
                    is_virtual: fk.is_virtual,
                    highlighted: touches_node || touches_column,
                    selected: self.controller.selected_relationship() == Some(key),
                    on_path: path_pairs
                        .iter()
                        .any(|(a, b)| fk.connects(a.as_str(), b.as_str())),
                })
            })
            .collect()
    }

    /// Visible endpoints anchor on their own rows; off-screen endpoints use
    /// the rows of the global tier.
    fn anchor(
        &self,
        id: &TableId,
        column: Option<usize>,
        visible: Option<&VisibleNode>,
        tier: DetailTier,
    ) -> Option<Anchor> {
        let metrics = &self.config.node;
        if let Some(node) = visible {
            let row = column.and_then(|i| node.row_of(i));
            return Some(Anchor::at_row(node.rect, row, metrics));
        }
        let pos = self.controller.positions().get(id)?;
        let table = self.schema.table(id.as_str())?;
        let rows = displayed_rows(table, tier, metrics.column_cap);
        let rect = Rect::new(pos.x, pos.y, metrics.width, metrics.height_for_rows(rows.len()));
        let row = column.and_then(|i| rows.iter().position(|&r| r == i));
        Some(Anchor::at_row(rect, row, metrics))
    }

    pub fn hit_test(&self, at: Point, now: Millis) -> HitTarget {
        let world = self.controller.viewport().screen_to_world(at);
        let visible = self.visible_nodes(now);
        if let Some(target) = self.hit_node(&visible, world) {
            return target;
        }
        self.edges_for(&visible, now)
            .iter()
            .rev()
            .find(|e| e.path.hits(world, &self.config.router))
            .map(|e| HitTarget::Edge(e.key))
            .unwrap_or(HitTarget::Canvas)
    }

    fn hit_node(&self, visible: &[VisibleNode], world: Point) -> Option<HitTarget> {
        let metrics = &self.config.node;
        // Popped nodes draw on top, so they take the hit first
        let popped = visible.iter().rev().filter(|n| n.magnification != 1.0);
        let flat = visible.iter().rev().filter(|n| n.magnification == 1.0);
        let node = popped
            .chain(flat)
            .find(|n| n.rect.contains(n.unmagnify(world)))?;
        let local = node.unmagnify(world);
        let offset = local.y - node.rect.y - metrics.header_height;
        if offset < 0.0 {
            return Some(HitTarget::Node(node.id.clone()));
        }
        let slot = (offset / metrics.row_height) as usize;
        let column = node
            .rows
            .get(slot)
            .and_then(|&i| self.schema.table(node.id.as_str())?.columns.get(i));
        Some(match column {
            Some(c) => HitTarget::Column(ColumnRef::new(node.id.clone(), &c.name)),
            None => HitTarget::Node(node.id.clone()),
        })
    }

    pub fn shortest_path(&self, start: &str, end: &str) -> Vec<TableId> {
        shortest_path(&self.graph, start, end)
    }

    /// Path between the picked endpoints, empty until both are set.
    pub fn current_path(&self) -> Vec<TableId> {
        match self.controller.path_pick().and_then(PathPick::endpoints) {
            Some((start, end)) => self.shortest_path(start.as_str(), end.as_str()),
            None => Vec::new(),
        }
    }

    pub fn path_status(&self) -> PathStatus {
        let Some(pick) = self.controller.path_pick() else {
            return PathStatus::Inactive;
        };
        match (&pick.start, &pick.end) {
            (None, _) => PathStatus::PickStart,
            (Some(start), None) => PathStatus::PickEnd {
                start: start.clone(),
            },
            (Some(start), Some(end)) => {
                let path = self.shortest_path(start.as_str(), end.as_str());
                if path.is_empty() {
                    PathStatus::NoConnection {
                        start: start.clone(),
                        end: end.clone(),
                    }
                } else {
                    PathStatus::Found(path)
                }
            }
        }
    }

    fn full_rect(&self, id: &TableId) -> Option<Rect> {
        let metrics = &self.config.node;
        let pos = self.controller.positions().get(id)?;
        let table = self.schema.table(id.as_str())?;
        Some(Rect::new(
            pos.x,
            pos.y,
            metrics.width,
            metrics.full_height(table.columns.len()),
        ))
    }

    pub fn content_bounds(&self) -> Option<Rect> {
        let metrics = &self.config.node;
        layout::content_bounds(
            self.controller.positions(),
            |id| {
                self.schema
                    .table(id.as_str())
                    .map(|t| metrics.full_height(t.columns.len()))
            },
            metrics.width,
        )
    }

    pub fn minimap(&self) -> Option<MinimapFrame> {
        let nodes: Vec<(TableId, Rect)> = self
            .controller
            .positions()
            .keys()
            .filter_map(|id| Some((id.clone(), self.full_rect(id)?)))
            .collect();
        MinimapFrame::compute(
            &nodes,
            self.controller.viewport(),
            self.controller.screen(),
            &self.config.minimap,
        )
    }

    pub fn frame(&self, now: Millis) -> RenderFrame {
        let visible = self.visible_nodes(now);
        let focus = self.controller.focus();
        let edges_skipped = edge_budget_exceeded(visible.len(), &focus, &self.config.lod);
        let edges = self.edges_for(&visible, now);
        let path = self.path_status();

        let on_path: HashSet<&TableId> = path.tables().iter().collect();
        let related: BTreeSet<TableId> = focus
            .node
            .as_ref()
            .and_then(|n| self.graph.neighbors(n.as_str()))
            .cloned()
            .unwrap_or_default();
        let mut nodes: Vec<NodeView> = visible
            .into_iter()
            .filter_map(|node| self.node_view(node, &focus, &on_path, &related))
            .collect();
        nodes.sort_by_key(|n| n.node.magnification > 1.0);

        RenderFrame {
            viewport: *self.controller.viewport(),
            screen: self.controller.screen(),
            interacting: self.controller.is_interacting(now),
            nodes,
            edges,
            edges_skipped,
            path,
            minimap: self.minimap(),
            context_menu: self.controller.context_menu().cloned(),
        }
    }

    fn node_view(
        &self,
        node: VisibleNode,
        focus: &Focus,
        on_path: &HashSet<&TableId>,
        related: &BTreeSet<TableId>,
    ) -> Option<NodeView> {
        let table = self.schema.table(node.id.as_str())?;
        let tags = self.controller.tags();
        let selection = self.controller.selection();
        let columns: Vec<ColumnView> = node
            .rows
            .iter()
            .filter_map(|&index| {
                let column = table.columns.get(index)?;
                let key = ColumnRef::new(node.id.clone(), &column.name);
                Some(ColumnView {
                    index,
                    name: column.name.clone(),
                    typ: column.typ.clone(),
                    is_primary_key: column.is_primary_key,
                    is_foreign_key: column.is_foreign_key,
                    tag: tags.column(&key),
                    selected: selection.contains(&key),
                    hovered: focus.column.as_ref() == Some(&key),
                })
            })
            .collect();

        Some(NodeView {
            schema: table.schema.clone(),
            name: table.name.clone(),
            hidden_columns: table.columns.len().saturating_sub(columns.len()),
            columns,
            tag: tags.table(&node.id),
            favorite: tags.is_favorite(&node.id),
            hovered: self.controller.hovered_node() == Some(&node.id),
            related: related.contains(&node.id),
            on_path: on_path.contains(&node.id),
            node,
        })
    }

    pub fn ddl(&self, table: &str) -> Option<String> {
        self.schema.table(table).map(ddl::create_table)
    }

    // =========================================================================
    // INPUT
    // =========================================================================

    pub fn pointer_down(&mut self, at: Point, button: PointerButton, now: Millis) {
        let target = self.hit_test(at, now);
        self.controller.pointer_down(target, at, button, now);
    }

    pub fn pointer_move(&mut self, at: Point, now: Millis) {
        let gesture = matches!(
            self.controller.state(),
            InteractionState::DraggingNode { .. } | InteractionState::PanningCanvas { .. }
        );
        let hover = if gesture {
            HitTarget::Canvas
        } else {
            self.hit_test(at, now)
        };
        self.controller.pointer_move(at, hover, now);
    }

    pub fn pointer_up(&mut self) {
        self.controller.pointer_up();
    }

    pub fn wheel(&mut self, at: Point, delta: f64, now: Millis) {
        self.controller.wheel(at, delta, now);
    }

    pub fn double_click(&mut self, at: Point, now: Millis) {
        let target = self.hit_test(at, now);
        self.controller.double_click(target);
    }

    pub fn key_down(&mut self, key: Key) -> bool {
        match key {
            Key::FitView => {
                self.fit_view();
                true
            }
            _ => self.controller.key_down(key),
        }
    }

    pub fn fit_view(&mut self) {
        if let Some(bounds) = self.content_bounds() {
            self.controller.fit_to(bounds);
        }
    }

    /// Center the view on the world point under a minimap click.
    pub fn navigate_minimap(&mut self, at: Point) -> bool {
        let Some(minimap) = self.minimap() else {
            return false;
        };
        self.controller.center_on(minimap.minimap_to_world(at));
        true
    }

    /// Center on a table and keep it at full detail.
    pub fn focus_table(&mut self, table: &str) -> bool {
        let id = TableId::from(table);
        let Some(rect) = self.full_rect(&id) else {
            return false;
        };
        self.controller.focus_table(id, rect.center());
        true
    }

    pub fn set_path_mode(&mut self, on: bool) {
        self.controller.set_path_mode(on);
    }

    // =========================================================================
    // FILTER
    // =========================================================================

    pub fn search_input(&mut self, text: &str, now: Millis) {
        self.controller.search_input(text, now);
    }

    /// Advance timers; re-runs layout when a debounced search lands.
    pub fn tick(&mut self, now: Millis) {
        if self.controller.tick(now) {
            self.relayout();
        }
    }

    pub fn flush_filter(&mut self) {
        if self.controller.flush_filter() {
            self.relayout();
        }
    }

    pub fn set_tag_filter(&mut self, tag: Option<ColorTag>) {
        if self.controller.set_tag_filter(tag) {
            self.relayout();
        }
    }

    pub fn set_favorites_only(&mut self, on: bool) {
        if self.controller.set_favorites_only(on) {
            self.relayout();
        }
    }

    pub fn clear_filter(&mut self) {
        if self.controller.clear_filter() {
            self.relayout();
        }
    }

    // =========================================================================
    // TAGS
    // =========================================================================

    pub fn tag_table(&mut self, table: &str, tag: Option<ColorTag>) {
        self.controller.tag_table(TableId::from(table), tag);
        if self.filter_reads_tags() {
            self.relayout();
        }
    }

    pub fn tag_column(&mut self, column: ColumnRef, tag: Option<ColorTag>) {
        self.controller.tag_column(column, tag);
        if self.filter_reads_tags() {
            self.relayout();
        }
    }

    pub fn clear_tags(&mut self) {
        self.controller.clear_tags();
        if self.filter_reads_tags() {
            self.relayout();
        }
    }

    pub fn toggle_favorite(&mut self, table: &str) -> bool {
        let favorite = self.controller.toggle_favorite(TableId::from(table));
        if self.filter_reads_tags() {
            self.relayout();
        }
        favorite
    }

    // =========================================================================
    // VIRTUAL RELATIONS
    // =========================================================================

    pub fn submit_selection(
        &mut self,
        validator: &mut dyn IntersectionValidator,
        registrar: &mut dyn RelationRegistrar,
    ) -> Result<VirtualRelation, RelationError> {
        let selection = self.controller.selection();
        for column in [selection.first(), selection.second()].into_iter().flatten() {
            let known = self
                .schema
                .table(column.table.as_str())
                .and_then(|t| t.column_index(&column.column))
                .is_some();
            if !known {
                return Err(RelationError::UnknownColumn(column.clone()));
            }
        }
        if let Some((first, second)) = selection.complete() {
            if first.table == second.table {
                return Err(RelationError::SameTable(first.table.clone()));
            }
            if self.graph.edges().iter().any(|fk| fk.joins(first, second)) {
                return Err(RelationError::Duplicate(first.clone(), second.clone()));
            }
        }
        let relation = self.controller.submit_selection(validator, registrar)?;
        self.add_virtual_relation(relation.clone());
        Ok(relation)
    }

    pub fn add_virtual_relation(&mut self, relation: VirtualRelation) {
        info!(
            from = %relation.table_a,
            to = %relation.table_b,
            "added virtual relation"
        );
        self.virtual_relations.push(relation);
        self.rebuild_graph();
    }

    // =========================================================================
    // EXPORT / IMPORT
    // =========================================================================

    pub fn export_layout(&self, timestamp: DateTime<Utc>) -> Result<String, LayoutFileError> {
        LayoutSnapshot::capture(
            self.schema.name(),
            self.controller.positions(),
            self.controller.tags(),
            timestamp,
        )
        .to_json()
    }

    /// Apply a layout file. The whole file is validated before anything
    /// changes. Returns how many positions were applied.
    pub fn import_layout(&mut self, input: &str) -> Result<usize, LayoutFileError> {
        let snapshot = LayoutSnapshot::from_json(input)?;
        let columns = snapshot.column_tags()?;
        if !snapshot.schema_name.is_empty() && snapshot.schema_name != self.schema.name() {
            warn!(
                file = %snapshot.schema_name,
                schema = self.schema.name(),
                "layout file was saved for a different schema"
            );
        }

        self.controller
            .tags_mut()
            .replace_tags(snapshot.table_colors, columns);
        if self.filter_reads_tags() {
            self.relayout();
        }
        let applied = self.controller.merge_positions(&snapshot.positions);
        info!(
            applied,
            skipped = snapshot.positions.len() - applied,
            "imported layout"
        );
        Ok(applied)
    }

    pub fn export_image(
        &self,
        exporter: &mut dyn ImageExporter,
        now: Millis,
    ) -> Result<(), ExportError> {
        let svg = SvgRenderer::from_config(&self.config).render(&self.frame(now));
        exporter
            .export(&svg, EXPORT_IGNORE_ATTR)
            .map_err(|e| {
                warn!(error = %e, "image export failed");
                ExportError::Rasterize(e)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, Table};

    fn shop() -> Schema {
        Schema::new(
            "shop",
            vec![
                Table::new(
                    "public",
                    "users",
                    vec![Column::new("id", "int").pk(), Column::new("email", "text")],
                ),
                Table::new(
                    "public",
                    "orders",
                    vec![
                        Column::new("id", "int").pk(),
                        Column::new("user_id", "int").fk("users.id"),
                    ],
                ),
                Table::new(
                    "public",
                    "items",
                    vec![
                        Column::new("id", "int").pk(),
                        Column::new("order_id", "int").fk("orders.id"),
                    ],
                ),
                Table::new("public", "lonely", vec![Column::new("id", "int").pk()]),
            ],
        )
        .unwrap()
    }

    fn diagram() -> Diagram {
        Diagram::new(shop(), EngineConfig::default())
    }

    fn id(s: &str) -> TableId {
        TableId::from(s)
    }

    struct Accept;
    impl IntersectionValidator for Accept {
        fn validate(&mut self, _: &ColumnRef, _: &ColumnRef) -> Result<(), String> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct Registry(Vec<VirtualRelation>);
    impl RelationRegistrar for Registry {
        fn register(&mut self, relation: &VirtualRelation) -> Result<(), String> {
            self.0.push(relation.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct Capture(Option<(String, String)>);
    impl ImageExporter for Capture {
        fn export(&mut self, svg: &str, ignore: &str) -> Result<(), String> {
            self.0 = Some((svg.to_string(), ignore.to_string()));
            Ok(())
        }
    }

    struct Broken;
    impl ImageExporter for Broken {
        fn export(&mut self, _: &str, _: &str) -> Result<(), String> {
            Err("disk full".to_string())
        }
    }

    #[test]
    fn test_initial_layout() {
        let d = diagram();
        let p = d.positions();
        assert_eq!(p.len(), 4);
        assert_eq!(p[&id("public.users")].point(), Point::new(40.0, 40.0));
        assert_eq!(p[&id("public.orders")].point(), Point::new(380.0, 40.0));
        assert_eq!(p[&id("public.items")].point(), Point::new(720.0, 40.0));
        assert_eq!(p[&id("public.lonely")].point(), Point::new(40.0, 216.0));
    }

    #[test]
    fn test_hit_test_header_column_edge_canvas() {
        let d = diagram();
        assert_eq!(d.hit_test(Point::new(50.0, 50.0), 0), HitTarget::Node(id("public.users")));
        assert_eq!(
            d.hit_test(Point::new(50.0, 115.0), 0),
            HitTarget::Column(ColumnRef::new(id("public.users"), "email"))
        );
        assert_eq!(d.hit_test(Point::new(340.0, 110.0), 0), HitTarget::Edge(EdgeKey(0)));
        assert_eq!(d.hit_test(Point::new(1000.0, 700.0), 0), HitTarget::Canvas);
    }

    #[test]
    fn test_hit_test_follows_popped_node() {
        let columns = (0..5).map(|i| Column::new(&format!("c{}", i), "int")).collect();
        let schema = Schema::new("pop", vec![Table::new("public", "users", columns)]).unwrap();
        let mut d = Diagram::new(schema, EngineConfig::default());
        // Zoom to 0.4 about the origin, then hover the header
        d.wheel(Point::new(0.0, 0.0), 600.0, 0);
        d.pointer_move(Point::new(20.0, 20.0), 5_000);
        let frame = d.frame(5_000);
        assert!((frame.nodes[0].node.magnification - 2.5).abs() < 1e-9);

        // Row c3 is drawn around world (170, 247) once the node pops
        let at = d.controller().viewport().world_to_screen(Point::new(170.0, 247.0));
        assert_eq!(
            d.hit_test(at, 5_000),
            HitTarget::Column(ColumnRef::new(id("public.users"), "c3"))
        );

        // Moving over the popped area keeps the hover
        d.pointer_move(at, 5_000);
        assert_eq!(d.controller().hovered_node(), Some(&id("public.users")));
    }

    #[test]
    fn test_debounced_search_relayouts() {
        let mut d = diagram();
        d.search_input("order", 0);
        d.tick(100);
        assert_eq!(d.positions().len(), 4);
        d.tick(300);

        let laid_out: Vec<&str> = d.positions().keys().map(|k| k.as_str()).collect();
        assert_eq!(laid_out, vec!["public.items", "public.orders"]);
        assert_eq!(d.positions()[&id("public.orders")].point(), Point::new(40.0, 40.0));
        assert_eq!(d.positions()[&id("public.items")].point(), Point::new(380.0, 40.0));
    }

    #[test]
    fn test_path_picking_through_clicks() {
        let mut d = diagram();
        d.set_path_mode(true);
        assert_eq!(d.path_status(), PathStatus::PickStart);

        d.pointer_down(Point::new(50.0, 230.0), PointerButton::Primary, 0);
        d.pointer_up();
        assert_eq!(d.path_status(), PathStatus::PickEnd { start: id("public.lonely") });
        d.pointer_down(Point::new(50.0, 50.0), PointerButton::Primary, 0);
        d.pointer_up();
        assert_eq!(
            d.path_status(),
            PathStatus::NoConnection {
                start: id("public.lonely"),
                end: id("public.users")
            }
        );

        d.pointer_down(Point::new(730.0, 50.0), PointerButton::Primary, 0);
        d.pointer_down(Point::new(50.0, 50.0), PointerButton::Primary, 0);
        assert_eq!(
            d.path_status(),
            PathStatus::Found(vec![id("public.items"), id("public.orders"), id("public.users")])
        );
        let frame = d.frame(0);
        assert!(frame.edges.iter().all(|e| e.on_path));
        assert_eq!(frame.nodes.iter().filter(|n| n.on_path).count(), 3);
    }

    #[test]
    fn test_edge_budget_and_focus() {
        let mut config = EngineConfig::default();
        config.lod.edge_budget = 1;
        let mut d = Diagram::new(shop(), config);

        let frame = d.frame(0);
        assert!(frame.edges_skipped);
        assert!(frame.edges.is_empty());

        d.pointer_move(Point::new(50.0, 50.0), 0);
        let frame = d.frame(0);
        assert!(!frame.edges_skipped);
        assert_eq!(frame.edges.len(), 2);
        assert!(frame.edges[0].highlighted);
        assert!(!frame.edges[1].highlighted);
    }

    #[test]
    fn test_edges_need_a_visible_endpoint() {
        let mut d = diagram();
        // Scroll far below every node
        d.controller.center_on(Point::new(170.0, 3000.0));
        d.controller.resize(Size::new(100.0, 100.0));
        let visible = d.visible_nodes(0);
        assert!(visible.is_empty());
        assert!(d.edges_for(&visible, 0).is_empty());
    }

    #[test]
    fn test_import_invalid_leaves_state() {
        let mut d = diagram();
        d.tag_table("public.users", Some(ColorTag::Red));
        let before = d.positions().clone();

        assert!(d.import_layout("not json").is_err());
        assert!(d.import_layout(r#"{ "schemaName": "shop" }"#).is_err());
        assert_eq!(d.positions(), &before);
        assert_eq!(d.controller().tags().table(&id("public.users")), Some(ColorTag::Red));
    }

    #[test]
    fn test_import_applies_known_tables_only() {
        let mut d = diagram();
        d.tag_table("public.users", Some(ColorTag::Red));
        let input = r#"{
            "schemaName": "other",
            "positions": {
                "public.users": { "x": 5.0, "y": 6.0 },
                "public.ghost": { "x": 1.0, "y": 1.0 }
            },
            "columnColors": { "public.orders.user_id": "green" }
        }"#;
        assert_eq!(d.import_layout(input).unwrap(), 1);
        assert_eq!(d.positions()[&id("public.users")].point(), Point::new(5.0, 6.0));
        assert!(!d.positions().contains_key(&id("public.ghost")));
        // Tag maps are replaced wholesale
        assert_eq!(d.controller().tags().table(&id("public.users")), None);
        assert_eq!(
            d.controller()
                .tags()
                .column(&ColumnRef::new(id("public.orders"), "user_id")),
            Some(ColorTag::Green)
        );
    }

    #[test]
    fn test_export_image() {
        let d = diagram();
        let mut capture = Capture::default();
        d.export_image(&mut capture, 0).unwrap();
        let (svg, ignore) = capture.0.unwrap();
        assert_eq!(ignore, EXPORT_IGNORE_ATTR);
        assert!(svg.contains(EXPORT_IGNORE_ATTR));

        assert_eq!(
            d.export_image(&mut Broken, 0),
            Err(ExportError::Rasterize("disk full".to_string()))
        );
    }

    #[test]
    fn test_virtual_relation_joins_graph() {
        let mut d = diagram();
        d.pointer_down(Point::new(50.0, 115.0), PointerButton::Primary, 0);
        d.pointer_down(Point::new(50.0, 270.0), PointerButton::Primary, 0);
        let mut registry = Registry::default();
        let relation = d.submit_selection(&mut Accept, &mut registry).unwrap();

        assert_eq!(relation.table_b, id("public.lonely"));
        assert!(d.graph().neighbors("public.lonely").unwrap().contains(&id("public.users")));
        assert!(d.graph().edges().last().unwrap().is_virtual);
        assert_eq!(d.shortest_path("public.lonely", "public.items").len(), 4);
    }

    #[test]
    fn test_selection_rejects_same_table_and_duplicates() {
        let mut d = diagram();
        let mut registry = Registry::default();

        // users.id and users.email
        d.pointer_down(Point::new(50.0, 90.0), PointerButton::Primary, 0);
        d.pointer_down(Point::new(50.0, 115.0), PointerButton::Primary, 0);
        assert_eq!(
            d.submit_selection(&mut Accept, &mut registry),
            Err(RelationError::SameTable(id("public.users")))
        );
        d.controller.clear_selection();

        // orders.user_id already references users.id
        d.pointer_down(Point::new(390.0, 115.0), PointerButton::Primary, 0);
        d.pointer_down(Point::new(50.0, 90.0), PointerButton::Primary, 0);
        assert!(matches!(
            d.submit_selection(&mut Accept, &mut registry),
            Err(RelationError::Duplicate(..))
        ));
        d.controller.clear_selection();

        // users.email with lonely.id, then the same pair reversed
        d.pointer_down(Point::new(50.0, 115.0), PointerButton::Primary, 0);
        d.pointer_down(Point::new(50.0, 270.0), PointerButton::Primary, 0);
        assert!(d.submit_selection(&mut Accept, &mut registry).is_ok());
        d.pointer_down(Point::new(50.0, 270.0), PointerButton::Primary, 0);
        d.pointer_down(Point::new(50.0, 115.0), PointerButton::Primary, 0);
        assert_eq!(
            d.submit_selection(&mut Accept, &mut registry),
            Err(RelationError::Duplicate(
                ColumnRef::new(id("public.lonely"), "id"),
                ColumnRef::new(id("public.users"), "email"),
            ))
        );
        assert_eq!(d.virtual_relations().len(), 1);
        assert_eq!(registry.0.len(), 1);
    }

    #[test]
    fn test_double_click_and_ddl() {
        let mut d = diagram();
        d.double_click(Point::new(400.0, 50.0), 0);
        assert_eq!(
            d.take_events(),
            vec![DiagramEvent::ViewSource { table: id("public.orders") }]
        );
        assert!(d.ddl("public.orders").unwrap().starts_with("CREATE TABLE public.orders"));
        assert!(d.ddl("public.nope").is_none());
    }

    #[test]
    fn test_fit_view_and_minimap_navigation() {
        let mut d = diagram();
        d.key_down(Key::FitView);
        let bounds = d.content_bounds().unwrap();
        let visible = d.controller().viewport().visible_world_rect(d.controller().screen());
        assert!(visible.contains(Point::new(bounds.x, bounds.y)));
        assert!(visible.contains(Point::new(bounds.right(), bounds.bottom())));

        let minimap = d.minimap().unwrap();
        let target = minimap.world_to_minimap(Point::new(500.0, 100.0));
        assert!(d.navigate_minimap(target));
        let center = d
            .controller()
            .viewport()
            .screen_to_world(d.controller().screen().center());
        assert!(center.distance(Point::new(500.0, 100.0)) < 1e-6);
    }

    #[test]
    fn test_favorites_filter_follows_toggles() {
        let mut d = diagram();
        d.set_favorites_only(true);
        assert!(d.positions().is_empty());
        d.toggle_favorite("public.orders");
        assert_eq!(d.positions().len(), 1);
        d.clear_filter();
        assert_eq!(d.positions().len(), 4);
    }
}
