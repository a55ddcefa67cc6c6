//! Interaction state machine.
//!
//! The controller owns every piece of mutable diagram state: node
//! positions, the viewport, hover/selection/tag overlays and the debounce
//! timers. Other components only read it.

use serde::Serialize;
use tracing::{debug, trace};

use super::debounce::{Debounce, Millis};
use super::selection::{IntersectionValidator, RelationError, RelationRegistrar, SelectionPair};
use super::tags::{ColorTag, TagOverlay};
use crate::config::{InteractionConfig, ViewportConfig};
use crate::filter::Filter;
use crate::graph::{EdgeKey, VirtualRelation};
use crate::layout::Positions;
use crate::schema::{ColumnRef, TableId};
use crate::viewport::{Point, Rect, Size, Viewport};
use crate::visibility::Focus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
}

/// What lies under the pointer, resolved by hit testing.
#[derive(Debug, Clone, PartialEq)]
pub enum HitTarget {
    Canvas,
    Node(TableId),
    Column(ColumnRef),
    Edge(EdgeKey),
}

impl HitTarget {
    pub fn table(&self) -> Option<&TableId> {
        match self {
            Self::Node(id) => Some(id),
            Self::Column(c) => Some(&c.table),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathPick {
    pub start: Option<TableId>,
    pub end: Option<TableId>,
}

impl PathPick {
    /// Fill start, then end; a third pick starts over.
    pub fn pick(&mut self, table: TableId) {
        match (&self.start, &self.end) {
            (None, _) => self.start = Some(table),
            (Some(_), None) => self.end = Some(table),
            (Some(_), Some(_)) => {
                self.start = Some(table);
                self.end = None;
            }
        }
    }

    pub fn endpoints(&self) -> Option<(&TableId, &TableId)> {
        Some((self.start.as_ref()?, self.end.as_ref()?))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InteractionState {
    Idle,
    DraggingNode {
        table: TableId,
        last: Point,
    },
    PanningCanvas {
        last: Point,
        /// Path-mode selection to return to on pointer-up.
        resume: Option<PathPick>,
    },
    PathPicking(PathPick),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MenuTarget {
    Table(TableId),
    Column(ColumnRef),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContextMenu {
    pub target: MenuTarget,
    /// Screen position the menu opens at.
    pub at: Point,
}

/// Notifications for collaborators outside the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DiagramEvent {
    ViewSource { table: TableId },
    VirtualRelationAdded { relation: VirtualRelation },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    ZoomIn,
    ZoomOut,
    ResetView,
    FitView,
}

#[derive(Debug, Clone)]
pub struct Controller {
    interaction_cfg: InteractionConfig,
    viewport_cfg: ViewportConfig,
    state: InteractionState,
    viewport: Viewport,
    screen: Size,
    positions: Positions,
    hovered_node: Option<TableId>,
    hovered_column: Option<ColumnRef>,
    focused_node: Option<TableId>,
    selected_relationship: Option<EdgeKey>,
    selection: SelectionPair,
    tags: TagOverlay,
    context_menu: Option<ContextMenu>,
    filter: Filter,
    search: Debounce<String>,
    interacting: Debounce<()>,
    events: Vec<DiagramEvent>,
}

impl Controller {
    pub fn new(interaction_cfg: InteractionConfig, viewport_cfg: ViewportConfig) -> Self {
        let search = Debounce::new(interaction_cfg.search_debounce_ms);
        let interacting = Debounce::new(interaction_cfg.interaction_idle_ms);
        Self {
            interaction_cfg,
            viewport_cfg,
            state: InteractionState::Idle,
            viewport: Viewport::default(),
            screen: Size::default(),
            positions: Positions::new(),
            hovered_node: None,
            hovered_column: None,
            focused_node: None,
            selected_relationship: None,
            selection: SelectionPair::default(),
            tags: TagOverlay::default(),
            context_menu: None,
            filter: Filter::default(),
            search,
            interacting,
            events: Vec::new(),
        }
    }

    /// Back to the state of a freshly opened diagram. Positions are kept;
    /// the caller re-runs layout for the cleared filter.
    pub fn reset(&mut self) {
        let positions = std::mem::take(&mut self.positions);
        let screen = self.screen;
        *self = Self::new(self.interaction_cfg.clone(), self.viewport_cfg.clone());
        self.positions = positions;
        self.screen = screen;
    }

    // =========================================================================
    // READ ACCESS
    // =========================================================================

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn screen(&self) -> Size {
        self.screen
    }

    pub fn positions(&self) -> &Positions {
        &self.positions
    }

    pub fn selection(&self) -> &SelectionPair {
        &self.selection
    }

    pub fn tags(&self) -> &TagOverlay {
        &self.tags
    }

    pub fn context_menu(&self) -> Option<&ContextMenu> {
        self.context_menu.as_ref()
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Search text typed but not yet applied.
    pub fn pending_search(&self) -> Option<&str> {
        self.search.peek().map(String::as_str)
    }

    pub fn selected_relationship(&self) -> Option<EdgeKey> {
        self.selected_relationship
    }

    pub fn hovered_node(&self) -> Option<&TableId> {
        self.hovered_node.as_ref()
    }

    pub fn hovered_column(&self) -> Option<&ColumnRef> {
        self.hovered_column.as_ref()
    }

    pub fn focus(&self) -> Focus {
        Focus {
            node: self.hovered_node.clone().or_else(|| self.focused_node.clone()),
            column: self.hovered_column.clone(),
            relationship: self.selected_relationship,
        }
    }

    pub fn is_interacting(&self, now: Millis) -> bool {
        self.interacting.is_waiting(now)
    }

    pub fn path_mode(&self) -> bool {
        matches!(
            self.state,
            InteractionState::PathPicking(_)
                | InteractionState::PanningCanvas {
                    resume: Some(_),
                    ..
                }
        )
    }

    pub fn path_pick(&self) -> Option<&PathPick> {
        match &self.state {
            InteractionState::PathPicking(pick) => Some(pick),
            InteractionState::PanningCanvas {
                resume: Some(pick), ..
            } => Some(pick),
            _ => None,
        }
    }

    pub fn take_events(&mut self) -> Vec<DiagramEvent> {
        std::mem::take(&mut self.events)
    }

    // =========================================================================
    // STATE OWNED ON BEHALF OF THE ENGINE
    // =========================================================================

    pub fn resize(&mut self, screen: Size) {
        self.screen = screen;
    }

    /// Install a fresh layout. Drops hover/drag references to tables that
    /// are no longer laid out.
    pub fn replace_positions(&mut self, positions: Positions) {
        self.positions = positions;
        if let InteractionState::DraggingNode { table, .. } = &self.state {
            if !self.positions.contains_key(table) {
                self.state = InteractionState::Idle;
            }
        }
        if let Some(id) = &self.hovered_node {
            if !self.positions.contains_key(id) {
                self.hovered_node = None;
                self.hovered_column = None;
            }
        }
    }

    /// Overwrite positions of tables already laid out; others are ignored.
    pub fn merge_positions(&mut self, imported: &Positions) -> usize {
        let mut applied = 0;
        for (id, pos) in imported {
            if let Some(slot) = self.positions.get_mut(id) {
                *slot = *pos;
                applied += 1;
            }
        }
        applied
    }

    pub fn tags_mut(&mut self) -> &mut TagOverlay {
        &mut self.tags
    }

    /// Forget a relationship selection, e.g. after the graph was rebuilt.
    pub fn clear_relationship(&mut self) {
        self.selected_relationship = None;
    }

    // =========================================================================
    // POINTER INPUT
    // =========================================================================

    pub fn pointer_down(&mut self, target: HitTarget, at: Point, button: PointerButton, now: Millis) {
        if button == PointerButton::Secondary {
            self.context_menu = match target {
                HitTarget::Node(table) => Some(ContextMenu {
                    target: MenuTarget::Table(table),
                    at,
                }),
                HitTarget::Column(column) => Some(ContextMenu {
                    target: MenuTarget::Column(column),
                    at,
                }),
                _ => None,
            };
            return;
        }
        self.context_menu = None;

        let state = std::mem::replace(&mut self.state, InteractionState::Idle);
        self.state = match state {
            InteractionState::PathPicking(mut pick) => match target.table() {
                Some(table) => {
                    pick.pick(table.clone());
                    debug!(start = ?pick.start, end = ?pick.end, "path endpoint picked");
                    InteractionState::PathPicking(pick)
                }
                None => {
                    self.interacting.schedule((), now);
                    InteractionState::PanningCanvas {
                        last: at,
                        resume: Some(pick),
                    }
                }
            },
            // A pointer-down without a matching pointer-up: start over.
            InteractionState::PanningCanvas {
                resume: Some(pick), ..
            } => InteractionState::PathPicking(pick),
            _ => self.begin_gesture(target, at, now),
        };
    }

    fn begin_gesture(&mut self, target: HitTarget, at: Point, now: Millis) -> InteractionState {
        match target {
            HitTarget::Node(table) if self.positions.contains_key(&table) => {
                self.interacting.schedule((), now);
                InteractionState::DraggingNode { table, last: at }
            }
            HitTarget::Node(_) => InteractionState::Idle,
            HitTarget::Column(column) => {
                self.selection.toggle(column);
                InteractionState::Idle
            }
            HitTarget::Edge(key) => {
                self.selected_relationship = if self.selected_relationship == Some(key) {
                    None
                } else {
                    Some(key)
                };
                InteractionState::Idle
            }
            HitTarget::Canvas => {
                self.selected_relationship = None;
                self.interacting.schedule((), now);
                InteractionState::PanningCanvas {
                    last: at,
                    resume: None,
                }
            }
        }
    }

    /// `hover` is the hit-test result at `at`, used only when no gesture is
    /// in progress.
    pub fn pointer_move(&mut self, at: Point, hover: HitTarget, now: Millis) {
        match &mut self.state {
            InteractionState::DraggingNode { table, last } => {
                let delta = (at - *last) / self.viewport.scale();
                *last = at;
                if let Some(pos) = self.positions.get_mut(table) {
                    pos.x += delta.x;
                    pos.y += delta.y;
                }
                self.interacting.schedule((), now);
            }
            InteractionState::PanningCanvas { last, .. } => {
                let delta = at - *last;
                *last = at;
                self.viewport.pan_by(delta);
                self.interacting.schedule((), now);
            }
            _ => self.set_hover(hover),
        }
    }

    fn set_hover(&mut self, hover: HitTarget) {
        match hover {
            HitTarget::Node(table) => {
                self.hovered_node = Some(table);
                self.hovered_column = None;
            }
            HitTarget::Column(column) => {
                self.hovered_node = Some(column.table.clone());
                self.hovered_column = Some(column);
            }
            HitTarget::Canvas | HitTarget::Edge(_) => {
                self.hovered_node = None;
                self.hovered_column = None;
            }
        }
    }

    pub fn pointer_up(&mut self) {
        let state = std::mem::replace(&mut self.state, InteractionState::Idle);
        self.state = match state {
            InteractionState::DraggingNode { table, .. } => {
                trace!(%table, "drag finished");
                InteractionState::Idle
            }
            InteractionState::PanningCanvas { resume, .. } => match resume {
                Some(pick) => InteractionState::PathPicking(pick),
                None => InteractionState::Idle,
            },
            other => other,
        };
    }

    /// Pointer-centered zoom. Positive `delta` zooms out.
    pub fn wheel(&mut self, at: Point, delta: f64, now: Millis) {
        self.viewport
            .zoom_by_wheel(delta, self.viewport_cfg.wheel_sensitivity, Some(at));
        self.interacting.schedule((), now);
    }

    pub fn double_click(&mut self, target: HitTarget) {
        if let Some(table) = target.table() {
            self.events.push(DiagramEvent::ViewSource {
                table: table.clone(),
            });
        }
    }

    // =========================================================================
    // KEYBOARD AND VIEW COMMANDS
    // =========================================================================

    /// Returns false for keys the controller cannot handle on its own.
    pub fn key_down(&mut self, key: Key) -> bool {
        let center = Some(self.screen.center());
        match key {
            Key::Escape => {
                if self.context_menu.take().is_none() {
                    if self.path_mode() {
                        self.set_path_mode(false);
                    } else {
                        self.selection.clear();
                        self.selected_relationship = None;
                        self.focused_node = None;
                    }
                }
                true
            }
            Key::ZoomIn => {
                self.viewport.zoom_step(self.viewport_cfg.zoom_step, center);
                true
            }
            Key::ZoomOut => {
                self.viewport.zoom_step(-self.viewport_cfg.zoom_step, center);
                true
            }
            Key::ResetView => {
                self.viewport = Viewport::default();
                true
            }
            Key::FitView => false,
        }
    }

    pub fn fit_to(&mut self, bounds: Rect) {
        self.viewport
            .fit_bounds(bounds, self.screen, self.viewport_cfg.fit_padding);
    }

    pub fn center_on(&mut self, world: Point) {
        self.viewport.center_on(world, self.screen);
    }

    /// Single out a table (e.g. from a search result) and bring it into view.
    pub fn focus_table(&mut self, table: TableId, world_center: Point) {
        self.focused_node = Some(table);
        self.center_on(world_center);
    }

    pub fn set_path_mode(&mut self, on: bool) {
        let state = std::mem::replace(&mut self.state, InteractionState::Idle);
        self.state = match (state, on) {
            (InteractionState::Idle, true) => InteractionState::PathPicking(PathPick::default()),
            (InteractionState::PathPicking(_), false) => InteractionState::Idle,
            (InteractionState::PanningCanvas { last, resume }, on) => InteractionState::PanningCanvas {
                last,
                resume: on.then(|| resume.unwrap_or_default()),
            },
            (other, _) => other,
        };
    }

    // =========================================================================
    // FILTER AND TIMERS
    // =========================================================================

    /// Schedule a search; it applies once typing has paused.
    pub fn search_input(&mut self, text: &str, now: Millis) {
        self.search.schedule(text.to_string(), now);
    }

    /// Returns true when the active filter changed.
    pub fn set_tag_filter(&mut self, tag: Option<ColorTag>) -> bool {
        if self.filter.tag == tag {
            return false;
        }
        self.filter.tag = tag;
        true
    }

    pub fn set_favorites_only(&mut self, on: bool) -> bool {
        if self.filter.favorites_only == on {
            return false;
        }
        self.filter.favorites_only = on;
        true
    }

    pub fn clear_filter(&mut self) -> bool {
        self.search.cancel();
        if self.filter.is_empty() && self.filter.search.is_empty() {
            return false;
        }
        self.filter = Filter::default();
        true
    }

    /// Advance timers. Returns true when a debounced search was applied and
    /// changed the filter.
    pub fn tick(&mut self, now: Millis) -> bool {
        let _ = self.interacting.poll(now);
        match self.search.poll(now) {
            Some(text) => self.apply_search(text),
            None => false,
        }
    }

    /// Apply any pending search right away.
    pub fn flush_filter(&mut self) -> bool {
        match self.search.flush() {
            Some(text) => self.apply_search(text),
            None => false,
        }
    }

    fn apply_search(&mut self, text: String) -> bool {
        if self.filter.search == text {
            return false;
        }
        debug!(search = %text, "search filter applied");
        self.filter.search = text;
        true
    }

    // =========================================================================
    // SELECTION AND VIRTUAL RELATIONS
    // =========================================================================

    pub fn toggle_column(&mut self, column: ColumnRef) {
        self.selection.toggle(column);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Validate the selected pair and, on success, register it as a virtual
    /// relation. State is untouched on failure.
    pub fn submit_selection(
        &mut self,
        validator: &mut dyn IntersectionValidator,
        registrar: &mut dyn RelationRegistrar,
    ) -> Result<VirtualRelation, RelationError> {
        let (first, second) = self
            .selection
            .complete()
            .ok_or(RelationError::IncompleteSelection)?;
        if first.table == second.table {
            return Err(RelationError::SameTable(first.table.clone()));
        }
        validator
            .validate(first, second)
            .map_err(RelationError::Rejected)?;
        let relation = self
            .selection
            .to_relation()
            .ok_or(RelationError::IncompleteSelection)?;
        registrar
            .register(&relation)
            .map_err(RelationError::Registration)?;

        self.selection.clear();
        self.events.push(DiagramEvent::VirtualRelationAdded {
            relation: relation.clone(),
        });
        Ok(relation)
    }

    // =========================================================================
    // TAGS
    // =========================================================================

    pub fn tag_table(&mut self, table: TableId, tag: Option<ColorTag>) {
        self.tags.set_table(table, tag);
        self.context_menu = None;
    }

    pub fn tag_column(&mut self, column: ColumnRef, tag: Option<ColorTag>) {
        self.tags.set_column(column, tag);
        self.context_menu = None;
    }

    pub fn clear_tags(&mut self) {
        self.tags.clear_tags();
    }

    pub fn toggle_favorite(&mut self, table: TableId) -> bool {
        self.tags.toggle_favorite(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::NodePosition;

    fn controller() -> Controller {
        let mut c = Controller::new(InteractionConfig::default(), ViewportConfig::default());
        let mut positions = Positions::new();
        positions.insert(TableId::from("public.a"), NodePosition { x: 0.0, y: 0.0 });
        positions.insert(TableId::from("public.b"), NodePosition { x: 400.0, y: 0.0 });
        c.replace_positions(positions);
        c
    }

    fn node(name: &str) -> HitTarget {
        HitTarget::Node(TableId::from(name))
    }

    fn column(table: &str, name: &str) -> ColumnRef {
        ColumnRef::new(TableId::from(table), name)
    }

    struct Accept;
    impl IntersectionValidator for Accept {
        fn validate(&mut self, _: &ColumnRef, _: &ColumnRef) -> Result<(), String> {
            Ok(())
        }
    }

    struct Reject;
    impl IntersectionValidator for Reject {
        fn validate(&mut self, _: &ColumnRef, _: &ColumnRef) -> Result<(), String> {
            Err("no overlap".to_string())
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

    #[test]
    fn test_drag_is_scaled_by_zoom() {
        let mut c = controller();
        c.viewport.set_scale(0.5);
        c.pointer_down(node("public.a"), Point::new(10.0, 10.0), PointerButton::Primary, 0);
        assert!(matches!(c.state(), InteractionState::DraggingNode { .. }));
        c.pointer_move(Point::new(30.0, 20.0), HitTarget::Canvas, 16);
        c.pointer_up();

        let pos = c.positions()[&TableId::from("public.a")];
        assert_eq!(pos, NodePosition { x: 40.0, y: 20.0 });
        assert_eq!(c.state(), &InteractionState::Idle);
    }

    #[test]
    fn test_pan_is_not_scaled() {
        let mut c = controller();
        c.viewport.set_scale(0.25);
        c.pointer_down(HitTarget::Canvas, Point::new(0.0, 0.0), PointerButton::Primary, 0);
        c.pointer_move(Point::new(15.0, -5.0), HitTarget::Canvas, 10);
        c.pointer_move(Point::new(20.0, -5.0), HitTarget::Canvas, 20);
        c.pointer_up();

        assert_eq!(c.viewport().pan, Point::new(20.0, -5.0));
        assert_eq!(c.state(), &InteractionState::Idle);
    }

    #[test]
    fn test_interaction_window() {
        let mut c = controller();
        c.wheel(Point::new(100.0, 100.0), 100.0, 1000);
        assert!(c.is_interacting(1100));
        assert!(!c.is_interacting(1200));
        c.tick(1200);
        assert!(!c.is_interacting(1201));
    }

    #[test]
    fn test_path_mode_picks_start_end_then_restarts() {
        let mut c = controller();
        c.set_path_mode(true);
        c.pointer_down(node("public.a"), Point::default(), PointerButton::Primary, 0);
        c.pointer_up();
        c.pointer_down(node("public.b"), Point::default(), PointerButton::Primary, 0);
        c.pointer_up();
        let pick = c.path_pick().unwrap();
        assert_eq!(pick.start.as_ref().unwrap().as_str(), "public.a");
        assert_eq!(pick.end.as_ref().unwrap().as_str(), "public.b");

        c.pointer_down(node("public.b"), Point::default(), PointerButton::Primary, 0);
        let pick = c.path_pick().unwrap();
        assert_eq!(pick.start.as_ref().unwrap().as_str(), "public.b");
        assert!(pick.end.is_none());
        // Nodes are not dragged in path mode
        assert_eq!(c.positions()[&TableId::from("public.b")].x, 400.0);
    }

    #[test]
    fn test_path_mode_survives_canvas_pan() {
        let mut c = controller();
        c.set_path_mode(true);
        c.pointer_down(node("public.a"), Point::default(), PointerButton::Primary, 0);
        c.pointer_down(HitTarget::Canvas, Point::new(0.0, 0.0), PointerButton::Primary, 0);
        assert!(c.path_mode());
        c.pointer_move(Point::new(5.0, 5.0), HitTarget::Canvas, 5);
        c.pointer_up();

        assert_eq!(c.viewport().pan, Point::new(5.0, 5.0));
        let pick = c.path_pick().unwrap();
        assert_eq!(pick.start.as_ref().unwrap().as_str(), "public.a");
    }

    #[test]
    fn test_context_menu_opens_and_closes() {
        let mut c = controller();
        c.pointer_down(node("public.a"), Point::new(3.0, 4.0), PointerButton::Secondary, 0);
        let menu = c.context_menu().unwrap();
        assert_eq!(menu.target, MenuTarget::Table(TableId::from("public.a")));
        assert_eq!(c.state(), &InteractionState::Idle);

        c.pointer_down(HitTarget::Canvas, Point::default(), PointerButton::Primary, 0);
        assert!(c.context_menu().is_none());
    }

    #[test]
    fn test_double_click_emits_view_source() {
        let mut c = controller();
        c.double_click(node("public.a"));
        c.double_click(HitTarget::Canvas);
        assert_eq!(
            c.take_events(),
            vec![DiagramEvent::ViewSource {
                table: TableId::from("public.a")
            }]
        );
        assert!(c.take_events().is_empty());
        assert_eq!(c.state(), &InteractionState::Idle);
    }

    #[test]
    fn test_edge_click_toggles_relationship() {
        let mut c = controller();
        c.pointer_down(HitTarget::Edge(EdgeKey(3)), Point::default(), PointerButton::Primary, 0);
        c.pointer_up();
        assert_eq!(c.selected_relationship(), Some(EdgeKey(3)));
        assert!(c.focus().is_active());
        c.pointer_down(HitTarget::Canvas, Point::default(), PointerButton::Primary, 0);
        c.pointer_up();
        assert_eq!(c.selected_relationship(), None);
    }

    #[test]
    fn test_hover_tracks_column_and_node() {
        let mut c = controller();
        c.pointer_move(
            Point::default(),
            HitTarget::Column(column("public.a", "id")),
            0,
        );
        assert_eq!(c.hovered_node().unwrap().as_str(), "public.a");
        assert!(c.focus().is_focused(&TableId::from("public.a")));
        c.pointer_move(Point::default(), HitTarget::Canvas, 0);
        assert!(!c.focus().is_active());
    }

    #[test]
    fn test_search_debounce_last_write_wins() {
        let mut c = controller();
        c.search_input("us", 0);
        c.search_input("users", 100);
        assert!(!c.tick(350));
        assert_eq!(c.filter().search, "");
        assert!(c.tick(400));
        assert_eq!(c.filter().search, "users");
        assert!(!c.tick(10_000));
    }

    #[test]
    fn test_flush_filter_bypasses_timer() {
        let mut c = controller();
        c.search_input("orders", 0);
        assert_eq!(c.pending_search(), Some("orders"));
        assert!(c.flush_filter());
        assert_eq!(c.filter().search, "orders");
        assert!(c.clear_filter());
        assert!(c.filter().is_empty());
    }

    #[test]
    fn test_submit_selection_success() {
        let mut c = controller();
        c.pointer_down(
            HitTarget::Column(column("public.a", "id")),
            Point::default(),
            PointerButton::Primary,
            0,
        );
        assert!(matches!(
            c.submit_selection(&mut Accept, &mut Registry::default()),
            Err(RelationError::IncompleteSelection)
        ));
        c.pointer_down(
            HitTarget::Column(column("public.b", "a_id")),
            Point::default(),
            PointerButton::Primary,
            0,
        );
        let mut registry = Registry::default();
        let relation = c.submit_selection(&mut Accept, &mut registry).unwrap();

        assert_eq!(registry.0, vec![relation.clone()]);
        assert!(c.selection().is_empty());
        assert_eq!(
            c.take_events(),
            vec![DiagramEvent::VirtualRelationAdded { relation }]
        );
    }

    #[test]
    fn test_submit_selection_rejected_keeps_state() {
        let mut c = controller();
        c.toggle_column(column("public.a", "id"));
        c.toggle_column(column("public.b", "a_id"));
        let mut registry = Registry::default();
        let err = c.submit_selection(&mut Reject, &mut registry).unwrap_err();

        assert_eq!(err, RelationError::Rejected("no overlap".to_string()));
        assert!(registry.0.is_empty());
        assert!(c.selection().complete().is_some());
    }

    #[test]
    fn test_submit_selection_same_table() {
        let mut c = controller();
        c.toggle_column(column("public.a", "id"));
        c.toggle_column(column("public.a", "name"));
        let mut registry = Registry::default();
        let err = c.submit_selection(&mut Accept, &mut registry).unwrap_err();

        assert_eq!(err, RelationError::SameTable(TableId::from("public.a")));
        assert!(registry.0.is_empty());
        assert!(c.take_events().is_empty());
    }

    #[test]
    fn test_escape_unwinds_in_order() {
        let mut c = controller();
        c.toggle_column(column("public.a", "id"));
        c.set_path_mode(true);
        c.pointer_down(node("public.a"), Point::default(), PointerButton::Secondary, 0);

        c.key_down(Key::Escape);
        assert!(c.context_menu().is_none());
        assert!(c.path_mode());
        c.key_down(Key::Escape);
        assert!(!c.path_mode());
        assert!(!c.selection().is_empty());
        c.key_down(Key::Escape);
        assert!(c.selection().is_empty());
    }

    #[test]
    fn test_replace_positions_drops_stale_hover() {
        let mut c = controller();
        c.pointer_move(Point::default(), node("public.b"), 0);
        let mut only_a = Positions::new();
        only_a.insert(TableId::from("public.a"), NodePosition { x: 0.0, y: 0.0 });
        c.replace_positions(only_a);
        assert!(c.hovered_node().is_none());
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut c = controller();
        c.wheel(Point::default(), 500.0, 0);
        c.tag_table(TableId::from("public.a"), Some(ColorTag::Red));
        c.reset();
        assert_eq!(c.viewport(), &Viewport::default());
        assert!(c.tags().table_tags().is_empty());
        assert_eq!(c.positions().len(), 2);
    }
}
