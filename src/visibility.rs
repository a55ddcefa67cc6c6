//! Viewport culling and level-of-detail selection.
//!
//! Both are pure functions of the viewport, the node positions and the
//! current focus. Nothing here mutates diagram state.

use crate::config::LodConfig;
use crate::graph::EdgeKey;
use crate::layout::Positions;
use crate::measure::NodeMetrics;
use crate::schema::{ColumnRef, Schema, Table, TableId};
use crate::viewport::{Point, Rect, Size, Viewport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DetailTier {
    /// Header only
    Low,
    /// Header plus key columns
    Medium,
    /// Every column, up to the row cap
    High,
}

impl DetailTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Whatever the user is currently pointing at or has singled out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Focus {
    pub node: Option<TableId>,
    pub column: Option<ColumnRef>,
    pub relationship: Option<EdgeKey>,
}

impl Focus {
    pub fn is_active(&self) -> bool {
        self.node.is_some() || self.column.is_some() || self.relationship.is_some()
    }

    pub fn is_focused(&self, table: &TableId) -> bool {
        self.node.as_ref() == Some(table)
            || self.column.as_ref().is_some_and(|c| &c.table == table)
    }
}

/// Pick the rendering tier for a node.
///
/// Thresholds widen while the user is dragging, panning or zooming so the
/// frame stays cheap, and a focused node always renders in full.
pub fn detail_tier(scale: f64, is_focused: bool, is_interacting: bool, cfg: &LodConfig) -> DetailTier {
    if is_focused {
        return DetailTier::High;
    }
    let (low, medium) = if is_interacting {
        (cfg.interacting_low_threshold, cfg.interacting_medium_threshold)
    } else {
        (cfg.low_threshold, cfg.medium_threshold)
    };
    if scale < low {
        DetailTier::Low
    } else if scale < medium {
        DetailTier::Medium
    } else {
        DetailTier::High
    }
}

/// How much a focused node pops so it stays legible when zoomed out.
pub fn magnification(scale: f64, cfg: &LodConfig) -> f64 {
    (1.0 / scale).clamp(cfg.pop_min, cfg.pop_max)
}

/// Indices of the columns a node shows at `tier`.
pub fn displayed_rows(table: &Table, tier: DetailTier, cap: usize) -> Vec<usize> {
    match tier {
        DetailTier::Low => Vec::new(),
        DetailTier::Medium => table
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_key())
            .map(|(i, _)| i)
            .take(cap)
            .collect(),
        DetailTier::High => (0..table.columns.len().min(cap)).collect(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisibleNode {
    pub id: TableId,
    /// World-space bounds before magnification.
    pub rect: Rect,
    pub tier: DetailTier,
    pub magnification: f64,
    pub rows: Vec<usize>,
}

impl VisibleNode {
    /// Row slot of column `index`, if the node currently displays it.
    pub fn row_of(&self, index: usize) -> Option<usize> {
        self.rows.iter().position(|&i| i == index)
    }

    /// Bounds as drawn, after scaling about the center.
    pub fn drawn_rect(&self) -> Rect {
        self.rect.scaled_about_center(self.magnification)
    }

    /// Map a world point on the drawn node back into `rect` coordinates.
    pub fn unmagnify(&self, p: Point) -> Point {
        if self.magnification == 1.0 {
            return p;
        }
        let c = self.rect.center();
        c + (p - c) / self.magnification
    }
}

/// World rectangle that counts as on-screen: the viewport plus a buffer
/// that is constant in screen pixels.
pub fn culling_rect(viewport: &Viewport, screen: Size, cfg: &LodConfig) -> Rect {
    viewport
        .visible_world_rect(screen)
        .expand(cfg.buffer_px / viewport.scale())
}

pub struct VisibilityInput<'a> {
    pub schema: &'a Schema,
    pub positions: &'a Positions,
    pub viewport: &'a Viewport,
    pub screen: Size,
    pub focus: &'a Focus,
    pub interacting: bool,
}

pub fn visible_nodes(
    input: &VisibilityInput<'_>,
    metrics: &NodeMetrics,
    cfg: &LodConfig,
) -> Vec<VisibleNode> {
    let bounds = culling_rect(input.viewport, input.screen, cfg);
    let scale = input.viewport.scale();

    input
        .schema
        .tables()
        .iter()
        .filter_map(|table| {
            let id = table.id();
            let pos = input.positions.get(&id)?;
            let focused = input.focus.is_focused(&id);
            let tier = detail_tier(scale, focused, input.interacting, cfg);
            let rows = displayed_rows(table, tier, metrics.column_cap);
            let rect = Rect::new(pos.x, pos.y, metrics.width, metrics.height_for_rows(rows.len()));
            let magnification = if focused { magnification(scale, cfg) } else { 1.0 };
            let node = VisibleNode {
                id,
                rect,
                tier,
                magnification,
                rows,
            };
            // A popped node stays if either its layout or drawn bounds are on screen
            if !rect.intersects(&bounds) && !node.drawn_rect().intersects(&bounds) {
                return None;
            }
            Some(node)
        })
        .collect()
}

/// Edges are skipped when too many tables are on screen and nothing is
/// focused.
pub fn edge_budget_exceeded(visible: usize, focus: &Focus, cfg: &LodConfig) -> bool {
    visible > cfg.edge_budget && !focus.is_active()
}
