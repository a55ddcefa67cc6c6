//! Deterministic grid packing with variable row heights.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::LayoutConfig;
use crate::measure::NodeMetrics;
use crate::schema::{Table, TableId};
use crate::viewport::{Point, Rect};

/// Top-left corner of a table node in world units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodePosition {
    pub x: f64,
    pub y: f64,
}

impl NodePosition {
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

pub type Positions = BTreeMap<TableId, NodePosition>;

#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    pub(crate) config: LayoutConfig,
    pub(crate) metrics: NodeMetrics,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig, metrics: NodeMetrics) -> Self {
        Self { config, metrics }
    }

    /// Number of grid columns used for `n` tables.
    pub fn column_count(&self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        ((n as f64 * self.config.density).sqrt().ceil() as usize).max(1)
    }

    pub fn layout(&self, tables: &[&Table]) -> Positions {
        let mut positions = Positions::new();
        let cols = self.column_count(tables.len());
        if cols == 0 {
            return positions;
        }
        let rows = tables.len().div_ceil(cols);

        // Phase 1: tallest member per row
        let mut row_heights = vec![0.0f64; rows];
        for (i, table) in tables.iter().enumerate() {
            let h = self.metrics.full_height(table.columns.len());
            let row = i / cols;
            row_heights[row] = row_heights[row].max(h);
        }

        // Phase 2: running Y offsets
        let mut row_y = Vec::with_capacity(rows);
        let mut y = self.config.margin;
        for h in &row_heights {
            row_y.push(y);
            y += h + self.config.row_gap;
        }

        for (i, table) in tables.iter().enumerate() {
            let (row, col) = (i / cols, i % cols);
            positions.insert(
                table.id(),
                NodePosition {
                    x: col as f64 * self.config.column_spacing + self.config.margin,
                    y: row_y[row],
                },
            );
        }

        debug!(tables = tables.len(), cols, rows, "computed grid layout");
        positions
    }
}

/// World-space bounds of every positioned node at full height.
pub fn content_bounds(
    positions: &Positions,
    height_of: impl Fn(&TableId) -> Option<f64>,
    node_width: f64,
) -> Option<Rect> {
    positions
        .iter()
        .filter_map(|(id, pos)| height_of(id).map(|h| Rect::new(pos.x, pos.y, node_width, h)))
        .reduce(|acc, r| acc.union(&r))
}
