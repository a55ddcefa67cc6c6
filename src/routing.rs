//! Edge routing between column anchors.
//!
//! Edges leave and enter nodes on their left or right side at the row of
//! the referencing and referenced column, and are drawn as cubic Bézier
//! curves (straight lines at low detail).

use std::fmt::Write;

use crate::config::RouterConfig;
use crate::measure::NodeMetrics;
use crate::viewport::{Point, Rect};
use crate::visibility::DetailTier;

/// A node rectangle plus the Y coordinate the edge attaches at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub node: Rect,
    pub y: f64,
}

impl Anchor {
    /// Anchor at displayed row `row`, or at the header when the column is
    /// not displayed.
    pub fn at_row(node: Rect, row: Option<usize>, metrics: &NodeMetrics) -> Self {
        let offset = match row {
            Some(row) => metrics.row_center(row),
            None => metrics.header_center(),
        };
        Self {
            node,
            y: node.y + offset,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeShape {
    Curve,
    Line,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgePath {
    pub start: Point,
    pub c1: Point,
    pub c2: Point,
    pub end: Point,
    pub shape: EdgeShape,
    pub stroke_width: f64,
}

/// Which side each end of the edge attaches to.
///
/// Nodes that overlap horizontally are "stacked": both ends use the same
/// side so the curve never cuts through either body. The stacked case
/// compares exact X so near-equal columns still resolve deterministically.
pub fn choose_sides(source: &Rect, target: &Rect) -> (Side, Side) {
    if target.x > source.right() {
        (Side::Right, Side::Left)
    } else if target.right() < source.x {
        (Side::Left, Side::Right)
    } else if target.x >= source.x {
        (Side::Right, Side::Right)
    } else {
        (Side::Left, Side::Left)
    }
}

fn side_x(rect: &Rect, side: Side) -> f64 {
    match side {
        Side::Left => rect.x,
        Side::Right => rect.right(),
    }
}

fn outward(side: Side) -> f64 {
    match side {
        Side::Left => -1.0,
        Side::Right => 1.0,
    }
}

pub fn route(source: &Anchor, target: &Anchor, tier: DetailTier, cfg: &RouterConfig) -> EdgePath {
    let (from_side, to_side) = choose_sides(&source.node, &target.node);
    let start = Point::new(side_x(&source.node, from_side), source.y);
    let end = Point::new(side_x(&target.node, to_side), target.y);

    let curve = (end.x - start.x).abs() * cfg.curvature;
    let curve = curve.max(cfg.min_curve);

    let path = EdgePath {
        start,
        c1: Point::new(start.x + outward(from_side) * curve, start.y),
        c2: Point::new(end.x + outward(to_side) * curve, end.y),
        end,
        shape: EdgeShape::Curve,
        stroke_width: cfg.stroke_width,
    };

    if tier == DetailTier::Low {
        path.simplified(cfg)
    } else {
        path
    }
}

impl EdgePath {
    /// Straight-line variant, cheaper to rasterize.
    pub fn simplified(&self, cfg: &RouterConfig) -> EdgePath {
        EdgePath {
            c1: self.start,
            c2: self.end,
            shape: EdgeShape::Line,
            stroke_width: cfg.simplified_stroke_width,
            ..*self
        }
    }

    pub fn point_at(&self, t: f64) -> Point {
        match self.shape {
            EdgeShape::Line => self.start + (self.end - self.start) * t,
            EdgeShape::Curve => {
                let u = 1.0 - t;
                self.start * (u * u * u)
                    + self.c1 * (3.0 * u * u * t)
                    + self.c2 * (3.0 * u * t * t)
                    + self.end * (t * t * t)
            }
        }
    }

    pub fn to_svg_d(&self) -> String {
        let mut d = String::new();
        let _ = write!(d, "M {:.1} {:.1}", self.start.x, self.start.y);
        let _ = match self.shape {
            EdgeShape::Line => write!(d, " L {:.1} {:.1}", self.end.x, self.end.y),
            EdgeShape::Curve => write!(
                d,
                " C {:.1} {:.1}, {:.1} {:.1}, {:.1} {:.1}",
                self.c1.x, self.c1.y, self.c2.x, self.c2.y, self.end.x, self.end.y
            ),
        };
        d
    }

    /// Bounding box of the control polygon, which contains the curve.
    pub fn bounds(&self) -> Rect {
        let xs = [self.start.x, self.c1.x, self.c2.x, self.end.x];
        let ys = [self.start.y, self.c1.y, self.c2.y, self.end.y];
        let min_x = xs.iter().copied().fold(f64::INFINITY, f64::min);
        let max_x = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min_y = ys.iter().copied().fold(f64::INFINITY, f64::min);
        let max_y = ys.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Rect::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    /// Shortest distance from `p` to the sampled path.
    pub fn hit_distance(&self, p: Point, samples: usize) -> f64 {
        let samples = match self.shape {
            EdgeShape::Line => 1,
            EdgeShape::Curve => samples.max(1),
        };
        let mut prev = self.start;
        let mut best = f64::INFINITY;
        for i in 1..=samples {
            let next = self.point_at(i as f64 / samples as f64);
            best = best.min(segment_distance(p, prev, next));
            prev = next;
        }
        best
    }

    /// Hit test against the wide invisible stroke, independent of the
    /// rendered stroke width.
    pub fn hits(&self, p: Point, cfg: &RouterConfig) -> bool {
        if !self.bounds().expand(cfg.hit_stroke_width).contains(p) {
            return false;
        }
        self.hit_distance(p, cfg.hit_samples) <= cfg.hit_stroke_width / 2.0
    }
}

fn segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let len_sq = ab.x * ab.x + ab.y * ab.y;
    if len_sq == 0.0 {
        return p.distance(a);
    }
    let ap = p - a;
    let t = ((ap.x * ab.x + ap.y * ab.y) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(x: f64, y: f64) -> Rect {
        Rect::new(x, y, 260.0, 100.0)
    }

    #[test]
    fn test_target_to_the_right() {
        let cfg = RouterConfig::default();
        let src = Anchor { node: node(0.0, 0.0), y: 50.0 };
        let dst = Anchor { node: node(600.0, 0.0), y: 70.0 };
        let path = route(&src, &dst, DetailTier::High, &cfg);

        assert_eq!(path.start, Point::new(260.0, 50.0));
        assert_eq!(path.end, Point::new(600.0, 70.0));
        assert_eq!(path.c1, Point::new(260.0 + 170.0, 50.0));
        assert_eq!(path.c2, Point::new(600.0 - 170.0, 70.0));
        assert_eq!(path.shape, EdgeShape::Curve);
    }

    #[test]
    fn test_target_to_the_left() {
        let cfg = RouterConfig::default();
        let src = Anchor { node: node(600.0, 0.0), y: 10.0 };
        let dst = Anchor { node: node(0.0, 0.0), y: 10.0 };
        let path = route(&src, &dst, DetailTier::High, &cfg);

        assert_eq!(path.start.x, 600.0);
        assert_eq!(path.end.x, 260.0);
        assert!(path.c1.x < path.start.x);
        assert!(path.c2.x > path.end.x);
    }

    #[test]
    fn test_stacked_nodes_share_a_side() {
        assert_eq!(
            choose_sides(&node(0.0, 0.0), &node(0.0, 300.0)),
            (Side::Right, Side::Right)
        );
        assert_eq!(
            choose_sides(&node(10.0, 0.0), &node(9.999, 300.0)),
            (Side::Left, Side::Left)
        );
    }

    #[test]
    fn test_min_curve_floor() {
        let cfg = RouterConfig::default();
        let src = Anchor { node: node(0.0, 0.0), y: 20.0 };
        let dst = Anchor { node: node(0.0, 400.0), y: 420.0 };
        let path = route(&src, &dst, DetailTier::High, &cfg);

        assert_eq!(path.c1.x, 260.0 + cfg.min_curve);
        assert_eq!(path.c2.x, 260.0 + cfg.min_curve);
    }

    #[test]
    fn test_low_tier_uses_straight_line() {
        let cfg = RouterConfig::default();
        let src = Anchor { node: node(0.0, 0.0), y: 20.0 };
        let dst = Anchor { node: node(600.0, 0.0), y: 20.0 };
        let path = route(&src, &dst, DetailTier::Low, &cfg);

        assert_eq!(path.shape, EdgeShape::Line);
        assert_eq!(path.stroke_width, cfg.simplified_stroke_width);
        assert!(path.to_svg_d().contains(" L "));
    }

    #[test]
    fn test_hit_uses_wide_stroke() {
        let cfg = RouterConfig::default();
        let src = Anchor { node: node(0.0, 0.0), y: 20.0 };
        let dst = Anchor { node: node(600.0, 0.0), y: 20.0 };
        let path = route(&src, &dst, DetailTier::High, &cfg);

        assert!(path.hits(Point::new(430.0, 27.0), &cfg));
        assert!(!path.hits(Point::new(430.0, 40.0), &cfg));
    }

    #[test]
    fn test_anchor_rows() {
        let metrics = NodeMetrics::default();
        let rect = node(0.0, 100.0);
        assert_eq!(Anchor::at_row(rect, None, &metrics).y, 100.0 + 22.0);
        assert_eq!(Anchor::at_row(rect, Some(2), &metrics).y, 100.0 + 44.0 + 52.0 + 13.0);
    }
}
