//! Scaled-down overview of every laid-out node plus the viewport rectangle.

use crate::config::MinimapConfig;
use crate::schema::TableId;
use crate::viewport::{Point, Rect, Size, Viewport};

#[derive(Debug, Clone, PartialEq)]
pub struct MinimapNode {
    pub id: TableId,
    /// Minimap pixel space.
    pub rect: Rect,
}

/// One minimap frame. Node and viewport rects are in minimap pixels;
/// `world_origin` and `scale` map them back to world space.
#[derive(Debug, Clone, PartialEq)]
pub struct MinimapFrame {
    pub size: Size,
    pub scale: f64,
    pub world_origin: Point,
    pub offset: Point,
    pub nodes: Vec<MinimapNode>,
    pub viewport: Rect,
}

impl MinimapFrame {
    /// `nodes` are full-size world rects. The mapped area covers both the
    /// content and the current viewport so the viewport box never falls
    /// off the minimap. Returns `None` when there is nothing to draw.
    pub fn compute(
        nodes: &[(TableId, Rect)],
        viewport: &Viewport,
        screen: Size,
        cfg: &MinimapConfig,
    ) -> Option<Self> {
        let content = nodes.iter().map(|(_, r)| *r).reduce(|a, b| a.union(&b))?;
        let view = viewport.visible_world_rect(screen);
        let world = content.union(&view);

        let inner_w = (cfg.width - 2.0 * cfg.padding).max(1.0);
        let inner_h = (cfg.height - 2.0 * cfg.padding).max(1.0);
        let scale = (inner_w / world.width.max(1.0)).min(inner_h / world.height.max(1.0));

        // Center the mapped world inside the padded area
        let offset = Point::new(
            cfg.padding + (inner_w - world.width * scale) / 2.0,
            cfg.padding + (inner_h - world.height * scale) / 2.0,
        );
        let mut frame = Self {
            size: Size::new(cfg.width, cfg.height),
            scale,
            world_origin: Point::new(world.x, world.y),
            offset,
            nodes: Vec::with_capacity(nodes.len()),
            viewport: Rect::new(0.0, 0.0, 0.0, 0.0),
        };
        frame.viewport = frame.to_minimap_rect(&view);
        frame.nodes = nodes
            .iter()
            .map(|(id, rect)| MinimapNode {
                id: id.clone(),
                rect: frame.to_minimap_rect(rect),
            })
            .collect();
        Some(frame)
    }

    pub fn world_to_minimap(&self, p: Point) -> Point {
        (p - self.world_origin) * self.scale + self.offset
    }

    pub fn minimap_to_world(&self, p: Point) -> Point {
        (p - self.offset) / self.scale + self.world_origin
    }

    fn to_minimap_rect(&self, r: &Rect) -> Rect {
        let origin = self.world_to_minimap(Point::new(r.x, r.y));
        Rect::new(origin.x, origin.y, r.width * self.scale, r.height * self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Point, b: Point) -> bool {
        a.distance(b) < 1e-9
    }

    #[test]
    fn test_empty_has_no_frame() {
        let frame = MinimapFrame::compute(
            &[],
            &Viewport::default(),
            Size::default(),
            &MinimapConfig::default(),
        );
        assert!(frame.is_none());
    }

    #[test]
    fn test_everything_fits_inside_padding() {
        let nodes = vec![
            (TableId::from("public.a"), Rect::new(0.0, 0.0, 260.0, 100.0)),
            (TableId::from("public.b"), Rect::new(4000.0, 3000.0, 260.0, 300.0)),
        ];
        let cfg = MinimapConfig::default();
        let frame =
            MinimapFrame::compute(&nodes, &Viewport::default(), Size::new(800.0, 600.0), &cfg)
                .unwrap();

        let inner = Rect::new(
            cfg.padding,
            cfg.padding,
            cfg.width - 2.0 * cfg.padding,
            cfg.height - 2.0 * cfg.padding,
        )
        .expand(1e-9);
        for node in frame.nodes.iter().map(|n| n.rect).chain([frame.viewport]) {
            assert!(inner.contains(Point::new(node.x, node.y)));
            assert!(inner.contains(Point::new(node.right(), node.bottom())));
        }
    }

    #[test]
    fn test_viewport_rect_tracks_zoom() {
        let nodes = vec![(TableId::from("public.a"), Rect::new(0.0, 0.0, 2000.0, 2000.0))];
        let cfg = MinimapConfig::default();
        let screen = Size::new(400.0, 400.0);
        let wide = MinimapFrame::compute(&nodes, &Viewport::new(Point::default(), 0.5), screen, &cfg)
            .unwrap();
        let narrow =
            MinimapFrame::compute(&nodes, &Viewport::new(Point::default(), 2.0), screen, &cfg)
                .unwrap();
        assert!(narrow.viewport.width < wide.viewport.width);
    }

    #[test]
    fn test_round_trip_to_world() {
        let nodes = vec![(TableId::from("public.a"), Rect::new(100.0, 50.0, 260.0, 100.0))];
        let frame = MinimapFrame::compute(
            &nodes,
            &Viewport::default(),
            Size::new(640.0, 480.0),
            &MinimapConfig::default(),
        )
        .unwrap();

        let world = Point::new(300.0, 120.0);
        assert!(close(frame.minimap_to_world(frame.world_to_minimap(world)), world));
    }
}
