use crate::config::EngineConfig;
use crate::diagram::{EXPORT_IGNORE_ATTR, NodeView, PathStatus, RenderFrame, RoutedEdge};
use crate::measure::{NodeMetrics, TextMetrics};
use crate::minimap::MinimapFrame;
use crate::routing::EdgeShape;
use crate::viewport::Size;
use crate::visibility::DetailTier;
use std::fmt::Write;

const MINIMAP_MARGIN: f64 = 16.0;

pub struct SvgRenderer {
    metrics: TextMetrics,
    node: NodeMetrics,
    hit_stroke_width: f64,
}

impl Default for SvgRenderer {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl SvgRenderer {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            metrics: TextMetrics::default(),
            node: config.node.clone(),
            hit_stroke_width: config.router.hit_stroke_width,
        }
    }

    pub fn render(&self, frame: &RenderFrame) -> String {
        let mut svg = String::new();
        let Size { width, height } = frame.screen;

        writeln!(
            &mut svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">"#,
            width, height, width, height
        )
        .unwrap();

        // Style
        writeln!(
            &mut svg,
            r#"<style>
  .canvas {{ fill: #fafafa; }}
  .entity-bg {{ fill: #fff; }}
  .entity-header {{ fill: #e0e0e0; }}
  .entity-border {{ fill: none; stroke: #333; stroke-width: 1.5; }}
  .entity.hovered .entity-border, .entity.on-path .entity-border {{ stroke: #2563eb; stroke-width: 2.5; }}
  .entity.related .entity-border {{ stroke: #60a5fa; }}
  .entity-name {{ font-family: monospace; font-size: 14px; font-weight: bold; }}
  .column-text {{ font-family: monospace; font-size: 12px; }}
  .column-selected {{ fill: #fde68a; }}
  .column-hovered {{ fill: #e0f2fe; }}
  .pk {{ font-weight: bold; }}
  .fk {{ font-style: italic; }}
  .edge {{ stroke: #666; fill: none; }}
  .edge.virtual {{ stroke-dasharray: 6 4; }}
  .edge.highlighted {{ stroke: #2563eb; }}
  .edge.selected, .edge.on-path {{ stroke: #dc2626; }}
  .edge-hit {{ stroke: transparent; fill: none; }}
  .path-status {{ font-family: sans-serif; font-size: 13px; fill: #b91c1c; }}
  .minimap-bg {{ fill: #fff; stroke: #999; }}
  .minimap-node {{ fill: #9ca3af; }}
  .minimap-viewport {{ fill: none; stroke: #2563eb; stroke-width: 1.5; }}
</style>"#
        )
        .unwrap();

        writeln!(
            &mut svg,
            r#"<rect class="canvas" x="0" y="0" width="{}" height="{}" />"#,
            width, height
        )
        .unwrap();

        let vp = &frame.viewport;
        writeln!(
            &mut svg,
            r#"<g transform="translate({:.2} {:.2}) scale({:.4})">"#,
            vp.pan.x,
            vp.pan.y,
            vp.scale()
        )
        .unwrap();

        // Edges go behind nodes
        for edge in &frame.edges {
            self.render_edge(&mut svg, edge);
        }
        for node in &frame.nodes {
            self.render_node(&mut svg, node);
        }

        writeln!(&mut svg, "</g>").unwrap();

        if let PathStatus::NoConnection { start, end } = &frame.path {
            writeln!(
                &mut svg,
                r#"<text class="path-status" x="16" y="24" {}="true">No connection between {} and {}</text>"#,
                EXPORT_IGNORE_ATTR,
                escape_xml(start.as_str()),
                escape_xml(end.as_str())
            )
            .unwrap();
        }

        if let Some(minimap) = &frame.minimap {
            self.render_minimap(&mut svg, minimap, frame.screen);
        }

        writeln!(&mut svg, "</svg>").unwrap();
        svg
    }

    fn render_node(&self, svg: &mut String, view: &NodeView) {
        let node = &view.node;
        let x = node.rect.x;
        let y = node.rect.y;
        let w = node.rect.width;
        let h = node.rect.height;
        let header_h = self.node.header_height;

        let mut class = "entity".to_string();
        for (on, name) in [
            (view.hovered, " hovered"),
            (view.related, " related"),
            (view.on_path, " on-path"),
        ] {
            if on {
                class.push_str(name);
            }
        }

        // Magnified nodes scale about their own center
        if node.magnification != 1.0 {
            let c = node.rect.center();
            writeln!(
                svg,
                r#"<g class="{}" data-table="{}" transform="translate({} {}) scale({:.3}) translate({} {})">"#,
                class,
                escape_xml(node.id.as_str()),
                c.x,
                c.y,
                node.magnification,
                -c.x,
                -c.y
            )
            .unwrap();
        } else {
            writeln!(
                svg,
                r#"<g class="{}" data-table="{}">"#,
                class,
                escape_xml(node.id.as_str())
            )
            .unwrap();
        }

        writeln!(
            svg,
            r#"<rect class="entity-bg" x="{}" y="{}" width="{}" height="{}" rx="4" />"#,
            x, y, w, h
        )
        .unwrap();

        let header_fill = view
            .tag
            .map(|t| format!(r#" style="fill: {}""#, t.hex()))
            .unwrap_or_default();
        writeln!(
            svg,
            r#"<rect class="entity-header" x="{}" y="{}" width="{}" height="{}" rx="4"{} />"#,
            x, y, w, header_h, header_fill
        )
        .unwrap();

        let star = if view.favorite { "★ " } else { "" };
        let title = if node.tier == DetailTier::Low {
            view.name.clone()
        } else {
            format!("{}.{}", view.schema, view.name)
        };
        let title = self
            .metrics
            .fit(&format!("{}{}", star, title), w - self.metrics.padding_x * 2.0);
        writeln!(
            svg,
            r#"<text class="entity-name" x="{}" y="{}" text-anchor="middle">{}</text>"#,
            x + w / 2.0,
            y + header_h / 2.0 + 5.0,
            escape_xml(&title)
        )
        .unwrap();

        if !view.columns.is_empty() {
            writeln!(
                svg,
                r##"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="#333" stroke-width="1" />"##,
                x,
                y + header_h,
                x + w,
                y + header_h
            )
            .unwrap();
        }

        for (slot, col) in view.columns.iter().enumerate() {
            let row_y = y + header_h + slot as f64 * self.node.row_height;
            let highlight = if col.selected {
                Some("column-selected")
            } else if col.hovered {
                Some("column-hovered")
            } else {
                None
            };
            if let Some(highlight) = highlight {
                writeln!(
                    svg,
                    r#"<rect class="{}" x="{}" y="{}" width="{}" height="{}" />"#,
                    highlight, x, row_y, w, self.node.row_height
                )
                .unwrap();
            }
            if let Some(tag) = col.tag {
                writeln!(
                    svg,
                    r#"<circle cx="{}" cy="{}" r="3" fill="{}" />"#,
                    x + w - self.metrics.padding_x / 2.0 - 3.0,
                    row_y + self.node.row_height / 2.0,
                    tag.hex()
                )
                .unwrap();
            }

            let mut class = "column-text".to_string();
            if col.is_primary_key {
                class.push_str(" pk");
            }
            if col.is_foreign_key {
                class.push_str(" fk");
            }
            let prefix = if col.is_primary_key { "◆ " } else { "  " };
            let text = self.metrics.fit(
                &format!("{}{}: {}", prefix, col.name, col.typ),
                w - self.metrics.padding_x * 2.0,
            );
            writeln!(
                svg,
                r#"<text class="{}" x="{}" y="{}">{}</text>"#,
                class,
                x + self.metrics.padding_x,
                row_y + self.node.row_height / 2.0 + 4.0,
                escape_xml(&text)
            )
            .unwrap();
        }

        // Border on top
        writeln!(
            svg,
            r#"<rect class="entity-border" x="{}" y="{}" width="{}" height="{}" rx="4" />"#,
            x, y, w, h
        )
        .unwrap();
        writeln!(svg, "</g>").unwrap();
    }

    fn render_edge(&self, svg: &mut String, edge: &RoutedEdge) {
        let mut class = "edge".to_string();
        for (on, name) in [
            (edge.is_virtual, " virtual"),
            (edge.highlighted, " highlighted"),
            (edge.selected, " selected"),
            (edge.on_path, " on-path"),
        ] {
            if on {
                class.push_str(name);
            }
        }
        if edge.path.shape == EdgeShape::Line {
            class.push_str(" simplified");
        }
        let d = edge.path.to_svg_d();

        writeln!(
            svg,
            r#"<path class="{}" d="{}" stroke-width="{}" />"#,
            class, d, edge.path.stroke_width
        )
        .unwrap();
        // Wide transparent stroke for pointer hits
        writeln!(
            svg,
            r#"<path class="edge-hit" d="{}" stroke-width="{}" data-edge="{}" />"#,
            d, self.hit_stroke_width, edge.key.0
        )
        .unwrap();
    }

    fn render_minimap(&self, svg: &mut String, minimap: &MinimapFrame, screen: Size) {
        let x = screen.width - minimap.size.width - MINIMAP_MARGIN;
        let y = screen.height - minimap.size.height - MINIMAP_MARGIN;
        writeln!(
            svg,
            r#"<g class="minimap" {}="true" transform="translate({} {})">"#,
            EXPORT_IGNORE_ATTR, x, y
        )
        .unwrap();
        writeln!(
            svg,
            r#"<rect class="minimap-bg" x="0" y="0" width="{}" height="{}" />"#,
            minimap.size.width, minimap.size.height
        )
        .unwrap();
        for node in &minimap.nodes {
            writeln!(
                svg,
                r#"<rect class="minimap-node" x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" />"#,
                node.rect.x, node.rect.y, node.rect.width, node.rect.height
            )
            .unwrap();
        }
        let v = &minimap.viewport;
        writeln!(
            svg,
            r#"<rect class="minimap-viewport" x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" />"#,
            v.x, v.y, v.width, v.height
        )
        .unwrap();
        writeln!(svg, "</g>").unwrap();
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
