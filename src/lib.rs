pub mod config;
pub mod ddl;
pub mod diagram;
pub mod filter;
pub mod graph;
pub mod interaction;
pub mod layout;
pub mod measure;
pub mod minimap;
pub mod pathfind;
pub mod persist;
pub mod routing;
pub mod schema;
pub mod svg;
pub mod viewport;
pub mod visibility;

pub use config::EngineConfig;
pub use diagram::{Diagram, ExportError, ImageExporter, PathStatus, RenderFrame};
pub use schema::{Column, Schema, Table, TableId};

use chrono::{DateTime, Utc};
use wasm_bindgen::prelude::*;

use interaction::{ColorTag, Key, Millis, PointerButton};
use schema::ColumnRef;
use svg::SvgRenderer;
use viewport::{Point, Size};

/// Install the panic hook and the console tracing layer in the browser.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    {
        console_error_panic_hook::set_once();
        tracing_wasm::set_as_global_default();
    }
}

fn load(schema_json: &str, config_json: Option<String>) -> Result<Diagram, String> {
    let schema = Schema::from_json(schema_json).map_err(|e| e.to_string())?;
    let config = match config_json.as_deref() {
        Some(input) => EngineConfig::from_json(input).map_err(|e| e.to_string())?,
        None => EngineConfig::default(),
    };
    Ok(Diagram::new(schema, config))
}

/// Render a schema once, fitted to the default screen.
#[wasm_bindgen(js_name = "schemaToSvg")]
pub fn render_schema(schema_json: &str, config_json: Option<String>) -> Result<String, String> {
    let mut diagram = load(schema_json, config_json)?;
    diagram.fit_view();
    let svg = SvgRenderer::from_config(diagram.config()).render(&diagram.frame(0));
    Ok(svg)
}

#[cfg(target_arch = "wasm32")]
fn now() -> Millis {
    js_sys::Date::now() as Millis
}

#[cfg(not(target_arch = "wasm32"))]
fn now() -> Millis {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as Millis)
        .unwrap_or(0)
}

fn parse_tag(tag: Option<String>) -> Result<Option<ColorTag>, String> {
    match tag.as_deref() {
        None | Some("") => Ok(None),
        Some(name) => ColorTag::from_str(name)
            .map(Some)
            .ok_or_else(|| format!("Unknown color tag: {}", name)),
    }
}

fn parse_key(key: &str) -> Option<Key> {
    match key {
        "Escape" => Some(Key::Escape),
        "+" | "=" => Some(Key::ZoomIn),
        "-" => Some(Key::ZoomOut),
        "0" => Some(Key::ResetView),
        "f" | "F" => Some(Key::FitView),
        _ => None,
    }
}

/// Interactive diagram bound to a browser canvas element.
#[wasm_bindgen]
pub struct ErdCanvas {
    diagram: Diagram,
    renderer: SvgRenderer,
}

#[wasm_bindgen]
impl ErdCanvas {
    #[wasm_bindgen(constructor)]
    pub fn new(schema_json: &str, config_json: Option<String>) -> Result<ErdCanvas, String> {
        let diagram = load(schema_json, config_json)?;
        let renderer = SvgRenderer::from_config(diagram.config());
        Ok(Self { diagram, renderer })
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.diagram.resize(Size::new(width, height));
    }

    /// SVG markup for the current frame.
    pub fn render(&mut self) -> String {
        let now = now();
        self.diagram.tick(now);
        self.renderer.render(&self.diagram.frame(now))
    }

    /// `button` follows `MouseEvent.button`: 2 is the secondary button.
    #[wasm_bindgen(js_name = "pointerDown")]
    pub fn pointer_down(&mut self, x: f64, y: f64, button: u32) {
        let button = if button == 2 {
            PointerButton::Secondary
        } else {
            PointerButton::Primary
        };
        self.diagram.pointer_down(Point::new(x, y), button, now());
    }

    #[wasm_bindgen(js_name = "pointerMove")]
    pub fn pointer_move(&mut self, x: f64, y: f64) {
        self.diagram.pointer_move(Point::new(x, y), now());
    }

    #[wasm_bindgen(js_name = "pointerUp")]
    pub fn pointer_up(&mut self) {
        self.diagram.pointer_up();
    }

    pub fn wheel(&mut self, x: f64, y: f64, delta: f64) {
        self.diagram.wheel(Point::new(x, y), delta, now());
    }

    #[wasm_bindgen(js_name = "doubleClick")]
    pub fn double_click(&mut self, x: f64, y: f64) {
        self.diagram.double_click(Point::new(x, y), now());
    }

    /// Returns false for keys the diagram does not handle.
    #[wasm_bindgen(js_name = "keyDown")]
    pub fn key_down(&mut self, key: &str) -> bool {
        parse_key(key).is_some_and(|key| self.diagram.key_down(key))
    }

    #[wasm_bindgen(js_name = "fitView")]
    pub fn fit_view(&mut self) {
        self.diagram.fit_view();
    }

    pub fn reset(&mut self) {
        self.diagram.reset();
    }

    #[wasm_bindgen(js_name = "navigateMinimap")]
    pub fn navigate_minimap(&mut self, x: f64, y: f64) -> bool {
        self.diagram.navigate_minimap(Point::new(x, y))
    }

    #[wasm_bindgen(js_name = "focusTable")]
    pub fn focus_table(&mut self, table: &str) -> bool {
        self.diagram.focus_table(table)
    }

    pub fn search(&mut self, text: &str) {
        self.diagram.search_input(text, now());
    }

    #[wasm_bindgen(js_name = "applyFilter")]
    pub fn apply_filter(&mut self) {
        self.diagram.flush_filter();
    }

    #[wasm_bindgen(js_name = "setTagFilter")]
    pub fn set_tag_filter(&mut self, tag: Option<String>) -> Result<(), String> {
        self.diagram.set_tag_filter(parse_tag(tag)?);
        Ok(())
    }

    #[wasm_bindgen(js_name = "setFavoritesOnly")]
    pub fn set_favorites_only(&mut self, on: bool) {
        self.diagram.set_favorites_only(on);
    }

    #[wasm_bindgen(js_name = "clearFilter")]
    pub fn clear_filter(&mut self) {
        self.diagram.clear_filter();
    }

    #[wasm_bindgen(js_name = "tagTable")]
    pub fn tag_table(&mut self, table: &str, tag: Option<String>) -> Result<(), String> {
        self.diagram.tag_table(table, parse_tag(tag)?);
        Ok(())
    }

    #[wasm_bindgen(js_name = "tagColumn")]
    pub fn tag_column(&mut self, table: &str, column: &str, tag: Option<String>) -> Result<(), String> {
        let column = ColumnRef::new(TableId::from(table), column);
        self.diagram.tag_column(column, parse_tag(tag)?);
        Ok(())
    }

    #[wasm_bindgen(js_name = "clearTags")]
    pub fn clear_tags(&mut self) {
        self.diagram.clear_tags();
    }

    #[wasm_bindgen(js_name = "toggleFavorite")]
    pub fn toggle_favorite(&mut self, table: &str) -> bool {
        self.diagram.toggle_favorite(table)
    }

    #[wasm_bindgen(js_name = "setPathMode")]
    pub fn set_path_mode(&mut self, on: bool) {
        self.diagram.set_path_mode(on);
    }

    /// JSON array of table ids; empty when there is no connection.
    #[wasm_bindgen(js_name = "shortestPath")]
    pub fn shortest_path(&self, from: &str, to: &str) -> Result<String, String> {
        serde_json::to_string(&self.diagram.shortest_path(from, to)).map_err(|e| e.to_string())
    }

    pub fn ddl(&self, table: &str) -> Option<String> {
        self.diagram.ddl(table)
    }

    #[wasm_bindgen(js_name = "exportLayout")]
    pub fn export_layout(&self) -> Result<String, String> {
        let timestamp = DateTime::<Utc>::from_timestamp_millis(now() as i64).unwrap_or_default();
        self.diagram
            .export_layout(timestamp)
            .map_err(|e| e.to_string())
    }

    /// Returns the number of table positions applied.
    #[wasm_bindgen(js_name = "importLayout")]
    pub fn import_layout(&mut self, json: &str) -> Result<usize, String> {
        self.diagram.import_layout(json).map_err(|e| e.to_string())
    }

    /// Pending events as a JSON array, e.g. `{"type":"viewSource","table":"public.users"}`.
    #[wasm_bindgen(js_name = "takeEvents")]
    pub fn take_events(&mut self) -> Result<String, String> {
        serde_json::to_string(&self.diagram.take_events()).map_err(|e| e.to_string())
    }
}
