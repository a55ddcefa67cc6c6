use serde::Deserialize;
use unicode_width::UnicodeWidthChar;
use unicode_width::UnicodeWidthStr;

/// Fixed node geometry shared by layout, visibility, routing and hit testing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NodeMetrics {
    pub width: f64,
    pub header_height: f64,
    pub row_height: f64,
    /// Maximum number of column rows a node ever displays.
    pub column_cap: usize,
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self {
            width: 260.0,
            header_height: 44.0,
            row_height: 26.0,
            column_cap: 12,
        }
    }
}

impl NodeMetrics {
    pub fn height_for_rows(&self, rows: usize) -> f64 {
        self.header_height + rows.min(self.column_cap) as f64 * self.row_height
    }

    /// Height used by the layout engine: every column, capped.
    pub fn full_height(&self, column_count: usize) -> f64 {
        self.height_for_rows(column_count)
    }

    /// Vertical center of the `row`-th displayed row, relative to the node top.
    pub fn row_center(&self, row: usize) -> f64 {
        self.header_height + row as f64 * self.row_height + self.row_height / 2.0
    }

    pub fn header_center(&self) -> f64 {
        self.header_height / 2.0
    }
}

pub struct TextMetrics {
    pub char_width: f64,
    pub padding_x: f64,
}

impl Default for TextMetrics {
    fn default() -> Self {
        Self {
            char_width: 7.5,
            padding_x: 12.0,
        }
    }
}

impl TextMetrics {
    pub fn text_width(&self, text: &str) -> f64 {
        let width = UnicodeWidthStr::width(text);
        width as f64 * self.char_width
    }

    /// Truncate `text` with an ellipsis so it fits in `max_width` pixels.
    pub fn fit(&self, text: &str, max_width: f64) -> String {
        if self.text_width(text) <= max_width {
            return text.to_string();
        }
        let budget = ((max_width / self.char_width).floor() as usize).saturating_sub(1);
        let mut out = String::new();
        let mut used = 0;
        for ch in text.chars() {
            let w = UnicodeWidthChar::width(ch).unwrap_or(0);
            if used + w > budget {
                break;
            }
            used += w;
            out.push(ch);
        }
        out.push('…');
        out
    }
}
