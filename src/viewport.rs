//! Pan/zoom transform between screen space and world space.
//!
//! `screen = world * scale + pan`. The scale is kept inside
//! [`MIN_SCALE`, `MAX_SCALE`] by every mutation.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Sub};

pub const MIN_SCALE: f64 = 0.05;
pub const MAX_SCALE: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        let d = self - other;
        (d.x * d.x + d.y * d.y).sqrt()
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;
    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f64> for Point {
    type Output = Point;
    fn div(self, rhs: f64) -> Point {
        Point::new(self.x / rhs, self.y / rhs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }
}

impl Default for Size {
    fn default() -> Self {
        Self::new(1280.0, 800.0)
    }
}

/// Axis-aligned rectangle, `x`/`y` at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_points(a: Point, b: Point) -> Self {
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Self::new(x, y, (a.x - b.x).abs(), (a.y - b.y).abs())
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn expand(&self, amount: f64) -> Rect {
        Rect::new(
            self.x - amount,
            self.y - amount,
            self.width + amount * 2.0,
            self.height + amount * 2.0,
        )
    }

    pub fn scaled_about_center(&self, factor: f64) -> Rect {
        let c = self.center();
        let (w, h) = (self.width * factor, self.height * factor);
        Rect::new(c.x - w / 2.0, c.y - h / 2.0, w, h)
    }

    /// Closed intersection test: touching edges count as intersecting.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x <= other.right()
            && other.x <= self.right()
            && self.y <= other.bottom()
            && other.y <= self.bottom()
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(x, y, right - x, bottom - y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub pan: Point,
    scale: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            pan: Point::default(),
            scale: 1.0,
        }
    }
}

impl Viewport {
    pub fn new(pan: Point, scale: f64) -> Self {
        Self {
            pan,
            scale: clamp_scale(scale),
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: f64) {
        self.scale = clamp_scale(scale);
    }

    pub fn screen_to_world(&self, p: Point) -> Point {
        (p - self.pan) / self.scale
    }

    pub fn world_to_screen(&self, p: Point) -> Point {
        p * self.scale + self.pan
    }

    pub fn pan_by(&mut self, screen_delta: Point) {
        self.pan = self.pan + screen_delta;
    }

    /// Set the scale, keeping the world point under `anchor` fixed on screen.
    /// Without an anchor the zoom is about the screen origin.
    pub fn zoom_to(&mut self, scale: f64, anchor: Option<Point>) {
        let scale = clamp_scale(scale);
        match anchor {
            Some(anchor) => {
                let world = self.screen_to_world(anchor);
                self.scale = scale;
                self.pan = anchor - world * scale;
            }
            None => self.scale = scale,
        }
    }

    /// `scale' = clamp(scale - delta * sensitivity)`.
    pub fn zoom_by_wheel(&mut self, delta: f64, sensitivity: f64, anchor: Option<Point>) {
        if !delta.is_finite() {
            return;
        }
        self.zoom_to(self.scale - delta * sensitivity, anchor);
    }

    pub fn zoom_step(&mut self, step: f64, anchor: Option<Point>) {
        self.zoom_to(self.scale + step, anchor);
    }

    /// World-space rectangle currently covered by a screen of `screen` size.
    pub fn visible_world_rect(&self, screen: Size) -> Rect {
        let top_left = self.screen_to_world(Point::new(0.0, 0.0));
        let bottom_right = self.screen_to_world(Point::new(screen.width, screen.height));
        Rect::from_points(top_left, bottom_right)
    }

    /// Move the pan so `world` lands in the middle of the screen.
    pub fn center_on(&mut self, world: Point, screen: Size) {
        self.pan = screen.center() - world * self.scale;
    }

    /// Scale and center so `bounds` fits inside the screen minus `padding`.
    pub fn fit_bounds(&mut self, bounds: Rect, screen: Size, padding: f64) {
        let avail_w = (screen.width - padding * 2.0).max(1.0);
        let avail_h = (screen.height - padding * 2.0).max(1.0);
        let scale = if bounds.width <= 0.0 || bounds.height <= 0.0 {
            1.0
        } else {
            (avail_w / bounds.width).min(avail_h / bounds.height)
        };
        self.scale = clamp_scale(scale);
        self.center_on(bounds.center(), screen);
    }
}

fn clamp_scale(scale: f64) -> f64 {
    if scale.is_nan() {
        return 1.0;
    }
    scale.clamp(MIN_SCALE, MAX_SCALE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
    }

    #[test]
    fn test_transform_roundtrip() {
        let vp = Viewport::new(Point::new(120.0, -40.0), 0.5);
        let world = Point::new(300.0, 75.0);
        let screen = vp.world_to_screen(world);
        assert!(close(screen, Point::new(270.0, -2.5)));
        assert!(close(vp.screen_to_world(screen), world));
    }

    #[test]
    fn test_wheel_zoom_clamps() {
        let mut vp = Viewport::default();
        vp.zoom_by_wheel(-1_000_000.0, 0.001, None);
        assert_eq!(vp.scale(), MAX_SCALE);
        vp.zoom_by_wheel(1_000_000.0, 0.001, None);
        assert_eq!(vp.scale(), MIN_SCALE);
    }

    #[test]
    fn test_wheel_zoom_keeps_anchor_fixed() {
        let mut vp = Viewport::new(Point::new(10.0, 20.0), 1.0);
        let anchor = Point::new(400.0, 300.0);
        let before = vp.screen_to_world(anchor);
        vp.zoom_by_wheel(250.0, 0.001, Some(anchor));
        assert!((vp.scale() - 0.75).abs() < 1e-12);
        assert!(close(vp.screen_to_world(anchor), before));
    }

    #[test]
    fn test_pan_is_unscaled() {
        let mut vp = Viewport::new(Point::default(), 0.25);
        vp.pan_by(Point::new(30.0, -10.0));
        assert_eq!(vp.pan, Point::new(30.0, -10.0));
    }

    #[test]
    fn test_fit_bounds_centers_content() {
        let mut vp = Viewport::default();
        let bounds = Rect::new(0.0, 0.0, 2000.0, 1000.0);
        let screen = Size::new(1000.0, 600.0);
        vp.fit_bounds(bounds, screen, 0.0);
        assert_eq!(vp.scale(), 0.5);
        assert!(close(vp.world_to_screen(bounds.center()), screen.center()));
    }

    #[test]
    fn test_nan_scale_is_ignored() {
        let mut vp = Viewport::default();
        vp.set_scale(f64::NAN);
        assert_eq!(vp.scale(), 1.0);
        vp.zoom_by_wheel(f64::NAN, 0.001, None);
        assert_eq!(vp.scale(), 1.0);
    }
}
