//! Strongly-typed primitives shared by every item: integer pixel geometry,
//! colours, pens, brushes and fonts.
//!
//! Pixel rectangles use inclusive right/bottom edges: a rect at `x = 10` with
//! `width = 5` covers columns 10 through 14.

use std::fmt;
use std::ops::{Add, Neg, Sub};

use glam::DVec2;

/// Coordinate value meaning "not specified".
pub const DEFAULT_COORD: i32 = -1;

/// Error type for invalid numeric values
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericError {
    /// Value is NaN
    NaN,
    /// Value is infinite
    Infinite,
    /// Value is zero when non-zero required
    Zero,
    /// Value is negative when positive required
    Negative,
}

impl fmt::Display for NumericError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericError::NaN => write!(f, "value is NaN"),
            NumericError::Infinite => write!(f, "value is infinite"),
            NumericError::Zero => write!(f, "value is zero"),
            NumericError::Negative => write!(f, "value is negative"),
        }
    }
}

impl std::error::Error for NumericError {}

/// Validate a factor that must be finite and strictly positive
/// (scaling, DPI scale factor, zoom multipliers).
#[inline]
pub fn positive_finite(val: f64) -> Result<f64, NumericError> {
    if val.is_nan() {
        Err(NumericError::NaN)
    } else if val.is_infinite() {
        Err(NumericError::Infinite)
    } else if val == 0.0 {
        Err(NumericError::Zero)
    } else if val < 0.0 {
        Err(NumericError::Negative)
    } else {
        Ok(val)
    }
}

// ============================================================================
// Points and sizes
// ============================================================================

/// Generic 2D point
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash)]
pub struct Point<T> {
    pub x: T,
    pub y: T,
}

impl<T> Point<T> {
    pub const fn new(x: T, y: T) -> Self {
        Self { x, y }
    }
}

/// Integer pixel point
pub type Pt = Point<i32>;

impl Point<i32> {
    /// A point with neither coordinate specified.
    pub const UNSET: Pt = Point::new(DEFAULT_COORD, DEFAULT_COORD);

    /// Both coordinates have been given real values.
    #[inline]
    pub fn is_fully_specified(self) -> bool {
        self.x != DEFAULT_COORD && self.y != DEFAULT_COORD
    }

    #[inline]
    pub fn to_dvec2(self) -> DVec2 {
        DVec2::new(f64::from(self.x), f64::from(self.y))
    }

    /// Round a float vector to the nearest pixel.
    #[inline]
    pub fn from_dvec2(v: DVec2) -> Pt {
        Pt::new(v.x.round() as i32, v.y.round() as i32)
    }
}

impl Add for Pt {
    type Output = Pt;
    fn add(self, rhs: Pt) -> Pt {
        Pt::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Pt {
    type Output = Pt;
    fn sub(self, rhs: Pt) -> Pt {
        Pt::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Pt {
    type Output = Pt;
    fn neg(self) -> Pt {
        Pt::new(-self.x, -self.y)
    }
}

/// Generic 2D size
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash)]
pub struct Size<T> {
    pub width: T,
    pub height: T,
}

impl<T> Size<T> {
    pub const fn new(width: T, height: T) -> Self {
        Self { width, height }
    }
}

impl Size<u32> {
    #[inline]
    pub fn to_f64(self) -> Size<f64> {
        Size::new(f64::from(self.width), f64::from(self.height))
    }
}

impl Size<i32> {
    #[inline]
    pub fn is_empty(self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    #[inline]
    pub fn to_f64(self) -> Size<f64> {
        Size::new(f64::from(self.width), f64::from(self.height))
    }

    /// Component-wise maximum
    #[inline]
    pub fn max(self, other: Size<i32>) -> Size<i32> {
        Size::new(self.width.max(other.width), self.height.max(other.height))
    }
}

impl Size<f64> {
    /// Round each dimension up to the next whole pixel.
    #[inline]
    pub fn ceil(self) -> Size<i32> {
        Size::new(self.width.ceil() as i32, self.height.ceil() as i32)
    }

    /// Round each dimension to the nearest whole pixel.
    #[inline]
    pub fn round(self) -> Size<i32> {
        Size::new(self.width.round() as i32, self.height.round() as i32)
    }
}

// ============================================================================
// Rect
// ============================================================================

/// Integer pixel rectangle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const EMPTY: Rect = Rect::new(0, 0, 0, 0);

    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub const fn from_point_size(pt: Pt, size: Size<i32>) -> Self {
        Self::new(pt.x, pt.y, size.width, size.height)
    }

    /// Rectangle spanning both corners, inclusive of each.
    pub fn from_corners(a: Pt, b: Pt) -> Self {
        let left = a.x.min(b.x);
        let top = a.y.min(b.y);
        let right = a.x.max(b.x);
        let bottom = a.y.max(b.y);
        Self::new(left, top, right - left + 1, bottom - top + 1)
    }

    #[inline]
    pub fn left(&self) -> i32 {
        self.x
    }

    #[inline]
    pub fn top(&self) -> i32 {
        self.y
    }

    #[inline]
    pub fn right(&self) -> i32 {
        self.x + self.width - 1
    }

    #[inline]
    pub fn bottom(&self) -> i32 {
        self.y + self.height - 1
    }

    #[inline]
    pub fn top_left(&self) -> Pt {
        Pt::new(self.left(), self.top())
    }

    #[inline]
    pub fn top_right(&self) -> Pt {
        Pt::new(self.right(), self.top())
    }

    #[inline]
    pub fn bottom_left(&self) -> Pt {
        Pt::new(self.left(), self.bottom())
    }

    #[inline]
    pub fn bottom_right(&self) -> Pt {
        Pt::new(self.right(), self.bottom())
    }

    #[inline]
    pub fn size(&self) -> Size<i32> {
        Size::new(self.width, self.height)
    }

    #[inline]
    pub fn center(&self) -> Pt {
        Pt::new(self.x + self.width / 2, self.y + self.height / 2)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    #[inline]
    pub fn contains(&self, pt: Pt) -> bool {
        pt.x >= self.left() && pt.x <= self.right() && pt.y >= self.top() && pt.y <= self.bottom()
    }

    #[inline]
    pub fn contains_rect(&self, other: &Rect) -> bool {
        self.contains(other.top_left()) && self.contains(other.bottom_right())
    }

    /// Smallest rectangle containing both; an empty side is ignored.
    pub fn union(&self, other: &Rect) -> Rect {
        if other.is_empty() {
            return *self;
        }
        if self.is_empty() {
            return *other;
        }
        let left = self.left().min(other.left());
        let top = self.top().min(other.top());
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(left, top, right - left + 1, bottom - top + 1)
    }

    /// Overlapping area, or an empty rect when disjoint.
    pub fn intersect(&self, other: &Rect) -> Rect {
        let left = self.left().max(other.left());
        let top = self.top().max(other.top());
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right < left || bottom < top {
            return Rect::EMPTY;
        }
        Rect::new(left, top, right - left + 1, bottom - top + 1)
    }

    #[inline]
    pub fn offset(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Grow by `dx`/`dy` on every side (negative values shrink).
    #[inline]
    pub fn inflate(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(self.x - dx, self.y - dy, self.width + 2 * dx, self.height + 2 * dy)
    }

    #[inline]
    pub fn deflate(&self, dx: i32, dy: i32) -> Rect {
        self.inflate(-dx, -dy)
    }

    /// Same size, centred inside `outer`.
    pub fn center_in(&self, outer: &Rect) -> Rect {
        Rect::new(
            outer.x + (outer.width - self.width) / 2,
            outer.y + (outer.height - self.height) / 2,
            self.width,
            self.height,
        )
    }

    pub fn set_left(&mut self, left: i32) {
        let right = self.right();
        self.x = left;
        self.width = right - left + 1;
    }

    pub fn set_top(&mut self, top: i32) {
        let bottom = self.bottom();
        self.y = top;
        self.height = bottom - top + 1;
    }

    pub fn set_right(&mut self, right: i32) {
        self.width = right - self.x + 1;
    }

    pub fn set_bottom(&mut self, bottom: i32) {
        self.height = bottom - self.y + 1;
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}) {}x{}", self.x, self.y, self.width, self.height)
    }
}

// ============================================================================
// Colours, pens, brushes, fonts
// ============================================================================

/// RGBA colour
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 128, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const LIGHT_GREY: Color = Color::rgb(211, 211, 211);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    #[inline]
    pub fn is_opaque(self) -> bool {
        self.a == 255
    }

    /// Alpha as a 0..=1 fraction (for SVG `*-opacity` attributes).
    #[inline]
    pub fn opacity(self) -> f64 {
        f64::from(self.a) / 255.0
    }

    pub fn to_rgba_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({},{},{})", self.r, self.g, self.b)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash)]
pub enum PenStyle {
    #[default]
    Solid,
    Dot,
    ShortDash,
    LongDash,
    Transparent,
}

/// Outline pen; `width` is in DIPs until scaled by the owning item.
#[derive(Clone, Debug, PartialEq)]
pub struct Pen {
    pub color: Color,
    pub width: f64,
    pub style: PenStyle,
}

impl Pen {
    pub fn new(color: Color) -> Self {
        Self {
            color,
            width: 1.0,
            style: PenStyle::Solid,
        }
    }

    pub fn transparent() -> Self {
        Self {
            color: Color::TRANSPARENT,
            width: 1.0,
            style: PenStyle::Transparent,
        }
    }

    pub fn with_width(mut self, width: f64) -> Self {
        self.width = width;
        self
    }

    pub fn with_style(mut self, style: PenStyle) -> Self {
        self.style = style;
        self
    }

    #[inline]
    pub fn is_transparent(&self) -> bool {
        self.style == PenStyle::Transparent || self.color.a == 0
    }
}

impl Default for Pen {
    fn default() -> Self {
        Pen::new(Color::BLACK)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash)]
pub enum BrushStyle {
    #[default]
    Solid,
    Transparent,
}

/// Fill brush
#[derive(Clone, Debug, PartialEq)]
pub struct Brush {
    pub color: Color,
    pub style: BrushStyle,
}

impl Brush {
    pub fn solid(color: Color) -> Self {
        Self {
            color,
            style: BrushStyle::Solid,
        }
    }

    pub fn transparent() -> Self {
        Self {
            color: Color::TRANSPARENT,
            style: BrushStyle::Transparent,
        }
    }

    #[inline]
    pub fn is_transparent(&self) -> bool {
        self.style == BrushStyle::Transparent || self.color.a == 0
    }
}

impl Default for Brush {
    fn default() -> Self {
        Brush::solid(Color::WHITE)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash)]
pub enum FontFamily {
    #[default]
    Default,
    Swiss,
    Roman,
    /// Fixed-width face, used for letter-per-line vertical titles.
    Modern,
}

impl FontFamily {
    pub fn css_name(self) -> &'static str {
        match self {
            FontFamily::Default | FontFamily::Swiss => "sans-serif",
            FontFamily::Roman => "serif",
            FontFamily::Modern => "monospace",
        }
    }
}

/// Text font. Point sizes are never DPI-scaled by items; the host does that.
#[derive(Clone, Debug, PartialEq)]
pub struct Font {
    pub point_size: f64,
    pub face_name: Option<String>,
    pub bold: bool,
    pub family: FontFamily,
}

impl Font {
    pub const DEFAULT_POINT_SIZE: f64 = 10.0;

    pub fn new(point_size: f64) -> Self {
        Self {
            point_size,
            ..Default::default()
        }
    }

    pub fn with_bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    pub fn with_family(mut self, family: FontFamily) -> Self {
        self.family = family;
        self
    }

    pub fn with_face_name(mut self, face: impl Into<String>) -> Self {
        self.face_name = Some(face.into());
        self
    }

    /// Copy with the point size multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Font {
        Font {
            point_size: self.point_size * factor,
            ..self.clone()
        }
    }
}

impl Default for Font {
    fn default() -> Self {
        Self {
            point_size: Self::DEFAULT_POINT_SIZE,
            face_name: None,
            bold: false,
            family: FontFamily::Default,
        }
    }
}

/// Direction a linear gradient runs, from the first colour to the second
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash)]
pub enum FillDirection {
    North,
    #[default]
    South,
    East,
    West,
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Numeric validation tests ====================

    #[test]
    fn positive_finite_accepts_positive() {
        assert_eq!(positive_finite(1.5), Ok(1.5));
    }

    #[test]
    fn positive_finite_rejects_bad_values() {
        assert_eq!(positive_finite(f64::NAN), Err(NumericError::NaN));
        assert_eq!(positive_finite(f64::INFINITY), Err(NumericError::Infinite));
        assert_eq!(positive_finite(0.0), Err(NumericError::Zero));
        assert_eq!(positive_finite(-2.0), Err(NumericError::Negative));
    }

    // ==================== Point tests ====================

    #[test]
    fn unset_point_is_not_specified() {
        assert!(!Pt::UNSET.is_fully_specified());
        assert!(!Pt::new(3, DEFAULT_COORD).is_fully_specified());
        assert!(Pt::new(0, 0).is_fully_specified());
    }

    #[test]
    fn point_arithmetic() {
        assert_eq!(Pt::new(3, 4) + Pt::new(1, 1), Pt::new(4, 5));
        assert_eq!(Pt::new(3, 4) - Pt::new(1, 1), Pt::new(2, 3));
        assert_eq!(-Pt::new(3, -4), Pt::new(-3, 4));
    }

    // ==================== Rect tests ====================

    #[test]
    fn rect_edges_are_inclusive() {
        let r = Rect::new(10, 20, 5, 3);
        assert_eq!(r.right(), 14);
        assert_eq!(r.bottom(), 22);
        assert!(r.contains(Pt::new(14, 22)));
        assert!(!r.contains(Pt::new(15, 22)));
    }

    #[test]
    fn rect_from_corners_spans_both_points() {
        let r = Rect::from_corners(Pt::new(5, 9), Pt::new(1, 2));
        assert_eq!(r, Rect::new(1, 2, 5, 8));
        assert_eq!(r.bottom_right(), Pt::new(5, 9));
    }

    #[test]
    fn rect_union_ignores_empty() {
        let a = Rect::new(0, 0, 10, 10);
        assert_eq!(a.union(&Rect::EMPTY), a);
        assert_eq!(Rect::EMPTY.union(&a), a);
        assert_eq!(a.union(&Rect::new(20, 5, 5, 10)), Rect::new(0, 0, 25, 15));
    }

    #[test]
    fn rect_intersect_disjoint_is_empty() {
        let a = Rect::new(0, 0, 10, 10);
        assert!(a.intersect(&Rect::new(50, 50, 5, 5)).is_empty());
        assert_eq!(a.intersect(&Rect::new(5, 5, 10, 10)), Rect::new(5, 5, 5, 5));
    }

    #[test]
    fn rect_center_in() {
        let inner = Rect::new(0, 0, 10, 4);
        assert_eq!(inner.center_in(&Rect::new(100, 100, 20, 20)), Rect::new(105, 108, 10, 4));
    }

    #[test]
    fn rect_set_left_keeps_right_edge() {
        let mut r = Rect::new(0, 0, 10, 10);
        r.set_left(4);
        assert_eq!(r.right(), 9);
        assert_eq!(r.width, 6);
        r.set_bottom(4);
        assert_eq!(r.height, 5);
    }

    // ==================== Colour and font tests ====================

    #[test]
    fn color_display_is_css_rgb() {
        assert_eq!(Color::rgba(84, 84, 84, 175).to_string(), "rgb(84,84,84)");
        assert!((Color::rgba(0, 0, 0, 51).opacity() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn font_scaled_keeps_face() {
        let f = Font::new(10.0).with_bold(true).scaled(2.0);
        assert_eq!(f.point_size, 20.0);
        assert!(f.bold);
    }

    #[test]
    fn transparent_pen_and_brush() {
        assert!(Pen::transparent().is_transparent());
        assert!(!Pen::default().is_transparent());
        assert!(Brush::transparent().is_transparent());
    }
}
