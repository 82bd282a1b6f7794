//! Drawing surface abstraction.
//!
//! Items never talk to a concrete backend. They draw through [`DrawSurface`],
//! which any raster canvas, SVG serialiser or recorder can implement. Pen,
//! brush, font and text colour are surface state; the scoped changers below
//! swap one piece of state and put the previous value back when dropped, on
//! every exit path.

pub mod recording;
pub mod svg;

use std::ops::{Deref, DerefMut};

use image::RgbaImage;

use crate::math::safe_divide;
use crate::types::{Brush, Color, FillDirection, Font, Pen, Pt, Rect, Size};

pub use recording::{DrawCommand, RecordingDc};
pub use svg::SvgDc;

/// Fixed-ratio text metrics used by the bundled backends.
///
/// Ratios are fractions of the font's pixel size (point size times the
/// surface DPI factor).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextMetrics {
    pub char_width: f64,
    pub line_height: f64,
    /// Width multiplier for bold faces.
    pub bold_factor: f64,
}

impl Default for TextMetrics {
    fn default() -> Self {
        Self {
            char_width: 0.5,
            line_height: 1.2,
            bold_factor: 1.1,
        }
    }
}

impl TextMetrics {
    /// Extent of a single line of text.
    pub fn extent(&self, text: &str, font: &Font, dpi_scale_factor: f64) -> Size<i32> {
        let px = font.point_size * dpi_scale_factor;
        let weight = if font.bold { self.bold_factor } else { 1.0 };
        let chars = text.chars().count() as f64;
        Size::new(
            (chars * px * self.char_width * weight).ceil() as i32,
            (px * self.line_height).ceil() as i32,
        )
    }
}

/// Split text into lines on `\n`, `\r\n` or a lone `\r`, keeping empty lines.
pub fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                lines.push(&text[start..i]);
                start = i + 1;
            }
            b'\r' => {
                lines.push(&text[start..i]);
                if bytes.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    lines.push(&text[start..]);
    lines
}

/// A device that graph items render onto.
pub trait DrawSurface {
    // ------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------

    /// Current outline pen; `None` draws no outlines.
    fn pen(&self) -> Option<&Pen>;
    fn set_pen(&mut self, pen: Option<Pen>);

    /// Current fill brush; `None` draws no fills.
    fn brush(&self) -> Option<&Brush>;
    fn set_brush(&mut self, brush: Option<Brush>);

    fn font(&self) -> &Font;
    fn set_font(&mut self, font: Font);

    fn text_foreground(&self) -> Color;
    fn set_text_foreground(&mut self, color: Color);

    fn clipping_rect(&self) -> Option<Rect>;
    fn set_clipping_rect(&mut self, rect: Option<Rect>);

    /// Ratio of physical pixels to device-independent pixels.
    fn dpi_scale_factor(&self) -> f64;

    // ------------------------------------------------------------------
    // Primitives
    // ------------------------------------------------------------------

    fn draw_line(&mut self, from: Pt, to: Pt);
    /// Open polyline through `points`.
    fn draw_lines(&mut self, points: &[Pt]);
    /// Closed polygon, filled with the current brush.
    fn draw_polygon(&mut self, points: &[Pt]);
    fn draw_spline(&mut self, points: &[Pt]);
    fn draw_circle(&mut self, center: Pt, radius: i32);
    fn draw_rectangle(&mut self, rect: Rect);
    fn draw_rounded_rectangle(&mut self, rect: Rect, radius: f64);
    /// Blit with alpha, top-left corner at `at`.
    fn draw_bitmap(&mut self, image: &RgbaImage, at: Pt);
    /// Text with its top-left corner at `at`.
    fn draw_text(&mut self, text: &str, at: Pt);
    /// Text rotated counter-clockwise by `angle` degrees around `at`.
    fn draw_rotated_text(&mut self, text: &str, at: Pt, angle: f64);
    fn gradient_fill_linear(&mut self, rect: Rect, from: Color, to: Color, direction: FillDirection);

    /// Whether `gradient_fill_linear` produces a true gradient.
    fn supports_gradients(&self) -> bool {
        true
    }

    // ------------------------------------------------------------------
    // Measurement
    // ------------------------------------------------------------------

    /// Extent of one line of text in `font`.
    fn text_extent_with(&self, text: &str, font: &Font) -> Size<i32>;

    fn text_extent(&self, text: &str) -> Size<i32> {
        self.text_extent_with(text, self.font())
    }

    /// Extent of text that may span several lines.
    fn multiline_text_extent_with(&self, text: &str, font: &Font) -> Size<i32> {
        split_lines(text).iter().fold(Size::new(0, 0), |acc, line| {
            let ext = self.text_extent_with(line, font);
            Size::new(acc.width.max(ext.width), acc.height + ext.height)
        })
    }

    fn multiline_text_extent(&self, text: &str) -> Size<i32> {
        self.multiline_text_extent_with(text, self.font())
    }

    fn from_dip(&self, value: f64) -> f64 {
        value * self.dpi_scale_factor()
    }

    fn to_dip(&self, value: f64) -> f64 {
        safe_divide(value, self.dpi_scale_factor())
    }
}

// ============================================================================
// Scoped state changers
// ============================================================================

/// Swaps the surface pen for its lifetime.
pub struct PenChanger<'a> {
    dc: &'a mut dyn DrawSurface,
    previous: Option<Pen>,
}

impl<'a> PenChanger<'a> {
    pub fn new(dc: &'a mut dyn DrawSurface, pen: Option<Pen>) -> Self {
        let previous = dc.pen().cloned();
        dc.set_pen(pen);
        Self { dc, previous }
    }
}

impl Drop for PenChanger<'_> {
    fn drop(&mut self) {
        self.dc.set_pen(self.previous.take());
    }
}

/// Swaps the surface brush for its lifetime.
pub struct BrushChanger<'a> {
    dc: &'a mut dyn DrawSurface,
    previous: Option<Brush>,
}

impl<'a> BrushChanger<'a> {
    pub fn new(dc: &'a mut dyn DrawSurface, brush: Option<Brush>) -> Self {
        let previous = dc.brush().cloned();
        dc.set_brush(brush);
        Self { dc, previous }
    }
}

impl Drop for BrushChanger<'_> {
    fn drop(&mut self) {
        self.dc.set_brush(self.previous.take());
    }
}

/// Swaps the surface font for its lifetime.
pub struct FontChanger<'a> {
    dc: &'a mut dyn DrawSurface,
    previous: Font,
}

impl<'a> FontChanger<'a> {
    pub fn new(dc: &'a mut dyn DrawSurface, font: Font) -> Self {
        let previous = dc.font().clone();
        dc.set_font(font);
        Self { dc, previous }
    }
}

impl Drop for FontChanger<'_> {
    fn drop(&mut self) {
        self.dc.set_font(std::mem::take(&mut self.previous));
    }
}

/// Swaps the text foreground colour for its lifetime.
pub struct TextColorChanger<'a> {
    dc: &'a mut dyn DrawSurface,
    previous: Color,
}

impl<'a> TextColorChanger<'a> {
    pub fn new(dc: &'a mut dyn DrawSurface, color: Color) -> Self {
        let previous = dc.text_foreground();
        dc.set_text_foreground(color);
        Self { dc, previous }
    }
}

impl Drop for TextColorChanger<'_> {
    fn drop(&mut self) {
        self.dc.set_text_foreground(self.previous);
    }
}

/// Restricts drawing to a rectangle for its lifetime.
pub struct Clipper<'a> {
    dc: &'a mut dyn DrawSurface,
    previous: Option<Rect>,
}

impl<'a> Clipper<'a> {
    pub fn new(dc: &'a mut dyn DrawSurface, rect: Rect) -> Self {
        let previous = dc.clipping_rect();
        dc.set_clipping_rect(Some(rect));
        Self { dc, previous }
    }
}

impl Drop for Clipper<'_> {
    fn drop(&mut self) {
        self.dc.set_clipping_rect(self.previous);
    }
}

macro_rules! deref_to_surface {
    ($($guard:ident),* $(,)?) => {
        $(
            impl<'a> Deref for $guard<'a> {
                type Target = dyn DrawSurface + 'a;
                fn deref(&self) -> &Self::Target {
                    &*self.dc
                }
            }

            impl<'a> DerefMut for $guard<'a> {
                fn deref_mut(&mut self) -> &mut Self::Target {
                    &mut *self.dc
                }
            }
        )*
    };
}

deref_to_surface!(PenChanger, BrushChanger, FontChanger, TextColorChanger, Clipper);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PenStyle;

    // ==================== Text metric tests ====================

    #[test]
    fn metrics_scale_with_font_and_dpi() {
        let m = TextMetrics::default();
        assert_eq!(m.extent("abcd", &Font::new(10.0), 1.0), Size::new(20, 12));
        assert_eq!(m.extent("abcd", &Font::new(10.0), 2.0), Size::new(40, 24));
        assert_eq!(m.extent("", &Font::new(10.0), 1.0), Size::new(0, 12));
    }

    #[test]
    fn split_lines_handles_all_breaks() {
        assert_eq!(split_lines("a\nb\r\nc\rd"), vec!["a", "b", "c", "d"]);
        assert_eq!(split_lines("a\n\nb"), vec!["a", "", "b"]);
        assert_eq!(split_lines(""), vec![""]);
        assert_eq!(split_lines("end\n"), vec!["end", ""]);
    }

    #[test]
    fn multiline_extent_sums_heights() {
        let dc = RecordingDc::new();
        let ext = dc.multiline_text_extent_with("ab\nabcd", &Font::new(10.0));
        assert_eq!(ext, Size::new(20, 24));
    }

    // ==================== Changer tests ====================

    #[test]
    fn pen_changer_restores_on_drop() {
        let mut dc = RecordingDc::new();
        dc.set_pen(Some(Pen::new(Color::RED)));
        {
            let mut guard = PenChanger::new(&mut dc, Some(Pen::new(Color::BLACK).with_style(PenStyle::Dot)));
            assert_eq!(guard.pen().map(|p| p.style), Some(PenStyle::Dot));
            guard.draw_line(Pt::new(0, 0), Pt::new(5, 5));
        }
        assert_eq!(dc.pen(), Some(&Pen::new(Color::RED)));
    }

    #[test]
    fn nested_changers_unwind_in_order() {
        let mut dc = RecordingDc::new();
        {
            let mut pen = PenChanger::new(&mut dc, None);
            let mut brush = BrushChanger::new(&mut *pen, Some(Brush::solid(Color::BLUE)));
            let font = FontChanger::new(&mut *brush, Font::new(20.0));
            assert!(font.pen().is_none());
            assert_eq!(font.font().point_size, 20.0);
        }
        assert!(dc.pen().is_some());
        assert_eq!(dc.brush(), Some(&Brush::default()));
        assert_eq!(dc.font().point_size, Font::DEFAULT_POINT_SIZE);
    }

    #[test]
    fn clipper_restores_previous_region() {
        let mut dc = RecordingDc::new();
        {
            let clip = Clipper::new(&mut dc, Rect::new(0, 0, 10, 10));
            assert_eq!(clip.clipping_rect(), Some(Rect::new(0, 0, 10, 10)));
        }
        assert_eq!(dc.clipping_rect(), None);
    }

    #[test]
    fn dip_conversions() {
        let dc = RecordingDc::new().with_dpi_scale_factor(2.0);
        assert_eq!(dc.from_dip(10.0), 20.0);
        assert_eq!(dc.to_dip(20.0), 10.0);
    }
}
