//! A surface that records every draw call, with deterministic text metrics.

use image::RgbaImage;

use super::{DrawSurface, TextMetrics};
use crate::types::{Brush, Color, FillDirection, Font, Pen, Pt, Rect, Size};

/// One recorded draw call, with the state it was drawn with
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Line {
        from: Pt,
        to: Pt,
        pen: Option<Pen>,
    },
    Lines {
        points: Vec<Pt>,
        pen: Option<Pen>,
    },
    Polygon {
        points: Vec<Pt>,
        pen: Option<Pen>,
        brush: Option<Brush>,
    },
    Spline {
        points: Vec<Pt>,
        pen: Option<Pen>,
    },
    Circle {
        center: Pt,
        radius: i32,
        pen: Option<Pen>,
        brush: Option<Brush>,
    },
    Rectangle {
        rect: Rect,
        pen: Option<Pen>,
        brush: Option<Brush>,
    },
    RoundedRectangle {
        rect: Rect,
        radius: f64,
        pen: Option<Pen>,
        brush: Option<Brush>,
    },
    Bitmap {
        at: Pt,
        width: u32,
        height: u32,
    },
    Text {
        text: String,
        at: Pt,
        font: Font,
        color: Color,
    },
    RotatedText {
        text: String,
        at: Pt,
        angle: f64,
        font: Font,
        color: Color,
    },
    GradientFill {
        rect: Rect,
        from: Color,
        to: Color,
        direction: FillDirection,
    },
}

/// In-memory surface used for layout measurement and tests
#[derive(Debug)]
pub struct RecordingDc {
    commands: Vec<DrawCommand>,
    pen: Option<Pen>,
    brush: Option<Brush>,
    font: Font,
    text_color: Color,
    clip: Option<Rect>,
    dpi_scale_factor: f64,
    metrics: TextMetrics,
    gradients: bool,
}

impl Default for RecordingDc {
    fn default() -> Self {
        Self {
            commands: Vec::new(),
            pen: Some(Pen::default()),
            brush: Some(Brush::default()),
            font: Font::default(),
            text_color: Color::BLACK,
            clip: None,
            dpi_scale_factor: 1.0,
            metrics: TextMetrics::default(),
            gradients: true,
        }
    }
}

impl RecordingDc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dpi_scale_factor(mut self, factor: f64) -> Self {
        self.dpi_scale_factor = factor;
        self
    }

    /// Report no gradient support, as a plain raster device would.
    pub fn without_gradients(mut self) -> Self {
        self.gradients = false;
        self
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Text of every `Text` and `RotatedText` command, in draw order.
    pub fn texts(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, .. } | DrawCommand::RotatedText { text, .. } => {
                    Some(text.as_str())
                }
                _ => None,
            })
            .collect()
    }

    fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }
}

impl DrawSurface for RecordingDc {
    fn pen(&self) -> Option<&Pen> {
        self.pen.as_ref()
    }

    fn set_pen(&mut self, pen: Option<Pen>) {
        self.pen = pen;
    }

    fn brush(&self) -> Option<&Brush> {
        self.brush.as_ref()
    }

    fn set_brush(&mut self, brush: Option<Brush>) {
        self.brush = brush;
    }

    fn font(&self) -> &Font {
        &self.font
    }

    fn set_font(&mut self, font: Font) {
        self.font = font;
    }

    fn text_foreground(&self) -> Color {
        self.text_color
    }

    fn set_text_foreground(&mut self, color: Color) {
        self.text_color = color;
    }

    fn clipping_rect(&self) -> Option<Rect> {
        self.clip
    }

    fn set_clipping_rect(&mut self, rect: Option<Rect>) {
        self.clip = rect;
    }

    fn dpi_scale_factor(&self) -> f64 {
        self.dpi_scale_factor
    }

    fn draw_line(&mut self, from: Pt, to: Pt) {
        let pen = self.pen.clone();
        self.push(DrawCommand::Line { from, to, pen });
    }

    fn draw_lines(&mut self, points: &[Pt]) {
        let pen = self.pen.clone();
        self.push(DrawCommand::Lines {
            points: points.to_vec(),
            pen,
        });
    }

    fn draw_polygon(&mut self, points: &[Pt]) {
        let (pen, brush) = (self.pen.clone(), self.brush.clone());
        self.push(DrawCommand::Polygon {
            points: points.to_vec(),
            pen,
            brush,
        });
    }

    fn draw_spline(&mut self, points: &[Pt]) {
        let pen = self.pen.clone();
        self.push(DrawCommand::Spline {
            points: points.to_vec(),
            pen,
        });
    }

    fn draw_circle(&mut self, center: Pt, radius: i32) {
        let (pen, brush) = (self.pen.clone(), self.brush.clone());
        self.push(DrawCommand::Circle {
            center,
            radius,
            pen,
            brush,
        });
    }

    fn draw_rectangle(&mut self, rect: Rect) {
        let (pen, brush) = (self.pen.clone(), self.brush.clone());
        self.push(DrawCommand::Rectangle { rect, pen, brush });
    }

    fn draw_rounded_rectangle(&mut self, rect: Rect, radius: f64) {
        let (pen, brush) = (self.pen.clone(), self.brush.clone());
        self.push(DrawCommand::RoundedRectangle {
            rect,
            radius,
            pen,
            brush,
        });
    }

    fn draw_bitmap(&mut self, image: &RgbaImage, at: Pt) {
        self.push(DrawCommand::Bitmap {
            at,
            width: image.width(),
            height: image.height(),
        });
    }

    fn draw_text(&mut self, text: &str, at: Pt) {
        let (font, color) = (self.font.clone(), self.text_color);
        self.push(DrawCommand::Text {
            text: text.to_string(),
            at,
            font,
            color,
        });
    }

    fn draw_rotated_text(&mut self, text: &str, at: Pt, angle: f64) {
        let (font, color) = (self.font.clone(), self.text_color);
        self.push(DrawCommand::RotatedText {
            text: text.to_string(),
            at,
            angle,
            font,
            color,
        });
    }

    fn gradient_fill_linear(&mut self, rect: Rect, from: Color, to: Color, direction: FillDirection) {
        self.push(DrawCommand::GradientFill {
            rect,
            from,
            to,
            direction,
        });
    }

    fn supports_gradients(&self) -> bool {
        self.gradients
    }

    fn text_extent_with(&self, text: &str, font: &Font) -> Size<i32> {
        self.metrics.extent(text, font, self.dpi_scale_factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_state_with_each_call() {
        let mut dc = RecordingDc::new();
        dc.set_brush(None);
        dc.draw_rectangle(Rect::new(1, 2, 3, 4));
        assert_eq!(
            dc.commands(),
            &[DrawCommand::Rectangle {
                rect: Rect::new(1, 2, 3, 4),
                pen: Some(Pen::default()),
                brush: None
            }]
        );
    }

    #[test]
    fn texts_collects_plain_and_rotated() {
        let mut dc = RecordingDc::new();
        dc.draw_text("a", Pt::new(0, 0));
        dc.draw_line(Pt::new(0, 0), Pt::new(1, 1));
        dc.draw_rotated_text("b", Pt::new(0, 0), 90.0);
        assert_eq!(dc.texts(), vec!["a", "b"]);
        assert_eq!(dc.take_commands().len(), 3);
        assert!(dc.commands().is_empty());
    }
}
