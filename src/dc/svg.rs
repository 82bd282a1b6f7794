//! SVG serialisation backend

use std::fmt::Write;
use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::{ImageFormat, RgbaImage};

use super::{DrawSurface, TextMetrics, split_lines};
use crate::types::{Brush, Color, FillDirection, Font, Pen, PenStyle, Pt, Rect, Size};

/// Escape text content and attribute values.
fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn points_attr(points: &[Pt]) -> String {
    points
        .iter()
        .map(|p| format!("{},{}", p.x, p.y))
        .collect::<Vec<_>>()
        .join(" ")
}

fn stroke_attrs(pen: Option<&Pen>) -> String {
    let Some(pen) = pen.filter(|p| !p.is_transparent()) else {
        return r#"stroke="none""#.to_string();
    };
    let mut out = format!(r#"stroke="{}" stroke-width="{}""#, pen.color, pen.width);
    if !pen.color.is_opaque() {
        let _ = write!(out, r#" stroke-opacity="{:.3}""#, pen.color.opacity());
    }
    let dash = match pen.style {
        PenStyle::Dot => Some((pen.width, pen.width * 2.0)),
        PenStyle::ShortDash => Some((pen.width * 3.0, pen.width * 2.0)),
        PenStyle::LongDash => Some((pen.width * 6.0, pen.width * 2.0)),
        PenStyle::Solid | PenStyle::Transparent => None,
    };
    if let Some((on, off)) = dash {
        let _ = write!(out, r#" stroke-dasharray="{on},{off}""#);
    }
    out
}

fn fill_attrs(brush: Option<&Brush>) -> String {
    let Some(brush) = brush.filter(|b| !b.is_transparent()) else {
        return r#"fill="none""#.to_string();
    };
    let mut out = format!(r#"fill="{}""#, brush.color);
    if !brush.color.is_opaque() {
        let _ = write!(out, r#" fill-opacity="{:.3}""#, brush.color.opacity());
    }
    out
}

/// Path data for a quadratic B-spline through `points`: straight to the
/// first midpoint, curves through each interior point, straight to the end.
fn spline_path(points: &[Pt]) -> String {
    let mut d = String::new();
    let Some((first, rest)) = points.split_first() else {
        return d;
    };
    let _ = write!(d, "M{},{}", first.x, first.y);
    if rest.len() < 2 {
        for p in rest {
            let _ = write!(d, " L{},{}", p.x, p.y);
        }
        return d;
    }
    let mid = |a: Pt, b: Pt| ((a.x + b.x) as f64 / 2.0, (a.y + b.y) as f64 / 2.0);
    let (mx, my) = mid(points[0], points[1]);
    let _ = write!(d, " L{mx},{my}");
    for pair in points[1..].windows(2).take(points.len() - 3) {
        let (mx, my) = mid(pair[0], pair[1]);
        let _ = write!(d, " Q{},{} {mx},{my}", pair[0].x, pair[0].y);
    }
    let n = points.len();
    let (ctrl, last) = (points[n - 2], points[n - 1]);
    let _ = write!(d, " Q{},{} {},{}", ctrl.x, ctrl.y, last.x, last.y);
    d
}

/// Writes draw calls into an SVG document
#[derive(Debug)]
pub struct SvgDc {
    width: i32,
    height: i32,
    body: String,
    pen: Option<Pen>,
    brush: Option<Brush>,
    font: Font,
    text_color: Color,
    clip: Option<Rect>,
    clip_groups_open: usize,
    next_id: usize,
    dpi_scale_factor: f64,
    metrics: TextMetrics,
}

impl SvgDc {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            body: String::new(),
            pen: Some(Pen::default()),
            brush: Some(Brush::default()),
            font: Font::default(),
            text_color: Color::BLACK,
            clip: None,
            clip_groups_open: 0,
            next_id: 0,
            dpi_scale_factor: 1.0,
            metrics: TextMetrics::default(),
        }
    }

    pub fn with_dpi_scale_factor(mut self, factor: f64) -> Self {
        self.dpi_scale_factor = factor;
        self
    }

    /// Close any open groups and return the finished document.
    pub fn finish(mut self) -> String {
        for _ in 0..self.clip_groups_open {
            self.body.push_str("</g>\n");
        }
        format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\n{body}</svg>\n",
            w = self.width,
            h = self.height,
            body = self.body
        )
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{}", self.next_id)
    }

    fn shape_attrs(&self) -> String {
        format!("{} {}", fill_attrs(self.brush.as_ref()), stroke_attrs(self.pen.as_ref()))
    }

    fn text_element(&mut self, text: &str, at: Pt, transform: Option<String>) {
        let font = &self.font;
        let size = font.point_size * self.dpi_scale_factor;
        let line_height = self.metrics.extent("", font, self.dpi_scale_factor).height;
        let mut el = format!(
            r#"<text x="{}" y="{}" font-family="{}" font-size="{}""#,
            at.x,
            at.y,
            escape_xml(font.face_name.as_deref().unwrap_or(font.family.css_name())),
            size
        );
        if font.bold {
            el.push_str(r#" font-weight="bold""#);
        }
        let _ = write!(el, r#" fill="{}" dominant-baseline="hanging""#, self.text_color);
        if let Some(transform) = transform {
            let _ = write!(el, r#" transform="{transform}""#);
        }
        el.push('>');
        let lines = split_lines(text);
        if lines.len() == 1 {
            el.push_str(&escape_xml(text));
        } else {
            for (i, line) in lines.iter().enumerate() {
                let dy = if i == 0 { 0 } else { line_height };
                let _ = write!(el, r#"<tspan x="{}" dy="{dy}">{}</tspan>"#, at.x, escape_xml(line));
            }
        }
        el.push_str("</text>\n");
        self.body.push_str(&el);
    }
}

impl DrawSurface for SvgDc {
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
        if self.clip_groups_open > 0 {
            self.body.push_str("</g>\n");
            self.clip_groups_open -= 1;
        }
        self.clip = rect;
        if let Some(r) = rect {
            let id = self.next_id("clip");
            let _ = writeln!(
                self.body,
                r#"<clipPath id="{id}"><rect x="{}" y="{}" width="{}" height="{}"/></clipPath><g clip-path="url(#{id})">"#,
                r.x, r.y, r.width, r.height
            );
            self.clip_groups_open += 1;
        }
    }

    fn dpi_scale_factor(&self) -> f64 {
        self.dpi_scale_factor
    }

    fn draw_line(&mut self, from: Pt, to: Pt) {
        let stroke = stroke_attrs(self.pen.as_ref());
        let _ = writeln!(
            self.body,
            r#"<line x1="{}" y1="{}" x2="{}" y2="{}" {stroke}/>"#,
            from.x, from.y, to.x, to.y
        );
    }

    fn draw_lines(&mut self, points: &[Pt]) {
        if points.len() < 2 {
            return;
        }
        let stroke = stroke_attrs(self.pen.as_ref());
        let _ = writeln!(
            self.body,
            r#"<polyline points="{}" fill="none" {stroke}/>"#,
            points_attr(points)
        );
    }

    fn draw_polygon(&mut self, points: &[Pt]) {
        if points.is_empty() {
            return;
        }
        let attrs = self.shape_attrs();
        let _ = writeln!(self.body, r#"<polygon points="{}" {attrs}/>"#, points_attr(points));
    }

    fn draw_spline(&mut self, points: &[Pt]) {
        if points.len() < 2 {
            return;
        }
        let stroke = stroke_attrs(self.pen.as_ref());
        let _ = writeln!(self.body, r#"<path d="{}" fill="none" {stroke}/>"#, spline_path(points));
    }

    fn draw_circle(&mut self, center: Pt, radius: i32) {
        let attrs = self.shape_attrs();
        let _ = writeln!(
            self.body,
            r#"<circle cx="{}" cy="{}" r="{radius}" {attrs}/>"#,
            center.x, center.y
        );
    }

    fn draw_rectangle(&mut self, rect: Rect) {
        let attrs = self.shape_attrs();
        let _ = writeln!(
            self.body,
            r#"<rect x="{}" y="{}" width="{}" height="{}" {attrs}/>"#,
            rect.x, rect.y, rect.width, rect.height
        );
    }

    fn draw_rounded_rectangle(&mut self, rect: Rect, radius: f64) {
        let attrs = self.shape_attrs();
        let _ = writeln!(
            self.body,
            r#"<rect x="{}" y="{}" width="{}" height="{}" rx="{radius}" {attrs}/>"#,
            rect.x, rect.y, rect.width, rect.height
        );
    }

    fn draw_bitmap(&mut self, image: &RgbaImage, at: Pt) {
        let mut png = Cursor::new(Vec::new());
        if let Err(_err) = image.write_to(&mut png, ImageFormat::Png) {
            crate::log::warn!(error = %_err, "could not encode bitmap for SVG");
            return;
        }
        let _ = writeln!(
            self.body,
            r#"<image x="{}" y="{}" width="{}" height="{}" href="data:image/png;base64,{}"/>"#,
            at.x,
            at.y,
            image.width(),
            image.height(),
            BASE64.encode(png.into_inner())
        );
    }

    fn draw_text(&mut self, text: &str, at: Pt) {
        self.text_element(text, at, None);
    }

    fn draw_rotated_text(&mut self, text: &str, at: Pt, angle: f64) {
        // SVG rotates clockwise for positive angles
        self.text_element(text, at, Some(format!("rotate({} {} {})", -angle, at.x, at.y)));
    }

    fn gradient_fill_linear(&mut self, rect: Rect, from: Color, to: Color, direction: FillDirection) {
        let id = self.next_id("grad");
        let (x1, y1, x2, y2) = match direction {
            FillDirection::South => (0, 0, 0, 1),
            FillDirection::North => (0, 1, 0, 0),
            FillDirection::East => (0, 0, 1, 0),
            FillDirection::West => (1, 0, 0, 0),
        };
        let _ = writeln!(
            self.body,
            r#"<defs><linearGradient id="{id}" x1="{x1}" y1="{y1}" x2="{x2}" y2="{y2}"><stop offset="0" stop-color="{from}" stop-opacity="{:.3}"/><stop offset="1" stop-color="{to}" stop-opacity="{:.3}"/></linearGradient></defs>"#,
            from.opacity(),
            to.opacity()
        );
        let _ = writeln!(
            self.body,
            r#"<rect x="{}" y="{}" width="{}" height="{}" fill="url(#{id})" stroke="none"/>"#,
            rect.x, rect.y, rect.width, rect.height
        );
    }

    fn text_extent_with(&self, text: &str, font: &Font) -> Size<i32> {
        self.metrics.extent(text, font, self.dpi_scale_factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document() {
        let dc = SvgDc::new(20, 10);
        insta::assert_snapshot!(dc.finish(), @r#"
        <svg xmlns="http://www.w3.org/2000/svg" width="20" height="10" viewBox="0 0 20 10">
        </svg>
        "#);
    }

    #[test]
    fn shapes_carry_pen_and_brush() {
        let mut dc = SvgDc::new(100, 100);
        dc.set_brush(Some(Brush::solid(Color::RED)));
        dc.draw_rectangle(Rect::new(1, 2, 30, 40));
        dc.set_pen(None);
        dc.set_brush(Some(Brush::solid(Color::rgba(0, 0, 255, 51))));
        dc.draw_polygon(&[Pt::new(0, 0), Pt::new(10, 0), Pt::new(5, 5)]);
        dc.set_pen(Some(Pen::new(Color::BLACK).with_width(2.0).with_style(PenStyle::Dot)));
        dc.draw_line(Pt::new(0, 0), Pt::new(9, 9));
        insta::assert_snapshot!(dc.finish(), @r#"
        <svg xmlns="http://www.w3.org/2000/svg" width="100" height="100" viewBox="0 0 100 100">
        <rect x="1" y="2" width="30" height="40" fill="rgb(255,0,0)" stroke="rgb(0,0,0)" stroke-width="1"/>
        <polygon points="0,0 10,0 5,5" fill="rgb(0,0,255)" fill-opacity="0.200" stroke="none"/>
        <line x1="0" y1="0" x2="9" y2="9" stroke="rgb(0,0,0)" stroke-width="2" stroke-dasharray="2,4"/>
        </svg>
        "#);
    }

    #[test]
    fn text_is_escaped_and_rotated() {
        let mut dc = SvgDc::new(50, 50);
        dc.draw_rotated_text("a<b", Pt::new(5, 6), 90.0);
        let svg = dc.finish();
        assert!(svg.contains("a&lt;b"));
        assert!(svg.contains(r#"transform="rotate(-90 5 6)""#));
    }

    #[test]
    fn spline_path_through_midpoints() {
        let pts = [Pt::new(0, 0), Pt::new(10, 0), Pt::new(10, 10), Pt::new(20, 10)];
        assert_eq!(spline_path(&pts), "M0,0 L5,0 Q10,0 10,5 Q10,10 20,10");
    }

    #[test]
    fn clipping_groups_are_closed() {
        let mut dc = SvgDc::new(10, 10);
        dc.set_clipping_rect(Some(Rect::new(0, 0, 5, 5)));
        dc.draw_line(Pt::new(0, 0), Pt::new(1, 1));
        let svg = dc.finish();
        assert_eq!(svg.matches("<g ").count(), svg.matches("</g>").count());
    }
}
