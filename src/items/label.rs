//! Multi-line text boxes.
//!
//! A label measures its text with the surface's metrics, so its box depends on
//! the device it is drawn on. Line count and longest-line length are derived
//! from the text and recomputed whenever the item's generation moves.

use std::cell::Cell;
use std::collections::BTreeSet;

use crate::context::RenderContext;
use crate::dc::{
    split_lines, BrushChanger, Clipper, DrawSurface, FontChanger, PenChanger, TextColorChanger,
};
use crate::defaults;
use crate::items::info::{
    Anchoring, BoxCorners, GraphItemInfo, IconShape, LabelFit, LabelStyle, LegendIcon,
    Orientation, PageHorizontalAlignment, PageVerticalAlignment, ShadowType, TextAlignment,
};
use crate::items::point::Point2D;
use crate::items::polygon::draw_arrow;
use crate::items::{GraphItem, GraphItemBase};
use crate::log::trace;
use crate::math::safe_divide;
use crate::types::{Brush, Color, FillDirection, Font, Pen, PenStyle, Pt, Rect, Size};

const ELLIPSIS: char = '\u{2026}';

/// Font sizes tried by the fitting helpers stop here.
const MAX_FIT_POINT_SIZE: u32 = 1024;

/// Shrink steps after the proportional fit, for text extents that round up.
const MAX_FIT_STEPS: usize = 32;

#[derive(Clone, Copy, Debug)]
struct LineStats {
    generation: u64,
    count: usize,
    longest: usize,
}

#[derive(Debug, Clone)]
pub struct Label {
    base: GraphItemBase,
    tilt_angle: f64,
    line_spacing: f64,
    use_parent_scaling: bool,
    lines_ignoring_left_margin: BTreeSet<usize>,
    box_corners: BoxCorners,
    stats: Cell<Option<LineStats>>,
}

impl Default for Label {
    fn default() -> Self {
        Self::new(GraphItemInfo::default())
    }
}

impl Label {
    pub fn new(info: GraphItemInfo) -> Self {
        Self {
            base: GraphItemBase::new(info),
            tilt_angle: 0.0,
            line_spacing: 1.0,
            use_parent_scaling: false,
            lines_ignoring_left_margin: BTreeSet::new(),
            box_corners: BoxCorners::Straight,
            stats: Cell::new(None),
        }
    }

    /// Label with default settings showing `text`.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self::new(GraphItemInfo::new(text))
    }

    pub fn with_tilt_angle(mut self, degrees: f64) -> Self {
        self.set_tilt_angle(degrees);
        self
    }

    pub fn with_line_spacing(mut self, spacing: f64) -> Self {
        self.set_line_spacing(spacing);
        self
    }

    pub fn with_box_corners(mut self, corners: BoxCorners) -> Self {
        self.set_box_corners(corners);
        self
    }

    pub fn with_parent_scaling(mut self, use_parent: bool) -> Self {
        self.use_parent_scaling = use_parent;
        self
    }

    // ------------------------------------------------------------------
    // Text
    // ------------------------------------------------------------------

    pub fn text(&self) -> &str {
        self.base.text()
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.base.set_text(text);
    }

    /// Replaces line `index`; out-of-range indices leave the text alone.
    pub fn set_line(&mut self, index: usize, line: &str) {
        let mut lines: Vec<&str> = split_lines(self.base.text());
        if self.base.text().is_empty() || index >= lines.len() {
            return;
        }
        lines[index] = line;
        let text = lines.join("\n").trim().to_string();
        self.base.set_text(text);
    }

    pub fn line_count(&self) -> usize {
        self.line_stats().count
    }

    /// Characters in the longest line; zero only for empty text.
    pub fn longest_line_length(&self) -> usize {
        self.line_stats().longest
    }

    fn line_stats(&self) -> LineStats {
        let generation = self.base.generation();
        if let Some(stats) = self.stats.get().filter(|s| s.generation == generation) {
            return stats;
        }
        let text = self.base.text();
        let (count, longest) = if text.is_empty() {
            (0, 0)
        } else {
            let lines = split_lines(text);
            let longest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
            // a run of blank lines still counts as text
            (lines.len(), longest.max(1))
        };
        let stats = LineStats {
            generation,
            count,
            longest,
        };
        self.stats.set(Some(stats));
        stats
    }

    // ------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------

    pub fn tilt_angle(&self) -> f64 {
        self.tilt_angle
    }

    pub fn set_tilt_angle(&mut self, degrees: f64) {
        self.tilt_angle = degrees;
    }

    /// Extra space between lines, in DIPs.
    pub fn line_spacing(&self) -> f64 {
        self.line_spacing
    }

    pub fn set_line_spacing(&mut self, spacing: f64) {
        self.line_spacing = spacing.max(0.0);
        self.base.invalidate();
    }

    pub fn is_using_parent_scaling(&self) -> bool {
        self.use_parent_scaling
    }

    /// When set, `set_bounding_box` only re-anchors and adopts the parent's
    /// scaling instead of fitting the text.
    pub fn set_use_parent_scaling(&mut self, use_parent: bool) {
        self.use_parent_scaling = use_parent;
    }

    pub fn box_corners(&self) -> BoxCorners {
        self.box_corners
    }

    pub fn set_box_corners(&mut self, corners: BoxCorners) {
        self.box_corners = corners;
    }

    pub fn lines_ignoring_left_margin(&self) -> &BTreeSet<usize> {
        &self.lines_ignoring_left_margin
    }

    /// Lines drawn flush against the box edge, ignoring the left padding.
    pub fn set_lines_ignoring_left_margin(&mut self, lines: impl IntoIterator<Item = usize>) {
        self.lines_ignoring_left_margin = lines.into_iter().collect();
    }

    pub fn legend_icons(&self) -> &[LegendIcon] {
        &self.base.info().legend_icons
    }

    pub fn set_legend_icons(&mut self, icons: Vec<LegendIcon>) {
        self.base.info_mut().legend_icons = icons;
    }

    pub fn has_legend_icons(&self) -> bool {
        !self.base.info().legend_icons.is_empty()
    }

    /// Narrowest left padding that leaves room for legend icons.
    pub fn min_legend_width() -> f64 {
        f64::from(defaults::LEGEND_ICON_WIDTH + 2)
    }

    // ------------------------------------------------------------------
    // Measurement
    // ------------------------------------------------------------------

    fn body_font(&self) -> Font {
        self.base.font().scaled(self.base.scaling())
    }

    fn header_font(&self) -> Font {
        let header = &self.base.info().header;
        header.font.scaled(self.base.scaling() * header.relative_scaling)
    }

    fn has_header_line(&self) -> bool {
        self.base.info().header.enabled && self.line_count() > 1
    }

    fn is_vertical(&self) -> bool {
        self.base.info().orientation == Orientation::Vertical
    }

    fn scaled(&self, value: f64) -> i32 {
        self.base.scale_to_screen_and_canvas(value).round() as i32
    }

    fn scaled_line_spacing(&self) -> i32 {
        self.base.scale_to_screen_and_canvas(self.line_spacing).ceil() as i32
    }

    /// Size of the text plus padding, before min user sizes apply.
    pub fn measure(&self, dc: &dyn DrawSurface) -> Size<i32> {
        let text = self.base.text();
        if text.is_empty() {
            return Size::new(0, 0);
        }
        let lines = split_lines(text);
        let font = self.body_font();
        let mut size = if self.has_header_line() {
            let body = dc.multiline_text_extent_with(&lines[1..].join("\n"), &font);
            let header = dc.text_extent_with(lines[0], &self.header_font());
            Size::new(body.width.max(header.width), body.height + header.height)
        } else {
            dc.multiline_text_extent_with(text, &font)
        };

        let pad = self.base.padding();
        size.width += self.scaled(pad.left) + self.scaled(pad.right);
        size.height += (lines.len() as i32 - 1) * self.scaled_line_spacing()
            + self.scaled(pad.top)
            + self.scaled(pad.bottom);

        if self.is_vertical() {
            Size::new(size.height, size.width)
        } else {
            size
        }
    }

    /// Anchoring in screen terms; vertical text turns the corners a quarter.
    fn effective_anchoring(&self) -> Anchoring {
        let anchoring = self.base.anchoring();
        if !self.is_vertical() {
            return anchoring;
        }
        match anchoring {
            Anchoring::TopLeftCorner => Anchoring::BottomLeftCorner,
            Anchoring::TopRightCorner => Anchoring::TopLeftCorner,
            Anchoring::BottomLeftCorner => Anchoring::BottomRightCorner,
            Anchoring::BottomRightCorner => Anchoring::TopRightCorner,
            Anchoring::Center => Anchoring::Center,
        }
    }

    /// Shift of the content inside a box larger than the text.
    fn page_offset(&self, box_size: Size<i32>, measured: Size<i32>) -> Pt {
        let info = self.base.info();
        let spare_x = (box_size.width - measured.width).max(0);
        let spare_y = (box_size.height - measured.height).max(0);
        let x = match info.page_horizontal_alignment {
            PageHorizontalAlignment::LeftAligned => 0,
            PageHorizontalAlignment::Centered => spare_x / 2,
            PageHorizontalAlignment::RightAligned => spare_x,
        };
        let y = match info.page_vertical_alignment {
            PageVerticalAlignment::TopAligned => 0,
            PageVerticalAlignment::Centered => spare_y / 2,
            PageVerticalAlignment::BottomAligned => spare_y,
        };
        Pt::new(x, y)
    }

    fn compute_boxes(&self, dc: &dyn DrawSurface) -> (Rect, Rect) {
        let measured = self.measure(dc);
        let info = self.base.info();
        let min_width = info
            .min_user_width
            .map_or(0, |w| dc.from_dip(w).round() as i32);
        let min_height = info
            .min_user_height
            .map_or(0, |h| dc.from_dip(h).round() as i32);
        let width = if info.label_fit == LabelFit::FitContentToBox {
            measured.width
        } else {
            measured.width.max(min_width)
        };
        let size = Size::new(width, measured.height.max(min_height));

        let mut anchor = self.base.anchor_point();
        if self.base.is_free_floating() {
            let scaling = self.base.scaling();
            anchor = Pt::new(
                (f64::from(anchor.x) * scaling).round() as i32,
                (f64::from(anchor.y) * scaling).round() as i32,
            );
        }
        let bbox = self.effective_anchoring().anchored_rect(anchor, size);
        let content = Rect::from_point_size(
            bbox.top_left() + self.page_offset(size, measured),
            measured,
        );
        (bbox, content)
    }

    /// Area the text itself occupies inside the bounding box.
    pub fn content_bounding_box(&self, dc: &dyn DrawSurface) -> Rect {
        if !self.base.is_ok() {
            return Rect::EMPTY;
        }
        if let Some(content) = self.base.cached_content_bounding_box() {
            return content;
        }
        let (bbox, content) = self.compute_boxes(dc);
        self.base.set_cached_bounding_box(bbox, Some(content));
        content
    }

    fn fit_scaling_to(&mut self, target: Size<i32>, dc: &dyn DrawSurface) {
        let measured = self.measure(dc);
        if measured.is_empty() || target.is_empty() {
            return;
        }
        let by_height = safe_divide(f64::from(target.height), f64::from(measured.height));
        let factor = if f64::from(measured.width) * by_height > f64::from(target.width) {
            safe_divide(f64::from(target.width), f64::from(measured.width))
        } else {
            by_height
        };
        if factor <= 0.0 {
            return;
        }
        let scaling = self.base.scaling() * factor;
        self.base.set_scaling(scaling);
        for _ in 0..MAX_FIT_STEPS {
            let size = self.measure(dc);
            if size.width <= target.width && size.height <= target.height {
                break;
            }
            let scaling = self.base.scaling() * 0.95;
            self.base.set_scaling(scaling);
        }
        trace!(scaling = self.base.scaling(), "label fitted to box");
    }

    // ------------------------------------------------------------------
    // Line breaking
    // ------------------------------------------------------------------

    /// One character per line, for letter-stacked vertical titles.
    pub fn split_text_by_character(&mut self) {
        let text: Vec<String> = self
            .base
            .text()
            .chars()
            .filter(|c| *c != '\n' && *c != '\r')
            .map(String::from)
            .collect();
        self.set_text(text.join("\n"));
    }

    /// Rewraps the text so lines break at the first space or hyphen at or
    /// after `suggested` characters. Text whose lines all fit is untouched.
    pub fn split_text_to_fit_length(&mut self, suggested: usize) {
        if suggested == 0 || self.longest_line_length() <= suggested {
            return;
        }
        let mut out = String::with_capacity(self.base.text().len() + 8);
        let mut line_len = 0;
        for c in self.base.text().chars() {
            let c = if c == '\n' || c == '\r' { ' ' } else { c };
            if line_len >= suggested && (c == ' ' || c == '-') {
                if c == '-' {
                    out.push('-');
                }
                while out.ends_with(' ') {
                    out.pop();
                }
                out.push('\n');
                line_len = 0;
                continue;
            }
            if line_len == 0 && c == ' ' {
                continue;
            }
            out.push(c);
            line_len += 1;
        }
        let text = out.trim().to_string();
        self.set_text(text);
    }

    /// Word-wraps the text into `size` (padding included). When the wrapped
    /// lines overflow vertically the surplus is dropped and the last kept
    /// line ends in an ellipsis.
    pub fn split_text_to_fit_bounding_box(&mut self, dc: &dyn DrawSurface, size: Size<i32>) {
        let font = self.body_font();
        let pad = self.base.padding();
        let avail_width = size.width - self.scaled(pad.left) - self.scaled(pad.right);
        let avail_height = size.height - self.scaled(pad.top) - self.scaled(pad.bottom);

        let mut lines: Vec<String> = Vec::new();
        let mut current = String::new();
        for word in self.base.text().split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if current.is_empty() || dc.text_extent_with(&candidate, &font).width <= avail_width {
                current = candidate;
            } else {
                lines.push(std::mem::replace(&mut current, word.to_string()));
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }

        let line_height = dc.text_extent_with("X", &font).height;
        let spacing = self.scaled_line_spacing();
        if line_height > 0 {
            let max_lines = ((avail_height + spacing) / (line_height + spacing)).max(1) as usize;
            if lines.len() > max_lines {
                lines.truncate(max_lines);
                if let Some(last) = lines.last_mut() {
                    last.pop();
                    last.push(ELLIPSIS);
                }
            }
        }
        self.set_text(lines.join("\n"));
    }

    // ------------------------------------------------------------------
    // Font fitting
    // ------------------------------------------------------------------

    /// Largest whole point size at which `text` fits inside `bounds`.
    pub fn calc_font_size_to_fit_bounding_box(
        dc: &dyn DrawSurface,
        font: &Font,
        bounds: Size<i32>,
        text: &str,
    ) -> f64 {
        let mut font = font.clone();
        let mut size = 1;
        while size < MAX_FIT_POINT_SIZE {
            font.point_size = f64::from(size);
            let extent = dc.multiline_text_extent_with(text, &font);
            if extent.width > bounds.width || extent.height > bounds.height {
                break;
            }
            size += 1;
        }
        f64::from(size.saturating_sub(1).max(1))
    }

    /// Largest whole point size at which `text`, rotated by `angle` degrees,
    /// fits inside `bounds`.
    pub fn calc_diagonal_font_size(
        dc: &dyn DrawSurface,
        font: &Font,
        bounds: Size<i32>,
        angle: f64,
        text: &str,
    ) -> f64 {
        let (sin, cos) = angle.to_radians().sin_cos();
        let (sin, cos) = (sin.abs(), cos.abs());
        let mut font = font.clone();
        let mut size = 1;
        while size < MAX_FIT_POINT_SIZE {
            font.point_size = f64::from(size);
            let extent = dc.multiline_text_extent_with(text, &font).to_f64();
            let width = extent.width * cos + extent.height * sin;
            let height = extent.width * sin + extent.height * cos;
            if width > f64::from(bounds.width) || height > f64::from(bounds.height) {
                break;
            }
            size += 1;
        }
        f64::from(size.saturating_sub(1).max(1))
    }

    // ------------------------------------------------------------------
    // Drawing
    // ------------------------------------------------------------------

    fn draw_box(&self, dc: &mut dyn DrawSurface, rect: Rect, radius: f64) {
        match self.box_corners {
            BoxCorners::Rounded => dc.draw_rounded_rectangle(rect, radius),
            BoxCorners::Straight => dc.draw_rectangle(rect),
        }
    }

    fn draw_shadow(&self, dc: &mut dyn DrawSurface, bbox: Rect, radius: f64) {
        if self.base.info().shadow == ShadowType::NoShadow
            || self.base.pen().is_none()
            || self.base.is_selected()
        {
            return;
        }
        let color = self.base.shadow_color();
        let offset = self.scaled(self.base.shadow_offset());
        let mut dc = PenChanger::new(dc, Some(Pen::new(color)));
        let mut dc = BrushChanger::new(&mut *dc, Some(Brush::solid(color)));
        self.draw_box(&mut *dc, bbox.offset(offset, offset), radius);
    }

    fn draw_background(&self, dc: &mut dyn DrawSurface, bbox: Rect, radius: f64) {
        let Some(color) = self.base.font_background_color() else {
            return;
        };
        let mut dc = PenChanger::new(dc, None);
        let mut dc = BrushChanger::new(&mut *dc, Some(Brush::solid(color)));
        self.draw_box(&mut *dc, bbox, radius);
    }

    fn draw_style_lines(&self, dc: &mut dyn DrawSurface, bbox: Rect, ctx: &RenderContext) {
        let style = self.base.info().label_style;
        if !style.has_lines() {
            return;
        }
        let line_height = dc.text_extent("X").height;
        let spacing = self.scaled_line_spacing();
        let step = line_height + spacing;
        if step <= 0 {
            return;
        }
        let vertical = self.is_vertical();
        let count = if vertical { bbox.width } else { bbox.height } / step;
        let lead = self.scaled(self.base.padding().top);
        let margin = if style.has_margins() {
            self.scaled(self.base.padding().left)
        } else {
            0
        };
        let width = self.base.scale_to_screen_and_canvas(1.0);
        let blue = Color::BLUE.with_alpha(ctx.translucency);
        let head = self.base.scale_to_screen_and_canvas(5.0);

        let mut dc = Clipper::new(dc, bbox);
        for i in 1..=count {
            let along = line_height * i + (i - 1) * spacing + lead;
            let (from, to) = if vertical {
                let x = bbox.left() + along;
                (Pt::new(x, bbox.top() + margin), Pt::new(x, bbox.bottom() - margin))
            } else {
                let y = bbox.top() + along;
                (Pt::new(bbox.left() + margin, y), Pt::new(bbox.right() - margin, y))
            };
            let pen = match style {
                LabelStyle::IndexCard if i == 1 => {
                    Pen::new(Color::RED.with_alpha(ctx.translucency)).with_width(width)
                }
                LabelStyle::DottedLinedPaper | LabelStyle::DottedLinedPaperWithMargins => {
                    Pen::new(blue).with_width(width).with_style(PenStyle::Dot)
                }
                _ => Pen::new(blue).with_width(width),
            };
            let mut dc = PenChanger::new(&mut *dc, Some(pen));
            match style {
                LabelStyle::RightArrowLinedPaper | LabelStyle::RightArrowLinedPaperWithMargins => {
                    draw_arrow(&mut *dc, from, to, Size::new(head, head));
                }
                _ => dc.draw_line(from, to),
            }
        }
    }

    fn draw_text_lines(&self, dc: &mut dyn DrawSurface, bbox: Rect, content: Rect) {
        let text = self.base.text();
        if text.is_empty() {
            return;
        }
        let info = self.base.info();
        let pad = info.padding;
        let (pad_left, pad_right) = (self.scaled(pad.left), self.scaled(pad.right));
        let pad_top = self.scaled(pad.top);
        let spacing = self.scaled_line_spacing();
        let vertical = self.is_vertical();
        let has_header = self.has_header_line();
        let has_legend = self.has_legend_icons();
        let full = if vertical { bbox.height } else { bbox.width } - (pad_left + pad_right);
        let mut cursor = if vertical {
            Pt::new(content.left() + pad_top, content.bottom())
        } else {
            Pt::new(content.left(), content.top() + pad_top)
        };

        for (i, line) in split_lines(text).into_iter().enumerate() {
            let is_header = has_header && i == 0;
            let font = if is_header {
                self.header_font()
            } else {
                dc.font().clone()
            };
            let extent = dc.text_extent_with(line, &font);
            let alignment = if is_header {
                info.header.alignment
            } else {
                info.text_alignment
            };
            let mut drawn = line.to_string();
            let aligned = match alignment {
                TextAlignment::FlushLeft => 0,
                TextAlignment::Centered => (full - extent.width) / 2,
                TextAlignment::FlushRight => full - extent.width,
                TextAlignment::Justified => {
                    drawn = justify_line(&*dc, line, &font, full);
                    0
                }
            };
            let margin = if is_header {
                match alignment {
                    TextAlignment::Centered => pad_left / 2,
                    _ if has_legend => 0,
                    _ => pad_left,
                }
            } else if self.lines_ignoring_left_margin.contains(&i) {
                0
            } else {
                pad_left
            };
            let offset = aligned + margin;

            let color = if is_header {
                info.header.font_color
            } else {
                dc.text_foreground()
            };
            let mut line_dc = FontChanger::new(&mut *dc, font);
            let mut line_dc = TextColorChanger::new(&mut *line_dc, color);
            if vertical {
                let at = Pt::new(cursor.x, cursor.y - offset);
                line_dc.draw_rotated_text(&drawn, at, 90.0 + self.tilt_angle);
                cursor.x += extent.height + spacing;
            } else {
                let at = Pt::new(cursor.x + offset, cursor.y);
                if self.tilt_angle != 0.0 {
                    line_dc.draw_rotated_text(&drawn, at, self.tilt_angle);
                } else {
                    line_dc.draw_text(&drawn, at);
                }
                cursor.y += extent.height + spacing;
            }
        }
    }

    fn draw_legend_icons(&self, dc: &mut dyn DrawSurface, content: Rect, ctx: &RenderContext) {
        if !self.has_legend_icons() || self.is_vertical() {
            return;
        }
        let pad = self.base.padding();
        let line_height = dc.text_extent("X").height;
        let spacing = self.scaled_line_spacing();
        let lead = self.scaled(pad.top)
            + if self.has_header_line() {
                dc.text_extent_with("X", &self.header_font()).height + spacing
            } else {
                0
            };
        let inset = self.scaled(2.0);
        let radius = (f64::from(line_height) * 0.3).round();
        let left = line_height / 2;

        for (i, icon) in self.legend_icons().iter().enumerate() {
            let i = i as i32;
            let middle = line_height * i + line_height / 2 + i * spacing + lead;
            let mid = Pt::new(content.left() + left, content.top() + middle);
            let mut dc = PenChanger::new(&mut *dc, icon.pen.clone());
            let mut dc = BrushChanger::new(&mut *dc, icon.brush.clone());
            match icon.shape {
                IconShape::HorizontalSeparator => dc.draw_line(
                    Pt::new(content.left() + inset, mid.y),
                    Pt::new(content.right() - inset, mid.y),
                ),
                IconShape::HorizontalArrowRightSeparator => {
                    let head = LegendIcon::arrowhead_size();
                    let head = Size::new(
                        self.base.scale_to_screen_and_canvas(head.width),
                        self.base.scale_to_screen_and_canvas(head.height),
                    );
                    draw_arrow(
                        &mut *dc,
                        Pt::new(content.left() + inset, mid.y),
                        Pt::new(content.right() - inset, mid.y),
                        head,
                    );
                }
                IconShape::ColorGradient => {
                    let area = Rect::from_corners(
                        Pt::new(content.left() + inset, content.top() + lead),
                        Pt::new(
                            content.left() + inset + self.scaled(f64::from(defaults::LEGEND_ICON_WIDTH)),
                            content.bottom() - self.scaled(pad.bottom),
                        ),
                    );
                    draw_color_ramp(&mut *dc, area, &icon.colors);
                }
                // legend icons carry no bitmap of their own
                IconShape::ImageWholeLegend | IconShape::Image => {}
                shape => {
                    let glyph = Point2D::new(
                        GraphItemInfo::default()
                            .with_anchor_point(mid)
                            .with_pen(icon.pen.clone())
                            .with_brush(icon.brush.clone()),
                        radius,
                    )
                    .with_shape(shape);
                    glyph.draw(&mut *dc, ctx);
                }
            }
        }
    }

    fn draw_outline(
        &self,
        dc: &mut dyn DrawSurface,
        bbox: Rect,
        content: Rect,
        radius: f64,
        ctx: &RenderContext,
    ) {
        let outline = self.base.info().outline;
        if self.base.is_selected() {
            let pen = Pen::new(Color::BLACK)
                .with_width(self.base.scale_to_screen_and_canvas(2.0))
                .with_style(PenStyle::Dot);
            let mut dc = PenChanger::new(dc, Some(pen));
            let mut dc = BrushChanger::new(&mut *dc, None);
            self.draw_box(&mut *dc, bbox, radius);
            if ctx.draw_debug_boxes() {
                let mut dc = PenChanger::new(
                    &mut *dc,
                    Some(Pen::new(Color::RED).with_style(PenStyle::Dot)),
                );
                dc.draw_rectangle(content);
            }
        } else if let Some(pen) = self.base.scaled_pen() {
            let mut dc = PenChanger::new(dc, Some(pen));
            let mut dc = BrushChanger::new(&mut *dc, None);
            if outline.is_complete() {
                self.draw_box(&mut *dc, bbox, radius);
            } else {
                if outline.top {
                    dc.draw_line(bbox.top_left(), bbox.top_right());
                }
                if outline.right {
                    dc.draw_line(bbox.top_right(), bbox.bottom_right());
                }
                if outline.bottom {
                    dc.draw_line(bbox.bottom_left(), bbox.bottom_right());
                }
                if outline.left {
                    dc.draw_line(bbox.top_left(), bbox.bottom_left());
                }
            }
        }
    }
}

/// Widens the gaps of `line` with extra spaces until it spans `width`.
fn justify_line(dc: &dyn DrawSurface, line: &str, font: &Font, width: i32) -> String {
    let words: Vec<&str> = line.split(' ').collect();
    if words.len() < 2 || dc.text_extent_with(line, font).width >= width {
        return line.to_string();
    }
    let gap = width - dc.text_extent_with(&words.concat(), font).width;
    let space = safe_divide(f64::from(dc.text_extent_with(&" ".repeat(10), font).width), 10.0);
    let needed = safe_divide(f64::from(gap), space).ceil() as usize;
    let gaps = words.len() - 1;
    let per_gap = (needed / gaps).max(1);
    let mut extra = needed.saturating_sub(per_gap * gaps);
    let mut out = String::with_capacity(line.len() + needed);
    for (i, word) in words.iter().enumerate() {
        out.push_str(word);
        if i < gaps {
            let n = per_gap + usize::from(extra > 0);
            out.extend(std::iter::repeat_n(' ', n));
            extra = extra.saturating_sub(1);
        }
    }
    out
}

/// Stacks gradients between consecutive `colors` top to bottom in `area`.
fn draw_color_ramp(dc: &mut dyn DrawSurface, area: Rect, colors: &[Color]) {
    if colors.len() < 2 || area.is_empty() {
        return;
    }
    let chunks = colors.len() as i32 - 1;
    let chunk_height = area.height / chunks;
    for (i, pair) in colors.windows(2).enumerate() {
        let i = i as i32;
        let height = if i == chunks - 1 {
            area.height - chunk_height * i
        } else {
            chunk_height
        };
        let rect = Rect::new(area.left(), area.top() + chunk_height * i, area.width, height);
        dc.gradient_fill_linear(rect, pair[0], pair[1], FillDirection::South);
    }
}

impl GraphItem for Label {
    fn base(&self) -> &GraphItemBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut GraphItemBase {
        &mut self.base
    }

    fn draw(&self, dc: &mut dyn DrawSurface, ctx: &RenderContext) -> Rect {
        if !self.base.is_shown() || !self.base.is_ok() {
            return Rect::EMPTY;
        }
        let bbox = self.bounding_box(&*dc);
        if self.base.is_in_drag_state() {
            return bbox;
        }
        let content = self.content_bounding_box(&*dc);
        let radius = self.base.scale_to_screen_and_canvas(ctx.rounded_corner_radius);

        let mut dc = FontChanger::new(dc, self.body_font());
        let mut dc = TextColorChanger::new(&mut *dc, self.base.font_color());
        self.draw_shadow(&mut *dc, bbox, radius);
        self.draw_background(&mut *dc, bbox, radius);
        self.draw_style_lines(&mut *dc, bbox, ctx);
        self.draw_text_lines(&mut *dc, bbox, content);
        self.draw_legend_icons(&mut *dc, content, ctx);
        self.draw_outline(&mut *dc, bbox, content, radius, ctx);
        bbox
    }

    fn bounding_box(&self, dc: &dyn DrawSurface) -> Rect {
        if !self.base.is_ok() {
            return Rect::EMPTY;
        }
        if let Some(bbox) = self.base.cached_bounding_box() {
            return bbox;
        }
        let (bbox, content) = self.compute_boxes(dc);
        self.base.set_cached_bounding_box(bbox, Some(content));
        bbox
    }

    /// Fits the text into `rect` then pins the box to it.
    fn set_bounding_box(&mut self, rect: Rect, dc: &dyn DrawSurface, parent_scaling: f64) {
        debug_assert!(
            !self.base.is_free_floating(),
            "set_bounding_box() should only be called on fixed objects"
        );
        if self.base.is_free_floating() {
            return;
        }
        let anchor = self.effective_anchoring().anchor_for(&rect);
        self.base.set_anchor_point(anchor);
        if self.use_parent_scaling {
            if parent_scaling > 0.0 {
                self.base.set_scaling(parent_scaling);
            }
            return;
        }

        self.fit_scaling_to(rect.size(), dc);
        {
            let info = self.base.info_mut();
            info.min_user_width = Some(dc.to_dip(f64::from(rect.width)));
            info.min_user_height = Some(dc.to_dip(f64::from(rect.height)));
        }
        let measured = self.measure(dc);
        let mut bbox = rect;
        if self.base.info().label_fit == LabelFit::FitContentToBox {
            bbox.width = measured.width.min(rect.width);
        }
        let content = Rect::from_point_size(
            rect.top_left() + self.page_offset(rect.size(), measured),
            measured,
        );
        self.base.set_cached_bounding_box(bbox, Some(content));
    }

    fn offset(&mut self, dx: i32, dy: i32) {
        let pt = self.base.anchor_point();
        self.base.set_anchor_point(Pt::new(pt.x + dx, pt.y + dy));
    }

    fn hit_test(&self, pt: Pt, dc: &dyn DrawSurface) -> bool {
        self.bounding_box(dc).contains(pt)
    }

    fn content_rect(&self, dc: &dyn DrawSurface) -> Rect {
        self.content_bounding_box(dc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dc::{DrawCommand, RecordingDc};
    use crate::items::info::HeaderInfo;

    fn label(text: &str) -> Label {
        Label::new(GraphItemInfo::new(text).with_anchor_point(Pt::new(100, 100)))
    }

    #[test]
    fn tracks_longest_line() {
        let mut l = Label::default();
        assert_eq!(l.longest_line_length(), 0);
        assert_eq!(l.line_count(), 0);

        l.set_text("Short\nA much longer second line\nMid");
        assert_eq!(l.line_count(), 3);
        assert_eq!(l.longest_line_length(), "A much longer second line".len());

        l.set_text("");
        assert_eq!(l.longest_line_length(), 0);
        assert_eq!(l.line_count(), 0);
    }

    #[test]
    fn stats_follow_base_text_edits() {
        let mut l = label("one");
        assert_eq!(l.longest_line_length(), 3);
        l.base_mut().set_text("three\r\nfour");
        assert_eq!(l.line_count(), 2);
        assert_eq!(l.longest_line_length(), 5);
    }

    #[test]
    fn set_line_replaces_in_range_only() {
        let mut l = label("alpha\nbeta\ngamma");
        l.set_line(1, "BETA PRIME");
        assert_eq!(l.text(), "alpha\nBETA PRIME\ngamma");
        assert_eq!(l.longest_line_length(), 10);
        l.set_line(7, "nope");
        assert_eq!(l.text(), "alpha\nBETA PRIME\ngamma");
    }

    #[test]
    fn measures_text_and_padding() {
        let dc = RecordingDc::new();
        let l = Label::new(
            GraphItemInfo::new("Hello")
                .with_anchor_point(Pt::new(100, 100))
                .with_padding(2.0, 2.0, 2.0, 2.0),
        );
        assert_eq!(l.measure(&dc), Size::new(29, 16));
        assert_eq!(l.bounding_box(&dc), Rect::new(86, 92, 29, 16));
        assert_eq!(l.content_bounding_box(&dc), Rect::new(86, 92, 29, 16));
    }

    #[test]
    fn line_spacing_adds_between_lines() {
        let dc = RecordingDc::new();
        let l = label("ab\ncd");
        assert_eq!(l.measure(&dc), Size::new(10, 25));
        let l = label("ab\ncd").with_line_spacing(4.0);
        assert_eq!(l.measure(&dc), Size::new(10, 28));
    }

    #[test]
    fn vertical_orientation_swaps_axes() {
        let dc = RecordingDc::new();
        let l = Label::new(
            GraphItemInfo::new("Hello")
                .with_orientation(Orientation::Vertical)
                .with_anchoring(Anchoring::TopLeftCorner)
                .with_anchor_point(Pt::new(10, 50)),
        );
        assert_eq!(l.measure(&dc), Size::new(12, 25));
        // the anchor is the bottom-left corner of the turned box
        assert_eq!(l.bounding_box(&dc).bottom_left(), Pt::new(10, 50));
    }

    #[test]
    fn header_measures_first_line_with_its_font() {
        let dc = RecordingDc::new();
        let l = Label::new(
            GraphItemInfo::new("Legend title\nab")
                .with_header(HeaderInfo::default().enabled(true).with_font(Font::new(20.0))),
        );
        // header 12 chars at 10px, body 2 chars at 5px
        assert_eq!(l.measure(&dc), Size::new(120, 24 + 12 + 1));
    }

    #[test]
    fn min_user_size_and_page_alignment() {
        let dc = RecordingDc::new();
        let l = Label::new(
            GraphItemInfo::new("Hello")
                .with_anchoring(Anchoring::TopLeftCorner)
                .with_anchor_point(Pt::new(0, 0))
                .with_min_user_size(Some(45.0), Some(40.0))
                .with_page_vertical_alignment(PageVerticalAlignment::BottomAligned)
                .with_page_horizontal_alignment(PageHorizontalAlignment::Centered),
        );
        assert_eq!(l.bounding_box(&dc), Rect::new(0, 0, 45, 40));
        assert_eq!(l.content_bounding_box(&dc), Rect::new(10, 28, 25, 12));
    }

    #[test]
    fn fits_height_first() {
        let dc = RecordingDc::new();
        let mut l = label("Hello");
        let target = Rect::new(0, 0, 100, 24);
        l.set_bounding_box(target, &dc, 1.0);
        assert_eq!(l.base().scaling(), 2.0);
        assert_eq!(l.bounding_box(&dc), target);
        assert_eq!(l.base().anchor_point(), target.center());
    }

    #[test]
    fn fit_is_clamped_by_width() {
        let dc = RecordingDc::new();
        let mut l = label("Hello");
        l.set_bounding_box(Rect::new(0, 0, 50, 100), &dc, 1.0);
        assert_eq!(l.base().scaling(), 2.0);
        assert_eq!(l.measure(&dc), Size::new(50, 24));
    }

    #[test]
    fn fit_content_clips_box_width() {
        let dc = RecordingDc::new();
        let mut l = Label::new(GraphItemInfo::new("Hello").with_label_fit(LabelFit::FitContentToBox));
        l.set_bounding_box(Rect::new(0, 0, 200, 24), &dc, 1.0);
        assert_eq!(l.bounding_box(&dc), Rect::new(0, 0, 50, 24));
    }

    #[test]
    fn parent_scaling_only_anchors() {
        let dc = RecordingDc::new();
        let mut l = label("Hello").with_parent_scaling(true);
        l.set_bounding_box(Rect::new(0, 0, 100, 24), &dc, 3.0);
        assert_eq!(l.base().scaling(), 3.0);
        assert_eq!(l.base().anchor_point(), Rect::new(0, 0, 100, 24).center());
    }

    #[test]
    fn text_change_invalidates_box() {
        let dc = RecordingDc::new();
        let mut l = label("Hi");
        let before = l.bounding_box(&dc);
        l.set_text("Hello there");
        assert_ne!(l.bounding_box(&dc), before);
        assert_eq!(l.bounding_box(&dc).width, 55);
    }

    #[test]
    fn splits_by_character() {
        let mut l = label("abc");
        l.split_text_by_character();
        assert_eq!(l.text(), "a\nb\nc");
        assert_eq!(l.line_count(), 3);
    }

    #[test]
    fn splits_at_spaces_and_hyphens_past_length() {
        let mut l = label("The quick brown fox jumps over");
        l.split_text_to_fit_length(10);
        assert_eq!(l.text(), "The quick brown\nfox jumps over");

        let mut l = label("well-known stuff");
        l.split_text_to_fit_length(3);
        assert_eq!(l.text(), "well-\nknown\nstuff");

        let mut l = label("short");
        l.split_text_to_fit_length(10);
        assert_eq!(l.text(), "short");
    }

    #[test]
    fn wraps_to_box_with_ellipsis() {
        let dc = RecordingDc::new();
        let mut l = label("one two three four");
        l.split_text_to_fit_bounding_box(&dc, Size::new(50, 30));
        assert_eq!(l.text(), "one two\nthree four");

        let mut l = label("one two three four");
        l.split_text_to_fit_bounding_box(&dc, Size::new(50, 15));
        assert_eq!(l.text(), "one tw\u{2026}");
    }

    #[test]
    fn font_size_to_fit() {
        let dc = RecordingDc::new();
        let size =
            Label::calc_font_size_to_fit_bounding_box(&dc, &Font::default(), Size::new(50, 24), "Hello");
        assert_eq!(size, 20.0);
        let flat = Label::calc_diagonal_font_size(&dc, &Font::default(), Size::new(50, 24), 0.0, "Hello");
        assert_eq!(flat, 20.0);
        let tilted =
            Label::calc_diagonal_font_size(&dc, &Font::default(), Size::new(50, 24), 45.0, "Hello");
        assert!(tilted < flat);
    }

    #[test]
    fn draws_text_at_padded_origin() {
        let mut dc = RecordingDc::new();
        let l = Label::new(
            GraphItemInfo::new("Hi")
                .with_anchoring(Anchoring::TopLeftCorner)
                .with_anchor_point(Pt::new(10, 20))
                .with_padding(3.0, 0.0, 0.0, 4.0),
        );
        l.draw(&mut dc, &RenderContext::default());
        let at = dc.commands().iter().find_map(|c| match c {
            DrawCommand::Text { text, at, .. } if text == "Hi" => Some(*at),
            _ => None,
        });
        assert_eq!(at, Some(Pt::new(14, 23)));
    }

    #[test]
    fn flush_right_aligns_against_padding() {
        let mut dc = RecordingDc::new();
        let l = Label::new(
            GraphItemInfo::new("a\nabcd")
                .with_anchoring(Anchoring::TopLeftCorner)
                .with_anchor_point(Pt::new(0, 0))
                .with_text_alignment(TextAlignment::FlushRight),
        );
        l.draw(&mut dc, &RenderContext::default());
        let xs: Vec<i32> = dc
            .commands()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { at, .. } => Some(at.x),
                _ => None,
            })
            .collect();
        assert_eq!(xs, vec![15, 0]);
    }

    #[test]
    fn justified_lines_widen_gaps() {
        let dc = RecordingDc::new();
        let font = Font::default();
        let line = justify_line(&dc, "a b c", &font, 45);
        assert_eq!(line.len(), 9);
        assert!(line.starts_with("a  "));
        assert_eq!(justify_line(&dc, "single", &font, 100), "single");
    }

    #[test]
    fn index_card_first_rule_is_red() {
        let mut dc = RecordingDc::new();
        let l = Label::new(
            GraphItemInfo::new("one\ntwo\nthree")
                .with_label_style(LabelStyle::IndexCard)
                .with_pen(None),
        );
        l.draw(&mut dc, &RenderContext::default());
        let rules: Vec<Color> = dc
            .commands()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Line { pen: Some(pen), .. } => Some(pen.color),
                _ => None,
            })
            .collect();
        assert!(rules.len() >= 2);
        assert_eq!(rules[0].with_alpha(255), Color::RED);
        assert_eq!(rules[1].with_alpha(255), Color::BLUE);
    }

    #[test]
    fn legend_icons_draw_glyphs() {
        let mut dc = RecordingDc::new();
        let l = Label::new(
            GraphItemInfo::new("first\nsecond")
                .with_padding(0.0, 0.0, 0.0, Label::min_legend_width())
                .with_legend_icons(vec![
                    LegendIcon::new(IconShape::Square, Some(Pen::default()), Some(Brush::solid(Color::RED))),
                    LegendIcon::new(IconShape::Circle, Some(Pen::default()), Some(Brush::solid(Color::BLUE))),
                ]),
        );
        l.draw(&mut dc, &RenderContext::default());
        assert!(dc.commands().iter().any(|c| matches!(c, DrawCommand::Circle { .. })));
        assert!(dc.commands().iter().any(
            |c| matches!(c, DrawCommand::Rectangle { brush: Some(b), .. } if b.color == Color::RED)
        ));
    }

    #[test]
    fn selected_outline_is_dotted() {
        let mut dc = RecordingDc::new();
        let mut l = label("Pick me");
        l.set_selected(true);
        l.draw(&mut dc, &RenderContext::default());
        let dotted = dc.commands().iter().any(|c| {
            matches!(c, DrawCommand::Rectangle { pen: Some(p), .. } if p.style == PenStyle::Dot)
        });
        assert!(dotted);
    }
}
