//! Arbitrary polygons, rectangles and splines, plus the geometry helpers
//! the other items share (point-in-polygon, rectangle corners, arrows).

use glam::DVec2;

use crate::context::RenderContext;
use crate::dc::{BrushChanger, DrawSurface, PenChanger};
use crate::defaults;
use crate::items::info::{BoxCorners, GraphItemInfo};
use crate::items::{GraphItem, GraphItemBase};
use crate::log::warn;
use crate::math::safe_divide;
use crate::types::{Brush, Color, FillDirection, Pen, PenStyle, Pt, Rect, Size};

/// Drawing primitive a polygon is rendered with
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash)]
pub enum PolygonShape {
    Spline,
    Rectangle,
    #[default]
    Irregular,
}

/// Solid or two-colour gradient fill drawn beneath the brush
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackgroundFill {
    pub color1: Color,
    pub color2: Option<Color>,
    pub direction: FillDirection,
}

impl BackgroundFill {
    pub fn solid(color: Color) -> Self {
        Self {
            color1: color,
            color2: None,
            direction: FillDirection::South,
        }
    }

    pub fn gradient(from: Color, to: Color, direction: FillDirection) -> Self {
        Self {
            color1: from,
            color2: Some(to),
            direction,
        }
    }

    pub fn is_gradient(&self) -> bool {
        self.color2.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Polygon {
    base: GraphItemBase,
    points: Vec<Pt>,
    scaled_points: Vec<Pt>,
    background_fill: Option<BackgroundFill>,
    box_corners: BoxCorners,
    shape: PolygonShape,
}

impl Polygon {
    pub fn new(info: GraphItemInfo, points: &[Pt]) -> Self {
        let mut polygon = Self {
            base: GraphItemBase::new(info),
            ..Default::default()
        };
        polygon.set_points(points);
        polygon
    }

    /// Rectangle polygon spanning `rect`.
    pub fn rectangle(info: GraphItemInfo, rect: Rect) -> Self {
        Self::new(info, &rect_points(&rect)).with_shape(PolygonShape::Rectangle)
    }

    pub fn with_shape(mut self, shape: PolygonShape) -> Self {
        self.set_shape(shape);
        self
    }

    pub fn with_background_fill(mut self, fill: BackgroundFill) -> Self {
        self.set_background_fill(Some(fill));
        self
    }

    pub fn with_box_corners(mut self, corners: BoxCorners) -> Self {
        self.set_box_corners(corners);
        self
    }

    /// Replaces the points; an empty slice clears the polygon.
    pub fn set_points(&mut self, points: &[Pt]) {
        self.points.clear();
        self.scaled_points.clear();
        self.points.extend_from_slice(points);
        self.update_point_positions();
    }

    /// Unscaled points as given.
    pub fn points(&self) -> &[Pt] {
        &self.points
    }

    /// Points as drawn.
    pub fn scaled_points(&self) -> &[Pt] {
        &self.scaled_points
    }

    pub fn shape(&self) -> PolygonShape {
        self.shape
    }

    pub fn set_shape(&mut self, shape: PolygonShape) {
        self.shape = shape;
        self.base.invalidate();
    }

    pub fn box_corners(&self) -> BoxCorners {
        self.box_corners
    }

    pub fn set_box_corners(&mut self, corners: BoxCorners) {
        self.box_corners = corners;
    }

    pub fn background_fill(&self) -> Option<&BackgroundFill> {
        self.background_fill.as_ref()
    }

    pub fn set_background_fill(&mut self, fill: Option<BackgroundFill>) {
        self.background_fill = fill;
    }

    /// Copies the raw points into the drawn set; only free-floating
    /// polygons are multiplied by scaling, grid polygons already hold
    /// screen coordinates.
    fn update_point_positions(&mut self) {
        let scaling = self.base.scaling();
        let free_floating = self.base.is_free_floating();
        self.scaled_points = self
            .points
            .iter()
            .map(|&pt| {
                if free_floating {
                    scale_point(pt, scaling)
                } else {
                    pt
                }
            })
            .collect();
        self.base.invalidate();
    }

    fn draw_shape_outline(&self, dc: &mut dyn DrawSurface) {
        if self.shape == PolygonShape::Spline {
            dc.draw_spline(&self.scaled_points);
        } else {
            dc.draw_polygon(&self.scaled_points);
        }
    }
}

impl GraphItem for Polygon {
    fn base(&self) -> &GraphItemBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut GraphItemBase {
        &mut self.base
    }

    fn draw(&self, dc: &mut dyn DrawSurface, ctx: &RenderContext) -> Rect {
        if !self.base.is_shown() || self.scaled_points.is_empty() {
            return Rect::EMPTY;
        }
        let bbox = self.bounding_box(&*dc);
        if self.base.is_in_drag_state() {
            return bbox;
        }

        let mut scaled_pen = self.base.pen().cloned().unwrap_or_else(Pen::transparent);
        scaled_pen.width = self.base.scale_to_screen_and_canvas(scaled_pen.width);
        let mut pen = if self.base.is_selected() {
            Some(
                Pen::new(Color::BLACK)
                    .with_width(2.0 * scaled_pen.width)
                    .with_style(PenStyle::Dot),
            )
        } else {
            Some(scaled_pen)
        };
        // an outline wider than a sliver rectangle would hide its fill
        if self.shape == PolygonShape::Rectangle && self.scaled_points.len() > 1 {
            let span = rect_from_points(&self.scaled_points);
            let width = span.right() - span.left();
            if f64::from(width) <= self.base.scale_to_screen_and_canvas(1.0) {
                pen = None;
            }
        }

        let mut dc = PenChanger::new(dc, pen);
        let outline = self.base.info().outline;

        if let Some(fill) = self.background_fill {
            let mut dc = BrushChanger::new(&mut *dc, Some(Brush::solid(fill.color1)));
            match (fill.color2, self.shape) {
                (Some(color2), PolygonShape::Rectangle) => {
                    let rect = rect_from_points(&self.scaled_points);
                    dc.gradient_fill_linear(rect, fill.color1, color2, fill.direction);
                    if outline.is_complete() {
                        let mut dc = BrushChanger::new(&mut *dc, Some(Brush::transparent()));
                        dc.draw_rectangle(rect);
                    } else if dc.pen().is_some() {
                        let sides = [
                            (outline.top, rect.top_left(), rect.top_right()),
                            (outline.right, rect.top_right(), rect.bottom_right()),
                            (outline.bottom, rect.bottom_right(), rect.bottom_left()),
                            (outline.left, rect.bottom_left(), rect.top_left()),
                        ];
                        for (_, from, to) in sides.iter().filter(|(shown, ..)| *shown) {
                            dc.draw_line(*from, *to);
                        }
                    }
                }
                (Some(_), PolygonShape::Spline) => dc.draw_spline(&self.scaled_points),
                _ => dc.draw_polygon(&self.scaled_points),
            }
        }

        let brush = if self.base.is_selected() && self.base.selection_brush().is_some() {
            self.base.selection_brush().cloned()
        } else {
            self.base.brush().cloned()
        };
        if let Some(brush) = brush {
            let mut dc = BrushChanger::new(&mut *dc, Some(brush));
            match (self.shape, self.box_corners) {
                (PolygonShape::Spline, _) => dc.draw_spline(&self.scaled_points),
                (PolygonShape::Rectangle, BoxCorners::Rounded) => {
                    let radius = self.base.scale_to_screen_and_canvas(ctx.rounded_corner_radius);
                    dc.draw_rounded_rectangle(bbox, radius);
                }
                _ => dc.draw_polygon(&self.scaled_points),
            }
        } else if self.background_fill.is_none() {
            let mut dc = BrushChanger::new(&mut *dc, Some(Brush::transparent()));
            self.draw_shape_outline(&mut *dc);
        }

        if self.base.is_selected() && ctx.draw_debug_boxes() {
            let pen = Pen::new(Color::RED)
                .with_width(self.base.scale_to_screen_and_canvas(2.0))
                .with_style(PenStyle::ShortDash);
            let mut dc = PenChanger::new(&mut *dc, Some(pen));
            let mut outline = rect_points(&bbox).to_vec();
            outline.push(bbox.top_left());
            dc.draw_lines(&outline);
        }
        bbox
    }

    fn bounding_box(&self, _dc: &dyn DrawSurface) -> Rect {
        self.base
            .cached_or(|| polygon_bounding_box(&self.scaled_points))
    }

    fn set_bounding_box(&mut self, _rect: Rect, _dc: &dyn DrawSurface, _parent_scaling: f64) {
        debug_assert!(
            !self.base.is_free_floating(),
            "set_bounding_box() should only be called on fixed objects"
        );
        if self.base.is_free_floating() {
            warn!("set_bounding_box() called on a free-floating polygon");
            return;
        }
        warn!("set_bounding_box() is not supported for polygons");
    }

    fn offset(&mut self, dx: i32, dy: i32) {
        for pt in &mut self.points {
            pt.x += dx;
            pt.y += dy;
        }
        self.update_point_positions();
    }

    fn hit_test(&self, pt: Pt, _dc: &dyn DrawSurface) -> bool {
        is_inside_polygon(pt, &self.scaled_points)
    }

    fn set_scaling(&mut self, scaling: f64) {
        self.base.set_scaling(scaling);
        self.update_point_positions();
    }
}

// ============================================================================
// Geometry helpers
// ============================================================================

fn scale_point(pt: Pt, scaling: f64) -> Pt {
    Pt::new(
        (f64::from(pt.x) * scaling).round() as i32,
        (f64::from(pt.y) * scaling).round() as i32,
    )
}

/// Ray-casting point-in-polygon test.
///
/// Boundary inclusive: vertices, horizontal edges, vertical edges and points
/// within `0.01` of a slanted edge count as inside.
pub fn is_inside_polygon(p: Pt, polygon: &[Pt]) -> bool {
    debug_assert!(!polygon.is_empty(), "empty polygon");
    let n = polygon.len();
    if n == 0 {
        return false;
    }

    let mut crossings = 0u32;
    let mut p1 = polygon[0];
    for i in 1..=n {
        if p == p1 {
            return true;
        }
        let p2 = polygon[i % n];
        let (min_y, max_y) = (p1.y.min(p2.y), p1.y.max(p2.y));

        if p.y < min_y || p.y > max_y {
            p1 = p2;
            continue;
        }

        if p.y > min_y && p.y < max_y {
            if p.x <= p1.x.max(p2.x) {
                if p1.x == p2.x {
                    if p1.x == p.x {
                        return true;
                    }
                    crossings += 1;
                } else {
                    let xinters = f64::from(p.y - p1.y) * f64::from(p2.x - p1.x)
                        / f64::from(p2.y - p1.y)
                        + f64::from(p1.x);
                    if (f64::from(p.x) - xinters).abs() < defaults::INSIDE_POLYGON_EPSILON {
                        return true;
                    }
                    if f64::from(p.x) < xinters {
                        crossings += 1;
                    }
                }
            }
        } else if p1.y == p2.y {
            // ray runs along a horizontal edge
            if p.x >= p1.x.min(p2.x) && p.x <= p1.x.max(p2.x) {
                return true;
            }
        } else if p.y == p2.y && p.x <= p2.x {
            // ray passes through p2: one crossing if the neighbours straddle it
            let p3 = polygon[(i + 1) % n];
            if p.y >= p1.y.min(p3.y) && p.y <= p1.y.max(p3.y) {
                crossings += 1;
            } else {
                crossings += 2;
            }
        }
        p1 = p2;
    }
    crossings % 2 == 1
}

/// Smallest rectangle holding every point (inclusive).
pub fn polygon_bounding_box(points: &[Pt]) -> Rect {
    let Some(first) = points.first() else {
        return Rect::EMPTY;
    };
    let (min, max) = points.iter().fold((*first, *first), |(min, max), pt| {
        (
            Pt::new(min.x.min(pt.x), min.y.min(pt.y)),
            Pt::new(max.x.max(pt.x), max.y.max(pt.y)),
        )
    });
    Rect::from_corners(min, max)
}

/// Corners of `rect`: top-left, top-right, bottom-right, bottom-left.
pub fn rect_points(rect: &Rect) -> [Pt; 4] {
    [
        rect.top_left(),
        rect.top_right(),
        rect.bottom_right(),
        rect.bottom_left(),
    ]
}

/// Rectangle spanned by the first four points.
pub fn rect_from_points(points: &[Pt]) -> Rect {
    polygon_bounding_box(&points[..points.len().min(4)])
}

/// Whether all four corners of `inner` lie inside `outer`.
pub fn is_rect_inside_rect(inner: &Rect, outer: &Rect) -> bool {
    rect_points(inner).iter().all(|pt| outer.contains(*pt))
}

/// Fractions of `inner`'s width and height that lie inside `outer`.
pub fn percent_inside_rect(inner: &Rect, outer: &Rect) -> (f64, f64) {
    if is_rect_inside_rect(inner, outer) {
        return (1.0, 1.0);
    }
    let width_diff = (outer.left() - inner.left()).max(0) + (inner.right() - outer.right()).max(0);
    let height_diff =
        (outer.top() - inner.top()).max(0) + (inner.bottom() - outer.bottom()).max(0);
    (
        safe_divide(f64::from(inner.width - width_diff), f64::from(inner.width)),
        safe_divide(f64::from(inner.height - height_diff), f64::from(inner.height)),
    )
}

/// Size of `rect` divided by `scaling`, at the origin.
pub fn downscale_rect(rect: &Rect, scaling: f64) -> Rect {
    Rect::new(
        0,
        0,
        safe_divide(f64::from(rect.width), scaling) as i32,
        safe_divide(f64::from(rect.height), scaling) as i32,
    )
}

/// Triangle of an arrowhead pointing at `to`; `size` is (width, length).
pub fn arrowhead_points(from: Pt, to: Pt, size: Size<f64>) -> [Pt; 3] {
    let d = (to - from).to_dvec2();
    let length = d.length();
    let u = DVec2::new(safe_divide(d.x, length), safe_divide(d.y, length));
    let v = u.perp();
    let tip = to.to_dvec2();
    let back = tip - size.height * u;
    let half = 0.5 * size.width * v;
    [to, Pt::from_dvec2(back + half), Pt::from_dvec2(back - half)]
}

/// Line from `from` to `to` ending in a filled arrowhead.
///
/// The line tucks one pixel under the head only when it is exactly
/// horizontal; other angles run to the tip.
pub fn draw_arrow(dc: &mut dyn DrawSurface, from: Pt, to: Pt, head: Size<f64>) {
    if !(head.width > 0.0 && head.height > 0.0) {
        warn!("arrowhead size not fully specified");
        return;
    }
    let head_points = arrowhead_points(from, to, head);
    let head_width = head.width as i32;
    let x_adjustment = match (from.y == to.y, from.x <= to.x) {
        (true, true) => -head_width + 1,
        (true, false) => head_width - 1,
        (false, _) => 0,
    };
    dc.draw_line(from, Pt::new(to.x + x_adjustment, to.y));

    let color = dc.pen().map(|p| p.color).unwrap_or(Color::BLACK);
    let mut dc = BrushChanger::new(dc, Some(Brush::solid(color)));
    let mut dc = PenChanger::new(&mut *dc, None);
    dc.draw_polygon(&head_points);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dc::{DrawCommand, RecordingDc};

    fn square() -> Vec<Pt> {
        vec![
            Pt::new(0, 0),
            Pt::new(10, 0),
            Pt::new(10, 10),
            Pt::new(0, 10),
        ]
    }

    // ==================== point-in-polygon tests ====================

    #[test]
    fn interior_and_exterior_points() {
        let sq = square();
        assert!(is_inside_polygon(Pt::new(5, 5), &sq));
        assert!(!is_inside_polygon(Pt::new(15, 5), &sq));
        assert!(!is_inside_polygon(Pt::new(-1, 5), &sq));
        assert!(!is_inside_polygon(Pt::new(5, 11), &sq));
    }

    #[test]
    fn boundary_is_inside() {
        let sq = square();
        assert!(is_inside_polygon(Pt::new(0, 0), &sq), "vertex");
        assert!(is_inside_polygon(Pt::new(5, 0), &sq), "top edge");
        assert!(is_inside_polygon(Pt::new(5, 10), &sq), "bottom edge");
        assert!(is_inside_polygon(Pt::new(10, 5), &sq), "right edge");
        assert!(is_inside_polygon(Pt::new(0, 5), &sq), "left edge");
    }

    #[test]
    fn slanted_edge_is_inside() {
        let tri = [Pt::new(0, 0), Pt::new(10, 10), Pt::new(0, 10)];
        assert!(is_inside_polygon(Pt::new(5, 5), &tri));
        assert!(is_inside_polygon(Pt::new(2, 6), &tri));
        assert!(!is_inside_polygon(Pt::new(6, 2), &tri));
    }

    #[test]
    fn ray_through_vertex() {
        let diamond = [
            Pt::new(5, 0),
            Pt::new(10, 5),
            Pt::new(5, 10),
            Pt::new(0, 5),
        ];
        assert!(is_inside_polygon(Pt::new(3, 5), &diamond));
        assert!(!is_inside_polygon(Pt::new(-3, 5), &diamond));
        assert!(!is_inside_polygon(Pt::new(-3, 0), &diamond));
    }

    // ==================== rect helper tests ====================

    #[test]
    fn rect_corners_round_trip() {
        let rect = Rect::new(3, 4, 20, 10);
        let pts = rect_points(&rect);
        assert_eq!(pts[0], Pt::new(3, 4));
        assert_eq!(pts[1], Pt::new(22, 4));
        assert_eq!(pts[2], Pt::new(22, 13));
        assert_eq!(pts[3], Pt::new(3, 13));
        assert_eq!(rect_from_points(&pts), rect);
        assert_eq!(polygon_bounding_box(&pts), rect);
    }

    #[test]
    fn percent_inside() {
        let outer = Rect::new(0, 0, 100, 100);
        assert_eq!(percent_inside_rect(&Rect::new(10, 10, 10, 10), &outer), (1.0, 1.0));
        let (w, h) = percent_inside_rect(&Rect::new(90, 0, 20, 10), &outer);
        assert_eq!((w, h), (0.5, 1.0));
        assert_eq!(downscale_rect(&Rect::new(5, 5, 40, 20), 2.0), Rect::new(0, 0, 20, 10));
    }

    // ==================== arrow tests ====================

    #[test]
    fn horizontal_arrow_tucks_under_head() {
        let mut dc = RecordingDc::new();
        draw_arrow(&mut dc, Pt::new(0, 0), Pt::new(50, 0), Size::new(10.0, 10.0));
        match &dc.commands()[0] {
            DrawCommand::Line { to, .. } => assert_eq!(*to, Pt::new(41, 0)),
            other => panic!("expected line, got {other:?}"),
        }
        match &dc.commands()[1] {
            DrawCommand::Polygon { points, pen, brush } => {
                assert_eq!(points[0], Pt::new(50, 0));
                assert_eq!(points[1], Pt::new(40, 5));
                assert_eq!(points[2], Pt::new(40, -5));
                assert!(pen.is_none());
                assert_eq!(brush.as_ref().map(|b| b.color), Some(Color::BLACK));
            }
            other => panic!("expected polygon, got {other:?}"),
        }
    }

    #[test]
    fn diagonal_arrow_runs_to_tip() {
        let mut dc = RecordingDc::new();
        draw_arrow(&mut dc, Pt::new(0, 0), Pt::new(30, 40), Size::new(10.0, 10.0));
        match &dc.commands()[0] {
            DrawCommand::Line { to, .. } => assert_eq!(*to, Pt::new(30, 40)),
            other => panic!("expected line, got {other:?}"),
        }
    }

    // ==================== polygon item tests ====================

    #[test]
    fn free_floating_points_are_scaled() {
        let info = GraphItemInfo::default()
            .with_free_floating(true)
            .with_scaling(2.0);
        let poly = Polygon::new(info, &square());
        assert_eq!(poly.scaled_points()[2], Pt::new(20, 20));

        let fixed = Polygon::new(GraphItemInfo::default().with_scaling(2.0), &square());
        assert_eq!(fixed.scaled_points()[2], Pt::new(10, 10));
    }

    #[test]
    fn empty_points_clear_both_sets() {
        let mut poly = Polygon::new(GraphItemInfo::default(), &square());
        poly.set_points(&[]);
        assert!(poly.points().is_empty() && poly.scaled_points().is_empty());
        let dc = RecordingDc::new();
        assert!(poly.bounding_box(&dc).is_empty());
    }

    #[test]
    fn offset_moves_points_and_box() {
        let mut poly = Polygon::new(GraphItemInfo::default(), &square());
        let dc = RecordingDc::new();
        assert_eq!(poly.bounding_box(&dc), Rect::new(0, 0, 11, 11));
        poly.offset(5, 5);
        assert_eq!(poly.bounding_box(&dc), Rect::new(5, 5, 11, 11));
        assert!(poly.hit_test(Pt::new(12, 12), &dc));
    }

    #[test]
    fn thin_rectangle_drops_outline() {
        let info = GraphItemInfo::default()
            .with_pen(Some(Pen::new(Color::BLUE)))
            .with_brush(Some(Brush::solid(Color::GREEN)));
        let poly = Polygon::rectangle(info, Rect::new(0, 0, 1, 30));
        let mut dc = RecordingDc::new();
        poly.draw(&mut dc, &RenderContext::default());
        let drew_without_pen = dc.commands().iter().any(|c| {
            matches!(c, DrawCommand::Polygon { pen: None, brush: Some(b), .. } if b.color == Color::GREEN)
        });
        assert!(drew_without_pen, "{:?}", dc.commands());
    }

    #[test]
    fn outline_only_triangle_keeps_its_pen() {
        let info = GraphItemInfo::default()
            .with_pen(Some(Pen::new(Color::BLUE)))
            .with_brush(None);
        let tri = [Pt::new(0, 0), Pt::new(0, 100), Pt::new(100, 100)];
        let poly = Polygon::new(info, &tri);
        let mut dc = RecordingDc::new();
        poly.draw(&mut dc, &RenderContext::default());
        let outlined = dc.commands().iter().any(|c| {
            matches!(c, DrawCommand::Polygon { pen: Some(p), .. } if p.color == Color::BLUE)
        });
        assert!(outlined, "{:?}", dc.commands());
    }

    #[test]
    fn two_pixel_rectangle_counts_as_a_sliver() {
        let info = GraphItemInfo::default()
            .with_pen(Some(Pen::new(Color::BLUE)))
            .with_brush(Some(Brush::solid(Color::GREEN)));
        let mut dc = RecordingDc::new();
        Polygon::rectangle(info.clone(), Rect::new(0, 0, 2, 30))
            .draw(&mut dc, &RenderContext::default());
        assert!(matches!(dc.commands()[0], DrawCommand::Polygon { pen: None, .. }));

        let mut dc = RecordingDc::new();
        Polygon::rectangle(info, Rect::new(0, 0, 3, 30)).draw(&mut dc, &RenderContext::default());
        assert!(matches!(dc.commands()[0], DrawCommand::Polygon { pen: Some(_), .. }));
    }

    #[test]
    fn gradient_rectangle_uses_gradient_fill() {
        let info = GraphItemInfo::default().with_brush(None);
        let poly = Polygon::rectangle(info, Rect::new(0, 0, 40, 20)).with_background_fill(
            BackgroundFill::gradient(Color::RED, Color::BLUE, FillDirection::East),
        );
        let mut dc = RecordingDc::new();
        poly.draw(&mut dc, &RenderContext::default());
        assert!(matches!(
            dc.commands()[0],
            DrawCommand::GradientFill { rect, .. } if rect == Rect::new(0, 0, 40, 20)
        ));
    }

    #[test]
    fn hidden_polygon_draws_nothing() {
        let poly = Polygon::new(GraphItemInfo::default().with_show(false), &square());
        let mut dc = RecordingDc::new();
        assert!(poly.draw(&mut dc, &RenderContext::default()).is_empty());
        assert!(dc.commands().is_empty());
    }
}
