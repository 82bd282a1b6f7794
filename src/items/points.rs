//! A collection of points, optionally joined by lines, arrows or splines.

use std::cell::Cell;
use std::collections::BTreeSet;

use crate::context::RenderContext;
use crate::dc::{BrushChanger, DrawSurface, PenChanger};
use crate::defaults;
use crate::items::info::{GraphItemInfo, IconShape, LineStyle};
use crate::items::base::{nudge_label_inside, selection_label};
use crate::items::point::Point2D;
use crate::items::polygon::draw_arrow;
use crate::items::{GraphItem, GraphItemBase};
use crate::log::{trace, warn};
use crate::types::{Brush, Color, Pen, PenStyle, Pt, Rect, Size};

#[derive(Debug, Clone, Default)]
pub struct Points2D {
    base: GraphItemBase,
    points: Vec<Point2D>,
    line_style: LineStyle,
    bbox: Rect,
    next_id: i64,
    single_point_selection: bool,
    last_hit: Cell<Option<usize>>,
    selected_ids: BTreeSet<i64>,
}

impl Points2D {
    /// Empty collection; the info's pen draws the connecting lines.
    pub fn new(info: GraphItemInfo) -> Self {
        Self {
            base: GraphItemBase::new(info),
            single_point_selection: true,
            ..Default::default()
        }
    }

    /// Collection whose connecting lines use `pen` (`None` for no lines).
    pub fn with_pen(pen: Option<Pen>) -> Self {
        Self::new(GraphItemInfo::default().with_pen(pen))
    }

    pub fn with_line_style(mut self, style: LineStyle) -> Self {
        self.line_style = style;
        self
    }

    pub fn line_style(&self) -> LineStyle {
        self.line_style
    }

    pub fn set_line_style(&mut self, style: LineStyle) {
        self.line_style = style;
    }

    /// When on, selecting the collection toggles only the last-hit point.
    pub fn set_single_point_selection(&mut self, single: bool) {
        self.single_point_selection = single;
    }

    pub fn is_single_point_selection(&self) -> bool {
        self.single_point_selection
    }

    pub fn points(&self) -> &[Point2D] {
        &self.points
    }

    /// Index of the point found by the latest hit test.
    pub fn last_hit_index(&self) -> Option<usize> {
        self.last_hit.get()
    }

    /// Ids of individually selected points.
    pub fn selected_ids(&self) -> &BTreeSet<i64> {
        &self.selected_ids
    }

    /// Appends a point, giving it the next id and the collection's scaling,
    /// and grows the running box to cover it.
    pub fn add_point(&mut self, mut point: Point2D, _dc: &dyn DrawSurface) {
        point.base_mut().set_id(self.next_id);
        self.next_id += 1;
        if let Some(dpi) = self.base.info().dpi_scale_factor {
            point.set_dpi_scale_factor(dpi);
        }
        point.set_scaling(self.base.scaling());
        if self.base.is_free_floating() {
            point.base_mut().set_free_floating(true);
        }

        let point_box = point.glyph_box();
        if self.points.is_empty() || self.bbox.is_empty() {
            self.bbox = point_box;
        } else if !point_box.is_empty() {
            merge_corners(&mut self.bbox, &point_box);
        }
        self.points.push(point);
        self.base.invalidate();
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.bbox = Rect::EMPTY;
        self.last_hit.set(None);
        self.base.invalidate();
    }

    /// Propagates free-floating state to every point.
    pub fn set_free_floating(&mut self, free_floating: bool) {
        self.base.set_free_floating(free_floating);
        for point in &mut self.points {
            point.base_mut().set_free_floating(free_floating);
        }
        self.rebuild_bounding_box();
    }

    fn rebuild_bounding_box(&mut self) {
        self.bbox = self
            .points
            .iter()
            .fold(Rect::EMPTY, |acc, pt| acc.union(&pt.glyph_box()));
        self.base.invalidate();
    }

    fn draw_connections(&self, dc: &mut dyn DrawSurface, pen: &Pen) {
        let ok_count = self.points.iter().filter(|p| p.is_ok()).count();
        match ok_count {
            0 => {}
            1 => {
                if let Some(pt) = self
                    .points
                    .iter()
                    .find(|p| p.is_ok() && p.shape() == IconShape::Blank)
                {
                    let mut dc = BrushChanger::new(dc, Some(Brush::solid(pen.color)));
                    dc.draw_circle(pt.screen_anchor(), pt.scaled_radius());
                }
            }
            _ if self.line_style == LineStyle::Spline => {
                for run in self.points.split(|p| !p.is_ok()) {
                    if run.len() > 1 {
                        let pts: Vec<Pt> = run.iter().map(Point2D::screen_anchor).collect();
                        dc.draw_spline(&pts);
                    }
                }
            }
            _ => {
                let head = self.base.scale_to_screen_and_canvas(defaults::ARROWHEAD_SIZE);
                for pair in self.points.windows(2) {
                    let (a, b) = (&pair[0], &pair[1]);
                    if !(a.is_ok() && b.is_ok()) {
                        continue;
                    }
                    match self.line_style {
                        LineStyle::Arrows => draw_arrow(
                            dc,
                            a.screen_anchor(),
                            b.screen_anchor(),
                            Size::new(head, head),
                        ),
                        _ => dc.draw_line(a.screen_anchor(), b.screen_anchor()),
                    }
                }
            }
        }
    }
}

/// Grows `bbox` corner by corner to cover `other`.
fn merge_corners(bbox: &mut Rect, other: &Rect) {
    if other.left() < bbox.left() {
        bbox.set_left(other.left());
    }
    if other.top() < bbox.top() {
        bbox.set_top(other.top());
    }
    if other.right() > bbox.right() {
        bbox.set_right(other.right());
    }
    if other.bottom() > bbox.bottom() {
        bbox.set_bottom(other.bottom());
    }
}

impl GraphItem for Points2D {
    fn base(&self) -> &GraphItemBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut GraphItemBase {
        &mut self.base
    }

    fn draw(&self, dc: &mut dyn DrawSurface, ctx: &RenderContext) -> Rect {
        if !self.base.is_shown() || self.points.is_empty() {
            return Rect::EMPTY;
        }
        if self.base.is_in_drag_state() {
            return self.bbox;
        }
        if !self.points.iter().any(Point2D::is_ok) {
            return Rect::EMPTY;
        }

        if let Some(pen) = self.base.scaled_pen() {
            let mut dc = PenChanger::new(&mut *dc, Some(pen.clone()));
            self.draw_connections(&mut *dc, &pen);
        }

        let all_selected = !self.single_point_selection && self.base.is_selected();
        let glyph_pen = if all_selected {
            let width = self.base.pen().map_or(1.0, |p| p.width);
            Pen::new(Color::BLACK)
                .with_width(self.base.scale_to_screen_and_canvas(width))
                .with_style(PenStyle::Dot)
        } else {
            Pen::new(Color::BLACK).with_width(self.base.scale_to_screen_and_canvas(1.0))
        };
        let mut dc = PenChanger::new(dc, Some(glyph_pen));
        let selected_pen = Pen::new(Color::BLACK)
            .with_width(self.base.scale_to_screen_and_canvas(2.0))
            .with_style(PenStyle::Dot);
        for point in &self.points {
            if !all_selected && point.is_selected() {
                let mut dc = PenChanger::new(&mut *dc, Some(selected_pen.clone()));
                point.draw(&mut *dc, ctx);
            } else {
                point.draw(&mut *dc, ctx);
            }
        }
        self.bbox
    }

    fn bounding_box(&self, _dc: &dyn DrawSurface) -> Rect {
        self.bbox
    }

    fn set_bounding_box(&mut self, _rect: Rect, _dc: &dyn DrawSurface, _parent_scaling: f64) {
        warn!("set_bounding_box() is not supported for point collections");
    }

    fn offset(&mut self, dx: i32, dy: i32) {
        for point in &mut self.points {
            point.offset(dx, dy);
        }
        self.bbox = self.bbox.offset(dx, dy);
        self.base.invalidate();
    }

    fn hit_test(&self, pt: Pt, _dc: &dyn DrawSurface) -> bool {
        let hit = self.points.iter().position(|p| p.glyph_box().contains(pt));
        trace!(?hit, "points hit test");
        self.last_hit.set(hit);
        hit.is_some()
    }

    fn set_selected(&mut self, selected: bool) {
        self.base.set_selected(selected);
        if !self.single_point_selection {
            for point in &mut self.points {
                point.set_selected(selected);
            }
            return;
        }

        // restore selections after the owner rebuilt the collection
        if selected {
            for point in &mut self.points {
                if self.selected_ids.contains(&point.base().id()) {
                    point.set_selected(true);
                }
            }
        }
        if let Some(point) = self.last_hit.get().and_then(|i| self.points.get_mut(i)) {
            let now_selected = !point.is_selected();
            point.set_selected(now_selected);
            let id = point.base().id();
            if now_selected {
                self.selected_ids.insert(id);
            } else {
                self.selected_ids.remove(&id);
                if self.selected_ids.is_empty() {
                    self.base.set_selected(false);
                }
            }
        }
    }

    fn clear_selections(&mut self) {
        self.base.set_selected(false);
        self.selected_ids.clear();
        for point in &mut self.points {
            point.set_selected(false);
        }
    }

    fn set_scaling(&mut self, scaling: f64) {
        self.base.set_scaling(scaling);
        let scaling = self.base.scaling();
        for point in &mut self.points {
            point.set_scaling(scaling);
        }
        self.rebuild_bounding_box();
    }

    fn set_dpi_scale_factor(&mut self, factor: f64) {
        self.base.set_dpi_scale_factor(factor);
        let factor = self.base.dpi_scale_factor();
        for point in &mut self.points {
            point.set_dpi_scale_factor(factor);
        }
        self.rebuild_bounding_box();
    }

    /// One label per selected point (or one for the whole collection when
    /// selection is collection-wide).
    fn draw_selection_label(
        &self,
        dc: &mut dyn DrawSurface,
        scaling: f64,
        containing: Rect,
        ctx: &RenderContext,
    ) {
        if !self.single_point_selection {
            let bbox = self.bbox;
            self.base
                .draw_selection_label(dc, scaling, bbox, containing, ctx);
            return;
        }
        for point in self.points.iter().filter(|p| p.is_selected()) {
            if !point.base().is_showing_label_when_selected() || point.base().text().is_empty() {
                continue;
            }
            let anchor = point.glyph_box().center();
            let mut label = selection_label(point.base().info(), anchor, scaling);
            let label_box = label.bounding_box(&*dc);
            nudge_label_inside(&mut label, label_box, containing);
            label.draw(dc, ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dc::{DrawCommand, RecordingDc};

    fn point(x: i32, y: i32) -> Point2D {
        Point2D::new(GraphItemInfo::default().with_anchor_point(Pt::new(x, y)), 4.0)
    }

    fn collection(coords: &[(i32, i32)]) -> Points2D {
        let dc = RecordingDc::new();
        let mut points = Points2D::with_pen(Some(Pen::new(Color::BLUE)));
        for &(x, y) in coords {
            points.add_point(point(x, y), &dc);
        }
        points
    }

    #[test]
    fn running_box_matches_union() {
        let pts = collection(&[(50, 50), (10, 80), (90, 20), (40, 40)]);
        let union = pts
            .points()
            .iter()
            .fold(Rect::EMPTY, |acc, p| acc.union(&p.glyph_box()));
        let dc = RecordingDc::new();
        assert_eq!(pts.bounding_box(&dc), union);
        assert_eq!(union, Rect::new(6, 16, 88, 68));
    }

    #[test]
    fn ids_increase_monotonically() {
        let pts = collection(&[(1, 1), (2, 2), (3, 3)]);
        let ids: Vec<i64> = pts.points().iter().map(|p| p.base().id()).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn hit_test_records_first_hit() {
        let pts = collection(&[(10, 10), (12, 12), (100, 100)]);
        let dc = RecordingDc::new();
        assert!(pts.hit_test(Pt::new(11, 11), &dc));
        assert_eq!(pts.last_hit_index(), Some(0));
        assert!(pts.hit_test(Pt::new(100, 100), &dc));
        assert_eq!(pts.last_hit_index(), Some(2));
        assert!(!pts.hit_test(Pt::new(500, 500), &dc));
        assert_eq!(pts.last_hit_index(), None);
    }

    #[test]
    fn single_point_selection_toggles_hit_point() {
        let mut pts = collection(&[(10, 10), (50, 50)]);
        let dc = RecordingDc::new();
        assert!(pts.select_if_hit(Pt::new(50, 50), &dc));
        assert!(pts.is_selected());
        assert!(!pts.points()[0].is_selected());
        assert!(pts.points()[1].is_selected());
        assert_eq!(pts.selected_ids().iter().copied().collect::<Vec<_>>(), vec![1]);

        // deselecting the only selected point clears the collection
        assert!(pts.select_if_hit(Pt::new(50, 50), &dc));
        assert!(!pts.points()[1].is_selected());
        assert!(!pts.is_selected());
        assert!(pts.selected_ids().is_empty());
    }

    #[test]
    fn collection_selection_applies_to_all() {
        let mut pts = collection(&[(10, 10), (50, 50)]);
        pts.set_single_point_selection(false);
        pts.set_selected(true);
        assert!(pts.points().iter().all(|p| p.is_selected()));
    }

    #[test]
    fn offset_moves_points_and_box() {
        let mut pts = collection(&[(10, 10), (50, 50)]);
        let dc = RecordingDc::new();
        let before = pts.bounding_box(&dc);
        pts.offset(5, 7);
        assert_eq!(pts.bounding_box(&dc), before.offset(5, 7));
        assert_eq!(pts.points()[0].anchor_point(), Pt::new(15, 17));
    }

    #[test]
    fn scaling_change_rebuilds_box() {
        let mut pts = collection(&[(10, 10), (50, 50)]);
        pts.set_scaling(2.0);
        let dc = RecordingDc::new();
        assert_eq!(pts.bounding_box(&dc), Rect::new(2, 2, 56, 56));
    }

    #[test]
    fn lines_connect_valid_neighbours_only() {
        let pts = collection(&[(10, 10), (20, 20), (-1, -1), (40, 40), (50, 50)]);
        let mut dc = RecordingDc::new();
        pts.draw(&mut dc, &RenderContext::default());
        let lines: Vec<(Pt, Pt)> = dc
            .commands()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Line { from, to, .. } => Some((*from, *to)),
                _ => None,
            })
            .collect();
        assert_eq!(
            lines,
            vec![
                (Pt::new(10, 10), Pt::new(20, 20)),
                (Pt::new(40, 40), Pt::new(50, 50))
            ]
        );
    }

    #[test]
    fn splines_break_at_invalid_points() {
        let pts = collection(&[(0, 0), (10, 5), (20, 0), (-1, -1), (40, 0), (50, 5)])
            .with_line_style(LineStyle::Spline);
        let mut dc = RecordingDc::new();
        pts.draw(&mut dc, &RenderContext::default());
        let splines: Vec<usize> = dc
            .commands()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Spline { points, .. } => Some(points.len()),
                _ => None,
            })
            .collect();
        assert_eq!(splines, vec![3, 2]);
    }

    #[test]
    fn no_valid_points_draws_nothing() {
        let pts = collection(&[(-1, -1)]);
        let mut dc = RecordingDc::new();
        assert!(pts.draw(&mut dc, &RenderContext::default()).is_empty());
        assert!(dc.commands().is_empty());
    }
}
