//! A single anchored glyph.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::context::RenderContext;
use crate::dc::{BrushChanger, DrawSurface, PenChanger};
use crate::defaults;
use crate::items::info::{GraphItemInfo, IconShape, LegendIcon};
use crate::items::polygon::draw_arrow;
use crate::items::{GraphItem, GraphItemBase};
use crate::math::{calculate_downscaled_size, safe_divide};
use crate::types::{Color, Pen, Pt, Rect, Size};

/// Index of a bitmap in an [`ImageTable`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageId(usize);

/// Caller-owned bitmaps that point glyphs refer to by id.
///
/// Cloning the table shares the same storage. Removing an image leaves its
/// id dangling; glyphs that refer to it draw nothing.
#[derive(Clone, Debug, Default)]
pub struct ImageTable {
    images: Rc<RefCell<Vec<Option<RgbaImage>>>>,
}

impl ImageTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, image: RgbaImage) -> ImageId {
        let mut images = self.images.borrow_mut();
        images.push(Some(image));
        ImageId(images.len() - 1)
    }

    pub fn remove(&self, id: ImageId) -> Option<RgbaImage> {
        self.images.borrow_mut().get_mut(id.0).and_then(Option::take)
    }

    pub fn get(&self, id: ImageId) -> Option<Ref<'_, RgbaImage>> {
        Ref::filter_map(self.images.borrow(), |images| {
            images.get(id.0).and_then(Option::as_ref)
        })
        .ok()
    }

    pub fn len(&self) -> usize {
        self.images.borrow().iter().filter(|i| i.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Debug)]
struct IconImage {
    table: ImageTable,
    id: ImageId,
}

#[derive(Debug, Clone)]
pub struct Point2D {
    base: GraphItemBase,
    shape: IconShape,
    radius: f64,
    icon_image: Option<IconImage>,
}

impl Default for Point2D {
    fn default() -> Self {
        Self::new(GraphItemInfo::default(), defaults::DEFAULT_POINT_RADIUS)
    }
}

impl Point2D {
    /// Point at the info's anchor with a radius in DIPs.
    pub fn new(info: GraphItemInfo, radius: f64) -> Self {
        Self {
            base: GraphItemBase::new(info),
            shape: IconShape::Circle,
            radius,
            icon_image: None,
        }
    }

    pub fn with_shape(mut self, shape: IconShape) -> Self {
        self.set_shape(shape);
        self
    }

    /// Uses bitmap `id` from `table` for the [`IconShape::Image`] glyph.
    pub fn with_icon_image(mut self, table: &ImageTable, id: ImageId) -> Self {
        self.icon_image = Some(IconImage {
            table: table.clone(),
            id,
        });
        self
    }

    pub fn shape(&self) -> IconShape {
        self.shape
    }

    pub fn set_shape(&mut self, shape: IconShape) {
        self.shape = shape;
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn set_radius(&mut self, radius: f64) {
        self.radius = radius;
        self.base.invalidate();
    }

    pub fn anchor_point(&self) -> Pt {
        self.base.anchor_point()
    }

    pub fn set_anchor_point(&mut self, pt: Pt) {
        self.base.set_anchor_point(pt);
    }

    /// Whether the anchor has both coordinates set.
    pub fn is_ok(&self) -> bool {
        self.base.anchor_point().is_fully_specified()
    }

    /// Anchor in screen coordinates (free-floating points are scaled).
    pub fn screen_anchor(&self) -> Pt {
        let cp = self.anchor_point();
        if self.base.is_free_floating() {
            let scaling = self.base.scaling();
            Pt::new(
                (f64::from(cp.x) * scaling).round() as i32,
                (f64::from(cp.y) * scaling).round() as i32,
            )
        } else {
            cp
        }
    }

    /// Box of the glyph; needs no device since points have no text.
    pub fn glyph_box(&self) -> Rect {
        if !self.is_ok() {
            return Rect::EMPTY;
        }
        self.base.cached_or(|| {
            let cp = self.screen_anchor();
            let r = self.scaled_radius();
            Rect::new(cp.x - r, cp.y - r, 2 * r, 2 * r)
        })
    }

    pub(crate) fn scaled_radius(&self) -> i32 {
        self.base.scale_to_screen_and_canvas(self.radius).round() as i32
    }

    fn draw_icon_image(&self, dc: &mut dyn DrawSurface, bbox: Rect) {
        let Some(icon) = &self.icon_image else {
            return;
        };
        let Some(img) = icon.table.get(icon.id) else {
            return;
        };
        if img.width() == 0 || img.height() == 0 {
            return;
        }
        let fitted = calculate_downscaled_size(
            Size::new(f64::from(img.width()), f64::from(img.height())),
            bbox.size().to_f64(),
        )
        .round();
        if fitted.is_empty() {
            return;
        }
        let scaled = imageops::resize(
            &*img,
            fitted.width as u32,
            fitted.height as u32,
            FilterType::Lanczos3,
        );
        dc.draw_bitmap(&scaled, bbox.top_left());
    }
}

impl GraphItem for Point2D {
    fn base(&self) -> &GraphItemBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut GraphItemBase {
        &mut self.base
    }

    fn draw(&self, dc: &mut dyn DrawSurface, _ctx: &RenderContext) -> Rect {
        if !self.base.is_shown() || !self.is_ok() {
            return Rect::EMPTY;
        }
        let bbox = self.bounding_box(&*dc);
        if self.base.is_in_drag_state() {
            return bbox;
        }

        let mut dc = BrushChanger::new(dc, self.base.brush().cloned());
        let mid = bbox.center();
        let r = self.scaled_radius();
        let at = |dx: i32, dy: i32| mid + Pt::new(dx, dy);

        match self.shape {
            IconShape::Blank => {}
            IconShape::Square => dc.draw_rectangle(bbox),
            IconShape::HorizontalLine => {
                let y = bbox.top() + bbox.height / 2;
                dc.draw_line(Pt::new(bbox.left(), y), Pt::new(bbox.right(), y));
            }
            IconShape::ArrowRight => {
                let y = bbox.top() + bbox.height / 2;
                let head = LegendIcon::arrowhead_size();
                let head = Size::new(
                    self.base.scale_to_screen_and_canvas(head.width),
                    self.base.scale_to_screen_and_canvas(head.height),
                );
                draw_arrow(&mut *dc, Pt::new(bbox.left(), y), Pt::new(bbox.right(), y), head);
            }
            IconShape::TriangleUpward => dc.draw_polygon(&[at(0, -r), at(-r, r), at(r, r)]),
            IconShape::TriangleDownward => dc.draw_polygon(&[at(0, r), at(-r, -r), at(r, -r)]),
            IconShape::TriangleRight => dc.draw_polygon(&[at(r, 0), at(-r, r), at(-r, -r)]),
            IconShape::TriangleLeft => dc.draw_polygon(&[at(-r, 0), at(r, r), at(r, -r)]),
            IconShape::Diamond => {
                dc.draw_polygon(&[at(0, -r), at(r, 0), at(0, r), at(-r, 0)]);
            }
            IconShape::Cross | IconShape::Asterisk => {
                let color = dc.brush().map_or(Color::BLACK, |b| b.color);
                let width = dc.pen().map_or(1.0, |p| p.width) * 2.0;
                let mut dc = PenChanger::new(&mut *dc, Some(Pen::new(color).with_width(width)));
                dc.draw_line(at(0, -r), at(0, r));
                dc.draw_line(at(-r, 0), at(r, 0));
                if self.shape == IconShape::Asterisk {
                    dc.draw_line(at(r, r), at(-r, -r));
                    dc.draw_line(at(-r, r), at(r, -r));
                }
            }
            IconShape::Hexagon => dc.draw_polygon(&[
                at(-r / 2, -r),
                at(-r, 0),
                at(-r / 2, r),
                at(r / 2, r),
                at(r, 0),
                at(r / 2, -r),
            ]),
            IconShape::BoxPlot => {
                let cx = bbox.left() + bbox.width / 2;
                let cap = bbox.width / 4;
                dc.draw_line(Pt::new(cx, bbox.top()), Pt::new(cx, bbox.bottom()));
                dc.draw_line(Pt::new(cx - cap, bbox.top()), Pt::new(cx + cap, bbox.top()));
                dc.draw_line(
                    Pt::new(cx - cap, bbox.bottom()),
                    Pt::new(cx + cap, bbox.bottom()),
                );
                let mut box_rect = bbox;
                box_rect.y += bbox.height / 2 - bbox.height / 4;
                box_rect.height = bbox.height / 2;
                dc.draw_rectangle(box_rect);
                let median = box_rect.top() + box_rect.height / 2;
                dc.draw_line(
                    Pt::new(box_rect.left(), median),
                    Pt::new(box_rect.right(), median),
                );
            }
            IconShape::Image => self.draw_icon_image(&mut *dc, bbox),
            _ => dc.draw_circle(mid, r),
        }
        bbox
    }

    fn bounding_box(&self, _dc: &dyn DrawSurface) -> Rect {
        self.glyph_box()
    }

    fn set_bounding_box(&mut self, rect: Rect, dc: &dyn DrawSurface, _parent_scaling: f64) {
        debug_assert!(
            !self.base.is_free_floating(),
            "set_bounding_box() should only be called on fixed objects"
        );
        if self.base.is_free_floating() {
            return;
        }
        self.set_anchor_point(rect.center());
        let bbox = self.bounding_box(dc);
        let best_fit = safe_divide(f64::from(rect.width), f64::from(bbox.width))
            .min(safe_divide(f64::from(rect.height), f64::from(bbox.height)));
        if best_fit > 1.0 {
            let scaling = self.base.scaling() * best_fit;
            self.base.set_scaling(scaling);
        }
    }

    fn offset(&mut self, dx: i32, dy: i32) {
        let pt = self.anchor_point();
        self.set_anchor_point(Pt::new(pt.x + dx, pt.y + dy));
    }

    fn hit_test(&self, pt: Pt, dc: &dyn DrawSurface) -> bool {
        self.bounding_box(dc).contains(pt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dc::{DrawCommand, RecordingDc};
    use crate::types::Brush;

    fn point_at(x: i32, y: i32) -> Point2D {
        Point2D::new(
            GraphItemInfo::default().with_anchor_point(Pt::new(x, y)),
            4.0,
        )
    }

    #[test]
    fn bounding_box_surrounds_anchor() {
        let dc = RecordingDc::new();
        let pt = point_at(50, 50);
        assert_eq!(pt.bounding_box(&dc), Rect::new(46, 46, 8, 8));
        assert!(pt.hit_test(Pt::new(52, 48), &dc));
        assert!(!pt.hit_test(Pt::new(60, 50), &dc));
    }

    #[test]
    fn unset_anchor_is_not_ok() {
        let dc = RecordingDc::new();
        let pt = point_at(-1, 20);
        assert!(!pt.is_ok());
        assert!(pt.bounding_box(&dc).is_empty());
        let mut rec = RecordingDc::new();
        assert!(pt.draw(&mut rec, &RenderContext::default()).is_empty());
    }

    #[test]
    fn free_floating_anchor_is_scaled() {
        let dc = RecordingDc::new();
        let pt = Point2D::new(
            GraphItemInfo::default()
                .with_anchor_point(Pt::new(10, 10))
                .with_free_floating(true)
                .with_scaling(2.0),
            4.0,
        );
        assert_eq!(pt.bounding_box(&dc), Rect::new(12, 12, 16, 16));
    }

    #[test]
    fn set_bounding_box_recentres_and_grows() {
        let dc = RecordingDc::new();
        let mut pt = point_at(0, 0);
        pt.set_bounding_box(Rect::new(100, 100, 40, 40), &dc, 1.0);
        assert_eq!(pt.anchor_point(), Pt::new(120, 120));
        assert_eq!(pt.base().scaling(), 5.0);
        assert_eq!(pt.bounding_box(&dc), Rect::new(100, 100, 40, 40));
    }

    #[test]
    fn offset_invalidates_box() {
        let dc = RecordingDc::new();
        let mut pt = point_at(50, 50);
        let before = pt.bounding_box(&dc);
        pt.offset(10, -5);
        assert_eq!(pt.bounding_box(&dc), before.offset(10, -5));
    }

    #[test]
    fn glyphs_use_item_brush() {
        let mut dc = RecordingDc::new();
        let pt = Point2D::new(
            GraphItemInfo::default()
                .with_anchor_point(Pt::new(20, 20))
                .with_brush(Some(Brush::solid(Color::RED))),
            4.0,
        )
        .with_shape(IconShape::Diamond);
        pt.draw(&mut dc, &RenderContext::default());
        match &dc.commands()[0] {
            DrawCommand::Polygon { points, brush, .. } => {
                assert_eq!(points.len(), 4);
                assert_eq!(points[0], Pt::new(20, 16));
                assert_eq!(brush.as_ref().map(|b| b.color), Some(Color::RED));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn cross_pen_takes_brush_colour() {
        let mut dc = RecordingDc::new();
        let pt = Point2D::new(
            GraphItemInfo::default()
                .with_anchor_point(Pt::new(20, 20))
                .with_brush(Some(Brush::solid(Color::BLUE))),
            4.0,
        )
        .with_shape(IconShape::Asterisk);
        pt.draw(&mut dc, &RenderContext::default());
        let lines: Vec<_> = dc
            .commands()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Line { pen, .. } => pen.clone(),
                _ => None,
            })
            .collect();
        assert_eq!(lines.len(), 4);
        assert!(lines.iter().all(|p| p.color == Color::BLUE && p.width == 2.0));
    }

    #[test]
    fn image_glyph_is_downscaled_into_box() {
        let table = ImageTable::new();
        let id = table.insert(RgbaImage::new(32, 16));
        let pt = point_at(50, 50)
            .with_shape(IconShape::Image)
            .with_icon_image(&table, id);
        let mut dc = RecordingDc::new();
        pt.draw(&mut dc, &RenderContext::default());
        assert_eq!(
            dc.commands(),
            &[DrawCommand::Bitmap {
                at: Pt::new(46, 46),
                width: 8,
                height: 4
            }]
        );

        table.remove(id);
        let mut dc = RecordingDc::new();
        pt.draw(&mut dc, &RenderContext::default());
        assert!(dc.commands().is_empty(), "dangling image draws nothing");
    }
}
