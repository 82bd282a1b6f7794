//! Empty grid cells.

use crate::context::RenderContext;
use crate::dc::{BrushChanger, DrawSurface, PenChanger};
use crate::items::info::GraphItemInfo;
use crate::items::{GraphItem, GraphItemBase};
use crate::math::safe_divide;
use crate::types::{Color, Pen, PenStyle, Pt, Rect, Size};

/// Blank filler that takes up a canvas cell.
///
/// Spacers draw nothing and can only be selected when the caller turns on
/// debug selection, so their boxes can be inspected.
#[derive(Debug, Clone)]
pub struct Spacer {
    base: GraphItemBase,
    /// Box size in DIPs, before scaling.
    size: Size<f64>,
}

impl Default for Spacer {
    fn default() -> Self {
        Self::new(GraphItemInfo::default())
    }
}

impl Spacer {
    pub fn new(info: GraphItemInfo) -> Self {
        let mut base = GraphItemBase::new(info);
        base.set_selectable(false);
        Self {
            base,
            size: Size::new(0.0, 0.0),
        }
    }

    /// Lets the spacer be selected, for debugging layouts.
    pub fn with_debug_selection(mut self, enabled: bool) -> Self {
        self.base.set_selectable(enabled);
        self
    }

    pub fn size(&self) -> Size<f64> {
        self.size
    }
}

impl GraphItem for Spacer {
    fn base(&self) -> &GraphItemBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut GraphItemBase {
        &mut self.base
    }

    fn draw(&self, dc: &mut dyn DrawSurface, ctx: &RenderContext) -> Rect {
        let bbox = self.bounding_box(&*dc);
        if self.base.is_selected() && ctx.draw_debug_boxes() {
            let pen = Pen::new(Color::RED)
                .with_width(self.base.scale_to_screen_and_canvas(2.0))
                .with_style(PenStyle::ShortDash);
            let mut dc = PenChanger::new(dc, Some(pen));
            let mut dc = BrushChanger::new(&mut *dc, None);
            dc.draw_rectangle(bbox);
        }
        bbox
    }

    fn bounding_box(&self, _dc: &dyn DrawSurface) -> Rect {
        self.base.cached_or(|| {
            let scaling = self.base.scaling();
            Rect::from_point_size(
                self.base.anchor_point(),
                Size::new(
                    (self.size.width * scaling).round() as i32,
                    (self.size.height * scaling).round() as i32,
                ),
            )
        })
    }

    fn set_bounding_box(&mut self, rect: Rect, _dc: &dyn DrawSurface, _parent_scaling: f64) {
        let scaling = self.base.scaling();
        self.size = Size::new(
            safe_divide(f64::from(rect.width), scaling),
            safe_divide(f64::from(rect.height), scaling),
        );
        self.base.set_anchor_point(rect.top_left());
    }

    fn offset(&mut self, dx: i32, dy: i32) {
        let pt = self.base.anchor_point();
        self.base.set_anchor_point(Pt::new(pt.x + dx, pt.y + dy));
    }

    fn hit_test(&self, pt: Pt, dc: &dyn DrawSurface) -> bool {
        self.bounding_box(dc).contains(pt)
    }
}
