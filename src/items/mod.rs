//! Drawable graph items.
//!
//! Every item implements [`GraphItem`]; the closed set of item kinds is
//! [`GraphItemEnum`], dispatched statically through `enum_dispatch`.

pub mod base;
pub mod image;
pub mod info;
pub mod label;
pub mod point;
pub mod points;
pub mod polygon;
pub mod spacer;

use std::cell::RefCell;
use std::rc::Rc;

use enum_dispatch::enum_dispatch;

pub use base::GraphItemBase;
pub use self::image::{Image, ImageEffect, ResizeMethod};
pub use info::{
    Anchoring, BoxCorners, GraphItemInfo, HeaderInfo, IconShape, LabelFit, LabelStyle,
    LegendIcon, LineStyle, Orientation, Outline, PageHorizontalAlignment, PageVerticalAlignment,
    RelativeAlignment, ShadowType, Spacing, TextAlignment,
};
pub use label::Label;
pub use point::{ImageId, ImageTable, Point2D};
pub use points::Points2D;
pub use polygon::{BackgroundFill, Polygon, PolygonShape};
pub use spacer::Spacer;

use crate::context::RenderContext;
use crate::dc::DrawSurface;
use crate::graphs::Graph2D;
use crate::types::{Pt, Rect};

/// The contract every drawable item satisfies
#[enum_dispatch]
pub trait GraphItem {
    fn base(&self) -> &GraphItemBase;
    fn base_mut(&mut self) -> &mut GraphItemBase;

    /// Renders the item and returns the box it occupied (empty when hidden).
    fn draw(&self, dc: &mut dyn DrawSurface, ctx: &RenderContext) -> Rect;

    fn bounding_box(&self, dc: &dyn DrawSurface) -> Rect;

    /// Fits the item into `rect`. Only valid for items placed on a canvas
    /// grid; free-floating items ignore it.
    fn set_bounding_box(&mut self, rect: Rect, dc: &dyn DrawSurface, parent_scaling: f64);

    fn offset(&mut self, dx: i32, dy: i32);

    fn hit_test(&self, pt: Pt, dc: &dyn DrawSurface) -> bool;

    fn is_selected(&self) -> bool {
        self.base().is_selected()
    }

    fn set_selected(&mut self, selected: bool) {
        self.base_mut().set_selected(selected);
    }

    fn clear_selections(&mut self) {
        self.set_selected(false);
    }

    fn set_scaling(&mut self, scaling: f64) {
        self.base_mut().set_scaling(scaling);
    }

    fn set_dpi_scale_factor(&mut self, factor: f64) {
        self.base_mut().set_dpi_scale_factor(factor);
    }

    /// Repositions children after a bounding-box change.
    fn recalc_sizes(&mut self, _dc: &dyn DrawSurface) {}

    /// Re-applies selection to rebuilt children.
    fn update_selected_items(&mut self) {}

    /// Area of the item that holds content, falling back to its full box.
    fn content_rect(&self, dc: &dyn DrawSurface) -> Rect {
        let bbox = self.bounding_box(dc);
        let base = self.base();
        let left = base.content_left().unwrap_or(bbox.left());
        let top = base.content_top().unwrap_or(bbox.top());
        let right = base.content_right().unwrap_or(bbox.right());
        let bottom = base.content_bottom().unwrap_or(bbox.bottom());
        Rect::from_corners(Pt::new(left, top), Pt::new(right, bottom))
    }

    /// Toggles selection when `pt` hits a selectable item.
    fn select_if_hit(&mut self, pt: Pt, dc: &dyn DrawSurface) -> bool {
        if self.base().is_selectable() && self.base().is_shown() && self.hit_test(pt, dc) {
            let selected = self.is_selected();
            self.set_selected(!selected);
            true
        } else {
            false
        }
    }

    fn draw_selection_label(
        &self,
        dc: &mut dyn DrawSurface,
        scaling: f64,
        containing: Rect,
        ctx: &RenderContext,
    ) {
        let bbox = self.bounding_box(&*dc);
        self.base()
            .draw_selection_label(dc, scaling, bbox, containing, ctx);
    }
}

/// Every item kind the canvas can hold
#[enum_dispatch(GraphItem)]
#[derive(Debug, Clone)]
pub enum GraphItemEnum {
    Point2D,
    Points2D,
    Polygon,
    Label,
    Image,
    Spacer,
    Graph2D,
}

/// Shared handle to a canvas-owned item
pub type ItemHandle = Rc<RefCell<GraphItemEnum>>;

/// Wraps an item in a canvas handle.
pub fn handle(item: impl Into<GraphItemEnum>) -> ItemHandle {
    Rc::new(RefCell::new(item.into()))
}

macro_rules! variant_accessors {
    ($($as_ref:ident, $as_mut:ident => $variant:ident;)*) => {
        impl GraphItemEnum {
            $(
                pub fn $as_ref(&self) -> Option<&$variant> {
                    match self {
                        GraphItemEnum::$variant(item) => Some(item),
                        _ => None,
                    }
                }

                pub fn $as_mut(&mut self) -> Option<&mut $variant> {
                    match self {
                        GraphItemEnum::$variant(item) => Some(item),
                        _ => None,
                    }
                }
            )*
        }
    };
}

variant_accessors! {
    as_point, as_point_mut => Point2D;
    as_points, as_points_mut => Points2D;
    as_polygon, as_polygon_mut => Polygon;
    as_label, as_label_mut => Label;
    as_image, as_image_mut => Image;
    as_spacer, as_spacer_mut => Spacer;
    as_graph, as_graph_mut => Graph2D;
}
