//! State shared by every drawable item.
//!
//! Each concrete item embeds a [`GraphItemBase`]. It owns the item's
//! [`GraphItemInfo`], selection and drag flags, the content-alignment edges
//! the canvas uses, and a bounding-box cache keyed on a generation counter:
//! every mutation goes through [`GraphItemBase::info_mut`] or one of the
//! setters, bumps the generation, and thereby invalidates whatever was cached.

use std::cell::Cell;

use crate::context::RenderContext;
use crate::dc::DrawSurface;
use crate::defaults;
use crate::items::info::{Anchoring, GraphItemInfo, Spacing};
use crate::items::label::Label;
use crate::items::GraphItem;
use crate::log::warn;
use crate::math::safe_divide;
use crate::types::{Brush, Color, Font, Pen, Pt, Rect};

#[derive(Clone, Copy, Debug, PartialEq)]
struct CachedBox {
    generation: u64,
    bbox: Rect,
    content: Option<Rect>,
}

/// Common item state
#[derive(Debug)]
pub struct GraphItemBase {
    info: GraphItemInfo,
    selected: bool,
    in_drag_state: bool,
    content_top: Option<i32>,
    content_bottom: Option<i32>,
    content_left: Option<i32>,
    content_right: Option<i32>,
    generation: u64,
    cache: Cell<Option<CachedBox>>,
}

impl Clone for GraphItemBase {
    fn clone(&self) -> Self {
        Self {
            info: self.info.clone(),
            selected: self.selected,
            in_drag_state: self.in_drag_state,
            content_top: self.content_top,
            content_bottom: self.content_bottom,
            content_left: self.content_left,
            content_right: self.content_right,
            generation: self.generation,
            cache: Cell::new(self.cache.get()),
        }
    }
}

impl Default for GraphItemBase {
    fn default() -> Self {
        Self::new(GraphItemInfo::default())
    }
}

impl GraphItemBase {
    pub fn new(info: GraphItemInfo) -> Self {
        Self {
            info,
            selected: false,
            in_drag_state: false,
            content_top: None,
            content_bottom: None,
            content_left: None,
            content_right: None,
            generation: 0,
            cache: Cell::new(None),
        }
    }

    pub fn with_scaling_and_label(scaling: f64, text: impl Into<String>) -> Self {
        Self::new(GraphItemInfo::new(text).with_scaling(scaling))
    }

    // ------------------------------------------------------------------
    // Info and cache
    // ------------------------------------------------------------------

    pub fn info(&self) -> &GraphItemInfo {
        &self.info
    }

    /// Mutable access to the attributes; invalidates cached boxes.
    pub fn info_mut(&mut self) -> &mut GraphItemInfo {
        self.invalidate();
        &mut self.info
    }

    /// Forces the next bounding-box query to recompute.
    pub fn invalidate(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Cached box, if it was computed at the current generation.
    pub fn cached_bounding_box(&self) -> Option<Rect> {
        self.cache
            .get()
            .filter(|c| c.generation == self.generation)
            .map(|c| c.bbox)
    }

    /// Cached content box (the part of the box actually holding content).
    pub fn cached_content_bounding_box(&self) -> Option<Rect> {
        self.cache
            .get()
            .filter(|c| c.generation == self.generation)
            .and_then(|c| c.content)
    }

    /// Remembers `bbox` for the current generation.
    pub fn cache_bounding_box(&self, bbox: Rect) {
        let content = self.cached_content_bounding_box();
        self.cache.set(Some(CachedBox {
            generation: self.generation,
            bbox,
            content,
        }));
    }

    /// Pins both boxes for the current generation.
    ///
    /// `set_bounding_box` implementations call this after their last
    /// mutation so the fitted box survives until the next setter.
    pub fn set_cached_bounding_box(&self, bbox: Rect, content: Option<Rect>) {
        self.cache.set(Some(CachedBox {
            generation: self.generation,
            bbox,
            content,
        }));
    }

    /// Returns the cached box or computes and caches a fresh one.
    pub fn cached_or(&self, compute: impl FnOnce() -> Rect) -> Rect {
        if let Some(bbox) = self.cached_bounding_box() {
            return bbox;
        }
        let bbox = compute();
        self.cache_bounding_box(bbox);
        bbox
    }

    // ------------------------------------------------------------------
    // Flags
    // ------------------------------------------------------------------

    pub fn is_shown(&self) -> bool {
        self.info.show
    }

    pub fn set_show(&mut self, show: bool) {
        self.info_mut().show = show;
    }

    pub fn is_selectable(&self) -> bool {
        self.info.selectable
    }

    pub fn set_selectable(&mut self, selectable: bool) {
        self.info.selectable = selectable;
    }

    pub fn is_free_floating(&self) -> bool {
        self.info.free_floating
    }

    pub fn set_free_floating(&mut self, free_floating: bool) {
        self.info_mut().free_floating = free_floating;
    }

    pub fn is_ok(&self) -> bool {
        self.info.ok
    }

    pub fn set_ok(&mut self, ok: bool) {
        self.info.ok = ok;
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    pub fn is_in_drag_state(&self) -> bool {
        self.in_drag_state
    }

    pub fn set_in_drag_state(&mut self, dragging: bool) {
        self.in_drag_state = dragging;
    }

    pub fn is_showing_label_when_selected(&self) -> bool {
        self.info.show_label_when_selected
    }

    pub fn set_show_label_when_selected(&mut self, show: bool) {
        self.info.show_label_when_selected = show;
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    pub fn id(&self) -> i64 {
        self.info.id
    }

    pub fn set_id(&mut self, id: i64) {
        self.info.id = id;
    }

    pub fn text(&self) -> &str {
        &self.info.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.info_mut().text = text.into();
    }

    pub fn pen(&self) -> Option<&Pen> {
        self.info.pen.as_ref()
    }

    pub fn set_pen(&mut self, pen: Option<Pen>) {
        self.info_mut().pen = pen;
    }

    pub fn brush(&self) -> Option<&Brush> {
        self.info.brush.as_ref()
    }

    pub fn set_brush(&mut self, brush: Option<Brush>) {
        self.info_mut().brush = brush;
    }

    pub fn selection_brush(&self) -> Option<&Brush> {
        self.info.selection_brush.as_ref()
    }

    pub fn set_selection_brush(&mut self, brush: Option<Brush>) {
        self.info.selection_brush = brush;
    }

    pub fn font(&self) -> &Font {
        &self.info.font
    }

    pub fn set_font(&mut self, font: Font) {
        self.info_mut().font = font;
    }

    pub fn font_color(&self) -> Color {
        self.info.font_color
    }

    pub fn set_font_color(&mut self, color: Color) {
        self.info.font_color = color;
    }

    pub fn font_background_color(&self) -> Option<Color> {
        self.info.font_background_color
    }

    pub fn anchoring(&self) -> Anchoring {
        self.info.anchoring
    }

    pub fn set_anchoring(&mut self, anchoring: Anchoring) {
        self.info_mut().anchoring = anchoring;
    }

    pub fn anchor_point(&self) -> Pt {
        self.info.anchor_point
    }

    pub fn set_anchor_point(&mut self, pt: Pt) {
        self.info_mut().anchor_point = pt;
    }

    pub fn padding(&self) -> Spacing {
        self.info.padding
    }

    pub fn set_padding(&mut self, top: f64, right: f64, bottom: f64, left: f64) {
        self.info_mut().padding = Spacing::new(top, right, bottom, left);
    }

    pub fn canvas_width_proportion(&self) -> f64 {
        self.info.canvas_width_proportion
    }

    pub fn set_canvas_width_proportion(&mut self, proportion: f64) {
        self.info.canvas_width_proportion = proportion;
    }

    pub fn canvas_height_proportion(&self) -> Option<f64> {
        self.info.canvas_height_proportion
    }

    pub fn canvas_margins(&self) -> Spacing {
        self.info.canvas_margins
    }

    /// Current scaling factor (always > 0).
    pub fn scaling(&self) -> f64 {
        self.info.scaling
    }

    /// Ignores values that are not strictly positive.
    pub fn set_scaling(&mut self, scaling: f64) {
        debug_assert!(scaling > 0.0, "scaling must be greater than zero");
        if !(scaling > 0.0 && scaling.is_finite()) {
            warn!(scaling, "ignoring invalid scaling");
            return;
        }
        if scaling != self.info.scaling {
            self.info_mut().scaling = scaling;
        }
    }

    /// Effective DPI scale factor; `1.0` when never set.
    pub fn dpi_scale_factor(&self) -> f64 {
        self.info.dpi_scale_factor.unwrap_or(1.0)
    }

    pub fn set_dpi_scale_factor(&mut self, factor: f64) {
        debug_assert!(factor > 0.0, "DPI scale factor must be greater than zero");
        if !(factor > 0.0 && factor.is_finite()) {
            warn!(factor, "ignoring invalid DPI scale factor");
            return;
        }
        if self.info.dpi_scale_factor != Some(factor) {
            self.info_mut().dpi_scale_factor = Some(factor);
        }
    }

    // ------------------------------------------------------------------
    // Content alignment edges
    // ------------------------------------------------------------------

    pub fn content_top(&self) -> Option<i32> {
        self.content_top
    }

    pub fn content_bottom(&self) -> Option<i32> {
        self.content_bottom
    }

    pub fn content_left(&self) -> Option<i32> {
        self.content_left
    }

    pub fn content_right(&self) -> Option<i32> {
        self.content_right
    }

    pub fn set_content_top(&mut self, top: Option<i32>) {
        self.content_top = top;
    }

    pub fn set_content_bottom(&mut self, bottom: Option<i32>) {
        self.content_bottom = bottom;
    }

    pub fn set_content_left(&mut self, left: Option<i32>) {
        self.content_left = left;
    }

    pub fn set_content_right(&mut self, right: Option<i32>) {
        self.content_right = right;
    }

    pub fn reset_content_edges(&mut self) {
        self.content_top = None;
        self.content_bottom = None;
        self.content_left = None;
        self.content_right = None;
    }

    // ------------------------------------------------------------------
    // Scaling helpers
    // ------------------------------------------------------------------

    /// DIPs to screen pixels under the item's scaling and DPI.
    pub fn scale_to_screen_and_canvas(&self, value: f64) -> f64 {
        value * self.scaling() * self.dpi_scale_factor()
    }

    pub fn downscale_from_screen_and_canvas(&self, value: f64) -> f64 {
        safe_divide(value, self.scaling() * self.dpi_scale_factor())
    }

    pub fn shadow_offset(&self) -> f64 {
        defaults::SHADOW_OFFSET
    }

    pub fn shadow_color(&self) -> Color {
        defaults::SHADOW_COLOR
    }

    /// Item pen with its width scaled to the screen.
    pub fn scaled_pen(&self) -> Option<Pen> {
        self.pen()
            .map(|p| p.clone().with_width(self.scale_to_screen_and_canvas(p.width)))
    }

    // ------------------------------------------------------------------
    // Selection label
    // ------------------------------------------------------------------

    /// Draws the item's text in a box at the centre of `item_box` when the
    /// item is selected, keeping it inside `containing` if that is non-empty.
    pub fn draw_selection_label(
        &self,
        dc: &mut dyn DrawSurface,
        scaling: f64,
        item_box: Rect,
        containing: Rect,
        ctx: &RenderContext,
    ) {
        if !(self.is_selected() && self.is_showing_label_when_selected()) || self.text().is_empty()
        {
            return;
        }
        let mut label = selection_label(&self.info, item_box.center(), scaling);
        let label_box = label.bounding_box(&*dc);
        nudge_label_inside(&mut label, label_box, containing);
        label.draw(dc, ctx);
    }
}

/// Transient label showing `info`'s text, centred on `anchor`.
pub(crate) fn selection_label(info: &GraphItemInfo, anchor: Pt, scaling: f64) -> Label {
    let pad = defaults::SELECTION_LABEL_PADDING;
    let dpi = info.dpi_scale_factor.unwrap_or(1.0);
    let info = info
        .clone()
        .with_pen(Some(Pen::new(Color::BLACK)))
        .with_padding(pad, pad, pad, pad)
        .with_font_background_color(Some(Color::WHITE))
        .with_anchoring(Anchoring::Center)
        .with_anchor_point(anchor)
        .with_free_floating(false)
        .with_show(true)
        .with_scaling(if scaling > 0.0 { scaling } else { 1.0 })
        .with_dpi_scale_factor(dpi);
    Label::new(info)
}

/// Shifts `label` into `containing`: bottom, top, right, then left, all
/// measured against the box taken before any shift.
pub(crate) fn nudge_label_inside(label: &mut Label, label_box: Rect, containing: Rect) {
    if containing.is_empty() {
        return;
    }
    if label_box.bottom() > containing.bottom() {
        label.offset(0, containing.bottom() - label_box.bottom());
    }
    if label_box.top() < containing.top() {
        label.offset(0, containing.top() - label_box.top());
    }
    if label_box.right() > containing.right() {
        label.offset(containing.right() - label_box.right(), 0);
    }
    if label_box.left() < containing.left() {
        label.offset(containing.left() - label_box.left(), 0);
    }
}
