//! The layout root.
//!
//! A [`Canvas`] owns a grid of fixed objects (plots, legends, spacers), the
//! titles around its four sides, free-floating objects that sit on top of the
//! grid, and the background/watermark decorations. [`Canvas::calc_all_sizes`]
//! is the layout pass:
//!
//! 1. enforce the minimum canvas size,
//! 2. measure titles (left, top, bottom, right) and shrink the grid area,
//! 3. split the area into rows by proportion and each row into cells by the
//!    items' width proportions,
//! 4. fit every item into its cell,
//! 5. optionally align content edges across rows and down columns.
//!
//! Every embedded object's pixel geometry derives from [`Canvas::scaling`],
//! which never drops below 1.0.

use std::path::Path;

use chrono::{Local, NaiveDateTime};

use crate::context::RenderContext;
use crate::dc::{BrushChanger, DrawSurface, FontChanger, PenChanger, SvgDc, TextColorChanger};
use crate::defaults;
use crate::errors::ExportError;
use crate::items::info::{Anchoring, Orientation, RelativeAlignment};
use crate::items::{GraphItem, GraphItemEnum, Image, ItemHandle, Label};
use crate::log::{debug, trace, warn};
use crate::math::safe_divide;
use crate::types::{Brush, Color, FillDirection, Font, Pt, Rect, Size};

// ============================================================================
// Watermarks
// ============================================================================

/// Direction of watermark text across the canvas
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum WatermarkDirection {
    Horizontal,
    #[default]
    Diagonal,
}

/// Text stamped across a drawing area
#[derive(Clone, Debug, PartialEq)]
pub struct Watermark {
    pub label: String,
    pub color: Color,
    pub direction: WatermarkDirection,
}

impl Watermark {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            color: defaults::WATERMARK_COLOR,
            direction: WatermarkDirection::Diagonal,
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_direction(mut self, direction: WatermarkDirection) -> Self {
        self.direction = direction;
        self
    }
}

/// Replaces `@[DATE]`, `@[TIME]` and `@[DATETIME]` with `now`.
pub fn expand_watermark_tags(text: &str, now: NaiveDateTime) -> String {
    let date = now.format("%x").to_string();
    let time = now.format("%X").to_string();
    text.replace("@[DATETIME]", &format!("{date} {time}"))
        .replace("@[DATE]", &date)
        .replace("@[TIME]", &time)
}

// ============================================================================
// Print settings
// ============================================================================

/// Page being printed, used to expand header and footer tags
#[derive(Clone, Debug, PartialEq)]
pub struct PrintPage<'a> {
    pub title: &'a str,
    pub page: usize,
    pub page_count: usize,
    pub now: NaiveDateTime,
}

/// Header and footer strings for printed output
///
/// Printing itself belongs to the host; these are the strings it stamps on
/// each page after [`PrintSettings::expand`] fills in the tags.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PrintSettings {
    pub left_header: String,
    pub center_header: String,
    pub right_header: String,
    pub left_footer: String,
    pub center_footer: String,
    pub right_footer: String,
}

impl PrintSettings {
    /// Expands `@TITLE@`, `@DATE@`, `@TIME@`, `@PAGENUM@` and `@PAGESCNT@`.
    pub fn expand(text: &str, page: &PrintPage<'_>) -> String {
        text.replace("@PAGENUM@", &page.page.to_string())
            .replace("@PAGESCNT@", &page.page_count.to_string())
            .replace("@TITLE@", page.title)
            .replace("@DATE@", &page.now.format("%x").to_string())
            .replace("@TIME@", &page.now.format("%X").to_string())
    }

    /// Expanded left, centre and right headers.
    pub fn headers(&self, page: &PrintPage<'_>) -> [String; 3] {
        [
            Self::expand(&self.left_header, page),
            Self::expand(&self.center_header, page),
            Self::expand(&self.right_header, page),
        ]
    }

    /// Expanded left, centre and right footers.
    pub fn footers(&self, page: &PrintPage<'_>) -> [String; 3] {
        [
            Self::expand(&self.left_footer, page),
            Self::expand(&self.center_footer, page),
            Self::expand(&self.right_footer, page),
        ]
    }

    pub fn has_headers(&self) -> bool {
        !(self.left_header.is_empty() && self.center_header.is_empty() && self.right_header.is_empty())
    }

    pub fn has_footers(&self) -> bool {
        !(self.left_footer.is_empty() && self.center_footer.is_empty() && self.right_footer.is_empty())
    }
}

// ============================================================================
// Canvas
// ============================================================================

type Row = Vec<Option<ItemHandle>>;

/// Scrollable, zoomable drawing area holding a grid of items
#[derive(Debug)]
pub struct Canvas {
    /// Size the host window gives us.
    client_rect: Rect,
    /// Laid-out area; larger than the client when zoomed or below minimum.
    rect: Rect,
    dpi_scale_factor: f64,
    /// Minimum design size, in DIPs.
    min_size: Size<f64>,
    zoom_level: i32,

    fixed_objects: Vec<Row>,
    row_proportions: Vec<f64>,
    align_row_content: bool,
    align_column_content: bool,

    left_titles: Vec<Label>,
    right_titles: Vec<Label>,
    top_titles: Vec<Label>,
    bottom_titles: Vec<Label>,
    /// Titles positioned by the last layout pass.
    titles: Vec<Label>,

    free_floating: Vec<ItemHandle>,

    background_color: Option<Color>,
    background_gradient: bool,
    background_image: Option<Image>,
    background_opacity: u8,
    watermark: String,
    watermark_font: Font,
    watermark_logo: Option<Image>,

    label: String,
    print_settings: PrintSettings,
    render_context: RenderContext,
}

impl Canvas {
    /// A canvas filling a `width` × `height` pixel client area.
    pub fn new(width: i32, height: i32) -> Self {
        let client_rect = Rect::new(0, 0, width.max(0), height.max(0));
        Self {
            client_rect,
            rect: client_rect,
            dpi_scale_factor: 1.0,
            min_size: Size::new(
                f64::from(defaults::DEFAULT_CANVAS_WIDTH),
                f64::from(defaults::DEFAULT_CANVAS_HEIGHT),
            ),
            zoom_level: 0,
            fixed_objects: Vec::new(),
            row_proportions: Vec::new(),
            align_row_content: false,
            align_column_content: false,
            left_titles: Vec::new(),
            right_titles: Vec::new(),
            top_titles: Vec::new(),
            bottom_titles: Vec::new(),
            titles: Vec::new(),
            free_floating: Vec::new(),
            background_color: None,
            background_gradient: false,
            background_image: None,
            background_opacity: u8::MAX,
            watermark: String::new(),
            watermark_font: Font::default().with_bold(true),
            watermark_logo: None,
            label: String::new(),
            print_settings: PrintSettings::default(),
            render_context: RenderContext::default(),
        }
    }

    // ------------------------------------------------------------------
    // Host and sizing
    // ------------------------------------------------------------------

    pub fn dpi_scale_factor(&self) -> f64 {
        self.dpi_scale_factor
    }

    pub fn set_dpi_scale_factor(&mut self, factor: f64) {
        debug_assert!(factor > 0.0, "DPI scale factor must be greater than zero");
        if !(factor > 0.0 && factor.is_finite()) {
            warn!(factor, "ignoring invalid canvas DPI scale factor");
            return;
        }
        self.dpi_scale_factor = factor;
    }

    /// Responds to the host resizing the client area.
    ///
    /// Zoom is dropped once the client outgrows the zoomed canvas; while
    /// zoomed in, the canvas keeps its size and is not re-laid-out.
    pub fn set_client_size(&mut self, size: Size<i32>, dc: &dyn DrawSurface) {
        self.client_rect = Rect::new(0, 0, size.width.max(0), size.height.max(0));
        if self.client_rect.width > self.rect.width && self.client_rect.height > self.rect.height {
            self.zoom_level = 0;
        }
        if self.zoom_level <= 0 {
            self.rect = self.client_rect;
            self.calc_all_sizes(dc);
        }
    }

    pub fn client_rect(&self) -> Rect {
        self.client_rect
    }

    /// The laid-out drawing area.
    pub fn canvas_rect(&self) -> Rect {
        self.rect
    }

    /// Minimum width in pixels; the canvas never lays out narrower.
    pub fn canvas_min_width(&self) -> i32 {
        (self.min_size.width * self.dpi_scale_factor) as i32
    }

    pub fn canvas_min_height(&self) -> i32 {
        (self.min_size.height * self.dpi_scale_factor) as i32
    }

    /// Sets the minimum design width, in DIPs.
    pub fn set_canvas_min_width(&mut self, width: f64) {
        self.min_size.width = width;
    }

    /// Sets the minimum design height, in DIPs.
    pub fn set_canvas_min_height(&mut self, height: f64) {
        self.min_size.height = height;
    }

    pub fn canvas_diagonal(&self) -> i64 {
        let w = f64::from(self.rect.width);
        let h = f64::from(self.rect.height);
        (w * w + h * h).sqrt() as i64
    }

    /// Share of the minimum canvas width `item` needs at 1.0 scaling.
    pub fn calc_min_width_proportion(&self, item: &GraphItemEnum, dc: &dyn DrawSurface) -> f64 {
        safe_divide(
            f64::from(item.bounding_box(dc).width),
            f64::from(self.canvas_min_width()),
        )
    }

    /// Share of the minimum canvas height `item` needs at 1.0 scaling.
    pub fn calc_min_height_proportion(&self, item: &GraphItemEnum, dc: &dyn DrawSurface) -> f64 {
        safe_divide(
            f64::from(item.bounding_box(dc).height),
            f64::from(self.canvas_min_height()),
        )
    }

    /// How much larger than the minimum design size the canvas is drawn.
    ///
    /// Never below 1.0: a small window scrolls rather than shrinks content.
    pub fn scaling(&self) -> f64 {
        safe_divide(f64::from(self.rect.width), f64::from(self.canvas_min_width())).max(1.0)
    }

    pub fn scale_to_screen_and_canvas(&self, value: f64) -> f64 {
        value * self.scaling() * self.dpi_scale_factor
    }

    pub fn render_context(&self) -> &RenderContext {
        &self.render_context
    }

    pub fn set_render_context(&mut self, ctx: RenderContext) {
        self.render_context = ctx;
    }

    /// Name of the canvas, used for the `@TITLE@` print tag.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    // ------------------------------------------------------------------
    // Fixed-object grid
    // ------------------------------------------------------------------

    /// Resizes the grid, keeping existing items that still fit, and resets
    /// every row proportion to `1/rows`.
    pub fn set_fixed_objects_grid_size(&mut self, rows: usize, columns: usize) {
        self.fixed_objects.resize_with(rows, Vec::new);
        for row in &mut self.fixed_objects {
            row.resize(columns, None);
        }
        self.row_proportions = vec![safe_divide(1.0, rows as f64); rows];
    }

    /// Rows, and columns in the first row.
    pub fn fixed_objects_grid_size(&self) -> (usize, usize) {
        (
            self.fixed_objects.len(),
            self.fixed_objects.first().map_or(0, Vec::len),
        )
    }

    /// Gives one row its own column count, making the grid jagged.
    pub fn set_row_column_count(&mut self, row: usize, columns: usize) {
        match self.fixed_objects.get_mut(row) {
            Some(cells) => cells.resize(columns, None),
            None => {
                warn!(row, "ignoring column count for a row outside the grid");
            }
        }
    }

    /// Removes every fixed object and empties the grid.
    pub fn clear_fixed_objects(&mut self) {
        self.fixed_objects.clear();
        self.row_proportions.clear();
    }

    pub fn fixed_objects(&self) -> &[Row] {
        &self.fixed_objects
    }

    pub fn fixed_object(&self, row: usize, column: usize) -> Option<ItemHandle> {
        let cell = self.fixed_objects.get(row).and_then(|r| r.get(column));
        if cell.is_none() {
            warn!(row, column, "fixed object requested outside the grid");
        }
        cell.cloned().flatten()
    }

    /// Places `object` in a cell and rebalances the row's width proportions
    /// if they now exceed the full width.
    ///
    /// A lone item is clamped to 1.0. A large newcomer (> 0.5) shrinks every
    /// item in the row equally; a small one keeps its width and the others
    /// shrink equally.
    pub fn set_fixed_object(&mut self, row: usize, column: usize, object: ItemHandle) {
        let dpi = self.dpi_scale_factor;
        let Some(cells) = self.fixed_objects.get_mut(row) else {
            warn!(row, column, "ignoring fixed object outside the grid");
            return;
        };
        if column >= cells.len() {
            warn!(row, column, "ignoring fixed object outside the grid");
            return;
        }
        object.borrow_mut().set_dpi_scale_factor(dpi);
        let newcomer_proportion = object.borrow().base().canvas_width_proportion();
        cells[column] = Some(object);

        let total: f64 = cells
            .iter()
            .flatten()
            .map(|item| item.borrow().base().canvas_width_proportion())
            .sum();
        if total <= 1.0 {
            return;
        }
        let overflow = total - 1.0;
        debug!(row, total, "rebalancing row width proportions");
        if cells.len() == 1 {
            if let Some(item) = &cells[0] {
                item.borrow_mut().base_mut().set_canvas_width_proportion(1.0);
            }
        } else if newcomer_proportion > 0.5 {
            let trim = safe_divide(overflow, cells.len() as f64);
            for item in cells.iter().flatten() {
                let mut item = item.borrow_mut();
                let current = item.base().canvas_width_proportion();
                item.base_mut().set_canvas_width_proportion(current - trim);
            }
        } else {
            let trim = safe_divide(overflow, (cells.len() - 1) as f64);
            for (index, item) in cells.iter().enumerate() {
                if index == column {
                    continue;
                }
                if let Some(item) = item {
                    let mut item = item.borrow_mut();
                    let current = item.base().canvas_width_proportion();
                    item.base_mut().set_canvas_width_proportion(current - trim);
                }
            }
        }
    }

    pub fn row_proportions(&self) -> &[f64] {
        &self.row_proportions
    }

    /// Sets the share of the grid height `row` takes.
    ///
    /// Other rows keep their proportions; callers rebalance them.
    pub fn set_row_proportion(&mut self, row: usize, proportion: f64) {
        debug_assert!(row < self.row_proportions.len(), "invalid row in set_row_proportion");
        match self.row_proportions.get_mut(row) {
            Some(slot) => *slot = proportion,
            None => {
                warn!(row, "ignoring proportion for a row outside the grid");
            }
        }
    }

    pub fn align_row_content(&mut self, align: bool) {
        self.align_row_content = align;
    }

    pub fn is_row_content_aligned(&self) -> bool {
        self.align_row_content
    }

    /// Aligns content down each column. On a jagged grid, alignment stops at
    /// the first column some row lacks.
    pub fn align_column_content(&mut self, align: bool) {
        self.align_column_content = align;
    }

    pub fn is_column_content_aligned(&self) -> bool {
        self.align_column_content
    }

    // ------------------------------------------------------------------
    // Titles
    // ------------------------------------------------------------------

    pub fn add_left_title(&mut self, title: Label) {
        self.left_titles.push(title);
    }

    pub fn add_right_title(&mut self, title: Label) {
        self.right_titles.push(title);
    }

    pub fn add_top_title(&mut self, title: Label) {
        self.top_titles.push(title);
    }

    pub fn add_bottom_title(&mut self, title: Label) {
        self.bottom_titles.push(title);
    }

    pub fn left_titles_mut(&mut self) -> &mut Vec<Label> {
        &mut self.left_titles
    }

    pub fn right_titles_mut(&mut self) -> &mut Vec<Label> {
        &mut self.right_titles
    }

    pub fn top_titles_mut(&mut self) -> &mut Vec<Label> {
        &mut self.top_titles
    }

    pub fn bottom_titles_mut(&mut self) -> &mut Vec<Label> {
        &mut self.bottom_titles
    }

    /// Titles as positioned by the last [`Canvas::calc_all_sizes`].
    pub fn titles(&self) -> &[Label] {
        &self.titles
    }

    // ------------------------------------------------------------------
    // Free-floating objects
    // ------------------------------------------------------------------

    /// Adds a movable object on top of the grid. Layout never moves or
    /// resizes it; drawing applies the canvas scaling.
    pub fn add_free_floating_object(&mut self, object: ItemHandle) {
        object.borrow_mut().base_mut().set_free_floating(true);
        self.free_floating.push(object);
    }

    pub fn free_floating_objects(&self) -> &[ItemHandle] {
        &self.free_floating
    }

    /// Topmost free-floating object under `pt`.
    pub fn find_free_floating_object(&self, pt: Pt, dc: &dyn DrawSurface) -> Option<ItemHandle> {
        self.free_floating
            .iter()
            .rev()
            .find(|item| item.borrow().hit_test(pt, dc))
            .cloned()
    }

    /// Moves every selected free-floating object by whole DIPs.
    pub fn move_selected_objects(&mut self, dx: i32, dy: i32) -> bool {
        let step_x = self.scale_to_screen_and_canvas(f64::from(dx)) as i32;
        let step_y = self.scale_to_screen_and_canvas(f64::from(dy)) as i32;
        let mut moved = false;
        for item in &self.free_floating {
            let mut item = item.borrow_mut();
            if item.is_selected() {
                item.offset(step_x, step_y);
                moved = true;
            }
        }
        moved
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    /// Toggles the selection of whatever is under `pt`: free-floating
    /// objects first (topmost wins), then grid items, then titles.
    pub fn select_object_at_point(&mut self, pt: Pt, dc: &dyn DrawSurface) -> bool {
        if let Some(item) = self.find_free_floating_object(pt, dc) {
            let mut item = item.borrow_mut();
            let selected = item.is_selected();
            item.set_selected(!selected);
            return true;
        }
        for item in self.fixed_objects.iter().flatten().flatten() {
            if item.borrow_mut().select_if_hit(pt, dc) {
                return true;
            }
        }
        self.titles.iter_mut().any(|title| title.select_if_hit(pt, dc))
    }

    /// Deselects every object on the canvas.
    pub fn clear_selections(&mut self) {
        for item in &self.free_floating {
            item.borrow_mut().set_selected(false);
        }
        for item in self.fixed_objects.iter().flatten().flatten() {
            item.borrow_mut().clear_selections();
        }
        for title in &mut self.titles {
            title.set_selected(false);
        }
    }

    // ------------------------------------------------------------------
    // Background and watermarks
    // ------------------------------------------------------------------

    pub fn background_color(&self) -> Option<Color> {
        self.background_color
    }

    /// Fills the background with `color`, optionally fading to white.
    pub fn set_background_color(&mut self, color: Option<Color>, linear_gradient: bool) {
        self.background_color = color;
        self.background_gradient = linear_gradient;
    }

    pub fn set_background_image(&mut self, image: Image, opacity: u8) {
        self.background_image = Some(image);
        self.background_opacity = opacity;
    }

    pub fn background_image(&self) -> Option<&Image> {
        self.background_image.as_ref()
    }

    /// Text stamped across the canvas; `@[DATE]`, `@[TIME]` and
    /// `@[DATETIME]` are expanded when drawn.
    pub fn set_watermark(&mut self, text: impl Into<String>) {
        self.watermark = text.into();
    }

    /// Watermark text with its tags expanded for the current time.
    pub fn watermark(&self) -> String {
        expand_watermark_tags(&self.watermark, Local::now().naive_local())
    }

    pub fn set_watermark_font(&mut self, font: Font) {
        self.watermark_font = font;
    }

    /// Image drawn translucently in the bottom-right corner.
    pub fn set_watermark_logo(&mut self, logo: Image) {
        self.watermark_logo = Some(logo);
    }

    pub fn zoom_level(&self) -> i32 {
        self.zoom_level
    }

    pub fn print_settings(&self) -> &PrintSettings {
        &self.print_settings
    }

    pub fn print_settings_mut(&mut self) -> &mut PrintSettings {
        &mut self.print_settings
    }

    // ------------------------------------------------------------------
    // Zoom
    // ------------------------------------------------------------------

    /// Enlarges the canvas by [`defaults::ZOOM_FACTOR`] and lays out again.
    pub fn zoom_in(&mut self, dc: &dyn DrawSurface) {
        if self.zoom_level >= defaults::MAX_ZOOM_LEVEL {
            return;
        }
        self.zoom_level += 1;
        self.rect.width = (f64::from(self.rect.width) * defaults::ZOOM_FACTOR) as i32;
        self.rect.height = (f64::from(self.rect.height) * defaults::ZOOM_FACTOR) as i32;
        self.calc_all_sizes(dc);
    }

    pub fn zoom_out(&mut self, dc: &dyn DrawSurface) {
        if self.zoom_level <= 0 {
            return;
        }
        self.zoom_level -= 1;
        self.rect.width = (f64::from(self.rect.width) / defaults::ZOOM_FACTOR) as i32;
        self.rect.height = (f64::from(self.rect.height) / defaults::ZOOM_FACTOR) as i32;
        self.calc_all_sizes(dc);
    }

    /// Returns to the client size.
    pub fn zoom_reset(&mut self, dc: &dyn DrawSurface) {
        if self.zoom_level == 0 {
            return;
        }
        self.zoom_level = 0;
        self.rect = self.client_rect;
        self.calc_all_sizes(dc);
    }

    // ------------------------------------------------------------------
    // Layout
    // ------------------------------------------------------------------

    /// Positions titles and fits every fixed object into its grid cell.
    pub fn calc_all_sizes(&mut self, dc: &dyn DrawSurface) {
        let proportion_total: f64 = self.row_proportions.iter().sum();
        if proportion_total > 1.0 + f64::EPSILON {
            warn!(proportion_total, "canvas row proportions exceed 100%");
        }

        self.rect.width = self.rect.width.max(self.canvas_min_width());
        self.rect.height = self.rect.height.max(self.canvas_min_height());
        let scaling = self.scaling();
        debug!(width = self.rect.width, height = self.rect.height, scaling, "canvas layout");

        let spacing = self.scale_to_screen_and_canvas(defaults::TITLE_SPACING) as i32;
        self.titles.clear();
        let left = self.calc_left_titles(dc, spacing);
        let top = self.calc_top_titles(dc, spacing);
        let bottom = self.calc_bottom_titles(dc, spacing);
        let right = self.calc_right_titles(dc, spacing);
        debug!(left, top, bottom, right, "title margins");

        let area = Rect::new(
            self.rect.x + left,
            self.rect.y + top,
            self.rect.width - (left + right),
            self.rect.height - (top + bottom),
        );

        for item in self.fixed_objects.iter().flatten().flatten() {
            let mut item = item.borrow_mut();
            item.base_mut().reset_content_edges();
            item.set_dpi_scale_factor(self.dpi_scale_factor);
        }

        let mut row_offset = 0;
        for (row_index, row) in self.fixed_objects.iter().enumerate() {
            let proportion = match self.row_proportions.get(row_index) {
                Some(p) => *p,
                None => {
                    warn!(row_index, "missing row proportion");
                    0.0
                }
            };
            let row_height = (f64::from(area.height) * proportion) as i32;
            let mut x_offset = 0;
            for item in row.iter().flatten() {
                let mut item = item.borrow_mut();
                item.set_scaling(scaling);
                let height = item
                    .base()
                    .canvas_height_proportion()
                    .map_or(row_height, |p| (p * f64::from(area.height)) as i32);
                let width = (f64::from(area.width) * item.base().canvas_width_proportion()) as i32;
                let cell = Rect::new(area.x + x_offset, area.y + row_offset, width, height);
                let margins = item.base().canvas_margins();
                let top_margin = self.scale_to_screen_and_canvas(margins.top) as i32;
                let left_margin = self.scale_to_screen_and_canvas(margins.left) as i32;
                let right_margin = self.scale_to_screen_and_canvas(margins.right) as i32;
                let bottom_margin = self.scale_to_screen_and_canvas(margins.bottom) as i32;
                let fitted = Rect::new(
                    cell.x + left_margin,
                    cell.y + top_margin,
                    (cell.width - left_margin - right_margin).max(0),
                    (cell.height - top_margin - bottom_margin).max(0),
                );
                trace!(row = row_index, %fitted, "cell");
                item.set_bounding_box(fitted, dc, scaling);
                x_offset += cell.width;
                item.recalc_sizes(dc);
                item.update_selected_items();
            }
            row_offset += row_height;
        }

        if self.align_row_content {
            self.align_rows(dc);
        }
        if self.align_column_content {
            self.align_columns(dc);
        }
    }

    /// Gives every item in a row the innermost shared top and bottom content
    /// edges.
    fn align_rows(&self, dc: &dyn DrawSurface) {
        for row in &self.fixed_objects {
            let boxes: Vec<Rect> = row
                .iter()
                .flatten()
                .map(|item| item.borrow().content_rect(dc))
                .filter(|r| !r.is_empty())
                .collect();
            let (Some(top), Some(bottom)) = (
                boxes.iter().map(Rect::top).max(),
                boxes.iter().map(Rect::bottom).min(),
            ) else {
                continue;
            };
            for item in row.iter().flatten() {
                let mut item = item.borrow_mut();
                if item.content_rect(dc).is_empty() {
                    continue;
                }
                item.base_mut().set_content_top(Some(top));
                item.base_mut().set_content_bottom(Some(bottom));
                item.recalc_sizes(dc);
                item.update_selected_items();
            }
        }
    }

    /// Gives every item in a column the innermost shared left and right
    /// content edges.
    fn align_columns(&self, dc: &dyn DrawSurface) {
        let columns = self.fixed_objects.first().map_or(0, Vec::len);
        for column in 0..columns {
            if self.fixed_objects.iter().any(|row| row.len() <= column) {
                debug!(column, "jagged grid, column alignment stops");
                break;
            }
            let cells: Vec<&ItemHandle> = self
                .fixed_objects
                .iter()
                .filter_map(|row| row[column].as_ref())
                .collect();
            let boxes: Vec<Rect> = cells
                .iter()
                .map(|item| item.borrow().content_rect(dc))
                .filter(|r| !r.is_empty())
                .collect();
            let (Some(left), Some(right)) = (
                boxes.iter().map(Rect::left).max(),
                boxes.iter().map(Rect::right).min(),
            ) else {
                continue;
            };
            for item in cells {
                let mut item = item.borrow_mut();
                if item.content_rect(dc).is_empty() {
                    continue;
                }
                item.base_mut().set_content_left(Some(left));
                item.base_mut().set_content_right(Some(right));
                item.recalc_sizes(dc);
                item.update_selected_items();
            }
        }
    }

    fn prepare_title(&self, title: &mut Label, orientation: Orientation) {
        title.set_dpi_scale_factor(self.dpi_scale_factor);
        title.set_scaling(self.scaling());
        if title.base().info().orientation != orientation {
            title.base_mut().info_mut().orientation = orientation;
        }
    }

    fn calc_left_titles(&mut self, dc: &dyn DrawSurface, spacing: i32) -> i32 {
        let height = self.rect.height;
        let mut titles = std::mem::take(&mut self.left_titles);
        let mut margin = 0;
        for title in &mut titles {
            self.prepare_title(title, Orientation::Vertical);
            let bbox = title.bounding_box(dc);
            let anchoring = title.base().anchoring();
            let x = margin
                + match anchoring {
                    Anchoring::TopLeftCorner | Anchoring::BottomLeftCorner => 0,
                    Anchoring::Center => bbox.width / 2,
                    _ => bbox.width,
                };
            let y = vertical_title_y(title.base().info().relative_alignment, anchoring, bbox, height);
            title.base_mut().set_anchor_point(Pt::new(x, y));
            margin += title.bounding_box(dc).width + spacing;
            self.titles.push(title.clone());
        }
        self.left_titles = titles;
        margin
    }

    fn calc_right_titles(&mut self, dc: &dyn DrawSurface, spacing: i32) -> i32 {
        let height = self.rect.height;
        let mut titles = std::mem::take(&mut self.right_titles);
        let mut position = self.rect.width - spacing;
        let mut margin = 0;
        for title in &mut titles {
            self.prepare_title(title, Orientation::Vertical);
            let bbox = title.bounding_box(dc);
            let anchoring = title.base().anchoring();
            let x = position
                - match anchoring {
                    Anchoring::TopRightCorner | Anchoring::BottomRightCorner => 0,
                    Anchoring::Center => bbox.width / 2,
                    _ => bbox.width,
                };
            let y = vertical_title_y(title.base().info().relative_alignment, anchoring, bbox, height);
            title.base_mut().set_anchor_point(Pt::new(x, y));
            let width = title.bounding_box(dc).width + spacing;
            position -= width;
            margin += width;
            self.titles.push(title.clone());
        }
        self.right_titles = titles;
        margin
    }

    fn calc_top_titles(&mut self, dc: &dyn DrawSurface, spacing: i32) -> i32 {
        let width = self.rect.width;
        let mut titles = std::mem::take(&mut self.top_titles);
        let mut margin = 0;
        for title in &mut titles {
            self.prepare_title(title, Orientation::Horizontal);
            let bbox = title.bounding_box(dc);
            let anchoring = title.base().anchoring();
            let y = margin
                + match anchoring {
                    Anchoring::BottomLeftCorner | Anchoring::BottomRightCorner => bbox.height,
                    Anchoring::Center => bbox.height / 2,
                    _ => 0,
                };
            let x = horizontal_title_x(title.base().info().relative_alignment, anchoring, bbox, width);
            title.base_mut().set_anchor_point(Pt::new(x, y));
            margin += title.bounding_box(dc).height + spacing;
            self.titles.push(title.clone());
        }
        self.top_titles = titles;
        margin
    }

    fn calc_bottom_titles(&mut self, dc: &dyn DrawSurface, spacing: i32) -> i32 {
        let width = self.rect.width;
        let mut titles = std::mem::take(&mut self.bottom_titles);
        let mut position = self.rect.height - spacing;
        let mut margin = 0;
        for title in &mut titles {
            self.prepare_title(title, Orientation::Horizontal);
            let bbox = title.bounding_box(dc);
            let anchoring = title.base().anchoring();
            let y = position
                - match anchoring {
                    Anchoring::TopLeftCorner | Anchoring::TopRightCorner => bbox.height,
                    Anchoring::Center => bbox.height / 2,
                    _ => 0,
                };
            let x = horizontal_title_x(title.base().info().relative_alignment, anchoring, bbox, width);
            title.base_mut().set_anchor_point(Pt::new(x, y));
            let height = title.bounding_box(dc).height + spacing;
            position -= height;
            margin += height;
            self.titles.push(title.clone());
        }
        self.bottom_titles = titles;
        margin
    }

    // ------------------------------------------------------------------
    // Drawing
    // ------------------------------------------------------------------

    /// Renders the whole canvas. Call [`Canvas::calc_all_sizes`] first.
    pub fn draw(&mut self, dc: &mut dyn DrawSurface) {
        let ctx = self.render_context.clone();
        let scaling = self.scaling();

        self.draw_background(dc);
        self.draw_background_image(dc, &ctx);

        for item in self.fixed_objects.iter().flatten().flatten() {
            item.borrow().draw(dc, &ctx);
        }
        for title in &self.titles {
            title.draw(dc, &ctx);
        }
        for item in &self.free_floating {
            item.borrow_mut().set_scaling(scaling);
            item.borrow().draw(dc, &ctx);
        }
        for item in self.fixed_objects.iter().flatten().flatten() {
            item.borrow().draw_selection_label(dc, scaling, self.rect, &ctx);
        }

        self.draw_watermark_logo(dc, &ctx);
        let watermark = Watermark::new(self.watermark())
            .with_color(defaults::WATERMARK_COLOR.with_alpha(ctx.translucency));
        let mut dc = FontChanger::new(dc, self.watermark_font.clone());
        Self::draw_watermark_label(&mut *dc, self.rect, &watermark);
    }

    fn draw_background(&self, dc: &mut dyn DrawSurface) {
        match self.background_color {
            Some(color) if self.background_gradient => {
                dc.gradient_fill_linear(self.rect, color, Color::WHITE, FillDirection::South);
            }
            color => {
                let brush = Brush::solid(color.unwrap_or(Color::WHITE));
                let mut dc = PenChanger::new(dc, None);
                let mut dc = BrushChanger::new(&mut *dc, Some(brush));
                dc.draw_rectangle(self.rect);
            }
        }
    }

    fn draw_background_image(&mut self, dc: &mut dyn DrawSurface, ctx: &RenderContext) {
        if self.background_opacity == 0 {
            return;
        }
        let rect = self.rect;
        let dpi = self.dpi_scale_factor;
        let opacity = self.background_opacity;
        let Some(image) = self.background_image.as_mut().filter(|img| img.is_ok()) else {
            return;
        };
        image.set_dpi_scale_factor(dpi);
        image.base_mut().set_anchoring(Anchoring::Center);
        image.base_mut().set_anchor_point(Pt::new(
            rect.left() + rect.width / 2,
            rect.top() + rect.height / 2,
        ));
        let padding = (defaults::BACKGROUND_IMAGE_PADDING * dpi) as i32;
        image.set_best_size(Size::new(rect.width + padding, rect.height + padding));
        image.set_opacity(opacity);
        image.draw(dc, ctx);
    }

    /// Draws the logo in the bottom-right corner, twice as opaque as the
    /// context's translucency.
    pub fn draw_watermark_logo(&mut self, dc: &mut dyn DrawSurface, ctx: &RenderContext) {
        if self.rect.width == 0 || self.rect.height == 0 {
            return;
        }
        let side = self.scale_to_screen_and_canvas(defaults::WATERMARK_LOGO_SIZE) as i32;
        let corner = Pt::new(self.rect.width, self.rect.height);
        let Some(logo) = self.watermark_logo.as_mut().filter(|img| img.is_ok()) else {
            return;
        };
        logo.set_best_size(Size::new(side, side));
        logo.set_opacity(ctx.translucency.saturating_mul(2));
        logo.base_mut().set_anchoring(Anchoring::BottomRightCorner);
        logo.base_mut().set_anchor_point(corner);
        logo.draw(dc, ctx);
    }

    /// Stamps `watermark` across `rect` in the surface's current font,
    /// sized as large as fits.
    pub fn draw_watermark_label(dc: &mut dyn DrawSurface, rect: Rect, watermark: &Watermark) {
        if rect.width == 0 || rect.height == 0 || watermark.label.is_empty() {
            return;
        }
        let mut dc = TextColorChanger::new(dc, watermark.color);
        let base_font = dc.font().clone();
        match watermark.direction {
            WatermarkDirection::Diagonal => {
                let angle = safe_divide(f64::from(rect.height), f64::from(rect.width))
                    .atan()
                    .to_degrees();
                let mut font = base_font.clone();
                font.point_size =
                    Label::calc_diagonal_font_size(&*dc, &base_font, rect.size(), angle, &watermark.label);
                let mut dc = FontChanger::new(&mut *dc, font.with_bold(true));
                let extent = dc.multiline_text_extent(&watermark.label).to_f64();
                let (sin, cos) = angle.to_radians().sin_cos();
                let (sin, cos) = (sin.abs(), cos.abs());
                let width = extent.width * cos - extent.height * sin;
                let height = extent.width * sin + extent.height * cos;
                let at = Pt::new(
                    rect.x + rect.width / 2 - (width / 2.0) as i32,
                    rect.y + rect.height / 2 - (height / 2.0) as i32,
                );
                dc.draw_rotated_text(&watermark.label, at, -angle);
            }
            WatermarkDirection::Horizontal => {
                let mut font = base_font.clone();
                font.point_size =
                    Label::calc_font_size_to_fit_bounding_box(&*dc, &base_font, rect.size(), &watermark.label);
                let mut dc = FontChanger::new(&mut *dc, font.with_bold(true));
                let extent = dc.multiline_text_extent(&watermark.label);
                let at = Pt::new(
                    rect.x + rect.width / 2 - extent.width / 2,
                    rect.y + rect.height / 2 - extent.height / 2,
                );
                dc.draw_text(&watermark.label, at);
            }
        }
    }

    // ------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------

    /// Lays out and renders the canvas into an SVG document.
    pub fn to_svg(&mut self) -> String {
        let mut dc = SvgDc::new(0, 0).with_dpi_scale_factor(self.dpi_scale_factor);
        self.calc_all_sizes(&dc);
        let rect = self.rect;
        dc = SvgDc::new(rect.width, rect.height).with_dpi_scale_factor(self.dpi_scale_factor);
        self.draw(&mut dc);
        dc.finish()
    }

    /// Writes [`Canvas::to_svg`] to `path`.
    pub fn save_svg(&mut self, path: impl AsRef<Path>) -> Result<(), ExportError> {
        let path = path.as_ref();
        let svg = self.to_svg();
        std::fs::write(path, svg).map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "saved canvas as SVG");
        Ok(())
    }
}

/// Vertical anchor of a left/right title, kept inside the canvas for its
/// anchoring.
fn vertical_title_y(alignment: RelativeAlignment, anchoring: Anchoring, bbox: Rect, height: i32) -> i32 {
    match alignment {
        RelativeAlignment::FlushLeft => {
            height
                - match anchoring {
                    Anchoring::Center => bbox.height / 2,
                    Anchoring::TopLeftCorner | Anchoring::TopRightCorner => bbox.height,
                    _ => 0,
                }
        }
        RelativeAlignment::FlushRight => match anchoring {
            Anchoring::Center => bbox.height / 2,
            Anchoring::BottomLeftCorner | Anchoring::BottomRightCorner => bbox.height,
            _ => 0,
        },
        _ => height / 2,
    }
}

/// Horizontal anchor of a top/bottom title.
fn horizontal_title_x(alignment: RelativeAlignment, anchoring: Anchoring, bbox: Rect, width: i32) -> i32 {
    match alignment {
        RelativeAlignment::FlushLeft => match anchoring {
            Anchoring::Center => bbox.width / 2,
            Anchoring::TopRightCorner | Anchoring::BottomRightCorner => bbox.width,
            _ => 0,
        },
        RelativeAlignment::FlushRight => {
            width
                - match anchoring {
                    Anchoring::Center => bbox.width / 2,
                    Anchoring::TopLeftCorner | Anchoring::BottomLeftCorner => bbox.width,
                    _ => 0,
                }
        }
        _ => width / 2,
    }
}
