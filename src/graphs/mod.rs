//! Plots built on the item layer.
//!
//! [`Graph2D`] is a grid-placed item that owns a plot area and rebuilds its
//! child items (polygons, line collections) whenever the canvas hands it a
//! new bounding box. Data comes from a column-oriented [`Dataset`].

pub mod candlestick;

use chrono::NaiveDate;

pub use candlestick::{CandlestickPlot, Ohlc, PlotType};

use crate::context::RenderContext;
use crate::dc::{DrawSurface, PenChanger, TextColorChanger};
use crate::errors::DataBindingError;
use crate::items::info::{GraphItemInfo, Spacing};
use crate::items::{GraphItem, GraphItemBase, GraphItemEnum};
use crate::log::{debug, trace};
use crate::math::scale_within;
use crate::types::{Color, Pt, Rect};

/// Room reserved for axis labels below and left of the plot area, in DIPs.
const AXIS_LABEL_MARGIN: f64 = 40.0;

/// Padding above and right of the plot area, in DIPs.
const PLOT_PADDING: f64 = 10.0;

// ============================================================================
// Dataset
// ============================================================================

/// Column-oriented table of named numeric columns plus one date column.
///
/// The first column added fixes the row count; every later column must
/// match it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    continuous: Vec<(String, Vec<f64>)>,
    dates: Option<(String, Vec<Option<NaiveDate>>)>,
    rows: Option<usize>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a numeric column.
    pub fn add_continuous_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<(), DataBindingError> {
        let name = name.into();
        self.check_length(&name, values.len())?;
        match self.continuous.iter_mut().find(|(n, _)| *n == name) {
            Some((_, column)) => *column = values,
            None => self.continuous.push((name, values)),
        }
        Ok(())
    }

    /// Sets the date column. `None` entries mark rows with unparseable dates.
    pub fn set_date_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<Option<NaiveDate>>,
    ) -> Result<(), DataBindingError> {
        let name = name.into();
        self.check_length(&name, values.len())?;
        self.dates = Some((name, values));
        Ok(())
    }

    pub fn with_continuous_column(
        mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<Self, DataBindingError> {
        self.add_continuous_column(name, values)?;
        Ok(self)
    }

    pub fn with_date_column(
        mut self,
        name: impl Into<String>,
        values: Vec<Option<NaiveDate>>,
    ) -> Result<Self, DataBindingError> {
        self.set_date_column(name, values)?;
        Ok(self)
    }

    pub fn row_count(&self) -> usize {
        self.rows.unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    /// Names of every column, dates first.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.dates
            .iter()
            .map(|(name, _)| name.as_str())
            .chain(self.continuous.iter().map(|(name, _)| name.as_str()))
    }

    pub fn continuous_column(&self, name: &str) -> Result<&[f64], DataBindingError> {
        self.continuous
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, values)| values.as_slice())
            .ok_or_else(|| DataBindingError::column_not_found(name, self.column_names()))
    }

    pub fn date_column(&self, name: &str) -> Result<&[Option<NaiveDate>], DataBindingError> {
        match &self.dates {
            Some((n, values)) if n == name => Ok(values),
            _ => Err(DataBindingError::column_not_found(name, self.column_names())),
        }
    }

    /// Smallest and largest finite value of a numeric column.
    pub fn continuous_min_max(&self, name: &str) -> Result<Option<(f64, f64)>, DataBindingError> {
        let values = self.continuous_column(name)?;
        Ok(values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |range, v| match range {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            }))
    }

    fn check_length(&mut self, name: &str, len: usize) -> Result<(), DataBindingError> {
        match self.rows {
            Some(expected) if expected != len => Err(DataBindingError::ColumnLengthMismatch {
                name: name.to_string(),
                expected,
                found: len,
            }),
            Some(_) => Ok(()),
            None => {
                self.rows = Some(len);
                Ok(())
            }
        }
    }
}

// ============================================================================
// Graph2D
// ============================================================================

/// The plot builders a [`Graph2D`] can host.
#[derive(Debug, Clone, Default)]
pub enum PlotKind {
    /// No builder; children are whatever the caller added.
    #[default]
    Empty,
    Candlestick(CandlestickPlot),
}

/// Axis-bearing plot container placed in a canvas cell.
#[derive(Debug, Clone)]
pub struct Graph2D {
    base: GraphItemBase,
    children: Vec<GraphItemEnum>,
    x_range: (f64, f64),
    y_range: (f64, f64),
    /// Space around the plot area, in DIPs.
    axis_margins: Spacing,
    rect: Rect,
    plot_area: Rect,
    plot: PlotKind,
    debug_info: String,
}

impl Default for Graph2D {
    fn default() -> Self {
        Self::new(GraphItemInfo::default())
    }
}

impl Graph2D {
    pub fn new(info: GraphItemInfo) -> Self {
        Self {
            base: GraphItemBase::new(info),
            children: Vec::new(),
            x_range: (0.0, 1.0),
            y_range: (0.0, 1.0),
            axis_margins: Spacing::new(
                PLOT_PADDING,
                PLOT_PADDING,
                AXIS_LABEL_MARGIN,
                AXIS_LABEL_MARGIN,
            ),
            rect: Rect::EMPTY,
            plot_area: Rect::EMPTY,
            plot: PlotKind::Empty,
            debug_info: String::new(),
        }
    }

    /// Graph hosting a candlestick plot; the data ranges come from its data.
    pub fn candlestick(info: GraphItemInfo, plot: CandlestickPlot) -> Self {
        let mut graph = Self::new(info);
        graph.set_plot(PlotKind::Candlestick(plot));
        graph
    }

    pub fn with_axis_margins(mut self, margins: Spacing) -> Self {
        self.axis_margins = margins;
        self
    }

    pub fn axis_margins(&self) -> Spacing {
        self.axis_margins
    }

    pub fn plot(&self) -> &PlotKind {
        &self.plot
    }

    /// Replaces the plot builder and adopts its data ranges. Children are
    /// rebuilt on the next `recalc_sizes`.
    pub fn set_plot(&mut self, plot: PlotKind) {
        match &plot {
            PlotKind::Candlestick(candles) => {
                self.x_range = (0.0, candles.axis_point_count() as f64);
                if let Some(range) = candles.value_range() {
                    self.y_range = range;
                }
                self.debug_info = match candles.date_range() {
                    Some((first, last)) => format!("Date range: {first} - {last}"),
                    None => String::new(),
                };
            }
            PlotKind::Empty => self.debug_info.clear(),
        }
        self.plot = plot;
        self.base.invalidate();
    }

    pub fn x_range(&self) -> (f64, f64) {
        self.x_range
    }

    pub fn y_range(&self) -> (f64, f64) {
        self.y_range
    }

    pub fn set_x_range(&mut self, min: f64, max: f64) {
        self.x_range = (min, max);
    }

    pub fn set_y_range(&mut self, min: f64, max: f64) {
        self.y_range = (min, max);
    }

    pub fn plot_area(&self) -> Rect {
        self.plot_area
    }

    pub fn children(&self) -> &[GraphItemEnum] {
        &self.children
    }

    /// Adds a child to a graph without a plot builder.
    pub fn add_child(&mut self, child: impl Into<GraphItemEnum>) {
        self.children.push(child.into());
    }

    /// Maps a data point to pixels inside the plot area, or `None` if it
    /// falls outside the data ranges.
    pub fn physical_coordinates(&self, x: f64, y: f64) -> Option<Pt> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        let (x_min, x_max) = self.x_range;
        let (y_min, y_max) = self.y_range;
        if x < x_min || x > x_max || y < y_min || y > y_max {
            return None;
        }
        let area = self.plot_area;
        let px = scale_within(
            x,
            self.x_range,
            (f64::from(area.left()), f64::from(area.right())),
        );
        // screen y grows downward
        let py = scale_within(
            y,
            self.y_range,
            (f64::from(area.bottom()), f64::from(area.top())),
        );
        Some(Pt::new(px.round() as i32, py.round() as i32))
    }

    fn calc_plot_area(&self) -> Rect {
        let base = &self.base;
        let scaled = |v: f64| base.scale_to_screen_and_canvas(v).round() as i32;
        let mut left = self.rect.left() + scaled(self.axis_margins.left);
        let mut top = self.rect.top() + scaled(self.axis_margins.top);
        let mut right = self.rect.right() - scaled(self.axis_margins.right);
        let mut bottom = self.rect.bottom() - scaled(self.axis_margins.bottom);
        // edges pinned by canvas alignment win over the margins
        if let Some(edge) = base.content_left() {
            left = edge;
        }
        if let Some(edge) = base.content_top() {
            top = edge;
        }
        if let Some(edge) = base.content_right() {
            right = edge;
        }
        if let Some(edge) = base.content_bottom() {
            bottom = edge;
        }
        if right < left || bottom < top {
            return Rect::EMPTY;
        }
        Rect::from_corners(Pt::new(left, top), Pt::new(right, bottom))
    }
}

impl GraphItem for Graph2D {
    fn base(&self) -> &GraphItemBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut GraphItemBase {
        &mut self.base
    }

    fn draw(&self, dc: &mut dyn DrawSurface, ctx: &RenderContext) -> Rect {
        if !self.base.is_shown() {
            return Rect::EMPTY;
        }
        if !self.plot_area.is_empty() {
            let mut dc = PenChanger::new(&mut *dc, self.base.scaled_pen());
            if dc.pen().is_some() {
                let area = self.plot_area;
                dc.draw_line(area.top_left(), area.bottom_left());
                dc.draw_line(area.bottom_left(), area.bottom_right());
            }
        }
        for child in &self.children {
            child.draw(dc, ctx);
        }
        if self.base.is_selected()
            && ctx.debug.draw_extra_information
            && !self.debug_info.is_empty()
        {
            let mut dc = TextColorChanger::new(dc, Color::BLUE);
            dc.draw_text(&self.debug_info, self.plot_area.top_left());
        }
        self.rect
    }

    fn bounding_box(&self, _dc: &dyn DrawSurface) -> Rect {
        self.rect
    }

    fn set_bounding_box(&mut self, rect: Rect, dc: &dyn DrawSurface, _parent_scaling: f64) {
        debug_assert!(
            !self.base.is_free_floating(),
            "set_bounding_box() should only be called on fixed objects"
        );
        if self.base.is_free_floating() {
            return;
        }
        self.rect = rect;
        self.base.invalidate();
        self.recalc_sizes(dc);
    }

    fn offset(&mut self, dx: i32, dy: i32) {
        self.rect = self.rect.offset(dx, dy);
        self.plot_area = self.plot_area.offset(dx, dy);
        for child in &mut self.children {
            child.offset(dx, dy);
        }
    }

    fn hit_test(&self, pt: Pt, _dc: &dyn DrawSurface) -> bool {
        self.rect.contains(pt)
    }

    fn recalc_sizes(&mut self, dc: &dyn DrawSurface) {
        self.plot_area = self.calc_plot_area();
        let children = match &self.plot {
            PlotKind::Empty => return,
            PlotKind::Candlestick(candles) => candles.build(self, dc),
        };
        trace!(
            count = children.len(),
            area = ?self.plot_area,
            "rebuilt graph children"
        );
        self.children = children;
    }

    fn content_rect(&self, _dc: &dyn DrawSurface) -> Rect {
        if self.plot_area.is_empty() {
            self.rect
        } else {
            self.plot_area
        }
    }

    fn set_dpi_scale_factor(&mut self, factor: f64) {
        self.base.set_dpi_scale_factor(factor);
        for child in &mut self.children {
            child.set_dpi_scale_factor(factor);
        }
    }

    fn clear_selections(&mut self) {
        self.base.set_selected(false);
        for child in &mut self.children {
            child.clear_selections();
        }
    }

    fn update_selected_items(&mut self) {
        if self.base.is_selected() {
            debug!(id = self.base.id(), "graph children rebuilt while selected");
        }
    }
}
