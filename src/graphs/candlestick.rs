//! Stock price plots: one candle (or OHLC bar) per trading day.

use chrono::NaiveDate;

use crate::dc::DrawSurface;
use crate::errors::DataBindingError;
use crate::graphs::{Dataset, Graph2D};
use crate::items::info::{GraphItemInfo, IconShape};
use crate::items::{GraphItem, GraphItemEnum, Point2D, Points2D, Polygon, PolygonShape};
use crate::log::{debug, warn};
use crate::types::{Brush, Color, Pen, Pt};

/// How each day is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlotType {
    /// Filled body between open and close, with a wick from low to high.
    #[default]
    Candlestick,
    /// Vertical bar from low to high, open tick on the left and close tick
    /// on the right.
    Ohlc,
}

/// One day's prices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ohlc {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Ohlc {
    fn is_gain(&self) -> bool {
        self.open <= self.close
    }

    fn summary(&self) -> String {
        format!(
            "Date: {}\nOpening: {:.2}\nHigh: {:.2}\nLow: {:.2}\nClosing: {:.2}",
            self.date.format("%Y-%m-%d"),
            self.open,
            self.high,
            self.low,
            self.close
        )
    }
}

#[derive(Debug, Clone)]
pub struct CandlestickPlot {
    ohlcs: Vec<Ohlc>,
    plot_type: PlotType,
    gain_brush: Brush,
    loss_brush: Brush,
}

impl Default for CandlestickPlot {
    fn default() -> Self {
        Self::new()
    }
}

impl CandlestickPlot {
    pub fn new() -> Self {
        Self {
            ohlcs: Vec::new(),
            plot_type: PlotType::Candlestick,
            gain_brush: Brush::solid(Color::GREEN),
            loss_brush: Brush::solid(Color::RED),
        }
    }

    pub fn with_plot_type(mut self, plot_type: PlotType) -> Self {
        self.plot_type = plot_type;
        self
    }

    pub fn plot_type(&self) -> PlotType {
        self.plot_type
    }

    pub fn set_plot_type(&mut self, plot_type: PlotType) {
        self.plot_type = plot_type;
    }

    pub fn gain_brush(&self) -> &Brush {
        &self.gain_brush
    }

    pub fn set_gain_brush(&mut self, brush: Brush) {
        self.gain_brush = brush;
    }

    pub fn loss_brush(&self) -> &Brush {
        &self.loss_brush
    }

    pub fn set_loss_brush(&mut self, brush: Brush) {
        self.loss_brush = brush;
    }

    pub fn ohlcs(&self) -> &[Ohlc] {
        &self.ohlcs
    }

    /// Binds the named columns. Rows with a missing date or a NaN price are
    /// skipped; a missing column is an error and leaves the plot unchanged.
    pub fn set_data(
        &mut self,
        data: &Dataset,
        date: &str,
        open: &str,
        high: &str,
        low: &str,
        close: &str,
    ) -> Result<(), DataBindingError> {
        let dates = data.date_column(date)?;
        let opens = data.continuous_column(open)?;
        let highs = data.continuous_column(high)?;
        let lows = data.continuous_column(low)?;
        let closes = data.continuous_column(close)?;
        if data.is_empty() {
            return Err(DataBindingError::EmptyDataset);
        }

        self.ohlcs = (0..data.row_count())
            .filter_map(|row| {
                let ohlc = Ohlc {
                    date: dates[row]?,
                    open: opens[row],
                    high: highs[row],
                    low: lows[row],
                    close: closes[row],
                };
                let prices = [ohlc.open, ohlc.high, ohlc.low, ohlc.close];
                if prices.iter().any(|v| v.is_nan()) {
                    None
                } else {
                    Some(ohlc)
                }
            })
            .collect();
        debug!(
            rows = data.row_count(),
            kept = self.ohlcs.len(),
            "bound candlestick data"
        );
        Ok(())
    }

    /// First and last trading day.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.ohlcs.iter().map(|o| o.date).min()?;
        let last = self.ohlcs.iter().map(|o| o.date).max()?;
        Some((first, last))
    }

    /// Lowest and highest price across all four series.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.ohlcs
            .iter()
            .flat_map(|o| [o.open, o.high, o.low, o.close])
            .fold(None, |range, v| match range {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// One axis slot per calendar day in the date range.
    pub fn axis_point_count(&self) -> usize {
        match self.date_range() {
            Some((first, last)) => (last - first).num_days().max(0) as usize + 1,
            None => 0,
        }
    }

    /// Builds the candles (or bars) for `graph`'s current plot area.
    pub(crate) fn build(&self, graph: &Graph2D, dc: &dyn DrawSurface) -> Vec<GraphItemEnum> {
        let Some((first_day, _)) = self.date_range() else {
            return Vec::new();
        };
        let base = graph.base();
        let scaling = base.scaling();
        let dpi = base.dpi_scale_factor();
        let one_dip = base.scale_to_screen_and_canvas(1.0);
        let axis_points = self.axis_point_count();
        let candle_width =
            (f64::from(graph.plot_area().width) / axis_points.max(1) as f64).floor();
        // one DIP of padding on each side
        let side = ((candle_width / 2.0 - one_dip).floor() as i32).max(1);

        let line = |from: Pt, to: Pt, pen: &Pen, text: &str| {
            let info = GraphItemInfo::new(text)
                .with_pen(Some(pen.clone()))
                .with_scaling(scaling)
                .with_dpi_scale_factor(dpi);
            let mut segment = Points2D::new(info);
            for pt in [from, to] {
                let end = Point2D::new(GraphItemInfo::default().with_anchor_point(pt), 0.0)
                    .with_shape(IconShape::Blank);
                segment.add_point(end, dc);
            }
            GraphItemEnum::from(segment)
        };

        let mut children = Vec::with_capacity(self.ohlcs.len() * 2);
        for ohlc in &self.ohlcs {
            let slot = (ohlc.date - first_day).num_days() as f64 + 0.5;
            let coords = |value: f64| graph.physical_coordinates(slot, value);
            let (Some(low_pt), Some(high_pt)) = (coords(ohlc.low), coords(ohlc.high)) else {
                warn!(date = %ohlc.date, "candle outside the plot range");
                continue;
            };
            let (Some(open_pt), Some(close_pt)) = (coords(ohlc.open), coords(ohlc.close)) else {
                continue;
            };

            let brush = if ohlc.is_gain() {
                &self.gain_brush
            } else {
                &self.loss_brush
            };
            let wick_pen = Pen::new(shade(brush.color, 0.2));
            let text = ohlc.summary();
            let wick_x = low_pt.x;

            let mut body = [
                Pt::new(close_pt.x - side, close_pt.y),
                Pt::new(close_pt.x + side, close_pt.y),
                Pt::new(open_pt.x + side, open_pt.y),
                Pt::new(open_pt.x - side, open_pt.y),
            ];

            children.push(line(low_pt, high_pt, &wick_pen, &text));
            match self.plot_type {
                PlotType::Candlestick => {
                    let mut info = GraphItemInfo::new(text.as_str())
                        .with_brush(Some(brush.clone()))
                        .with_scaling(scaling)
                        .with_dpi_scale_factor(dpi);
                    // a thin body shows only its colour
                    if f64::from(body[1].x - body[0].x) <= one_dip {
                        info = info.with_pen(None);
                    }
                    let candle = Polygon::new(info, &body).with_shape(PolygonShape::Rectangle);
                    children.push(candle.into());
                }
                PlotType::Ohlc => {
                    body[0].x = wick_x;
                    body[2].x = wick_x;
                    children.push(line(body[0], body[1], &wick_pen, &text));
                    children.push(line(body[2], body[3], &wick_pen, &text));
                }
            }
        }
        children
    }
}

/// Darkens `color` by `amount` (0..=1), keeping its alpha.
fn shade(color: Color, amount: f64) -> Color {
    let keep = (1.0 - amount).clamp(0.0, 1.0);
    let channel = |c: u8| (f64::from(c) * keep).round() as u8;
    Color::rgba(channel(color.r), channel(color.g), channel(color.b), color.a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dc::RecordingDc;
    use crate::items::info::Spacing;
    use crate::types::Rect;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn prices() -> Dataset {
        Dataset::new()
            .with_date_column("Date", vec![Some(day(1)), Some(day(2)), None, Some(day(4))])
            .and_then(|d| d.with_continuous_column("Open", vec![10.0, 30.0, 5.0, 20.0]))
            .and_then(|d| d.with_continuous_column("High", vec![40.0, 40.0, 5.0, 25.0]))
            .and_then(|d| d.with_continuous_column("Low", vec![0.0, 10.0, 5.0, f64::NAN]))
            .and_then(|d| d.with_continuous_column("Close", vec![30.0, 20.0, 5.0, 20.0]))
            .unwrap()
    }

    fn bound(plot_type: PlotType) -> CandlestickPlot {
        let mut plot = CandlestickPlot::new().with_plot_type(plot_type);
        plot.set_data(&prices(), "Date", "Open", "High", "Low", "Close")
            .unwrap();
        plot
    }

    /// Graph whose plot area is exactly `width`x101 at the origin.
    fn laid_out(plot: CandlestickPlot, width: i32) -> Graph2D {
        let dc = RecordingDc::new();
        let mut graph = Graph2D::candlestick(GraphItemInfo::default(), plot)
            .with_axis_margins(Spacing::default());
        graph.set_bounding_box(Rect::new(0, 0, width, 101), &dc, 1.0);
        graph
    }

    #[test]
    fn missing_column_is_reported() {
        let mut plot = CandlestickPlot::new();
        let err = plot
            .set_data(&prices(), "Date", "Open", "High", "Low", "Clse")
            .unwrap_err();
        assert!(matches!(err, DataBindingError::ColumnNotFound { ref name, .. } if name == "Clse"));
        assert!(plot.ohlcs().is_empty());
    }

    #[test]
    fn empty_dataset_is_rejected() {
        let data = Dataset::new()
            .with_date_column("Date", vec![])
            .and_then(|d| d.with_continuous_column("P", vec![]))
            .unwrap();
        let mut plot = CandlestickPlot::new();
        assert_eq!(
            plot.set_data(&data, "Date", "P", "P", "P", "P"),
            Err(DataBindingError::EmptyDataset)
        );
    }

    #[test]
    fn skips_rows_without_date_or_with_nan() {
        let plot = bound(PlotType::Candlestick);
        let dates: Vec<_> = plot.ohlcs().iter().map(|o| o.date).collect();
        assert_eq!(dates, vec![day(1), day(2)]);
        assert_eq!(plot.value_range(), Some((0.0, 40.0)));
        assert_eq!(plot.axis_point_count(), 2);
    }

    #[test]
    fn candles_fill_their_slot_minus_padding() {
        let graph = laid_out(bound(PlotType::Candlestick), 201);
        let children = graph.children();
        // wick + body per day
        assert_eq!(children.len(), 4);

        let candle = children[1].as_polygon().unwrap();
        // slot width 100, side = floor(50 - 1) = 49 around x = 50
        let pts = candle.points();
        assert_eq!(pts[0].x, 1);
        assert_eq!(pts[1].x, 99);
        // close 30 of 0..40 -> y 25; open 10 -> y 75
        assert_eq!(pts[0].y, 25);
        assert_eq!(pts[2].y, 75);
        assert_eq!(candle.base().brush(), Some(&Brush::solid(Color::GREEN)));

        let losing = children[3].as_polygon().unwrap();
        assert_eq!(losing.base().brush(), Some(&Brush::solid(Color::RED)));

        let wick = children[0].as_points().unwrap();
        assert_eq!(wick.points().len(), 2);
        assert_eq!(wick.points()[0].shape(), IconShape::Blank);
        assert!(wick.base().text().starts_with("Date: 2024-01-01\nOpening: 10.00"));
        assert_eq!(wick.base().pen().map(|p| p.color), Some(shade(Color::GREEN, 0.2)));
    }

    #[test]
    fn thin_candles_lose_their_outline() {
        let at_scaling = |width: i32| {
            let dc = RecordingDc::new();
            let mut graph = Graph2D::candlestick(
                GraphItemInfo::default().with_scaling(3.0),
                bound(PlotType::Candlestick),
            )
            .with_axis_margins(Spacing::default());
            graph.set_bounding_box(Rect::new(0, 0, width, 101), &dc, 3.0);
            graph
        };

        // slot 4px: side clamps to 1, so the 2px body is under 3 scaled DIPs
        let graph = at_scaling(8);
        let candle = graph.children()[1].as_polygon().unwrap();
        assert_eq!(candle.points()[1].x - candle.points()[0].x, 2);
        assert!(candle.base().pen().is_none());

        let graph = at_scaling(201);
        let candle = graph.children()[1].as_polygon().unwrap();
        assert_eq!(candle.points()[1].x - candle.points()[0].x, 94);
        assert!(candle.base().pen().is_some());
    }

    #[test]
    fn ohlc_bars_have_ticks_on_each_side() {
        let graph = laid_out(bound(PlotType::Ohlc), 201);
        let children = graph.children();
        // wick + two ticks per day, no polygons
        assert_eq!(children.len(), 6);
        assert!(children.iter().all(|c| c.as_points().is_some()));

        let wick_x = children[0].as_points().unwrap().points()[0].anchor_point().x;
        let close_tick = children[1].as_points().unwrap().points();
        let open_tick = children[2].as_points().unwrap().points();
        assert_eq!(close_tick[0].anchor_point().x, wick_x);
        assert!(close_tick[1].anchor_point().x > wick_x);
        assert_eq!(open_tick[0].anchor_point().x, wick_x);
        assert!(open_tick[1].anchor_point().x < wick_x);
    }

    #[test]
    fn shade_darkens_and_keeps_alpha() {
        assert_eq!(
            shade(Color::rgba(100, 200, 50, 7), 0.2),
            Color::rgba(80, 160, 40, 7)
        );
    }
}
