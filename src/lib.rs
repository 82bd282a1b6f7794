//! Layout and rendering core for charts.
//!
//! Graph items (points, point collections, polygons, labels, images, spacers
//! and plots) draw themselves through a [`DrawSurface`]. A [`Canvas`] arranges
//! them in a grid of rows, surrounds the grid with titles, floats extra items
//! on top and decorates the page with a background and a watermark.
//!
//! ```
//! use graphcanvas::{Canvas, Label, RecordingDc, handle};
//!
//! let mut canvas = Canvas::new(700, 500);
//! let mut dc = RecordingDc::new();
//! canvas.set_fixed_objects_grid_size(1, 1);
//! canvas.set_fixed_object(0, 0, handle(Label::with_text("Sales")));
//! canvas.calc_all_sizes(&dc);
//! canvas.draw(&mut dc);
//! assert!(dc.texts().contains(&"Sales"));
//! ```

pub mod log;

pub mod canvas;
pub mod context;
pub mod dc;
pub mod defaults;
pub mod errors;
pub mod graphs;
pub mod items;
pub mod math;
pub mod types;

pub use canvas::{Canvas, PrintSettings, Watermark, WatermarkDirection};
pub use context::{DebugFlags, RenderContext};
pub use dc::{DrawCommand, DrawSurface, RecordingDc, SvgDc};
pub use errors::{DataBindingError, ExportError, ImageLoadError};
pub use graphs::{CandlestickPlot, Dataset, Graph2D, PlotKind, PlotType};
pub use items::{
    GraphItem, GraphItemEnum, GraphItemInfo, Image, ItemHandle, Label, Point2D, Points2D,
    Polygon, Spacer, handle,
};
pub use types::{Brush, Color, Font, Pen, Pt, Rect, Size};
