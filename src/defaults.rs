//! Default sizes and settings (pixel values are DIPs unless noted)

use crate::types::Color;

/// Multiplier applied to the canvas rect per zoom step.
pub const ZOOM_FACTOR: f64 = 1.5;
pub const MAX_ZOOM_LEVEL: i32 = 40;

pub const DEFAULT_CANVAS_WIDTH: i32 = 700;
pub const DEFAULT_CANVAS_HEIGHT: i32 = 500;

pub const SHADOW_OFFSET: f64 = 2.0;
pub const SHADOW_COLOR: Color = Color::rgba(84, 84, 84, 175);

pub const WATERMARK_COLOR: Color = Color::rgba(255, 0, 0, 125);
/// Box the watermark logo is fitted into.
pub const WATERMARK_LOGO_SIZE: f64 = 100.0;

/// Extra room around the canvas when fitting the background image.
pub const BACKGROUND_IMAGE_PADDING: f64 = 100.0;

pub const TITLE_SPACING: f64 = 2.0;
pub const SELECTION_LABEL_PADDING: f64 = 2.0;

pub const ARROWHEAD_SIZE: f64 = 10.0;
pub const LEGEND_ARROWHEAD_SIZE: f64 = 2.0;
pub const LEGEND_ICON_WIDTH: i32 = 16;

pub const ROUNDED_CORNER_RADIUS: f64 = 5.0;
pub const TRANSLUCENCY: u8 = 100;

/// Distance from an edge's x-intercept still counted as "on" the edge.
pub const INSIDE_POLYGON_EPSILON: f64 = 0.01;

pub const DEFAULT_POINT_RADIUS: f64 = 4.0;
