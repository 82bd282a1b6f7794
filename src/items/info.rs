//! Attribute bags for graph items and the enums that describe them.
//!
//! [`GraphItemInfo`] is built fluently and handed to an item's constructor:
//!
//! ```
//! use graphcanvas::items::{Anchoring, GraphItemInfo};
//! use graphcanvas::types::{Color, Pen};
//!
//! let info = GraphItemInfo::new("Sales")
//!     .with_pen(Some(Pen::new(Color::BLUE)))
//!     .with_anchoring(Anchoring::TopLeftCorner)
//!     .with_padding(4.0, 4.0, 4.0, 4.0);
//! assert_eq!(info.text(), "Sales");
//! ```

use crate::defaults;
use crate::types::{Brush, Color, Font, Pen, Pt, Rect, Size};

/// Which point of an item its anchor point refers to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash)]
pub enum Anchoring {
    TopLeftCorner,
    TopRightCorner,
    BottomLeftCorner,
    BottomRightCorner,
    #[default]
    Center,
}

impl Anchoring {
    /// Rectangle of `size` whose anchoring point sits on `anchor`.
    ///
    /// Corners are inclusive, so `anchor_for(anchored_rect(..))` gives back
    /// the same anchor.
    pub fn anchored_rect(self, anchor: Pt, size: Size<i32>) -> Rect {
        let (w, h) = (size.width, size.height);
        let origin = match self {
            Anchoring::TopLeftCorner => anchor,
            Anchoring::TopRightCorner => Pt::new(anchor.x - w + 1, anchor.y),
            Anchoring::BottomLeftCorner => Pt::new(anchor.x, anchor.y - h + 1),
            Anchoring::BottomRightCorner => Pt::new(anchor.x - w + 1, anchor.y - h + 1),
            Anchoring::Center => Pt::new(anchor.x - w / 2, anchor.y - h / 2),
        };
        Rect::from_point_size(origin, size)
    }

    /// The point of `rect` this anchoring refers to.
    pub fn anchor_for(self, rect: &Rect) -> Pt {
        match self {
            Anchoring::TopLeftCorner => rect.top_left(),
            Anchoring::TopRightCorner => rect.top_right(),
            Anchoring::BottomLeftCorner => rect.bottom_left(),
            Anchoring::BottomRightCorner => rect.bottom_right(),
            Anchoring::Center => rect.center(),
        }
    }
}

/// How an item sits inside a larger canvas cell
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash)]
pub enum RelativeAlignment {
    FlushLeft,
    FlushRight,
    #[default]
    Centered,
    FlushTop,
    FlushBottom,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash)]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash)]
pub enum ShadowType {
    #[default]
    NoShadow,
    RightSideShadow,
    RightSideAndBottomShadow,
}

/// How a label adapts to the box it is placed in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash)]
pub enum LabelFit {
    /// Scale the font so the text fills the box.
    #[default]
    ScaleFontToFit,
    /// Keep the box but clip the drawn outline to the measured content.
    FitContentToBox,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash)]
pub enum TextAlignment {
    #[default]
    FlushLeft,
    FlushRight,
    Centered,
    Justified,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash)]
pub enum PageVerticalAlignment {
    #[default]
    TopAligned,
    Centered,
    BottomAligned,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash)]
pub enum PageHorizontalAlignment {
    #[default]
    LeftAligned,
    Centered,
    RightAligned,
}

/// Paper-like decorations drawn behind label text
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash)]
pub enum LabelStyle {
    #[default]
    NoLabelStyle,
    IndexCard,
    LinedPaper,
    DottedLinedPaper,
    RightArrowLinedPaper,
    LinedPaperWithMargins,
    DottedLinedPaperWithMargins,
    RightArrowLinedPaperWithMargins,
}

impl LabelStyle {
    pub fn has_lines(self) -> bool {
        self != LabelStyle::NoLabelStyle
    }

    pub fn has_margins(self) -> bool {
        matches!(
            self,
            LabelStyle::LinedPaperWithMargins
                | LabelStyle::DottedLinedPaperWithMargins
                | LabelStyle::RightArrowLinedPaperWithMargins
        )
    }
}

/// How lines between consecutive points are drawn
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash)]
pub enum LineStyle {
    #[default]
    Lines,
    Arrows,
    Spline,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash)]
pub enum BoxCorners {
    #[default]
    Straight,
    Rounded,
}

/// Glyph drawn for a point or legend entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash)]
pub enum IconShape {
    Blank,
    HorizontalLine,
    ArrowRight,
    #[default]
    Circle,
    Square,
    BoxPlot,
    TriangleUpward,
    TriangleDownward,
    TriangleRight,
    TriangleLeft,
    Diamond,
    Cross,
    Asterisk,
    Hexagon,
    Image,
    /// Legend only: a rule across the whole legend.
    HorizontalSeparator,
    /// Legend only: a rule ending in an arrowhead.
    HorizontalArrowRightSeparator,
    /// Legend only: an image stretched beside every line.
    ImageWholeLegend,
    /// Legend only: a vertical colour ramp.
    ColorGradient,
}

/// Padding or margins, in DIPs
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Spacing {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Spacing {
    pub const fn new(top: f64, right: f64, bottom: f64, left: f64) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    pub const fn uniform(value: f64) -> Self {
        Self::new(value, value, value, value)
    }
}

/// Which sides of a label's box get an outline
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Outline {
    pub top: bool,
    pub right: bool,
    pub bottom: bool,
    pub left: bool,
}

impl Outline {
    pub const ALL: Outline = Outline {
        top: true,
        right: true,
        bottom: true,
        left: true,
    };

    pub fn is_complete(&self) -> bool {
        self.top && self.right && self.bottom && self.left
    }
}

impl Default for Outline {
    fn default() -> Self {
        Outline::ALL
    }
}

/// An icon drawn beside one line of a label
#[derive(Clone, Debug, PartialEq)]
pub struct LegendIcon {
    pub shape: IconShape,
    pub pen: Option<Pen>,
    pub brush: Option<Brush>,
    /// Colour stops for [`IconShape::ColorGradient`].
    pub colors: Vec<Color>,
}

impl LegendIcon {
    pub fn new(shape: IconShape, pen: Option<Pen>, brush: Option<Brush>) -> Self {
        Self {
            shape,
            pen,
            brush,
            colors: Vec::new(),
        }
    }

    pub fn color_gradient(colors: Vec<Color>) -> Self {
        Self {
            shape: IconShape::ColorGradient,
            pen: Some(Pen::default()),
            brush: None,
            colors,
        }
    }

    /// Unscaled icon width in DIPs.
    pub const fn icon_width() -> i32 {
        defaults::LEGEND_ICON_WIDTH
    }

    /// Unscaled arrowhead (width, length) for arrow glyphs.
    pub const fn arrowhead_size() -> Size<f64> {
        Size::new(defaults::LEGEND_ARROWHEAD_SIZE, defaults::LEGEND_ARROWHEAD_SIZE)
    }
}

/// Formatting for the first line of a label
#[derive(Clone, Debug, PartialEq)]
pub struct HeaderInfo {
    pub enabled: bool,
    pub alignment: TextAlignment,
    pub font: Font,
    pub font_color: Color,
    /// Header font size relative to the label font.
    pub relative_scaling: f64,
}

impl Default for HeaderInfo {
    fn default() -> Self {
        Self {
            enabled: false,
            alignment: TextAlignment::FlushLeft,
            font: Font::default(),
            font_color: Color::BLACK,
            relative_scaling: 1.0,
        }
    }
}

impl HeaderInfo {
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_alignment(mut self, alignment: TextAlignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn with_font(mut self, font: Font) -> Self {
        self.font = font;
        self
    }

    pub fn with_font_color(mut self, color: Color) -> Self {
        self.font_color = color;
        self
    }

    pub fn with_relative_scaling(mut self, scaling: f64) -> Self {
        self.relative_scaling = scaling;
        self
    }
}

/// Attributes shared by every drawable item
#[derive(Clone, Debug, PartialEq)]
pub struct GraphItemInfo {
    pub(crate) id: i64,
    pub(crate) show: bool,
    pub(crate) selectable: bool,
    pub(crate) free_floating: bool,
    pub(crate) show_label_when_selected: bool,
    pub(crate) canvas_width_proportion: f64,
    pub(crate) canvas_height_proportion: Option<f64>,
    pub(crate) canvas_margins: Spacing,
    pub(crate) fit_row_to_content: bool,
    pub(crate) fixed_width_on_canvas: bool,
    pub(crate) relative_alignment: RelativeAlignment,
    pub(crate) pen: Option<Pen>,
    pub(crate) brush: Option<Brush>,
    pub(crate) selection_brush: Option<Brush>,
    pub(crate) anchoring: Anchoring,
    pub(crate) orientation: Orientation,
    pub(crate) padding: Spacing,
    pub(crate) outline: Outline,
    pub(crate) text: String,
    pub(crate) font: Font,
    pub(crate) font_color: Color,
    pub(crate) font_background_color: Option<Color>,
    pub(crate) text_alignment: TextAlignment,
    pub(crate) page_vertical_alignment: PageVerticalAlignment,
    pub(crate) page_horizontal_alignment: PageHorizontalAlignment,
    pub(crate) label_style: LabelStyle,
    pub(crate) label_fit: LabelFit,
    pub(crate) legend_icons: Vec<LegendIcon>,
    pub(crate) header: HeaderInfo,
    pub(crate) min_user_width: Option<f64>,
    pub(crate) min_user_height: Option<f64>,
    pub(crate) scaling: f64,
    pub(crate) dpi_scale_factor: Option<f64>,
    pub(crate) anchor_point: Pt,
    pub(crate) shadow: ShadowType,
    pub(crate) clipping_rect: Option<Rect>,
    pub(crate) ok: bool,
}

impl Default for GraphItemInfo {
    fn default() -> Self {
        Self {
            id: -1,
            show: true,
            selectable: true,
            free_floating: false,
            show_label_when_selected: true,
            canvas_width_proportion: 1.0,
            canvas_height_proportion: None,
            canvas_margins: Spacing::default(),
            fit_row_to_content: false,
            fixed_width_on_canvas: false,
            relative_alignment: RelativeAlignment::Centered,
            pen: Some(Pen::default()),
            brush: Some(Brush::default()),
            selection_brush: None,
            anchoring: Anchoring::Center,
            orientation: Orientation::Horizontal,
            padding: Spacing::default(),
            outline: Outline::ALL,
            text: String::new(),
            font: Font::default(),
            font_color: Color::BLACK,
            font_background_color: None,
            text_alignment: TextAlignment::FlushLeft,
            page_vertical_alignment: PageVerticalAlignment::TopAligned,
            page_horizontal_alignment: PageHorizontalAlignment::LeftAligned,
            label_style: LabelStyle::NoLabelStyle,
            label_fit: LabelFit::ScaleFontToFit,
            legend_icons: Vec::new(),
            header: HeaderInfo::default(),
            min_user_width: None,
            min_user_height: None,
            scaling: 1.0,
            dpi_scale_factor: None,
            anchor_point: Pt::new(0, 0),
            shadow: ShadowType::NoShadow,
            clipping_rect: None,
            ok: true,
        }
    }
}

macro_rules! info_setters {
    ($($(#[$meta:meta])* $name:ident($field:ident: $ty:ty);)*) => {
        $(
            $(#[$meta])*
            pub fn $name(mut self, $field: $ty) -> Self {
                self.$field = $field;
                self
            }
        )*
    };
}

impl GraphItemInfo {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    info_setters! {
        with_id(id: i64);
        with_show(show: bool);
        with_selectable(selectable: bool);
        /// Free-floating items are positioned by the caller and scaled by
        /// the canvas instead of being fitted into a grid cell.
        with_free_floating(free_floating: bool);
        with_show_label_when_selected(show_label_when_selected: bool);
        with_fit_row_to_content(fit_row_to_content: bool);
        with_fixed_width_on_canvas(fixed_width_on_canvas: bool);
        with_relative_alignment(relative_alignment: RelativeAlignment);
        with_pen(pen: Option<Pen>);
        with_brush(brush: Option<Brush>);
        with_selection_brush(selection_brush: Option<Brush>);
        with_anchoring(anchoring: Anchoring);
        with_orientation(orientation: Orientation);
        with_outline(outline: Outline);
        with_font(font: Font);
        with_font_color(font_color: Color);
        with_font_background_color(font_background_color: Option<Color>);
        with_text_alignment(text_alignment: TextAlignment);
        with_page_vertical_alignment(page_vertical_alignment: PageVerticalAlignment);
        with_page_horizontal_alignment(page_horizontal_alignment: PageHorizontalAlignment);
        with_label_style(label_style: LabelStyle);
        with_label_fit(label_fit: LabelFit);
        with_legend_icons(legend_icons: Vec<LegendIcon>);
        with_header(header: HeaderInfo);
        with_anchor_point(anchor_point: Pt);
        with_shadow(shadow: ShadowType);
        with_clipping_rect(clipping_rect: Option<Rect>);
        with_ok(ok: bool);
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Share of the canvas row width this item takes (0..=1).
    pub fn with_canvas_width_proportion(mut self, proportion: f64) -> Self {
        self.canvas_width_proportion = proportion;
        self
    }

    /// Height share of the canvas, overriding the row proportion.
    pub fn with_canvas_height_proportion(mut self, proportion: f64) -> Self {
        self.canvas_height_proportion = Some(proportion);
        self
    }

    pub fn with_canvas_margins(mut self, top: f64, right: f64, bottom: f64, left: f64) -> Self {
        self.canvas_margins = Spacing::new(top, right, bottom, left);
        self
    }

    pub fn with_padding(mut self, top: f64, right: f64, bottom: f64, left: f64) -> Self {
        self.padding = Spacing::new(top, right, bottom, left);
        self
    }

    pub fn with_min_user_size(mut self, width: Option<f64>, height: Option<f64>) -> Self {
        self.min_user_width = width;
        self.min_user_height = height;
        self
    }

    /// Ignored unless `scaling > 0`.
    pub fn with_scaling(mut self, scaling: f64) -> Self {
        debug_assert!(scaling > 0.0, "scaling must be greater than zero");
        if scaling > 0.0 && scaling.is_finite() {
            self.scaling = scaling;
        }
        self
    }

    /// Ignored unless `factor > 0`.
    pub fn with_dpi_scale_factor(mut self, factor: f64) -> Self {
        debug_assert!(factor > 0.0, "DPI scale factor must be greater than zero");
        if factor > 0.0 && factor.is_finite() {
            self.dpi_scale_factor = Some(factor);
        }
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn scaling(&self) -> f64 {
        self.scaling
    }

    pub fn anchor_point(&self) -> Pt {
        self.anchor_point
    }
}
