//! Rendering context: the explicit draw-time settings every item receives.

use crate::defaults;

/// Diagnostic drawing switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebugFlags {
    /// Outline bounding boxes of selected items (spacers become selectable).
    pub draw_bounding_boxes_on_selection: bool,
    /// Annotate selected items with scaling and geometry details.
    pub draw_extra_information: bool,
}

impl DebugFlags {
    pub fn all() -> Self {
        Self {
            draw_bounding_boxes_on_selection: true,
            draw_extra_information: true,
        }
    }
}

/// Settings passed to every `draw` call
#[derive(Debug, Clone, PartialEq)]
pub struct RenderContext {
    pub debug: DebugFlags,
    /// Radius of rounded box corners, in DIPs.
    pub rounded_corner_radius: f64,
    /// Alpha applied to translucent fills such as the watermark logo.
    pub translucency: u8,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self {
            debug: DebugFlags::default(),
            rounded_corner_radius: defaults::ROUNDED_CORNER_RADIUS,
            translucency: defaults::TRANSLUCENCY,
        }
    }
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_debug(mut self, debug: DebugFlags) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_rounded_corner_radius(mut self, radius: f64) -> Self {
        self.rounded_corner_radius = radius;
        self
    }

    pub fn with_translucency(mut self, alpha: u8) -> Self {
        self.translucency = alpha;
        self
    }

    #[inline]
    pub fn draw_debug_boxes(&self) -> bool {
        self.debug.draw_bounding_boxes_on_selection
    }
}
