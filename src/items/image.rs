//! Bitmap items and pixel-buffer helpers.

use std::cell::RefCell;
use std::path::Path;

use image::imageops::{self, FilterType};
use image::metadata::Orientation as ExifOrientation;
use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader, Rgba, RgbaImage};

use crate::context::RenderContext;
use crate::dc::{BrushChanger, Clipper, DrawSurface, PenChanger};
use crate::errors::ImageLoadError;
use crate::items::info::{
    GraphItemInfo, Orientation, PageHorizontalAlignment, PageVerticalAlignment, ShadowType,
};
use crate::items::polygon::rect_points;
use crate::items::{GraphItem, GraphItemBase};
use crate::log::{debug, warn};
use crate::math::{
    calculate_downscaled_size, calculate_rescale_height, calculate_rescale_width,
    calculate_upscaled_size, safe_divide,
};
use crate::types::{Brush, Color, Pen, PenStyle, Pt, Rect, Size};

/// How an image adapts to the box a canvas gives it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash)]
pub enum ResizeMethod {
    #[default]
    DownscaleOrUpscale,
    DownscaleOnly,
    UpscaleOnly,
    NoResize,
}

/// Whole-image filters
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageEffect {
    Grayscale,
    BlurHorizontal,
    BlurVertical,
    Sepia,
    FrostedGlass,
    OilPainting,
}

#[derive(Debug, Clone)]
pub struct Image {
    base: GraphItemBase,
    original: RgbaImage,
    /// Logical image size, in DIPs.
    size: Size<i32>,
    /// Box the image sits in; at least as large as `size`.
    frame_size: Size<i32>,
    opacity: u8,
    resize_method: ResizeMethod,
    /// Scaled copy of `original` matching the last drawn size.
    working: RefCell<Option<RgbaImage>>,
}

fn dimensions(image: &RgbaImage) -> Size<i32> {
    Size::new(image.width() as i32, image.height() as i32)
}

impl Image {
    pub fn new(image: RgbaImage) -> Self {
        Self::with_info(GraphItemInfo::default(), image)
    }

    pub fn with_info(info: GraphItemInfo, image: RgbaImage) -> Self {
        let size = dimensions(&image);
        Self {
            base: GraphItemBase::new(info),
            original: image,
            size,
            frame_size: size,
            opacity: u8::MAX,
            resize_method: ResizeMethod::default(),
            working: RefCell::new(None),
        }
    }

    /// Item for the image at `path`; an unreadable file gives an invalid item.
    pub fn from_file(info: GraphItemInfo, path: impl AsRef<Path>) -> Self {
        Self::with_info(info, Self::load_file(path))
    }

    pub fn with_resize_method(mut self, method: ResizeMethod) -> Self {
        self.resize_method = method;
        self
    }

    pub fn with_opacity(mut self, opacity: u8) -> Self {
        self.set_opacity(opacity);
        self
    }

    /// Whether there are pixels to draw.
    pub fn is_ok(&self) -> bool {
        self.base.is_ok() && self.original.width() > 0 && self.original.height() > 0
    }

    pub fn original(&self) -> &RgbaImage {
        &self.original
    }

    /// Replaces the pixels and resets both sizes to the new image's.
    pub fn set_image(&mut self, image: RgbaImage) {
        self.size = dimensions(&image);
        self.frame_size = self.size;
        self.original = image;
        self.working.replace(None);
        self.base.invalidate();
    }

    pub fn opacity(&self) -> u8 {
        self.opacity
    }

    pub fn set_opacity(&mut self, opacity: u8) {
        self.opacity = opacity;
        self.working.replace(None);
    }

    pub fn resize_method(&self) -> ResizeMethod {
        self.resize_method
    }

    pub fn set_resize_method(&mut self, method: ResizeMethod) {
        self.resize_method = method;
    }

    // ------------------------------------------------------------------
    // Sizing
    // ------------------------------------------------------------------

    pub fn image_size(&self) -> Size<i32> {
        self.size
    }

    pub fn frame_size(&self) -> Size<i32> {
        self.frame_size
    }

    fn original_size(&self) -> Size<f64> {
        dimensions(&self.original).to_f64()
    }

    fn set_sizes(&mut self, size: Size<i32>) {
        self.size = size;
        self.frame_size = size;
        self.base.invalidate();
    }

    /// Width in DIPs; the height follows the aspect ratio.
    pub fn set_width(&mut self, width: i32) {
        let height = calculate_rescale_height(self.original_size(), f64::from(width));
        self.set_sizes(Size::new(width, height.round() as i32));
    }

    /// Height in DIPs; the width follows the aspect ratio.
    pub fn set_height(&mut self, height: i32) {
        let width = calculate_rescale_width(self.original_size(), f64::from(height));
        self.set_sizes(Size::new(width.round() as i32, height));
    }

    /// Stretches to `size`, ignoring the aspect ratio.
    pub fn set_size(&mut self, size: Size<i32>) {
        self.set_sizes(size);
    }

    /// Fits the original into `suggested` per the resize method, rounding each
    /// dimension up to a whole pixel. Returns the new size.
    pub fn set_best_size(&mut self, suggested: Size<i32>) -> Size<i32> {
        let original = self.original_size();
        let bounds = suggested.to_f64();
        let best = match self.resize_method {
            ResizeMethod::DownscaleOrUpscale => {
                return self.apply_best(Self::to_best_size(dimensions(&self.original), suggested));
            }
            ResizeMethod::DownscaleOnly => calculate_downscaled_size(original, bounds),
            ResizeMethod::UpscaleOnly => calculate_upscaled_size(original, bounds),
            ResizeMethod::NoResize => original,
        };
        self.apply_best(best.ceil())
    }

    fn apply_best(&mut self, size: Size<i32>) -> Size<i32> {
        self.set_sizes(size);
        size
    }

    /// Upscales a size that fits inside `suggested`, downscales one that
    /// covers it, and leaves a size that is larger in one dimension only.
    pub fn to_best_size(original: Size<i32>, suggested: Size<i32>) -> Size<i32> {
        let (size, bounds) = (original.to_f64(), suggested.to_f64());
        if original.width <= suggested.width && original.height <= suggested.height {
            calculate_upscaled_size(size, bounds).ceil()
        } else if original.width >= suggested.width && original.height >= suggested.height {
            calculate_downscaled_size(size, bounds).ceil()
        } else {
            original
        }
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Best-effort load: any failure is logged and gives an empty image.
    pub fn load_file(path: impl AsRef<Path>) -> RgbaImage {
        match Self::try_load_file(path.as_ref()) {
            Ok(image) => image,
            Err(_err) => {
                warn!(error = %_err, "image could not be loaded");
                RgbaImage::new(0, 0)
            }
        }
    }

    pub fn try_load_file(path: impl AsRef<Path>) -> Result<RgbaImage, ImageLoadError> {
        let path = path.as_ref();
        let image = Self::load_with_correction(path)?.into_rgba8();
        if image.width() == 0 || image.height() == 0 {
            return Err(ImageLoadError::Empty {
                path: path.to_path_buf(),
            });
        }
        Ok(image)
    }

    /// Decodes `path`, turning JPEGs upright per their EXIF orientation.
    ///
    /// Only orientations 3, 6 and 8 rotate; mirrored orientations and
    /// unreadable EXIF data leave the pixels as stored.
    pub fn load_with_correction(path: &Path) -> Result<DynamicImage, ImageLoadError> {
        let io_error = |source| ImageLoadError::Io {
            path: path.to_path_buf(),
            source,
        };
        let decode_error = |source| ImageLoadError::Decode {
            path: path.to_path_buf(),
            source,
        };
        let reader = ImageReader::open(path)
            .map_err(io_error)?
            .with_guessed_format()
            .map_err(io_error)?;
        let is_jpeg = reader.format() == Some(ImageFormat::Jpeg);
        let mut decoder = reader.into_decoder().map_err(decode_error)?;
        let orientation = if is_jpeg {
            decoder.orientation().unwrap_or(ExifOrientation::NoTransforms)
        } else {
            ExifOrientation::NoTransforms
        };
        let image = DynamicImage::from_decoder(decoder).map_err(decode_error)?;
        debug!(?orientation, is_jpeg, "decoded image");
        Ok(match orientation {
            ExifOrientation::Rotate180 => image.rotate180(),
            ExifOrientation::Rotate90 => image.rotate90(),
            ExifOrientation::Rotate270 => image.rotate270(),
            _ => image,
        })
    }

    // ------------------------------------------------------------------
    // Drawing helpers
    // ------------------------------------------------------------------

    fn scaled_size(&self) -> Size<i32> {
        let scaling = self.base.scaling();
        Size::new(
            (f64::from(self.size.width) * scaling).round() as i32,
            (f64::from(self.size.height) * scaling).round() as i32,
        )
    }

    fn refresh_working_copy(&self) {
        let target = self.scaled_size();
        let mut working = self.working.borrow_mut();
        let stale = working
            .as_ref()
            .is_none_or(|img| dimensions(img) != target);
        if !stale || target.is_empty() {
            return;
        }
        let mut scaled = imageops::resize(
            &self.original,
            target.width as u32,
            target.height as u32,
            FilterType::Lanczos3,
        );
        if self.opacity < u8::MAX {
            set_opacity(&mut scaled, self.opacity, true);
        }
        *working = Some(scaled);
    }

    fn draw_shadow(&self, dc: &mut dyn DrawSurface, bbox: Rect) {
        let shadow = self.base.info().shadow;
        let offset = self.base.scale_to_screen_and_canvas(self.base.shadow_offset());
        if shadow == ShadowType::NoShadow
            || self.base.is_selected()
            || f64::from(bbox.height) <= offset
        {
            return;
        }
        let offset = offset.round() as i32;
        let color = self.base.shadow_color();
        let pen = Pen::new(color).with_width(self.base.scale_to_screen_and_canvas(1.0));
        let mut dc = PenChanger::new(dc, Some(pen));
        let mut dc = BrushChanger::new(&mut *dc, Some(Brush::solid(color)));
        let at = |pt: Pt, dx: i32, dy: i32| Pt::new(pt.x + dx, pt.y + dy);
        match shadow {
            ShadowType::RightSideAndBottomShadow => {
                let start = at(bbox.bottom_left(), offset, 0);
                dc.draw_polygon(&[
                    start,
                    at(bbox.bottom_left(), offset, offset),
                    at(bbox.bottom_right(), offset, offset),
                    at(bbox.top_right(), offset, offset),
                    at(bbox.top_right(), 0, offset),
                    bbox.bottom_right(),
                    start,
                ]);
            }
            ShadowType::RightSideShadow => dc.draw_polygon(&[
                at(bbox.bottom_right(), offset, 0),
                at(bbox.top_right(), offset, offset),
                at(bbox.top_right(), 0, offset),
                bbox.bottom_right(),
            ]),
            ShadowType::NoShadow => {}
        }
    }

    /// Top-left of the bitmap inside a frame larger than the image.
    fn image_origin(&self, bbox: Rect) -> Pt {
        let mut origin = bbox.top_left();
        if self.frame_size == self.size {
            return origin;
        }
        let drawn = self.scaled_size();
        let info = self.base.info();
        origin.x += match info.page_horizontal_alignment {
            PageHorizontalAlignment::LeftAligned => 0,
            PageHorizontalAlignment::Centered => (bbox.width - drawn.width) / 2,
            PageHorizontalAlignment::RightAligned => bbox.width - drawn.width,
        };
        origin.y += match info.page_vertical_alignment {
            PageVerticalAlignment::TopAligned => 0,
            PageVerticalAlignment::Centered => (bbox.height - drawn.height) / 2,
            PageVerticalAlignment::BottomAligned => bbox.height - drawn.height,
        };
        origin
    }

    fn draw_outline(&self, dc: &mut dyn DrawSurface, bbox: Rect) {
        let [tl, tr, br, bl] = rect_points(&bbox);
        let outline = [tl, tr, br, bl, tl];
        let pen = match self.base.scaled_pen() {
            Some(pen) if self.base.is_selected() => Pen::new(Color::BLACK)
                .with_width(pen.width * 2.0)
                .with_style(PenStyle::Dot),
            Some(pen) => pen,
            None if self.base.is_selected() => {
                Pen::new(Color::BLACK).with_width(2.0).with_style(PenStyle::Dot)
            }
            None => return,
        };
        let mut dc = PenChanger::new(dc, Some(pen));
        dc.draw_lines(&outline);
    }
}

impl GraphItem for Image {
    fn base(&self) -> &GraphItemBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut GraphItemBase {
        &mut self.base
    }

    fn draw(&self, dc: &mut dyn DrawSurface, _ctx: &RenderContext) -> Rect {
        if !self.base.is_shown() || !self.is_ok() {
            return Rect::EMPTY;
        }
        let bbox = self.bounding_box(&*dc);
        if self.base.is_in_drag_state() {
            return bbox;
        }

        let mut clipped;
        let dc: &mut dyn DrawSurface = match self.base.info().clipping_rect {
            Some(clip) => {
                clipped = Clipper::new(dc, clip);
                &mut *clipped
            }
            None => dc,
        };

        self.refresh_working_copy();
        self.draw_shadow(&mut *dc, bbox);
        if let Some(working) = self.working.borrow().as_ref() {
            dc.draw_bitmap(working, self.image_origin(bbox));
        }
        self.draw_outline(&mut *dc, bbox);
        bbox
    }

    fn bounding_box(&self, _dc: &dyn DrawSurface) -> Rect {
        if !self.is_ok() {
            return Rect::EMPTY;
        }
        self.base.cached_or(|| {
            let scaling = self.base.scaling();
            let size = Size::new(
                (f64::from(self.frame_size.width) * scaling).round() as i32,
                (f64::from(self.frame_size.height) * scaling).round() as i32,
            );
            let mut anchor = self.base.anchor_point();
            if self.base.is_free_floating() {
                anchor = Pt::new(
                    (f64::from(anchor.x) * scaling).round() as i32,
                    (f64::from(anchor.y) * scaling).round() as i32,
                );
            }
            self.base.anchoring().anchored_rect(anchor, size)
        })
    }

    /// Fits the image into `rect` per the resize method; the frame takes the
    /// whole rect.
    fn set_bounding_box(&mut self, rect: Rect, _dc: &dyn DrawSurface, _parent_scaling: f64) {
        debug_assert!(
            !self.base.is_free_floating(),
            "set_bounding_box() should only be called on fixed objects"
        );
        if self.base.is_free_floating() {
            return;
        }
        let anchor = self.base.anchoring().anchor_for(&rect);
        self.base.set_anchor_point(anchor);

        let original = self.original_size();
        let bounds = rect.size().to_f64();
        let fitted = match self.resize_method {
            ResizeMethod::DownscaleOrUpscale => {
                let by_height = Size::new(
                    calculate_rescale_width(original, bounds.height),
                    bounds.height,
                );
                if by_height.width > bounds.width {
                    Size::new(
                        bounds.width,
                        calculate_rescale_height(by_height, bounds.width),
                    )
                } else {
                    by_height
                }
            }
            ResizeMethod::DownscaleOnly => calculate_downscaled_size(original, bounds),
            ResizeMethod::UpscaleOnly => calculate_upscaled_size(original, bounds),
            ResizeMethod::NoResize => self.size.to_f64(),
        };
        let scaling = self.base.scaling();
        let unscale = |v: f64| safe_divide(v, scaling).round() as i32;
        self.size = Size::new(unscale(fitted.width), unscale(fitted.height));
        self.frame_size = Size::new(unscale(bounds.width), unscale(bounds.height));
        self.base.invalidate();
    }

    fn offset(&mut self, dx: i32, dy: i32) {
        let pt = self.base.anchor_point();
        self.base.set_anchor_point(Pt::new(pt.x + dx, pt.y + dy));
    }

    fn hit_test(&self, pt: Pt, dc: &dyn DrawSurface) -> bool {
        self.bounding_box(dc).contains(pt)
    }
}

// ============================================================================
// Pixel-buffer helpers
// ============================================================================

/// Sets every pixel's alpha to `opacity`, optionally leaving fully
/// transparent pixels alone.
pub fn set_opacity(image: &mut RgbaImage, opacity: u8, preserve_transparent: bool) {
    for px in image.pixels_mut() {
        if !(preserve_transparent && px[3] == 0) {
            px[3] = opacity;
        }
    }
}

/// Makes every pixel of `color` (alpha ignored) fully transparent.
pub fn set_color_transparent(image: &mut RgbaImage, color: Color) {
    let [r, g, b, _] = color.to_rgba_array();
    for px in image.pixels_mut() {
        if px[0] == r && px[1] == g && px[2] == b {
            px[3] = 0;
        }
    }
}

/// Copy with every `from` pixel recoloured to `to`; alpha is kept.
pub fn change_color(image: &RgbaImage, from: Color, to: Color) -> RgbaImage {
    let [fr, fg, fb, _] = from.to_rgba_array();
    let [tr, tg, tb, _] = to.to_rgba_array();
    let mut out = image.clone();
    for px in out.pixels_mut() {
        if px[0] == fr && px[1] == fg && px[2] == fb {
            px[0] = tr;
            px[1] = tg;
            px[2] = tb;
        }
    }
    out
}

/// Flat shape of the image's visible pixels: black when `opaque`, light grey
/// otherwise. Transparent pixels stay transparent.
pub fn create_silhouette(image: &RgbaImage, opaque: bool) -> RgbaImage {
    let [r, g, b, _] = if opaque {
        Color::BLACK
    } else {
        Color::LIGHT_GREY
    }
    .to_rgba_array();
    let mut out = image.clone();
    for px in out.pixels_mut() {
        if px[3] != 0 {
            *px = Rgba([r, g, b, u8::MAX]);
        }
    }
    out
}

/// Images side by side on white, vertically centred.
pub fn stitch_horizontally(images: &[RgbaImage]) -> RgbaImage {
    let width: u32 = images.iter().map(RgbaImage::width).sum();
    let height = images.iter().map(RgbaImage::height).max().unwrap_or(0);
    let mut out = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
    let mut x = 0i64;
    for img in images {
        let y = i64::from((height - img.height()) / 2);
        imageops::overlay(&mut out, img, x, y);
        x += i64::from(img.width());
    }
    out
}

/// Images stacked top to bottom on white, horizontally centred.
pub fn stitch_vertically(images: &[RgbaImage]) -> RgbaImage {
    let width = images.iter().map(RgbaImage::width).max().unwrap_or(0);
    let height: u32 = images.iter().map(RgbaImage::height).sum();
    let mut out = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
    let mut y = 0i64;
    for img in images {
        let x = i64::from((width - img.width()) / 2);
        imageops::overlay(&mut out, img, x, y);
        y += i64::from(img.height());
    }
    out
}

/// Scales `image` to cover `size` and crops the overflow evenly from both
/// sides. Images smaller than `size` give an empty image.
pub fn crop_image_to_size(image: &RgbaImage, size: Size<u32>) -> RgbaImage {
    if size.width == 0
        || size.height == 0
        || image.width() < size.width
        || image.height() < size.height
    {
        return RgbaImage::new(0, 0);
    }
    let original = Size::new(f64::from(image.width()), f64::from(image.height()));
    let height_ratio = safe_divide(original.height, f64::from(size.height));
    let width_ratio = safe_divide(original.width, f64::from(size.width));
    if height_ratio >= width_ratio {
        let height = calculate_rescale_height(original, f64::from(size.width)).round() as u32;
        let scaled = imageops::resize(image, size.width, height.max(size.height), FilterType::Lanczos3);
        let top = (scaled.height() - size.height) / 2;
        imageops::crop_imm(&scaled, 0, top, size.width, size.height).to_image()
    } else {
        let width = calculate_rescale_width(original, f64::from(size.height)).round() as u32;
        let scaled = imageops::resize(image, width.max(size.width), size.height, FilterType::Lanczos3);
        let left = (scaled.width() - size.width) / 2;
        imageops::crop_imm(&scaled, left, 0, size.width, size.height).to_image()
    }
}

/// Moves `color` toward black (below 100) or white (above 100).
fn change_lightness(color: Color, percent: u32) -> Color {
    let [r, g, b, a] = color.to_rgba_array();
    let percent = f64::from(percent.min(200));
    let (alpha, bg) = if percent >= 100.0 {
        ((200.0 - percent) / 100.0, 255.0)
    } else {
        (percent / 100.0, 0.0)
    };
    let blend = |c: u8| (f64::from(c) * alpha + bg * (1.0 - alpha)).round() as u8;
    Color::rgba(blend(r), blend(g), blend(b), a)
}

fn mix(from: Color, to: Color, t: f64) -> Rgba<u8> {
    let [fr, fg, fb, fa] = from.to_rgba_array();
    let [tr, tg, tb, ta] = to.to_rgba_array();
    let lerp = |a: u8, b: u8| (f64::from(a) + (f64::from(b) - f64::from(a)) * t).round() as u8;
    Rgba([lerp(fr, tr), lerp(fg, tg), lerp(fb, tb), lerp(fa, ta)])
}

fn fill_gradient(image: &mut RgbaImage, area: (u32, u32, u32, u32), from: Color, to: Color, vertical: bool) {
    let (x0, y0, w, h) = area;
    let steps = if vertical { h } else { w };
    for y in y0..(y0 + h).min(image.height()) {
        for x in x0..(x0 + w).min(image.width()) {
            let pos = if vertical { y - y0 } else { x - x0 };
            let t = safe_divide(f64::from(pos), f64::from(steps.saturating_sub(1)));
            image.put_pixel(x, y, mix(from, to, t));
        }
    }
}

/// A glossy fill: a gradient from `color` to a lighter shade with a brighter
/// band across the leading quarter.
pub fn create_glass_effect(size: Size<u32>, color: Color, direction: Orientation) -> RgbaImage {
    let mut out = RgbaImage::new(size.width, size.height);
    let vertical = direction == Orientation::Vertical;
    fill_gradient(
        &mut out,
        (0, 0, size.width, size.height),
        color,
        change_lightness(color, 140),
        vertical,
    );
    let band = if vertical {
        (0, 0, size.width, (f64::from(size.height) * 0.25) as u32)
    } else {
        (0, 0, (f64::from(size.width) * 0.25) as u32, size.height)
    };
    fill_gradient(
        &mut out,
        band,
        change_lightness(color, 115),
        change_lightness(color, 155),
        vertical,
    );
    out
}

/// Repeats `stipple` along a transparent strip of `size`, optionally with a
/// light silhouette offset by `shadow_size` behind each copy. Horizontal
/// strips run left to right; vertical ones stack up from the bottom.
pub fn create_stippled_image(
    stipple: &RgbaImage,
    size: Size<u32>,
    direction: Orientation,
    include_shadow: bool,
    shadow_size: u32,
) -> RgbaImage {
    if stipple.width() == 0 || stipple.height() == 0 || size.width < 4 || size.height < 4 {
        return RgbaImage::new(0, 0);
    }
    let mut out = RgbaImage::new(size.width, size.height);
    let stipple_size = Size::new(f64::from(stipple.width()), f64::from(stipple.height()));
    let shadow = if include_shadow { shadow_size } else { 0 };

    if direction == Orientation::Horizontal {
        let canvas = Size::new(size.width, size.height.saturating_sub(shadow));
        let mut fitted = calculate_downscaled_size(stipple_size, canvas.to_f64());
        if fitted.height < f64::from(canvas.height) && stipple.height() >= canvas.height {
            fitted = Size::new(
                calculate_rescale_width(stipple_size, f64::from(canvas.height)),
                f64::from(canvas.height),
            );
        }
        let (w, h) = (fitted.width.max(1.0) as u32, fitted.height.max(1.0) as u32);
        let scaled = imageops::resize(stipple, w, h, FilterType::Lanczos3);
        let silhouette = create_silhouette(&scaled, false);
        let y = i64::from(canvas.height.saturating_sub(h) / 2);
        let mut x = 0i64;
        while x < i64::from(canvas.width) {
            if include_shadow {
                imageops::overlay(&mut out, &silhouette, x, y + i64::from(shadow));
            }
            imageops::overlay(&mut out, &scaled, x, y);
            x += i64::from(w) + 1;
        }
    } else {
        let canvas = Size::new(size.width.saturating_sub(shadow), size.height);
        let mut fitted = calculate_downscaled_size(stipple_size, canvas.to_f64());
        if fitted.width < f64::from(canvas.width) && stipple.width() >= canvas.width {
            fitted = Size::new(
                f64::from(canvas.width),
                calculate_rescale_height(stipple_size, f64::from(canvas.width)),
            );
        }
        let (w, h) = (fitted.width.max(1.0) as u32, fitted.height.max(1.0) as u32);
        let scaled = imageops::resize(stipple, w, h, FilterType::Lanczos3);
        let silhouette = create_silhouette(&scaled, false);
        let x = i64::from(canvas.width.saturating_sub(w) / 2);
        let mut bottom = i64::from(canvas.height);
        while bottom > 0 {
            let y = bottom - i64::from(h) + 1;
            if include_shadow {
                imageops::overlay(&mut out, &silhouette, x + i64::from(shadow), y);
            }
            imageops::overlay(&mut out, &scaled, x, y);
            bottom -= i64::from(h) + 1;
        }
    }
    out
}

// ============================================================================
// Effects
// ============================================================================

const BLUR_RADIUS: i64 = 3;
const FROST_RADIUS: i64 = 3;
const OIL_RADIUS: i64 = 2;
const OIL_LEVELS: usize = 20;

/// Filtered copy of `image`.
pub fn apply_effect(image: &RgbaImage, effect: ImageEffect) -> RgbaImage {
    match effect {
        ImageEffect::Grayscale => {
            DynamicImage::ImageLumaA8(imageops::grayscale_alpha(image)).into_rgba8()
        }
        ImageEffect::BlurHorizontal => box_blur(image, true),
        ImageEffect::BlurVertical => box_blur(image, false),
        ImageEffect::Sepia => sepia(image),
        ImageEffect::FrostedGlass => frosted_glass(image),
        ImageEffect::OilPainting => oil_painting(image),
    }
}

fn clamped(image: &RgbaImage, x: i64, y: i64) -> Rgba<u8> {
    let x = x.clamp(0, i64::from(image.width()) - 1) as u32;
    let y = y.clamp(0, i64::from(image.height()) - 1) as u32;
    *image.get_pixel(x, y)
}

fn box_blur(image: &RgbaImage, horizontal: bool) -> RgbaImage {
    let taps = (2 * BLUR_RADIUS + 1) as u32;
    RgbaImage::from_fn(image.width(), image.height(), |x, y| {
        let mut sum = [0u32; 4];
        for d in -BLUR_RADIUS..=BLUR_RADIUS {
            let (sx, sy) = if horizontal {
                (i64::from(x) + d, i64::from(y))
            } else {
                (i64::from(x), i64::from(y) + d)
            };
            let px = clamped(image, sx, sy);
            for (acc, c) in sum.iter_mut().zip(px.0) {
                *acc += u32::from(c);
            }
        }
        Rgba(sum.map(|c| (c / taps) as u8))
    })
}

fn sepia(image: &RgbaImage) -> RgbaImage {
    let mut out = image.clone();
    for px in out.pixels_mut() {
        let [r, g, b, a] = px.0.map(f64::from);
        let tone = |cr: f64, cg: f64, cb: f64| (r * cr + g * cg + b * cb).min(255.0) as u8;
        *px = Rgba([
            tone(0.393, 0.769, 0.189),
            tone(0.349, 0.686, 0.168),
            tone(0.272, 0.534, 0.131),
            a as u8,
        ]);
    }
    out
}

/// Deterministic per-pixel jitter so repeated renders match.
fn frosted_glass(image: &RgbaImage) -> RgbaImage {
    let span = (2 * FROST_RADIUS + 1) as u64;
    RgbaImage::from_fn(image.width(), image.height(), |x, y| {
        let seed = u64::from(x).wrapping_mul(73_856_093) ^ u64::from(y).wrapping_mul(19_349_663);
        let hash = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        let dx = ((hash >> 16) % span) as i64 - FROST_RADIUS;
        let dy = ((hash >> 40) % span) as i64 - FROST_RADIUS;
        clamped(image, i64::from(x) + dx, i64::from(y) + dy)
    })
}

/// Each pixel takes the average colour of the most common intensity bucket
/// in its neighbourhood.
fn oil_painting(image: &RgbaImage) -> RgbaImage {
    RgbaImage::from_fn(image.width(), image.height(), |x, y| {
        let mut counts = [0u32; OIL_LEVELS];
        let mut sums = [[0u32; 3]; OIL_LEVELS];
        for dy in -OIL_RADIUS..=OIL_RADIUS {
            for dx in -OIL_RADIUS..=OIL_RADIUS {
                let px = clamped(image, i64::from(x) + dx, i64::from(y) + dy);
                let intensity = (u32::from(px[0]) + u32::from(px[1]) + u32::from(px[2])) / 3;
                let bucket = (intensity as usize * (OIL_LEVELS - 1)) / 255;
                counts[bucket] += 1;
                for c in 0..3 {
                    sums[bucket][c] += u32::from(px[c]);
                }
            }
        }
        let (bucket, count) = counts
            .iter()
            .enumerate()
            .max_by_key(|(_, c)| **c)
            .map_or((0, 1), |(b, c)| (b, (*c).max(1)));
        let alpha = image.get_pixel(x, y)[3];
        Rgba([
            (sums[bucket][0] / count) as u8,
            (sums[bucket][1] / count) as u8,
            (sums[bucket][2] / count) as u8,
            alpha,
        ])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dc::{DrawCommand, RecordingDc};
    use crate::items::info::Anchoring;

    fn solid(w: u32, h: u32, rgba: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba(rgba))
    }

    #[test]
    fn empty_image_is_invalid() {
        let dc = RecordingDc::new();
        let img = Image::new(RgbaImage::new(0, 0));
        assert!(!img.is_ok());
        assert!(img.bounding_box(&dc).is_empty());
    }

    #[test]
    fn width_and_height_keep_aspect() {
        let mut img = Image::new(solid(200, 100, [0, 0, 0, 255]));
        img.set_width(50);
        assert_eq!(img.image_size(), Size::new(50, 25));
        img.set_height(60);
        assert_eq!(img.image_size(), Size::new(120, 60));
        assert_eq!(img.frame_size(), img.image_size());
    }

    #[test]
    fn best_size_downscales_and_upscales() {
        let mut img = Image::new(solid(200, 100, [0, 0, 0, 255]));
        assert_eq!(img.set_best_size(Size::new(50, 50)), Size::new(50, 25));
        assert_eq!(img.set_best_size(Size::new(400, 400)), Size::new(400, 200));
        assert_eq!(
            Image::to_best_size(Size::new(200, 100), Size::new(300, 50)),
            Size::new(200, 100)
        );
        let mut img = img.with_resize_method(ResizeMethod::DownscaleOnly);
        assert_eq!(img.set_best_size(Size::new(400, 400)), Size::new(200, 100));
    }

    #[test]
    fn set_bounding_box_fits_height_then_width() {
        let dc = RecordingDc::new();
        let mut img = Image::with_info(
            GraphItemInfo::default().with_anchoring(Anchoring::TopLeftCorner),
            solid(200, 100, [0, 0, 0, 255]),
        );
        img.set_bounding_box(Rect::new(10, 10, 100, 100), &dc, 1.0);
        assert_eq!(img.image_size(), Size::new(100, 50));
        assert_eq!(img.frame_size(), Size::new(100, 100));
        assert_eq!(img.bounding_box(&dc), Rect::new(10, 10, 100, 100));

        img.set_bounding_box(Rect::new(0, 0, 400, 40), &dc, 1.0);
        assert_eq!(img.image_size(), Size::new(80, 40));
    }

    #[test]
    fn scaling_divides_back_into_dips() {
        let dc = RecordingDc::new();
        let mut img = Image::with_info(
            GraphItemInfo::default()
                .with_anchoring(Anchoring::TopLeftCorner)
                .with_scaling(2.0),
            solid(100, 100, [0, 0, 0, 255]),
        );
        img.set_bounding_box(Rect::new(0, 0, 80, 80), &dc, 2.0);
        assert_eq!(img.image_size(), Size::new(40, 40));
        assert_eq!(img.bounding_box(&dc), Rect::new(0, 0, 80, 80));
    }

    #[test]
    fn draw_centres_image_in_frame_with_outline() {
        let mut dc = RecordingDc::new();
        let mut img = Image::with_info(
            GraphItemInfo::default()
                .with_anchoring(Anchoring::TopLeftCorner)
                .with_page_horizontal_alignment(PageHorizontalAlignment::Centered),
            solid(20, 20, [255, 0, 0, 255]),
        );
        img.set_bounding_box(Rect::new(0, 0, 60, 20), &dc, 1.0);
        img.draw(&mut dc, &RenderContext::default());
        let bitmap = dc.commands().iter().find_map(|c| match c {
            DrawCommand::Bitmap { at, width, height } => Some((*at, *width, *height)),
            _ => None,
        });
        assert_eq!(bitmap, Some((Pt::new(20, 0), 20, 20)));
        let outline = dc.commands().iter().find_map(|c| match c {
            DrawCommand::Lines { points, .. } => Some(points.len()),
            _ => None,
        });
        assert_eq!(outline, Some(5));
    }

    #[test]
    fn shadow_polygons_have_seven_or_four_points() {
        for (shadow, expected) in [
            (ShadowType::RightSideAndBottomShadow, 7),
            (ShadowType::RightSideShadow, 4),
        ] {
            let mut dc = RecordingDc::new();
            let img = Image::with_info(
                GraphItemInfo::default().with_shadow(shadow),
                solid(20, 20, [0, 0, 255, 255]),
            );
            img.draw(&mut dc, &RenderContext::default());
            let points = dc.commands().iter().find_map(|c| match c {
                DrawCommand::Polygon { points, .. } => Some(points.len()),
                _ => None,
            });
            assert_eq!(points, Some(expected));
        }
    }

    #[test]
    fn opacity_preserves_transparent_pixels() {
        let mut img = solid(2, 1, [10, 20, 30, 255]);
        img.put_pixel(1, 0, Rgba([0, 0, 0, 0]));
        set_opacity(&mut img, 128, true);
        assert_eq!(img.get_pixel(0, 0)[3], 128);
        assert_eq!(img.get_pixel(1, 0)[3], 0);
        set_opacity(&mut img, 64, false);
        assert_eq!(img.get_pixel(1, 0)[3], 64);
    }

    #[test]
    fn colour_swaps_and_transparency() {
        let mut img = solid(2, 2, [255, 0, 0, 255]);
        img.put_pixel(0, 0, Rgba([0, 0, 255, 255]));
        let swapped = change_color(&img, Color::RED, Color::GREEN);
        assert_eq!(swapped.get_pixel(1, 1).0, [0, 128, 0, 255]);
        assert_eq!(swapped.get_pixel(0, 0).0, [0, 0, 255, 255]);

        set_color_transparent(&mut img, Color::BLUE);
        assert_eq!(img.get_pixel(0, 0)[3], 0);
        assert_eq!(img.get_pixel(1, 0)[3], 255);
    }

    #[test]
    fn silhouette_keeps_transparency() {
        let mut img = solid(2, 1, [200, 100, 50, 255]);
        img.put_pixel(1, 0, Rgba([0, 0, 0, 0]));
        let shape = create_silhouette(&img, true);
        assert_eq!(shape.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(shape.get_pixel(1, 0)[3], 0);
        let light = create_silhouette(&img, false);
        assert_eq!(light.get_pixel(0, 0).0, [211, 211, 211, 255]);
    }

    #[test]
    fn stitching_centres_smaller_images() {
        let a = solid(4, 4, [255, 0, 0, 255]);
        let b = solid(2, 2, [0, 0, 255, 255]);
        let row = stitch_horizontally(&[a.clone(), b.clone()]);
        assert_eq!(row.dimensions(), (6, 4));
        assert_eq!(row.get_pixel(4, 0).0, [255, 255, 255, 255]);
        assert_eq!(row.get_pixel(4, 1).0, [0, 0, 255, 255]);

        let column = stitch_vertically(&[a, b]);
        assert_eq!(column.dimensions(), (4, 6));
        assert_eq!(column.get_pixel(1, 4).0, [0, 0, 255, 255]);
        assert_eq!(stitch_vertically(&[]).dimensions(), (0, 0));
    }

    #[test]
    fn crop_covers_target() {
        let img = solid(200, 100, [9, 9, 9, 255]);
        assert_eq!(crop_image_to_size(&img, Size::new(50, 50)).dimensions(), (50, 50));
        assert_eq!(crop_image_to_size(&img, Size::new(300, 50)).dimensions(), (0, 0));
    }

    #[test]
    fn effects_keep_dimensions_and_alpha() {
        let mut img = solid(6, 4, [120, 60, 30, 200]);
        img.put_pixel(0, 0, Rgba([250, 250, 250, 200]));
        for effect in [
            ImageEffect::Grayscale,
            ImageEffect::BlurHorizontal,
            ImageEffect::BlurVertical,
            ImageEffect::Sepia,
            ImageEffect::FrostedGlass,
            ImageEffect::OilPainting,
        ] {
            let out = apply_effect(&img, effect);
            assert_eq!(out.dimensions(), img.dimensions(), "{effect:?}");
            assert_eq!(out.get_pixel(3, 2)[3], 200, "{effect:?}");
        }
        let gray = apply_effect(&img, ImageEffect::Grayscale);
        let px = gray.get_pixel(2, 2);
        assert!(px[0] == px[1] && px[1] == px[2]);
        assert_eq!(
            apply_effect(&img, ImageEffect::FrostedGlass),
            apply_effect(&img, ImageEffect::FrostedGlass)
        );
    }

    #[test]
    fn glass_and_stipple_fill_requested_size() {
        let glass = create_glass_effect(Size::new(10, 20), Color::BLUE, Orientation::Vertical);
        assert_eq!(glass.dimensions(), (10, 20));
        assert_ne!(glass.get_pixel(5, 0), glass.get_pixel(5, 19));

        let stipple = solid(4, 4, [0, 128, 0, 255]);
        let strip = create_stippled_image(&stipple, Size::new(20, 6), Orientation::Horizontal, true, 2);
        assert_eq!(strip.dimensions(), (20, 6));
        assert_eq!(strip.get_pixel(0, 0).0, [0, 128, 0, 255]);
        assert!(create_stippled_image(&stipple, Size::new(3, 3), Orientation::Vertical, false, 0)
            .dimensions()
            == (0, 0));
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let img = Image::load_file("/nonexistent/graphcanvas/missing.png");
        assert_eq!(img.dimensions(), (0, 0));
        assert!(matches!(
            Image::try_load_file("/nonexistent/graphcanvas/missing.png"),
            Err(ImageLoadError::Io { .. })
        ));
    }
}
