//! Scaling arithmetic shared by every item and the canvas.
//!
//! Every helper here is total: degenerate input (zero or negative
//! denominators, NaN, infinities, negative sizes) yields `0` rather than
//! propagating `NaN`/`Inf` into pixel geometry.

use crate::types::Size;

/// Divide, returning `0` when the result would be undefined.
///
/// Zero or negative denominators and non-finite operands all map to `0`.
#[inline]
pub fn safe_divide(numerator: f64, denominator: f64) -> f64 {
    if !numerator.is_finite() || !denominator.is_finite() {
        return 0.0;
    }
    if numerator == 0.0 || denominator <= 0.0 {
        return 0.0;
    }
    numerator / denominator
}

#[inline]
pub fn degrees_to_radians(degrees: f64) -> f64 {
    degrees * std::f64::consts::PI / 180.0
}

#[inline]
pub fn radians_to_degrees(radians: f64) -> f64 {
    radians * 180.0 / std::f64::consts::PI
}

/// Rescale `value` from `data_range` into `new_range`.
pub fn scale_within(value: f64, data_range: (f64, f64), new_range: (f64, f64)) -> f64 {
    safe_divide(
        (new_range.1 - new_range.0) * (value - data_range.0),
        data_range.1 - data_range.0,
    ) + new_range.0
}

/// Height of `size` after resizing it to `new_width`, keeping its aspect ratio.
pub fn calculate_rescale_height(size: Size<f64>, new_width: f64) -> f64 {
    debug_assert!(
        size.width >= 0.0 && size.height >= 0.0 && new_width >= 0.0,
        "size value cannot be negative"
    );
    if size.width < 0.0 || size.height < 0.0 || new_width <= 0.0 {
        return 0.0;
    }
    size.height * safe_divide(new_width, size.width)
}

/// Width of `size` after resizing it to `new_height`, keeping its aspect ratio.
pub fn calculate_rescale_width(size: Size<f64>, new_height: f64) -> f64 {
    debug_assert!(
        size.width >= 0.0 && size.height >= 0.0 && new_height >= 0.0,
        "size value cannot be negative"
    );
    if size.width < 0.0 || size.height < 0.0 || new_height <= 0.0 {
        return 0.0;
    }
    size.width * safe_divide(new_height, size.height)
}

fn has_negative(size: Size<f64>, bounds: Size<f64>) -> bool {
    size.width < 0.0 || size.height < 0.0 || bounds.width < 0.0 || bounds.height < 0.0
}

/// Shrink `size` (aspect kept) until it fits in `bounds`.
///
/// A size that already fits is returned unchanged, so the result is a fixed
/// point of this function.
pub fn calculate_downscaled_size(size: Size<f64>, bounds: Size<f64>) -> Size<f64> {
    if has_negative(size, bounds) {
        return Size::new(0.0, 0.0);
    }
    let wider = size.width > bounds.width;
    let taller = size.height > bounds.height;
    match (wider, taller) {
        (false, false) => size,
        (false, true) => Size::new(calculate_rescale_width(size, bounds.height), bounds.height),
        (true, false) => Size::new(bounds.width, calculate_rescale_height(size, bounds.width)),
        (true, true) if size.width - bounds.width > size.height - bounds.height => {
            let adjusted = Size::new(bounds.width, calculate_rescale_height(size, bounds.width));
            calculate_downscaled_size(adjusted, bounds)
        }
        (true, true) => {
            let adjusted = Size::new(calculate_rescale_width(size, bounds.height), bounds.height);
            calculate_downscaled_size(adjusted, bounds)
        }
    }
}

/// Grow `size` (aspect kept) until one dimension reaches `bounds`.
pub fn calculate_upscaled_size(size: Size<f64>, bounds: Size<f64>) -> Size<f64> {
    if has_negative(size, bounds) {
        return Size::new(0.0, 0.0);
    }
    let narrower = size.width < bounds.width;
    let shorter = size.height < bounds.height;
    match (narrower, shorter) {
        (false, false) => size,
        (false, true) => Size::new(calculate_rescale_width(size, bounds.height), bounds.height),
        (true, false) => Size::new(bounds.width, calculate_rescale_height(size, bounds.width)),
        (true, true) if size.width - bounds.width < size.height - bounds.height => {
            let adjusted = Size::new(bounds.width, calculate_rescale_height(size, bounds.width));
            calculate_downscaled_size(adjusted, bounds)
        }
        (true, true) => {
            let adjusted = Size::new(calculate_rescale_width(size, bounds.height), bounds.height);
            calculate_downscaled_size(adjusted, bounds)
        }
    }
}
