//! Property tests for the scaling arithmetic and geometry helpers.

use graphcanvas::items::info::GraphItemInfo;
use graphcanvas::items::polygon::{is_inside_polygon, rect_points};
use graphcanvas::math::{calculate_downscaled_size, safe_divide, scale_within};
use graphcanvas::{GraphItem, Point2D, Points2D, Pt, RecordingDc, Rect, Size};
use proptest::prelude::*;

proptest! {
    #[test]
    fn safe_divide_is_total(numerator in any::<f64>(), denominator in any::<f64>()) {
        let result = safe_divide(numerator, denominator);
        prop_assert!(!result.is_nan());
        if denominator <= 0.0 || !numerator.is_finite() || !denominator.is_finite() {
            prop_assert_eq!(result, 0.0);
        }
        if denominator >= 1.0 && numerator.is_finite() {
            prop_assert!(result.is_finite());
        }
    }

    #[test]
    fn downscaling_is_idempotent(
        w in 1.0f64..5000.0,
        h in 1.0f64..5000.0,
        bw in 1.0f64..5000.0,
        bh in 1.0f64..5000.0,
    ) {
        let bounds = Size::new(bw, bh);
        let once = calculate_downscaled_size(Size::new(w, h), bounds);
        prop_assert!(once.width <= bw && once.height <= bh, "{:?} exceeds {:?}", once, bounds);
        let twice = calculate_downscaled_size(once, bounds);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn scale_within_maps_endpoints(lo in -1e6f64..1e6, span in 1.0f64..1e6, a in -1e4f64..1e4, b in -1e4f64..1e4) {
        let range = (lo, lo + span);
        prop_assert!((scale_within(range.0, range, (a, b)) - a).abs() < 1e-6);
        prop_assert!((scale_within(range.1, range, (a, b)) - b).abs() < 1e-6);
    }

    #[test]
    fn rectangles_contain_their_interior(
        x in -500i32..500,
        y in -500i32..500,
        w in 3i32..400,
        h in 3i32..400,
        fx in 0.0f64..1.0,
        fy in 0.0f64..1.0,
    ) {
        let rect = Rect::new(x, y, w, h);
        let corners = rect_points(&rect);
        // strictly inside
        let px = x + 1 + ((w - 3) as f64 * fx) as i32;
        let py = y + 1 + ((h - 3) as f64 * fy) as i32;
        prop_assert!(is_inside_polygon(Pt::new(px, py), &corners));
        for corner in corners {
            prop_assert!(is_inside_polygon(corner, &corners));
        }
        prop_assert!(!is_inside_polygon(Pt::new(rect.right() + 5, py), &corners));
        prop_assert!(!is_inside_polygon(Pt::new(px, rect.bottom() + 5), &corners));
    }

    #[test]
    fn running_box_is_union_of_glyphs(
        coords in prop::collection::vec((0i32..1000, 0i32..1000), 1..20),
        radius in 1.0f64..10.0,
    ) {
        let dc = RecordingDc::new();
        let mut points = Points2D::new(GraphItemInfo::default());
        let mut expected = Rect::EMPTY;
        for (x, y) in coords {
            let point = Point2D::new(GraphItemInfo::default().with_anchor_point(Pt::new(x, y)), radius);
            expected = expected.union(&point.glyph_box());
            points.add_point(point, &dc);
        }
        prop_assert_eq!(points.bounding_box(&dc), expected);
    }
}
