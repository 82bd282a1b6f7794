//! Canvas layout scenarios driven through the public API.
//!
//! Run with logging: RUST_LOG=graphcanvas=trace cargo test --features tracing -- --nocapture

use graphcanvas::items::info::GraphItemInfo;
use graphcanvas::{
    Canvas, CandlestickPlot, Dataset, GraphItem, Graph2D, Label, RecordingDc, Rect, Spacer,
    handle,
};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn describe(rect: Rect) -> String {
    format!("{},{} {}x{}", rect.x, rect.y, rect.width, rect.height)
}

fn grid_of_spacers(rows: usize, columns: usize) -> Canvas {
    let mut canvas = Canvas::new(700, 500);
    canvas.set_fixed_objects_grid_size(rows, columns);
    for row in 0..rows {
        for column in 0..columns {
            let spacer = Spacer::new(
                GraphItemInfo::default().with_canvas_width_proportion(1.0 / columns as f64),
            );
            canvas.set_fixed_object(row, column, handle(spacer));
        }
    }
    canvas
}

fn cell_boxes(canvas: &Canvas, dc: &RecordingDc) -> String {
    canvas
        .fixed_objects()
        .iter()
        .flatten()
        .flatten()
        .map(|item| describe(item.borrow().bounding_box(dc)))
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn two_by_two_grid_splits_evenly() {
    init_tracing();
    let dc = RecordingDc::new();
    let mut canvas = grid_of_spacers(2, 2);
    canvas.calc_all_sizes(&dc);

    insta::assert_snapshot!(cell_boxes(&canvas, &dc), @r"
    0,0 350x250
    350,0 350x250
    0,250 350x250
    350,250 350x250
    ");
}

#[test]
fn row_proportions_drive_row_heights() {
    let dc = RecordingDc::new();
    let mut canvas = grid_of_spacers(2, 1);
    canvas.set_row_proportion(0, 0.2);
    canvas.set_row_proportion(1, 0.8);
    canvas.calc_all_sizes(&dc);

    insta::assert_snapshot!(cell_boxes(&canvas, &dc), @r"
    0,0 700x100
    0,100 700x400
    ");
}

#[test]
fn canvas_never_shrinks_below_its_minimum() {
    let dc = RecordingDc::new();
    let mut canvas = grid_of_spacers(1, 1);
    canvas.set_client_size(graphcanvas::Size::new(300, 200), &dc);
    canvas.calc_all_sizes(&dc);
    assert_eq!(canvas.canvas_rect().width, 700);
    assert_eq!(canvas.canvas_rect().height, 500);
    assert_eq!(canvas.scaling(), 1.0);
}

#[test]
fn larger_client_scales_items() {
    let dc = RecordingDc::new();
    let mut canvas = grid_of_spacers(1, 1);
    canvas.set_client_size(graphcanvas::Size::new(1400, 1000), &dc);
    canvas.calc_all_sizes(&dc);
    assert_eq!(canvas.scaling(), 2.0);
    let cell = canvas.fixed_object(0, 0).unwrap();
    assert_eq!(cell.borrow().bounding_box(&dc), Rect::new(0, 0, 1400, 1000));
}

#[test]
fn top_title_sits_above_the_grid() {
    let dc = RecordingDc::new();
    let mut canvas = grid_of_spacers(1, 1);
    canvas.add_top_title(Label::with_text("Quarterly results"));
    canvas.calc_all_sizes(&dc);

    let title = canvas.titles()[0].bounding_box(&dc);
    let cell = canvas.fixed_object(0, 0).unwrap().borrow().bounding_box(&dc);
    assert_eq!(title.top(), 0);
    assert!(title.bottom() < cell.top());
    assert_eq!(cell.bottom(), 499);
    // centred horizontally
    assert!((title.center().x - 350).abs() <= 1);
}

#[test]
fn zoom_round_trip_restores_the_client_size() {
    let dc = RecordingDc::new();
    let mut canvas = grid_of_spacers(1, 1);
    canvas.set_client_size(graphcanvas::Size::new(700, 500), &dc);
    canvas.zoom_in(&dc);
    canvas.zoom_in(&dc);
    assert_eq!(canvas.zoom_level(), 2);
    assert!(canvas.canvas_rect().width > 700);

    canvas.zoom_reset(&dc);
    assert_eq!(canvas.zoom_level(), 0);
    assert_eq!(canvas.canvas_rect().width, 700);
    assert_eq!(canvas.canvas_rect().height, 500);
}

#[test]
fn clicking_a_label_selects_it() {
    let dc = RecordingDc::new();
    let mut canvas = Canvas::new(700, 500);
    canvas.set_fixed_objects_grid_size(1, 1);
    canvas.set_fixed_object(0, 0, handle(Label::with_text("Click me")));
    canvas.calc_all_sizes(&dc);

    let center = canvas
        .fixed_object(0, 0)
        .unwrap()
        .borrow()
        .bounding_box(&dc)
        .center();
    assert!(canvas.select_object_at_point(center, &dc));
    assert!(canvas.fixed_object(0, 0).unwrap().borrow().is_selected());

    canvas.clear_selections();
    assert!(!canvas.fixed_object(0, 0).unwrap().borrow().is_selected());
}

#[test]
fn candlestick_graph_rebuilds_on_layout() {
    let day = |d| chrono::NaiveDate::from_ymd_opt(2024, 3, d);
    let data = Dataset::new()
        .with_date_column("Date", vec![day(4), day(5), day(6)])
        .and_then(|d| d.with_continuous_column("Open", vec![10.0, 12.0, 11.0]))
        .and_then(|d| d.with_continuous_column("High", vec![13.0, 14.0, 12.5]))
        .and_then(|d| d.with_continuous_column("Low", vec![9.0, 11.0, 10.0]))
        .and_then(|d| d.with_continuous_column("Close", vec![12.0, 11.5, 12.0]))
        .unwrap();
    let mut plot = CandlestickPlot::new();
    plot.set_data(&data, "Date", "Open", "High", "Low", "Close")
        .unwrap();

    let dc = RecordingDc::new();
    let mut canvas = Canvas::new(700, 500);
    canvas.set_fixed_objects_grid_size(1, 1);
    canvas.set_fixed_object(
        0,
        0,
        handle(Graph2D::candlestick(GraphItemInfo::default(), plot)),
    );
    canvas.calc_all_sizes(&dc);

    let cell = canvas.fixed_object(0, 0).unwrap();
    let cell = cell.borrow();
    let graph = cell.as_graph().unwrap();
    // wick and body for each of the three days
    assert_eq!(graph.children().len(), 6);
    let area = graph.plot_area();
    for child in graph.children() {
        let bbox = child.bounding_box(&dc);
        assert!(area.contains(bbox.top_left()), "{bbox:?} outside {area:?}");
    }
}

#[test]
fn drawing_keeps_the_dpi_used_for_layout() {
    let mut canvas = grid_of_spacers(1, 1);
    canvas.set_dpi_scale_factor(2.0);
    canvas.calc_all_sizes(&RecordingDc::new());
    let laid_out = canvas.fixed_object(0, 0).unwrap().borrow().bounding_box(&RecordingDc::new());

    // the surface reports 1.0; layout geometry must not change under it
    let mut dc = RecordingDc::new();
    canvas.draw(&mut dc);
    assert_eq!(canvas.dpi_scale_factor(), 2.0);
    let cell = canvas.fixed_object(0, 0).unwrap();
    assert_eq!(cell.borrow().base().dpi_scale_factor(), 2.0);
    assert_eq!(cell.borrow().bounding_box(&dc), laid_out);
}
