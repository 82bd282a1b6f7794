//! SVG export of whole canvases.

use graphcanvas::items::info::GraphItemInfo;
use graphcanvas::{Canvas, ExportError, Label, Polygon, Pt, handle};

#[test]
fn free_floating_triangle() {
    let mut canvas = Canvas::new(700, 500);
    let triangle = Polygon::new(
        GraphItemInfo::default(),
        &[Pt::new(100, 100), Pt::new(200, 100), Pt::new(150, 50)],
    );
    canvas.add_free_floating_object(handle(triangle));

    insta::assert_snapshot!(canvas.to_svg(), @r#"
    <svg xmlns="http://www.w3.org/2000/svg" width="700" height="500" viewBox="0 0 700 500">
    <rect x="0" y="0" width="700" height="500" fill="rgb(255,255,255)" stroke="none"/>
    <polygon points="100,100 200,100 150,50" fill="rgb(255,255,255)" stroke="rgb(0,0,0)" stroke-width="1"/>
    </svg>
    "#);
}

#[test]
fn text_is_escaped() {
    let mut canvas = Canvas::new(700, 500);
    canvas.add_top_title(Label::with_text("Profit & <Loss>"));
    let svg = canvas.to_svg();
    assert!(svg.contains("Profit &amp; &lt;Loss&gt;"), "{svg}");
    assert!(!svg.contains("<Loss>"));
}

#[test]
fn watermark_is_rotated_across_the_page() {
    let mut canvas = Canvas::new(700, 500);
    canvas.set_watermark("DRAFT");
    let svg = canvas.to_svg();
    let text = svg
        .lines()
        .find(|line| line.contains(">DRAFT<"))
        .expect("watermark text");
    assert!(text.contains(r#"transform="rotate("#), "{text}");
    assert!(text.contains(r#"font-weight="bold""#), "{text}");
}

#[test]
fn save_svg_writes_the_document() {
    let path = std::env::temp_dir().join(format!("graphcanvas-export-{}.svg", std::process::id()));
    let mut canvas = Canvas::new(700, 500);
    canvas.save_svg(&path).unwrap();
    let written = std::fs::read_to_string(&path).unwrap();
    let _ = std::fs::remove_file(&path);
    assert!(written.starts_with("<svg"));
    assert!(written.trim_end().ends_with("</svg>"));
}

#[test]
fn save_svg_into_missing_directory_fails() {
    let path = std::env::temp_dir()
        .join("graphcanvas-no-such-dir")
        .join("nested")
        .join("out.svg");
    let mut canvas = Canvas::new(700, 500);
    let err = canvas.save_svg(&path).unwrap_err();
    let ExportError::Io { path: reported, .. } = err;
    assert_eq!(reported, path);
}
