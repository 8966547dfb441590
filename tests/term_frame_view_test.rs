use shock_factor::core::FrameGenerator;
use shock_factor::term::{
    encode_diff_into, encode_plain_into, AnchorY, FrameBuffer, FrameView, StatusView, Viewport,
    PLACEHOLDER, TITLE,
};
use shock_factor::types::{EffectEvent, RenderMode};

fn compact_frame() -> shock_factor::types::FramePayload {
    let mut gen = FrameGenerator::new(9).starting_at(12);
    gen.generate_frame(&EffectEvent::new("t", "t"), RenderMode::Pulse, false)
}

#[test]
fn frame_panel_has_title_border_and_rows() {
    let frame = compact_frame();
    let view = FrameView::default().with_anchor_y(AnchorY::Top);
    // 40x12 grid + border => 42x14; title above, status below => 16 rows.
    let fb = view.render(Some(&frame), None, Viewport::new(42, 16));

    assert_eq!(fb.row_text(0).trim_end(), TITLE);
    assert_eq!(fb.get(0, 1).unwrap().ch, '┌');
    assert_eq!(fb.get(41, 1).unwrap().ch, '┐');
    assert_eq!(fb.get(0, 14).unwrap().ch, '└');
    assert_eq!(fb.get(41, 14).unwrap().ch, '┘');

    for (r, line) in frame.ascii_lines.iter().enumerate() {
        let row: String = fb.row_text(2 + r as u16).chars().skip(1).take(40).collect();
        assert_eq!(&row, line, "row {r}");
    }
}

#[test]
fn placeholder_is_shown_before_the_first_frame() {
    let view = FrameView::default();
    let fb = view.render(None, None, Viewport::new(60, 20));
    let found = (0..fb.height()).any(|y| fb.row_text(y).contains(PLACEHOLDER));
    assert!(found);
}

#[test]
fn status_line_is_drawn_under_the_box() {
    let frame = compact_frame();
    let status = StatusView {
        schedule: "random",
        intensity: 0.8,
        paused: false,
        clients: None,
    };
    let view = FrameView::default().with_anchor_y(AnchorY::Top);
    let fb = view.render(Some(&frame), Some(&status), Viewport::new(80, 16));
    let line = fb.row_text(15);
    assert!(line.trim_start().starts_with("pulse | random | tick 12 | intensity 0.80 | tcp off"));
}

#[test]
fn small_viewport_clips_instead_of_panicking() {
    let mut gen = FrameGenerator::new(1);
    let frame = gen.generate_frame(&EffectEvent::default(), RenderMode::WordFire, true);
    let view = FrameView::default();
    let fb = view.render(Some(&frame), None, Viewport::new(30, 10));
    assert_eq!(fb.width(), 30);
    assert_eq!(fb.height(), 10);
}

#[test]
fn plain_encoding_writes_one_line_per_row() {
    let frame = compact_frame();
    let mut out = Vec::new();
    encode_plain_into(&frame, false, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert_eq!(text.lines().count(), 12);
    assert_eq!(text.lines().next().unwrap(), frame.ascii_lines[0]);
}

#[test]
fn diff_only_repaints_changed_cells() {
    let frame = compact_frame();
    let view = FrameView::default();
    let a = view.render(Some(&frame), None, Viewport::new(50, 18));
    let b = a.clone();
    let mut out = Vec::new();
    encode_diff_into(&a, &b, &mut out).unwrap();
    assert!(!String::from_utf8_lossy(&out).contains("Stage"));

    let blank = FrameBuffer::new(50, 18);
    let mut full = Vec::new();
    encode_diff_into(&blank, &a, &mut full).unwrap();
    assert!(String::from_utf8_lossy(&full).contains("Stage"));
}
