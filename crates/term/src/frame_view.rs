//! FrameView: maps a `FramePayload` into a terminal framebuffer.
//!
//! This module is pure (no I/O). It can be unit-tested.

use crate::fb::{CellStyle, FrameBuffer, Rgb};
use crate::types::{FramePayload, GridSize};

pub const TITLE: &str = "Stage FX: Shock Factor";
pub const PLACEHOLDER: &str = "Activating...";

/// Terminal viewport dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u16,
    pub height: u16,
}

impl Viewport {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorY {
    Center,
    Top,
}

/// Driver state shown under the frame.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusView<'a> {
    pub schedule: &'a str,
    pub intensity: f64,
    pub paused: bool,
    /// Adapter client count, `None` when the adapter is off.
    pub clients: Option<usize>,
}

impl StatusView<'_> {
    fn line(&self, frame: Option<&FramePayload>) -> String {
        let mut s = match frame {
            Some(f) => format!(
                "{} | {} | tick {} | intensity {:.2}",
                f.meta.mode, self.schedule, f.meta.tick, self.intensity
            ),
            None => format!("{} | intensity {:.2}", self.schedule, self.intensity),
        };
        match self.clients {
            Some(n) => s.push_str(&format!(" | tcp {}", n)),
            None => s.push_str(" | tcp off"),
        }
        if self.paused {
            s.push_str(" | PAUSED");
        }
        s
    }
}

/// Draws the titled, bordered frame panel.
pub struct FrameView {
    anchor_y: AnchorY,
    title: CellStyle,
    border: CellStyle,
    glyph: CellStyle,
    status: CellStyle,
}

impl Default for FrameView {
    fn default() -> Self {
        Self {
            anchor_y: AnchorY::Center,
            title: CellStyle::fg(Rgb::new(216, 180, 254)).bold(),
            border: CellStyle::fg(Rgb::new(168, 85, 247)),
            glyph: CellStyle::fg(Rgb::new(74, 222, 128)),
            status: CellStyle::fg(Rgb::new(160, 160, 170)).dim(),
        }
    }
}

impl FrameView {
    pub fn with_anchor_y(mut self, anchor_y: AnchorY) -> Self {
        self.anchor_y = anchor_y;
        self
    }

    /// Render into an existing framebuffer, resizing it to the viewport.
    ///
    /// Frames wider or taller than the viewport are clipped.
    pub fn render_into(
        &self,
        frame: Option<&FramePayload>,
        status: Option<&StatusView<'_>>,
        viewport: Viewport,
        fb: &mut FrameBuffer,
    ) {
        fb.resize(viewport.width, viewport.height);
        fb.clear(CellStyle::default().into_cell(' '));

        let (cols, rows) = match frame {
            Some(f) => (f.cols(), f.rows()),
            None => (GridSize::COMPACT.cols, GridSize::COMPACT.rows),
        };
        let inner_w = clamp_u16(cols);
        let inner_h = clamp_u16(rows);
        let box_w = inner_w.saturating_add(2);
        let box_h = inner_h.saturating_add(2);
        // Title above, status below.
        let panel_h = box_h.saturating_add(2);

        let start_x = viewport.width.saturating_sub(box_w) / 2;
        let start_y = match self.anchor_y {
            AnchorY::Center => viewport.height.saturating_sub(panel_h) / 2,
            AnchorY::Top => 0,
        };
        let box_y = start_y.saturating_add(1);
        let inner_x = start_x.saturating_add(1);
        let inner_y = box_y.saturating_add(1);
        let inner_end = inner_x.saturating_add(inner_w);

        fb.put_str(start_x, start_y, TITLE, self.title);
        draw_border(fb, start_x, box_y, box_w, box_h, self.border);

        match frame {
            Some(f) => {
                for (r, line) in f.ascii_lines.iter().enumerate() {
                    let y = inner_y.saturating_add(clamp_u16(r));
                    if y >= viewport.height {
                        break;
                    }
                    fb.put_str_clipped(inner_x, y, line, inner_end, self.glyph);
                }
            }
            None => {
                let text_w = PLACEHOLDER.chars().count() as u16;
                let x = inner_x.saturating_add(inner_w.saturating_sub(text_w) / 2);
                let y = inner_y.saturating_add(inner_h / 2);
                fb.put_str(x, y, PLACEHOLDER, self.glyph);
            }
        }

        if let Some(status) = status {
            let y = box_y.saturating_add(box_h);
            fb.put_str(start_x, y, &status.line(frame), self.status);
        }
    }

    /// Convenience helper that allocates a new framebuffer.
    pub fn render(
        &self,
        frame: Option<&FramePayload>,
        status: Option<&StatusView<'_>>,
        viewport: Viewport,
    ) -> FrameBuffer {
        let mut fb = FrameBuffer::new(viewport.width, viewport.height);
        self.render_into(frame, status, viewport, &mut fb);
        fb
    }
}

fn clamp_u16(v: usize) -> u16 {
    v.min(u16::MAX as usize) as u16
}

fn draw_border(fb: &mut FrameBuffer, x: u16, y: u16, w: u16, h: u16, style: CellStyle) {
    if w < 2 || h < 2 {
        return;
    }
    let right = x.saturating_add(w - 1);
    let bottom = y.saturating_add(h - 1);

    fb.put_char(x, y, '┌', style);
    fb.put_char(right, y, '┐', style);
    fb.put_char(x, bottom, '└', style);
    fb.put_char(right, bottom, '┘', style);

    for dx in 1..w - 1 {
        fb.put_char(x.saturating_add(dx), y, '─', style);
        fb.put_char(x.saturating_add(dx), bottom, '─', style);
    }
    for dy in 1..h - 1 {
        fb.put_char(x, y.saturating_add(dy), '│', style);
        fb.put_char(right, y.saturating_add(dy), '│', style);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FrameMeta, RenderMode};

    fn payload(lines: &[&str]) -> FramePayload {
        FramePayload {
            ascii_lines: lines.iter().map(|l| l.to_string()).collect(),
            meta: FrameMeta {
                intensity: 0.8,
                tick: 7,
                mode: RenderMode::Pulse,
            },
        }
    }

    #[test]
    fn status_line_mentions_tick_and_pause() {
        let status = StatusView {
            schedule: "alternate",
            intensity: 0.5,
            paused: true,
            clients: Some(2),
        };
        let line = status.line(Some(&payload(&["x"])));
        assert_eq!(
            line,
            "pulse | alternate | tick 7 | intensity 0.50 | tcp 2 | PAUSED"
        );
    }

    #[test]
    fn tiny_viewport_does_not_panic() {
        let view = FrameView::default();
        let fb = view.render(Some(&payload(&["abc", "def"])), None, Viewport::new(1, 1));
        assert_eq!(fb.width(), 1);
    }
}
