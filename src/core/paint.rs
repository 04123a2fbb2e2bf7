//! Pixel canvas behind the Paint window. One canvas pixel maps to one
//! terminal cell.

use image::{ImageFormat, Rgb, RgbImage};
use std::collections::VecDeque;
use std::io::Cursor;

use super::store::{Store, VfsError, VfsResult};
use super::vfs::VirtualFs;

pub const CANVAS_W: u32 = 96;
pub const CANVAS_H: u32 = 32;
pub const HISTORY_LIMIT: usize = 10;
pub const MAX_LINE_WIDTH: u8 = 8;
pub const SAVE_DIR: &str = "C:/Users/Default/Desktop";

const WHITE: Rgb<u8> = Rgb([0xFF, 0xFF, 0xFF]);

pub const PALETTE: [(&str, [u8; 3]); 10] = [
    ("#000000", [0x00, 0x00, 0x00]),
    ("#FFFFFF", [0xFF, 0xFF, 0xFF]),
    ("#FF0000", [0xFF, 0x00, 0x00]),
    ("#00FF00", [0x00, 0xFF, 0x00]),
    ("#0000FF", [0x00, 0x00, 0xFF]),
    ("#FFFF00", [0xFF, 0xFF, 0x00]),
    ("#FF00FF", [0xFF, 0x00, 0xFF]),
    ("#00FFFF", [0x00, 0xFF, 0xFF]),
    ("#808080", [0x80, 0x80, 0x80]),
    ("#FFA500", [0xFF, 0xA5, 0x00]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Brush,
    Eraser,
    Line,
    Rectangle,
    Circle,
}

impl Tool {
    pub const ALL: [Tool; 5] = [
        Tool::Brush,
        Tool::Eraser,
        Tool::Line,
        Tool::Rectangle,
        Tool::Circle,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Tool::Brush => "Brush",
            Tool::Eraser => "Eraser",
            Tool::Line => "Line",
            Tool::Rectangle => "Rectangle",
            Tool::Circle => "Circle",
        }
    }

    fn is_freehand(self) -> bool {
        matches!(self, Tool::Brush | Tool::Eraser)
    }
}

#[derive(Debug, Clone)]
pub struct Paint {
    canvas: RgbImage,
    history: VecDeque<RgbImage>,
    pub tool: Tool,
    pub color: usize,
    pub line_width: u8,
    pub file_path: Option<String>,
    stroke_start: Option<(i32, i32)>,
    stroke_last: Option<(i32, i32)>,
}

impl Paint {
    pub fn new(file_path: Option<String>) -> Self {
        let canvas = RgbImage::from_pixel(CANVAS_W, CANVAS_H, WHITE);
        let mut history = VecDeque::with_capacity(HISTORY_LIMIT);
        history.push_back(canvas.clone());
        Self {
            canvas,
            history,
            tool: Tool::Brush,
            color: 0,
            line_width: 1,
            file_path,
            stroke_start: None,
            stroke_last: None,
        }
    }

    /// Paint window opened on a file: draw the stored PNG at the origin.
    pub fn open<S: Store>(fs: &VirtualFs<S>, file_path: Option<String>) -> VfsResult<Self> {
        let mut paint = Self::new(file_path);
        let Some(path) = paint.file_path.clone() else {
            return Ok(paint);
        };
        if let Some(bytes) = fs.read(&path)?.as_ref().and_then(|r| r.bytes()) {
            let loaded = image::load_from_memory_with_format(bytes, ImageFormat::Png)
                .map_err(|e| VfsError::Image(e.to_string()))?
                .to_rgb8();
            image::imageops::replace(&mut paint.canvas, &loaded, 0, 0);
            paint.snapshot();
        }
        Ok(paint)
    }

    pub fn canvas(&self) -> &RgbImage {
        &self.canvas
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.canvas.get_pixel(x, y).0
    }

    pub fn can_undo(&self) -> bool {
        self.history.len() >= 2
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    fn ink(&self) -> Rgb<u8> {
        if self.tool == Tool::Eraser {
            WHITE
        } else {
            Rgb(PALETTE[self.color % PALETTE.len()].1)
        }
    }

    pub fn set_line_width(&mut self, width: u8) {
        self.line_width = width.clamp(1, MAX_LINE_WIDTH);
    }

    fn snapshot(&mut self) {
        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(self.canvas.clone());
    }

    pub fn undo(&mut self) {
        if !self.can_undo() {
            return;
        }
        self.history.pop_back();
        if let Some(prev) = self.history.back() {
            self.canvas = prev.clone();
        }
    }

    pub fn pointer_down(&mut self, x: i32, y: i32) {
        self.stroke_start = Some((x, y));
        self.stroke_last = Some((x, y));
        if self.tool.is_freehand() {
            self.stamp(x, y, self.ink());
        }
    }

    pub fn pointer_move(&mut self, x: i32, y: i32) {
        let Some(last) = self.stroke_last else {
            return;
        };
        if self.tool.is_freehand() {
            self.segment(last, (x, y), self.ink());
        }
        self.stroke_last = Some((x, y));
    }

    pub fn pointer_up(&mut self, x: i32, y: i32) {
        let Some(start) = self.stroke_start.take() else {
            return;
        };
        self.stroke_last = None;
        let ink = self.ink();
        match self.tool {
            Tool::Brush | Tool::Eraser => {}
            Tool::Line => self.segment(start, (x, y), ink),
            Tool::Rectangle => {
                let corners = [start, (x, start.1), (x, y), (start.0, y)];
                for i in 0..4 {
                    self.segment(corners[i], corners[(i + 1) % 4], ink);
                }
            }
            Tool::Circle => {
                let dx = f64::from(x - start.0);
                let dy = f64::from(y - start.1);
                let r = (dx * dx + dy * dy).sqrt().round() as i32;
                self.circle(start, r, ink);
            }
        }
        self.snapshot();
    }

    pub fn stroke_active(&self) -> bool {
        self.stroke_start.is_some()
    }

    fn put(&mut self, x: i32, y: i32, ink: Rgb<u8>) {
        if x >= 0 && y >= 0 && (x as u32) < CANVAS_W && (y as u32) < CANVAS_H {
            self.canvas.put_pixel(x as u32, y as u32, ink);
        }
    }

    fn stamp(&mut self, x: i32, y: i32, ink: Rgb<u8>) {
        let w = i32::from(self.line_width);
        let off = (w - 1) / 2;
        for dy in 0..w {
            for dx in 0..w {
                self.put(x - off + dx, y - off + dy, ink);
            }
        }
    }

    // Bresenham.
    fn segment(&mut self, from: (i32, i32), to: (i32, i32), ink: Rgb<u8>) {
        let (mut x0, mut y0) = from;
        let (x1, y1) = to;
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.stamp(x0, y0, ink);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    // Midpoint circle.
    fn circle(&mut self, center: (i32, i32), r: i32, ink: Rgb<u8>) {
        let (cx, cy) = center;
        let mut x = r;
        let mut y = 0;
        let mut err = 1 - r;
        while x >= y {
            for (px, py) in [
                (x, y),
                (y, x),
                (-y, x),
                (-x, y),
                (-x, -y),
                (-y, -x),
                (y, -x),
                (x, -y),
            ] {
                self.stamp(cx + px, cy + py, ink);
            }
            y += 1;
            if err < 0 {
                err += 2 * y + 1;
            } else {
                x -= 1;
                err += 2 * (y - x) + 1;
            }
        }
    }

    pub fn encode_png(&self) -> VfsResult<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        self.canvas
            .write_to(&mut out, ImageFormat::Png)
            .map_err(|e| VfsError::Image(e.to_string()))?;
        Ok(out.into_inner())
    }

    /// Write the canvas as PNG. Without a file path a timestamped name on the
    /// desktop is used and remembered for later saves.
    pub fn save<S: Store>(&mut self, fs: &mut VirtualFs<S>, now_ms: i64) -> VfsResult<String> {
        let target = self
            .file_path
            .clone()
            .unwrap_or_else(|| format!("{SAVE_DIR}/painting_{now_ms}.png"));
        let bytes = self.encode_png()?;
        fs.write(&target, bytes, "image/png")?;
        tracing::info!(path = %target, "painting saved");
        self.file_path = Some(target.clone());
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;

    fn fs() -> VirtualFs<MemoryStore> {
        let mut fs = VirtualFs::new(MemoryStore::new());
        fs.initialize().unwrap();
        fs
    }

    #[test]
    fn new_canvas_is_white_with_one_history_state() {
        let paint = Paint::new(None);
        assert_eq!(paint.pixel(0, 0), [0xFF; 3]);
        assert_eq!(paint.history_len(), 1);
        assert!(!paint.can_undo());
    }

    #[test]
    fn brush_stroke_then_undo() {
        let mut paint = Paint::new(None);
        paint.color = 2;
        paint.pointer_down(1, 1);
        paint.pointer_move(5, 1);
        paint.pointer_up(5, 1);
        assert_eq!(paint.pixel(3, 1), [0xFF, 0, 0]);
        assert!(paint.can_undo());
        paint.undo();
        assert_eq!(paint.pixel(3, 1), [0xFF; 3]);
    }

    #[test]
    fn eraser_paints_white() {
        let mut paint = Paint::new(None);
        paint.pointer_down(2, 2);
        paint.pointer_up(2, 2);
        assert_eq!(paint.pixel(2, 2), [0, 0, 0]);
        paint.tool = Tool::Eraser;
        paint.pointer_down(2, 2);
        paint.pointer_up(2, 2);
        assert_eq!(paint.pixel(2, 2), [0xFF; 3]);
    }

    #[test]
    fn rectangle_draws_outline_only() {
        let mut paint = Paint::new(None);
        paint.tool = Tool::Rectangle;
        paint.pointer_down(2, 2);
        paint.pointer_up(8, 6);
        assert_eq!(paint.pixel(2, 2), [0, 0, 0]);
        assert_eq!(paint.pixel(8, 6), [0, 0, 0]);
        assert_eq!(paint.pixel(5, 2), [0, 0, 0]);
        assert_eq!(paint.pixel(5, 4), [0xFF; 3]);
    }

    #[test]
    fn circle_reaches_radius() {
        let mut paint = Paint::new(None);
        paint.tool = Tool::Circle;
        paint.pointer_down(20, 10);
        paint.pointer_up(25, 10);
        assert_eq!(paint.pixel(25, 10), [0, 0, 0]);
        assert_eq!(paint.pixel(20, 5), [0, 0, 0]);
        assert_eq!(paint.pixel(20, 10), [0xFF; 3]);
    }

    #[test]
    fn history_keeps_last_ten_states() {
        let mut paint = Paint::new(None);
        for i in 0..15 {
            paint.pointer_down(i, 0);
            paint.pointer_up(i, 0);
        }
        assert_eq!(paint.history_len(), HISTORY_LIMIT);
        for _ in 0..20 {
            paint.undo();
        }
        assert_eq!(paint.history_len(), 1);
        assert_eq!(paint.pixel(5, 0), [0, 0, 0]);
        assert_eq!(paint.pixel(6, 0), [0xFF; 3]);
    }

    #[test]
    fn save_then_reopen_restores_pixels() {
        let mut fs = fs();
        let mut paint = Paint::new(None);
        paint.color = 4;
        paint.set_line_width(3);
        paint.pointer_down(10, 10);
        paint.pointer_up(10, 10);
        let path = paint.save(&mut fs, 1_700_000_000_000).unwrap();
        assert_eq!(path, "C:/Users/Default/Desktop/painting_1700000000000.png");
        let rec = fs.read(&path).unwrap().unwrap();
        assert_eq!(rec.mime_type.as_deref(), Some("image/png"));

        let reopened = Paint::open(&fs, Some(path)).unwrap();
        assert_eq!(reopened.pixel(9, 9), [0, 0, 0xFF]);
        assert_eq!(reopened.pixel(11, 11), [0, 0, 0xFF]);
        assert_eq!(reopened.pixel(13, 13), [0xFF; 3]);
    }

    #[test]
    fn line_width_is_clamped() {
        let mut paint = Paint::new(None);
        paint.set_line_width(0);
        assert_eq!(paint.line_width, 1);
        paint.set_line_width(200);
        assert_eq!(paint.line_width, MAX_LINE_WIDTH);
    }
}
