//! Slot placement and CPU rasterization.

use patchbay_frame::Frame;

/// How a slot's frame lands on the output canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Scale to exactly fill the canvas, ignoring aspect ratio.
    StretchFull,
    /// Blit at native resolution, top-left corner at `(x, y)`, clipped
    /// to canvas bounds, no scaling.
    Move { x: i32, y: i32 },
    /// Scale into the rectangle `(x, y)..(x2, y2)`, clipped to canvas
    /// bounds.
    MoveStretch { x: i32, y: i32, x2: i32, y2: i32 },
}

/// Half-open pixel rectangle on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl Rect {
    pub fn intersect(&self, other: &Rect) -> Rect {
        Rect {
            x0: self.x0.max(other.x0),
            y0: self.y0.max(other.y0),
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.x1 <= self.x0 || self.y1 <= self.y0
    }

    pub fn width(&self) -> i32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> i32 {
        self.y1 - self.y0
    }
}

/// Destination rectangle for a frame under a placement rule.
fn destination(placement: Placement, frame: &Frame, canvas_w: u32, canvas_h: u32) -> Rect {
    match placement {
        Placement::StretchFull => Rect {
            x0: 0,
            y0: 0,
            x1: canvas_w as i32,
            y1: canvas_h as i32,
        },
        Placement::Move { x, y } => Rect {
            x0: x,
            y0: y,
            x1: x + frame.width() as i32,
            y1: y + frame.height() as i32,
        },
        Placement::MoveStretch { x, y, x2, y2 } => Rect {
            x0: x,
            y0: y,
            x1: x2,
            y1: y2,
        },
    }
}

/// Rasterize one frame onto an RGB canvas.
///
/// `clip` bounds the writable area (the canvas minus the margin border);
/// the destination rectangle is clipped against it, and nearest-neighbor
/// sampling maps clipped destination pixels back to source pixels.
/// 4-channel sources are src-over blended; 3-channel sources overwrite.
pub fn composite(
    canvas: &mut [u8],
    canvas_w: u32,
    canvas_h: u32,
    frame: &Frame,
    placement: Placement,
    clip: Rect,
) {
    let dest = destination(placement, frame, canvas_w, canvas_h);
    if dest.is_empty() {
        return;
    }
    let visible = dest.intersect(&clip).intersect(&Rect {
        x0: 0,
        y0: 0,
        x1: canvas_w as i32,
        y1: canvas_h as i32,
    });
    if visible.is_empty() {
        return;
    }

    let src_w = frame.width() as i64;
    let src_h = frame.height() as i64;
    let dest_w = dest.width() as i64;
    let dest_h = dest.height() as i64;
    let canvas_stride = canvas_w as usize * 3;

    for dy in visible.y0..visible.y1 {
        let sy = ((dy - dest.y0) as i64 * src_h / dest_h) as u32;
        for dx in visible.x0..visible.x1 {
            let sx = ((dx - dest.x0) as i64 * src_w / dest_w) as u32;
            let src = frame.pixel(sx, sy);
            let offset = dy as usize * canvas_stride + dx as usize * 3;
            let dst = &mut canvas[offset..offset + 3];
            if frame.has_alpha() {
                blend_src_over(dst, src);
            } else {
                dst.copy_from_slice(src);
            }
        }
    }
}

/// src-over with 8-bit alpha, rounding to nearest.
fn blend_src_over(dst: &mut [u8], src: &[u8]) {
    let alpha = src[3] as u32;
    let inverse = 255 - alpha;
    for channel in 0..3 {
        let value = src[channel] as u32 * alpha + dst[channel] as u32 * inverse;
        dst[channel] = ((value + 127) / 255) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, color: [u8; 3]) -> Frame {
        Frame::filled(width, height, false, &color, 1).unwrap()
    }

    fn full_clip(w: u32, h: u32) -> Rect {
        Rect {
            x0: 0,
            y0: 0,
            x1: w as i32,
            y1: h as i32,
        }
    }

    fn pixel(canvas: &[u8], w: u32, x: u32, y: u32) -> [u8; 3] {
        let offset = (y * w + x) as usize * 3;
        [canvas[offset], canvas[offset + 1], canvas[offset + 2]]
    }

    #[test]
    fn test_stretch_full_covers_canvas() {
        let mut canvas = vec![0u8; 8 * 4 * 3];
        let frame = solid(2, 2, [9, 8, 7]);
        composite(&mut canvas, 8, 4, &frame, Placement::StretchFull, full_clip(8, 4));
        assert_eq!(pixel(&canvas, 8, 0, 0), [9, 8, 7]);
        assert_eq!(pixel(&canvas, 8, 7, 3), [9, 8, 7]);
    }

    #[test]
    fn test_move_blits_at_native_size() {
        let mut canvas = vec![0u8; 8 * 8 * 3];
        let frame = solid(2, 2, [5, 5, 5]);
        composite(
            &mut canvas,
            8,
            8,
            &frame,
            Placement::Move { x: 3, y: 4 },
            full_clip(8, 8),
        );
        assert_eq!(pixel(&canvas, 8, 3, 4), [5, 5, 5]);
        assert_eq!(pixel(&canvas, 8, 4, 5), [5, 5, 5]);
        assert_eq!(pixel(&canvas, 8, 2, 4), [0, 0, 0]);
        assert_eq!(pixel(&canvas, 8, 5, 4), [0, 0, 0]);
    }

    #[test]
    fn test_move_clips_against_canvas_edges() {
        let mut canvas = vec![0u8; 4 * 4 * 3];
        let frame = solid(3, 3, [1, 2, 3]);
        composite(
            &mut canvas,
            4,
            4,
            &frame,
            Placement::Move { x: -1, y: 2 },
            full_clip(4, 4),
        );
        // Rows 0..2 untouched, columns beyond the frame untouched
        assert_eq!(pixel(&canvas, 4, 0, 1), [0, 0, 0]);
        assert_eq!(pixel(&canvas, 4, 0, 2), [1, 2, 3]);
        assert_eq!(pixel(&canvas, 4, 1, 3), [1, 2, 3]);
        assert_eq!(pixel(&canvas, 4, 2, 3), [0, 0, 0]);
    }

    #[test]
    fn test_move_stretch_scales_into_rect() {
        let mut canvas = vec![0u8; 8 * 8 * 3];
        let frame = solid(2, 2, [7, 7, 7]);
        composite(
            &mut canvas,
            8,
            8,
            &frame,
            Placement::MoveStretch {
                x: 1,
                y: 1,
                x2: 7,
                y2: 7,
            },
            full_clip(8, 8),
        );
        assert_eq!(pixel(&canvas, 8, 0, 0), [0, 0, 0]);
        assert_eq!(pixel(&canvas, 8, 1, 1), [7, 7, 7]);
        assert_eq!(pixel(&canvas, 8, 6, 6), [7, 7, 7]);
        assert_eq!(pixel(&canvas, 8, 7, 7), [0, 0, 0]);
    }

    #[test]
    fn test_clip_excludes_margin_band() {
        let mut canvas = vec![0u8; 8 * 8 * 3];
        let frame = solid(8, 8, [9, 9, 9]);
        let clip = Rect {
            x0: 2,
            y0: 2,
            x1: 6,
            y1: 6,
        };
        composite(&mut canvas, 8, 8, &frame, Placement::StretchFull, clip);
        assert_eq!(pixel(&canvas, 8, 1, 1), [0, 0, 0]);
        assert_eq!(pixel(&canvas, 8, 2, 2), [9, 9, 9]);
        assert_eq!(pixel(&canvas, 8, 5, 5), [9, 9, 9]);
        assert_eq!(pixel(&canvas, 8, 6, 6), [0, 0, 0]);
    }

    #[test]
    fn test_alpha_source_blends_src_over() {
        let mut canvas = vec![100u8; 1 * 1 * 3];
        let frame = Frame::new(1, 1, true, false, 1, vec![200, 200, 200, 128]).unwrap();
        composite(&mut canvas, 1, 1, &frame, Placement::StretchFull, full_clip(1, 1));
        // 200*128/255 + 100*127/255 ~ 150
        let value = pixel(&canvas, 1, 0, 0)[0];
        assert!((149..=151).contains(&value), "blended value {value}");
    }

    #[test]
    fn test_flipped_source_draws_top_down() {
        // Source stored bottom-up: buffer row 0 is the visual bottom.
        let pixels = vec![
            1, 1, 1, 1, 1, 1, // buffer row 0 (visual bottom)
            2, 2, 2, 2, 2, 2, // buffer row 1 (visual top)
        ];
        let frame = Frame::new(2, 2, false, true, 1, pixels).unwrap();
        let mut canvas = vec![0u8; 2 * 2 * 3];
        composite(&mut canvas, 2, 2, &frame, Placement::StretchFull, full_clip(2, 2));
        assert_eq!(pixel(&canvas, 2, 0, 0), [2, 2, 2]);
        assert_eq!(pixel(&canvas, 2, 0, 1), [1, 1, 1]);
    }
}
