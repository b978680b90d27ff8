//! Shape rasterization. Every primitive reduces to "arm a window, then stream pixels" through the
//! narrow `Canvas` interface, and keeps no state between calls.
//!
//! Shapes are clipped to the panel before a window is armed, so the number of pixels streamed
//! always equals the area of the armed window. Arithmetic runs in `i32` so that coordinates near
//! the ends of the `i16` range do not overflow.

use core::cmp::{max, min};
use core::mem::swap;

use itertools::iproduct;

use crate::color::Rgb565;
use crate::display::geometry::PixelCoord;

/// What the rasterizer needs from a display.
pub(crate) trait Canvas {
    type Error;

    /// Effective `(width, height)` of the drawing space.
    fn size(&self) -> (u16, u16);

    /// Arm the address window with inclusive corners, ready for pixel data.
    fn arm_window(
        &mut self,
        upper_left: PixelCoord,
        lower_right: PixelCoord,
    ) -> Result<(), Self::Error>;

    fn send_pixel(&mut self, color: Rgb565) -> Result<(), Self::Error>;

    fn send_fill(&mut self, color: Rgb565, count: usize) -> Result<(), Self::Error>;

    fn send_pixels<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: Iterator<Item = Rgb565>;
}

/// An inclusive rectangle in `i32` drawing coordinates, clipped to the panel.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Clipped {
    x0: i32,
    y0: i32,
    x1: i32,
    y1: i32,
}

impl Clipped {
    fn width(&self) -> i32 {
        self.x1 - self.x0 + 1
    }

    fn height(&self) -> i32 {
        self.y1 - self.y0 + 1
    }

    fn area(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    fn corners(&self) -> (PixelCoord, PixelCoord) {
        (
            PixelCoord(self.x0 as i16, self.y0 as i16),
            PixelCoord(self.x1 as i16, self.y1 as i16),
        )
    }
}

/// Intersect the `w` x `h` rectangle at `(x, y)` with the panel, or `None` if nothing is left.
fn clip_rect<C: Canvas>(canvas: &C, x: i32, y: i32, w: i32, h: i32) -> Option<Clipped> {
    if w <= 0 || h <= 0 {
        return None;
    }
    let (width, height) = canvas.size();
    let r = Clipped {
        x0: max(x, 0),
        y0: max(y, 0),
        x1: min(x + w - 1, width as i32 - 1),
        y1: min(y + h - 1, height as i32 - 1),
    };
    if r.x0 > r.x1 || r.y0 > r.y1 {
        None
    } else {
        Some(r)
    }
}

pub(crate) fn pixel_at<C: Canvas>(
    canvas: &mut C,
    x: i32,
    y: i32,
    color: Rgb565,
) -> Result<(), C::Error> {
    let (width, height) = canvas.size();
    if x < 0 || y < 0 || x >= width as i32 || y >= height as i32 {
        return Ok(());
    }
    let p = PixelCoord(x as i16, y as i16);
    canvas.arm_window(p, p)?;
    canvas.send_pixel(color)
}

pub(crate) fn fill_at<C: Canvas>(
    canvas: &mut C,
    x: i32,
    y: i32,
    w: i32,
    h: i32,
    color: Rgb565,
) -> Result<(), C::Error> {
    match clip_rect(canvas, x, y, w, h) {
        Some(r) => {
            let (ul, lr) = r.corners();
            canvas.arm_window(ul, lr)?;
            canvas.send_fill(color, r.area())
        }
        None => Ok(()),
    }
}

pub(crate) fn draw_pixel<C: Canvas>(
    canvas: &mut C,
    p: PixelCoord,
    color: Rgb565,
) -> Result<(), C::Error> {
    pixel_at(canvas, p.0 as i32, p.1 as i32, color)
}

/// Horizontal run of `len` pixels starting at `origin` and extending right.
pub(crate) fn draw_hline<C: Canvas>(
    canvas: &mut C,
    origin: PixelCoord,
    len: i16,
    color: Rgb565,
) -> Result<(), C::Error> {
    fill_at(canvas, origin.0 as i32, origin.1 as i32, len as i32, 1, color)
}

/// Vertical run of `len` pixels starting at `origin` and extending down.
pub(crate) fn draw_vline<C: Canvas>(
    canvas: &mut C,
    origin: PixelCoord,
    len: i16,
    color: Rgb565,
) -> Result<(), C::Error> {
    fill_at(canvas, origin.0 as i32, origin.1 as i32, 1, len as i32, color)
}

pub(crate) fn draw_line<C: Canvas>(
    canvas: &mut C,
    p0: PixelCoord,
    p1: PixelCoord,
    color: Rgb565,
) -> Result<(), C::Error> {
    let (mut x0, mut y0) = (p0.0 as i32, p0.1 as i32);
    let (mut x1, mut y1) = (p1.0 as i32, p1.1 as i32);

    if p0 == p1 {
        return pixel_at(canvas, x0, y0, color);
    }
    if y0 == y1 {
        return fill_at(canvas, min(x0, x1), y0, (x1 - x0).abs() + 1, 1, color);
    }
    if x0 == x1 {
        return fill_at(canvas, x0, min(y0, y1), 1, (y1 - y0).abs() + 1, color);
    }

    let steep = (y1 - y0).abs() > (x1 - x0).abs();
    if steep {
        swap(&mut x0, &mut y0);
        swap(&mut x1, &mut y1);
    }
    // Walk the major axis in increasing order so both endpoint orders give the same pixels.
    if x0 > x1 {
        swap(&mut x0, &mut x1);
        swap(&mut y0, &mut y1);
    }

    let dx = x1 - x0;
    let dy = (y1 - y0).abs();
    let y_step = if y0 < y1 { 1 } else { -1 };
    let mut err = dx / 2;
    let mut y = y0;
    for x in x0..=x1 {
        if steep {
            pixel_at(canvas, y, x, color)?;
        } else {
            pixel_at(canvas, x, y, color)?;
        }
        err -= dy;
        if err < 0 {
            y += y_step;
            err += dx;
        }
    }
    Ok(())
}

pub(crate) fn draw_rect<C: Canvas>(
    canvas: &mut C,
    origin: PixelCoord,
    w: i16,
    h: i16,
    color: Rgb565,
) -> Result<(), C::Error> {
    if w <= 0 || h <= 0 {
        return Ok(());
    }
    let (x, y, w, h) = (origin.0 as i32, origin.1 as i32, w as i32, h as i32);
    fill_at(canvas, x, y, w, 1, color)?;
    fill_at(canvas, x, y + h - 1, w, 1, color)?;
    fill_at(canvas, x, y, 1, h, color)?;
    fill_at(canvas, x + w - 1, y, 1, h, color)
}

pub(crate) fn fill_rect<C: Canvas>(
    canvas: &mut C,
    origin: PixelCoord,
    w: i16,
    h: i16,
    color: Rgb565,
) -> Result<(), C::Error> {
    fill_at(canvas, origin.0 as i32, origin.1 as i32, w as i32, h as i32, color)
}

pub(crate) fn fill_screen<C: Canvas>(canvas: &mut C, color: Rgb565) -> Result<(), C::Error> {
    let (width, height) = canvas.size();
    fill_at(canvas, 0, 0, width as i32, height as i32, color)
}

/// Midpoint circle outline.
pub(crate) fn draw_circle<C: Canvas>(
    canvas: &mut C,
    center: PixelCoord,
    r: i16,
    color: Rgb565,
) -> Result<(), C::Error> {
    if r < 0 {
        return Ok(());
    }
    let (cx, cy, r) = (center.0 as i32, center.1 as i32, r as i32);
    if r == 0 {
        return pixel_at(canvas, cx, cy, color);
    }

    pixel_at(canvas, cx, cy + r, color)?;
    pixel_at(canvas, cx, cy - r, color)?;
    pixel_at(canvas, cx + r, cy, color)?;
    pixel_at(canvas, cx - r, cy, color)?;

    let mut f = 1 - r;
    let mut ddf_x = 1;
    let mut ddf_y = -2 * r;
    let mut x = 0;
    let mut y = r;
    while x < y {
        if f >= 0 {
            y -= 1;
            ddf_y += 2;
            f += ddf_y;
        }
        x += 1;
        ddf_x += 2;
        f += ddf_x;

        pixel_at(canvas, cx + x, cy + y, color)?;
        pixel_at(canvas, cx - x, cy + y, color)?;
        pixel_at(canvas, cx + x, cy - y, color)?;
        pixel_at(canvas, cx - x, cy - y, color)?;
        pixel_at(canvas, cx + y, cy + x, color)?;
        pixel_at(canvas, cx - y, cy + x, color)?;
        pixel_at(canvas, cx + y, cy - x, color)?;
        pixel_at(canvas, cx - y, cy - x, color)?;
    }
    Ok(())
}

/// Filled circle from horizontal chords.
pub(crate) fn fill_circle<C: Canvas>(
    canvas: &mut C,
    center: PixelCoord,
    r: i16,
    color: Rgb565,
) -> Result<(), C::Error> {
    if r < 0 {
        return Ok(());
    }
    let (cx, cy, r) = (center.0 as i32, center.1 as i32, r as i32);
    fill_at(canvas, cx - r, cy, 2 * r + 1, 1, color)?;

    let mut f = 1 - r;
    let mut ddf_x = 1;
    let mut ddf_y = -2 * r;
    let mut x = 0;
    let mut y = r;
    while x < y {
        if f >= 0 {
            y -= 1;
            ddf_y += 2;
            f += ddf_y;
        }
        x += 1;
        ddf_x += 2;
        f += ddf_x;

        fill_at(canvas, cx - x, cy + y, 2 * x + 1, 1, color)?;
        fill_at(canvas, cx - x, cy - y, 2 * x + 1, 1, color)?;
        fill_at(canvas, cx - y, cy + x, 2 * y + 1, 1, color)?;
        fill_at(canvas, cx - y, cy - x, 2 * y + 1, 1, color)?;
    }
    Ok(())
}

pub(crate) fn draw_triangle<C: Canvas>(
    canvas: &mut C,
    p0: PixelCoord,
    p1: PixelCoord,
    p2: PixelCoord,
    color: Rgb565,
) -> Result<(), C::Error> {
    draw_line(canvas, p0, p1, color)?;
    draw_line(canvas, p1, p2, color)?;
    draw_line(canvas, p2, p0, color)
}

/// Blit a row-major `w` x `h` image, cropping whatever falls outside the panel. Nothing is sent
/// when `data` holds fewer than `w * h` pixels.
pub(crate) fn draw_image<C: Canvas>(
    canvas: &mut C,
    origin: PixelCoord,
    w: i16,
    h: i16,
    data: &[Rgb565],
) -> Result<(), C::Error> {
    if w <= 0 || h <= 0 || data.len() < w as usize * h as usize {
        return Ok(());
    }
    let (x, y, w, h) = (origin.0 as i32, origin.1 as i32, w as i32, h as i32);
    let r = match clip_rect(canvas, x, y, w, h) {
        Some(r) => r,
        None => return Ok(()),
    };
    let (ul, lr) = r.corners();
    canvas.arm_window(ul, lr)?;

    // Offset of the visible part inside the source image.
    let skip_x = (r.x0 - x) as usize;
    let skip_y = (r.y0 - y) as usize;
    let stride = w as usize;
    let rows = skip_y..skip_y + r.height() as usize;
    let cols = skip_x..skip_x + r.width() as usize;
    canvas.send_pixels(iproduct!(rows, cols).map(|(row, col)| data[row * stride + col]))
}
