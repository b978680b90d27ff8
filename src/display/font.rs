//! A fixed 5x7 font for printable ASCII, drawn in a 6x8 cell so that consecutive characters are
//! separated by one blank column and lines by one blank row.

use itertools::iproduct;

use crate::color::Rgb565;
use crate::display::geometry::PixelCoord;
use crate::display::raster::{fill_at, pixel_at, Canvas};

/// Width of a character cell at scale 1, including the spacing column.
pub const CELL_WIDTH: i32 = 6;
/// Height of a character cell at scale 1, including the spacing row.
pub const CELL_HEIGHT: i32 = 8;

const FIRST: char = ' ';
const LAST: char = '~';
const FALLBACK: char = '?';

/// Column-major glyphs for `' '..='~'`, five columns each. Bit 0 is the top row.
#[cfg_attr(rustfmt, rustfmt_skip)]
const GLYPHS: [[u8; 5]; 95] = [
    [0x00, 0x00, 0x00, 0x00, 0x00], // ' '
    [0x00, 0x00, 0x5F, 0x00, 0x00], // !
    [0x00, 0x07, 0x00, 0x07, 0x00], // "
    [0x14, 0x7F, 0x14, 0x7F, 0x14], // #
    [0x24, 0x2A, 0x7F, 0x2A, 0x12], // $
    [0x23, 0x13, 0x08, 0x64, 0x62], // %
    [0x36, 0x49, 0x55, 0x22, 0x50], // &
    [0x00, 0x05, 0x03, 0x00, 0x00], // '
    [0x00, 0x1C, 0x22, 0x41, 0x00], // (
    [0x00, 0x41, 0x22, 0x1C, 0x00], // )
    [0x08, 0x2A, 0x1C, 0x2A, 0x08], // *
    [0x08, 0x08, 0x3E, 0x08, 0x08], // +
    [0x00, 0x50, 0x30, 0x00, 0x00], // ,
    [0x08, 0x08, 0x08, 0x08, 0x08], // -
    [0x00, 0x60, 0x60, 0x00, 0x00], // .
    [0x20, 0x10, 0x08, 0x04, 0x02], // /
    [0x3E, 0x51, 0x49, 0x45, 0x3E], // 0
    [0x00, 0x42, 0x7F, 0x40, 0x00], // 1
    [0x42, 0x61, 0x51, 0x49, 0x46], // 2
    [0x21, 0x41, 0x45, 0x4B, 0x31], // 3
    [0x18, 0x14, 0x12, 0x7F, 0x10], // 4
    [0x27, 0x45, 0x45, 0x45, 0x39], // 5
    [0x3C, 0x4A, 0x49, 0x49, 0x30], // 6
    [0x01, 0x71, 0x09, 0x05, 0x03], // 7
    [0x36, 0x49, 0x49, 0x49, 0x36], // 8
    [0x06, 0x49, 0x49, 0x29, 0x1E], // 9
    [0x00, 0x36, 0x36, 0x00, 0x00], // :
    [0x00, 0x56, 0x36, 0x00, 0x00], // ;
    [0x08, 0x14, 0x22, 0x41, 0x00], // <
    [0x14, 0x14, 0x14, 0x14, 0x14], // =
    [0x00, 0x41, 0x22, 0x14, 0x08], // >
    [0x02, 0x01, 0x51, 0x09, 0x06], // ?
    [0x32, 0x49, 0x79, 0x41, 0x3E], // @
    [0x7E, 0x11, 0x11, 0x11, 0x7E], // A
    [0x7F, 0x49, 0x49, 0x49, 0x36], // B
    [0x3E, 0x41, 0x41, 0x41, 0x22], // C
    [0x7F, 0x41, 0x41, 0x22, 0x1C], // D
    [0x7F, 0x49, 0x49, 0x49, 0x41], // E
    [0x7F, 0x09, 0x09, 0x09, 0x01], // F
    [0x3E, 0x41, 0x49, 0x49, 0x7A], // G
    [0x7F, 0x08, 0x08, 0x08, 0x7F], // H
    [0x00, 0x41, 0x7F, 0x41, 0x00], // I
    [0x20, 0x40, 0x41, 0x3F, 0x01], // J
    [0x7F, 0x08, 0x14, 0x22, 0x41], // K
    [0x7F, 0x40, 0x40, 0x40, 0x40], // L
    [0x7F, 0x02, 0x0C, 0x02, 0x7F], // M
    [0x7F, 0x04, 0x08, 0x10, 0x7F], // N
    [0x3E, 0x41, 0x41, 0x41, 0x3E], // O
    [0x7F, 0x09, 0x09, 0x09, 0x06], // P
    [0x3E, 0x41, 0x51, 0x21, 0x5E], // Q
    [0x7F, 0x09, 0x19, 0x29, 0x46], // R
    [0x46, 0x49, 0x49, 0x49, 0x31], // S
    [0x01, 0x01, 0x7F, 0x01, 0x01], // T
    [0x3F, 0x40, 0x40, 0x40, 0x3F], // U
    [0x1F, 0x20, 0x40, 0x20, 0x1F], // V
    [0x3F, 0x40, 0x38, 0x40, 0x3F], // W
    [0x63, 0x14, 0x08, 0x14, 0x63], // X
    [0x07, 0x08, 0x70, 0x08, 0x07], // Y
    [0x61, 0x51, 0x49, 0x45, 0x43], // Z
    [0x00, 0x7F, 0x41, 0x41, 0x00], // [
    [0x02, 0x04, 0x08, 0x10, 0x20], // \
    [0x00, 0x41, 0x41, 0x7F, 0x00], // ]
    [0x04, 0x02, 0x01, 0x02, 0x04], // ^
    [0x40, 0x40, 0x40, 0x40, 0x40], // _
    [0x00, 0x01, 0x02, 0x04, 0x00], // `
    [0x20, 0x54, 0x54, 0x54, 0x78], // a
    [0x7F, 0x48, 0x44, 0x44, 0x38], // b
    [0x38, 0x44, 0x44, 0x44, 0x20], // c
    [0x38, 0x44, 0x44, 0x48, 0x7F], // d
    [0x38, 0x54, 0x54, 0x54, 0x18], // e
    [0x08, 0x7E, 0x09, 0x01, 0x02], // f
    [0x0C, 0x52, 0x52, 0x52, 0x3E], // g
    [0x7F, 0x08, 0x04, 0x04, 0x78], // h
    [0x00, 0x44, 0x7D, 0x40, 0x00], // i
    [0x20, 0x40, 0x44, 0x3D, 0x00], // j
    [0x7F, 0x10, 0x28, 0x44, 0x00], // k
    [0x00, 0x41, 0x7F, 0x40, 0x00], // l
    [0x7C, 0x04, 0x18, 0x04, 0x78], // m
    [0x7C, 0x08, 0x04, 0x04, 0x78], // n
    [0x38, 0x44, 0x44, 0x44, 0x38], // o
    [0x7C, 0x14, 0x14, 0x14, 0x08], // p
    [0x08, 0x14, 0x14, 0x18, 0x7C], // q
    [0x7C, 0x08, 0x04, 0x04, 0x08], // r
    [0x48, 0x54, 0x54, 0x54, 0x20], // s
    [0x04, 0x3F, 0x44, 0x40, 0x20], // t
    [0x3C, 0x40, 0x40, 0x20, 0x7C], // u
    [0x1C, 0x20, 0x40, 0x20, 0x1C], // v
    [0x3C, 0x40, 0x30, 0x40, 0x3C], // w
    [0x44, 0x28, 0x10, 0x28, 0x44], // x
    [0x0C, 0x50, 0x50, 0x50, 0x3C], // y
    [0x44, 0x64, 0x54, 0x4C, 0x44], // z
    [0x00, 0x08, 0x36, 0x41, 0x00], // {
    [0x00, 0x00, 0x7F, 0x00, 0x00], // |
    [0x00, 0x41, 0x36, 0x08, 0x00], // }
    [0x08, 0x04, 0x08, 0x10, 0x08], // ~
];

/// The glyph for `c`, or the fallback glyph when `c` is not printable ASCII.
pub fn glyph(c: char) -> &'static [u8; 5] {
    let c = if c >= FIRST && c <= LAST { c } else { FALLBACK };
    &GLYPHS[c as usize - FIRST as usize]
}

/// Whether the cell pixel at `col`, `row` (unscaled) is lit. Column 5 and row 7 are spacing.
fn lit(glyph: &[u8; 5], col: usize, row: usize) -> bool {
    col < glyph.len() && row < 8 && (glyph[col] >> row) & 1 == 1
}

pub(crate) fn draw_char<C: Canvas>(
    canvas: &mut C,
    origin: PixelCoord,
    c: char,
    fg: Rgb565,
    bg: Rgb565,
    scale: u8,
) -> Result<(), C::Error> {
    draw_char_at(canvas, origin.0 as i32, origin.1 as i32, c, fg, bg, scale)
}

fn draw_char_at<C: Canvas>(
    canvas: &mut C,
    x: i32,
    y: i32,
    c: char,
    fg: Rgb565,
    bg: Rgb565,
    scale: u8,
) -> Result<(), C::Error> {
    if scale == 0 {
        return Ok(());
    }
    let s = scale as i32;
    let (cell_w, cell_h) = (CELL_WIDTH * s, CELL_HEIGHT * s);
    let (width, height) = canvas.size();
    let (width, height) = (width as i32, height as i32);
    if x >= width || y >= height || x + cell_w <= 0 || y + cell_h <= 0 {
        return Ok(());
    }

    let glyph = glyph(c);
    let opaque = bg != fg;

    // A fully visible opaque cell goes out as one window.
    if opaque && x >= 0 && y >= 0 && x + cell_w <= width && y + cell_h <= height {
        canvas.arm_window(
            PixelCoord(x as i16, y as i16),
            PixelCoord((x + cell_w - 1) as i16, (y + cell_h - 1) as i16),
        )?;
        let su = scale as usize;
        let cell = iproduct!(0..cell_h as usize, 0..cell_w as usize);
        return canvas.send_pixels(cell.map(|(row, col)| {
            if lit(glyph, col / su, row / su) {
                fg
            } else {
                bg
            }
        }));
    }

    for (col, row) in iproduct!(0..CELL_WIDTH as usize, 0..CELL_HEIGHT as usize) {
        let color = if lit(glyph, col, row) {
            fg
        } else if opaque {
            bg
        } else {
            continue;
        };
        let (px, py) = (x + col as i32 * s, y + row as i32 * s);
        if s == 1 {
            pixel_at(canvas, px, py, color)?;
        } else {
            fill_at(canvas, px, py, s, s, color)?;
        }
    }
    Ok(())
}

pub(crate) fn draw_string<C: Canvas>(
    canvas: &mut C,
    origin: PixelCoord,
    text: &str,
    fg: Rgb565,
    bg: Rgb565,
    scale: u8,
) -> Result<(), C::Error> {
    let s = scale as i32;
    let (width, _) = canvas.size();
    let (x0, mut x, mut y) = (origin.0 as i32, origin.0 as i32, origin.1 as i32);
    for c in text.chars() {
        match c {
            '\n' => {
                x = x0;
                y += CELL_HEIGHT * s;
            }
            '\r' => x = x0,
            _ => {
                draw_char_at(canvas, x, y, c, fg, bg, scale)?;
                x += CELL_WIDTH * s;
                if x > width as i32 - CELL_WIDTH * s {
                    x = x0;
                    y += CELL_HEIGHT * s;
                }
            }
        }
    }
    Ok(())
}
