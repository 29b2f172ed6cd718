use image::RgbaImage;

use crate::{
    buffer::{Rgba8, SurfaceFrame},
    error::LumenResult,
    font::FontSpec,
};

/// A drawing surface the text engines render through: font selection,
/// single-line metrics, plain and rotated text, and readback of the
/// finished frame. Coordinates are top-down with the origin at the top
/// left, matching conventional 2-D canvases; the frame buffer flip happens
/// at composite time.
pub trait TextSurface {
    /// Clears the surface to fully transparent.
    fn reset(&mut self);

    fn select_font(&mut self, font: &FontSpec, color: Rgba8) -> LumenResult<()>;

    /// Extent of a single line of text; the empty string measures (0, 0).
    fn measure_text(&self, text: &str) -> (i32, i32);

    fn draw_text(&mut self, text: &str, x: i32, y: i32);

    /// Draws a line rotated counterclockwise by `degrees` around (x, y).
    fn draw_text_rotated(&mut self, text: &str, x: i32, y: i32, degrees: f64);

    fn finalize(&self) -> SurfaceFrame;
}

/// Coverage mask for one rasterized line of text.
pub(crate) struct CoverageMask {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl CoverageMask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; (width * height) as usize],
        }
    }

    pub fn set(&mut self, x: i32, y: i32, coverage: u8) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let idx = (y as u32 * self.width + x as u32) as usize;
        self.data[idx] = self.data[idx].max(coverage);
    }

    pub fn get(&self, x: i32, y: i32) -> u8 {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return 0;
        }
        self.data[(y as u32 * self.width + x as u32) as usize]
    }
}

pub(crate) fn blit_mask(image: &mut RgbaImage, mask: &CoverageMask, x: i32, y: i32, color: Rgba8) {
    for my in 0..mask.height as i32 {
        for mx in 0..mask.width as i32 {
            let coverage = mask.get(mx, my);
            if coverage == 0 {
                continue;
            }
            put_covered(image, x + mx, y + my, color, coverage);
        }
    }
}

/// Inverse-mapped nearest-neighbor rotation of a line mask around the draw
/// origin (x, y). Positive degrees rotate counterclockwise on screen.
pub(crate) fn blit_mask_rotated(
    image: &mut RgbaImage,
    mask: &CoverageMask,
    x: i32,
    y: i32,
    degrees: f64,
    color: Rgba8,
) {
    let theta = degrees.to_radians();
    let (sin, cos) = theta.sin_cos();

    let w = mask.width as f64;
    let h = mask.height as f64;
    let corners = [(0.0, 0.0), (w, 0.0), (0.0, h), (w, h)];
    let mut min_x = f64::MAX;
    let mut min_y = f64::MAX;
    let mut max_x = f64::MIN;
    let mut max_y = f64::MIN;
    for (sx, sy) in corners {
        let dx = sx * cos + sy * sin;
        let dy = -sx * sin + sy * cos;
        min_x = min_x.min(dx);
        min_y = min_y.min(dy);
        max_x = max_x.max(dx);
        max_y = max_y.max(dy);
    }

    for ty in min_y.floor() as i32..=max_y.ceil() as i32 {
        for tx in min_x.floor() as i32..=max_x.ceil() as i32 {
            let dx = tx as f64 + 0.5;
            let dy = ty as f64 + 0.5;
            let sx = dx * cos - dy * sin;
            let sy = dx * sin + dy * cos;
            let coverage = mask.get(sx.floor() as i32, sy.floor() as i32);
            if coverage == 0 {
                continue;
            }
            put_covered(image, x + tx, y + ty, color, coverage);
        }
    }
}

fn put_covered(image: &mut RgbaImage, x: i32, y: i32, color: Rgba8, coverage: u8) {
    if x < 0 || y < 0 || x >= image.width() as i32 || y >= image.height() as i32 {
        return;
    }
    let alpha = ((u16::from(coverage) * u16::from(color.a)) / 255) as u8;
    let px = image.get_pixel_mut(x as u32, y as u32);
    if alpha >= px.0[3] {
        *px = image::Rgba([color.r, color.g, color.b, alpha]);
    }
}

/// Deterministic monospace surface: every non-whitespace character is a
/// filled cell sized from the selected font's pixel size. Needs no font
/// files, which keeps metrics stable across platforms; it is the surface
/// used by the test suites and the CLI.
pub struct BlockSurface {
    image: RgbaImage,
    color: Rgba8,
    cell_w: i32,
    cell_h: i32,
}

impl BlockSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width.max(1), height.max(1)),
            color: Rgba8::WHITE,
            cell_w: 4,
            cell_h: 8,
        }
    }

    pub fn cell_size(&self) -> (i32, i32) {
        (self.cell_w, self.cell_h)
    }

    fn raster_line(&self, text: &str) -> CoverageMask {
        let chars: Vec<char> = text.chars().collect();
        let mut mask = CoverageMask::new(
            (chars.len() as u32) * self.cell_w as u32,
            self.cell_h as u32,
        );
        // 1px gap at the right/bottom edge of each cell keeps adjacent
        // glyph blocks distinguishable on small matrices.
        let ink_w = (self.cell_w - 1).max(1);
        let ink_h = (self.cell_h - 1).max(1);
        for (i, c) in chars.iter().enumerate() {
            if c.is_whitespace() {
                continue;
            }
            let x0 = i as i32 * self.cell_w;
            for dy in 0..ink_h {
                for dx in 0..ink_w {
                    mask.set(x0 + dx, dy, 255);
                }
            }
        }
        mask
    }
}

impl TextSurface for BlockSurface {
    fn reset(&mut self) {
        for px in self.image.pixels_mut() {
            *px = image::Rgba([0, 0, 0, 0]);
        }
    }

    fn select_font(&mut self, font: &FontSpec, color: Rgba8) -> LumenResult<()> {
        self.cell_h = (font.size_px.round() as i32).max(1);
        self.cell_w = (self.cell_h / 2).max(1);
        self.color = color;
        Ok(())
    }

    fn measure_text(&self, text: &str) -> (i32, i32) {
        if text.is_empty() {
            return (0, 0);
        }
        (text.chars().count() as i32 * self.cell_w, self.cell_h)
    }

    fn draw_text(&mut self, text: &str, x: i32, y: i32) {
        let mask = self.raster_line(text);
        blit_mask(&mut self.image, &mask, x, y, self.color);
    }

    fn draw_text_rotated(&mut self, text: &str, x: i32, y: i32, degrees: f64) {
        let mask = self.raster_line(text);
        blit_mask_rotated(&mut self.image, &mask, x, y, degrees, self.color);
    }

    fn finalize(&self) -> SurfaceFrame {
        SurfaceFrame {
            image: self.image.clone(),
            has_alpha: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface() -> BlockSurface {
        let mut s = BlockSurface::new(32, 32);
        s.select_font(&FontSpec::parse("test 8"), Rgba8::WHITE)
            .unwrap();
        s
    }

    #[test]
    fn measure_is_monospace() {
        let s = surface();
        let (w1, h1) = s.measure_text("a");
        let (w3, h3) = s.measure_text("abc");
        assert_eq!(w3, 3 * w1);
        assert_eq!(h1, h3);
        assert_eq!(s.measure_text(""), (0, 0));
    }

    #[test]
    fn whitespace_advances_without_ink() {
        let mut s = surface();
        s.draw_text(" ", 0, 0);
        let frame = s.finalize();
        assert!(frame.image.pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn draw_paints_selected_color() {
        let mut s = surface();
        s.select_font(&FontSpec::parse("test 8"), Rgba8::opaque(7, 8, 9))
            .unwrap();
        s.draw_text("X", 2, 3);
        let frame = s.finalize();
        assert_eq!(frame.image.get_pixel(2, 3).0, [7, 8, 9, 255]);
    }

    #[test]
    fn reset_clears_previous_ink() {
        let mut s = surface();
        s.draw_text("X", 0, 0);
        s.reset();
        let frame = s.finalize();
        assert!(frame.image.pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn rotate_90_turns_a_row_into_a_column() {
        let mut s = surface();
        let (w, h) = s.measure_text("AB");
        // Rotating up 90 degrees around (0, h') places the ink in a column
        // of height w above the origin.
        s.draw_text_rotated("AB", 2, 20, 90.0);
        let frame = s.finalize();
        let mut min_y = i32::MAX;
        let mut max_x = i32::MIN;
        for (x, y, p) in frame.image.enumerate_pixels() {
            if p.0[3] != 0 {
                min_y = min_y.min(y as i32);
                max_x = max_x.max(x as i32);
            }
        }
        assert!(min_y <= 20 - w + 2);
        assert!(max_x <= 2 + h);
    }
}
