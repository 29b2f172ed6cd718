use image::RgbaImage;

/// Straight-alpha RGBA8 color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);
    pub const BLACK: Self = Self::new(0, 0, 0, 255);
    pub const WHITE: Self = Self::new(255, 255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }
}

/// Output of a drawing surface after a render pass.
///
/// The image uses the surface's top-down row order; `has_alpha` reports
/// whether the surface produced a real alpha channel or only RGB.
pub struct SurfaceFrame {
    pub image: RgbaImage,
    pub has_alpha: bool,
}

/// A width x height grid of RGBA pixels addressed bottom-up: row 0 is the
/// bottom of the matrix, matching the physical string/matrix layout.
pub struct FrameBuffer {
    width: u32,
    height: u32,
    pixels: Vec<Rgba8>,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            pixels: vec![Rgba8::TRANSPARENT; (width * height) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn clear(&mut self) {
        self.pixels.fill(Rgba8::TRANSPARENT);
    }

    /// Writes one pixel; out-of-range coordinates are ignored.
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Rgba8) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        self.pixels[(y as u32 * self.width + x as u32) as usize] = color;
    }

    pub fn pixel(&self, x: i32, y: i32) -> Rgba8 {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return Rgba8::TRANSPARENT;
        }
        self.pixels[(y as u32 * self.width + x as u32) as usize]
    }

    /// Copies the buffer into a top-down image, undoing the bottom-up row
    /// order for file output.
    pub fn to_image(&self) -> RgbaImage {
        let mut out = RgbaImage::new(self.width, self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                let c = self.pixels[((self.height - y - 1) * self.width + x) as usize];
                out.put_pixel(x, y, image::Rgba([c.r, c.g, c.b, c.a]));
            }
        }
        out
    }
}

/// Copies a finalized surface frame into the buffer, flipping between the
/// surface's top-down rows and the buffer's bottom-up rows. Every buffer
/// pixel is written exactly once.
///
/// When the surface reports no alpha channel, fully-opaque black source
/// pixels are remapped to fully transparent. This is a legacy convention
/// carried over from the original toolkit-backed renderer; surprising, but
/// preserved for compatibility.
pub fn composite_frame(buffer: &mut FrameBuffer, frame: &SurfaceFrame) {
    let w = buffer.width().min(frame.image.width());
    let h = buffer.height().min(frame.image.height());
    for x in 0..buffer.width() {
        for y in 0..buffer.height() {
            if x >= w || y >= h {
                buffer.set_pixel(x as i32, y as i32, Rgba8::TRANSPARENT);
                continue;
            }
            let src = frame.image.get_pixel(x, h - y - 1).0;
            let c = if frame.has_alpha {
                Rgba8::new(src[0], src[1], src[2], src[3])
            } else {
                let mut c = Rgba8::opaque(src[0], src[1], src[2]);
                if c == Rgba8::BLACK {
                    c.a = 0;
                }
                c
            };
            buffer.set_pixel(x as i32, y as i32, c);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_pixel_ignores_out_of_range() {
        let mut buf = FrameBuffer::new(4, 4);
        buf.set_pixel(-1, 0, Rgba8::WHITE);
        buf.set_pixel(0, 4, Rgba8::WHITE);
        assert_eq!(buf.pixel(-1, 0), Rgba8::TRANSPARENT);
        assert_eq!(buf.pixel(0, 0), Rgba8::TRANSPARENT);
    }

    #[test]
    fn composite_flips_vertically() {
        let mut img = RgbaImage::new(2, 2);
        img.put_pixel(0, 0, image::Rgba([10, 20, 30, 255]));
        let frame = SurfaceFrame {
            image: img,
            has_alpha: true,
        };
        let mut buf = FrameBuffer::new(2, 2);
        composite_frame(&mut buf, &frame);
        // Top surface row lands on the top buffer row, which is y = h-1.
        assert_eq!(buf.pixel(0, 1), Rgba8::new(10, 20, 30, 255));
        assert_eq!(buf.pixel(0, 0), Rgba8::TRANSPARENT);
    }

    #[test]
    fn composite_without_alpha_remaps_opaque_black() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, image::Rgba([0, 0, 0, 255]));
        img.put_pixel(1, 0, image::Rgba([0, 0, 1, 255]));
        let frame = SurfaceFrame {
            image: img,
            has_alpha: false,
        };
        let mut buf = FrameBuffer::new(2, 1);
        composite_frame(&mut buf, &frame);
        assert_eq!(buf.pixel(0, 0).a, 0);
        assert_eq!(buf.pixel(1, 0), Rgba8::new(0, 0, 1, 255));
    }

    #[test]
    fn composite_with_alpha_keeps_opaque_black() {
        let mut img = RgbaImage::new(1, 1);
        img.put_pixel(0, 0, image::Rgba([0, 0, 0, 255]));
        let frame = SurfaceFrame {
            image: img,
            has_alpha: true,
        };
        let mut buf = FrameBuffer::new(1, 1);
        composite_frame(&mut buf, &frame);
        assert_eq!(buf.pixel(0, 0), Rgba8::BLACK);
    }

    #[test]
    fn to_image_restores_top_down_order() {
        let mut buf = FrameBuffer::new(1, 2);
        buf.set_pixel(0, 1, Rgba8::WHITE);
        let img = buf.to_image();
        assert_eq!(img.get_pixel(0, 0).0, [255, 255, 255, 255]);
        assert_eq!(img.get_pixel(0, 1).0, [0, 0, 0, 0]);
    }
}
