use std::{collections::HashMap, sync::Arc};

use image::RgbaImage;

use crate::{
    buffer::{Rgba8, SurfaceFrame},
    error::{LumenError, LumenResult},
    font::FontSpec,
    surface::{CoverageMask, TextSurface, blit_mask, blit_mask_rotated},
};

/// Real glyph surface backed by fontdue. Font byte blobs are registered per
/// family name; an unknown family degrades to the first registered font
/// rather than failing the frame.
pub struct GlyphSurface {
    image: RgbaImage,
    fonts: HashMap<String, Arc<fontdue::Font>>,
    fallback: Option<Arc<fontdue::Font>>,
    current: Option<Arc<fontdue::Font>>,
    size_px: f32,
    color: Rgba8,
}

impl GlyphSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width.max(1), height.max(1)),
            fonts: HashMap::new(),
            fallback: None,
            current: None,
            size_px: crate::font::DEFAULT_FONT_SIZE,
            color: Rgba8::WHITE,
        }
    }

    pub fn register_font(&mut self, family: &str, bytes: &[u8]) -> LumenResult<()> {
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(LumenError::surface)?;
        let font = Arc::new(font);
        if self.fallback.is_none() {
            self.fallback = Some(Arc::clone(&font));
        }
        self.fonts.insert(family.to_string(), font);
        Ok(())
    }

    fn line_metrics(&self, font: &fontdue::Font) -> (f32, f32) {
        match font.horizontal_line_metrics(self.size_px) {
            Some(m) => (m.ascent, -m.descent),
            None => (self.size_px, 0.0),
        }
    }

    fn raster_line(&self, font: &fontdue::Font, text: &str) -> (CoverageMask, i32) {
        let (ascent, descent) = self.line_metrics(font);
        let height = (ascent + descent).ceil().max(1.0) as u32;
        let mut width = 0.0f32;
        for c in text.chars() {
            width += font.metrics(c, self.size_px).advance_width;
        }
        let mut mask = CoverageMask::new((width.ceil().max(1.0)) as u32, height);

        let baseline = ascent.round() as i32;
        let mut cursor = 0.0f32;
        for c in text.chars() {
            let (metrics, bitmap) = font.rasterize(c, self.size_px);
            let gx = cursor.round() as i32 + metrics.xmin;
            let gy = baseline - (metrics.height as i32 + metrics.ymin);
            for by in 0..metrics.height {
                for bx in 0..metrics.width {
                    let coverage = bitmap[by * metrics.width + bx];
                    if coverage == 0 {
                        continue;
                    }
                    mask.set(gx + bx as i32, gy + by as i32, coverage);
                }
            }
            cursor += metrics.advance_width;
        }
        (mask, baseline)
    }

    fn current_font(&self) -> Option<Arc<fontdue::Font>> {
        self.current.clone().or_else(|| self.fallback.clone())
    }
}

impl TextSurface for GlyphSurface {
    fn reset(&mut self) {
        for px in self.image.pixels_mut() {
            *px = image::Rgba([0, 0, 0, 0]);
        }
    }

    fn select_font(&mut self, font: &FontSpec, color: Rgba8) -> LumenResult<()> {
        self.size_px = font.size_px.max(1.0);
        self.color = color;
        self.current = match self.fonts.get(&font.family) {
            Some(f) => Some(Arc::clone(f)),
            None => {
                if !font.family.is_empty() {
                    tracing::warn!(family = %font.family, "font family not registered, using fallback");
                }
                self.fallback.clone()
            }
        };
        if self.current.is_none() {
            return Err(LumenError::surface("no fonts registered"));
        }
        Ok(())
    }

    fn measure_text(&self, text: &str) -> (i32, i32) {
        if text.is_empty() {
            return (0, 0);
        }
        let Some(font) = self.current_font() else {
            return (0, 0);
        };
        let mut width = 0.0f32;
        for c in text.chars() {
            width += font.metrics(c, self.size_px).advance_width;
        }
        let (ascent, descent) = self.line_metrics(&font);
        (width.ceil() as i32, (ascent + descent).ceil() as i32)
    }

    fn draw_text(&mut self, text: &str, x: i32, y: i32) {
        let Some(font) = self.current_font() else {
            return;
        };
        let (mask, _) = self.raster_line(&font, text);
        blit_mask(&mut self.image, &mask, x, y, self.color);
    }

    fn draw_text_rotated(&mut self, text: &str, x: i32, y: i32, degrees: f64) {
        let Some(font) = self.current_font() else {
            return;
        };
        let (mask, _) = self.raster_line(&font, text);
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

    #[test]
    fn select_font_without_registration_errors() {
        let mut s = GlyphSurface::new(8, 8);
        let err = s.select_font(&FontSpec::parse("Nope 8"), Rgba8::WHITE);
        assert!(err.is_err());
    }

    #[test]
    fn measure_without_font_is_zero() {
        let s = GlyphSurface::new(8, 8);
        assert_eq!(s.measure_text("hello"), (0, 0));
    }
}
