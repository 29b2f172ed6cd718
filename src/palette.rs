use crate::buffer::Rgba8;

/// Ordered list of effect colors. Lookups always wrap modulo the color
/// count, so any index is valid.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Palette {
    colors: Vec<Rgba8>,
}

impl Palette {
    pub fn new(colors: Vec<Rgba8>) -> Self {
        let colors = if colors.is_empty() {
            vec![Rgba8::WHITE]
        } else {
            colors
        };
        Self { colors }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn color(&self, index: usize) -> Rgba8 {
        self.colors[index % self.colors.len()]
    }

    /// Linear blend between two palette entries, weighted toward the second
    /// by `fraction` in [0,1].
    pub fn blend(&self, first: usize, second: usize, fraction: f64) -> Rgba8 {
        let a = self.color(first);
        let b = self.color(second);
        let t = fraction.clamp(0.0, 1.0);
        let mix = |x: u8, y: u8| -> u8 {
            (f64::from(x) + (f64::from(y) - f64::from(x)) * t).round() as u8
        };
        Rgba8::new(mix(a.r, b.r), mix(a.g, b.g), mix(a.b, b.b), mix(a.a, b.a))
    }

    /// Maps a fractional position in [0,1] onto the palette, blending
    /// between the two adjacent entries. The last entry is returned
    /// unblended at the end of the range.
    pub fn color_from_position(&self, pos: f64) -> Rgba8 {
        let colorcnt = self.colors.len();
        let color_val = pos * (colorcnt as f64 - 1.0);
        let color_int = color_val.max(0.0) as usize;
        let color_pct = color_val - color_int as f64;
        let color2 = (color_int + 1).min(colorcnt - 1);
        if color_int < color2 {
            self.blend(color_int, color2, color_pct.min(1.0))
        } else {
            self.color(color2)
        }
    }
}
