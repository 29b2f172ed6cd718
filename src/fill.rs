use crate::{
    buffer::{FrameBuffer, Rgba8},
    palette::Palette,
    timer::EffectTimer,
};

/// Edge the fill grows from. `Up` grows from the bottom row toward the
/// top, `Down` from the top, `Left` from the right edge, `Right` from the
/// left.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FillDirection {
    #[default]
    Up,
    Down,
    Left,
    Right,
}

impl FillDirection {
    pub fn from_name(name: &str) -> Self {
        match name {
            "Down" => Self::Down,
            "Left" => Self::Left,
            "Right" => Self::Right,
            _ => Self::Up,
        }
    }
}

/// Typed fill configuration for one frame. `position` is the fill extent
/// in percent; `band_size`/`skip_size` of zero selects the solid
/// time-or-position gradient mode.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct FillSpec {
    pub direction: FillDirection,
    pub position: i32,
    pub band_size: i32,
    pub skip_size: i32,
    pub offset: i32,
    pub offset_in_pixels: bool,
    pub color_by_time: bool,
}

impl Default for FillSpec {
    fn default() -> Self {
        Self {
            direction: FillDirection::Up,
            position: 100,
            band_size: 0,
            skip_size: 0,
            offset: 0,
            offset_in_pixels: true,
            color_by_time: false,
        }
    }
}

/// Band cursor: walks one palette entry forward every `band + skip` rows.
struct BandCursor {
    pos: i32,
    color: usize,
}

impl BandCursor {
    fn advance(&mut self, color_count: usize, cycle: i32) {
        self.pos += 1;
        if self.pos >= cycle {
            self.color = (self.color + 1) % color_count.max(1);
            self.pos = 0;
        }
    }
}

/// Renders a directional fill into the buffer for the current frame.
/// Stateless across frames; everything derives from the timer position
/// and the spec.
#[tracing::instrument(skip_all, fields(direction = ?spec.direction))]
pub fn render_fill(timer: &EffectTimer, spec: &FillSpec, palette: &Palette, buffer: &mut FrameBuffer) {
    let eff_pos = timer.interval_position();
    let pos_pct = f64::from(spec.position) / 100.0;
    let buf_w = buffer.width() as i32;
    let buf_h = buffer.height() as i32;

    let span = match spec.direction {
        FillDirection::Up | FillDirection::Down => buf_h,
        FillDirection::Left | FillDirection::Right => buf_w,
    };
    let mut offset = if spec.offset_in_pixels {
        spec.offset % span
    } else {
        ((span - 1) * spec.offset) / 100
    };
    offset %= span;

    let color_count = palette.len();
    let cycle = spec.band_size + spec.skip_size;
    let mut cursor = BandCursor { pos: 0, color: 0 };

    // Solid mode picks one color for the whole frame from the timeline
    // position; band mode recomputes per row below.
    let mut color = if spec.band_size == 0 {
        palette.color_from_position(eff_pos)
    } else {
        Rgba8::TRANSPARENT
    };

    match spec.direction {
        FillDirection::Up => {
            let limit = f64::from(buf_h) * pos_pct + f64::from(offset);
            let mut y = offset;
            while f64::from(y) < limit {
                if spec.band_size > 0 {
                    color = if cursor.pos < spec.band_size {
                        palette.color(cursor.color)
                    } else {
                        Rgba8::BLACK
                    };
                }
                let mut y_pos = y;
                if y_pos >= buf_h {
                    y_pos -= buf_h;
                }
                if !spec.color_by_time {
                    let pos = f64::from(y) / f64::from(buf_h + offset - 1);
                    color = palette.color_from_position(pos);
                }
                for x in 0..buf_w {
                    buffer.set_pixel(x, y_pos, color);
                }
                if spec.band_size > 0 {
                    cursor.advance(color_count, cycle);
                }
                y += 1;
            }
        }
        FillDirection::Down => {
            let limit = f64::from(buf_h) * (1.0 - pos_pct) - f64::from(offset);
            let mut y = buf_h - 1 - offset;
            while f64::from(y) >= limit {
                if spec.band_size > 0 {
                    color = if cursor.pos < spec.band_size {
                        palette.color(cursor.color)
                    } else {
                        Rgba8::BLACK
                    };
                }
                let mut y_pos = y;
                if y_pos < 0 {
                    y_pos += buf_h;
                }
                if !spec.color_by_time {
                    let pos = 1.0 - f64::from(y) / f64::from(buf_h + offset - 1);
                    color = palette.color_from_position(pos);
                }
                for x in 0..buf_w {
                    buffer.set_pixel(x, y_pos, color);
                }
                if spec.band_size > 0 {
                    cursor.advance(color_count, cycle);
                }
                y -= 1;
            }
        }
        FillDirection::Left => {
            let limit = f64::from(buf_w) * (1.0 - pos_pct) - f64::from(offset);
            let mut x = buf_w - 1 - offset;
            while f64::from(x) >= limit {
                if spec.band_size > 0 {
                    color = if cursor.pos < spec.band_size {
                        palette.color(cursor.color)
                    } else {
                        Rgba8::BLACK
                    };
                }
                let mut x_pos = x;
                if x_pos < 0 {
                    x_pos += buf_w;
                }
                if !spec.color_by_time {
                    let pos = 1.0 - f64::from(x) / f64::from(buf_w + offset - 1);
                    color = palette.color_from_position(pos);
                }
                for y in 0..buf_h {
                    buffer.set_pixel(x_pos, y, color);
                }
                if spec.band_size > 0 {
                    cursor.advance(color_count, cycle);
                }
                x -= 1;
            }
        }
        FillDirection::Right => {
            let limit = f64::from(buf_w) * pos_pct + f64::from(offset);
            let mut x = offset;
            while f64::from(x) < limit {
                if spec.band_size > 0 {
                    color = if cursor.pos < spec.band_size {
                        palette.color(cursor.color)
                    } else {
                        Rgba8::BLACK
                    };
                }
                let mut x_pos = x;
                if x_pos >= buf_w {
                    x_pos -= buf_w;
                }
                if !spec.color_by_time {
                    let pos = f64::from(x) / f64::from(buf_w + offset - 1);
                    color = palette.color_from_position(pos);
                }
                for y in 0..buf_h {
                    buffer.set_pixel(x_pos, y, color);
                }
                if spec.band_size > 0 {
                    cursor.advance(color_count, cycle);
                }
                x += 1;
            }
        }
    }
}
