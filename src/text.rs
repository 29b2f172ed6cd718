use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use crate::{
    buffer::{FrameBuffer, Rgba8, composite_frame},
    error::LumenResult,
    font::FontCache,
    layout::{HAlign, Rect, VAlign, draw_label, measure_multiline},
    palette::Palette,
    surface::TextSurface,
    timer::EffectTimer,
};

pub const MAX_TEXT_LINES: usize = 4;

const INVALID_DATE_TEXT: &str = "invalid date";

/// Motion/orientation mode governing how a text line enters and exits the
/// buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TextDirection {
    Left,
    Right,
    Up,
    Down,
    #[default]
    None,
    UpLeft,
    DownLeft,
    UpRight,
    DownRight,
    WaveyLrUpDown,
    Vector,
}

impl TextDirection {
    pub fn from_name(name: &str) -> Self {
        match name {
            "left" => Self::Left,
            "right" => Self::Right,
            "up" => Self::Up,
            "down" => Self::Down,
            "up-left" => Self::UpLeft,
            "down-left" => Self::DownLeft,
            "up-right" => Self::UpRight,
            "down-right" => Self::DownRight,
            "wavey L-R/up-down" => Self::WaveyLrUpDown,
            "vector" => Self::Vector,
            _ => Self::None,
        }
    }

    fn going_left(self) -> bool {
        matches!(self, Self::Left | Self::UpLeft | Self::DownLeft)
    }

    fn going_right(self) -> bool {
        matches!(self, Self::Right | Self::UpRight | Self::DownRight)
    }

    fn going_up(self) -> bool {
        matches!(self, Self::Up | Self::UpLeft | Self::UpRight)
    }

    fn going_down(self) -> bool {
        matches!(self, Self::Down | Self::DownLeft | Self::DownRight)
    }
}

/// Character-orientation transform applied to the resolved message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TextTransform {
    #[default]
    None,
    VerticalUp,
    VerticalDown,
    RotateUp45,
    RotateUp90,
    RotateDown45,
    RotateDown90,
}

impl TextTransform {
    pub fn from_name(name: &str) -> Self {
        match name {
            "vert text up" => Self::VerticalUp,
            "vert text down" => Self::VerticalDown,
            "rotate up 45" => Self::RotateUp45,
            "rotate up 90" => Self::RotateUp90,
            "rotate down 45" => Self::RotateDown45,
            "rotate down 90" => Self::RotateDown90,
            _ => Self::None,
        }
    }
}

/// Text-resolution submode. The date-based modes expect an RFC-822 date in
/// the template; free-format additionally embeds a duration format string
/// between delimiter characters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CountdownMode {
    #[default]
    None,
    Seconds,
    ToDateDhms,
    ToDateHms,
    ToDateMinOrSec,
    ToDateSeconds,
    FreeFormat,
}

impl CountdownMode {
    pub fn from_name(name: &str) -> Self {
        match name {
            "seconds" => Self::Seconds,
            "to date 'd h m s'" => Self::ToDateDhms,
            "to date 'h:m:s'" => Self::ToDateHms,
            "to date 'm' or 's'" => Self::ToDateMinOrSec,
            "to date 's'" => Self::ToDateSeconds,
            "!to date!%fmt" => Self::FreeFormat,
            _ => Self::None,
        }
    }

    fn is_to_date(self) -> bool {
        matches!(
            self,
            Self::ToDateDhms
                | Self::ToDateHms
                | Self::ToDateMinOrSec
                | Self::ToDateSeconds
                | Self::FreeFormat
        )
    }
}

/// One text line's full configuration for a frame. Resolved from the flat
/// settings map upstream; the engine only ever sees typed fields.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TextLineSpec {
    pub template: String,
    pub font: String,
    pub direction: TextDirection,
    pub transform: TextTransform,
    pub countdown: CountdownMode,
    pub center: bool,
    pub speed: i64,
    pub pixel_offsets: bool,
    pub start_x: i32,
    pub start_y: i32,
    pub end_x: i32,
    pub end_y: i32,
}

impl Default for TextLineSpec {
    fn default() -> Self {
        Self {
            template: String::new(),
            font: String::new(),
            direction: TextDirection::None,
            transform: TextTransform::None,
            countdown: CountdownMode::None,
            center: false,
            speed: 10,
            pixel_offsets: false,
            start_x: 0,
            start_y: 0,
            end_x: 0,
            end_y: 0,
        }
    }
}

/// Shared maximum bounding box across lines, produced by the measure phase
/// and consumed by the render phase when line synchronization is on.
#[derive(Clone, Copy, Debug, Default)]
pub struct SyncedLayout {
    size: Option<(i32, i32)>,
}

impl SyncedLayout {
    pub fn merge(&mut self, width: i32, height: i32) {
        self.size = Some(match self.size {
            None => (width, height),
            Some((w, h)) => (w.max(width), h.max(height)),
        });
    }

    pub fn width(&self) -> Option<i32> {
        self.size.map(|(w, _)| w)
    }
}

/// Per-line measured layout produced by the measure phase.
#[derive(Clone, Debug)]
pub struct LineLayout {
    msg: String,
    width: i32,
    height: i32,
    rotation: f64,
    xoffset: i32,
    yoffset: i32,
    extra_left: i32,
    extra_right: i32,
    extra_up: i32,
    extra_down: i32,
    lineh: i32,
    invalid_date: bool,
}

/// Output of the measure phase: one layout per line plus the merged box.
pub struct MeasuredText {
    layouts: Vec<Option<LineLayout>>,
    synced: SyncedLayout,
}

impl MeasuredText {
    /// The merged maximum bounding box across all measured lines.
    pub fn synced(&self) -> SyncedLayout {
        self.synced
    }
}

struct Resolved {
    msg: String,
    invalid_date: bool,
}

/// Per-frame text renderer. Owns the persistent per-line countdown
/// deadlines for one effect instance; restart the effect by calling
/// [`TextEngine::restart`].
pub struct TextEngine {
    deadlines: [i64; MAX_TEXT_LINES],
    line_sync: bool,
}

impl Default for TextEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextEngine {
    pub fn new() -> Self {
        Self {
            deadlines: [0; MAX_TEXT_LINES],
            line_sync: true,
        }
    }

    /// Turns the shared-width line synchronization on or off.
    pub fn set_line_sync(&mut self, on: bool) {
        self.line_sync = on;
    }

    /// Re-initializes the persistent countdown state for a restarted
    /// effect instance.
    pub fn restart(&mut self) {
        self.deadlines = [0; MAX_TEXT_LINES];
    }

    /// Renders up to four text lines into the buffer: measure phase,
    /// render phase, then the composite with the vertical flip.
    #[allow(clippy::too_many_arguments)]
    #[tracing::instrument(skip_all, fields(lines = specs.len()))]
    pub fn render_text(
        &mut self,
        timer: &EffectTimer,
        now: DateTime<Utc>,
        specs: &[TextLineSpec],
        palette: &Palette,
        fonts: &FontCache,
        surface: &mut dyn TextSurface,
        buffer: &mut FrameBuffer,
    ) -> LumenResult<()> {
        surface.reset();
        let measured = self.measure_lines(timer, now, specs, palette, fonts, surface)?;
        self.render_measured(timer, specs, measured, palette, fonts, surface, buffer)?;
        composite_frame(buffer, &surface.finalize());
        Ok(())
    }

    /// Measure phase: resolves every line's message and bounding box and
    /// merges the shared maximum box. Nothing is drawn.
    pub fn measure_lines(
        &mut self,
        timer: &EffectTimer,
        now: DateTime<Utc>,
        specs: &[TextLineSpec],
        palette: &Palette,
        fonts: &FontCache,
        surface: &mut dyn TextSurface,
    ) -> LumenResult<MeasuredText> {
        let mut layouts = Vec::with_capacity(specs.len().min(MAX_TEXT_LINES));
        let mut synced = SyncedLayout::default();

        for (idx, spec) in specs.iter().take(MAX_TEXT_LINES).enumerate() {
            surface.select_font(&fonts.resolve(&spec.font), line_color(palette, idx))?;
            let layout = self.layout_line(idx, spec, timer, now, surface);
            if let Some(l) = &layout {
                if !l.invalid_date {
                    synced.merge(l.width, l.height);
                }
            }
            layouts.push(layout);
        }

        Ok(MeasuredText { layouts, synced })
    }

    /// Render phase: draws every measured line, overriding each line's
    /// width with the synchronized width (height stays per-line).
    #[allow(clippy::too_many_arguments)]
    pub fn render_measured(
        &mut self,
        timer: &EffectTimer,
        specs: &[TextLineSpec],
        measured: MeasuredText,
        palette: &Palette,
        fonts: &FontCache,
        surface: &mut dyn TextSurface,
        buffer: &FrameBuffer,
    ) -> LumenResult<()> {
        let (buf_w, buf_h) = (buffer.width() as i64, buffer.height() as i64);

        for (idx, (spec, layout)) in specs
            .iter()
            .take(MAX_TEXT_LINES)
            .zip(measured.layouts)
            .enumerate()
        {
            let Some(mut layout) = layout else {
                continue;
            };
            surface.select_font(&fonts.resolve(&spec.font), line_color(palette, idx))?;

            if layout.invalid_date {
                // Degraded line: static centered text, no motion.
                draw_label(
                    surface,
                    &layout.msg,
                    Rect::new(0, 0, buf_w as i32, buf_h as i32),
                    HAlign::Center,
                    VAlign::Center,
                );
                continue;
            }

            if self.line_sync {
                if let Some(w) = measured.synced.width() {
                    layout.width = w;
                }
            }

            draw_line(timer, spec, &layout, buf_w, buf_h, surface);
        }
        Ok(())
    }

    /// Resolves one line's message and measures its (possibly rotated)
    /// bounding box and whitespace-compensation extents.
    fn layout_line(
        &mut self,
        idx: usize,
        spec: &TextLineSpec,
        timer: &EffectTimer,
        now: DateTime<Utc>,
        surface: &dyn TextSurface,
    ) -> Option<LineLayout> {
        if spec.template.is_empty() {
            return None;
        }

        let resolved = self.resolve_message(idx, spec, timer, now);
        if resolved.invalid_date {
            return Some(LineLayout {
                msg: resolved.msg,
                width: 0,
                height: 0,
                rotation: 0.0,
                xoffset: 0,
                yoffset: 0,
                extra_left: 0,
                extra_right: 0,
                extra_up: 0,
                extra_down: 0,
                lineh: 0,
                invalid_date: true,
            });
        }

        let msg = apply_vertical_transform(spec.transform, &resolved.msg);

        let size = measure_multiline(surface, &msg);
        let dir = spec.direction;
        let extra_left = if dir.going_left() {
            size.width - measure_multiline(surface, msg.trim_start()).width
        } else {
            0
        };
        let extra_right = if dir.going_right() {
            size.width - measure_multiline(surface, msg.trim_end()).width
        } else {
            0
        };
        let extra_down = if dir.going_down() {
            size.height - measure_multiline(surface, msg.trim_end_matches('\n')).height
        } else {
            0
        };
        let extra_up = if dir.going_up() {
            size.height - measure_multiline(surface, msg.trim_start_matches('\n')).height
        } else {
            0
        };
        let lineh = measure_multiline(surface, "X").height;

        let (mut width, mut height) = (size.width, size.height);
        let mut rotation = 0.0;
        let mut xoffset = 0;
        let mut yoffset = 0;
        match spec.transform {
            TextTransform::RotateUp45 => {
                rotation = 45.0;
                yoffset = (0.707 * f64::from(height)) as i32;
                let d = (0.707 * f64::from(width + height)) as i32;
                width = d;
                height = d;
            }
            TextTransform::RotateUp90 => {
                rotation = 90.0;
                std::mem::swap(&mut width, &mut height);
            }
            TextTransform::RotateDown45 => {
                rotation = -45.0;
                xoffset = (0.707 * f64::from(height)) as i32;
                let d = (0.707 * f64::from(width + height)) as i32;
                width = d;
                height = d;
                yoffset = d;
            }
            TextTransform::RotateDown90 => {
                rotation = -90.0;
                xoffset = height;
                yoffset = width;
                std::mem::swap(&mut width, &mut height);
            }
            _ => {}
        }

        Some(LineLayout {
            msg,
            width,
            height,
            rotation,
            xoffset,
            yoffset,
            extra_left,
            extra_right,
            extra_up,
            extra_down,
            lineh,
            invalid_date: false,
        })
    }

    /// Step 1 of the line pipeline: the countdown state machine.
    fn resolve_message(
        &mut self,
        idx: usize,
        spec: &TextLineSpec,
        timer: &EffectTimer,
        now: DateTime<Utc>,
    ) -> Resolved {
        let state = timer.state(spec.speed);

        match spec.countdown {
            CountdownMode::None => Resolved {
                msg: spec.template.replace("\\n", "\n"),
                invalid_date: false,
            },
            CountdownMode::Seconds => {
                if state == 0 {
                    // Capture the deadline on the first frame: n seconds at
                    // 20 ticks/second, +19 so the first displayed value
                    // holds for a full second.
                    let n = spec.template.trim().parse::<i64>().unwrap_or(0);
                    self.deadlines[idx] = timer.cur_period + n * 20 + 19;
                }
                let seconds = ((self.deadlines[idx] - timer.cur_period) / 20).max(0);
                Resolved {
                    msg: seconds.to_string(),
                    invalid_date: false,
                }
            }
            mode if mode.is_to_date() => {
                let (date_str, fmt) = if mode == CountdownMode::FreeFormat {
                    extract_free_format(&spec.template)
                } else {
                    (spec.template.as_str(), "")
                };

                // Recompute once per second; reuse the cached remainder
                // between ticks.
                let remaining = if state % 20 == 0 {
                    let secs = match DateTime::parse_from_rfc2822(date_str.trim()) {
                        Ok(dt) => (dt.with_timezone(&Utc) - now).num_seconds().max(0),
                        Err(err) => {
                            tracing::debug!(line = idx, %err, "countdown date did not parse");
                            0
                        }
                    };
                    self.deadlines[idx] = secs;
                    secs
                } else {
                    self.deadlines[idx]
                };

                if remaining == 0 {
                    return Resolved {
                        msg: INVALID_DATE_TEXT.to_string(),
                        invalid_date: true,
                    };
                }

                let days = remaining / 60 / 60 / 24;
                let hours = (remaining / 60 / 60) % 24;
                let minutes = (remaining / 60) % 60;
                let seconds = remaining % 60;
                let msg = match mode {
                    CountdownMode::ToDateDhms => {
                        format!("{days}d {hours}h {minutes}m {seconds}s")
                    }
                    CountdownMode::ToDateHms => format!("{hours} : {minutes} : {seconds}"),
                    CountdownMode::ToDateSeconds => {
                        format!("{}", 60 * 60 * hours + 60 * minutes + seconds)
                    }
                    CountdownMode::FreeFormat => format_duration(remaining, fmt),
                    _ => {
                        // Minutes-or-seconds: plain seconds under five
                        // minutes, whole minutes above.
                        if 60 * hours + minutes < 5 {
                            format!("{}", 60 * 60 * hours + 60 * minutes + seconds)
                        } else {
                            format!("{} m", 60 * hours + minutes)
                        }
                    }
                };
                Resolved {
                    msg,
                    invalid_date: false,
                }
            }
            _ => unreachable!("countdown mode arms are exhaustive"),
        }
    }
}

fn line_color(palette: &Palette, idx: usize) -> Rgba8 {
    if palette.len() > idx {
        palette.color(idx)
    } else {
        palette.color(0)
    }
}

/// Splits a free-format template into (date, duration format). The first
/// character is the delimiter; the date runs to its next occurrence and
/// the format string is whatever follows. Templates shorter than four
/// characters are treated as a bare date. The parsing rule is literal and
/// fragile if the delimiter reappears inside the format string; that
/// behavior is kept as-is.
fn extract_free_format(template: &str) -> (&str, &str) {
    if template.chars().count() < 4 {
        return (template, "");
    }
    let mut chars = template.chars();
    let delim = match chars.next() {
        Some(c) => c,
        None => return (template, ""),
    };
    let rest = &template[delim.len_utf8()..];
    match rest.find(delim) {
        Some(pos) => (&rest[..pos], &rest[pos + delim.len_utf8()..]),
        None => (rest, ""),
    }
}

fn apply_vertical_transform(transform: TextTransform, msg: &str) -> String {
    match transform {
        TextTransform::VerticalUp => {
            let mut out = String::with_capacity(msg.len() * 2);
            for c in msg.chars().rev() {
                out.push(c);
                out.push('\n');
            }
            out
        }
        TextTransform::VerticalDown => {
            let mut out = String::with_capacity(msg.len() * 2);
            for c in msg.chars() {
                out.push(c);
                out.push('\n');
            }
            out
        }
        _ => msg.to_string(),
    }
}

/// Duration formatter for the free-format countdown. Tokens: %E weeks,
/// %D days, %H hours, %M minutes, %S seconds, %l milliseconds, %% a
/// literal percent. A token prints its total count unless a larger unit
/// appeared earlier in the format string, in which case it prints the
/// zero-padded remainder.
fn format_duration(total_secs: i64, fmt: &str) -> String {
    const MS_PER_SEC: i64 = 1000;
    const MS_PER_MIN: i64 = 60 * MS_PER_SEC;
    const MS_PER_HOUR: i64 = 60 * MS_PER_MIN;
    const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;
    const MS_PER_WEEK: i64 = 7 * MS_PER_DAY;

    let total_ms = total_secs.saturating_mul(MS_PER_SEC);
    let mut out = String::new();
    let mut biggest_rank: Option<u8> = None;
    let mut chars = fmt.chars();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('%') => out.push('%'),
            Some(spec @ ('E' | 'D' | 'H' | 'M' | 'S' | 'l')) => {
                let (rank, unit_ms, wrap, pad) = match spec {
                    'E' => (5u8, MS_PER_WEEK, 0, 0),
                    'D' => (4, MS_PER_DAY, 7, 2),
                    'H' => (3, MS_PER_HOUR, 24, 2),
                    'M' => (2, MS_PER_MIN, 60, 2),
                    'S' => (1, MS_PER_SEC, 60, 2),
                    _ => (0, 1, 1000, 3),
                };
                let remainder = matches!(biggest_rank, Some(b) if b > rank);
                let mut n = total_ms / unit_ms;
                if remainder && wrap > 0 {
                    n %= wrap;
                }
                if remainder {
                    let _ = write!(out, "{n:0pad$}", pad = pad as usize);
                } else {
                    let _ = write!(out, "{n}");
                }
                biggest_rank = Some(biggest_rank.map_or(rank, |b| b.max(rank)));
            }
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }
    out
}

/// Linear back-and-forth over `range`: rising on odd cycles, falling on
/// even ones.
fn zigzag(value: i64, range: i64) -> i64 {
    if range <= 0 {
        return 0;
    }
    if (value / range) & 1 == 1 {
        value % range
    } else {
        range - value % range - 1
    }
}

/// Step 6: positions one measured line for the current frame and draws it.
/// All the /8, /16 fixed-point scalars are load-bearing; scroll speed and
/// settle points depend on the exact ratios.
fn draw_line(
    timer: &EffectTimer,
    spec: &TextLineSpec,
    layout: &LineLayout,
    buf_w: i64,
    buf_h: i64,
    surface: &mut dyn TextSurface,
) {
    let state = timer.state(spec.speed);
    let txtwidth = i64::from(layout.width);
    let totwidth = buf_w + txtwidth;
    let totheight = buf_h + i64::from(layout.height);

    let (offset_left, offset_top) = if spec.pixel_offsets {
        (i64::from(spec.start_x), -i64::from(spec.start_y))
    } else {
        (
            i64::from(spec.start_x) * buf_w / 100,
            -i64::from(spec.start_y) * buf_h / 100,
        )
    };

    let xlimit = totwidth * 8 + 1;
    let ylimit = totheight * 8 + 1;

    let extra_left = i64::from(layout.extra_left);
    let extra_right = i64::from(layout.extra_right);
    let extra_up = i64::from(layout.extra_up);
    let extra_down = i64::from(layout.extra_down);
    let lineh = i64::from(layout.lineh);
    let center = spec.center;

    // Per-axis wrapped motion with the optional settle-at-center clamp.
    let x_leftward = |clamp: bool| {
        if clamp {
            (xlimit / 16 - state / 8).max(-extra_left / 2)
        } else {
            xlimit / 16 - (state % xlimit) / 8
        }
    };
    let x_rightward = |clamp: bool| {
        if clamp {
            (state / 8 - xlimit / 16).min(extra_right / 2)
        } else {
            (state % xlimit) / 8 - xlimit / 16
        }
    };
    let y_upward = |clamp: bool| {
        if clamp {
            (ylimit / 16 - state / 8).max(lineh / 2 - extra_up / 2)
        } else {
            ylimit / 16 - (state % ylimit) / 8
        }
    };
    let y_downward = |clamp: bool| {
        if clamp {
            (state / 8 - ylimit / 16).min(-lineh / 2 + extra_down / 2)
        } else {
            (state % ylimit) / 8 - ylimit / 16
        }
    };

    if layout.rotation == 0.0 {
        let (dx, dy) = match spec.direction {
            TextDirection::Vector => {
                let position = timer.interval_position();
                let (mut ex, mut ey) = if spec.pixel_offsets {
                    (f64::from(spec.end_x), -f64::from(spec.end_y))
                } else {
                    (
                        f64::from(spec.end_x) * buf_w as f64 / 100.0,
                        -f64::from(spec.end_y) * buf_h as f64 / 100.0,
                    )
                };
                ex = offset_left as f64 + (ex - offset_left as f64) * position;
                ey = offset_top as f64 + (ey - offset_top as f64) * position;
                (ex as i64, ey as i64)
            }
            TextDirection::Left => (x_leftward(center), offset_top),
            TextDirection::Right => (x_rightward(center), offset_top),
            TextDirection::Up => (offset_left, y_upward(center)),
            TextDirection::Down => (offset_left, y_downward(center)),
            TextDirection::UpLeft => (x_leftward(center), y_upward(center)),
            TextDirection::DownLeft => (x_leftward(center), y_downward(center)),
            TextDirection::UpRight => (x_rightward(center), y_upward(center)),
            TextDirection::DownRight => (x_rightward(center), y_downward(center)),
            TextDirection::WaveyLrUpDown => {
                // Half-height bounce, with the vertical motion slowed to a
                // quarter of the horizontal state.
                let wave = zigzag(state / 4, totheight) / 2 - totheight / 4;
                if center {
                    (x_rightward(true), wave.max(-extra_left / 2))
                } else {
                    (x_leftward(false), wave)
                }
            }
            TextDirection::None => (0, offset_top),
        };

        let mut rect = Rect::new(0, 0, buf_w as i32, buf_h as i32);
        rect.offset(dx as i32, dy as i32);
        draw_label(surface, &layout.msg, rect, HAlign::Center, VAlign::Center);
        return;
    }

    // Rotated text bypasses the label layout: absolute draw coordinates
    // with per-rotation anchor offsets.
    let rotation = layout.rotation;
    let xoffset = i64::from(layout.xoffset);
    let yoffset = i64::from(layout.yoffset);
    let sx = (state % xlimit) / 8;
    let sy = (state % ylimit) / 8;
    let height = i64::from(layout.height);

    let (x, y) = match spec.direction {
        TextDirection::Vector => {
            let position = timer.interval_position();
            let (mut ex, mut ey) = if spec.pixel_offsets {
                (f64::from(spec.end_x), -f64::from(spec.end_y))
            } else {
                (
                    f64::from(spec.end_x) * buf_w as f64 / 100.0,
                    -f64::from(spec.end_y) * buf_h as f64 / 100.0,
                )
            };
            ex = offset_left as f64 + (ex - offset_left as f64) * position;
            ey = offset_top as f64 + (ey - offset_top as f64) * position;
            let cx = (buf_w / 2) as f64;
            let cy = (buf_h / 2) as f64;
            if rotation > 50.0 {
                (
                    (cx + ex - (txtwidth / 2) as f64) as i64,
                    (cy + ey + (height / 2) as f64) as i64,
                )
            } else if rotation > 0.0 {
                (
                    (cx + ex - (txtwidth / 2) as f64) as i64,
                    (cy + ey + (yoffset * 2) as f64) as i64,
                )
            } else if rotation < -50.0 {
                (
                    (cx + ex + (txtwidth / 2) as f64) as i64,
                    (cy + ey - (height / 2) as f64) as i64,
                )
            } else {
                (
                    (cx + ex - (txtwidth / 2) as f64 + xoffset as f64) as i64,
                    (cy + ey - (height / 2) as f64) as i64,
                )
            }
        }
        TextDirection::Left => (buf_w - sx + xoffset, offset_top),
        TextDirection::Right => (sx - txtwidth + xoffset, offset_top),
        TextDirection::Up => (offset_left, totheight - sy - yoffset),
        TextDirection::Down => (offset_left, sy - yoffset),
        TextDirection::UpLeft => (buf_w - sx + xoffset, totheight - sy - yoffset),
        TextDirection::DownLeft => (buf_w - sx + xoffset, sy - yoffset),
        TextDirection::UpRight => (sx - txtwidth + xoffset, totheight - sy - yoffset),
        TextDirection::DownRight => (sx - txtwidth + xoffset, sy - yoffset),
        _ => (0, offset_top),
    };

    surface.draw_text_rotated(&layout.msg, x as i32, y as i32, rotation);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn timer_at(cur: i64) -> EffectTimer {
        EffectTimer {
            cur_period: cur,
            start_period: 0,
            end_period: 200,
            frame_time_ms: 50,
        }
    }

    fn now_utc() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 6, 1, 12, 0, 0).unwrap()
    }

    fn spec_with(countdown: CountdownMode, template: &str) -> TextLineSpec {
        TextLineSpec {
            template: template.to_string(),
            countdown,
            speed: 1,
            ..TextLineSpec::default()
        }
    }

    #[test]
    fn static_text_unescapes_newlines() {
        let mut engine = TextEngine::new();
        let spec = spec_with(CountdownMode::None, "ab\\ncd");
        let r = engine.resolve_message(0, &spec, &timer_at(0), now_utc());
        assert_eq!(r.msg, "ab\ncd");
    }

    #[test]
    fn seconds_countdown_decrements_every_twenty_ticks() {
        let mut engine = TextEngine::new();
        let spec = spec_with(CountdownMode::Seconds, "3");

        let mut shown = Vec::new();
        for period in 0..80 {
            let r = engine.resolve_message(0, &spec, &timer_at(period), now_utc());
            shown.push(r.msg.parse::<i64>().unwrap());
        }
        assert_eq!(shown[0], 3);
        assert_eq!(shown[19], 3);
        assert_eq!(shown[20], 2);
        assert_eq!(shown[39], 2);
        assert_eq!(shown[79], 0);
        assert!(shown.windows(2).all(|w| w[1] <= w[0]));
        assert!(shown.iter().all(|&s| s >= 0));
    }

    #[test]
    fn seconds_countdown_never_goes_negative() {
        let mut engine = TextEngine::new();
        let spec = spec_with(CountdownMode::Seconds, "1");
        engine.resolve_message(0, &spec, &timer_at(0), now_utc());
        let r = engine.resolve_message(0, &spec, &timer_at(500), now_utc());
        assert_eq!(r.msg, "0");
    }

    #[test]
    fn unparseable_seconds_template_counts_from_zero() {
        let mut engine = TextEngine::new();
        let spec = spec_with(CountdownMode::Seconds, "pears");
        let r = engine.resolve_message(0, &spec, &timer_at(0), now_utc());
        assert_eq!(r.msg, "0");
    }

    #[test]
    fn dhms_formats_a_day_hour_minute_second() {
        let mut engine = TextEngine::new();
        // 90061s = 1d 1h 1m 1s ahead of `now`.
        let spec = spec_with(CountdownMode::ToDateDhms, "Tue, 02 Jun 2020 13:01:01 +0000");
        let r = engine.resolve_message(0, &spec, &timer_at(0), now_utc());
        assert_eq!(r.msg, "1d 1h 1m 1s");
        assert!(!r.invalid_date);
    }

    #[test]
    fn hms_formats_colon_separated() {
        let mut engine = TextEngine::new();
        // 3661s ahead.
        let spec = spec_with(CountdownMode::ToDateHms, "Mon, 01 Jun 2020 13:01:01 +0000");
        let r = engine.resolve_message(0, &spec, &timer_at(0), now_utc());
        assert_eq!(r.msg, "1 : 1 : 1");
    }

    #[test]
    fn min_or_sec_switches_at_five_minutes() {
        let mut engine = TextEngine::new();
        let near = spec_with(CountdownMode::ToDateMinOrSec, "Mon, 01 Jun 2020 12:04:00 +0000");
        let r = engine.resolve_message(0, &near, &timer_at(0), now_utc());
        assert_eq!(r.msg, "240");

        let far = spec_with(CountdownMode::ToDateMinOrSec, "Mon, 01 Jun 2020 12:06:00 +0000");
        let r = engine.resolve_message(1, &far, &timer_at(0), now_utc());
        assert_eq!(r.msg, "6 m");
    }

    #[test]
    fn to_date_seconds_ignores_whole_days() {
        let mut engine = TextEngine::new();
        // 1d 0h 0m 10s ahead; the seconds display drops the day part.
        let spec = spec_with(CountdownMode::ToDateSeconds, "Tue, 02 Jun 2020 12:00:10 +0000");
        let r = engine.resolve_message(0, &spec, &timer_at(0), now_utc());
        assert_eq!(r.msg, "10");
    }

    #[test]
    fn bad_date_degrades_to_invalid_date() {
        let mut engine = TextEngine::new();
        for mode in [
            CountdownMode::ToDateDhms,
            CountdownMode::ToDateHms,
            CountdownMode::ToDateMinOrSec,
            CountdownMode::ToDateSeconds,
        ] {
            let spec = spec_with(mode, "not a date");
            let r = engine.resolve_message(0, &spec, &timer_at(0), now_utc());
            assert_eq!(r.msg, INVALID_DATE_TEXT);
            assert!(r.invalid_date);
        }
    }

    #[test]
    fn past_date_is_treated_as_invalid() {
        let mut engine = TextEngine::new();
        let spec = spec_with(CountdownMode::ToDateDhms, "Fri, 01 Jun 2018 12:00:00 +0000");
        let r = engine.resolve_message(0, &spec, &timer_at(0), now_utc());
        assert!(r.invalid_date);
    }

    #[test]
    fn date_countdown_reuses_cached_value_between_ticks() {
        let mut engine = TextEngine::new();
        let spec = spec_with(CountdownMode::ToDateHms, "Mon, 01 Jun 2020 13:01:01 +0000");
        let first = engine.resolve_message(0, &spec, &timer_at(0), now_utc());
        // Off-tick frame with a different `now`: cached remainder wins.
        let later = Utc.with_ymd_and_hms(2020, 6, 1, 12, 30, 0).unwrap();
        let second = engine.resolve_message(0, &spec, &timer_at(1), later);
        assert_eq!(first.msg, second.msg);
    }

    #[test]
    fn free_format_extracts_date_and_format() {
        let (date, fmt) = extract_free_format("!Wed, 02 Oct 2030 15:00:00 +0200!%H:%M");
        assert_eq!(date, "Wed, 02 Oct 2030 15:00:00 +0200");
        assert_eq!(fmt, "%H:%M");
    }

    #[test]
    fn free_format_short_template_is_a_bare_date() {
        assert_eq!(extract_free_format("abc"), ("abc", ""));
    }

    #[test]
    fn free_format_without_second_delimiter_has_no_format() {
        assert_eq!(extract_free_format("!only a date"), ("only a date", ""));
    }

    #[test]
    fn free_format_renders_with_custom_tokens() {
        let mut engine = TextEngine::new();
        let spec = spec_with(
            CountdownMode::FreeFormat,
            "!Mon, 01 Jun 2020 13:01:01 +0000!%H h %M min",
        );
        let r = engine.resolve_message(0, &spec, &timer_at(0), now_utc());
        assert_eq!(r.msg, "1 h 01 min");
    }

    #[test]
    fn synced_layout_merges_componentwise_maximum() {
        let mut a = SyncedLayout::default();
        assert_eq!(a.width(), None);
        a.merge(4, 16);
        a.merge(16, 8);
        assert_eq!(a.width(), Some(16));

        let mut b = SyncedLayout::default();
        b.merge(16, 8);
        b.merge(4, 16);
        assert_eq!(b.width(), a.width());
    }

    #[test]
    fn vertical_up_reverses_and_stacks() {
        assert_eq!(
            apply_vertical_transform(TextTransform::VerticalUp, "AB"),
            "B\nA\n"
        );
    }

    #[test]
    fn vertical_down_stacks_in_order() {
        assert_eq!(
            apply_vertical_transform(TextTransform::VerticalDown, "AB"),
            "A\nB\n"
        );
    }

    #[test]
    fn format_duration_totals_without_larger_units() {
        assert_eq!(format_duration(3661, "%M"), "61");
        assert_eq!(format_duration(3661, "%S"), "3661");
    }

    #[test]
    fn format_duration_remainder_after_larger_unit() {
        assert_eq!(format_duration(90061, "%D %H:%M:%S"), "1 01:01:01");
    }

    #[test]
    fn format_duration_literal_percent_and_unknown_tokens() {
        assert_eq!(format_duration(0, "100%%"), "100%");
        assert_eq!(format_duration(0, "%q"), "%q");
    }

    #[test]
    fn format_duration_weeks() {
        assert_eq!(format_duration(8 * 86400, "%E w %D d"), "1 w 01 d");
    }

    #[test]
    fn zigzag_bounces_between_zero_and_range() {
        let range = 4;
        let shape: Vec<i64> = (0..12).map(|v| zigzag(v, range)).collect();
        assert_eq!(shape, vec![3, 2, 1, 0, 0, 1, 2, 3, 3, 2, 1, 0]);
    }

    #[test]
    fn direction_names_round_trip() {
        assert_eq!(TextDirection::from_name("up-left"), TextDirection::UpLeft);
        assert_eq!(
            TextDirection::from_name("wavey L-R/up-down"),
            TextDirection::WaveyLrUpDown
        );
        assert_eq!(TextDirection::from_name("bogus"), TextDirection::None);
        assert_eq!(
            CountdownMode::from_name("to date 'd h m s'"),
            CountdownMode::ToDateDhms
        );
        assert_eq!(
            TextTransform::from_name("rotate down 90"),
            TextTransform::RotateDown90
        );
    }

    #[test]
    fn spec_json_roundtrip() {
        let spec = TextLineSpec {
            template: "hello".to_string(),
            direction: TextDirection::UpRight,
            transform: TextTransform::RotateUp45,
            countdown: CountdownMode::Seconds,
            center: true,
            ..TextLineSpec::default()
        };
        let s = serde_json::to_string(&spec).unwrap();
        let de: TextLineSpec = serde_json::from_str(&s).unwrap();
        assert_eq!(de.direction, TextDirection::UpRight);
        assert_eq!(de.countdown, CountdownMode::Seconds);
        assert!(de.center);
    }
}
