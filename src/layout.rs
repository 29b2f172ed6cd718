use crate::surface::TextSurface;

/// Integer rectangle in surface coordinates. `right`/`bottom` are
/// inclusive, matching the original toolkit's rectangle conventions that
/// the block-origin math below depends on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn left(&self) -> i32 {
        self.x
    }

    pub fn top(&self) -> i32 {
        self.y
    }

    pub fn right(&self) -> i32 {
        self.x + self.width - 1
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height - 1
    }

    pub fn offset(&mut self, dx: i32, dy: i32) {
        self.x += dx;
        self.y += dy;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HAlign {
    Left,
    Center,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VAlign {
    Top,
    Center,
    Bottom,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MultilineExtent {
    pub width: i32,
    pub height: i32,
    pub last_line_height: i32,
}

/// Measures a multi-line block: max line width, total height, and the last
/// line's height. Blank lines still count toward the height; if no
/// non-blank line has established a line height yet, the height of a
/// reference glyph is probed so a leading blank line is never zero-height.
pub fn measure_multiline(surface: &dyn TextSurface, text: &str) -> MultilineExtent {
    let mut width_max = 0;
    let mut height_total = 0;
    let mut height_line = 0;
    let mut height_line_default = 0;

    for line in text.split('\n') {
        if line.is_empty() {
            if height_line_default == 0 {
                height_line_default = height_line;
            }
            if height_line_default == 0 {
                let (_, probe) = surface.measure_text("W");
                height_line_default = probe;
            }
            height_total += height_line_default;
        } else {
            let (w, h) = surface.measure_text(line);
            height_line = h;
            width_max = width_max.max(w);
            height_total += h;
        }
    }

    MultilineExtent {
        width: width_max,
        height: height_total,
        last_line_height: height_line,
    }
}

/// Draws a multi-line block aligned within `rect`: the block origin comes
/// from the measured extent, then each line is drawn with its own
/// horizontal alignment, the cursor advancing by that line's height.
pub fn draw_label(
    surface: &mut dyn TextSurface,
    text: &str,
    rect: Rect,
    halign: HAlign,
    valign: VAlign,
) {
    let extent = measure_multiline(surface, text);

    let x = match halign {
        HAlign::Right => rect.right() - extent.width,
        HAlign::Center => (rect.left() + rect.right() + 1 - extent.width) / 2,
        HAlign::Left => rect.left(),
    };
    let mut y = match valign {
        VAlign::Bottom => rect.bottom() - extent.height,
        VAlign::Center => (rect.top() + rect.bottom() + 1 - extent.height) / 2,
        VAlign::Top => rect.top(),
    };

    let mut height_line_default = 0;
    for line in text.split('\n') {
        if line.is_empty() {
            if height_line_default == 0 {
                let (_, probe) = surface.measure_text("W");
                height_line_default = probe;
            }
            y += height_line_default;
            continue;
        }

        let (line_w, line_h) = surface.measure_text(line);
        height_line_default = line_h;
        let line_x = match halign {
            HAlign::Right => x + extent.width - line_w,
            HAlign::Center => x + (extent.width - line_w) / 2,
            HAlign::Left => x,
        };
        surface.draw_text(line, line_x, y);
        y += line_h;
    }
}
