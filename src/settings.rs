use std::collections::BTreeMap;

use crate::{
    fill::{FillDirection, FillSpec},
    text::{CountdownMode, MAX_TEXT_LINES, TextDirection, TextLineSpec, TextTransform},
};

/// Flat string key/value settings for one effect instance, as stored in a
/// sequence file. Typed specs are resolved from it on demand; unknown keys
/// are preserved untouched.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct SettingsMap {
    entries: BTreeMap<String, String>,
}

impl SettingsMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    fn get_str(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or(default).to_string()
    }

    fn get_int(&self, key: &str, default: i64) -> i64 {
        self.get(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Checkbox values are stored as "1"/"0".
    fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(v) => v.trim() == "1",
            None => default,
        }
    }

    /// Resolves the typed specs for all four text lines. Line 1 carries
    /// independent start/end sliders; lines 2 through 4 share a single
    /// position slider that maps 0..100 onto -100..100 for every offset.
    pub fn text_line_specs(&self) -> Vec<TextLineSpec> {
        (1..=MAX_TEXT_LINES).map(|n| self.text_line_spec(n)).collect()
    }

    fn text_line_spec(&self, n: usize) -> TextLineSpec {
        let template = self.get_str(&format!("TEXTCTRL_Text_Line{n}"), "");
        let font = self.get_str(&format!("FONTPICKER_Text_Font{n}"), "");
        let direction =
            TextDirection::from_name(&self.get_str(&format!("CHOICE_Text_Dir{n}"), "none"));
        let transform =
            TextTransform::from_name(&self.get_str(&format!("CHOICE_Text_Effect{n}"), "normal"));
        let countdown =
            CountdownMode::from_name(&self.get_str(&format!("CHOICE_Text_Count{n}"), "none"));
        let center = self.get_bool(&format!("CHECKBOX_TextToCenter{n}"), false);
        let speed = self.get_int(&format!("TEXTCTRL_Text_Speed{n}"), 10);

        let (start_x, start_y, end_x, end_y, pixel_offsets) = if n == 1 {
            (
                self.get_int("SLIDER_Text_XStart1", 0) as i32,
                self.get_int("SLIDER_Text_YStart1", 0) as i32,
                self.get_int("SLIDER_Text_XEnd1", 0) as i32,
                self.get_int("SLIDER_Text_YEnd1", 0) as i32,
                self.get_bool("CHECKBOX_Text_PixelOffsets1", false),
            )
        } else {
            let position = self.get_int(&format!("SLIDER_Text_Position{n}"), 50) as i32;
            let offset = position * 2 - 100;
            (offset, offset, offset, offset, false)
        };

        TextLineSpec {
            template,
            font,
            direction,
            transform,
            countdown,
            center,
            speed,
            pixel_offsets,
            start_x,
            start_y,
            end_x,
            end_y,
        }
    }

    pub fn fill_spec(&self) -> FillSpec {
        FillSpec {
            direction: FillDirection::from_name(&self.get_str("CHOICE_Fill_Direction", "Up")),
            position: self.get_int("SLIDER_Fill_Position", 100) as i32,
            band_size: self.get_int("SLIDER_Fill_Band_Size", 0) as i32,
            skip_size: self.get_int("SLIDER_Fill_Skip_Size", 0) as i32,
            offset: self.get_int("SLIDER_Fill_Offset", 0) as i32,
            offset_in_pixels: self.get_bool("CHECKBOX_Fill_Offset_In_Pixels", true),
            color_by_time: self.get_bool("CHECKBOX_Fill_Color_Time", false),
        }
    }
}
