#![forbid(unsafe_code)]

pub mod buffer;
pub mod error;
pub mod fill;
pub mod font;
pub mod glyph;
pub mod layout;
pub mod palette;
pub mod settings;
pub mod surface;
pub mod text;
pub mod timer;
pub mod video;

pub use buffer::{FrameBuffer, Rgba8, SurfaceFrame, composite_frame};
pub use error::{LumenError, LumenResult};
pub use fill::{FillDirection, FillSpec, render_fill};
pub use font::{FontCache, FontSpec};
pub use glyph::GlyphSurface;
pub use layout::{HAlign, MultilineExtent, Rect, VAlign, draw_label, measure_multiline};
pub use palette::Palette;
pub use settings::SettingsMap;
pub use surface::{BlockSurface, TextSurface};
pub use text::{
    CountdownMode, MAX_TEXT_LINES, SyncedLayout, TextDirection, TextEngine, TextLineSpec,
    TextTransform,
};
pub use timer::EffectTimer;
pub use video::{FrameDecoder, VideoFrameCache};
