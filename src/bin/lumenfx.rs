use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use chrono::Utc;
use clap::{Parser, Subcommand};
use lumenfx::{
    BlockSurface, EffectTimer, FontCache, FrameBuffer, Palette, Rgba8, SettingsMap, TextEngine,
    render_fill,
};

#[derive(Parser, Debug)]
#[command(name = "lumenfx", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single frame as a PNG.
    Frame(FrameArgs),
    /// Render every frame of the scene as a PNG sequence.
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input scene JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Frame index (0-based).
    #[arg(long)]
    frame: i64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input scene JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output directory for the PNG sequence.
    #[arg(long)]
    out_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
enum EffectKind {
    Fill,
    Text,
}

/// A renderable scene: buffer geometry, timing, palette and the flat
/// effect settings. Effects render in listed order into the same buffer.
#[derive(Debug, serde::Deserialize)]
struct Scene {
    width: u32,
    height: u32,
    frame_time_ms: i64,
    duration_frames: i64,
    palette: Vec<Rgba8>,
    #[serde(default = "default_effects")]
    effects: Vec<EffectKind>,
    #[serde(default)]
    settings: SettingsMap,
}

fn default_effects() -> Vec<EffectKind> {
    vec![EffectKind::Text]
}

impl Scene {
    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.width > 0 && self.height > 0, "scene has zero size");
        anyhow::ensure!(self.duration_frames > 0, "scene has zero duration");
        anyhow::ensure!(self.frame_time_ms > 0, "frame_time_ms must be positive");
        Ok(())
    }

    fn timer(&self, frame: i64) -> EffectTimer {
        EffectTimer {
            cur_period: frame,
            start_period: 0,
            end_period: self.duration_frames,
            frame_time_ms: self.frame_time_ms,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Render(args) => cmd_render(args),
    }
}

fn read_scene_json(path: &Path) -> anyhow::Result<Scene> {
    let f = File::open(path).with_context(|| format!("open scene '{}'", path.display()))?;
    let r = BufReader::new(f);
    let scene: Scene = serde_json::from_reader(r).with_context(|| "parse scene JSON")?;
    Ok(scene)
}

fn render_scene_frame(
    scene: &Scene,
    frame: i64,
    engine: &mut TextEngine,
    surface: &mut BlockSurface,
    fonts: &FontCache,
) -> anyhow::Result<FrameBuffer> {
    let mut composed = FrameBuffer::new(scene.width, scene.height);
    let palette = Palette::new(scene.palette.clone());
    let timer = scene.timer(frame);

    // Each effect owns its full layer; later layers overlay earlier ones
    // where they produced ink.
    for effect in &scene.effects {
        let mut layer = FrameBuffer::new(scene.width, scene.height);
        match effect {
            EffectKind::Fill => {
                render_fill(&timer, &scene.settings.fill_spec(), &palette, &mut layer);
            }
            EffectKind::Text => {
                let specs = scene.settings.text_line_specs();
                engine.render_text(
                    &timer,
                    Utc::now(),
                    &specs,
                    &palette,
                    fonts,
                    surface,
                    &mut layer,
                )?;
            }
        }
        for y in 0..scene.height as i32 {
            for x in 0..scene.width as i32 {
                let px = layer.pixel(x, y);
                if px.a > 0 {
                    composed.set_pixel(x, y, px);
                }
            }
        }
    }
    Ok(composed)
}

fn write_png(buffer: &FrameBuffer, out: &Path) -> anyhow::Result<()> {
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    buffer
        .to_image()
        .save_with_format(out, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", out.display()))?;
    Ok(())
}

fn check_frame_index(frame: i64, duration_frames: i64) -> anyhow::Result<()> {
    anyhow::ensure!(frame >= 0, "frame {frame} is negative");
    anyhow::ensure!(
        frame < duration_frames,
        "frame {frame} out of range (scene has {duration_frames} frames)"
    );
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let scene = read_scene_json(&args.in_path)?;
    scene.validate()?;
    check_frame_index(args.frame, scene.duration_frames)?;

    let mut engine = TextEngine::new();
    let mut surface = BlockSurface::new(scene.width, scene.height);
    let fonts = FontCache::new();

    let buffer = render_scene_frame(&scene, args.frame, &mut engine, &mut surface, &fonts)?;
    write_png(&buffer, &args.out)?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let scene = read_scene_json(&args.in_path)?;
    scene.validate()?;

    let mut engine = TextEngine::new();
    let mut surface = BlockSurface::new(scene.width, scene.height);
    let fonts = FontCache::new();

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("create output dir '{}'", args.out_dir.display()))?;

    for frame in 0..scene.duration_frames {
        let buffer = render_scene_frame(&scene, frame, &mut engine, &mut surface, &fonts)?;
        let out = args.out_dir.join(format!("frame_{frame:05}.png"));
        write_png(&buffer, &out)?;
    }

    eprintln!(
        "wrote {} frames to {}",
        scene.duration_frames,
        args.out_dir.display()
    );
    Ok(())
}
