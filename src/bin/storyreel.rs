use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use storyreel::{
    AspectRatio, AssetStore, AudioOutput, EngineConfig, EngineContext, FfmpegSink, FfmpegSinkOpts,
    FrameRGBA, NullAudioOutput, PlaybackClock, Script, SystemClock,
};

#[derive(Parser, Debug)]
#[command(name = "storyreel", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the frame at one instant as a PNG.
    Frame(FrameArgs),
    /// Render the whole script to a video file (requires `ffmpeg` on PATH).
    Export(ExportArgs),
    /// Write the mixed narration + music track as a WAV file.
    Mix(MixArgs),
    /// Play the script in real time without a display, logging progress.
    Preview(PreviewArgs),
}

#[derive(Parser, Debug)]
struct Common {
    /// Input script JSON. Asset paths resolve against its directory.
    #[arg(long)]
    script: PathBuf,

    /// Engine configuration JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Aspect ratio preset (16:9, 9:16, 1:1, 2.35:1); overrides config and script.
    #[arg(long, value_parser = parse_aspect)]
    aspect: Option<AspectRatio>,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    common: Common,

    /// Global time in seconds.
    #[arg(long, default_value_t = 0.0)]
    time: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    #[command(flatten)]
    common: Common,

    /// Output video path.
    #[arg(long)]
    out: PathBuf,

    /// Overwrite output if it already exists.
    #[arg(long, default_value_t = true)]
    overwrite: bool,

    /// Export without audio.
    #[arg(long, default_value_t = false)]
    no_audio: bool,
}

#[derive(Parser, Debug)]
struct MixArgs {
    #[command(flatten)]
    common: Common,

    /// Output WAV path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct PreviewArgs {
    #[command(flatten)]
    common: Common,

    /// Start position in seconds.
    #[arg(long, default_value_t = 0.0)]
    time: f64,

    /// Write the last rendered frame here when playback ends.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Do not open the sound device.
    #[arg(long, default_value_t = false)]
    mute: bool,
}

fn parse_aspect(s: &str) -> Result<AspectRatio, String> {
    AspectRatio::parse(s).map_err(|e| e.to_string())
}

struct Loaded {
    script: Script,
    store: AssetStore,
    ctx: EngineContext,
    cfg: EngineConfig,
}

fn load(common: &Common) -> anyhow::Result<Loaded> {
    let mut cfg = match &common.config {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::default(),
    };
    let mut script = Script::from_path(&common.script)?;
    if let Some(aspect) = common.aspect {
        cfg.aspect_ratio = aspect;
        script.aspect_ratio = Some(aspect);
    }
    let ctx = EngineContext::from_config(&cfg)?;

    let root = common.script.parent().unwrap_or_else(|| Path::new("."));
    let (store, report) = storyreel::load_assets(&script, root, &ctx)
        .with_context(|| format!("load assets for '{}'", common.script.display()))?;
    if !report.silent_scenes.is_empty() {
        tracing::warn!(scenes = ?report.silent_scenes, "scenes without narration are skipped");
    }
    Ok(Loaded {
        script,
        store,
        ctx,
        cfg,
    })
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Export(args) => cmd_export(args),
        Command::Mix(args) => cmd_mix(args),
        Command::Preview(args) => cmd_preview(args),
    }
}

fn write_png(frame: &FrameRGBA, out: &Path) -> anyhow::Result<()> {
    storyreel::encode::ffmpeg::ensure_parent_dir(out)?;
    // Frames are opaque (black base), so premultiplied bytes equal straight ones.
    image::save_buffer_with_format(
        out,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", out.display()))
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let l = load(&args.common)?;
    let frame = storyreel::render_frame(&l.ctx, args.time, &l.script, &l.store)?;
    write_png(&frame, &args.out)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let l = load(&args.common)?;
    let mixed = if args.no_audio {
        None
    } else {
        Some(storyreel::mix_script_audio(&l.script, &l.store, &l.ctx)?)
    };

    let mut opts = FfmpegSinkOpts::from_config(args.out.clone(), &l.cfg);
    opts.overwrite = args.overwrite;
    let mut sink = FfmpegSink::new(opts);

    let mut last_pct = None;
    let report = storyreel::export_video(
        &l.script,
        &l.store,
        mixed.as_ref(),
        &mut sink,
        &l.ctx,
        |job| {
            let pct = (job.progress() * 100.0).floor() as u32;
            if last_pct != Some(pct / 10) {
                last_pct = Some(pct / 10);
                tracing::info!(progress = pct, frames = job.frames_captured, "exporting");
            }
        },
    )?;

    eprintln!(
        "wrote {} ({} frames, {:.2}s)",
        args.out.display(),
        report.frames,
        report.duration
    );
    Ok(())
}

fn cmd_mix(args: MixArgs) -> anyhow::Result<()> {
    let l = load(&args.common)?;
    let track = storyreel::mix_script_audio(&l.script, &l.store, &l.ctx)?;
    track.write_wav(&args.out)?;
    eprintln!(
        "wrote {} ({:.2}s)",
        args.out.display(),
        track.duration_secs()
    );
    Ok(())
}

fn cmd_preview(args: PreviewArgs) -> anyhow::Result<()> {
    let l = load(&args.common)?;
    let clock = SystemClock::new();
    if args.mute {
        return run_preview(&l, &args, &clock, NullAudioOutput::default());
    }
    preview_on_device(&l, &args, &clock)
}

#[cfg(feature = "live-audio")]
fn preview_on_device(l: &Loaded, args: &PreviewArgs, clock: &SystemClock) -> anyhow::Result<()> {
    match storyreel::DeviceAudioOutput::open(clock) {
        Ok(device) => run_preview(l, args, clock, device),
        Err(e) => {
            tracing::warn!(error = %e, "no audio device; previewing silently");
            run_preview(l, args, clock, NullAudioOutput::default())
        }
    }
}

#[cfg(not(feature = "live-audio"))]
fn preview_on_device(l: &Loaded, args: &PreviewArgs, clock: &SystemClock) -> anyhow::Result<()> {
    tracing::info!("built without the live-audio feature; previewing silently");
    run_preview(l, args, clock, NullAudioOutput::default())
}

fn run_preview<O: AudioOutput>(
    l: &Loaded,
    args: &PreviewArgs,
    clock: &SystemClock,
    output: O,
) -> anyhow::Result<()> {
    let tick = Duration::from_secs_f64(l.ctx.fps.frame_duration_secs());
    let mut player = PlaybackClock::new(&l.script, &l.store, l.ctx.clone(), clock, output);
    player.seek(args.time);
    player.play();

    let mut scene = None;
    loop {
        let out = player.tick()?;
        let state = player.state();
        if state.active_scene_index != scene {
            scene = state.active_scene_index;
            tracing::info!(scene = ?scene, time = state.current_time, "scene");
        }
        if out.finished || !state.is_playing {
            if let Some(path) = &args.out {
                write_png(&out.frame, path)?;
            }
            break;
        }
        std::thread::sleep(tick);
    }
    eprintln!("played {:.2}s", player.state().current_time);
    Ok(())
}
