use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "shortreel", version, about = "Render narrated short-form vertical videos")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render every frame and encode the video (requires `ffmpeg` and `ffprobe`).
    Render(RenderArgs),
    /// Render a single frame as a PNG.
    Frame(FrameArgs),
    /// Print the tempo plan that brings a narration under a duration ceiling.
    SpeedPlan(SpeedPlanArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Job manifest JSON.
    #[arg(long)]
    manifest: PathBuf,

    /// Directory for frames, intermediate files and the output video.
    #[arg(long)]
    run_dir: PathBuf,

    /// Config JSON; built-in defaults when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Render threads (overrides the config).
    #[arg(long)]
    workers: Option<usize>,

    /// Skip hardware encoder detection.
    #[arg(long)]
    no_gpu: bool,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Job manifest JSON.
    #[arg(long)]
    manifest: PathBuf,

    /// Frame index (0-based).
    #[arg(long)]
    frame: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Config JSON; built-in defaults when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print which font was resolved for text.
    #[arg(long)]
    dump_fonts: bool,
}

#[derive(Parser, Debug)]
struct SpeedPlanArgs {
    /// Measured narration length in seconds.
    #[arg(long)]
    actual: f64,

    /// Maximum allowed length in seconds.
    #[arg(long, default_value_t = 45.0)]
    ceiling: f64,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Frame(args) => cmd_frame(args),
        Command::SpeedPlan(args) => cmd_speed_plan(args),
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<shortreel::ShortConfig> {
    match path {
        Some(path) => shortreel::ShortConfig::load(path)
            .with_context(|| format!("load config '{}'", path.display())),
        None => Ok(shortreel::ShortConfig::default()),
    }
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut cfg = load_config(args.config.as_deref())?;
    if let Some(workers) = args.workers {
        cfg.workers = Some(workers);
    }
    if args.no_gpu {
        cfg.use_gpu = false;
    }
    cfg.validate()?;
    for tool in [&cfg.ffmpeg, &cfg.ffprobe] {
        if !shortreel::is_tool_on_path(tool.as_os_str()) {
            anyhow::bail!(
                "'{}' not found or not runnable (set \"ffmpeg\"/\"ffprobe\" in the config)",
                tool.display()
            );
        }
    }

    let manifest = shortreel::JobManifest::load(&args.manifest)?;
    let cancel = shortreel::CancelToken::new();
    let report = shortreel::run_job(&cfg, &manifest, &args.run_dir, &cancel)?;

    println!(
        "{} ({:.2}s, {} tier)",
        report.encode.output_path.display(),
        report.encode.duration_secs,
        report.encode.tier
    );
    if let Some(copy) = &report.encode.well_known_path {
        println!("copied to {}", copy.display());
    }
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let cfg = load_config(args.config.as_deref())?;
    let manifest = shortreel::JobManifest::load(&args.manifest)?;
    let timeline = shortreel::Timeline::build(manifest.segments.iter().cloned())?;

    let font = shortreel::resolve_font(cfg.font_path.as_deref());
    if args.dump_fonts {
        match &font {
            Some(face) => eprintln!(
                "text font: {} (face {}, {} bytes)",
                face.origin,
                face.index,
                face.bytes.len()
            ),
            None => eprintln!("text font: none (background only)"),
        }
    }

    let staging = std::env::temp_dir().join(format!("shortreel-frame-{}", std::process::id()));
    let background =
        shortreel::stage_background(manifest.background.as_deref(), cfg.canvas(), &staging)?;

    let ctx = shortreel::RenderContext {
        canvas: cfg.canvas(),
        fps: cfg.fps()?,
        background,
        font,
        font_size_px: cfg.font_size_px,
        out_dir: args.out.parent().unwrap_or_else(|| Path::new(".")).to_path_buf(),
        timeline,
    };
    let img = shortreel::render_single_frame(&ctx, shortreel::FrameIndex(args.frame));
    let _ = std::fs::remove_dir_all(&staging);
    let img = img?;

    shortreel::ensure_parent_dir(&args.out)?;
    img.save_with_format(&args.out, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;
    Ok(())
}

fn cmd_speed_plan(args: SpeedPlanArgs) -> anyhow::Result<()> {
    match shortreel::plan(args.actual, args.ceiling)? {
        None => println!("no change needed"),
        Some(plan) => {
            println!("{}", serde_json::to_string_pretty(&plan)?);
            println!("{}", plan.filter_chain());
        }
    }
    Ok(())
}
