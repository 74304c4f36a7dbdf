use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "slidecast", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a job manifest to MP4/MOV (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Render a single still as a PNG.
    Still(StillArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input job manifest JSON; asset paths resolve relative to it.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output path. The extension of the configured format is appended when missing.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct StillArgs {
    /// Input job manifest JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    #[command(flatten)]
    at: StillAt,

    /// Seconds into the slide given by `--slide` (ignored otherwise).
    #[arg(long, default_value_t = 0.0)]
    local: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct StillAt {
    /// Timeline time in seconds, transitions included.
    #[arg(long)]
    time: Option<f64>,

    /// Slide index (0-based), rendered without transitions.
    #[arg(long)]
    slide: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Still(args) => cmd_still(args),
    }
}

fn load_job(path: &Path) -> anyhow::Result<slidecast::RenderJob> {
    slidecast::JobSpec::load_job(path).with_context(|| format!("load job '{}'", path.display()))
}

fn create_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    if !slidecast::is_ffmpeg_on_path() {
        anyhow::bail!("ffmpeg was not found on PATH");
    }
    let job = load_job(&args.in_path)?;
    let handle = slidecast::spawn_job(job)?;

    let mut last = 0usize;
    let output = handle.wait(|current, total| {
        if current != last {
            eprintln!("rendering slide {current}/{total}");
            last = current;
        }
    })?;

    let mut out = args.out;
    if out.extension().is_none() {
        out.set_extension(output.extension);
    }
    create_parent_dir(&out)?;
    std::fs::write(&out, &output.buffer)
        .with_context(|| format!("write video '{}'", out.display()))?;

    eprintln!("wrote {} ({} bytes)", out.display(), output.buffer.len());
    Ok(())
}

fn cmd_still(args: StillArgs) -> anyhow::Result<()> {
    let job = load_job(&args.in_path)?;
    let mut compositor = job.into_compositor()?;

    let frame = match (args.at.time, args.at.slide) {
        (_, Some(slide)) => compositor.render_slide(slide, args.local)?,
        (Some(t), None) => compositor.render_still(t)?,
        (None, None) => anyhow::bail!("either --time or --slide is required"),
    };

    create_parent_dir(&args.out)?;
    image::save_buffer_with_format(
        &args.out,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}
