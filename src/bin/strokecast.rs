use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use strokecast::{RenderSession, RenderSpec, StudioConfig, WordEntry};

#[derive(Parser, Debug)]
#[command(name = "strokecast", version)]
struct Cli {
    /// Configuration file (TOML). Defaults are used when it does not exist.
    #[arg(long, global = true, default_value = "strokecast.toml")]
    config: PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record one word (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Record every entry of a JSON word list into one zip archive.
    Batch(BatchArgs),
    /// Write the finished card of one word as a PNG, without recording.
    Frame(FrameArgs),
}

#[derive(Parser, Debug)]
struct WordArgs {
    /// The word to draw.
    word: String,

    #[arg(long, default_value = "")]
    pinyin: String,

    #[arg(long, default_value = "")]
    thai: String,

    #[arg(long, default_value = "")]
    meaning: String,

    /// Output width; defaults to the configured width.
    #[arg(long)]
    width: Option<u32>,

    /// Output height; defaults to the configured height.
    #[arg(long)]
    height: Option<u32>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    #[command(flatten)]
    word: WordArgs,

    /// Output media path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct BatchArgs {
    /// JSON array of `{ "char", "pinyin", "thai", "meaning" }` entries.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output path. A zip archive, or the media file itself for a single-entry list.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    word: WordArgs,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = StudioConfig::load_or_default(&cli.config)?.with_env_overrides();
    config.validate().context("invalid configuration")?;

    match cli.cmd {
        Command::Render(args) => cmd_render(config, args).await,
        Command::Batch(args) => cmd_batch(config, args).await,
        Command::Frame(args) => cmd_frame(config, args).await,
    }
}

fn spec_from_args(config: &StudioConfig, args: WordArgs) -> RenderSpec {
    RenderSpec {
        word: args.word,
        pinyin: args.pinyin,
        thai: args.thai,
        meaning: args.meaning,
        output_width: args.width.unwrap_or(config.output.width),
        output_height: args.height.unwrap_or(config.output.height),
    }
}

async fn cmd_render(config: StudioConfig, args: RenderArgs) -> anyhow::Result<()> {
    let spec = spec_from_args(&config, args.word);
    let session = RenderSession::new(config)?;
    let bytes = session
        .render_one_with_progress(&spec, progress_printer(&spec.word))
        .await
        .with_context(|| format!("render '{}'", spec.word))?;
    write_output(&args.out, &bytes)
}

async fn cmd_batch(config: StudioConfig, args: BatchArgs) -> anyhow::Result<()> {
    let canvas = config.canvas()?;
    let specs: Vec<RenderSpec> = WordEntry::load_list(&args.in_path)?
        .into_iter()
        .map(|entry| RenderSpec::from_entry(entry, canvas))
        .collect();
    let session = RenderSession::new(config)?;

    if let [spec] = specs.as_slice() {
        let bytes = session
            .render_one_with_progress(spec, progress_printer(&spec.word))
            .await
            .with_context(|| format!("render '{}'", spec.word))?;
        return write_output(&args.out, &bytes);
    }

    let archive = session
        .render_batch(&specs, progress_printer("batch"))
        .await
        .context("render batch")?;
    for skipped in &archive.skipped {
        eprintln!(
            "skipped #{} '{}': {}",
            skipped.index, skipped.word, skipped.error
        );
    }
    write_output(&args.out, &archive.bytes)
}

async fn cmd_frame(config: StudioConfig, args: FrameArgs) -> anyhow::Result<()> {
    let spec = spec_from_args(&config, args.word);
    let session = RenderSession::new(config)?;
    let frame = session.preview_frame(&spec).await?;
    let rgba = frame.to_straight_rgba8();

    create_parent_dir(&args.out)?;
    image::save_buffer_with_format(
        &args.out,
        &rgba,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn progress_printer(label: &str) -> strokecast::ProgressCallback {
    let label = label.to_string();
    Arc::new(move |fraction: f64| {
        tracing::info!(%label, percent = (fraction * 100.0).round(), "progress");
    })
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

fn write_output(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    create_parent_dir(path)?;
    std::fs::write(path, bytes).with_context(|| format!("write '{}'", path.display()))?;
    eprintln!("wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}
