use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tintype::config::{self, Config};
use tintype::imaging::{BLACK, WHITE};
use tintype::session::Session;
use tintype::{intake, output};
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    let hash = env!("GIT_HASH");
    if hash.is_empty() {
        env!("CARGO_PKG_VERSION")
    } else {
        // Leaked once at startup — trivial, called exactly once
        Box::leak(format!("{} ({hash})", env!("CARGO_PKG_VERSION")).into_boxed_str())
    }
}

#[derive(Parser)]
#[command(name = "tintype")]
#[command(about = "Batch photo captioner: grayscale frames with auto-contrast text")]
#[command(long_about = "\
Batch photo captioner: grayscale frames with auto-contrast text

Every source image is center-cropped to the target aspect ratio, resampled
to the exact canvas size, desaturated, and optionally smoothed. A caption,
if given, is composited over the frame in the color that contrasts with the
local background — black over light areas, white over dark — unless forced.

Outputs land next to each other as <stem>_processed.png, or
<stem>_text_overlay.png when a caption was rendered, plus a report.json
summarizing the batch.

Run 'tintype gen-config' to generate a documented tintype.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (tintype.toml); compiled-in defaults when absent
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Normalize a directory (or single image), optionally captioning each frame
    Batch(BatchArgs),
    /// Print a stock tintype.toml with all options documented
    GenConfig,
}

#[derive(clap::Args)]
struct BatchArgs {
    /// Source directory or image file
    source: PathBuf,

    /// Output directory
    #[arg(long, default_value = "processed")]
    output: PathBuf,

    /// Apply the smoothing pass after desaturation
    #[arg(long)]
    smooth: bool,

    /// Caption line; repeat the flag for multi-line captions
    #[arg(long = "caption")]
    caption: Vec<String>,

    /// Caption font size in pixels
    #[arg(long)]
    font_size: Option<u32>,

    /// Caption horizontal offset from center, in pixels
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    offset_x: i32,

    /// Caption vertical offset from center, in pixels (positive moves down)
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    offset_y: i32,

    /// Caption color selection
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,

    /// Skip writing report.json
    #[arg(long)]
    no_report: bool,
}

/// Auto-detect picks per image from the sampled background brightness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    Auto,
    Black,
    White,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Batch(args) => run_batch(cli.config.as_deref(), args).await,
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            Ok(())
        }
    }
}

async fn run_batch(
    config_path: Option<&std::path::Path>,
    args: BatchArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut cfg = match config_path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if args.smooth {
        cfg.smoothing = true;
    }
    if let Some(font_size) = args.font_size {
        cfg.font_size = font_size;
    }
    let cfg = cfg.validate()?;

    let sources = intake::collect_sources(&args.source);
    if sources.is_empty() {
        println!("No images found in {}", args.source.display());
        return Ok(());
    }

    let session = Session::new(cfg);
    let mut ids = Vec::with_capacity(sources.len());
    for path in sources {
        ids.push(session.add_path(path).await);
    }

    let caption = args.caption.join("\n");
    if !caption.is_empty() {
        let forced = match args.color {
            ColorChoice::Auto => None,
            ColorChoice::Black => Some(BLACK),
            ColorChoice::White => Some(WHITE),
        };
        for id in &ids {
            session.set_overlay_active(id, true);
            session.set_overlay_text(id, caption.clone());
            session.set_offsets(id, args.offset_x, args.offset_y);
            session.set_manual_color(id, forced);
        }
    }

    session.process_all().await;
    session.flush_renders().await;

    std::fs::create_dir_all(&args.output)?;
    for (name, bytes) in session.download_entries() {
        std::fs::write(args.output.join(&name), &bytes)?;
    }

    let items = session.items();
    let report = output::build_report(&items);
    for entry in &report.entries {
        println!("{}", output::format_entry(entry));
    }
    println!(
        "{} processed, {} failed → {}",
        report.completed,
        report.failed,
        args.output.display()
    );
    if !args.no_report {
        output::write_report(&args.output.join("report.json"), &report)?;
    }

    Ok(())
}
