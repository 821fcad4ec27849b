use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quad_dither::{ColorMethod, PaletteFile, PaletteSource, RenderConfig, RenderError, Renderer};

mod assets;
mod debug_png;
mod prepare;

use prepare::ImagePreparer;

#[derive(Parser)]
#[command(name = "ansiblock")]
#[command(about = "High-fidelity ANSI terminal art from raster images")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    convert: ConvertArgs,
}

#[derive(Args)]
struct ConvertArgs {
    /// Input image path
    #[arg(long)]
    input: Option<PathBuf>,

    /// Output path; stdout when omitted. A .png path writes a debug
    /// rendering of the block grid instead of ANSI
    #[arg(long)]
    output: Option<PathBuf>,

    /// Named embedded palette (ansi16, ansi256, jetbrains32) or a path to
    /// a .palette container or .json source
    #[arg(long, default_value = "ansi16")]
    palette: String,

    /// Output width in blocks (terminal columns)
    #[arg(long, default_value_t = 80)]
    width: usize,

    /// Vertical compensation for terminal character aspect
    #[arg(long, default_value_t = 2.0)]
    scale: f64,

    /// Cap on the compressed output length in bytes; the renderer shrinks
    /// the width until the output fits
    #[arg(long, default_value_t = 1_048_576)]
    maxchars: usize,

    /// Candidate cap per KD-tree query for large palettes; 0 forces
    /// exhaustive search
    #[arg(long, default_value_t = 50)]
    kdsearch: usize,

    /// Block cache admissibility threshold
    #[arg(long = "cache-threshold", default_value_t = 40.0)]
    cache_threshold: f64,

    /// Color distance method: RGB, LAB, or Redmean (case-insensitive)
    #[arg(long, default_value = "RGB")]
    colormethod: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Precompute a .palette container from a JSON palette source.
    ///
    /// Builds whole-cube lookup tables and KD-trees for every built-in
    /// color method. Slow by design; run once per palette.
    Palette {
        /// JSON palette source
        #[arg(long)]
        input: PathBuf,

        /// Output .palette path
        #[arg(long)]
        output: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    // Minimal logging for CLI use; RUST_LOG overrides.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ansiblock=warn,quad_dither=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Palette { input, output }) => run_palette_command(&input, &output),
        None => run_convert(&cli.convert),
    }
}

/// Convert an image to ANSI art (or a debug PNG).
fn run_convert(args: &ConvertArgs) -> anyhow::Result<()> {
    let input = args
        .input
        .as_ref()
        .context("missing --input (image path is required)")?;
    let method = ColorMethod::parse(&args.colormethod)
        .with_context(|| format!("unknown color method {:?}", args.colormethod))?;

    let config = RenderConfig {
        width: args.width,
        scale: args.scale,
        max_chars: args.maxchars,
        kd_search: args.kdsearch,
        cache_threshold: args.cache_threshold,
        method,
        ..RenderConfig::default()
    };

    let mut renderer = Renderer::new(config);
    load_palette(&mut renderer, &args.palette)?;

    let preparer = ImagePreparer::open(input)?;

    if let Some(output) = &args.output {
        if output.extension().is_some_and(|e| e == "png") {
            return write_debug_png(&mut renderer, &preparer, output);
        }
    }

    let result = renderer.render_with_retry(preparer.aspect(), |w, h| Ok(preparer.prepare(w, h)));
    let ansi = match result {
        Ok(ansi) => ansi,
        Err(RenderError::TooLarge { max_chars }) => {
            // The caller asked for a bounded result; not fitting is a
            // diagnostic outcome, not a failure.
            println!("image too large to fit within character limit ({max_chars} bytes)");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    match &args.output {
        Some(path) => std::fs::write(path, &ansi)
            .with_context(|| format!("cannot write {}", path.display()))?,
        None => std::io::stdout().write_all(ansi.as_bytes())?,
    }
    Ok(())
}

/// Resolve a palette argument: embedded name, .palette container, or JSON.
fn load_palette(renderer: &mut Renderer, palette: &str) -> anyhow::Result<()> {
    let path = Path::new(palette);
    match path.extension().and_then(|e| e.to_str()) {
        Some("palette") => {
            renderer
                .load_palette_file(palette, path)
                .with_context(|| format!("cannot load palette container {palette}"))?;
        }
        Some("json") => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("cannot read palette source {palette}"))?;
            renderer
                .load_palette_json(palette, &bytes)
                .with_context(|| format!("cannot load palette source {palette}"))?;
        }
        _ => {
            let bytes = assets::palette_json(palette).with_context(|| {
                format!(
                    "unknown palette {:?} (embedded: {})",
                    palette,
                    assets::embedded_names().join(", ")
                )
            })?;
            renderer.load_palette_json(palette, &bytes)?;
        }
    }
    Ok(())
}

/// Render once at the configured size and save the painted block grid.
fn write_debug_png(
    renderer: &mut Renderer,
    preparer: &ImagePreparer,
    output: &Path,
) -> anyhow::Result<()> {
    let blocks_w = renderer.config().width;
    let blocks_h = ((blocks_w as f64 / preparer.aspect() / renderer.config().scale).round()
        as usize)
        .max(1);

    let mut prepared = preparer.prepare(blocks_w, blocks_h);
    let grid = renderer.dither_image(
        &mut prepared.pixels,
        &prepared.edges,
        prepared.width,
        prepared.height,
    )?;
    let palette = renderer.palette().context("palette not loaded")?;
    let img = debug_png::paint_block_grid(&grid, palette);
    img.save(output)
        .with_context(|| format!("cannot write {}", output.display()))?;
    println!("wrote {} ({}x{})", output.display(), img.width(), img.height());
    Ok(())
}

/// Build a .palette container from a JSON source.
fn run_palette_command(input: &Path, output: &Path) -> anyhow::Result<()> {
    let bytes =
        std::fs::read(input).with_context(|| format!("cannot read {}", input.display()))?;
    let source = PaletteSource::parse_json(&bytes)
        .with_context(|| format!("invalid palette source {}", input.display()))?;

    eprintln!("building whole-cube tables for all methods; this takes a while...");
    let file = PaletteFile::build(&source)?;

    let out = std::fs::File::create(output)
        .with_context(|| format!("cannot create {}", output.display()))?;
    file.write_to(std::io::BufWriter::new(out))?;

    let methods: Vec<&str> = file.method_names().collect();
    println!("wrote {} (methods: {})", output.display(), methods.join(", "));
    Ok(())
}
