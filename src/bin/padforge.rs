use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use padforge::render::highres::{print_multiplier, render_highres, resolve_layers};
use padforge::render::raster::decode_image;
use padforge::render::scene::largest_image_pixels;
use padforge::{DesignDocument, FontCatalog, FsStore, LOGICAL_WIDTH, Surface};

#[derive(Parser, Debug)]
#[command(name = "padforge", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a design document's cart preview as a PNG.
    Preview(RenderArgs),
    /// Render a design document at print resolution as a PNG.
    Print(RenderArgs),
    /// Summarize a design document: size, layers, pricing, print dimensions.
    Inspect(InspectArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Design document JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Asset store root (blobs/, snapshots/).
    #[arg(long)]
    assets: PathBuf,

    /// Directory of .ttf/.otf fonts, keyed by file stem.
    #[arg(long)]
    fonts: Option<PathBuf>,

    /// Branding logo image. Omit to render without a logo.
    #[arg(long)]
    logo: Option<PathBuf>,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// Design document JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Asset store root, used to compute the effective print multiplier.
    #[arg(long)]
    assets: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Preview(args) => cmd_preview(args),
        Command::Print(args) => cmd_print(args),
        Command::Inspect(args) => cmd_inspect(args),
    }
}

fn load_document(path: &PathBuf) -> anyhow::Result<DesignDocument> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read design '{}'", path.display()))?;
    let doc = DesignDocument::from_json(&bytes)?;
    doc.validate()?;
    Ok(doc)
}

fn load_fonts(dir: Option<&PathBuf>) -> anyhow::Result<FontCatalog> {
    let mut fonts = FontCatalog::new();
    if let Some(dir) = dir {
        let loaded = fonts.load_dir(dir)?;
        tracing::info!(count = loaded, dir = %dir.display(), "fonts loaded");
    }
    Ok(fonts)
}

fn write_png(path: &PathBuf, png: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(path, png).with_context(|| format!("write png '{}'", path.display()))?;
    eprintln!("wrote {}", path.display());
    Ok(())
}

fn cmd_preview(args: RenderArgs) -> anyhow::Result<()> {
    let doc = load_document(&args.in_path)?;
    let store = FsStore::open(&args.assets)?;
    let fonts = load_fonts(args.fonts.as_ref())?;

    let logo_bytes = match &args.logo {
        Some(path) => Some(
            std::fs::read(path).with_context(|| format!("read logo '{}'", path.display()))?,
        ),
        None => None,
    };
    let mut surface = Surface::restore(
        doc.size,
        &doc.scene,
        doc.logo,
        logo_bytes.as_deref(),
        &store,
    )?;
    surface.set_rgb(doc.rgb);

    let raster = surface.export_preview(&fonts)?;
    write_png(&args.out, &raster.encode_png()?)
}

fn cmd_print(args: RenderArgs) -> anyhow::Result<()> {
    let doc = load_document(&args.in_path)?;
    let store = FsStore::open(&args.assets)?;
    let fonts = load_fonts(args.fonts.as_ref())?;

    let branding = match &args.logo {
        Some(path) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("read logo '{}'", path.display()))?;
            Some(decode_image(&bytes)?)
        }
        None => None,
    };

    let raster = render_highres(&doc, branding.as_ref(), &fonts, &store)?;
    write_png(&args.out, &raster.encode_png()?)
}

fn cmd_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let doc = load_document(&args.in_path)?;
    let height = doc.size.logical_height();

    println!("size:        {}", doc.size);
    println!("canvas:      {}x{} logical", LOGICAL_WIDTH, height);
    let px = doc.size.print_pixels();
    println!("print table: {}x{} px", px.width, px.height);
    println!("background:  {}", doc.background.to_hex());
    println!(
        "layers:      {} image, {} text, logo {}",
        doc.images.len(),
        doc.texts.len(),
        if doc.logo.removed { "removed" } else { "visible" }
    );
    println!("rgb:         {}", doc.rgb);
    println!("total:       {}", doc.pricing.total);

    if let Some(root) = &args.assets {
        let store = FsStore::open(root)?;
        let layers = resolve_layers(&doc.scene, &store)?;
        let multiplier = print_multiplier(largest_image_pixels(&layers), LOGICAL_WIDTH, height);
        println!(
            "print out:   {}x{} (multiplier {multiplier})",
            (f64::from(LOGICAL_WIDTH) * multiplier).round() as u32,
            (f64::from(height) * multiplier).round() as u32,
        );
    }

    Ok(())
}
