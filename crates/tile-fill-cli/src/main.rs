use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use globset::{Glob, GlobSet, GlobSetBuilder};
use handlebars::Handlebars;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tile_fill_core::prelude::*;
use tracing::{error, info, warn};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(
    name = "tile-fill",
    about = "Shelf-pack sprite atlases and trace stencil fill rendering",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Show progress bars (disable with --progress false or --quiet)
    #[arg(long, default_value_t = true, action=ArgAction::Set, global=true, help_heading = "Logging/UX")]
    progress: bool,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action=ArgAction::Count, global=true, help_heading = "Logging/UX")]
    verbose: u8,
    /// Quiet mode (overrides verbose)
    #[arg(
        short,
        long,
        default_value_t = false,
        global = true,
        help_heading = "Logging/UX"
    )]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Pack a folder of images into a sprite atlas
    Pack(PackArgs),
    /// Run the fill renderer over a JSON fixture and print the GPU command stream
    Trace(TraceArgs),
    /// Time shelf allocation for a folder of images
    Bench(BenchArgs),
}

#[derive(Parser, Debug, Clone)]
struct PackArgs {
    /// Input file or directory
    #[arg(help_heading = "Input/Output")]
    input: PathBuf,
    /// Output directory
    #[arg(short, long, default_value = "out", help_heading = "Input/Output")]
    out_dir: PathBuf,
    /// Atlas base name (files will be name.png/.json)
    #[arg(short, long, default_value = "sprite", help_heading = "Input/Output")]
    name: String,
    /// YAML config file path (overrides atlas options)
    #[arg(long, help_heading = "Input/Output")]
    config: Option<PathBuf>,
    /// Include patterns (glob). If set, only files matching any pattern are considered
    #[arg(long, help_heading = "Input/Output")]
    include: Vec<String>,
    /// Exclude patterns (glob). Files matching any pattern will be ignored
    #[arg(long, help_heading = "Input/Output")]
    exclude: Vec<String>,

    /// Initial atlas width
    #[arg(long, default_value_t = 256, help_heading = "Atlas")]
    width: u32,
    /// Initial atlas height
    #[arg(long, default_value_t = 256, help_heading = "Atlas")]
    height: u32,
    /// Largest width the atlas may grow to
    #[arg(long, default_value_t = 2048, help_heading = "Atlas")]
    max_width: u32,
    /// Largest height the atlas may grow to
    #[arg(long, default_value_t = 2048, help_heading = "Atlas")]
    max_height: u32,
    /// Transparent border around every image
    #[arg(long, default_value_t = 1, help_heading = "Atlas")]
    padding: u32,
    /// Pixel ratio of images without an @Nx suffix
    #[arg(long, default_value_t = 1.0, help_heading = "Atlas")]
    pixel_ratio: f32,

    /// External template file (handlebars) rendered to name.template
    #[arg(long, help_heading = "Export")]
    template: Option<PathBuf>,
    /// Also write name.css from the built-in stylesheet template
    #[arg(long, default_value_t = false, help_heading = "Export")]
    css: bool,
    /// Export packing stats (JSON) to this file
    #[arg(long, help_heading = "Export")]
    export_stats: Option<PathBuf>,
    /// Print the merged configuration (after CLI/YAML) and exit
    #[arg(long, default_value_t = false, help_heading = "Export")]
    print_config: bool,
    /// Dry run: pack and report stats but do not write files
    #[arg(long, default_value_t = false, help_heading = "Export")]
    dry_run: bool,
}

#[derive(Parser, Debug, Clone)]
struct TraceArgs {
    /// Fixture JSON: painter settings, layer, tiles and atlas positions
    fixture: PathBuf,
    /// Render pass: opaque | translucent | both
    #[arg(long, value_parser = ["opaque", "translucent", "both"], default_value = "both")]
    pass: String,
    /// Write the command stream here instead of stdout
    #[arg(short, long)]
    out: Option<PathBuf>,
    /// Drop clip/sublayer markers from the output
    #[arg(long, default_value_t = false)]
    no_markers: bool,
}

#[derive(Parser, Debug, Clone)]
struct BenchArgs {
    /// Input file or directory
    input: PathBuf,
    /// Number of times to pack the whole input
    #[arg(long, default_value_t = 10)]
    iterations: u32,
    /// Packer width
    #[arg(long, default_value_t = 2048)]
    width: u32,
    /// Packer height
    #[arg(long, default_value_t = 2048)]
    height: u32,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing_with_level(cli.quiet, cli.verbose);
    match &cli.command {
        Commands::Pack(args) => run_pack(args, cli.progress && !cli.quiet),
        Commands::Trace(args) => run_trace(args),
        Commands::Bench(args) => run_bench(args, cli.progress && !cli.quiet),
    }
}

fn run_pack(cli: &PackArgs, show_progress: bool) -> anyhow::Result<()> {
    let flags = AtlasConfig::builder()
        .with_dimensions(cli.width, cli.height)
        .with_max_dimensions(cli.max_width, cli.max_height)
        .padding(cli.padding)
        .pixel_ratio(cli.pixel_ratio)
        .build();
    let cfg = match &cli.config {
        Some(path) => {
            let file = fs::read_to_string(path)
                .with_context(|| format!("read config {}", path.display()))?;
            let y: YamlConfig = serde_yaml::from_str(&file)
                .with_context(|| format!("parse config {}", path.display()))?;
            y.into_atlas_config(flags)
        }
        None => flags,
    };
    cfg.validate()?;

    if cli.print_config {
        println!("{}", serde_yaml::to_string(&cfg)?);
        return Ok(());
    }

    let paths = gather_paths(&cli.input, &cli.include, &cli.exclude)?;
    let inputs = load_images_with_progress(&cli.input, &paths, show_progress)?;
    info!(count = inputs.len(), "loaded input images");

    let mut atlas = SpriteAtlas::new(cfg)?;
    let mut placements = Vec::with_capacity(inputs.len());
    for input in &inputs {
        let rect = match atlas.add_image(&input.id, &input.image, input.pixel_ratio) {
            Ok(_) => atlas.slot(&input.id),
            Err(e) => {
                warn!(id = %input.id, error = %e, "sprite not placed");
                None
            }
        };
        placements.push(Placement {
            key: input.id.clone(),
            rect,
        });
    }

    let stats = atlas.stats();
    info!(
        sprites = atlas.len(),
        failed = placements.iter().filter(|p| p.rect.is_none()).count(),
        width = stats.width,
        height = stats.height,
        shelves = stats.num_shelves,
        occupancy = format!("{:.2}%", stats.occupancy * 100.0),
        "packed"
    );

    if cli.dry_run {
        println!("{}", stats.summary());
        return Ok(());
    }

    fs::create_dir_all(&cli.out_dir)
        .with_context(|| format!("create out_dir {}", cli.out_dir.display()))?;

    let png_name = format!("{}.png", cli.name);
    let png_path = cli.out_dir.join(&png_name);
    atlas
        .image()
        .save(&png_path)
        .with_context(|| format!("write {}", png_path.display()))?;
    info!(?png_path, "atlas image written");

    let json_path = cli.out_dir.join(format!("{}.json", cli.name));
    write_json(&json_path, &to_sprite_json(&atlas))
        .with_context(|| format!("write {}", json_path.display()))?;
    let placements_path = cli.out_dir.join(format!("{}.placements.json", cli.name));
    write_json(&placements_path, &to_json_placements(&placements))
        .with_context(|| format!("write {}", placements_path.display()))?;
    info!(?json_path, ?placements_path, "sprite index written");

    if cli.template.is_some() || cli.css {
        let ctx = build_template_context(&atlas, &png_name);
        if let Some(path) = &cli.template {
            let tpl = fs::read_to_string(path)
                .with_context(|| format!("read template {}", path.display()))?;
            let out_path = cli.out_dir.join(format!("{}.template", cli.name));
            render_template(&tpl, &ctx, &out_path)?;
        }
        if cli.css {
            let out_path = cli.out_dir.join(format!("{}.css", cli.name));
            render_template(include_str!("templates/sprites_css.hbs"), &ctx, &out_path)?;
        }
    }

    if let Some(stats_path) = &cli.export_stats {
        fs::write(stats_path, serde_json::to_string_pretty(&stats)?)
            .with_context(|| format!("write {}", stats_path.display()))?;
        info!(?stats_path, "stats exported");
    }
    Ok(())
}

/// Input of `tile-fill trace`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TraceFixture {
    #[serde(default)]
    painter: PainterConfig,
    layer: FillLayer,
    tiles: TileSet,
    /// Draw order; every tile in the set (lowest zoom first) when omitted.
    #[serde(default)]
    coords: Option<Vec<TileCoord>>,
    /// Pattern image positions by sprite id.
    #[serde(default)]
    atlas: HashMap<String, ImagePosition>,
}

#[derive(Debug, Serialize)]
struct PassTrace {
    pass: RenderPass,
    commands: Vec<GpuCommand>,
}

fn run_trace(args: &TraceArgs) -> anyhow::Result<()> {
    let text = fs::read_to_string(&args.fixture)
        .with_context(|| format!("read fixture {}", args.fixture.display()))?;
    let fixture: TraceFixture = serde_json::from_str(&text)
        .with_context(|| format!("parse fixture {}", args.fixture.display()))?;
    fixture.layer.paint.validate()?;

    let passes: Vec<RenderPass> = match args.pass.as_str() {
        "both" => vec![RenderPass::Opaque, RenderPass::Translucent],
        other => vec![
            other
                .parse()
                .map_err(|_| anyhow::anyhow!("unknown pass: {}", other))?,
        ],
    };
    let coords = fixture.coords.unwrap_or_else(|| fixture.tiles.coords());

    let renderer = FillRenderer::new();
    let mut painter = TracePainter::new(fixture.painter, passes[0], fixture.atlas)?;
    let mut traces = Vec::with_capacity(passes.len());
    for pass in passes {
        painter.set_pass(pass);
        renderer.draw(&mut painter, &fixture.tiles, &fixture.layer, &coords);
        let mut commands = painter.take_commands();
        if args.no_markers {
            commands.retain(|c| !matches!(c, GpuCommand::Marker { .. }));
        }
        info!(
            ?pass,
            commands = commands.len(),
            draws = commands.iter().filter(|c| c.is_draw()).count(),
            "pass traced"
        );
        traces.push(PassTrace { pass, commands });
    }

    let json = serde_json::to_string_pretty(&traces)?;
    match &args.out {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
            info!(?path, "trace written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn run_bench(b: &BenchArgs, show_progress: bool) -> anyhow::Result<()> {
    let paths = gather_paths(&b.input, &[], &[])?;
    let inputs = load_images_with_progress(&b.input, &paths, show_progress)?;
    let sizes: Vec<(u32, u32)> = inputs.iter().map(|i| i.image.dimensions()).collect();

    let pack_all = || {
        let mut packer = ShelfBinPacker::new(b.width, b.height);
        let failed = sizes
            .iter()
            .filter(|&&(w, h)| packer.allocate(w, h).is_none())
            .count();
        (packer, failed)
    };
    let mut best = Duration::MAX;
    let mut last = None;
    for _ in 0..b.iterations {
        let start = Instant::now();
        let result = pack_all();
        best = best.min(start.elapsed());
        last = Some(result);
    }
    let Some((packer, failed)) = last else {
        anyhow::bail!("--iterations must be at least 1");
    };

    let stats = packer.stats();
    println!(
        "sprites={} failed={} shelves={} occupancy={:.2}% best={}",
        sizes.len(),
        failed,
        stats.num_shelves,
        stats.occupancy * 100.0,
        fmt_dur(best)
    );
    Ok(())
}

fn fmt_dur(d: Duration) -> String {
    let ms = d.as_secs_f64() * 1000.0;
    if ms >= 1.0 {
        format!("{:.1}ms", ms)
    } else {
        format!("{}us", d.as_micros())
    }
}

fn gather_paths(
    path: &Path,
    include: &[String],
    exclude: &[String],
) -> anyhow::Result<Vec<PathBuf>> {
    let inc_set = build_globset(include)?;
    let exc_set = build_globset(exclude)?;
    let mut list: Vec<PathBuf> = Vec::new();
    if path.is_file() {
        if !should_skip(path, inc_set.as_ref(), exc_set.as_ref()) && is_image(path) {
            list.push(path.to_path_buf());
        }
    } else {
        // Sorted so ids, and therefore packing order, are stable across platforms.
        for entry in WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let p = entry.path();
            if p.is_file() && !should_skip(p, inc_set.as_ref(), exc_set.as_ref()) && is_image(p) {
                list.push(p.to_path_buf());
            }
        }
    }
    Ok(list)
}

fn build_globset(patterns: &[String]) -> anyhow::Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut b = GlobSetBuilder::new();
    for pat in patterns {
        b.add(Glob::new(pat).with_context(|| format!("invalid glob {pat}"))?);
    }
    Ok(Some(b.build()?))
}

fn should_skip(p: &Path, include: Option<&GlobSet>, exclude: Option<&GlobSet>) -> bool {
    let s = p.to_string_lossy().replace('\\', "/");
    if exclude.is_some_and(|ex| ex.is_match(&s)) {
        return true;
    }
    if include.is_some_and(|inc| !inc.is_match(&s)) {
        return true;
    }
    false
}

fn is_image(p: &Path) -> bool {
    matches!(
        p.extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_ascii_lowercase()),
        Some(ext) if matches!(ext.as_str(), "png" | "jpg" | "jpeg")
    )
}

struct InputSprite {
    id: String,
    image: RgbaImage,
    pixel_ratio: Option<f32>,
}

/// Sprite id and pixel ratio for an image path: the path relative to `root` without its
/// extension, with a trailing `@2x`-style suffix turned into the ratio.
fn sprite_id(root: &Path, p: &Path) -> (String, Option<f32>) {
    let rel = p.strip_prefix(root).unwrap_or(p);
    let rel = if rel.as_os_str().is_empty() { p } else { rel };
    let id = rel.with_extension("").to_string_lossy().replace('\\', "/");
    if let Some((base, suffix)) = id.rsplit_once('@') {
        if let Some(ratio) = suffix
            .strip_suffix('x')
            .and_then(|r| r.parse::<f32>().ok())
            .filter(|r| *r > 0.0)
        {
            return (base.to_string(), Some(ratio));
        }
    }
    (id, None)
}

fn load_images_with_progress(
    root: &Path,
    paths: &[PathBuf],
    progress: bool,
) -> anyhow::Result<Vec<InputSprite>> {
    use indicatif::{ProgressBar, ProgressStyle};
    let bar = if progress {
        let b = ProgressBar::new(paths.len() as u64);
        b.set_style(ProgressStyle::with_template(
            "{spinner:.green} loading {pos}/{len} [{elapsed_precise}] {wide_msg}",
        )?);
        Some(b)
    } else {
        None
    };
    let mut list = Vec::with_capacity(paths.len());
    for p in paths {
        if let Some(b) = &bar {
            let msg = p.file_name().and_then(|s| s.to_str()).unwrap_or("");
            b.set_message(msg.to_string());
        }
        match load_rgba(p) {
            Ok(image) => {
                let (id, pixel_ratio) = sprite_id(root, p);
                list.push(InputSprite {
                    id,
                    image,
                    pixel_ratio,
                });
            }
            Err(e) => {
                error!(?p, error = %e, "skip image");
            }
        }
        if let Some(b) = &bar {
            b.inc(1);
        }
    }
    if let Some(b) = &bar {
        b.finish_and_clear();
    }
    Ok(list)
}

fn init_tracing_with_level(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error".to_string()
    } else {
        match verbose {
            0 => "info".into(),
            1 => "debug".into(),
            _ => "trace".into(),
        }
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_target(false)
        .try_init();
}

#[derive(Serialize)]
struct TemplateSprite {
    name: String,
    css_name: String,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    pixel_ratio: f32,
    scaled_w: f32,
    scaled_h: f32,
    frame: serde_json::Value,
}

#[derive(Serialize)]
struct TemplateContext {
    image: String,
    size: serde_json::Value,
    sprites: Vec<TemplateSprite>,
}

/// Template data: pixel frames plus logical (ratio-divided) sizes for stylesheet use.
fn build_template_context(atlas: &SpriteAtlas, image: &str) -> TemplateContext {
    let pad = atlas.config().padding;
    let mut sprites = Vec::with_capacity(atlas.len());
    for id in atlas.ids() {
        let (Some(slot), Some(pos)) = (atlas.slot(id), atlas.get_position(id)) else {
            continue;
        };
        let (x, y, w, h) = (slot.x + pad, slot.y + pad, slot.w - 2 * pad, slot.h - 2 * pad);
        let ratio = w as f32 / pos.size[0];
        sprites.push(TemplateSprite {
            name: id.to_string(),
            css_name: id.replace(['/', '.', ' '], "-"),
            x: x as f32 / ratio,
            y: y as f32 / ratio,
            width: pos.size[0],
            height: pos.size[1],
            pixel_ratio: ratio,
            scaled_w: atlas.width() as f32 / ratio,
            scaled_h: atlas.height() as f32 / ratio,
            frame: serde_json::json!({"x": x, "y": y, "w": w, "h": h}),
        });
    }
    TemplateContext {
        image: image.to_string(),
        size: serde_json::json!({"w": atlas.width(), "h": atlas.height()}),
        sprites,
    }
}

fn render_template(tpl: &str, ctx: &TemplateContext, out_path: &Path) -> anyhow::Result<()> {
    let mut reg = Handlebars::new();
    reg.set_strict_mode(true);
    reg.register_template_string("tpl", tpl)?;
    let rendered = reg.render("tpl", ctx)?;
    fs::write(out_path, rendered).with_context(|| format!("write {}", out_path.display()))?;
    info!(?out_path, "template written");
    Ok(())
}

/// Optional YAML overrides for `pack`; unset keys keep the command-line value.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct YamlConfig {
    width: Option<u32>,
    height: Option<u32>,
    max_width: Option<u32>,
    max_height: Option<u32>,
    padding: Option<u32>,
    pixel_ratio: Option<f32>,
}

impl YamlConfig {
    fn into_atlas_config(self, mut cfg: AtlasConfig) -> AtlasConfig {
        if let Some(v) = self.width {
            cfg.width = v;
        }
        if let Some(v) = self.height {
            cfg.height = v;
        }
        if let Some(v) = self.max_width {
            cfg.max_width = v;
        }
        if let Some(v) = self.max_height {
            cfg.max_height = v;
        }
        if let Some(v) = self.padding {
            cfg.padding = v;
        }
        if let Some(v) = self.pixel_ratio {
            cfg.pixel_ratio = v;
        }
        cfg
    }
}
