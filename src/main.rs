use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use serde_json::json;

use brc::banner::Banner;
use brc::config::load_bot_config;
use brc::error::find_config_validation_error;
use brc::frames::load_pixmap;
use brc::geom::{parse_hex_color, Margins};

// Fixed layout of the leaderboard banner.
const BAR_LENGTH: u32 = 620;
const BAR_HEIGHT: u32 = 50;
const BAR_RIGHT_MARGIN: u32 = 20;
const BAR_OUTLINE_WIDTH: u32 = 5;
const MEDAL_MAX_DIMENSION: u32 = 200;
const MEDAL_OVERLAP_PX: u32 = 50;

#[derive(Debug, Parser)]
#[command(name = "brc")]
#[command(about = "Banner Render Compiler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Composite a leaderboard banner over a base raster
    Render(Box<RenderArgs>),
    /// Validate a bot configuration document
    CheckConfig {
        config: PathBuf,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Args)]
struct RenderArgs {
    /// Base raster, static or animated GIF
    input: PathBuf,
    #[arg(short = 'o', long = "output", default_value = "result.gif")]
    output: PathBuf,
    #[arg(long, default_value = "preview.png")]
    preview: PathBuf,
    #[arg(long)]
    nickname: String,
    #[arg(long, default_value_t = 0)]
    rank: u32,
    #[arg(long, default_value_t = 0)]
    level: u32,
    #[arg(long, default_value_t = 0)]
    percent: i32,
    /// Accent mask raster for the nickname
    #[arg(long)]
    mask: Option<PathBuf>,
    #[arg(long)]
    heading_font: Option<PathBuf>,
    #[arg(long)]
    body_font: Option<PathBuf>,
    #[arg(long, default_value_t = 42.0)]
    font_size: f32,
    /// Medal alias, repeatable; unknown aliases render the stub icon
    #[arg(long = "medal")]
    medals: Vec<String>,
    /// Icon registration as alias=path, repeatable
    #[arg(long = "icon", value_parser = parse_icon_spec)]
    icons: Vec<(String, PathBuf)>,
    #[arg(long, default_value = "#000000")]
    text_color: String,
    /// Accent color for the masked nickname pass, defaults to text color
    #[arg(long)]
    accent_color: Option<String>,
    #[arg(long, default_value = "#dc6942")]
    bar_color: String,
}

fn parse_icon_spec(raw: &str) -> Result<(String, PathBuf), String> {
    let (alias, path) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected alias=path, got '{raw}'"))?;
    if alias.is_empty() || path.is_empty() {
        return Err(format!("expected alias=path, got '{raw}'"));
    }
    Ok((alias.to_owned(), PathBuf::from(path)))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Render(args) => run_render(&args),
        Commands::CheckConfig { config, json } => run_check_config(&config, json),
    }
}

fn run_render(args: &RenderArgs) -> Result<()> {
    let mut banner = Banner::open(&args.input)?;

    if let Some(path) = &args.heading_font {
        banner.register_font("heading", path, args.font_size);
    }
    if let Some(path) = &args.body_font {
        banner.register_font("body", path, args.font_size);
    }
    for (alias, path) in &args.icons {
        banner.register_icon(alias, path)?;
    }

    let mask = match &args.mask {
        Some(path) => Some(load_pixmap("mask", path)?),
        None => None,
    };

    let text_color = parse_hex_color(&args.text_color)?;
    let accent_color = args
        .accent_color
        .as_deref()
        .map(parse_hex_color)
        .transpose()?;
    let bar_color = parse_hex_color(&args.bar_color)?;

    banner.draw_text(
        &args.nickname,
        "heading",
        Margins::new(10, 10, 0, 0),
        text_color,
        accent_color,
        mask.as_ref(),
    )?;

    banner.move_cursor(0, 5);
    banner.set_cursor(Some(40), None);
    banner.draw_text(
        &format!("Rank: {}", args.rank),
        "body",
        Margins::NONE,
        text_color,
        None,
        None,
    )?;

    banner.draw_progress_bar(
        args.percent,
        BAR_LENGTH,
        BAR_HEIGHT,
        BAR_RIGHT_MARGIN,
        BAR_OUTLINE_WIDTH,
        bar_color,
    )?;

    banner.move_cursor(-10, 10);
    banner.draw_text(
        &format!("LVL: {}", args.level),
        "body",
        Margins::NONE,
        text_color,
        None,
        None,
    )?;

    banner.move_cursor(0, 10);
    banner.draw_text("Medals:", "body", Margins::NONE, text_color, None, None)?;

    if !args.medals.is_empty() {
        banner.move_cursor(0, 40);
        banner.set_cursor(Some(40), None);
        let aliases = args.medals.iter().map(String::as_str).collect::<Vec<_>>();
        banner.draw_icon_row(&aliases, MEDAL_MAX_DIMENSION, MEDAL_OVERLAP_PX)?;
    }

    let sequence = banner.render();
    eprintln!(
        "[brc] composited {} frame(s) at {}ms/frame",
        sequence.frame_count(),
        sequence.duration_ms
    );

    sequence.save_gif(&args.output)?;
    sequence.save_preview(&args.preview)?;
    println!(
        "Wrote {} and {}",
        args.output.display(),
        args.preview.display()
    );
    Ok(())
}

fn run_check_config(path: &Path, json: bool) -> Result<()> {
    match load_bot_config(path) {
        Ok(_) => {
            if json {
                println!(
                    "{}",
                    json!({ "ok": true, "config": path.display().to_string() })
                );
            } else {
                println!("OK: {} (discord.api_key set)", path.display());
            }
            Ok(())
        }
        Err(error) => {
            if json {
                let code = if find_config_validation_error(&error).is_some() {
                    "CONFIG_VALIDATION"
                } else {
                    "IO"
                };
                println!(
                    "{}",
                    json!({
                        "ok": false,
                        "error": { "code": code, "message": format!("{error:#}") }
                    })
                );
                std::process::exit(1);
            }
            Err(error)
        }
    }
}
