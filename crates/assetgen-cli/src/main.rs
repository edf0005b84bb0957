use std::path::PathBuf;

use anyhow::{Context, Result};
use assetgen_contracts::{Engine, GenerationRequest, ResizeSpec};
use assetgen_engine::{resize, AssetEngine, GeneratedImage};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "assetgen",
    version,
    about = "Generate PNG assets for mobile games with Replicate image models"
)]
struct Cli {
    /// Description of the asset to generate.
    #[arg(long)]
    prompt: String,
    /// Generation engine: `fast` (FLUX schnell) or `quality` (SDXL).
    #[arg(long, default_value = "fast")]
    engine: Engine,
    /// Negative prompt; the fast engine ignores it with a warning.
    #[arg(long)]
    negative: Option<String>,
    #[arg(long, default_value_t = 1024, value_parser = clap::value_parser!(u32).range(1..))]
    width: u32,
    #[arg(long, default_value_t = 1024, value_parser = clap::value_parser!(u32).range(1..))]
    height: u32,
    /// Number of images to request.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    num: u32,
    /// Base file name; outputs are `{output}_{n}.png`.
    #[arg(long, default_value = "generated")]
    output: String,
    /// Target box for the mobile resize.
    #[arg(
        long,
        num_args = 2,
        value_names = ["W", "H"],
        default_values_t = [512u32, 512u32],
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    mobile: Vec<u32>,
    /// Keep the provider's dimensions.
    #[arg(long)]
    no_resize: bool,
    /// Stretch to the target box instead of letterboxing.
    #[arg(long, conflicts_with = "no_resize")]
    stretch: bool,
    #[arg(long, default_value = "assets")]
    output_dir: PathBuf,
    /// Append JSONL run events to this file.
    #[arg(long)]
    events: Option<PathBuf>,
}

impl Cli {
    fn generation_request(&self) -> Result<GenerationRequest> {
        let request = GenerationRequest::new(
            self.prompt.clone(),
            self.engine,
            self.width,
            self.height,
            self.num,
        )?;
        Ok(match &self.negative {
            Some(negative) => request.with_negative_prompt(negative.clone()),
            None => request,
        })
    }

    fn resize_spec(&self) -> Result<Option<ResizeSpec>> {
        if self.no_resize {
            return Ok(None);
        }
        let [width, height] = self.mobile.as_slice() else {
            anyhow::bail!("--mobile expects exactly two values (W H)");
        };
        Ok(Some(
            ResizeSpec::new(*width, *height)?.with_preserve_aspect(!self.stretch),
        ))
    }
}

fn main() {
    pretty_env_logger::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("assetgen error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    load_env_file();
    let cli = Cli::parse();
    let request = cli.generation_request()?;
    let resize_spec = cli.resize_spec()?;

    let mut engine = AssetEngine::replicate_from_env()?;
    if let Some(events) = &cli.events {
        engine = engine.with_event_log(events);
    }

    println!(
        "Generating {} image(s) with prompt: {}",
        request.count(),
        request.prompt()
    );
    let generation = engine
        .generate(&request)
        .with_context(|| format!("{} generation failed", request.engine()))?;
    for warning in &generation.warnings {
        println!("Warning: {warning}");
    }

    let images: Vec<GeneratedImage> = match resize_spec {
        Some(spec) => {
            let resized = generation
                .images
                .iter()
                .map(|image| resize(image, &spec))
                .collect();
            println!(
                "Resized for mobile: {}x{}",
                spec.target_width(),
                spec.target_height()
            );
            resized
        }
        None => generation.images,
    };

    let artifacts = engine.save(&images, &cli.output, &cli.output_dir)?;
    println!("Saved assets:");
    for artifact in &artifacts {
        println!(" - {}", artifact.path.display());
    }
    Ok(0)
}

fn load_env_file() {
    match dotenv::dotenv() {
        Ok(path) => log::debug!("loaded environment from {}", path.display()),
        Err(err) => log::debug!("no .env file loaded: {err}"),
    }
}
