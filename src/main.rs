// A small runner over the `pixel_colors` library: analyzes still images and prints
// one JSON line per image, in the order the paths were given.
//
// Usage: pixel_colors [--options <json>] [--motion] [--max-dimension <px>] <image>...

use anyhow::{Context, bail};
use futures::stream::{self, StreamExt};
use log::{error, info};
use pixel_colors::adapter::load_image;
use pixel_colors::{AnalysisOptions, PipelineConfig, PixelAnalyzer, PixelColorsResult};
use serde_json::json;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

struct Args {
    options: AnalysisOptions,
    config: PipelineConfig,
    images: Vec<PathBuf>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut options_json = None;
    let mut motion = false;
    let mut config = PipelineConfig::default();
    let mut images = Vec::new();

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--options" => {
                options_json = Some(args.next().context("--options needs a JSON argument")?);
            }
            "--motion" => motion = true,
            "--max-dimension" => {
                let raw = args.next().context("--max-dimension needs a pixel count")?;
                config.max_working_dimension = raw
                    .parse()
                    .with_context(|| format!("--max-dimension {raw} is not a pixel count"))?;
                if config.max_working_dimension == 0 {
                    bail!("--max-dimension must be at least 1");
                }
            }
            flag if flag.starts_with("--") => bail!("unknown flag {flag}"),
            _ => images.push(PathBuf::from(arg)),
        }
    }

    let mut options: AnalysisOptions = match options_json {
        Some(raw) => serde_json::from_str(&raw).context("--options is not a valid options object")?,
        None => AnalysisOptions::default(),
    };
    if motion {
        options.enable_motion_detection = true;
    }
    Ok(Args { options, config, images })
}

async fn analyze_path(
    analyzer: Arc<PixelAnalyzer>,
    options: Arc<AnalysisOptions>,
    max_dimension: u32,
    path: PathBuf,
) -> anyhow::Result<PixelColorsResult> {
    let display = path.display().to_string();
    tokio::task::spawn_blocking(move || -> anyhow::Result<PixelColorsResult> {
        let buffer = load_image(&path, max_dimension)
            .with_context(|| format!("failed to load {}", path.display()))?;
        Ok(analyzer.try_analyze(&buffer, &options)?)
    })
    .await
    .with_context(|| format!("analysis of {display} was aborted"))?
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let Args { options, config, images } = parse_args()?;
    if images.is_empty() {
        println!("Usage: pixel_colors [--options <json>] [--motion] [--max-dimension <px>] <image>...");
        return Ok(());
    }

    // Motion compares consecutive images, so it needs them one at a time.
    let concurrency = if options.enable_motion_detection {
        1
    } else {
        num_cpus::get()
    };
    info!("analyzing {} image(s), {concurrency} at a time", images.len());

    let max_dimension = config.max_working_dimension;
    let analyzer = Arc::new(PixelAnalyzer::new());
    let options = Arc::new(options);
    let mut results = stream::iter(images.into_iter().map(|path| {
        let analyzer = Arc::clone(&analyzer);
        let options = Arc::clone(&options);
        async move {
            let outcome = analyze_path(analyzer, options, max_dimension, path.clone()).await;
            (path, outcome)
        }
    }))
    .buffered(concurrency);

    let mut failures = 0usize;
    while let Some((path, outcome)) = results.next().await {
        match outcome {
            Ok(result) => {
                let line = json!({ "image": path.display().to_string(), "result": result });
                println!("{line}");
            }
            Err(err) => {
                error!("{}: {err:#}", path.display());
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{failures} image(s) could not be analyzed");
    }
    Ok(())
}
