use anyhow::{Context, Result};
use clap::Parser;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use watermill::config::AppConfig;
use watermill::image_optimizer::{ImageError, RawImage};
use watermill::logging::{init_subscriber, LogFormat};
use watermill::pipeline::ImagePipeline;
use watermill::watermark::WatermarkConfig;

/// Watermill - optimize and watermark uploaded photos
#[derive(Parser, Debug)]
#[command(name = "watermill")]
#[command(version, about, long_about = None)]
struct Args {
    /// Image to process (repeatable)
    #[arg(short, long = "input", required = true)]
    inputs: Vec<PathBuf>,

    /// Directory for the processed JPEGs
    #[arg(short, long)]
    output_dir: PathBuf,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Logo source (https:// URL or absolute path), replaces the configured one
    #[arg(long)]
    logo: Option<String>,

    /// Optimize without watermarking
    #[arg(long)]
    no_watermark: bool,

    /// Maximum output width, replaces the size tier's bound
    #[arg(long)]
    max_width: Option<u32>,

    /// Maximum output height, replaces the size tier's bound
    #[arg(long)]
    max_height: Option<u32>,

    /// Log output format (json or pretty)
    #[arg(long, default_value = "json")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_subscriber(args.log_format)
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to initialize logging subsystem")?;

    let mut config = match &args.config {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => AppConfig::default(),
    };
    apply_overrides(&mut config, &args);
    config.validate().context("Invalid configuration")?;

    tracing::info!(
        inputs = args.inputs.len(),
        output_dir = %args.output_dir.display(),
        watermark_enabled = config.watermark.enabled,
        logo_sources = config.watermark.logo_sources().count(),
        "Configuration loaded successfully"
    );

    let output_names = output_names(&args.inputs)?;

    tokio::fs::create_dir_all(&args.output_dir)
        .await
        .with_context(|| format!("Failed to create {}", args.output_dir.display()))?;

    let pipeline = ImagePipeline::from_config(&config).context("Failed to build pipeline")?;

    let jobs = args.inputs.iter().zip(&output_names).map(|(input, name)| {
        process_file(&pipeline, &config.watermark, input, &args.output_dir, name)
    });
    let results = futures::future::join_all(jobs).await;

    let mut failures = 0usize;
    for (input, result) in args.inputs.iter().zip(results) {
        if let Err(e) = result {
            failures += 1;
            let rejected = e
                .downcast_ref::<ImageError>()
                .map(ImageError::is_client_error)
                .unwrap_or(false);
            if rejected {
                tracing::warn!(input = %input.display(), error = %format!("{:#}", e), "Rejected image");
            } else {
                tracing::error!(input = %input.display(), error = %format!("{:#}", e), "Failed to process image");
            }
        }
    }

    let stats = pipeline.logo_cache().stats();
    tracing::info!(
        processed = args.inputs.len() - failures,
        failed = failures,
        logo_cache_hits = stats.hits,
        logo_cache_misses = stats.misses,
        "Done"
    );

    if failures > 0 {
        anyhow::bail!("{} of {} images failed", failures, args.inputs.len());
    }
    Ok(())
}

fn apply_overrides(config: &mut AppConfig, args: &Args) {
    if let Some(logo) = &args.logo {
        config.watermark.logo_source = Some(logo.clone());
    }
    if args.no_watermark {
        config.watermark.enabled = false;
    }
    if args.max_width.is_some() {
        config.processing.max_width = args.max_width;
    }
    if args.max_height.is_some() {
        config.processing.max_height = args.max_height;
    }
}

async fn process_file(
    pipeline: &ImagePipeline,
    watermark: &WatermarkConfig,
    input: &Path,
    output_dir: &Path,
    output_name: &str,
) -> Result<()> {
    let bytes = tokio::fs::read(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let raw = RawImage::new(bytes, mime_type_for(input));

    let result = pipeline
        .process_image_with_watermark(raw, watermark)
        .await
        .with_context(|| format!("Failed to process {}", input.display()))?;

    let output = output_dir.join(format!("{}.{}", output_name, result.format.extension()));
    tokio::fs::write(&output, &result.bytes)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        width = result.width,
        height = result.height,
        bytes = result.byte_size,
        had_watermark = result.had_watermark,
        "Wrote processed image"
    );
    Ok(())
}

/// Output file name (without extension) for every input.
///
/// Inputs are named after their stem. Inputs sharing a stem keep their source
/// extension as a suffix (`a.png` -> `a-png`). Two inputs that would still
/// write the same file are an error.
fn output_names(inputs: &[PathBuf]) -> Result<Vec<String>> {
    let stem = |input: &PathBuf| {
        input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string())
    };

    let mut stem_counts: HashMap<String, usize> = HashMap::new();
    for input in inputs {
        *stem_counts.entry(stem(input)).or_default() += 1;
    }

    let mut seen = HashSet::new();
    let mut names = Vec::with_capacity(inputs.len());
    for input in inputs {
        let base = stem(input);
        let name = if stem_counts[&base] > 1 {
            let ext = input
                .extension()
                .map(|e| e.to_string_lossy().to_ascii_lowercase())
                .unwrap_or_default();
            format!("{}-{}", base, ext)
        } else {
            base
        };
        if !seen.insert(name.clone()) {
            anyhow::bail!(
                "{} would overwrite the output of another input named {}",
                input.display(),
                name
            );
        }
        names.push(name);
    }
    Ok(names)
}

/// MIME type an upload form would declare for this file name
fn mime_type_for(path: &Path) -> String {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_output_names_use_stem() {
        let names = output_names(&paths(&["in/a.png", "in/b.jpg"])).unwrap();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_output_names_keep_extension_on_shared_stem() {
        let names = output_names(&paths(&["in/a.png", "in/a.JPG", "in/c.gif"])).unwrap();
        assert_eq!(names, vec!["a-png", "a-jpg", "c"]);
    }

    #[test]
    fn test_output_names_reject_same_file_name() {
        let err = output_names(&paths(&["one/a.png", "two/a.png"])).unwrap_err();
        assert!(err.to_string().contains("would overwrite"));
    }

    #[test]
    fn test_mime_type_for() {
        assert_eq!(mime_type_for(Path::new("x.JPEG")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("x.png")), "image/png");
        assert_eq!(mime_type_for(Path::new("x")), "application/octet-stream");
    }
}
