//! CLI for pixgen - prompt-to-image generation.

use clap::{Args, Parser, Subcommand, ValueEnum};
use pixgen::backends;
use pixgen::{AspectRatio, BackendConfig, BackendKind, GenerationRequest, Resolution, writer};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pixgen")]
#[command(about = "Generate images from text prompts via the Gemini API or OpenRouter")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an image from a text prompt
    Generate(GenerateArgs),

    /// List available backends
    Backends,
}

#[derive(Args)]
struct GenerateArgs {
    /// The text prompt describing the image
    prompt: String,

    /// Output file path (always written as PNG)
    #[arg(short, long, default_value = "generated_image.png")]
    output: PathBuf,

    /// Model identifier (defaults to the backend's image model)
    #[arg(short, long)]
    model: Option<String>,

    /// Aspect ratio
    #[arg(short, long, value_enum)]
    aspect_ratio: Option<AspectRatioArg>,

    /// Output resolution
    #[arg(short, long, value_enum)]
    resolution: Option<ResolutionArg>,

    /// Reference image path(s), repeatable (native Gemini backend only)
    #[arg(short, long = "input")]
    input: Vec<PathBuf>,

    /// Gemini API key (overrides GEMINI_API_KEY)
    #[arg(long, value_name = "KEY")]
    gemini_api_key: Option<String>,

    /// OpenRouter API key (overrides OPENROUTER_API_KEY)
    #[arg(long, value_name = "KEY")]
    openrouter_api_key: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AspectRatioArg {
    #[value(name = "1:1")]
    Square,
    #[value(name = "2:3")]
    ClassicPortrait,
    #[value(name = "3:2")]
    Classic,
    #[value(name = "3:4")]
    StandardPortrait,
    #[value(name = "4:3")]
    Standard,
    #[value(name = "4:5")]
    LargeFormatPortrait,
    #[value(name = "5:4")]
    LargeFormat,
    #[value(name = "9:16")]
    Portrait,
    #[value(name = "16:9")]
    Landscape,
    #[value(name = "21:9")]
    Ultrawide,
}

impl From<AspectRatioArg> for AspectRatio {
    fn from(arg: AspectRatioArg) -> Self {
        match arg {
            AspectRatioArg::Square => AspectRatio::Square,
            AspectRatioArg::ClassicPortrait => AspectRatio::ClassicPortrait,
            AspectRatioArg::Classic => AspectRatio::Classic,
            AspectRatioArg::StandardPortrait => AspectRatio::StandardPortrait,
            AspectRatioArg::Standard => AspectRatio::Standard,
            AspectRatioArg::LargeFormatPortrait => AspectRatio::LargeFormatPortrait,
            AspectRatioArg::LargeFormat => AspectRatio::LargeFormat,
            AspectRatioArg::Portrait => AspectRatio::Portrait,
            AspectRatioArg::Landscape => AspectRatio::Landscape,
            AspectRatioArg::Ultrawide => AspectRatio::Ultrawide,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ResolutionArg {
    #[value(name = "1K")]
    OneK,
    #[value(name = "2K")]
    TwoK,
    #[value(name = "4K")]
    FourK,
}

impl From<ResolutionArg> for Resolution {
    fn from(arg: ResolutionArg) -> Self {
        match arg {
            ResolutionArg::OneK => Resolution::OneK,
            ResolutionArg::TwoK => Resolution::TwoK,
            ResolutionArg::FourK => Resolution::FourK,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate(args) => generate(args, cli.json).await,
        Commands::Backends => list_backends(cli.json),
    }
}

async fn generate(args: GenerateArgs, json_output: bool) -> anyhow::Result<()> {
    let config = BackendConfig::resolve(args.gemini_api_key, args.openrouter_api_key)?;

    // Reference images only make sense on the native backend; reject
    // before any file or network I/O.
    if !args.input.is_empty() && config.kind() != BackendKind::Gemini {
        anyhow::bail!(
            "--input requires the native Gemini backend (set GEMINI_API_KEY or pass --gemini-api-key)"
        );
    }

    let mut request = GenerationRequest::new(&args.prompt);
    if let Some(model) = args.model {
        request = request.with_model(model);
    }
    if let Some(ratio) = args.aspect_ratio {
        request = request.with_aspect_ratio(ratio.into());
    }
    if let Some(resolution) = args.resolution {
        request = request.with_resolution(resolution.into());
    }
    for path in &args.input {
        let data = std::fs::read(path)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
        request = request.with_reference_image(data);
    }

    let backend = backends::from_config(config)?;

    if !json_output {
        println!("Generating image via {}...", backend.name());
    }

    let image = backend.generate(&request).await?;
    let saved = writer::save_png(&image.data, &args.output)?;

    if json_output {
        let result = serde_json::json!({
            "success": true,
            "output": saved.display().to_string(),
            "size_bytes": image.size(),
            "source_format": image.format.extension(),
            "backend": image.backend.to_string(),
            "model": image.metadata.model,
            "duration_ms": image.metadata.duration_ms,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("Image saved to: {}", saved.display());
        if let Some(duration) = image.metadata.duration_ms {
            println!("Duration: {}ms", duration);
        }
    }

    Ok(())
}

fn list_backends(json_output: bool) -> anyhow::Result<()> {
    #[derive(serde::Serialize)]
    struct BackendInfo {
        name: &'static str,
        kind: BackendKind,
        env_var: &'static str,
        configured: bool,
    }

    let backends = [BackendKind::Gemini, BackendKind::OpenRouter].map(|kind| BackendInfo {
        name: match kind {
            BackendKind::Gemini => "Gemini (native API)",
            BackendKind::OpenRouter => "OpenRouter (gateway)",
        },
        kind,
        env_var: kind.env_var(),
        configured: std::env::var(kind.env_var())
            .map(|value| !value.trim().is_empty())
            .unwrap_or(false),
    });

    if json_output {
        println!("{}", serde_json::to_string_pretty(&backends)?);
    } else {
        println!("Available backends (native Gemini wins when both are configured):\n");
        for backend in &backends {
            let status = if backend.configured { "✓" } else { "✗" };
            println!("  {} {} ({})", status, backend.name, backend.kind);
            println!("    API key: {}", backend.env_var);
        }
    }

    Ok(())
}
