use anyhow::{Context, Result};
use base64::Engine as _;
use clap::{Parser, Subcommand, ValueEnum};
use gasread::metrics::{extract_from_text, ExtractionResult, METRIC_BANK};
use gasread::{OcrEngine, OcrMode, OcrPipeline, OcrRequest, OcrResult, PipelineConfig, QualityVerdict};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "gasread",
    about = "Read blood-gas analyzer printouts from photos",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recognize one or more printout photos
    Scan {
        /// Image files (PNG, JPEG, BMP, TIFF, WebP)
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Language alias or Tesseract code (en, ar, multilingual, eng+deu, ...)
        #[arg(short, long, default_value = "eng")]
        lang: String,

        /// Only the simple variant and the first segmentation mode
        #[arg(long)]
        fast: bool,

        /// Print the full result record as JSON
        #[arg(long)]
        json: bool,

        /// Pipeline configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Recognition backend
        #[arg(short, long, value_enum, default_value_t = EngineArg::TesseractCli)]
        engine: EngineArg,
    },

    /// Extract metrics from already recognized text
    Extract {
        /// Text file, or `-` for stdin
        input: String,

        /// Print the metrics as a JSON object
        #[arg(long)]
        json: bool,
    },

    /// List the metric pattern bank
    Patterns {
        /// Print the bank as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EngineArg {
    /// `tesseract` executable on PATH
    TesseractCli,
    /// In-process libtesseract (needs the `tesseract` feature)
    Tesseract,
    /// Canned printout, for trying the tool without an engine
    Mock,
}

impl From<EngineArg> for OcrEngine {
    fn from(arg: EngineArg) -> Self {
        match arg {
            EngineArg::TesseractCli => OcrEngine::TesseractCli,
            EngineArg::Tesseract => OcrEngine::Tesseract,
            EngineArg::Mock => OcrEngine::Mock,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gasread=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            images,
            lang,
            fast,
            json,
            config,
            engine,
        } => {
            let config = match config {
                Some(path) => PipelineConfig::from_json_file(&path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => PipelineConfig::default(),
            };
            let pipeline = Arc::new(OcrPipeline::with_engine(engine.into(), config)?);
            let mode = if fast { OcrMode::Fast } else { OcrMode::Enhanced };
            debug!(files = images.len(), %mode, engine = pipeline.engine_name(), "Scanning");

            let mut handles = Vec::with_capacity(images.len());
            for path in &images {
                let payload = encode_file(path)?;
                let request = OcrRequest::new(payload).with_language(lang.clone()).with_mode(mode);
                let pipeline = Arc::clone(&pipeline);
                handles.push(tokio::spawn(async move { pipeline.perform_ocr(request).await }));
            }

            let mut failures = 0;
            for (path, handle) in images.iter().zip(handles) {
                let result = handle.await.context("OCR task aborted")?;
                let verdict = pipeline.assess(&result);
                if !result.success {
                    failures += 1;
                }

                if json {
                    let mut record = serde_json::to_value(&result)?;
                    record["file"] = serde_json::json!(path.display().to_string());
                    record["quality"] = serde_json::to_value(&verdict)?;
                    println!("{}", serde_json::to_string_pretty(&record)?);
                } else {
                    print_scan(path, &result, &verdict);
                }
            }

            if failures > 0 {
                std::process::exit(1);
            }
        }

        Commands::Extract { input, json } => {
            let text = read_text(&input)?;
            let metrics = extract_from_text(&text);

            if json {
                println!("{}", serde_json::to_string_pretty(&metrics)?);
            } else if metrics.is_empty() {
                println!("No metrics found");
            } else {
                print_metrics(&metrics);
            }
        }

        Commands::Patterns { json } => {
            if json {
                let bank: Vec<_> = METRIC_BANK
                    .iter()
                    .map(|spec| {
                        serde_json::json!({
                            "name": spec.name,
                            "range": [spec.range.0, spec.range.1],
                            "case_sensitive": spec.case_sensitive,
                            "patterns": spec.patterns,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&bank)?);
            } else {
                for spec in METRIC_BANK {
                    println!(
                        "{:<10} [{}, {}]{}",
                        spec.name,
                        spec.range.0,
                        spec.range.1,
                        if spec.case_sensitive { "  case-sensitive" } else { "" }
                    );
                    for pattern in spec.patterns {
                        println!("    {pattern}");
                    }
                }
            }
        }
    }

    Ok(())
}

fn encode_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
}

fn read_text(input: &str) -> Result<String> {
    if input == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        Ok(text)
    } else {
        std::fs::read_to_string(input).with_context(|| format!("Failed to read {input}"))
    }
}

fn print_scan(path: &Path, result: &OcrResult, verdict: &QualityVerdict) {
    println!("{}", path.display());

    if !result.success {
        println!(
            "  Error: {}",
            result.error_message.as_deref().unwrap_or("Could not read image.")
        );
        return;
    }

    println!(
        "  Engine: {}{}",
        result.engine,
        result
            .variant
            .as_deref()
            .map(|v| format!(" ({v})"))
            .unwrap_or_default()
    );
    println!(
        "  Confidence: {:.0}%  Quality: {:?}",
        result.avg_confidence * 100.0,
        verdict.quality
    );
    if let Some(recommendation) = &verdict.recommendation {
        println!("  {recommendation}");
    }

    if result.key_metrics.is_empty() {
        println!("  No metrics found");
    } else {
        print_metrics(&result.key_metrics);
    }
}

/// Metrics in bank order
fn print_metrics(metrics: &ExtractionResult) {
    for spec in METRIC_BANK {
        if let Some(value) = metrics.get(spec.name) {
            println!("  {:<10} {value}", spec.name);
        }
    }
}
