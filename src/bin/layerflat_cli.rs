//! Layerflat CLI - Batch Front End
//!
//! Commands: flatten, validate, color
//! Outputs JSON to stdout, logs to stderr
//! Returns 2 if any document failed, 1 on usage/config errors

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use layerflat_core::{
    export::export_document,
    logging::init_logging,
    Document, EngineConfig, FileRasterSource, FlattenPipeline,
};

#[derive(Parser)]
#[command(name = "layerflat-cli")]
#[command(about = "Layerflat CLI - flatten layered documents into PNG layers and a preview")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to engine config (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Flatten one or more documents
    Flatten {
        /// Document files (JSON layer tree)
        #[arg(required = true)]
        documents: Vec<PathBuf>,

        /// Output directory (defaults to each document's directory)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Raster directory holding <layer id>.png (defaults to <doc dir>/<doc stem>)
        #[arg(short, long)]
        rasters: Option<PathBuf>,
    },

    /// Validate a document
    Validate {
        document: PathBuf,
    },

    /// Print the document color
    Color {
        document: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match EngineConfig::load_from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!(r#"{{"error": "Failed to load config: {}"}}"#, e);
                return ExitCode::FAILURE;
            }
        },
        None => EngineConfig::default(),
    };
    init_logging(&config.logging);

    let pipeline = FlattenPipeline::new(config);

    match cli.command {
        Commands::Flatten { documents, out_dir, rasters } => {
            let mut failed = 0usize;
            let mut results = Vec::with_capacity(documents.len());

            for (i, path) in documents.iter().enumerate() {
                let span = tracing::info_span!("document", n = i + 1, path = %path.display());
                let _guard = span.enter();

                match flatten_one(&pipeline, path, out_dir.as_deref(), rasters.as_deref()) {
                    Ok(report) => results.push(serde_json::json!({
                        "success": true,
                        "report": report,
                    })),
                    Err(e) => {
                        tracing::error!("{}", e);
                        failed += 1;
                        results.push(serde_json::json!({
                            "success": false,
                            "source": path.display().to_string(),
                            "error": e,
                        }));
                    }
                }
            }

            print_json(&serde_json::Value::Array(results));
            if failed > 0 {
                ExitCode::from(2)
            } else {
                ExitCode::SUCCESS
            }
        }

        Commands::Validate { document } => {
            let doc = match Document::load_from_file(&document) {
                Ok(d) => d,
                Err(e) => {
                    print_json(&serde_json::json!({"valid": false, "error": e.to_string()}));
                    return ExitCode::FAILURE;
                }
            };

            let result = pipeline.validate_document(&doc);
            print_json(&result);
            if result.valid {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            }
        }

        Commands::Color { document } => {
            let color = Document::load_from_file(&document)
                .map_err(|e| e.to_string())
                .and_then(|doc| pipeline.extract_color(&doc).map_err(|e| e.to_string()));

            match color {
                Ok(color) => {
                    print_json(&serde_json::json!({"color": color}));
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    print_json(&serde_json::json!({"color": null, "error": e}));
                    ExitCode::from(2)
                }
            }
        }
    }
}

fn flatten_one(
    pipeline: &FlattenPipeline,
    path: &Path,
    out_dir: Option<&Path>,
    rasters: Option<&Path>,
) -> Result<layerflat_core::DocumentReport, String> {
    let doc = Document::load_from_file(path).map_err(|e| e.to_string())?;

    let doc_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| format!("{} has no file name", path.display()))?;

    let source = match rasters {
        Some(dir) => FileRasterSource::new(dir),
        None => FileRasterSource::new(doc_dir.join(&stem)),
    };

    let flat = pipeline.flatten(&doc, &source).map_err(|e| e.to_string())?;
    let out = out_dir.unwrap_or(doc_dir);
    export_document(&flat, out, &stem, &path.display().to_string()).map_err(|e| e.to_string())
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!(r#"{{"error": "Failed to serialize output: {}"}}"#, e),
    }
}
