//! # ScanSheet Binary Entry Point
//!
//! Thin wrapper that stands in for the capture UI: it reads image files,
//! runs the scan pipeline, and manages the generated tables.
//!
//! ## Usage
//!
//! ```bash
//! scansheet scan --config config/scansheet.toml page1.jpg page2.png
//! scansheet list --config config/scansheet.toml
//! scansheet delete --config config/scansheet.toml ficha_cadastro_20250803_101500.csv
//! ```
//!
//! A scan will:
//! 1. Load configuration from the specified TOML file
//! 2. Check the key and settings (no request is sent if they are invalid)
//! 3. Validate each image (JPEG/PNG, size ceiling)
//! 4. Run the pipeline on a background task
//! 5. Print the path of the saved table

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use scansheet::capture::load_images;
use scansheet::processing::{format_file_size, ArtifactStore};
use scansheet::utils::logging::init_logger;
use scansheet::{PipelineConfig, ScanPipeline};

/// Command-line arguments for the scansheet binary
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (TOML format)
    ///
    /// Example: config/scansheet.toml
    #[arg(short, long, global = true, default_value = "config/scansheet.toml")]
    config: String,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send images to the recognition service and save the resulting table
    Scan {
        /// Form type sent to the service (defaults to the configured title)
        #[arg(short, long)]
        title: Option<String>,

        /// Images in page order
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
    /// List saved tables, newest first
    List,
    /// Delete a saved table by file name or path
    Delete { file: PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    init_logger(args.verbose);

    let config = PipelineConfig::from_file(&args.config)?;

    match args.command {
        Command::Scan { title, images } => {
            let pipeline = Arc::new(ScanPipeline::from_config(&config)?);
            let images = load_images(&images, config.scan.max_image_bytes)?;

            let task = match title {
                Some(title) => pipeline.spawn_with_title(images, title),
                None => pipeline.spawn(images),
            };

            match task.await {
                Ok(artifact) => {
                    println!(
                        "{} ({})",
                        artifact.path.display(),
                        format_file_size(artifact.size)
                    );
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    eprintln!("Scan failed: {}", e);
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::List => {
            let store = ArtifactStore::new(&config.output.directory, config.output.file_prefix.as_str());
            for artifact in store.list()? {
                println!(
                    "{}\t{}\t{}",
                    artifact.created.format("%Y-%m-%d %H:%M:%S"),
                    format_file_size(artifact.size),
                    artifact.name()
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Delete { file } => {
            let store = ArtifactStore::new(&config.output.directory, config.output.file_prefix.as_str());
            store.delete(&file)?;
            println!("Deleted {}", file.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}
