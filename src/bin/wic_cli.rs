//! WIC CLI - file web images into cloud storage from the command line
//!
//! Usage:
//!   wic-cli match <url> [--title <t>] [--mime <m>]  Show where an image from this page would go
//!   wic-cli validate <field> <input>                Validate a template field
//!   wic-cli check                                   Check provider credentials
//!   wic-cli save <file> <url> [--title <t>]         Upload an image file

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use url::Url;

use wic::providers::ProviderFactory;
use wic::template::{match_templates, validate_template_field, TemplateField};
use wic::{save_image, SaveRequest, WicConfig};

#[derive(Parser)]
#[command(
    name = "wic-cli",
    about = "Web Image Categorizer - template-driven image filing",
    version,
    long_about = "Resolves naming templates against page URLs and uploads images to\nFileLu, FileLu S5 or any S3-compatible storage."
)]
struct Cli {
    /// Config file (default: the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the destination for an image taken from a page
    Match {
        /// Page URL the image was found on
        url: String,
        /// Page title
        #[arg(long, default_value = "")]
        title: String,
        /// Image MIME type (e.g. image/png)
        #[arg(long)]
        mime: Option<String>,
    },
    /// Validate a template field input
    Validate {
        /// Which field the input belongs to
        field: FieldArg,
        /// The template text to validate
        input: String,
    },
    /// Check the configured provider credentials
    Check,
    /// Upload an image file as if it was grabbed from a page
    Save {
        /// Image file to upload
        file: PathBuf,
        /// Page URL to resolve templates against
        url: String,
        /// Page title
        #[arg(long, default_value = "")]
        title: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FieldArg {
    Directory,
    FileName,
    Description,
}

impl From<FieldArg> for TemplateField {
    fn from(value: FieldArg) -> Self {
        match value {
            FieldArg::Directory => TemplateField::Directory,
            FieldArg::FileName => TemplateField::FileName,
            FieldArg::Description => TemplateField::Description,
        }
    }
}

fn load(config_path: Option<&Path>) -> WicConfig {
    match config_path {
        Some(path) => wic::config::load_config_from(path),
        None => wic::load_config(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = load(cli.config.as_deref());

    match cli.command {
        Commands::Match { url, title, mime } => {
            let page_url = Url::parse(&url).context("Invalid page URL")?;
            match match_templates(&config.templates, &page_url, &title, mime.as_deref()) {
                Ok(result) => {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Validate { field, input } => {
            match validate_template_field(&input, field.into()) {
                Ok(()) => println!("OK"),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Check => {
            let Some(settings) = config.provider.as_ref() else {
                eprintln!("Error: No storage provider is configured");
                std::process::exit(1);
            };
            match ProviderFactory::create(settings) {
                Ok(provider) => {
                    if provider.validate_credentials().await {
                        println!("Credentials OK ({})", provider.kind());
                    } else {
                        eprintln!("Credential check failed ({})", provider.kind());
                        std::process::exit(1);
                    }
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Save { file, url, title } => {
            let page_url = Url::parse(&url).context("Invalid page URL")?;
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let mime_type = mime_guess::from_path(&file).first_raw().map(str::to_string);

            let request = SaveRequest {
                page_url,
                page_title: title,
                mime_type,
                bytes,
            };
            match save_image(&config, request).await {
                Ok(outcome) => {
                    println!("Saved to {}/{}", outcome.directory, outcome.file_name);
                    println!("Remote id: {}", outcome.remote_id);
                    if !outcome.matched {
                        println!("(no template matched, default path used)");
                    }
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
