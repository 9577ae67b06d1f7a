use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    presentation::{render_error, render_verdict},
    HttpCompareTransport, ImageSource, Locale, PathImageSource, SubmissionFlow, Theme,
    TransportOptions,
};
use shared::{domain::ImageSlot, error::ErrorReport};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod chat;
mod config;

use config::{load_settings, validate_endpoint, Settings, DEFAULT_SETTINGS_FILE};

#[derive(Parser, Debug)]
#[command(name = "facecheck", about = "Compare two face photos with a remote verification service")]
struct Cli {
    /// Comparison endpoint (overrides settings file and environment).
    #[arg(long, global = true)]
    endpoint: Option<String>,
    #[arg(long, global = true, default_value = DEFAULT_SETTINGS_FILE)]
    config: PathBuf,
    /// TOML file with translated user-facing strings.
    #[arg(long, global = true)]
    locale_file: Option<PathBuf>,
    #[arg(long, global = true)]
    no_color: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit one image pair and print the verdict.
    Compare {
        first: PathBuf,
        second: PathBuf,
        /// Print the verdict or error as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Pick images and compare them interactively.
    Chat,
}

fn resolve_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = load_settings(&cli.config)?;
    if let Some(endpoint) = &cli.endpoint {
        settings.endpoint = validate_endpoint(endpoint)?;
    }
    if let Some(path) = &cli.locale_file {
        settings.locale_file = Some(path.clone());
    }
    if cli.no_color {
        settings.color = false;
    }
    Ok(settings)
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn compare_once(
    transport: &HttpCompareTransport,
    first: PathBuf,
    second: PathBuf,
    json: bool,
    locale: &Locale,
    theme: &Theme,
) -> Result<ExitCode> {
    let source = PathImageSource::new()
        .with_path(ImageSlot::First, first)
        .with_path(ImageSlot::Second, second);
    let mut flow = SubmissionFlow::new();

    let mut outcome = Ok(());
    for slot in ImageSlot::ALL {
        match source.pick(slot).await {
            Ok(Some(image)) => {
                if let Err(err) = flow.select_image(slot, image) {
                    outcome = Err(err);
                    break;
                }
            }
            Ok(None) => {}
            Err(err) => {
                outcome = Err(err);
                break;
            }
        }
    }
    let outcome = match outcome {
        Ok(()) => flow.submit(transport).await,
        Err(err) => Err(err),
    };

    match outcome {
        Ok(result) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", render_verdict(&result, locale, theme));
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            warn!(code = ?err.code(), "comparison did not produce a verdict");
            if json {
                let report = ErrorReport::new(err.code(), locale.message_for(&err));
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                eprintln!("{}", render_error(&err, locale, theme));
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let settings = resolve_settings(&cli)?;
    init_tracing(&settings);

    let locale = match &settings.locale_file {
        Some(path) => Locale::load(path)?,
        None => Locale::default(),
    };
    let theme = if settings.color {
        Theme::default()
    } else {
        Theme::plain()
    };
    let transport = HttpCompareTransport::new(TransportOptions {
        endpoint: settings.endpoint.clone(),
        request_timeout: settings.request_timeout(),
    })
    .context("failed to build http client")?;
    info!(endpoint = transport.endpoint(), "facecheck ready");

    match cli.command {
        Command::Compare {
            first,
            second,
            json,
        } => compare_once(&transport, first, second, json, &locale, &theme).await,
        Command::Chat => {
            chat::run(&transport, &locale, &theme).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
