//! CLI entry point for the web client.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use webclient::WebClient;

mod app_config;
mod cli;
mod commands;

use cli::{Args, Command};
use commands::{RequestMethod, run_download_command, run_request_command};

fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // Logs go to stderr; stdout carries response bodies.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let file_config = app_config::load_file_config(args.config.as_deref())?;
    let client = WebClient::with_parameters(file_config.client_parameters())
        .context("Failed to initialize HTTP client")?;

    let successful = match &args.command {
        Command::Get(request) => {
            run_request_command(&client, RequestMethod::Get, request, &file_config)?
        }
        Command::Head(request) => {
            run_request_command(&client, RequestMethod::Head, request, &file_config)?
        }
        Command::Post(request) => {
            run_request_command(&client, RequestMethod::Post, request, &file_config)?
        }
        Command::Put(request) => {
            run_request_command(&client, RequestMethod::Put, request, &file_config)?
        }
        Command::Download(download) => {
            run_download_command(&client, download, &file_config, !args.quiet)?
        }
    };

    Ok(if successful {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
