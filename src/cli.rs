//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Largest accepted `--buffer-size`, in bytes.
const MAX_BUFFER_SIZE: usize = 16 * 1024 * 1024;

/// Issue HTTP requests with retries and per-request cookies.
#[derive(Parser, Debug)]
#[command(name = "webclient")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Read defaults from this config file instead of the default location
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send a GET request and print the body
    Get(RequestArgs),
    /// Send a HEAD request and print status and headers
    Head(RequestArgs),
    /// Send a POST request and print the body
    Post(RequestArgs),
    /// Send a PUT request and print the body
    Put(RequestArgs),
    /// Download a body to a file with a progress bar
    Download(DownloadArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct RequestArgs {
    /// Target URL
    pub url: String,

    /// Extra request header, repeatable
    #[arg(short = 'H', long = "header", value_name = "NAME: VALUE", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Cookie sent with the request, repeatable
    #[arg(long = "cookie", value_name = "NAME=VALUE", value_parser = parse_cookie)]
    pub cookies: Vec<(String, String)>,

    /// Request body for POST and PUT
    #[arg(short, long)]
    pub data: Option<String>,

    /// Content type of the request body
    #[arg(long, value_name = "MIME")]
    pub content_type: Option<String>,

    /// Retries after the first attempt (0-10)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(0..=10))]
    pub retries: Option<u32>,

    /// User-Agent header value
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Print status, headers and cookies as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct DownloadArgs {
    /// Source URL
    pub url: String,

    /// Destination file
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,

    /// Read size in bytes (1-16777216)
    #[arg(long, value_parser = parse_buffer_size)]
    pub buffer_size: Option<usize>,

    /// Retries after the first attempt (0-10)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(0..=10))]
    pub retries: Option<u32>,

    /// User-Agent header value
    #[arg(long)]
    pub user_agent: Option<String>,
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected 'NAME: VALUE', got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing header name in '{raw}'"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

fn parse_cookie(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected 'NAME=VALUE', got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing cookie name in '{raw}'"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

fn parse_buffer_size(raw: &str) -> Result<usize, String> {
    let size: usize = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{raw}' is not a byte count"))?;
    if !(1..=MAX_BUFFER_SIZE).contains(&size) {
        return Err(format!("{size} is not in 1..={MAX_BUFFER_SIZE}"));
    }
    Ok(size)
}
