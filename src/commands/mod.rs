//! CLI command handlers.

mod download;
mod request;

pub use download::run_download_command;
pub use request::{RequestMethod, run_request_command};
