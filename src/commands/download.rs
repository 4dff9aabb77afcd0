//! `download` command: streams a body to a file behind a progress bar.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use tracing::{info, warn};
use webclient::{CancellationToken, WebClient};

use super::request::base_parameters;
use crate::app_config::FileConfig;
use crate::cli::DownloadArgs;

/// Resolution of the bar when the total length is known.
const PROGRESS_SCALE: u64 = 1_000;

/// Runs the download and returns whether it succeeded.
///
/// A partial file is removed when the download does not complete.
pub fn run_download_command(
    client: &WebClient,
    args: &DownloadArgs,
    config: &FileConfig,
    show_progress: bool,
) -> Result<bool> {
    let file = File::create(&args.output)
        .with_context(|| format!("Failed to create '{}'", args.output.display()))?;
    let bar = if show_progress {
        ProgressBar::new(PROGRESS_SCALE)
    } else {
        ProgressBar::hidden()
    };
    let sink = Arc::new(DownloadSink::new(file, bar));
    let cancellation = CancellationToken::new();

    let listener_sink = sink.clone();
    let listener_cancellation = cancellation.clone();
    let mut parameters = base_parameters(
        &args.url,
        args.retries,
        args.user_agent.as_deref(),
        config,
    )
    .with_cancellation(cancellation)
    .with_download_progress_listener(move |progress, chunk| {
        if listener_sink.record(progress, chunk).is_err() {
            listener_cancellation.cancel();
        }
    });
    if let Some(buffer_size) = args.buffer_size.or(config.download_buffer_size) {
        parameters = parameters.with_download_buffer_size(buffer_size);
    }

    let response = client.get(&mut parameters);
    drop(parameters);

    let written = sink.finish();
    if let Err(error) = written {
        remove_partial(&args.output);
        return Err(error).with_context(|| format!("Failed to write '{}'", args.output.display()));
    }

    if response.is_successful() {
        info!(
            url = %args.url,
            path = %args.output.display(),
            bytes = sink.downloaded(),
            "download complete"
        );
        return Ok(true);
    }

    remove_partial(&args.output);
    match response.error() {
        Some(error) => eprintln!("error: {error}"),
        None => eprintln!("error: server answered {}", response.response_code()),
    }
    Ok(false)
}

fn remove_partial(path: &Path) {
    if let Err(error) = fs::remove_file(path) {
        warn!(path = %path.display(), error = %error, "could not remove partial download");
    }
}

/// Writes chunks to the file and mirrors progress on the bar.
struct DownloadSink {
    writer: Mutex<BufWriter<File>>,
    failure: Mutex<Option<io::Error>>,
    downloaded: AtomicU64,
    bar: ProgressBar,
}

impl DownloadSink {
    fn new(file: File, bar: ProgressBar) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(file)),
            failure: Mutex::new(None),
            downloaded: AtomicU64::new(0),
            bar,
        }
    }

    fn record(&self, progress: f32, chunk: &[u8]) -> io::Result<()> {
        let downloaded = self
            .downloaded
            .fetch_add(chunk.len() as u64, Ordering::SeqCst)
            + chunk.len() as u64;
        self.update_bar(progress, downloaded);

        if chunk.is_empty() {
            return Ok(());
        }
        let result = self
            .writer
            .lock()
            .map_err(|_| io::Error::other("download writer poisoned"))
            .and_then(|mut writer| writer.write_all(chunk));
        if let Err(error) = &result {
            if let Ok(mut failure) = self.failure.lock() {
                failure.get_or_insert_with(|| io::Error::new(error.kind(), error.to_string()));
            }
        }
        result
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    fn update_bar(&self, progress: f32, downloaded: u64) {
        if progress.is_nan() {
            if self.bar.length().is_some() {
                self.bar.set_style(
                    ProgressStyle::with_template("{spinner} {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                self.bar.unset_length();
                self.bar.enable_steady_tick(Duration::from_millis(100));
            }
        } else {
            self.bar
                .set_position((f64::from(progress) * PROGRESS_SCALE as f64) as u64);
        }
        self.bar.set_message(format!("{}", HumanBytes(downloaded)));
    }

    fn downloaded(&self) -> u64 {
        self.downloaded.load(Ordering::SeqCst)
    }

    /// Flushes the file and reports the first write failure, if any.
    fn finish(&self) -> Result<()> {
        self.bar.finish_and_clear();
        if let Some(error) = self
            .failure
            .lock()
            .map_err(|_| anyhow!("download state poisoned"))?
            .take()
        {
            return Err(error.into());
        }
        self.writer
            .lock()
            .map_err(|_| anyhow!("download writer poisoned"))?
            .flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_writes_chunks_and_counts_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        let sink = DownloadSink::new(File::create(&path).unwrap(), ProgressBar::hidden());

        sink.record(0.0, &[]).unwrap();
        sink.record(0.5, b"hello ").unwrap();
        sink.record(1.0, b"world").unwrap();
        sink.finish().unwrap();

        assert_eq!(sink.downloaded(), 11);
        assert_eq!(fs::read(&path).unwrap(), b"hello world");
    }

    #[test]
    fn test_sink_switches_to_spinner_for_unknown_length() {
        let dir = tempfile::tempdir().unwrap();
        let bar = ProgressBar::with_draw_target(
            Some(PROGRESS_SCALE),
            indicatif::ProgressDrawTarget::hidden(),
        );
        let sink = DownloadSink::new(File::create(dir.path().join("out.bin")).unwrap(), bar);

        sink.record(f32::NAN, b"abc").unwrap();

        assert!(sink.bar.length().is_none());
        assert_eq!(sink.downloaded(), 3);
    }
}
