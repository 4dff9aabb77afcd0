//! Configuration file loading for CLI defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use webclient::WebClientParameters;

/// Values read from `config.toml`. Unset keys keep library defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    pub follow_redirects: Option<bool>,
    pub retry_on_connection_failure: Option<bool>,
    pub connect_timeout_millis: Option<u64>,
    pub read_timeout_millis: Option<u64>,
    pub write_timeout_millis: Option<u64>,
    /// Default retry budget for each request (0..=10).
    pub count_connection_retries: Option<u32>,
    /// Read size of `download` in bytes (1..=16 MiB).
    pub download_buffer_size: Option<usize>,
    pub user_agent: Option<String>,
}

const MAX_TIMEOUT_MILLIS: u64 = 3_600_000;
const MAX_RETRIES: u32 = 10;
const MAX_DOWNLOAD_BUFFER_SIZE: usize = 16 * 1024 * 1024;

impl FileConfig {
    /// Validates values against the ranges the CLI accepts.
    pub fn validate(&self) -> Result<()> {
        validate_timeout_millis("connect_timeout_millis", self.connect_timeout_millis)?;
        validate_timeout_millis("read_timeout_millis", self.read_timeout_millis)?;
        validate_timeout_millis("write_timeout_millis", self.write_timeout_millis)?;

        if let Some(retries) = self.count_connection_retries
            && retries > MAX_RETRIES
        {
            bail!(
                "Invalid config value for `count_connection_retries`: {retries}. Expected range: 0..={MAX_RETRIES}"
            );
        }

        if let Some(size) = self.download_buffer_size
            && !(1..=MAX_DOWNLOAD_BUFFER_SIZE).contains(&size)
        {
            bail!(
                "Invalid config value for `download_buffer_size`: {size}. Expected range: 1..={MAX_DOWNLOAD_BUFFER_SIZE}"
            );
        }

        if let Some(user_agent) = &self.user_agent
            && user_agent.trim().is_empty()
        {
            bail!("Invalid config value for `user_agent`: must not be empty");
        }

        Ok(())
    }

    /// Client parameters with file values applied over the defaults.
    #[must_use]
    pub fn client_parameters(&self) -> WebClientParameters {
        let defaults = WebClientParameters::default();
        WebClientParameters {
            follow_redirects: self.follow_redirects.unwrap_or(defaults.follow_redirects),
            retry_on_connection_failure: self
                .retry_on_connection_failure
                .unwrap_or(defaults.retry_on_connection_failure),
            connect_timeout_millis: self
                .connect_timeout_millis
                .unwrap_or(defaults.connect_timeout_millis),
            read_timeout_millis: self
                .read_timeout_millis
                .unwrap_or(defaults.read_timeout_millis),
            write_timeout_millis: self
                .write_timeout_millis
                .unwrap_or(defaults.write_timeout_millis),
        }
    }
}

fn validate_timeout_millis(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=MAX_TIMEOUT_MILLIS).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..={MAX_TIMEOUT_MILLIS}");
    }
    Ok(())
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/webclient/config.toml`
/// 2. `$HOME/.config/webclient/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("webclient")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("webclient")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config file.
///
/// An explicit path must exist; the default path is optional.
pub fn load_file_config(explicit: Option<&Path>) -> Result<FileConfig> {
    if let Some(path) = explicit {
        return read_config_file(path);
    }
    match resolve_default_config_path() {
        Some(path) if path.exists() => read_config_file(&path),
        _ => Ok(FileConfig::default()),
    }
}

fn read_config_file(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }
        let line_number = line_index + 1;

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_number}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let context = || format!("Invalid `{key}` value on line {line_number}");

        match key {
            "follow_redirects" => {
                cfg.follow_redirects = Some(parse_boolean(value).with_context(context)?);
            }
            "retry_on_connection_failure" => {
                cfg.retry_on_connection_failure =
                    Some(parse_boolean(value).with_context(context)?);
            }
            "connect_timeout_millis" => {
                cfg.connect_timeout_millis = Some(parse_integer_u64(value).with_context(context)?);
            }
            "read_timeout_millis" => {
                cfg.read_timeout_millis = Some(parse_integer_u64(value).with_context(context)?);
            }
            "write_timeout_millis" => {
                cfg.write_timeout_millis = Some(parse_integer_u64(value).with_context(context)?);
            }
            "count_connection_retries" => {
                let parsed = parse_integer_u64(value).with_context(context)?;
                let retries = u32::try_from(parsed)
                    .map_err(|_| anyhow::anyhow!("count_connection_retries out of range for u32"))?;
                cfg.count_connection_retries = Some(retries);
            }
            "download_buffer_size" => {
                let parsed = parse_integer_u64(value).with_context(context)?;
                let size = usize::try_from(parsed)
                    .map_err(|_| anyhow::anyhow!("download_buffer_size out of range for usize"))?;
                cfg.download_buffer_size = Some(size);
            }
            "user_agent" => {
                cfg.user_agent = Some(parse_string_literal(value).with_context(context)?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_number}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_boolean(raw_value: &str) -> Result<bool> {
    match raw_value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("Expected 'true' or 'false'"),
    }
}
