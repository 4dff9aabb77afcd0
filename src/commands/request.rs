//! `get`, `head`, `post` and `put` commands.

use std::collections::BTreeMap;
use std::io::{self, Write};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::debug;
use url::Url;
use webclient::{Cookie, RequestParameters, ResponseType, WebClient, WebClientResponse};

use crate::app_config::FileConfig;
use crate::cli::RequestArgs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMethod {
    Get,
    Head,
    Post,
    Put,
}

/// JSON rendering of a response for `--json`.
#[derive(Debug, Serialize)]
struct ResponseSummary<'a> {
    successful: bool,
    response_code: i32,
    headers: BTreeMap<&'a str, &'a str>,
    cookies: &'a [Cookie],
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Runs one request and prints the outcome. Returns whether it succeeded.
pub fn run_request_command(
    client: &WebClient,
    method: RequestMethod,
    args: &RequestArgs,
    config: &FileConfig,
) -> Result<bool> {
    let mut parameters = request_parameters(args, config);
    debug!(?method, url = %args.url, "sending request");

    let response = match method {
        RequestMethod::Get => client.get(&mut parameters),
        RequestMethod::Head => client.head(&mut parameters),
        RequestMethod::Post => client.post(&mut parameters),
        RequestMethod::Put => client.put(&mut parameters),
    };

    let mut stdout = io::stdout().lock();
    if args.json {
        let rendered = serde_json::to_string_pretty(&summarize(&response))
            .context("Failed to render response as JSON")?;
        writeln!(stdout, "{rendered}")?;
    } else if method == RequestMethod::Head {
        write_head(&mut stdout, &response)?;
    } else if let Some(body) = response.received_data() {
        stdout.write_all(body)?;
    }
    stdout.flush()?;

    if let Some(error) = response.error() {
        eprintln!("error: {error}");
    } else if !response.is_successful() {
        eprintln!("error: server answered {}", response.response_code());
    }
    Ok(response.is_successful())
}

/// Builds request parameters; command-line values win over the config file.
pub(crate) fn base_parameters(
    url: &str,
    retries: Option<u32>,
    user_agent: Option<&str>,
    config: &FileConfig,
) -> RequestParameters {
    let mut parameters = RequestParameters::new(url);
    if let Some(retries) = retries.or(config.count_connection_retries) {
        parameters = parameters.with_count_connection_retries(retries);
    }
    if let Some(user_agent) = user_agent.or(config.user_agent.as_deref()) {
        parameters = parameters.with_user_agent(Some(user_agent.to_string()));
    }
    parameters
}

fn request_parameters(args: &RequestArgs, config: &FileConfig) -> RequestParameters {
    let mut parameters = base_parameters(
        &args.url,
        args.retries,
        args.user_agent.as_deref(),
        config,
    )
    .with_response_type(ResponseType::Bytes);

    for (name, value) in &args.headers {
        parameters = parameters.with_header(name, value);
    }

    let domain = Url::parse(&args.url)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_default();
    for (name, value) in &args.cookies {
        parameters = parameters.with_cookie(Cookie::new(name, value, &domain, "/"));
    }

    if let Some(data) = &args.data {
        parameters = parameters.with_body(data);
    }
    if let Some(content_type) = &args.content_type {
        parameters = parameters.with_content_type(content_type);
    }
    parameters
}

fn summarize(response: &WebClientResponse) -> ResponseSummary<'_> {
    ResponseSummary {
        successful: response.is_successful(),
        response_code: response.response_code(),
        headers: sorted_headers(response),
        cookies: response.cookies(),
        body: response
            .received_data()
            .map(|data| String::from_utf8_lossy(data).into_owned()),
        error: response.error().map(ToString::to_string),
    }
}

fn sorted_headers(response: &WebClientResponse) -> BTreeMap<&str, &str> {
    response
        .headers()
        .map(|headers| {
            headers
                .iter()
                .map(|(name, value)| (name.as_str(), value.as_str()))
                .collect()
        })
        .unwrap_or_default()
}

fn write_head(out: &mut impl Write, response: &WebClientResponse) -> io::Result<()> {
    writeln!(out, "HTTP {}", response.response_code())?;
    for (name, value) in sorted_headers(response) {
        writeln!(out, "{name}: {value}")?;
    }
    for cookie in response.cookies() {
        writeln!(out, "cookie {cookie}")?;
    }
    Ok(())
}
