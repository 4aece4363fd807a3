//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::{load_service, ServiceConfig};
use crate::error::{Error, Result};
use crate::http::{Payload, RequestOptions};
use crate::types::{JsonValue, Method, QueryParams, QueryValue};
use serde_json::json;
use std::collections::btree_map::Entry;
use std::time::{Duration, Instant};
use tracing::info;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Request {
                method,
                path,
                query,
                data,
                headers,
                repeat,
                deadline_secs,
            } => {
                let options = build_options(query, data.as_deref(), headers, *deadline_secs)?;
                self.request(*method, path, options, *repeat).await
            }
            Commands::Validate => self.validate(),
        }
    }

    /// Send the request `repeat` times through one paced client
    async fn request(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
        repeat: u32,
    ) -> Result<()> {
        let service = self.load_service()?;
        let client = service.build_client()?;

        info!(
            "{} {} on '{}' x{}",
            method,
            path,
            service.display_name(),
            repeat
        );

        for attempt in 1..=repeat.max(1) {
            let started = Instant::now();
            let payload = client.request(method, path, options.clone()).await?;
            self.output_payload(attempt, started.elapsed(), payload);
        }

        Ok(())
    }

    /// Load the service file and build its client without sending anything
    fn validate(&self) -> Result<()> {
        let service = self.load_service()?;
        let client = service.build_client()?;
        let config = client.config();

        self.output_message(&json!({
            "type": "LOG",
            "log": {
                "level": "INFO",
                "message": format!("Service '{}' is valid", service.display_name())
            },
            "service": {
                "base_url": client.base_url().as_str(),
                "credential": config.credential.describe(),
                "timeout_ms": config.timeout.as_millis() as u64,
                "pacing": format!("{:?}", config.pacing),
                "retry_on_429": config.retry_on_429,
                "headers": config.default_headers.keys().collect::<Vec<_>>(),
            }
        }));

        Ok(())
    }

    fn load_service(&self) -> Result<ServiceConfig> {
        let path = self
            .cli
            .service
            .as_ref()
            .ok_or_else(|| Error::config("--service <FILE> is required"))?;
        load_service(path)
    }

    fn output_payload(&self, attempt: u32, elapsed: Duration, payload: Payload) {
        match self.cli.format {
            OutputFormat::Json => self.output_message(&json!({
                "type": "RESPONSE",
                "attempt": attempt,
                "elapsed_ms": elapsed.as_millis() as u64,
                "payload": payload.into_json(),
            })),
            OutputFormat::Pretty => match payload {
                Payload::Text(text) => println!("{text}"),
                other => self.output_message(&other.into_json()),
            },
        }
    }

    /// Output a message in the configured format
    fn output_message(&self, msg: &JsonValue) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

/// Turn raw CLI flags into request options
fn build_options(
    query: &[String],
    data: Option<&str>,
    headers: &[String],
    deadline_secs: Option<f64>,
) -> Result<RequestOptions> {
    let mut options = RequestOptions::new();
    options.query = parse_query(query)?;

    for raw in headers {
        let (name, value) = raw
            .split_once(':')
            .ok_or_else(|| Error::invalid_request(format!("header '{raw}' is not Name:value")))?;
        options = options.header(name.trim(), value.trim());
    }

    if let Some(data) = data {
        let body: JsonValue = serde_json::from_str(data)
            .map_err(|e| Error::invalid_request(format!("--data is not valid JSON: {e}")))?;
        options = options.json(body);
    }

    if let Some(secs) = deadline_secs {
        if !secs.is_finite() || secs <= 0.0 {
            return Err(Error::invalid_request("--deadline-secs must be positive"));
        }
        options = options.deadline(Duration::from_secs_f64(secs));
    }

    Ok(options)
}

/// Parse `key=value` pairs; a repeated key becomes a list
fn parse_query(raw: &[String]) -> Result<QueryParams> {
    let mut params = QueryParams::new();
    for pair in raw {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| Error::invalid_request(format!("query '{pair}' is not key=value")))?;

        match params.entry(key.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(QueryValue::Str(value.to_string()));
            }
            Entry::Occupied(mut slot) => match slot.get_mut() {
                QueryValue::List(items) => items.push(value.to_string()),
                current => {
                    let mut items: Vec<String> =
                        current.pairs(key).into_iter().map(|(_, v)| v).collect();
                    items.push(value.to_string());
                    *current = QueryValue::List(items);
                }
            },
        }
    }
    Ok(params)
}
