//! Diagnostic logging for the pipeline.
//!
//! Output is controlled by two environment variables:
//!
//! - `JSON_VIEWS_LOG`: filter in `RUST_LOG` syntax (`debug`,
//!   `json_views::resolve=trace`, ...). Falls back to `RUST_LOG`.
//! - `JSON_VIEWS_LOG_FORMAT`: `text` (default) or `json`.
//!
//! ```bash
//! JSON_VIEWS_LOG=debug json-views check site/
//! JSON_VIEWS_LOG=json_views::inference=trace JSON_VIEWS_LOG_FORMAT=json json-views model site/
//! ```
//!
//! Nothing is installed unless one of the filter variables is set. Logs go to
//! stderr so `model` output on stdout stays clean.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt};

const LOG_VAR: &str = "JSON_VIEWS_LOG";
const FORMAT_VAR: &str = "JSON_VIEWS_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    /// Newline-delimited JSON objects.
    Json,
}

impl LogFormat {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    fn from_env() -> Self {
        Self::parse(&std::env::var(FORMAT_VAR).unwrap_or_default())
    }
}

fn build_filter() -> EnvFilter {
    match std::env::var(LOG_VAR) {
        Ok(val) => EnvFilter::builder().parse_lossy(val),
        Err(_) => EnvFilter::from_default_env(),
    }
}

pub fn init_tracing() {
    if std::env::var(LOG_VAR).is_err() && std::env::var("RUST_LOG").is_err() {
        return;
    }
    let filter = build_filter();
    match LogFormat::from_env() {
        LogFormat::Json => {
            let json_layer = fmt::layer().json().with_writer(std::io::stderr);
            Registry::default().with(filter).with(json_layer).init();
        }
        LogFormat::Text => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}
