//! Service configuration.
//!
//! Loaded from command-line flags with environment-variable fallbacks; flags
//! win over the environment, the environment wins over the defaults.
//!
//! | Flag | Variable | Default |
//! |---|---|---|
//! | `--addr` | `CATNIP_ADDR` | `0.0.0.0:3000` |
//! | `--ws-path` | `CATNIP_WS_PATH` | `/ws` |
//! | `--docs-path` | `CATNIP_DOCS_PATH` | `/api` |
//! | `--log-format` | `CATNIP_LOG_FORMAT` | `text` |
//! | `--body-limit` | `CATNIP_BODY_LIMIT` | `1048576` |

use std::net::SocketAddr;

use clap::{Args, ValueEnum};

use crate::error::Error;
use crate::server::DEFAULT_BODY_LIMIT;

pub const DEFAULT_ADDR: &str = "0.0.0.0:3000";

#[derive(Clone, Debug, Args)]
pub struct Config {
    /// Address to listen on.
    #[arg(long, env = "CATNIP_ADDR", default_value = DEFAULT_ADDR)]
    pub addr: String,

    /// Path of the WebSocket gateway.
    #[arg(long, env = "CATNIP_WS_PATH", default_value = "/ws")]
    pub ws_path: String,

    /// Path of the generated API documentation.
    #[arg(long, env = "CATNIP_DOCS_PATH", default_value = "/api")]
    pub docs_path: String,

    /// Log output format.
    #[arg(long, env = "CATNIP_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Largest accepted request body, in bytes.
    #[arg(long, env = "CATNIP_BODY_LIMIT", default_value_t = DEFAULT_BODY_LIMIT)]
    pub body_limit: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_owned(),
            ws_path: "/ws".to_owned(),
            docs_path: "/api".to_owned(),
            log_format: LogFormat::Text,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl Config {
    /// Checks every field and returns the parsed listen address.
    pub fn validate(&self) -> Result<SocketAddr, Error> {
        for (name, path) in [("ws-path", &self.ws_path), ("docs-path", &self.docs_path)] {
            if !path.starts_with('/') {
                return Err(Error::Config(format!("{name} must start with `/`, got `{path}`")));
            }
        }
        if self.body_limit == 0 {
            return Err(Error::Config("body-limit must be positive".to_owned()));
        }
        if self.ws_path == self.docs_path {
            return Err(Error::Config(format!(
                "ws-path and docs-path must differ, both are `{}`",
                self.ws_path
            )));
        }
        self.addr.parse().map_err(|source| Error::InvalidAddress {
            addr: self.addr.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        config: Config,
    }

    #[test]
    fn defaults_are_valid() {
        let addr = Config::default().validate().unwrap();
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from(["catnip", "--addr", "127.0.0.1:8080", "--log-format", "json"]).unwrap();
        assert_eq!(cli.config.addr, "127.0.0.1:8080");
        assert_eq!(cli.config.log_format, LogFormat::Json);
        assert_eq!(cli.config.ws_path, "/ws");
    }

    #[test]
    fn rejects_bad_values() {
        let bad_addr = Config { addr: "nowhere".into(), ..Config::default() };
        assert!(matches!(bad_addr.validate(), Err(Error::InvalidAddress { .. })));

        let bad_path = Config { ws_path: "ws".into(), ..Config::default() };
        assert!(matches!(bad_path.validate(), Err(Error::Config(_))));

        let clash = Config { docs_path: "/ws".into(), ..Config::default() };
        assert!(matches!(clash.validate(), Err(Error::Config(_))));

        let no_body = Config { body_limit: 0, ..Config::default() };
        assert!(matches!(no_body.validate(), Err(Error::Config(_))));
    }
}
