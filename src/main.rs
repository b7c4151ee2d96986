//! catnip demo server.
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=debug catnip --addr 127.0.0.1:3000
//!
//! curl localhost:3000/cats
//! curl -X POST localhost:3000/cats -H 'x-roles: admin' \
//!      -H 'content-type: application/json' -d '{"name":"Whiskers","age":2}'
//! curl localhost:3000/api
//! ```

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use catnip::Server;
use catnip::config::{Config, LogFormat};

#[derive(Parser)]
#[command(name = "catnip", version, about = "Cats demo service")]
struct Cli {
    #[command(flatten)]
    config: Config,
}

#[tokio::main]
async fn main() -> Result<(), catnip::Error> {
    let cli = Cli::parse();
    init_logging(cli.config.log_format);

    let addr = cli.config.validate()?;
    let app = catnip::cats::app(&cli.config)?;

    tracing::info!(%addr, ws = %cli.config.ws_path, docs = %cli.config.docs_path, "starting cats service");
    app.run(Server::bind_addr(addr).body_limit(cli.config.body_limit)).await
}

fn init_logging(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Text => registry.with(fmt::layer()).init(),
    }
}
