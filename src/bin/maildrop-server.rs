use std::time::Duration;

use clap::Parser;
use tracing::Level;

use maildrop_protocol::config::{LoggingConfig, ServerConfig};
use maildrop_protocol::service::server;
use maildrop_protocol::utils::logging;

#[derive(Parser)]
#[command(name = "maildrop-server")]
#[command(about = "In-memory message-drop server")]
struct Args {
    /// Port to listen on (1024-64000)
    port: u16,

    /// Bound on each socket read/write, in milliseconds
    #[arg(long, default_value_t = 1000)]
    timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: Level,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    logging::init(&LoggingConfig {
        log_level: args.log_level,
    });

    let config = ServerConfig {
        port: args.port,
        io_timeout: Duration::from_millis(args.timeout_ms),
    };

    // Validate before any networking starts.
    if let Err(e) = config.validate_strict() {
        eprintln!("ERROR: {e}");
        std::process::exit(1);
    }

    if let Err(e) = server::serve(&config).await {
        eprintln!("ERROR: {e}");
        std::process::exit(1);
    }
}
