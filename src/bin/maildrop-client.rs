use std::io::{self, BufRead, Write};
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing::Level;

use maildrop_protocol::config::{ClientConfig, LoggingConfig};
use maildrop_protocol::core::wire::{MAX_BODY_LEN, MAX_NAME_LEN};
use maildrop_protocol::service::client;
use maildrop_protocol::utils::logging;
use maildrop_protocol::{Request, Response};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    /// Retrieve all pending messages addressed to the username
    Read,
    /// Deposit a message for another user
    Create,
}

#[derive(Parser)]
#[command(name = "maildrop-client")]
#[command(about = "One-shot client for the message-drop server")]
struct Args {
    /// Server hostname or IP address
    host: String,

    /// Server port (1024-64000)
    port: u16,

    /// Username (1-255 UTF-8 bytes)
    username: String,

    /// Request kind
    #[arg(value_enum)]
    kind: Kind,

    /// Bound on each socket operation, in milliseconds
    #[arg(long, default_value_t = 1000)]
    timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: Level,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    logging::init(&LoggingConfig {
        log_level: args.log_level,
    });

    let timeout = Duration::from_millis(args.timeout_ms);
    let config = ClientConfig {
        host: args.host,
        port: args.port,
        username: args.username,
        connect_timeout: timeout,
        io_timeout: timeout,
    };

    // Validate before prompting or touching the network.
    if let Err(e) = config.validate_strict() {
        eprintln!("ERROR: {e}");
        std::process::exit(1);
    }

    let request = match args.kind {
        Kind::Read => Request::Read {
            username: config.username.clone(),
        },
        Kind::Create => Request::Create {
            username: config.username.clone(),
            recipient: prompt_field("Recipient name: ", MAX_NAME_LEN),
            body: prompt_field("Message: ", MAX_BODY_LEN),
        },
    };

    match client::exchange(&config, request).await {
        Ok(Some(response)) => render(&response),
        Ok(None) => {}
        Err(e) => {
            eprintln!("ERROR: {e}");
            std::process::exit(1);
        }
    }
}

fn render(response: &Response) {
    if response.items.is_empty() {
        println!("There are no messages to be read");
        return;
    }
    for item in &response.items {
        println!("{}: {}", item.sender, item.body);
    }
    if response.more_available {
        println!("More messages are available to be read");
    }
}

/// Prompt until the user enters a value of 1..=`max` UTF-8 bytes.
fn prompt_field(label: &str, max: usize) -> String {
    loop {
        let line = prompt_line(label);
        match line.len() {
            0 => eprintln!("ERROR: Must be at least one character"),
            n if n > max => eprintln!("ERROR: Too long ({n} bytes, maximum {max})"),
            _ => return line,
        }
    }
}

fn prompt_line(label: &str) -> String {
    print!("{label}");
    let _ = io::stdout().flush();

    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => {
            eprintln!("ERROR: No input available");
            std::process::exit(1);
        }
        Ok(_) => line.trim_end_matches(['\r', '\n']).to_string(),
    }
}
