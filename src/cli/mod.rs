use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod chat;
pub mod serve;

#[derive(Subcommand)]
enum Command {
    /// Run the relay server
    Serve {
        /// Set the server host address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Set the server port
        #[arg(long, default_value = "2222")]
        port: String,
    },
    /// Start an interactive chat against a relay endpoint
    Chat {
        /// Relay endpoint, defaults to $ERRORIFY_ENDPOINT
        #[arg(long)]
        endpoint: Option<String>,

        /// Ask the relay for a specific model
        #[arg(long)]
        model: Option<String>,

        /// Seed the transcript with a system message
        #[arg(long)]
        system: Option<String>,

        /// Reveal replies a word at a time. Ctrl-C during the reveal stops
        /// the animation, at any other time it exits
        #[arg(long, action, default_value = "false")]
        stream: bool,

        /// Delay between revealed words
        #[arg(long, default_value = "25")]
        interval_ms: u64,
    },
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();

    // Handle each sub command
    match args.command {
        Some(Command::Serve { host, port }) => {
            serve::run(host, port).await?;
        }
        Some(Command::Chat {
            endpoint,
            model,
            system,
            stream,
            interval_ms,
        }) => {
            chat::run(endpoint, model, system, stream, interval_ms).await?;
        }
        None => {}
    }

    Ok(())
}
