use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "streamwatch", version, about = "Watch live streams for a game category and track who went offline")]
struct Cli {
    /// Path to the config file
    #[arg(long, global = true, env = "STREAMWATCH_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Keep the listing updated on a timer and accept commands on stdin
    Run,

    /// Fetch the listing once and print it
    Fetch {
        /// Switch to this category first (saved on success)
        #[arg(long)]
        game: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Request a fresh access token and save it
    Auth,

    /// Parse duration tokens such as `1h 30m`, or a millisecond count
    Duration {
        /// Tokens like 1d 3h 34m 10s 403ms
        #[arg(required = true, num_args = 1..)]
        tokens: Vec<String>,

        /// Units to format with, e.g. d,h,m
        #[arg(long)]
        units: Option<String>,

        /// Pad every count to two digits
        #[arg(long)]
        pad_zero: bool,

        /// Show units whose count is zero
        #[arg(long)]
        zero_units: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    fn json(&self) -> bool {
        match self {
            Commands::Fetch { json, .. } | Commands::Duration { json, .. } => *json,
            _ => false,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("STREAMWATCH_LOG_LEVEL")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json = cli.command.json();

    if let Err(e) = run(cli).await {
        if json {
            streamwatch::cli::output::print_error(&e, true);
        } else {
            eprintln!("Error: {e}");
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), streamwatch::StreamwatchError> {
    let config = cli.config.as_deref();
    match cli.command {
        Commands::Run => streamwatch::cli::watch::run_watch(config).await,
        Commands::Fetch { game, json } => {
            streamwatch::cli::fetch::run_fetch(config, json, game.as_deref()).await
        }
        Commands::Auth => streamwatch::cli::auth_cmd::run_auth(config).await,
        Commands::Duration {
            tokens,
            units,
            pad_zero,
            zero_units,
            json,
        } => streamwatch::cli::duration_cmd::run_duration(
            &tokens,
            units.as_deref(),
            pad_zero,
            zero_units,
            json,
        ),
    }
}
