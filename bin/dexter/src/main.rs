mod commands;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "dexter")]
#[command(about = "A value-investing research agent for A-share and HK stocks", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize dexter configuration and cache directories
    Onboard {
        /// Force overwrite existing configuration
        #[arg(long)]
        force: bool,
    },

    /// Show current configuration status
    Status,

    /// Run a single research query and print the answer
    Analyze {
        /// The research query, e.g. "分析600519.SH"
        query: String,
    },

    /// Interactive research session
    Agent,

    /// Analyze several symbols concurrently
    Batch {
        /// Symbols to analyze, e.g. 600519.SH 000001.SZ 00700.HK
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Maximum concurrent analyses
        #[arg(short, long, default_value_t = 2)]
        workers: usize,
    },

    /// Start the HTTP/WebSocket gateway
    Gateway {
        /// Port to listen on (overrides config gateway.port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (overrides config gateway.host)
        #[arg(long)]
        host: Option<String>,
    },

    /// Inspect or clear the data cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Show entry counts per tier
    Stats,
    /// Drop every cached entry
    Clear,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Print the configuration file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Onboard { force } => {
            commands::onboard::run(force).await?;
        }
        Commands::Status => {
            commands::status::run().await?;
        }
        Commands::Analyze { query } => {
            commands::analyze::run(&query).await?;
        }
        Commands::Agent => {
            commands::agent_cmd::run().await?;
        }
        Commands::Batch { symbols, workers } => {
            commands::batch_cmd::run(&symbols, workers).await?;
        }
        Commands::Gateway { port, host } => {
            commands::gateway::run(host, port).await?;
        }
        Commands::Cache { command } => match command {
            CacheCommands::Stats => commands::cache_cmd::stats().await?,
            CacheCommands::Clear => commands::cache_cmd::clear().await?,
        },
        Commands::Config { command } => match command {
            ConfigCommands::Show => commands::config_cmd::show().await?,
            ConfigCommands::Path => commands::config_cmd::path().await?,
        },
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
        }
    }

    Ok(())
}
