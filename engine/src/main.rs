use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use garou_core::Config;
use garou_server::{auth, serve, AppState};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "garou")]
#[command(version, about = "Multi-agent werewolf protocol server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the game server.
    Serve {
        #[arg(short = 'c', long, default_value = "./default.yml")]
        config: PathBuf,
        /// Overrides the configured listen host.
        #[arg(long)]
        hostname: Option<String>,
        /// Overrides the configured listen port.
        #[arg(long)]
        port: Option<u16>,
        #[arg(long, default_value = "./logs")]
        logs_dir: PathBuf,
        #[arg(long, default_value_t = 14)]
        log_retention_days: u64,
    },
    /// Print the connection token for a team.
    Token {
        team: String,
        #[arg(long, env = "GAROU_AUTH_SECRET")]
        secret: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            config,
            hostname,
            port,
            logs_dir,
            log_retention_days,
        } => {
            let (_guard, log_info) =
                garou_observability::init_logging(&logs_dir, log_retention_days)?;
            let mut config = Config::load(&config)?;
            if let Some(hostname) = hostname {
                config.server.host = hostname;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
                .parse()
                .context("invalid host or port")?;
            info!(logs_dir = %log_info.logs_dir, "logging initialized");
            let state = AppState::new(config)?;
            serve(addr, state).await?;
        }
        Command::Token { team, secret } => {
            println!("{}", auth::player_token(&secret, &team));
        }
    }

    Ok(())
}
