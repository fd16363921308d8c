use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

use cli::Portal;

#[derive(Parser)]
#[command(name = "portal-engagement")]
#[command(about = "Points, badges, and streaks for research portal activity")]
#[command(version)]
struct Cli {
    /// Path to the config file (defaults to ~/.portal-engagement/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// User to act as
    #[arg(short, long, global = true)]
    user: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new config.toml configuration file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },

    /// Show the user's points, counters, and streak
    Stats,

    /// Show earned badges
    Badges {
        /// Also list badges not yet earned
        #[arg(long)]
        all: bool,
    },

    /// Show recent point transactions
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Award points for an explicit event
    Award {
        #[arg(long)]
        points: u32,

        #[arg(long)]
        reason: String,
    },

    /// Credit today's login bonus
    Login,

    /// Record joining a meeting
    Meeting {
        /// Meeting identifier
        meeting_id: String,

        /// Scheduled start (RFC 3339)
        #[arg(long)]
        scheduled: String,

        /// Join time (RFC 3339, defaults to now)
        #[arg(long)]
        joined: Option<String>,
    },

    /// Record a research activity (project_created, paper_read, ...)
    Activity {
        kind: String,

        /// Project, paper, evaluation, or collection id
        target_id: String,
    },

    /// Track portal time until interrupted
    Track,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    if let Commands::Init { force } = cli.command {
        return cli::init::init_command(cli.config, force).await;
    }

    let portal = Portal::open(cli.config.as_deref(), cli.user.as_deref())?;

    match cli.command {
        Commands::Init { .. } => {}
        Commands::Stats => cli::status::stats_command(&portal).await?,
        Commands::Badges { all } => cli::status::badges_command(&portal, all).await?,
        Commands::History { limit } => cli::status::history_command(&portal, limit).await?,
        Commands::Award { points, reason } => {
            cli::record::award_command(&portal, points, &reason).await?
        }
        Commands::Login => cli::record::login_command(&portal).await?,
        Commands::Meeting {
            meeting_id,
            scheduled,
            joined,
        } => {
            cli::record::meeting_command(&portal, &meeting_id, &scheduled, joined.as_deref())
                .await?
        }
        Commands::Activity { kind, target_id } => {
            cli::record::activity_command(&portal, &kind, &target_id).await?
        }
        Commands::Track => cli::track::track_command(&portal).await?,
    }

    Ok(())
}
