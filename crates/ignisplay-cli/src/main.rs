use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::Context;
use commands::{catalog, config, history, my_list, playback, subscription};
use std::path::PathBuf;

mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "ignisplay")]
#[command(about = "IgnisPlay - watch history, my list and subscription for every profile")]
#[command(version)]
struct Cli {
    /// Signed-in user id; omit to act as the guest profile
    #[arg(long, global = true, value_name = "UID")]
    user: Option<String>,

    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    /// Path to config.toml (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect or edit the watch history
    History {
        #[command(subcommand)]
        cmd: HistoryCommands,
    },
    /// Inspect or edit the saved list
    #[command(name = "my-list")]
    MyList {
        #[command(subcommand)]
        cmd: MyListCommands,
    },
    /// Show plans or record a purchased plan
    Subscription {
        #[command(subcommand)]
        cmd: SubscriptionCommands,
    },
    /// Ask whether a resolution may be played
    Playback {
        #[command(subcommand)]
        cmd: PlaybackCommands,
    },
    /// Browse the built-in catalog
    Catalog {
        /// Which row to show
        #[arg(value_enum, default_value = "trending")]
        row: CatalogRow,
    },
    /// Show or create the configuration file
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum HistoryCommands {
    /// List watched titles, most recent first
    List,
    /// Record a view of a catalog title
    Add {
        movie_id: String,

        /// Playback progress between 0.0 and 1.0
        #[arg(long)]
        progress: Option<f32>,
    },
    /// Remove one title from the history
    Remove { movie_id: String },
    /// Remove every title from the history
    Clear,
}

#[derive(Subcommand)]
enum MyListCommands {
    /// List saved titles
    List,
    /// Save a catalog title, or unsave it if already saved
    Toggle { movie_id: String },
}

#[derive(Subcommand)]
enum SubscriptionCommands {
    /// List the available plans
    Plans,
    /// Show the recorded plan and its expiry
    Show,
    /// Record a purchased plan, starting now
    Activate {
        /// basic-3, standard-6 or premium-9
        plan_id: String,
    },
    /// Forget the recorded plan after billing was cancelled
    Cancel,
}

#[derive(Subcommand)]
enum PlaybackCommands {
    /// Check a resolution tier (480p, 720p or 1080p)
    Check { tier: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CatalogRow {
    Trending,
    New,
    Top,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Write a default config file if none exists
    Init {
        /// Overwrite an existing file
        #[arg(long, action = ArgAction::SetTrue)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let config_path = config::resolve_path(cli.config.clone())?;
    let app_config = ignisplay_config::Config::load_or_default(&config_path)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load config from {}: {}", config_path.display(), e))?;

    logging::init_logging(cli.verbose, cli.quiet, &app_config.logging)
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    app_config
        .validate()
        .map_err(|e| color_eyre::eyre::eyre!("Invalid config {}: {}", config_path.display(), e))?;

    let output = output::Output::new(cli.output, cli.quiet);
    let user = cli.user.as_deref();

    match cli.command {
        Commands::History { cmd } => history::run_history(cmd, &app_config, user, &output)
            .await
            .wrap_err("history command failed"),
        Commands::MyList { cmd } => my_list::run_my_list(cmd, &app_config, user, &output)
            .await
            .wrap_err("my-list command failed"),
        Commands::Subscription { cmd } => subscription::run_subscription(cmd, &app_config, user, &output)
            .await
            .wrap_err("subscription command failed"),
        Commands::Playback { cmd } => playback::run_playback(cmd, &app_config, user, &output)
            .await
            .wrap_err("playback command failed"),
        Commands::Catalog { row } => {
            catalog::run_catalog(row, &output);
            Ok(())
        }
        Commands::Config { cmd } => config::run_config(cmd, &config_path, &app_config, &output),
    }
}
