use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::settings::{check_interval, load_settings_from_file, set_check_interval};
use commands::streamers::{add_streamer, describe_outcome, remove_streamer, render_streamer_list};
use log::{info, warn};
use models::settings::{AppState, Settings};
use services::diagnostic_logger::init_logging;
use services::live_notification_service::ConsoleSink;
use services::storage_service::{get_app_data_dir, JsonFileStore};
use services::twitch_service::HelixClient;
use std::path::PathBuf;
use std::sync::Arc;

mod commands;
mod models;
mod services;
mod utils;

#[derive(Parser)]
#[command(name = "streamwatch", version, about = "Live alerts and read-only chat for Twitch channels")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Custom data directory (overrides the platform default).
    #[arg(long, global = true, env = "STREAMWATCH_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// More log output; repeat for more detail.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Start tracking a channel.
    Add { channel: String },
    /// Stop tracking a channel.
    Remove { channel: String },
    /// Show tracked channels as of the last check.
    List,
    /// Check every tracked channel now and announce new live streams.
    Check,
    /// Show or set the background check interval in seconds.
    Interval { seconds: Option<u64> },
    /// Follow a channel's chat until Ctrl-C.
    Chat { channel: String },
    /// Open the stream a notification points to.
    Open { id: String },
    /// Keep checking in the background with an interactive console.
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let app_dir = get_app_data_dir(cli.data_dir)?;
    let (settings, settings_error) = match load_settings_from_file(&app_dir) {
        Ok(settings) => (settings, None),
        Err(e) => (Settings::default(), Some(e)),
    };
    init_logging(cli.verbose, settings.diagnostics_enabled);
    if let Some(e) = settings_error {
        warn!("[Main] Using default settings: {:#}", e);
    }
    info!("[Main] Data directory: {}", app_dir.display());

    let store = Arc::new(JsonFileStore::open(&app_dir)?);
    let source = Arc::new(HelixClient::new(&settings.helix)?);
    let state = AppState::new(settings, store, source, Arc::new(ConsoleSink));

    match cli.command {
        Commands::Add { channel } => {
            let streamer = add_streamer(&state, &channel).await?;
            println!("✅ Now tracking {}", streamer.display_name);
            let outcome = state.on_demand_reconciler().reconcile().await?;
            println!("{}", describe_outcome(&outcome));
        }
        Commands::Remove { channel } => {
            let streamer = remove_streamer(&state, &channel).await?;
            println!("Removed {}", streamer.display_name);
        }
        Commands::List => print_streamers(&state)?,
        Commands::Check => {
            let outcome = state.on_demand_reconciler().reconcile().await?;
            println!("{}", describe_outcome(&outcome));
            print_streamers(&state)?;
        }
        Commands::Interval { seconds: None } => {
            println!("Checking every {}s", check_interval(&state)?);
        }
        Commands::Interval {
            seconds: Some(seconds),
        } => {
            let stored = set_check_interval(&state, seconds)?;
            println!("Checking every {}s", stored);
        }
        Commands::Chat { channel } => {
            commands::chat::run_chat_view(state.settings.chat.clone(), &channel).await?;
        }
        Commands::Open { id } => match commands::notifications::open_notification(&state, &id)? {
            Some(url) => println!("Opening {}", url),
            None => println!("Notification {} was already handled or is unknown", id),
        },
        Commands::Watch => commands::console::run_console(state).await?,
    }

    Ok(())
}

fn print_streamers(state: &AppState) -> Result<()> {
    let lines = render_streamer_list(&state.streamers.load()?);
    if lines.is_empty() {
        println!("No streamers tracked yet. Add one with `streamwatch add <channel>`.");
    }
    for line in lines {
        println!("{}", line);
    }
    Ok(())
}
