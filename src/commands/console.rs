use crate::commands::chat::render_event;
use crate::commands::notifications::open_notification;
use crate::commands::settings::{check_interval, set_check_interval};
use crate::commands::streamers::{
    add_streamer, describe_outcome, remove_streamer, render_streamer_list, TrackerError,
};
use crate::models::chat::ChatEvent;
use crate::models::settings::AppState;
use crate::models::streamer::normalize_channel;
use crate::services::diagnostic_logger::{is_diagnostics_enabled, set_diagnostics_enabled};
use crate::services::irc_service::ChatRelay;
use crate::services::reconcile_service::MonitorHandle;
use anyhow::{anyhow, bail, Result};
use log::info;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
Commands:
  list                 show tracked streamers
  add <channel>        track a channel
  remove <channel>     stop tracking a channel
  check                check all streamers now
  interval [seconds]   show or change the check interval
  chat <channel>       open chat of a live tracked streamer
  close                close the open chat
  open <id>            open the stream a notification points to
  diagnostics [on|off] show or toggle debug logging
  help                 show this help
  quit                 leave";

#[derive(Debug, PartialEq, Eq)]
pub enum ConsoleCommand {
    Help,
    List,
    Add(String),
    Remove(String),
    Check,
    Interval(Option<u64>),
    Chat(String),
    Close,
    Open(String),
    Diagnostics(Option<bool>),
    Quit,
}

impl ConsoleCommand {
    /// `Ok(None)` for a blank line.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let arg = words.next();
        let required = |what: &str| {
            arg.map(str::to_string)
                .ok_or_else(|| anyhow!("Usage: {} <{}>", verb, what))
        };

        let command = match verb.to_lowercase().as_str() {
            "help" | "?" => Self::Help,
            "list" | "ls" => Self::List,
            "add" => Self::Add(required("channel")?),
            "remove" | "rm" => Self::Remove(required("channel")?),
            "check" => Self::Check,
            "interval" => Self::Interval(
                arg.map(|secs| {
                    secs.parse::<u64>()
                        .map_err(|_| anyhow!("Interval must be a number of seconds"))
                })
                .transpose()?,
            ),
            "chat" => Self::Chat(required("channel")?),
            "close" => Self::Close,
            "open" => Self::Open(required("id")?),
            "diagnostics" => Self::Diagnostics(match arg {
                None => None,
                Some("on") => Some(true),
                Some("off") => Some(false),
                Some(_) => bail!("Usage: diagnostics [on|off]"),
            }),
            "quit" | "exit" => Self::Quit,
            other => bail!("Unknown command '{}', try 'help'", other),
        };
        Ok(Some(command))
    }
}

/// Interactive `watch` mode: runs the background monitor and serves commands
/// from stdin until `quit`, end of input or Ctrl-C.
pub async fn run_console(state: AppState) -> Result<()> {
    let (monitor, monitor_task) = state.background_monitor()?.spawn();
    let (mut relay, mut chat_events) = ChatRelay::new(state.settings.chat.clone());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!(
        "Watching {} streamer(s), checking every {}s. Type 'help' for commands.",
        state.streamers.load()?.len(),
        check_interval(&state)?
    );

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let command = match ConsoleCommand::parse(&line) {
                    Ok(Some(command)) => command,
                    Ok(None) => continue,
                    Err(e) => {
                        println!("❌ {}", e);
                        continue;
                    }
                };
                if command == ConsoleCommand::Quit {
                    break;
                }
                if let Err(e) = execute(&state, &monitor, &mut relay, command).await {
                    println!("❌ {}", e);
                }
            }
            Some(event) = chat_events.recv() => {
                if let Some(event) = relay.accept(event) {
                    println!("{}", render_event(&event));
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    relay.close().await;
    monitor.stop()?;
    monitor_task.await?;
    info!("[Console] Bye");
    Ok(())
}

async fn execute(
    state: &AppState,
    monitor: &MonitorHandle,
    relay: &mut ChatRelay,
    command: ConsoleCommand,
) -> Result<()> {
    match command {
        ConsoleCommand::Help => println!("{}", HELP),
        ConsoleCommand::List => {
            let lines = render_streamer_list(&state.streamers.load()?);
            if lines.is_empty() {
                println!("No streamers tracked yet");
            }
            for line in lines {
                println!("{}", line);
            }
        }
        ConsoleCommand::Add(channel) => {
            let streamer = add_streamer(state, &channel).await?;
            println!("✅ Now tracking {}", streamer.display_name);
            monitor.check_now()?;
        }
        ConsoleCommand::Remove(channel) => {
            let streamer = remove_streamer(state, &channel).await?;
            println!("Removed {}", streamer.display_name);
        }
        ConsoleCommand::Check => {
            // Transitions go to the monitor over the bus so each is announced once
            let outcome = state.relaying_reconciler().reconcile().await?;
            println!("{}", describe_outcome(&outcome));
        }
        ConsoleCommand::Interval(None) => {
            println!("Checking every {}s", check_interval(state)?);
        }
        ConsoleCommand::Interval(Some(secs)) => {
            let stored = set_check_interval(state, secs)?;
            println!("Checking every {}s", stored);
        }
        ConsoleCommand::Chat(channel) => {
            let streamer = state
                .streamers
                .find(&normalize_channel(&channel))?
                .ok_or(TrackerError::NotTracked(channel))?;
            if !streamer.is_live {
                bail!("{} is offline, chat opens for live streamers", streamer.display_name);
            }
            relay.open(&streamer.username).await?;
            println!("{}", render_event(&ChatEvent::State(relay.state())));
        }
        ConsoleCommand::Close => {
            if relay.channel().is_none() {
                println!("No chat is open");
            }
            relay.close().await;
        }
        ConsoleCommand::Open(id) => match open_notification(state, &id)? {
            Some(url) => println!("Opening {}", url),
            None => println!("Notification {} was already handled or is unknown", id),
        },
        ConsoleCommand::Diagnostics(Some(enabled)) => {
            set_diagnostics_enabled(enabled);
            println!("Diagnostics {}", if enabled { "on" } else { "off" });
        }
        ConsoleCommand::Diagnostics(None) => {
            println!(
                "Diagnostics {}",
                if is_diagnostics_enabled() { "on" } else { "off" }
            );
        }
        ConsoleCommand::Quit => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::settings::Settings;
    use crate::models::streamer::Streamer;
    use crate::services::live_notification_service::testing::RecordingSink;
    use crate::services::storage_service::MemoryStore;
    use crate::services::twitch_service::testing::ScriptedSource;
    use std::sync::Arc;

    #[test]
    fn test_parse_commands() {
        assert_eq!(ConsoleCommand::parse("   ").unwrap(), None);
        assert_eq!(
            ConsoleCommand::parse("add Shroud").unwrap(),
            Some(ConsoleCommand::Add("Shroud".to_string()))
        );
        assert_eq!(
            ConsoleCommand::parse("INTERVAL 45").unwrap(),
            Some(ConsoleCommand::Interval(Some(45)))
        );
        assert_eq!(
            ConsoleCommand::parse("interval").unwrap(),
            Some(ConsoleCommand::Interval(None))
        );
        assert_eq!(
            ConsoleCommand::parse("diagnostics off").unwrap(),
            Some(ConsoleCommand::Diagnostics(Some(false)))
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(ConsoleCommand::parse("add").is_err());
        assert!(ConsoleCommand::parse("interval soon").is_err());
        assert!(ConsoleCommand::parse("diagnostics maybe").is_err());
        assert!(ConsoleCommand::parse("dance").is_err());
    }

    #[tokio::test]
    async fn test_chat_requires_live_tracked_streamer() {
        let state = AppState::new(
            Settings::default(),
            Arc::new(MemoryStore::default()),
            Arc::new(ScriptedSource::default()),
            Arc::new(RecordingSink::default()),
        );
        state
            .streamers
            .replace(&[Streamer::new("alice", "Alice", 0)])
            .unwrap();
        let (monitor, task) = state.background_monitor().unwrap().spawn();
        let (mut relay, _events) = ChatRelay::new(state.settings.chat.clone());

        let offline = execute(&state, &monitor, &mut relay, ConsoleCommand::Chat("alice".into()))
            .await;
        assert!(offline.unwrap_err().to_string().contains("offline"));

        let untracked =
            execute(&state, &monitor, &mut relay, ConsoleCommand::Chat("bob".into())).await;
        assert!(untracked.unwrap_err().to_string().contains("not being tracked"));
        assert!(relay.channel().is_none());

        monitor.stop().unwrap();
        task.await.unwrap();
    }
}
