use crate::models::chat::{ChatEvent, ChatState};
use crate::models::settings::ChatSettings;
use crate::services::irc_service::ChatRelay;
use anyhow::Result;

pub fn render_event(event: &ChatEvent) -> String {
    match event {
        ChatEvent::State(state) => format!("-- {} --", state.describe()),
        ChatEvent::Message(message) => message.render(),
    }
}

/// Whether the view has nothing more to show after this event.
pub fn ends_view(event: &ChatEvent) -> bool {
    matches!(
        event,
        ChatEvent::State(ChatState::Errored(_) | ChatState::Disconnected)
    )
}

/// Foreground chat view for `streamwatch chat <channel>`; runs until Ctrl-C
/// or until the connection fails.
pub async fn run_chat_view(config: ChatSettings, channel: &str) -> Result<()> {
    let (mut relay, mut events) = ChatRelay::new(config);
    relay.open(channel).await?;
    println!("{}", render_event(&ChatEvent::State(relay.state())));

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                let Some(event) = relay.accept(event) else { continue };
                println!("{}", render_event(&event));
                if ends_view(&event) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    relay.close().await;
    Ok(())
}
