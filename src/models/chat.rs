use crate::utils::text::escape_control;
use chrono::{DateTime, Local, Utc};
use std::collections::VecDeque;

/// Number of chat lines a chat view keeps on screen.
pub const CHAT_LOG_CAPACITY: usize = 100;

#[derive(Clone, Debug)]
pub struct ChatMessage {
    pub username: String,
    pub text: String,
    pub received_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(username: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            text: text.into(),
            received_at: Utc::now(),
        }
    }

    /// `HH:MM username: text`, with both user-controlled parts escaped.
    pub fn render(&self) -> String {
        format!(
            "{} {}: {}",
            self.received_at.with_timezone(&Local).format("%H:%M"),
            escape_control(&self.username),
            escape_control(&self.text)
        )
    }
}

/// Connection state of one chat view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatState {
    Disconnected,
    Connecting,
    Negotiating,
    Joined,
    Errored(String),
}

impl ChatState {
    pub fn describe(&self) -> String {
        match self {
            ChatState::Disconnected => "Chat closed".to_string(),
            ChatState::Connecting => "Connecting to chat...".to_string(),
            ChatState::Negotiating => "Joining channel...".to_string(),
            ChatState::Joined => "Connected".to_string(),
            ChatState::Errored(reason) => format!("Failed to connect to chat: {}", reason),
        }
    }
}

#[derive(Clone, Debug)]
pub enum ChatEvent {
    State(ChatState),
    Message(ChatMessage),
}

/// Bounded FIFO of the messages shown in a chat view.
#[derive(Debug)]
pub struct ChatLog {
    messages: VecDeque<ChatMessage>,
    capacity: usize,
}

impl Default for ChatLog {
    fn default() -> Self {
        Self::with_capacity(CHAT_LOG_CAPACITY)
    }
}

impl ChatLog {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            messages: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a message, returning the entry evicted to stay within capacity.
    pub fn push(&mut self, message: ChatMessage) -> Option<ChatMessage> {
        let evicted = if self.messages.len() >= self.capacity {
            self.messages.pop_front()
        } else {
            None
        };
        self.messages.push_back(message);
        evicted
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }
}
