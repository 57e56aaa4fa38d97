//! Tokenizer for the IRC lines Twitch chat sends over the WebSocket.
//!
//! A line is `[@tags ][:prefix ]COMMAND[ params...][ :trailing]`. Only the
//! pieces the chat relay cares about are classified; everything else is
//! ignored without error.

const DEFAULT_PING_PAYLOAD: &str = "tmi.twitch.tv";
const ANONYMOUS: &str = "Anonymous";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrcLine<'a> {
    pub tags: Vec<(&'a str, &'a str)>,
    pub prefix: Option<&'a str>,
    pub command: &'a str,
    pub params: Vec<&'a str>,
    pub trailing: Option<&'a str>,
}

impl<'a> IrcLine<'a> {
    /// Returns `None` for lines without a usable command.
    pub fn parse(line: &'a str) -> Option<Self> {
        let mut rest = line.trim_end_matches(['\r', '\n']);

        let mut tags = Vec::new();
        if let Some(tagged) = rest.strip_prefix('@') {
            let (tag_section, after) = tagged.split_once(' ')?;
            for tag in tag_section.split(';').filter(|t| !t.is_empty()) {
                let (key, value) = tag.split_once('=').unwrap_or((tag, ""));
                tags.push((key, value));
            }
            rest = after.trim_start_matches(' ');
        }

        let mut prefix = None;
        if let Some(prefixed) = rest.strip_prefix(':') {
            let (source, after) = prefixed.split_once(' ')?;
            prefix = Some(source);
            rest = after.trim_start_matches(' ');
        }

        // The trailing parameter starts at the first " :" and may itself contain colons
        let (head, trailing) = match rest.split_once(" :") {
            Some((head, trailing)) => (head, Some(trailing)),
            None => (rest, None),
        };

        let mut words = head.split(' ').filter(|w| !w.is_empty());
        let command = words.next()?;
        if !command.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }

        Some(Self {
            tags,
            prefix,
            command,
            params: words.collect(),
            trailing,
        })
    }

    /// Sender nickname, the part of `nick!user@host` before the `!`.
    pub fn nick(&self) -> Option<&'a str> {
        let (nick, _) = self.prefix?.split_once('!')?;
        (!nick.is_empty()).then_some(nick)
    }

    pub fn tag(&self, key: &str) -> Option<&'a str> {
        self.tags.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }
}

/// What the chat relay does with one inbound line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    Chat { username: String, text: String },
    KeepAlive { payload: String },
    Ignored,
}

pub fn classify(line: &str) -> LineKind {
    let Some(parsed) = IrcLine::parse(line) else {
        return LineKind::Ignored;
    };

    match parsed.command {
        "PRIVMSG" => {
            let text = parsed.trailing.unwrap_or("").trim();
            if text.is_empty() {
                return LineKind::Ignored;
            }
            LineKind::Chat {
                username: parsed.nick().unwrap_or(ANONYMOUS).to_string(),
                text: text.to_string(),
            }
        }
        "PING" => LineKind::KeepAlive {
            payload: parsed
                .trailing
                .or_else(|| parsed.params.first().copied())
                .filter(|p| !p.is_empty())
                .unwrap_or(DEFAULT_PING_PAYLOAD)
                .to_string(),
        },
        _ => LineKind::Ignored,
    }
}

/// A single WebSocket frame may carry several `\r\n` separated lines.
pub fn split_lines(payload: &str) -> impl Iterator<Item = &str> {
    payload
        .split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
}

pub fn pong_line(payload: &str) -> String {
    format!("PONG :{}", payload)
}
