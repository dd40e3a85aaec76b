//! Frame parsing and the client command vocabulary.
//!
//! A frame text is split on `\n`. Line 0 is the command, following lines up
//! to the first empty line are `key:value` headers, the empty line is the
//! separator, and everything after it (rejoined with `\n`) is the body.
//!
//! Header lines are split on the first colon only. Lines without a colon are
//! dropped. A repeated key keeps its first position but takes the value of
//! the last occurrence.

use std::fmt;
use std::str::FromStr;

/// Client commands understood by the broker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    /// Open a session.
    Connect,
    /// Publish to a destination.
    Send,
    /// Join a destination.
    Subscribe,
    /// Leave a destination.
    Unsubscribe,
    /// Close the session.
    Disconnect,
}

impl Command {
    /// All commands, in handshake order.
    pub const ALL: [Command; 5] = [
        Self::Connect,
        Self::Send,
        Self::Subscribe,
        Self::Unsubscribe,
        Self::Disconnect,
    ];

    /// Wire spelling of the command.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Send => "SEND",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Disconnect => "DISCONNECT",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a command line is not part of the vocabulary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownCommand(pub String);

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCommand(s.to_owned()))
    }
}

/// A parsed frame: command line, ordered headers, body.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Frame {
    command: String,
    headers: Vec<(String, String)>,
    body: String,
}

impl Frame {
    /// Parse a frame text (without its NUL terminator). Never fails: header
    /// validation belongs to the command handlers.
    pub fn parse(text: &str) -> Self {
        let mut lines = text.split('\n');
        let command = lines.next().unwrap_or_default().to_owned();

        let mut frame = Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        };

        // The header loop consumes the separator line.
        for line in lines.by_ref() {
            if line.is_empty() {
                break;
            }
            if let Some((key, value)) = line.split_once(':') {
                frame.set_header(key, value);
            }
        }

        frame.body = lines.collect::<Vec<_>>().join("\n");
        frame
    }

    /// Build a frame programmatically.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    /// Add or replace a header, builder style.
    #[must_use]
    pub fn header(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set_header(key, &value.into());
        self
    }

    /// Set the body, builder style.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Raw command line.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Look up a header value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Headers in first-seen order.
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Frame body.
    pub fn body_text(&self) -> &str {
        &self.body
    }

    /// Value of the `receipt` header, if the client asked for one.
    pub fn receipt(&self) -> Option<&str> {
        self.get("receipt")
    }

    /// Serialize to frame text (no NUL terminator).
    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(self.command.len() + self.body.len() + 32);
        out.push_str(&self.command);
        out.push('\n');
        for (key, value) in &self.headers {
            out.push_str(key);
            out.push(':');
            out.push_str(value);
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out
    }

    fn set_header(&mut self, key: &str, value: &str) {
        match self.headers.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => value.clone_into(&mut entry.1),
            None => self.headers.push((key.to_owned(), value.to_owned())),
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}
