//! STOMP 1.2 text frame codec.

use std::{fmt, str::FromStr};

use thiserror::Error;

/// Single end-of-line sent as a heartbeat.
pub const HEARTBEAT: &str = "\n";

/// Failures while parsing inbound frames.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// Input stopped inside the command or header lines.
    #[error("frame ended before its header block was complete")]
    Truncated,
    /// No NUL byte after the body.
    #[error("frame body is not NUL terminated")]
    Unterminated,
    /// Command line is not a STOMP command.
    #[error("unknown frame command `{0}`")]
    UnknownCommand(String),
    /// Header line without a colon.
    #[error("malformed header line `{0}`")]
    MalformedHeader(String),
    /// Backslash followed by an unsupported character.
    #[error("invalid escape sequence `\\{0}` in header")]
    InvalidEscape(char),
    /// `content-length` is not a number or overruns the input.
    #[error("invalid content-length `{0}`")]
    InvalidContentLength(String),
}

/// Frame commands, client and server side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Connect,
    Stomp,
    Connected,
    Send,
    Subscribe,
    Unsubscribe,
    Ack,
    Nack,
    Begin,
    Commit,
    Abort,
    Disconnect,
    Message,
    Receipt,
    Error,
}

impl Command {
    /// Wire name of the command.
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Connect => "CONNECT",
            Command::Stomp => "STOMP",
            Command::Connected => "CONNECTED",
            Command::Send => "SEND",
            Command::Subscribe => "SUBSCRIBE",
            Command::Unsubscribe => "UNSUBSCRIBE",
            Command::Ack => "ACK",
            Command::Nack => "NACK",
            Command::Begin => "BEGIN",
            Command::Commit => "COMMIT",
            Command::Abort => "ABORT",
            Command::Disconnect => "DISCONNECT",
            Command::Message => "MESSAGE",
            Command::Receipt => "RECEIPT",
            Command::Error => "ERROR",
        }
    }

    /// CONNECT and CONNECTED headers are never escaped.
    fn escapes_headers(self) -> bool {
        !matches!(self, Command::Connect | Command::Connected | Command::Stomp)
    }
}

impl FromStr for Command {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let command = match s {
            "CONNECT" => Command::Connect,
            "STOMP" => Command::Stomp,
            "CONNECTED" => Command::Connected,
            "SEND" => Command::Send,
            "SUBSCRIBE" => Command::Subscribe,
            "UNSUBSCRIBE" => Command::Unsubscribe,
            "ACK" => Command::Ack,
            "NACK" => Command::Nack,
            "BEGIN" => Command::Begin,
            "COMMIT" => Command::Commit,
            "ABORT" => Command::Abort,
            "DISCONNECT" => Command::Disconnect,
            "MESSAGE" => Command::Message,
            "RECEIPT" => Command::Receipt,
            "ERROR" => Command::Error,
            other => return Err(FrameError::UnknownCommand(other.to_owned())),
        };
        Ok(command)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded or to-be-encoded frame. Header order is preserved; when a
/// header repeats, the first occurrence wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame command.
    pub command: Command,
    /// Headers in wire order, unescaped.
    pub headers: Vec<(String, String)>,
    /// Body text without the trailing NUL.
    pub body: String,
}

impl Frame {
    /// Empty frame for `command`.
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Append a header.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Value of the first header named `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    /// Serialize to wire text, NUL terminator included.
    pub fn encode(&self) -> String {
        let escape = self.command.escapes_headers();
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');
        for (key, value) in &self.headers {
            if escape {
                push_escaped(&mut out, key);
                out.push(':');
                push_escaped(&mut out, value);
            } else {
                out.push_str(key);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }
        if !self.body.is_empty() && self.get("content-length").is_none() {
            out.push_str(&format!("content-length:{}\n", self.body.len()));
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }
}

fn push_escaped(out: &mut String, raw: &str) {
    for ch in raw.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
}

fn unescape(raw: &str) -> Result<String, FrameError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            Some(other) => return Err(FrameError::InvalidEscape(other)),
            None => return Err(FrameError::InvalidEscape(' ')),
        }
    }
    Ok(out)
}

/// Decode every frame in one transport message. Heartbeat EOLs between
/// frames are skipped, so a pure heartbeat decodes to no frames.
pub fn decode(input: &str) -> Result<Vec<Frame>, FrameError> {
    let mut frames = Vec::new();
    let mut rest = input;
    loop {
        rest = rest.trim_start_matches(['\r', '\n']);
        if rest.is_empty() {
            return Ok(frames);
        }
        let (frame, remaining) = decode_one(rest)?;
        frames.push(frame);
        rest = remaining;
    }
}

fn next_line<'a>(cursor: &mut &'a str) -> Option<&'a str> {
    let end = cursor.find('\n')?;
    let line = &cursor[..end];
    *cursor = &cursor[end + 1..];
    Some(line.strip_suffix('\r').unwrap_or(line))
}

fn decode_one(input: &str) -> Result<(Frame, &str), FrameError> {
    let mut cursor = input;
    let command = next_line(&mut cursor)
        .ok_or(FrameError::Truncated)?
        .parse::<Command>()?;
    let escaped = command.escapes_headers();

    let mut headers = Vec::new();
    loop {
        let line = next_line(&mut cursor).ok_or(FrameError::Truncated)?;
        if line.is_empty() {
            break;
        }
        let (key, value) = line
            .split_once(':')
            .ok_or_else(|| FrameError::MalformedHeader(line.to_owned()))?;
        if escaped {
            headers.push((unescape(key)?, unescape(value)?));
        } else {
            headers.push((key.to_owned(), value.to_owned()));
        }
    }

    let content_length = headers
        .iter()
        .find(|(name, _)| name == "content-length")
        .map(|(_, value)| {
            value
                .trim()
                .parse::<usize>()
                .map_err(|_| FrameError::InvalidContentLength(value.clone()))
        })
        .transpose()?;

    let body_end = match content_length {
        Some(len) => {
            if cursor.len() <= len {
                return Err(FrameError::Unterminated);
            }
            if !cursor.is_char_boundary(len) {
                return Err(FrameError::InvalidContentLength(len.to_string()));
            }
            if cursor.as_bytes()[len] != 0 {
                return Err(FrameError::Unterminated);
            }
            len
        }
        None => cursor.find('\0').ok_or(FrameError::Unterminated)?,
    };

    let frame = Frame {
        command,
        headers,
        body: cursor[..body_end].to_owned(),
    };
    Ok((frame, &cursor[body_end + 1..]))
}
