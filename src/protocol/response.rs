//! Response definitions
//!
//! Represents responses to clients.

/// A response to send to a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Reply to PING
    Pong,

    /// A write was accepted
    Ok,

    /// Values of a key (empty for an absent key)
    Values(Vec<String>),

    /// SUBSCRIBE succeeded
    Subscribed(String),

    /// PUBLISH was handed off
    Published(String),

    /// Parse or dispatch failure
    Invalid,

    /// Server-side refusal (e.g. connection limit)
    Error(String),
}

impl Response {
    /// Text of the response without the trailing newline
    pub fn text(&self) -> String {
        match self {
            Response::Pong => "PONG".to_string(),
            Response::Ok => "OK".to_string(),
            Response::Values(values) => values.join(" "),
            Response::Subscribed(topic) => format!("Subscribed to {}", topic),
            Response::Published(topic) => format!("Message published to {}", topic),
            Response::Invalid => "Invalid command".to_string(),
            Response::Error(message) => format!("ERR {}", message),
        }
    }

    /// Newline-terminated wire form
    pub fn to_line(&self) -> String {
        let mut line = self.text();
        line.push('\n');
        line
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text())
    }
}
