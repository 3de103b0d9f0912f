use serde::{Deserialize, Serialize};

/// Messages from daemon to renderers/clients (JSON-lines over Unix socket).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DaemonMsg {
    /// The busy indicator should now be shown (`true`) or hidden (`false`).
    #[serde(rename = "visibility")]
    Visibility { visible: bool },
    /// Status response.
    #[serde(rename = "status")]
    Status {
        visible: bool,
        state: String,
        debounce_delay_ms: u64,
        min_duration_ms: u64,
        extra_duration_ms: u64,
        version: String,
    },
    /// Acknowledgement for commands.
    #[serde(rename = "ack")]
    Ack { ok: bool, message: String },
}

/// Messages from clients to daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMsg {
    /// Whether work is pending right now, as seen by the request tracker.
    #[serde(rename = "activity")]
    Activity { pending: bool },
    /// Manual show/hide, applied immediately.
    #[serde(rename = "override")]
    Override { visible: bool },
    /// Request current status.
    #[serde(rename = "get_status")]
    GetStatus,
    /// Renderer announcing itself; it receives every `Visibility` change.
    #[serde(rename = "register_renderer")]
    RegisterRenderer,
}

/// Serialize a message as a JSON line (with trailing newline).
pub fn encode(msg: &impl Serialize) -> String {
    // Both message enums only hold plain fields, serialization cannot fail.
    let mut s = serde_json::to_string(msg).unwrap_or_default();
    s.push('\n');
    s
}

/// Deserialize a JSON line. Returns None on empty/whitespace or malformed input.
pub fn decode_daemon(line: &str) -> Option<DaemonMsg> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}

pub fn decode_client(line: &str) -> Option<ClientMsg> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}
