//! Wire message types
//!
//! The karma server speaks named socket events with JSON payloads. The
//! transport collaborator is responsible for framing; these types only
//! describe the event names and payload shapes.

use serde::Serialize;
use serde_json::Value;

/// Registration payload sent after the transport connects
#[derive(Debug, Clone, Serialize)]
pub struct RegisterInfo {
    /// Stable client id
    pub id: String,
    /// Human-readable client descriptor (client version + platform)
    pub name: String,
    /// Optional display name from the endpoint query
    #[serde(rename = "displayName", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Start-of-run payload
///
/// `total` serializes as `null` while the framework has not reported a
/// test count yet.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StartInfo {
    pub total: Option<u64>,
}

/// Error payload for the `karma_error` event
#[derive(Debug, Clone, Serialize)]
pub struct ErrorMessage {
    pub message: String,
    pub str: String,
}

impl ErrorMessage {
    pub fn new(message: String) -> Self {
        let str = message.clone();
        Self { message, str }
    }
}

/// Client → server messages
#[derive(Debug, Clone)]
pub enum OutboundMessage {
    /// Initial handshake identifying this client
    Register(RegisterInfo),
    /// Uncaught error report
    KarmaError(ErrorMessage),
    /// Run start notification
    Start(StartInfo),
    /// One normalized test result
    Result(Value),
    /// Generic informational payload
    Info(Value),
    /// Run completion; the only message requiring a server acknowledgment
    Complete(Value),
}

impl OutboundMessage {
    /// Wire event name for this message
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Register(_) => "register",
            Self::KarmaError(_) => "karma_error",
            Self::Start(_) => "start",
            Self::Result(_) => "result",
            Self::Info(_) => "info",
            Self::Complete(_) => "complete",
        }
    }

    /// Serialize the payload for the transport
    pub fn payload(&self) -> Value {
        match self {
            Self::Register(info) => serde_json::to_value(info).unwrap_or(Value::Null),
            Self::KarmaError(message) => serde_json::to_value(message).unwrap_or(Value::Null),
            Self::Start(info) => serde_json::to_value(info).unwrap_or(Value::Null),
            Self::Result(value) | Self::Info(value) | Self::Complete(value) => value.clone(),
        }
    }
}

/// Server → client messages, surfaced by the transport
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// The underlying connection is established
    Connected,
    /// Execute a test run with the attached framework configuration
    Execute(Value),
    /// Server-initiated abort; run the completion path immediately
    Stop(Option<Value>),
    /// The connection dropped; reconnection is the transport's business
    Disconnected { reason: String },
}
