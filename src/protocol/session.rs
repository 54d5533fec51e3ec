//! Protocol session lifecycle
//!
//! Owns the transport connection and the registration handshake, and maps
//! domain events to wire messages. Run sequencing lives in
//! [`crate::run::RunOrchestrator`]; this module only cares about the
//! connection.

use tokio::sync::oneshot;
use tracing::debug;

use crate::common::Result;
use crate::endpoint::ClientIdentity;

use super::transport::Transport;
use super::types::{OutboundMessage, RegisterInfo};

/// Connection lifecycle state
///
/// Driven by transport lifecycle events, independent of run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No connection
    Disconnected,
    /// Transport opening
    Connecting,
    /// Transport up, registration not yet sent
    Connected,
    /// Registration sent; the session is usable
    Registered,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Registered => write!(f, "registered"),
        }
    }
}

/// Protocol session over a [`Transport`]
pub struct ProtocolSession<T: Transport> {
    transport: T,
    state: SessionState,
    identity: ClientIdentity,
    /// Descriptor sent as the registration `name`
    client_name: String,
    /// Resolved server URL the transport connects to; any emulator
    /// rewrite has already been applied here
    server_url: String,
}

impl<T: Transport> ProtocolSession<T> {
    /// Create a session for the given identity and server URL
    ///
    /// `platform_descriptor` ends up in the registration `name` so the
    /// server can show what kind of client connected.
    pub fn new(
        transport: T,
        identity: ClientIdentity,
        platform_descriptor: &str,
        server_url: String,
    ) -> Self {
        let client_name = format!(
            "karma-native {} ({})",
            env!("CARGO_PKG_VERSION"),
            platform_descriptor
        );
        Self {
            transport,
            state: SessionState::Disconnected,
            identity,
            client_name,
            server_url,
        }
    }

    /// Current session state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Identity this session registers under
    pub fn identity(&self) -> &ClientIdentity {
        &self.identity
    }

    /// Take the transport's inbound event receiver (can only be called once)
    pub fn take_event_receiver(
        &mut self,
    ) -> Option<tokio::sync::mpsc::UnboundedReceiver<super::types::TransportEvent>> {
        self.transport.take_event_receiver()
    }

    /// Open the transport connection to the resolved server URL
    pub async fn connect(&mut self) -> Result<()> {
        debug!(state = %self.state, url = %self.server_url, "Opening transport connection");
        self.state = SessionState::Connecting;
        self.transport.connect(&self.server_url).await
    }

    /// Handle the transport's connect event: send the registration message
    ///
    /// Registration is fire-and-forget; no acknowledgment is awaited before
    /// the session counts as usable.
    pub async fn handle_connected(&mut self) -> Result<()> {
        self.state = SessionState::Connected;

        let info = RegisterInfo {
            id: self.identity.id.clone(),
            name: self.client_name.clone(),
            display_name: self.identity.display_name.clone(),
        };
        debug!(id = %info.id, name = %info.name, "Registering with karma server");
        self.transport.send(OutboundMessage::Register(info)).await?;

        self.state = SessionState::Registered;
        Ok(())
    }

    /// Handle a transport disconnect notice
    ///
    /// Observability only; the transport is responsible for reconnecting.
    pub fn handle_disconnected(&mut self, reason: &str) {
        debug!(reason, "Transport disconnected");
        self.state = SessionState::Disconnected;
    }

    /// Send a fire-and-forget message
    pub async fn send(&mut self, message: OutboundMessage) -> Result<()> {
        self.transport.send(message).await
    }

    /// Send the completion message, requesting a server acknowledgment
    ///
    /// The caller decides whether to wait on the returned receiver; only
    /// single-run teardown is gated on the acknowledgment.
    pub async fn send_complete(
        &mut self,
        message: OutboundMessage,
    ) -> Result<oneshot::Receiver<()>> {
        self.transport.send_with_ack(message).await
    }

    /// Explicit teardown
    ///
    /// Closes both the logical session and the transport's low-level
    /// connection manager; closing only the former can leave the transport
    /// free to silently re-establish on some host platforms.
    pub async fn disconnect(&mut self) -> Result<()> {
        debug!("Disconnecting from karma server");
        self.transport.disconnect().await?;
        self.transport.close_manager().await?;
        self.state = SessionState::Disconnected;
        Ok(())
    }
}
