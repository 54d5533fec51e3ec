//! Transport abstraction
//!
//! The bidirectional channel to the karma server (socket.io in stock
//! karma deployments) is an external collaborator. It is assumed
//! reliable, ordered, and self-reconnecting; this crate only consumes it
//! through this trait.

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::common::Result;

use super::types::{OutboundMessage, TransportEvent};

/// Bidirectional message transport to the karma server
#[async_trait]
pub trait Transport: Send {
    /// Open the connection to the resolved server URL. Connection
    /// establishment is reported asynchronously via
    /// [`TransportEvent::Connected`].
    async fn connect(&mut self, server_url: &str) -> Result<()>;

    /// Send a message, fire-and-forget.
    async fn send(&mut self, message: OutboundMessage) -> Result<()>;

    /// Send a message and return a receiver that resolves when the server
    /// acknowledges receipt. Only `complete` uses this.
    async fn send_with_ack(&mut self, message: OutboundMessage) -> Result<oneshot::Receiver<()>>;

    /// Close the logical session.
    async fn disconnect(&mut self) -> Result<()>;

    /// Close the low-level connection manager as well. Some transport
    /// implementations silently re-establish a logically closed socket when
    /// the server comes back; closing the manager prevents that.
    async fn close_manager(&mut self) -> Result<()>;

    /// Take the inbound event receiver (can only be called once)
    fn take_event_receiver(&mut self) -> Option<mpsc::UnboundedReceiver<TransportEvent>>;
}
