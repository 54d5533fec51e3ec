//! Karma wire protocol: message types, transport seam, session lifecycle

pub mod session;
pub mod transport;
pub mod types;

pub use session::{ProtocolSession, SessionState};
pub use transport::Transport;
pub use types::{ErrorMessage, OutboundMessage, RegisterInfo, StartInfo, TransportEvent};
