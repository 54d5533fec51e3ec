//! Karma test-runner client for native host processes
//!
//! Connects to a karma server over a caller-supplied bidirectional
//! transport, registers, and executes test runs on request: fetch the
//! asset manifest, fetch every asset, execute them in manifest order
//! inside a shared execution environment, then hand off to the test
//! framework adapter and stream results back until completion.
//!
//! The transport (socket.io in stock karma deployments) and the test
//! framework engine are collaborators injected at construction; this
//! crate owns the run-lifecycle protocol in between.

pub mod adapter;
pub mod client;
pub mod common;
pub mod endpoint;
pub mod events;
pub mod protocol;
pub mod results;
pub mod run;

pub use adapter::{ErrorReport, FrameworkHandle, TestAdapter, UnimplementedAdapter};
pub use client::KarmaClient;
pub use common::{ClientOptions, Error, Platform, Result};
pub use endpoint::{ClientIdentity, EndpointUrl};
pub use events::ClientEvent;
pub use protocol::{OutboundMessage, SessionState, Transport, TransportEvent};
pub use results::RunCounters;
pub use run::{Asset, AssetSource, HttpAssetSource, RunState, SharedExecutionEnvironment};
