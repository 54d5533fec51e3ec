//! Client facade and dispatch loop
//!
//! Wires the protocol session, run orchestrator, and result aggregator
//! together and processes inbound events one at a time. Handlers run to
//! completion before the next event is dispatched, so run state and
//! counters need no locking.

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{trace, warn};

use crate::adapter::{FrameworkHandle, FrameworkMessage, TestAdapter};
use crate::common::{ClientOptions, Error, Platform, Result};
use crate::endpoint::{ClientIdentity, EndpointUrl};
use crate::events::ClientEvent;
use crate::protocol::{ProtocolSession, SessionState, Transport, TransportEvent};
use crate::results::ResultAggregator;
use crate::run::{AssetSource, RunOrchestrator, RunState};

/// Karma client embedded in a host process
///
/// Construct with a transport and asset source, hand the
/// [`FrameworkHandle`] to the test-framework adapter, then drive
/// [`KarmaClient::run`] on a tokio runtime.
pub struct KarmaClient<T: Transport, S: AssetSource> {
    session: ProtocolSession<T>,
    orchestrator: RunOrchestrator<S>,
    aggregator: ResultAggregator,
    adapter: Box<dyn TestAdapter>,
    transport_rx: mpsc::UnboundedReceiver<TransportEvent>,
    framework_rx: mpsc::UnboundedReceiver<FrameworkMessage>,
    framework_tx: mpsc::UnboundedSender<FrameworkMessage>,
    events_rx: Option<mpsc::UnboundedReceiver<ClientEvent>>,
    single_run: bool,
}

impl<T: Transport, S: AssetSource> KarmaClient<T, S> {
    /// Build a client from its collaborators
    ///
    /// Fails with [`Error::MalformedEndpoint`] if the endpoint URL does not
    /// parse; the client cannot proceed without a valid endpoint.
    pub fn new(
        options: ClientOptions,
        platform: Platform,
        transport: T,
        source: S,
        adapter: Box<dyn TestAdapter>,
    ) -> Result<Self> {
        let mut url = EndpointUrl::parse(&options.url)?;
        url.rewrite_for_emulator(&platform);
        let identity = ClientIdentity::resolve(&url, &platform);
        let base_url = url.base_url();

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (framework_tx, framework_rx) = mpsc::unbounded_channel();

        let mut session =
            ProtocolSession::new(transport, identity, &platform.descriptor, base_url.clone());
        let transport_rx = session.take_event_receiver().ok_or_else(|| {
            Error::Internal("transport event receiver already taken".to_string())
        })?;

        Ok(Self {
            session,
            orchestrator: RunOrchestrator::new(source, base_url, events_tx.clone()),
            aggregator: ResultAggregator::new(events_tx),
            adapter,
            transport_rx,
            framework_rx,
            framework_tx,
            events_rx: Some(events_rx),
            single_run: options.single_run,
        })
    }

    /// Handle the test-framework adapter reports progress through
    pub fn framework_handle(&self) -> FrameworkHandle {
        FrameworkHandle::new(self.framework_tx.clone())
    }

    /// Take the local notification receiver (can only be called once)
    pub fn take_event_receiver(&mut self) -> Option<mpsc::UnboundedReceiver<ClientEvent>> {
        self.events_rx.take()
    }

    /// Identity this client registers under
    pub fn identity(&self) -> &ClientIdentity {
        self.session.identity()
    }

    /// Current connection state
    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    /// Current run state
    pub fn run_state(&self) -> RunState {
        self.orchestrator.state()
    }

    /// Connect and process events until the session ends
    ///
    /// Returns when the transport event channel closes or, in single-run
    /// mode, after a completed run was acknowledged and the session was
    /// torn down. Fetch errors and a missing framework adapter propagate
    /// out of here; there is no local recovery.
    pub async fn run(&mut self) -> Result<()> {
        self.session.connect().await?;

        loop {
            tokio::select! {
                biased;
                event = self.transport_rx.recv() => match event {
                    Some(event) => {
                        if self.handle_transport_event(event).await? {
                            break;
                        }
                    }
                    None => {
                        warn!("Transport event channel closed");
                        break;
                    }
                },
                message = self.framework_rx.recv() => match message {
                    // We hold a sender, so the channel cannot close.
                    Some(message) => {
                        if self.handle_framework_message(message).await? {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }

        Ok(())
    }

    /// Dispatch one server/transport event; returns true when the loop
    /// should stop
    async fn handle_transport_event(&mut self, event: TransportEvent) -> Result<bool> {
        match event {
            TransportEvent::Connected => {
                self.session.handle_connected().await?;
                Ok(false)
            }
            TransportEvent::Execute(config) => {
                // Any run already in progress is abandoned by the reset
                // inside the orchestrator.
                self.orchestrator
                    .execute_test_run(config, self.adapter.as_mut(), &mut self.aggregator)
                    .await?;
                Ok(false)
            }
            TransportEvent::Stop(result) => self.complete(result).await,
            TransportEvent::Disconnected { reason } => {
                self.session.handle_disconnected(&reason);
                Ok(false)
            }
        }
    }

    /// Dispatch one framework message; returns true when the loop should
    /// stop
    async fn handle_framework_message(&mut self, message: FrameworkMessage) -> Result<bool> {
        match message {
            FrameworkMessage::Result(raw) => {
                for outbound in self.aggregator.report(raw) {
                    self.session.send(outbound).await?;
                }
                Ok(false)
            }
            FrameworkMessage::Info(payload) => {
                let outbound = self.aggregator.info(payload);
                self.session.send(outbound).await?;
                Ok(false)
            }
            FrameworkMessage::Complete(result) => self.complete(result).await,
            FrameworkMessage::Error(report) => {
                let outbound = self.aggregator.error(&report);
                self.session.send(outbound).await?;
                // An uncaught error always terminates the run.
                self.complete(None).await
            }
        }
    }

    /// Run the completion path
    ///
    /// Sends `complete` with an acknowledgment request. In single-run mode
    /// the session is torn down only after the ack fired; in continuous
    /// mode the loop keeps dispatching without waiting, so a slow server
    /// cannot stall the next `execute`. Returns true when the loop should
    /// stop.
    async fn complete(&mut self, result: Option<Value>) -> Result<bool> {
        let message = self.aggregator.complete(result);
        let ack = self.session.send_complete(message).await?;
        trace!("Test run complete");
        self.orchestrator.finish_run();

        if self.single_run {
            // TODO: bound this wait; a transport that never delivers the
            // ack stalls single-run teardown forever.
            ack.await.map_err(|_| {
                Error::Transport("completion acknowledgment channel closed".to_string())
            })?;
            self.session.disconnect().await?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Explicit teardown of the session and its transport
    pub async fn disconnect(&mut self) -> Result<()> {
        self.session.disconnect().await
    }
}
