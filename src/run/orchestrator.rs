//! Run orchestration
//!
//! Drives one test-run cycle: manifest fetch, concurrent asset content
//! fetch, strictly manifest-ordered execution with compatibility shims,
//! then handing off to the framework's `start` hook.

use futures_util::future::try_join_all;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use crate::adapter::TestAdapter;
use crate::common::{Error, Result};
use crate::events::ClientEvent;
use crate::results::ResultAggregator;

use super::env::SharedExecutionEnvironment;
use super::fetch::{Asset, AssetSource};

/// Run lifecycle state
///
/// Exactly one run is active at a time. A new `execute` command resets to
/// `AwaitingManifest` regardless of the current state (last-writer-wins,
/// no queuing).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// No run requested
    Idle,
    /// Fetching the manifest
    AwaitingManifest,
    /// Fetching asset contents
    FetchingAssets,
    /// Executing assets in manifest order
    Executing,
    /// Assets executed; waiting for the framework to drive completion
    AwaitingCompletion,
    /// The run's completion path has finished
    Completed,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::AwaitingManifest => write!(f, "awaiting-manifest"),
            Self::FetchingAssets => write!(f, "fetching-assets"),
            Self::Executing => write!(f, "executing"),
            Self::AwaitingCompletion => write!(f, "awaiting-completion"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// Orchestrates one test run at a time
pub struct RunOrchestrator<S: AssetSource> {
    source: S,
    base_url: String,
    env: SharedExecutionEnvironment,
    state: RunState,
    /// Framework configuration from the current `execute` command,
    /// replaced wholesale on each new run
    config: Value,
    events: mpsc::UnboundedSender<ClientEvent>,
}

impl<S: AssetSource> RunOrchestrator<S> {
    pub fn new(source: S, base_url: String, events: mpsc::UnboundedSender<ClientEvent>) -> Self {
        Self {
            source,
            base_url,
            env: SharedExecutionEnvironment::new(),
            state: RunState::Idle,
            config: Value::Null,
            events,
        }
    }

    /// Current run state
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Perform one full run cycle up to the framework hand-off
    ///
    /// Fetch errors propagate without retry and abort the run. Results
    /// arriving for an abandoned prior run are counted into the new run's
    /// counters (results carry no run id; accepted behavior).
    // TODO: add a watchdog timeout around the fetch stages and the start()
    // hook; a hung fetch or adapter currently hangs the run.
    pub async fn execute_test_run(
        &mut self,
        config: Value,
        adapter: &mut dyn TestAdapter,
        aggregator: &mut ResultAggregator,
    ) -> Result<()> {
        debug!(?config, "Server requested test run execution");
        let _ = self.events.send(ClientEvent::Execute);

        self.config = config;
        aggregator.begin_run();

        self.state = RunState::AwaitingManifest;
        let manifest = self.source.manifest(&self.base_url).await?;
        debug!(assets = manifest.len(), "File list downloaded");

        // Contents are fetched concurrently; execution order below comes
        // from the manifest alone.
        self.state = RunState::FetchingAssets;
        let contents = try_join_all(
            manifest
                .iter()
                .map(|asset_url| self.source.asset(&self.base_url, asset_url)),
        )
        .await?;

        self.state = RunState::Executing;
        for (url, content) in manifest.into_iter().zip(contents) {
            debug!(asset = %url, "Executing asset");
            let asset = Asset { url, content };
            self.env
                .with_shims(&asset.url, |env| adapter.execute_asset(env, &asset))
                .map_err(|e| Error::asset_execution(&asset.url, e))?;
        }

        self.state = RunState::AwaitingCompletion;
        let _ = self.events.send(ClientEvent::Start);
        adapter.start(&self.config)
    }

    /// Mark the current run's completion path as finished
    pub fn finish_run(&mut self) {
        self.state = RunState::Completed;
    }
}
