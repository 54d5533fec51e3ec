//! Test run machinery: asset retrieval, shared execution environment,
//! and the run orchestrator

pub mod env;
pub mod fetch;
pub mod orchestrator;

pub use env::{Global, SharedExecutionEnvironment};
pub use fetch::{Asset, AssetSource, HttpAssetSource, MANIFEST_PATH};
pub use orchestrator::{RunOrchestrator, RunState};
