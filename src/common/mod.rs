//! Common utilities shared across the crate

pub mod config;
pub mod error;
pub mod logging;
pub mod platform;

pub use config::ClientOptions;
pub use error::{Error, Result};
pub use platform::Platform;
