//! # Core Runtime Module
//!
//! Runtime infrastructure shared by the playback core:
//! - Logging and tracing bootstrap
//! - Event bus carrying playback and navigation notifications
//!
//! Controllers publish through an [`EventBus`](events::EventBus); hosts
//! subscribe and render. Logging is installed once per process with
//! [`init_logging`](logging::init_logging).

pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, NavigationEvent, PlaybackEvent};
