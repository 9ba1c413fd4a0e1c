//! # Playback Core
//!
//! State machine and stream plumbing between a high-level playback API and an
//! asynchronous media engine.
//!
//! ## Overview
//!
//! - [`PlaybackController`] mirrors engine states into the public
//!   [`PlaybackState`](bridge_traits::PlaybackState) model, switches sources
//!   gaplessly, and emits ticks, prefinish and end-of-stream notifications on
//!   the [`EventBus`](core_runtime::EventBus).
//! - [`StreamBridge`] lets the engine pull bytes from an application
//!   [`StreamProducer`] running on another thread.
//! - [`ControllerDriver`] runs a controller on one Tokio task and serializes
//!   commands, engine events and ticks.
//!
//! The engine itself is external: implement [`Pipeline`] and
//! [`PipelineFactory`] to plug one in.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_playback::{ControllerConfig, ControllerDriver, MediaSource, PlaybackController};
//! use core_async::sync::CancellationToken;
//!
//! let config = ControllerConfig::gapless();
//! let bus = config.event_bus();
//! let mut events = bus.subscribe();
//!
//! let controller = PlaybackController::new(&engine_factory, config, bus)?;
//! let (handle, _task) = ControllerDriver::spawn(controller, CancellationToken::new());
//!
//! handle.set_source(MediaSource::Url("https://radio.example/live.ogg".into()))?;
//! handle.play()?;
//! ```

pub mod about_to_finish;
pub mod config;
pub mod controller;
pub mod driver;
pub mod error;
pub mod graph;
pub mod source;
pub mod state;
pub mod stream_bridge;
pub mod traits;

pub use about_to_finish::{AboutToFinishGate, AboutToFinishHandle, HandshakeOutcome};
pub use config::{ControllerConfig, StreamBridgeConfig};
pub use controller::{PlaybackController, ResumeSnapshot};
pub use driver::{ControllerCommand, ControllerDriver, ControllerHandle, ControllerStatus};
pub use error::{PlaybackError, Result};
pub use graph::{GraphLinks, GraphNode, NodeEvent};
pub use source::{DiscType, MediaSource, StreamSource};
pub use state::SharedPlaybackState;
pub use stream_bridge::{StreamBridge, StreamWriter};
pub use traits::{
    FormattedValue, Pipeline, PipelineContext, PipelineEvent, PipelineEventReceiver,
    PipelineEventSender, PipelineFactory, QueryFormat, StreamProducer,
};
