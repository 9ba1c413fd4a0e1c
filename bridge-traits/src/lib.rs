//! # Host Bridge Traits
//!
//! Shared vocabulary between the playback core and the host that embeds it.
//!
//! ## Overview
//!
//! The playback core never talks to a media engine or a UI toolkit directly.
//! Everything it exchanges with the outside world is expressed with the types
//! in this crate:
//!
//! - [`PlaybackState`](playback::PlaybackState) - public state model reported to listeners
//! - [`NativeState`](playback::NativeState) - engine-side states and their translation
//! - [`ErrorKind`](playback::ErrorKind) - severity of the latched error
//! - [`NavigationMenu`](playback::NavigationMenu) - disc navigation menus
//! - [`TagMap`](playback::TagMap) - multi-valued metadata
//! - [`LoggerSink`](logging::LoggerSink) - forward structured logs to the host
//!
//! ## Error Handling
//!
//! Engine factories and host sinks report failures through
//! [`BridgeError`](error::BridgeError). Implementations should convert their
//! native errors and keep the message actionable (engine name, missing plugin,
//! device path).
//!
//! ## Thread Safety
//!
//! Engine callbacks arrive on engine threads, so every bridge trait requires
//! `Send + Sync` through [`PlatformSendSync`](platform::PlatformSendSync).

pub mod error;
pub mod logging;
pub mod platform;
pub mod playback;

pub use error::BridgeError;

pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use playback::{
    ControllerId, ErrorKind, NativeState, NavigationMenu, PlaybackState, TagMap, UNKNOWN_TIME,
};
