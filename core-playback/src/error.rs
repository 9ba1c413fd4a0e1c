//! # Playback Error Types
//!
//! Errors surfaced by construction and by the async command handle. Engine
//! failures at runtime are not errors of this type: they latch the
//! controller into [`PlaybackState::Error`](bridge_traits::PlaybackState::Error).

use thiserror::Error;

/// Errors that can occur while setting up or driving a controller.
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// Configuration failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The controller is latched in a fatal error and cannot play.
    #[error("Controller is not valid for playback")]
    ControllerInvalid,

    /// Title outside `1..=available_titles` or requested in the wrong state.
    #[error("Invalid title {title} (available: {available})")]
    InvalidTitle { title: u32, available: u32 },

    /// The controller driver task has stopped.
    #[error("Controller driver stopped")]
    DriverStopped,
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
