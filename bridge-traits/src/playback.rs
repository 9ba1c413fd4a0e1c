//! Playback state vocabulary shared by the core and the host.
//!
//! The media engine reports its own coarse states ([`NativeState`]); the core
//! republishes them through the public [`PlaybackState`] model. Hosts consume
//! the public model only.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Sentinel for "time not known", used for total time and for the position
/// reported while in [`PlaybackState::Error`].
pub const UNKNOWN_TIME: i64 = -1;

/// Public playback lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PlaybackState {
    /// Engine not yet prepared for the current source.
    #[default]
    Loading,
    Stopped,
    Playing,
    Paused,
    /// Transient stall while the engine refills its buffers.
    Buffering,
    /// An error is latched; see the controller's error string.
    Error,
}

impl PlaybackState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackState::Loading => "loading",
            PlaybackState::Stopped => "stopped",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Buffering => "buffering",
            PlaybackState::Error => "error",
        }
    }

    /// States in which the engine has a meaningful playback position.
    pub fn has_position(&self) -> bool {
        matches!(
            self,
            PlaybackState::Playing | PlaybackState::Paused | PlaybackState::Buffering
        )
    }

    pub(crate) fn to_u8(self) -> u8 {
        match self {
            PlaybackState::Loading => 0,
            PlaybackState::Stopped => 1,
            PlaybackState::Playing => 2,
            PlaybackState::Paused => 3,
            PlaybackState::Buffering => 4,
            PlaybackState::Error => 5,
        }
    }

    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            1 => PlaybackState::Stopped,
            2 => PlaybackState::Playing,
            3 => PlaybackState::Paused,
            4 => PlaybackState::Buffering,
            5 => PlaybackState::Error,
            _ => PlaybackState::Loading,
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine-side states, ordered from fully torn down to running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NativeState {
    /// No resources allocated.
    Null,
    /// Resources allocated, stream prepared, clock stopped.
    Ready,
    Paused,
    Playing,
}

impl From<NativeState> for PlaybackState {
    fn from(native: NativeState) -> Self {
        match native {
            NativeState::Playing => PlaybackState::Playing,
            NativeState::Paused => PlaybackState::Paused,
            NativeState::Ready => PlaybackState::Stopped,
            NativeState::Null => PlaybackState::Loading,
        }
    }
}

impl PlaybackState {
    /// Native state the engine must reach to honour a request for `self`.
    ///
    /// `Buffering` has no native counterpart and maps to `Paused`; `Error`
    /// tears the engine down.
    pub fn native_target(&self) -> NativeState {
        match self {
            PlaybackState::Playing => NativeState::Playing,
            PlaybackState::Paused | PlaybackState::Buffering => NativeState::Paused,
            PlaybackState::Stopped => NativeState::Ready,
            PlaybackState::Loading | PlaybackState::Error => NativeState::Null,
        }
    }
}

/// Severity of a latched error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ErrorKind {
    #[default]
    NoError,
    /// Recoverable by loading another source (missing codec, unreadable file).
    Normal,
    /// The controller cannot play anything (engine missing).
    Fatal,
}

/// Disc navigation menus exposed by DVD-like sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NavigationMenu {
    Root,
    Title,
    Audio,
    Subtitle,
    Chapter,
    Angle,
}

/// Multi-valued metadata, e.g. `ARTIST -> ["A", "B"]`.
pub type TagMap = BTreeMap<String, Vec<String>>;

/// Identifier attached to every controller for log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ControllerId(Uuid);

impl ControllerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ControllerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Compact encoding for [`PlaybackState`] so it can live in an atomic.
pub fn encode_state(state: PlaybackState) -> u8 {
    state.to_u8()
}

/// Inverse of [`encode_state`]. Unknown values decode as `Loading`.
pub fn decode_state(raw: u8) -> PlaybackState {
    PlaybackState::from_u8(raw)
}
