//! Lock-free view of a controller's public state.
//!
//! The controller owns its state on a single context, but stream bridges run
//! on engine threads and need to know whether the controller is buffering or
//! still loading before telling the producer it may pause.

use bridge_traits::playback::{decode_state, encode_state, PlaybackState};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Shared, cheaply clonable snapshot of a [`PlaybackState`].
#[derive(Debug, Clone)]
pub struct SharedPlaybackState(Arc<AtomicU8>);

impl SharedPlaybackState {
    pub fn new(initial: PlaybackState) -> Self {
        Self(Arc::new(AtomicU8::new(encode_state(initial))))
    }

    pub fn get(&self) -> PlaybackState {
        decode_state(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, state: PlaybackState) {
        self.0.store(encode_state(state), Ordering::Release);
    }

    /// Buffering and loading states must not be cut short by the producer.
    pub fn is_filling(&self) -> bool {
        matches!(self.get(), PlaybackState::Buffering | PlaybackState::Loading)
    }
}

impl Default for SharedPlaybackState {
    fn default() -> Self {
        Self::new(PlaybackState::Loading)
    }
}
