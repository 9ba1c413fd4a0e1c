//! # Stream Bridge
//!
//! Push/pull adapter that lets an application-fed byte stream serve as engine
//! input.
//!
//! ## Design
//!
//! ```text
//! ┌──────────────────┐  write / end   ┌──────────────┐  read(pos, len)  ┌────────┐
//! │  StreamProducer  ├───────────────>│ StreamBridge │<─────────────────┤ Engine │
//! │ (host thread)    │<───────────────┤  (monitor)   │   (engine thread)└────────┘
//! └──────────────────┘ need / enough  └──────────────┘
//!                       / seek
//! ```
//!
//! - One `parking_lot::Mutex` guards the buffer, position and flags; one
//!   `Condvar` wakes readers on writes, repositions and end of data.
//! - Producer callbacks run with the lock released, so a producer may write
//!   synchronously from inside `need_data` or `seek_stream`.
//! - A read fails (returns `None`) instead of blocking forever when a wait
//!   cycle brings no new bytes, when end of data is reached, or when another
//!   thread repositions the stream underneath it.

use crate::config::StreamBridgeConfig;
use crate::error::{PlaybackError, Result};
use crate::state::SharedPlaybackState;
use crate::traits::StreamProducer;
use bytes::{Bytes, BytesMut};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

struct BridgeState {
    buffer: BytesMut,
    position: u64,
    size: Option<u64>,
    seekable: bool,
    end_of_data: bool,
    /// Bumped on every reposition so blocked readers notice.
    generation: u64,
    playback: Option<SharedPlaybackState>,
}

/// Thread-safe producer/consumer buffer between a [`StreamProducer`] and the
/// engine.
pub struct StreamBridge {
    config: StreamBridgeConfig,
    producer: Arc<dyn StreamProducer>,
    state: Mutex<BridgeState>,
    data_ready: Condvar,
}

impl StreamBridge {
    /// Creates a bridge with the default configuration and hands the producer
    /// its [`StreamWriter`].
    pub fn new(producer: Arc<dyn StreamProducer>) -> Arc<Self> {
        Self::build(producer, StreamBridgeConfig::default())
    }

    /// Creates a bridge with a validated configuration.
    pub fn with_config(
        producer: Arc<dyn StreamProducer>,
        config: StreamBridgeConfig,
    ) -> Result<Arc<Self>> {
        config.validate().map_err(PlaybackError::InvalidConfig)?;
        Ok(Self::build(producer, config))
    }

    fn build(producer: Arc<dyn StreamProducer>, config: StreamBridgeConfig) -> Arc<Self> {
        let bridge = Arc::new(Self {
            config,
            producer,
            state: Mutex::new(BridgeState {
                buffer: BytesMut::new(),
                position: 0,
                size: None,
                seekable: false,
                end_of_data: false,
                generation: 0,
                playback: None,
            }),
            data_ready: Condvar::new(),
        });
        bridge.producer.connect(StreamWriter {
            bridge: Arc::downgrade(&bridge),
        });
        bridge
    }

    // ========================================================================
    // Producer side
    // ========================================================================

    /// Appends bytes and wakes blocked readers.
    ///
    /// Tells the producer it may pause once enough data is buffered, unless
    /// the controller is buffering or still loading.
    pub fn write(&self, data: &[u8]) {
        if data.is_empty() {
            return;
        }

        let signal_enough = {
            let mut state = self.state.lock();
            state.buffer.extend_from_slice(data);
            self.data_ready.notify_all();
            trace!(len = data.len(), buffered = state.buffer.len(), "stream data written");

            state.buffer.len() >= self.config.enough_data_bytes
                && !state
                    .playback
                    .as_ref()
                    .is_some_and(SharedPlaybackState::is_filling)
        };

        if signal_enough {
            self.producer.enough_data();
        }
    }

    /// Wakes blocked readers so they fail instead of waiting forever.
    pub fn mark_end_of_data(&self) {
        let mut state = self.state.lock();
        state.end_of_data = true;
        self.data_ready.notify_all();
        debug!(position = state.position, "stream end of data");
    }

    pub fn set_size(&self, size: Option<u64>) {
        self.state.lock().size = size;
    }

    pub fn set_seekable(&self, seekable: bool) {
        self.state.lock().seekable = seekable;
    }

    // ========================================================================
    // Consumer side
    // ========================================================================

    /// Reads exactly `length` bytes starting at `position`.
    ///
    /// Returns `None` on a short read: the position cannot be reached on an
    /// unseekable stream, no bytes arrived during a wait, the stream ended, or
    /// it was repositioned by someone else.
    pub fn read(&self, position: u64, length: usize) -> Option<Bytes> {
        let mut state = self.state.lock();

        if state.position != position {
            if !state.seekable {
                debug!(
                    requested = position,
                    current = state.position,
                    "read position mismatch on unseekable stream"
                );
                return None;
            }
            self.reposition(&mut state, position);
            if state.position != position {
                return None;
            }
        }

        let generation = state.generation;
        while state.buffer.len() < length {
            if state.end_of_data {
                trace!(buffered = state.buffer.len(), length, "short read at end of data");
                return None;
            }

            let old_size = state.buffer.len();
            MutexGuard::unlocked(&mut state, || self.producer.need_data());

            if state.generation != generation {
                return None;
            }
            if state.buffer.len() != old_size || state.end_of_data {
                continue;
            }

            match self.config.read_wait_timeout() {
                Some(timeout) => {
                    self.data_ready.wait_for(&mut state, timeout);
                }
                None => self.data_ready.wait(&mut state),
            }

            if state.generation != generation || state.buffer.len() == old_size {
                trace!(length, buffered = state.buffer.len(), "no data arrived, failing read");
                return None;
            }
        }

        let chunk = state.buffer.split_to(length).freeze();
        state.position += length as u64;
        Some(chunk)
    }

    /// Fills `out` from `position`; the boolean form of [`Self::read`].
    pub fn read_into(&self, position: u64, out: &mut [u8]) -> bool {
        match self.read(position, out.len()) {
            Some(chunk) => {
                out.copy_from_slice(&chunk);
                true
            }
            None => false,
        }
    }

    /// Forces the logical position, discards buffered bytes and asks the
    /// producer to seek.
    pub fn set_position(&self, position: u64) {
        let mut state = self.state.lock();
        self.reposition(&mut state, position);
    }

    fn reposition(&self, state: &mut MutexGuard<'_, BridgeState>, position: u64) {
        state.position = position;
        state.buffer.clear();
        state.end_of_data = false;
        state.generation = state.generation.wrapping_add(1);
        self.data_ready.notify_all();
        debug!(position, "stream repositioned");

        MutexGuard::unlocked(state, || self.producer.seek_stream(position));
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn position(&self) -> u64 {
        self.state.lock().position
    }

    pub fn size(&self) -> Option<u64> {
        self.state.lock().size
    }

    pub fn seekable(&self) -> bool {
        self.state.lock().seekable
    }

    pub fn buffered_len(&self) -> usize {
        self.state.lock().buffer.len()
    }

    pub fn is_end_of_data(&self) -> bool {
        self.state.lock().end_of_data
    }

    /// Lets `write` consult the owning controller's state.
    pub fn bind_playback_state(&self, playback: SharedPlaybackState) {
        self.state.lock().playback = Some(playback);
    }
}

impl fmt::Debug for StreamBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("StreamBridge")
            .field("position", &state.position)
            .field("buffered", &state.buffer.len())
            .field("size", &state.size)
            .field("seekable", &state.seekable)
            .field("end_of_data", &state.end_of_data)
            .finish()
    }
}

// ============================================================================
// Producer handle
// ============================================================================

/// Producer-side handle onto a bridge.
///
/// Holds a weak reference, so a producer never keeps its bridge alive. Every
/// method returns `false` once the bridge is gone.
#[derive(Clone)]
pub struct StreamWriter {
    bridge: Weak<StreamBridge>,
}

impl StreamWriter {
    fn with_bridge(&self, f: impl FnOnce(&StreamBridge)) -> bool {
        match self.bridge.upgrade() {
            Some(bridge) => {
                f(&bridge);
                true
            }
            None => false,
        }
    }

    pub fn write(&self, data: &[u8]) -> bool {
        self.with_bridge(|bridge| bridge.write(data))
    }

    pub fn mark_end_of_data(&self) -> bool {
        self.with_bridge(StreamBridge::mark_end_of_data)
    }

    pub fn set_size(&self, size: Option<u64>) -> bool {
        self.with_bridge(|bridge| bridge.set_size(size))
    }

    pub fn set_seekable(&self, seekable: bool) -> bool {
        self.with_bridge(|bridge| bridge.set_seekable(seekable))
    }

    pub fn is_connected(&self) -> bool {
        self.bridge.strong_count() > 0
    }
}

impl fmt::Debug for StreamWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamWriter")
            .field("connected", &self.is_connected())
            .finish()
    }
}
