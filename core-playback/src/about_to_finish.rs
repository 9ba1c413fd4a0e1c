//! # About-to-finish handshake
//!
//! The engine calls [`AboutToFinishHandle::about_to_finish`] on its own thread
//! when the current source is nearly drained. The call announces
//! `AboutToFinish` on the event bus and blocks until the controller supplies a
//! next source, replaces the source outright, shuts down, or the configured
//! timeout elapses.

use bridge_traits::ControllerId;
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How a blocked about-to-finish call was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeOutcome {
    /// A next source was queued; the engine can continue gaplessly.
    NextSourceSupplied,
    /// The source was replaced with `set_source`; no gapless continuation.
    Released,
    /// Nobody answered in time.
    TimedOut,
    /// The controller is shutting down.
    Closed,
}

#[derive(Debug, Default)]
struct GateState {
    /// Next-source supplies not yet consumed by a waiter.
    tokens: usize,
    waiters: usize,
    epoch: u64,
    closed: bool,
}

/// Controller side of the handshake.
#[derive(Debug, Default)]
pub struct AboutToFinishGate {
    state: Mutex<GateState>,
    released: Condvar,
}

impl AboutToFinishGate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A next source was queued: release one waiter.
    ///
    /// With no waiter the supply is kept, so an engine asking later does not
    /// block for a source it already has.
    pub fn supply(&self) {
        let mut state = self.state.lock();
        state.tokens = if state.waiters > 0 {
            (state.tokens + 1).min(state.waiters)
        } else {
            1
        };
        self.released.notify_one();
    }

    /// The queued next source was dropped by the engine: forget a supply no
    /// waiter has taken yet. Blocked waiters keep waiting.
    pub fn withdraw(&self) {
        self.state.lock().tokens = 0;
    }

    /// The source was replaced: release every waiter and drop pending supplies.
    pub fn release_all(&self) {
        let mut state = self.state.lock();
        state.tokens = 0;
        state.epoch = state.epoch.wrapping_add(1);
        self.released.notify_all();
    }

    /// Releases every waiter now and makes future waits return immediately.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.released.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn waiters(&self) -> usize {
        self.state.lock().waiters
    }

    fn wait(&self, deadline: Option<Instant>, announce: impl FnOnce()) -> HandshakeOutcome {
        let mut state = self.state.lock();
        if state.closed {
            return HandshakeOutcome::Closed;
        }

        state.waiters += 1;
        let epoch = state.epoch;

        // Announce while registered so an immediate answer is not lost.
        parking_lot::MutexGuard::unlocked(&mut state, announce);

        let outcome = loop {
            if state.closed {
                break HandshakeOutcome::Closed;
            }
            if state.tokens > 0 {
                state.tokens -= 1;
                break HandshakeOutcome::NextSourceSupplied;
            }
            if state.epoch != epoch {
                break HandshakeOutcome::Released;
            }
            let Some(deadline) = deadline else {
                self.released.wait(&mut state);
                continue;
            };
            if self.released.wait_until(&mut state, deadline).timed_out() {
                // Re-check once: a supply may have raced the deadline.
                if state.tokens > 0 {
                    state.tokens -= 1;
                    break HandshakeOutcome::NextSourceSupplied;
                }
                break if state.closed {
                    HandshakeOutcome::Closed
                } else if state.epoch != epoch {
                    HandshakeOutcome::Released
                } else {
                    HandshakeOutcome::TimedOut
                };
            }
        };

        state.waiters -= 1;
        outcome
    }
}

/// Engine side of the handshake, handed out through the pipeline context.
#[derive(Debug, Clone)]
pub struct AboutToFinishHandle {
    controller_id: ControllerId,
    gate: Arc<AboutToFinishGate>,
    events: EventBus,
    timeout: Duration,
}

impl AboutToFinishHandle {
    pub fn new(
        controller_id: ControllerId,
        gate: Arc<AboutToFinishGate>,
        events: EventBus,
        timeout: Duration,
    ) -> Self {
        Self {
            controller_id,
            gate,
            events,
            timeout,
        }
    }

    /// Announces `AboutToFinish` and blocks the calling engine thread until
    /// the handshake resolves.
    pub fn about_to_finish(&self) -> HandshakeOutcome {
        debug!(controller_id = %self.controller_id, "about to finish");
        // A timeout past the end of the clock means no deadline.
        let deadline = Instant::now().checked_add(self.timeout);
        let events = &self.events;

        let outcome = self.gate.wait(deadline, || {
            events
                .emit(CoreEvent::Playback(PlaybackEvent::AboutToFinish))
                .ok();
        });

        match outcome {
            HandshakeOutcome::TimedOut => warn!(
                controller_id = %self.controller_id,
                timeout_ms = self.timeout.as_millis() as u64,
                "no next source supplied before timeout"
            ),
            other => debug!(controller_id = %self.controller_id, outcome = ?other, "about-to-finish released"),
        }
        outcome
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
