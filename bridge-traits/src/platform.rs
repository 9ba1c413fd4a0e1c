//! Helper abstractions used to keep trait bounds aligned with the threading
//! guarantees of the host.
//!
//! Engine callbacks and stream producers are invoked from threads the core does
//! not own, so every bridge implementation must be shareable across threads.
//! The marker traits below keep those bounds in one place instead of repeating
//! `Send + Sync` on every trait definition.

/// Marker trait that applies `Send + Sync`.
pub trait PlatformSendSync: Send + Sync {}

impl<T> PlatformSendSync for T where T: Send + Sync {}

/// Marker trait equivalent to `Send`.
pub trait PlatformSend: Send {}

impl<T> PlatformSend for T where T: Send {}
