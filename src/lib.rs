//! Workspace facade crate.
//!
//! Re-exports the workspace crates behind feature flags so host applications
//! can depend on `media-core-workspace` alone. The `playback` feature pulls in
//! the playback controller and the stream bridge; `logging` pulls in only the
//! runtime (event bus and logging bootstrap).

pub use bridge_traits;

#[cfg(any(feature = "playback", feature = "logging"))]
pub use core_runtime;

#[cfg(feature = "playback")]
pub use core_playback;
