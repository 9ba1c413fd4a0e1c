//! Async runtime seam for the media core.
//!
//! The playback driver, the event bus and the tests reach the executor only
//! through this crate. Everything is backed by Tokio; keeping the imports in
//! one place means the rest of the workspace never names `tokio::` directly
//! outside of test attributes.
//!
//! # Modules
//!
//! - `task`: task spawning
//! - `time`: intervals, sleeps and timeouts used for tick scheduling
//! - `sync`: channels and the cancellation token used by the driver
//! - `runtime`: blocking entry point for hosts without an executor
//!
//! # Examples
//!
//! ```rust
//! use core_async::time::{sleep, Duration};
//!
//! # core_async::runtime::block_on(async {
//! let handle = core_async::spawn(async {
//!     sleep(Duration::from_millis(1)).await;
//!     42
//! });
//! assert_eq!(handle.await.unwrap(), 42);
//! # });
//! ```

pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

pub use task::spawn;
pub use time::{sleep, Duration, Instant};

/// Multiplexes the driver's command, engine-event and tick sources.
pub use tokio::select;
