//! Synchronization primitives.
//!
//! Async-aware channels for the controller driver and the event bus, plus the
//! [`CancellationToken`] that stops a running driver.

pub use tokio::sync::{broadcast, mpsc, oneshot, watch, Mutex, Notify, RwLock};

pub use tokio_util::sync::CancellationToken;
