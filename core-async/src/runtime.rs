//! Runtime utilities for hosts that do not run their own executor.

pub use tokio::runtime::{Builder, Handle, Runtime};

/// Builds a multi-threaded runtime suitable for hosting controller drivers.
pub fn build_runtime() -> std::io::Result<Runtime> {
    Builder::new_multi_thread()
        .thread_name("media-core")
        .enable_all()
        .build()
}

/// Runs the provided future to completion on a fresh current-thread runtime.
///
/// # Panics
///
/// Panics when the runtime cannot be created, which only happens when the
/// process is out of file descriptors or threads.
pub fn block_on<F>(future: F) -> F::Output
where
    F: std::future::Future,
{
    match Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime.block_on(future),
        Err(err) => panic!("core_async::runtime::block_on: failed to build runtime: {err}"),
    }
}
