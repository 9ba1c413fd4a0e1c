//! # Collaborator Traits
//!
//! Contracts between the playback core and the pieces it does not own: the
//! media engine ([`Pipeline`], created through a [`PipelineFactory`]) and
//! application byte-stream producers ([`StreamProducer`]).
//!
//! ## Threading Model
//!
//! - Commands flow from the controller into the [`Pipeline`] on the
//!   controller's context.
//! - The engine reports back through a [`PipelineEventSender`], which may be
//!   used from any engine thread without blocking.
//! - The one blocking callback, about-to-finish, goes through the
//!   [`AboutToFinishHandle`] in the [`PipelineContext`].
//!
//! ## Implementing an engine
//!
//! ```rust,ignore
//! struct MyFactory;
//!
//! impl PipelineFactory for MyFactory {
//!     fn create_pipeline(&self, context: PipelineContext) -> Result<Box<dyn Pipeline>, BridgeError> {
//!         let engine = MyEngine::spawn(context.events.clone())?;
//!         engine.on_about_to_finish(move || {
//!             context.about_to_finish.about_to_finish();
//!         });
//!         Ok(Box::new(engine))
//!     }
//! }
//! ```

use crate::about_to_finish::AboutToFinishHandle;
use crate::source::MediaSource;
use crate::stream_bridge::StreamWriter;
use bridge_traits::platform::{PlatformSend, PlatformSendSync};
use bridge_traits::playback::{ControllerId, ErrorKind, NativeState, NavigationMenu, TagMap};
use bridge_traits::BridgeError;
use core_async::sync::mpsc;

// ============================================================================
// Engine queries
// ============================================================================

/// Unit used for duration and seek queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryFormat {
    /// Milliseconds.
    Time,
    /// Logical tracks, e.g. audio CD tracks.
    Track,
}

/// Query answer; the engine may answer in a different format than asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormattedValue {
    pub format: QueryFormat,
    pub value: i64,
}

impl FormattedValue {
    pub fn new(format: QueryFormat, value: i64) -> Self {
        Self { format, value }
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// The media engine as seen by the controller.
///
/// Implementations translate these commands into engine calls. None of them
/// may block on the engine reaching a state; results are reported later
/// through [`PipelineEvent`]s.
pub trait Pipeline: PlatformSend {
    /// Loads `source`. With `keep_position` the engine resumes the source at
    /// its previous position instead of starting over.
    fn set_source(&mut self, source: &MediaSource, keep_position: bool);

    /// Requests a native state change.
    fn set_state(&mut self, state: NativeState);

    /// Seeks to `time_ms`. Returns `false` if the engine refused.
    fn seek_to_msec(&mut self, time_ms: i64) -> bool;

    /// Seeks to the start of zero-based `track`.
    fn seek_to_track(&mut self, track: u32) -> bool;

    fn query_duration(&self, format: QueryFormat) -> Option<FormattedValue>;

    /// Current position in milliseconds.
    fn position(&self) -> i64;

    fn is_seekable(&self) -> bool;

    fn video_is_available(&self) -> bool;

    fn meta_data(&self) -> TagMap;

    fn set_meta_data(&mut self, tags: TagMap);

    fn available_menus(&self) -> Vec<NavigationMenu>;

    /// Sends a DVD-style navigation command. Returns `false` when the stream
    /// has no navigation support.
    fn send_navigation_command(&mut self, menu: NavigationMenu) -> bool;

    /// Refreshes title and menu information after loading.
    fn update_navigation(&mut self);

    /// The source the engine is actually playing, which differs from the last
    /// one set after a gapless switch.
    fn current_source(&self) -> MediaSource;
}

/// Events reported by the engine to its controller.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    StateChanged { old: NativeState, new: NativeState },
    EndOfStream,
    DurationChanged { duration_ms: i64 },
    Buffering { percent: u8 },
    Warning { message: String },
    Error { message: String, kind: ErrorKind },
    MetaDataChanged { tags: TagMap },
    AvailableMenusChanged { menus: Vec<NavigationMenu> },
    VideoAvailabilityChanged { available: bool },
    SeekableChanged { seekable: bool },
    /// The engine switched streams, either to the queued next source or back
    /// to the previous one.
    StreamChanged,
    /// Pointer entered or left an interactive video area.
    MouseOverActive { active: bool },
}

/// Non-blocking sender usable from engine threads.
pub type PipelineEventSender = mpsc::UnboundedSender<PipelineEvent>;

/// Receiving end consumed by the controller or its driver.
pub type PipelineEventReceiver = mpsc::UnboundedReceiver<PipelineEvent>;

/// Everything an engine needs to talk back to its controller.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub controller_id: ControllerId,
    pub events: PipelineEventSender,
    pub about_to_finish: AboutToFinishHandle,
}

/// Creates engines for new controllers.
///
/// Returning an error marks the controller as fatally broken, e.g. when the
/// engine installation is missing plugins.
pub trait PipelineFactory: PlatformSendSync {
    fn create_pipeline(&self, context: PipelineContext) -> Result<Box<dyn Pipeline>, BridgeError>;
}

// ============================================================================
// Stream producer
// ============================================================================

/// Application-side source of bytes for a stream-backed media source.
///
/// All callbacks run on engine threads with the bridge unlocked, so a
/// producer may push data synchronously through its [`StreamWriter`].
pub trait StreamProducer: PlatformSendSync {
    /// Receives the writer once the bridge is created.
    fn connect(&self, writer: StreamWriter) {
        let _ = writer;
    }

    /// The bridge wants more bytes.
    fn need_data(&self);

    /// Enough is buffered; the producer may pause.
    fn enough_data(&self) {}

    /// The consumer moved to `position`; continue producing from there.
    fn seek_stream(&self, position: u64) {
        let _ = position;
    }
}
