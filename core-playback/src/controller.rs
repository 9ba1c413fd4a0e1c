//! # Playback Controller
//!
//! Reconciles the engine's native states with the public [`PlaybackState`]
//! model and owns everything around it: current and queued sources, the
//! gapless hand-over, seek bookkeeping, ticks, the prefinish latch, titles and
//! the resume snapshot.
//!
//! ## Execution model
//!
//! The controller is single-threaded. Public commands and [`PipelineEvent`]s
//! must be delivered on one logical context, either by calling
//! [`handle_event`](PlaybackController::handle_event) directly or by running
//! the controller inside a [`ControllerDriver`](crate::driver::ControllerDriver).
//! The only cross-thread paths are the stream bridges and the about-to-finish
//! gate, both of which carry their own locks.
//!
//! ## State translation
//!
//! | Native   | Public   |
//! |----------|----------|
//! | Null     | Loading  |
//! | Ready    | Stopped  |
//! | Paused   | Paused   |
//! | Playing  | Playing  |
//!
//! `Buffering` is derived from engine buffering reports; `Error` is entered by
//! [`set_error`](PlaybackController::set_error) and overrides every native
//! report until a recoverable error is cleared by a new source.

use crate::about_to_finish::{AboutToFinishGate, AboutToFinishHandle};
use crate::config::ControllerConfig;
use crate::error::{PlaybackError, Result};
use crate::graph::{GraphLinks, GraphNode, NodeEvent};
use crate::source::MediaSource;
use crate::state::SharedPlaybackState;
use crate::traits::{
    Pipeline, PipelineContext, PipelineEvent, PipelineEventReceiver, PipelineFactory, QueryFormat,
};
use bridge_traits::playback::{
    ControllerId, ErrorKind, NativeState, NavigationMenu, PlaybackState, TagMap, UNKNOWN_TIME,
};
use core_async::sync::mpsc;
use core_runtime::events::{CoreEvent, EventBus, NavigationEvent, PlaybackEvent, Receiver};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

const UNKNOWN_ERROR: &str = "Unknown error";

/// State and position captured by [`PlaybackController::save_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumeSnapshot {
    pub state: PlaybackState,
    pub position_ms: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deferred {
    ApplyResume,
}

/// The playback state machine.
pub struct PlaybackController {
    id: ControllerId,
    config: ControllerConfig,
    pipeline: Option<Box<dyn Pipeline>>,
    events: EventBus,
    pipeline_events: Option<PipelineEventReceiver>,
    gate: Arc<AboutToFinishGate>,
    graph: GraphLinks,
    shared_state: SharedPlaybackState,

    state: PlaybackState,
    pending_state: PlaybackState,
    /// State interrupted by the transient `Buffering` state.
    buffering_from: Option<PlaybackState>,

    resume: Option<ResumeSnapshot>,
    deferred: VecDeque<Deferred>,

    ticking: bool,
    tick_generation: u64,
    tick_interval_ms: i32,
    last_tick_time: Option<i64>,

    source: MediaSource,
    next_source: MediaSource,
    waiting_for_next_source: bool,
    waiting_for_previous_source: bool,

    prefinish_mark_ms: i64,
    /// Armed while `PrefinishMarkReached` may still fire for this approach.
    prefinish_armed: bool,
    transition_time_ms: i32,
    total_time_ms: i64,

    available_titles: u32,
    current_title: u32,
    pending_title: u32,
    autoplay_titles: bool,

    error: ErrorKind,
    error_string: String,
    shut_down: bool,
}

impl PlaybackController {
    /// Creates a controller and its engine.
    ///
    /// Fails only for an invalid `config`. When the factory cannot create an
    /// engine, the controller is returned latched in a fatal error and every
    /// playback command is a no-op.
    pub fn new(
        factory: &dyn PipelineFactory,
        config: ControllerConfig,
        events: EventBus,
    ) -> Result<Self> {
        config.validate().map_err(PlaybackError::InvalidConfig)?;

        let id = ControllerId::new();
        let gate = AboutToFinishGate::new();
        let (sender, receiver) = mpsc::unbounded_channel();
        let context = PipelineContext {
            controller_id: id,
            events: sender,
            about_to_finish: AboutToFinishHandle::new(
                id,
                Arc::clone(&gate),
                events.clone(),
                config.about_to_finish_timeout(),
            ),
        };

        let mut controller = Self {
            id,
            tick_interval_ms: config.tick_interval_ms,
            prefinish_mark_ms: config.prefinish_mark_ms,
            transition_time_ms: config.transition_time_ms,
            config,
            pipeline: None,
            events,
            pipeline_events: Some(receiver),
            gate,
            graph: GraphLinks::new(),
            shared_state: SharedPlaybackState::new(PlaybackState::Loading),
            state: PlaybackState::Loading,
            pending_state: PlaybackState::Loading,
            buffering_from: None,
            resume: None,
            deferred: VecDeque::new(),
            ticking: false,
            tick_generation: 0,
            last_tick_time: None,
            source: MediaSource::Empty,
            next_source: MediaSource::Empty,
            waiting_for_next_source: false,
            waiting_for_previous_source: false,
            prefinish_armed: true,
            total_time_ms: UNKNOWN_TIME,
            available_titles: 0,
            current_title: 1,
            pending_title: 1,
            autoplay_titles: true,
            error: ErrorKind::NoError,
            error_string: String::new(),
            shut_down: false,
        };

        match factory.create_pipeline(context) {
            Ok(pipeline) => {
                info!(controller_id = %id, "playback controller created");
                controller.pipeline = Some(pipeline);
            }
            Err(e) => {
                controller.set_error(
                    format!("Cannot start playback: {e}. Check the media engine installation."),
                    ErrorKind::Fatal,
                );
            }
        }

        Ok(controller)
    }

    // ========================================================================
    // Transport commands
    // ========================================================================

    pub fn play(&mut self) {
        self.request_state(PlaybackState::Playing);
    }

    pub fn pause(&mut self) {
        self.request_state(PlaybackState::Paused);
    }

    pub fn stop(&mut self) {
        self.request_state(PlaybackState::Stopped);
    }

    /// Asks the engine for the native state backing `state`. The public state
    /// only changes once the engine reports the transition.
    #[instrument(skip(self), fields(controller_id = %self.id))]
    pub fn request_state(&mut self, state: PlaybackState) {
        if !self.is_valid() {
            debug!("ignoring state request on invalid controller");
            return;
        }
        if state != PlaybackState::Error {
            self.pending_state = state;
        }
        if let Some(pipeline) = self.pipeline.as_mut() {
            pipeline.set_state(state.native_target());
        }
    }

    /// Seeks within the current source.
    ///
    /// While a queued next source is already handed to the engine, seeking
    /// means going back into the current source: the engine gets the current
    /// source again with its position kept, then the seek.
    #[instrument(skip(self), fields(controller_id = %self.id))]
    pub fn seek(&mut self, time_ms: i64) {
        if !self.is_valid() {
            return;
        }
        let Some(pipeline) = self.pipeline.as_mut() else {
            return;
        };

        if self.waiting_for_next_source {
            debug!("seeking back within the previous source");
            self.waiting_for_next_source = false;
            self.waiting_for_previous_source = true;
            pipeline.set_source(&self.source, true);

            // The engine no longer holds the queued source.
            let dropped = std::mem::take(&mut self.next_source);
            retire_unless_current(&dropped, &self.source);
            self.gate.withdraw();
        }
        if !pipeline.seek_to_msec(time_ms) {
            debug!(time_ms, "engine refused seek");
        }
        self.last_tick_time = None;
    }

    /// Replaces the current source and starts a fresh session.
    ///
    /// Recovers from a non-fatal error. Releases an engine thread blocked in
    /// the about-to-finish handshake.
    #[instrument(skip(self, source), fields(controller_id = %self.id, source = %source))]
    pub fn set_source(&mut self, source: MediaSource) {
        if !self.is_valid() {
            debug!("ignoring source on invalid controller");
            return;
        }

        if self.state == PlaybackState::Error {
            debug!("clearing recoverable error");
            self.error = ErrorKind::NoError;
            self.error_string.clear();
            self.change_state(PlaybackState::Loading);
        }

        let previous = std::mem::replace(&mut self.source, source);
        let queued = std::mem::take(&mut self.next_source);
        retire_unless_current(&previous, &self.source);
        retire_unless_current(&queued, &self.source);

        self.waiting_for_next_source = false;
        self.waiting_for_previous_source = false;
        self.prefinish_armed = true;
        self.last_tick_time = None;
        self.bind_bridge(&self.source);

        debug!("setting new source");
        if let Some(pipeline) = self.pipeline.as_mut() {
            pipeline.set_source(&self.source, false);
        }
        self.gate.release_all();
    }

    /// Queues `source` to follow the current one without a gap.
    ///
    /// The engine receives it immediately for pre-buffering, and one engine
    /// thread blocked in the about-to-finish handshake is released.
    #[instrument(skip(self, source), fields(controller_id = %self.id, source = %source))]
    pub fn set_next_source(&mut self, source: MediaSource) {
        if !self.is_valid() {
            return;
        }

        debug!("got next source, waiting for end of current");
        self.waiting_for_next_source = true;
        self.waiting_for_previous_source = false;

        let replaced = std::mem::replace(&mut self.next_source, source);
        retire_unless_current(&replaced, &self.next_source);
        self.bind_bridge(&self.next_source);

        if let Some(pipeline) = self.pipeline.as_mut() {
            pipeline.set_source(&self.next_source, false);
        }
        self.gate.supply();
    }

    /// Makes the queued next source current and starts playing it.
    ///
    /// Returns `false` when nothing is queued.
    pub fn begin_play(&mut self) -> bool {
        if self.next_source.is_empty() {
            return false;
        }
        let next = std::mem::take(&mut self.next_source);
        self.set_source(next);
        self.request_state(PlaybackState::Playing);
        true
    }

    // ========================================================================
    // Resume snapshot
    // ========================================================================

    /// Remembers the requested state and live position.
    ///
    /// Only the first call counts until the snapshot is applied, and only a
    /// pending `Playing` or `Paused` is worth saving.
    pub fn save_state(&mut self) {
        if self.resume.is_some() {
            return;
        }
        if matches!(
            self.pending_state,
            PlaybackState::Playing | PlaybackState::Paused
        ) {
            let snapshot = ResumeSnapshot {
                state: self.pending_state,
                position_ms: self.pipeline_position(),
            };
            debug!(controller_id = %self.id, ?snapshot, "saved playback state");
            self.resume = Some(snapshot);
        }
    }

    /// Schedules the saved snapshot to be applied at the next
    /// [`process_deferred`](Self::process_deferred) call.
    pub fn resume_state(&mut self) {
        if self.resume.is_some() {
            self.deferred.push_back(Deferred::ApplyResume);
        }
    }

    /// Runs deferred work queued by earlier commands. Returns how many items
    /// ran.
    pub fn process_deferred(&mut self) -> usize {
        let mut processed = 0;
        while let Some(work) = self.deferred.pop_front() {
            processed += 1;
            match work {
                Deferred::ApplyResume => {
                    if let Some(snapshot) = self.resume.take() {
                        debug!(controller_id = %self.id, ?snapshot, "resuming saved state");
                        self.request_state(snapshot.state);
                        self.seek(snapshot.position_ms);
                    }
                }
            }
        }
        processed
    }

    pub fn has_deferred_work(&self) -> bool {
        !self.deferred.is_empty()
    }

    pub fn resume_snapshot(&self) -> Option<ResumeSnapshot> {
        self.resume
    }

    // ========================================================================
    // Time
    // ========================================================================

    /// Position in milliseconds as seen by the host.
    ///
    /// A pending resume snapshot wins over the live position; stopped and
    /// loading report 0, error reports [`UNKNOWN_TIME`].
    pub fn current_time(&self) -> i64 {
        if let Some(snapshot) = self.resume {
            return snapshot.position_ms;
        }
        match self.state {
            state if state.has_position() => self.pipeline_position(),
            PlaybackState::Error => UNKNOWN_TIME,
            _ => 0,
        }
    }

    pub fn total_time(&self) -> i64 {
        self.total_time_ms
    }

    pub fn remaining_time(&self) -> i64 {
        self.total_time().saturating_sub(self.current_time())
    }

    pub fn last_tick_time(&self) -> Option<i64> {
        self.last_tick_time
    }

    pub fn tick_interval(&self) -> i32 {
        self.tick_interval_ms
    }

    /// Values `<= 0` tick at the configured minimum interval.
    pub fn set_tick_interval(&mut self, interval_ms: i32) {
        self.tick_interval_ms = interval_ms;
        self.tick_generation = self.tick_generation.wrapping_add(1);
    }

    /// The timer the driver should run: a generation that changes whenever
    /// the timer must be restarted, and the effective period. `None` while
    /// not playing.
    pub fn tick_schedule(&self) -> Option<(u64, Duration)> {
        self.ticking.then(|| {
            (
                self.tick_generation,
                self.config.effective_tick_interval(self.tick_interval_ms),
            )
        })
    }

    pub fn prefinish_mark(&self) -> i64 {
        self.prefinish_mark_ms
    }

    /// Updates the mark and re-arms the latch when the new trigger point is
    /// still ahead of the current position. Negative marks count as 0.
    pub fn set_prefinish_mark(&mut self, mark_ms: i64) {
        let mark_ms = mark_ms.max(0);
        self.prefinish_mark_ms = mark_ms;
        if self.current_time() < self.total_time().saturating_sub(mark_ms) {
            self.prefinish_armed = true;
        }
    }

    pub fn transition_time(&self) -> i32 {
        self.transition_time_ms
    }

    pub fn set_transition_time(&mut self, time_ms: i32) {
        self.transition_time_ms = time_ms;
    }

    /// Timer callback: reports the position and checks the prefinish mark.
    pub fn on_tick(&mut self) {
        if self.resume.is_some() {
            return;
        }
        let Some(pipeline) = self.pipeline.as_ref() else {
            return;
        };

        let position = pipeline.position();
        self.last_tick_time = Some(position);
        self.emit(PlaybackEvent::Tick { time_ms: position });

        if self.state != PlaybackState::Playing
            || self.prefinish_mark_ms <= 0
            || self.total_time_ms < 0
        {
            return;
        }

        let trigger = self.total_time_ms.saturating_sub(self.prefinish_mark_ms);
        if position >= trigger {
            if self.prefinish_armed {
                self.prefinish_armed = false;
                let remaining_ms = self.total_time_ms - position;
                debug!(controller_id = %self.id, remaining_ms, "prefinish mark reached");
                self.emit(PlaybackEvent::PrefinishMarkReached { remaining_ms });
            }
        } else {
            self.prefinish_armed = true;
        }
    }

    // ========================================================================
    // Titles and navigation
    // ========================================================================

    pub fn available_titles(&self) -> u32 {
        self.available_titles
    }

    pub fn current_title(&self) -> u32 {
        self.current_title
    }

    pub fn autoplay_titles(&self) -> bool {
        self.autoplay_titles
    }

    pub fn set_autoplay_titles(&mut self, autoplay: bool) {
        self.autoplay_titles = autoplay;
    }

    /// Switches to `title` (one-based).
    ///
    /// Applied at once while playing or stopped; otherwise the controller is
    /// stopped and the title applied on arrival in `Stopped`.
    #[instrument(skip(self), fields(controller_id = %self.id))]
    pub fn set_current_title(&mut self, title: u32) -> Result<()> {
        if !self.is_valid() {
            return Err(PlaybackError::ControllerInvalid);
        }
        if title == 0 || (self.available_titles > 0 && title > self.available_titles) {
            return Err(PlaybackError::InvalidTitle {
                title,
                available: self.available_titles,
            });
        }
        if title == self.current_title || title == self.pending_title {
            return Ok(());
        }

        self.pending_title = title;
        if matches!(self.state, PlaybackState::Playing | PlaybackState::Stopped) {
            self.set_track(title);
        } else {
            self.request_state(PlaybackState::Stopped);
        }
        Ok(())
    }

    /// Seeks to the start of `title`. Only valid while playing or stopped and
    /// for a title the current source has.
    pub fn set_track(&mut self, title: u32) -> bool {
        if !matches!(self.state, PlaybackState::Playing | PlaybackState::Stopped)
            || title < 1
            || title > self.available_titles
        {
            return false;
        }
        let Some(pipeline) = self.pipeline.as_mut() else {
            return false;
        };

        info!(controller_id = %self.id, title, "set track");
        if !pipeline.seek_to_track(title - 1) {
            return false;
        }
        self.current_title = title;
        self.pending_title = title;
        self.emit_navigation(NavigationEvent::TitleChanged { title });
        self.emit(PlaybackEvent::TotalTimeChanged {
            total_ms: self.total_time_ms,
        });
        true
    }

    pub fn available_menus(&self) -> Vec<NavigationMenu> {
        self.pipeline
            .as_ref()
            .map(|p| p.available_menus())
            .unwrap_or_default()
    }

    pub fn jump_to_menu(&mut self, menu: NavigationMenu) -> bool {
        match self.pipeline.as_mut() {
            Some(pipeline) => pipeline.send_navigation_command(menu),
            None => false,
        }
    }

    // ========================================================================
    // Engine queries
    // ========================================================================

    pub fn meta_data(&self) -> TagMap {
        self.pipeline
            .as_ref()
            .map(|p| p.meta_data())
            .unwrap_or_default()
    }

    pub fn set_meta_data(&mut self, tags: TagMap) {
        if let Some(pipeline) = self.pipeline.as_mut() {
            pipeline.set_meta_data(tags);
        }
    }

    pub fn has_video(&self) -> bool {
        self.pipeline
            .as_ref()
            .is_some_and(|p| p.video_is_available())
    }

    pub fn is_seekable(&self) -> bool {
        self.pipeline.as_ref().is_some_and(|p| p.is_seekable())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn id(&self) -> ControllerId {
        self.id
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn pending_state(&self) -> PlaybackState {
        self.pending_state
    }

    /// A controller is valid while it has an engine and no fatal error.
    pub fn is_valid(&self) -> bool {
        self.pipeline.is_some() && self.error != ErrorKind::Fatal && !self.shut_down
    }

    pub fn source(&self) -> &MediaSource {
        &self.source
    }

    pub fn next_source(&self) -> &MediaSource {
        &self.next_source
    }

    pub fn waiting_for_next_source(&self) -> bool {
        self.waiting_for_next_source
    }

    pub fn waiting_for_previous_source(&self) -> bool {
        self.waiting_for_previous_source
    }

    pub fn error_string(&self) -> &str {
        &self.error_string
    }

    pub fn error_kind(&self) -> ErrorKind {
        self.error
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.events.subscribe()
    }

    /// Shared view of the public state, readable from any thread.
    pub fn shared_state(&self) -> SharedPlaybackState {
        self.shared_state.clone()
    }

    pub fn attach_node(&mut self, node: Arc<dyn GraphNode>) {
        self.graph.attach(node);
    }

    pub fn is_graph_linked(&self) -> bool {
        self.graph.is_linked()
    }

    /// Hands the engine event receiver to a driver. Returns `None` after the
    /// first call.
    pub fn take_pipeline_events(&mut self) -> Option<PipelineEventReceiver> {
        self.pipeline_events.take()
    }

    /// Handles every engine event already queued, without waiting. Returns
    /// how many were handled.
    pub fn pump_pipeline_events(&mut self) -> usize {
        let Some(mut receiver) = self.pipeline_events.take() else {
            return 0;
        };
        let mut handled = 0;
        while let Ok(event) = receiver.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        self.pipeline_events = Some(receiver);
        handled
    }

    // ========================================================================
    // Engine events
    // ========================================================================

    /// Applies one engine event.
    pub fn handle_event(&mut self, event: PipelineEvent) {
        match event {
            PipelineEvent::StateChanged { old, new } => self.handle_state_change(old, new),
            PipelineEvent::EndOfStream => self.handle_end_of_stream(),
            PipelineEvent::DurationChanged { duration_ms } => {
                self.total_time_ms = duration_ms;
                self.emit(PlaybackEvent::TotalTimeChanged {
                    total_ms: duration_ms,
                });
            }
            PipelineEvent::Buffering { percent } => self.handle_buffering(percent),
            PipelineEvent::Warning { message } => {
                warn!(controller_id = %self.id, "{}", message);
                self.emit(PlaybackEvent::Warning { message });
            }
            PipelineEvent::Error { message, kind } => self.set_error(message, kind),
            PipelineEvent::MetaDataChanged { tags } => {
                self.emit(PlaybackEvent::MetaDataChanged { tags });
            }
            PipelineEvent::AvailableMenusChanged { menus } => {
                self.emit_navigation(NavigationEvent::AvailableMenusChanged { menus });
            }
            PipelineEvent::VideoAvailabilityChanged { available } => {
                self.emit(PlaybackEvent::HasVideoChanged {
                    has_video: available,
                });
            }
            PipelineEvent::SeekableChanged { seekable } => {
                self.emit(PlaybackEvent::SeekableChanged { seekable });
            }
            PipelineEvent::StreamChanged => self.handle_stream_change(),
            PipelineEvent::MouseOverActive { active } => {
                self.graph.notify(NodeEvent::VideoMouseOver(active));
            }
        }
    }

    /// Latches an error and moves to `Error`.
    ///
    /// An empty message becomes "Unknown error" and `NoError` becomes
    /// `Normal`, so the error state always carries both.
    pub fn set_error(&mut self, message: impl Into<String>, kind: ErrorKind) {
        let mut message = message.into();
        if message.is_empty() {
            message = UNKNOWN_ERROR.to_string();
        }
        let kind = match kind {
            ErrorKind::NoError => ErrorKind::Normal,
            other => other,
        };

        error!(controller_id = %self.id, ?kind, "{}", message);
        self.error = kind;
        self.error_string = message.clone();
        self.emit(PlaybackEvent::Error { message, kind });

        if let Some(pipeline) = self.pipeline.as_mut() {
            pipeline.set_state(NativeState::Null);
        }
        self.change_state(PlaybackState::Error);
    }

    fn handle_state_change(&mut self, old: NativeState, new: NativeState) {
        debug!(controller_id = %self.id, ?old, ?new, "native state changed");
        if self.state == PlaybackState::Error {
            debug!(controller_id = %self.id, "error latched, ignoring native transition");
            return;
        }
        self.buffering_from = None;

        if old == NativeState::Null && new == NativeState::Ready {
            self.loading_complete();
        }
        if new == NativeState::Ready {
            self.emit(PlaybackEvent::Tick { time_ms: 0 });
        }
        self.change_state(PlaybackState::from(new));
    }

    fn loading_complete(&mut self) {
        self.get_stream_info();
        if self.has_video() {
            self.graph.notify(NodeEvent::VideoAvailable);
        }
        self.graph.link();
    }

    fn get_stream_info(&mut self) {
        let Some(pipeline) = self.pipeline.as_mut() else {
            return;
        };
        pipeline.update_navigation();

        if !self.source.is_cd() {
            return;
        }
        // The engine may answer in time units when track info is missing.
        let Some(answer) = pipeline.query_duration(QueryFormat::Track) else {
            return;
        };
        if answer.format != QueryFormat::Track {
            return;
        }
        let count = u32::try_from(answer.value).unwrap_or(0);
        if count != self.available_titles {
            self.available_titles = count;
            info!(controller_id = %self.id, count, "available titles changed");
            self.emit_navigation(NavigationEvent::AvailableTitlesChanged { count });
        }
    }

    fn handle_end_of_stream(&mut self) {
        debug!(controller_id = %self.id, "end of stream");
        self.emit(PlaybackEvent::Finished);
        if let Some(pipeline) = self.pipeline.as_mut() {
            pipeline.set_state(NativeState::Ready);
        }
    }

    fn handle_buffering(&mut self, percent: u8) {
        let percent = percent.min(100);
        debug!(controller_id = %self.id, percent, "stream buffering");
        self.emit(PlaybackEvent::BufferStatus { percent });

        match self.state {
            PlaybackState::Playing | PlaybackState::Paused if percent < 100 => {
                self.buffering_from = Some(self.state);
                self.change_state(PlaybackState::Buffering);
            }
            PlaybackState::Buffering if percent == 100 => {
                if let Some(previous) = self.buffering_from.take() {
                    self.change_state(previous);
                }
            }
            _ => {}
        }
    }

    fn handle_stream_change(&mut self) {
        if self.waiting_for_previous_source {
            self.waiting_for_previous_source = false;
            return;
        }
        let Some(pipeline) = self.pipeline.as_ref() else {
            return;
        };

        let current = pipeline.current_source();
        let previous = std::mem::replace(&mut self.source, current);
        retire_unless_current(&previous, &self.source);
        if self.next_source == self.source {
            self.next_source = MediaSource::Empty;
        }
        self.gate.withdraw();
        self.waiting_for_next_source = false;
        self.prefinish_armed = true;

        let description = self.source.describe();
        debug!(controller_id = %self.id, source = %description, "current source changed");
        self.emit(PlaybackEvent::CurrentSourceChanged {
            source: description,
        });
    }

    fn change_state(&mut self, new_state: PlaybackState) {
        let old_state = self.state;
        if new_state == old_state {
            return;
        }
        self.state = new_state;
        self.shared_state.set(new_state);

        let ticking = new_state == PlaybackState::Playing;
        if ticking && !self.ticking {
            self.tick_generation = self.tick_generation.wrapping_add(1);
        }
        self.ticking = ticking;

        debug!(controller_id = %self.id, %old_state, %new_state, "state changed");
        self.emit(PlaybackEvent::StateChanged {
            new_state,
            old_state,
        });
        self.graph.notify(NodeEvent::StateChanged(new_state));

        if new_state == PlaybackState::Stopped && self.pending_title != self.current_title {
            let title = self.pending_title;
            self.set_track(title);
        }
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Releases every blocked engine thread and ends all stream bridges.
    /// Idempotent; also runs on drop.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.gate.close();
        for source in [&self.source, &self.next_source] {
            if let Some(bridge) = source.stream_bridge() {
                bridge.mark_end_of_data();
            }
        }
        self.ticking = false;
        debug!(controller_id = %self.id, "playback controller shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn pipeline_position(&self) -> i64 {
        self.pipeline.as_ref().map(|p| p.position()).unwrap_or(0)
    }

    fn bind_bridge(&self, source: &MediaSource) {
        if let Some(bridge) = source.stream_bridge() {
            bridge.bind_playback_state(self.shared_state.clone());
        }
    }

    fn emit(&self, event: PlaybackEvent) {
        self.events.emit(CoreEvent::Playback(event)).ok();
    }

    fn emit_navigation(&self, event: NavigationEvent) {
        self.events.emit(CoreEvent::Navigation(event)).ok();
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for PlaybackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackController")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("pending_state", &self.pending_state)
            .field("source", &self.source)
            .field("next_source", &self.next_source)
            .field("error", &self.error)
            .field("graph", &self.graph)
            .finish_non_exhaustive()
    }
}

/// Ends the bridge of a source that is no longer current or queued.
fn retire_unless_current(old: &MediaSource, current: &MediaSource) {
    if old == current {
        return;
    }
    if let Some(bridge) = old.stream_bridge() {
        bridge.mark_end_of_data();
    }
}
