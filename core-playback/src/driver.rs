//! # Controller Driver
//!
//! Runs a [`PlaybackController`] on one async task so that public commands,
//! engine events, tick timer expirations and deferred work are serialized on a
//! single context.
//!
//! ```rust,ignore
//! let controller = PlaybackController::new(&factory, config, bus)?;
//! let cancel = CancellationToken::new();
//! let (handle, task) = ControllerDriver::spawn(controller, cancel.clone());
//!
//! handle.set_source(MediaSource::Url(url))?;
//! handle.play()?;
//!
//! cancel.cancel();
//! let controller = task.await?;
//! ```

use crate::controller::PlaybackController;
use crate::error::{PlaybackError, Result};
use crate::source::MediaSource;
use crate::traits::{PipelineEvent, PipelineEventReceiver};
use bridge_traits::playback::{ErrorKind, NavigationMenu, PlaybackState, TagMap};
use core_async::sync::{mpsc, oneshot, CancellationToken};
use core_async::task::JoinHandle;
use core_async::time::{tick_interval, Interval};
use tracing::{debug, warn};

/// Commands accepted by a running driver.
#[derive(Debug)]
pub enum ControllerCommand {
    Play,
    Pause,
    Stop,
    Seek(i64),
    SetSource(MediaSource),
    SetNextSource(MediaSource),
    BeginPlay,
    SaveState,
    ResumeState,
    SetTickInterval(i32),
    SetPrefinishMark(i64),
    SetTransitionTime(i32),
    SetCurrentTitle(u32),
    JumpToMenu(NavigationMenu),
    SetMetaData(TagMap),
    Status(oneshot::Sender<ControllerStatus>),
}

/// Snapshot of the controller as seen by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerStatus {
    pub state: PlaybackState,
    pub current_time_ms: i64,
    pub total_time_ms: i64,
    pub remaining_time_ms: i64,
    pub waiting_for_next_source: bool,
    pub error_string: String,
    pub error_kind: ErrorKind,
}

impl ControllerStatus {
    fn capture(controller: &PlaybackController) -> Self {
        Self {
            state: controller.state(),
            current_time_ms: controller.current_time(),
            total_time_ms: controller.total_time(),
            remaining_time_ms: controller.remaining_time(),
            waiting_for_next_source: controller.waiting_for_next_source(),
            error_string: controller.error_string().to_string(),
            error_kind: controller.error_kind(),
        }
    }
}

/// Cloneable sender side of a driver.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    commands: mpsc::UnboundedSender<ControllerCommand>,
}

impl ControllerHandle {
    pub fn send(&self, command: ControllerCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| PlaybackError::DriverStopped)
    }

    pub fn play(&self) -> Result<()> {
        self.send(ControllerCommand::Play)
    }

    pub fn pause(&self) -> Result<()> {
        self.send(ControllerCommand::Pause)
    }

    pub fn stop(&self) -> Result<()> {
        self.send(ControllerCommand::Stop)
    }

    pub fn seek(&self, time_ms: i64) -> Result<()> {
        self.send(ControllerCommand::Seek(time_ms))
    }

    pub fn set_source(&self, source: MediaSource) -> Result<()> {
        self.send(ControllerCommand::SetSource(source))
    }

    pub fn set_next_source(&self, source: MediaSource) -> Result<()> {
        self.send(ControllerCommand::SetNextSource(source))
    }

    pub fn begin_play(&self) -> Result<()> {
        self.send(ControllerCommand::BeginPlay)
    }

    pub fn save_state(&self) -> Result<()> {
        self.send(ControllerCommand::SaveState)
    }

    pub fn resume_state(&self) -> Result<()> {
        self.send(ControllerCommand::ResumeState)
    }

    pub fn set_tick_interval(&self, interval_ms: i32) -> Result<()> {
        self.send(ControllerCommand::SetTickInterval(interval_ms))
    }

    pub fn set_prefinish_mark(&self, mark_ms: i64) -> Result<()> {
        self.send(ControllerCommand::SetPrefinishMark(mark_ms))
    }

    pub fn set_transition_time(&self, time_ms: i32) -> Result<()> {
        self.send(ControllerCommand::SetTransitionTime(time_ms))
    }

    pub fn set_current_title(&self, title: u32) -> Result<()> {
        self.send(ControllerCommand::SetCurrentTitle(title))
    }

    pub fn jump_to_menu(&self, menu: NavigationMenu) -> Result<()> {
        self.send(ControllerCommand::JumpToMenu(menu))
    }

    pub fn set_meta_data(&self, tags: TagMap) -> Result<()> {
        self.send(ControllerCommand::SetMetaData(tags))
    }

    /// Asks the driver for a status snapshot, taken after every command sent
    /// before it has been applied.
    pub async fn status(&self) -> Result<ControllerStatus> {
        let (reply, response) = oneshot::channel();
        self.send(ControllerCommand::Status(reply))?;
        response.await.map_err(|_| PlaybackError::DriverStopped)
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

/// Owns a controller while it runs on a task.
pub struct ControllerDriver {
    controller: PlaybackController,
    commands: mpsc::UnboundedReceiver<ControllerCommand>,
    engine_events: Option<PipelineEventReceiver>,
}

impl ControllerDriver {
    pub fn new(mut controller: PlaybackController) -> (Self, ControllerHandle) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let engine_events = controller.take_pipeline_events();
        let driver = Self {
            controller,
            commands: receiver,
            engine_events,
        };
        (driver, ControllerHandle { commands: sender })
    }

    /// Spawns the driver on the current runtime.
    pub fn spawn(
        controller: PlaybackController,
        cancel: CancellationToken,
    ) -> (ControllerHandle, JoinHandle<PlaybackController>) {
        let (driver, handle) = Self::new(controller);
        let task = core_async::spawn(driver.run(cancel));
        (handle, task)
    }

    /// Runs until cancelled or until every handle is dropped, then shuts the
    /// controller down and hands it back.
    ///
    /// Engine events already queued are applied before the next command.
    pub async fn run(mut self, cancel: CancellationToken) -> PlaybackController {
        let controller_id = self.controller.id();
        debug!(%controller_id, "controller driver started");

        let mut ticker: Option<(u64, Interval)> = None;
        let mut engine_closed = self.engine_events.is_none();

        loop {
            self.controller.process_deferred();
            sync_ticker(&self.controller, &mut ticker);

            core_async::select! {
                biased;

                _ = cancel.cancelled() => {
                    debug!(%controller_id, "controller driver cancelled");
                    break;
                }
                event = next_engine_event(&mut self.engine_events), if !engine_closed => match event {
                    Some(event) => self.controller.handle_event(event),
                    None => {
                        debug!(%controller_id, "engine event channel closed");
                        engine_closed = true;
                    }
                },
                command = self.commands.recv() => match command {
                    Some(command) => apply_command(&mut self.controller, command),
                    None => {
                        debug!(%controller_id, "all controller handles dropped");
                        break;
                    }
                },
                _ = next_tick(&mut ticker) => self.controller.on_tick(),
            }
        }

        self.controller.shutdown();
        self.controller
    }
}

fn apply_command(controller: &mut PlaybackController, command: ControllerCommand) {
    match command {
        ControllerCommand::Play => controller.play(),
        ControllerCommand::Pause => controller.pause(),
        ControllerCommand::Stop => controller.stop(),
        ControllerCommand::Seek(time_ms) => controller.seek(time_ms),
        ControllerCommand::SetSource(source) => controller.set_source(source),
        ControllerCommand::SetNextSource(source) => controller.set_next_source(source),
        ControllerCommand::BeginPlay => {
            controller.begin_play();
        }
        ControllerCommand::SaveState => controller.save_state(),
        ControllerCommand::ResumeState => controller.resume_state(),
        ControllerCommand::SetTickInterval(interval_ms) => {
            controller.set_tick_interval(interval_ms)
        }
        ControllerCommand::SetPrefinishMark(mark_ms) => controller.set_prefinish_mark(mark_ms),
        ControllerCommand::SetTransitionTime(time_ms) => controller.set_transition_time(time_ms),
        ControllerCommand::SetCurrentTitle(title) => {
            if let Err(e) = controller.set_current_title(title) {
                warn!(controller_id = %controller.id(), error = %e, "title change rejected");
            }
        }
        ControllerCommand::JumpToMenu(menu) => {
            if !controller.jump_to_menu(menu) {
                debug!(controller_id = %controller.id(), ?menu, "menu navigation unsupported");
            }
        }
        ControllerCommand::SetMetaData(tags) => controller.set_meta_data(tags),
        ControllerCommand::Status(reply) => {
            reply.send(ControllerStatus::capture(controller)).ok();
        }
    }
}

/// Restarts the timer when the controller's schedule changed.
fn sync_ticker(controller: &PlaybackController, ticker: &mut Option<(u64, Interval)>) {
    match controller.tick_schedule() {
        Some((generation, period)) => {
            if ticker.as_ref().map(|(current, _)| *current) != Some(generation) {
                *ticker = Some((generation, tick_interval(period)));
            }
        }
        None => *ticker = None,
    }
}

async fn next_tick(ticker: &mut Option<(u64, Interval)>) {
    match ticker {
        Some((_, interval)) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

async fn next_engine_event(events: &mut Option<PipelineEventReceiver>) -> Option<PipelineEvent> {
    match events {
        Some(receiver) => receiver.recv().await,
        None => None,
    }
}
