//! Async driver tests
//!
//! Time is paused, so tick assertions are exact.

use bridge_traits::playback::{NativeState, NavigationMenu, PlaybackState, TagMap};
use bridge_traits::BridgeError;
use core_async::sync::CancellationToken;
use core_async::time::{sleep, Duration};
use core_playback::{
    ControllerConfig, ControllerDriver, FormattedValue, MediaSource, Pipeline, PipelineContext,
    PipelineEvent, PipelineFactory, PlaybackController, PlaybackError, QueryFormat,
};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent, Receiver};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Engine {
    position: i64,
    states: Vec<NativeState>,
    seeks: Vec<i64>,
}

struct SharedEngine(Arc<Mutex<Engine>>);

impl Pipeline for SharedEngine {
    fn set_source(&mut self, _source: &MediaSource, _keep_position: bool) {}

    fn set_state(&mut self, state: NativeState) {
        self.0.lock().unwrap().states.push(state);
    }

    fn seek_to_msec(&mut self, time_ms: i64) -> bool {
        self.0.lock().unwrap().seeks.push(time_ms);
        true
    }

    fn seek_to_track(&mut self, _track: u32) -> bool {
        false
    }

    fn query_duration(&self, _format: QueryFormat) -> Option<FormattedValue> {
        None
    }

    fn position(&self) -> i64 {
        self.0.lock().unwrap().position
    }

    fn is_seekable(&self) -> bool {
        true
    }

    fn video_is_available(&self) -> bool {
        false
    }

    fn meta_data(&self) -> TagMap {
        TagMap::new()
    }

    fn set_meta_data(&mut self, _tags: TagMap) {}

    fn available_menus(&self) -> Vec<NavigationMenu> {
        Vec::new()
    }

    fn send_navigation_command(&mut self, _menu: NavigationMenu) -> bool {
        false
    }

    fn update_navigation(&mut self) {}

    fn current_source(&self) -> MediaSource {
        MediaSource::Empty
    }
}

#[derive(Default)]
struct Factory {
    engine: Arc<Mutex<Engine>>,
    context: Mutex<Option<PipelineContext>>,
}

impl PipelineFactory for Factory {
    fn create_pipeline(&self, context: PipelineContext) -> Result<Box<dyn Pipeline>, BridgeError> {
        *self.context.lock().unwrap() = Some(context);
        Ok(Box::new(SharedEngine(Arc::clone(&self.engine))))
    }
}

struct Setup {
    controller: PlaybackController,
    engine: Arc<Mutex<Engine>>,
    context: PipelineContext,
    events: Receiver<CoreEvent>,
}

fn setup(config: ControllerConfig) -> Setup {
    let factory = Factory::default();
    let bus = EventBus::new(512);
    let events = bus.subscribe();
    let controller = PlaybackController::new(&factory, config, bus).unwrap();
    let context = factory.context.lock().unwrap().take().unwrap();
    Setup {
        controller,
        engine: factory.engine,
        context,
        events,
    }
}

fn ticks(events: &mut Receiver<CoreEvent>) -> Vec<i64> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let CoreEvent::Playback(PlaybackEvent::Tick { time_ms }) = event {
            out.push(time_ms);
        }
    }
    out
}

fn native(context: &PipelineContext, old: NativeState, new: NativeState) {
    context
        .events
        .send(PipelineEvent::StateChanged { old, new })
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_ticks_follow_playing_state() {
    let Setup {
        controller,
        engine,
        context,
        mut events,
    } = setup(ControllerConfig::default());
    let (handle, _task) = ControllerDriver::spawn(controller, CancellationToken::new());

    handle
        .set_source(MediaSource::Url("http://example.com/a.ogg".into()))
        .unwrap();
    native(&context, NativeState::Null, NativeState::Ready);
    handle.play().unwrap();
    native(&context, NativeState::Ready, NativeState::Playing);
    engine.lock().unwrap().position = 1_500;

    let status = handle.status().await.unwrap();
    assert_eq!(status.state, PlaybackState::Playing);
    assert_eq!(engine.lock().unwrap().states, vec![NativeState::Playing]);
    ticks(&mut events);

    // Default interval coerces to 50 ms.
    sleep(Duration::from_millis(120)).await;
    assert_eq!(ticks(&mut events), vec![1_500, 1_500]);

    native(&context, NativeState::Playing, NativeState::Paused);
    assert_eq!(handle.status().await.unwrap().state, PlaybackState::Paused);
    sleep(Duration::from_millis(500)).await;
    assert!(ticks(&mut events).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_tick_interval_change_restarts_timer() {
    let Setup {
        controller,
        context,
        mut events,
        ..
    } = setup(ControllerConfig::default());
    let (handle, _task) = ControllerDriver::spawn(controller, CancellationToken::new());

    native(&context, NativeState::Null, NativeState::Ready);
    native(&context, NativeState::Ready, NativeState::Playing);
    handle.set_tick_interval(200).unwrap();
    handle.status().await.unwrap();
    ticks(&mut events);

    sleep(Duration::from_millis(450)).await;
    assert_eq!(ticks(&mut events).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_resume_is_applied_by_driver() {
    let Setup {
        controller,
        engine,
        context,
        ..
    } = setup(ControllerConfig::default());
    let (handle, _task) = ControllerDriver::spawn(controller, CancellationToken::new());

    native(&context, NativeState::Null, NativeState::Ready);
    handle.play().unwrap();
    native(&context, NativeState::Ready, NativeState::Playing);
    engine.lock().unwrap().position = 42_000;
    handle.status().await.unwrap();

    handle.save_state().unwrap();
    engine.lock().unwrap().position = 0;
    let status = handle.status().await.unwrap();
    assert_eq!(status.current_time_ms, 42_000);

    handle.resume_state().unwrap();
    let status = handle.status().await.unwrap();
    assert_eq!(status.current_time_ms, 0);

    let engine = engine.lock().unwrap();
    assert_eq!(engine.seeks, vec![42_000]);
    assert_eq!(
        engine.states,
        vec![NativeState::Playing, NativeState::Playing]
    );
}

#[tokio::test]
async fn test_cancel_shuts_controller_down() {
    let Setup { controller, .. } = setup(ControllerConfig::default());
    let cancel = CancellationToken::new();
    let (handle, task) = ControllerDriver::spawn(controller, cancel.clone());

    handle.status().await.unwrap();
    cancel.cancel();

    let controller = task.await.unwrap();
    assert!(controller.is_shut_down());
    assert!(!controller.is_valid());
    assert!(matches!(handle.play(), Err(PlaybackError::DriverStopped)));
    assert!(matches!(
        handle.status().await,
        Err(PlaybackError::DriverStopped)
    ));
}

#[tokio::test]
async fn test_dropping_handles_stops_driver() {
    let Setup { controller, .. } = setup(ControllerConfig::default());
    let (handle, task) = ControllerDriver::spawn(controller, CancellationToken::new());
    let second = handle.clone();

    drop(handle);
    assert!(!second.is_closed());
    drop(second);

    let controller = task.await.unwrap();
    assert!(controller.is_shut_down());
}

#[tokio::test]
async fn test_engine_error_reported_in_status() {
    let Setup {
        controller,
        context,
        ..
    } = setup(ControllerConfig::default());
    let (handle, _task) = ControllerDriver::spawn(controller, CancellationToken::new());

    context
        .events
        .send(PipelineEvent::Error {
            message: "codec missing".into(),
            kind: bridge_traits::ErrorKind::Normal,
        })
        .unwrap();

    let status = handle.status().await.unwrap();
    assert_eq!(status.state, PlaybackState::Error);
    assert_eq!(status.error_string, "codec missing");
    assert_eq!(status.current_time_ms, -1);
}
