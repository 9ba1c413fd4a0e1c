//! Media source descriptors.

use crate::config::StreamBridgeConfig;
use crate::error::Result;
use crate::stream_bridge::StreamBridge;
use crate::traits::StreamProducer;
use core_runtime::logging::{redact_url_credentials, strip_path};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// Optical disc flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiscType {
    Cd,
    Dvd,
    Vcd,
    BluRay,
}

/// What the controller is asked to play.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum MediaSource {
    #[default]
    Empty,
    Url(String),
    LocalFile(PathBuf),
    Disc {
        kind: DiscType,
        /// Device node; `None` lets the engine pick the default drive.
        device: Option<String>,
        /// Title to start at, one-based.
        title: Option<u32>,
    },
    /// Capture device such as a webcam or sound card input.
    Device(String),
    Stream(StreamSource),
}

impl MediaSource {
    /// Wraps `producer` in a new [`StreamBridge`] with the default buffering.
    pub fn stream(producer: Arc<dyn StreamProducer>) -> Self {
        MediaSource::Stream(StreamSource::new(StreamBridge::new(producer)))
    }

    pub fn stream_with_config(
        producer: Arc<dyn StreamProducer>,
        config: StreamBridgeConfig,
    ) -> Result<Self> {
        let bridge = StreamBridge::with_config(producer, config)?;
        Ok(MediaSource::Stream(StreamSource::new(bridge)))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, MediaSource::Empty)
    }

    pub fn is_cd(&self) -> bool {
        matches!(
            self,
            MediaSource::Disc {
                kind: DiscType::Cd,
                ..
            }
        )
    }

    pub fn stream_bridge(&self) -> Option<&Arc<StreamBridge>> {
        match self {
            MediaSource::Stream(stream) => Some(&stream.bridge),
            _ => None,
        }
    }

    /// Log-safe description: file names without directories, URLs without
    /// credentials.
    pub fn describe(&self) -> String {
        match self {
            MediaSource::Empty => "empty".to_string(),
            MediaSource::Url(url) => redact_url_credentials(url),
            MediaSource::LocalFile(path) => {
                let path = path.to_string_lossy();
                format!("file:{}", strip_path(&path))
            }
            MediaSource::Disc {
                kind,
                device,
                title,
            } => {
                let mut out = format!("disc:{kind:?}");
                if let Some(device) = device {
                    out.push('@');
                    out.push_str(strip_path(device));
                }
                if let Some(title) = title {
                    out.push_str(&format!("#{title}"));
                }
                out
            }
            MediaSource::Device(name) => format!("device:{name}"),
            MediaSource::Stream(stream) => format!("stream:{}", stream.id),
        }
    }
}

impl fmt::Display for MediaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// A push-stream source. Clones share the same bridge.
#[derive(Clone)]
pub struct StreamSource {
    id: Uuid,
    bridge: Arc<StreamBridge>,
}

impl StreamSource {
    pub fn new(bridge: Arc<StreamBridge>) -> Self {
        Self {
            id: Uuid::new_v4(),
            bridge,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn bridge(&self) -> &Arc<StreamBridge> {
        &self.bridge
    }
}

impl PartialEq for StreamSource {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for StreamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamSource")
            .field("id", &self.id)
            .field("position", &self.bridge.position())
            .finish()
    }
}
