use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::Error;

/// Name of a relayed progress channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    /// Response body bytes received.
    Download,
    /// Request body bytes sent.
    Upload,
}

impl EventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::Download => "download",
            EventName::Upload => "upload",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "download" => Ok(EventName::Download),
            "upload" => Ok(EventName::Upload),
            other => Err(Error::UnknownEvent(other.to_string())),
        }
    }
}

/// Payload delivered to `download` and `upload` handlers.
///
/// Transports fire it once per chunk; the controller relays it unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Event kind as reported by the transport. Always `"progress"` for
    /// chunk notifications.
    pub event_type: &'static str,

    /// Bytes transferred so far.
    pub loaded: u64,

    /// Total bytes expected, if known.
    pub total: Option<u64>,
}

impl ProgressEvent {
    pub const PROGRESS: &'static str = "progress";

    pub fn progress(loaded: u64, total: Option<u64>) -> Self {
        Self {
            event_type: Self::PROGRESS,
            loaded,
            total,
        }
    }

    /// Whether `total` is known.
    pub fn length_computable(&self) -> bool {
        self.total.is_some()
    }

    /// Percentage of completion, `None` if `total` is unknown.
    #[must_use]
    pub fn percentage(&self) -> Option<f64> {
        self.total.map(|total| {
            if total == 0 {
                100.0
            } else {
                (self.loaded as f64 / total as f64) * 100.0
            }
        })
    }
}

/// Progress handler, shared between the hub and whoever registered it.
pub type ProgressCallback = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;
