use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of a single request.
///
/// `Idle → Started → Settled`, with `Aborted` reachable from `Idle` or
/// `Started`. `Settled` and `Aborted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum RequestPhase {
    /// Nothing has asked for the outcome yet.
    #[default]
    Idle = 0,

    /// The pending operation exists.
    Started = 1,

    /// The transport produced its outcome.
    Settled = 2,

    /// An abort decided the outcome.
    Aborted = 3,
}

impl RequestPhase {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => RequestPhase::Started,
            2 => RequestPhase::Settled,
            3 => RequestPhase::Aborted,
            _ => RequestPhase::Idle,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestPhase::Settled | RequestPhase::Aborted)
    }
}

impl fmt::Display for RequestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestPhase::Idle => write!(f, "Idle"),
            RequestPhase::Started => write!(f, "Started"),
            RequestPhase::Settled => write!(f, "Settled"),
            RequestPhase::Aborted => write!(f, "Aborted"),
        }
    }
}

/// Atomic holder enforcing the forward-only transitions of [`RequestPhase`].
#[derive(Debug, Default)]
pub struct PhaseCell(AtomicU8);

impl PhaseCell {
    pub fn get(&self) -> RequestPhase {
        RequestPhase::from_u8(self.0.load(Ordering::Acquire))
    }

    /// `Idle → Started`.
    pub fn start(&self) -> bool {
        self.transition(RequestPhase::Idle, RequestPhase::Started)
    }

    /// `Started → Settled`.
    pub fn settle(&self) -> bool {
        self.transition(RequestPhase::Started, RequestPhase::Settled)
    }

    /// `Idle | Started → Aborted`.
    pub fn abort(&self) -> bool {
        self.transition(RequestPhase::Idle, RequestPhase::Aborted)
            || self.transition(RequestPhase::Started, RequestPhase::Aborted)
    }

    fn transition(&self, from: RequestPhase, to: RequestPhase) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
