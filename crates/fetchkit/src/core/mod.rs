//! Pure building blocks: event fan-out and lifecycle bookkeeping.

pub mod hub;
pub mod phase;

pub use hub::{EventHub, HandlerId};
pub use phase::{PhaseCell, RequestPhase};
