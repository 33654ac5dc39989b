//! Effectful layer: the transport contract, the request controller that
//! drives it, and the bundled HTTP transport.

mod client;
mod controller;
#[cfg(feature = "reqwest")]
mod http;
mod pending;
mod transport;

pub use client::{Client, fetch};
pub use controller::{
    CancellationMode, ManualController, RequestControl, RequestController, SignalController,
    Unsubscribe,
};
#[cfg(feature = "reqwest")]
pub use http::{ReqwestHandle, ReqwestProvider};
pub use pending::PendingRequest;
pub use transport::{TransportHandle, TransportProvider, TransportSlots};
