//! Request controller with progress events and unified abort semantics.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - [`data`] - Request configuration, progress payloads, responses
//! - [`core`] - Event fan-out and lifecycle bookkeeping
//! - `effects` - Transport contract, controller, HTTP transport
//!
//! # Key Features
//!
//! - **Start Once**: `request()` returns one shared future; the transport is
//!   started at most once however often it is called
//! - **Progress Relay**: transport `download`/`upload` notifications are
//!   re-emitted to handlers registered with `on_event`
//! - **Two Cancellation Modes**: manual `abort()` resolves with a status-0
//!   response; a [`CancelSignal`] rejects with [`AbortError`]
//!
//! # Example
//!
//! ```no_run
//! use fetchkit::{Client, EventName, RequestInit, ReqwestProvider};
//!
//! # async fn demo() -> fetchkit::Result<()> {
//! let client = Client::new(ReqwestProvider::new()?);
//! let controller = client.fetch("http://localhost:8080/data.json", RequestInit::default())?;
//!
//! let unlisten = controller.on_event(EventName::Download, |event| {
//!     println!("{} bytes", event.loaded);
//! });
//!
//! let response = controller.request().await?;
//! let body: serde_json::Value = response.json()?;
//! unlisten.unsubscribe();
//! # let _ = body;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod data;
mod effects;
mod error;

pub use config::TransportConfig;
pub use crate::core::{EventHub, HandlerId, RequestPhase};
pub use data::{EventName, ProgressCallback, ProgressEvent, RequestInit, Response};
pub use http::{HeaderMap, HeaderValue, header};
pub use effects::{
    CancellationMode, Client, ManualController, PendingRequest, RequestControl,
    RequestController, SignalController, TransportHandle, TransportProvider, TransportSlots,
    Unsubscribe, fetch,
};

#[cfg(feature = "reqwest")]
pub use effects::{ReqwestHandle, ReqwestProvider};

pub use error::{AbortError, Error, Result, TransportError};
pub use fetchkit_signal::{AbortCallback, AbortController, AbortSignal, CancelSignal};
