//! Request lifecycle controller.
//!
//! A controller wraps one [`TransportHandle`], memoizes its outcome, relays
//! its progress notifications and applies exactly one of two cancellation
//! protocols, chosen at construction:
//!
//! - [`ManualController`]: `abort()` / `is_aborted()` on the controller; an
//!   abort settles the request with a status-0 response.
//! - [`SignalController`]: cancellation only through an external
//!   [`CancelSignal`]; an abort rejects the request with [`AbortError`].

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use fetchkit_signal::{AbortCallback, CancelSignal};

use crate::core::{EventHub, HandlerId, RequestPhase};
use crate::data::{EventName, ProgressCallback, ProgressEvent, Response};
use crate::effects::pending::{PendingCell, PendingRequest};
use crate::effects::transport::TransportHandle;
use crate::error::{AbortError, Error, Result};

const SIGNAL_ABORT_HINT: &str =
    "controller is driven by a signal; call AbortController::abort() on the signal's owner instead";
const SIGNAL_IS_ABORTED_HINT: &str =
    "controller is driven by a signal; read AbortSignal::aborted() on the signal instead";

/// Which cancellation protocol a controller follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancellationMode {
    Manual,
    Signal,
}

/// The operations every controller variant provides.
pub trait RequestControl {
    /// The memoized outcome. Every call returns the same shared future.
    fn request(&self) -> PendingRequest;

    fn abort(&self) -> Result<()>;

    fn is_aborted(&self) -> Result<bool>;

    fn subscribe(&self, name: EventName, handler: ProgressCallback) -> Unsubscribe;

    fn phase(&self) -> RequestPhase;

    fn mode(&self) -> CancellationMode;
}

/// Token returned by `on_event`; consuming it removes that registration.
#[derive(Debug)]
pub struct Unsubscribe {
    hub: Weak<EventHub>,
    name: EventName,
    id: HandlerId,
}

impl Unsubscribe {
    pub fn name(&self) -> EventName {
        self.name
    }

    pub fn unsubscribe(self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.off(self.name, self.id);
        }
    }
}

/// Transport wiring, event relay and the memoized outcome. Cancellation is
/// layered on top by the two controller variants.
struct ControllerCore<H> {
    url: String,
    transport: Arc<H>,
    hub: Arc<EventHub>,
    pending: PendingCell,
}

impl<H: TransportHandle> ControllerCore<H> {
    fn new(url: &str, transport: H) -> Arc<Self> {
        let core = Arc::new(Self {
            url: url.to_string(),
            transport: Arc::new(transport),
            hub: Arc::new(EventHub::new()),
            pending: PendingCell::new(),
        });
        core.transport
            .set_on_download_progress(relay(&core.hub, EventName::Download));
        core.transport
            .set_on_upload_progress(relay(&core.hub, EventName::Upload));
        core
    }

    fn request(&self) -> PendingRequest {
        self.pending.get_or_start(&self.transport)
    }

    fn subscribe(&self, name: EventName, handler: ProgressCallback) -> Unsubscribe {
        let id = self.hub.on(name, handler);
        Unsubscribe {
            hub: Arc::downgrade(&self.hub),
            name,
            id,
        }
    }
}

fn relay(hub: &Arc<EventHub>, name: EventName) -> ProgressCallback {
    let hub = Arc::clone(hub);
    Arc::new(move |event: &ProgressEvent| {
        tracing::trace!(event = %name, loaded = event.loaded, total = event.total, "progress");
        hub.emit(name, event);
    })
}

/// Controller without a signal: `abort()` resolves the request with a
/// status-0, not-ok [`Response`].
pub struct ManualController<H> {
    core: Arc<ControllerCore<H>>,
}

impl<H: TransportHandle> ManualController<H> {
    fn new(core: Arc<ControllerCore<H>>) -> Self {
        let weak = Arc::downgrade(&core);
        let on_abort: AbortCallback = Arc::new(move || {
            let Some(core) = weak.upgrade() else {
                return;
            };
            let _ = core.request();
            core.pending
                .settle_aborted(Ok(Response::aborted(core.url.clone())));
        });
        core.transport.set_on_abort(on_abort);
        Self { core }
    }
}

impl<H: TransportHandle> RequestControl for ManualController<H> {
    fn request(&self) -> PendingRequest {
        self.core.request()
    }

    fn abort(&self) -> Result<()> {
        tracing::debug!(url = %self.core.url, started = self.core.pending.is_started(), "manual abort");
        // Aborting before start must still leave a future to resolve.
        let _ = self.core.request();
        self.core.transport.abort();
        Ok(())
    }

    fn is_aborted(&self) -> Result<bool> {
        Ok(self.core.transport.is_aborted())
    }

    fn subscribe(&self, name: EventName, handler: ProgressCallback) -> Unsubscribe {
        self.core.subscribe(name, handler)
    }

    fn phase(&self) -> RequestPhase {
        self.core.pending.phase().get()
    }

    fn mode(&self) -> CancellationMode {
        CancellationMode::Manual
    }
}

/// Controller bound to an external [`CancelSignal`]: the signal is the only
/// way to cancel, and cancellation rejects the request with [`AbortError`].
pub struct SignalController<H> {
    core: Arc<ControllerCore<H>>,
    signal: Arc<dyn CancelSignal>,
}

impl<H: TransportHandle> SignalController<H> {
    fn new(core: Arc<ControllerCore<H>>, signal: Arc<dyn CancelSignal>) -> Self {
        let handler = signal_handler(Arc::downgrade(&core));
        signal.add_on_abort(Arc::clone(&handler));
        if signal.aborted() {
            // Already cancelled at attach time: run now, before returning.
            handler();
        }
        Self { core, signal }
    }

    /// The signal this controller observes.
    pub fn signal(&self) -> &Arc<dyn CancelSignal> {
        &self.signal
    }
}

fn signal_handler<H: TransportHandle>(core: Weak<ControllerCore<H>>) -> AbortCallback {
    let fired = AtomicBool::new(false);
    Arc::new(move || {
        if fired.swap(true, Ordering::AcqRel) {
            return;
        }
        let Some(core) = core.upgrade() else {
            return;
        };
        tracing::debug!(url = %core.url, "signal abort");
        // Reject first so the transport's own abort outcome cannot win.
        core.pending.settle_aborted(Err(Error::Abort(AbortError::new())));
        core.transport.abort();
        let _ = core.request();
    })
}

impl<H: TransportHandle> RequestControl for SignalController<H> {
    fn request(&self) -> PendingRequest {
        self.core.request()
    }

    fn abort(&self) -> Result<()> {
        Err(Error::InvalidOperation {
            message: SIGNAL_ABORT_HINT,
        })
    }

    fn is_aborted(&self) -> Result<bool> {
        Err(Error::InvalidOperation {
            message: SIGNAL_IS_ABORTED_HINT,
        })
    }

    fn subscribe(&self, name: EventName, handler: ProgressCallback) -> Unsubscribe {
        self.core.subscribe(name, handler)
    }

    fn phase(&self) -> RequestPhase {
        self.core.pending.phase().get()
    }

    fn mode(&self) -> CancellationMode {
        CancellationMode::Signal
    }
}

/// A request controller in one of its two cancellation modes.
///
/// The mode is fixed at construction by the presence of a signal.
pub enum RequestController<H> {
    Manual(ManualController<H>),
    Signal(SignalController<H>),
}

impl<H: TransportHandle> RequestController<H> {
    /// Wrap `transport`, choosing signal mode when `signal` is present.
    pub fn new(url: &str, transport: H, signal: Option<Arc<dyn CancelSignal>>) -> Self {
        let core = ControllerCore::new(url, transport);
        tracing::debug!(url, signal = signal.is_some(), "request controller created");
        match signal {
            Some(signal) => RequestController::Signal(SignalController::new(core, signal)),
            None => RequestController::Manual(ManualController::new(core)),
        }
    }

    fn inner(&self) -> &dyn RequestControl {
        match self {
            RequestController::Manual(c) => c,
            RequestController::Signal(c) => c,
        }
    }

    /// The memoized outcome. Every call returns the same shared future; the
    /// transport is started at most once.
    pub fn request(&self) -> PendingRequest {
        self.inner().request()
    }

    /// Manual mode: abort the exchange; the request resolves with a status-0
    /// response. Signal mode: fails with [`Error::InvalidOperation`].
    pub fn abort(&self) -> Result<()> {
        self.inner().abort()
    }

    /// Manual mode: whether the exchange ended by abort. Signal mode: fails
    /// with [`Error::InvalidOperation`].
    pub fn is_aborted(&self) -> Result<bool> {
        self.inner().is_aborted()
    }

    /// Register a progress handler on `download` or `upload`.
    pub fn on_event<F>(&self, name: EventName, handler: F) -> Unsubscribe
    where
        F: Fn(&ProgressEvent) + Send + Sync + 'static,
    {
        self.inner().subscribe(name, Arc::new(handler))
    }

    pub fn phase(&self) -> RequestPhase {
        self.inner().phase()
    }

    pub fn mode(&self) -> CancellationMode {
        self.inner().mode()
    }
}

impl<H> fmt::Debug for RequestController<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (mode, core) = match self {
            RequestController::Manual(c) => ("Manual", &c.core),
            RequestController::Signal(c) => ("Signal", &c.core),
        };
        f.debug_struct("RequestController")
            .field("mode", &mode)
            .field("url", &core.url)
            .field("phase", &core.pending.phase().get())
            .finish()
    }
}
