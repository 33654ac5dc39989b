use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, PoisonError};

use fetchkit_signal::AbortCallback;
use futures_util::future::BoxFuture;
use tokio::sync::watch;

use crate::data::{ProgressCallback, ProgressEvent, RequestInit, Response};
use crate::error::TransportError;

/// Builds one [`TransportHandle`] per request.
///
/// # Implementations
///
/// - [`ReqwestProvider`](crate::ReqwestProvider): HTTP over `reqwest`
/// - Scripted providers in tests
pub trait TransportProvider {
    type Handle: TransportHandle;

    /// Prepare, but do not start, an exchange for `url`.
    ///
    /// `init.signal` is handled by the controller; providers should ignore it.
    fn open(&self, url: &str, init: &RequestInit) -> Result<Self::Handle, TransportError>;
}

/// One underlying network exchange.
///
/// The controller owns the handle exclusively and guarantees that
/// [`outcome`](TransportHandle::outcome) is called at most once.
pub trait TransportHandle: Send + Sync + 'static {
    /// Start the exchange and return its eventual outcome.
    fn outcome(&self) -> BoxFuture<'static, Result<Response, TransportError>>;

    /// Ask the exchange to stop.
    ///
    /// Implementations fire the abort callback once, and make a running
    /// [`outcome`](TransportHandle::outcome) finish promptly.
    fn abort(&self);

    /// Whether the exchange completed by abort.
    fn is_aborted(&self) -> bool;

    fn set_on_download_progress(&self, callback: ProgressCallback);

    fn set_on_upload_progress(&self, callback: ProgressCallback);

    fn set_on_abort(&self, callback: AbortCallback);
}

const RUNNING: u8 = 0;
const FINISHED: u8 = 1;
const ABORTED: u8 = 2;

/// Callback slots and completion state shared by a handle and its running
/// exchange.
///
/// Transports keep this in an `Arc` so the `'static` outcome future can
/// fire progress and observe aborts after `outcome()` has returned. An
/// exchange ends exactly once: either [`finish`](Self::finish) or
/// [`abort`](Self::abort) wins, never both.
pub struct TransportSlots {
    download: Mutex<Option<ProgressCallback>>,
    upload: Mutex<Option<ProgressCallback>>,
    on_abort: Mutex<Option<AbortCallback>>,
    state: AtomicU8,
    abort_tx: watch::Sender<bool>,
}

impl Default for TransportSlots {
    fn default() -> Self {
        let (abort_tx, _) = watch::channel(false);
        Self {
            download: Mutex::new(None),
            upload: Mutex::new(None),
            on_abort: Mutex::new(None),
            state: AtomicU8::new(RUNNING),
            abort_tx,
        }
    }
}

impl TransportSlots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_download(&self, callback: ProgressCallback) {
        *self.download.lock().unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    pub fn set_upload(&self, callback: ProgressCallback) {
        *self.upload.lock().unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    pub fn set_on_abort(&self, callback: AbortCallback) {
        *self.on_abort.lock().unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    pub fn emit_download(&self, event: &ProgressEvent) {
        Self::fire(&self.download, event);
    }

    pub fn emit_upload(&self, event: &ProgressEvent) {
        Self::fire(&self.upload, event);
    }

    fn fire(slot: &Mutex<Option<ProgressCallback>>, event: &ProgressEvent) {
        let callback = slot.lock().unwrap_or_else(PoisonError::into_inner).clone();
        if let Some(callback) = callback {
            callback(event);
        }
    }

    /// Record that the exchange completed on its own. Later aborts are
    /// ignored.
    ///
    /// Returns `false` if an abort got there first; the transport must then
    /// report the aborted outcome instead of its own result.
    pub fn finish(&self) -> bool {
        self.transition(FINISHED)
    }

    /// Mark the exchange aborted, wake [`aborted_signal`](Self::aborted_signal)
    /// waiters and fire the abort callback. Only the first call on an
    /// unfinished exchange has effect.
    pub fn abort(&self) -> bool {
        if !self.transition(ABORTED) {
            return false;
        }
        self.abort_tx.send_replace(true);

        let callback = self
            .on_abort
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(callback) = callback {
            callback();
        }
        true
    }

    pub fn is_aborted(&self) -> bool {
        self.state.load(Ordering::Acquire) == ABORTED
    }

    fn transition(&self, to: u8) -> bool {
        self.state
            .compare_exchange(RUNNING, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Resolves once [`abort`](Self::abort) has been called.
    pub fn aborted_signal(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.abort_tx.subscribe();
        async move {
            let closed = rx.wait_for(|aborted| *aborted).await.is_err();
            if closed {
                // Slots dropped without aborting; never resolve.
                std::future::pending::<()>().await;
            }
        }
    }
}
