//! Cancellation signals for fetchkit.
//!
//! A signal is an externally owned cancellation request that many consumers
//! may observe. It carries an aborted flag and a list of listeners, each
//! notified when cancellation is requested.
//!
//! - [`CancelSignal`] - the contract a request controller consumes
//! - [`AbortController`] / [`AbortSignal`] - the bundled implementation

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Callback invoked when a cancellation is requested.
pub type AbortCallback = Arc<dyn Fn() + Send + Sync>;

/// An observable cancellation request.
///
/// Implementations may notify more than once, and may already be aborted
/// when a consumer attaches; consumers are expected to check [`aborted`]
/// right after registering and to guard against repeated notification.
///
/// [`aborted`]: CancelSignal::aborted
pub trait CancelSignal: Send + Sync {
    /// Returns `true` once cancellation has been requested.
    fn aborted(&self) -> bool;

    /// Add a listener. Listeners added earlier are kept; each one is
    /// notified when cancellation is requested.
    fn add_on_abort(&self, callback: AbortCallback);
}

#[derive(Default)]
struct SignalState {
    aborted: AtomicBool,
    listeners: Mutex<Vec<AbortCallback>>,
}

/// Read side of an [`AbortController`].
///
/// Clones share the same state, so one signal can be handed to any number
/// of request controllers.
#[derive(Clone, Default)]
pub struct AbortSignal {
    inner: Arc<SignalState>,
}

impl AbortSignal {
    /// A signal that is already aborted.
    pub fn abort_now() -> Self {
        let signal = Self::default();
        signal.inner.aborted.store(true, Ordering::Release);
        signal
    }

    /// Returns `true` once the owning controller has aborted.
    pub fn aborted(&self) -> bool {
        self.inner.aborted.load(Ordering::Acquire)
    }

    /// Add a listener, notified in registration order on abort.
    ///
    /// Adding a listener to an already aborted signal does not invoke it.
    pub fn add_on_abort(&self, callback: AbortCallback) {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(callback);
    }

    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Flip the flag and notify. Returns `false` if already aborted.
    fn trigger(&self) -> bool {
        if self
            .inner
            .aborted
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        // Snapshot so listeners may touch the signal, or add listeners.
        let listeners: Vec<AbortCallback> = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        tracing::debug!(listeners = listeners.len(), "abort signal triggered");
        for listener in listeners {
            listener();
        }
        true
    }
}

impl CancelSignal for AbortSignal {
    fn aborted(&self) -> bool {
        AbortSignal::aborted(self)
    }

    fn add_on_abort(&self, callback: AbortCallback) {
        AbortSignal::add_on_abort(self, callback);
    }
}

impl fmt::Debug for AbortSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbortSignal")
            .field("aborted", &self.aborted())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Owner of an [`AbortSignal`].
///
/// # Examples
///
/// ```
/// use fetchkit_signal::AbortController;
///
/// let controller = AbortController::new();
/// let signal = controller.signal();
/// assert!(!signal.aborted());
///
/// controller.abort();
/// assert!(signal.aborted());
/// ```
#[derive(Debug, Clone, Default)]
pub struct AbortController {
    signal: AbortSignal,
}

impl AbortController {
    pub fn new() -> Self {
        Self::default()
    }

    /// The signal observed by consumers.
    pub fn signal(&self) -> AbortSignal {
        self.signal.clone()
    }

    /// Request cancellation.
    ///
    /// The first call flips the flag and invokes every listener; later
    /// calls do nothing.
    pub fn abort(&self) {
        self.signal.trigger();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, AbortCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);
        let callback: AbortCallback = Arc::new(move || {
            inner.fetch_add(1, Ordering::SeqCst);
        });
        (count, callback)
    }

    #[test]
    fn abort_sets_flag_on_all_clones() {
        let controller = AbortController::new();
        let a = controller.signal();
        let b = a.clone();

        controller.abort();

        assert!(a.aborted());
        assert!(b.aborted());
    }

    #[test]
    fn abort_notifies_once() {
        let controller = AbortController::new();
        let (count, callback) = counter();
        controller.signal().add_on_abort(callback);

        controller.abort();
        controller.abort();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn every_listener_is_notified_in_order() {
        let controller = AbortController::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in 0..3 {
            let order = Arc::clone(&order);
            // Each consumer holds its own clone, as separate controllers do.
            controller.signal().add_on_abort(Arc::new(move || {
                order.lock().unwrap().push(tag);
            }));
        }
        assert_eq!(controller.signal().listener_count(), 3);

        controller.abort();

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn abort_now_is_already_aborted_and_silent() {
        let signal = AbortSignal::abort_now();
        let (count, callback) = counter();
        signal.add_on_abort(callback);

        assert!(signal.aborted());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn listener_can_read_signal_and_add_listeners() {
        let controller = AbortController::new();
        let signal = controller.signal();
        let seen = Arc::new(AtomicBool::new(false));

        let observer = signal.clone();
        let flag = Arc::clone(&seen);
        signal.add_on_abort(Arc::new(move || {
            flag.store(observer.aborted(), Ordering::SeqCst);
            observer.add_on_abort(Arc::new(|| {}));
        }));
        controller.abort();

        assert!(seen.load(Ordering::SeqCst));
        assert_eq!(signal.listener_count(), 2);
    }

    #[test]
    fn works_through_trait_object() {
        let controller = AbortController::new();
        let signal: Arc<dyn CancelSignal> = Arc::new(controller.signal());
        let (count, callback) = counter();
        signal.add_on_abort(callback);

        controller.abort();

        assert!(signal.aborted());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
