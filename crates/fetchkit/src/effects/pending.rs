//! The memoized outcome of a request.

use std::sync::{Arc, Mutex, PoisonError};

use futures_util::FutureExt;
use futures_util::future::{self, BoxFuture, Either, Shared};
use once_cell::sync::OnceCell;
use tokio::sync::oneshot;

use crate::core::PhaseCell;
use crate::data::Response;
use crate::effects::transport::TransportHandle;
use crate::error::{Error, Result};

/// The future returned by `request()`.
///
/// Every clone observes the same single outcome.
pub type PendingRequest = Shared<BoxFuture<'static, Result<Response>>>;

type Settlement = Result<Response>;

/// Compute-once cell for the pending request, plus an override channel
/// that lets abort paths decide the outcome.
///
/// The override channel exists before any callback is wired, so a
/// settlement that arrives before the request is started is kept, not lost.
pub(crate) struct PendingCell {
    cell: OnceCell<PendingRequest>,
    settle_tx: Mutex<Option<oneshot::Sender<Settlement>>>,
    settle_rx: Mutex<Option<oneshot::Receiver<Settlement>>>,
    phase: Arc<PhaseCell>,
}

impl PendingCell {
    pub(crate) fn new() -> Self {
        let (tx, rx) = oneshot::channel();
        Self {
            cell: OnceCell::new(),
            settle_tx: Mutex::new(Some(tx)),
            settle_rx: Mutex::new(Some(rx)),
            phase: Arc::new(PhaseCell::default()),
        }
    }

    pub(crate) fn phase(&self) -> &PhaseCell {
        &self.phase
    }

    /// Return the pending request, creating it on first use.
    ///
    /// The initializer calls no foreign code; the transport's outcome
    /// accessor runs inside the shared future on its first poll. A callback
    /// fired during construction can therefore never re-enter the cell.
    pub(crate) fn get_or_start<H: TransportHandle>(&self, transport: &Arc<H>) -> PendingRequest {
        self.cell
            .get_or_init(|| {
                let transport = Arc::clone(transport);
                let settled = self
                    .settle_rx
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take();
                let phase = Arc::clone(&self.phase);
                if phase.start() {
                    tracing::debug!("request started");
                }

                async move {
                    let outcome = transport.outcome().map(|r| r.map_err(Error::from));
                    let result = match settled {
                        // Left is polled first, so an abort that is already
                        // decided wins over a transport that is also ready.
                        Some(settled) => match future::select(settled, outcome).await {
                            Either::Left((Ok(settlement), _)) => settlement,
                            Either::Left((Err(_), outcome)) => outcome.await,
                            Either::Right((result, _)) => result,
                        },
                        None => outcome.await,
                    };

                    if phase.settle() {
                        tracing::debug!(
                            status = result.as_ref().map(|r| r.status).ok(),
                            "request settled"
                        );
                    }
                    result
                }
                .boxed()
                .shared()
            })
            .clone()
    }

    pub(crate) fn is_started(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Decide the outcome as an abort. Only the first settlement counts.
    pub(crate) fn settle_aborted(&self, settlement: Settlement) -> bool {
        let Some(tx) = self
            .settle_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            return false;
        };

        self.phase.abort();
        tracing::debug!(rejected = settlement.is_err(), "request settled by abort");
        // The receiver is only gone once the outcome is already decided.
        tx.send(settlement).is_ok()
    }
}
