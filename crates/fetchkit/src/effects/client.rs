use crate::data::RequestInit;
use crate::effects::controller::RequestController;
use crate::effects::transport::TransportProvider;
use crate::error::Result;

/// Factory for request controllers over a transport provider.
///
/// Every [`fetch`](Client::fetch) call opens a fresh transport handle and
/// wraps it in its own controller.
#[derive(Debug, Clone, Default)]
pub struct Client<P> {
    provider: P,
}

impl<P: TransportProvider> Client<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Build a controller for `url`.
    ///
    /// Nothing is sent until the controller's `request()` future is polled.
    /// Fails only if the provider cannot open a handle for `url`.
    pub fn fetch(&self, url: &str, init: RequestInit) -> Result<RequestController<P::Handle>> {
        fetch(&self.provider, url, init)
    }
}

/// One-off form of [`Client::fetch`].
pub fn fetch<P: TransportProvider>(
    provider: &P,
    url: &str,
    init: RequestInit,
) -> Result<RequestController<P::Handle>> {
    let handle = provider.open(url, &init)?;
    Ok(RequestController::new(url, handle, init.signal))
}
