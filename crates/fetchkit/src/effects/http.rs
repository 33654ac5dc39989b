//! HTTP transport over `reqwest`.

use std::io;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use fetchkit_signal::AbortCallback;
use futures_util::future::{self, BoxFuture, Either};
use futures_util::{FutureExt, Stream, StreamExt, stream};
use reqwest::header::{CONTENT_LENGTH, HeaderMap};
use reqwest::{Client, Method};
use url::Url;

use crate::config::TransportConfig;
use crate::data::{ProgressCallback, ProgressEvent, RequestInit, Response};
use crate::effects::transport::{TransportHandle, TransportProvider, TransportSlots};
use crate::error::TransportError;

/// Production transport provider using `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestProvider {
    client: Client,
    config: Arc<TransportConfig>,
    default_headers: HeaderMap,
}

impl ReqwestProvider {
    /// Create a provider with default configuration.
    pub fn new() -> crate::Result<Self> {
        Self::with_config(TransportConfig::default())
    }

    /// Fails with a config error if a default header is not a valid header.
    pub fn with_config(config: TransportConfig) -> crate::Result<Self> {
        let mut builder = Client::builder();
        if let Some(ref user_agent) = config.user_agent {
            builder = builder.user_agent(user_agent.as_str());
        }
        let client = builder.build().map_err(TransportError::new)?;
        Self::from_client(client, config)
    }

    /// Reuse an existing client; `config.user_agent` is not applied.
    pub fn from_client(client: Client, config: TransportConfig) -> crate::Result<Self> {
        let default_headers = config.header_map()?;
        Ok(Self {
            client,
            config: Arc::new(config),
            default_headers,
        })
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

impl TransportProvider for ReqwestProvider {
    type Handle = ReqwestHandle;

    fn open(&self, url: &str, init: &RequestInit) -> Result<ReqwestHandle, TransportError> {
        let url = Url::parse(url).map_err(TransportError::new)?;
        let method = Method::from_bytes(init.method.as_bytes()).map_err(TransportError::new)?;

        let mut headers = self.default_headers.clone();
        for (name, value) in &init.headers {
            headers.append(name.clone(), value.clone());
        }

        Ok(ReqwestHandle {
            client: self.client.clone(),
            exchange: Arc::new(Exchange {
                method,
                url,
                headers,
                body: init.body.clone(),
                chunk_size: self.config.effective_chunk_size(),
            }),
            slots: Arc::new(TransportSlots::new()),
        })
    }
}

struct Exchange {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Bytes>,
    chunk_size: usize,
}

/// One HTTP exchange prepared by [`ReqwestProvider`].
pub struct ReqwestHandle {
    client: Client,
    exchange: Arc<Exchange>,
    slots: Arc<TransportSlots>,
}

impl TransportHandle for ReqwestHandle {
    fn outcome(&self) -> BoxFuture<'static, Result<Response, TransportError>> {
        let client = self.client.clone();
        let exchange = Arc::clone(&self.exchange);
        let slots = Arc::clone(&self.slots);

        async move {
            let aborted = slots.aborted_signal().boxed();
            let running = run(client, Arc::clone(&exchange), Arc::clone(&slots)).boxed();

            match future::select(aborted, running).await {
                Either::Right((result, _)) if slots.finish() => result,
                // Aborted, possibly just after the exchange completed.
                _ => Ok(Response::aborted(exchange.url.as_str())),
            }
        }
        .boxed()
    }

    fn abort(&self) {
        if self.slots.abort() {
            tracing::debug!(url = %self.exchange.url, "http exchange aborted");
        }
    }

    fn is_aborted(&self) -> bool {
        self.slots.is_aborted()
    }

    fn set_on_download_progress(&self, callback: ProgressCallback) {
        self.slots.set_download(callback);
    }

    fn set_on_upload_progress(&self, callback: ProgressCallback) {
        self.slots.set_upload(callback);
    }

    fn set_on_abort(&self, callback: AbortCallback) {
        self.slots.set_on_abort(callback);
    }
}

async fn run(
    client: Client,
    exchange: Arc<Exchange>,
    slots: Arc<TransportSlots>,
) -> Result<Response, TransportError> {
    let mut request = client
        .request(exchange.method.clone(), exchange.url.clone())
        .headers(exchange.headers.clone());
    if let Some(ref body) = exchange.body {
        request = request
            .header(CONTENT_LENGTH, body.len() as u64)
            .body(reqwest::Body::wrap_stream(upload_stream(
                body.clone(),
                exchange.chunk_size,
                Arc::clone(&slots),
            )));
    }

    let response = request.send().await.map_err(TransportError::new)?;
    let status = response.status();
    let url = response.url().to_string();
    let headers = response.headers().clone();
    let total = response.content_length();

    let mut stream = response.bytes_stream();
    let mut body = BytesMut::new();
    let mut loaded = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(TransportError::new)?;
        loaded += chunk.len() as u64;
        body.extend_from_slice(&chunk);
        slots.emit_download(&ProgressEvent::progress(loaded, total));
    }

    tracing::debug!(%url, status = status.as_u16(), bytes = loaded, "http exchange complete");

    Ok(Response::new(status.as_u16(), url)
        .with_status_text(status.canonical_reason().unwrap_or(""))
        .with_headers(headers)
        .with_body(body.freeze()))
}

/// Split `body` into chunks, reporting each one as it is pulled by the HTTP
/// stack.
fn upload_stream(
    body: Bytes,
    chunk_size: usize,
    slots: Arc<TransportSlots>,
) -> impl Stream<Item = Result<Bytes, io::Error>> + Send + 'static {
    let total = body.len() as u64;
    let chunks: Vec<Bytes> = (0..body.len())
        .step_by(chunk_size)
        .map(|start| body.slice(start..(start + chunk_size).min(body.len())))
        .collect();

    let mut sent = 0u64;
    stream::iter(chunks).map(move |chunk| {
        sent += chunk.len() as u64;
        slots.emit_upload(&ProgressEvent::progress(sent, Some(total)));
        Ok(chunk)
    })
}
