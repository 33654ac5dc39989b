//! Scripted transport shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fetchkit::{
    AbortCallback, CancelSignal, ProgressCallback, ProgressEvent, RequestInit, Response,
    TransportError, TransportHandle, TransportProvider, TransportSlots,
};
use futures_util::FutureExt;
use futures_util::future::{self, BoxFuture, Either};

/// What a scripted exchange does once started.
#[derive(Debug, Clone)]
pub enum Script {
    /// Fire `upload` then `download` progress notifications, then resolve.
    Respond {
        response: Response,
        download: usize,
        upload: usize,
    },
    /// Resolve with `response` after `delay`.
    Delay { delay: Duration, response: Response },
    /// Fail with a transport error carrying `message`.
    Fail(String),
    /// Never finish on its own.
    Hang,
}

impl Script {
    pub fn ok() -> Self {
        Script::Respond {
            response: Response::new(200, "/test/get"),
            download: 0,
            upload: 0,
        }
    }

    pub fn json(body: &str) -> Self {
        Script::Respond {
            response: Response::new(200, "/test/get")
                .with_status_text("OK")
                .with_body(body.to_string()),
            download: 1,
            upload: 0,
        }
    }

    pub fn progress(download: usize, upload: usize) -> Self {
        Script::Respond {
            response: Response::new(200, "/test/progress"),
            download,
            upload,
        }
    }
}

#[derive(Debug, Default)]
pub struct Counters {
    pub outcome_calls: AtomicUsize,
    pub abort_calls: AtomicUsize,
}

impl Counters {
    pub fn outcome_calls(&self) -> usize {
        self.outcome_calls.load(Ordering::SeqCst)
    }

    pub fn abort_calls(&self) -> usize {
        self.abort_calls.load(Ordering::SeqCst)
    }
}

pub struct ScriptedProvider {
    script: Script,
    counters: Arc<Counters>,
}

impl ScriptedProvider {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn counters(&self) -> Arc<Counters> {
        Arc::clone(&self.counters)
    }
}

impl TransportProvider for ScriptedProvider {
    type Handle = ScriptedHandle;

    fn open(&self, url: &str, _init: &RequestInit) -> Result<ScriptedHandle, TransportError> {
        if url.is_empty() {
            return Err(TransportError::msg("empty url"));
        }
        Ok(ScriptedHandle {
            url: url.to_string(),
            script: self.script.clone(),
            slots: Arc::new(TransportSlots::new()),
            counters: Arc::clone(&self.counters),
        })
    }
}

pub struct ScriptedHandle {
    url: String,
    script: Script,
    slots: Arc<TransportSlots>,
    counters: Arc<Counters>,
}

impl TransportHandle for ScriptedHandle {
    fn outcome(&self) -> BoxFuture<'static, Result<Response, TransportError>> {
        self.counters.outcome_calls.fetch_add(1, Ordering::SeqCst);
        let script = self.script.clone();
        let slots = Arc::clone(&self.slots);
        let url = self.url.clone();

        async move {
            let aborted = slots.aborted_signal().boxed();
            let running = play(script, Arc::clone(&slots)).boxed();
            match future::select(aborted, running).await {
                Either::Left(((), _)) => Ok(Response::aborted(url)),
                Either::Right((result, _)) if slots.finish() => result,
                Either::Right(_) => Ok(Response::aborted(url)),
            }
        }
        .boxed()
    }

    fn abort(&self) {
        self.counters.abort_calls.fetch_add(1, Ordering::SeqCst);
        self.slots.abort();
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

async fn play(script: Script, slots: Arc<TransportSlots>) -> Result<Response, TransportError> {
    match script {
        Script::Respond {
            response,
            download,
            upload,
        } => {
            for i in 1..=upload {
                slots.emit_upload(&ProgressEvent::progress(i as u64, Some(upload as u64)));
                tokio::task::yield_now().await;
            }
            for i in 1..=download {
                slots.emit_download(&ProgressEvent::progress(i as u64, Some(download as u64)));
                tokio::task::yield_now().await;
            }
            Ok(response)
        }
        Script::Delay { delay, response } => {
            tokio::time::sleep(delay).await;
            Ok(response)
        }
        Script::Fail(message) => Err(TransportError::msg(message)),
        Script::Hang => std::future::pending().await,
    }
}

/// A signal that notifies every time it is fired, unlike `AbortController`.
#[derive(Default)]
pub struct RepeatingSignal {
    aborted: std::sync::atomic::AtomicBool,
    listeners: Mutex<Vec<AbortCallback>>,
}

impl RepeatingSignal {
    pub fn fire(&self) {
        self.aborted.store(true, Ordering::SeqCst);
        let listeners = self.listeners.lock().unwrap().clone();
        for listener in listeners {
            listener();
        }
    }
}

impl CancelSignal for RepeatingSignal {
    fn aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    fn add_on_abort(&self, callback: AbortCallback) {
        self.listeners.lock().unwrap().push(callback);
    }
}

/// Collects the progress events a handler receives.
pub fn recorder() -> (Arc<Mutex<Vec<ProgressEvent>>>, impl Fn(&ProgressEvent) + Send + Sync + 'static) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    (log, move |event: &ProgressEvent| {
        sink.lock().unwrap().push(event.clone())
    })
}
