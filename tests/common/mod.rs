//! Shared test harness for integration tests.
//!
//! Provides [`StubEngine`], an in-memory [`Engine`] that records every call
//! and can be scripted to fail or to report progress, plus [`Harness`], which
//! wires an orchestrator around it the same way a [`Session`] does.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::Notify;

use gf_av::{Engine, ListenerId, ProgressListener, ProgressListeners};
use gf_core::config::Config;
use gf_core::events::{Event, EventBus, EventPayload};
use gf_core::Error;
use gifforge::{ConversionOrchestrator, EngineManager, HandleRegistry, Session};

/// A minimal GIF header followed by filler, standing in for real output.
pub const FAKE_GIF: &[u8] = b"GIF89a\x01\x00\x01\x00\x00\x00\x00;";

/// One recorded engine call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Load,
    WriteFile(String),
    Exec(Vec<String>),
    ReadFile(String),
    DeleteFile(String),
    ListFiles,
    OnProgress,
    OffProgress,
}

/// Scriptable in-memory engine.
pub struct StubEngine {
    calls: Mutex<Vec<Call>>,
    files: Mutex<BTreeMap<String, Bytes>>,
    listeners: ProgressListeners,
    load_failures: AtomicUsize,
    load_delay: Duration,
    exec_failure: Mutex<Option<String>>,
    fail_read: AtomicBool,
    progress: Vec<f64>,
    output: Bytes,
    exec_gate: Option<Arc<Notify>>,
    exec_started: Arc<Notify>,
}

impl StubEngine {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            files: Mutex::new(BTreeMap::new()),
            listeners: ProgressListeners::new(),
            load_failures: AtomicUsize::new(0),
            load_delay: Duration::ZERO,
            exec_failure: Mutex::new(None),
            fail_read: AtomicBool::new(false),
            progress: Vec::new(),
            output: Bytes::from_static(FAKE_GIF),
            exec_gate: None,
            exec_started: Arc::new(Notify::new()),
        }
    }

    /// Fail the next `n` load attempts.
    pub fn failing_loads(self, n: usize) -> Self {
        self.load_failures.store(n, Ordering::SeqCst);
        self
    }

    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }

    /// Every exec fails with `message` until cleared.
    pub fn failing_exec(self, message: &str) -> Self {
        *self.exec_failure.lock() = Some(message.to_string());
        self
    }

    pub fn failing_read(self) -> Self {
        self.fail_read.store(true, Ordering::SeqCst);
        self
    }

    /// Fractions reported to listeners during each exec, in order.
    pub fn with_progress(mut self, fractions: &[f64]) -> Self {
        self.progress = fractions.to_vec();
        self
    }

    pub fn with_output(mut self, output: &'static [u8]) -> Self {
        self.output = Bytes::from_static(output);
        self
    }

    /// Exec blocks until the returned gate is notified (once per exec).
    pub fn with_exec_gate(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.exec_gate = Some(Arc::clone(&gate));
        (self, gate)
    }

    pub fn clear_exec_failure(&self) {
        *self.exec_failure.lock() = None;
    }

    /// Wait until an exec call has begun.
    pub async fn exec_started(&self) {
        self.exec_started.notified().await;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn load_count(&self) -> usize {
        self.count(|c| matches!(c, Call::Load))
    }

    pub fn exec_calls(&self) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                Call::Exec(args) => Some(args.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    /// Names currently in the virtual filesystem (not recorded as a call).
    pub fn resident_files(&self) -> Vec<String> {
        self.files.lock().keys().cloned().collect()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

impl Default for StubEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Engine for StubEngine {
    async fn load(&self) -> gf_core::Result<()> {
        self.record(Call::Load);
        if !self.load_delay.is_zero() {
            tokio::time::sleep(self.load_delay).await;
        }
        let failing = self
            .load_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(Error::tool("stub", "failed to fetch engine payload"));
        }
        Ok(())
    }

    async fn write_file(&self, name: &str, data: Bytes) -> gf_core::Result<()> {
        self.record(Call::WriteFile(name.to_string()));
        self.files.lock().insert(name.to_string(), data);
        Ok(())
    }

    async fn exec(&self, args: &[String]) -> gf_core::Result<()> {
        self.record(Call::Exec(args.to_vec()));
        self.exec_started.notify_one();

        if let Some(ref gate) = self.exec_gate {
            gate.notified().await;
        }

        for fraction in &self.progress {
            self.listeners.emit(*fraction);
            tokio::task::yield_now().await;
        }

        if let Some(message) = self.exec_failure.lock().clone() {
            return Err(Error::tool("stub", message));
        }

        let input = args
            .iter()
            .position(|a| a == "-i")
            .and_then(|i| args.get(i + 1))
            .ok_or_else(|| Error::tool("stub", "no input given"))?;
        if !self.files.lock().contains_key(input) {
            return Err(Error::tool("stub", format!("{input}: No such file or directory")));
        }

        let output = args
            .last()
            .ok_or_else(|| Error::tool("stub", "no output given"))?;
        self.files.lock().insert(output.clone(), self.output.clone());
        Ok(())
    }

    async fn read_file(&self, name: &str) -> gf_core::Result<Bytes> {
        self.record(Call::ReadFile(name.to_string()));
        if self.fail_read.load(Ordering::SeqCst) {
            return Err(Error::tool("stub", "read failed"));
        }
        self.files
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::not_found("file", name))
    }

    async fn delete_file(&self, name: &str) -> gf_core::Result<()> {
        self.record(Call::DeleteFile(name.to_string()));
        self.files.lock().remove(name);
        Ok(())
    }

    async fn list_files(&self) -> gf_core::Result<Vec<String>> {
        self.record(Call::ListFiles);
        Ok(self.resident_files())
    }

    fn on_progress(&self, listener: ProgressListener) -> ListenerId {
        self.record(Call::OnProgress);
        self.listeners.add(listener)
    }

    fn off_progress(&self, id: ListenerId) -> bool {
        self.record(Call::OffProgress);
        self.listeners.remove(id)
    }
}

/// An orchestrator wired around a stub engine.
pub struct Harness {
    pub stub: Arc<StubEngine>,
    pub events: Arc<EventBus>,
    pub engine: Arc<EngineManager>,
    pub handles: Arc<HandleRegistry>,
    pub orchestrator: Arc<ConversionOrchestrator>,
}

impl Harness {
    pub fn new(stub: StubEngine) -> Self {
        let stub = Arc::new(stub);
        let events = Arc::new(EventBus::new(1024));
        let engine = Arc::new(EngineManager::new(stub.clone(), Arc::clone(&events)));
        let handles = Arc::new(HandleRegistry::new(Arc::clone(&events)));
        let orchestrator = Arc::new(ConversionOrchestrator::new(
            Arc::clone(&engine),
            Arc::clone(&handles),
            Arc::clone(&events),
        ));
        Self {
            stub,
            events,
            engine,
            handles,
            orchestrator,
        }
    }

    /// Build the harness and load the engine.
    pub async fn ready(stub: StubEngine) -> Self {
        let harness = Self::new(stub);
        harness.engine.ensure_loaded().await.unwrap();
        harness
    }
}

/// A session around a stub engine, with the stub kept for inspection.
pub fn session(stub: StubEngine) -> (Arc<StubEngine>, Session) {
    let stub = Arc::new(stub);
    let mut config = Config::default();
    config.events.capacity = 1024;
    let session = Session::new(stub.clone(), &config);
    (stub, session)
}

/// Stand-in for a two-second clip; the stub never decodes it.
pub fn two_second_clip() -> Vec<u8> {
    let mut data = b"\x00\x00\x00\x20ftypisom".to_vec();
    data.resize(48 * 1024, 0x42);
    data
}

/// Drain every event currently buffered on `rx`.
pub fn drain(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> Vec<EventPayload> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event.payload);
    }
    out
}
