//! Per-request audit trail
//!
//! # Data Flow
//! ```text
//! failure boundary (one call per request)
//!     → AuditRecorder::record (non-blocking try_send)
//!     → bounded queue
//!     → audit worker task
//!     → AuditSink::trace (errors logged, panics caught)
//! ```
//!
//! A full queue never delays the response: the handoff moves onto a spawned
//! task that waits for room instead. At most `handoff_limit` such tasks are
//! parked at once; past that, records are dropped with a warning so a stalled
//! sink cannot grow the backlog without bound.

use crate::middleware::RequestId;
use async_trait::async_trait;
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Method, Request},
};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use parking_lot::Mutex;
use serde::Serialize;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, Semaphore, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Request details captured before dispatch consumes the request
#[derive(Clone, Debug)]
pub struct RequestMeta {
    pub request_id: Option<String>,
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub client_ip: Option<String>,
}

impl RequestMeta {
    pub fn capture(request: &Request<Body>) -> Self {
        let client_ip = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .or_else(|| {
                request
                    .headers()
                    .get("x-forwarded-for")
                    .and_then(|h| h.to_str().ok())
                    .and_then(|h| h.split(',').next())
                    .map(|ip| ip.trim().to_string())
            });

        Self {
            request_id: request.extensions().get::<RequestId>().map(|id| id.0.clone()),
            method: request.method().clone(),
            path: request.uri().path().to_string(),
            query: request.uri().query().map(str::to_string),
            client_ip,
        }
    }
}

/// Outcome of one request, handed to the audit sink
#[derive(Clone, Debug, Serialize)]
pub struct AuditRecord {
    pub request_id: Option<String>,
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub client_ip: Option<String>,
    pub duration_ms: u64,
    pub succeeded: bool,
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(meta: RequestMeta, duration: Duration, succeeded: bool) -> Self {
        Self {
            request_id: meta.request_id,
            method: meta.method.to_string(),
            path: meta.path,
            query: meta.query,
            client_ip: meta.client_ip,
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            succeeded,
            timestamp: Utc::now(),
        }
    }
}

/// Persists audit records
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn trace(&self, record: &AuditRecord) -> anyhow::Result<()>;
}

/// Deferred handoffs allowed in flight when none is configured
pub const DEFAULT_HANDOFF_LIMIT: usize = 4096;

/// Handoff from the request path to the audit worker
#[derive(Clone)]
pub struct AuditRecorder {
    sender: mpsc::Sender<AuditRecord>,
    handoffs: Arc<Semaphore>,
    handoff_limit: usize,
}

impl AuditRecorder {
    /// Start the audit worker. The returned handle completes once every
    /// recorder clone is dropped and the queue has drained.
    pub fn spawn(sink: Arc<dyn AuditSink>, capacity: usize) -> (Self, JoinHandle<()>) {
        Self::spawn_with_limit(sink, capacity, DEFAULT_HANDOFF_LIMIT)
    }

    /// Like [`AuditRecorder::spawn`], with an explicit cap on deferred
    /// handoffs waiting for queue room.
    pub fn spawn_with_limit(
        sink: Arc<dyn AuditSink>,
        capacity: usize,
        handoff_limit: usize,
    ) -> (Self, JoinHandle<()>) {
        let handoff_limit = handoff_limit.min(Semaphore::MAX_PERMITS);
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let worker = tokio::spawn(run_worker(receiver, sink));
        let recorder = Self {
            sender,
            handoffs: Arc::new(Semaphore::new(handoff_limit)),
            handoff_limit,
        };
        (recorder, worker)
    }

    /// Deferred handoffs still waiting for queue room
    pub fn pending_handoffs(&self) -> usize {
        self.handoff_limit - self.handoffs.available_permits()
    }

    /// Queue one record. Never blocks and never fails the caller.
    pub fn record(&self, meta: RequestMeta, duration: Duration, succeeded: bool) {
        let record = AuditRecord::new(meta, duration, succeeded);
        match self.sender.try_send(record) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(record)) => {
                let Ok(permit) = self.handoffs.clone().try_acquire_owned() else {
                    warn!(path = %record.path, "Audit backlog full, record dropped");
                    return;
                };
                debug!(path = %record.path, "Audit queue full, deferring handoff");
                let sender = self.sender.clone();
                tokio::spawn(async move {
                    if let Err(mpsc::error::SendError(record)) = sender.send(record).await {
                        warn!(path = %record.path, "Audit worker stopped, record dropped");
                    }
                    drop(permit);
                });
            }
            Err(mpsc::error::TrySendError::Closed(record)) => {
                warn!(path = %record.path, "Audit worker stopped, record dropped");
            }
        }
    }
}

async fn run_worker(mut receiver: mpsc::Receiver<AuditRecord>, sink: Arc<dyn AuditSink>) {
    while let Some(record) = receiver.recv().await {
        match AssertUnwindSafe(sink.trace(&record)).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(path = %record.path, error = %e, "Failed to persist audit record");
            }
            Err(_) => {
                error!(path = %record.path, "Audit sink panicked");
            }
        }
    }
    debug!("Audit worker stopped");
}

/// Sink that writes each record to the log
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn trace(&self, record: &AuditRecord) -> anyhow::Result<()> {
        info!(
            target: "cabinet_gateway::audit",
            request_id = record.request_id.as_deref().unwrap_or("-"),
            method = %record.method,
            path = %record.path,
            client_ip = record.client_ip.as_deref().unwrap_or("-"),
            duration_ms = record.duration_ms,
            succeeded = record.succeeded,
            "Request audited"
        );
        Ok(())
    }
}

/// Sink that keeps records in memory
#[derive(Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
    notify: Notify,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Wait until at least `count` records arrived or `timeout` passed, then
    /// return whatever is there.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<AuditRecord> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.notify.notified();
            if self.len() >= count {
                break;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                break;
            }
        }
        self.records()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn trace(&self, record: &AuditRecord) -> anyhow::Result<()> {
        self.records.lock().push(record.clone());
        self.notify.notify_waiters();
        Ok(())
    }
}
