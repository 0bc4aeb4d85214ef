// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Serialized request scheduler.
//!
//! Every request, inference or metrics query, goes through one unbounded
//! FIFO channel drained by a single dedicated worker thread. At most one
//! request touches the engine at a time and requests are handled in
//! arrival order. Each request carries its own oneshot reply channel, so a
//! result can only ever reach the producer that submitted it.
//!
//! ```text
//!  submit() ──┐
//!  submit() ──┼──► mpsc (FIFO) ──► worker thread ──► RequestHandler
//!  submit() ──┘                         │
//!       ▲                               │
//!       └──────── oneshot per request ◄─┘
//! ```
//!
//! The worker survives handler errors and handler panics: both become an
//! error result for the affected request and the loop continues.

use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use accelerator::AcceleratorAdapter;
use metrics::{MetricsQuery, SnapshotEntry};
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::engine::{InferenceEngine, Ready};
use crate::fanout::panic_message;
use crate::{RuntimeError, SchedulerError, Workload};

/// What a request asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Raw request bytes for the workload to decode.
    Inference(Vec<u8>),
    /// A metrics history query.
    Metrics(MetricsQuery),
}

/// A unit of work with a unique identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub id: Uuid,
    pub payload: Payload,
}

impl Request {
    /// New inference request with a fresh id.
    pub fn inference(raw: impl Into<Vec<u8>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload: Payload::Inference(raw.into()),
        }
    }

    /// New metrics request with a fresh id.
    pub fn metrics(query: MetricsQuery) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload: Payload::Metrics(query),
        }
    }

    fn kind(&self) -> &'static str {
        match self.payload {
            Payload::Inference(_) => "inference",
            Payload::Metrics(_) => "metrics",
        }
    }
}

/// Successful result body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// Encoded workload output.
    Inference(Vec<u8>),
    /// History entries followed by the init entry.
    Metrics(Vec<SnapshotEntry>),
}

/// The result of one request, tagged with the request id.
#[derive(Debug)]
pub struct Response {
    pub id: Uuid,
    pub outcome: Result<ResponseBody, RuntimeError>,
}

impl Response {
    /// Returns the inference bytes, or the error.
    pub fn into_inference(self) -> Result<Vec<u8>, RuntimeError> {
        match self.outcome? {
            ResponseBody::Inference(bytes) => Ok(bytes),
            ResponseBody::Metrics(_) => Err(RuntimeError::Internal(format!(
                "request {} answered with metrics instead of inference output",
                self.id
            ))),
        }
    }

    /// Returns the metrics entries, or the error.
    pub fn into_metrics(self) -> Result<Vec<SnapshotEntry>, RuntimeError> {
        match self.outcome? {
            ResponseBody::Metrics(entries) => Ok(entries),
            ResponseBody::Inference(_) => Err(RuntimeError::Internal(format!(
                "request {} answered with inference output instead of metrics",
                self.id
            ))),
        }
    }
}

/// The component the worker drives. Implemented by a ready engine.
pub trait RequestHandler: Send + 'static {
    /// Runs one inference request.
    fn infer(&mut self, raw: &[u8]) -> Result<Vec<u8>, RuntimeError>;

    /// Answers one metrics query.
    fn metrics(&mut self, query: &MetricsQuery) -> Result<Vec<SnapshotEntry>, RuntimeError>;
}

impl<W, A> RequestHandler for InferenceEngine<W, A, Ready>
where
    W: Workload + 'static,
    A: AcceleratorAdapter + 'static,
{
    fn infer(&mut self, raw: &[u8]) -> Result<Vec<u8>, RuntimeError> {
        self.process(raw)
    }

    fn metrics(&mut self, query: &MetricsQuery) -> Result<Vec<SnapshotEntry>, RuntimeError> {
        self.metrics_snapshot(query)
    }
}

type Job = (Request, oneshot::Sender<Response>);

/// Handle to the serialized worker.
///
/// Cloning is not supported; share it behind an `Arc`. `submit` only needs
/// `&self`, so any number of producers can wait concurrently.
#[derive(Debug)]
pub struct Scheduler {
    tx: Option<mpsc::UnboundedSender<Job>>,
    worker: Option<JoinHandle<()>>,
    timeout: Duration,
}

impl Scheduler {
    /// Moves `handler` onto a new worker thread and starts the loop.
    pub fn spawn<H: RequestHandler>(handler: H, timeout: Duration) -> Result<Self, SchedulerError> {
        let (tx, rx) = mpsc::unbounded_channel::<Job>();
        let worker = thread::Builder::new()
            .name("aif-scheduler".into())
            .spawn(move || worker_loop(handler, rx))?;
        tracing::info!("scheduler started, request timeout {timeout:?}");
        Ok(Self {
            tx: Some(tx),
            worker: Some(worker),
            timeout,
        })
    }

    /// Producer wait deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Enqueues `request` and waits for its result.
    ///
    /// On timeout the request stays queued and is still processed; its
    /// result is discarded.
    pub async fn submit(&self, request: Request) -> Result<Response, SchedulerError> {
        let id = request.id;
        let tx = self.tx.as_ref().ok_or(SchedulerError::Closed)?;
        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send((request, reply_tx))
            .map_err(|_| SchedulerError::Closed)?;
        tracing::trace!("request {id} queued");

        match tokio::time::timeout(self.timeout, reply_rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(SchedulerError::WorkerGone { id }),
            Err(_) => {
                tracing::warn!("request {id} timed out after {:?}", self.timeout);
                Err(SchedulerError::Timeout {
                    id,
                    after: self.timeout,
                })
            }
        }
    }

    /// Shorthand for submitting an inference request.
    pub async fn infer(&self, raw: impl Into<Vec<u8>>) -> Result<Response, SchedulerError> {
        self.submit(Request::inference(raw)).await
    }

    /// Shorthand for submitting a metrics request.
    pub async fn metrics(&self, query: MetricsQuery) -> Result<Response, SchedulerError> {
        self.submit(Request::metrics(query)).await
    }

    /// Stops accepting requests, drains the queue and joins the worker.
    ///
    /// Blocks the calling thread until every queued request has run. From
    /// async code call it inside `tokio::task::spawn_blocking`.
    pub fn shutdown(mut self) {
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("scheduler worker panicked outside a request");
            }
            tracing::info!("scheduler stopped");
        }
    }
}

/// Dropping closes the queue without waiting: the worker drains what is
/// already queued and exits on its own.
impl Drop for Scheduler {
    fn drop(&mut self) {
        self.tx.take();
        if self.worker.take().is_some() {
            tracing::debug!("scheduler dropped, worker detached");
        }
    }
}

fn worker_loop<H: RequestHandler>(mut handler: H, mut rx: mpsc::UnboundedReceiver<Job>) {
    while let Some((request, reply)) = rx.blocking_recv() {
        let response = handle(&mut handler, request);
        if let Err(err) = &response.outcome {
            tracing::error!("request {} failed ({}): {err}", response.id, err.error_type());
        }
        if reply.send(response).is_err() {
            tracing::warn!("requester went away before the result was ready");
        }
    }
    tracing::debug!("request channel closed, worker exiting");
}

fn handle<H: RequestHandler>(handler: &mut H, request: Request) -> Response {
    let kind = request.kind();
    let Request { id, payload } = request;
    tracing::debug!("handling {kind} request {id}");

    let result = panic::catch_unwind(AssertUnwindSafe(|| match &payload {
        Payload::Inference(raw) => handler.infer(raw).map(ResponseBody::Inference),
        Payload::Metrics(query) => handler.metrics(query).map(ResponseBody::Metrics),
    }));
    let outcome = result.unwrap_or_else(|panic| {
        Err(RuntimeError::Internal(format!(
            "{kind} request panicked: {}",
            panic_message(panic.as_ref())
        )))
    });
    Response { id, outcome }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Echoes its input; panics on `b"panic"`, sleeps on `b"slow"`.
    #[derive(Default)]
    struct Echo {
        handled: Arc<AtomicUsize>,
    }

    impl RequestHandler for Echo {
        fn infer(&mut self, raw: &[u8]) -> Result<Vec<u8>, RuntimeError> {
            self.handled.fetch_add(1, Ordering::SeqCst);
            match raw {
                b"panic" => panic!("boom"),
                b"slow" => {
                    thread::sleep(Duration::from_millis(200));
                    Ok(raw.to_vec())
                }
                b"fail" => Err(RuntimeError::Precondition("nope".into())),
                _ => Ok(raw.to_vec()),
            }
        }

        fn metrics(&mut self, query: &MetricsQuery) -> Result<Vec<SnapshotEntry>, RuntimeError> {
            query.limit()?;
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_round_trip() {
        let scheduler = Scheduler::spawn(Echo::default(), Duration::from_secs(5)).unwrap();
        let request = Request::inference(b"hello".to_vec());
        let id = request.id;
        let response = scheduler.submit(request).await.unwrap();
        assert_eq!(response.id, id);
        assert_eq!(response.into_inference().unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_results_reach_their_requester() {
        let scheduler = Arc::new(Scheduler::spawn(Echo::default(), Duration::from_secs(5)).unwrap());
        let mut tasks = Vec::new();
        for i in 0..32 {
            let scheduler = Arc::clone(&scheduler);
            tasks.push(tokio::spawn(async move {
                let body = format!("req-{i}").into_bytes();
                let out = scheduler.infer(body.clone()).await.unwrap().into_inference().unwrap();
                assert_eq!(out, body);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_error_does_not_stop_worker() {
        let scheduler = Scheduler::spawn(Echo::default(), Duration::from_secs(5)).unwrap();
        let err = scheduler.infer(b"fail".to_vec()).await.unwrap().into_inference().unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(scheduler.infer(b"ok".to_vec()).await.unwrap().outcome.is_ok());
    }

    #[tokio::test]
    async fn test_panic_becomes_internal_error() {
        let scheduler = Scheduler::spawn(Echo::default(), Duration::from_secs(5)).unwrap();
        let err = scheduler.infer(b"panic".to_vec()).await.unwrap().into_inference().unwrap_err();
        assert!(matches!(err, RuntimeError::Internal(ref msg) if msg.contains("boom")));
        assert_eq!(err.status_code(), 500);
        assert!(scheduler.infer(b"ok".to_vec()).await.unwrap().outcome.is_ok());
    }

    #[tokio::test]
    async fn test_timeout_keeps_request_queued() {
        let handled = Arc::new(AtomicUsize::new(0));
        let echo = Echo {
            handled: Arc::clone(&handled),
        };
        let scheduler = Scheduler::spawn(echo, Duration::from_millis(20)).unwrap();
        let err = scheduler.infer(b"slow".to_vec()).await.unwrap_err();
        assert!(matches!(err, SchedulerError::Timeout { .. }));

        // Shutdown drains the queue, so the slow request still ran.
        scheduler.shutdown();
        assert_eq!(handled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_drop_does_not_wait_for_worker() {
        let handled = Arc::new(AtomicUsize::new(0));
        let echo = Echo {
            handled: Arc::clone(&handled),
        };
        let scheduler = Scheduler::spawn(echo, Duration::from_millis(20)).unwrap();
        // Times out while the worker is still inside the 200 ms request.
        assert!(scheduler.infer(b"slow".to_vec()).await.is_err());

        let start = std::time::Instant::now();
        drop(scheduler);
        assert!(start.elapsed() < Duration::from_millis(100));

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(handled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_metrics_query() {
        let scheduler = Scheduler::spawn(Echo::default(), Duration::from_secs(5)).unwrap();
        let entries = scheduler
            .metrics(MetricsQuery::all())
            .await
            .unwrap()
            .into_metrics()
            .unwrap();
        assert!(entries.is_empty());

        let err = scheduler
            .metrics(MetricsQuery::last(-1))
            .await
            .unwrap()
            .into_metrics()
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_request_ids_are_unique() {
        let a = Request::inference(Vec::new());
        let b = Request::inference(Vec::new());
        assert_ne!(a.id, b.id);
        assert_eq!(a.kind(), "inference");
        assert_eq!(Request::metrics(MetricsQuery::all()).kind(), "metrics");
    }
}
