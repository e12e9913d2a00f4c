//! The client's batch/flush state machine: a duplicate filter, a
//! fixed-capacity buffer, flush on capacity or on a timer, and
//! drop-on-failure delivery with at most one send in flight at a time.

use std::time::Duration;

use outpost_core::{Fix, MAX_BATCH_SAMPLES};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{info, warn};

use crate::fix_source::{FixSource, FixSourceError};
use crate::transport::{BatchSender, SendOutcome};

pub struct Pipeline<S, T> {
    source: S,
    transport: T,
    similarity_threshold: f64,
    flush_interval: Duration,
    buffer: Vec<Fix>,
    last_accepted: Option<Fix>,
    in_flight: Option<JoinHandle<SendOutcome>>,
}

impl<S, T> Pipeline<S, T>
where
    S: FixSource,
    T: BatchSender,
{
    pub fn new(source: S, transport: T, similarity_threshold: f64, flush_interval: Duration) -> Self {
        Self {
            source,
            transport,
            similarity_threshold,
            flush_interval,
            buffer: Vec::with_capacity(MAX_BATCH_SAMPLES),
            last_accepted: None,
            in_flight: None,
        }
    }

    fn is_duplicate(&self, fix: &Fix) -> bool {
        match &self.last_accepted {
            None => false,
            Some(last) => {
                let (dlat, dlon) = fix.axis_delta(last);
                dlat < self.similarity_threshold || dlon < self.similarity_threshold
            }
        }
    }

    /// Drives the pipeline until the fix source reports itself exhausted or
    /// errors out. Runs forever against a live serial source.
    pub async fn run(mut self) {
        let mut timer = interval(self.flush_interval);
        timer.tick().await;

        loop {
            let in_flight_slot = &mut self.in_flight;
            tokio::select! {
                next = self.source.next_fix() => {
                    match next {
                        Ok(Some(fix)) => self.accept(fix).await,
                        Ok(None) => {}
                        Err(FixSourceError::Exhausted) => {
                            info!("fix source exhausted, pipeline stopping");
                            self.drain().await;
                            return;
                        }
                        Err(e) => {
                            warn!(error = %e, "fix source error, pipeline stopping");
                            self.drain().await;
                            return;
                        }
                    }
                }
                _ = timer.tick() => {
                    if !self.buffer.is_empty() {
                        self.maybe_flush().await;
                    }
                }
                result = wait_for(in_flight_slot), if in_flight_slot.is_some() => {
                    self.in_flight = None;
                    Self::log_outcome(result);
                    self.maybe_flush().await;
                }
            }
        }
    }

    async fn accept(&mut self, fix: Fix) {
        if self.is_duplicate(&fix) {
            return;
        }
        self.last_accepted = Some(fix);

        if self.buffer.len() >= MAX_BATCH_SAMPLES {
            let evicted = self.buffer.remove(0);
            warn!(timestamp = evicted.timestamp, "buffer full while a send is in flight, evicting oldest sample");
        }
        self.buffer.push(fix);

        if self.buffer.len() >= MAX_BATCH_SAMPLES {
            self.maybe_flush().await;
        }
    }

    /// Starts a send if the buffer is non-empty and no send is already in
    /// flight. If one is already running, the buffer just keeps
    /// accumulating (protected by ring eviction in [`Self::accept`]) until
    /// that send completes and this is called again.
    async fn maybe_flush(&mut self) {
        if self.in_flight.is_some() || self.buffer.is_empty() {
            return;
        }
        let batch = std::mem::replace(&mut self.buffer, Vec::with_capacity(MAX_BATCH_SAMPLES));
        let transport = self.transport.clone();
        self.in_flight = Some(tokio::spawn(async move { transport.send_batch(batch).await }));
    }

    /// Flushes whatever is left in the buffer and waits for it (and any
    /// already-in-flight send) to finish, so a shutting-down pipeline
    /// doesn't silently lose its last partial batch.
    async fn drain(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            Self::log_outcome(handle.await);
        }
        self.maybe_flush().await;
        if let Some(handle) = self.in_flight.take() {
            Self::log_outcome(handle.await);
        }
    }

    fn log_outcome(result: Result<SendOutcome, tokio::task::JoinError>) {
        match result {
            Ok(SendOutcome::Accepted) => info!("batch accepted"),
            Ok(SendOutcome::Unauthorized) => {
                warn!("server rejected batch as unauthorized, dropping (check pre-shared key)")
            }
            Ok(SendOutcome::Failed) => warn!("send failed, batch dropped"),
            Err(e) => warn!(error = %e, "send task panicked"),
        }
    }
}

async fn wait_for(handle: &mut Option<JoinHandle<SendOutcome>>) -> Result<SendOutcome, tokio::task::JoinError> {
    match handle {
        Some(h) => h.await,
        None => std::future::pending().await,
    }
}
