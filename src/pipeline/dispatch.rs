//! Bounded fire-and-forget dispatch to the lip-sync sink.
//!
//! Each encoded window becomes one dispatch ticket: a spawned task
//! holding a semaphore permit for as long as the sink submission is in
//! flight. When no permit is free the window's buffer is dropped rather
//! than queued; lip-sync is a presentation concern, so late audio is
//! worse than missing audio.

use std::collections::VecDeque;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use super::stats::Counters;
use crate::sink::LipSyncSink;
use crate::wav::WavBuffer;

pub(crate) struct Dispatcher {
    sink: Arc<dyn LipSyncSink>,
    permits: Arc<Semaphore>,
    max_outstanding: usize,
    tickets: VecDeque<JoinHandle<()>>,
    counters: Arc<Counters>,
}

impl Dispatcher {
    pub(crate) fn new(
        sink: Arc<dyn LipSyncSink>,
        max_outstanding: usize,
        counters: Arc<Counters>,
    ) -> Self {
        Self {
            sink,
            permits: Arc::new(Semaphore::new(max_outstanding)),
            max_outstanding,
            tickets: VecDeque::new(),
            counters,
        }
    }

    /// Submit one window without waiting for prior submissions.
    ///
    /// Windows are issued in the order this is called; completion order
    /// is up to the sink.
    pub(crate) fn dispatch(&mut self, buffer: WavBuffer) {
        self.tickets.retain(|ticket| !ticket.is_finished());

        let permit = match Arc::clone(&self.permits).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                self.counters.windows_dropped.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    "All {} dispatch slots busy, dropping {} byte window",
                    self.max_outstanding,
                    buffer.len()
                );
                return;
            }
        };

        self.counters
            .windows_dispatched
            .fetch_add(1, Ordering::Relaxed);

        let sink = Arc::clone(&self.sink);
        let counters = Arc::clone(&self.counters);
        let ticket = tokio::spawn(async move {
            let _permit = permit;
            if let Err(e) = sink.submit_audio(buffer).await {
                counters.dispatch_failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Sink dispatch failed: {}", e);
            }
        });
        self.tickets.push_back(ticket);
    }

    /// Submissions currently in flight.
    pub(crate) fn outstanding(&self) -> usize {
        self.max_outstanding - self.permits.available_permits()
    }

    /// Best-effort cancellation of every outstanding ticket.
    pub(crate) fn abort_all(&mut self) {
        let aborted = self.tickets.len();
        for ticket in self.tickets.drain(..) {
            ticket.abort();
        }
        if aborted > 0 {
            tracing::debug!("Aborted {} outstanding dispatches", aborted);
        }
    }
}
