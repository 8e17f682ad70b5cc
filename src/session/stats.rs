use crate::events::{CancellationReason, RecognitionEvent, ResultReason};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Statistics about a translation session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub session_id: String,

    /// When recognition started, if it ever did
    pub started_at: Option<DateTime<Utc>>,

    /// Seconds between start and stop (or now, while running)
    pub duration_secs: f64,

    /// Intermediate recognition results delivered
    pub partial_results: usize,

    /// Final results that were recognized (translated or not)
    pub final_results: usize,

    pub no_matches: usize,

    pub cancellations: usize,

    /// Bytes of synthesized speech delivered
    pub synthesized_bytes: usize,

    /// Whether the backend reported its own session stop
    pub backend_stopped: bool,

    /// Details of the last error cancellation
    pub last_error: Option<String>,
}

/// Counters updated by the delivery task
#[derive(Debug, Default)]
pub(crate) struct StatsCounter {
    partial_results: AtomicUsize,
    final_results: AtomicUsize,
    no_matches: AtomicUsize,
    cancellations: AtomicUsize,
    synthesized_bytes: AtomicUsize,
    backend_stopped: AtomicBool,
    last_error: Mutex<Option<String>>,
}

impl StatsCounter {
    pub(crate) fn record(&self, event: &RecognitionEvent) {
        match event {
            RecognitionEvent::Recognizing { .. } => {
                self.partial_results.fetch_add(1, Ordering::Relaxed);
            }
            RecognitionEvent::Recognized { reason, .. } => {
                let counter = match reason {
                    ResultReason::NoMatch => &self.no_matches,
                    _ => &self.final_results,
                };
                counter.fetch_add(1, Ordering::Relaxed);
            }
            RecognitionEvent::Synthesizing(chunk) => {
                self.synthesized_bytes.fetch_add(chunk.len(), Ordering::Relaxed);
            }
            RecognitionEvent::Canceled {
                reason,
                error_details,
                ..
            } => {
                self.cancellations.fetch_add(1, Ordering::Relaxed);
                if *reason == CancellationReason::Error {
                    if let Ok(mut last) = self.last_error.lock() {
                        *last = error_details.clone();
                    }
                }
            }
            RecognitionEvent::SessionStopped => {
                self.backend_stopped.store(true, Ordering::Relaxed);
            }
            RecognitionEvent::SessionStarted => {}
        }
    }

    pub(crate) fn snapshot(
        &self,
        session_id: &str,
        started_at: Option<DateTime<Utc>>,
        ended_at: Option<DateTime<Utc>>,
    ) -> SessionStats {
        let duration_secs = started_at
            .map(|start| {
                let end = ended_at.unwrap_or_else(Utc::now);
                end.signed_duration_since(start).num_milliseconds() as f64 / 1000.0
            })
            .unwrap_or(0.0);

        SessionStats {
            session_id: session_id.to_string(),
            started_at,
            duration_secs,
            partial_results: self.partial_results.load(Ordering::Relaxed),
            final_results: self.final_results.load(Ordering::Relaxed),
            no_matches: self.no_matches.load(Ordering::Relaxed),
            cancellations: self.cancellations.load(Ordering::Relaxed),
            synthesized_bytes: self.synthesized_bytes.load(Ordering::Relaxed),
            backend_stopped: self.backend_stopped.load(Ordering::Relaxed),
            last_error: self.last_error.lock().ok().and_then(|last| last.clone()),
        }
    }
}
