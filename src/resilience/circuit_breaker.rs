//! Circuit breaker guarding a single wrapped handler.
//!
//! # State Transitions
//! ```text
//! Closed → Open: failures reached the threshold within the cool-down
//! Open → Half-Open: cool-down elapsed, one probe forwarded
//! Half-Open → Closed: probe succeeded (observed on the next decision)
//! Half-Open → Open: probe failed (observed on the next decision)
//! ```
//!
//! The stored state reflects the decision just taken, not the probe's
//! eventual outcome: forwarding a probe stores `HalfOpen` before the probe
//! completes, and the probe's failure is only acted on by the next incoming
//! exchange. Scenarios that watch transitions closely rely on this
//! one-decision lag.
//!
//! Counters are independently atomic; a single decision reads them without
//! a common lock, so the combined `(state, failures, last_failure)` view is
//! not atomic as a whole.

use crate::error::{Error, ErrorKind};
use crate::exchange::Exchange;
use crate::lifecycle::{AlwaysRunnable, LifecycleGate};
use crate::pipeline::{Completion, Handler, OnceCompletion, Traceable};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Admission state of a [`CircuitBreaker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum BreakerState {
    /// Normal operation, exchanges are forwarded.
    Closed = 0,
    /// One probe in flight after the cool-down.
    HalfOpen = 1,
    /// Rejecting all exchanges.
    Open = 2,
}

impl BreakerState {
    fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(BreakerState::Closed),
            1 => Some(BreakerState::HalfOpen),
            2 => Some(BreakerState::Open),
            _ => None,
        }
    }
}

impl fmt::Display for BreakerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakerState::Closed => write!(f, "closed"),
            BreakerState::HalfOpen => write!(f, "half-open"),
            BreakerState::Open => write!(f, "open"),
        }
    }
}

/// Configuration for a circuit breaker. Set once, before the breaker is
/// wired into the pipeline.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Failure count that trips the breaker.
    pub threshold: u32,
    /// Cool-down before a tripped breaker allows a probe through.
    pub half_open_after: Duration,
    /// Error kinds that count toward the threshold. Empty means any attached
    /// error counts.
    pub failure_kinds: Vec<ErrorKind>,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            threshold: 5,
            half_open_after: Duration::from_secs(30),
            failure_kinds: Vec::new(),
        }
    }
}

impl CircuitBreakerConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the failure threshold
    pub fn with_threshold(mut self, threshold: u32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the cool-down before a tripped breaker probes for recovery
    pub fn with_half_open_after(mut self, half_open_after: Duration) -> Self {
        self.half_open_after = half_open_after;
        self
    }

    /// Add an error kind to the failure filter
    pub fn with_failure_kind(mut self, kind: ErrorKind) -> Self {
        self.failure_kinds.push(kind);
        self
    }

    /// Add several error kinds to the failure filter
    pub fn with_failure_kinds(mut self, kinds: impl IntoIterator<Item = ErrorKind>) -> Self {
        self.failure_kinds.extend(kinds);
        self
    }
}

/// Point-in-time diagnostic view of a breaker.
#[derive(Debug, Clone, Serialize)]
pub struct CircuitBreakerSnapshot {
    pub state: BreakerState,
    pub threshold: u32,
    pub half_open_after_ms: u64,
    pub failures: u32,
    /// Ms since the last qualifying failure, if one has happened.
    pub since_last_failure_ms: Option<u64>,
}

// Counters shared between the breaker and its armed continuations.
struct Shared {
    state: AtomicU8,
    failures: AtomicU32,
    // Ms since `epoch`; 0 until the first failure. Written relaxed and not
    // updated atomically with `failures`.
    last_failure_ms: AtomicU64,
    epoch: Instant,
    failure_kinds: Vec<ErrorKind>,
}

impl Shared {
    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    fn failures(&self) -> u32 {
        self.failures.load(Ordering::SeqCst)
    }

    fn last_failure_ms(&self) -> u64 {
        self.last_failure_ms.load(Ordering::Relaxed)
    }

    /// Whether a completed exchange counts toward the failure threshold.
    fn has_failed(&self, exchange: &Exchange) -> bool {
        if !exchange.has_error() {
            return false;
        }
        if self.failure_kinds.is_empty() {
            return true;
        }
        self.failure_kinds
            .iter()
            .any(|kind| exchange.error_matches(*kind))
    }

    /// Fold a completed exchange's outcome into the failure counters.
    fn record_outcome(&self, exchange: &Exchange) {
        if self.has_failed(exchange) {
            self.failures.fetch_add(1, Ordering::SeqCst);
            self.last_failure_ms.store(self.now_ms(), Ordering::Relaxed);
        } else {
            self.failures.store(0, Ordering::SeqCst);
        }
    }
}

/// Circuit breaker guarding exactly one wrapped handler.
///
/// The breaker is itself a [`Handler`], so it slots into a pipeline in place
/// of the handler it wraps. Per exchange it either forwards, rejects with a
/// [`Error::CircuitOpen`] carrying the current failure diagnostics, or
/// forwards a recovery probe. Rejections and lifecycle refusals complete
/// synchronously and never reach the wrapped handler.
pub struct CircuitBreaker {
    threshold: u32,
    half_open_after: Duration,
    shared: Arc<Shared>,
    target: Arc<dyn Handler>,
    gate: Arc<dyn LifecycleGate>,
}

impl CircuitBreaker {
    pub fn new(target: Arc<dyn Handler>, config: CircuitBreakerConfig) -> Self {
        Self {
            threshold: config.threshold,
            half_open_after: config.half_open_after,
            shared: Arc::new(Shared {
                state: AtomicU8::new(BreakerState::Closed as u8),
                failures: AtomicU32::new(0),
                last_failure_ms: AtomicU64::new(0),
                epoch: Instant::now(),
                failure_kinds: config.failure_kinds,
            }),
            target,
            gate: Arc::new(AlwaysRunnable),
        }
    }

    /// Replace the default always-runnable lifecycle gate.
    pub fn with_gate(mut self, gate: Arc<dyn LifecycleGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn state(&self) -> BreakerState {
        let raw = self.shared.state.load(Ordering::SeqCst);
        match BreakerState::from_raw(raw) {
            Some(state) => state,
            None => panic!("unrecognised circuit breaker state {raw}"),
        }
    }

    pub fn failures(&self) -> u32 {
        self.shared.failures()
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn half_open_after(&self) -> Duration {
        self.half_open_after
    }

    pub fn failure_kinds(&self) -> &[ErrorKind] {
        &self.shared.failure_kinds
    }

    pub fn snapshot(&self) -> CircuitBreakerSnapshot {
        let last = self.shared.last_failure_ms();
        CircuitBreakerSnapshot {
            state: self.state(),
            threshold: self.threshold,
            half_open_after_ms: self.half_open_after.as_millis() as u64,
            failures: self.shared.failures(),
            since_last_failure_ms: if last == 0 {
                None
            } else {
                Some(self.shared.now_ms().saturating_sub(last))
            },
        }
    }

    fn evaluate(&self, exchange: Arc<Exchange>, callback: Arc<dyn Completion>) -> bool {
        let raw = self.shared.state.load(Ordering::SeqCst);
        match BreakerState::from_raw(raw) {
            Some(BreakerState::HalfOpen) => {
                if self.shared.failures() == 0 {
                    self.close_circuit(exchange, callback)
                } else {
                    self.open_circuit(exchange, callback)
                }
            }
            Some(BreakerState::Open) => {
                if self.shared.failures() >= self.threshold && self.cooling_down() {
                    self.open_circuit(exchange, callback)
                } else {
                    self.half_open_circuit(exchange, callback)
                }
            }
            Some(BreakerState::Closed) => {
                if self.shared.failures() >= self.threshold {
                    if self.cooling_down() {
                        self.open_circuit(exchange, callback)
                    } else {
                        self.half_open_circuit(exchange, callback)
                    }
                } else {
                    self.close_circuit(exchange, callback)
                }
            }
            None => panic!("unrecognised circuit breaker state {raw}"),
        }
    }

    fn cooling_down(&self) -> bool {
        let elapsed = self
            .shared
            .now_ms()
            .saturating_sub(self.shared.last_failure_ms());
        elapsed < self.half_open_after.as_millis() as u64
    }

    fn open_circuit(&self, exchange: Arc<Exchange>, callback: Arc<dyn Completion>) -> bool {
        let handled = self.reject(exchange, callback);
        self.shared
            .state
            .store(BreakerState::Open as u8, Ordering::SeqCst);
        self.log_state();
        handled
    }

    fn half_open_circuit(&self, exchange: Arc<Exchange>, callback: Arc<dyn Completion>) -> bool {
        let handled = self.execute_target(exchange, callback);
        self.shared
            .state
            .store(BreakerState::HalfOpen as u8, Ordering::SeqCst);
        self.log_state();
        handled
    }

    fn close_circuit(&self, exchange: Arc<Exchange>, callback: Arc<dyn Completion>) -> bool {
        let handled = self.execute_target(exchange, callback);
        self.shared
            .state
            .store(BreakerState::Closed as u8, Ordering::SeqCst);
        self.log_state();
        handled
    }

    fn log_state(&self) {
        debug!(
            state = %self.state(),
            failures = self.shared.failures(),
            since_last_failure_ms = self
                .shared
                .now_ms()
                .saturating_sub(self.shared.last_failure_ms()),
            "circuit breaker state"
        );
    }

    /// Forward to the wrapped handler, arming the continuation that folds an
    /// asynchronous completion back into the failure counters.
    fn execute_target(&self, exchange: Arc<Exchange>, callback: Arc<dyn Completion>) -> bool {
        let guarded = Arc::new(OnceCompletion::new(callback));
        let continuation = Arc::new(BreakerCompletion {
            exchange: Arc::clone(&exchange),
            callback: Arc::clone(&guarded) as Arc<dyn Completion>,
            shared: Arc::clone(&self.shared),
        });

        let sync = self.target.process(Arc::clone(&exchange), continuation);
        if !sync {
            trace!(exchange = %exchange.id(), "exchange continues asynchronously");
            return false;
        }

        // The continuation only does the bookkeeping for asynchronous
        // completions; the synchronous outcome is folded in here.
        self.shared.record_outcome(&exchange);
        trace!(exchange = %exchange.id(), "exchange completed synchronously");
        guarded.done(true);
        true
    }

    fn reject(&self, exchange: Arc<Exchange>, callback: Arc<dyn Completion>) -> bool {
        exchange.set_error(Error::CircuitOpen {
            failures: self.shared.failures(),
            last_failure_ms: self.shared.last_failure_ms(),
        });
        callback.done(true);
        true
    }
}

impl Handler for CircuitBreaker {
    fn process(&self, exchange: Arc<Exchange>, callback: Arc<dyn Completion>) -> bool {
        if !self.gate.is_runnable() {
            trace!(exchange = %exchange.id(), "run not allowed, rejecting exchange");
            exchange.set_error_if_absent(Error::NotRunnable);
            callback.done(true);
            return true;
        }
        self.evaluate(exchange, callback)
    }
}

impl Traceable for CircuitBreaker {
    fn trace_label(&self) -> &'static str {
        "circuitbreaker"
    }
}

impl fmt::Display for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CircuitBreaker[{}]", self.target.label())
    }
}

/// Continuation armed around the original completion when an exchange is
/// forwarded: folds asynchronous outcomes into the shared counters before
/// notifying the caller.
struct BreakerCompletion {
    exchange: Arc<Exchange>,
    callback: Arc<dyn Completion>,
    shared: Arc<Shared>,
}

impl Completion for BreakerCompletion {
    fn done(&self, done_sync: bool) {
        if !done_sync {
            self.shared.record_outcome(&self.exchange);
        }
        self.callback.done(done_sync);
    }
}
