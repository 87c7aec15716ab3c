//! # pipeline-guard
//!
//! 异步请求管道的熔断器运行时：在下游处理器持续故障时快速失败，并在冷却期后自动探测恢复。
//!
//! Circuit breaker runtime for asynchronous request pipelines - fail fast
//! while a downstream handler is unhealthy, probe for recovery after a
//! cool-down.
//!
//! ## Overview
//!
//! This library implements the circuit-breaker element of a request-routing
//! pipeline. The breaker wraps exactly one downstream handler, counts its
//! recent failures, and per incoming exchange decides whether to forward,
//! reject immediately, or forward a single recovery probe. Handlers may
//! complete an exchange on the calling thread or later from another thread;
//! both paths feed the same failure counters and the original caller is
//! notified exactly once.
//!
//! ## Core Philosophy
//!
//! - **One handler, one breaker**: no load-balancing or handler selection,
//!   the breaker governs whether exchanges reach its single wrapped handler
//! - **Never blocks**: admission decisions are lock-free reads of atomic
//!   counters; no operation sleeps or performs I/O
//! - **Errors pass through**: handler errors are inspected to drive the
//!   state machine but reach the caller untranslated
//! - **Narrow seams**: the routing engine, shutdown coordinator and
//!   transport are collaborators behind small traits, not dependencies
//!
//! ## Quick Start
//!
//! ```rust
//! use pipeline_guard::{
//!     Completion, CircuitBreaker, CircuitBreakerConfig, Exchange, Handler, NoopCompletion,
//! };
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! struct Backend;
//!
//! impl Handler for Backend {
//!     fn process(&self, _exchange: Arc<Exchange>, callback: Arc<dyn Completion>) -> bool {
//!         callback.done(true);
//!         true
//!     }
//! }
//!
//! let config = CircuitBreakerConfig::new()
//!     .with_threshold(3)
//!     .with_half_open_after(Duration::from_secs(10));
//! let breaker = CircuitBreaker::new(Arc::new(Backend), config);
//!
//! let exchange = Arc::new(Exchange::new(serde_json::json!({ "route": "orders" })));
//! let handled_sync = breaker.process(Arc::clone(&exchange), Arc::new(NoopCompletion));
//! assert!(handled_sync);
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`exchange`] | The unit of work flowing through a pipeline |
//! | [`pipeline`] | Handler/completion seams and the async service bridge |
//! | [`resilience`] | The circuit breaker state machine |
//! | [`lifecycle`] | Admission gating for shutdown coordination |
//! | [`error`] | Error types and failure classification |

pub mod error;
pub mod exchange;
pub mod lifecycle;
pub mod pipeline;
pub mod resilience;

// Re-export main types for convenience
pub use error::{Error, ErrorKind};
pub use exchange::Exchange;
pub use lifecycle::{AlwaysRunnable, LifecycleGate, ShutdownGate};
pub use pipeline::{
    AwaitableCompletion, Completion, CompletionHandle, Handler, NoopCompletion, OnceCompletion,
    Service, ServiceHandler, Traceable,
};
pub use resilience::circuit_breaker::{
    BreakerState, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerSnapshot,
};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;
