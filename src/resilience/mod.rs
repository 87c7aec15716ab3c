//! 弹性模式模块：为请求管道提供熔断保护机制。
//!
//! # Resilience Primitives Module
//!
//! This module provides the resilience patterns a request pipeline uses to
//! keep a failing downstream handler from dragging the whole system down.
//!
//! ## Circuit Breaker
//!
//! The circuit breaker wraps exactly one handler and decides per exchange
//! whether to forward, reject immediately, or forward a recovery probe:
//! - **Closed**: normal operation, exchanges pass through
//! - **Open**: failures exceeded the threshold, exchanges fail fast
//! - **Half-Open**: one probe in flight after the cool-down
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

pub mod circuit_breaker;

pub use circuit_breaker::{
    BreakerState, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerSnapshot,
};
