//! 管道接缝模块：处理器、完成回调与诊断标签的核心抽象。
//!
//! # Pipeline Seams
//!
//! This module defines the narrow interfaces a pipeline element consumes and
//! provides: the downstream [`Handler`] contract, the single-use
//! [`Completion`] notification, and the [`Traceable`] diagnostic label.
//! The routing engine that wires elements together is an external
//! collaborator; everything here is in-process and transport-free.
//!
//! ## Completion contract
//!
//! A handler may finish an exchange on the calling thread (synchronous
//! completion) or later from another thread (asynchronous completion). The
//! boolean returned by [`Handler::process`] and the `done_sync` flag passed
//! to [`Completion::done`] both carry that distinction, and a given
//! exchange's completion is delivered exactly once.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`Handler`] | Downstream processor accepting (exchange, completion) |
//! | [`Completion`] | Single-use outcome notification |
//! | [`OnceCompletion`] | Exactly-once guard around another completion |
//! | [`AwaitableCompletion`] | Bridge from the callback contract into async/await |
//! | [`Service`] / [`ServiceHandler`] | Async service trait and its handler adapter |
//! | [`Traceable`] | Diagnostic label provider for tracing collaborators |

pub mod completion;
pub mod service;

pub use completion::{
    AwaitableCompletion, Completion, CompletionHandle, NoopCompletion, OnceCompletion,
};
pub use service::{Service, ServiceHandler};

use crate::exchange::Exchange;
use std::sync::Arc;

/// A downstream processor wired into the pipeline.
pub trait Handler: Send + Sync {
    /// Process an exchange.
    ///
    /// Returns `true` when the exchange was completed on the calling thread,
    /// `false` when it was accepted for asynchronous completion. In the
    /// latter case the handler owns `callback` and must invoke it exactly
    /// once from wherever the work finishes, with `done_sync = false`.
    fn process(&self, exchange: Arc<Exchange>, callback: Arc<dyn Completion>) -> bool;

    /// Short diagnostic label for this handler, used in `Display` output of
    /// wrapping elements.
    fn label(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Diagnostic label provider for tracing collaborators.
pub trait Traceable {
    fn trace_label(&self) -> &'static str;
}
