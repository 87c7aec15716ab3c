//! Bridges async services onto the callback-based handler contract.

use crate::exchange::Exchange;
use crate::pipeline::{Completion, Handler};
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// An asynchronous downstream service.
///
/// Failures are returned as errors; the adapter attaches them to the
/// exchange before reporting completion, so wrapping elements observe them
/// the same way they observe errors attached by callback-style handlers.
#[async_trait]
pub trait Service: Send + Sync {
    async fn call(&self, exchange: Arc<Exchange>) -> Result<()>;
}

/// Adapter exposing a [`Service`] as a pipeline [`Handler`].
///
/// The call is spawned onto the tokio runtime and completion is always
/// reported with `done_sync = false` from the spawned task. Must be invoked
/// from within a runtime context.
pub struct ServiceHandler<S> {
    service: Arc<S>,
}

impl<S> ServiceHandler<S> {
    pub fn new(service: S) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

impl<S: Service + 'static> Handler for ServiceHandler<S> {
    fn process(&self, exchange: Arc<Exchange>, callback: Arc<dyn Completion>) -> bool {
        let service = Arc::clone(&self.service);
        tokio::spawn(async move {
            if let Err(err) = service.call(Arc::clone(&exchange)).await {
                exchange.set_error(err);
            }
            callback.done(false);
        });
        false
    }
}
