//! The exchange is the unit of work flowing through a pipeline.

use crate::error::{Error, ErrorKind};
use serde_json::Value;
use std::sync::Mutex;
use uuid::Uuid;

/// A single request travelling through the pipeline.
///
/// An exchange is shared between the submitting caller, the handler it is
/// routed to and any armed completions (`Arc<Exchange>`), and the handler may
/// finish it from another thread, so the error slot sits behind a mutex. The
/// body is fixed once the exchange is created; the error slot is the only
/// mutable part.
#[derive(Debug)]
pub struct Exchange {
    id: Uuid,
    body: Value,
    error: Mutex<Option<Error>>,
}

impl Exchange {
    pub fn new(body: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            body,
            error: Mutex::new(None),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Attach an error, replacing any error already present.
    pub fn set_error(&self, error: Error) {
        *self.error.lock().unwrap() = Some(error);
    }

    /// Attach an error only if the exchange is still clean.
    pub fn set_error_if_absent(&self, error: Error) {
        let mut slot = self.error.lock().unwrap();
        if slot.is_none() {
            *slot = Some(error);
        }
    }

    pub fn has_error(&self) -> bool {
        self.error.lock().unwrap().is_some()
    }

    /// True if the attached error, or anything in its source chain,
    /// classifies as `kind`.
    pub fn error_matches(&self, kind: ErrorKind) -> bool {
        self.error
            .lock()
            .unwrap()
            .as_ref()
            .map(|err| err.matches_kind(kind))
            .unwrap_or(false)
    }

    /// Borrow the attached error for the duration of `f`.
    pub fn peek_error<R>(&self, f: impl FnOnce(Option<&Error>) -> R) -> R {
        f(self.error.lock().unwrap().as_ref())
    }

    /// Remove and return the attached error.
    pub fn take_error(&self) -> Option<Error> {
        self.error.lock().unwrap().take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_error_overwrites() {
        let exchange = Exchange::new(json!({"route": "orders"}));
        exchange.set_error(Error::timeout("first"));
        exchange.set_error(Error::upstream("second"));
        assert!(exchange.error_matches(ErrorKind::Upstream));
        assert!(!exchange.error_matches(ErrorKind::Timeout));
    }

    #[test]
    fn test_set_error_if_absent_keeps_existing() {
        let exchange = Exchange::new(json!({}));
        exchange.set_error(Error::timeout("original"));
        exchange.set_error_if_absent(Error::NotRunnable);
        assert!(exchange.error_matches(ErrorKind::Timeout));
        assert!(!exchange.error_matches(ErrorKind::NotRunnable));

        let clean = Exchange::new(json!({}));
        clean.set_error_if_absent(Error::NotRunnable);
        assert!(clean.error_matches(ErrorKind::NotRunnable));
    }

    #[test]
    fn test_error_matches_through_cause_chain() {
        let exchange = Exchange::new(json!({}));
        exchange.set_error(Error::upstream_with_source(
            "backend call failed",
            Error::timeout("2s deadline"),
        ));
        assert!(exchange.error_matches(ErrorKind::Timeout));
    }

    #[test]
    fn test_take_error_drains_slot() {
        let exchange = Exchange::new(json!({}));
        exchange.set_error(Error::upstream("boom"));
        assert!(exchange.take_error().is_some());
        assert!(!exchange.has_error());
        assert!(exchange.take_error().is_none());
    }
}
