//! Transport layer abstraction for feeder calls.

use crate::error::{SyncError, SyncResult};
use feedsync_protocol::{Action, FeederRequest, FeederResponse};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

/// Issues authenticated calls against the feeder.
///
/// Implementations own authentication and retries. A returned response
/// is always a success: application errors come back as
/// [`SyncError::Remote`].
pub trait FeederTransport: Send + Sync {
    /// Performs one logical call.
    fn call(&self, request: FeederRequest) -> SyncResult<FeederResponse>;
}

impl<T: FeederTransport + ?Sized> FeederTransport for std::sync::Arc<T> {
    fn call(&self, request: FeederRequest) -> SyncResult<FeederResponse> {
        (**self).call(request)
    }
}

enum Reply {
    Response(FeederResponse),
    Failure(String),
}

/// A mock transport for testing.
///
/// Replies are looked up per action: queued one-shot replies first, then
/// the sticky reply set with [`MockTransport::set_response`], then an
/// empty row set.
#[derive(Default)]
pub struct MockTransport {
    queued: Mutex<HashMap<Action, VecDeque<Reply>>>,
    sticky: Mutex<HashMap<Action, FeederResponse>>,
    requests: Mutex<Vec<FeederRequest>>,
}

impl MockTransport {
    /// Creates a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the reply returned whenever nothing is queued for `action`.
    pub fn set_response(&self, action: Action, response: FeederResponse) {
        self.sticky.lock().insert(action, response);
    }

    /// Queues a one-shot reply.
    pub fn push_response(&self, action: Action, response: FeederResponse) {
        self.queued
            .lock()
            .entry(action)
            .or_default()
            .push_back(Reply::Response(response));
    }

    /// Queues a one-shot non-retryable transport failure.
    pub fn push_failure(&self, action: Action, message: impl Into<String>) {
        self.queued
            .lock()
            .entry(action)
            .or_default()
            .push_back(Reply::Failure(message.into()));
    }

    /// Returns every request received so far.
    pub fn requests(&self) -> Vec<FeederRequest> {
        self.requests.lock().clone()
    }

    /// Returns the number of requests received for `action`.
    pub fn calls(&self, action: Action) -> usize {
        self.requests.lock().iter().filter(|r| r.act == action).count()
    }
}

impl FeederTransport for MockTransport {
    fn call(&self, request: FeederRequest) -> SyncResult<FeederResponse> {
        let action = request.act;
        self.requests.lock().push(request);

        let queued = self
            .queued
            .lock()
            .get_mut(&action)
            .and_then(VecDeque::pop_front);
        let response = match queued {
            Some(Reply::Response(response)) => response,
            Some(Reply::Failure(message)) => return Err(SyncError::transport_fatal(message)),
            None => self
                .sticky
                .lock()
                .get(&action)
                .cloned()
                .unwrap_or_else(|| FeederResponse::with_rows(Vec::new())),
        };

        if response.is_error() {
            return Err(SyncError::Remote {
                code: response.error_code,
                message: response.error_desc,
            });
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedsync_protocol::Row;

    #[test]
    fn queued_before_sticky() {
        let transport = MockTransport::new();
        transport.set_response(
            Action::Programs,
            FeederResponse::with_rows(vec![Row::new().with("id_prodi", "P1")]),
        );
        transport.push_response(Action::Programs, FeederResponse::with_rows(Vec::new()));

        let first = transport.call(FeederRequest::new(Action::Programs)).unwrap();
        assert!(first.into_rows().unwrap().is_empty());
        let second = transport.call(FeederRequest::new(Action::Programs)).unwrap();
        assert_eq!(second.into_rows().unwrap().len(), 1);
        assert_eq!(transport.calls(Action::Programs), 2);
    }

    #[test]
    fn application_errors_surface_as_remote() {
        let transport = MockTransport::new();
        transport.push_response(Action::Terms, FeederResponse::error(7, "boom"));
        assert!(matches!(
            transport.call(FeederRequest::new(Action::Terms)),
            Err(SyncError::Remote { code: 7, .. })
        ));
    }

    #[test]
    fn queued_failure() {
        let transport = MockTransport::new();
        transport.push_failure(Action::Courses, "bad gateway");
        let err = transport.call(FeederRequest::new(Action::Courses)).unwrap_err();
        assert!(!err.is_retryable());
        assert!(transport.call(FeederRequest::new(Action::Courses)).is_ok());
    }
}
