//! Feeder client: authentication, token caching and retries.

use crate::config::RetryConfig;
use crate::error::{SyncError, SyncResult};
use crate::http::{HttpClient, HttpFailure};
use crate::pause::{Pause, ThreadPause};
use crate::secret::CredentialProvider;
use crate::transport::FeederTransport;
use feedsync_protocol::{Action, FeederRequest, FeederResponse};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, error, warn};

#[derive(Debug, Default)]
struct Session {
    url: Option<String>,
    token: Option<String>,
    /// Set once authentication was rejected; every later call fails closed.
    auth_failure: Option<String>,
}

/// Client for the feeder endpoint.
///
/// The bearer token is cached for the lifetime of the client. Only
/// connection-level failures are retried; everything else propagates
/// immediately.
pub struct FeederClient<C: HttpClient> {
    http: C,
    credentials: Arc<dyn CredentialProvider>,
    retry: RetryConfig,
    pause: Arc<dyn Pause>,
    session: RwLock<Session>,
}

impl<C: HttpClient> FeederClient<C> {
    /// Creates a client.
    pub fn new(http: C, credentials: Arc<dyn CredentialProvider>, retry: RetryConfig) -> Self {
        Self {
            http,
            credentials,
            retry,
            pause: Arc::new(ThreadPause),
            session: RwLock::new(Session::default()),
        }
    }

    /// Replaces the pause used for backoff.
    pub fn with_pause(mut self, pause: Arc<dyn Pause>) -> Self {
        self.pause = pause;
        self
    }

    /// Returns true if a token is cached.
    pub fn has_token(&self) -> bool {
        self.session.read().token.is_some()
    }

    /// Drops the cached token; the next call authenticates again.
    pub fn invalidate_token(&self) {
        self.session.write().token = None;
    }

    /// Clears all session state, including a latched authentication failure.
    pub fn reset(&self) {
        *self.session.write() = Session::default();
    }

    /// Exchanges the configured credentials for a bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::AuthenticationFailed`] if the feeder rejects
    /// the credentials, or if an earlier authentication was rejected.
    pub fn authenticate(&self) -> SyncResult<String> {
        if let Some(reason) = &self.session.read().auth_failure {
            return Err(SyncError::AuthenticationFailed(reason.clone()));
        }

        let credentials = self.credentials.credentials()?;
        let request =
            FeederRequest::authenticate(&credentials.username, credentials.password.expose());
        let response = self.send(&credentials.url, &request)?;

        let token = if response.is_error() {
            Err(format!(
                "error {}: {}",
                response.error_code, response.error_desc
            ))
        } else {
            response.token().map_err(|e| e.to_string())
        };

        let mut session = self.session.write();
        match token {
            Ok(token) => {
                debug!(url = %credentials.url, "authenticated");
                session.url = Some(credentials.url);
                session.token = Some(token.clone());
                Ok(token)
            }
            Err(reason) => {
                error!(url = %credentials.url, reason = %reason, "authentication rejected");
                session.token = None;
                session.auth_failure = Some(reason.clone());
                Err(SyncError::AuthenticationFailed(reason))
            }
        }
    }

    fn session(&self) -> SyncResult<(String, String)> {
        {
            let session = self.session.read();
            if let (Some(url), Some(token)) = (&session.url, &session.token) {
                return Ok((url.clone(), token.clone()));
            }
        }
        let token = self.authenticate()?;
        let url = self
            .session
            .read()
            .url
            .clone()
            .ok_or_else(|| SyncError::Credentials("feeder url missing".into()))?;
        Ok((url, token))
    }

    fn send(&self, url: &str, request: &FeederRequest) -> SyncResult<FeederResponse> {
        let body = request.encode()?;
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.http.post(url, body.clone()) {
                Ok(bytes) => return Ok(FeederResponse::decode(&bytes)?),
                Err(HttpFailure::Connection(message)) if attempt < max_attempts => {
                    let delay = self.retry.delay_for_attempt(attempt);
                    warn!(
                        action = %request.act,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %message,
                        "connection failed, retrying"
                    );
                    self.pause.pause(delay);
                }
                Err(HttpFailure::Connection(message)) => {
                    error!(
                        action = %request.act,
                        attempts = attempt,
                        error = %message,
                        "retries exhausted"
                    );
                    return Err(SyncError::RetriesExhausted {
                        action: request.act,
                        attempts: attempt,
                        message,
                    });
                }
                Err(other) => {
                    error!(action = %request.act, error = %other, "request failed");
                    return Err(SyncError::transport_fatal(other.to_string()));
                }
            }
        }
    }

    fn dispatch(&self, mut request: FeederRequest) -> SyncResult<FeederResponse> {
        let (url, token) = self.session()?;
        request.set_token(token);
        self.send(&url, &request)
    }
}

fn into_success(response: FeederResponse) -> SyncResult<FeederResponse> {
    if response.is_error() {
        return Err(SyncError::Remote {
            code: response.error_code,
            message: response.error_desc,
        });
    }
    Ok(response)
}

impl<C: HttpClient> FeederTransport for FeederClient<C> {
    fn call(&self, request: FeederRequest) -> SyncResult<FeederResponse> {
        if request.act == Action::Token {
            let token = self.authenticate()?;
            return Ok(FeederResponse::success(serde_json::json!({ "token": token })));
        }

        let action = request.act;
        let response = self.dispatch(request.clone())?;
        if !response.is_token_error() {
            return into_success(response);
        }

        warn!(
            action = %action,
            code = response.error_code,
            "token rejected, re-authenticating"
        );
        self.invalidate_token();
        let response = self.dispatch(request)?;
        if response.is_token_error() {
            return Err(SyncError::AuthenticationFailed(format!(
                "token rejected after re-authentication: {}",
                response.error_desc
            )));
        }
        into_success(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::StaticCredentials;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::time::Duration;

    #[derive(Default)]
    struct ScriptedHttp {
        replies: Mutex<VecDeque<Result<serde_json::Value, HttpFailure>>>,
        bodies: Mutex<Vec<serde_json::Value>>,
    }

    impl ScriptedHttp {
        fn reply(&self, body: serde_json::Value) {
            self.replies.lock().push_back(Ok(body));
        }

        fn fail(&self, failure: HttpFailure) {
            self.replies.lock().push_back(Err(failure));
        }
    }

    impl HttpClient for ScriptedHttp {
        fn post(&self, _url: &str, body: Vec<u8>) -> Result<Vec<u8>, HttpFailure> {
            self.bodies
                .lock()
                .push(serde_json::from_slice(&body).unwrap());
            let reply = self
                .replies
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(HttpFailure::Request("no reply scripted".into())));
            reply.map(|v| serde_json::to_vec(&v).unwrap())
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Duration>>);

    impl Pause for Recorder {
        fn pause(&self, duration: Duration) {
            self.0.lock().push(duration);
        }
    }

    fn client(retry: RetryConfig) -> (FeederClient<Arc<ScriptedHttp>>, Arc<ScriptedHttp>, Arc<Recorder>) {
        let http = Arc::new(ScriptedHttp::default());
        let recorder = Arc::new(Recorder::default());
        let client = FeederClient::new(
            http.clone(),
            Arc::new(StaticCredentials::new("http://feeder/ws", "admin", "secret")),
            retry,
        )
        .with_pause(recorder.clone());
        (client, http, recorder)
    }

    fn token_reply(token: &str) -> serde_json::Value {
        json!({"error_code": 0, "error_desc": "", "data": {"token": token}})
    }

    #[test]
    fn authenticates_once_and_caches_token() {
        let (client, http, _) = client(RetryConfig::no_retry());
        http.reply(token_reply("t1"));
        http.reply(json!({"error_code": 0, "data": []}));
        http.reply(json!({"error_code": 0, "data": []}));

        client.call(FeederRequest::new(Action::Programs)).unwrap();
        client.call(FeederRequest::new(Action::Terms)).unwrap();

        let bodies = http.bodies.lock();
        assert_eq!(bodies.len(), 3);
        assert_eq!(bodies[0]["act"], "GetToken");
        assert_eq!(bodies[0]["username"], "admin");
        assert!(bodies[0].get("token").is_none());
        assert_eq!(bodies[1]["token"], "t1");
        assert_eq!(bodies[2]["token"], "t1");
    }

    #[test]
    fn connection_failures_back_off_then_give_up() {
        let retry = RetryConfig::new(3).with_initial_delay(Duration::from_millis(100));
        let (client, http, recorder) = client(retry);
        http.reply(token_reply("t1"));
        for _ in 0..4 {
            http.fail(HttpFailure::Connection("refused".into()));
        }

        let err = client.call(FeederRequest::new(Action::Programs)).unwrap_err();
        assert!(matches!(
            err,
            SyncError::RetriesExhausted { attempts: 3, .. }
        ));
        assert_eq!(
            *recorder.0.lock(),
            vec![Duration::from_millis(100), Duration::from_millis(200)]
        );
        // token + 3 attempts, never a fourth
        assert_eq!(http.bodies.lock().len(), 4);
    }

    #[test]
    fn status_failures_are_not_retried() {
        let (client, http, recorder) = client(RetryConfig::new(3));
        http.reply(token_reply("t1"));
        http.fail(HttpFailure::Status {
            status: 400,
            message: "bad request".into(),
        });

        let err = client.call(FeederRequest::new(Action::Programs)).unwrap_err();
        assert!(matches!(err, SyncError::Transport { retryable: false, .. }));
        assert!(recorder.0.lock().is_empty());
    }

    #[test]
    fn application_error_is_not_retried() {
        let (client, http, _) = client(RetryConfig::new(3));
        http.reply(token_reply("t1"));
        http.reply(json!({"error_code": 7, "error_desc": "filter invalid", "data": null}));

        let err = client.call(FeederRequest::new(Action::Programs)).unwrap_err();
        assert!(matches!(err, SyncError::Remote { code: 7, .. }));
        assert_eq!(http.bodies.lock().len(), 2);
    }

    #[test]
    fn token_error_reauthenticates_once() {
        let (client, http, _) = client(RetryConfig::no_retry());
        http.reply(token_reply("t1"));
        http.reply(json!({"error_code": 104, "error_desc": "expired", "data": null}));
        http.reply(token_reply("t2"));
        http.reply(json!({"error_code": 0, "data": [{"id_prodi": "P1"}]}));

        let rows = client
            .call(FeederRequest::new(Action::Programs))
            .unwrap()
            .into_rows()
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(http.bodies.lock()[3]["token"], "t2");
    }

    #[test]
    fn repeated_token_error_fails_authentication() {
        let (client, http, _) = client(RetryConfig::no_retry());
        http.reply(token_reply("t1"));
        http.reply(json!({"error_code": 100, "error_desc": "invalid", "data": null}));
        http.reply(token_reply("t2"));
        http.reply(json!({"error_code": 100, "error_desc": "invalid", "data": null}));

        let err = client.call(FeederRequest::new(Action::Programs)).unwrap_err();
        assert!(matches!(err, SyncError::AuthenticationFailed(_)));
    }

    #[test]
    fn rejected_credentials_fail_closed() {
        let (client, http, _) = client(RetryConfig::no_retry());
        http.reply(json!({"error_code": 103, "error_desc": "wrong password", "data": null}));

        let err = client.call(FeederRequest::new(Action::Programs)).unwrap_err();
        assert!(matches!(err, SyncError::AuthenticationFailed(_)));

        let err = client.call(FeederRequest::new(Action::Terms)).unwrap_err();
        assert!(matches!(err, SyncError::AuthenticationFailed(_)));
        assert_eq!(http.bodies.lock().len(), 1);

        client.reset();
        http.reply(token_reply("t1"));
        http.reply(json!({"error_code": 0, "data": []}));
        assert!(client.call(FeederRequest::new(Action::Terms)).is_ok());
    }
}
