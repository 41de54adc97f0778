//! A scripted, in-process feeder.
//!
//! [`FakeFeeder`] implements [`HttpClient`] and answers the feeder's JSON
//! protocol from in-memory datasets. It issues and checks tokens,
//! evaluates `field = 'value'` filters, pages with limit/offset and can be
//! told to fail upcoming calls.

use feedsync_engine::{HttpClient, HttpFailure};
use feedsync_protocol::{Action, FeederRequest, FeederResponse, Row};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

/// Error code returned for wrong credentials.
pub const BAD_CREDENTIALS: i64 = 103;
/// Error code returned when the token is missing.
pub const MISSING_TOKEN: i64 = 100;
/// Error code returned when the token is unknown or expired.
pub const EXPIRED_TOKEN: i64 = 104;

/// A failure to inject into an upcoming call.
#[derive(Debug, Clone, PartialEq)]
pub enum Injected {
    /// The connection fails; the client retries these.
    Connection(String),
    /// The server answers with an HTTP error status.
    Status(u16),
    /// The feeder answers with an application error.
    AppError(i64, String),
}

/// One request as the fake feeder saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedCall {
    /// Action called.
    pub act: Action,
    /// Token sent, if any.
    pub token: Option<String>,
    /// Filter expression sent, if any.
    pub filter: Option<String>,
    /// Page size, if any.
    pub limit: Option<u32>,
    /// Page offset, if any.
    pub offset: Option<u32>,
}

#[derive(Debug, Default)]
struct State {
    datasets: HashMap<Action, Vec<Row>>,
    injected: HashMap<Action, VecDeque<Injected>>,
    tokens: HashSet<String>,
    issued: u64,
    calls: Vec<LoggedCall>,
}

/// In-process feeder endpoint.
#[derive(Debug)]
pub struct FakeFeeder {
    username: String,
    password: String,
    report_totals: bool,
    state: Mutex<State>,
}

impl FakeFeeder {
    /// Creates a feeder that accepts the given credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            report_totals: false,
            state: Mutex::new(State::default()),
        }
    }

    /// Reports the filtered row count (`jumlah`) with every list response.
    pub fn with_totals(mut self) -> Self {
        self.report_totals = true;
        self
    }

    /// Replaces the rows served for `action`.
    pub fn set_rows(&self, action: Action, rows: Vec<Row>) {
        self.state.lock().datasets.insert(action, rows);
    }

    /// Appends rows to those served for `action`.
    pub fn add_rows(&self, action: Action, rows: impl IntoIterator<Item = Row>) {
        self.state
            .lock()
            .datasets
            .entry(action)
            .or_default()
            .extend(rows);
    }

    /// Makes the next `times` calls of `action` fail with `failure`.
    pub fn fail_next(&self, action: Action, failure: Injected, times: usize) {
        let mut state = self.state.lock();
        let queue = state.injected.entry(action).or_default();
        for _ in 0..times {
            queue.push_back(failure.clone());
        }
    }

    /// Invalidates every issued token.
    pub fn expire_tokens(&self) {
        self.state.lock().tokens.clear();
    }

    /// Returns every call received, tokens included.
    pub fn calls(&self) -> Vec<LoggedCall> {
        self.state.lock().calls.clone()
    }

    /// Returns the calls received for `action`.
    pub fn calls_for(&self, action: Action) -> Vec<LoggedCall> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.act == action)
            .cloned()
            .collect()
    }

    /// Returns the number of tokens issued so far.
    pub fn tokens_issued(&self) -> u64 {
        self.state.lock().issued
    }

    /// Forgets the call log.
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    fn respond(&self, request: FeederRequest) -> Result<FeederResponse, HttpFailure> {
        let mut state = self.state.lock();
        state.calls.push(LoggedCall {
            act: request.act,
            token: request.token.clone(),
            filter: request.filter.clone(),
            limit: request.limit,
            offset: request.offset,
        });

        if let Some(failure) = state
            .injected
            .get_mut(&request.act)
            .and_then(VecDeque::pop_front)
        {
            debug!(action = %request.act, failure = ?failure, "injecting failure");
            return match failure {
                Injected::Connection(message) => Err(HttpFailure::Connection(message)),
                Injected::Status(status) => Err(HttpFailure::Status {
                    status,
                    message: "injected".into(),
                }),
                Injected::AppError(code, desc) => Ok(FeederResponse::error(code, desc)),
            };
        }

        if request.act == Action::Token {
            let username = request.params.get("username").and_then(|v| v.as_str());
            let password = request.params.get("password").and_then(|v| v.as_str());
            if username != Some(self.username.as_str()) || password != Some(self.password.as_str())
            {
                return Ok(FeederResponse::error(BAD_CREDENTIALS, "wrong username or password"));
            }
            state.issued += 1;
            let token = format!("token-{}", state.issued);
            state.tokens.insert(token.clone());
            debug!(token = %token, "token issued");
            return Ok(FeederResponse::success(serde_json::json!({ "token": token })));
        }

        match &request.token {
            None => return Ok(FeederResponse::error(MISSING_TOKEN, "token required")),
            Some(token) if !state.tokens.contains(token) => {
                return Ok(FeederResponse::error(EXPIRED_TOKEN, "token expired"));
            }
            Some(_) => {}
        }

        let clauses = request.filter.as_deref().map(parse_filter).unwrap_or_default();
        let matching: Vec<Row> = state
            .datasets
            .get(&request.act)
            .map(|rows| {
                rows.iter()
                    .filter(|row| {
                        clauses
                            .iter()
                            .all(|(field, value)| row.text(field).as_deref() == Some(value.as_str()))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        let total = matching.len() as u64;
        let offset = request.offset.unwrap_or(0) as usize;
        let page: Vec<Row> = match request.limit {
            Some(limit) => matching.into_iter().skip(offset).take(limit as usize).collect(),
            None => matching.into_iter().skip(offset).collect(),
        };

        let response = FeederResponse::with_rows(page);
        Ok(if self.report_totals {
            response.with_total(total)
        } else {
            response
        })
    }
}

/// Parses `a = 'x' AND b = 'y'` into field/value pairs.
fn parse_filter(filter: &str) -> Vec<(String, String)> {
    filter
        .split(" AND ")
        .filter_map(|clause| {
            let (field, value) = clause.split_once('=')?;
            let value = value.trim().strip_prefix('\'')?.strip_suffix('\'')?;
            Some((field.trim().to_string(), value.replace("''", "'")))
        })
        .collect()
}

impl HttpClient for FakeFeeder {
    fn post(&self, _url: &str, body: Vec<u8>) -> Result<Vec<u8>, HttpFailure> {
        let request =
            FeederRequest::decode(&body).map_err(|e| HttpFailure::Request(e.to_string()))?;
        self.respond(request)?
            .encode()
            .map_err(|e| HttpFailure::Request(e.to_string()))
    }
}
