//! Protocol messages for the feeder endpoint.

use crate::action::Action;
use crate::error::{ProtocolError, ProtocolResult};
use crate::row::Row;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Application error codes that mean the bearer token is missing,
/// malformed or expired.
pub const TOKEN_ERROR_CODES: [i64; 3] = [100, 104, 105];

/// A request to the feeder endpoint.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct FeederRequest {
    /// Action to perform.
    pub act: Action,
    /// Bearer token (absent for authentication).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Free-form filter expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// Ordering expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
    /// Page size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Page offset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    /// Action-specific parameters.
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl FeederRequest {
    /// Creates a request for the given action.
    pub fn new(act: Action) -> Self {
        Self {
            act,
            token: None,
            filter: None,
            order: None,
            limit: None,
            offset: None,
            params: Map::new(),
        }
    }

    /// Creates the authentication request.
    pub fn authenticate(username: &str, password: &str) -> Self {
        Self::new(Action::Token)
            .with_param("username", Value::String(username.to_string()))
            .with_param("password", Value::String(password.to_string()))
    }

    /// Sets the filter expression.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Sets the ordering expression.
    pub fn with_order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    /// Sets the page window.
    pub fn with_page(mut self, limit: u32, offset: u32) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    /// Adds an action-specific parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Attaches the bearer token.
    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    /// Encodes to JSON.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decodes from JSON.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

// Credentials and tokens never reach the logs.
impl fmt::Debug for FeederRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<&str> = self.params.keys().map(String::as_str).collect();
        f.debug_struct("FeederRequest")
            .field("act", &self.act)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("filter", &self.filter)
            .field("order", &self.order)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .field("params", &params)
            .finish()
    }
}

/// A response from the feeder endpoint.
///
/// A non-zero `error_code` signals an application-level failure inside
/// an otherwise successful transport response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeederResponse {
    /// Application error code (0 on success).
    #[serde(default, deserialize_with = "lenient_code")]
    pub error_code: i64,
    /// Application error description.
    #[serde(default)]
    pub error_desc: String,
    /// Payload: an array of rows, a single object, or null.
    #[serde(default)]
    pub data: Value,
    /// Total number of rows matching the request, when the feeder reports it.
    #[serde(default, rename = "jumlah", skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl FeederResponse {
    /// Creates a successful response carrying the given payload.
    pub fn success(data: Value) -> Self {
        Self {
            error_code: 0,
            error_desc: String::new(),
            data,
            total: None,
        }
    }

    /// Creates a successful response carrying rows.
    pub fn with_rows(rows: Vec<Row>) -> Self {
        Self::success(Value::Array(rows.into_iter().map(Row::into_value).collect()))
    }

    /// Creates an application error response.
    pub fn error(code: i64, desc: impl Into<String>) -> Self {
        Self {
            error_code: code,
            error_desc: desc.into(),
            data: Value::Null,
            total: None,
        }
    }

    /// Sets the authoritative total.
    pub fn with_total(mut self, total: u64) -> Self {
        self.total = Some(total);
        self
    }

    /// Returns true if the response signals an application error.
    pub fn is_error(&self) -> bool {
        self.error_code != 0
    }

    /// Returns true if the error means the bearer token was rejected.
    pub fn is_token_error(&self) -> bool {
        TOKEN_ERROR_CODES.contains(&self.error_code)
    }

    /// Extracts the payload rows.
    ///
    /// `null` yields no rows; a single object yields one row.
    pub fn into_rows(self) -> ProtocolResult<Vec<Row>> {
        match self.data {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(map) => Ok(Row::from_map(map)),
                    other => Err(ProtocolError::invalid_structure(format!(
                        "expected row object, got {other}"
                    ))),
                })
                .collect(),
            Value::Object(map) => Ok(vec![Row::from_map(map)]),
            other => Err(ProtocolError::invalid_structure(format!(
                "expected rows, got {other}"
            ))),
        }
    }

    /// Extracts the bearer token from an authentication response.
    pub fn token(&self) -> ProtocolResult<String> {
        self.data
            .get("token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ProtocolError::MissingField("token".into()))
    }

    /// Encodes to JSON.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decodes from JSON.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Accepts the error code as a number, a numeric string or null.
fn lenient_code<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(0),
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| serde::de::Error::custom("error_code out of range")),
        Value::String(s) if s.trim().is_empty() => Ok(0),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid error_code {s:?}"))),
        other => Err(serde::de::Error::custom(format!(
            "invalid error_code {other}"
        ))),
    }
}
