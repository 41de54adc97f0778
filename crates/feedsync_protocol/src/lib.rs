//! # feedsync Protocol
//!
//! Wire types and JSON codecs for the academic feeder API.
//!
//! This crate provides:
//! - [`Action`] names understood by the feeder endpoint
//! - Request/response envelopes ([`FeederRequest`], [`FeederResponse`])
//! - [`Row`] for loosely-typed payload rows with explicit field extraction
//! - [`Filter`] for building the feeder's free-form filter expressions
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod action;
mod error;
mod filter;
mod messages;
mod row;

pub use action::Action;
pub use error::{ProtocolError, ProtocolResult};
pub use filter::Filter;
pub use messages::{FeederRequest, FeederResponse, TOKEN_ERROR_CODES};
pub use row::Row;
