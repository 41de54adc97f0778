//! # feedsync Engine
//!
//! Pulls academic records from a feeder API into a local store.
//!
//! This crate provides:
//! - A feeder client with token caching and exponential backoff
//! - Remote-id to local-id resolution for foreign keys
//! - Idempotent create-or-update reconciliation with per-row isolation
//! - A batch controller for offset-paged and per-anchor resources
//! - Lecturer backfill for enrollment lines
//!
//! ## Architecture
//!
//! Every resource is described by a static [`ResourceSpec`]: the remote
//! action that lists it, the local kind it is stored as, the kinds it
//! depends on and how its rows map. One routine drives them all:
//! 1. Build resolver maps; refuse to run if a required map is empty
//! 2. Fetch rows (bulk, one page, or one call per anchor)
//! 3. Map each row, then insert, update or skip it
//! 4. Report counts, row errors and where the next batch starts
//!
//! ## Key Invariants
//!
//! - The feeder is authoritative
//! - Re-running a sync is always safe; unchanged rows are skipped
//! - A row never lands with a dangling required reference
//! - Only connection failures are retried
//! - One bad row never aborts a batch
//! - Enrollment lines of a header mirror the feeder exactly

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backfill;
mod batch;
mod client;
mod config;
mod detail;
mod engine;
mod enrollment;
mod error;
mod http;
mod mapping;
mod pause;
mod reconcile;
mod report;
mod resolver;
mod resource;
mod secret;
mod term;
mod transport;

pub use backfill::{LecturerBackfill, SectionLecturer};
pub use client::FeederClient;
pub use config::{RetryConfig, SyncConfig};
pub use engine::SyncEngine;
pub use error::{SyncError, SyncResult};
#[cfg(feature = "reqwest-client")]
pub use http::ReqwestClient;
pub use http::{HttpClient, HttpFailure};
pub use mapping::{MapContext, MapFn, Mapped, Mapping, RELIGION, STUDENT_STATUS};
pub use pause::{Pacer, Pause, ThreadPause};
pub use reconcile::upsert;
pub use report::{progress_percent, BatchReport, Outcome, RowError, SyncReport};
pub use resolver::{ResolverMap, Resolvers};
pub use resource::{Fold, Paging, Resource, ResourceSpec};
pub use secret::{
    CredentialCipher, CredentialProvider, EncryptedCredentials, FeederCredentials, SecretString,
    StaticCredentials,
};
pub use term::{parse_parity, parse_year, Parity, TermWindow};
pub use transport::{FeederTransport, MockTransport};
