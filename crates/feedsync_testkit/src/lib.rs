//! # feedsync Testkit
//!
//! Test utilities for feedsync.
//!
//! This crate provides:
//! - [`FakeFeeder`], an in-process feeder speaking the JSON protocol
//! - [`RecordingPause`] to observe backoff and pacing without sleeping
//! - Row fixtures named after the feeder's fields
//! - [`FlakyStore`] to inject store write failures
//! - Property-based generators using proptest
//! - [`Harness`] wiring everything into a ready engine
//!
//! ## Usage
//!
//! ```rust,ignore
//! use feedsync_testkit::prelude::*;
//!
//! #[test]
//! fn programs_sync() {
//!     let harness = Harness::new();
//!     harness.seed_catalogue(3);
//!     let report = harness.engine.sync_programs().unwrap();
//!     assert_eq!(report.inserted, 2);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod feeder;
pub mod fixtures;
pub mod generators;
pub mod harness;
pub mod logging;
pub mod pause;
pub mod store;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::feeder::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::harness::*;
    pub use crate::logging::*;
    pub use crate::pause::*;
    pub use crate::store::*;
}

pub use feeder::{FakeFeeder, Injected, LoggedCall};
pub use harness::{test_config, Harness, TestEngine};
pub use logging::init_test_logging;
pub use pause::RecordingPause;
pub use store::FlakyStore;
