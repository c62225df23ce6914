//! Flashdeck Testing Infrastructure
//!
//! In-memory implementations of every collaborator trait, card fixtures and a
//! [`TestHarness`] that opens engines over shared collaborators.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! flashdeck-testkit = { workspace = true }
//! ```
//!
//! ```rust,ignore
//! let harness = TestHarness::new();
//! let engine = harness.open().await;
//! harness.sign_in();
//! engine.refresh_auth().await;
//! engine.settle().await;
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod bridge;
pub mod clock;
pub mod fixtures;
pub mod harness;
pub mod remote;
pub mod storage;

pub use bridge::MemoryBridge;
pub use clock::ManualClock;
pub use fixtures::*;
pub use harness::{wait_for_cards, wait_for_progress, TestHarness};
pub use remote::{MemoryRemoteStore, RemoteCall};
pub use storage::MemoryStorage;

/// Install a test-writer tracing subscriber honoring `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
