//! Flashdeck Effects - Production Collaborator Handlers
//!
//! Stateless production implementations of the collaborator traits defined in
//! `flashdeck-core`. In-memory handlers with failure injection belong in
//! `flashdeck-testkit`, not here.
//!
//! The remote store and the lexicon bridge have no handler in this crate:
//! both are supplied by the host application, which owns the network SDK and
//! the sibling lexicon module.

#![deny(missing_docs)]
#![forbid(unsafe_code)]

pub mod auth;
pub mod storage;
pub mod time;

pub use auth::SharedCredentialSignal;
pub use storage::FilesystemStorageHandler;
pub use time::SystemClock;
