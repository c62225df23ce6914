//! Collaborator interfaces
//!
//! The engine reaches every external system through one of these traits.
//! Production handlers live in `flashdeck-effects`; in-memory versions with
//! failure injection live in `flashdeck-testkit`.
//!
//! | Trait | Collaborator |
//! |-------|--------------|
//! | [`KeyValueStorage`] | device-persistent key/value storage |
//! | [`RemoteStore`] | per-user private collection, shared public collection, progress |
//! | [`BridgeSource`] | imported-lexicon CRUD owned by a sibling module |
//! | [`AuthSignal`] | sampled session credential |
//! | [`Clock`] | wall-clock time |

pub mod auth;
pub mod bridge;
pub mod remote;
pub mod storage;
pub mod time;

pub use auth::{AuthSignal, Credential};
pub use bridge::BridgeSource;
pub use remote::{ReclassifyReport, RemoteStore};
pub use storage::{KeyValueStorage, StorageError};
pub use time::Clock;
