//! Host-settable credential signal
//!
//! The host's sign-in flow writes the current credential here; the engine
//! samples it on its polling interval.

use std::sync::Arc;

use flashdeck_core::{AuthSignal, Credential};
use parking_lot::RwLock;

/// Credential slot shared between the host's auth flow and the engine.
///
/// Cloning shares the slot.
#[derive(Debug, Clone, Default)]
pub struct SharedCredentialSignal {
    slot: Arc<RwLock<Option<Credential>>>,
}

impl SharedCredentialSignal {
    /// Empty (signed-out) slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot that starts signed in.
    pub fn signed_in(credential: Credential) -> Self {
        let signal = Self::new();
        signal.sign_in(credential);
        signal
    }

    /// Record a fresh credential.
    pub fn sign_in(&self, credential: Credential) {
        *self.slot.write() = Some(credential);
    }

    /// Forget the credential.
    pub fn sign_out(&self) {
        *self.slot.write() = None;
    }
}

impl AuthSignal for SharedCredentialSignal {
    fn current_credential(&self) -> Option<Credential> {
        self.slot.read().clone()
    }
}
