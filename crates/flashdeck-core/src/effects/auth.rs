//! Session credential signal

use std::fmt;

/// Opaque session credential.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credential(String);

impl Credential {
    /// Wrap a token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token.
    pub fn token(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Whether a valid session credential currently exists.
///
/// The engine samples this on a fixed interval; implementations must be cheap
/// and must not block.
pub trait AuthSignal: Send + Sync {
    /// The current credential, if any.
    fn current_credential(&self) -> Option<Credential>;
}
