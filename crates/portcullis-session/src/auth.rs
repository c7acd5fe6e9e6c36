//! Credential checking for the login form.
//!
//! The login gate doesn't care where credentials live; it only needs
//! something implementing [`Authenticator`]. The stock implementation is
//! [`CredentialTable`]: a small, fixed-capacity list of identity/secret
//! pairs filled in at startup and never changed afterwards.
//!
//! Comparison is plain string equality. It is not constant-time.

use std::fmt;
use std::str::FromStr;

use crate::SessionError;

/// Validates an identity/secret pair and returns the accepted username.
///
/// # Trait bounds
///
/// - `Send + Sync` → the authenticator is shared by every request task.
/// - `'static` → it lives as long as the server.
///
/// # Example
///
/// ```rust
/// use portcullis_session::{Authenticator, SessionError};
///
/// /// Accepts a single hard-coded user. Only for tests.
/// struct OnlyAlice;
///
/// impl Authenticator for OnlyAlice {
///     fn authenticate(
///         &self,
///         identity: &str,
///         secret: &str,
///     ) -> Result<String, SessionError> {
///         if identity == "alice" && secret == "hunter2" {
///             Ok(identity.to_string())
///         } else {
///             Err(SessionError::AuthFailed(identity.to_string()))
///         }
///     }
/// }
///
/// assert!(OnlyAlice.authenticate("alice", "hunter2").is_ok());
/// assert!(OnlyAlice.authenticate("alice", "nope").is_err());
/// ```
pub trait Authenticator: Send + Sync + 'static {
    /// Checks the pair.
    ///
    /// # Errors
    /// Returns [`SessionError::AuthFailed`] when the pair is not accepted.
    fn authenticate(&self, identity: &str, secret: &str) -> Result<String, SessionError>;
}

// ---------------------------------------------------------------------------
// Credential
// ---------------------------------------------------------------------------

/// One accepted identity/secret pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub identity: String,
    pub secret: String,
}

impl Credential {
    pub fn new(identity: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            secret: secret.into(),
        }
    }

    fn matches(&self, identity: &str, secret: &str) -> bool {
        self.identity == identity && self.secret == secret
    }
}

// Keep secrets out of logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("identity", &self.identity)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Parses `identity:secret`, splitting at the first `:`.
///
/// The secret may itself contain colons; the identity may not be empty.
impl FromStr for Credential {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((identity, secret)) if !identity.is_empty() => {
                Ok(Self::new(identity, secret))
            }
            _ => Err(SessionError::InvalidCredential(
                "expected identity:secret".into(),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// CredentialTable
// ---------------------------------------------------------------------------

/// A bounded list of accepted credentials.
///
/// Slot 0 always holds the default pair ([`CredentialTable::DEFAULT_IDENTITY`]
/// / [`CredentialTable::DEFAULT_SECRET`]); up to `CAPACITY - 1` more can be
/// pushed during startup. Once the table is handed to the server it is
/// only ever read.
#[derive(Debug, Clone)]
pub struct CredentialTable {
    entries: Vec<Credential>,
}

impl CredentialTable {
    /// Maximum number of entries, default pair included.
    pub const CAPACITY: usize = 5;
    /// Identity of the pre-seeded pair.
    pub const DEFAULT_IDENTITY: &'static str = "portcullis";
    /// Secret of the pre-seeded pair.
    pub const DEFAULT_SECRET: &'static str = "portcullis";

    /// A table holding only the default pair.
    pub fn new() -> Self {
        let mut entries = Vec::with_capacity(Self::CAPACITY);
        entries.push(Credential::new(Self::DEFAULT_IDENTITY, Self::DEFAULT_SECRET));
        Self { entries }
    }

    /// Adds an entry.
    ///
    /// # Errors
    /// Returns [`SessionError::CredentialTableFull`] once all
    /// [`Self::CAPACITY`] slots are taken. The table is left unchanged.
    pub fn push(&mut self, credential: Credential) -> Result<(), SessionError> {
        if self.entries.len() >= Self::CAPACITY {
            return Err(SessionError::CredentialTableFull(Self::CAPACITY));
        }
        tracing::debug!(identity = %credential.identity, "credential added");
        self.entries.push(credential);
        Ok(())
    }

    /// Number of entries, default pair included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false`: the default pair is never removed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact-match check over every entry.
    pub fn contains(&self, identity: &str, secret: &str) -> bool {
        self.entries.iter().any(|c| c.matches(identity, secret))
    }
}

impl Default for CredentialTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Authenticator for CredentialTable {
    fn authenticate(&self, identity: &str, secret: &str) -> Result<String, SessionError> {
        if self.contains(identity, secret) {
            Ok(identity.to_string())
        } else {
            Err(SessionError::AuthFailed(identity.to_string()))
        }
    }
}
