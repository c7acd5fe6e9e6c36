//! Error types for the session layer.

/// Errors that can occur during session management.
///
/// Most of these never reach an HTTP client: the login gate folds
/// authentication failures and unknown tokens into a redirect to the
/// login form. Only [`SessionError::ResourceExhausted`] changes the
/// response a caller sees (a 503).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The identity/secret pair did not match any credential entry.
    #[error("authentication failed for {0:?}")]
    AuthFailed(String),

    /// A new session could not be allocated: the store is at capacity,
    /// or no unused token could be drawn.
    #[error("session store exhausted ({0} live sessions)")]
    ResourceExhausted(usize),

    /// A session token string was empty, too long, not hexadecimal, or zero.
    #[error("invalid session token")]
    InvalidToken,

    /// A credential entry could not be parsed from `identity:secret` form.
    #[error("invalid credential entry: {0}")]
    InvalidCredential(String),

    /// Every slot of the credential table is already taken.
    #[error("credential table is full ({0} entries)")]
    CredentialTableFull(usize),
}
