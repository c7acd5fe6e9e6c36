//! The session store: every live session, keyed by token.
//!
//! This is the central piece of the session layer. It's responsible for:
//! - Issuing sessions (with fresh, unguessable tokens) after a login
//! - Finding sessions by token, touching them on every hit
//! - Deleting sessions
//! - Sweeping out sessions that have sat idle past the TTL
//!
//! # Concurrency note
//!
//! `SessionStore` is NOT thread-safe by itself: it uses a plain
//! `HashMap`. The server owns one store behind a mutex shared by the
//! login gate and the sweeper; every operation here is a short,
//! non-blocking critical section.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::{Session, SessionConfig, SessionError, SessionToken};

/// How many random draws `create` makes before giving up on finding an
/// unused token. With 64-bit tokens a second draw is already rare.
const MAX_TOKEN_ATTEMPTS: usize = 8;

/// A store shared between the login gate and the sweeper.
pub type SharedStore = Arc<Mutex<SessionStore>>;

/// Holds all live sessions.
///
/// ## Lifecycle
///
/// ```text
/// login ──→ create() ──→ lookup() ──→ lookup() ...
///                           │ (touch)
///                           ▼
///               idle > ttl: sweep() ──→ [gone]
///               or          delete() ──→ [gone]
/// ```
pub struct SessionStore {
    /// All live sessions, keyed by the token in the caller's cookie.
    sessions: HashMap<SessionToken, Session>,

    /// Configuration (TTL, capacity).
    config: SessionConfig,
}

impl SessionStore {
    /// Creates a new, empty store with the given config.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            config: config.validated(),
        }
    }

    /// Creates an empty store wrapped for sharing across tasks.
    pub fn shared(config: SessionConfig) -> SharedStore {
        Arc::new(Mutex::new(Self::new(config)))
    }

    /// Issues a new session for `username`.
    ///
    /// The token comes from the thread-local CSPRNG, which is seeded from
    /// the operating system. Zero and tokens already in use are redrawn.
    ///
    /// # Errors
    /// Returns [`SessionError::ResourceExhausted`] if the store already
    /// holds `max_sessions` sessions or no unused token turned up.
    pub fn create(&mut self, username: &str) -> Result<&Session, SessionError> {
        let live = self.sessions.len();
        if live >= self.config.max_sessions {
            tracing::warn!(live, "session store at capacity, refusing login");
            return Err(SessionError::ResourceExhausted(live));
        }

        let token = self.unused_token().ok_or_else(|| {
            tracing::error!(live, "could not draw an unused session token");
            SessionError::ResourceExhausted(live)
        })?;

        let session = Session::new(token, username.to_owned(), Instant::now());
        // The token is a bearer secret; only swept tokens are ever logged.
        tracing::info!(username, "session created");

        // The token was checked against the map above, so this always
        // inserts.
        Ok(&*self.sessions.entry(token).or_insert(session))
    }

    /// Finds the session named by `token` and marks it as used now.
    ///
    /// Returns `None` if the token is unknown (never issued, deleted, or
    /// swept). The touch is the whole point of the call: a session that
    /// keeps being looked up never goes idle.
    pub fn lookup(&mut self, token: &SessionToken) -> Option<&Session> {
        let session = self.sessions.get_mut(token)?;
        session.touch(Instant::now());
        Some(&*session)
    }

    /// Reads a session without touching it.
    pub fn get(&self, token: &SessionToken) -> Option<&Session> {
        self.sessions.get(token)
    }

    /// Removes a session, returning it if it existed.
    pub fn delete(&mut self, token: &SessionToken) -> Option<Session> {
        let removed = self.sessions.remove(token);
        if let Some(session) = &removed {
            tracing::info!(username = %session.username, "session deleted");
        }
        removed
    }

    /// Removes every session idle for longer than `ttl` as of `now`.
    ///
    /// A session used exactly `ttl` ago survives; one tick later it
    /// doesn't. Returns the removed tokens (already logged).
    pub fn sweep(&mut self, now: Instant, ttl: Duration) -> Vec<SessionToken> {
        let mut removed = Vec::new();

        // `retain` keeps only entries where the closure returns `true`.
        self.sessions.retain(|token, session| {
            if session.idle_for(now) > ttl {
                tracing::info!(
                    %token,
                    username = %session.username,
                    "session timed out"
                );
                removed.push(*token);
                false
            } else {
                true
            }
        });

        removed
    }

    /// Returns the number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if there are no sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// The (validated) configuration this store was built with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn unused_token(&self) -> Option<SessionToken> {
        let mut rng = rand::rng();
        (0..MAX_TOKEN_ATTEMPTS)
            .filter_map(|_| SessionToken::new(rng.random()))
            .find(|token| !self.sessions.contains_key(token))
    }
}

// =========================================================================
// Tests
// =========================================================================
