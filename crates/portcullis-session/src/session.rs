//! Session types: the records the store keeps for each logged-in caller.
//!
//! A "session" is the server's memory of a successful login. It tracks:
//! - WHO logged in (`username`)
//! - HOW the caller proves it later (the [`SessionToken`] in their cookie)
//! - WHEN it was created and last used (so idle sessions can be swept)

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::SessionError;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for session behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// How long a session may sit idle before the sweeper removes it.
    ///
    /// Default: 30 seconds.
    pub ttl: Duration,

    /// Upper bound on live sessions. Logins beyond this are refused with
    /// [`SessionError::ResourceExhausted`].
    ///
    /// Default: 4096.
    pub max_sessions: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30),
            max_sessions: 4096,
        }
    }
}

impl SessionConfig {
    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// A store that can hold zero sessions could never admit anyone, so
    /// `max_sessions` is raised to at least 1.
    pub fn validated(mut self) -> Self {
        if self.max_sessions == 0 {
            tracing::warn!("max_sessions is 0, raising to 1");
            self.max_sessions = 1;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// SessionToken
// ---------------------------------------------------------------------------

/// The 64-bit identifier carried in the session cookie.
///
/// Always non-zero. Rendered as exactly [`SessionToken::HEX_LEN`]
/// lowercase hex digits; parsing is more lenient and accepts 1–16 hex
/// digits of either case, so `00ab` and `AB` name the same token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionToken(u64);

impl SessionToken {
    /// Width of the external hex form.
    pub const HEX_LEN: usize = 16;

    /// Wraps a raw value. Returns `None` for zero, which is never issued.
    pub fn new(raw: u64) -> Option<Self> {
        (raw != 0).then_some(Self(raw))
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for SessionToken {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // `from_str_radix` tolerates a leading `+`, so check the digits
        // ourselves before handing the string over.
        if s.is_empty()
            || s.len() > Self::HEX_LEN
            || !s.bytes().all(|b| b.is_ascii_hexdigit())
        {
            return Err(SessionError::InvalidToken);
        }
        let raw = u64::from_str_radix(s, 16)
            .map_err(|_| SessionError::InvalidToken)?;
        Self::new(raw).ok_or(SessionError::InvalidToken)
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A single logged-in caller.
///
/// Created by the login gate after a credential match. Lives until it is
/// deleted or the sweeper finds it idle for longer than the TTL.
#[derive(Debug, Clone)]
pub struct Session {
    /// The cookie value naming this session.
    pub token: SessionToken,

    /// When the session was created. Never changes.
    pub created: Instant,

    /// When the session was last found by a lookup.
    ///
    /// Only ever moves forward.
    pub last_used: Instant,

    /// The identity that logged in.
    pub username: String,
}

impl Session {
    pub(crate) fn new(token: SessionToken, username: String, now: Instant) -> Self {
        Self {
            token,
            created: now,
            last_used: now,
            username,
        }
    }

    /// Records activity at `now`. Never moves `last_used` backwards.
    pub(crate) fn touch(&mut self, now: Instant) {
        if now > self.last_used {
            self.last_used = now;
        }
    }

    /// How long the session has been idle as of `now`.
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_used)
    }
}
