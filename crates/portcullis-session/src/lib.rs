//! Session management for Portcullis.
//!
//! This crate handles the lifecycle of a logged-in caller:
//!
//! 1. **Authentication**: checking an identity/secret pair
//!    ([`Authenticator`] trait, [`CredentialTable`])
//! 2. **Session issuance**: minting an unguessable [`SessionToken`]
//!    ([`SessionStore::create`])
//! 3. **Lookup**: finding a session from its cookie token and touching it
//!    ([`SessionStore::lookup`])
//! 4. **Expiry**: removing sessions idle past the TTL
//!    ([`SessionStore::sweep`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Login gate (above)  ← asks "is this caller logged in?" per request
//!     ↕
//! Session layer (this crate)  ← owns sessions and credentials
//!     ↕
//! Sweeper (beside)  ← periodically calls `sweep` on the same store
//! ```

mod auth;
mod error;
mod session;
mod store;

pub use auth::{Authenticator, Credential, CredentialTable};
pub use error::SessionError;
pub use session::{Session, SessionConfig, SessionToken};
pub use store::{SessionStore, SharedStore};
