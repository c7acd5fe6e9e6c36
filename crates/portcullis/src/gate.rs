//! The login gate: per-request authentication decision.
//!
//! Every request is evaluated in a fixed order:
//!
//! 1. **Public asset**: the path ends in a public suffix (`.js`, `.css`).
//!    Admitted without looking at sessions.
//! 2. **Login endpoint**: `GET` (and anything but `POST`) is admitted so
//!    the form can be shown. `POST` carries `username`/`password`; a match
//!    creates a session and answers with a redirect plus cookie. A
//!    mismatch falls through to step 3.
//! 3. **Session check**: the session cookie must name a live session.
//!    Otherwise the caller is sent to the login form.
//!
//! The gate never tells a caller *why* a login failed.

use std::sync::Arc;

use headers::{Cookie, HeaderMapExt};
use http::{HeaderMap, Method};
use portcullis_session::{Authenticator, CredentialTable, SessionError, SessionToken, SharedStore};
use crate::GateConfig;

/// Which branch of the gate a request takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Path ends in a public suffix.
    PublicAsset,
    /// The login path with any method except `POST`.
    LoginForm,
    /// `POST` to the login path.
    LoginSubmit,
    /// Everything else; needs a live session.
    Protected,
}

/// What to do with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Hand the request on to the file service.
    Admit,
    /// Credentials matched; redirect to the landing page and set the cookie.
    LoginSucceeded { token: SessionToken },
    /// No live session; redirect to the login form.
    RedirectToLogin,
    /// Credentials matched but no session could be created.
    Unavailable,
}

/// The two login fields. When a key repeats, its first value wins.
#[derive(Debug, Default)]
struct LoginForm {
    username: String,
    password: String,
}

impl LoginForm {
    fn parse(body: &[u8]) -> Self {
        let pairs = match serde_urlencoded::from_bytes::<Vec<(String, String)>>(body) {
            Ok(pairs) => pairs,
            Err(e) => {
                tracing::debug!(error = %e, "unreadable login form");
                return Self::default();
            }
        };

        let first = |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .unwrap_or_default()
        };
        Self {
            username: first("username"),
            password: first("password"),
        }
    }
}

/// Decides, per request, whether the caller is logged in.
///
/// Holds the credential source by value; it cannot change once the gate
/// exists. The session store is shared with the sweeper.
pub struct LoginGate<A = CredentialTable> {
    config: GateConfig,
    credentials: A,
    store: SharedStore,
}

impl<A: Authenticator> LoginGate<A> {
    pub fn new(config: GateConfig, credentials: A, store: SharedStore) -> Self {
        Self {
            config: config.validated(),
            credentials,
            store,
        }
    }

    /// Wraps the gate for sharing with the HTTP middleware.
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Picks the gate branch for `method` and `path`. Pure; no session
    /// state is read.
    pub fn classify(&self, method: &Method, path: &str) -> Route {
        if self
            .config
            .public_suffixes
            .iter()
            .any(|suffix| path.ends_with(suffix.as_str()))
        {
            Route::PublicAsset
        } else if path == self.config.login_path {
            if method == Method::POST {
                Route::LoginSubmit
            } else {
                Route::LoginForm
            }
        } else {
            Route::Protected
        }
    }

    /// Handles a login form body.
    ///
    /// # Errors
    /// - [`SessionError::AuthFailed`] if a field is missing, empty, too
    ///   long, or the pair does not match.
    /// - [`SessionError::ResourceExhausted`] if the pair matched but the
    ///   store could not take another session.
    pub async fn login(&self, body: &[u8]) -> Result<SessionToken, SessionError> {
        let form = LoginForm::parse(body);

        let (Some(username), Some(password)) = (self.field(&form.username), self.field(&form.password))
        else {
            tracing::debug!("login form is missing a field");
            return Err(SessionError::AuthFailed(form.username));
        };

        let username = self.credentials.authenticate(username, password).inspect_err(|_| {
            tracing::info!(username, "login rejected");
        })?;

        let mut store = self.store.lock().await;
        let token = store.create(&username)?.token;
        Ok(token)
    }

    /// Whether the request's cookie names a live session. A hit touches
    /// the session.
    pub async fn check_session(&self, headers: &HeaderMap) -> bool {
        let Some(token) = self.session_token(headers) else {
            return false;
        };
        self.store.lock().await.lookup(&token).is_some()
    }

    /// Runs the full decision for one request.
    ///
    /// `body` is only read for [`Route::LoginSubmit`]; pass an empty
    /// slice otherwise.
    pub async fn evaluate(
        &self,
        method: &Method,
        path: &str,
        headers: &HeaderMap,
        body: &[u8],
    ) -> GateDecision {
        match self.classify(method, path) {
            Route::PublicAsset | Route::LoginForm => return GateDecision::Admit,
            Route::LoginSubmit => match self.login(body).await {
                Ok(token) => return GateDecision::LoginSucceeded { token },
                Err(e @ SessionError::ResourceExhausted(_)) => {
                    tracing::warn!(error = %e, "login accepted but no session available");
                    return GateDecision::Unavailable;
                }
                Err(_) => {}
            },
            Route::Protected => {}
        }

        if self.check_session(headers).await {
            GateDecision::Admit
        } else {
            tracing::debug!(path, "no live session, redirecting to login");
            GateDecision::RedirectToLogin
        }
    }

    /// The `Set-Cookie` value for a freshly issued token.
    pub fn cookie_for(&self, token: SessionToken) -> String {
        format!("{}={token}; path=/", self.config.cookie_name)
    }

    fn session_token(&self, headers: &HeaderMap) -> Option<SessionToken> {
        let cookie = headers.typed_get::<Cookie>()?;
        cookie.get(&self.config.cookie_name)?.parse().ok()
    }

    fn field<'a>(&self, value: &'a str) -> Option<&'a str> {
        (!value.is_empty() && value.len() <= self.config.max_field_len).then_some(value)
    }
}
