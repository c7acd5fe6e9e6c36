//! Gate and static-file settings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How the login gate recognises requests and names its cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Path of the login form. `POST` to it submits credentials.
    ///
    /// Default: `/login.html`.
    pub login_path: String,

    /// Where a successful login is redirected. Default: `/`.
    pub landing_path: String,

    /// Name of the session cookie. Default: `mgs`.
    pub cookie_name: String,

    /// Path suffixes served without a session. Default: `.js`, `.css`.
    pub public_suffixes: Vec<String>,

    /// Longest accepted `username`/`password` value, in bytes. Default: 49.
    pub max_field_len: usize,

    /// Largest login body read before giving up on it. Default: 4 KiB.
    pub max_form_bytes: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            login_path: "/login.html".to_string(),
            landing_path: "/".to_string(),
            cookie_name: "mgs".to_string(),
            public_suffixes: vec![".js".to_string(), ".css".to_string()],
            max_field_len: 49,
            max_form_bytes: 4096,
        }
    }
}

impl GateConfig {
    /// Clamp out-of-range values so the config is safe to use.
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();
        if !self.login_path.starts_with('/') {
            tracing::warn!(login_path = %self.login_path, "login path must be absolute, using default");
            self.login_path = defaults.login_path;
        }
        if !self.landing_path.starts_with('/') {
            tracing::warn!(landing_path = %self.landing_path, "landing path must be absolute, using default");
            self.landing_path = defaults.landing_path;
        }
        if self.cookie_name.is_empty()
            || !self
                .cookie_name
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
        {
            tracing::warn!(cookie_name = %self.cookie_name, "unusable cookie name, using default");
            self.cookie_name = defaults.cookie_name;
        }
        self.public_suffixes.retain(|s| !s.is_empty());
        if self.max_field_len == 0 {
            self.max_field_len = 1;
        }
        if self.max_form_bytes < self.max_field_len {
            self.max_form_bytes = self.max_field_len;
        }
        self
    }
}

/// Where static files come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticConfig {
    /// Directory served as the site root. Default: `./www`.
    pub document_root: PathBuf,

    /// File served for paths ending in `/`. Default: `index.html`.
    pub index_file: String,
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            document_root: PathBuf::from("./www"),
            index_file: "index.html".to_string(),
        }
    }
}

impl StaticConfig {
    /// Serve `document_root` with the default index file.
    pub fn with_root(document_root: impl Into<PathBuf>) -> Self {
        Self {
            document_root: document_root.into(),
            ..Default::default()
        }
    }

    /// Clamp out-of-range values so the config is safe to use.
    pub fn validated(mut self) -> Self {
        let index = self.index_file.trim_matches('/');
        if index.is_empty() || index.contains('/') {
            tracing::warn!(index_file = %self.index_file, "index file must be a plain file name, using default");
            self.index_file = Self::default().index_file;
        } else if index.len() != self.index_file.len() {
            self.index_file = index.to_string();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_defaults() {
        let cfg = GateConfig::default();
        assert_eq!(cfg.login_path, "/login.html");
        assert_eq!(cfg.cookie_name, "mgs");
        assert_eq!(cfg.public_suffixes, [".js", ".css"]);
        assert_eq!(cfg.max_field_len, 49);
    }

    #[test]
    fn test_gate_validated_restores_bad_values() {
        let cfg = GateConfig {
            login_path: "login.html".into(),
            cookie_name: "bad name;".into(),
            public_suffixes: vec![String::new(), ".png".into()],
            max_field_len: 0,
            max_form_bytes: 0,
            ..Default::default()
        }
        .validated();

        assert_eq!(cfg.login_path, "/login.html");
        assert_eq!(cfg.cookie_name, "mgs");
        assert_eq!(cfg.public_suffixes, [".png"]);
        assert_eq!(cfg.max_field_len, 1);
        assert_eq!(cfg.max_form_bytes, 1);
    }

    #[test]
    fn test_static_validated_strips_slashes() {
        let cfg = StaticConfig {
            index_file: "/home.html".into(),
            ..Default::default()
        }
        .validated();
        assert_eq!(cfg.index_file, "home.html");
    }

    #[test]
    fn test_static_validated_rejects_nested_index() {
        let cfg = StaticConfig {
            index_file: "a/b.html".into(),
            ..Default::default()
        }
        .validated();
        assert_eq!(cfg.index_file, "index.html");
    }
}
