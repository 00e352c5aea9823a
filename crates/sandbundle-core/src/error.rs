//! Build error types.
//!
//! Every failure during resolve, load or emit is fatal to the current build.
//! The host turns a [`BuildError`] into the single `error` string of the
//! build result.

use std::fmt;

/// Stable build error codes.
pub mod codes {
    /// The entry point is not a key of the file table.
    pub const ENTRY_NOT_FOUND: &str = "ENTRY_NOT_FOUND";
    /// A relative or local specifier matched none of the candidate extensions.
    pub const LOCAL_FILE_NOT_FOUND: &str = "LOCAL_FILE_NOT_FOUND";
    /// A CDN address could not be formed from the specifier.
    pub const INVALID_URL: &str = "INVALID_URL";
    /// The network request itself failed.
    pub const FETCH_FAILED: &str = "FETCH_FAILED";
    /// The CDN answered with a non-success status.
    pub const FETCH_STATUS: &str = "FETCH_STATUS";
    /// A virtual address vanished between resolve and load.
    pub const VIRTUAL_FILE_MISSING: &str = "VIRTUAL_FILE_MISSING";
    /// No plugin resolved a specifier.
    pub const UNRESOLVED: &str = "UNRESOLVED";
    /// No plugin loaded an address.
    pub const UNLOADED: &str = "UNLOADED";
    /// A plugin hook failed.
    pub const PLUGIN_ERROR: &str = "PLUGIN_ERROR";
    /// The process-wide engine could not be initialized.
    pub const ENGINE_INIT_FAILED: &str = "ENGINE_INIT_FAILED";
}

/// A fatal build error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildError {
    pub code: &'static str,
    pub message: String,
    /// The offending specifier, path or URL, when there is one.
    pub path: Option<String>,
}

impl BuildError {
    #[must_use]
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn entry_not_found(entry: &str) -> Self {
        Self::new(
            codes::ENTRY_NOT_FOUND,
            format!("entry point not found: {entry}"),
        )
        .with_path(entry)
    }

    #[must_use]
    pub fn local_file_not_found(specifier: &str, importer: &str) -> Self {
        Self::new(
            codes::LOCAL_FILE_NOT_FOUND,
            format!("could not resolve local file '{specifier}' imported from '{importer}'"),
        )
        .with_path(specifier)
    }

    #[must_use]
    pub fn invalid_url(specifier: &str, base: &str, err: &url::ParseError) -> Self {
        Self::new(
            codes::INVALID_URL,
            format!("cannot form a URL from '{specifier}' against '{base}': {err}"),
        )
        .with_path(specifier)
    }

    #[must_use]
    pub fn virtual_file_missing(path: &str) -> Self {
        Self::new(
            codes::VIRTUAL_FILE_MISSING,
            format!("virtual file disappeared before load: {path}"),
        )
        .with_path(path)
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(path) = &self.path {
            write!(f, "{}: {} ({})", self.code, self.message, path)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

impl std::error::Error for BuildError {}
