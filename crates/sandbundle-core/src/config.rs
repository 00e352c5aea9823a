use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::BuildError;

/// Default CDN that serves published packages as ES modules.
pub const DEFAULT_CDN_ROOT: &str = "https://esm.sh/";

/// Environment variable to override the CDN root.
pub const CDN_ROOT_ENV: &str = "SANDBUNDLE_CDN_ROOT";

/// How bare specifiers are matched against the file table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BarePolicy {
    /// Probe the file table first; a local file shadows the CDN package.
    #[default]
    LocalFirst,
    /// Bare specifiers always go to the CDN.
    CdnOnly,
}

/// Configuration for one bundler instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Root that bare package specifiers are joined to.
    pub cdn_root: Url,

    /// Bare specifier policy.
    #[serde(default)]
    pub bare_policy: BarePolicy,

    /// Connect timeout for CDN fetches, in milliseconds.
    pub connect_timeout_ms: u64,

    /// Total timeout for one CDN fetch, in milliseconds.
    pub timeout_ms: u64,

    /// User agent sent with CDN requests.
    pub user_agent: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            cdn_root: Url::parse(DEFAULT_CDN_ROOT).expect("default CDN root is a valid URL"),
            bare_policy: BarePolicy::default(),
            connect_timeout_ms: 10_000,
            timeout_ms: 30_000,
            user_agent: concat!("sandbundle/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl BuildConfig {
    /// Create a config using the CDN root from the environment or the default.
    pub fn from_env() -> Result<Self, BuildError> {
        match std::env::var(CDN_ROOT_ENV) {
            Ok(root) if !root.trim().is_empty() => Self::default().with_cdn_root(&root),
            _ => Ok(Self::default()),
        }
    }

    /// Set the CDN root. A trailing slash is added so that joins append.
    pub fn with_cdn_root(mut self, root: &str) -> Result<Self, BuildError> {
        let normalized = if root.ends_with('/') {
            root.to_string()
        } else {
            format!("{root}/")
        };
        self.cdn_root = Url::parse(&normalized)
            .map_err(|e| BuildError::invalid_url(root, "<cdn root>", &e))?;
        Ok(self)
    }

    #[must_use]
    pub fn with_bare_policy(mut self, policy: BarePolicy) -> Self {
        self.bare_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cdn_root() {
        let config = BuildConfig::default();
        assert_eq!(config.cdn_root.as_str(), DEFAULT_CDN_ROOT);
        assert_eq!(config.bare_policy, BarePolicy::LocalFirst);
    }

    #[test]
    fn test_with_cdn_root_adds_trailing_slash() {
        let config = BuildConfig::default()
            .with_cdn_root("https://cdn.example.com/npm")
            .unwrap();
        assert_eq!(config.cdn_root.as_str(), "https://cdn.example.com/npm/");
    }

    #[test]
    fn test_with_cdn_root_rejects_garbage() {
        let err = BuildConfig::default().with_cdn_root("not a url").unwrap_err();
        assert_eq!(err.code, crate::error::codes::INVALID_URL);
    }

    #[test]
    fn test_bare_policy_serde() {
        let json = serde_json::to_string(&BarePolicy::CdnOnly).unwrap();
        assert_eq!(json, "\"cdn-only\"");
    }
}
