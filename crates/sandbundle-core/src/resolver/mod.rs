//! Module specifier resolution.
//!
//! Resolves import specifiers to either a key of the virtual file table or an
//! absolute CDN URL.
//!
//! ## Specifier Types
//!
//! - Entry point: must be a file table key as written
//! - Relative: `./utils`, `../lib/foo`
//! - Absolute URL: `https://esm.sh/react`
//! - Bare: `lodash`, `@scope/pkg`, `react-dom/client`, `/src/App`
//!
//! The importer decides the addressing scheme: relative and bare specifiers
//! written inside a CDN module resolve against that module's URL and never
//! touch the file table.

pub mod path;

use rustc_hash::FxHashMap as HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use url::Url;

use crate::config::{BarePolicy, BuildConfig};
use crate::error::BuildError;
use crate::files::FileTable;
use crate::imports::ImportKind;

/// Suffixes tried, in order, when a path does not match a key exactly.
pub const CANDIDATE_EXTENSIONS: &[&str] = &[
    "",
    ".ts",
    ".tsx",
    ".js",
    ".jsx",
    ".css",
    "/index.ts",
    "/index.tsx",
    "/index.js",
    "/index.jsx",
];

/// Namespace tag of an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Key of the virtual file table.
    Virtual,
    /// Absolute URL served by the CDN.
    Cdn,
}

impl Namespace {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Virtual => "virtual",
            Self::Cdn => "cdn",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved module address. The namespace travels with the value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Address {
    Virtual(String),
    Cdn(Url),
}

impl Address {
    #[must_use]
    pub fn namespace(&self) -> Namespace {
        match self {
            Self::Virtual(_) => Namespace::Virtual,
            Self::Cdn(_) => Namespace::Cdn,
        }
    }

    /// The bare path or URL text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Virtual(path) => path,
            Self::Cdn(url) => url.as_str(),
        }
    }

    /// Namespace-qualified key, unique across both namespaces.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}:{}", self.namespace(), self.as_str())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The address of a loaded module and the directory its imports resolve
/// against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionContext {
    Virtual { path: String, dir: String },
    /// `dir` comes from the final response URL, which differs from `url`
    /// after a redirect.
    Cdn { url: Url, dir: Url },
}

impl ResolutionContext {
    /// Context for an address whose content was served from the address
    /// itself (no redirect).
    #[must_use]
    pub fn for_address(address: &Address) -> Self {
        match address {
            Address::Virtual(p) => Self::Virtual {
                path: p.clone(),
                dir: path::dirname(p).to_string(),
            },
            Address::Cdn(url) => Self::Cdn {
                url: url.clone(),
                dir: path::url_dir(url),
            },
        }
    }

    #[must_use]
    pub fn address(&self) -> Address {
        match self {
            Self::Virtual { path, .. } => Address::Virtual(path.clone()),
            Self::Cdn { url, .. } => Address::Cdn(url.clone()),
        }
    }

    #[must_use]
    pub fn namespace(&self) -> Namespace {
        match self {
            Self::Virtual { .. } => Namespace::Virtual,
            Self::Cdn { .. } => Namespace::Cdn,
        }
    }

    /// The importer path or URL, for diagnostics.
    #[must_use]
    pub fn importer(&self) -> &str {
        match self {
            Self::Virtual { path, .. } => path,
            Self::Cdn { url, .. } => url.as_str(),
        }
    }
}

/// Classification of a raw specifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecifierKind {
    EntryPoint,
    Relative,
    AbsoluteUrl,
    Bare,
}

impl SpecifierKind {
    #[must_use]
    pub fn classify(specifier: &str, kind: ImportKind) -> Self {
        if kind == ImportKind::EntryPoint {
            Self::EntryPoint
        } else if specifier.starts_with("./") || specifier.starts_with("../") {
            Self::Relative
        } else if specifier.starts_with("http://") || specifier.starts_with("https://") {
            Self::AbsoluteUrl
        } else {
            Self::Bare
        }
    }
}

/// Outcome of one resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub address: Address,
    /// CDN package a bare specifier would have reached had no local file
    /// matched it.
    pub shadowed: Option<Url>,
}

impl From<Address> for Resolution {
    fn from(address: Address) -> Self {
        Self {
            address,
            shadowed: None,
        }
    }
}

/// Path resolver for one build.
///
/// Resolutions are memoized per `(specifier, importer)`; the memo never
/// changes a result, it only skips repeated probing.
#[derive(Debug)]
pub struct Resolver {
    files: Arc<FileTable>,
    cdn_root: Url,
    bare_policy: BarePolicy,
    cache: RwLock<HashMap<(String, String), Resolution>>,
}

impl Resolver {
    #[must_use]
    pub fn new(files: Arc<FileTable>, config: &BuildConfig) -> Self {
        Self {
            files,
            cdn_root: config.cdn_root.clone(),
            bare_policy: config.bare_policy,
            cache: RwLock::new(HashMap::default()),
        }
    }

    /// Resolve a specifier written in `importer`.
    ///
    /// `importer` is `None` for entry points.
    pub fn resolve(
        &self,
        specifier: &str,
        importer: Option<&ResolutionContext>,
        kind: ImportKind,
    ) -> Result<Address, BuildError> {
        self.resolve_detailed(specifier, importer, kind)
            .map(|resolution| resolution.address)
    }

    /// Like [`Resolver::resolve`], also reporting a CDN package shadowed by a
    /// local file.
    pub fn resolve_detailed(
        &self,
        specifier: &str,
        importer: Option<&ResolutionContext>,
        kind: ImportKind,
    ) -> Result<Resolution, BuildError> {
        let cache_key = (
            specifier.to_string(),
            importer.map(|ctx| ctx.address().key()).unwrap_or_default(),
        );
        if let Some(cached) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&cache_key)
        {
            return Ok(cached.clone());
        }

        let resolution = self.resolve_uncached(specifier, importer, kind)?;
        tracing::debug!(
            specifier,
            importer = importer.map_or("<entry>", ResolutionContext::importer),
            kind = kind.as_str(),
            namespace = %resolution.address.namespace(),
            resolved = %resolution.address,
            "resolved"
        );

        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(cache_key, resolution.clone());
        Ok(resolution)
    }

    fn resolve_uncached(
        &self,
        specifier: &str,
        importer: Option<&ResolutionContext>,
        kind: ImportKind,
    ) -> Result<Resolution, BuildError> {
        match SpecifierKind::classify(specifier, kind) {
            SpecifierKind::EntryPoint => self.resolve_entry(specifier).map(Resolution::from),
            SpecifierKind::Relative => self
                .resolve_relative(specifier, importer)
                .map(Resolution::from),
            SpecifierKind::AbsoluteUrl => match importer {
                Some(ResolutionContext::Cdn { dir, .. }) => join_url(dir, specifier),
                _ => Url::parse(specifier)
                    .map(Address::Cdn)
                    .map_err(|e| BuildError::invalid_url(specifier, specifier, &e)),
            }
            .map(Resolution::from),
            SpecifierKind::Bare => self.resolve_bare(specifier, importer),
        }
    }

    fn resolve_entry(&self, specifier: &str) -> Result<Address, BuildError> {
        if self.files.contains(specifier) {
            Ok(Address::Virtual(specifier.to_string()))
        } else {
            Err(BuildError::entry_not_found(specifier))
        }
    }

    fn resolve_relative(
        &self,
        specifier: &str,
        importer: Option<&ResolutionContext>,
    ) -> Result<Address, BuildError> {
        match importer {
            Some(ResolutionContext::Cdn { dir, .. }) => join_url(dir, specifier),
            Some(ResolutionContext::Virtual { path, dir }) => {
                let target = path::join(dir, specifier);
                self.probe(&target)
                    .map(Address::Virtual)
                    .ok_or_else(|| BuildError::local_file_not_found(specifier, path))
            }
            None => {
                let target = path::normalize(specifier);
                self.probe(&target)
                    .map(Address::Virtual)
                    .ok_or_else(|| BuildError::local_file_not_found(specifier, "<root>"))
            }
        }
    }

    fn resolve_bare(
        &self,
        specifier: &str,
        importer: Option<&ResolutionContext>,
    ) -> Result<Resolution, BuildError> {
        if let Some(ResolutionContext::Cdn { dir, .. }) = importer {
            return join_url(dir, specifier).map(Resolution::from);
        }

        if self.bare_policy == BarePolicy::LocalFirst {
            if let Some(found) = self.probe(&path::normalize(specifier)) {
                let shadowed = if specifier.starts_with('/') {
                    None
                } else {
                    self.cdn_root.join(specifier).ok()
                };
                if let Some(package) = &shadowed {
                    tracing::warn!(
                        specifier,
                        local = %found,
                        package = %package,
                        "bare specifier resolved to a local file instead of a CDN package"
                    );
                }
                return Ok(Resolution {
                    address: Address::Virtual(found),
                    shadowed,
                });
            }
        }

        join_url(&self.cdn_root, specifier).map(Resolution::from)
    }

    /// Try each candidate extension against the file table.
    fn probe(&self, base: &str) -> Option<String> {
        if base.is_empty() {
            return None;
        }
        CANDIDATE_EXTENSIONS.iter().find_map(|ext| {
            let candidate = format!("{base}{ext}");
            self.files.contains(&candidate).then_some(candidate)
        })
    }
}

fn join_url(base: &Url, specifier: &str) -> Result<Address, BuildError> {
    base.join(specifier)
        .map(Address::Cdn)
        .map_err(|e| BuildError::invalid_url(specifier, base.as_str(), &e))
}
