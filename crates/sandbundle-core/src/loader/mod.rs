//! Content loading for resolved addresses.
//!
//! Virtual addresses are read from the file table, CDN addresses are fetched.
//! Each loaded module carries the resolution context its own imports resolve
//! against.

mod css;

pub use css::{css_module, js_string};

use std::fmt;
use std::sync::Arc;
use url::Url;

use crate::error::{codes, BuildError};
use crate::fetch::Fetch;
use crate::files::FileTable;
use crate::resolver::path::{dirname, url_dir};
use crate::resolver::{Address, ResolutionContext};

/// Largest slice of an error response body kept in diagnostics.
const MAX_ERROR_BODY: usize = 1024;

/// Transform pipeline a loaded module is tagged for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderKind {
    /// Plain JavaScript.
    Js,
    /// TypeScript with JSX.
    Tsx,
}

impl LoaderKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Js => "js",
            Self::Tsx => "tsx",
        }
    }
}

/// Content of a loaded module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedModule {
    pub contents: String,
    pub loader: LoaderKind,
    /// Context for this module's own imports.
    pub context: ResolutionContext,
}

/// Content loader for one build.
pub struct Loader {
    files: Arc<FileTable>,
    fetcher: Arc<dyn Fetch>,
}

impl fmt::Debug for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader")
            .field("files", &self.files.len())
            .finish_non_exhaustive()
    }
}

impl Loader {
    #[must_use]
    pub fn new(files: Arc<FileTable>, fetcher: Arc<dyn Fetch>) -> Self {
        Self { files, fetcher }
    }

    /// Load an address.
    pub async fn load(&self, address: &Address) -> Result<LoadedModule, BuildError> {
        let module = match address {
            Address::Virtual(path) => self.load_virtual(path)?,
            Address::Cdn(url) => self.load_cdn(url).await?,
        };
        tracing::debug!(
            address = %address,
            namespace = %address.namespace(),
            loader = module.loader.as_str(),
            bytes = module.contents.len(),
            "loaded"
        );
        Ok(module)
    }

    fn load_virtual(&self, path: &str) -> Result<LoadedModule, BuildError> {
        let contents = self
            .files
            .get(path)
            .ok_or_else(|| BuildError::virtual_file_missing(path))?;

        let context = ResolutionContext::Virtual {
            path: path.to_string(),
            dir: dirname(path).to_string(),
        };

        if path.ends_with(".css") {
            return Ok(LoadedModule {
                contents: css_module(contents),
                loader: LoaderKind::Js,
                context,
            });
        }

        Ok(LoadedModule {
            contents: contents.to_string(),
            loader: LoaderKind::Tsx,
            context,
        })
    }

    async fn load_cdn(&self, url: &Url) -> Result<LoadedModule, BuildError> {
        let response = self.fetcher.fetch(url).await.map_err(|err| {
            BuildError::new(codes::FETCH_FAILED, format!("failed to fetch {url}: {err}"))
                .with_path(url.as_str())
        })?;

        if !response.is_success() {
            return Err(BuildError::new(
                codes::FETCH_STATUS,
                format!(
                    "GET {url} returned status {}: {}",
                    response.status,
                    truncate(response.body.trim(), MAX_ERROR_BODY)
                ),
            )
            .with_path(url.as_str()));
        }

        Ok(LoadedModule {
            context: ResolutionContext::Cdn {
                url: url.clone(),
                dir: url_dir(&response.url),
            },
            contents: response.body,
            loader: LoaderKind::Js,
        })
    }
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
