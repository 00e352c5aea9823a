#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

pub mod bundler;
pub mod config;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod files;
pub mod imports;
pub mod loader;
pub mod resolver;

pub use bundler::{BuildOptions, BuildResult, Bundler};
pub use config::{BarePolicy, BuildConfig};
pub use error::BuildError;
pub use fetch::{Fetch, FetchError, FetchResponse, HttpFetcher};
pub use files::FileTable;
pub use imports::{scan_imports, ImportKind, ImportSpec};
pub use loader::{LoadedModule, Loader, LoaderKind};
pub use resolver::{Address, Namespace, Resolution, ResolutionContext, Resolver, SpecifierKind};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
