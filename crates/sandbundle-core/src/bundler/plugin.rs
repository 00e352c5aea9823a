//! Plugin system for the build host.
//!
//! The host knows nothing about file tables or CDNs; it calls `resolve_id`
//! and `load` on its plugins and takes the first answer. Resolution and
//! loading are themselves plugins (see [`super::plugins`]).
//!
//! ## Example
//!
//! ```ignore
//! use sandbundle_core::bundler::{HookResult, Plugin, PluginContext};
//! use sandbundle_core::Address;
//!
//! struct Banner;
//!
//! impl Plugin for Banner {
//!     fn name(&self) -> &str { "banner" }
//!
//!     fn transform(&self, code: &str, _address: &Address, _ctx: &PluginContext) -> HookResult<Option<String>> {
//!         Ok(Some(format!("/* built with sandbundle */\n{code}")))
//!     }
//! }
//! ```

#![allow(clippy::unnecessary_literal_bound)]

use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

use crate::error::{codes, BuildError};
use crate::imports::ImportKind;
use crate::loader::LoadedModule;
use crate::resolver::{Address, ResolutionContext};

/// Result type for plugin hooks.
pub type HookResult<T> = Result<T, BuildError>;

/// Progress callback. Receives one human-readable line per event.
pub type LogFn = Arc<dyn Fn(&str) + Send + Sync>;

/// Context passed to plugin hooks.
#[derive(Clone, Default)]
pub struct PluginContext {
    log: Option<LogFn>,
}

impl fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginContext")
            .field("log", &self.log.is_some())
            .finish()
    }
}

impl PluginContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_log(mut self, log: LogFn) -> Self {
        self.log = Some(log);
        self
    }

    /// Report a progress line to the host.
    pub fn log(&self, message: &str) {
        if let Some(log) = &self.log {
            log(message);
        }
    }
}

/// Arguments of the resolve hook.
#[derive(Debug, Clone, Copy)]
pub struct ResolveArgs<'a> {
    pub specifier: &'a str,
    /// `None` for entry points.
    pub importer: Option<&'a ResolutionContext>,
    pub kind: ImportKind,
}

/// The plugin trait.
///
/// Every hook defaults to "not handled", so plugins implement only what they
/// need.
pub trait Plugin: Send + Sync {
    /// Plugin name for diagnostics.
    fn name(&self) -> &str;

    /// Called once before the graph walk.
    fn build_start(&self, _ctx: &PluginContext) -> HookResult<()> {
        Ok(())
    }

    /// Resolve a specifier. `Ok(None)` passes to the next plugin.
    fn resolve_id(
        &self,
        _args: &ResolveArgs<'_>,
        _ctx: &PluginContext,
    ) -> HookResult<Option<Address>> {
        Ok(None)
    }

    /// Load an address. `Ok(None)` passes to the next plugin.
    fn load<'a>(
        &'a self,
        _address: &'a Address,
        _ctx: &'a PluginContext,
    ) -> BoxFuture<'a, HookResult<Option<LoadedModule>>> {
        Box::pin(async { Ok(None) })
    }

    /// Transform loaded source. Transforms chain across plugins.
    fn transform(
        &self,
        _code: &str,
        _address: &Address,
        _ctx: &PluginContext,
    ) -> HookResult<Option<String>> {
        Ok(None)
    }

    /// Called once after a successful graph walk.
    fn build_end(&self, _ctx: &PluginContext) -> HookResult<()> {
        Ok(())
    }
}

/// Ordered plugin list. Plugins run in insertion order.
#[derive(Default)]
pub struct PluginContainer {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl fmt::Debug for PluginContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.plugins.iter().map(|p| p.name()))
            .finish()
    }
}

impl PluginContainer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, plugin: Box<dyn Plugin>) {
        self.plugins.push(Arc::from(plugin));
    }

    /// Add a plugin that is shared with other containers.
    pub fn add_shared(&mut self, plugin: Arc<dyn Plugin>) {
        self.plugins.push(plugin);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.plugins.iter().map(|p| p.name())
    }

    pub fn build_start(&self, ctx: &PluginContext) -> HookResult<()> {
        for plugin in &self.plugins {
            plugin.build_start(ctx)?;
        }
        Ok(())
    }

    /// First plugin that resolves wins.
    pub fn resolve_id(&self, args: &ResolveArgs<'_>, ctx: &PluginContext) -> HookResult<Address> {
        for plugin in &self.plugins {
            if let Some(address) = plugin.resolve_id(args, ctx)? {
                return Ok(address);
            }
        }
        let importer = args.importer.map_or("<entry>", ResolutionContext::importer);
        Err(BuildError::new(
            codes::UNRESOLVED,
            format!("no plugin resolved '{}' imported from '{importer}'", args.specifier),
        )
        .with_path(args.specifier))
    }

    /// First plugin that loads wins.
    pub async fn load(&self, address: &Address, ctx: &PluginContext) -> HookResult<LoadedModule> {
        for plugin in &self.plugins {
            if let Some(module) = plugin.load(address, ctx).await? {
                return Ok(module);
            }
        }
        Err(BuildError::new(
            codes::UNLOADED,
            format!("no plugin loaded {}:{address}", address.namespace()),
        )
        .with_path(address.as_str()))
    }

    /// Chain every transform; each plugin sees the previous output.
    pub fn transform(&self, code: &str, address: &Address, ctx: &PluginContext) -> HookResult<String> {
        let mut current = code.to_string();
        for plugin in &self.plugins {
            if let Some(transformed) = plugin.transform(&current, address, ctx)? {
                current = transformed;
            }
        }
        Ok(current)
    }

    pub fn build_end(&self, ctx: &PluginContext) -> HookResult<()> {
        for plugin in &self.plugins {
            plugin.build_end(ctx)?;
        }
        Ok(())
    }
}

/// Error helper for third-party plugins.
#[must_use]
pub fn plugin_error(plugin: &str, hook: &str, message: impl fmt::Display) -> BuildError {
    BuildError::new(codes::PLUGIN_ERROR, format!("[{plugin}] {hook}: {message}"))
}
