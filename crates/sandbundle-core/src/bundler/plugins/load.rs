//! Load hook backed by the content loader.

use futures::future::BoxFuture;

use super::super::plugin::{HookResult, Plugin, PluginContext};
use crate::loader::{LoadedModule, Loader};
use crate::resolver::Address;

/// Loads virtual files from the file table and CDN modules over HTTP.
#[derive(Debug)]
pub struct LoadPlugin {
    loader: Loader,
}

impl LoadPlugin {
    #[must_use]
    pub fn new(loader: Loader) -> Self {
        Self { loader }
    }
}

impl Plugin for LoadPlugin {
    fn name(&self) -> &str {
        "sandbundle:load"
    }

    fn load<'a>(
        &'a self,
        address: &'a Address,
        ctx: &'a PluginContext,
    ) -> BoxFuture<'a, HookResult<Option<LoadedModule>>> {
        Box::pin(async move {
            ctx.log(&format!("load {}:{}", address.namespace(), address));
            let module = self.loader.load(address).await?;
            Ok(Some(module))
        })
    }
}
