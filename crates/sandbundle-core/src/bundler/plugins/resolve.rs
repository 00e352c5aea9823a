//! Resolve hook backed by the path resolver.

use super::super::plugin::{HookResult, Plugin, PluginContext, ResolveArgs};
use crate::resolver::{Address, Resolver};

/// Resolves every specifier to a virtual path or a CDN URL.
#[derive(Debug)]
pub struct ResolvePlugin {
    resolver: Resolver,
}

impl ResolvePlugin {
    #[must_use]
    pub fn new(resolver: Resolver) -> Self {
        Self { resolver }
    }
}

impl Plugin for ResolvePlugin {
    fn name(&self) -> &str {
        "sandbundle:resolve"
    }

    fn resolve_id(&self, args: &ResolveArgs<'_>, ctx: &PluginContext) -> HookResult<Option<Address>> {
        let resolution = self
            .resolver
            .resolve_detailed(args.specifier, args.importer, args.kind)?;
        let address = resolution.address;
        let mut line = format!(
            "resolve {} -> {}:{}",
            args.specifier,
            address.namespace(),
            address
        );
        if let Some(package) = resolution.shadowed {
            line.push_str(&format!(" (shadows cdn:{package})"));
        }
        ctx.log(&line);
        Ok(Some(address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildConfig;
    use crate::files::FileTable;
    use crate::imports::ImportKind;
    use crate::resolver::ResolutionContext;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_resolve_logs_decision() {
        let files: FileTable = [("index.tsx", ""), ("a.ts", "")].into_iter().collect();
        let plugin = ResolvePlugin::new(Resolver::new(Arc::new(files), &BuildConfig::default()));

        let lines = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = Arc::clone(&lines);
        let ctx = PluginContext::new().with_log(Arc::new(move |l: &str| {
            sink.lock().unwrap().push(l.to_string());
        }));

        let importer = ResolutionContext::for_address(&Address::Virtual("index.tsx".into()));
        let args = ResolveArgs {
            specifier: "./a",
            importer: Some(&importer),
            kind: ImportKind::ImportStatement,
        };
        let address = plugin.resolve_id(&args, &ctx).unwrap().unwrap();
        assert_eq!(address, Address::Virtual("a.ts".into()));
        assert_eq!(*lines.lock().unwrap(), vec!["resolve ./a -> virtual:a.ts".to_string()]);
    }

    #[test]
    fn test_local_file_shadowing_package_is_logged() {
        let files: FileTable = [("index.tsx", ""), ("utils.ts", "")].into_iter().collect();
        let plugin = ResolvePlugin::new(Resolver::new(Arc::new(files), &BuildConfig::default()));

        let lines = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = Arc::clone(&lines);
        let ctx = PluginContext::new().with_log(Arc::new(move |l: &str| {
            sink.lock().unwrap().push(l.to_string());
        }));

        let importer = ResolutionContext::for_address(&Address::Virtual("index.tsx".into()));
        let args = ResolveArgs {
            specifier: "utils",
            importer: Some(&importer),
            kind: ImportKind::ImportStatement,
        };
        let address = plugin.resolve_id(&args, &ctx).unwrap().unwrap();
        assert_eq!(address, Address::Virtual("utils.ts".into()));
        assert_eq!(
            *lines.lock().unwrap(),
            vec!["resolve utils -> virtual:utils.ts (shadows cdn:https://esm.sh/utils)".to_string()]
        );
    }

    #[test]
    fn test_resolve_error_propagates() {
        let plugin = ResolvePlugin::new(Resolver::new(
            Arc::new(FileTable::new()),
            &BuildConfig::default(),
        ));
        let args = ResolveArgs {
            specifier: "index.tsx",
            importer: None,
            kind: ImportKind::EntryPoint,
        };
        assert!(plugin.resolve_id(&args, &PluginContext::new()).is_err());
    }
}
