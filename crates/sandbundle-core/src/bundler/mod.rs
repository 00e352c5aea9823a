//! In-browser style bundler host.
//!
//! Walks the module graph from the entry points through the plugin hooks and
//! emits a single module-registry bundle.
//!
//! ## Usage
//!
//! ```ignore
//! use sandbundle_core::{BuildConfig, BuildOptions, Bundler, FileTable};
//!
//! let files: FileTable = [("index.tsx", "import './a'"), ("a.ts", "")].into_iter().collect();
//! let result = Bundler::new(BuildConfig::default())
//!     .build(BuildOptions::new(files).entry("index.tsx"))
//!     .await;
//! ```
//!
//! ## Architecture
//!
//! 1. **Resolve** - entry points, then every scanned specifier
//! 2. **Load** - one breadth-first layer at a time, concurrently
//! 3. **Transform** - chained plugin transforms (e.g. `define`)
//! 4. **Emit** - modules in dependency order, entries required last

mod emit;
mod graph;
mod plugin;
pub mod plugins;

pub use emit::emit_bundle;
pub use graph::{Module, ModuleGraph, ModuleId};
pub use plugin::{
    plugin_error, HookResult, LogFn, Plugin, PluginContainer, PluginContext, ResolveArgs,
};
pub use plugins::{DefinePlugin, LoadPlugin, ResolvePlugin};

use futures::future::try_join_all;
use rustc_hash::FxHashSet as HashSet;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::config::BuildConfig;
use crate::engine;
use crate::error::{codes, BuildError};
use crate::fetch::{Fetch, HttpFetcher};
use crate::files::FileTable;
use crate::imports::{scan_imports, ImportKind};
use crate::loader::Loader;
use crate::resolver::{Address, Resolver};

/// Input of one build.
#[derive(Clone, Default)]
pub struct BuildOptions {
    /// Entry point keys into `files`.
    pub entry_points: Vec<String>,
    pub files: FileTable,
    /// Identifier replacements, applied as a transform.
    pub define: Vec<(String, String)>,
    /// Progress callback for `resolve`/`load` lines.
    pub log: Option<LogFn>,
}

impl fmt::Debug for BuildOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildOptions")
            .field("entry_points", &self.entry_points)
            .field("files", &self.files.len())
            .field("define", &self.define)
            .field("log", &self.log.is_some())
            .finish()
    }
}

impl BuildOptions {
    #[must_use]
    pub fn new(files: FileTable) -> Self {
        Self {
            files,
            ..Self::default()
        }
    }

    pub fn entry(mut self, entry: impl Into<String>) -> Self {
        self.entry_points.push(entry.into());
        self
    }

    pub fn define(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.define.push((from.into(), to.into()));
        self
    }

    pub fn on_log(mut self, log: LogFn) -> Self {
        self.log = Some(log);
        self
    }
}

/// Outcome of one build. Exactly one of `code` and `error` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildResult {
    pub code: Option<String>,
    pub error: Option<String>,
    /// Address keys of the bundled modules, in output order.
    pub modules: Vec<String>,
}

impl BuildResult {
    #[must_use]
    pub fn success(code: String, modules: Vec<String>) -> Self {
        Self {
            code: Some(code),
            error: None,
            modules,
        }
    }

    #[must_use]
    pub fn failure(error: &BuildError) -> Self {
        Self {
            code: None,
            error: Some(error.to_string()),
            modules: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Output of a successful graph walk and emit.
struct BuildOutput {
    code: String,
    modules: Vec<String>,
}

/// The bundler.
///
/// Holds configuration, the fetcher and user plugins; every build gets its
/// own resolver and loader over the build's file table.
pub struct Bundler {
    config: BuildConfig,
    fetcher: Arc<dyn Fetch>,
    plugins: Vec<Arc<dyn Plugin>>,
}

impl fmt::Debug for Bundler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bundler")
            .field("config", &self.config)
            .field(
                "plugins",
                &self.plugins.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl Default for Bundler {
    fn default() -> Self {
        Self::new(BuildConfig::default())
    }
}

impl Bundler {
    /// Create a bundler that fetches through the engine's HTTP client.
    #[must_use]
    pub fn new(config: BuildConfig) -> Self {
        Self {
            config,
            fetcher: Arc::new(HttpFetcher::shared()),
            plugins: Vec::new(),
        }
    }

    /// Replace the fetcher used for CDN modules.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetch>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Add a plugin. User plugins run before the built-in ones.
    pub fn plugin(mut self, plugin: Box<dyn Plugin>) -> Self {
        self.plugins.push(Arc::from(plugin));
        self
    }

    #[must_use]
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Run one build. Errors are reported in the result, never panicked.
    pub async fn build(&self, options: BuildOptions) -> BuildResult {
        match self.try_build(options).await {
            Ok(output) => {
                tracing::info!(
                    modules = output.modules.len(),
                    bytes = output.code.len(),
                    "build succeeded"
                );
                BuildResult::success(output.code, output.modules)
            }
            Err(err) => {
                tracing::warn!(code = err.code, "build failed: {err}");
                BuildResult::failure(&err)
            }
        }
    }

    async fn try_build(&self, options: BuildOptions) -> Result<BuildOutput, BuildError> {
        engine::initialize(&self.config)?;

        let BuildOptions {
            entry_points,
            files,
            define,
            log,
        } = options;

        if entry_points.is_empty() {
            return Err(BuildError::new(codes::ENTRY_NOT_FOUND, "no entry points given"));
        }

        tracing::debug!(entries = ?entry_points, files = files.len(), "build started");

        let files = Arc::new(files);
        let container = self.container(&files, define);
        let ctx = match log {
            Some(log) => PluginContext::new().with_log(log),
            None => PluginContext::new(),
        };

        container.build_start(&ctx)?;

        // Entry points.
        let mut queued: HashSet<String> = HashSet::default();
        let mut entries: Vec<Address> = Vec::new();
        let mut layer: Vec<Address> = Vec::new();
        for entry in &entry_points {
            let args = ResolveArgs {
                specifier: entry,
                importer: None,
                kind: ImportKind::EntryPoint,
            };
            let address = container.resolve_id(&args, &ctx)?;
            if queued.insert(address.key()) {
                layer.push(address.clone());
            }
            if !entries.contains(&address) {
                entries.push(address);
            }
        }

        // Graph walk, one breadth-first layer at a time.
        let mut graph = ModuleGraph::new();
        let mut edges: Vec<(ModuleId, String, Address)> = Vec::new();
        while !layer.is_empty() {
            let loaded =
                try_join_all(layer.iter().map(|address| container.load(address, &ctx))).await?;

            let mut next = Vec::new();
            for (address, module) in layer.into_iter().zip(loaded) {
                let source = container.transform(&module.contents, &address, &ctx)?;
                let imports = scan_imports(&source);
                let context = module.context;

                let mut targets = Vec::with_capacity(imports.len());
                for spec in &imports {
                    let args = ResolveArgs {
                        specifier: &spec.raw,
                        importer: Some(&context),
                        kind: spec.kind,
                    };
                    let target = container.resolve_id(&args, &ctx)?;
                    if queued.insert(target.key()) {
                        next.push(target.clone());
                    }
                    targets.push((spec.raw.clone(), target));
                }

                let id = graph.add(Module {
                    address,
                    source,
                    loader: module.loader,
                    context,
                    imports,
                    dependencies: Vec::new(),
                });
                edges.extend(targets.into_iter().map(|(raw, target)| (id, raw, target)));
            }
            layer = next;
        }

        for (from, specifier, target) in edges {
            if let Some(to) = graph.id_of(&target) {
                graph.link(from, &specifier, to);
            }
        }

        container.build_end(&ctx)?;

        let order = graph.toposort();
        let entry_ids: Vec<ModuleId> = entries.iter().filter_map(|a| graph.id_of(a)).collect();
        let code = emit_bundle(&graph, &order, &entry_ids);
        let modules = order
            .iter()
            .filter_map(|&id| graph.get(id).map(|m| m.address.key()))
            .collect();

        Ok(BuildOutput { code, modules })
    }

    /// Plugin order: user plugins, `define`, resolve, load.
    fn container(&self, files: &Arc<FileTable>, define: Vec<(String, String)>) -> PluginContainer {
        let mut container = PluginContainer::new();
        for plugin in &self.plugins {
            container.add_shared(Arc::clone(plugin));
        }
        if !define.is_empty() {
            container.add(Box::new(define.into_iter().collect::<DefinePlugin>()));
        }
        container.add(Box::new(ResolvePlugin::new(Resolver::new(
            Arc::clone(files),
            &self.config,
        ))));
        container.add(Box::new(LoadPlugin::new(Loader::new(
            Arc::clone(files),
            Arc::clone(&self.fetcher),
        ))));
        container
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::stub::StubFetcher;
    use crate::loader::{LoadedModule, LoaderKind};
    use crate::resolver::ResolutionContext;
    use futures::future::BoxFuture;
    use serial_test::serial;
    use std::sync::Mutex;

    fn bundler(fetcher: StubFetcher) -> Bundler {
        Bundler::new(BuildConfig::default()).with_fetcher(Arc::new(fetcher))
    }

    fn files(entries: &[(&str, &str)]) -> FileTable {
        entries.iter().copied().collect()
    }

    fn assert_exactly_one(result: &BuildResult) {
        assert_ne!(result.code.is_some(), result.error.is_some());
    }

    #[tokio::test]
    #[serial]
    async fn test_relative_import_resolves_to_virtual_file() {
        let table = files(&[
            ("index.tsx", "import { x } from './a';\nconsole.log(x);"),
            ("a.ts", "export const x = 1;"),
        ]);
        let result = bundler(StubFetcher::default())
            .build(BuildOptions::new(table).entry("index.tsx"))
            .await;

        assert_exactly_one(&result);
        assert_eq!(result.error, None);
        let code = result.code.unwrap();
        assert!(code.contains("// Module 1: virtual:a.ts"));
        assert!(code.contains("const { x } = require(1);"));
        assert_eq!(result.modules, vec!["virtual:a.ts", "virtual:index.tsx"]);
    }

    #[tokio::test]
    #[serial]
    async fn test_cdn_404_aborts_build() {
        let table = files(&[("index.tsx", "import _ from 'lodash';")]);
        let fetcher = StubFetcher::default().respond(
            "https://esm.sh/lodash",
            404,
            "https://esm.sh/lodash",
            "Not Found",
        );
        let result = bundler(fetcher)
            .build(BuildOptions::new(table).entry("index.tsx"))
            .await;

        assert_exactly_one(&result);
        assert_eq!(result.code, None);
        let error = result.error.unwrap();
        assert!(error.contains("https://esm.sh/lodash"));
        assert!(error.contains("404"));
        assert!(result.modules.is_empty());
    }

    #[tokio::test]
    #[serial]
    async fn test_css_import_becomes_style_injection() {
        let table = files(&[
            ("index.tsx", "import './styles.css';"),
            ("styles.css", "body { color: red; }"),
        ]);
        let result = bundler(StubFetcher::default())
            .build(BuildOptions::new(table).entry("index.tsx"))
            .await;

        let code = result.code.unwrap();
        assert!(code.contains("require(1);"));
        assert!(code.contains("style.textContent = \"body { color: red; }\";"));
        assert!(code.contains("document.head.appendChild(style);"));
    }

    #[tokio::test]
    #[serial]
    async fn test_missing_entry_point() {
        let result = bundler(StubFetcher::default())
            .build(BuildOptions::new(files(&[("a.ts", "")])).entry("index.tsx"))
            .await;
        assert_exactly_one(&result);
        assert!(result.error.unwrap().starts_with(codes::ENTRY_NOT_FOUND));
    }

    #[tokio::test]
    #[serial]
    async fn test_no_entry_points() {
        let result = bundler(StubFetcher::default())
            .build(BuildOptions::new(files(&[("a.ts", "")])))
            .await;
        assert!(result.error.unwrap().contains("no entry points"));
    }

    #[tokio::test]
    #[serial]
    async fn test_missing_local_file() {
        let table = files(&[("index.tsx", "import './missing';")]);
        let result = bundler(StubFetcher::default())
            .build(BuildOptions::new(table).entry("index.tsx"))
            .await;
        let error = result.error.unwrap();
        assert!(error.starts_with(codes::LOCAL_FILE_NOT_FOUND));
        assert!(error.contains("./missing"));
    }

    #[tokio::test]
    #[serial]
    async fn test_cdn_modules_import_relative_to_final_url() {
        let table = files(&[
            ("index.tsx", "import React from 'react';"),
            // Same name as the CDN file; must not be picked for a CDN importer.
            ("jsx.mjs", "throw new Error('local');"),
        ]);
        let fetcher = StubFetcher::default()
            .respond(
                "https://esm.sh/react",
                200,
                "https://esm.sh/react@18.2.0/es2022/react.mjs",
                "export * from './jsx.mjs';\nexport default {};",
            )
            .ok(
                "https://esm.sh/react@18.2.0/es2022/jsx.mjs",
                "export const jsx = 1;",
            );
        let result = bundler(fetcher)
            .build(BuildOptions::new(table).entry("index.tsx"))
            .await;

        assert_eq!(result.error, None);
        assert_eq!(
            result.modules,
            vec![
                "cdn:https://esm.sh/react@18.2.0/es2022/jsx.mjs",
                "cdn:https://esm.sh/react",
                "virtual:index.tsx",
            ]
        );
        let code = result.code.unwrap();
        assert!(!code.contains("throw new Error('local')"));
        assert!(code.contains("__reexport(exports, require(2));"));
    }

    #[tokio::test]
    #[serial]
    async fn test_define_is_applied() {
        let table = files(&[("index.tsx", "if (__DEV__) run(process.env.NODE_ENV);")]);
        let result = bundler(StubFetcher::default())
            .build(
                BuildOptions::new(table)
                    .entry("index.tsx")
                    .define("__DEV__", "false")
                    .define("process.env.NODE_ENV", "\"production\""),
            )
            .await;
        assert!(result
            .code
            .unwrap()
            .contains("if (false) run(\"production\");"));
    }

    #[tokio::test]
    #[serial]
    async fn test_progress_lines_reach_callback() {
        let lines = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = Arc::clone(&lines);
        let table = files(&[("index.tsx", "import './a';"), ("a.ts", "")]);
        let result = bundler(StubFetcher::default())
            .build(
                BuildOptions::new(table)
                    .entry("index.tsx")
                    .on_log(Arc::new(move |l: &str| sink.lock().unwrap().push(l.to_string()))),
            )
            .await;
        assert!(result.is_ok());

        let lines = lines.lock().unwrap();
        assert!(lines.contains(&"resolve index.tsx -> virtual:index.tsx".to_string()));
        assert!(lines.contains(&"resolve ./a -> virtual:a.ts".to_string()));
        assert!(lines.contains(&"load virtual:a.ts".to_string()));
    }

    #[tokio::test]
    #[serial]
    async fn test_shadowed_package_is_reported_in_progress() {
        let lines = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = Arc::clone(&lines);
        let table = files(&[("index.tsx", "import 'utils';"), ("utils.ts", "")]);
        let result = bundler(StubFetcher::default())
            .build(
                BuildOptions::new(table)
                    .entry("index.tsx")
                    .on_log(Arc::new(move |l: &str| sink.lock().unwrap().push(l.to_string()))),
            )
            .await;
        assert!(result.is_ok());
        assert_eq!(result.modules, vec!["virtual:utils.ts", "virtual:index.tsx"]);

        let lines = lines.lock().unwrap();
        assert!(lines.contains(
            &"resolve utils -> virtual:utils.ts (shadows cdn:https://esm.sh/utils)".to_string()
        ));
        assert!(lines.contains(&"resolve index.tsx -> virtual:index.tsx".to_string()));
    }

    #[tokio::test]
    #[serial]
    async fn test_import_text_in_string_still_builds() {
        let table = files(&[("index.tsx", "export const help = \"import x from './missing'\";")]);
        let result = bundler(StubFetcher::default())
            .build(BuildOptions::new(table).entry("index.tsx"))
            .await;

        assert_exactly_one(&result);
        assert_eq!(result.error, None);
        assert_eq!(result.modules, vec!["virtual:index.tsx"]);
        assert!(result.code.unwrap().contains("exports.help = help;"));
    }

    #[tokio::test]
    #[serial]
    async fn test_url_string_does_not_hide_dynamic_import() {
        let table = files(&[
            (
                "index.tsx",
                "const api = \"https://api.example.com\"; const m = import('./lazy');",
            ),
            ("lazy.ts", "export default 1;"),
        ]);
        let result = bundler(StubFetcher::default())
            .build(BuildOptions::new(table).entry("index.tsx"))
            .await;

        assert_eq!(result.error, None);
        assert_eq!(result.modules, vec!["virtual:lazy.ts", "virtual:index.tsx"]);
        let code = result.code.unwrap();
        assert!(code.contains("const m = __import("));
        assert!(!code.contains("import('./lazy')"));
    }

    #[tokio::test]
    #[serial]
    async fn test_import_cycle_builds() {
        let table = files(&[
            ("a.ts", "import './b';\nexport const a = 1;"),
            ("b.ts", "import './a';\nexport const b = 2;"),
        ]);
        let result = bundler(StubFetcher::default())
            .build(BuildOptions::new(table).entry("a.ts"))
            .await;
        assert_eq!(result.error, None);
        assert_eq!(result.modules.len(), 2);
    }

    #[test]
    fn test_failed_result_serializes_null_code() {
        let err = BuildError::new(codes::FETCH_STATUS, "GET https://esm.sh/x returned status 404");
        let value = serde_json::to_value(BuildResult::failure(&err)).unwrap();
        assert!(value["code"].is_null());
        assert_eq!(
            value["error"],
            "FETCH_STATUS: GET https://esm.sh/x returned status 404"
        );
        assert_eq!(value["modules"], serde_json::json!([]));
    }

    /// Serves `virtual:config` from memory.
    struct ConfigPlugin;

    impl Plugin for ConfigPlugin {
        fn name(&self) -> &str {
            "config"
        }

        fn resolve_id(
            &self,
            args: &ResolveArgs<'_>,
            _ctx: &PluginContext,
        ) -> HookResult<Option<Address>> {
            Ok((args.specifier == "virtual:config")
                .then(|| Address::Virtual("\0config".to_string())))
        }

        fn load<'a>(
            &'a self,
            address: &'a Address,
            _ctx: &'a PluginContext,
        ) -> BoxFuture<'a, HookResult<Option<LoadedModule>>> {
            Box::pin(async move {
                if address.as_str() != "\0config" {
                    return Ok(None);
                }
                Ok(Some(LoadedModule {
                    contents: "export default { debug: true };".to_string(),
                    loader: LoaderKind::Js,
                    context: ResolutionContext::for_address(address),
                }))
            })
        }
    }

    #[tokio::test]
    #[serial]
    async fn test_user_plugin_runs_before_builtins() {
        let table = files(&[("index.tsx", "import config from 'virtual:config';")]);
        let result = bundler(StubFetcher::default())
            .plugin(Box::new(ConfigPlugin))
            .build(BuildOptions::new(table).entry("index.tsx"))
            .await;
        assert_eq!(result.error, None);
        assert!(result
            .code
            .unwrap()
            .contains("exports.default = { debug: true };"));
    }
}
