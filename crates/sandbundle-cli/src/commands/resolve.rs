//! `sandbundle resolve` command implementation.
//!
//! Runs the resolver for a single specifier without loading anything.

use miette::{miette, IntoDiagnostic, Result};
use sandbundle_core::{Address, ImportKind, ResolutionContext, Resolver};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use super::{build_config, read_file_table};

/// Resolve command action.
#[derive(Debug, Clone)]
pub struct ResolveAction {
    pub dir: PathBuf,
    pub specifier: String,
    /// Importing file key; `None` resolves from the table root.
    pub from: Option<String>,
    pub cdn: Option<String>,
    pub cdn_only: bool,
}

#[derive(Serialize)]
struct ResolveResultJson {
    ok: bool,
    specifier: String,
    from: Option<String>,
    namespace: Option<String>,
    address: Option<String>,
    error: Option<String>,
}

/// Run the resolve command.
pub fn run(action: ResolveAction, json: bool) -> Result<()> {
    let config = build_config(action.cdn.as_deref(), action.cdn_only)?;
    let files = read_file_table(&action.dir)?;

    let importer = match &action.from {
        Some(key) if !files.contains(key) => {
            return Err(miette!("importer '{key}' is not in {}", action.dir.display()));
        }
        Some(key) => Some(ResolutionContext::for_address(&Address::Virtual(key.clone()))),
        None => None,
    };

    let resolver = Resolver::new(Arc::new(files), &config);
    let result = resolver.resolve(
        &action.specifier,
        importer.as_ref(),
        ImportKind::ImportStatement,
    );

    if json {
        let ok = result.is_ok();
        let json_result = match result {
            Ok(address) => ResolveResultJson {
                ok,
                specifier: action.specifier,
                from: action.from,
                namespace: Some(address.namespace().to_string()),
                address: Some(address.as_str().to_string()),
                error: None,
            },
            Err(err) => ResolveResultJson {
                ok,
                specifier: action.specifier,
                from: action.from,
                namespace: None,
                address: None,
                error: Some(err.to_string()),
            },
        };
        println!(
            "{}",
            serde_json::to_string(&json_result).into_diagnostic()?
        );
        if !ok {
            std::process::exit(1);
        }
        return Ok(());
    }

    match result {
        Ok(address) => {
            println!("{}:{address}", address.namespace());
            Ok(())
        }
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}
