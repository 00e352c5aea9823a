//! `sandbundle bundle` command implementation.
//!
//! Reads a directory into a file table, builds it, and writes the bundle.

use miette::{miette, IntoDiagnostic, Result};
use sandbundle_core::{BuildOptions, Bundler};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use super::{build_config, read_file_table};

/// Bundle command action.
#[derive(Debug, Clone)]
pub struct BundleAction {
    /// Directory read into the file table.
    pub dir: PathBuf,
    /// Entry point keys.
    pub entries: Vec<String>,
    /// CDN root override.
    pub cdn: Option<String>,
    /// Define replacements (e.g., __DEV__=false).
    pub define: Vec<String>,
    /// Bare specifiers always go to the CDN.
    pub cdn_only: bool,
    /// Output file (if None, prints to stdout).
    pub outfile: Option<PathBuf>,
}

/// JSON output for bundle command.
#[derive(Serialize)]
struct BundleResultJson {
    ok: bool,
    code: Option<String>,
    error: Option<String>,
    modules: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    outfile: Option<String>,
    duration_ms: u64,
}

/// Parse `KEY=VALUE` pairs.
fn parse_defines(defines: &[String]) -> Result<Vec<(String, String)>> {
    defines
        .iter()
        .map(|def| {
            def.split_once('=')
                .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
                .filter(|(key, _)| !key.is_empty())
                .ok_or_else(|| miette!("invalid --define '{def}', expected KEY=VALUE"))
        })
        .collect()
}

/// Run the bundle command.
pub fn run(action: BundleAction, json: bool) -> Result<()> {
    let start = Instant::now();

    let config = build_config(action.cdn.as_deref(), action.cdn_only)?;
    let files = read_file_table(&action.dir)?;

    let mut options = BuildOptions::new(files).on_log(Arc::new(|line: &str| {
        tracing::info!("{line}");
    }));
    options.entry_points.clone_from(&action.entries);
    options.define = parse_defines(&action.define)?;

    let bundler = Bundler::new(config);
    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
    let result = runtime.block_on(bundler.build(options));

    let duration_ms = start.elapsed().as_millis() as u64;

    if let (Some(code), Some(outfile)) = (&result.code, &action.outfile) {
        if let Some(parent) = outfile.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).into_diagnostic()?;
            }
        }
        std::fs::write(outfile, code).into_diagnostic()?;
    }

    if json {
        let ok = result.is_ok();
        let json_result = BundleResultJson {
            ok,
            code: result.code,
            error: result.error,
            modules: result.modules,
            outfile: action.outfile.as_ref().map(|p| p.display().to_string()),
            duration_ms,
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

    match (result.code, result.error) {
        (_, Some(error)) => {
            eprintln!("error: {error}");
            std::process::exit(1);
        }
        (Some(code), None) => {
            if let Some(outfile) = &action.outfile {
                let size_kb = code.len() as f64 / 1024.0;
                println!(
                    "  {} -> {} ({} modules, {:.1}KB, {}ms)",
                    action.entries.join(", "),
                    outfile.display(),
                    result.modules.len(),
                    size_kb,
                    duration_ms
                );
            } else {
                print!("{code}");
            }
            Ok(())
        }
        (None, None) => Err(miette!("build produced neither code nor error")),
    }
}
