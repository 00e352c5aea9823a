pub mod bundle;
pub mod resolve;
pub mod version;

use miette::{miette, IntoDiagnostic, Result};
use sandbundle_core::{BarePolicy, BuildConfig, FileTable};
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

/// Directories never read into the file table.
const SKIP_DIRS: &[&str] = &["node_modules", "target", "dist"];

fn is_skipped(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || SKIP_DIRS.contains(&name.as_ref())
}

/// Read every UTF-8 file under `dir` into a file table keyed by its
/// `/`-separated path relative to `dir`. Non-UTF-8 files are skipped.
pub fn read_file_table(dir: &Path) -> Result<FileTable> {
    if !dir.is_dir() {
        return Err(miette!("not a directory: {}", dir.display()));
    }

    let mut files = FileTable::new();
    for entry in WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_skipped(e))
    {
        let entry = entry.into_diagnostic()?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(dir) else {
            continue;
        };
        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        match std::fs::read_to_string(entry.path()) {
            Ok(content) => files.insert(&key, content),
            Err(err) if err.kind() == std::io::ErrorKind::InvalidData => {
                tracing::debug!(path = %key, "skipping non-UTF-8 file");
            }
            Err(err) => {
                return Err(miette!("failed to read {}: {err}", entry.path().display()));
            }
        }
    }

    tracing::debug!(dir = %dir.display(), files = files.len(), "file table loaded");
    Ok(files)
}

/// Build configuration from the environment plus CLI overrides.
pub fn build_config(cdn: Option<&str>, cdn_only: bool) -> Result<BuildConfig> {
    let mut config = BuildConfig::from_env().map_err(|e| miette!("{e}"))?;
    if let Some(cdn) = cdn {
        config = config.with_cdn_root(cdn).map_err(|e| miette!("{e}"))?;
    }
    if cdn_only {
        config = config.with_bare_policy(BarePolicy::CdnOnly);
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_read_file_table_relative_keys() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src/lib")).unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules/react")).unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join("src/index.tsx"), "import './lib/a';").unwrap();
        std::fs::write(dir.path().join("src/lib/a.ts"), "").unwrap();
        std::fs::write(dir.path().join("node_modules/react/index.js"), "").unwrap();
        std::fs::write(dir.path().join(".git/HEAD"), "ref").unwrap();
        std::fs::write(dir.path().join("logo.bin"), [0xff, 0xfe, 0x00]).unwrap();

        let files = read_file_table(dir.path()).unwrap();
        let keys: Vec<&str> = files.keys().collect();
        assert_eq!(keys, vec!["src/index.tsx", "src/lib/a.ts"]);
        assert_eq!(files.get("src/index.tsx"), Some("import './lib/a';"));
    }

    #[test]
    fn test_read_file_table_requires_directory() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("index.tsx");
        std::fs::write(&file, "").unwrap();
        assert!(read_file_table(&file).is_err());
    }

    #[test]
    fn test_build_config_overrides() {
        let config = build_config(Some("http://127.0.0.1:8080/cdn"), true).unwrap();
        assert_eq!(config.cdn_root.as_str(), "http://127.0.0.1:8080/cdn/");
        assert_eq!(config.bare_policy, BarePolicy::CdnOnly);
        assert!(build_config(Some("not a url"), false).is_err());
    }
}
