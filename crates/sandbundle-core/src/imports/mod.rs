//! Import discovery for JavaScript/TypeScript modules.
//!
//! A lightweight scanner finds the specifiers the build host has to resolve
//! next. It does not parse; it skips comments and matches keywords.

mod scan;

pub use scan::{scan_imports, ImportSpec};

/// How a specifier was reached. Only `EntryPoint` changes resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportKind {
    /// The build's starting module.
    EntryPoint,
    /// `import x from "..."` or `import "..."`.
    ImportStatement,
    /// `export ... from "..."`.
    ExportFrom,
    /// `import("...")`.
    DynamicImport,
    /// `require("...")`.
    RequireCall,
}

impl ImportKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EntryPoint => "entry-point",
            Self::ImportStatement => "import-statement",
            Self::ExportFrom => "export-from",
            Self::DynamicImport => "dynamic-import",
            Self::RequireCall => "require-call",
        }
    }
}
