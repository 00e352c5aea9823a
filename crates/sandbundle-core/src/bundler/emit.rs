//! Bundle output emission.
//!
//! Emits a module-registry bundle: every module becomes a function in
//! `__modules`, its import and export statements are rewritten line by line
//! into `require(id)` calls and `exports` assignments, and the entry modules
//! are required at the end. Syntax beyond module linking (types, JSX) is
//! passed through untouched.

#![allow(clippy::format_push_string)]

use super::graph::{Module, ModuleGraph, ModuleId};
use crate::loader::js_string;

const PRELUDE: &str = "\
const __modules = {};
const __cache = {};
function __require(id) {
  if (__cache[id]) return __cache[id].exports;
  const module = { exports: {} };
  __cache[id] = module;
  __modules[id](module, module.exports, __require);
  return module.exports;
}
function __default(m) {
  return m && m.__esModule ? m.default : m;
}
function __import(id) {
  return Promise.resolve().then(() => __require(id));
}
function __reexport(target, source) {
  for (const key of Object.keys(source)) {
    if (key !== \"default\" && !(key in target)) target[key] = source[key];
  }
}
";

/// Emit the bundle for `order` (dependency order) and run `entries` last.
#[must_use]
pub fn emit_bundle(graph: &ModuleGraph, order: &[ModuleId], entries: &[ModuleId]) -> String {
    let mut output = String::new();
    output.push_str("// sandbundle bundle\n");
    output.push_str("(function () {\n");
    output.push_str(PRELUDE);
    output.push('\n');

    for &id in order {
        if let Some(module) = graph.get(id) {
            output.push_str(&emit_module(id, module, graph));
        }
    }

    for &entry in entries {
        output.push_str(&format!("__require({entry});\n"));
    }
    output.push_str("})();\n");
    output
}

/// Emit one module wrapper.
fn emit_module(id: ModuleId, module: &Module, graph: &ModuleGraph) -> String {
    let rewritten = rewrite_module(id, module, graph);

    let mut output = String::with_capacity(rewritten.body.len() + 128);
    output.push_str(&format!(
        "// Module {id}: {}:{}\n",
        module.address.namespace(),
        module.address
    ));
    output.push_str(&format!(
        "__modules[{id}] = function (module, exports, require) {{\n"
    ));
    if rewritten.is_esm {
        output.push_str("  Object.defineProperty(exports, \"__esModule\", { value: true });\n");
    }
    for line in rewritten.body.lines() {
        output.push_str("  ");
        output.push_str(line);
        output.push('\n');
    }
    for export in &rewritten.pending_exports {
        output.push_str("  ");
        output.push_str(export);
        output.push('\n');
    }
    output.push_str("};\n\n");
    output
}

struct Rewritten {
    body: String,
    pending_exports: Vec<String>,
    is_esm: bool,
}

fn rewrite_module(id: ModuleId, module: &Module, graph: &ModuleGraph) -> Rewritten {
    let require_of = |spec: &str| -> String {
        match graph.resolve_specifier(id, spec) {
            Some(target) => format!("require({target})"),
            None => format!("require({})", js_string(spec)),
        }
    };

    let mut out = Rewritten {
        body: String::with_capacity(module.source.len()),
        pending_exports: Vec::new(),
        is_esm: false,
    };

    let mut lines = module.source.lines();
    while let Some(line) = lines.next() {
        let trimmed = line.trim_start();
        let is_import = trimmed.starts_with("import ")
            || trimmed.starts_with("import{")
            || trimmed.starts_with("import\"")
            || trimmed.starts_with("import'");
        let is_export = trimmed.starts_with("export ") || trimmed.starts_with("export{");

        if !is_import && !is_export {
            out.body.push_str(&rewrite_calls(line, id, module, graph));
            out.body.push('\n');
            continue;
        }

        // Gather multi-line statements until the specifier or brace closes.
        let mut statement = trimmed.to_string();
        while !statement_complete(&statement) {
            match lines.next() {
                Some(next) => {
                    statement.push(' ');
                    statement.push_str(next.trim());
                }
                None => break,
            }
        }

        let replaced = if is_import {
            rewrite_import(&statement, &require_of)
        } else {
            out.is_esm = true;
            rewrite_export(&statement, &require_of, &mut out.pending_exports)
        };
        let replaced = rewrite_calls(&replaced, id, module, graph);
        out.body.push_str(&replaced);
        out.body.push('\n');
    }

    out
}

/// Rewrite `import("x")` and `require("x")` calls whose specifiers resolved.
fn rewrite_calls(line: &str, id: ModuleId, module: &Module, graph: &ModuleGraph) -> String {
    if !line.contains("import(") && !line.contains("require(") {
        return line.to_string();
    }
    let mut result = line.to_string();
    for spec in &module.imports {
        let Some(target) = graph.resolve_specifier(id, &spec.raw) else {
            continue;
        };
        for quote in ['"', '\'', '`'] {
            let quoted = format!("{quote}{}{quote}", spec.raw);
            result = result
                .replace(&format!("import({quoted})"), &format!("__import({target})"))
                .replace(&format!("require({quoted})"), &format!("require({target})"));
        }
    }
    result
}

/// A statement is complete once it carries a quoted specifier, or, for
/// local `export { … }` lists, once the brace closes.
fn statement_complete(statement: &str) -> bool {
    if statement.contains('"') || statement.contains('\'') {
        return true;
    }
    if statement.starts_with("export {") || statement.starts_with("export{") {
        return statement.contains('}');
    }
    if statement.starts_with("import") {
        // `import x = require(...)` style or a clause without braces.
        return statement.ends_with(';');
    }
    true
}

/// Extract the trailing quoted specifier of an import/export statement.
fn trailing_specifier(statement: &str) -> Option<&str> {
    let s = statement.trim_end().trim_end_matches(';').trim_end();
    let quote = s.chars().last().filter(|c| *c == '"' || *c == '\'')?;
    let body = &s[..s.len() - 1];
    let start = body.rfind(quote)?;
    Some(&body[start + 1..])
}

/// Split `<keyword> <clause> from "<spec>"` into the clause.
fn clause_before_from<'a>(statement: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = statement.strip_prefix(keyword)?;
    let idx = rest.rfind(" from")?;
    Some(rest[..idx].trim())
}

/// Convert `{ a, b as c, type T }` into `{ a, b: c }`.
fn destructure(named: &str) -> String {
    let inner = named.trim().trim_start_matches('{').trim_end_matches('}');
    let parts: Vec<String> = inner
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty() && !p.starts_with("type "))
        .map(|p| match p.split_once(" as ") {
            Some((name, alias)) => format!("{}: {}", name.trim(), alias.trim()),
            None => p.to_string(),
        })
        .collect();
    format!("{{ {} }}", parts.join(", "))
}

/// Rewrite an import statement.
fn rewrite_import(statement: &str, require_of: &dyn Fn(&str) -> String) -> String {
    let Some(spec) = trailing_specifier(statement) else {
        return statement.to_string();
    };
    let req = require_of(spec);

    // import './side-effect'
    let Some(clause) = clause_before_from(statement, "import") else {
        return format!("{req};");
    };

    // Type-only imports vanish.
    if clause.starts_with("type ") || clause.starts_with("type{") {
        return String::new();
    }

    // import * as ns from 'x'
    if let Some(ns) = clause.strip_prefix("* as ") {
        return format!("const {} = {req};", ns.trim());
    }

    // import { a, b as c } from 'x'
    if clause.starts_with('{') {
        return format!("const {} = {req};", destructure(clause));
    }

    // import Default[, { named } | * as ns] from 'x'
    match clause.split_once(',') {
        None => format!("const {clause} = __default({req});"),
        Some((default, rest)) => {
            let default = default.trim();
            let rest = rest.trim();
            if let Some(ns) = rest.strip_prefix("* as ") {
                format!(
                    "const {} = {req}; const {default} = __default({});",
                    ns.trim(),
                    ns.trim()
                )
            } else {
                format!(
                    "const {} = {req}; const {default} = __default({req});",
                    destructure(rest)
                )
            }
        }
    }
}

/// Rewrite an export statement. Local bindings are exported at the end of
/// the module through `pending`.
fn rewrite_export(
    statement: &str,
    require_of: &dyn Fn(&str) -> String,
    pending: &mut Vec<String>,
) -> String {
    let body = statement
        .strip_prefix("export")
        .map(str::trim_start)
        .unwrap_or(statement);

    // Re-exports.
    if let Some(spec) = trailing_specifier(statement) {
        if let Some(clause) = clause_before_from(statement, "export")
            .filter(|c| c.starts_with('*') || c.starts_with('{') || c.starts_with("type"))
        {
            if clause.starts_with("type ") || clause.starts_with("type{") {
                return String::new();
            }
            let req = require_of(spec);
            if clause == "*" {
                return format!("__reexport(exports, {req});");
            }
            if let Some(ns) = clause.strip_prefix("* as ") {
                return format!("exports.{} = {req};", ns.trim());
            }
            let assignments: Vec<String> = export_pairs(clause)
                .into_iter()
                .map(|(local, exported)| format!("exports.{exported} = {req}.{local};"))
                .collect();
            return assignments.join(" ");
        }
    }

    // export default <expr>
    if let Some(rest) = body.strip_prefix("default ") {
        return format!("exports.default = {rest}");
    }

    // export { a, b as c };
    if body.starts_with('{') {
        for (local, exported) in export_pairs(body.trim_end_matches(';')) {
            pending.push(format!("exports.{exported} = {local};"));
        }
        return String::new();
    }

    // export const|let|var|function|class NAME ...
    for name in declared_names(body) {
        pending.push(format!("exports.{name} = {name};"));
    }
    body.to_string()
}

/// `{ a, b as c }` → `[(a, a), (b, c)]`, dropping `type` members.
fn export_pairs(list: &str) -> Vec<(String, String)> {
    list.trim()
        .trim_start_matches('{')
        .trim_end_matches('}')
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty() && !p.starts_with("type "))
        .map(|p| match p.split_once(" as ") {
            Some((local, exported)) => (local.trim().to_string(), exported.trim().to_string()),
            None => (p.to_string(), p.to_string()),
        })
        .collect()
}

/// Names bound by a declaration. Destructuring patterns bind nothing here.
fn declared_names(declaration: &str) -> Vec<&str> {
    const BINDINGS: &[&str] = &["const ", "let ", "var "];
    const SINGLE: &[&str] = &[
        "function* ",
        "function ",
        "async function* ",
        "async function ",
        "class ",
    ];

    if let Some(rest) = SINGLE.iter().find_map(|p| declaration.strip_prefix(p)) {
        return leading_identifier(rest).into_iter().collect();
    }
    let Some(rest) = BINDINGS.iter().find_map(|p| declaration.strip_prefix(p)) else {
        return Vec::new();
    };

    // Split declarators on top-level commas.
    let mut names = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in rest.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'' | '`') => quote = Some(c),
            (None, '(' | '[' | '{') => depth += 1,
            (None, ')' | ']' | '}') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                names.extend(leading_identifier(&rest[start..]));
                start = i + 1;
            }
            _ => {}
        }
    }
    names.extend(leading_identifier(&rest[start..]));
    names
}

fn leading_identifier(s: &str) -> Option<&str> {
    let s = s.trim_start();
    let end = s
        .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
        .unwrap_or(s.len());
    let name = &s[..end];
    (!name.is_empty()).then_some(name)
}
