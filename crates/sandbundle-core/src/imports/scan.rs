//! Import specifier scanner.

use std::collections::HashSet;

use super::ImportKind;

/// Import specifier found in module source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    /// Specifier exactly as written.
    pub raw: String,
    pub kind: ImportKind,
    /// Line number (1-indexed, best-effort).
    pub line: u32,
}

/// Scan module source for import, export-from, dynamic import and require
/// specifiers.
///
/// Returns specifiers in first-appearance order, deduplicated by `raw`.
#[must_use]
pub fn scan_imports(source: &str) -> Vec<ImportSpec> {
    let chars: Vec<char> = source.chars().collect();
    let mut scanner = Scanner {
        chars: &chars,
        pos: 0,
        line: 1,
    };
    let mut results = Vec::new();
    let mut seen = HashSet::new();

    while scanner.pos < chars.len() {
        let c = chars[scanner.pos];

        if c == '\n' {
            scanner.line += 1;
            scanner.pos += 1;
            continue;
        }

        if matches!(c, '"' | '\'' | '`') {
            scanner.skip_literal();
            continue;
        }

        if scanner.starts_with("//") {
            while scanner.pos < chars.len() && chars[scanner.pos] != '\n' {
                scanner.pos += 1;
            }
            continue;
        }

        if scanner.starts_with("/*") {
            scanner.pos += 2;
            while scanner.pos < chars.len() && !scanner.starts_with("*/") {
                scanner.bump();
            }
            scanner.pos += 2;
            continue;
        }

        let (start, start_line) = (scanner.pos, scanner.line);
        let found = if scanner.keyword("import") {
            scanner.pos += 6;
            scanner.import_statement()
        } else if scanner.keyword("export") {
            scanner.pos += 6;
            scanner
                .from_clause(500)
                .map(|spec| (spec, ImportKind::ExportFrom))
        } else if scanner.keyword("require") {
            scanner.pos += 7;
            scanner
                .call_argument()
                .map(|spec| (spec, ImportKind::RequireCall))
        } else {
            scanner.pos += 1;
            continue;
        };

        match found {
            Some((spec, kind)) => {
                if !spec.is_empty() && seen.insert(spec.clone()) {
                    results.push(ImportSpec {
                        raw: spec,
                        kind,
                        line: scanner.line,
                    });
                }
            }
            None => {
                scanner.pos = start + 1;
                scanner.line = start_line;
            }
        }
    }

    results
}

struct Scanner<'a> {
    chars: &'a [char],
    pos: usize,
    line: u32,
}

impl Scanner<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) {
        if self.peek() == Some('\n') {
            self.line += 1;
        }
        self.pos += 1;
    }

    fn starts_with(&self, s: &str) -> bool {
        let mut i = self.pos;
        for c in s.chars() {
            if self.chars.get(i) != Some(&c) {
                return false;
            }
            i += 1;
        }
        true
    }

    /// Keyword at the cursor with word boundaries on both sides.
    fn keyword(&self, kw: &str) -> bool {
        let is_ident = |c: char| c.is_alphanumeric() || c == '_' || c == '$';
        if self.pos > 0 && (is_ident(self.chars[self.pos - 1]) || self.chars[self.pos - 1] == '.') {
            return false;
        }
        if !self.starts_with(kw) {
            return false;
        }
        let end = self.pos + kw.chars().count();
        !self.chars.get(end).copied().is_some_and(is_ident)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    /// Read a quoted string literal at the cursor.
    fn string_literal(&mut self) -> Option<String> {
        let quote = self.peek().filter(|&c| matches!(c, '"' | '\'' | '`'))?;
        self.pos += 1;
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == quote {
                let spec: String = self.chars[start..self.pos].iter().collect();
                self.pos += 1;
                return Some(spec);
            }
            if c == '\n' && quote != '`' {
                return None;
            }
            if c == '\\' {
                self.pos += 1;
            }
            self.bump();
        }
        None
    }

    /// Step over a string or template literal at the cursor. An unterminated
    /// single-line string ends at the newline.
    fn skip_literal(&mut self) {
        let Some(quote) = self.peek() else {
            return;
        };
        self.pos += 1;
        while let Some(c) = self.peek() {
            if c == quote {
                self.pos += 1;
                return;
            }
            if c == '\n' && quote != '`' {
                return;
            }
            if c == '\\' {
                self.bump();
            }
            self.bump();
        }
    }

    /// `(` string `)` after `require` or `import`.
    fn call_argument(&mut self) -> Option<String> {
        self.skip_whitespace();
        if self.peek() != Some('(') {
            return None;
        }
        self.pos += 1;
        self.skip_whitespace();
        let spec = self.string_literal()?;
        self.skip_whitespace();
        if self.peek() == Some(')') {
            self.pos += 1;
        }
        Some(spec)
    }

    /// Everything after the `import` keyword.
    fn import_statement(&mut self) -> Option<(String, ImportKind)> {
        self.skip_whitespace();
        match self.peek()? {
            '(' => self
                .call_argument()
                .map(|spec| (spec, ImportKind::DynamicImport)),
            '"' | '\'' | '`' => self
                .string_literal()
                .map(|spec| (spec, ImportKind::ImportStatement)),
            _ => self
                .from_clause(1000)
                .map(|spec| (spec, ImportKind::ImportStatement)),
        }
    }

    /// Scan forward (at most `limit` chars, stopping at `;`) for
    /// `from "<spec>"`.
    fn from_clause(&mut self, limit: usize) -> Option<String> {
        let end = (self.pos + limit).min(self.chars.len());
        while self.pos < end {
            match self.peek()? {
                ';' => return None,
                _ if self.keyword("from") => {
                    self.pos += 4;
                    self.skip_whitespace();
                    return self.string_literal();
                }
                _ => self.bump(),
            }
        }
        None
    }
}
