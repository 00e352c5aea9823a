//! Compile-time constant replacement (`define`).

use super::super::plugin::{HookResult, Plugin, PluginContext};
use crate::resolver::Address;

/// Replaces whole identifiers or member chains with fixed expressions.
///
/// `process.env.NODE_ENV` → `"production"`, `__DEV__` → `false`.
/// Longer keys are applied first so that `process.env.NODE_ENV` wins over a
/// `process.env` entry.
#[derive(Debug, Clone, Default)]
pub struct DefinePlugin {
    replacements: Vec<(String, String)>,
}

impl DefinePlugin {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a replacement. A repeated key overrides the earlier value.
    pub fn define(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        let from = from.into();
        let to = to.into();
        if let Some(existing) = self.replacements.iter_mut().find(|(k, _)| *k == from) {
            existing.1 = to;
        } else {
            self.replacements.push((from, to));
        }
        self.replacements
            .sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        self
    }

    /// Replace `process.env.KEY` with a string literal.
    pub fn env(self, key: &str, value: &str) -> Self {
        self.define(format!("process.env.{key}"), format!("\"{value}\""))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DefinePlugin {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |plugin, (k, v)| plugin.define(k, v))
    }
}

impl Plugin for DefinePlugin {
    fn name(&self) -> &str {
        "sandbundle:define"
    }

    fn transform(
        &self,
        code: &str,
        _address: &Address,
        _ctx: &PluginContext,
    ) -> HookResult<Option<String>> {
        let mut result: Option<String> = None;
        for (from, to) in &self.replacements {
            let current = result.as_deref().unwrap_or(code);
            if current.contains(from.as_str()) {
                let replaced = replace_identifier(current, from, to);
                if replaced != current {
                    result = Some(replaced);
                }
            }
        }
        Ok(result)
    }
}

/// Replace whole-word occurrences of `from`. A match preceded by `.` is a
/// property access on something else and is left alone.
fn replace_identifier(source: &str, from: &str, to: &str) -> String {
    if from.is_empty() {
        return source.to_string();
    }

    let mut result = String::with_capacity(source.len());
    let mut rest = source;
    let mut prev: Option<char> = None;

    while let Some(idx) = rest.find(from) {
        let before = if idx == 0 {
            prev
        } else {
            rest[..idx].chars().next_back()
        };
        let after = rest[idx + from.len()..].chars().next();
        let starts_word = !before.is_some_and(|c| is_ident_char(c) || c == '.');
        let ends_word = !after.is_some_and(is_ident_char);

        result.push_str(&rest[..idx]);
        if starts_word && ends_word {
            result.push_str(to);
        } else {
            result.push_str(from);
        }
        prev = from.chars().next_back();
        rest = &rest[idx + from.len()..];
    }
    result.push_str(rest);
    result
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}
