//! Style-sheet modules.
//!
//! A `.css` file is loaded as a script that injects the style sheet into the
//! document head when the module runs.

/// Build the injection script for a style sheet.
#[must_use]
pub fn css_module(css: &str) -> String {
    format!(
        "const style = document.createElement(\"style\");\n\
         style.textContent = {};\n\
         document.head.appendChild(style);\n",
        js_string(css)
    )
}

/// Encode a value as a double-quoted JavaScript string literal.
#[must_use]
pub fn js_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            // Line terminators inside JS string literals.
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}
