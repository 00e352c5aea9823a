//! POSIX-style virtual path helpers and URL directory helpers.

use url::Url;

/// Normalize a virtual path.
///
/// - Backslashes become `/`
/// - Empty and `.` segments are dropped
/// - `..` pops one segment and never climbs above the table root
/// - The result has no leading or trailing slash
#[must_use]
pub fn normalize(path: &str) -> String {
    let path = path.replace('\\', "/");
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

/// Join a specifier onto a virtual directory.
#[must_use]
pub fn join(dir: &str, specifier: &str) -> String {
    if dir.is_empty() {
        normalize(specifier)
    } else {
        normalize(&format!("{dir}/{specifier}"))
    }
}

/// Directory of a virtual path (empty when the path has no `/`).
#[must_use]
pub fn dirname(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(dir, _)| dir)
}

/// Directory of a URL: last path segment stripped to a trailing slash,
/// query and fragment dropped.
#[must_use]
pub fn url_dir(url: &Url) -> Url {
    let mut dir = url.clone();
    dir.set_query(None);
    dir.set_fragment(None);
    if !dir.path().ends_with('/') {
        let path = dir.path();
        let trimmed = match path.rfind('/') {
            Some(idx) => path[..=idx].to_string(),
            None => "/".to_string(),
        };
        dir.set_path(&trimmed);
    }
    dir
}
