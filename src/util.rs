use std::collections::HashSet;
use url::Url;

/// True if the url path names a directory: empty or trailing slash.
pub fn is_dir(u: &Url) -> bool {
    let path = u.path();
    path.is_empty() || path.ends_with('/')
}

/// True if the last path segment carries an extension.
pub fn has_extension(u: &Url) -> bool {
    let path = u.path();
    match (path.rfind('.'), path.rfind('/')) {
        (Some(dot), Some(slash)) => dot > slash,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

/// The group (200, 300, 400, ...) a status code belongs to.
pub fn status_code_group(code: u16) -> u16 {
    (code / 100) * 100
}

// Lexical normalization of . and .. segments, after Go's path.Clean
fn clean_path(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut out: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => (),
            ".." => {
                if out.last().map_or(false, |s| *s != "..") {
                    out.pop();
                } else if !rooted {
                    out.push("..");
                }
            }
            segment => out.push(segment),
        }
    }
    let joined = out.join("/");
    if rooted {
        format!("/{}", joined)
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// Whether child lives under parent. Scheme and host only participate
/// when the parent has them; identical paths count as subpaths.
pub fn is_subpath(parent: &Url, child: &Url) -> bool {
    if !parent.scheme().is_empty() && child.scheme() != parent.scheme() {
        return false;
    }
    match parent.host_str() {
        Some(host) if !host.is_empty() => {
            if child.host_str() != Some(host) {
                return false;
            }
        }
        _ => (),
    }
    if parent.path() == "/" {
        // everything is in this path
        return true;
    }
    let parent_path = clean_path(parent.path());
    let child_path = clean_path(child.path());
    if child_path == parent_path {
        return true;
    }
    child_path.starts_with(&parent_path)
        && child_path.as_bytes().get(parent_path.len()) == Some(&b'/')
}

/// Every proper ancestor directory of the url's path, excluding the
/// root and the path itself.
pub fn parent_paths(child: &Url) -> Vec<Url> {
    let path = child.path().trim_end_matches('/');
    let split: Vec<&str> = path.split('/').collect();
    let mut results = Vec::new();
    for i in 2..split.len() {
        let mut parent = child.clone();
        parent.set_path(&split[..i].join("/"));
        results.push(parent);
    }
    results
}

/// Deduplicate, first occurrence wins.
pub fn dedupe(values: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for v in values {
        if seen.insert(v.clone()) {
            out.push(v);
        }
    }
    out
}
