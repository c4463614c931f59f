//! Content path utilities
//!
//! Content paths are relative to the content root, use forward slashes and
//! never start with a separator: `models/players/sarge/head.md3`.

/// Normalize a content path
/// - Converts backslashes to forward slashes
/// - Removes redundant and leading separators
/// - Resolves . and .. components (never above the root)
pub fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");

    let mut components = Vec::new();
    for component in path.trim().split('/') {
        match component {
            "" | "." => continue,
            ".." => {
                components.pop();
            }
            _ => components.push(component),
        }
    }

    components.join("/")
}

/// Parent directory of a path; the root has none
pub fn parent_path(path: &str) -> Option<String> {
    let normalized = normalize_path(path);

    if normalized.is_empty() {
        return None;
    }

    match normalized.rfind('/') {
        Some(pos) => Some(normalized[..pos].to_string()),
        None => Some(String::new()),
    }
}

/// Get filename from path
pub fn filename(path: &str) -> &str {
    let path = path.trim_end_matches('/');

    if let Some(pos) = path.rfind('/') {
        &path[pos + 1..]
    } else {
        path
    }
}

/// Filename without its extension
pub fn file_stem(path: &str) -> &str {
    let name = filename(path);
    match name.rfind('.') {
        Some(pos) if pos > 0 => &name[..pos],
        _ => name,
    }
}

/// Join path components
pub fn join_paths(base: &str, relative: &str) -> String {
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        return normalize_path(relative);
    }
    normalize_path(&format!("{}/{}", base, relative))
}

/// Check if a filename matches a glob pattern
/// Supports * (any chars) and ? (single char)
pub fn glob_match(pattern: &str, name: &str) -> bool {
    glob_match_impl(pattern.as_bytes(), name.as_bytes())
}

fn glob_match_impl(pattern: &[u8], text: &[u8]) -> bool {
    let mut p = 0;
    let mut t = 0;
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() {
            match pattern[p] {
                b'*' => {
                    star = Some((p, t));
                    p += 1;
                    continue;
                }
                b'?' => {
                    p += 1;
                    t += 1;
                    continue;
                }
                c if c == text[t] => {
                    p += 1;
                    t += 1;
                    continue;
                }
                _ => {}
            }
        }

        // Mismatch - let the last star absorb one more character
        match star {
            Some((sp, st)) => {
                p = sp + 1;
                t = st + 1;
                star = Some((sp, st + 1));
            }
            None => return false,
        }
    }

    // Match remaining stars
    while p < pattern.len() && pattern[p] == b'*' {
        p += 1;
    }

    p == pattern.len()
}

/// Get file extension from path
pub fn get_extension(path: &str) -> Option<&str> {
    let filename = filename(path);

    if let Some(pos) = filename.rfind('.') {
        if pos > 0 && pos < filename.len() - 1 {
            return Some(&filename[pos + 1..]);
        }
    }

    None
}
