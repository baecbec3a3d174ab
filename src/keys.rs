//! Slash-joined key plumbing.
//!
//! Every datastore address is a slash-joined path string. Keys are kept in
//! a canonical shape: a single leading slash, no trailing slash, no empty
//! segments. The root key is the empty string.

/// Normalize a key: leading slash, no trailing slash, empty segments
/// collapsed. `""` and `"/"` both normalize to `""`.
pub fn safe_key(key: &str) -> String {
    let parts: Vec<&str> = key.split('/').filter(|p| !p.is_empty()).collect();
    if parts.is_empty() {
        String::new()
    } else {
        format!("/{}", parts.join("/"))
    }
}

/// Join key parts into one canonical key. Parts may themselves contain
/// slashes; empty parts are dropped.
pub fn join_key<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let joined = parts
        .into_iter()
        .map(|p| p.as_ref().to_string())
        .collect::<Vec<_>>()
        .join("/");
    safe_key(&joined)
}

/// Split a key into its segments, dropping empties.
pub fn split_key(key: &str) -> Vec<String> {
    key.split('/')
        .filter(|p| !p.is_empty())
        .map(|p| p.to_string())
        .collect()
}

/// Key of the containing folder: everything up to the last segment.
/// The parent of a top-level key is the root key `""`.
pub fn parent_key(key: &str) -> String {
    let mut parts = split_key(key);
    parts.pop();
    join_key(parts)
}

/// Last segment of a key, or `None` for the root key.
pub fn last_key_part(key: &str) -> Option<String> {
    split_key(key).pop()
}
