//! Node path addressing
//!
//! Paths name a node relative to some starting node. Both `.` and `/` are
//! separators and are interchangeable, so `"a.b"`, `"a/b"` and `"/a//b/"`
//! all address the same node. Empty segments are ignored, which makes the
//! empty path address the starting node itself.

/// Characters accepted as path separators
pub const SEPARATORS: [char; 2] = ['.', '/'];

/// Iterate over the non-empty segments of `path`
///
/// # Examples
///
/// ```rust
/// use prefstore::path::segments;
///
/// let parts: Vec<&str> = segments("app.window/size").collect();
/// assert_eq!(parts, vec!["app", "window", "size"]);
/// assert_eq!(segments("").count(), 0);
/// ```
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(SEPARATORS).filter(|segment| !segment.is_empty())
}

/// Canonical `/`-joined, absolute form of `path`
///
/// ```rust
/// use prefstore::path::normalize;
///
/// assert_eq!(normalize("a.b"), "/a/b");
/// assert_eq!(normalize("/a//b/"), "/a/b");
/// assert_eq!(normalize(""), "/");
/// ```
pub fn normalize(path: &str) -> String {
    let mut out = String::new();
    for segment in segments(path) {
        out.push('/');
        out.push_str(segment);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

/// Whether `name` can be used as a single node name
///
/// A valid name is non-empty and contains no separator, so it round-trips
/// through path addressing as exactly one segment.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(SEPARATORS)
}

/// Join a parent's absolute path with a child name
pub(crate) fn join(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", parent, name)
    }
}
