/// Document-relative form of `path`: forward slashes, no leading `./` or `/`,
/// no trailing slash.
pub fn normalize(path: &str) -> String {
    let mut normalized = path.replace('\\', "/");
    while let Some(rest) = normalized.strip_prefix("./") {
        normalized = rest.to_string();
    }
    let normalized = normalized.trim_start_matches('/');
    normalized.trim_end_matches('/').to_string()
}

/// True if `path` is `root` itself or lies underneath it. Comparison is
/// case-sensitive; an empty root covers every path.
pub fn is_within_scope(path: &str, root: &str) -> bool {
    let path = normalize(path);
    let root = normalize(root);

    if root.is_empty() || path == root {
        return true;
    }

    path.starts_with(&(root + "/"))
}
