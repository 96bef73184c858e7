/// Last `/`-separated segment of a package path, e.g. `c` for `a/b/c`.
pub fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
