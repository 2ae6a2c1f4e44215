use regex::Regex;

/// Whether a single route pattern admits `path`.
///
/// Precedence: empty never matches; `*` and `/*` match everything;
/// `/prefix/*` matches paths starting with `/prefix/`; any other `*` is a
/// wildcard over an anchored, escaped pattern; otherwise exact equality.
pub fn pattern_matches(pattern: &str, path: &str) -> bool {
    if pattern.is_empty() {
        return false;
    }
    if pattern == "*" || pattern == "/*" {
        return true;
    }
    if let Some(prefix) = pattern.strip_suffix('*').filter(|p| p.ends_with('/')) {
        return path.starts_with(prefix);
    }
    if pattern.contains('*') {
        return wildcard_regex(pattern).is_some_and(|re| re.is_match(path));
    }
    pattern == path
}

fn wildcard_regex(pattern: &str) -> Option<Regex> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");

    match Regex::new(&format!("^{body}$")) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!(pattern, error = %e, "unusable route pattern");
            None
        }
    }
}
