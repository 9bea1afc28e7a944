//! Virtual path operations
//!
//! Virtual paths are slash-delimited logical locations, independent of the
//! key a blob is stored under. A valid path always starts with `/` and never
//! contains `..`.

use crate::error::PathError;

pub const ROOT: &str = "/";
const SEPARATOR: char = '/';

/// Collapse repeated separators, strip trailing ones, and force a leading `/`.
pub fn normalize(path: &str) -> String {
    let segments: Vec<&str> = path.split(SEPARATOR).filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        ROOT.to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// Check that a path is absolute and free of directory traversal.
pub fn is_valid_path(path: &str) -> bool {
    path.starts_with(SEPARATOR) && !path.contains("..")
}

/// Join segments under a single leading `/`, skipping empty ones.
pub fn join<S: AsRef<str>>(segments: &[S]) -> String {
    let joined = segments
        .iter()
        .map(|s| s.as_ref().trim_matches(SEPARATOR))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    normalize(&joined)
}

/// Remove the last segment. The parent of root is root.
pub fn parent(path: &str) -> String {
    let normalized = normalize(path);
    match normalized.rfind(SEPARATOR) {
        Some(0) | None => ROOT.to_string(),
        Some(idx) => normalized[..idx].to_string(),
    }
}

/// Validate a caller-supplied path and return its normalized form.
pub fn validate(path: &str) -> Result<String, PathError> {
    if !path.starts_with(SEPARATOR) {
        return Err(PathError::NotAbsolute(path.to_string()));
    }
    if path.contains("..") {
        return Err(PathError::Traversal(path.to_string()));
    }
    Ok(normalize(path))
}

/// Validate a single folder name
pub fn validate_name(name: &str) -> Result<(), PathError> {
    if name.trim().is_empty() || name.contains(SEPARATOR) || name.contains("..") {
        return Err(PathError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Full virtual path of a folder, i.e. its parent path joined with its name.
pub fn folder_full_path(parent_path: &str, name: &str) -> String {
    join(&[parent_path, name])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_and_trims() {
        assert_eq!(normalize("/a//b/"), "/a/b");
        assert_eq!(normalize("a/b"), "/a/b");
        assert_eq!(normalize("///"), "/");
        assert_eq!(normalize(""), "/");
    }

    #[test]
    fn traversal_is_invalid() {
        for path in ["/..", "/a/../b", "/a/..", "/a..b", "/../etc/passwd"] {
            assert!(!is_valid_path(path), "{path} should be rejected");
        }
    }

    #[test]
    fn relative_is_invalid() {
        for path in ["", "a", "a/b", "./a"] {
            assert!(!is_valid_path(path), "{path} should be rejected");
        }
        assert!(is_valid_path("/"));
        assert!(is_valid_path("/documents/specs"));
    }

    #[test]
    fn join_skips_empty_segments() {
        assert_eq!(join(&["", "a", "", "b"]), "/a/b");
        assert_eq!(join(&["/", "chats"]), "/chats");
        assert_eq!(join(&["/docs/", "/x/"]), "/docs/x");
        assert_eq!(join::<&str>(&[]), "/");
    }

    #[test]
    fn parent_of_root_is_root() {
        assert_eq!(parent("/"), "/");
        assert_eq!(parent("/a"), "/");
        assert_eq!(parent("/a/b/c"), "/a/b");
        assert_eq!(parent("/a/b/"), "/a");
    }

    #[test]
    fn validate_reports_reason() {
        assert_eq!(validate("/a//b/"), Ok("/a/b".to_string()));
        assert_eq!(validate("a"), Err(PathError::NotAbsolute("a".into())));
        assert_eq!(validate("/a/../b"), Err(PathError::Traversal("/a/../b".into())));
    }

    #[test]
    fn names_cannot_contain_separators() {
        assert!(validate_name("specs").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("..").is_err());
    }

    #[test]
    fn folder_full_path_joins_parent_and_name() {
        assert_eq!(folder_full_path("/", "chats"), "/chats");
        assert_eq!(folder_full_path("/docs", "specs"), "/docs/specs");
    }
}
