//! Path Guard
//!
//! Resolves client-supplied filenames against the cache root and refuses
//! anything that would land outside it. Resolution is purely lexical, the
//! filesystem is never touched.

use std::path::{Component, Path, PathBuf};

use tracing::warn;

use crate::error::{CdnError, Result};

// == Path Guard ==
/// Confines filenames to a single root directory.
#[derive(Debug, Clone)]
pub struct PathGuard {
    root: PathBuf,
}

impl PathGuard {
    /// Creates a guard for `root`. A relative root is anchored at the
    /// current working directory so containment checks compare absolute paths.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let absolute = if root.is_absolute() {
            root.to_path_buf()
        } else {
            std::env::current_dir()?.join(root)
        };

        Ok(Self {
            root: normalize(&absolute),
        })
    }

    /// Returns the normalized absolute root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // == Resolve ==
    /// Resolves `name` to a path strictly inside the root.
    ///
    /// Fails with [`CdnError::AccessDenied`] for empty names, NUL bytes,
    /// absolute paths and anything whose normalized form leaves the root.
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name.contains('\0') {
            return Err(self.deny(name, "empty or NUL"));
        }

        let requested = Path::new(name);
        if requested.has_root() || requested.is_absolute() {
            return Err(self.deny(name, "absolute path"));
        }

        let resolved = normalize(&self.root.join(requested));

        // Component-wise, so "/cache-evil" is not inside "/cache"
        if !resolved.starts_with(&self.root) || resolved == self.root {
            return Err(self.deny(name, "escapes cache root"));
        }

        Ok(resolved)
    }

    fn deny(&self, name: &str, reason: &str) -> CdnError {
        warn!(
            "Path guard rejected {:?} ({}) under {}",
            name,
            reason,
            self.root.display()
        );
        CdnError::AccessDenied(name.to_string())
    }
}

/// Lexically resolves `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> PathGuard {
        PathGuard::new("/srv/cache").unwrap()
    }

    #[test]
    fn test_resolves_plain_filename() {
        let path = guard().resolve("abc.jpg").unwrap();
        assert_eq!(path, PathBuf::from("/srv/cache/abc.jpg"));
    }

    #[test]
    fn test_allows_traversal_that_stays_inside() {
        let path = guard().resolve("sub/../abc.jpg").unwrap();
        assert_eq!(path, PathBuf::from("/srv/cache/abc.jpg"));
    }

    #[test]
    fn test_rejects_escape_attempts() {
        let attempts = [
            "../secret",
            "../../etc/passwd",
            "a/../../b",
            "..",
            ".",
            "",
            "/etc/passwd",
            "../cache-evil/x.jpg",
            "bad\0name",
        ];

        for attempt in attempts {
            let result = guard().resolve(attempt);
            assert!(
                matches!(result, Err(CdnError::AccessDenied(_))),
                "Should reject {attempt:?}"
            );
        }
    }

    #[test]
    fn test_sibling_prefix_is_not_contained() {
        let result = PathGuard::new("/srv/cache")
            .unwrap()
            .resolve("../cache2/file.jpg");
        assert!(matches!(result, Err(CdnError::AccessDenied(_))));
    }

    #[test]
    fn test_relative_root_made_absolute() {
        let guard = PathGuard::new("cache").unwrap();
        assert!(guard.root().is_absolute());
        assert!(guard.resolve("x.jpg").unwrap().starts_with(guard.root()));
    }
}
