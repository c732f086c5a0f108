//! Recursive file listing with ignore patterns

use std::fs;
use std::path::Path;

use ignore::WalkBuilder;
use ignore::overrides::{Override, OverrideBuilder};
use tracing::{debug, warn};

use crate::{Error, NormalizedPath, Result};

/// Ignore patterns for one sync folder.
///
/// Patterns follow gitignore rules relative to the walk root: a pattern
/// without a slash matches an entry name at any depth, a pattern with a
/// slash matches the path from the root, and `*`, `?`, `[..]` glob.
/// Ignored directories are not descended into.
#[derive(Debug, Clone, Default)]
pub struct IgnoreSet {
    patterns: Vec<String>,
}

impl IgnoreSet {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .filter_map(|raw| {
                let raw = raw.as_ref().replace('\\', "/");
                let raw = raw.trim().trim_end_matches('/');
                (!raw.is_empty()).then(|| raw.to_string())
            })
            .collect();
        Self { patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Compile into an override matcher rooted at `root`.
    ///
    /// Every pattern becomes a negated override, so unmatched entries stay
    /// included. A pattern that does not compile is dropped with a warning.
    fn overrides(&self, root: &Path) -> Override {
        let mut builder = OverrideBuilder::new(root);
        for pattern in &self.patterns {
            // `#` and `!` are gitignore syntax; a leading one is meant literally.
            let escaped = if pattern.starts_with(['#', '!']) {
                format!("\\{pattern}")
            } else {
                pattern.clone()
            };
            if let Err(e) = builder.add(&format!("!{escaped}")) {
                warn!("Ignore pattern {pattern} is invalid, skipping: {e}");
            }
        }
        builder.build().unwrap_or_else(|e| {
            warn!("Ignore patterns for {} could not be compiled: {e}", root.display());
            Override::empty()
        })
    }
}

/// List every regular file below `root`, skipping ignored entries.
///
/// Returned paths are relative to `root`, forward-slash separated and
/// sorted, so repeated walks over an unchanged tree are identical.
/// Symlinked directories are not followed.
pub fn list_files(root: &Path, ignore: &IgnoreSet) -> Result<Vec<NormalizedPath>> {
    fs::metadata(root).map_err(|e| Error::io(root, e))?;

    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .overrides(ignore.overrides(root))
        .build();

    let mut files = Vec::new();
    for result in walker {
        let entry = result.map_err(|source| Error::Walk {
            path: root.to_path_buf(),
            source,
        })?;
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let Some(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_file() {
            files.push(NormalizedPath::new(relative));
        } else if file_type.is_symlink() {
            match fs::metadata(entry.path()) {
                Ok(meta) if meta.is_file() => files.push(NormalizedPath::new(relative)),
                Ok(_) => debug!("Not following symlinked directory {}", relative.display()),
                Err(e) => debug!("Skipping dangling symlink {}: {e}", relative.display()),
            }
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_patterns_are_dropped() {
        let set = IgnoreSet::new(["", "  ", "logs/"]);
        assert_eq!(set.patterns(), ["logs"]);
    }

    #[test]
    fn backslashes_are_normalized() {
        let set = IgnoreSet::new(["config\\secret.txt"]);
        assert_eq!(set.patterns(), ["config/secret.txt"]);
    }

    #[test]
    fn patterns_compile_as_exclusions() {
        let root = Path::new("/srv/packs/p");
        let matcher = IgnoreSet::new(["*.bak", "logs"]).overrides(root);

        assert!(matcher.matched("a.txt.bak", false).is_ignore());
        assert!(matcher.matched("logs", true).is_ignore());
        assert!(matcher.matched("a.txt", false).is_none());
    }
}
