//! File inclusion.
//!
//! `[[chapter.md]]` is replaced by the content of `chapter.md`, resolved
//! relative to the directory of the including file. Included files are
//! expanded recursively. Directives inside fenced code are left alone.

use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::fence::FenceTracker;

static INCLUDE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[(.*?)\.md\]\]").unwrap());

/// Default maximum inclusion depth.
pub const DEFAULT_MAX_DEPTH: usize = 20;

/// Reads an included file.
pub type ReadFile = dyn Fn(&Path) -> io::Result<String>;

/// Expanded document text and the includes that could not be resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expanded {
    pub text: String,
    /// One message per directive left in place.
    pub warnings: Vec<String>,
}

/// Resolves `[[path.md]]` directives.
pub struct Includer<'a> {
    read: &'a ReadFile,
    max_depth: usize,
}

impl<'a> Includer<'a> {
    #[must_use]
    pub fn new(read: &'a ReadFile) -> Self {
        Self {
            read,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Expand every include in `src`, a document living in `base_dir`.
    ///
    /// Failed includes (missing file, cycle, depth limit) keep their
    /// directive text and add a warning.
    pub fn expand(&self, src: &str, base_dir: &Path) -> Expanded {
        let mut warnings = Vec::new();
        let mut stack = Vec::new();
        let text = self.expand_nested(src, base_dir, &mut stack, &mut warnings);
        Expanded { text, warnings }
    }

    fn expand_nested(
        &self,
        src: &str,
        base_dir: &Path,
        stack: &mut Vec<PathBuf>,
        warnings: &mut Vec<String>,
    ) -> String {
        let mut result = String::with_capacity(src.len());
        let mut fence = FenceTracker::new();

        for line in src.split_inclusive('\n') {
            if fence.update(line) || fence.in_fence() {
                result.push_str(line);
                continue;
            }
            let expanded = INCLUDE_PATTERN.replace_all(line, |caps: &Captures<'_>| {
                let directive = &caps[0];
                let path = normalize(&base_dir.join(format!("{}.md", &caps[1])));
                match self.include(&path, stack, warnings) {
                    Ok(text) => text,
                    Err(message) => {
                        tracing::warn!(path = %path.display(), %message, "Include skipped");
                        warnings.push(format!("{directive}: {message}"));
                        directive.to_owned()
                    }
                }
            });
            result.push_str(&expanded);
        }

        result
    }

    fn include(
        &self,
        path: &Path,
        stack: &mut Vec<PathBuf>,
        warnings: &mut Vec<String>,
    ) -> Result<String, String> {
        if stack.iter().any(|p| p == path) {
            return Err(format!("include cycle through {}", path.display()));
        }
        if stack.len() >= self.max_depth {
            return Err(format!(
                "include depth exceeded maximum of {}",
                self.max_depth
            ));
        }
        let content = (self.read)(path)
            .map_err(|err| format!("cannot read {}: {err}", path.display()))?;

        tracing::debug!(path = %path.display(), depth = stack.len() + 1, "Including file");
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        stack.push(path.to_path_buf());
        let mut expanded = self.expand_nested(&content, base_dir, stack, warnings);
        stack.pop();

        // The directive's own line ending follows the included text.
        if expanded.ends_with('\n') {
            expanded.pop();
        }
        Ok(expanded)
    }
}

/// Resolve `.` and `..` lexically so the same file is recognized on the
/// inclusion stack however it was reached.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn read(path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn expand(dir: &TempDir, src: &str) -> Expanded {
        Includer::new(&read).expand(src, dir.path())
    }

    #[test]
    fn test_include_relative_to_including_file() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("parts")).unwrap();
        fs::write(dir.path().join("parts/one.md"), "One [[two.md]]\n").unwrap();
        fs::write(dir.path().join("parts/two.md"), "Two\n").unwrap();

        let expanded = expand(&dir, "# Doc\n[[parts/one.md]]\nEnd\n");
        assert_eq!(expanded.text, "# Doc\nOne Two\nEnd\n");
        assert!(expanded.warnings.is_empty());
    }

    #[test]
    fn test_missing_file_keeps_directive() {
        let dir = TempDir::new().unwrap();
        let expanded = expand(&dir, "before [[nope.md]] after\n");
        assert_eq!(expanded.text, "before [[nope.md]] after\n");
        assert_eq!(expanded.warnings.len(), 1);
        assert!(expanded.warnings[0].starts_with("[[nope.md]]: cannot read"));
    }

    #[test]
    fn test_cycle_is_reported() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.md"), "A [[b.md]]").unwrap();
        fs::write(dir.path().join("b.md"), "B [[./a.md]]").unwrap();

        let expanded = expand(&dir, "[[a.md]]\n");
        assert_eq!(expanded.text, "A B [[./a.md]]\n");
        assert_eq!(expanded.warnings.len(), 1);
        assert!(expanded.warnings[0].contains("cycle"));
    }

    #[test]
    fn test_repeated_include_is_not_a_cycle() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("note.md"), "note").unwrap();

        let expanded = expand(&dir, "[[note.md]] and [[note.md]]\n");
        assert_eq!(expanded.text, "note and note\n");
        assert!(expanded.warnings.is_empty());
    }

    #[test]
    fn test_depth_limit() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.md"), "a [[b.md]]").unwrap();
        fs::write(dir.path().join("b.md"), "b").unwrap();

        let expanded = Includer::new(&read)
            .with_max_depth(1)
            .expand("[[a.md]]", dir.path());
        assert_eq!(expanded.text, "a [[b.md]]");
        assert!(expanded.warnings[0].contains("depth"));
    }

    #[test]
    fn test_fenced_code_is_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("x.md"), "X").unwrap();

        let src = "```\n[[x.md]]\n```\n[[x.md]]\n";
        let expanded = expand(&dir, src);
        assert_eq!(expanded.text, "```\n[[x.md]]\n```\nX\n");
    }

    #[test]
    fn test_custom_reader() {
        let reader = |path: &Path| -> io::Result<String> {
            Ok(format!("<{}>", path.file_stem().unwrap().to_string_lossy()))
        };
        let expanded = Includer::new(&reader).expand("[[intro.md]]", Path::new("/docs"));
        assert_eq!(expanded.text, "<intro>");
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("a/./b/../c.md")), PathBuf::from("a/c.md"));
        assert_eq!(normalize(Path::new("../x.md")), PathBuf::from("../x.md"));
    }
}
