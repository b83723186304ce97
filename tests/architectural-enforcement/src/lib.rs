//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles:
//! - No sleep() calls in production code (wait on I/O or cancellation instead)
//! - No unwrap()/expect() in the core library outside tests
//! - The core library stays free of terminal and CLI crates
//!
//! The helpers here scan source files with `walkdir`; the checks themselves
//! live under `tests/`.

use std::fs;
use std::path::{Path, PathBuf};

/// Production source trees, relative to the workspace root
pub const PRODUCTION_DIRS: [&str; 2] = ["docent/core/src", "docent/cli/src"];

/// Absolute path of the workspace root
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

/// One offending source line
#[derive(Debug)]
pub struct Violation {
    pub path: PathBuf,
    pub line: usize,
    pub text: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} - {}", self.path.display(), self.line, self.text)
    }
}

/// Every `.rs` file under `dir` (relative to the workspace root)
pub fn rust_files(dir: &str) -> Vec<PathBuf> {
    walkdir::WalkDir::new(workspace_root().join(dir))
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// Lines of a file up to its `#[cfg(test)] mod tests` block
///
/// Test modules sit at the bottom of each file, so everything above the
/// first `mod tests` is production code.
pub fn production_lines(content: &str) -> Vec<(usize, &str)> {
    let lines: Vec<&str> = content.lines().collect();
    let end = lines
        .windows(2)
        .position(|pair| pair[0].trim() == "#[cfg(test)]" && pair[1].trim_start().starts_with("mod tests"))
        .unwrap_or(lines.len());
    lines[..end]
        .iter()
        .enumerate()
        .map(|(idx, line)| (idx + 1, *line))
        .collect()
}

/// Strip a trailing `//` comment
pub fn code_part(line: &str) -> &str {
    line.split("//").next().unwrap_or(line)
}

/// Whether a line of code calls a sleep function
pub fn is_sleep_call(code: &str) -> bool {
    code.contains("::sleep(") || code.contains(".sleep(")
}

/// Whether a line of code panics on an error value
pub fn is_unwrap_call(code: &str) -> bool {
    code.contains(".unwrap()") || code.contains(".expect(")
}

/// Production lines of `content` that `matches` flags, as `(line, text)`
pub fn scan_source(content: &str, matches: impl Fn(&str) -> bool) -> Vec<(usize, String)> {
    production_lines(content)
        .into_iter()
        .filter(|(_, text)| matches(code_part(text)))
        .map(|(line, text)| (line, text.trim().to_string()))
        .collect()
}

/// Scan production lines of every file under `dirs` for `matches`
pub fn find_violations(dirs: &[&str], matches: impl Fn(&str) -> bool) -> Vec<Violation> {
    let mut violations = Vec::new();
    for dir in dirs {
        for path in rust_files(dir) {
            let Ok(content) = fs::read_to_string(&path) else {
                continue;
            };
            for (line, text) in scan_source(&content, &matches) {
                violations.push(Violation {
                    path: path.clone(),
                    line,
                    text,
                });
            }
        }
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_lines_stop_at_test_module() {
        let content = "fn a() {}\n#[cfg(test)]\nfn helper() {}\n#[cfg(test)]\nmod tests {\n    fn b() {}\n}\n";
        let lines = production_lines(content);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2], (3, "fn helper() {}"));
    }

    #[test]
    fn test_code_part_strips_comments() {
        assert_eq!(code_part("let x = 1; // sleep(1)"), "let x = 1; ");
        assert_eq!(code_part("//! docs"), "");
    }

    #[test]
    fn test_production_dirs_exist() {
        for dir in PRODUCTION_DIRS {
            assert!(!rust_files(dir).is_empty(), "no sources found under {dir}");
        }
    }
}
