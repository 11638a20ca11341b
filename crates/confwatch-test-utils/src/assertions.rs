//! Custom assertion helpers for common test patterns.

use std::path::Path;

/// Assert that a file's content equals expected text exactly.
pub fn assert_file_equals(path: &Path, expected: &str) {
    let content = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read file {}: {}", path.display(), e));

    if content != expected {
        panic!(
            "File {} content does not match expected.\n{}",
            path.display(),
            line_diff(expected, &content)
        );
    }
}

/// Assert that a unified diff removes and adds the given lines.
///
/// Lines are given without their `-`/`+` marker.
///
/// # Example
///
/// ```rust
/// use confwatch_test_utils::assertions::assert_diff_contains;
///
/// let diff = "--- a\n+++ b\n@@ -1 +1 @@\n-A=1\n+A=2\n";
/// assert_diff_contains(diff, &["A=1"], &["A=2"]);
/// ```
pub fn assert_diff_contains(diff: &str, removed: &[&str], added: &[&str]) {
    let lines: Vec<&str> = diff.lines().collect();

    for line in removed {
        let wanted = format!("-{}", line);
        assert!(
            lines.iter().any(|l| *l == wanted && !l.starts_with("---")),
            "Diff does not remove {:?}.\nDiff:\n{}",
            line,
            diff
        );
    }
    for line in added {
        let wanted = format!("+{}", line);
        assert!(
            lines.iter().any(|l| *l == wanted && !l.starts_with("+++")),
            "Diff does not add {:?}.\nDiff:\n{}",
            line,
            diff
        );
    }
}

/// Assert that a diff reports no differences.
pub fn assert_diff_empty(diff: &str) {
    assert!(diff.is_empty(), "Expected empty diff, got:\n{}", diff);
}

fn line_diff(expected: &str, actual: &str) -> String {
    let diff = similar::TextDiff::from_lines(expected, actual);
    let mut output = String::new();

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            similar::ChangeTag::Delete => "-",
            similar::ChangeTag::Insert => "+",
            similar::ChangeTag::Equal => " ",
        };
        output.push_str(&format!("{}{}", sign, change));
    }

    output
}

/// Assert that a result is Ok and extract the value.
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
}

/// Assert that a result is Err and extract the error.
#[macro_export]
macro_rules! assert_err {
    ($expr:expr) => {
        match $expr {
            Ok(value) => panic!("Expected Err, got Ok: {:?}", value),
            Err(e) => e,
        }
    };
}
