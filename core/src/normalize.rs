//! Output normalization and comparison for judge verdicts.
//!
//! Rules: normalize line endings to `\n`, strip trailing whitespace
//! from each line, drop trailing blank lines, then compare exactly.

/// Normalizes program output for comparison. Pure and idempotent.
pub fn normalize_output(output: &str) -> String {
    if output.is_empty() {
        return String::new();
    }

    let unified = output.replace("\r\n", "\n").replace('\r', "\n");

    let mut lines: Vec<&str> = unified.split('\n').map(str::trim_end).collect();

    while lines.last() == Some(&"") {
        lines.pop();
    }

    lines.join("\n")
}

/// Returns true iff the normalized outputs are identical.
pub fn outputs_match(actual: &str, expected: &str) -> bool {
    normalize_output(actual) == normalize_output(expected)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_normalizes_to_empty() {
        assert_eq!(normalize_output(""), "");
    }

    #[test]
    fn line_endings_are_unified() {
        assert_eq!(normalize_output("a\r\nb\rc\n"), "a\nb\nc");
    }

    #[test]
    fn trailing_whitespace_per_line_is_stripped() {
        assert_eq!(normalize_output("a  \nb\t\nc"), "a\nb\nc");
    }

    #[test]
    fn trailing_blank_lines_are_dropped() {
        assert_eq!(normalize_output("a\nb\n\n\n"), "a\nb");
        assert_eq!(normalize_output("\n\n"), "");
    }

    #[test]
    fn normalize_is_idempotent() {
        for s in ["", "a \r\nb\r", "x\n\n y \n", "  lead kept\ntail\n"] {
            let once = normalize_output(s);
            assert_eq!(normalize_output(&once), once);
        }
    }

    #[test]
    fn match_is_insensitive_to_trailing_noise_only() {
        assert!(outputs_match("8\n", "8"));
        assert!(outputs_match("a b  \n\n", "a b"));
        // symmetric
        assert!(outputs_match("8", "8\n"));
        // internal whitespace and case still matter
        assert!(!outputs_match("a  b", "a b"));
        assert!(!outputs_match("Hello", "hello"));
        assert!(!outputs_match(" lead", "lead"));
    }
}
