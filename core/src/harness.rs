//! Harness generation for function-call mode.
//!
//! The harness is a self-contained Python program written next to the
//! user's code. It imports the submission, calls the configured
//! entrypoint with arguments read from `input.json`, and prints
//! exactly one JSON line to stdout:
//!
//! - success: `{"ok": true, "result": <value>}`
//! - failure: `{"error": "syntax"|"import"|"runtime", "message": ...}`
//!   plus `lineno` for syntax errors and `traceback` for runtime ones,
//!   with a non-zero exit code.
//!
//! The judge engine depends on this single-line contract.

use lazy_regex::regex_is_match;

use crate::model::EntrypointKind;

/// Module name the user's code is written under (`submission.py`).
pub const USER_MODULE: &str = "submission";
/// File name of the generated harness in the scratch dir.
pub const HARNESS_FILENAME: &str = "runner.py";
/// File the harness reads the JSON-encoded arguments from.
pub const ARGS_FILENAME: &str = "input.json";
/// File name of the user's program in stdin/stdout mode.
pub const STDIN_PROGRAM_FILENAME: &str = "solution.py";

pub type Result<T> = std::result::Result<T, HarnessError>;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum HarnessError {
    #[error("Entrypoint name '{0}' is not a valid Python identifier")]
    InvalidEntrypointName(String),
}

const CLASS_TEMPLATE: &str = r#"import json
import sys

try:
    from submission import Solution
except SyntaxError as e:
    print(json.dumps({"error": "syntax", "message": str(e), "lineno": e.lineno}))
    sys.exit(1)
except Exception as e:
    print(json.dumps({"error": "import", "message": str(e)}))
    sys.exit(1)

try:
    with open("input.json", "r") as f:
        args = json.load(f)

    solution = Solution()
    method = getattr(solution, "{entrypoint}")

    if isinstance(args, dict):
        result = method(**args)
    else:
        result = method(*args)

    print(json.dumps({"ok": True, "result": result}))
except Exception as e:
    import traceback
    print(json.dumps({
        "error": "runtime",
        "message": str(e),
        "traceback": traceback.format_exc()
    }))
    sys.exit(1)
"#;

const FUNCTION_TEMPLATE: &str = r#"import json
import sys

try:
    from submission import {entrypoint}
except SyntaxError as e:
    print(json.dumps({"error": "syntax", "message": str(e), "lineno": e.lineno}))
    sys.exit(1)
except Exception as e:
    print(json.dumps({"error": "import", "message": str(e)}))
    sys.exit(1)

try:
    with open("input.json", "r") as f:
        args = json.load(f)

    if isinstance(args, dict):
        result = {entrypoint}(**args)
    else:
        result = {entrypoint}(*args)

    print(json.dumps({"ok": True, "result": result}))
except Exception as e:
    import traceback
    print(json.dumps({
        "error": "runtime",
        "message": str(e),
        "traceback": traceback.format_exc()
    }))
    sys.exit(1)
"#;

/// Builds the harness source for the given entrypoint.
///
/// The name is validated as a Python identifier before substitution,
/// so problem configuration can never inject code into the harness.
pub fn build_harness(kind: EntrypointKind, entrypoint_name: &str) -> Result<String> {
    if !is_valid_identifier(entrypoint_name) {
        return Err(HarnessError::InvalidEntrypointName(
            entrypoint_name.to_owned(),
        ));
    }
    let template = match kind {
        EntrypointKind::Class => CLASS_TEMPLATE,
        EntrypointKind::Function => FUNCTION_TEMPLATE,
    };
    Ok(template.replace("{entrypoint}", entrypoint_name))
}

fn is_valid_identifier(name: &str) -> bool {
    regex_is_match!(r"^[A-Za-z_][A-Za-z0-9_]*$", name)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn function_harness_imports_and_calls_the_entrypoint() {
        let src = build_harness(EntrypointKind::Function, "two_sum").unwrap();
        assert!(src.contains("from submission import two_sum"));
        assert!(src.contains("result = two_sum(**args)"));
        assert!(src.contains("result = two_sum(*args)"));
        assert!(!src.contains("{entrypoint}"));
    }

    #[test]
    fn class_harness_instantiates_solution_first() {
        let src = build_harness(EntrypointKind::Class, "twoSum").unwrap();
        assert!(src.contains("from submission import Solution"));
        assert!(src.contains("solution = Solution()"));
        assert!(src.contains(r#"getattr(solution, "twoSum")"#));
    }

    #[test]
    fn harness_reports_each_error_kind() {
        let src = build_harness(EntrypointKind::Function, "f").unwrap();
        for kind in ["\"syntax\"", "\"import\"", "\"runtime\""] {
            assert!(src.contains(kind), "missing error kind {kind}");
        }
        assert!(src.contains(r#""ok": True"#));
        assert!(src.contains("e.lineno"));
        assert!(src.contains("traceback.format_exc()"));
    }

    #[test]
    fn harness_reads_args_from_the_fixed_location() {
        let src = build_harness(EntrypointKind::Function, "f").unwrap();
        assert!(src.contains(&format!(r#"open("{ARGS_FILENAME}", "r")"#)));
    }

    #[test]
    fn invalid_entrypoint_names_are_rejected() {
        for bad in ["", "1abc", "a-b", "a b", "f()", "x;import os", "naïve"] {
            let err = build_harness(EntrypointKind::Function, bad).unwrap_err();
            assert_eq!(err, HarnessError::InvalidEntrypointName(bad.to_owned()));
        }
    }
}
