use serde::Deserialize;
use serde_json::Value;

/// Upper bound on submitted code size, in bytes. Oversized code is an
/// internal error, never a verdict, and is rejected before any
/// process or container is spawned.
pub const MAX_CODE_BYTES: usize = 50_000;

/// Cap on captured stdout/stderr per stream, in bytes.
pub const MAX_OUTPUT_BYTES: usize = 64 * 1024;

pub const TRUNCATION_MARKER: &str = "\n[OUTPUT TRUNCATED]";

/// Result of one backend execution (either mode).
///
/// Backends never return errors to the caller; every failure mode is
/// represented here. `error` is an internal/infrastructure fault,
/// distinct from the user's code failing.
#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub timed_out: bool,
    /// Wall-clock execution time in milliseconds.
    pub elapsed_ms: u64,
    pub error: Option<String>,
}

impl ExecutionResult {
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self {
            exit_code: -1,
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn timed_out(elapsed_ms: u64) -> Self {
        Self {
            exit_code: -1,
            timed_out: true,
            elapsed_ms,
            ..Self::default()
        }
    }

    pub fn oversized_code() -> Self {
        Self::internal_error("Code exceeds maximum size limit")
    }
}

/// Returns true if `code` exceeds [`MAX_CODE_BYTES`].
pub fn code_too_large(code: &str) -> bool {
    code.len() > MAX_CODE_BYTES
}

/// Converts raw captured bytes into a display string, cut off at
/// `max_bytes` (on a UTF-8 boundary) with a truncation marker.
pub fn cap_output(raw: &[u8], max_bytes: usize) -> String {
    if raw.len() <= max_bytes {
        return String::from_utf8_lossy(raw).into_owned();
    }
    let mut end = max_bytes;
    while end > 0 && (raw[end] & 0xC0) == 0x80 {
        end -= 1;
    }
    let mut s = String::from_utf8_lossy(&raw[..end]).into_owned();
    s.push_str(TRUNCATION_MARKER);
    s
}

/// Failure of a function-call execution, as reported by the harness
/// or by the infrastructure around it.
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionError {
    Syntax { message: String, lineno: Option<u32> },
    Import { message: String },
    Runtime { message: String, traceback: String },
    Timeout,
    /// Backend/harness fault, not attributable to the user's code.
    Internal { message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionOutcome {
    /// The entrypoint returned this JSON value.
    Returned(Value),
    Failed(FunctionError),
}

/// Result of a function-call mode execution.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCallResult {
    pub outcome: FunctionOutcome,
    /// End-to-end wall clock, stamped by the runner facade.
    pub elapsed_ms: u64,
}

impl FunctionCallResult {
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self {
            outcome: FunctionOutcome::Failed(FunctionError::Internal {
                message: message.into(),
            }),
            elapsed_ms: 0,
        }
    }
}

/// The one JSON line the harness writes to stdout.
#[derive(Debug, Deserialize)]
struct HarnessLine {
    #[serde(default)]
    ok: bool,
    result: Option<Value>,
    error: Option<String>,
    message: Option<String>,
    traceback: Option<String>,
    lineno: Option<u32>,
}

/// Interprets a raw backend result of a harness run.
///
/// The harness prints exactly one JSON line on stdout; anything else
/// (no output, unparsable output, unknown error kind) is an internal
/// fault of the harness contract, not a user verdict.
pub fn parse_harness_result(exec: &ExecutionResult) -> FunctionOutcome {
    use FunctionError::*;

    if exec.timed_out {
        return FunctionOutcome::Failed(Timeout);
    }
    if let Some(err) = &exec.error {
        return FunctionOutcome::Failed(Internal {
            message: err.clone(),
        });
    }

    let stdout = exec.stdout.trim();
    if stdout.is_empty() {
        return FunctionOutcome::Failed(Internal {
            message: "Harness produced no output".to_owned(),
        });
    }

    let line: HarnessLine = match serde_json::from_str(stdout) {
        Ok(line) => line,
        Err(_) => {
            let head: String = stdout.chars().take(200).collect();
            return FunctionOutcome::Failed(Internal {
                message: format!("Harness output not valid JSON: {head}"),
            });
        }
    };

    if line.ok {
        return FunctionOutcome::Returned(line.result.unwrap_or(Value::Null));
    }

    let message = line.message.unwrap_or_else(|| "Unknown error".to_owned());
    match line.error.as_deref() {
        Some("syntax") => FunctionOutcome::Failed(Syntax {
            message,
            lineno: line.lineno,
        }),
        Some("import") => FunctionOutcome::Failed(Import { message }),
        Some("runtime") => FunctionOutcome::Failed(Runtime {
            message,
            traceback: line.traceback.unwrap_or_default(),
        }),
        other => FunctionOutcome::Failed(Internal {
            message: format!(
                "Harness reported unknown error kind '{}': {}",
                other.unwrap_or("<none>"),
                message
            ),
        }),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn exec_with_stdout(stdout: &str) -> ExecutionResult {
        ExecutionResult {
            stdout: stdout.to_owned(),
            ..ExecutionResult::default()
        }
    }

    #[test]
    fn cap_output_passes_small_output_through() {
        assert_eq!(cap_output(b"hello\n", 64), "hello\n");
    }

    #[test]
    fn cap_output_truncates_and_marks() {
        let out = cap_output(b"abcdefgh", 4);
        assert_eq!(out, format!("abcd{TRUNCATION_MARKER}"));
    }

    #[test]
    fn cap_output_never_splits_a_utf8_sequence() {
        // "aé" = 61 C3 A9; cutting at byte 2 lands inside 'é'
        let out = cap_output("aé".as_bytes(), 2);
        assert_eq!(out, format!("a{TRUNCATION_MARKER}"));
    }

    #[test]
    fn ok_line_yields_the_returned_value() {
        let exec = exec_with_stdout(r#"{"ok": true, "result": [1, 2]}"#);
        assert_eq!(
            parse_harness_result(&exec),
            FunctionOutcome::Returned(serde_json::json!([1, 2]))
        );
    }

    #[test]
    fn ok_line_without_result_is_null() {
        let exec = exec_with_stdout(r#"{"ok": true}"#);
        assert_eq!(
            parse_harness_result(&exec),
            FunctionOutcome::Returned(Value::Null)
        );
    }

    #[test]
    fn runtime_error_line_carries_traceback() {
        let exec = ExecutionResult {
            stdout: r#"{"error": "runtime", "message": "boom", "traceback": "tb"}"#.to_owned(),
            exit_code: 1,
            ..ExecutionResult::default()
        };
        assert_eq!(
            parse_harness_result(&exec),
            FunctionOutcome::Failed(FunctionError::Runtime {
                message: "boom".to_owned(),
                traceback: "tb".to_owned(),
            })
        );
    }

    #[test]
    fn syntax_error_line_carries_lineno() {
        let exec = exec_with_stdout(r#"{"error": "syntax", "message": "bad", "lineno": 3}"#);
        assert_eq!(
            parse_harness_result(&exec),
            FunctionOutcome::Failed(FunctionError::Syntax {
                message: "bad".to_owned(),
                lineno: Some(3),
            })
        );
    }

    #[test]
    fn empty_stdout_is_an_internal_fault() {
        let exec = exec_with_stdout("   \n");
        let FunctionOutcome::Failed(FunctionError::Internal { message }) =
            parse_harness_result(&exec)
        else {
            panic!("expected internal error");
        };
        assert!(message.contains("no output"));
    }

    #[test]
    fn garbage_stdout_is_an_internal_fault() {
        let exec = exec_with_stdout("Traceback (most recent call last):");
        let FunctionOutcome::Failed(FunctionError::Internal { message }) =
            parse_harness_result(&exec)
        else {
            panic!("expected internal error");
        };
        assert!(message.contains("not valid JSON"));
    }

    #[test]
    fn timeout_flag_wins_over_stdout_content() {
        let mut exec = exec_with_stdout(r#"{"ok": true, "result": 1}"#);
        exec.timed_out = true;
        assert_eq!(
            parse_harness_result(&exec),
            FunctionOutcome::Failed(FunctionError::Timeout)
        );
    }

    #[test]
    fn backend_error_passes_through_as_internal() {
        let exec = ExecutionResult::internal_error("Sandbox execution failed: no docker");
        let FunctionOutcome::Failed(FunctionError::Internal { message }) =
            parse_harness_result(&exec)
        else {
            panic!("expected internal error");
        };
        assert!(message.contains("no docker"));
    }

    #[test]
    fn unknown_error_kind_is_an_internal_fault() {
        let exec = exec_with_stdout(r#"{"error": "weird", "message": "m"}"#);
        let FunctionOutcome::Failed(FunctionError::Internal { message }) =
            parse_harness_result(&exec)
        else {
            panic!("expected internal error");
        };
        assert!(message.contains("weird"));
    }
}
