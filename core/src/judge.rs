//! Judge engine: syntax pre-check, per-test-case execution via the
//! runner facade, output/value comparison, verdict aggregation.
//!
//! Two modes, selected by the problem: stdin/stdout comparison and
//! function-call (the harness invokes the entrypoint and the returned
//! JSON value is compared structurally).

use std::cmp::Reverse;
use std::process::Stdio;
use std::time::Duration;

use serde_json::Value;
use tokio::process::Command;

use crate::exec::backend::drive_child;
use crate::exec::{FunctionError, FunctionOutcome, Runner};
use crate::model::{
    JudgeMode, Problem, TestCase, TestCaseResult, ValueCompare, Verdict,
};
use crate::normalize::outputs_match;

pub const SUCCESS_MESSAGE: &str = "All test cases passed!";
pub const NO_TEST_CASES_MESSAGE: &str = "No test cases defined.";

/// Prefix on error text caused by the judge infrastructure rather
/// than the user's code.
pub const INTERNAL_ERROR_PREFIX: &str = "Internal error: ";

const SYNTAX_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Overall result of judging one submission.
#[derive(Debug, Clone, PartialEq)]
pub struct JudgeOutcome {
    pub verdict: Verdict,
    pub test_results: Vec<TestCaseResult>,
    /// Summary stdout for display (first failing case, or the fixed
    /// success message).
    pub stdout: String,
    pub stderr: String,
    /// 1-indexed position of the first failing case.
    pub failed_test_index: Option<usize>,
    pub total_time_ms: u64,
}

impl JudgeOutcome {
    fn terminal(verdict: Verdict, stdout: &str, stderr: String) -> Self {
        Self {
            verdict,
            test_results: Vec::new(),
            stdout: stdout.to_owned(),
            stderr,
            failed_test_index: None,
            total_time_ms: 0,
        }
    }
}

/// Parses stdin-fed source with `ast.parse` and reports any
/// SyntaxError as one JSON line. Executes no user code.
const SYNTAX_CHECKER: &str = r#"import ast, json, sys
src = sys.stdin.read()
try:
    ast.parse(src)
except SyntaxError as e:
    print(json.dumps({"lineno": e.lineno, "msg": str(e.msg), "text": (e.text or "").strip()}))
    sys.exit(1)
"#;

#[derive(Debug, Clone, PartialEq)]
pub enum SyntaxCheck {
    Valid,
    Invalid {
        lineno: Option<u32>,
        message: String,
        text: String,
    },
    /// The checker itself could not run; not a user fault.
    Unavailable(String),
}

#[derive(Debug, serde::Deserialize)]
struct SyntaxErrorLine {
    lineno: Option<u32>,
    msg: String,
    #[serde(default)]
    text: String,
}

/// Checks whether `code` parses as Python, without executing it.
pub async fn check_syntax(python_bin: &str, code: &str) -> SyntaxCheck {
    let child = Command::new(python_bin)
        .args(["-I", "-c", SYNTAX_CHECKER])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn();
    let child = match child {
        Ok(child) => child,
        Err(e) => return SyntaxCheck::Unavailable(format!("Cannot run '{python_bin}': {e}")),
    };

    let res = drive_child(child, Some(code.as_bytes()), SYNTAX_CHECK_TIMEOUT).await;
    if let Some(err) = res.error {
        return SyntaxCheck::Unavailable(err);
    }
    if res.timed_out {
        return SyntaxCheck::Unavailable("Syntax checker timed out".to_owned());
    }
    if res.exit_code == 0 {
        return SyntaxCheck::Valid;
    }
    match serde_json::from_str::<SyntaxErrorLine>(res.stdout.trim()) {
        Ok(line) => SyntaxCheck::Invalid {
            lineno: line.lineno,
            message: line.msg,
            text: line.text,
        },
        Err(_) => SyntaxCheck::Unavailable(format!(
            "Syntax checker exited with code {} and unreadable output",
            res.exit_code
        )),
    }
}

fn format_syntax_error(lineno: Option<u32>, message: &str, text: &str) -> String {
    let line = lineno.map_or_else(|| "?".to_owned(), |n| n.to_string());
    let mut out = format!("Syntax Error:\nLine {line}: {message}");
    if !text.is_empty() {
        out.push_str(&format!("\n  {text}"));
    }
    out
}

/// Samples first, then creation order. Hidden cases run after every
/// sample has been evaluated.
fn ordered_cases(cases: &[TestCase]) -> Vec<&TestCase> {
    let mut v: Vec<&TestCase> = cases.iter().collect();
    v.sort_by_key(|tc| (Reverse(tc.is_sample), tc.id));
    v
}

/// Deep structural equality between a returned and an expected JSON
/// value. Integer and float numbers compare numerically (Python
/// `8 == 8.0` semantics); `cmp` optionally adds an absolute float
/// tolerance and order-insensitive array matching.
pub fn values_equal(actual: &Value, expected: &Value, cmp: &ValueCompare) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => {
            if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
                return match cmp.float_tolerance {
                    Some(tol) => ((x as f64) - (y as f64)).abs() <= tol,
                    None => x == y,
                };
            }
            match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => match cmp.float_tolerance {
                    Some(tol) => (x - y).abs() <= tol,
                    None => x == y,
                },
                _ => a == b,
            }
        }
        (Value::Array(a), Value::Array(b)) => {
            if a.len() != b.len() {
                return false;
            }
            if cmp.ignore_order {
                let mut used = vec![false; b.len()];
                a.iter().all(|x| {
                    b.iter().enumerate().any(|(j, y)| {
                        if !used[j] && values_equal(x, y, cmp) {
                            used[j] = true;
                            true
                        } else {
                            false
                        }
                    })
                })
            } else {
                a.iter().zip(b).all(|(x, y)| values_equal(x, y, cmp))
            }
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).is_some_and(|w| values_equal(v, w, cmp)))
        }
        _ => actual == expected,
    }
}

fn format_value_for_display(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Judges `code` against the problem's test cases. Routes on the
/// problem's judge mode.
///
/// An `Err` from this function is a fault of the judge itself; the
/// lifecycle controller converts it to a terminal RuntimeError so a
/// submission can never hang mid-judging.
pub async fn judge_submission(
    runner: &Runner,
    problem: &Problem,
    test_cases: &[TestCase],
    code: &str,
) -> anyhow::Result<JudgeOutcome> {
    match check_syntax(&runner.config().python_bin, code).await {
        SyntaxCheck::Invalid {
            lineno,
            message,
            text,
        } => {
            return Ok(JudgeOutcome::terminal(
                Verdict::CompileError,
                "",
                format_syntax_error(lineno, &message, &text),
            ));
        }
        SyntaxCheck::Unavailable(why) => {
            log::warn!("Skipping syntax pre-check: {why}");
        }
        SyntaxCheck::Valid => {}
    }

    match problem.judge_mode {
        JudgeMode::StdinStdout => judge_stdin_stdout(runner, test_cases, code).await,
        JudgeMode::FunctionCall => judge_function_call(runner, problem, test_cases, code).await,
    }
}

/// One evaluated case, before sample gating is applied.
struct CaseEvaluation {
    verdict: Verdict,
    stdout: String,
    stderr: String,
    expected: String,
}

/// Aggregation shared by both modes: records per-case results with
/// sample-only fields gated, fixes the verdict on the first failure,
/// and stops after a failing hidden case. After a sample failure the
/// remaining cases still run so the learner sees full sample-level
/// feedback.
struct VerdictAccumulator {
    test_results: Vec<TestCaseResult>,
    final_verdict: Verdict,
    failed_index: Option<usize>,
    combined_stdout: String,
    combined_stderr: String,
    total_time_ms: u64,
}

impl VerdictAccumulator {
    fn new() -> Self {
        Self {
            test_results: Vec::new(),
            final_verdict: Verdict::Accepted,
            failed_index: None,
            combined_stdout: String::new(),
            combined_stderr: String::new(),
            total_time_ms: 0,
        }
    }

    /// Returns false when judging should stop (first hidden failure).
    fn record(&mut self, position: usize, tc: &TestCase, eval: CaseEvaluation, elapsed_ms: u64) -> bool {
        let passed = eval.verdict == Verdict::Accepted;
        self.total_time_ms += elapsed_ms;
        self.test_results.push(TestCaseResult {
            test_id: tc.id,
            is_sample: tc.is_sample,
            passed,
            verdict: eval.verdict,
            stdout: if tc.is_sample {
                eval.stdout.clone()
            } else {
                String::new()
            },
            stderr: if tc.is_sample {
                eval.stderr.clone()
            } else {
                String::new()
            },
            expected: if tc.is_sample { eval.expected } else { String::new() },
            input_display: if tc.is_sample {
                tc.display_input.clone()
            } else {
                String::new()
            },
            elapsed_ms,
        });

        if !passed && self.final_verdict == Verdict::Accepted {
            self.final_verdict = eval.verdict;
            self.failed_index = Some(position);
            self.combined_stdout = eval.stdout;
            self.combined_stderr = eval.stderr;
            if !tc.is_sample {
                return false;
            }
        }
        true
    }

    fn finish(mut self) -> JudgeOutcome {
        if self.final_verdict == Verdict::Accepted {
            self.combined_stdout = SUCCESS_MESSAGE.to_owned();
        }
        JudgeOutcome {
            verdict: self.final_verdict,
            test_results: self.test_results,
            stdout: self.combined_stdout,
            stderr: self.combined_stderr,
            failed_test_index: self.failed_index,
            total_time_ms: self.total_time_ms,
        }
    }
}

async fn judge_stdin_stdout(
    runner: &Runner,
    test_cases: &[TestCase],
    code: &str,
) -> anyhow::Result<JudgeOutcome> {
    let cases = ordered_cases(test_cases);
    if cases.is_empty() {
        return Ok(JudgeOutcome::terminal(
            Verdict::Accepted,
            NO_TEST_CASES_MESSAGE,
            String::new(),
        ));
    }

    let mut acc = VerdictAccumulator::new();
    for (i, tc) in cases.iter().enumerate() {
        let result = runner.run_with_stdin(code, &tc.input_data).await;

        let (verdict, stderr) = if let Some(err) = &result.error {
            (
                Verdict::RuntimeError,
                format!("{INTERNAL_ERROR_PREFIX}{err}"),
            )
        } else if result.timed_out {
            (Verdict::TimeLimitExceeded, result.stderr.clone())
        } else if result.exit_code != 0 {
            (Verdict::RuntimeError, result.stderr.clone())
        } else if outputs_match(&result.stdout, &tc.expected_output) {
            (Verdict::Accepted, result.stderr.clone())
        } else {
            (Verdict::WrongAnswer, result.stderr.clone())
        };

        let eval = CaseEvaluation {
            verdict,
            stdout: result.stdout,
            stderr,
            expected: tc.expected_output.clone(),
        };
        if !acc.record(i + 1, tc, eval, result.elapsed_ms) {
            break;
        }
    }
    Ok(acc.finish())
}

async fn judge_function_call(
    runner: &Runner,
    problem: &Problem,
    test_cases: &[TestCase],
    code: &str,
) -> anyhow::Result<JudgeOutcome> {
    let Some(entrypoint_name) = problem
        .entrypoint_name
        .as_deref()
        .filter(|name| !name.is_empty())
    else {
        return Ok(JudgeOutcome::terminal(
            Verdict::RuntimeError,
            "",
            "Problem configuration error: no entrypoint name specified.".to_owned(),
        ));
    };

    let cases = ordered_cases(test_cases);
    if cases.is_empty() {
        return Ok(JudgeOutcome::terminal(
            Verdict::Accepted,
            NO_TEST_CASES_MESSAGE,
            String::new(),
        ));
    }

    let mut acc = VerdictAccumulator::new();
    for (i, tc) in cases.iter().enumerate() {
        let result = runner
            .run_function_call(code, problem.entrypoint_kind, entrypoint_name, &tc.input_data)
            .await;

        let eval = match serde_json::from_str::<Value>(&tc.expected_output) {
            // A stored expectation that is not valid JSON is a server
            // side fault, never attributed to the user.
            Err(_) => CaseEvaluation {
                verdict: Verdict::RuntimeError,
                stdout: String::new(),
                stderr: format!(
                    "{INTERNAL_ERROR_PREFIX}Invalid expected output JSON: {}",
                    tc.expected_output
                ),
                expected: String::new(),
            },
            Ok(expected) => evaluate_function_case(&result.outcome, &expected, &tc.compare),
        };

        if !acc.record(i + 1, tc, eval, result.elapsed_ms) {
            break;
        }
    }
    Ok(acc.finish())
}

fn evaluate_function_case(
    outcome: &FunctionOutcome,
    expected: &Value,
    cmp: &ValueCompare,
) -> CaseEvaluation {
    let expected_display = format_value_for_display(expected);
    match outcome {
        FunctionOutcome::Returned(actual) => {
            let verdict = if values_equal(actual, expected, cmp) {
                Verdict::Accepted
            } else {
                Verdict::WrongAnswer
            };
            CaseEvaluation {
                verdict,
                stdout: format_value_for_display(actual),
                stderr: String::new(),
                expected: expected_display,
            }
        }
        FunctionOutcome::Failed(err) => {
            let (verdict, stderr) = match err {
                FunctionError::Timeout => (
                    Verdict::TimeLimitExceeded,
                    "Time limit exceeded".to_owned(),
                ),
                FunctionError::Syntax { message, .. } => (
                    Verdict::CompileError,
                    format!("Syntax Error: {message}"),
                ),
                FunctionError::Import { message } => (Verdict::RuntimeError, message.clone()),
                FunctionError::Runtime { message, traceback } => (
                    Verdict::RuntimeError,
                    if traceback.is_empty() {
                        message.clone()
                    } else {
                        traceback.clone()
                    },
                ),
                FunctionError::Internal { message } => (
                    Verdict::RuntimeError,
                    format!("{INTERNAL_ERROR_PREFIX}{message}"),
                ),
            };
            CaseEvaluation {
                verdict,
                stdout: String::new(),
                stderr,
                expected: expected_display,
            }
        }
    }
}
