use serde::{Deserialize, Serialize};

/// How a problem evaluates submissions: raw stdin/stdout comparison,
/// or a direct function/method call with JSON-encoded arguments.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter, Serialize, Deserialize,
)]
pub enum JudgeMode {
    #[serde(rename = "stdin")]
    #[strum(to_string = "stdin")]
    StdinStdout,

    #[serde(rename = "function")]
    #[strum(to_string = "function")]
    FunctionCall,
}

/// Shape of the entrypoint in function-call mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EntrypointKind {
    /// A bare module-level function.
    Function,
    /// A method on a `Solution` class instance.
    Class,
}

/// Execution state of a submission. Transitions are strictly forward.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Running,
    Done,
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid submission status transition {from} -> {to}")]
pub struct StatusTransitionError {
    pub from: SubmissionStatus,
    pub to: SubmissionStatus,
}

/// Judge result after execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, Serialize, Deserialize)]
pub enum Verdict {
    /// Not yet judged.
    #[serde(rename = "pending")]
    #[strum(to_string = "Pending")]
    Pending,

    #[serde(rename = "AC")]
    #[strum(to_string = "Accepted")]
    Accepted,

    #[serde(rename = "WA")]
    #[strum(to_string = "Wrong Answer")]
    WrongAnswer,

    #[serde(rename = "RE")]
    #[strum(to_string = "Runtime Error")]
    RuntimeError,

    #[serde(rename = "TLE")]
    #[strum(to_string = "Time Limit Exceeded")]
    TimeLimitExceeded,

    /// Syntax error (Python has no separate compile step).
    #[serde(rename = "CE")]
    #[strum(to_string = "Compilation Error")]
    CompileError,
}

impl Verdict {
    pub const fn code(&self) -> &'static str {
        use Verdict::*;
        match self {
            Pending => "pending",
            Accepted => "AC",
            WrongAnswer => "WA",
            RuntimeError => "RE",
            TimeLimitExceeded => "TLE",
            CompileError => "CE",
        }
    }
}

/// A problem definition, as read from the external data layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub id: i64,
    pub title: String,
    pub judge_mode: JudgeMode,

    /// Function-call mode only.
    #[serde(default = "default_entrypoint_kind")]
    pub entrypoint_kind: EntrypointKind,

    /// Function-call mode only; name of the function or method to call.
    #[serde(default)]
    pub entrypoint_name: Option<String>,

    /// Pre-filled editor content shown to the submitter.
    #[serde(default)]
    pub starter_code: Option<String>,
}

fn default_entrypoint_kind() -> EntrypointKind {
    EntrypointKind::Class
}

/// Per-test-case comparison policy for function-call mode.
///
/// Defaults keep strict ordered deep equality (integer/float JSON
/// numbers still compare numerically, matching Python `8 == 8.0`).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ValueCompare {
    /// Absolute tolerance applied to numeric comparisons.
    #[serde(default)]
    pub float_tolerance: Option<f64>,

    /// Match arrays as multisets instead of sequences.
    #[serde(default)]
    pub ignore_order: bool,
}

/// One test case of a problem, as read from the external data layer.
///
/// Stdin mode: `input_data`/`expected_output` are raw text.
/// Function mode: `input_data` is a JSON object (kwargs) or array
/// (positional args); `expected_output` is any JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: i64,
    pub input_data: String,
    pub expected_output: String,

    /// Human-readable input, shown to users for sample cases.
    #[serde(default)]
    pub display_input: String,

    /// Sample cases are visible to the submitter; all others are hidden.
    #[serde(default)]
    pub is_sample: bool,

    #[serde(default)]
    pub compare: ValueCompare,
}

/// Result of running one test case.
///
/// `stdout`/`stderr`/`expected`/`input_display` are populated only
/// when `is_sample` is true; hidden case content never reaches the
/// submitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCaseResult {
    pub test_id: i64,
    pub is_sample: bool,
    pub passed: bool,
    pub verdict: Verdict,
    pub stdout: String,
    pub stderr: String,
    pub expected: String,
    pub input_display: String,
    pub elapsed_ms: u64,
}

/// A user's code submission for a problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: i64,
    pub problem_id: i64,
    pub code: String,
    pub language: String,
    pub status: SubmissionStatus,
    pub verdict: Verdict,

    /// Captured/summary standard output (from the first failing case,
    /// or a fixed success message).
    pub stdout: String,
    pub stderr: String,

    pub test_results: Vec<TestCaseResult>,

    /// Total wall-clock execution time across all test cases.
    pub execution_time_ms: u64,
}

impl Submission {
    pub fn new(id: i64, problem_id: i64, code: impl Into<String>) -> Self {
        Self {
            id,
            problem_id,
            code: code.into(),
            language: "python".to_owned(),
            status: SubmissionStatus::Pending,
            verdict: Verdict::Pending,
            stdout: String::new(),
            stderr: String::new(),
            test_results: Vec::new(),
            execution_time_ms: 0,
        }
    }

    /// Moves the status forward. Going backward is a programming fault.
    pub fn advance(&mut self, to: SubmissionStatus) -> Result<(), StatusTransitionError> {
        if to < self.status {
            return Err(StatusTransitionError {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}
