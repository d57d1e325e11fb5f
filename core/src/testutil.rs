//! Scripted backend for engine and facade tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::exec::{ExecBackend, ExecutionResult};

/// Replays pre-scripted results in order; an unscripted call returns
/// an internal error so a test can never silently over-execute.
#[derive(Default)]
pub(crate) struct FakeBackend {
    stdin_results: Mutex<VecDeque<ExecutionResult>>,
    function_results: Mutex<VecDeque<ExecutionResult>>,
}

impl FakeBackend {
    pub fn with_stdin_results(results: Vec<ExecutionResult>) -> Self {
        Self {
            stdin_results: Mutex::new(results.into()),
            ..Self::default()
        }
    }

    pub fn with_function_results(results: Vec<ExecutionResult>) -> Self {
        Self {
            function_results: Mutex::new(results.into()),
            ..Self::default()
        }
    }

    /// A clean exit printing `stdout`.
    pub fn ok_stdout(stdout: &str) -> ExecutionResult {
        ExecutionResult {
            stdout: stdout.to_owned(),
            ..ExecutionResult::default()
        }
    }

    /// A harness run whose entrypoint returned `value`.
    pub fn harness_returned(value: serde_json::Value) -> ExecutionResult {
        ExecutionResult {
            stdout: serde_json::json!({"ok": true, "result": value}).to_string(),
            ..ExecutionResult::default()
        }
    }

    /// A harness run that failed with the given error line.
    pub fn harness_failed(line: serde_json::Value) -> ExecutionResult {
        ExecutionResult {
            stdout: line.to_string(),
            exit_code: 1,
            ..ExecutionResult::default()
        }
    }
}

#[async_trait]
impl ExecBackend for FakeBackend {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn run_stdin(&self, _: &str, _: &str, _: Duration) -> ExecutionResult {
        self.stdin_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                ExecutionResult::internal_error("FakeBackend: no scripted stdin result left")
            })
    }

    async fn run_function(&self, _: &str, _: &str, _: &str, _: Duration) -> ExecutionResult {
        self.function_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                ExecutionResult::internal_error("FakeBackend: no scripted function result left")
            })
    }
}
