use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::backend::{drive_child, ExecBackend};
use super::result::{code_too_large, ExecutionResult};
use crate::harness::{ARGS_FILENAME, HARNESS_FILENAME, STDIN_PROGRAM_FILENAME, USER_MODULE};

/// Executes code as a bare OS process with a minimized environment.
///
/// No memory/CPU/network confinement — this is the lowest isolation
/// level, intended only for trusted or demo operation. The runner
/// facade keeps untrusted code away from it in production-like
/// deployments.
#[derive(Debug, Clone)]
pub struct LocalProcessRunner {
    python_bin: PathBuf,
}

impl LocalProcessRunner {
    pub fn new(python_bin: impl Into<PathBuf>) -> Self {
        Self {
            python_bin: python_bin.into(),
        }
    }

    /// Minimal allow-list environment; nothing else is inherited.
    fn lockdown_env(cmd: &mut Command, scratch_dir: &Path) {
        cmd.env_clear()
            .env("PATH", "/usr/bin:/bin")
            .env("HOME", scratch_dir)
            .env("TMPDIR", scratch_dir)
            .env("PYTHONDONTWRITEBYTECODE", "1");
    }

    fn scratch_dir() -> std::io::Result<tempfile::TempDir> {
        tempfile::Builder::new().prefix("belay_").tempdir()
    }
}

#[async_trait]
impl ExecBackend for LocalProcessRunner {
    fn name(&self) -> &'static str {
        "local-process"
    }

    async fn run_stdin(
        &self,
        code: &str,
        stdin_input: &str,
        timeout: Duration,
    ) -> ExecutionResult {
        if code_too_large(code) {
            return ExecutionResult::oversized_code();
        }

        let dir = match Self::scratch_dir() {
            Ok(dir) => dir,
            Err(e) => return ExecutionResult::internal_error(format!("Execution failed: {e}")),
        };
        let code_path = dir.path().join(STDIN_PROGRAM_FILENAME);
        if let Err(e) = fsutil::write(&code_path, code) {
            return ExecutionResult::internal_error(format!("Execution failed: {e}"));
        }

        let mut cmd = Command::new(&self.python_bin);
        // -I: isolated mode, ignores PYTHON* env vars and user site-packages
        cmd.arg("-I")
            .arg(&code_path)
            .current_dir(dir.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        Self::lockdown_env(&mut cmd, dir.path());

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => return ExecutionResult::internal_error(format!("Execution failed: {e}")),
        };

        drive_child(child, Some(stdin_input.as_bytes()), timeout).await
    }

    async fn run_function(
        &self,
        code: &str,
        harness_code: &str,
        args_json: &str,
        timeout: Duration,
    ) -> ExecutionResult {
        if code_too_large(code) {
            return ExecutionResult::oversized_code();
        }

        let dir = match Self::scratch_dir() {
            Ok(dir) => dir,
            Err(e) => return ExecutionResult::internal_error(format!("Execution failed: {e}")),
        };
        let files = [
            (format!("{USER_MODULE}.py"), code),
            (HARNESS_FILENAME.to_owned(), harness_code),
            (ARGS_FILENAME.to_owned(), args_json),
        ];
        for (name, contents) in &files {
            if let Err(e) = fsutil::write(dir.path().join(name), contents) {
                return ExecutionResult::internal_error(format!("Execution failed: {e}"));
            }
        }

        let mut cmd = Command::new(&self.python_bin);
        cmd.arg(HARNESS_FILENAME)
            .current_dir(dir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        Self::lockdown_env(&mut cmd, dir.path());
        // the harness imports the submission from the scratch dir
        cmd.env("PYTHONPATH", dir.path());

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => return ExecutionResult::internal_error(format!("Execution failed: {e}")),
        };

        drive_child(child, None, timeout).await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::exec::result::{MAX_CODE_BYTES, TRUNCATION_MARKER};
    use crate::harness::build_harness;
    use crate::model::EntrypointKind;

    fn runner() -> LocalProcessRunner {
        LocalProcessRunner::new(crate::python_bin_for_tests())
    }

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn stdin_program_sees_its_input() {
        let res = runner()
            .run_stdin(r#"print("hello_" + input())"#, "123\n", TIMEOUT)
            .await;
        assert_eq!(res.error, None);
        assert_eq!(res.exit_code, 0);
        assert_eq!(res.stdout, "hello_123\n");
        assert_eq!(res.stderr, "");
    }

    #[tokio::test]
    async fn nonzero_exit_code_is_reported() {
        let res = runner()
            .run_stdin(r#"print("out"); exit(42)"#, "", TIMEOUT)
            .await;
        assert_eq!(res.error, None);
        assert_eq!(res.exit_code, 42);
        assert_eq!(res.stdout, "out\n");
    }

    #[tokio::test]
    async fn hanging_program_times_out_with_no_output() {
        let res = runner()
            .run_stdin(
                "import time\nprint('x', flush=True)\ntime.sleep(10)",
                "",
                Duration::from_millis(400),
            )
            .await;
        assert!(res.timed_out);
        assert_eq!(res.stdout, "");
        assert_eq!(res.error, None);
    }

    #[tokio::test]
    async fn oversized_code_is_rejected_before_spawn() {
        let code = "#".repeat(MAX_CODE_BYTES + 1);
        let res = runner().run_stdin(&code, "", TIMEOUT).await;
        assert!(res.error.as_deref().unwrap().contains("maximum size"));

        let harness = build_harness(EntrypointKind::Function, "f").unwrap();
        let res = runner().run_function(&code, &harness, "[]", TIMEOUT).await;
        assert!(res.error.as_deref().unwrap().contains("maximum size"));
    }

    #[tokio::test]
    async fn huge_output_is_truncated_with_marker() {
        let res = runner()
            .run_stdin("print('a' * 100000)", "", TIMEOUT)
            .await;
        assert_eq!(res.error, None);
        assert!(res.stdout.ends_with(TRUNCATION_MARKER));
        assert!(res.stdout.len() < 100_000);
    }

    #[tokio::test]
    async fn python_env_vars_are_not_inherited() {
        std::env::set_var("BELAY_CANARY_VAR", "1");
        let res = runner()
            .run_stdin("import os; print(os.environ.get('BELAY_CANARY_VAR'))", "", TIMEOUT)
            .await;
        assert_eq!(res.stdout, "None\n");
    }

    #[tokio::test]
    async fn function_mode_runs_the_harness() {
        let harness = build_harness(EntrypointKind::Function, "add").unwrap();
        let res = runner()
            .run_function(
                "def add(a, b):\n    return a + b\n",
                &harness,
                r#"{"a": 3, "b": 5}"#,
                TIMEOUT,
            )
            .await;
        assert_eq!(res.error, None);
        assert_eq!(res.exit_code, 0);
        assert_eq!(res.stdout.trim(), r#"{"ok": true, "result": 8}"#);
    }
}
