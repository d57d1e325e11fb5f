use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Child;

use super::result::{cap_output, ExecutionResult, MAX_OUTPUT_BYTES};

/// Contract shared by every execution backend.
///
/// Backends never return `Err`: internal faults, timeouts and user
/// failures are all values on the [`ExecutionResult`]. The timeout is
/// a hard wall-clock bound that the backend itself enforces.
#[async_trait]
pub trait ExecBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Runs `code` as a program, feeding `stdin_input`.
    async fn run_stdin(&self, code: &str, stdin_input: &str, timeout: Duration)
        -> ExecutionResult;

    /// Runs the generated `harness_code` next to `code` and the
    /// JSON-encoded arguments (function-call mode).
    async fn run_function(
        &self,
        code: &str,
        harness_code: &str,
        args_json: &str,
        timeout: Duration,
    ) -> ExecutionResult;
}

/// Feeds stdin, captures both output streams and waits for exit, all
/// bounded by `timeout`. On expiry the child is killed and a
/// timed-out result with no captured output is returned.
pub(crate) async fn drive_child(
    mut child: Child,
    stdin_data: Option<&[u8]>,
    timeout: Duration,
) -> ExecutionResult {
    let started = Instant::now();

    if let Some(data) = stdin_data {
        let Some(mut stdin) = child.stdin.take() else {
            return ExecutionResult::internal_error("Execution failed: stdin is not piped");
        };
        // A write error here means the program exited without reading
        // its input, which is not a fault by itself.
        if let Err(e) = stdin.write_all(data).await {
            log::debug!("Could not feed stdin: {}", e);
        }
        // stdin drops here; the pipe must close or the child may block
        // waiting for more input
    }

    let (Some(mut stdout_pipe), Some(mut stderr_pipe)) =
        (child.stdout.take(), child.stderr.take())
    else {
        return ExecutionResult::internal_error("Execution failed: output is not piped");
    };

    let mut stdout_buf = Vec::new();
    let mut stderr_buf = Vec::new();

    let res = {
        let fut_stdout = tokio::io::copy(&mut stdout_pipe, &mut stdout_buf);
        let fut_stderr = tokio::io::copy(&mut stderr_pipe, &mut stderr_buf);
        let fut_exit_status = child.wait();

        tokio::time::timeout(timeout, async {
            tokio::try_join!(fut_stdout, fut_stderr, fut_exit_status)
        })
        .await
    };

    let elapsed_ms = started.elapsed().as_millis() as u64;

    match res {
        Err(_) => {
            child
                .kill()
                .await
                .unwrap_or_else(|e| log::warn!("Failed to kill timed-out process: {:#}", e));
            ExecutionResult::timed_out(elapsed_ms)
        }

        Ok(Err(e)) => ExecutionResult {
            elapsed_ms,
            ..ExecutionResult::internal_error(format!("Execution failed: {e}"))
        },

        Ok(Ok((_, _, exit_status))) => ExecutionResult {
            stdout: cap_output(&stdout_buf, MAX_OUTPUT_BYTES),
            stderr: cap_output(&stderr_buf, MAX_OUTPUT_BYTES),
            exit_code: exit_status.code().unwrap_or(-1),
            timed_out: false,
            elapsed_ms,
            error: None,
        },
    }
}
