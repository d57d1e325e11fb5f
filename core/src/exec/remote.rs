use std::time::Duration;

use async_trait::async_trait;
use belay_webclient::{ExecuteResponse, RemoteJudgeClient};

use super::backend::ExecBackend;
use super::result::{cap_output, code_too_large, ExecutionResult, MAX_OUTPUT_BYTES};

/// Margin added to the HTTP timeout on top of the execution timeout,
/// so the remote side's own limit always fires first.
pub const REMOTE_NETWORK_MARGIN_SECS: u64 = 10;

/// Delegates execution to the external judge service via
/// [`belay_webclient`]. Transport failures never become verdicts;
/// they surface as internal errors on the result.
pub struct RemoteJudgeRunner {
    client: RemoteJudgeClient,
}

impl RemoteJudgeRunner {
    pub fn new(
        endpoint: &str,
        secret: &str,
        exec_timeout_secs: u64,
    ) -> belay_webclient::Result<Self> {
        let network_timeout =
            Duration::from_secs(exec_timeout_secs + REMOTE_NETWORK_MARGIN_SECS);
        Ok(Self {
            client: RemoteJudgeClient::new(endpoint, secret, network_timeout)?,
        })
    }

    fn convert(resp: ExecuteResponse) -> ExecutionResult {
        ExecutionResult {
            stdout: cap_output(resp.stdout.as_bytes(), MAX_OUTPUT_BYTES),
            stderr: cap_output(resp.stderr.as_bytes(), MAX_OUTPUT_BYTES),
            exit_code: resp.exit_code,
            timed_out: resp.timed_out,
            elapsed_ms: 0,
            error: resp.error,
        }
    }
}

#[async_trait]
impl ExecBackend for RemoteJudgeRunner {
    fn name(&self) -> &'static str {
        "remote-judge"
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
        match self
            .client
            .execute_stdin(code, stdin_input, timeout.as_secs())
            .await
        {
            Ok(resp) => Self::convert(resp),
            Err(e) => ExecutionResult::internal_error(format!("Remote judge request failed: {e}")),
        }
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
        match self
            .client
            .execute_function(code, harness_code, args_json, timeout.as_secs())
            .await
        {
            Ok(resp) => Self::convert(resp),
            Err(e) => ExecutionResult::internal_error(format!("Remote judge request failed: {e}")),
        }
    }
}
