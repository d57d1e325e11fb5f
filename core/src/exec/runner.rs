use std::time::Instant;

use serde::Serialize;

use super::backend::ExecBackend;
use super::local::LocalProcessRunner;
use super::remote::RemoteJudgeRunner;
use super::result::{
    code_too_large, parse_harness_result, ExecutionResult, FunctionCallResult,
};
use super::sandbox::{docker_available, DockerSandboxRunner};
use crate::config::JudgeConfig;
use crate::harness::build_harness;
use crate::model::EntrypointKind;

/// Availability of secure execution, for the web layer to consult
/// before accepting submissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecureExecutionStatus {
    /// Whether this deployment demands a secure backend.
    pub required: bool,
    /// Container sandbox enabled and the docker daemon reachable.
    pub local_active: bool,
    /// Remote judge endpoint and secret both configured.
    pub remote_active: bool,
    pub active: bool,
    /// Human-readable explanation, non-empty whenever execution would
    /// be refused.
    pub reason: String,
}

/// Facade over the execution backends.
///
/// Selection per call: container sandbox (if enabled and available),
/// else remote judge (if configured), else refuse when secure
/// execution is required, else the unconfined local process runner.
/// The fail-closed gate lives here and nowhere else; the judge engine
/// never picks a backend itself.
pub struct Runner {
    cfg: JudgeConfig,
    backend_override: Option<Box<dyn ExecBackend>>,
}

impl Runner {
    pub fn new(cfg: JudgeConfig) -> Self {
        Self {
            cfg,
            backend_override: None,
        }
    }

    /// Bypasses selection and the secure-execution gate; for tests.
    pub fn with_backend(cfg: JudgeConfig, backend: Box<dyn ExecBackend>) -> Self {
        Self {
            cfg,
            backend_override: Some(backend),
        }
    }

    pub fn config(&self) -> &JudgeConfig {
        &self.cfg
    }

    pub async fn secure_execution_status(&self) -> SecureExecutionStatus {
        let required = self.cfg.secure_execution_required();
        let local_active = self.cfg.use_sandbox && docker_available().await;
        let remote_active = self.cfg.remote_judge().is_some();
        let active = local_active || remote_active;

        let reason = if required && !active {
            if self.cfg.use_sandbox {
                "Container sandbox is enabled but the docker daemon is unavailable, \
                 and no remote judge is configured."
            } else {
                "Secure execution is required but neither the container sandbox \
                 nor a remote judge is configured."
            }
            .to_owned()
        } else {
            String::new()
        };

        SecureExecutionStatus {
            required,
            local_active,
            remote_active,
            active,
            reason,
        }
    }

    /// `Err` carries the human-readable refusal/misconfiguration
    /// message; callers turn it into an internal error result.
    async fn select(&self) -> Result<Box<dyn ExecBackend>, String> {
        let cfg = &self.cfg;

        if cfg.use_sandbox && docker_available().await {
            return Ok(Box::new(DockerSandboxRunner::new(
                &cfg.sandbox_image,
                &cfg.sandbox_memory,
                &cfg.sandbox_cpus,
            )));
        }

        if let Some((url, secret)) = cfg.remote_judge() {
            return match RemoteJudgeRunner::new(url, secret, cfg.exec_timeout_secs) {
                Ok(runner) => Ok(Box::new(runner)),
                Err(e) => Err(format!("Remote judge misconfigured: {e}")),
            };
        }

        if cfg.secure_execution_required() {
            return Err(self.secure_execution_status().await.reason);
        }

        Ok(Box::new(LocalProcessRunner::new(&cfg.python_bin)))
    }

    async fn dispatch_stdin(&self, code: &str, stdin_input: &str) -> ExecutionResult {
        let timeout = self.cfg.exec_timeout();
        if code_too_large(code) {
            return ExecutionResult::oversized_code();
        }
        if let Some(backend) = &self.backend_override {
            return backend.run_stdin(code, stdin_input, timeout).await;
        }
        match self.select().await {
            Ok(backend) => {
                log::debug!("Dispatching stdin run to backend '{}'", backend.name());
                backend.run_stdin(code, stdin_input, timeout).await
            }
            Err(reason) => ExecutionResult::internal_error(reason),
        }
    }

    async fn dispatch_function(
        &self,
        code: &str,
        harness_code: &str,
        args_json: &str,
    ) -> ExecutionResult {
        let timeout = self.cfg.exec_timeout();
        if code_too_large(code) {
            return ExecutionResult::oversized_code();
        }
        if let Some(backend) = &self.backend_override {
            return backend.run_function(code, harness_code, args_json, timeout).await;
        }
        match self.select().await {
            Ok(backend) => {
                log::debug!("Dispatching function run to backend '{}'", backend.name());
                backend.run_function(code, harness_code, args_json, timeout).await
            }
            Err(reason) => ExecutionResult::internal_error(reason),
        }
    }

    /// Runs `code` as a program against `stdin_input`. Elapsed time is
    /// measured end-to-end around the dispatch, so timings are
    /// comparable across backends.
    pub async fn run_with_stdin(&self, code: &str, stdin_input: &str) -> ExecutionResult {
        let started = Instant::now();
        let mut res = self.dispatch_stdin(code, stdin_input).await;
        res.elapsed_ms = started.elapsed().as_millis() as u64;
        res
    }

    /// Runs `code` in function-call mode: generates the harness,
    /// executes it, and interprets the single harness JSON line.
    pub async fn run_function_call(
        &self,
        code: &str,
        entrypoint_kind: EntrypointKind,
        entrypoint_name: &str,
        args_json: &str,
    ) -> FunctionCallResult {
        let started = Instant::now();

        let harness_code = match build_harness(entrypoint_kind, entrypoint_name) {
            Ok(src) => src,
            Err(e) => return FunctionCallResult::internal_error(e.to_string()),
        };

        let exec = self.dispatch_function(code, &harness_code, args_json).await;
        FunctionCallResult {
            outcome: parse_harness_result(&exec),
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }
}
