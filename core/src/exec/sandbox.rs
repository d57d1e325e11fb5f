use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::OnceCell;

use super::backend::{drive_child, ExecBackend};
use super::result::{code_too_large, ExecutionResult};
use crate::harness::{ARGS_FILENAME, HARNESS_FILENAME, USER_MODULE};

/// Exit code of `timeout(1)` when the inner time limit fires.
const INNER_TIMEOUT_EXIT_CODE: i32 = 124;

/// Extra wall clock granted to the container on top of the inner
/// `timeout`, covering image startup and teardown. A hang inside the
/// container is still caught by the outer bound.
const OUTER_TIMEOUT_GRACE: Duration = Duration::from_secs(5);

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

static DOCKER_AVAILABLE: OnceCell<bool> = OnceCell::const_new();

/// Whether the docker daemon is reachable. Probed once per process
/// and cached; idempotent, so a probe race costs only a redundant
/// `docker info`.
pub async fn docker_available() -> bool {
    *DOCKER_AVAILABLE
        .get_or_init(|| async {
            let ok = probe_docker().await;
            if !ok {
                log::warn!("Docker is unavailable; container sandbox disabled for this process");
            }
            ok
        })
        .await
}

async fn probe_docker() -> bool {
    let child = Command::new("docker")
        .arg("info")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn();
    let Ok(mut child) = child else {
        return false;
    };
    match tokio::time::timeout(PROBE_TIMEOUT, child.wait()).await {
        Ok(Ok(status)) => status.success(),
        Ok(Err(_)) | Err(_) => false,
    }
}

/// Executes code in a freshly created, disposable docker container:
/// no network, fixed memory/CPU ceilings, read-only root filesystem
/// with a small writable /tmp, all capabilities dropped, privilege
/// escalation disabled, and a process-count limit. Nothing is pooled
/// or reused across invocations.
#[derive(Debug, Clone)]
pub struct DockerSandboxRunner {
    image: String,
    memory: String,
    cpus: String,
}

impl DockerSandboxRunner {
    pub fn new(
        image: impl Into<String>,
        memory: impl Into<String>,
        cpus: impl Into<String>,
    ) -> Self {
        Self {
            image: image.into(),
            memory: memory.into(),
            cpus: cpus.into(),
        }
    }

    fn confinement_args(&self) -> Vec<String> {
        [
            "run",
            "--rm",
            "--network",
            "none",
            "--memory",
            &self.memory,
            "--cpus",
            &self.cpus,
            "--read-only",
            "--tmpfs",
            "/tmp:size=10m,mode=1777",
            "--security-opt",
            "no-new-privileges",
            "--cap-drop",
            "ALL",
            "--pids-limit",
            "50",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    /// stdin mode: code and input are bind-mounted read-only and the
    /// inner `timeout` enforces the limit independently of our outer
    /// bound.
    fn stdin_args(&self, code_path: &Path, input_path: &Path, timeout_secs: u64) -> Vec<String> {
        let mut args = self.confinement_args();
        args.extend([
            "-v".to_owned(),
            format!("{}:/sandbox/code.py:ro", code_path.display()),
            "-v".to_owned(),
            format!("{}:/sandbox/input.txt:ro", input_path.display()),
            self.image.clone(),
            "sh".to_owned(),
            "-c".to_owned(),
            format!("timeout {timeout_secs} python3 /sandbox/code.py < /sandbox/input.txt"),
        ]);
        args
    }

    /// function mode: the whole scratch dir is mounted read-only and
    /// the harness runs with the submission on PYTHONPATH.
    fn function_args(&self, scratch_dir: &Path, timeout_secs: u64) -> Vec<String> {
        let mut args = self.confinement_args();
        args.extend([
            "-v".to_owned(),
            format!("{}:/sandbox:ro", scratch_dir.display()),
            "-w".to_owned(),
            "/sandbox".to_owned(),
            "-e".to_owned(),
            "PYTHONPATH=/sandbox".to_owned(),
            self.image.clone(),
            "sh".to_owned(),
            "-c".to_owned(),
            format!("timeout {timeout_secs} python3 /sandbox/{HARNESS_FILENAME}"),
        ]);
        args
    }

    async fn run_container(&self, args: Vec<String>, timeout: Duration) -> ExecutionResult {
        let child = Command::new("docker")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();
        let child = match child {
            Ok(child) => child,
            Err(e) => {
                return ExecutionResult::internal_error(format!("Sandbox execution failed: {e}"))
            }
        };

        let mut res = drive_child(child, None, timeout + OUTER_TIMEOUT_GRACE).await;
        if res.exit_code == INNER_TIMEOUT_EXIT_CODE {
            res.timed_out = true;
        }
        res
    }
}

#[async_trait]
impl ExecBackend for DockerSandboxRunner {
    fn name(&self) -> &'static str {
        "container-sandbox"
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

        let dir = match tempfile::Builder::new().prefix("belay_sandbox_").tempdir() {
            Ok(dir) => dir,
            Err(e) => {
                return ExecutionResult::internal_error(format!("Sandbox execution failed: {e}"))
            }
        };
        let code_path = dir.path().join("code.py");
        let input_path = dir.path().join("input.txt");
        for (path, contents) in [(&code_path, code), (&input_path, stdin_input)] {
            if let Err(e) = fsutil::write(path, contents) {
                return ExecutionResult::internal_error(format!("Sandbox execution failed: {e}"));
            }
        }

        let args = self.stdin_args(&code_path, &input_path, timeout.as_secs());
        self.run_container(args, timeout).await
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

        let dir = match tempfile::Builder::new().prefix("belay_sandbox_fc_").tempdir() {
            Ok(dir) => dir,
            Err(e) => {
                return ExecutionResult::internal_error(format!("Sandbox execution failed: {e}"))
            }
        };
        let files = [
            (format!("{USER_MODULE}.py"), code),
            (HARNESS_FILENAME.to_owned(), harness_code),
            (ARGS_FILENAME.to_owned(), args_json),
        ];
        for (name, contents) in &files {
            if let Err(e) = fsutil::write(dir.path().join(name), contents) {
                return ExecutionResult::internal_error(format!("Sandbox execution failed: {e}"));
            }
        }

        let args = self.function_args(dir.path(), timeout.as_secs());
        self.run_container(args, timeout).await
    }
}
