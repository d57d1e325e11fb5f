use std::time::Duration;

use anyhow::Context as _;
use once_cell::sync::OnceCell;
use serde::Deserialize;

/// Environment prefix for all judge settings (`BELAY_USE_SANDBOX`,
/// `BELAY_EXEC_TIMEOUT_SECS`, ...).
pub const ENV_PREFIX: &str = "BELAY_";

/// Judge configuration. Every field is optional in the environment
/// and falls back to the documented default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JudgeConfig {
    /// Run untrusted code in disposable docker containers.
    #[serde(default)]
    pub use_sandbox: bool,

    #[serde(default = "default_sandbox_image")]
    pub sandbox_image: String,

    /// Per-test-case execution time limit.
    #[serde(default = "default_exec_timeout_secs")]
    pub exec_timeout_secs: u64,

    #[serde(default = "default_sandbox_memory")]
    pub sandbox_memory: String,

    #[serde(default = "default_sandbox_cpus")]
    pub sandbox_cpus: String,

    /// Base URL of the external judge service.
    #[serde(default)]
    pub remote_judge_url: Option<String>,

    /// Shared secret for signing remote judge requests.
    #[serde(default)]
    pub remote_judge_secret: Option<String>,

    /// Overrides the secure-execution policy. Unset: secure execution
    /// is required whenever the deployment is not in debug mode.
    #[serde(default)]
    pub require_secure: Option<bool>,

    /// Marks a development/debug deployment.
    #[serde(default)]
    pub debug: bool,

    /// Interpreter used by the unsandboxed local fallback and the
    /// syntax pre-check.
    #[serde(default = "default_python_bin")]
    pub python_bin: String,
}

fn default_sandbox_image() -> String {
    "belay-sandbox".to_owned()
}
fn default_exec_timeout_secs() -> u64 {
    2
}
fn default_sandbox_memory() -> String {
    "128m".to_owned()
}
fn default_sandbox_cpus() -> String {
    "0.5".to_owned()
}
fn default_python_bin() -> String {
    "python3".to_owned()
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            use_sandbox: false,
            sandbox_image: default_sandbox_image(),
            exec_timeout_secs: default_exec_timeout_secs(),
            sandbox_memory: default_sandbox_memory(),
            sandbox_cpus: default_sandbox_cpus(),
            remote_judge_url: None,
            remote_judge_secret: None,
            require_secure: None,
            debug: false,
            python_bin: default_python_bin(),
        }
    }
}

impl JudgeConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        envy::prefixed(ENV_PREFIX)
            .from_env()
            .context("Invalid judge configuration in environment")
    }

    /// The fail-closed policy: untrusted code must never reach the
    /// unconfined local runner unless this deployment explicitly opts
    /// out (debug mode or an override).
    pub fn secure_execution_required(&self) -> bool {
        self.require_secure.unwrap_or(!self.debug)
    }

    /// Remote judge endpoint + secret, when both are configured.
    pub fn remote_judge(&self) -> Option<(&str, &str)> {
        match (
            self.remote_judge_url.as_deref(),
            self.remote_judge_secret.as_deref(),
        ) {
            (Some(url), Some(secret)) if !url.is_empty() && !secret.is_empty() => {
                Some((url, secret))
            }
            _ => None,
        }
    }

    pub fn exec_timeout(&self) -> Duration {
        Duration::from_secs(self.exec_timeout_secs)
    }
}

static GLOBAL: OnceCell<JudgeConfig> = OnceCell::new();

/// Process-wide configuration, resolved from the environment once and
/// cached. A failed parse logs and falls back to defaults rather than
/// taking the judge down.
pub fn global() -> &'static JudgeConfig {
    GLOBAL.get_or_init(|| {
        JudgeConfig::from_env().unwrap_or_else(|e| {
            log::warn!("{:#}; using default judge configuration", e);
            JudgeConfig::default()
        })
    })
}

/// Installs a configuration ahead of the first [`global`] call, for
/// tests and embedders. Fails if the global is already resolved.
pub fn set_global(cfg: JudgeConfig) -> Result<(), JudgeConfig> {
    GLOBAL.set(cfg)
}
