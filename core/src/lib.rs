pub mod config;
pub mod exec;
pub mod harness;
pub mod judge;
pub mod model;
pub mod normalize;
pub mod submission;

pub use crate::config::JudgeConfig;
pub use crate::exec::{Runner, SecureExecutionStatus};

#[cfg(test)]
pub(crate) mod testutil;

/// Interpreter for tests that drive real python: honors
/// `BELAY_PYTHON_BIN`, else resolves `python3` to an absolute path so
/// the backends' locked-down PATH cannot hide it.
#[cfg(test)]
pub(crate) fn python_bin_for_tests() -> String {
    if let Ok(bin) = std::env::var("BELAY_PYTHON_BIN") {
        return bin;
    }
    let out = std::process::Command::new("which").arg("python3").output();
    match out {
        Ok(out) if out.status.success() => {
            String::from_utf8_lossy(&out.stdout).trim().to_owned()
        }
        _ => "python3".to_owned(),
    }
}
