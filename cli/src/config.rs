use belay_core::config::{self, JudgeConfig};

use crate::cmd::GlobalArgs;

/// Resolves the judge configuration once per process: environment
/// first, then CLI overrides on top.
pub fn load(args: &GlobalArgs) -> &'static JudgeConfig {
    let mut cfg = JudgeConfig::from_env().unwrap_or_else(|e| {
        log::warn!("{:#}; using defaults", e);
        JudgeConfig::default()
    });
    if args.insecure {
        cfg.debug = true;
        cfg.require_secure = Some(false);
    }
    // a pre-installed global (tests, embedders) wins
    let _ = config::set_global(cfg);
    config::global()
}
