use belay_core::Runner;

use super::{GlobalArgs, SubcmdResult};
use crate::config;

#[derive(Debug, clap::Args)]
pub struct Args {}

/// Health-check style JSON document, including the secure-execution
/// status the web layer must consult before accepting submissions.
pub async fn exec(_args: &Args, global_args: &GlobalArgs) -> SubcmdResult {
    let cfg = config::load(global_args);
    let runner = Runner::new(cfg.clone());
    let secure = runner.secure_execution_status().await;

    let doc = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "sandbox_enabled": cfg.use_sandbox,
        "secure_execution": secure,
    });
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}
