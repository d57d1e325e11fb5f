use std::path::PathBuf;

use anyhow::bail;
use belay_core::Runner;

use super::{GlobalArgs, SubcmdResult};
use crate::config;

#[derive(Debug, clap::Args)]
pub struct Args {
    /// Source file to execute
    #[arg()] // positional argument
    pub file: PathBuf,

    /// File fed to the program's stdin (default: empty input)
    #[arg(short = 'i', long)]
    pub stdin_file: Option<PathBuf>,
}

pub async fn exec(args: &Args, global_args: &GlobalArgs) -> SubcmdResult {
    let cfg = config::load(global_args);
    let runner = Runner::new(cfg.clone());

    let code = fsutil::read_to_string(&args.file)?;
    let stdin_input = match &args.stdin_file {
        Some(path) => fsutil::read_to_string(path)?,
        None => String::new(),
    };

    let res = runner.run_with_stdin(&code, &stdin_input).await;
    if let Some(err) = res.error {
        bail!("{}", err);
    }

    print!("{}", res.stdout);
    eprint!("{}", res.stderr);
    log::info!(
        "exit_code={} timed_out={} elapsed={}ms",
        res.exit_code,
        res.timed_out,
        res.elapsed_ms
    );
    if res.timed_out {
        bail!("Time limit exceeded ({}s)", cfg.exec_timeout_secs);
    }
    if res.exit_code != 0 {
        std::process::exit(res.exit_code);
    }
    Ok(())
}
