use std::path::PathBuf;

use anyhow::{bail, Context as _};
use belay_core::model::{Submission, Verdict};
use belay_core::submission::{run_judge, SubmissionStore};
use belay_core::Runner;
use colored::Colorize;

use super::{GlobalArgs, SubcmdResult};
use crate::bundle::ProblemBundle;
use crate::config;

#[derive(Debug, clap::Args)]
pub struct Args {
    /// Problem bundle: TOML file with metadata and testcases
    #[arg(short, long)]
    pub problem: PathBuf,

    /// Submitted source file
    #[arg(short, long)]
    pub code: PathBuf,

    /// Print the judged submission as JSON instead of a report
    #[arg(long)]
    pub json: bool,

    /// Also write the judged submission JSON to this path
    #[arg(long)]
    pub out: Option<PathBuf>,
}

/// The web layer persists to a database; here results only live in
/// the printed report.
struct DiscardStore;

impl SubmissionStore for DiscardStore {
    fn persist(&mut self, submission: &Submission) -> anyhow::Result<()> {
        log::debug!(
            "submission {} -> {} ({})",
            submission.id,
            submission.status,
            submission.verdict
        );
        Ok(())
    }
}

pub async fn exec(args: &Args, global_args: &GlobalArgs) -> SubcmdResult {
    let cfg = config::load(global_args);
    let runner = Runner::new(cfg.clone());

    // same control point the web layer consults before accepting a
    // submission
    let status = runner.secure_execution_status().await;
    if status.required && !status.active {
        bail!("Submissions are disabled: {}", status.reason);
    }

    let bundle_toml = fsutil::read_to_string(&args.problem)?;
    let bundle = ProblemBundle::from_toml(&bundle_toml)
        .with_context(|| format!("Invalid problem bundle: {:?}", args.problem))?;
    let (problem, cases) = bundle.into_problem_and_cases();

    let code = fsutil::read_to_string(&args.code)?;
    let mut submission = Submission::new(1, problem.id, code);

    run_judge(&mut DiscardStore, &mut submission, &problem, &cases, &runner).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&submission)?);
    } else {
        print_report(&problem.title, &submission);
    }
    if let Some(path) = &args.out {
        fsutil::write_json_with_mkdir(path, &submission)?;
    }
    Ok(())
}

fn colored_verdict(v: Verdict) -> colored::ColoredString {
    use Verdict::*;
    let name = v.to_string();
    match v {
        Accepted => name.green().bold(),
        WrongAnswer | RuntimeError => name.red().bold(),
        TimeLimitExceeded => name.yellow().bold(),
        CompileError => name.magenta().bold(),
        Pending => name.dimmed(),
    }
}

fn print_report(title: &str, submission: &Submission) {
    println!(
        "{} — {}  [{} ms]",
        title,
        colored_verdict(submission.verdict),
        submission.execution_time_ms
    );

    for (i, r) in submission.test_results.iter().enumerate() {
        let label = if r.is_sample {
            format!("sample #{}", i + 1)
        } else {
            format!("hidden #{}", i + 1)
        };
        println!(
            "  {} {} ({} ms)",
            colored_verdict(r.verdict),
            label,
            r.elapsed_ms
        );
        if r.is_sample && !r.passed {
            if !r.input_display.is_empty() {
                println!("    input:    {}", r.input_display);
            }
            if !r.expected.is_empty() {
                println!("    expected: {}", r.expected.trim_end());
            }
            if !r.stdout.is_empty() {
                println!("    got:      {}", r.stdout.trim_end());
            }
            if !r.stderr.is_empty() {
                println!("    {}", r.stderr.trim_end().red());
            }
        }
    }

    if !submission.stdout.is_empty() {
        println!("{}", submission.stdout.trim_end());
    }
    if !submission.stderr.is_empty() {
        eprintln!("{}", submission.stderr.trim_end());
    }
}
