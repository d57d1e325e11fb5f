//! Submission lifecycle: Pending -> Running -> Done, one way.
//!
//! The controller is the externally visible entry point of the judge.
//! Persistence goes through [`SubmissionStore`]; the data layer
//! behind it is an external collaborator.

use anyhow::Context as _;

use crate::exec::Runner;
use crate::judge::{judge_submission, JudgeOutcome};
use crate::model::{Problem, Submission, SubmissionStatus, TestCase, Verdict};

/// Persistence seam for submissions.
pub trait SubmissionStore {
    fn persist(&mut self, submission: &Submission) -> anyhow::Result<()>;
}

/// Judges `submission` in place and persists each state transition.
///
/// Running is persisted synchronously before any execution begins;
/// the full result set is written in one go at the end. If the judge
/// engine itself fails, the submission is still forced to Done with a
/// RuntimeError verdict so it can never stay stuck in Running.
pub async fn run_judge<S: SubmissionStore>(
    store: &mut S,
    submission: &mut Submission,
    problem: &Problem,
    test_cases: &[TestCase],
    runner: &Runner,
) -> anyhow::Result<()> {
    submission.advance(SubmissionStatus::Running)?;
    store
        .persist(submission)
        .context("Failed to persist running submission")?;

    match judge_submission(runner, problem, test_cases, &submission.code).await {
        Ok(outcome) => apply_outcome(submission, outcome),
        Err(e) => {
            log::error!(
                "Judge engine failed on submission {}: {:#}",
                submission.id,
                e
            );
            apply_internal_failure(submission, &format!("{e:#}"));
        }
    }

    submission.advance(SubmissionStatus::Done)?;
    store
        .persist(submission)
        .context("Failed to persist judged submission")
}

fn apply_outcome(submission: &mut Submission, outcome: JudgeOutcome) {
    submission.verdict = outcome.verdict;
    submission.stdout = outcome.stdout;
    submission.stderr = outcome.stderr;
    submission.test_results = outcome.test_results;
    submission.execution_time_ms = outcome.total_time_ms;
}

fn apply_internal_failure(submission: &mut Submission, message: &str) {
    submission.verdict = Verdict::RuntimeError;
    submission.stderr = format!("Internal judge error: {message}");
}
