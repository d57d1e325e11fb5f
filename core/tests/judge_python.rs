//! End-to-end judge pipeline over the local process backend, driving
//! a real Python interpreter.

use belay_core::config::JudgeConfig;
use belay_core::exec::Runner;
use belay_core::judge::{judge_submission, INTERNAL_ERROR_PREFIX, SUCCESS_MESSAGE};
use belay_core::model::{
    EntrypointKind, JudgeMode, Problem, TestCase, ValueCompare, Verdict,
};

fn python_bin() -> String {
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

fn local_runner() -> Runner {
    Runner::new(JudgeConfig {
        require_secure: Some(false),
        python_bin: python_bin(),
        ..JudgeConfig::default()
    })
}

fn stdin_problem() -> Problem {
    Problem {
        id: 1,
        title: "A + B".to_owned(),
        judge_mode: JudgeMode::StdinStdout,
        entrypoint_kind: EntrypointKind::Function,
        entrypoint_name: None,
        starter_code: None,
    }
}

fn function_problem(kind: EntrypointKind, name: &str) -> Problem {
    Problem {
        id: 2,
        title: "Add".to_owned(),
        judge_mode: JudgeMode::FunctionCall,
        entrypoint_kind: kind,
        entrypoint_name: Some(name.to_owned()),
        starter_code: None,
    }
}

fn case(id: i64, input: &str, expected: &str, is_sample: bool) -> TestCase {
    TestCase {
        id,
        input_data: input.to_owned(),
        expected_output: expected.to_owned(),
        display_input: input.to_owned(),
        is_sample,
        compare: ValueCompare::default(),
    }
}

const ADD_PROGRAM: &str = "a,b=map(int,input().split()); print(a+b)";

#[tokio::test]
async fn stdin_correct_program_is_accepted() {
    let runner = local_runner();
    let cases = [case(1, "3 5", "8", true)];
    let out = judge_submission(&runner, &stdin_problem(), &cases, ADD_PROGRAM)
        .await
        .unwrap();
    assert_eq!(out.verdict, Verdict::Accepted);
    assert_eq!(out.stdout, SUCCESS_MESSAGE);
    assert!(out.total_time_ms > 0);
}

#[tokio::test]
async fn stdin_wrong_expected_output_is_wrong_answer() {
    let runner = local_runner();
    let cases = [case(1, "3 5", "9", true)];
    let out = judge_submission(&runner, &stdin_problem(), &cases, ADD_PROGRAM)
        .await
        .unwrap();
    assert_eq!(out.verdict, Verdict::WrongAnswer);
    assert_eq!(out.failed_test_index, Some(1));
    assert_eq!(out.stdout.trim(), "8");
}

#[tokio::test]
async fn stdin_crashing_program_is_a_runtime_error() {
    let runner = local_runner();
    let cases = [case(1, "", "8", true)];
    let out = judge_submission(&runner, &stdin_problem(), &cases, "x=1/0")
        .await
        .unwrap();
    assert_eq!(out.verdict, Verdict::RuntimeError);
    assert!(out.stderr.contains("ZeroDivisionError"));
}

#[tokio::test]
async fn missing_colon_is_a_compile_error_without_executing() {
    let runner = local_runner();
    let cases = [case(1, "3 5", "8", true)];
    let out = judge_submission(
        &runner,
        &stdin_problem(),
        &cases,
        "def add(a, b)\n    return a + b",
    )
    .await
    .unwrap();
    assert_eq!(out.verdict, Verdict::CompileError);
    assert!(out.test_results.is_empty());
    assert!(out.stderr.contains("Syntax Error:"));
    assert!(out.stderr.contains("Line 1"));
}

#[tokio::test]
async fn zero_test_cases_is_accepted() {
    let runner = local_runner();
    let out = judge_submission(&runner, &stdin_problem(), &[], "print(1)")
        .await
        .unwrap();
    assert_eq!(out.verdict, Verdict::Accepted);
    assert!(out.test_results.is_empty());
}

#[tokio::test]
async fn function_mode_accepts_a_correct_bare_function() {
    let runner = local_runner();
    let problem = function_problem(EntrypointKind::Function, "add");
    let cases = [case(1, r#"{"a": 3, "b": 5}"#, "8", true)];
    let out = judge_submission(
        &runner,
        &problem,
        &cases,
        "def add(a, b):\n    return a + b",
    )
    .await
    .unwrap();
    assert_eq!(out.verdict, Verdict::Accepted);
}

#[tokio::test]
async fn function_mode_wrong_value_is_wrong_answer() {
    let runner = local_runner();
    let problem = function_problem(EntrypointKind::Function, "add");
    let cases = [case(1, r#"{"a": 3, "b": 5}"#, "8", true)];
    let out = judge_submission(
        &runner,
        &problem,
        &cases,
        "def add(a, b):\n    return a + b + 1",
    )
    .await
    .unwrap();
    assert_eq!(out.verdict, Verdict::WrongAnswer);
    assert_eq!(out.test_results[0].stdout.trim(), "9");
    assert_eq!(out.test_results[0].expected.trim(), "8");
}

#[tokio::test]
async fn function_mode_exception_is_a_runtime_error_with_message() {
    let runner = local_runner();
    let problem = function_problem(EntrypointKind::Function, "add");
    let cases = [case(1, r#"{"a": 3, "b": 5}"#, "8", true)];
    let out = judge_submission(
        &runner,
        &problem,
        &cases,
        "def add(a, b):\n    raise ValueError('bad input')",
    )
    .await
    .unwrap();
    assert_eq!(out.verdict, Verdict::RuntimeError);
    assert!(out.test_results[0].stderr.contains("bad input"));
}

#[tokio::test]
async fn function_mode_supports_class_entrypoints_and_positional_args() {
    let runner = local_runner();
    let problem = function_problem(EntrypointKind::Class, "add");
    let cases = [case(1, "[3, 5]", "8", true)];
    let out = judge_submission(
        &runner,
        &problem,
        &cases,
        "class Solution:\n    def add(self, a, b):\n        return a + b",
    )
    .await
    .unwrap();
    assert_eq!(out.verdict, Verdict::Accepted);
}

#[tokio::test]
async fn sleeping_past_the_limit_is_a_time_limit_verdict() {
    let runner = Runner::new(JudgeConfig {
        require_secure: Some(false),
        python_bin: python_bin(),
        exec_timeout_secs: 1,
        ..JudgeConfig::default()
    });
    let cases = [case(1, "", "8", false)];
    let out = judge_submission(
        &runner,
        &stdin_problem(),
        &cases,
        "import time\nprint('partial', flush=True)\ntime.sleep(10)\nprint(8)",
    )
    .await
    .unwrap();
    assert_eq!(out.verdict, Verdict::TimeLimitExceeded);
    // no partial output beyond the timeout survives
    assert_eq!(out.stdout, "");
}

#[tokio::test]
async fn oversized_code_is_rejected_in_both_modes() {
    let runner = local_runner();
    let padding = format!("# {}\n", "x".repeat(60_000));

    let cases = [case(1, "3 5", "8", true)];
    let out = judge_submission(
        &runner,
        &stdin_problem(),
        &cases,
        &format!("{padding}{ADD_PROGRAM}"),
    )
    .await
    .unwrap();
    assert_eq!(out.verdict, Verdict::RuntimeError);
    assert!(out.stderr.starts_with(INTERNAL_ERROR_PREFIX));

    let problem = function_problem(EntrypointKind::Function, "add");
    let out = judge_submission(
        &runner,
        &problem,
        &cases,
        &format!("{padding}def add(a, b):\n    return a + b"),
    )
    .await
    .unwrap();
    assert_eq!(out.verdict, Verdict::RuntimeError);
    assert!(out.stderr.starts_with(INTERNAL_ERROR_PREFIX));
}

#[tokio::test]
async fn secure_gate_refuses_and_then_admits_without_code_changes() {
    let gated = Runner::new(JudgeConfig {
        require_secure: Some(true),
        python_bin: python_bin(),
        ..JudgeConfig::default()
    });

    let res = gated.run_with_stdin("print(1)", "").await;
    assert!(!res.error.unwrap().is_empty());

    let status = gated.secure_execution_status().await;
    assert!(status.required && !status.active);
    assert!(!status.reason.is_empty());

    // same call, remote judge configured: the gate opens (the request
    // itself fails fast against an unroutable endpoint, but it is no
    // longer refused by policy)
    let open = Runner::new(JudgeConfig {
        require_secure: Some(true),
        remote_judge_url: Some("http://127.0.0.1:1".to_owned()),
        remote_judge_secret: Some("s".to_owned()),
        python_bin: python_bin(),
        ..JudgeConfig::default()
    });
    let status = open.secure_execution_status().await;
    assert!(status.active && status.remote_active);
    assert_eq!(status.reason, "");
    let res = open.run_with_stdin("print(1)", "").await;
    let err = res.error.unwrap();
    assert!(err.contains("Remote judge request failed"), "got: {err}");
}

#[tokio::test]
async fn hidden_failure_reports_position_but_never_content() {
    let runner = local_runner();
    let cases = [
        case(1, "3 5", "8", true),
        case(2, "10 20", "31", false), // wrong on purpose
    ];
    let out = judge_submission(&runner, &stdin_problem(), &cases, ADD_PROGRAM)
        .await
        .unwrap();
    assert_eq!(out.verdict, Verdict::WrongAnswer);
    assert_eq!(out.failed_test_index, Some(2));

    let hidden = &out.test_results[1];
    assert!(!hidden.is_sample);
    assert_eq!(hidden.stdout, "");
    assert_eq!(hidden.stderr, "");
    assert_eq!(hidden.expected, "");
    assert_eq!(hidden.input_display, "");
}
