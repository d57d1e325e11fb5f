//! TOML problem bundles: problem metadata plus its test cases in one
//! file, for judging submissions from the command line.

use belay_core::model::{EntrypointKind, JudgeMode, Problem, TestCase, ValueCompare};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ProblemBundle {
    pub title: String,
    pub judge_mode: JudgeMode,

    #[serde(default)]
    pub entrypoint_kind: Option<EntrypointKind>,

    #[serde(default)]
    pub entrypoint_name: Option<String>,

    #[serde(default)]
    pub starter_code: Option<String>,

    #[serde(default, rename = "testcase")]
    pub testcases: Vec<BundleTestCase>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BundleTestCase {
    pub input: String,
    pub expected: String,

    #[serde(default)]
    pub display_input: Option<String>,

    #[serde(default)]
    pub is_sample: bool,

    #[serde(default)]
    pub compare: ValueCompare,
}

impl ProblemBundle {
    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn into_problem_and_cases(self) -> (Problem, Vec<TestCase>) {
        let problem = Problem {
            id: 1,
            title: self.title,
            judge_mode: self.judge_mode,
            entrypoint_kind: self.entrypoint_kind.unwrap_or(EntrypointKind::Class),
            entrypoint_name: self.entrypoint_name,
            starter_code: self.starter_code,
        };
        let cases = self
            .testcases
            .into_iter()
            .enumerate()
            .map(|(i, tc)| TestCase {
                id: i as i64 + 1,
                display_input: tc.display_input.unwrap_or_else(|| tc.input.clone()),
                input_data: tc.input,
                expected_output: tc.expected,
                is_sample: tc.is_sample,
                compare: tc.compare,
            })
            .collect();
        (problem, cases)
    }
}
