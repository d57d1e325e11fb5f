use serde::{Deserialize, Serialize};

pub use reqwest::Url;

/// Execution mode of a single remote run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecMode {
    Stdin,
    Function,
}

/// Body of `POST <endpoint>/execute`.
///
/// `stdin_input` is present for [`ExecMode::Stdin`];
/// `harness_code` + `args_json` for [`ExecMode::Function`].
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteRequest<'a> {
    pub mode: ExecMode,
    pub language: &'a str,
    pub code: &'a str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdin_input: Option<&'a str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub harness_code: Option<&'a str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub args_json: Option<&'a str>,

    /// Execution time limit in seconds, enforced by the remote side.
    pub timeout: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteResponse {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub timed_out: bool,

    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn request_body_omits_fields_of_the_other_mode() {
        let req = ExecuteRequest {
            mode: ExecMode::Stdin,
            language: "python",
            code: "print(1)",
            stdin_input: Some(""),
            harness_code: None,
            args_json: None,
            timeout: 2,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["mode"], "stdin");
        assert!(json.get("harness_code").is_none());
        assert!(json.get("args_json").is_none());
    }

    #[test]
    fn response_error_field_is_optional() {
        let resp: ExecuteResponse = serde_json::from_str(
            r#"{"stdout": "8\n", "stderr": "", "exit_code": 0, "timed_out": false}"#,
        )
        .unwrap();
        assert_eq!(resp.stdout, "8\n");
        assert!(resp.error.is_none());
    }
}
