use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use url::Url;

use crate::error::{Error, Result};
use crate::model::{ExecMode, ExecuteRequest, ExecuteResponse};
use crate::sign::{sign_request, SIGNATURE_HEADER, TIMESTAMP_HEADER};

/// Client for an external judge execution service.
///
/// Every request is authenticated with an HMAC signature over the
/// timestamp and the serialized body (see [`crate::sign`]).
#[derive(Debug, Clone)]
pub struct RemoteJudgeClient {
    execute_url: Url,
    secret: String,
    inner: reqwest::Client,
}

impl RemoteJudgeClient {
    /// `network_timeout` must be strictly longer than any execution
    /// timeout sent in a request, so the remote side's own limit
    /// always fires before the connection is abandoned.
    pub fn new(
        endpoint: &str,
        secret: impl Into<String>,
        network_timeout: Duration,
    ) -> Result<Self> {
        let execute_url = format!("{}/execute", endpoint.trim_end_matches('/'));
        let execute_url = Url::parse(&execute_url).map_err(|e| Error::InvalidEndpointUrl {
            url: execute_url.clone(),
            source: e,
        })?;
        let inner = reqwest::Client::builder()
            .timeout(network_timeout)
            .build()?;
        Ok(Self {
            execute_url,
            secret: secret.into(),
            inner,
        })
    }

    pub async fn execute_stdin(
        &self,
        code: &str,
        stdin_input: &str,
        timeout_secs: u64,
    ) -> Result<ExecuteResponse> {
        self.execute(&ExecuteRequest {
            mode: ExecMode::Stdin,
            language: "python",
            code,
            stdin_input: Some(stdin_input),
            harness_code: None,
            args_json: None,
            timeout: timeout_secs,
        })
        .await
    }

    pub async fn execute_function(
        &self,
        code: &str,
        harness_code: &str,
        args_json: &str,
        timeout_secs: u64,
    ) -> Result<ExecuteResponse> {
        self.execute(&ExecuteRequest {
            mode: ExecMode::Function,
            language: "python",
            code,
            stdin_input: None,
            harness_code: Some(harness_code),
            args_json: Some(args_json),
            timeout: timeout_secs,
        })
        .await
    }

    pub async fn execute(&self, req: &ExecuteRequest<'_>) -> Result<ExecuteResponse> {
        let body = serde_json::to_vec(req)?;
        let timestamp = chrono::Utc::now().timestamp();
        let signature = sign_request(&self.secret, timestamp, &body);

        log::debug!("POST {} (mode={:?})", self.execute_url, req.mode);
        let resp = self
            .inner
            .post(self.execute_url.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(TIMESTAMP_HEADER, timestamp)
            .header(SIGNATURE_HEADER, signature)
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::UnexpectedResponseCode {
                got: status,
                requested_url: self.execute_url.to_string(),
            });
        }

        let text = resp.text().await?;
        serde_json::from_str(&text).map_err(|e| Error::MalformedResponse {
            requested_url: self.execute_url.to_string(),
            source: e,
        })
    }
}
