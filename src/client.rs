use reqwest::blocking::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("TestRail API returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Transport to the test-management service. Paths are relative to the API
/// root, e.g. `get_run/12`.
pub trait RemoteClient {
    fn send_get(&mut self, path: &str) -> Result<Value, ApiError>;

    fn send_post<T: Serialize + ?Sized>(
        &mut self,
        path: &str,
        payload: &T,
    ) -> Result<Value, ApiError>;
}

pub fn add_result_path(run_id: u64, case_id: u64) -> String {
    format!("add_result_for_case/{run_id}/{case_id}")
}

pub fn add_run_path(project_id: u64) -> String {
    format!("add_run/{project_id}")
}

pub fn get_run_path(run_id: u64) -> String {
    format!("get_run/{run_id}")
}

pub fn get_plan_path(plan_id: u64) -> String {
    format!("get_plan/{plan_id}")
}

pub fn get_milestone_path(milestone_id: u64) -> String {
    format!("get_milestone/{milestone_id}")
}

pub fn close_run_path(run_id: u64) -> String {
    format!("close_run/{run_id}")
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub url: String,
    pub user: String,
    pub api_key: String,
    pub timeout: Duration,
    pub cert_check: bool,
}

/// Blocking client for the TestRail API v2.
#[derive(Debug)]
pub struct HttpClient {
    http: Client,
    base: String,
    user: String,
    api_key: String,
}

impl HttpClient {
    pub fn new(settings: &ServerSettings) -> Result<Self, ApiError> {
        let timeout = if settings.timeout.is_zero() {
            Duration::from_secs(30)
        } else {
            settings.timeout
        };

        let http = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(!settings.cert_check)
            .build()
            .map_err(|e| ApiError::Transport(format!("build client: {e}")))?;

        Ok(Self {
            http,
            base: format!("{}/index.php?/api/v2/", settings.url.trim_end_matches('/')),
            user: settings.user.clone(),
            api_key: settings.api_key.clone(),
        })
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    fn finish(path: &str, response: reqwest::blocking::Response) -> Result<Value, ApiError> {
        let status = response.status();
        tracing::debug!(path, status = status.as_u16(), "testrail response");

        let body = response
            .text()
            .map_err(|e| ApiError::Transport(format!("read response: {e}")))?;

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).map_err(|e| ApiError::Decode(format!("parse json: {e}")))
    }
}

impl RemoteClient for HttpClient {
    fn send_get(&mut self, path: &str) -> Result<Value, ApiError> {
        tracing::debug!(path, "GET");
        let response = self
            .http
            .get(self.endpoint(path))
            .basic_auth(&self.user, Some(&self.api_key))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Self::finish(path, response)
    }

    fn send_post<T: Serialize + ?Sized>(
        &mut self,
        path: &str,
        payload: &T,
    ) -> Result<Value, ApiError> {
        tracing::debug!(path, "POST");
        let response = self
            .http
            .post(self.endpoint(path))
            .basic_auth(&self.user, Some(&self.api_key))
            .json(payload)
            .send()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Self::finish(path, response)
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
