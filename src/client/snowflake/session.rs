//! Snowflake REST session
//!
//! Speaks the connector endpoints directly: `login-request` for a session
//! token, `query-request` for statements and `logout-request` to close.

use super::Warehouse;
use super::stage::{self, StageUpload};
use crate::error::PlatformError;
use crate::settings::SnowflakeConfig;

use eyre::{Context, Result};
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap};
use serde::Deserialize;
use serde_json::json;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use url::Url;

const CLIENT_APP_ID: &str = "data-platform";
const CLIENT_APP_VERSION: &str = env!("CARGO_PKG_VERSION");
const SNOWFLAKE_ACCEPT: &str = "application/snowflake";

// Statement still running; the result has to be fetched from `getResultUrl`
const QUERY_IN_PROGRESS: &[&str] = &["333333", "333334"];
const RESULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Response envelope shared by every endpoint
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    #[serde(default)]
    success: bool,
    message: Option<String>,
    code: Option<String>,
}

impl<T> Envelope<T> {
    fn failure(&self) -> String {
        match (&self.code, &self.message) {
            (Some(code), Some(message)) => format!("{} ({})", message, code),
            (None, Some(message)) => message.clone(),
            (Some(code), None) => format!("error code {}", code),
            (None, None) => "unknown error".to_string(),
        }
    }

    fn in_progress(&self) -> bool {
        self.code
            .as_deref()
            .is_some_and(|code| QUERY_IN_PROGRESS.contains(&code))
    }
}

/// Where to fetch the result of a statement that is still running
///
/// `None` once the statement has finished, successfully or not.
fn pending_result_url(envelope: &Envelope<QueryData>) -> Result<Option<String>, PlatformError> {
    if !envelope.in_progress() {
        return Ok(None);
    }
    envelope
        .data
        .as_ref()
        .and_then(|data| data.result_url.clone())
        .map(Some)
        .ok_or_else(|| PlatformError::warehouse("query", "missing result URL"))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoginData {
    token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QueryData {
    command: Option<String>,
    #[serde(rename = "queryId")]
    query_id: Option<String>,
    #[serde(rename = "getResultUrl")]
    result_url: Option<String>,
    #[serde(flatten)]
    upload: StageUpload,
}

/// An authenticated Snowflake session
///
/// The session token lives until [`SnowflakeSession::close`] is called.
pub struct SnowflakeSession {
    client: Client,
    url: Url,
    token: String,
    sequence_id: u64,
}

impl SnowflakeSession {
    /// Log in and open a session on the configured warehouse, database and schema
    pub async fn connect(config: &SnowflakeConfig) -> Result<Self> {
        let url = account_url(&config.account)?;
        let client = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;

        let mut params = vec![
            ("request_id", uuid::Uuid::new_v4().to_string()),
            ("warehouse", config.warehouse.clone()),
            ("databaseName", config.database.clone()),
            ("schemaName", config.schema.clone()),
        ];
        if let Some(role) = &config.role {
            params.push(("roleName", role.clone()));
        }
        let body = json!({
            "data": {
                "CLIENT_APP_ID": CLIENT_APP_ID,
                "CLIENT_APP_VERSION": CLIENT_APP_VERSION,
                "ACCOUNT_NAME": account_name(&config.account),
                "LOGIN_NAME": config.user,
                "PASSWORD": config.password,
            }
        });

        log::debug!("Logging in to {} as {}", url, config.user);
        let response = client
            .post(url.join("session/v1/login-request")?)
            .header(ACCEPT, "application/json")
            .query(&params)
            .json(&body)
            .send()
            .await
            .map_err(|e| PlatformError::warehouse("login", e.to_string()))?;
        let envelope: Envelope<LoginData> = read_envelope(response, "login").await?;

        if !envelope.success {
            return Err(PlatformError::warehouse("login", envelope.failure()).into());
        }
        let token = envelope
            .data
            .map(|data| data.token)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| PlatformError::warehouse("login", "response has no session token"))?;
        log::info!("Connected to Snowflake account {}", config.account);

        Ok(Self {
            client,
            url,
            token,
            sequence_id: 0,
        })
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, SNOWFLAKE_ACCEPT.parse()?);
        headers.insert(
            AUTHORIZATION,
            format!("Snowflake Token=\"{}\"", self.token).parse()?,
        );
        Ok(headers)
    }

    async fn query(&mut self, statement: &str) -> Result<QueryData> {
        self.sequence_id += 1;
        let submitted = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        let body = json!({
            "sqlText": statement,
            "asyncExec": false,
            "sequenceId": self.sequence_id,
            "querySubmissionTime": submitted,
        });

        log::debug!("Executing: {}", statement);
        let response = self
            .client
            .post(self.url.join("queries/v1/query-request")?)
            .headers(self.headers()?)
            .query(&[("requestId", uuid::Uuid::new_v4().to_string())])
            .json(&body)
            .send()
            .await
            .map_err(|e| PlatformError::warehouse("query", e.to_string()))?;
        let mut envelope: Envelope<QueryData> = read_envelope(response, "query").await?;

        // Polls until the statement finishes; no deadline of its own
        while let Some(result_url) = pending_result_url(&envelope)? {
            tokio::time::sleep(RESULT_POLL_INTERVAL).await;

            let response = self
                .client
                .get(self.url.join(&result_url)?)
                .headers(self.headers()?)
                .send()
                .await
                .map_err(|e| PlatformError::warehouse("query", e.to_string()))?;
            envelope = read_envelope(response, "query").await?;
        }

        if !envelope.success {
            return Err(PlatformError::warehouse("query", envelope.failure()).into());
        }
        let data = envelope.data.unwrap_or_default();
        if let Some(query_id) = &data.query_id {
            log::debug!("Query {} succeeded", query_id);
        }
        Ok(data)
    }

    /// Log out, invalidating the session token
    pub async fn close(self) -> Result<()> {
        let response = self
            .client
            .post(self.url.join("session/logout-request")?)
            .headers(self.headers()?)
            .query(&[("delete", "true")])
            .send()
            .await
            .map_err(|e| PlatformError::warehouse("logout", e.to_string()))?;
        let envelope: Envelope<serde_json::Value> = read_envelope(response, "logout").await?;
        if !envelope.success {
            return Err(PlatformError::warehouse("logout", envelope.failure()).into());
        }

        log::debug!("Snowflake session closed");
        Ok(())
    }
}

impl Warehouse for SnowflakeSession {
    async fn execute(&mut self, statement: &str) -> Result<()> {
        let data = self.query(statement).await?;
        if data.command.as_deref() == Some("UPLOAD") {
            stage::upload(&data.upload).await?;
        }
        Ok(())
    }
}

async fn read_envelope<T>(response: reqwest::Response, step: &str) -> Result<Envelope<T>>
where
    T: serde::de::DeserializeOwned,
{
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| PlatformError::warehouse(step, e.to_string()))?;
    if !status.is_success() {
        return Err(PlatformError::warehouse(step, format!("HTTP {}: {}", status, text)).into());
    }
    serde_json::from_str(&text)
        .map_err(|e| PlatformError::warehouse(step, format!("unexpected response: {}", e)).into())
}

/// Base URL for an account identifier, a bare host or a full URL
pub(crate) fn account_url(account: &str) -> Result<Url> {
    let account = account.trim().trim_end_matches('/');
    let url = if account.starts_with("http://") || account.starts_with("https://") {
        format!("{}/", account)
    } else if account.contains(".snowflakecomputing.") {
        format!("https://{}/", account)
    } else {
        format!("https://{}.snowflakecomputing.com/", account)
    };
    Url::parse(&url).map_err(|e| {
        PlatformError::configuration(format!("Invalid SNOWFLAKE_ACCOUNT '{}': {}", account, e))
            .into()
    })
}

/// Account name as sent at login: the first label of the host, without
/// any region or cloud suffix
pub(crate) fn account_name(account: &str) -> String {
    let account = account
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    account
        .split(['.', '/'])
        .next()
        .unwrap_or(account)
        .to_uppercase()
}
