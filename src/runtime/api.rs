/// HTTP control API transport
///
/// First leg of the transport chain: a small JSON API fronting the admin
/// socket, exposing `POST {base}/execute` for runtime commands and
/// `POST {base}/reload` to trigger a supervisor reload. A response counts
/// as success when it is valid JSON whose `success` field is absent or
/// true; transport errors, non-JSON bodies and `success: false` are
/// failures handed to the next transport in the chain.
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::ApiConfig;
use crate::runtime::Transport;

pub struct ApiTransport {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiTransport {
    pub fn new(config: &ApiConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_sec))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }

    fn body(&self, command: Option<&str>) -> Value {
        let mut body = match command {
            Some(command) => json!({ "command": command }),
            None => json!({}),
        };
        if let Some(token) = &self.token {
            body["token"] = json!(token);
        }
        body
    }

    async fn post(&self, path: &str, body: Value) -> bool {
        let url = format!("{}{path}", self.base_url);
        let response = match self.client.post(&url).json(&body).send().await {
            Ok(response) => response,
            Err(err) => {
                log::debug!("runtime API request to {url} failed: {err}");
                return false;
            }
        };

        match response.json::<Value>().await {
            Ok(value) => is_success(&value),
            Err(err) => {
                log::debug!("runtime API at {url} returned non-JSON body: {err}");
                false
            }
        }
    }

    /// Run a runtime command through the API.
    pub async fn execute(&self, command: &str) -> bool {
        self.post("/execute", self.body(Some(command))).await
    }

    /// Ask the API to touch the supervisor's reload flag.
    pub async fn reload(&self) -> bool {
        self.post("/reload", self.body(None)).await
    }
}

/// Success iff the `success` field is absent or true.
fn is_success(value: &Value) -> bool {
    match value.get("success") {
        None => true,
        Some(flag) => flag.as_bool().unwrap_or(false),
    }
}

#[async_trait]
impl Transport for ApiTransport {
    fn name(&self) -> &'static str {
        "api"
    }

    async fn dispatch(&self, command: &str) -> bool {
        self.execute(command).await
    }
}
