//! HTTP fetch tool: GET/POST via `reqwest`, with a bounded response size.
//!
//! Built to the bounded-size contract spec.md's Tool Registry requires: the
//! response body is truncated rather than buffered without limit.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{ToolCallContext, ToolError};
use crate::tools::Tool;

const MAX_RESPONSE_BYTES: usize = 1_000_000;

pub struct HttpFetchTool {
    client: reqwest::Client,
}

impl Default for HttpFetchTool {
    fn default() -> Self {
        Self { client: reqwest::Client::new() }
    }
}

impl HttpFetchTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for HttpFetchTool {
    fn name(&self) -> &str {
        "http_fetch"
    }
    fn description(&self) -> &str {
        "Fetch or send content via HTTP GET/POST. Responses larger than 1MB are rejected."
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {"type": "string"},
                "method": {"type": "string", "enum": ["GET", "POST"], "default": "GET"},
                "body": {"type": "string"}
            },
            "required": ["url"]
        })
    }

    async fn call(&self, args: Value, ctx: &ToolCallContext) -> Result<String, ToolError> {
        let url = args
            .get("url")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidArgs("missing `url`".to_string()))?;
        let method = args.get("method").and_then(|v| v.as_str()).unwrap_or("GET");

        let mut request = match method.to_uppercase().as_str() {
            "GET" => self.client.get(url),
            "POST" => {
                let mut req = self.client.post(url);
                if let Some(body) = args.get("body").and_then(|v| v.as_str()) {
                    req = req.body(body.to_string());
                }
                req
            }
            other => return Err(ToolError::InvalidArgs(format!("unsupported method: {other}"))),
        };
        request = request.timeout(ctx.tool_timeout);

        let response = tokio::time::timeout(ctx.tool_timeout, request.send())
            .await
            .map_err(|_| ToolError::Timeout(ctx.tool_timeout))?
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;
        if bytes.len() > MAX_RESPONSE_BYTES {
            return Err(ToolError::ResponseTooLarge(bytes.len()));
        }
        let text = String::from_utf8_lossy(&bytes).to_string();
        Ok(format!("status: {status}\n{text}"))
    }
}
