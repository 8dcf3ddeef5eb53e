use super::{ChatBackend, ChatError, ChatResult, WebhookRequest};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

/// Backend that posts each message to an automation webhook as JSON.
pub struct WebhookBackend {
    client: Client,
    endpoint: String,
}

impl WebhookBackend {
    pub fn new(endpoint: impl Into<String>) -> ChatResult<Self> {
        let client = Client::builder().build()?;
        Ok(Self::with_client(client, endpoint))
    }

    pub fn with_client(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Pull the assistant text out of a webhook reply body.
///
/// The body must be a JSON object whose `output` is a string. Any other field
/// is ignored. A null or empty `output` is reported separately from a body
/// that does not decode at all.
pub fn decode_reply(body: &str) -> ChatResult<String> {
    let Value::Object(mut fields) = serde_json::from_str::<Value>(body)? else {
        return Err(ChatError::Decode("reply is not a JSON object".to_string()));
    };
    match fields.remove("output") {
        Some(Value::String(output)) if !output.is_empty() => Ok(output),
        Some(Value::String(_)) | Some(Value::Null) | None => Err(ChatError::MissingOutput),
        Some(other) => Err(ChatError::Decode(format!(
            "output is not a string: {other}"
        ))),
    }
}

#[async_trait]
impl ChatBackend for WebhookBackend {
    async fn send(&self, request: &WebhookRequest) -> ChatResult<String> {
        tracing::debug!(
            endpoint = %self.endpoint,
            session = %request.sessionid,
            chars = request.message.len(),
            "posting message to webhook"
        );

        let response = self.client.post(&self.endpoint).json(request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ChatError::Status {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(bytes = body.len(), "webhook replied");
        decode_reply(&body)
    }
}
