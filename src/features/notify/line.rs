//! Push messages through the LINE Messaging API

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::debug;
use serde::Serialize;
use std::time::Duration;

use super::Notifier;

pub const PUSH_ENDPOINT: &str = "https://api.line.me/v2/bot/message/push";
const PUSH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct PushRequest<'a> {
    to: &'a str,
    messages: [TextMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

pub struct LineNotifier {
    client: reqwest::Client,
    access_token: String,
    endpoint: String,
}

impl LineNotifier {
    pub fn new(access_token: impl Into<String>) -> Result<Self> {
        Self::with_endpoint(access_token, PUSH_ENDPOINT)
    }

    pub fn with_endpoint(access_token: impl Into<String>, endpoint: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(PUSH_TIMEOUT).build()?;
        Ok(Self {
            client,
            access_token: access_token.into(),
            endpoint: endpoint.into(),
        })
    }
}

fn push_body<'a>(user_id: &'a str, text: &'a str) -> PushRequest<'a> {
    PushRequest {
        to: user_id,
        messages: [TextMessage { kind: "text", text }],
    }
}

#[async_trait]
impl Notifier for LineNotifier {
    async fn push(&self, user_id: &str, text: &str) -> Result<()> {
        debug!("Pushing {} chars to {user_id}", text.chars().count());

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.access_token)
            .json(&push_body(user_id, text))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow!("Push timed out after {} seconds", PUSH_TIMEOUT.as_secs())
                } else {
                    anyhow!("Push request failed: {e}")
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Push rejected with HTTP {status}: {body}"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_body_shape() {
        let body = serde_json::to_value(push_body("U123", "hello")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "to": "U123",
                "messages": [{"type": "text", "text": "hello"}]
            })
        );
    }
}
