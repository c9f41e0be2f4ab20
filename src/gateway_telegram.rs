// ===============================
// src/gateway_telegram.rs
// ===============================
/*
=============================================================================
Project : tally_bot — daily buy/sell tally service with a live chat summary
Module  : gateway_telegram.rs
Version : 0.1.0
Author  : Kukuh Tripamungkas Wicaksono (Kukuh TW)
License : MIT (see LICENSE)

Summary : Counts buy/sell events per item over HTTP, keeps one JSON file per
          day, mirrors the running totals into a single chat message that is
          edited in place, and starts a fresh tally at local midnight.

(c) 2025 Kukuh TW. All rights reserved where applicable.
=============================================================================
*/
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ChannelError;
use crate::gateway::MessageGateway;

/// Telegram Bot API (`sendMessage` / `editMessageText`).
pub struct TelegramGateway {
    http: reqwest::Client,
    api_base: String,
    token: String,
    chat_id: i64,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
}

#[derive(Serialize)]
struct EditMessageText<'a> {
    chat_id: i64,
    message_id: i64,
    text: &'a str,
}

// ---- Minimal Bot API envelope ----
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramGateway {
    pub fn new(api_base: &str, token: String, chat_id: i64) -> Result<Self, ChannelError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ChannelError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
            chat_id,
        })
    }

    fn url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    async fn call<B: Serialize + ?Sized>(&self, method: &str, body: &B) -> Result<ApiResponse, ChannelError> {
        let rsp = self
            .http
            .post(self.url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| ChannelError::Transport(e.without_url().to_string()))?;
        // Bot API returns the JSON envelope for 4xx too
        rsp.json::<ApiResponse>()
            .await
            .map_err(|e| ChannelError::Transport(e.without_url().to_string()))
    }
}

#[async_trait]
impl MessageGateway for TelegramGateway {
    async fn create_message(&self, text: &str) -> Result<i64, ChannelError> {
        let rsp = self
            .call("sendMessage", &SendMessage { chat_id: self.chat_id, text })
            .await?;
        if !rsp.ok {
            return Err(api_error(&rsp));
        }
        rsp.result
            .as_ref()
            .and_then(|r| r.get("message_id"))
            .and_then(Value::as_i64)
            .ok_or_else(|| ChannelError::Transport("sendMessage: no message_id in result".into()))
    }

    async fn edit_message(&self, id: i64, text: &str) -> Result<(), ChannelError> {
        let body = EditMessageText { chat_id: self.chat_id, message_id: id, text };
        let rsp = self.call("editMessageText", &body).await?;
        classify_edit(id, &rsp)
    }
}

fn api_error(rsp: &ApiResponse) -> ChannelError {
    ChannelError::Api {
        code: rsp.error_code.unwrap_or(0),
        description: rsp.description.clone().unwrap_or_default(),
    }
}

fn classify_edit(id: i64, rsp: &ApiResponse) -> Result<(), ChannelError> {
    if rsp.ok {
        return Ok(());
    }
    let desc = rsp.description.as_deref().unwrap_or_default();
    if desc.contains("message is not modified") {
        // already showing this text
        return Ok(());
    }
    if desc.contains("message to edit not found") || desc.contains("MESSAGE_ID_INVALID") {
        return Err(ChannelError::MessageGone(id));
    }
    Err(api_error(rsp))
}
