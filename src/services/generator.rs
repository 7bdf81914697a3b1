// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Gemini client for turning a free-form experience into a target draft.
//!
//! Handles:
//! - The `generateContent` call (server-held API key)
//! - Prompt construction listing the allowed categories and avatar styles
//! - Lenient parsing of the model's JSON reply

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;
use crate::models::target::{normalize_tags, split_tag_string};
use crate::models::{AvatarStyle, TargetType};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const TEMPERATURE: f64 = 0.4;

/// Generator failures, each mapped to the status the proxy answers with.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("GEMINI_API_KEY is not configured on server")]
    NotConfigured,

    #[error("prompt is required")]
    EmptyPrompt,

    /// Non-2xx from the upstream; forwarded with the same status
    #[error("{body}")]
    Upstream { status: u16, body: String },

    #[error("Gemini returned empty content")]
    Empty,

    #[error("{0}")]
    Transport(String),

    #[error("Could not parse generated target: {0}")]
    Parse(String),
}

impl GeneratorError {
    fn status(&self) -> StatusCode {
        match self {
            GeneratorError::NotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
            GeneratorError::EmptyPrompt => StatusCode::BAD_REQUEST,
            GeneratorError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            GeneratorError::Empty | GeneratorError::Transport(_) | GeneratorError::Parse(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }
}

impl IntoResponse for GeneratorError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self, "Generator request failed");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<GeneratorError> for AppError {
    fn from(err: GeneratorError) -> Self {
        match err {
            GeneratorError::EmptyPrompt => AppError::Validation(err.to_string()),
            other => AppError::Upstream(other.to_string()),
        }
    }
}

/// Gemini API client.
#[derive(Clone)]
pub struct GeneratorClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl GeneratorClient {
    pub fn new(api_key: Option<String>, model: String) -> Self {
        Self::with_base_url(GEMINI_BASE_URL.to_string(), api_key, model)
    }

    pub fn with_base_url(base_url: String, api_key: Option<String>, model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
            model,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Run a prompt and return the concatenated text of the first candidate.
    pub async fn generate(&self, prompt: &str) -> Result<String, GeneratorError> {
        let api_key = self.api_key.as_deref().ok_or(GeneratorError::NotConfigured)?;

        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(GeneratorError::EmptyPrompt);
        }

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = serde_json::json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": TEMPERATURE }
        });

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GeneratorError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let body = if text.is_empty() {
                format!("Gemini request failed with HTTP {}", status.as_u16())
            } else {
                text
            };
            return Err(GeneratorError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let data: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GeneratorError::Transport(format!("JSON parse error: {}", e)))?;

        let text = data.first_text();
        if text.is_empty() {
            return Err(GeneratorError::Empty);
        }
        Ok(text)
    }

    /// Experience → prompt → generation → normalized draft.
    pub async fn draft_target(&self, experience: &str) -> Result<TargetDraft, GeneratorError> {
        if experience.trim().is_empty() {
            return Err(GeneratorError::EmptyPrompt);
        }
        let text = self.generate(&build_prompt(experience)).await?;
        parse_target_draft(&text)
    }
}

#[derive(Debug, Deserialize, Default)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize, Default)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize, Default)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize, Default)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    fn first_text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

/// Structured target fields extracted from a generated reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TargetDraft {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub avatar_style: AvatarStyle,
    pub tags: Vec<String>,
}

pub fn build_prompt(experience: &str) -> String {
    let types: Vec<&str> = TargetType::ALL.iter().map(|(value, _)| *value).collect();
    let styles: Vec<&str> = AvatarStyle::ALL.iter().map(|s| s.id()).collect();
    format!(
        "你是内容整理助手。根据用户描述生成结构化信息，严格输出 JSON，字段为：name, type, description, avatarStyle, tags。\
约束：type 必须是以下之一：{}；avatarStyle 必须是以下之一：{}；\
description 用一句话概括“为什么要骂TA”（不超过 200 字）；\
tags 是数组，最多 3 个，短词即可（如：甲方、改稿王、职场）。\
用户描述：{}",
        types.join("、"),
        styles.join("、"),
        experience.trim()
    )
}

/// Parse the first `{` .. last `}` span of a reply into a draft.
///
/// Category and style fall back to "其他" and `mystery`; tags may be an
/// array or a comma/space separated string.
pub fn parse_target_draft(text: &str) -> Result<TargetDraft, GeneratorError> {
    let (start, end) = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => (start, end),
        _ => return Err(GeneratorError::Parse("no JSON object in reply".to_string())),
    };

    let value: Value = serde_json::from_str(&text[start..=end])
        .map_err(|e| GeneratorError::Parse(e.to_string()))?;

    let field = |name: &str| {
        value
            .get(name)
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    };

    let tags = match value.get("tags") {
        Some(Value::Array(items)) => normalize_tags(items.iter().filter_map(Value::as_str)),
        Some(Value::String(s)) => normalize_tags(split_tag_string(s)),
        _ => Vec::new(),
    };

    Ok(TargetDraft {
        name: field("name"),
        kind: TargetType::normalize(&field("type")).to_string(),
        description: field("description"),
        avatar_style: AvatarStyle::normalize(&field("avatarStyle")),
        tags,
    })
}
