// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Generative text proxy. The key stays on the server, and callers must
//! be signed in.

use crate::services::GeneratorError;
use crate::AppState;
use axum::{body::Bytes, extract::State, routing::post, Json, Router};
use serde::Serialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/ai/generate-target", post(generate_target))
}

#[derive(Serialize)]
pub struct GenerateResponse {
    pub text: String,
}

/// Pull `prompt` out of an arbitrary body; anything unusable is empty.
fn prompt_from(body: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("prompt").and_then(|p| p.as_str()).map(str::to_string))
        .unwrap_or_default()
}

/// POST /api/ai/generate-target
async fn generate_target(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<GenerateResponse>, GeneratorError> {
    let prompt = prompt_from(&body);
    let text = state.generator.generate(&prompt).await?;
    Ok(Json(GenerateResponse { text }))
}
