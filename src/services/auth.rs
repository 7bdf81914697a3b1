// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Client for the hosted auth provider (GoTrue-compatible REST API).
//!
//! Handles:
//! - Email/password sign-in and sign-up
//! - Resending the verification mail
//! - Sign-out and user lookup for a session token
//! - Google OAuth authorize URL

use serde::Deserialize;

use crate::error::AppError;

/// Auth API client.
#[derive(Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    base_url: Option<String>,
    anon_key: String,
}

/// Session returned by a successful sign-in.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: i64,
    pub user: AuthUserInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthUserInfo {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Sign-up answer: a session only when email confirmation is disabled.
#[derive(Debug, Clone, Deserialize)]
pub struct SignUpResult {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
}

/// Error body shapes used by the provider.
#[derive(Debug, Deserialize, Default)]
struct ProviderError {
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl AuthClient {
    pub fn new(base_url: Option<String>, anon_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            anon_key,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    fn url(&self, path: &str) -> Result<String, AppError> {
        let base = self
            .base_url
            .as_deref()
            .ok_or(AppError::BackendUnavailable)?;
        Ok(format!("{}/auth/v1{}", base, path))
    }

    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AppError> {
        let url = self.url("/token?grant_type=password")?;
        let response = self
            .http
            .post(&url)
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;

        self.check_response_json(response).await
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: &str,
    ) -> Result<SignUpResult, AppError> {
        let url = format!(
            "{}?redirect_to={}",
            self.url("/signup")?,
            urlencoding::encode(redirect_to)
        );
        let response = self
            .http
            .post(&url)
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Resend the sign-up verification email.
    pub async fn resend_verification(&self, email: &str) -> Result<(), AppError> {
        let url = self.url("/resend")?;
        let response = self
            .http
            .post(&url)
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "type": "signup", "email": email }))
            .send()
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;

        self.check_response(response).await
    }

    /// Revoke a session token.
    pub async fn sign_out(&self, access_token: &str) -> Result<(), AppError> {
        let url = self.url("/logout")?;
        let response = self
            .http
            .post(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;

        self.check_response(response).await
    }

    pub async fn get_user(&self, access_token: &str) -> Result<AuthUserInfo, AppError> {
        let url = self.url("/user")?;
        let response = self
            .http
            .get(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Where to send the browser for Google sign-in.
    pub fn google_authorize_url(&self, redirect_to: &str) -> Result<String, AppError> {
        Ok(format!(
            "{}?provider=google&redirect_to={}",
            self.url("/authorize")?,
            urlencoding::encode(redirect_to)
        ))
    }

    /// Map a non-2xx answer: client errors carry the provider's message.
    async fn error_from(&self, response: reqwest::Response) -> AppError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.is_client_error() {
            let parsed: ProviderError = serde_json::from_str(&body).unwrap_or_default();
            let message = parsed
                .error_description
                .or(parsed.msg)
                .or(parsed.message)
                .unwrap_or_else(|| format!("HTTP {}", status));
            return AppError::BadRequest(message);
        }

        AppError::Upstream(format!("HTTP {}: {}", status, body))
    }

    async fn check_response(&self, response: reqwest::Response) -> Result<(), AppError> {
        if response.status().is_success() {
            return Ok(());
        }
        Err(self.error_from(response).await)
    }

    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            return Err(self.error_from(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("JSON parse error: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_google_authorize_url() {
        let client = AuthClient::new(Some("https://auth.example.com".to_string()), "anon".to_string());
        let url = client
            .google_authorize_url("http://localhost:5173/?onboarding=1")
            .unwrap();
        assert_eq!(
            url,
            "https://auth.example.com/auth/v1/authorize?provider=google&redirect_to=http%3A%2F%2Flocalhost%3A5173%2F%3Fonboarding%3D1"
        );
    }

    #[tokio::test]
    async fn test_unconfigured_client_refuses() {
        let client = AuthClient::new(None, String::new());
        assert!(!client.is_configured());
        assert!(matches!(
            client.sign_in_with_password("a@b.c", "pw").await,
            Err(AppError::BackendUnavailable)
        ));
    }
}
