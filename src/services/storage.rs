// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Blob storage for voice roasts.

use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::AppError;

/// Object store: hosted storage API, or process memory.
#[derive(Clone)]
pub enum BlobStore {
    Http(HttpBlobStore),
    Memory(MemoryBlobStore),
}

impl BlobStore {
    /// Upload `bytes` to `path` in the configured bucket.
    pub async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> Result<(), AppError> {
        match self {
            BlobStore::Http(store) => store.upload(path, bytes, content_type, upsert).await,
            BlobStore::Memory(store) => store.upload(path, bytes, content_type, upsert),
        }
    }

    pub fn public_url(&self, path: &str) -> String {
        match self {
            BlobStore::Http(store) => store.public_url(path),
            BlobStore::Memory(store) => store.public_url(path),
        }
    }
}

#[derive(Clone)]
pub struct HttpBlobStore {
    http: reqwest::Client,
    base_url: String,
    bucket: String,
    api_key: String,
}

impl HttpBlobStore {
    pub fn new(base_url: String, bucket: String, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            bucket,
            api_key,
        }
    }

    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> Result<(), AppError> {
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url, self.bucket, path
        );

        let response = self
            .http
            .post(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("content-type", content_type)
            .header("x-upsert", if upsert { "true" } else { "false" })
            .body(bytes)
            .send()
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;

        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(AppError::Upstream(format!(
            "storage upload HTTP {}: {}",
            status, body
        )))
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, path
        )
    }
}

/// Stored object: bytes and content type.
type StoredObject = (Vec<u8>, String);

#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    bucket: String,
    objects: Arc<DashMap<String, StoredObject>>,
    failing: Arc<AtomicBool>,
}

impl MemoryBlobStore {
    pub fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            ..Default::default()
        }
    }

    /// Make uploads fail (tests).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn get(&self, path: &str) -> Option<StoredObject> {
        self.objects.get(path).map(|o| o.clone())
    }

    fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> Result<(), AppError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Upstream("storage upload failed".to_string()));
        }
        if !upsert && self.objects.contains_key(path) {
            return Err(AppError::BadRequest(format!("object {} already exists", path)));
        }
        self.objects
            .insert(path.to_string(), (bytes, content_type.to_string()));
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("memory://{}/{}", self.bucket, path)
    }
}
