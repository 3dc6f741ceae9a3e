// SPDX-License-Identifier: Apache-2.0

use crate::{StoreError, StoreErrorCode};
use async_trait::async_trait;
use pagoda_model::ImageKind;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for b in digest {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

/// Content-addressed object name: digest prefix plus the format's
/// canonical extension. Re-uploading identical bytes lands on the same
/// name, which makes uploads idempotent.
#[must_use]
pub fn media_file_name(bytes: &[u8], kind: ImageKind) -> String {
    format!("{}.{}", &sha256_hex(bytes)[..32], kind.extension())
}

fn validate_file_name(name: &str) -> Result<(), StoreError> {
    if name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
        || name.starts_with('.')
    {
        return Err(StoreError::validation("invalid media file name"));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_backoff_ms: 120,
        }
    }
}

/// Where uploaded media bytes live. The blog only ever needs put and
/// delete; reads go straight to the public URL.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    /// Stores the object and returns its public URL.
    async fn put(
        &self,
        file_name: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, StoreError>;

    async fn delete(&self, file_name: &str) -> Result<(), StoreError>;
}

pub struct LocalMediaBackend {
    root: PathBuf,
    public_base_url: String,
}

impl LocalMediaBackend {
    #[must_use]
    pub fn new(root: PathBuf, public_base_url: String) -> Self {
        Self {
            root,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl MediaBackend for LocalMediaBackend {
    fn backend_tag(&self) -> &'static str {
        "localfs"
    }

    async fn put(
        &self,
        file_name: &str,
        bytes: &[u8],
        _content_type: &str,
    ) -> Result<String, StoreError> {
        validate_file_name(file_name)?;
        fs::create_dir_all(&self.root).map_err(|e| {
            StoreError::new(StoreErrorCode::Io, format!("media root create failed: {e}"))
        })?;
        let path = self.root.join(file_name);
        fs::write(&path, bytes).map_err(|e| {
            StoreError::new(StoreErrorCode::Io, format!("media write failed: {e}"))
        })?;
        Ok(format!("{}/{}", self.public_base_url, file_name))
    }

    async fn delete(&self, file_name: &str) -> Result<(), StoreError> {
        validate_file_name(file_name)?;
        let path = self.root.join(file_name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::not_found("media object not found"))
            }
            Err(e) => Err(StoreError::new(
                StoreErrorCode::Io,
                format!("media delete failed: {e}"),
            )),
        }
    }
}

pub struct S3LikeMediaBackend {
    base_url: String,
    public_base_url: Option<String>,
    auth_bearer: Option<String>,
    retry: RetryPolicy,
    client: reqwest::Client,
}

impl S3LikeMediaBackend {
    #[must_use]
    pub fn new(
        base_url: String,
        public_base_url: Option<String>,
        auth_bearer: Option<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            public_base_url: public_base_url.map(|u| u.trim_end_matches('/').to_string()),
            auth_bearer,
            retry,
            client: reqwest::Client::new(),
        }
    }

    fn object_url(&self, file_name: &str) -> String {
        format!("{}/{}", self.base_url, file_name)
    }

    fn public_url(&self, file_name: &str) -> String {
        match &self.public_base_url {
            Some(base) => format!("{base}/{file_name}"),
            None => self.object_url(file_name),
        }
    }

    async fn send_with_retry(
        &self,
        make_request: impl Fn() -> reqwest::RequestBuilder,
        what: &str,
    ) -> Result<(), StoreError> {
        let mut last_err = String::new();
        for attempt in 0..self.retry.max_attempts {
            if attempt > 0 {
                let backoff = self
                    .retry
                    .base_backoff_ms
                    .saturating_mul(1_u64 << attempt.min(10));
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }
            let mut req = make_request();
            if let Some(bearer) = &self.auth_bearer {
                req = req.bearer_auth(bearer);
            }
            match req.send().await {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                Ok(resp) if resp.status().is_client_error() => {
                    return Err(StoreError::new(
                        StoreErrorCode::Io,
                        format!("{what} rejected by object store: {}", resp.status()),
                    ));
                }
                Ok(resp) => {
                    last_err = format!("{what} failed with status {}", resp.status());
                    warn!(attempt, "{last_err}");
                }
                Err(e) => {
                    last_err = format!("{what} failed: {e}");
                    warn!(attempt, "{last_err}");
                }
            }
        }
        Err(StoreError::new(StoreErrorCode::Io, last_err))
    }
}

#[async_trait]
impl MediaBackend for S3LikeMediaBackend {
    fn backend_tag(&self) -> &'static str {
        "s3like"
    }

    async fn put(
        &self,
        file_name: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, StoreError> {
        validate_file_name(file_name)?;
        let url = self.object_url(file_name);
        let body = bytes.to_vec();
        let content_type = content_type.to_string();
        self.send_with_retry(
            || {
                self.client
                    .put(url.as_str())
                    .header(reqwest::header::CONTENT_TYPE, content_type.clone())
                    .body(body.clone())
            },
            "media upload",
        )
        .await?;
        Ok(self.public_url(file_name))
    }

    async fn delete(&self, file_name: &str) -> Result<(), StoreError> {
        validate_file_name(file_name)?;
        let url = self.object_url(file_name);
        self.send_with_retry(|| self.client.delete(url.as_str()), "media delete")
            .await
    }
}
