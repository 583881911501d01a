use crate::config::BucketTarget;
use crate::error::ShipmentError;
use crate::persistence;
use async_trait::async_trait;
use reqwest::{Client as HttpClient, RequestBuilder, StatusCode};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Object storage the shipper writes to. Keys use `/` separators.
#[async_trait]
pub trait Bucket: Send + Sync {
    fn name(&self) -> String;
    async fn exists(&self, key: &str) -> Result<bool, ShipmentError>;
    async fn upload(&self, key: &str, body: Vec<u8>) -> Result<(), ShipmentError>;
    async fn close(&self) -> Result<(), ShipmentError>;
}

pub fn open_bucket(target: &BucketTarget) -> Result<Arc<dyn Bucket>, ShipmentError> {
    Ok(match target {
        BucketTarget::Filesystem { directory } => Arc::new(FilesystemBucket::new(directory.clone())),
        BucketTarget::Http {
            url,
            token,
            timeout,
        } => Arc::new(HttpBucket::new(url.clone(), token.clone(), *timeout)?),
    })
}

/// A bucket rooted at a local directory.
pub struct FilesystemBucket {
    root: PathBuf,
}

impl FilesystemBucket {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        key.split('/').fold(self.root.clone(), |path, part| path.join(part))
    }
}

#[async_trait]
impl Bucket for FilesystemBucket {
    fn name(&self) -> String {
        format!("filesystem:{}", self.root.display())
    }

    async fn exists(&self, key: &str) -> Result<bool, ShipmentError> {
        Ok(tokio::fs::try_exists(self.path(key)).await?)
    }

    async fn upload(&self, key: &str, body: Vec<u8>) -> Result<(), ShipmentError> {
        let path = self.path(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        persistence::write_atomic(&path, &body).await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), ShipmentError> {
        Ok(())
    }
}

/// A bucket behind plain HTTP: `HEAD` to probe, `PUT` to upload.
pub struct HttpBucket {
    http_client: HttpClient,
    base_url: String,
    token: Option<String>,
}

impl HttpBucket {
    /// Every request, body included, must finish within `timeout`.
    pub fn new(base_url: impl Into<String>, token: Option<String>, timeout: Duration) -> Result<Self, ShipmentError> {
        Ok(Self {
            http_client: HttpClient::builder().timeout(timeout).build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl Bucket for HttpBucket {
    fn name(&self) -> String {
        self.base_url.clone()
    }

    async fn exists(&self, key: &str) -> Result<bool, ShipmentError> {
        let response = self
            .authorize(self.http_client.head(self.url(key)))
            .send()
            .await?;
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(ShipmentError::UnexpectedStatus {
                key: key.to_string(),
                status: status.as_u16(),
            }),
        }
    }

    async fn upload(&self, key: &str, body: Vec<u8>) -> Result<(), ShipmentError> {
        let response = self
            .authorize(self.http_client.put(self.url(key)))
            .body(body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ShipmentError::UnexpectedStatus {
                key: key.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), ShipmentError> {
        Ok(())
    }
}
