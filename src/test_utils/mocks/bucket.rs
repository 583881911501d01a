//! In-memory bucket that records what the shipper does.

use crate::error::ShipmentError;
use crate::shipper::Bucket;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryBucket {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    uploads: Mutex<Vec<String>>,
    closed: AtomicU32,
    fail_uploads: bool,
}

impl MemoryBucket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates an object.
    pub fn with_object(self, key: impl Into<String>, body: Vec<u8>) -> Self {
        self.objects.lock().unwrap().insert(key.into(), body);
        self
    }

    /// Every upload fails.
    pub fn failing_uploads(mut self) -> Self {
        self.fail_uploads = true;
        self
    }

    /// Keys in upload order.
    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn close_count(&self) -> u32 {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Bucket for MemoryBucket {
    fn name(&self) -> String {
        "memory".to_string()
    }

    async fn exists(&self, key: &str) -> Result<bool, ShipmentError> {
        Ok(self.objects.lock().unwrap().contains_key(key))
    }

    async fn upload(&self, key: &str, body: Vec<u8>) -> Result<(), ShipmentError> {
        if self.fail_uploads {
            return Err(ShipmentError::UnexpectedStatus {
                key: key.to_string(),
                status: 503,
            });
        }
        self.objects.lock().unwrap().insert(key.to_string(), body);
        self.uploads.lock().unwrap().push(key.to_string());
        Ok(())
    }

    async fn close(&self) -> Result<(), ShipmentError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
