// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Object Store Adapter (C3): profile photos, violation snapshots, and audio
//! clips live in three buckets bootstrapped at startup (spec §4.3).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

use crate::error::EngineError;

pub const PROFILE_PHOTOS_BUCKET: &str = "profile-photos";
pub const VIOLATION_SNAPSHOTS_BUCKET: &str = "violation-snapshots";
pub const AUDIO_CLIPS_BUCKET: &str = "audio-clips";

pub const ALL_BUCKETS: [&str; 3] =
    [PROFILE_PHOTOS_BUCKET, VIOLATION_SNAPSHOTS_BUCKET, AUDIO_CLIPS_BUCKET];

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create any bucket in [`ALL_BUCKETS`] that does not already exist.
    /// Idempotent; called once at startup.
    async fn bootstrap_buckets(&self) -> Result<(), EngineError>;

    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<(), EngineError>;

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, EngineError>;

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), EngineError>;

    /// Pre-signed GET URL valid for `ttl`, used by the HTTP surface to hand
    /// clients direct read access without proxying bytes.
    async fn presign_read(&self, bucket: &str, key: &str, ttl: Duration) -> Result<String, EngineError>;
}

pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn bootstrap_buckets(&self) -> Result<(), EngineError> {
        let existing = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(|e| EngineError::ObjectStore(e.to_string()))?;
        let existing_names: Vec<String> = existing
            .buckets()
            .iter()
            .filter_map(|b| b.name().map(str::to_owned))
            .collect();

        for bucket in ALL_BUCKETS {
            if existing_names.iter().any(|n| n == bucket) {
                continue;
            }
            self.client
                .create_bucket()
                .bucket(bucket)
                .send()
                .await
                .map_err(|e| EngineError::ObjectStore(e.to_string()))?;
        }
        Ok(())
    }

    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<(), EngineError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| EngineError::ObjectStore(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, EngineError> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| EngineError::ObjectStore(e.to_string()))?;
        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| EngineError::ObjectStore(e.to_string()))?;
        Ok(bytes.into_bytes().to_vec())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), EngineError> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| EngineError::ObjectStore(e.to_string()))?;
        Ok(())
    }

    async fn presign_read(&self, bucket: &str, key: &str, ttl: Duration) -> Result<String, EngineError> {
        use aws_sdk_s3::presigning::PresigningConfig;

        let config = PresigningConfig::expires_in(ttl)
            .map_err(|e| EngineError::ObjectStore(e.to_string()))?;
        let presigned = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(config)
            .await
            .map_err(|e| EngineError::ObjectStore(e.to_string()))?;
        Ok(presigned.uri().to_string())
    }
}

/// In-memory fake used by session-engine and ingestion tests.
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn bootstrap_buckets(&self) -> Result<(), EngineError> {
        Ok(())
    }

    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<(), EngineError> {
        self.objects.lock().unwrap().insert((bucket.to_owned(), key.to_owned()), bytes);
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, EngineError> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_owned(), key.to_owned()))
            .cloned()
            .ok_or_else(|| EngineError::not_found(format!("no object at {bucket}/{key}")))
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), EngineError> {
        self.objects.lock().unwrap().remove(&(bucket.to_owned(), key.to_owned()));
        Ok(())
    }

    async fn presign_read(&self, bucket: &str, key: &str, ttl: Duration) -> Result<String, EngineError> {
        Ok(format!("https://fake-object-store.invalid/{bucket}/{key}?ttl={}", ttl.as_secs()))
    }
}

#[cfg(test)]
#[path = "object_store_tests.rs"]
mod tests;
