//! Blob storage integration for the reference image-transport path
//!
//! Uploads normalized images to S3-compatible storage and hands back a
//! publicly fetchable URL the generation service can pull itself.

pub mod client;
pub mod mock;

pub use client::S3BlobStore;
pub use mock::MockBlobStore;

use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload raw bytes under a key and return a publicly fetchable URL.
    async fn upload(&self, key: &str, data: &[u8], content_type: &str) -> Result<String>;
}
