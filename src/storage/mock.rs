use super::BlobStore;
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct MockBlobStore {
    blobs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    base_url: String,
    upload_count: Arc<Mutex<usize>>,
}

impl MockBlobStore {
    pub fn new() -> Self {
        Self {
            blobs: Arc::new(Mutex::new(HashMap::new())),
            base_url: "https://mock-storage.example.com".to_string(),
            upload_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn get_upload_count(&self) -> usize {
        *self.upload_count.lock().unwrap()
    }

    pub fn get_blobs(&self) -> HashMap<String, Vec<u8>> {
        self.blobs.lock().unwrap().clone()
    }
}

impl Default for MockBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for MockBlobStore {
    async fn upload(&self, key: &str, data: &[u8], _content_type: &str) -> Result<String> {
        let mut count = self.upload_count.lock().unwrap();
        *count += 1;

        self.blobs
            .lock()
            .unwrap()
            .insert(key.to_string(), data.to_vec());
        Ok(format!("{}/{}", self.base_url, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_returns_public_url() {
        let store = MockBlobStore::new();

        let url = store
            .upload("uploads/a.jpg", b"jpeg-bytes", "image/jpeg")
            .await
            .unwrap();

        assert_eq!(url, "https://mock-storage.example.com/uploads/a.jpg");
        assert_eq!(store.get_upload_count(), 1);
        assert_eq!(
            store.get_blobs().get("uploads/a.jpg").map(Vec::as_slice),
            Some(&b"jpeg-bytes"[..])
        );
    }

    #[tokio::test]
    async fn test_custom_base_url() {
        let store = MockBlobStore::new().with_base_url("https://cdn.test".to_string());

        let url = store
            .upload("uploads/b.jpg", b"data", "image/jpeg")
            .await
            .unwrap();

        assert_eq!(url, "https://cdn.test/uploads/b.jpg");
    }
}
