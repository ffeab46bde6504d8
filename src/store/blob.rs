// 对象存储的内存实现：分块"上传"并推送进度，完成后给出 `memory://` URL。

use super::ports::{BlobStore, UploadProgress, UploadTask};
use crate::error::StoreError;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{oneshot, watch};

const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Clone)]
pub struct InMemoryBlobStore {
    blobs: Arc<DashMap<String, Vec<u8>>>,
    /// 名称 -> 失败原因，用于模拟上传失败
    failures: Arc<DashMap<String, String>>,
    chunk_size: usize,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            blobs: Arc::new(DashMap::new()),
            failures: Arc::new(DashMap::new()),
            chunk_size: chunk_size.max(1),
        }
    }

    /// 之后对 `name` 的上传都会失败
    pub fn fail_uploads_of(&self, name: impl Into<String>, reason: impl Into<String>) {
        self.failures.insert(name.into(), reason.into());
    }

    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.blobs.get(name).map(|b| b.value().clone())
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    pub fn url_for(name: &str) -> String {
        format!("memory://{name}")
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobStore for InMemoryBlobStore {
    fn upload(&self, name: &str, bytes: Vec<u8>) -> UploadTask {
        let total = bytes.len() as u64;
        let (progress_tx, progress_rx) = watch::channel(UploadProgress::new(0, total));
        let (url_tx, url_rx) = oneshot::channel();

        let name = name.to_string();
        let blobs = Arc::clone(&self.blobs);
        let failure = self.failures.get(&name).map(|r| r.value().clone());
        let chunk_size = self.chunk_size;

        tokio::spawn(async move {
            let mut transferred = 0u64;
            for chunk in bytes.chunks(chunk_size) {
                transferred += chunk.len() as u64;
                progress_tx.send_replace(UploadProgress::new(transferred, total));
                tokio::task::yield_now().await;
            }

            let result = match failure {
                Some(reason) => {
                    tracing::warn!("Upload of {} failed: {}", name, reason);
                    Err(StoreError::UploadFailed { name, reason })
                }
                None => {
                    let url = Self::url_for(&name);
                    blobs.insert(name, bytes);
                    Ok(url)
                }
            };
            // 调用方可能已经放弃等待
            let _ = url_tx.send(result);
        });

        UploadTask {
            progress: progress_rx,
            url: url_rx,
        }
    }
}
