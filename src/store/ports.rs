//! 外部协作方的接口
//!
//! 文档存储 (项目数据的权威来源) 和对象存储 (图纸文件) 都只按这里的 trait 使用，
//! 具体实现放在同级的适配器模块里。

use crate::error::StoreError;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::Serialize;
use serde_json::{Map, Value};
use std::ops::Add;
use tokio::sync::{oneshot, watch};

/// 某个路径下数据的完整快照流
pub type SnapshotStream = BoxStream<'static, Value>;

/// 键值文档存储
///
/// 只保证"每次写入最终会出现在之后的快照里"，不保证更强的顺序或原子性。
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// 订阅路径：先推送当前快照，之后每次变更推送一次完整快照
    async fn subscribe(&self, path: &str) -> Result<SnapshotStream, StoreError>;

    /// 读取路径下的值，不存在时为 `Value::Null`
    async fn get(&self, path: &str) -> Result<Value, StoreError>;

    /// 覆盖写入
    async fn write(&self, path: &str, value: Value) -> Result<(), StoreError>;

    /// 局部更新：只改写给出的字段
    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<(), StoreError>;

    /// 在路径下追加一个子节点，返回生成的 key
    async fn push(&self, path: &str, value: Value) -> Result<String, StoreError>;
}

/// 上传进度 (字节)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UploadProgress {
    pub transferred: u64,
    pub total: u64,
}

impl UploadProgress {
    pub fn new(transferred: u64, total: u64) -> Self {
        Self { transferred, total }
    }

    /// 完成比例，总量为 0 时为 0
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.transferred as f64 / self.total as f64
    }
}

impl Add for UploadProgress {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            transferred: self.transferred + rhs.transferred,
            total: self.total + rhs.total,
        }
    }
}

/// 一次进行中的上传：进度通道 + 最终 URL
pub struct UploadTask {
    pub progress: watch::Receiver<UploadProgress>,
    pub url: oneshot::Receiver<Result<String, StoreError>>,
}

/// 对象存储：每个上传的文件得到一个稳定的 URL
pub trait BlobStore: Send + Sync {
    fn upload(&self, name: &str, bytes: Vec<u8>) -> UploadTask;
}

/// 存储路径按 `/` 分段，忽略空段
pub fn path_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_ignore_empty_parts() {
        assert_eq!(path_segments("/projects//p1/records/0/"), vec!["projects", "p1", "records", "0"]);
        assert!(path_segments("").is_empty());
    }

    #[test]
    fn progress_adds_and_never_divides_by_zero() {
        let sum = UploadProgress::new(5, 10) + UploadProgress::new(5, 30);
        assert_eq!(sum, UploadProgress::new(10, 40));
        assert_eq!(sum.ratio(), 0.25);
        assert_eq!(UploadProgress::default().ratio(), 0.0);
    }
}
