// 文档存储的内存实现：用于本地运行和测试，不落盘。
//
// 整棵数据树是一个 JSON 值，路径按 `/` 分段寻址；每次写入后把新的整棵树广播给
// 订阅者，订阅者再取出自己关心的路径。

use super::ports::{path_segments, DocumentStore, SnapshotStream};
use crate::error::StoreError;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

const CHANGE_BUFFER: usize = 64;

pub struct InMemoryDocumentStore {
    root: RwLock<Value>,
    changes: broadcast::Sender<Arc<Value>>,
    offline: AtomicBool,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        Self {
            root: RwLock::new(Value::Object(Map::new())),
            changes,
            offline: AtomicBool::new(false),
        }
    }

    /// 模拟后端不可用：之后的写操作全部失败
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("document store offline".to_string()));
        }
        Ok(())
    }

    fn publish(&self, root: &Value) {
        // 没有订阅者时发送失败，忽略
        let _ = self.changes.send(Arc::new(root.clone()));
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

fn lookup<'a>(root: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    segments.iter().try_fold(root, |node, segment| match node {
        Value::Object(map) => map.get(*segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// 取子节点，不存在时创建；标量节点会被替换成空对象
fn child_mut<'a>(node: &'a mut Value, segment: &str) -> Result<&'a mut Value, StoreError> {
    if !node.is_object() && !node.is_array() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Array(items) => match segment.parse::<usize>() {
            Ok(i) if i < items.len() => Ok(&mut items[i]),
            _ => Err(StoreError::InvalidPath(segment.to_string())),
        },
        Value::Object(map) => Ok(map.entry(segment.to_string()).or_insert(Value::Null)),
        _ => Err(StoreError::InvalidPath(segment.to_string())),
    }
}

fn node_mut<'a>(root: &'a mut Value, segments: &[&str]) -> Result<&'a mut Value, StoreError> {
    let mut node = root;
    for segment in segments {
        node = child_mut(node, segment)?;
    }
    Ok(node)
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn subscribe(&self, path: &str) -> Result<SnapshotStream, StoreError> {
        let segments: Vec<String> = path_segments(path).into_iter().map(str::to_string).collect();
        let select = move |root: &Value| {
            let refs: Vec<&str> = segments.iter().map(String::as_str).collect();
            lookup(root, &refs).cloned().unwrap_or(Value::Null)
        };

        let receiver = self.changes.subscribe();
        let current = select(&*self.root.read().await);

        let updates = stream::unfold((receiver, select), |(mut receiver, select)| async move {
            loop {
                match receiver.recv().await {
                    Ok(root) => {
                        let snapshot = select(&root);
                        return Some((snapshot, (receiver, select)));
                    }
                    // 快照是完整的，丢掉中间的几次没有关系
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!("Subscriber lagged, skipped {} snapshots", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });

        Ok(stream::once(async move { current }).chain(updates).boxed())
    }

    async fn get(&self, path: &str) -> Result<Value, StoreError> {
        let root = self.root.read().await;
        Ok(lookup(&root, &path_segments(path)).cloned().unwrap_or(Value::Null))
    }

    async fn write(&self, path: &str, value: Value) -> Result<(), StoreError> {
        self.ensure_online()?;
        let mut root = self.root.write().await;
        *node_mut(&mut root, &path_segments(path))? = value;
        self.publish(&root);
        Ok(())
    }

    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<(), StoreError> {
        self.ensure_online()?;
        let mut root = self.root.write().await;
        let node = node_mut(&mut root, &path_segments(path))?;
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        if let Value::Object(map) = node {
            map.extend(fields);
        }
        self.publish(&root);
        Ok(())
    }

    async fn push(&self, path: &str, value: Value) -> Result<String, StoreError> {
        self.ensure_online()?;
        // v7 按时间递增，按 key 排序即按创建顺序
        let key = Uuid::now_v7().simple().to_string();
        let mut root = self.root.write().await;
        let mut segments = path_segments(path);
        segments.push(&key);
        *node_mut(&mut root, &segments)? = value;
        self.publish(&root);
        Ok(key)
    }
}
