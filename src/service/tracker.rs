use crate::error::{BoardError, StoreError};
use crate::models::{Project, ProjectId, QuantityField, RecordPatch};
use crate::service::board::ProjectBoard;
use crate::store::DocumentStore;
use futures::StreamExt;
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// 把 `projects` 路径下的快照解码成项目表
///
/// `null` 表示还没有任何项目；解码失败的单个项目记日志后跳过，不影响其它项目。
pub fn decode_projects(snapshot: Value) -> Result<IndexMap<ProjectId, Project>, StoreError> {
    let entries = match snapshot {
        Value::Null => return Ok(IndexMap::new()),
        Value::Object(entries) => entries,
        other => {
            return Err(StoreError::Backend(format!(
                "projects snapshot must be an object, got {}",
                other
            )))
        }
    };

    let mut projects = IndexMap::with_capacity(entries.len());
    for (key, value) in entries {
        match serde_json::from_value::<Project>(value) {
            Ok(project) => {
                projects.insert(ProjectId::new(key), project);
            }
            Err(e) => tracing::warn!("Skipping undecodable project {}: {}", key, e),
        }
    }
    Ok(projects)
}

/// 进度跟踪：看板 + 文档存储
///
/// 存储是权威数据源，订阅到的快照整体覆盖看板 (后到的快照生效)。操作员的修改
/// 先落到看板上，再异步写回存储；写回失败只记日志，不回滚本地修改。
pub struct ProgressTracker<S: DocumentStore + ?Sized> {
    store: Arc<S>,
    board: Arc<RwLock<ProjectBoard>>,
    projects_path: String,
}

impl<S: DocumentStore + ?Sized> ProgressTracker<S> {
    pub fn new(store: Arc<S>, board: ProjectBoard, projects_path: impl Into<String>) -> Self {
        Self {
            store,
            board: Arc::new(RwLock::new(board)),
            projects_path: projects_path.into(),
        }
    }

    pub fn board(&self) -> &Arc<RwLock<ProjectBoard>> {
        &self.board
    }

    /// 订阅项目快照
    ///
    /// 第一份快照在返回前就已应用到看板，之后的快照由后台任务持续应用。
    pub async fn spawn_sync(&self) -> Result<JoinHandle<()>, StoreError> {
        let mut feed = self.store.subscribe(&self.projects_path).await?;
        if let Some(snapshot) = feed.next().await {
            apply(&self.board, snapshot).await;
        }

        let board = Arc::clone(&self.board);
        let path = self.projects_path.clone();
        tracing::info!("Subscribed to {}", path);

        Ok(tokio::spawn(async move {
            while let Some(snapshot) = feed.next().await {
                apply(&board, snapshot).await;
            }
            tracing::info!("Snapshot feed for {} closed", path);
        }))
    }

    /// 主动拉取一次完整快照
    pub async fn refresh(&self) -> Result<(), StoreError> {
        let snapshot = self.store.get(&self.projects_path).await?;
        let projects = decode_projects(snapshot)?;
        self.board.write().await.apply_snapshot(projects);
        Ok(())
    }

    pub async fn select_project(&self, id: &str) -> Result<(), BoardError> {
        self.board.write().await.select_project(id)
    }

    /// 报工并写回存储
    pub async fn add_production(
        &self,
        id: &ProjectId,
        position: &str,
        amount: &str,
    ) -> Result<RecordPatch, BoardError> {
        let patch = self.board.write().await.add_production_in(id, position, amount)?;
        self.mirror(&patch).await;
        Ok(patch)
    }

    /// 改写已完成 / 已发货数量并写回存储
    pub async fn set_quantity(
        &self,
        id: &ProjectId,
        index: usize,
        field: QuantityField,
        text: &str,
    ) -> Result<RecordPatch, BoardError> {
        let patch = self.board.write().await.set_quantity_in(id, index, field, text)?;
        self.mirror(&patch).await;
        Ok(patch)
    }

    async fn mirror(&self, patch: &RecordPatch) {
        match self.store.update(&patch.path, patch.fields.clone()).await {
            Ok(()) => tracing::debug!("Saved {}", patch.path),
            Err(e) => tracing::error!("Failed to save {}: {}", patch.path, e),
        }
    }
}

async fn apply(board: &RwLock<ProjectBoard>, snapshot: Value) {
    match decode_projects(snapshot) {
        Ok(projects) => board.write().await.apply_snapshot(projects),
        Err(e) => tracing::warn!("Ignoring projects snapshot: {}", e),
    }
}

#[cfg(test)]
mod progress_tracker_tests {
    use super::*;
    use crate::config::BoardConfig;
    use crate::models::PositionNormalizer;
    use crate::store::InMemoryDocumentStore;
    use rstest::{fixture, rstest};
    use serde_json::json;
    use std::time::Duration;

    fn hall_seven() -> Value {
        json!({
            "projectName": "Hall 7",
            "records": [
                { "POSNO": "1000", "Quantity": 5, "Profile": "HEA200", "Weight": 1.0, "QuantityDone": 5 },
                { "POSNO": "1234/", "Quantity": "20", "Profile": "PR-50", "Weight": "2.5", "QuantityDone": 10 }
            ]
        })
    }

    #[fixture]
    fn store() -> Arc<InMemoryDocumentStore> {
        Arc::new(InMemoryDocumentStore::new())
    }

    fn tracker(store: &Arc<InMemoryDocumentStore>) -> ProgressTracker<InMemoryDocumentStore> {
        let board = ProjectBoard::new(&BoardConfig::default(), PositionNormalizer::default(), "projects");
        ProgressTracker::new(Arc::clone(store), board, "projects")
    }

    #[rstest]
    fn decodes_null_as_no_projects() {
        assert!(decode_projects(Value::Null).unwrap().is_empty());
        assert!(decode_projects(json!([1, 2])).is_err());
    }

    #[rstest]
    fn skips_projects_that_do_not_decode() {
        let projects = decode_projects(json!({ "p1": hall_seven(), "p2": "garbage" })).unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[&ProjectId::from("p1")].records[1].quantity_ordered, 20);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_apply_initial_and_later_snapshots(store: Arc<InMemoryDocumentStore>) {
        store.write("projects/p1", hall_seven()).await.unwrap();
        let tracker = tracker(&store);

        let _sync = tracker.spawn_sync().await.unwrap();
        assert_eq!(tracker.board().read().await.len(), 1);

        store.write("projects/p2", json!({ "projectName": "Empty" })).await.unwrap();
        for _ in 0..100 {
            if tracker.board().read().await.len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(tracker.board().read().await.len(), 2);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_mirror_production_to_the_store(store: Arc<InMemoryDocumentStore>) {
        store.write("projects/p1", hall_seven()).await.unwrap();
        let tracker = tracker(&store);
        tracker.refresh().await.unwrap();

        let patch = tracker.add_production(&"p1".into(), "1234", "4").await.unwrap();

        assert_eq!(patch.path, "projects/p1/records/1");
        let stored = store.get("projects/p1/records/1").await.unwrap();
        assert_eq!(stored["QuantityDone"], json!(14));
        assert!(stored["Date"].is_string());
        let totals = tracker.board().read().await.totals(&"p1".into()).unwrap();
        assert_eq!(totals.total_completed, 19);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_keep_local_edit_when_store_write_fails(store: Arc<InMemoryDocumentStore>) {
        store.write("projects/p1", hall_seven()).await.unwrap();
        let tracker = tracker(&store);
        tracker.refresh().await.unwrap();
        store.set_offline(true);

        tracker
            .set_quantity(&"p1".into(), 0, QuantityField::Shipped, "3")
            .await
            .unwrap();

        let board = tracker.board().read().await;
        assert_eq!(board.project(&"p1".into()).unwrap().records[0].quantity_shipped, 3);
        assert_eq!(store.get("projects/p1/records/0/QuantitySent").await.unwrap(), Value::Null);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_reject_unknown_positions_without_writing(store: Arc<InMemoryDocumentStore>) {
        store.write("projects/p1", hall_seven()).await.unwrap();
        let tracker = tracker(&store);
        tracker.refresh().await.unwrap();

        let result = tracker.add_production(&"p1".into(), "9999", "1").await;

        assert!(matches!(result, Err(BoardError::PositionNotFound(_))));
        assert_eq!(store.get("projects/p1").await.unwrap(), hall_seven());
    }
}
