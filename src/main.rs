use std::sync::Arc;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;
use xsr_progress::store::{BlobStore, DocumentStore, InMemoryBlobStore, InMemoryDocumentStore};
use xsr_progress::{api, AppConfig, ProgressTracker, ProjectBoard, ProjectIngestor, ReportParser};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志 - 使用本地时间格式，级别由 RUST_LOG 控制 (默认 info)
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::from_env()?;
    info!("Starting server with config: {:?}", config);

    // 存储 (内存实现，进程退出即丢失)
    let store: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());
    let blobs: Arc<dyn BlobStore> = Arc::new(InMemoryBlobStore::new());

    // 看板 + 订阅同步
    let board = ProjectBoard::new(
        &config.board,
        config.parser.normalizer(),
        config.storage.projects_path.clone(),
    );
    let tracker = Arc::new(ProgressTracker::new(
        Arc::clone(&store),
        board,
        config.storage.projects_path.clone(),
    ));
    let _sync = tracker.spawn_sync().await?;

    // 新建项目流程
    let parser = ReportParser::new(config.parser.clone())?;
    let ingestor = Arc::new(ProjectIngestor::new(store, blobs, parser, config.storage.clone()));

    let app = api::router(api::AppState { tracker, ingestor }, &config.server);

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  GET   /api/projects                     - project summaries");
    info!("  POST  /api/projects                     - create project (multipart)");
    info!("  GET   /api/projects/:id/progress        - progress totals");
    info!("  GET   /api/projects/:id/records         - paged records");
    info!("  PATCH /api/projects/:id/records/:index  - set done / sent quantity");
    info!("  POST  /api/projects/:id/production      - add production");
    info!("  GET   /api/projects/:id/export          - CSV export");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
