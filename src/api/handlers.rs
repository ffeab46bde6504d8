use crate::error::{BoardError, IngestError, StoreError};
use crate::models::{DocumentUpload, LineItem, ProgressTotals, ProjectId, QuantityField, RecordPatch};
use crate::service::{export_csv, page_slice, IngestReport, NewProject, ProgressTracker, ProjectIngestor};
use crate::store::{BlobStore, DocumentStore};
use axum::{
    extract::{Json, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// 共享状态：进度跟踪 + 新建项目流程
#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<ProgressTracker<dyn DocumentStore>>,
    pub ingestor: Arc<ProjectIngestor<dyn DocumentStore, dyn BlobStore>>,
}

/// 统一响应体
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            data: Some(data),
        })
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Board(#[from] BoardError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    BadRequest(String),

    #[error("export failed: {0}")]
    Export(#[from] csv::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Board(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            ApiError::Board(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Ingest(IngestError::Upload(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Ingest(IngestError::Store(_)) | ApiError::Store(_) | ApiError::Export(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Ingest(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        let body = ApiResponse::<()> {
            success: false,
            message: format!("Error: {}", self),
            data: None,
        };
        (status, Json(body)).into_response()
    }
}

/// 项目进度
#[derive(Debug, Serialize)]
pub struct ProgressView {
    pub id: ProjectId,
    pub name: String,
    pub totals: ProgressTotals,
    pub progress_ratio: f64,
    pub percent: u32,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

/// 一页明细
#[derive(Debug, Serialize)]
pub struct RecordsPage {
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    /// 本页第一条明细在项目里的下标 (改写数量时使用)
    pub offset: usize,
    pub records: Vec<LineItem>,
}

/// 请求体: 改写已完成 / 已发货数量
#[derive(Debug, Deserialize)]
pub struct SetQuantityRequest {
    pub field: QuantityField,
    pub value: String,
}

/// 请求体: 报工
#[derive(Debug, Deserialize)]
pub struct ProductionRequest {
    pub position_number: String,
    pub amount: String,
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 项目列表 (含汇总)
pub async fn list_projects(State(state): State<AppState>) -> Response {
    let summaries = state.tracker.board().read().await.summaries();
    ApiResponse::ok(format!("{} projects", summaries.len()), summaries).into_response()
}

/// 新建项目 (multipart: project_name / report / documents)
pub async fn create_project(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut name = String::new();
    let mut report = String::new();
    let mut documents = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "project_name" => {
                name = field.text().await.map_err(|e| ApiError::BadRequest(e.to_string()))?;
            }
            "report" => {
                report = field.text().await.map_err(|e| ApiError::BadRequest(e.to_string()))?;
            }
            "documents" => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| ApiError::BadRequest("document without file name".to_string()))?;
                let bytes = field.bytes().await.map_err(|e| ApiError::BadRequest(e.to_string()))?;
                documents.push(DocumentUpload::new(file_name, bytes.to_vec()));
            }
            other => tracing::debug!("Ignoring multipart field {:?}", other),
        }
    }

    if name.trim().is_empty() {
        return Err(ApiError::BadRequest("project_name is required".to_string()));
    }

    let report: IngestReport = state
        .ingestor
        .create_project(NewProject {
            name: name.trim().to_string(),
            report,
            documents,
        })
        .await?;

    // 订阅会补上，这里主动拉一次让后续请求立即可见
    if let Err(e) = state.tracker.refresh().await {
        tracing::warn!("Refreshing board after create failed: {}", e);
    }

    let message = format!(
        "Created project {} with {} records ({} with documents)",
        report.id, report.record_count, report.matched_count
    );
    Ok((StatusCode::CREATED, ApiResponse::ok(message, report)).into_response())
}

/// 项目进度汇总
pub async fn project_progress(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = ProjectId::new(id);
    let board = state.tracker.board().read().await;
    let project = board
        .project(&id)
        .ok_or_else(|| BoardError::ProjectNotFound(id.clone()))?;
    let totals = board.totals(&id).unwrap_or_default();

    let view = ProgressView {
        name: project.name.clone(),
        id,
        totals,
        progress_ratio: totals.progress_ratio(),
        percent: totals.percent(),
    };
    Ok(ApiResponse::ok(format!("{}% complete", view.percent), view).into_response())
}

/// 分页明细 (页码从 1 开始)
pub async fn list_records(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Response, ApiError> {
    let id = ProjectId::new(id);
    let board = state.tracker.board().read().await;
    let project = board
        .project(&id)
        .ok_or_else(|| BoardError::ProjectNotFound(id.clone()))?;

    let page = query.page.unwrap_or(1).max(1);
    let page_size = query.page_size.unwrap_or(board.pager().page_size()).max(1);
    let records = page_slice(&project.records, page - 1, page_size).to_vec();
    let offset = ((page - 1).saturating_mul(page_size)).min(project.records.len());

    let body = RecordsPage {
        page,
        page_size,
        total: project.records.len(),
        offset,
        records,
    };
    Ok(ApiResponse::ok(format!("page {}", page), body).into_response())
}

/// 改写某条明细的数量
pub async fn update_record(
    State(state): State<AppState>,
    Path((id, index)): Path<(String, usize)>,
    Json(req): Json<SetQuantityRequest>,
) -> Result<Response, ApiError> {
    let patch: RecordPatch = state
        .tracker
        .set_quantity(&ProjectId::new(id), index, req.field, &req.value)
        .await?;
    Ok(ApiResponse::ok(format!("Updated {}", req.field.key()), patch).into_response())
}

/// 报工
pub async fn add_production(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ProductionRequest>,
) -> Result<Response, ApiError> {
    let patch = state
        .tracker
        .add_production(&ProjectId::new(id), &req.position_number, &req.amount)
        .await?;
    let message = format!("Added {} to {}", req.amount.trim(), req.position_number.trim());
    Ok(ApiResponse::ok(message, patch).into_response())
}

/// 导出 CSV
pub async fn export_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = ProjectId::new(id);
    let project = state
        .tracker
        .board()
        .read()
        .await
        .project(&id)
        .cloned()
        .ok_or_else(|| BoardError::ProjectNotFound(id.clone()))?;

    let mut body = Vec::new();
    export_csv(&project, &mut body)?;

    let disposition = format!("attachment; filename=\"{}.csv\"", id);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
