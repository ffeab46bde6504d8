use crate::config::StorageConfig;
use crate::error::{IngestError, StoreError};
use crate::models::{
    Document, DocumentUpload, PairingConflict, Project, ProjectId, ReportLayout, SkippedLine,
};
use crate::service::pairer::DocumentPairer;
use crate::service::parser::ReportParser;
use crate::store::{BlobStore, DocumentStore, UploadProgress, UploadTask};
use dashmap::DashMap;
use futures::future::try_join_all;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

/// 新建项目的输入：项目名 + 报表原文 + 图纸文件
#[derive(Debug, Clone)]
pub struct NewProject {
    pub name: String,
    pub report: String,
    pub documents: Vec<DocumentUpload>,
}

/// 新建项目的结果和诊断信息
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub id: ProjectId,
    pub layout: ReportLayout,
    pub record_count: usize,
    pub matched_count: usize,
    pub skipped: Vec<SkippedLine>,
    pub duplicates: Vec<String>,
    pub conflicts: Vec<PairingConflict>,
    pub unused: Vec<String>,
}

/// 新建项目流程：解析 -> 并发上传 -> 配对 -> 保存
pub struct ProjectIngestor<S: DocumentStore + ?Sized, B: BlobStore + ?Sized> {
    store: Arc<S>,
    blobs: Arc<B>,
    parser: ReportParser,
    pairer: DocumentPairer,
    storage: StorageConfig,
    progress: watch::Sender<UploadProgress>,
}

/// 单个上传在 select 里的一步
enum UploadStep {
    Finished(Result<Result<String, StoreError>, tokio::sync::oneshot::error::RecvError>),
    Progressed(bool),
}

impl<S: DocumentStore + ?Sized, B: BlobStore + ?Sized> ProjectIngestor<S, B> {
    pub fn new(store: Arc<S>, blobs: Arc<B>, parser: ReportParser, storage: StorageConfig) -> Self {
        let pairer = DocumentPairer::new(parser.normalizer().clone());
        let (progress, _) = watch::channel(UploadProgress::default());
        Self {
            store,
            blobs,
            parser,
            pairer,
            storage,
            progress,
        }
    }

    /// 订阅上传总进度 (所有文件的已传字节 / 总字节)
    pub fn progress(&self) -> watch::Receiver<UploadProgress> {
        self.progress.subscribe()
    }

    /// 新建项目
    ///
    /// 先解析报表，解析失败不上传任何文件；任一文件上传失败则整体失败，
    /// 不保存项目。
    pub async fn create_project(&self, request: NewProject) -> Result<IngestReport, IngestError> {
        if request.report.trim().is_empty() {
            return Err(IngestError::MissingReport);
        }
        if request.documents.is_empty() {
            return Err(IngestError::MissingDocuments);
        }

        let parsed = self.parser.parse(&request.report, &request.name)?;
        tracing::info!(
            "Creating project {} with {} records and {} documents",
            request.name,
            parsed.records.len(),
            request.documents.len()
        );

        let documents = self.upload_all(request.documents).await.map_err(|e| {
            tracing::error!("Aborting project {}: {}", request.name, e);
            IngestError::Upload(e)
        })?;

        let outcome = self.pairer.pair(&parsed.records, &documents);
        let matched_count = outcome.matched_count();
        let project = Project::new(request.name.clone(), outcome.records);

        let key = self
            .save(&project)
            .await
            .map_err(|e| {
                tracing::error!("Saving project {} failed: {}", request.name, e);
                IngestError::Store(e)
            })?;
        let id = ProjectId::new(key);
        tracing::info!("Project {} saved as {}", request.name, id);

        Ok(IngestReport {
            id,
            layout: parsed.layout,
            record_count: project.records.len(),
            matched_count,
            skipped: parsed.skipped,
            duplicates: parsed.duplicates,
            conflicts: outcome.conflicts,
            unused: outcome.unused,
        })
    }

    async fn save(&self, project: &Project) -> Result<String, StoreError> {
        let value = serde_json::to_value(project)?;
        self.store.push(&self.storage.projects_path, value).await
    }

    /// 并发上传所有文件，全部成功才返回
    async fn upload_all(&self, uploads: Vec<DocumentUpload>) -> Result<Vec<Document>, StoreError> {
        let totals: DashMap<usize, UploadProgress> = uploads
            .iter()
            .enumerate()
            .map(|(i, u)| (i, UploadProgress::new(0, u.bytes.len() as u64)))
            .collect();
        self.publish(&totals);

        let prefix = self.storage.documents_prefix.trim_end_matches('/');
        let tasks = uploads.into_iter().enumerate().map(|(index, upload)| {
            let name = format!("{}/{}", prefix, upload.file_name);
            let task = self.blobs.upload(&name, upload.bytes);
            self.drive_upload(index, upload.file_name, task, &totals)
        });

        try_join_all(tasks).await
    }

    /// 等待单个上传结束，期间把它的进度汇总到总进度里
    async fn drive_upload(
        &self,
        index: usize,
        file_name: String,
        mut task: UploadTask,
        totals: &DashMap<usize, UploadProgress>,
    ) -> Result<Document, StoreError> {
        let mut progress_open = true;
        loop {
            let step = tokio::select! {
                result = &mut task.url => UploadStep::Finished(result),
                changed = task.progress.changed(), if progress_open => {
                    UploadStep::Progressed(changed.is_ok())
                }
            };

            match step {
                UploadStep::Progressed(true) => {
                    let current = *task.progress.borrow_and_update();
                    tracing::debug!(
                        "{}: {}/{} bytes",
                        file_name,
                        current.transferred,
                        current.total
                    );
                    totals.insert(index, current);
                    self.publish(totals);
                }
                UploadStep::Progressed(false) => progress_open = false,
                UploadStep::Finished(Ok(result)) => {
                    let url = result?;
                    if let Some(mut entry) = totals.get_mut(&index) {
                        entry.transferred = entry.total;
                    }
                    self.publish(totals);
                    return Ok(Document::new(file_name, url));
                }
                UploadStep::Finished(Err(_)) => {
                    return Err(StoreError::UploadFailed {
                        name: file_name,
                        reason: "upload task ended without a result".to_string(),
                    })
                }
            }
        }
    }

    fn publish(&self, totals: &DashMap<usize, UploadProgress>) {
        let overall = totals
            .iter()
            .fold(UploadProgress::default(), |acc, entry| acc + *entry.value());
        self.progress.send_replace(overall);
    }
}
