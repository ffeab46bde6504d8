use crate::models::ProjectId;
use thiserror::Error;

/// 报表解析错误
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("report is empty")]
    EmptyInput,

    #[error("malformed line {line}: {content}")]
    MalformedLine { line: usize, content: String },

    #[error("invalid parser pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// 进度看板操作错误 (操作被拒绝，不做任何修改)
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("no project selected")]
    NoProjectSelected,

    #[error("project {0} not found")]
    ProjectNotFound(ProjectId),

    #[error("position {0} not found")]
    PositionNotFound(String),

    #[error("record index {index} out of range (len {len})")]
    RecordIndexOutOfRange { index: usize, len: usize },

    #[error("invalid amount: {0:?}")]
    InvalidAmount(String),
}

impl BoardError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            BoardError::NoProjectSelected
                | BoardError::ProjectNotFound(_)
                | BoardError::PositionNotFound(_)
                | BoardError::RecordIndexOutOfRange { .. }
        )
    }
}

/// 存储 / 上传错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid store path: {0:?}")]
    InvalidPath(String),

    #[error("nothing stored at {0}")]
    NotFound(String),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("upload of {name} failed: {reason}")]
    UploadFailed { name: String, reason: String },
}

/// 新建项目流程错误
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("no report loaded")]
    MissingReport,

    #[error("no documents supplied")]
    MissingDocuments,

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("document upload failed: {0}")]
    Upload(#[source] StoreError),

    #[error("saving project failed: {0}")]
    Store(#[source] StoreError),
}
