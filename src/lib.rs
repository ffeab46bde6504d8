pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod service;
pub mod store;

pub use config::AppConfig;
pub use error::{BoardError, IngestError, ParseError, StoreError};
pub use service::{DocumentPairer, ProgressTracker, ProjectBoard, ProjectIngestor, ReportParser};
