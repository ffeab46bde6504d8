pub mod board;
pub mod export;
pub mod ingest;
pub mod pairer;
pub mod parser;
pub mod tracker;

pub use board::{page_slice, Pager, ProjectBoard};
pub use export::export_csv;
pub use ingest::{IngestReport, NewProject, ProjectIngestor};
pub use pairer::DocumentPairer;
pub use parser::ReportParser;
pub use tracker::{decode_projects, ProgressTracker};
