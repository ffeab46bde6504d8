pub mod blob;
pub mod memory;
pub mod ports;

pub use blob::InMemoryBlobStore;
pub use memory::InMemoryDocumentStore;
pub use ports::{path_segments, BlobStore, DocumentStore, SnapshotStream, UploadProgress, UploadTask};
