pub mod document;
pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use document::InMemoryDocumentStore;
pub use error::BackendError;
pub use file::JsonFileBackend;
pub use memory::MemoryBlobStore;
pub use traits::{DocumentFields, LocalBackend, RemoteBackend, RemoteDocument, SnapshotStream};
