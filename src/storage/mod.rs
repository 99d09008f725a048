pub mod file;
pub mod memory;
pub mod persistence;

pub use file::FileBlobStore;
pub use memory::MemoryBlobStore;
pub use persistence::Persistence;

use std::sync::Arc;

use crate::config::{StorageConfig, resolve_path};
use eyre::{Context, Result};

/// Opaque key/value store holding one string per key. Reads and writes are
/// synchronous so a store mutation is durable before the next one starts.
pub trait BlobStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

pub type ArcBlobStore = Arc<dyn BlobStore + Send + Sync>;

pub fn new_blob_store(config: &StorageConfig) -> Result<ArcBlobStore> {
    let store: ArcBlobStore = match config {
        StorageConfig::File(file) => {
            let path = resolve_path(file.path())
                .wrap_err(format!("resolving storage path {}", file.path()))?;
            Arc::new(FileBlobStore::new(path).wrap_err("opening file storage")?)
        }
        StorageConfig::Memory => Arc::new(MemoryBlobStore::default()),
    };
    Ok(store)
}
