mod disk;
mod manifest;
mod mem;
mod source;

pub use disk::DiskStore;
pub use manifest::{validate_store, FileHash, GridSource, ReadingSources, StoreManifest, TableSource};
pub use mem::MemStore;
pub use source::{DataStore, ReadingSourceKind};
