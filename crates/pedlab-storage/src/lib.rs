//! Raw document storage.
//!
//! Keeps the original bytes of every upload downloadable, independent of
//! whether the document could be converted. Backends are S3-compatible
//! object storage and a local directory; both address objects by keys of
//! the form `articles/{8 hex digits}_{sanitized filename}` (see [`keys`]).

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod raw;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use pedlab_core::StorageBackend;
pub use raw::{RawFileStore, StorageRawFileStore, StoredFile};
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
