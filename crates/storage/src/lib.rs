#![forbid(unsafe_code)]

pub mod file;
pub mod remote;
pub mod repository;
pub mod sqlite;

pub use file::{DebouncedFileStore, FileProgressStore};
pub use remote::{RemoteConfig, RemoteConfigError, RemoteMergeMode, RemoteProgressStore};
pub use repository::{Backend, InMemoryProgressStore, ProgressStore, Storage, StorageError};
pub use sqlite::{SqliteInitError, SqliteProgressStore};
