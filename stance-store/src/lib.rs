//! Stance Store - Storage Abstraction and Cache Gate
//!
//! This crate holds everything between the data-access layer and the bytes:
//!
//! - [`DocumentBackend`]: the backing document database, with the
//!   device-cache/server read distinction made explicit via [`ReadSource`].
//! - [`MemoryBackend`]: in-memory implementation with failure injection and
//!   operation counters, used by tests and embedders.
//! - [`HttpBackend`]: `reqwest`-based implementation against a JSON document
//!   API, mirroring server reads into a local bucket store.
//! - [`SettingsStore`]: the extension-local persisted key-value primitive
//!   (get whole bucket / set whole bucket), in-memory or LMDB-backed.
//! - [`StalenessTracker`]: the per-key freshness gate that decides whether a
//!   cached read is too old to trust.

pub mod backend;
pub mod http;
pub mod lmdb;
pub mod memory;
pub mod settings;
pub mod staleness;

pub use backend::{
    BackendStats, CommentCursor, CommentQuery, DocumentBackend, NewComment, ReadSource,
    DEFAULT_PAGE_SIZE,
};
pub use http::HttpBackend;
pub use lmdb::LmdbSettings;
pub use memory::MemoryBackend;
pub use settings::{get_bucket, set_bucket, MemorySettings, SettingsStore};
pub use staleness::{StalenessConfig, StalenessTracker, CACHE_BUCKET, DEFAULT_TTL};
