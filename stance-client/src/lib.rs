//! Stance Client - Data Access Layer
//!
//! Every externally visible read or write against Site, SiteFeeling,
//! Comment, and CommentReport documents, gated by the cache staleness
//! tracker for reads and write-through for writes. The view layer calls
//! into [`DataAccess`] and renders whatever comes back; nothing here blocks,
//! and absent documents are `Ok(None)`, never errors.

pub mod data_access;

pub use data_access::{DataAccess, DataAccessConfig};
