//! Stance Core - Entity Types
//!
//! Pure data structures and validation for the Stance page-feedback system.
//! All other crates depend on this. This crate contains ONLY data types,
//! identifiers, the error taxonomy, and the content filter - no I/O.

pub mod entities;
pub mod error;
pub mod filter;
pub mod identity;
pub mod site_key;

pub use entities::{
    Comment, CommentReport, CommentSort, EntityKind, ReportReason, Site, SiteFeeling, UserProfile,
};
pub use error::{
    BackendError, BackendResult, ConfigError, SettingsError, StanceError, StanceResult,
    ValidationError,
};
pub use filter::{clean_comment, MAX_COMMENT_LEN};
pub use identity::{CommentId, FeelingKey, ReportKey, Timestamp, UserId};
pub use site_key::SiteKey;
