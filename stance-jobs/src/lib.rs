//! Stance Jobs - Triggers and Moderation
//!
//! The server-side half of the system: the counter triggers that keep a
//! Site's like/dislike aggregate in step with vote writes, and the
//! scheduled sweep that hard-deletes comments once their report count
//! reaches the threshold. The client never mutates aggregates or removes
//! documents; everything here runs next to the store.

pub mod counters;
pub mod moderation;

pub use counters::apply_feeling_change;
pub use moderation::{
    moderation_task, run_sweep, ModerationConfig, ModerationMetrics, ModerationSnapshot,
    SweepSummary, DEFAULT_REPORT_THRESHOLD,
};
