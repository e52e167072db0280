//! Data models
//!
//! Typed entities persisted by the stores:
//! - Contributors and their reputation log
//! - Content views and viewer identities

pub mod contributor;
pub mod view;

pub use contributor::{
    ActivitySummary, AdjustmentKind, Contributor, LedgerSnapshot, ReputationAdjustment,
    ReputationLogEntry,
};
pub use view::{Content, ContentRef, ContentView, UserIdentity, ViewKey, ViewerScope};
