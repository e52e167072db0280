//! CivicVerify Reputation Core
//!
//! Contributor reputation ledger and content view tracking for the
//! CivicVerify fact-checking platform.
//!
//! ## Module Structure
//!
//! ```text
//! src/
//! ├── lib.rs         - Crate root with re-exports
//! ├── main.rs        - Ledger audit entrypoint
//! ├── config.rs      - Configuration management
//! ├── clock.rs       - Time source abstraction
//! ├── error.rs       - Store error type
//! ├── services.rs    - Backend selection and service wiring
//! ├── models/        - Contributors, log entries, views, identities
//! ├── store/         - Storage traits and the in-memory backend
//! ├── database/      - PostgreSQL persistence
//! │   ├── pool.rs         - Connection pool and schema setup
//! │   ├── contributors.rs - Profiles and reputation log
//! │   └── views.rs        - De-duplicated content views
//! ├── reputation/    - Reputation ledger
//! │   ├── ledger.rs       - Atomic adjustments, activity feed, replay audit
//! │   └── provisioning.rs - Post-user-creation hook
//! └── views/         - View tracking
//!     ├── recorder.rs     - View upsert
//!     ├── guard.rs        - Hourly rate limit
//!     ├── policy.rs       - View eligibility
//!     └── analytics.rs    - View counts
//! ```

pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod reputation;
pub mod services;
pub mod store;
pub mod views;

// Re-export main types for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CivicConfig;
pub use database::DatabasePool;
pub use error::{StoreError, StoreResult};
pub use models::{
    ActivitySummary, Content, ContentRef, ContentView, Contributor, LedgerSnapshot,
    ReputationAdjustment, ReputationLogEntry, UserIdentity, ViewKey, ViewerScope,
};
pub use services::CivicServices;
pub use store::{MemoryStore, ReputationStore, ViewStore};

pub use reputation::{
    replay, ContributorProvisioning, LedgerAudit, ReputationLedger, VERIFICATION_REASON,
};
pub use views::{
    AntiAbuseGuard, ViewAnalytics, ViewDenial, ViewEligibilityPolicy, ViewRecorder, ViewStats,
    VIEW_RATE_LIMIT, VIEW_RATE_WINDOW_MINUTES,
};
