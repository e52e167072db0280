//! Content View Tracking
//!
//! Records who saw which content and decides whether a view earns credit.
//!
//! ## Flow
//!
//! ```text
//! request ──► ViewEligibilityPolicy ──► eligible? ──► ViewRecorder ──► ViewStore
//!                   │                                                    ▲
//!                   └──► AntiAbuseGuard ── count_views_since ────────────┘
//! ```
//!
//! Eligibility checks, in order: self-view, locked-out viewer, missing
//! identity, hourly rate limit (more than 30 views in the trailing hour).

mod analytics;
mod guard;
mod policy;
mod recorder;

pub use analytics::{ViewAnalytics, ViewStats};
pub use guard::{mask_ip, AntiAbuseGuard, VIEW_RATE_LIMIT, VIEW_RATE_WINDOW_MINUTES};
pub use policy::{ViewDenial, ViewEligibilityPolicy};
pub use recorder::ViewRecorder;
