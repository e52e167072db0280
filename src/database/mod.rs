//! PostgreSQL Database Module
//!
//! Provides database operations for contributors, the reputation log, and
//! content views.

pub mod contributors;
pub mod pool;
pub mod views;

pub use contributors::ContributorRepository;
pub use pool::DatabasePool;
pub use views::ContentViewRepository;
