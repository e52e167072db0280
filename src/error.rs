//! Store error type shared by the PostgreSQL and in-memory backends.

use uuid::Uuid;

/// PostgreSQL SQLSTATE for `unique_violation`.
const PG_UNIQUE_VIOLATION: &str = "23505";
/// SQLSTATE class 23 covers all integrity constraint violations.
const PG_INTEGRITY_CLASS: &str = "23";
/// `numeric_value_out_of_range`, raised on float8 overflow.
const PG_OUT_OF_RANGE: &str = "22003";

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The referenced row does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of entity that was looked up.
        entity: &'static str,
        /// Identifier used for the lookup.
        id: Uuid,
    },

    /// Input or constraint violation that the caller must handle.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Any other database failure.
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if let Some(code) = db_err.code() {
                if code == PG_UNIQUE_VIOLATION {
                    let constraint = db_err.constraint().unwrap_or("unknown");
                    return Self::Validation(format!(
                        "duplicate value violates unique constraint {}",
                        constraint
                    ));
                }
                if code == PG_OUT_OF_RANGE {
                    return Self::Validation(format!(
                        "reputation score out of range: {}",
                        db_err.message()
                    ));
                }
                if code.starts_with(PG_INTEGRITY_CLASS) {
                    return Self::Validation(db_err.message().to_string());
                }
            }
        }
        Self::Database(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let id = Uuid::nil();
        let err = StoreError::not_found("contributor", id);
        assert_eq!(
            err.to_string(),
            "contributor not found: 00000000-0000-0000-0000-000000000000"
        );
        assert!(!err.is_validation());
    }

    #[test]
    fn test_non_database_errors_pass_through() {
        let err: StoreError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, StoreError::Database(sqlx::Error::RowNotFound)));
    }

    #[test]
    fn test_database_error_keeps_its_source() {
        use std::error::Error as _;

        let err: StoreError = sqlx::Error::PoolTimedOut.into();
        let source = err.source().expect("database errors expose their cause");
        assert_eq!(source.to_string(), sqlx::Error::PoolTimedOut.to_string());

        let chain = format!("{:#}", anyhow::Error::new(err));
        assert!(chain.starts_with("database error: "));
    }
}
