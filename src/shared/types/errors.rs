use sea_orm::{sqlx, DbErr, RuntimeErr};
use thiserror::Error;
use validator::ValidationErrors;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Already exists: {entity} {value}")]
    AlreadyExists { entity: &'static str, value: String },

    /// The counter aggregate row is missing. This is a store provisioning
    /// problem, never a missing domain entity.
    #[error("Counter not found: {0}")]
    CounterNotFound(String),

    #[error("Validation: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Store unavailable: {0}")]
    Unavailable(#[from] DbErr),

    #[error("Stored record could not be decoded: {0}")]
    Decode(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation deadline exceeded")]
    DeadlineExceeded,
}

/// Coarse classification a presentation layer maps onto its own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    CounterNotFound,
    Validation,
    Unavailable,
    Cancelled,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::AlreadyExists => "already_exists",
            Self::CounterNotFound => "counter_not_found",
            Self::Validation => "validation",
            Self::Unavailable => "unavailable",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
        }
    }
}

impl DomainError {
    pub fn not_found(entity: &'static str, value: impl ToString) -> Self {
        Self::NotFound {
            entity,
            field: "id",
            value: value.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::CounterNotFound(_) => ErrorKind::CounterNotFound,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Unavailable(_) => ErrorKind::Unavailable,
            Self::Cancelled | Self::DeadlineExceeded => ErrorKind::Cancelled,
            Self::Decode(_) => ErrorKind::Internal,
        }
    }

    /// Whether this error is likely transient (e.g. DB connection lost,
    /// SQLite writer lock held) and the unit of work may succeed if retried.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unavailable(DbErr::ConnectionAcquire(_)) | Self::Unavailable(DbErr::Conn(_)) => {
                true
            }
            Self::Unavailable(
                DbErr::Exec(RuntimeErr::SqlxError(err)) | DbErr::Query(RuntimeErr::SqlxError(err)),
            ) => is_lock_contention(err),
            _ => false,
        }
    }
}

const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// SQLITE_BUSY or SQLITE_LOCKED, including extended codes such as
/// SQLITE_BUSY_SNAPSHOT (517), whose low byte is the primary code.
fn is_lock_contention(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut => true,
        sqlx::Error::Database(db_err) => db_err
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            .map_or(false, |code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED)),
        _ => false,
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::sqlx::error::DatabaseError;
    use std::borrow::Cow;
    use std::fmt;

    #[test]
    fn not_found_mentions_entity_and_id() {
        let err = DomainError::not_found("Ticket", "abc");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "Not found: Ticket with id=abc");
    }

    #[test]
    fn counter_not_found_is_distinct_from_not_found() {
        let err = DomainError::CounterNotFound("--counter--".into());
        assert_eq!(err.kind(), ErrorKind::CounterNotFound);
        assert_ne!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn deadline_and_cancel_share_a_kind() {
        assert_eq!(DomainError::Cancelled.kind(), ErrorKind::Cancelled);
        assert_eq!(DomainError::DeadlineExceeded.kind(), ErrorKind::Cancelled);
    }

    #[derive(Debug)]
    struct SqliteFailure(&'static str);

    impl fmt::Display for SqliteFailure {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "sqlite error {}", self.0)
        }
    }

    impl std::error::Error for SqliteFailure {}

    impl DatabaseError for SqliteFailure {
        fn message(&self) -> &str {
            "database is locked"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.0))
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::Other
        }
    }

    fn exec_failure(code: &'static str) -> DomainError {
        let err = sqlx::Error::Database(Box::new(SqliteFailure(code)));
        DomainError::Unavailable(DbErr::Exec(RuntimeErr::SqlxError(err)))
    }

    #[test]
    fn busy_and_locked_codes_are_transient() {
        for code in ["5", "6", "517", "261"] {
            let err = exec_failure(code);
            assert!(err.is_transient(), "code {code}");
            assert_eq!(err.kind(), ErrorKind::Unavailable);
        }
        let query = DomainError::Unavailable(DbErr::Query(RuntimeErr::SqlxError(
            sqlx::Error::PoolTimedOut,
        )));
        assert!(query.is_transient());
    }

    #[test]
    fn other_sqlite_codes_and_messages_are_not_transient() {
        // SQLITE_CONSTRAINT_PRIMARYKEY, SQLITE_FULL
        assert!(!exec_failure("1555").is_transient());
        assert!(!exec_failure("13").is_transient());
        let text_only = DomainError::Unavailable(DbErr::Exec(RuntimeErr::Internal(
            "busy doing something else".into(),
        )));
        assert!(!text_only.is_transient());
    }

    #[test]
    fn domain_errors_are_not_transient() {
        assert!(!DomainError::not_found("Ticket", "x").is_transient());
        assert!(!DomainError::CounterNotFound("c".into()).is_transient());
        assert!(!DomainError::Unavailable(DbErr::Custom("bad column".into())).is_transient());
    }
}
