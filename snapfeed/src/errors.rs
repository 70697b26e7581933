use std::borrow::Cow;

use thiserror::Error;

/// Error returned by a data platform for a query, mutation, upload or auth call.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// Underlying Redis command failed.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A single-row query matched nothing.
    #[error("no rows returned for {table}")]
    NoRows { table: String },

    /// Unique constraint violation on insert or update.
    #[error("duplicate key value violates unique constraint {table}({columns:?})")]
    UniqueViolation { table: String, columns: Vec<String> },

    /// A declared check constraint rejected the row.
    #[error("new row for {table} violates check constraint {constraint}")]
    CheckViolation { table: String, constraint: String },

    /// The row references a parent that does not exist, or a parent still has
    /// dependent rows.
    #[error("foreign key violation on {table}.{column}")]
    ForeignKeyViolation { table: String, column: String },

    /// The caller is not allowed to perform the operation on this row.
    #[error("row-level policy for {operation} on {table} rejected the request")]
    PolicyViolation { table: String, operation: &'static str },

    /// The operation requires a signed-in caller.
    #[error("authentication required")]
    Unauthenticated,

    /// Email and password did not match an account.
    #[error("invalid login credentials")]
    InvalidCredentials,

    /// An account, object or similar resource already exists.
    #[error("{what} already exists")]
    Duplicate { what: String },

    /// Malformed request (unknown table, bad filter value, ...).
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// Failure injected by the in-memory platform.
    #[error("injected failure for {operation} on {table}")]
    Injected { table: String, operation: &'static str },

    /// Row or payload could not be (de)serialized.
    #[error("serialization error: {message}")]
    Serialization { message: Cow<'static, str> },
}

impl PlatformError {
    /// Stable machine-readable code, modelled on the PostgREST/Postgres codes a
    /// hosted platform reports.
    pub fn code(&self) -> &'static str {
        match self {
            PlatformError::Redis(_) => "network",
            PlatformError::NoRows { .. } => "PGRST116",
            PlatformError::UniqueViolation { .. } => "23505",
            PlatformError::CheckViolation { .. } => "23514",
            PlatformError::ForeignKeyViolation { .. } => "23503",
            PlatformError::PolicyViolation { .. } => "42501",
            PlatformError::Unauthenticated => "401",
            PlatformError::InvalidCredentials => "invalid_grant",
            PlatformError::Duplicate { .. } => "409",
            PlatformError::InvalidRequest { .. } => "400",
            PlatformError::Injected { .. } => "injected",
            PlatformError::Serialization { .. } => "serialization",
        }
    }

    pub fn is_no_rows(&self) -> bool {
        matches!(self, PlatformError::NoRows { .. })
    }

    pub(crate) fn serialization(err: impl std::fmt::Display) -> Self {
        PlatformError::Serialization {
            message: Cow::Owned(err.to_string()),
        }
    }
}

/// Error returned by the data-access layer and the view state built on it.
#[derive(Debug, Error)]
pub enum DataError {
    /// The platform rejected or failed the request.
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// A lookup the view depends on found nothing.
    #[error("{what} not found: {key}")]
    NotFound { what: &'static str, key: String },

    /// Local validation failed before any request was issued.
    #[error("validation failed")]
    Validation(#[from] ValidationError),

    /// The action needs a signed-in viewer.
    #[error("sign in required")]
    Unauthenticated,

    /// Following yourself is never submitted.
    #[error("cannot follow yourself")]
    SelfFollow,
}

impl DataError {
    pub(crate) fn not_found(what: &'static str, key: impl Into<String>) -> Self {
        DataError::NotFound { what, key: key.into() }
    }

    /// Message suitable for showing to the user.
    ///
    /// Platform failures are deliberately generic: constraint violations,
    /// policy rejections and network errors all read the same.
    pub fn user_message(&self) -> String {
        match self {
            DataError::Platform(PlatformError::InvalidCredentials) => "Invalid email or password.".to_string(),
            DataError::Platform(_) => "Something went wrong. Please try again.".to_string(),
            DataError::NotFound { what, .. } => format!("That {what} could not be found."),
            DataError::Validation(err) => err
                .issues
                .first()
                .map(|issue| issue.message.clone())
                .unwrap_or_else(|| "Please check your input.".to_string()),
            DataError::Unauthenticated => "Please sign in to continue.".to_string(),
            DataError::SelfFollow => "You cannot follow yourself.".to_string(),
        }
    }
}

/// Collection of validation issues encountered while preparing a request.
#[derive(Debug, Error)]
#[error("validation errors: {issues:?}")]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn new<I>(issues: I) -> Self
    where
        I: IntoIterator<Item = ValidationIssue>,
    {
        Self {
            issues: issues.into_iter().collect(),
        }
    }

    /// Convenience helper for constructing a single-field validation error.
    pub fn single(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new([ValidationIssue::new(field, code, message)])
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Returns `Ok(())` when no issues were collected.
    pub fn into_result(self) -> ValidationResult<()> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

/// Detailed validation failure for a single field.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

pub type ValidationResult<T> = Result<T, ValidationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_failures_share_a_generic_message() {
        let unique = DataError::from(PlatformError::UniqueViolation {
            table: "likes".to_string(),
            columns: vec!["post_id".to_string(), "user_id".to_string()],
        });
        let injected = DataError::from(PlatformError::Injected {
            table: "likes".to_string(),
            operation: "insert",
        });
        assert_eq!(unique.user_message(), injected.user_message());
    }

    #[test]
    fn validation_message_uses_first_issue() {
        let err = DataError::from(ValidationError::single("caption", "validation.length", "Caption is too long."));
        assert_eq!(err.user_message(), "Caption is too long.");
    }

    #[test]
    fn no_rows_code_is_stable() {
        let err = PlatformError::NoRows {
            table: "profiles".to_string(),
        };
        assert_eq!(err.code(), "PGRST116");
        assert!(err.is_no_rows());
    }
}
