//! Errors produced by the storage backends.
//!
//! Every variant carries an [`ErrorContext`] so a log line can say which
//! operation on which record failed. Only connection failures and
//! serialization conflicts are worth retrying.

use std::fmt;

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Where an error happened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// Repository operation, e.g. `"apply_visit_update"`.
    pub operation: Option<String>,
    /// `"schedule"` or `"task"`.
    pub entity: Option<String>,
    pub entity_id: Option<String>,
    pub details: Option<String>,
    pub retryable: bool,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: Some(operation.into()),
            ..Default::default()
        }
    }

    pub fn with_entity(mut self, entity: impl Into<String>, id: impl ToString) -> Self {
        self.entity = Some(entity.into());
        self.entity_id = Some(id.to_string());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }

    fn is_empty(&self) -> bool {
        self.operation.is_none()
            && self.entity.is_none()
            && self.details.is_none()
            && !self.retryable
    }
}

/// Renders as ` [op=..., schedule=42, ...]`, or nothing when empty.
impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        let mut parts = Vec::new();
        if let Some(op) = &self.operation {
            parts.push(format!("op={}", op));
        }
        if let Some(entity) = &self.entity {
            let id = self.entity_id.as_deref().unwrap_or("?");
            parts.push(format!("{}={}", entity, id));
        }
        if let Some(details) = &self.details {
            parts.push(details.clone());
        }
        if self.retryable {
            parts.push("retryable".to_string());
        }
        write!(f, " [{}]", parts.join(", "))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Store unreachable or pool exhausted.
    #[error("connection error: {message}{context}")]
    Connection {
        message: String,
        context: ErrorContext,
    },

    #[error("query error: {message}{context}")]
    Query {
        message: String,
        context: ErrorContext,
    },

    #[error("{message}{context}")]
    NotFound {
        message: String,
        context: ErrorContext,
    },

    /// Input rejected before it was written.
    #[error("invalid data: {message}{context}")]
    Validation {
        message: String,
        context: ErrorContext,
    },

    #[error("configuration error: {message}{context}")]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    /// Corrupt rows, failed migrations, join errors.
    #[error("internal error: {message}{context}")]
    Internal {
        message: String,
        context: ErrorContext,
    },
}

impl RepositoryError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            context: ErrorContext::default().retryable(),
        }
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// `schedule 42 not found`
    pub fn missing(entity: &str, id: impl ToString) -> Self {
        let id = id.to_string();
        Self::NotFound {
            message: format!("{} {} not found", entity, id),
            context: ErrorContext::default().with_entity(entity, id),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Replace the context. A connection error stays retryable.
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        let keep_retryable = matches!(self, Self::Connection { .. });
        let slot = self.context_mut();
        *slot = context;
        if keep_retryable {
            slot.retryable = true;
        }
        self
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context_mut().operation = Some(operation.into());
        self
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection { .. } => true,
            Self::Query { context, .. } => context.retryable,
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::Connection { context, .. }
            | Self::Query { context, .. }
            | Self::NotFound { context, .. }
            | Self::Validation { context, .. }
            | Self::Configuration { context, .. }
            | Self::Internal { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::Connection { context, .. }
            | Self::Query { context, .. }
            | Self::NotFound { context, .. }
            | Self::Validation { context, .. }
            | Self::Configuration { context, .. }
            | Self::Internal { context, .. } => context,
        }
    }
}

#[cfg(feature = "postgres-repo")]
impl From<diesel::result::Error> for RepositoryError {
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error};

        match err {
            // Callers that expect a row use `.optional()` and report `missing`.
            Error::NotFound => RepositoryError::internal("row vanished during query"),
            Error::DatabaseError(kind, info) => {
                let context = ErrorContext::default().with_details(format!("kind={:?}", kind));
                match kind {
                    DatabaseErrorKind::CheckViolation
                    | DatabaseErrorKind::NotNullViolation
                    | DatabaseErrorKind::ForeignKeyViolation => RepositoryError::Validation {
                        message: info.message().to_string(),
                        context,
                    },
                    DatabaseErrorKind::SerializationFailure => RepositoryError::Query {
                        message: info.message().to_string(),
                        context: context.retryable(),
                    },
                    _ => RepositoryError::Query {
                        message: info.message().to_string(),
                        context,
                    },
                }
            }
            Error::DeserializationError(e) => {
                RepositoryError::internal(format!("cannot decode row: {}", e))
            }
            other => RepositoryError::query(other.to_string()),
        }
    }
}

#[cfg(feature = "postgres-repo")]
impl From<diesel::r2d2::PoolError> for RepositoryError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        RepositoryError::connection(err.to_string()).with_context(ErrorContext::new("checkout"))
    }
}
