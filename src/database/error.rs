use potion::{Error, HtmlError};
use thiserror::Error;

/// Formats a `sqlx` failure into a message that is safe to surface.
pub struct QueryError {
    info: String,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self { info }
    }

    pub fn info(&self) -> &str {
        &self.info
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Configuration(e) => Self::new(format!("{e}")),
            sqlx::Error::Database(e) => Self::new(format!("{e}")),
            sqlx::Error::Io(e) => Self::new(format!("{e}")),
            sqlx::Error::Tls(e) => Self::new(format!("{e}")),
            sqlx::Error::Protocol(e) => Self::new(format!("{e}")),
            sqlx::Error::RowNotFound => Self::new(format!("RowNotFound")),
            sqlx::Error::TypeNotFound { type_name } => {
                Self::new(format!("Type not found: {type_name}"))
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => {
                Self::new(format!("Column index out of bounds {index} ({len})"))
            }
            sqlx::Error::ColumnNotFound(e) => Self::new(format!("{e}")),
            sqlx::Error::ColumnDecode { index, source } => {
                Self::new(format!("Column decode {index} ({source})"))
            }
            sqlx::Error::Decode(e) => Self::new(format!("{e}")),
            sqlx::Error::PoolTimedOut => Self::new(format!("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(format!("Pool closed")),
            sqlx::Error::WorkerCrashed => Self::new(format!("Worker crashed")),
            sqlx::Error::Migrate(e) => Self::new(format!("{e}")),
            _ => Self::new(format!("Unknown error")),
        }
    }
}

pub struct CacheError {
    info: String,
}

impl CacheError {
    pub fn new(info: String) -> Self {
        Self { info }
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(value: redis::RedisError) -> Self {
        Self {
            info: format!("{:?} - {:?}", value.code(), value.detail()),
        }
    }
}

/// Every failure an SDK operation can report to its caller.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Invalid `{field}`: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("{0}")]
    PermissionDenied(String),

    #[error("{0}")]
    InvalidOperation(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("Storage failure: {0}")]
    Storage(String),

    #[error("Cache failure: {0}")]
    Cache(String),

    #[error("Internal failure: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn validation(field: &'static str, message: &str) -> Self {
        Self::Validation {
            field,
            message: message.to_string(),
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::Validation { .. } => 400,
            ServiceError::InvalidOperation(_) => 400,
            ServiceError::Unauthenticated(_) => 401,
            ServiceError::PermissionDenied(_) => 403,
            ServiceError::NotFound(_) => 404,
            ServiceError::AlreadyExists(_) => 409,
            ServiceError::Storage(_) | ServiceError::Cache(_) | ServiceError::Internal(_) => 500,
        }
    }
}

// Constraint violations are domain errors; the raw driver message stays internal.
impl From<sqlx::Error> for ServiceError {
    fn from(value: sqlx::Error) -> Self {
        if let sqlx::Error::Database(e) = &value {
            if e.is_unique_violation() {
                return ServiceError::AlreadyExists(format!(
                    "Record already exists ({})",
                    e.constraint().unwrap_or("unique")
                ));
            }
            if e.is_foreign_key_violation() {
                return ServiceError::NotFound(format!(
                    "Referenced record doesn't exist ({})",
                    e.constraint().unwrap_or("foreign key")
                ));
            }
        }
        if let sqlx::Error::RowNotFound = value {
            return ServiceError::NotFound(String::from("Record doesn't exist"));
        }

        let query_error = QueryError::from(value);
        log::error!("Query failed: {}", query_error.info());
        ServiceError::Storage(query_error.info)
    }
}

impl From<QueryError> for ServiceError {
    fn from(value: QueryError) -> Self {
        ServiceError::Storage(value.info)
    }
}

impl From<CacheError> for ServiceError {
    fn from(value: CacheError) -> Self {
        ServiceError::Cache(value.info)
    }
}

impl From<redis::RedisError> for ServiceError {
    fn from(value: redis::RedisError) -> Self {
        CacheError::from(value).into()
    }
}

impl From<ServiceError> for Error {
    fn from(value: ServiceError) -> Self {
        match value {
            ServiceError::Validation { .. } | ServiceError::InvalidOperation(_) => {
                HtmlError::InvalidRequest.new(&value.to_string())
            }
            ServiceError::Unauthenticated(_) => HtmlError::InvalidSession.new(&value.to_string()),
            ServiceError::PermissionDenied(_) => HtmlError::Unauthorized.new(&value.to_string()),
            _ => {
                let code = match &value {
                    ServiceError::NotFound(_) => 404,
                    ServiceError::AlreadyExists(_) => 409,
                    _ => 500,
                };

                Error {
                    code,
                    info: Some(value.to_string()),
                    redirect: None,
                }
            }
        }
    }
}

impl warp::reject::Reject for ServiceError {}
