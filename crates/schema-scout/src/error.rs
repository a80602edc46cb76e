use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    #[error("no active database connection")]
    NoActiveConnection,

    #[error("sql error: {0}")]
    Sql(String),

    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("no tables in the schema matched the request")]
    NoRelevantTables,

    #[error("no sql generator is configured")]
    MissingGenerator,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Sql(e.to_string())
    }
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ConnectionFailed(_) => "CONNECTION_FAILED",
            AppError::NoActiveConnection => "NO_ACTIVE_CONNECTION",
            AppError::Sql(_) => "SQL_ERROR",
            AppError::UnknownTable(_) => "UNKNOWN_TABLE",
            AppError::NoRelevantTables => "NO_RELEVANT_TABLES",
            AppError::MissingGenerator => "MISSING_GENERATOR",
            AppError::InvalidRequest(_) => "INVALID_REQUEST",
            AppError::Json(_) => "JSON_ERROR",
            AppError::Internal(_) => "INTERNAL",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
