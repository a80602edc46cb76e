use std::collections::HashSet;

use sqlx::{Connection, Executor, PgConnection};
use tokio::sync::{mpsc, oneshot};

use crate::core::types::{QueryResult, TableColumns, TableDefinition};
use crate::core::{query, schema};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Applied via `SET statement_timeout` when the session opens; 0 disables it.
    pub statement_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            statement_timeout_ms: 30_000,
        }
    }
}

/// Handle to one live database session.
///
/// The `PgConnection` itself is owned by a spawned worker task; the handle is
/// a cheap clone that addresses it through a channel. Requests are served
/// strictly in order, so a close enqueued behind a running statement waits
/// for it. Once the session closes, every method fails; callers should treat
/// a handle as request-scoped and re-fetch it from `ConnectionState`.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<DbTask>,
    url: String,
}

impl SessionHandle {
    pub(crate) async fn open(url: &str, config: &SessionConfig) -> AppResult<Self> {
        let mut conn = PgConnection::connect(url)
            .await
            .map_err(|e| AppError::ConnectionFailed(e.to_string()))?;

        if config.statement_timeout_ms > 0 {
            // SET cannot take a bound parameter; the value is our own config.
            let set_timeout = format!("SET statement_timeout = {}", config.statement_timeout_ms);
            if let Err(e) = conn.execute(set_timeout.as_str()).await {
                tracing::warn!(error = %e, "could not apply statement timeout");
            }
        }

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(session_worker(conn, rx));
        Ok(Self {
            tx,
            url: url.to_string(),
        })
    }

    #[cfg(test)]
    pub(crate) fn from_parts(tx: mpsc::UnboundedSender<DbTask>, url: &str) -> Self {
        Self {
            tx,
            url: url.to_string(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn query(&self, sql: String) -> AppResult<QueryResult> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(DbTask::Query { sql, respond_to: tx })
            .map_err(|_| AppError::Internal("database session is closed".into()))?;
        rx.await
            .map_err(|_| AppError::Internal("session worker dropped response".into()))?
    }

    pub async fn tables(&self) -> AppResult<Vec<String>> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(DbTask::Tables { respond_to: tx })
            .map_err(|_| AppError::Internal("database session is closed".into()))?;
        rx.await
            .map_err(|_| AppError::Internal("session worker dropped response".into()))?
    }

    pub async fn describe(&self, table: String) -> AppResult<TableDefinition> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(DbTask::Describe { table, respond_to: tx })
            .map_err(|_| AppError::Internal("database session is closed".into()))?;
        rx.await
            .map_err(|_| AppError::Internal("session worker dropped response".into()))?
    }

    pub async fn describe_all(&self) -> AppResult<Vec<TableDefinition>> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(DbTask::DescribeAll { respond_to: tx })
            .map_err(|_| AppError::Internal("database session is closed".into()))?;
        rx.await
            .map_err(|_| AppError::Internal("session worker dropped response".into()))?
    }

    pub async fn tables_and_columns(&self) -> AppResult<Vec<TableColumns>> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(DbTask::TablesAndColumns { respond_to: tx })
            .map_err(|_| AppError::Internal("database session is closed".into()))?;
        rx.await
            .map_err(|_| AppError::Internal("session worker dropped response".into()))?
    }

    pub async fn related_tables(
        &self,
        tables: Vec<String>,
        max_per_table: usize,
    ) -> AppResult<HashSet<String>> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(DbTask::RelatedTables {
                tables,
                max_per_table,
                respond_to: tx,
            })
            .map_err(|_| AppError::Internal("database session is closed".into()))?;
        rx.await
            .map_err(|_| AppError::Internal("session worker dropped response".into()))?
    }

    /// Closes the underlying connection and waits for the worker to confirm.
    /// Safe to call on an already-closed session.
    pub async fn close(&self) {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(DbTask::Close { respond_to: tx }).is_ok() {
            let _ = rx.await;
        }
    }
}

pub(crate) enum DbTask {
    Query {
        sql: String,
        respond_to: oneshot::Sender<AppResult<QueryResult>>,
    },
    Tables {
        respond_to: oneshot::Sender<AppResult<Vec<String>>>,
    },
    Describe {
        table: String,
        respond_to: oneshot::Sender<AppResult<TableDefinition>>,
    },
    DescribeAll {
        respond_to: oneshot::Sender<AppResult<Vec<TableDefinition>>>,
    },
    TablesAndColumns {
        respond_to: oneshot::Sender<AppResult<Vec<TableColumns>>>,
    },
    RelatedTables {
        tables: Vec<String>,
        max_per_table: usize,
        respond_to: oneshot::Sender<AppResult<HashSet<String>>>,
    },
    Close {
        respond_to: oneshot::Sender<()>,
    },
}

async fn session_worker(mut conn: PgConnection, mut rx: mpsc::UnboundedReceiver<DbTask>) {
    while let Some(task) = rx.recv().await {
        match task {
            DbTask::Query { sql, respond_to } => {
                let res = query::run_query(&mut conn, &sql).await;
                if let Err(e) = &res {
                    tracing::error!(code = e.code(), error = %e, "query execution failed");
                }
                let _ = respond_to.send(res);
            }
            DbTask::Tables { respond_to } => {
                let res = schema::list_tables(&mut conn).await;
                let _ = respond_to.send(res);
            }
            DbTask::Describe { table, respond_to } => {
                let res = schema::describe_table(&mut conn, &table).await;
                let _ = respond_to.send(res);
            }
            DbTask::DescribeAll { respond_to } => {
                let res = schema::describe_all_tables(&mut conn).await;
                let _ = respond_to.send(res);
            }
            DbTask::TablesAndColumns { respond_to } => {
                let res = schema::list_columns_per_table(&mut conn).await;
                let _ = respond_to.send(res);
            }
            DbTask::RelatedTables {
                tables,
                max_per_table,
                respond_to,
            } => {
                let res = schema::related_tables(&mut conn, &tables, max_per_table).await;
                let _ = respond_to.send(res);
            }
            DbTask::Close { respond_to } => {
                if let Err(e) = conn.close().await {
                    tracing::warn!(error = %e, "error while closing database connection");
                }
                let _ = respond_to.send(());
                return;
            }
        }
    }

    // All handles dropped without an explicit close.
    if let Err(e) = conn.close().await {
        tracing::warn!(error = %e, "error while closing database connection");
    }
}
