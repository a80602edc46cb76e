use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::core::session::SessionHandle;
use crate::core::state::ConnectionState;
use crate::core::types::{QueryResult, TableColumns, TableDefinition};
use crate::error::{AppError, AppResult};
use crate::retrieval::{Embedder, RelevanceIndex};

/// How many embedding-ranked tables feed the prompt context.
pub const DEFAULT_SIMILAR_TABLES: usize = 2;

/// Turns a natural-language prompt plus table definitions into SQL text.
///
/// The language-model call lives behind this trait; the service never
/// interprets the generated text beyond executing it.
#[async_trait]
pub trait SqlGenerator: Send + Sync {
    async fn generate_sql(&self, prompt: &str, table_context: &str) -> AppResult<String>;
}

/// Product of the generate-and-run pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct PromptOutcome {
    pub prompt: String,
    pub table_context: String,
    pub sql: String,
    pub result: QueryResult,
}

/// Facade over the connection state, schema introspection, relevance ranking
/// and query execution. One instance serves all callers; the session itself
/// is request-scoped state fetched per operation.
#[derive(Clone)]
pub struct ScoutService {
    state: ConnectionState,
    embedder: Option<Arc<dyn Embedder>>,
    generator: Option<Arc<dyn SqlGenerator>>,
}

impl ScoutService {
    pub fn new(state: ConnectionState) -> Self {
        Self {
            state,
            embedder: None,
            generator: None,
        }
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_generator(mut self, generator: Arc<dyn SqlGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    fn session(&self) -> AppResult<SessionHandle> {
        self.state.get_connection().ok_or(AppError::NoActiveConnection)
    }

    /// Opens a session against `url` and returns the fresh schema summary.
    pub async fn connect(&self, url: &str) -> AppResult<Vec<TableColumns>> {
        if !self.state.set_connection(url).await {
            return Err(AppError::ConnectionFailed(
                "could not open a session with the provided url".into(),
            ));
        }
        self.session()?.tables_and_columns().await
    }

    /// Closes the active session; an error when nothing is open.
    pub async fn close(&self) -> AppResult<()> {
        if self.state.get_connection().is_none() {
            return Err(AppError::NoActiveConnection);
        }
        self.state.close_connection().await;
        Ok(())
    }

    pub async fn list_tables(&self) -> AppResult<Vec<String>> {
        self.session()?.tables().await
    }

    pub async fn describe_table(&self, table: &str) -> AppResult<TableDefinition> {
        self.session()?.describe(table.to_string()).await
    }

    pub async fn describe_all(&self) -> AppResult<Vec<TableDefinition>> {
        self.session()?.describe_all().await
    }

    pub async fn tables_and_columns(&self) -> AppResult<Vec<TableColumns>> {
        self.session()?.tables_and_columns().await
    }

    /// Foreign-key neighbors of the given tables, sorted here so output is
    /// deterministic even though the introspector returns an unordered set.
    pub async fn related_tables(
        &self,
        tables: &[String],
        max_per_table: usize,
    ) -> AppResult<Vec<String>> {
        let related = self
            .session()?
            .related_tables(tables.to_vec(), max_per_table)
            .await?;
        let mut sorted: Vec<String> = related.into_iter().collect();
        sorted.sort();
        Ok(sorted)
    }

    pub async fn run_sql(&self, sql: &str) -> AppResult<QueryResult> {
        self.session()?.query(sql.to_string()).await
    }

    /// Ranks tables against a free-text question using the hybrid strategy.
    pub async fn rank_tables(&self, question: &str, top_n: usize) -> AppResult<Vec<String>> {
        let index = self.build_index().await?;
        index.rank(question, top_n)
    }

    /// The full pipeline: snapshot the schema, rank tables against the
    /// prompt, hand the matching definitions to the generator, execute the
    /// generated SQL, and return everything the caller needs to audit it.
    pub async fn generate_and_run(&self, prompt: &str) -> AppResult<PromptOutcome> {
        if prompt.trim().is_empty() {
            return Err(AppError::InvalidRequest("prompt must not be empty".into()));
        }
        let generator = self.generator.clone().ok_or(AppError::MissingGenerator)?;
        let session = self.session()?;

        let index = self.build_index().await?;
        let ranked = index.rank(prompt, DEFAULT_SIMILAR_TABLES)?;
        tracing::debug!(tables = ?ranked, "tables matched against the prompt");
        if ranked.is_empty() {
            return Err(AppError::NoRelevantTables);
        }

        let table_context = index.definitions_for(&ranked)?;
        let sql = generator.generate_sql(prompt, &table_context).await?;
        tracing::debug!(%sql, "generated sql");

        let result = session.query(sql.clone()).await?;
        Ok(PromptOutcome {
            prompt: prompt.to_string(),
            table_context,
            sql,
            result,
        })
    }

    /// Seeds a fresh relevance index from the current schema snapshot.
    async fn build_index(&self) -> AppResult<RelevanceIndex> {
        let definitions = self.describe_all().await?;
        let mut index = RelevanceIndex::new(self.embedder.clone());
        for definition in &definitions {
            index.add_table(&definition.name, &definition.create_table_text())?;
        }
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedGenerator;

    #[async_trait]
    impl SqlGenerator for FixedGenerator {
        async fn generate_sql(&self, _prompt: &str, _table_context: &str) -> AppResult<String> {
            Ok("SELECT 1 AS x".to_string())
        }
    }

    fn service() -> ScoutService {
        ScoutService::new(ConnectionState::default())
    }

    #[tokio::test]
    async fn operations_without_a_session_fail_with_no_active_connection() {
        let service = service().with_generator(Arc::new(FixedGenerator));

        assert!(matches!(service.close().await, Err(AppError::NoActiveConnection)));
        assert!(matches!(service.list_tables().await, Err(AppError::NoActiveConnection)));
        assert!(matches!(
            service.tables_and_columns().await,
            Err(AppError::NoActiveConnection)
        ));
        assert!(matches!(
            service.run_sql("SELECT 1").await,
            Err(AppError::NoActiveConnection)
        ));
        assert!(matches!(
            service.generate_and_run("show me all customers").await,
            Err(AppError::NoActiveConnection)
        ));
    }

    #[tokio::test]
    async fn connect_with_invalid_url_fails() {
        let err = service().connect("not-a-database-url").await.unwrap_err();
        assert!(matches!(err, AppError::ConnectionFailed(_)));
    }

    #[tokio::test]
    async fn generate_and_run_requires_a_generator() {
        let err = service().generate_and_run("show me all customers").await.unwrap_err();
        assert!(matches!(err, AppError::MissingGenerator));
    }

    #[tokio::test]
    async fn generate_and_run_rejects_an_empty_prompt() {
        let service = service().with_generator(Arc::new(FixedGenerator));
        let err = service.generate_and_run("   ").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }
}
