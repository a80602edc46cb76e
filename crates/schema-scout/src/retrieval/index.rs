use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::retrieval::embedder::Embedder;

struct RelevanceRecord {
    name: String,
    definition: String,
    embedding: Option<Vec<f32>>,
}

/// In-memory map from table name to definition text and optional embedding,
/// used to answer "which tables are relevant to this query".
///
/// Built fresh per request scope from the current schema snapshot; names are
/// unique, and entries keep their insertion order (which lexical ranking
/// exposes). Not persisted anywhere.
pub struct RelevanceIndex {
    embedder: Option<Arc<dyn Embedder>>,
    entries: Vec<RelevanceRecord>,
}

impl RelevanceIndex {
    pub fn new(embedder: Option<Arc<dyn Embedder>>) -> Self {
        Self {
            embedder,
            entries: Vec::new(),
        }
    }

    /// Stores a table's definition text and, when an embedder is configured,
    /// its vector. Re-adding a name overwrites in place, keeping its original
    /// insertion position.
    pub fn add_table(&mut self, name: &str, definition: &str) -> AppResult<()> {
        let embedding = match &self.embedder {
            Some(embedder) => Some(embedder.embed(definition)?),
            None => None,
        };
        match self.entries.iter_mut().find(|r| r.name == name) {
            Some(record) => {
                record.definition = definition.to_string();
                record.embedding = embedding;
            }
            None => self.entries.push(RelevanceRecord {
                name: name.to_string(),
                definition: definition.to_string(),
                embedding,
            }),
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Up to `top_n` table names by descending cosine similarity between the
    /// query's embedding and the stored vectors. With no embedder configured
    /// this returns an empty list; that is the documented degraded mode, not
    /// an error. `top_n` is a cap, not a similarity threshold.
    pub fn rank_by_embedding(&self, query: &str, top_n: usize) -> AppResult<Vec<String>> {
        let Some(embedder) = &self.embedder else {
            return Ok(Vec::new());
        };
        let query_embedding = embedder.embed(query)?;

        let mut scored: Vec<(f32, &str)> = self
            .entries
            .iter()
            .filter_map(|r| {
                r.embedding
                    .as_ref()
                    .map(|v| (cosine_similarity(&query_embedding, v), r.name.as_str()))
            })
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(top_n)
            .map(|(_, name)| name.to_string())
            .collect())
    }

    /// Every stored table name that appears, case-insensitively, as a
    /// substring of the query text. Order follows index insertion order, not
    /// any relevance score.
    pub fn rank_by_lexical_match(&self, query: &str) -> Vec<String> {
        let query = query.to_lowercase();
        self.entries
            .iter()
            .filter(|r| query.contains(&r.name.to_lowercase()))
            .map(|r| r.name.clone())
            .collect()
    }

    /// Embedding results followed by lexical results, de-duplicated while
    /// preserving first occurrence. Embedding hits win position when both
    /// methods fire for a table; lexical matches survive even when embeddings
    /// are unavailable. The output order is part of the contract:
    /// `definitions_for` consumes it when building prompt context.
    pub fn rank(&self, query: &str, top_n: usize) -> AppResult<Vec<String>> {
        let mut merged = self.rank_by_embedding(query, top_n)?;
        merged.extend(self.rank_by_lexical_match(query));

        let mut seen = HashSet::new();
        merged.retain(|name| seen.insert(name.clone()));
        Ok(merged)
    }

    /// Joins the stored definitions of `names`, in the given order, with a
    /// blank line between them. A name absent from the index is a contract
    /// violation: names must come from this index's own `rank` output.
    pub fn definitions_for(&self, names: &[String]) -> AppResult<String> {
        let mut definitions = Vec::with_capacity(names.len());
        for name in names {
            let record = self
                .entries
                .iter()
                .find(|r| r.name == *name)
                .ok_or_else(|| AppError::UnknownTable(name.clone()))?;
            definitions.push(record.definition.as_str());
        }
        Ok(definitions.join("\n\n"))
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
