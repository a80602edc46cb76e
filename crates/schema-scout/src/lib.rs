//! Point schema-scout at a PostgreSQL database and it will discover the
//! schema from catalog metadata, rank tables against a natural-language
//! question, and run SQL against a single managed session.
//!
//! ```rust,no_run
//! use schema_scout::core::session::SessionConfig;
//! use schema_scout::{ConnectionState, ScoutService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let state = ConnectionState::new(SessionConfig::default());
//!     if !state.set_connection("postgres://localhost/app").await {
//!         return Err("database connection failed".into());
//!     }
//!
//!     let service = ScoutService::new(state.clone());
//!     let tables = service.rank_tables("which customers ordered last week", 3).await?;
//!     println!("{tables:?}");
//!
//!     state.close_connection().await;
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod error;
pub mod logging;
pub mod retrieval;
pub mod service;

pub use crate::core::state::ConnectionState;
pub use crate::core::types::{QueryResult, TableColumns, TableDefinition};
pub use crate::error::{AppError, AppResult};
pub use crate::retrieval::{Embedder, RelevanceIndex};
pub use crate::service::{ScoutService, SqlGenerator};
