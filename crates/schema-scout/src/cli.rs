use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "schema-scout")]
#[command(about = "Discover a PostgreSQL schema and find the tables relevant to a question")]
pub struct Args {
    /// Database connection url.
    #[arg(long, env = "DATABASE_URL")]
    pub url: String,

    /// Logging level (stderr). Also supports RUST_LOG.
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Statement timeout applied to the session, in milliseconds. 0 disables it.
    #[arg(long, default_value_t = 30_000)]
    pub statement_timeout_ms: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List user tables in catalog order
    Tables,

    /// Print CREATE TABLE definitions reconstructed from the catalog
    Schema {
        /// Restrict output to one table.
        table: Option<String>,
    },

    /// List every table with its column names
    Columns,

    /// Find tables related to the given tables through foreign keys
    Related {
        #[arg(required = true)]
        tables: Vec<String>,

        /// Cap per table and direction.
        #[arg(long, default_value_t = 2)]
        max_per_table: usize,
    },

    /// Rank tables by relevance to a natural-language question
    Rank {
        question: String,

        #[arg(long, default_value_t = 3)]
        top_n: usize,
    },

    /// Execute a sql statement and print the rows as json
    Run { sql: String },
}
