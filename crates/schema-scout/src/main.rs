mod cli;

use clap::Parser;
use serde::Serialize;

use schema_scout::core::session::SessionConfig;
use schema_scout::core::state::ConnectionState;
use schema_scout::error::{AppError, AppResult};
use schema_scout::logging;
use schema_scout::service::ScoutService;

fn main() -> AppResult<()> {
    let args = cli::Args::parse();
    logging::init(&args.log_level);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| AppError::Internal(e.to_string()))?;
    rt.block_on(run(args))
}

async fn run(args: cli::Args) -> AppResult<()> {
    let state = ConnectionState::new(SessionConfig {
        statement_timeout_ms: args.statement_timeout_ms,
    });
    let service = ScoutService::new(state.clone());

    if !state.set_connection(&args.url).await {
        return Err(AppError::ConnectionFailed(
            "could not open a session with the provided url".into(),
        ));
    }

    let result = dispatch(&service, args.command).await;

    // Close on every exit path before reporting the outcome.
    state.close_connection().await;

    match result {
        Ok(output) => {
            println!("{output}");
            Ok(())
        }
        Err(e) => {
            tracing::error!(code = e.code(), error = %e, "command failed");
            Err(e)
        }
    }
}

async fn dispatch(service: &ScoutService, command: cli::Command) -> AppResult<String> {
    match command {
        cli::Command::Tables => pretty(&service.list_tables().await?),
        cli::Command::Schema { table } => match table {
            Some(table) => Ok(service.describe_table(&table).await?.create_table_text()),
            None => {
                let definitions = service.describe_all().await?;
                Ok(definitions
                    .iter()
                    .map(|d| d.create_table_text())
                    .collect::<Vec<_>>()
                    .join("\n\n"))
            }
        },
        cli::Command::Columns => pretty(&service.tables_and_columns().await?),
        cli::Command::Related {
            tables,
            max_per_table,
        } => pretty(&service.related_tables(&tables, max_per_table).await?),
        cli::Command::Rank { question, top_n } => {
            pretty(&service.rank_tables(&question, top_n).await?)
        }
        cli::Command::Run { sql } => pretty(&service.run_sql(&sql).await?),
    }
}

fn pretty<T: Serialize>(value: &T) -> AppResult<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
