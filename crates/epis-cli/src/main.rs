//! EPIS CLI - Command-line interface
//!
//! Usage:
//!   epis classify <question>
//!   epis ask <question>
//!   epis ticket <description>
//!   epis init-db

use anyhow::Context;
use clap::{Parser, Subcommand};
use epis_core::{
    normalize_description, AnswerGenerator, AppConfig, Messages, SqliteTicketStore,
    TicketRepository, TicketStatus, TICKET_SENTINEL,
};
use epis_rag::{create_answer_generator, IntentClassifier, RequestHandler};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "epis")]
#[command(about = "EPIS support assistant CLI")]
#[command(version)]
struct Cli {
    /// TOML configuration file; environment variables override it
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the intent a question is routed to
    Classify {
        /// Question to classify
        question: String,
    },
    /// Answer a question with the configured services
    Ask {
        /// Question to ask
        question: String,
    },
    /// Create a support ticket
    Ticket {
        /// Problem description
        description: String,
    },
    /// Create the ticket table if it does not exist
    InitDb,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.clone()).context("failed to load configuration")?;
    init_tracing(&config);
    tracing::debug!(config_file = ?cli.config, locale = ?config.locale, "Configuration loaded");

    match cli.command {
        Commands::Classify { question } => {
            if question.starts_with(TICKET_SENTINEL) {
                println!("create_ticket");
            } else {
                let classifier = IntentClassifier::from_config(&config.router);
                println!("{}", classifier.classify(&question));
            }
        }
        Commands::Ask { question } => {
            let handler = build_handler(&config).await?;
            let answer = handler.handle(&question).await;
            println!("{}", serde_json::to_string_pretty(&answer)?);
        }
        Commands::Ticket { description } => {
            let store = open_store(&config).await?;
            let messages = Messages::for_locale(config.locale);
            let description = normalize_description(&description, messages.ticket_placeholder);
            let ticket = store.create(&description, TicketStatus::Open).await?;
            println!("{}", messages.ticket_created(ticket.id, &ticket.description));
        }
        Commands::InitDb => {
            let store = open_store(&config).await?;
            println!(
                "Ticket table ready at {} ({} tickets)",
                config.database.sqlite_url,
                store.count().await?
            );
        }
    }

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    // Logs go to stderr so command output stays pipeable
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "epis={0},epis_rag={0},epis_vector={0},epis_core={0}",
            config.logging.level
        ))
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_file(config.logging.include_location)
        .with_line_number(config.logging.include_location);

    if config.logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn open_store(config: &AppConfig) -> anyhow::Result<SqliteTicketStore> {
    SqliteTicketStore::connect(&config.database.sqlite_url, config.database.sqlite_pool_size)
        .await
        .with_context(|| format!("failed to open ticket database {}", config.database.sqlite_url))
}

async fn build_handler(config: &AppConfig) -> anyhow::Result<RequestHandler> {
    let tickets = Arc::new(open_store(config).await?);
    let retriever = epis_vector::create_retriever(config)?;
    let generator: Arc<dyn AnswerGenerator> = Arc::from(create_answer_generator(&config.llm)?);

    Ok(RequestHandler::from_config(config, retriever, generator, tickets))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask() {
        let cli = Cli::try_parse_from(["epis", "ask", "my printer is broken"]).unwrap();
        assert!(cli.config.is_none());
        assert!(matches!(
            cli.command,
            Commands::Ask { question } if question == "my printer is broken"
        ));
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["epis", "init-db", "--config", "epis.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("epis.toml")));
        assert!(matches!(cli.command, Commands::InitDb));
    }

    #[test]
    fn test_question_is_required() {
        assert!(Cli::try_parse_from(["epis", "classify"]).is_err());
    }
}
