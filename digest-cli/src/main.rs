//! digest CLI: migrate the store, append or ingest messages, read/purge/count partitions.
//! Config from env (and `.env`); see `DigestConfig::load`.

use anyhow::{Context, Result};
use clap::Parser;
use digest_cli::{ingest_path, Cli, Commands};
use digest_core::{init_tracing, open_store, DigestConfig, StoreBackend};
use storage::{ChatMessage, MessageStore, SqliteMessageStore};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = DigestConfig::load().context("Load config from env")?;
    config.validate()?;
    init_tracing(&config.log_file)?;

    match cli.command {
        Commands::Migrate => handle_migrate(&config).await,
        command => {
            let store = open_store(&config).await?;
            let result = run(store.as_ref(), command).await;
            store.close().await?;
            result
        }
    }
}

async fn run(store: &dyn MessageStore, command: Commands) -> Result<()> {
    match command {
        // Opening the store already migrated it.
        Commands::Migrate => println!("Store ready"),
        Commands::Append {
            partition,
            message_id,
            user_id,
            username,
            text,
            timestamp,
        } => {
            let mut message = ChatMessage::new(
                partition.chat,
                message_id,
                user_id,
                username,
                text,
                timestamp.unwrap_or_else(|| chrono::Utc::now().timestamp()),
            );
            message.thread = partition.scope();
            store.append(&message).await?;
            println!("ok");
        }
        Commands::Ingest { path } => {
            let report = ingest_path(store, path.as_deref()).await?;
            println!(
                "Accepted: {}, Rejected: {}, Malformed: {}",
                report.accepted, report.rejected, report.malformed
            );
        }
        Commands::Read { partition, limit } => {
            match store.read_range(partition.chat, partition.scope(), limit).await? {
                Some(transcript) => {
                    print!("{}", transcript.content);
                    eprintln!(
                        "{} messages (watermark {})",
                        transcript.message_count, transcript.watermark
                    );
                }
                None => eprintln!("No messages"),
            }
        }
        Commands::Purge {
            partition,
            watermark,
        } => {
            match watermark {
                Some(watermark) => {
                    store
                        .delete_through(partition.chat, partition.scope(), watermark)
                        .await?
                }
                None => store.delete_range(partition.chat, partition.scope()).await?,
            }
            println!("ok");
        }
        Commands::Count { partition } => {
            println!("{}", store.count(partition.chat, partition.scope()).await?);
        }
    }
    Ok(())
}

/// Opening a SQLite store applies migrations; report where the schema ended up.
async fn handle_migrate(config: &DigestConfig) -> Result<()> {
    match config.backend {
        StoreBackend::Sqlite => {
            let store = SqliteMessageStore::open(config.store.clone()).await?;
            let version = store.schema_version().await?;
            store.close().await?;
            println!("Schema version: {}", version);
        }
        StoreBackend::File => {
            let store = open_store(config).await?;
            store.close().await?;
            println!("File backend has no schema; log directory ready");
        }
    }
    Ok(())
}
