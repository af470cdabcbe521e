//! bibstore command line
//!
//! - `import`: load a record file into a new corpus
//! - `init-db`: create the schema
//! - `create-user`: add an account that can own corpora

use anyhow::Context;
use bibstore_common::auth::hash_password;
use bibstore_common::config::{AppConfig, ObservabilityConfig};
use bibstore_common::db::models::CorpusSource;
use bibstore_common::{DbPool, Repository, VERSION};
use bibstore_importer::{reader, CorpusHandler, ImportOptions, ImportSink, MemorySink, RecordFormat};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "bibstore", version, about = "bibstore corpus administration")]
struct Cli {
    /// Configuration file; defaults to config/{default,$APP_ENV,local}
    #[arg(long, env = "BIBSTORE_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a record file into a new corpus
    Import {
        path: PathBuf,
        label: String,
        /// Paper rows buffered before each write
        batch_size: Option<usize>,
        #[arg(long, value_enum, default_value_t = RecordFormat::Auto)]
        format: RecordFormat,
        /// JSTOR, WOS, ZOTERO or SCOPUS
        #[arg(long)]
        source: Option<String>,
        /// User id recorded as the creator of every row
        #[arg(long)]
        owner: Option<i32>,
        /// Build every row but keep them in memory
        #[arg(long)]
        dry_run: bool,
    },
    /// Create any missing tables
    InitDb,
    /// Create a user account
    CreateUser {
        username: String,
        email: String,
        #[arg(long, env = "BIBSTORE_PASSWORD")]
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = match cli.config.as_deref() {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::load(),
    }
    .context("Failed to load configuration")?;

    init_tracing(&config.observability);
    info!("bibstore v{}", VERSION);

    match cli.command {
        Command::Import {
            path,
            label,
            batch_size,
            format,
            source,
            owner,
            dry_run,
        } => {
            let source = source.unwrap_or_else(|| config.import.source.clone());
            let options = ImportOptions {
                label,
                source: source.parse::<CorpusSource>().map_err(anyhow::Error::msg)?,
                batch_size: batch_size.unwrap_or(config.import.batch_size),
                owner_id: owner.unwrap_or(config.import.owner_id),
            };
            let records = reader::open(&path, format)?;

            if dry_run {
                import(MemorySink::new(), options, records).await?;
            } else {
                let db = DbPool::new(&config.database).await?;
                import(Repository::new(db), options, records).await?;
            }
        }
        Command::InitDb => {
            let db = DbPool::new(&config.database).await?;
            db.create_schema().await?;
            info!("Schema ready");
        }
        Command::CreateUser {
            username,
            email,
            password,
        } => {
            let db = DbPool::new(&config.database).await?;
            let repo = Repository::new(db);
            let user = repo
                .create_user(&username, &email, hash_password(&password)?)
                .await?;
            info!(user_id = user.id, username = %user.username, "Created user");
            println!("{}", user.id);
        }
    }

    Ok(())
}

async fn import<S: ImportSink>(
    sink: S,
    options: ImportOptions,
    records: reader::Records,
) -> anyhow::Result<()> {
    let mut handler = CorpusHandler::new(sink, options).await?;
    let summary = handler.run(records).await?;
    info!(summary = %serde_json::to_string(&summary)?, "Import summary");
    Ok(())
}

/// Logs go to stderr so stdout only carries progress lines
fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}
