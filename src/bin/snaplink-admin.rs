use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use snaplink::config::{Config, StorageBackend};
use snaplink::events::EventPublisher;
use snaplink::models::NewLink;
use snaplink::storage::{FileStorage, Storage};
use snaplink::LinkService;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "snaplink-admin")]
#[command(about = "Snaplink data file management CLI", long_about = None)]
#[command(after_help = "Operates on DATA_FILE directly; stop the server before creating links.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a link's record and click history as JSON
    Show {
        /// Short code
        code: String,
    },
    /// Create a short link
    Create {
        /// Absolute target URL
        url: String,
        /// Lifetime in minutes (default 30)
        #[arg(long)]
        validity: Option<i64>,
        /// Preferred short code (4-20 alphanumeric characters)
        #[arg(long)]
        code: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    if config.storage.backend != StorageBackend::File {
        bail!("snaplink-admin requires STORAGE_BACKEND=file");
    }

    let storage = FileStorage::new(&config.storage.data_file).await?;
    storage.init().await?;

    let service = LinkService::new(Arc::new(storage), EventPublisher::disabled())
        .with_code_length(config.short_code_length);

    match cli.command {
        Commands::Show { code } => {
            let stats = service
                .stats(&code)
                .await
                .with_context(|| format!("Failed to look up '{}'", code))?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Create {
            url,
            validity,
            code,
        } => {
            let created = service
                .create(NewLink {
                    url,
                    validity_minutes: validity,
                    preferred_code: code,
                })
                .await?;
            println!("✓ Created '{}' (expires {})", created.code, created.expiry);
        }
    }

    Ok(())
}
