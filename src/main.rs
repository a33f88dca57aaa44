use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use folderlink::ingest::{
    DirectoryWalker, FileHandle, FolderUploader, HttpFolderClient, LocalDirectory, Store,
};
use folderlink::Config;
use serde::Serialize;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "folderlink", version, about = "Upload local folders to a chat assistant")]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the files an upload would send, without uploading
    Scan { dir: String },

    /// Upload a folder and attach it to a conversation
    Upload {
        dir: String,
        #[arg(long)]
        agent: String,
        /// Existing conversation; a new one is created when omitted
        #[arg(long)]
        conversation: Option<String>,
    },

    /// Attach an existing file or folder to a conversation
    Associate {
        item: String,
        #[arg(long)]
        agent: String,
        #[arg(long)]
        conversation: Option<String>,
    },

    /// Detach a file or folder from a conversation
    Deassociate {
        item: String,
        #[arg(long)]
        agent: String,
        #[arg(long)]
        conversation: Option<String>,
    },

    /// Show every file and folder with its association state
    Items {
        #[arg(long)]
        conversation: Option<String>,
    },

    /// List the files inside an uploaded folder
    Files { folder: String },

    /// Delete one file from an uploaded folder
    DeleteFile { folder: String, file: String },
}

#[derive(Serialize)]
struct ScanEntry<'a> {
    path: &'a str,
    name: &'a str,
    mime_type: &'static str,
    size: u64,
}

#[derive(Serialize)]
struct UploadSummary {
    conversation_id: Option<String>,
    file_ids: Vec<String>,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "folderlink=debug"
    } else {
        "folderlink=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load(cli.config.as_deref())?;
    let walker = DirectoryWalker::new(config.ingest.walk_options()?);

    let api = Arc::new(HttpFolderClient::new(&config.api)?);
    let store = Arc::new(Store::new());
    let uploader = FolderUploader::new(api, Arc::clone(&store), walker.clone());

    match cli.command {
        Commands::Scan { dir } => {
            let root = LocalDirectory::open(&dir)
                .await
                .with_context(|| format!("Failed to open {dir}"))?;
            let entries = walker.walk(&root).await?;
            let listing: Vec<_> = entries
                .iter()
                .map(|e| ScanEntry {
                    path: &e.relative_path,
                    name: &e.original_name,
                    mime_type: e.mime_type.as_str(),
                    size: e.blob.size(),
                })
                .collect();
            print_json(&listing)?;
        }
        Commands::Upload {
            dir,
            agent,
            conversation,
        } => {
            let root = LocalDirectory::open(&dir)
                .await
                .with_context(|| format!("Failed to open {dir}"))?;
            let file_ids = uploader
                .upload_folder(Arc::new(root), &agent, conversation.as_deref())
                .await?;
            print_json(&UploadSummary {
                conversation_id: conversation
                    .filter(|c| !c.is_empty())
                    .or(store.conversation().id),
                file_ids,
            })?;
        }
        Commands::Associate {
            item,
            agent,
            conversation,
        } => {
            uploader
                .associate_item(&item, conversation.as_deref(), &agent)
                .await?;
            print_json(&store.conversation().associable_items)?;
        }
        Commands::Deassociate {
            item,
            agent,
            conversation,
        } => {
            uploader
                .deassociate_item(&item, conversation.as_deref(), &agent)
                .await?;
            print_json(&store.conversation().associable_items)?;
        }
        Commands::Items { conversation } => {
            uploader
                .refresh_associable_items(conversation.as_deref())
                .await?;
            print_json(&store.conversation().associable_items)?;
        }
        Commands::Files { folder } => {
            print_json(&uploader.list_folder_files(&folder).await?)?;
        }
        Commands::DeleteFile { folder, file } => {
            uploader.delete_folder_file(&folder, &file).await?;
            tracing::info!(folder_id = %folder, file_id = %file, "Deleted");
        }
    }

    Ok(())
}
