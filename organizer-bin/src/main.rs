use std::io::{self, Read, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use organizer_core::{
    auth::{AnonymousIdentity, Identity, StaticIdentity},
    client::Organizer,
    config::Config,
    history::{HistoryStore, MemoryHistory, rest::RestHistory},
    http_client::HttpClient,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Turn free-form notes into a structured app spec", long_about = None)]
struct Cli {
    /// Path to a JSON or TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Stamp saved history records with this user id
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Organize a prompt (reads stdin when INPUT is omitted), printing
    /// deltas as they stream in
    Organize {
        input: Option<String>,
        /// Do not save the result to history
        #[arg(long)]
        no_save: bool,
    },
    /// List recent organize runs, newest first
    History,
    /// Delete one history record by id
    Delete { id: String },
}

fn load_config(path: &Option<PathBuf>) -> anyhow::Result<Config> {
    let path = path
        .clone()
        .or_else(|| std::env::var("ORGANIZER_CONFIG").ok().map(PathBuf::from))
        .ok_or_else(|| anyhow::anyhow!("pass --config or set ORGANIZER_CONFIG"))?;
    Ok(Config::from_path(path)?)
}

fn history_store(cfg: &Config) -> anyhow::Result<Box<dyn HistoryStore>> {
    match &cfg.history {
        Some(hcfg) => {
            let http = HttpClient::new(&cfg.http)?;
            Ok(Box::new(RestHistory::from_config(http, hcfg)?))
        }
        None => Ok(Box::new(MemoryHistory::new())),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    let identity: Box<dyn Identity> = match &cli.user {
        Some(user) => Box::new(StaticIdentity::new(user.clone())),
        None => Box::new(AnonymousIdentity),
    };

    match cli.command {
        Commands::Organize { input, no_save } => {
            let input = match input {
                Some(text) => text,
                None => {
                    let mut buf = String::new();
                    io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };

            let client = Organizer::from_config(&cfg)?;
            // Each published partial is the full accumulated text; print
            // only the new suffix so deltas appear live.
            let mut printed = 0usize;
            let output = client
                .run_with(&input, |partial| {
                    print!("{}", &partial[printed..]);
                    io::stdout().flush().ok();
                    printed = partial.len();
                })
                .await?;
            println!();

            if !no_save && !output.is_empty() {
                let store = history_store(&cfg)?;
                let user = identity.current_user().await?;
                let saved = store.save(&input, &output, user.as_deref()).await?;
                eprintln!("[saved as {}]", saved.id);
            }
        }
        Commands::History => {
            let store = history_store(&cfg)?;
            for rec in store.recent().await? {
                let preview: String = rec.input.chars().take(50).collect();
                println!("{}\t{}\t{}", rec.id, rec.created_at, preview);
            }
        }
        Commands::Delete { id } => {
            let store = history_store(&cfg)?;
            store.delete(&id).await?;
            eprintln!("[deleted {id}]");
        }
    }

    Ok(())
}
