use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use playtally::{Gateway, config::Config};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[command(name = "playtally", about = "Inspect the play and vote store of the media bot")]
struct Cli {
    /// Database file; overrides PLAYTALLY_DATABASE_PATH.
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Open the store, creating the schema if the file does not exist yet.
    Init,
    /// Show play count and vote tallies for a user.
    Stats {
        user_id: String,
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let cfg = Config::load()?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let path = cli.database.unwrap_or_else(|| cfg.database_path.clone());
    info!(database_path = %path.display(), loglevel = %cfg.loglevel);

    let gateway = Gateway::with_options(&path, cfg.gateway_options())?;

    match cli.command {
        Command::Init => {
            gateway.ready().await?;
            info!(path = %path.display(), "vote store ready");
        }
        Command::Stats { user_id, json } => {
            let stats = gateway.user_stats(&user_id).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("user:     {}", stats.user_id);
                println!("plays:    {}", stats.plays);
                println!(
                    "received: +{} / -{} (score {})",
                    stats.incoming.positive,
                    stats.incoming.negative,
                    stats.incoming.score()
                );
                println!(
                    "cast:     +{} / -{}",
                    stats.outgoing.positive, stats.outgoing.negative
                );
            }
        }
    }

    gateway.close().await?;
    Ok(())
}
