use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clubhouse::{api, db};

#[derive(Parser)]
#[command(name = "clubd")]
#[command(about = "Club management portal service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the portal server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Path to the SQLite database (defaults to the user data directory)
        #[arg(long)]
        database: Option<std::path::PathBuf>,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "clubhouse=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn serve(port: u16, database: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let store = match database {
        Some(path) => db::Store::open(path)?,
        None => db::Store::open_default()?,
    };
    store.migrate()?;

    let app = api::create_router(store);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("Clubhouse server listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Some(Commands::Serve { port, database }) => serve(port, database).await?,
        None => serve(3000, None).await?,
    }

    Ok(())
}
