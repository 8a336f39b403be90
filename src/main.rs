//! flipbook-rs server entry point.

use clap::Parser;
use flipbook_rs::{
    config::{Cli, Command, Config, MagazineCommand},
    db::Database,
    server,
};
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Find or load config
    let config_path = cli.config.clone().or_else(Config::find_config_file);

    let config = if let Some(ref path) = config_path {
        Config::load(path)?
    } else {
        Config::default()
    };

    // Handle command
    match cli.command {
        Some(Command::Init { force }) => cmd_init(force).await,
        Some(Command::Magazine { action }) => cmd_magazine(action, &config).await,
        Some(Command::Serve { bind, magazines }) => cmd_serve(config, bind, magazines).await,
        None => {
            // Default: start server
            cmd_serve(config, None, None).await
        }
    }
}

/// Initialize config and database.
async fn cmd_init(force: bool) -> anyhow::Result<()> {
    let config_path = PathBuf::from("config.toml");

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    // Write default config
    std::fs::write(&config_path, Config::generate_default())?;
    println!("Created config file: {}", config_path.display());

    // Initialize database
    let config = Config::default();
    if let Some(parent) = config.database.path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let _db = Database::open(&config.database.path)?;
    println!("Initialized database: {}", config.database.path.display());

    println!("\nEdit config.toml to configure your server.");
    println!("Drop magazine PDFs into the configured magazines_dir.");
    println!("Then run: flipbook-rs serve");

    Ok(())
}

/// Magazine management commands.
async fn cmd_magazine(action: MagazineCommand, config: &Config) -> anyhow::Result<()> {
    let db = Database::open(&config.database.path)?;

    match action {
        MagazineCommand::List => {
            let magazines = db.get_all_magazines()?;
            if magazines.is_empty() {
                println!("No magazines found.");
            } else {
                println!("{:<36} {:>6} {:>6} {:>6}  TITLE", "ID", "PAGES", "VIEWS", "DL");
                println!("{}", "-".repeat(80));
                for m in magazines {
                    println!(
                        "{:<36} {:>6} {:>6} {:>6}  {}",
                        m.id, m.total_pages, m.view_count, m.download_count, m.title
                    );
                }
            }
        }

        MagazineCommand::Del { id } => {
            if db.delete_magazine(&id)? {
                println!("Deleted magazine: {}", id);
            } else {
                println!("Magazine not found: {}", id);
            }
        }

        MagazineCommand::Scan => {
            let state = server::AppState::new_with_db(config.clone(), db);
            println!(
                "Scanning magazines in: {}",
                config.library.magazines_dir.display()
            );
            state.scan_library()?;
            println!("Scan complete: {} magazines.", state.magazine_count());
        }
    }

    Ok(())
}

/// Start the server.
async fn cmd_serve(
    mut config: Config,
    bind: Option<std::net::SocketAddr>,
    magazines: Option<PathBuf>,
) -> anyhow::Result<()> {
    // Apply CLI overrides
    if let Some(addr) = bind {
        config.server.bind = addr;
    }
    if let Some(dir) = magazines {
        config.library.magazines_dir = dir;
    }

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flipbook_rs=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Open database
    let db = Database::open(&config.database.path)?;

    tracing::info!(
        bind = %config.server.bind,
        database = %config.database.path.display(),
        magazines = %config.library.magazines_dir.display(),
        "Starting flipbook-rs server"
    );

    // Create application state
    let state = server::AppState::new_with_db(config.clone(), db);

    // Step 1: Load from database (instant startup)
    tracing::info!("Loading library from database...");
    if let Err(e) = state.load_from_db() {
        tracing::warn!(error = %e, "Failed to load from database, will scan");
    }

    // Step 2: Start background scan (non-blocking)
    tracing::info!("Starting background magazine scan...");
    state.start_background_scan();

    // Start background rescan task if enabled
    if config.scan.interval_seconds > 0 {
        let state_clone = state.clone();
        let interval = Duration::from_secs(config.scan.interval_seconds);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // Skip first immediate tick

            loop {
                ticker.tick().await;
                tracing::debug!("Running scheduled magazine rescan");

                if let Err(e) = state_clone.scan_library() {
                    tracing::warn!(error = %e, "Scheduled rescan failed");
                }
            }
        });
    }

    // Create router
    let app = server::create_router(state);

    // Start server immediately (don't wait for scan)
    let listener = TcpListener::bind(config.server.bind).await?;
    tracing::info!(address = %config.server.bind, "Server listening (background scan in progress)");

    axum::serve(listener, app).await?;

    Ok(())
}
