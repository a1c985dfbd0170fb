use std::env;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use sekolah::{db, error, handlers, routes, AppState, Config};

const DEFAULT_CONFIG: &str = "./etc/sekolah.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|arg| arg == "-help" || arg == "--help") {
        println!("Usage: sekolah [OPTIONS]");
        println!("Options:");
        println!("  -config <path>  Path to configuration file (default: {})", DEFAULT_CONFIG);
        println!("  -seed           Seed roles, permissions and the admin account, then exit");
        println!("  -help, --help   Print this help message");
        return Ok(());
    }
    let seed_only = args.iter().any(|arg| arg == "-seed");

    let config_path = args
        .iter()
        .skip_while(|arg| arg.as_str() != "-config")
        .nth(1)
        .map(|s| s.to_string())
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());

    // Load configuration first (before logging init)
    let config = Config::load(&config_path).unwrap_or_else(|e| {
        eprintln!("Could not load config file: {}, using defaults", e);
        Config::default()
    });

    // Priority: RUST_LOG env var > config file > default "info"
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    fmt::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    info!("Starting Sekolah server...");
    info!("Loading configuration from: {}", config_path);

    error::set_production(config.is_production());

    let db_conn = db::init_database(&config.database).await.map_err(|e| {
        tracing::error!("Database initialization failed: {}", e);
        anyhow::anyhow!("Database initialization failed: {}", e)
    })?;

    db::seed(&db_conn, &config.seed).await.map_err(|e| {
        tracing::error!("Seeding failed: {}", e);
        anyhow::anyhow!("Seeding failed: {}", e)
    })?;
    if seed_only {
        info!("Seed completed");
        return Ok(());
    }

    handlers::audit::service::init(db_conn.clone());
    info!("Audit log service initialized");

    tokio::fs::create_dir_all(&config.storage_dir).await?;

    let state = AppState::new(db_conn, config.clone());
    let app = routes::create_router(state);

    let addr: SocketAddr = match config.addr.parse() {
        Ok(addr) => addr,
        Err(_) => {
            tracing::warn!("Invalid address '{}', using default 0.0.0.0:8080", config.addr);
            SocketAddr::from(([0, 0, 0, 0], 8080))
        }
    };

    info!("Server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
