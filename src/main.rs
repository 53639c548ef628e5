use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use caredesk::api::server::{AppState, start_server};
use caredesk::config::AppConfig;
use caredesk::db::{
    CreateClientGroupParams, CreateClinicianParams, CreateLocationParams, connect_from_config,
};
use caredesk::settings::Settings;

#[derive(Parser)]
#[command(name = "caredesk")]
#[command(about = "Client aggregate engine for a practice backoffice")]
struct Cli {
    /// Path to the settings file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (the default when no subcommand is given).
    Serve {
        /// Override the configured listen address.
        #[arg(long)]
        listen: Option<SocketAddr>,
    },
    /// Connect, run schema migrations, and exit.
    Migrate,
    /// Insert a demo clinician, location, and client group and print their ids.
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    let config = AppConfig::resolve(&settings)?;

    init_tracing(&config);

    match cli.command.unwrap_or(Commands::Serve { listen: None }) {
        Commands::Serve { listen } => serve(config, listen).await,
        Commands::Migrate => migrate(config).await,
        Commands::Seed => seed(config).await,
    }
}

fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.filter));
    if config.log.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn serve(config: AppConfig, listen: Option<SocketAddr>) -> anyhow::Result<()> {
    let db = connect_from_config(&config.database).await?;
    tracing::info!(backend = db.backend_name(), "database ready");

    let mut server_config = config.server;
    if let Some(listen) = listen {
        server_config.listen = listen;
    }

    let state = Arc::new(AppState::new(db));
    let bound = start_server(&server_config, state.clone()).await?;
    tracing::info!("listening on http://{}", bound);

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    state.shutdown().await;
    Ok(())
}

async fn migrate(config: AppConfig) -> anyhow::Result<()> {
    // connect_from_config runs migrations as part of connecting.
    let db = connect_from_config(&config.database).await?;
    tracing::info!(backend = db.backend_name(), "migrations applied");
    Ok(())
}

async fn seed(config: AppConfig) -> anyhow::Result<()> {
    let db = connect_from_config(&config.database).await?;

    let clinician = db
        .create_clinician(&CreateClinicianParams {
            first_name: "Dana".to_string(),
            last_name: "Reyes".to_string(),
            email: Some("dana.reyes@example.com".to_string()),
        })
        .await?;
    let location = db
        .create_location(&CreateLocationParams {
            name: "Main Street Clinic".to_string(),
            address: Some("12 Main St".to_string()),
        })
        .await?;
    let group = db
        .create_client_group(&CreateClientGroupParams {
            name: "Demo Household".to_string(),
            group_type: Some("family".to_string()),
        })
        .await?;

    println!("clinician_id={}", clinician.id);
    println!("location_id={}", location.id);
    println!("client_group_id={}", group.id);
    Ok(())
}
