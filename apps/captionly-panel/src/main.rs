mod api;
mod cli;
mod config;
mod entitlement;
mod error;
mod handlers;
mod prompt;
mod routes;
mod services;
mod state;
mod utils;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use captionly_db::init_db;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::PanelConfig;
use services::generation_service::GeminiClient;
use state::AppState;

#[derive(Parser)]
#[command(name = "captionly")]
#[command(about = "Captionly caption generator and admin console", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server
    Serve,
    /// Administrative tools
    Admin {
        #[command(subcommand)]
        subcommand: AdminCommands,
    },
    /// Install the panel as a systemd service
    Install,
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Create a user with a confirmed email
    CreateUser {
        username: String,
        email: String,
        password: String,
        /// Grant admin console access
        #[arg(long)]
        admin: bool,
    },
    /// Reset a user's password
    ResetPassword {
        /// Email of the user
        email: String,
        /// New password
        new_pass: String,
    },
    /// Show panel connection information
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        println!("Warning: Failed to load .env file: {}", e);
    }

    let cli = Cli::parse();

    let file_appender = tracing_appender::rolling::never(".", "server.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "captionly_panel=debug,axum=info,tower_http=info,sqlx=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stdout))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .init();

    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        tracing::debug!("rustls crypto provider already installed");
    }

    match cli.command {
        Commands::Install => cli::install_service()?,
        Commands::Serve => {
            let (config, pool) = connect().await?;
            run_server(pool, config).await?;
        }
        Commands::Admin { subcommand } => {
            let (config, pool) = connect().await?;
            match subcommand {
                AdminCommands::CreateUser {
                    username,
                    email,
                    password,
                    admin,
                } => cli::create_user(&pool, &username, &email, &password, admin).await?,
                AdminCommands::ResetPassword { email, new_pass } => {
                    cli::reset_password(&pool, &email, &new_pass).await?
                }
                AdminCommands::Info => cli::print_info(&pool, &config).await?,
            }
        }
    }

    Ok(())
}

async fn connect() -> Result<(PanelConfig, sqlx::PgPool)> {
    let config = PanelConfig::load()?;
    let pool = init_db(&config.database_url).await?;
    tracing::info!("Database initialized successfully.");
    Ok((config, pool))
}

async fn run_server(pool: sqlx::PgPool, config: PanelConfig) -> Result<()> {
    let model = Arc::new(GeminiClient::new(&config.gemini).context("Failed to build Gemini client")?);
    tracing::info!("Caption model: {}", config.gemini.model);

    let state = AppState::new(pool, &config, model);
    let app = routes::app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.listen_port));
    tracing::info!("Listening on {}", addr);
    tracing::info!("Admin console at {}", config.admin_path);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
