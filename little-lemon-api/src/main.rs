use axum::Router;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use jsonwebtoken::DecodingKey;
use little_lemon_service::{
    create_pool, establish_connection, models::User, run_migrations, users::create_user,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod auth;
mod config;
mod error;
mod handlers;
mod models;

use config::Config;
use handlers::{ApiDoc, AppState, api_router};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Parser)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server.
    Serve,
    /// Apply pending database migrations.
    Migrate,
    /// Provision an account, e.g. the first administrator.
    CreateUser {
        username: String,
        #[arg(long, default_value = "")]
        first_name: String,
        #[arg(long, default_value = "")]
        last_name: String,
        #[arg(long)]
        staff: bool,
        #[arg(long)]
        superuser: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve => serve(Config::from_env()?).await,
        Commands::Migrate => {
            let mut conn = establish_connection(&config::database_url()?)?;
            let applied = run_migrations(&mut conn)?;
            info!(count = applied.len(), ?applied, "migrations applied");
            Ok(())
        }
        Commands::CreateUser {
            username,
            first_name,
            last_name,
            staff,
            superuser,
        } => {
            let mut conn = establish_connection(&config::database_url()?)?;
            let mut user = User::new(&username);
            user.first_name = first_name;
            user.last_name = last_name;
            user.is_staff = staff || superuser;
            user.is_superuser = superuser;
            let user = create_user(&mut conn, user)?;
            info!(id = %user.id, username = %user.username, "user created");
            println!("{}", user.id);
            Ok(())
        }
    }
}

async fn serve(config: Config) -> Result<(), BoxError> {
    let pool = create_pool(&config.database_url, config.pool_size)?;
    let migration_pool = pool.clone();
    let applied = tokio::task::spawn_blocking(move || -> Result<_, BoxError> {
        let mut conn = migration_pool.get()?;
        run_migrations(&mut *conn)
    })
    .await??;
    if !applied.is_empty() {
        info!(?applied, "migrations applied");
    }

    let state = AppState {
        pool,
        decoding_key: DecodingKey::from_secret(config.secret_key.as_bytes()),
    };

    let app = Router::new()
        .nest("/api", api_router())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!("Little Lemon API listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
