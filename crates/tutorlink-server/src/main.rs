use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use tutorlink_api::{AppState, AppStateInner};
use tutorlink_chat::ChatService;
use tutorlink_gateway::Dispatcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tutorlink=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("TUTORLINK_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("TUTORLINK_DB_PATH").unwrap_or_else(|_| "tutorlink.db".into());
    let host = std::env::var("TUTORLINK_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("TUTORLINK_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database
    let db = Arc::new(tutorlink_db::Database::open(&PathBuf::from(&db_path))?);

    // Shared state
    let service = Arc::new(ChatService::new(db, Dispatcher::new()));
    let state: AppState = Arc::new(AppStateInner {
        service,
        jwt_secret,
    });

    let app = tutorlink_server::router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("TutorLink server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
