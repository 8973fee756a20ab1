//! Credit Approval API Server
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Client (Frontend)                     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum Web Server                         │
//! │  ┌─────────────────────────────────────────────────────────┐│
//! │  │                      Routes Layer                        ││
//! │  │  /register  /check-eligibility  /create-loan  /view-*   ││
//! │  └─────────────────────────────────────────────────────────┘│
//! │  ┌─────────────────────────────────────────────────────────┐│
//! │  │                    Services Layer                        ││
//! │  │  LoanService (per-customer lock)    Engine (pure)       ││
//! │  └─────────────────────────────────────────────────────────┘│
//! │  ┌─────────────────────────────────────────────────────────┐│
//! │  │                    Data Layer                            ││
//! │  │  PostgreSQL Ledger    In-memory Ledger (dev/test)       ││
//! │  └─────────────────────────────────────────────────────────┘│
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// 라이브러리에서 가져오기
use credit_approval_api::{
    config::LedgerBackend, routes, AppState, Config, Database, Ledger, MemoryLedger,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 환경변수 로드
    dotenvy::dotenv().ok();

    // 로깅 초기화
    // RUST_LOG=debug,sqlx=warn 형태로 레벨 제어 가능
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "credit_approval_api=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Credit Approval API Server");

    // 설정 로드
    let config = Config::from_env()?;
    tracing::info!(backend = ?config.ledger_backend, "Configuration loaded");

    // 장부 연결
    let ledger: Arc<dyn Ledger> = match config.ledger_backend {
        LedgerBackend::Postgres => {
            let db = Database::connect(&config.database_url).await?;
            tracing::info!("Database connected");

            // 마이그레이션 실행
            db.run_migrations().await?;
            tracing::info!("Migrations completed");
            Arc::new(db)
        }
        LedgerBackend::Memory => {
            tracing::warn!("Using in-memory ledger, data is lost on restart");
            Arc::new(MemoryLedger::new())
        }
    };

    let port = config.port;
    let app = routes::router(AppState::new(ledger, config));

    // 서버 시작
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
